/*! A regular expression engine with full submatch extraction.

Patterns are compiled into tagged nondeterministic finite automata and
matched in a single forward pass over the input, in time linear in the
input length. Tags attached to the automaton's transitions record where
every capture group begins and ends, so submatch offsets come out of the
same pass that finds the match; there is no backtracking anywhere.

The two main types are [`Pattern`], a compiled pattern, and [`Captures`],
the submatch table of a successful match. A compiled pattern holds no
matching state and can be shared freely between threads. Input can be a
`&str` or any [`Source`] producing chunks, so matching doesn't require the
whole input in memory at once.

# Pattern syntax

The syntax differs from mainstream regex dialects in a few ways: `[...]`
is a non-capturing group (not a character class), bounded repetition is
written `x<2,4>`, and `<name>` references a named rule from a [`RuleSet`]
or one of the built-in classes like `<digit>`. `^`/`$` anchor to line
boundaries and `^^`/`$$` to the input boundaries. A trailing `?` makes any
repetition lazy. `<'...'>` and `<"...">` quote a string verbatim, the
latter honoring escapes.

# Example

```rust
use tagged_regex::Pattern;

let pattern = Pattern::compile("(<digit>+)-(<digit>+)", None).unwrap();
let captures = pattern.captures_str("call 555-0199 now").unwrap();

assert_eq!(captures.get(0).unwrap().range(), 5..13);
assert_eq!(captures.get(1).unwrap().range(), 5..8);
assert_eq!(captures.get(2).unwrap().range(), 9..13);
```
*/

#![deny(missing_docs)]

pub use classes::CharClass;
pub use errors::MatchError;
pub use errors::PatternError;
pub use exec::Captures;
pub use exec::Match;
pub use input::Reader;
pub use input::Source;
pub use parser::RuleSet;

mod ast;
mod classes;
mod compiler;
mod errors;
mod exec;
mod input;
mod parser;
mod tnfa;

#[cfg(test)]
mod tests;

use crate::tnfa::Tnfa;

/// A compiled pattern.
///
/// Compiling is the expensive part; the resulting `Pattern` is immutable,
/// reusable and shareable across threads.
#[derive(Debug)]
pub struct Pattern {
    tnfa: Tnfa,
    source: String,
}

impl Pattern {
    /// Compiles `pattern`, resolving rule references against `rules`.
    ///
    /// The pattern may be given as text or as raw bytes; bytes must be
    /// valid UTF-8.
    pub fn compile<P: AsRef<[u8]>>(
        pattern: P,
        rules: Option<&RuleSet>,
    ) -> Result<Self, PatternError> {
        let text = std::str::from_utf8(pattern.as_ref()).map_err(|err| {
            PatternError::InvalidUtf8 { pos: err.valid_up_to() }
        })?;
        let parsed = parser::parse(text, rules)?;
        let tnfa = compiler::compile(parsed);
        Ok(Self { tnfa, source: text.to_string() })
    }

    /// The text this pattern was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Number of submatch slots a successful match produces, including
    /// slot 0 for the whole match.
    pub fn n_submatches(&self) -> usize {
        self.tnfa.n_submatches()
    }

    /// Matches against `source` and extracts all submatch offsets.
    ///
    /// Offsets count code points from the beginning of the input. The
    /// match found is the leftmost one.
    pub fn captures<S: Source>(
        &self,
        source: S,
    ) -> Result<Option<Captures>, MatchError> {
        Ok(exec::execute(&self.tnfa, source)?.map(Captures::new))
    }

    /// Matches against `source`, reporting only whether it matched.
    pub fn is_match<S: Source>(&self, source: S) -> Result<bool, MatchError> {
        Ok(exec::execute(&self.tnfa, source)?.is_some())
    }

    /// Matches against `source` and returns the offsets of the whole
    /// match.
    pub fn find<S: Source>(
        &self,
        source: S,
    ) -> Result<Option<Match>, MatchError> {
        Ok(self.captures(source)?.and_then(|c| c.get(0)))
    }

    /// Like [`Pattern::captures`], for in-memory text, which cannot fail.
    pub fn captures_str(&self, input: &str) -> Option<Captures> {
        // A &str source produces no errors.
        self.captures(input).ok().flatten()
    }

    /// Like [`Pattern::is_match`], for in-memory text.
    pub fn is_match_str(&self, input: &str) -> bool {
        self.captures_str(input).is_some()
    }

    /// Like [`Pattern::find`], for in-memory text.
    pub fn find_str(&self, input: &str) -> Option<Match> {
        self.captures_str(input).and_then(|c| c.get(0))
    }
}

/// Escapes `text` so that, compiled as a pattern, it matches exactly
/// itself.
///
/// ```
/// # use tagged_regex::{escape, Pattern};
/// let pattern = Pattern::compile(&escape("3 * (x + y)"), None).unwrap();
/// assert!(pattern.is_match_str("3 * (x + y)"));
/// ```
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '.' | '<' | '[' | '(' | ')' | ']' | '>' | '*' | '+' | '?'
            | '^' | '$' | '|' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}
