/*! The pattern parser.

Patterns are parsed by recursive descent, one function per grammar
production:

```text
union  := cons | cons "|" union
cons   := piece | piece cons
piece  := atom quantifier?
atom   := "." | assertion | group | string | rule | literal
```

Rule references (`<name>`) are resolved while parsing: the expansion text of
the rule is pushed as a new input frame, parsed as a union, and the previous
frame is restored afterwards. Group and bracket counters are shared across
frames, so an expansion can't close a group it didn't open.

Quantifiers of the form `<m,n>` share their opening delimiter with rule
references and string literals. The parser speculates that a `<` after an
atom starts a bounded quantifier, and when no integer follows the `<` it
backs up one character and lets the atom parse continue, so `a<digit>` means
"an `a` followed by a digit" rather than a malformed bound.
*/

use std::mem;

use rustc_hash::FxHashMap;

use crate::ast::{Assertion, Ast, AssertionSet, NodeId};
use crate::classes::CharClass;
use crate::errors::PatternError;

/// A named set of sub-pattern expansions that rule references resolve
/// against.
///
/// Rules are plain textual substitutions: when the parser finds `<name>` it
/// parses the expansion text in place of the reference. User-defined rules
/// take precedence over the built-in classes (`<digit>`, `<alpha>`,
/// `<alnum>`, `<space>`, `<upper>`, `<lower>`, `<word>`).
///
/// ```
/// # use tagged_regex::{Pattern, RuleSet};
/// let mut rules = RuleSet::new();
/// rules.define("vowel", "a|e|i|o|u");
/// let pattern = Pattern::compile("b<vowel>+", Some(&rules)).unwrap();
/// assert!(pattern.is_match_str("bee"));
/// ```
#[derive(Debug, Default, Clone)]
pub struct RuleSet {
    rules: FxHashMap<String, String>,
}

impl RuleSet {
    /// Creates an empty rule set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines (or redefines) the rule `name` as `expansion`.
    pub fn define<N, E>(&mut self, name: N, expansion: E)
    where
        N: Into<String>,
        E: Into<String>,
    {
        self.rules.insert(name.into(), expansion.into());
    }

    pub(crate) fn get(&self, name: &str) -> Option<&str> {
        self.rules.get(name).map(String::as_str)
    }
}

/// The result of parsing a pattern, handed over to the compiler.
#[derive(Debug)]
pub(crate) struct Parsed {
    pub ast: Ast,
    pub root: NodeId,
    /// Number of literal leaves. Their ids are `0..n_leaves`.
    pub n_leaves: usize,
    /// Number of submatches, including submatch 0 (the whole pattern).
    pub n_submatches: usize,
}

/// Parses `pattern`, resolving rule references against `rules`.
pub(crate) fn parse(
    pattern: &str,
    rules: Option<&RuleSet>,
) -> Result<Parsed, PatternError> {
    let mut parser = Parser::new(pattern, rules);
    let root = parser.parse_union()?;
    parser.ast.mark_submatch(root, 0);
    Ok(Parsed {
        ast: parser.ast,
        root,
        n_leaves: parser.next_leaf_id,
        n_submatches: parser.next_submatch_id,
    })
}

/// The meaning of `\c` outside string literals.
fn escaped_char(c: char) -> Option<char> {
    match c {
        '.' | '<' | '[' | '(' | ')' | ']' | '>' | '*' | '+' | '?' | '^'
        | '$' | '|' | '\\' => Some(c),
        'n' => Some('\n'),
        't' => Some('\t'),
        _ => None,
    }
}

/// The meaning of `\c` inside `<"..">` string literals.
fn escaped_string_char(c: char) -> Option<char> {
    match c {
        '"' | '\\' => Some(c),
        'n' => Some('\n'),
        't' => Some('\t'),
        _ => None,
    }
}

/// One input frame. The frame at the top of the stack is the text being
/// consumed; frames below it are suspended while a rule expansion parses.
struct Frame<'a> {
    text: &'a str,
    at: usize,
}

struct Parser<'a> {
    ast: Ast,
    rules: Option<&'a RuleSet>,
    input: Frame<'a>,
    suspended: Vec<Frame<'a>>,
    n_brackets: usize,
    n_square_brackets: usize,
    next_submatch_id: usize,
    next_leaf_id: usize,
}

impl<'a> Parser<'a> {
    fn new(pattern: &'a str, rules: Option<&'a RuleSet>) -> Self {
        Self {
            ast: Ast::new(),
            rules,
            input: Frame { text: pattern, at: 0 },
            suspended: Vec::new(),
            n_brackets: 0,
            n_square_brackets: 0,
            // Submatch 0 is the whole pattern, marked once parsing is done.
            next_submatch_id: 1,
            next_leaf_id: 0,
        }
    }

    fn push_input(&mut self, text: &'a str) {
        let prev = mem::replace(&mut self.input, Frame { text, at: 0 });
        self.suspended.push(prev);
    }

    fn pop_input(&mut self) {
        if let Some(prev) = self.suspended.pop() {
            self.input = prev;
        }
    }

    /// Byte offset of the cursor within the current input frame.
    fn pos(&self) -> usize {
        self.input.at
    }

    fn rest(&self) -> &'a str {
        &self.input.text[self.input.at..]
    }

    fn has_more_input(&self) -> bool {
        !self.rest().is_empty()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn next_char(&mut self) -> Result<char, PatternError> {
        match self.peek() {
            Some(c) => {
                self.input.at += c.len_utf8();
                Ok(c)
            }
            None => Err(PatternError::UnexpectedEnd { pos: self.pos() }),
        }
    }

    /// Moves the cursor back over the most recently consumed character.
    fn uneat(&mut self) {
        if let Some(c) = self.input.text[..self.input.at].chars().next_back()
        {
            self.input.at -= c.len_utf8();
        }
    }

    fn is_at(&self, c: char) -> bool {
        self.peek() == Some(c)
    }

    fn is_at_any_of(&self, set: &str) -> bool {
        self.peek().is_some_and(|c| set.contains(c))
    }

    fn eat(&mut self, c: char) -> bool {
        if self.is_at(c) {
            self.input.at += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn eat_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let rest = self.rest();
        let end = rest
            .char_indices()
            .find(|(_, c)| !pred(*c))
            .map_or(rest.len(), |(i, _)| i);
        self.input.at += end;
        &rest[..end]
    }

    /// Consumes a run of decimal digits. Returns `None`, consuming nothing,
    /// when the cursor is not at a digit.
    fn eat_integer(&mut self) -> Option<u32> {
        let digits = self.eat_while(|c| c.is_ascii_digit());
        if digits.is_empty() {
            None
        } else {
            Some(digits.parse().unwrap_or(u32::MAX))
        }
    }

    fn next_leaf_id(&mut self) -> usize {
        let id = self.next_leaf_id;
        self.next_leaf_id += 1;
        id
    }

    fn parse_union(&mut self) -> Result<NodeId, PatternError> {
        let cons = self.parse_cons()?;
        if !self.eat('|') {
            return Ok(cons);
        }
        let rest = self.parse_union()?;
        Ok(self.ast.union(cons, rest))
    }

    fn parse_cons(&mut self) -> Result<NodeId, PatternError> {
        let piece = self.parse_piece()?;
        if let Some(found) = self.peek() {
            if (found == ']' && self.n_square_brackets == 0)
                || (found == ')' && self.n_brackets == 0)
            {
                return Err(PatternError::Unexpected {
                    found,
                    pos: self.pos(),
                });
            }
        }
        if !self.has_more_input() || self.is_at_any_of("])|") {
            return Ok(piece);
        }
        let rest = self.parse_cons()?;
        Ok(self.ast.cons(piece, rest))
    }

    fn parse_piece(&mut self) -> Result<NodeId, PatternError> {
        let atom = self.parse_atom()?;
        if self.is_at_any_of("*+?<") {
            self.parse_quantifier(atom)
        } else {
            Ok(atom)
        }
    }

    fn parse_atom(&mut self) -> Result<NodeId, PatternError> {
        if !self.has_more_input() || self.is_at_any_of("|])") {
            return Ok(self.ast.empty());
        }
        if !self.is_at_any_of(".^$[(<") {
            return self.parse_literal(true, false);
        }
        match self.next_char()? {
            '.' => {
                let id = self.next_leaf_id();
                Ok(self.ast.literal_range('\0', char::MAX, id))
            }
            c @ ('^' | '$') => Ok(self.parse_assertion(c)),
            c @ ('(' | '[') => self.parse_group(c),
            '<' => {
                if self.eat('\'') {
                    self.parse_string_literal('\'')
                } else if self.eat('"') {
                    self.parse_string_literal('"')
                } else {
                    self.parse_rule()
                }
            }
            _ => unreachable!(),
        }
    }

    fn parse_literal(
        &mut self,
        escaped: bool,
        in_string: bool,
    ) -> Result<NodeId, PatternError> {
        let c = if escaped && self.eat('\\') {
            let pos = self.pos();
            let raw = self.next_char()?;
            let resolved = if in_string {
                escaped_string_char(raw)
            } else {
                escaped_char(raw)
            };
            resolved.ok_or(PatternError::UnknownEscape { pos })?
        } else {
            self.next_char()?
        };
        let id = self.next_leaf_id();
        Ok(self.ast.literal_char(c, id))
    }

    fn parse_assertion(&mut self, c: char) -> NodeId {
        let assertion = if c == '^' {
            // A doubled marker asserts the input boundary instead of the
            // line boundary.
            if self.eat('^') {
                Assertion::BeginInput
            } else {
                Assertion::BeginLine
            }
        } else if self.eat('$') {
            Assertion::EndInput
        } else {
            Assertion::EndLine
        };
        self.ast.assertion(AssertionSet::none() | assertion)
    }

    fn parse_group(&mut self, open: char) -> Result<NodeId, PatternError> {
        let mirror;
        let mut submatch_id = None;
        if open == '(' {
            mirror = ')';
            submatch_id = Some(self.next_submatch_id);
            self.next_submatch_id += 1;
            self.n_brackets += 1;
        } else {
            mirror = ']';
            self.n_square_brackets += 1;
        }
        let body = self.parse_union()?;
        if !self.eat(mirror) {
            return Err(PatternError::Expected {
                expected: mirror,
                pos: self.pos(),
            });
        }
        if open == '(' {
            self.n_brackets -= 1;
        } else {
            self.n_square_brackets -= 1;
        }
        if let Some(id) = submatch_id {
            self.ast.mark_submatch(body, id);
        }
        Ok(body)
    }

    fn parse_string_literal(
        &mut self,
        delim: char,
    ) -> Result<NodeId, PatternError> {
        // Escapes are honored inside `<"..">` but not inside `<'..'>`.
        let escaped = delim == '"';
        let mut body: Option<NodeId> = None;
        while !self.eat(delim) {
            let literal = self.parse_literal(escaped, true)?;
            body = self.ast.cons_or_other(body, Some(literal));
        }
        if !self.eat('>') {
            return Err(PatternError::Expected {
                expected: '>',
                pos: self.pos(),
            });
        }
        match body {
            Some(body) => Ok(body),
            None => Ok(self.ast.empty()),
        }
    }

    fn parse_rule(&mut self) -> Result<NodeId, PatternError> {
        let begin_pos = self.pos();
        let name = self.eat_while(|c| c != '>');
        if !self.eat('>') {
            return Err(PatternError::Expected {
                expected: '>',
                pos: self.pos(),
            });
        }
        if let Some(expansion) = self.rules.and_then(|r| r.get(name)) {
            self.push_input(expansion);
            let body = self.parse_union()?;
            self.pop_input();
            Ok(body)
        } else if let Some(class) = CharClass::from_rule_name(name) {
            let id = self.next_leaf_id();
            Ok(self.ast.literal_class(class, id))
        } else {
            Err(PatternError::UndefinedRule {
                name: name.to_string(),
                pos: begin_pos,
            })
        }
    }

    fn parse_quantifier(
        &mut self,
        atom: NodeId,
    ) -> Result<NodeId, PatternError> {
        let (min, max) = match self.next_char()? {
            '*' => (0, None),
            '+' => (1, None),
            '?' => (0, Some(1)),
            '<' => match self.parse_bounded_quantifier()? {
                Some(bounds) => bounds,
                // Not a bounded quantifier after all. Back up over the `<`
                // so it can start a rule reference or a string literal.
                None => {
                    self.uneat();
                    return Ok(atom);
                }
            },
            _ => unreachable!(),
        };
        let minimal = self.eat('?');
        if min == 0 && max == Some(0) {
            return Ok(self.ast.empty());
        }
        Ok(self.ast.iter(atom, min, max, minimal))
    }

    /// Parses the `m,n>` tail of a bounded quantifier, the opening `<`
    /// already being consumed. Returns `None` when the cursor isn't at an
    /// integer or a comma, consuming nothing, so the caller can back up.
    fn parse_bounded_quantifier(
        &mut self,
    ) -> Result<Option<(u32, Option<u32>)>, PatternError> {
        if self.is_at('>') {
            return Err(PatternError::ExpectedInteger { pos: self.pos() });
        }
        let begin_pos = self.pos();
        let (min, read_min) = if self.is_at(',') {
            (0, false)
        } else {
            match self.eat_integer() {
                Some(min) => (min, true),
                None => return Ok(None),
            }
        };
        let mut max = Some(min);
        if self.is_at('>') {
            // `<m>` repeats exactly m times.
        } else if self.eat(',') {
            if self.is_at('>') {
                if read_min {
                    max = None;
                } else {
                    return Err(PatternError::ExpectedInteger {
                        pos: self.pos(),
                    });
                }
            } else {
                match self.eat_integer() {
                    Some(m) => max = Some(m),
                    None => {
                        return Err(PatternError::ExpectedInteger {
                            pos: self.pos(),
                        })
                    }
                }
            }
        }
        if !self.eat('>') {
            return Err(PatternError::Expected {
                expected: '>',
                pos: self.pos(),
            });
        }
        if let Some(max) = max {
            if min > max {
                return Err(PatternError::BoundsReversed { pos: begin_pos });
            }
        }
        Ok(Some((min, max)))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{parse, RuleSet};
    use crate::ast::{Leaf, Literal, NodeKind};
    use crate::errors::PatternError;

    #[test]
    fn counts() {
        let parsed = parse("(a)(bc)|d", None).unwrap();
        assert_eq!(parsed.n_leaves, 4);
        // Submatch 0 plus the two groups.
        assert_eq!(parsed.n_submatches, 3);
    }

    #[test]
    fn square_brackets_capture_nothing() {
        let parsed = parse("[ab]+", None).unwrap();
        assert_eq!(parsed.n_submatches, 1);
    }

    #[test]
    fn empty_pattern() {
        let parsed = parse("", None).unwrap();
        assert_eq!(parsed.n_leaves, 0);
        assert_eq!(parsed.n_submatches, 1);
    }

    #[test]
    fn quantifier_after_atom() {
        let parsed = parse("a+b*c?d<2,4>e<3>f<1,>", None).unwrap();
        assert_eq!(parsed.n_leaves, 6);
    }

    #[test]
    fn bounded_quantifier_backs_up_to_rule() {
        // The `<` after `a` doesn't start an integer, so it must be read
        // as a rule reference instead of a bounded quantifier.
        let parsed = parse("a<digit>", None).unwrap();
        assert_eq!(parsed.n_leaves, 2);
        let root = parsed.root;
        match parsed.ast.node(root).kind {
            NodeKind::Cons(_, digit) => {
                assert!(matches!(
                    parsed.ast.node(digit).kind,
                    NodeKind::Leaf(Leaf::Literal {
                        literal: Literal::Class(_),
                        ..
                    })
                ));
            }
            _ => panic!("expected a concatenation"),
        }
    }

    #[test]
    fn string_literals() {
        assert_eq!(parse("<'a*b'>", None).unwrap().n_leaves, 3);
        assert_eq!(parse("<\"a\\\"b\">", None).unwrap().n_leaves, 3);
        assert_eq!(parse("<''>", None).unwrap().n_leaves, 0);
    }

    #[test]
    fn rules_expand() {
        let mut rules = RuleSet::new();
        rules.define("ab", "a|b");
        let parsed = parse("<ab>c", Some(&rules)).unwrap();
        assert_eq!(parsed.n_leaves, 3);
    }

    #[test]
    fn user_rules_shadow_builtins() {
        let mut rules = RuleSet::new();
        rules.define("digit", "x");
        let parsed = parse("<digit>", Some(&rules)).unwrap();
        assert_eq!(parsed.n_leaves, 1);
        match parsed.ast.node(parsed.root).kind {
            NodeKind::Cons(_, _) => panic!("expected a single leaf"),
            ref kind => assert!(matches!(
                kind,
                NodeKind::Leaf(Leaf::Literal {
                    literal: Literal::Char('x'),
                    ..
                })
            )),
        }
    }

    #[test]
    fn escapes() {
        assert_eq!(parse("\\*\\n\\t\\\\", None).unwrap().n_leaves, 4);
        assert_eq!(
            parse("\\q", None).unwrap_err(),
            PatternError::UnknownEscape { pos: 1 }
        );
    }

    #[test]
    fn error_positions() {
        assert_eq!(
            parse("(a", None).unwrap_err(),
            PatternError::Expected { expected: ')', pos: 2 }
        );
        assert_eq!(
            parse("a)", None).unwrap_err(),
            PatternError::Unexpected { found: ')', pos: 1 }
        );
        assert_eq!(
            parse("a]", None).unwrap_err(),
            PatternError::Unexpected { found: ']', pos: 1 }
        );
        assert_eq!(
            parse("<'ab", None).unwrap_err(),
            PatternError::UnexpectedEnd { pos: 4 }
        );
        assert_eq!(
            parse("<nope>", None).unwrap_err(),
            PatternError::UndefinedRule { name: "nope".to_string(), pos: 1 }
        );
    }

    #[test]
    fn bounded_quantifier_errors() {
        assert_eq!(
            parse("a<>", None).unwrap_err(),
            PatternError::ExpectedInteger { pos: 2 }
        );
        assert_eq!(
            parse("a<,>", None).unwrap_err(),
            PatternError::ExpectedInteger { pos: 3 }
        );
        assert_eq!(
            parse("a<3,1>", None).unwrap_err(),
            PatternError::BoundsReversed { pos: 2 }
        );
        assert_eq!(
            parse("a<2,x>", None).unwrap_err(),
            PatternError::ExpectedInteger { pos: 4 }
        );
    }

    #[test]
    fn errors_inside_rule_expansions_use_expansion_offsets() {
        let mut rules = RuleSet::new();
        rules.define("bad", "x\\q");
        assert_eq!(
            parse("<bad>", Some(&rules)).unwrap_err(),
            PatternError::UnknownEscape { pos: 2 }
        );
    }
}
