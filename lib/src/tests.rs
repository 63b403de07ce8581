/*! End-to-end tests exercising the public API. */

use std::io;
use std::thread;

use pretty_assertions::assert_eq;

use crate::{escape, MatchError, Pattern, PatternError, Reader, RuleSet, Source};

/// Compiles `pattern`, matches it against an input, and compares the full
/// submatch table against the expected `(begin, end)` offsets. `None` marks
/// a group that took no part in the match.
macro_rules! matches_exactly {
    ($pattern:literal, $input:literal $(, $expected:expr)+ $(,)?) => {{
        let pattern = Pattern::compile($pattern, None).unwrap();
        let captures = match pattern.captures_str($input) {
            Some(captures) => captures,
            None => panic!(
                "`{}` expected to match `{}`",
                $pattern,
                $input.escape_default(),
            ),
        };
        let offsets: Vec<Option<(usize, usize)>> = captures
            .iter()
            .map(|m| m.map(|m| (m.begin, m.end)))
            .collect();
        let expected: Vec<Option<(usize, usize)>> = vec![$($expected.into()),+];
        assert_eq!(
            offsets,
            expected,
            "wrong submatches for `{}` on `{}`",
            $pattern,
            $input.escape_default(),
        );
    }};
}

macro_rules! no_match {
    ($pattern:literal, $input:literal) => {{
        let pattern = Pattern::compile($pattern, None).unwrap();
        assert!(
            !pattern.is_match_str($input),
            "`{}` expected not to match `{}`",
            $pattern,
            $input.escape_default(),
        );
    }};
}

#[test]
fn literals() {
    matches_exactly!("abc", "abc", (0, 3));
    matches_exactly!("abc", "xxabc", (2, 5));
    matches_exactly!("b", "aaab", (3, 4));
    no_match!("abc", "ababab");
    no_match!("abc", "ab");
}

#[test]
fn empty_pattern_matches_everywhere() {
    matches_exactly!("", "", (0, 0));
    matches_exactly!("", "abc", (0, 0));
}

#[test]
fn dot_matches_any_code_point() {
    matches_exactly!("a.c", "abc", (0, 3));
    matches_exactly!("a.c", "a.c", (0, 3));
    // Unlike most dialects `.` doesn't stop at line breaks.
    matches_exactly!("a.c", "a\nc", (0, 3));
    no_match!("a.c", "ac");
}

#[test]
fn escapes() {
    matches_exactly!(r"a\.c", "a.c", (0, 3));
    no_match!(r"a\.c", "abc");
    matches_exactly!(r"a\nb", "a\nb", (0, 3));
    matches_exactly!(r"\tx", "\tx", (0, 2));
    matches_exactly!(r"\\", "\\", (0, 1));
    matches_exactly!(r"\<\>", "<>", (0, 2));
}

#[test]
fn union_prefers_the_longest_match_from_the_same_start() {
    matches_exactly!("cat|dog", "the dog", (4, 7));
    matches_exactly!("a|ab", "ab", (0, 2));
    matches_exactly!("ab|a", "ab", (0, 2));
    // An empty branch matches at the first position.
    matches_exactly!("a|", "b", (0, 0));
}

#[test]
fn leftmost_match_wins() {
    matches_exactly!("a*", "baaa", (0, 0));
    matches_exactly!("b+", "abbb", (1, 4));
}

#[test]
fn greedy_repetition() {
    matches_exactly!("a*", "aaa", (0, 3));
    matches_exactly!("a+", "aaa", (0, 3));
    matches_exactly!("a?", "aaa", (0, 1));
    no_match!("a+", "bbb");
}

#[test]
fn lazy_repetition() {
    matches_exactly!("a*?", "aaa", (0, 0));
    matches_exactly!("a+?", "aaa", (0, 1));
    matches_exactly!("a??", "aaa", (0, 0));
    // The overall match still has to complete.
    matches_exactly!("a*?b", "aaab", (0, 4));
}

#[test]
fn bounded_repetition() {
    matches_exactly!("a<3>", "aaaaa", (0, 3));
    matches_exactly!("a<2,4>", "aaaaa", (0, 4));
    matches_exactly!("a<2,4>", "aaa", (0, 3));
    matches_exactly!("a<2,>", "aaaaa", (0, 5));
    matches_exactly!("a<0,1>b", "b", (0, 1));
    no_match!("a<2,4>", "a");
    no_match!("a<2>", "ab");
}

#[test]
fn lazy_bounded_repetition() {
    matches_exactly!("a<2,4>?", "aaaaa", (0, 2));
    matches_exactly!("a<2,>?", "aaaaa", (0, 2));
}

#[test]
fn non_capturing_group() {
    // `[...]` groups a subexpression without capturing; it is not a
    // character class. `[ab]+` repeats the sequence `ab`.
    matches_exactly!("[ab]+x", "ababx", (0, 5));
    matches_exactly!("[ab]<2>", "abab", (0, 4));
    matches_exactly!("[a|b]+x", "abax", (0, 4));
    no_match!("[ab]+x", "abax");
    no_match!("[ab]<2>", "ab");
}

#[test]
fn submatch_extraction() {
    matches_exactly!("(a)(b)", "ab", (0, 2), (0, 1), (1, 2));
    matches_exactly!("((a)(b))c", "abc", (0, 3), (0, 2), (0, 1), (1, 2));
    matches_exactly!("x(y*)z", "xyyz", (0, 4), (1, 3));
}

#[test]
fn unused_groups_are_reported_as_none() {
    matches_exactly!("(a)?b", "b", (0, 1), None);
    matches_exactly!("(a)|(b)", "b", (0, 1), None, (0, 1));
    matches_exactly!("(a)|(b)", "a", (0, 1), (0, 1), None);
}

#[test]
fn doubly_wrapped_group() {
    matches_exactly!("((a))", "za", (1, 2), (1, 2), (1, 2));
}

#[test]
fn adjacent_greedy_groups() {
    matches_exactly!("(a*)(a*)", "aa", (0, 2), (0, 2), (2, 2));
}

#[test]
fn lazy_group_yields_to_greedy_neighbor() {
    matches_exactly!("(a*?)(a*)", "aa", (0, 2), (0, 0), (0, 2));
}

#[test]
fn repeated_group_reports_the_last_iteration() {
    matches_exactly!("(ab)<2>", "abab", (0, 4), (2, 4));
    matches_exactly!("(a|b)+", "abab", (0, 4), (3, 4));
}

#[test]
fn line_assertions() {
    matches_exactly!("^a", "abc", (0, 1));
    matches_exactly!("^a", "\na", (1, 2));
    matches_exactly!("^b$", "a\nb\nc", (2, 3));
    matches_exactly!("a$", "a\n", (0, 1));
    no_match!("^a", "ba");
    no_match!("a$", "ab");
}

#[test]
fn input_assertions() {
    matches_exactly!("^^a", "abc", (0, 1));
    matches_exactly!("a$$", "xa", (1, 2));
    no_match!("^^a", "\na");
    no_match!("a$$", "a\n");
}

#[test]
fn builtin_rules() {
    matches_exactly!("<digit>+", "abc123", (3, 6));
    matches_exactly!("<space><word>+", "one two", (3, 7));
    matches_exactly!("<upper><lower>+", "a Word", (2, 6));
}

#[test]
fn user_rules() {
    let mut rules = RuleSet::new();
    rules.define("vowel", "a|e|i|o|u");
    rules.define("syllable", "<vowel>|[b|c|d]<vowel>");
    let pattern = Pattern::compile("<syllable>+", Some(&rules)).unwrap();
    let m = pattern.find_str("xxbeda").unwrap();
    assert_eq!(m.range(), 2..6);
}

#[test]
fn user_rules_shadow_builtins() {
    let mut rules = RuleSet::new();
    rules.define("digit", "x");
    let pattern = Pattern::compile("<digit>+", Some(&rules)).unwrap();
    assert_eq!(pattern.find_str("12xx").unwrap().range(), 2..4);
}

#[test]
fn undefined_rule_is_an_error() {
    let err = Pattern::compile("a<nosuchrule>", None).unwrap_err();
    assert!(matches!(
        err,
        PatternError::UndefinedRule { ref name, pos: 2 } if name == "nosuchrule"
    ));
}

#[test]
fn string_literals() {
    matches_exactly!("<'a.c'>", "xa.c", (1, 4));
    // Quoted text is verbatim; `.` is not a wildcard here.
    no_match!("<'a.c'>", "abc");
    matches_exactly!("<\"a\\nb\">", "a\nb", (0, 3));
    matches_exactly!("<'ab'><2>", "abab", (0, 4));
}

#[test]
fn offsets_count_code_points() {
    matches_exactly!("é+", "caféé", (3, 5));
    matches_exactly!("(☃)x", "a☃x", (1, 3), (1, 2));
}

#[test]
fn escape_round_trip() {
    let text = "3 * (x + y) <= [z]\n\tdone?";
    let pattern = Pattern::compile(&escape(text), None).unwrap();
    let m = pattern.find_str(text).unwrap();
    assert_eq!(m.range(), 0..text.chars().count());
}

#[test]
fn compile_from_invalid_utf8_bytes() {
    let err = Pattern::compile(&b"ab\xffc"[..], None).unwrap_err();
    assert!(matches!(err, PatternError::InvalidUtf8 { pos: 2 }));
}

#[test]
fn error_positions_are_reported() {
    let err = Pattern::compile("a<3,1>", None).unwrap_err();
    assert!(matches!(err, PatternError::BoundsReversed { pos: 2 }));
    assert_eq!(err.position(), 2);
}

#[test]
fn accessors() {
    let pattern = Pattern::compile("(a)(b)", None).unwrap();
    assert_eq!(pattern.source(), "(a)(b)");
    assert_eq!(pattern.n_submatches(), 3);
    assert!(pattern.is_match_str("ab"));
    assert!(!pattern.is_match_str("ba"));
    let captures = pattern.captures_str("ab").unwrap();
    assert_eq!(captures.len(), 3);
    assert!(!captures.is_empty());
    assert_eq!(captures.get(7), None);
}

#[test]
fn pattern_is_reusable() {
    let pattern = Pattern::compile("a(b*)c", None).unwrap();
    for _ in 0..3 {
        let captures = pattern.captures_str("xabbc").unwrap();
        assert_eq!(captures.get(0).unwrap().range(), 1..5);
        assert_eq!(captures.get(1).unwrap().range(), 2..4);
    }
    // Compiling the same text again gives the same results.
    let again = Pattern::compile(pattern.source(), None).unwrap();
    assert_eq!(again.captures_str("xabbc"), pattern.captures_str("xabbc"));
}

#[test]
fn pattern_is_shareable_across_threads() {
    let pattern = Pattern::compile("<digit>+", None).unwrap();
    thread::scope(|scope| {
        for input in ["a1", "22b", "xyz345"] {
            let pattern = &pattern;
            scope.spawn(move || {
                assert!(pattern.is_match_str(input));
            });
        }
    });
}

/// Hands over a fixed sequence of chunks.
struct Chunks<'a>(&'a [&'a str]);

impl Source for Chunks<'_> {
    fn pull(&mut self) -> Result<Option<String>, MatchError> {
        match self.0.split_first() {
            Some((chunk, rest)) => {
                self.0 = rest;
                Ok(Some(chunk.to_string()))
            }
            None => Ok(None),
        }
    }
}

#[test]
fn chunked_input_matches_like_contiguous_input() {
    let pattern = Pattern::compile("(<digit>+)-(<digit>+)", None).unwrap();
    let chunked = Chunks(&["call 5", "55-0", "", "199 now"]);
    let captures = pattern.captures(chunked).unwrap().unwrap();
    let expected = pattern.captures_str("call 555-0199 now").unwrap();
    assert_eq!(captures, expected);
    assert_eq!(captures.get(1).unwrap().range(), 5..8);
    assert_eq!(captures.get(2).unwrap().range(), 9..13);
}

#[test]
fn reader_source() {
    let pattern = Pattern::compile("lazy (<word>+)", None).unwrap();
    let input = io::Cursor::new("the quick fox, the lazy dog".as_bytes());
    let captures = pattern.captures(Reader::new(input)).unwrap().unwrap();
    assert_eq!(captures.get(1).unwrap().range(), 24..27);
}

#[test]
fn reader_io_errors_propagate() {
    struct Failing;

    impl io::Read for Failing {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("disk on fire"))
        }
    }

    let pattern = Pattern::compile("a", None).unwrap();
    let result = pattern.is_match(Reader::new(Failing));
    assert!(matches!(result, Err(MatchError::Io(_))));
}
