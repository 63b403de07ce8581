/*! Character classification predicates.

Predicate literals match a code point by membership test instead of by value
or range. They back the built-in rules (`<digit>`, `<alpha>`, ...) that the
parser resolves when a rule reference is not found in the user-supplied rule
table. Classification goes through the `char` methods of the standard
library; reproducing the Unicode property tables is explicitly out of scope
for this crate.
*/

/// A character-classification predicate.
///
/// Each variant answers "does this code point belong to the class?" via
/// [`CharClass::contains`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    /// Decimal digits.
    Digit,
    /// Alphabetic code points.
    Alpha,
    /// Alphanumeric code points.
    Alnum,
    /// Whitespace.
    Space,
    /// Uppercase letters.
    Upper,
    /// Lowercase letters.
    Lower,
    /// Alphanumeric code points and `_`.
    Word,
}

impl CharClass {
    /// Returns the class for a built-in rule name, if there is one.
    pub(crate) fn from_rule_name(name: &str) -> Option<Self> {
        match name {
            "digit" => Some(Self::Digit),
            "alpha" => Some(Self::Alpha),
            "alnum" => Some(Self::Alnum),
            "space" => Some(Self::Space),
            "upper" => Some(Self::Upper),
            "lower" => Some(Self::Lower),
            "word" => Some(Self::Word),
            _ => None,
        }
    }

    /// Returns true if `c` belongs to the class.
    #[inline]
    pub fn contains(&self, c: char) -> bool {
        match self {
            Self::Digit => c.is_ascii_digit(),
            Self::Alpha => c.is_alphabetic(),
            Self::Alnum => c.is_alphanumeric(),
            Self::Space => c.is_whitespace(),
            Self::Upper => c.is_uppercase(),
            Self::Lower => c.is_lowercase(),
            Self::Word => c == '_' || c.is_alphanumeric(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CharClass;

    #[test]
    fn builtin_names() {
        assert_eq!(CharClass::from_rule_name("digit"), Some(CharClass::Digit));
        assert_eq!(CharClass::from_rule_name("word"), Some(CharClass::Word));
        assert_eq!(CharClass::from_rule_name("bogus"), None);
    }

    #[test]
    fn membership() {
        assert!(CharClass::Digit.contains('7'));
        assert!(!CharClass::Digit.contains('x'));
        assert!(CharClass::Word.contains('_'));
        assert!(CharClass::Space.contains('\t'));
        assert!(CharClass::Upper.contains('Å'));
    }
}
