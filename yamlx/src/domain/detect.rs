//! Deciding which string leaves are expressions

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Substrings that mark a string as an expression in loose mode.
pub const EXPRESSION_MARKERS: &[&str] = &["$", "+", "-", "*", "/", "//", "**", "%"];

static LOOSE: LazyLock<Regex> = LazyLock::new(|| {
    let alternatives: Vec<String> = EXPRESSION_MARKERS.iter().map(|m| regex::escape(m)).collect();
    Regex::new(&alternatives.join("|")).expect("marker alternation is a valid regex")
});

// digits, signs, operators and number punctuation only, with at least one operator
static ARITHMETIC_ONLY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\d\s.eE+\-*/%]*[+\-*/%][\d\s.eE+\-*/%]*$")
        .expect("arithmetic pattern is a valid regex")
});

/// How eagerly string leaves are treated as expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Detection {
    /// Any `$` or operator substring. A hyphenated word such as
    /// `foo-bar` is detected and then fails to parse.
    #[default]
    Loose,
    /// Strings containing `${`, or made only of numbers and operators.
    Strict,
}

impl Detection {
    pub fn is_expression(self, text: &str) -> bool {
        match self {
            Detection::Loose => LOOSE.is_match(text),
            Detection::Strict => text.contains("${") || ARITHMETIC_ONLY.is_match(text),
        }
    }
}

impl std::str::FromStr for Detection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "loose" => Ok(Detection::Loose),
            "strict" => Ok(Detection::Strict),
            other => Err(format!("unknown detection mode: {other} (expected loose or strict)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("${a.b}", true)]
    #[case("1 + 2", true)]
    #[case("-5", true)]
    #[case("2 ** 8", true)]
    #[case("10 % 3", true)]
    #[case("foo-bar", true)]
    #[case("/usr/local/bin", true)]
    #[case("plain text", false)]
    #[case("42", false)]
    #[case("", false)]
    #[case("a|b", false)]
    fn given_text_when_loose_detection_then_matches_markers(
        #[case] text: &str,
        #[case] expected: bool,
    ) {
        assert_eq!(Detection::Loose.is_expression(text), expected);
    }

    #[rstest]
    #[case("${a.b}", true)]
    #[case("port ${a.b}", true)]
    #[case("1 + 2", true)]
    #[case("-5", true)]
    #[case("1.5e3 * 2", true)]
    #[case("2024-01-01", true)]
    #[case("foo-bar", false)]
    #[case("/usr/local/bin", false)]
    #[case("cost: $5", false)]
    #[case("42", false)]
    #[case("", false)]
    fn given_text_when_strict_detection_then_only_arithmetic(
        #[case] text: &str,
        #[case] expected: bool,
    ) {
        assert_eq!(Detection::Strict.is_expression(text), expected);
    }

    #[test]
    fn given_mode_names_when_parsing_then_case_insensitive() {
        assert_eq!("Strict".parse::<Detection>(), Ok(Detection::Strict));
        assert_eq!(" loose ".parse::<Detection>(), Ok(Detection::Loose));
        assert!("eager".parse::<Detection>().is_err());
    }
}
