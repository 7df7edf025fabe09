use std::fmt;

use regex::Regex;

use strand_core::traits::Predicate;

/// Declarative edge guard evaluated against a step's output.
///
/// Parsed from one-line expressions such as `contains "REVISE"`; an
/// optional leading `output` subject is accepted (`output == "done"`).
#[derive(Debug, Clone)]
pub enum Condition {
    Contains(String),
    NotContains(String),
    StartsWith(String),
    Equals(String),
    NotEquals(String),
    Matches(Regex),
}

// Longer operators first so `not_contains` never parses as `contains`.
const OPERATORS: &[&str] = &["not_contains", "contains", "starts_with", "matches", "!=", "=="];

impl Condition {
    /// Parse a condition expression.
    ///
    /// Supported:
    /// - `contains "substr"` / `not_contains "substr"`
    /// - `starts_with "prefix"`
    /// - `== "value"` / `!= "value"`
    /// - `matches "regex"`
    pub fn parse(expr: &str) -> Result<Self, String> {
        let expr = expr.trim();
        let rest = expr
            .strip_prefix("output")
            .filter(|r| r.starts_with(char::is_whitespace) || r.starts_with(['=', '!']))
            .unwrap_or(expr)
            .trim_start();

        let (op, operand) = OPERATORS
            .iter()
            .find_map(|op| rest.strip_prefix(op).map(|operand| (*op, operand)))
            .ok_or_else(|| format!("unknown condition '{}'", expr))?;
        let value = parse_quoted(operand)
            .ok_or_else(|| format!("expected a quoted operand in '{}'", expr))?;

        Ok(match op {
            "contains" => Condition::Contains(value),
            "not_contains" => Condition::NotContains(value),
            "starts_with" => Condition::StartsWith(value),
            "==" => Condition::Equals(value),
            "!=" => Condition::NotEquals(value),
            "matches" => Condition::Matches(
                Regex::new(&value).map_err(|e| format!("invalid regex '{}': {}", value, e))?,
            ),
            other => return Err(format!("unsupported operator '{}'", other)),
        })
    }
}

/// Extract the text between the surrounding double quotes.
fn parse_quoted(operand: &str) -> Option<String> {
    let operand = operand.trim();
    if operand.len() < 2 || !operand.starts_with('"') || !operand.ends_with('"') {
        return None;
    }
    Some(operand[1..operand.len() - 1].to_string())
}

impl Predicate for Condition {
    fn evaluate(&self, output: &str) -> bool {
        match self {
            Condition::Contains(s) => output.contains(s.as_str()),
            Condition::NotContains(s) => !output.contains(s.as_str()),
            Condition::StartsWith(s) => output.starts_with(s.as_str()),
            Condition::Equals(s) => output == s,
            Condition::NotEquals(s) => output != s,
            Condition::Matches(re) => re.is_match(output),
        }
    }

    fn describe(&self) -> Option<String> {
        Some(self.to_string())
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Contains(s) => write!(f, "contains \"{}\"", s),
            Condition::NotContains(s) => write!(f, "not_contains \"{}\"", s),
            Condition::StartsWith(s) => write!(f, "starts_with \"{}\"", s),
            Condition::Equals(s) => write!(f, "== \"{}\"", s),
            Condition::NotEquals(s) => write!(f, "!= \"{}\"", s),
            Condition::Matches(re) => write!(f, "matches \"{}\"", re.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains() {
        let c = Condition::parse(r#"contains "REVISE""#).unwrap();
        assert!(c.evaluate("REVISE: tighten the intro"));
        assert!(!c.evaluate("APPROVED"));
    }

    #[test]
    fn test_not_contains_is_not_contains() {
        let c = Condition::parse(r#"not_contains "REVISE""#).unwrap();
        assert!(matches!(c, Condition::NotContains(_)));
        assert!(c.evaluate("APPROVED"));
        assert!(!c.evaluate("REVISE"));
    }

    #[test]
    fn test_equals_and_not_equals_with_subject() {
        let eq = Condition::parse(r#"output == "done""#).unwrap();
        assert!(eq.evaluate("done"));
        assert!(!eq.evaluate("done "));

        let ne = Condition::parse(r#"output!="done""#).unwrap();
        assert!(ne.evaluate("pending"));
        assert!(!ne.evaluate("done"));
    }

    #[test]
    fn test_starts_with() {
        let c = Condition::parse(r#"starts_with "APPROVED""#).unwrap();
        assert!(c.evaluate("APPROVED with notes"));
        assert!(!c.evaluate("NOT APPROVED"));
    }

    #[test]
    fn test_matches_regex() {
        let c = Condition::parse(r#"matches "score: [0-4]/10""#).unwrap();
        assert!(c.evaluate("score: 3/10"));
        assert!(!c.evaluate("score: 9/10"));
    }

    #[test]
    fn test_invalid_regex() {
        let err = Condition::parse(r#"matches "([a-z""#).unwrap_err();
        assert!(err.contains("invalid regex"));
    }

    #[test]
    fn test_invalid_expr() {
        assert!(Condition::parse("this is not valid").is_err());
        assert!(Condition::parse("contains REVISE").is_err());
        assert!(Condition::parse("").is_err());
    }

    #[test]
    fn test_outputs_subject_is_not_stripped() {
        // "outputs" is not the subject keyword
        assert!(Condition::parse(r#"outputs == "x""#).is_err());
    }

    #[test]
    fn test_describe_round_trips() {
        let c = Condition::parse(r#"  contains   "REVISE"  "#).unwrap();
        assert_eq!(c.describe().as_deref(), Some(r#"contains "REVISE""#));
        let again = Condition::parse(&c.to_string()).unwrap();
        assert!(again.evaluate("REVISE"));
    }
}
