//! Mapcalc expression handling
//!
//! The worker never interprets the formula; it only needs the output raster
//! name for the post-run existence check. The name is the text before the
//! FIRST `=`, trimmed. A formula may legally contain further `=` characters
//! (comparisons), so the split happens on the first occurrence only.

use std::fmt;
use std::str::FromStr;

/// Errors raised when constructing an [`Expression`]
#[derive(Debug, thiserror::Error)]
pub enum ExpressionError {
    #[error("expression is empty")]
    Empty,

    #[error("expression has no output name before '='")]
    MissingOutputName,
}

/// A raster-algebra assignment of the form `<output> = <formula>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression(String);

impl Expression {
    /// Wrap a raw expression string.
    ///
    /// Rejects empty input and input whose output name would be empty
    /// (e.g. `"= a + b"`). The formula itself is not validated; the engine
    /// owns that.
    pub fn new(raw: impl Into<String>) -> Result<Self, ExpressionError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(ExpressionError::Empty);
        }
        let expression = Expression(raw);
        if expression.output_name().is_empty() {
            return Err(ExpressionError::MissingOutputName);
        }
        Ok(expression)
    }

    /// The output raster name: text before the first `=`, trimmed.
    ///
    /// An expression without any `=` yields the whole trimmed string; the
    /// engine rejects such input itself when the command runs.
    pub fn output_name(&self) -> &str {
        match self.0.split_once('=') {
            Some((lhs, _)) => lhs.trim(),
            None => self.0.trim(),
        }
    }

    /// The formula after the first `=`, or empty when there is none
    pub fn formula(&self) -> &str {
        self.0.split_once('=').map(|(_, rhs)| rhs).unwrap_or("")
    }

    /// The raw expression string as supplied by the caller
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Expression {
    type Err = ExpressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Expression::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_name_simple() {
        let expr = Expression::new("result = dem_source@PERMANENT * 2").unwrap();
        assert_eq!(expr.output_name(), "result");
        assert_eq!(expr.formula(), " dem_source@PERMANENT * 2");
    }

    #[test]
    fn test_output_name_trims_whitespace() {
        let expr = Expression::new("   result\t =  a + b").unwrap();
        assert_eq!(expr.output_name(), "result");
    }

    #[test]
    fn test_output_name_splits_on_first_equals_only() {
        let expr = Expression::new("flag = if(dem == 1, 2, 3)").unwrap();
        assert_eq!(expr.output_name(), "flag");
        assert_eq!(expr.formula(), " if(dem == 1, 2, 3)");
    }

    #[test]
    fn test_output_name_without_equals_is_whole_string() {
        // Faithful to the split-on-first-'=' rule: no '=' means the whole
        // trimmed string is the name. The engine fails such input later.
        let expr = Expression::new("  just_a_name  ").unwrap();
        assert_eq!(expr.output_name(), "just_a_name");
        assert_eq!(expr.formula(), "");
    }

    #[test]
    fn test_empty_expression_rejected() {
        assert!(matches!(Expression::new(""), Err(ExpressionError::Empty)));
        assert!(matches!(Expression::new("   "), Err(ExpressionError::Empty)));
    }

    #[test]
    fn test_missing_output_name_rejected() {
        assert!(matches!(
            Expression::new("= a + b"),
            Err(ExpressionError::MissingOutputName)
        ));
        assert!(matches!(
            Expression::new("   = a + b"),
            Err(ExpressionError::MissingOutputName)
        ));
    }

    #[test]
    fn test_raw_string_preserved() {
        let raw = "out = a  +  b";
        let expr = Expression::new(raw).unwrap();
        assert_eq!(expr.as_str(), raw);
        assert_eq!(expr.to_string(), raw);
    }

    #[test]
    fn test_from_str() {
        let expr: Expression = "out = a".parse().unwrap();
        assert_eq!(expr.output_name(), "out");
    }
}
