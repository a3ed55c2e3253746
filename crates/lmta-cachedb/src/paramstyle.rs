//! Placeholder-convention resolution for driver-agnostic query templates.
//!
//! Query templates carry the marker `{ps}` wherever a bind parameter
//! belongs; the router substitutes the active backend's placeholder
//! symbol before execution. Convention names follow the PEP-0249
//! `paramstyle` vocabulary, which is what database drivers report.

use crate::error::DbError;

/// Marker substituted with the active backend's placeholder symbol.
pub const PARAM_MARKER: &str = "{ps}";

/// Placeholder convention reported by the SQLite cache store.
pub const SQLITE_PARAMSTYLE: &str = "qmark";

/// Map a driver-reported placeholder convention to its literal symbol.
///
/// `qmark` maps to `?`; `format` and `pyformat` map to `%s`. Any other
/// convention fails with [`DbError::UnsupportedParamStyle`].
pub fn paramstyle_symbol(paramstyle: &str) -> Result<&'static str, DbError> {
    match paramstyle {
        "qmark" => Ok("?"),
        "format" | "pyformat" => Ok("%s"),
        other => Err(DbError::UnsupportedParamStyle(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qmark_resolves_to_question_mark() {
        assert_eq!(paramstyle_symbol("qmark").unwrap(), "?");
    }

    #[test]
    fn format_styles_resolve_to_percent_s() {
        assert_eq!(paramstyle_symbol("format").unwrap(), "%s");
        assert_eq!(paramstyle_symbol("pyformat").unwrap(), "%s");
    }

    #[test]
    fn unknown_style_rejected() {
        let err = paramstyle_symbol("numeric").unwrap_err();
        assert!(matches!(err, DbError::UnsupportedParamStyle(s) if s == "numeric"));
    }

    #[test]
    fn marker_substitution() {
        let template = "SELECT * FROM t WHERE a >= {ps} AND a < {ps}";
        let symbol = paramstyle_symbol("qmark").unwrap();
        assert_eq!(
            template.replace(PARAM_MARKER, symbol),
            "SELECT * FROM t WHERE a >= ? AND a < ?"
        );
    }
}
