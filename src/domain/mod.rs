//! Typed vocabulary of the planning process.
//!
//! Everything that arrives over HTTP as loose strings is parsed here into
//! enums before it reaches the store, so the store only ever persists values
//! that belong to their enumeration.

pub mod aspect;
pub mod error;
pub mod plan;
pub mod strategy;
pub mod user;

pub use aspect::{AspectEntry, AspectInput, Source};
pub use error::ValidationError;
pub use plan::{ActivityInput, NewActivity, NewTask, TaskInput, TaskStatus};
pub use strategy::{CrossType, ElementKind, NewStrategy, StrategicAxis, StrategyInput};
pub use user::Role;

/// Fold a user-supplied label into its comparison key: trimmed, upper-case,
/// accents removed and separators collapsed to a single space.
pub(crate) fn fold_label(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_space = false;
    for ch in raw.trim().chars() {
        let ch = match ch {
            'á' | 'à' | 'ä' | 'â' | 'Á' | 'À' | 'Ä' | 'Â' => 'A',
            'é' | 'è' | 'ë' | 'ê' | 'É' | 'È' | 'Ë' | 'Ê' => 'E',
            'í' | 'ì' | 'ï' | 'î' | 'Í' | 'Ì' | 'Ï' | 'Î' => 'I',
            'ó' | 'ò' | 'ö' | 'ô' | 'Ó' | 'Ò' | 'Ö' | 'Ô' => 'O',
            'ú' | 'ù' | 'ü' | 'û' | 'Ú' | 'Ù' | 'Ü' | 'Û' => 'U',
            'ñ' | 'Ñ' => 'N',
            '_' | '-' => ' ',
            other => other,
        };
        if ch.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.extend(ch.to_uppercase());
    }
    out
}

/// Require a non-blank string field, returning it trimmed.
pub(crate) fn required(field: &'static str, value: Option<&str>) -> Result<String, ValidationError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ValidationError::missing(field)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_label_strips_accents_and_case() {
        assert_eq!(fold_label("  Político "), "POLITICO");
        assert_eq!(fold_label("recursos_humanos"), "RECURSOS HUMANOS");
        assert_eq!(fold_label("Recursos   Humanos"), "RECURSOS HUMANOS");
        assert_eq!(fold_label("Logística"), "LOGISTICA");
    }

    #[test]
    fn required_rejects_blank() {
        assert!(required("actividad", Some("   ")).is_err());
        assert!(required("actividad", None).is_err());
        assert_eq!(required("actividad", Some(" x ")).unwrap(), "x");
    }
}
