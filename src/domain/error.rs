use thiserror::Error;

/// A rejected inbound field. `field` is the wire name of the offending key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }

    pub fn missing(field: &'static str) -> Self {
        Self::new(field, format!("El campo '{}' es obligatorio", field))
    }

    pub fn not_in(field: &'static str, value: &str, allowed: &[&str]) -> Self {
        Self::new(
            field,
            format!(
                "Valor '{}' no válido para '{}'. Valores permitidos: {}",
                value,
                field,
                allowed.join(", ")
            ),
        )
    }
}
