use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::ValidationError;
use super::required;

/// Progress of a task. Any status may follow any other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Done,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [TaskStatus::Pending, TaskStatus::InProgress, TaskStatus::Done];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let key = raw.trim().to_lowercase();
        TaskStatus::ALL
            .iter()
            .copied()
            .find(|s| s.as_str() == key)
            .ok_or_else(|| ValidationError::not_in("estado", raw.trim(), &["pending", "in_progress", "done"]))
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inbound activity payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityInput {
    pub nombre: Option<String>,
    pub descripcion: Option<String>,
    pub responsable: Option<String>,
    pub fecha_inicio: Option<String>,
    pub fecha_fin: Option<String>,
}

/// Validated activity fields, shared by create and update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewActivity {
    pub nombre: String,
    pub descripcion: Option<String>,
    pub responsable: Option<String>,
    pub fecha_inicio: Option<NaiveDate>,
    pub fecha_fin: Option<NaiveDate>,
}

impl ActivityInput {
    pub fn validate(&self) -> Result<NewActivity, ValidationError> {
        let nombre = required("nombre", self.nombre.as_deref())?;
        let (fecha_inicio, fecha_fin) =
            date_range(self.fecha_inicio.as_deref(), self.fecha_fin.as_deref())?;
        Ok(NewActivity {
            nombre,
            descripcion: optional(self.descripcion.as_deref()),
            responsable: optional(self.responsable.as_deref()),
            fecha_inicio,
            fecha_fin,
        })
    }
}

/// Inbound task payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskInput {
    pub nombre: Option<String>,
    pub descripcion: Option<String>,
    pub responsable: Option<String>,
    pub fecha_inicio: Option<String>,
    pub fecha_fin: Option<String>,
    pub estado: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub nombre: String,
    pub descripcion: Option<String>,
    pub responsable: Option<String>,
    pub fecha_inicio: Option<NaiveDate>,
    pub fecha_fin: Option<NaiveDate>,
    pub estado: TaskStatus,
}

impl TaskInput {
    pub fn validate(&self) -> Result<NewTask, ValidationError> {
        let nombre = required("nombre", self.nombre.as_deref())?;
        let (fecha_inicio, fecha_fin) =
            date_range(self.fecha_inicio.as_deref(), self.fecha_fin.as_deref())?;
        let estado = match optional(self.estado.as_deref()) {
            Some(raw) => TaskStatus::parse(&raw)?,
            None => TaskStatus::default(),
        };
        Ok(NewTask {
            nombre,
            descripcion: optional(self.descripcion.as_deref()),
            responsable: optional(self.responsable.as_deref()),
            fecha_inicio,
            fecha_fin,
            estado,
        })
    }
}

fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub(crate) fn parse_date(field: &'static str, raw: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        ValidationError::new(
            field,
            format!("'{}' debe tener formato AAAA-MM-DD", field),
        )
    })
}

fn date_range(
    start: Option<&str>,
    end: Option<&str>,
) -> Result<(Option<NaiveDate>, Option<NaiveDate>), ValidationError> {
    let start = optional(start)
        .map(|raw| parse_date("fecha_inicio", &raw))
        .transpose()?;
    let end = optional(end)
        .map(|raw| parse_date("fecha_fin", &raw))
        .transpose()?;
    if let (Some(s), Some(e)) = (start, end) {
        if e < s {
            return Err(ValidationError::new(
                "fecha_fin",
                "La fecha de término no puede ser anterior a la de inicio",
            ));
        }
    }
    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_wire_names() {
        for status in TaskStatus::ALL {
            assert_eq!(TaskStatus::parse(status.as_str()).unwrap(), status);
        }
        assert_eq!(TaskStatus::parse("blocked").unwrap_err().field, "estado");
    }

    #[test]
    fn task_defaults_to_pending() {
        let task = TaskInput {
            nombre: Some("Levantar línea base".to_string()),
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert_eq!(task.estado, TaskStatus::Pending);
        assert!(task.fecha_inicio.is_none());
    }

    #[test]
    fn activity_dates_must_be_ordered() {
        let input = ActivityInput {
            nombre: Some("Taller".to_string()),
            fecha_inicio: Some("2024-05-10".to_string()),
            fecha_fin: Some("2024-05-01".to_string()),
            ..Default::default()
        };
        assert_eq!(input.validate().unwrap_err().field, "fecha_fin");

        let input = ActivityInput {
            nombre: Some("Taller".to_string()),
            fecha_inicio: Some("10/05/2024".to_string()),
            ..Default::default()
        };
        assert_eq!(input.validate().unwrap_err().field, "fecha_inicio");
    }
}
