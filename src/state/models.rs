use serde::{Deserialize, Serialize};

use crate::domain::{CrossType, ElementKind, Role, Source, TaskStatus};

// ─── Users ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(rename = "rol")]
    pub role: Role,
    pub created_at: String,
}

// ─── Aspect records ─────────────────────────────────────────────────────────

/// A row of `aspectos_ambientales`, whatever its source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AspectRecord {
    pub id: i64,
    pub actividad: String,
    pub tipo: String,
    pub aspecto: String,
    pub fuente: Source,
    pub bloque: String,
    pub created_at: String,
    pub updated_at: String,
    pub created_by: Option<i64>,
}

/// One page of a filtered aspect query.
#[derive(Debug, Clone, Serialize)]
pub struct AspectPage {
    pub items: Vec<AspectRecord>,
    pub total: u64,
}

// ─── Cross-strategies ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrategyRecord {
    pub id: i64,
    pub tipo_cruce: CrossType,
    pub interno_id: i64,
    pub interno_tipo: ElementKind,
    pub interno_texto: String,
    pub externo_id: i64,
    pub externo_tipo: ElementKind,
    pub externo_texto: String,
    pub estrategia: String,
    pub eje_id: Option<String>,
    pub eje_label: Option<String>,
    pub created_at: String,
    pub created_by: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct StrategyFilter {
    pub tipo_cruce: Option<CrossType>,
    pub eje_id: Option<String>,
}

// ─── Activities and tasks ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityRecord {
    pub id: i64,
    pub estrategia_id: i64,
    pub nombre: String,
    pub descripcion: Option<String>,
    pub responsable: Option<String>,
    pub fecha_inicio: Option<String>,
    pub fecha_fin: Option<String>,
    pub created_at: String,
    pub created_by: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskRecord {
    pub id: i64,
    pub actividad_id: i64,
    pub nombre: String,
    pub descripcion: Option<String>,
    pub responsable: Option<String>,
    pub fecha_inicio: Option<String>,
    pub fecha_fin: Option<String>,
    pub estado: TaskStatus,
    pub created_at: String,
    pub created_by: Option<i64>,
}

// ─── Health and statistics ──────────────────────────────────────────────────

/// Row counts per tracked entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EntityCounts {
    pub usuarios: u64,
    pub aspectos: u64,
    pub estrategias: u64,
    pub actividades: u64,
    pub tareas: u64,
}

/// A column the statistics endpoint may group by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountDimension {
    AspectSource,
    AspectBlock,
    StrategyCrossType,
    StrategyAxis,
    TaskStatus,
    UserRole,
}

impl CountDimension {
    /// `(table, column)` behind the dimension.
    pub fn table_column(&self) -> (&'static str, &'static str) {
        match self {
            CountDimension::AspectSource => ("aspectos_ambientales", "fuente"),
            CountDimension::AspectBlock => ("aspectos_ambientales", "bloque"),
            CountDimension::StrategyCrossType => ("estrategias_foda", "tipo_cruce"),
            CountDimension::StrategyAxis => ("estrategias_foda", "eje_id"),
            CountDimension::TaskStatus => ("tareas", "estado"),
            CountDimension::UserRole => ("usuarios", "rol"),
        }
    }
}

// ─── Migrations ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedMigration {
    pub version: i32,
    pub name: String,
    pub applied_at: String,
}

/// Current UTC time in the persisted timestamp format.
pub fn now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}
