//! Versioned schema of the planning database.
//!
//! Migrations are applied in order and recorded in `schema_migrations`. Every
//! statement is written for both dialects; timestamps are TEXT (RFC 3339, UTC)
//! so ordering and range filters behave the same on SQLite and PostgreSQL.

/// A column that an `EnsureColumns` step adds when the live table lacks it.
#[derive(Debug)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub sqlite_type: &'static str,
    pub postgres_type: &'static str,
}

#[derive(Debug)]
pub enum Step {
    Sql {
        sqlite: &'static str,
        postgres: &'static str,
    },
    /// Introspect the table and add only the missing columns. Lets databases
    /// built by the old column-probing bootstrap be adopted as-is.
    EnsureColumns {
        table: &'static str,
        columns: &'static [ColumnSpec],
    },
}

#[derive(Debug)]
pub struct Migration {
    pub version: i32,
    pub name: &'static str,
    pub steps: &'static [Step],
}

pub const MIGRATIONS_TABLE_SQLITE: &str = "
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL
);
";

pub const MIGRATIONS_TABLE_POSTGRES: &str = "
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL
)
";

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "usuarios_y_aspectos",
        steps: &[
            Step::Sql {
                sqlite: "
CREATE TABLE IF NOT EXISTS usuarios (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    password TEXT NOT NULL,
    rol TEXT NOT NULL DEFAULT 'user',
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS aspectos_ambientales (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    actividad TEXT NOT NULL,
    tipo TEXT NOT NULL,
    aspecto TEXT NOT NULL,
    fuente TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    created_by INTEGER REFERENCES usuarios(id) ON DELETE SET NULL
);
",
                postgres: "
CREATE TABLE IF NOT EXISTS usuarios (
    id BIGSERIAL PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    password TEXT NOT NULL,
    rol TEXT NOT NULL DEFAULT 'user',
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS aspectos_ambientales (
    id BIGSERIAL PRIMARY KEY,
    actividad TEXT NOT NULL,
    tipo TEXT NOT NULL,
    aspecto TEXT NOT NULL,
    fuente TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    created_by BIGINT REFERENCES usuarios(id) ON DELETE SET NULL
);
",
            },
        ],
    },
    Migration {
        version: 2,
        name: "aspectos_bloque",
        steps: &[
            Step::EnsureColumns {
                table: "aspectos_ambientales",
                columns: &[ColumnSpec {
                    name: "bloque",
                    sqlite_type: "TEXT NOT NULL DEFAULT ''",
                    postgres_type: "TEXT NOT NULL DEFAULT ''",
                }],
            },
            Step::Sql {
                sqlite: LEGACY_NULL_TIMESTAMPS,
                postgres: LEGACY_TIMESTAMPS_POSTGRES,
            },
            Step::Sql {
                sqlite: LEGACY_FUENTE,
                postgres: LEGACY_FUENTE,
            },
            Step::Sql {
                sqlite: BACKFILL_BLOQUE,
                postgres: BACKFILL_BLOQUE,
            },
        ],
    },
    Migration {
        version: 3,
        name: "estrategias_foda",
        steps: &[Step::Sql {
            sqlite: "
CREATE TABLE IF NOT EXISTS estrategias_foda (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    tipo_cruce TEXT NOT NULL,
    interno_id INTEGER NOT NULL,
    interno_tipo TEXT NOT NULL,
    interno_texto TEXT NOT NULL,
    externo_id INTEGER NOT NULL,
    externo_tipo TEXT NOT NULL,
    externo_texto TEXT NOT NULL,
    estrategia TEXT NOT NULL,
    created_at TEXT NOT NULL,
    created_by INTEGER REFERENCES usuarios(id) ON DELETE SET NULL
);
",
            postgres: "
CREATE TABLE IF NOT EXISTS estrategias_foda (
    id BIGSERIAL PRIMARY KEY,
    tipo_cruce TEXT NOT NULL,
    interno_id BIGINT NOT NULL,
    interno_tipo TEXT NOT NULL,
    interno_texto TEXT NOT NULL,
    externo_id BIGINT NOT NULL,
    externo_tipo TEXT NOT NULL,
    externo_texto TEXT NOT NULL,
    estrategia TEXT NOT NULL,
    created_at TEXT NOT NULL,
    created_by BIGINT REFERENCES usuarios(id) ON DELETE SET NULL
);
",
        }],
    },
    Migration {
        version: 4,
        name: "estrategias_eje",
        steps: &[Step::EnsureColumns {
            table: "estrategias_foda",
            columns: &[
                ColumnSpec {
                    name: "eje_id",
                    sqlite_type: "TEXT",
                    postgres_type: "TEXT",
                },
                ColumnSpec {
                    name: "eje_label",
                    sqlite_type: "TEXT",
                    postgres_type: "TEXT",
                },
            ],
        }],
    },
    Migration {
        version: 5,
        name: "actividades_y_tareas",
        steps: &[Step::Sql {
            sqlite: "
CREATE TABLE IF NOT EXISTS actividades (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    estrategia_id INTEGER NOT NULL REFERENCES estrategias_foda(id) ON DELETE CASCADE,
    nombre TEXT NOT NULL,
    descripcion TEXT,
    responsable TEXT,
    fecha_inicio TEXT,
    fecha_fin TEXT,
    created_at TEXT NOT NULL,
    created_by INTEGER REFERENCES usuarios(id) ON DELETE SET NULL
);
CREATE TABLE IF NOT EXISTS tareas (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    actividad_id INTEGER NOT NULL REFERENCES actividades(id) ON DELETE CASCADE,
    nombre TEXT NOT NULL,
    descripcion TEXT,
    responsable TEXT,
    fecha_inicio TEXT,
    fecha_fin TEXT,
    estado TEXT NOT NULL DEFAULT 'pending',
    created_at TEXT NOT NULL,
    created_by INTEGER REFERENCES usuarios(id) ON DELETE SET NULL
);
",
            postgres: "
CREATE TABLE IF NOT EXISTS actividades (
    id BIGSERIAL PRIMARY KEY,
    estrategia_id BIGINT NOT NULL REFERENCES estrategias_foda(id) ON DELETE CASCADE,
    nombre TEXT NOT NULL,
    descripcion TEXT,
    responsable TEXT,
    fecha_inicio TEXT,
    fecha_fin TEXT,
    created_at TEXT NOT NULL,
    created_by BIGINT REFERENCES usuarios(id) ON DELETE SET NULL
);
CREATE TABLE IF NOT EXISTS tareas (
    id BIGSERIAL PRIMARY KEY,
    actividad_id BIGINT NOT NULL REFERENCES actividades(id) ON DELETE CASCADE,
    nombre TEXT NOT NULL,
    descripcion TEXT,
    responsable TEXT,
    fecha_inicio TEXT,
    fecha_fin TEXT,
    estado TEXT NOT NULL DEFAULT 'pending',
    created_at TEXT NOT NULL,
    created_by BIGINT REFERENCES usuarios(id) ON DELETE SET NULL
);
",
        }],
    },
    Migration {
        version: 6,
        name: "indices",
        steps: &[Step::Sql {
            sqlite: INDEXES_SQL,
            postgres: INDEXES_SQL,
        }],
    },
];

// Tables created by the ORM-era bootstrap allowed NULL timestamps.
const LEGACY_NULL_TIMESTAMPS: &str = "
UPDATE usuarios SET created_at = '1970-01-01T00:00:00Z' WHERE created_at IS NULL;
UPDATE aspectos_ambientales SET created_at = '1970-01-01T00:00:00Z' WHERE created_at IS NULL;
UPDATE aspectos_ambientales SET updated_at = created_at WHERE updated_at IS NULL;
";

// Same, plus native INTEGER/TIMESTAMP columns are widened to the BIGINT/TEXT
// types the rest of the schema uses.
const LEGACY_TIMESTAMPS_POSTGRES: &str = "
ALTER TABLE usuarios ALTER COLUMN id TYPE BIGINT;
ALTER TABLE aspectos_ambientales ALTER COLUMN id TYPE BIGINT;
ALTER TABLE aspectos_ambientales ALTER COLUMN created_by TYPE BIGINT;
ALTER TABLE usuarios ALTER COLUMN created_at TYPE TEXT USING created_at::text;
ALTER TABLE aspectos_ambientales ALTER COLUMN created_at TYPE TEXT USING created_at::text;
ALTER TABLE aspectos_ambientales ALTER COLUMN updated_at TYPE TEXT USING updated_at::text;
UPDATE usuarios SET created_at = '1970-01-01T00:00:00Z' WHERE created_at IS NULL;
UPDATE aspectos_ambientales SET created_at = '1970-01-01T00:00:00Z' WHERE created_at IS NULL;
UPDATE aspectos_ambientales SET updated_at = created_at WHERE updated_at IS NULL;
";

// Early deployments stored free text in `fuente`; keep it in the aspect text
// and file those rows under the canvas.
const LEGACY_FUENTE: &str = "
UPDATE aspectos_ambientales
SET aspecto = aspecto || ' (' || fuente || ')', fuente = 'canva'
WHERE fuente NOT IN ('foda_ext', 'foda_int', 'canva');
";

const BACKFILL_BLOQUE: &str = "
UPDATE aspectos_ambientales SET bloque = CASE
    WHEN fuente = 'foda_ext' AND tipo = 'Positivo' THEN 'oportunidad'
    WHEN fuente = 'foda_ext' AND tipo = 'Negativo' THEN 'amenaza'
    WHEN fuente = 'foda_int' AND tipo = 'Positivo' THEN 'fortaleza'
    WHEN fuente = 'foda_int' AND tipo = 'Negativo' THEN 'debilidad'
    ELSE tipo
END
WHERE bloque = '';
";

const INDEXES_SQL: &str = "
CREATE INDEX IF NOT EXISTS idx_aspectos_fuente ON aspectos_ambientales(fuente);
CREATE INDEX IF NOT EXISTS idx_aspectos_created_at ON aspectos_ambientales(created_at);
CREATE INDEX IF NOT EXISTS idx_estrategias_tipo_cruce ON estrategias_foda(tipo_cruce);
CREATE INDEX IF NOT EXISTS idx_actividades_estrategia ON actividades(estrategia_id);
CREATE INDEX IF NOT EXISTS idx_tareas_actividad ON tareas(actividad_id);
";

/// Highest version known to this build.
pub fn latest_version() -> i32 {
    MIGRATIONS.iter().map(|m| m.version).max().unwrap_or(0)
}

/// Split a multi-statement script for drivers that run one statement at a time.
pub fn statements(sql: &str) -> impl Iterator<Item = &str> {
    sql.split(';').map(str::trim).filter(|s| !s.is_empty())
}
