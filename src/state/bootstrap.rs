use anyhow::Result;
use serde::Serialize;

use super::backend::StoreBackend;
use super::models::AppliedMigration;
use crate::auth::hash_password;
use crate::config::AppConfig;
use crate::domain::{AspectEntry, Role};
use crate::retry::with_retry;

/// Accounts created on first start. Each password equals its username and is
/// meant to be changed after deployment.
pub const DEFAULT_USERS: &[(&str, Role)] = &[
    ("MINERA.ADMIN", Role::Admin),
    ("ANDRES", Role::Admin),
    ("RICARDO", Role::Admin),
    ("ALEJANDRO", Role::Admin),
    ("Minera1", Role::User),
    ("Minera2", Role::User),
    ("Minera3", Role::User),
    ("Minera4", Role::User),
    ("Minera5", Role::User),
];

/// `(actividad, bloque, aspecto)` sample canvas records.
const SAMPLE_ASPECTS: &[(&str, &str, &str)] = &[
    (
        "Perforación de roca",
        "Emisión atmosférica",
        "Generación de polvo en suspensión (Perforadora, voladura)",
    ),
    (
        "Transporte de material",
        "Consumo de recursos",
        "Consumo de combustible diesel (Camiones, maquinaria)",
    ),
    (
        "Procesamiento de mineral",
        "Generación de residuos",
        "Producción de relaves (Planta concentradora)",
    ),
    (
        "Manejo de químicos",
        "Riesgo de contaminación",
        "Derrames de reactivos químicos (Área de almacenamiento)",
    ),
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub users_created: u32,
    pub aspects_created: u32,
}

/// Create the default accounts and sample records that do not exist yet.
pub async fn seed_defaults(store: &dyn StoreBackend) -> Result<SeedReport> {
    let mut report = SeedReport::default();

    for (username, role) in DEFAULT_USERS {
        if store.get_user_by_username(username).await?.is_some() {
            continue;
        }
        let hash = hash_password(username)?;
        store.create_user(username, &hash, *role).await?;
        tracing::info!(username, role = %role, "Created default user");
        report.users_created += 1;
    }

    for (actividad, bloque, aspecto) in SAMPLE_ASPECTS {
        if store.aspect_exists(actividad, aspecto).await? {
            continue;
        }
        let entry = AspectEntry::Canva {
            actividad: actividad.to_string(),
            bloque: bloque.to_string(),
            aspecto: aspecto.to_string(),
        };
        store.insert_aspect(&entry, None).await?;
        report.aspects_created += 1;
    }

    if report.users_created > 0 || report.aspects_created > 0 {
        tracing::info!(
            users = report.users_created,
            aspects = report.aspects_created,
            "Seeded default data"
        );
    }
    Ok(report)
}

/// Migrate and seed according to `config`, retrying the whole sequence a
/// fixed number of times while the database comes up.
pub async fn initialize(store: &dyn StoreBackend, config: &AppConfig) -> Result<Vec<AppliedMigration>> {
    with_retry(
        config.startup_retries,
        config.retry_delay,
        "database initialization",
        || initialize_once(store, config),
    )
    .await
}

async fn initialize_once(store: &dyn StoreBackend, config: &AppConfig) -> Result<Vec<AppliedMigration>> {
    let applied = if config.auto_migrate {
        store.migrate().await?
    } else {
        Vec::new()
    };
    if config.seed {
        seed_defaults(store).await?;
    }
    Ok(applied)
}
