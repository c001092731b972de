use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::state::models::{CountDimension, EntityCounts};
use crate::state::StoreBackend;

/// Strategies without an axis are grouped under this key.
pub const NO_AXIS: &str = "sin_eje";

/// Body of `/api/admin/estadisticas`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub totales: EntityCounts,
    pub aspectos_por_fuente: BTreeMap<String, u64>,
    pub aspectos_por_bloque: BTreeMap<String, u64>,
    pub estrategias_por_cruce: BTreeMap<String, u64>,
    pub estrategias_por_eje: BTreeMap<String, u64>,
    pub tareas_por_estado: BTreeMap<String, u64>,
    pub usuarios_por_rol: BTreeMap<String, u64>,
}

pub async fn collect(store: &dyn StoreBackend) -> Result<Statistics> {
    let mut estrategias_por_eje = grouped(store, CountDimension::StrategyAxis).await?;
    if let Some(n) = estrategias_por_eje.remove("") {
        *estrategias_por_eje.entry(NO_AXIS.to_string()).or_default() += n;
    }

    Ok(Statistics {
        totales: store.counts().await?,
        aspectos_por_fuente: grouped(store, CountDimension::AspectSource).await?,
        aspectos_por_bloque: grouped(store, CountDimension::AspectBlock).await?,
        estrategias_por_cruce: grouped(store, CountDimension::StrategyCrossType).await?,
        estrategias_por_eje,
        tareas_por_estado: grouped(store, CountDimension::TaskStatus).await?,
        usuarios_por_rol: grouped(store, CountDimension::UserRole).await?,
    })
}

async fn grouped(store: &dyn StoreBackend, dimension: CountDimension) -> Result<BTreeMap<String, u64>> {
    Ok(store.group_counts(dimension).await?.into_iter().collect())
}
