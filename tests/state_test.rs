use foda_planner::domain::aspect::{InternalArea, PestleCategory, Polarity};
use foda_planner::domain::{
    ActivityInput, AspectEntry, CrossType, Role, Source, StrategyInput, TaskInput, TaskStatus,
};
use foda_planner::state::bootstrap::seed_defaults;
use foda_planner::state::models::{CountDimension, StrategyFilter};
use foda_planner::state::query::{AspectQuery, Pagination, SortKey};
use foda_planner::state::{SqliteStore, StoreBackend};
use serde_json::json;
use tempfile::TempDir;

async fn create_test_store() -> (TempDir, SqliteStore) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.db");
    let store = SqliteStore::open(path.to_str().unwrap()).unwrap();
    store.migrate().await.unwrap();
    (dir, store)
}

fn foda_ext(actividad: &str, polaridad: Polarity, categoria: PestleCategory) -> AspectEntry {
    AspectEntry::FodaExterno {
        actividad: actividad.to_string(),
        polaridad,
        categoria,
    }
}

fn canva(actividad: &str, bloque: &str, aspecto: &str) -> AspectEntry {
    AspectEntry::Canva {
        actividad: actividad.to_string(),
        bloque: bloque.to_string(),
        aspecto: aspecto.to_string(),
    }
}

fn strategy_input(interno_id: i64, externo_id: i64) -> StrategyInput {
    serde_json::from_value(json!({
        "tipo_cruce": "FO",
        "interno_id": interno_id,
        "interno_tipo": "fortaleza",
        "interno_texto": "Personal calificado",
        "externo_id": externo_id,
        "externo_tipo": "oportunidad",
        "externo_texto": "Alza del precio del cobre",
        "estrategia": "Ampliar turnos de la planta concentradora",
        "eje_id": "EMPLEO"
    }))
    .unwrap()
}

#[tokio::test]
async fn test_migrate_is_idempotent() {
    let (_dir, store) = create_test_store().await;

    let applied = store.applied_migrations().await.unwrap();
    assert!(!applied.is_empty());
    let versions: Vec<i32> = applied.iter().map(|m| m.version).collect();
    let mut sorted = versions.clone();
    sorted.sort();
    assert_eq!(versions, sorted);

    // Second run applies nothing
    assert!(store.migrate().await.unwrap().is_empty());
    assert_eq!(store.applied_migrations().await.unwrap().len(), applied.len());
}

#[tokio::test]
async fn test_counts_fail_before_migration() {
    let store = SqliteStore::open_memory().unwrap();
    assert!(store.counts().await.is_err());

    store.migrate().await.unwrap();
    let counts = store.counts().await.unwrap();
    assert_eq!(counts.usuarios, 0);
    assert_eq!(counts.aspectos, 0);
}

#[tokio::test]
async fn test_user_roundtrip() {
    let (_dir, store) = create_test_store().await;

    let id = store.create_user("Minera1", "hash", Role::User).await.unwrap();
    let user = store.get_user(id).await.unwrap().unwrap();
    assert_eq!(user.username, "Minera1");
    assert_eq!(user.role, Role::User);

    let by_name = store.get_user_by_username("Minera1").await.unwrap().unwrap();
    assert_eq!(by_name.id, id);
    assert!(store.get_user_by_username("nadie").await.unwrap().is_none());

    // Usernames are unique
    assert!(store.create_user("Minera1", "hash", Role::Admin).await.is_err());
}

#[tokio::test]
async fn test_aspect_crud() {
    let (_dir, store) = create_test_store().await;
    let user = store.create_user("Minera1", "hash", Role::User).await.unwrap();

    let id = store
        .insert_aspect(
            &foda_ext("Permisología", Polarity::Negativo, PestleCategory::Legal),
            Some(user),
        )
        .await
        .unwrap();

    let record = store.get_aspect(id).await.unwrap().unwrap();
    assert_eq!(record.fuente, Source::FodaExt);
    assert_eq!(record.tipo, "Negativo");
    assert_eq!(record.aspecto, "LEGAL");
    assert_eq!(record.bloque, "amenaza");
    assert_eq!(record.created_by, Some(user));
    assert!(store.aspect_exists("Permisología", "LEGAL").await.unwrap());

    let updated = store
        .update_aspect(
            id,
            &foda_ext("Permisología", Polarity::Positivo, PestleCategory::Politico),
        )
        .await
        .unwrap();
    assert!(updated);
    let record = store.get_aspect(id).await.unwrap().unwrap();
    assert_eq!(record.tipo, "Positivo");
    assert_eq!(record.bloque, "oportunidad");

    assert!(store.delete_aspect(id).await.unwrap());
    assert!(store.get_aspect(id).await.unwrap().is_none());

    // Missing ids report false instead of failing
    assert!(!store.delete_aspect(id).await.unwrap());
    assert!(!store
        .update_aspect(id, &canva("x", "y", "z"))
        .await
        .unwrap());
}

#[tokio::test]
async fn test_list_aspects_by_source_ordered_by_activity() {
    let (_dir, store) = create_test_store().await;

    store.insert_aspect(&canva("Voladura", "Emisión", "Ruido"), None).await.unwrap();
    store.insert_aspect(&canva("Chancado", "Emisión", "Polvo"), None).await.unwrap();
    store
        .insert_aspect(
            &AspectEntry::FodaInterno {
                actividad: "Gestión".to_string(),
                polaridad: Polarity::Positivo,
                area: InternalArea::Seguridad,
            },
            None,
        )
        .await
        .unwrap();

    let canvas = store.list_aspects(Some(Source::Canva)).await.unwrap();
    let actividades: Vec<&str> = canvas.iter().map(|r| r.actividad.as_str()).collect();
    assert_eq!(actividades, vec!["Chancado", "Voladura"]);

    assert_eq!(store.list_aspects(None).await.unwrap().len(), 3);
    assert_eq!(store.list_aspects(Some(Source::FodaInt)).await.unwrap().len(), 1);
    assert_eq!(store.recent_aspects(2).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_bulk_insert_returns_ids() {
    let (_dir, store) = create_test_store().await;

    let ids = store
        .insert_aspects(
            &[
                canva("Perforación", "Emisión atmosférica", "Polvo"),
                canva("Transporte", "Consumo de recursos", "Diesel"),
            ],
            None,
        )
        .await
        .unwrap();
    assert_eq!(ids.len(), 2);
    assert_eq!(store.counts().await.unwrap().aspectos, 2);
}

#[tokio::test]
async fn test_query_aspects_filters_and_paginates() {
    let (_dir, store) = create_test_store().await;

    for i in 0..5 {
        store
            .insert_aspect(&canva(&format!("Actividad {}", i), "Residuos", "Relaves"), None)
            .await
            .unwrap();
    }
    store
        .insert_aspect(
            &foda_ext("Mercado", Polarity::Positivo, PestleCategory::Economico),
            None,
        )
        .await
        .unwrap();

    let query = AspectQuery {
        fuente: Some(Source::Canva),
        orden: SortKey::Actividad,
        pagination: Some(Pagination { page: 2, per_page: 2 }),
        ..Default::default()
    };
    let page = store.query_aspects(&query).await.unwrap();
    assert_eq!(page.total, 5);
    let actividades: Vec<&str> = page.items.iter().map(|r| r.actividad.as_str()).collect();
    assert_eq!(actividades, vec!["Actividad 2", "Actividad 3"]);

    let text = AspectQuery {
        q: Some("merc".to_string()),
        ..Default::default()
    };
    let page = store.query_aspects(&text).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].actividad, "Mercado");
}

#[tokio::test]
async fn test_query_aspects_folds_accented_capitals() {
    let (_dir, store) = create_test_store().await;

    store
        .insert_aspect(
            &canva("Mantención", "Emisión", "Derrames (Área de almacenamiento)"),
            None,
        )
        .await
        .unwrap();

    for term in ["área", "Área", "ÁREA", "almacenamiento"] {
        let query = AspectQuery {
            q: Some(term.to_string()),
            ..Default::default()
        };
        let page = store.query_aspects(&query).await.unwrap();
        assert_eq!(page.total, 1, "search term {:?}", term);
    }

    let by_block = AspectQuery {
        bloque: Some("EMISIÓN".to_string()),
        ..Default::default()
    };
    assert_eq!(store.query_aspects(&by_block).await.unwrap().total, 1);
}

#[tokio::test]
async fn test_strategy_delete_cascades_to_plan() {
    let (_dir, store) = create_test_store().await;

    let strategy = strategy_input(1, 2).validate(false).unwrap();
    let strategy_id = store.insert_strategy(&strategy, None).await.unwrap();

    let record = store.get_strategy(strategy_id).await.unwrap().unwrap();
    assert_eq!(record.tipo_cruce, CrossType::Fo);
    assert_eq!(record.eje_id.as_deref(), Some("EMPLEO"));

    let activity = ActivityInput {
        nombre: Some("Contratar operadores".to_string()),
        fecha_inicio: Some("2024-03-01".to_string()),
        fecha_fin: Some("2024-06-30".to_string()),
        ..Default::default()
    }
    .validate()
    .unwrap();
    let activity_id = store.insert_activity(strategy_id, &activity, None).await.unwrap();

    let task = TaskInput {
        nombre: Some("Publicar avisos".to_string()),
        ..Default::default()
    }
    .validate()
    .unwrap();
    let task_id = store.insert_task(activity_id, &task, None).await.unwrap();
    assert_eq!(
        store.get_task(task_id).await.unwrap().unwrap().estado,
        TaskStatus::Pending
    );

    assert!(store.delete_strategy(strategy_id).await.unwrap());
    assert!(store.get_activity(activity_id).await.unwrap().is_none());
    assert!(store.get_task(task_id).await.unwrap().is_none());
    assert_eq!(store.counts().await.unwrap().tareas, 0);
}

#[tokio::test]
async fn test_activity_delete_cascades_to_tasks() {
    let (_dir, store) = create_test_store().await;

    let strategy_id = store
        .insert_strategy(&strategy_input(1, 2).validate(false).unwrap(), None)
        .await
        .unwrap();
    let activity = ActivityInput {
        nombre: Some("Capacitación".to_string()),
        ..Default::default()
    }
    .validate()
    .unwrap();
    let activity_id = store.insert_activity(strategy_id, &activity, None).await.unwrap();
    let task = TaskInput {
        nombre: Some("Reservar sala".to_string()),
        ..Default::default()
    }
    .validate()
    .unwrap();
    let task_id = store.insert_task(activity_id, &task, None).await.unwrap();

    // Any transition is allowed, including back to pending
    assert!(store.set_task_status(task_id, TaskStatus::Done).await.unwrap());
    assert!(store.set_task_status(task_id, TaskStatus::Pending).await.unwrap());

    assert!(store.delete_activity(activity_id).await.unwrap());
    assert!(store.get_task(task_id).await.unwrap().is_none());
    assert!(store.get_strategy(strategy_id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_list_strategies_filters() {
    let (_dir, store) = create_test_store().await;

    store
        .insert_strategy(&strategy_input(1, 2).validate(false).unwrap(), None)
        .await
        .unwrap();
    let mut no_axis = strategy_input(3, 4);
    no_axis.eje_id = None;
    store
        .insert_strategy(&no_axis.validate(false).unwrap(), None)
        .await
        .unwrap();

    let all = store.list_strategies(&StrategyFilter::default()).await.unwrap();
    assert_eq!(all.len(), 2);

    let empleo = store
        .list_strategies(&StrategyFilter {
            eje_id: Some("EMPLEO".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(empleo.len(), 1);

    let da = store
        .list_strategies(&StrategyFilter {
            tipo_cruce: Some(CrossType::Da),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(da.is_empty());

    let by_axis = store.group_counts(CountDimension::StrategyAxis).await.unwrap();
    assert!(by_axis.contains(&("EMPLEO".to_string(), 1)));
}

#[tokio::test]
async fn test_seed_defaults_is_idempotent() {
    let (_dir, store) = create_test_store().await;

    let first = seed_defaults(&store).await.unwrap();
    assert!(first.users_created > 0);
    assert!(first.aspects_created > 0);

    let second = seed_defaults(&store).await.unwrap();
    assert_eq!(second.users_created, 0);
    assert_eq!(second.aspects_created, 0);

    let admin = store.get_user_by_username("MINERA.ADMIN").await.unwrap().unwrap();
    assert_eq!(admin.role, Role::Admin);
}

#[tokio::test]
async fn test_adopts_legacy_tables() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("legacy.db");

    // Tables as the previous application created them: no bloque column,
    // nullable timestamps and free-text fuente values.
    {
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute_batch(
            "
CREATE TABLE usuarios (
    id INTEGER PRIMARY KEY,
    username VARCHAR(80) NOT NULL UNIQUE,
    password VARCHAR(200) NOT NULL,
    rol VARCHAR(20) NOT NULL,
    created_at DATETIME
);
CREATE TABLE aspectos_ambientales (
    id INTEGER PRIMARY KEY,
    actividad VARCHAR(200) NOT NULL,
    tipo VARCHAR(100) NOT NULL,
    aspecto TEXT NOT NULL,
    fuente VARCHAR(200) NOT NULL,
    created_at DATETIME,
    updated_at DATETIME,
    created_by INTEGER REFERENCES usuarios(id)
);
INSERT INTO usuarios (username, password, rol) VALUES ('Minera1', 'pbkdf2:sha256:legacy', 'user');
INSERT INTO aspectos_ambientales (actividad, tipo, aspecto, fuente, created_by)
VALUES ('Perforación de roca', 'Emisión atmosférica', 'Generación de polvo', 'Perforadora', 1);
INSERT INTO aspectos_ambientales (actividad, tipo, aspecto, fuente, created_at, updated_at)
VALUES ('Mercado', 'Positivo', 'ECONOMICO', 'foda_ext', '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z');
",
        )
        .unwrap();
    }

    let store = SqliteStore::open(path.to_str().unwrap()).unwrap();
    store.migrate().await.unwrap();

    let legacy = store.get_aspect(1).await.unwrap().unwrap();
    assert_eq!(legacy.fuente, Source::Canva);
    assert_eq!(legacy.aspecto, "Generación de polvo (Perforadora)");
    assert_eq!(legacy.bloque, "Emisión atmosférica");
    assert_eq!(legacy.created_at, "1970-01-01T00:00:00Z");
    assert_eq!(legacy.created_by, Some(1));

    let foda = store.get_aspect(2).await.unwrap().unwrap();
    assert_eq!(foda.bloque, "oportunidad");

    let user = store.get_user_by_username("Minera1").await.unwrap().unwrap();
    assert_eq!(user.role, Role::User);

    // New tables exist alongside the adopted ones
    assert_eq!(store.counts().await.unwrap().estrategias, 0);
}
