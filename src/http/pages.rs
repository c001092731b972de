//! Server-rendered HTML. Every interpolated value goes through [`escape`].

use axum::http::StatusCode;
use axum::response::Html;

use crate::auth::Session;
use crate::domain::aspect::{InternalArea, Labelled, PestleCategory, Polarity};
use crate::domain::{AspectInput, Source, StrategicAxis, ValidationError};
use crate::state::bootstrap::SeedReport;
use crate::state::models::{AppliedMigration, AspectRecord, EntityCounts, StrategyRecord, User};

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn layout(title: &str, session: Option<&Session>, content: &str) -> Html<String> {
    let nav = match session {
        Some(s) => {
            let admin_link = if s.rol.is_admin() {
                r#"<a href="/admin">Administración</a>"#
            } else {
                ""
            };
            format!(
                r#"<nav><a href="/inicio">Inicio</a> <a href="/aspectos">Aspectos</a> <a href="/fodaext">FODA externo</a> <a href="/fodaint">FODA interno</a> <a href="/canvas">CANVA</a> <a href="/cruzado">Cruce TOWS</a> {} <span>{} ({})</span> <a href="/logout">Salir</a></nav>"#,
                admin_link,
                escape(&s.username),
                s.rol
            )
        }
        None => String::new(),
    };
    Html(format!(
        r#"<!DOCTYPE html>
<html lang="es">
<head>
<meta charset="utf-8">
<title>{title} · Planificación estratégica</title>
<style>
body {{ font-family: sans-serif; margin: 2rem; }}
nav a, nav span {{ margin-right: 0.8rem; }}
table {{ border-collapse: collapse; margin-top: 1rem; }}
th, td {{ border: 1px solid #ccc; padding: 0.3rem 0.6rem; text-align: left; }}
.error {{ color: #a00; }}
</style>
</head>
<body>
{nav}
<h1>{title}</h1>
{content}
</body>
</html>"#,
        title = escape(title),
        nav = nav,
        content = content,
    ))
}

fn aspect_rows(records: &[AspectRecord], session: Option<&Session>) -> String {
    if records.is_empty() {
        return "<p>No hay registros.</p>".to_string();
    }
    let mut rows = String::new();
    for r in records {
        let actions = match session {
            Some(s) if s.may_modify(r.created_by) => format!(
                r#"<a href="/aspectos/{id}/editar">Editar</a>
<form method="post" action="/aspectos/{id}/eliminar" style="display:inline"><button type="submit">Eliminar</button></form>"#,
                id = r.id
            ),
            _ => String::new(),
        };
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            r.id,
            escape(&r.actividad),
            escape(&r.tipo),
            escape(&r.aspecto),
            r.fuente,
            escape(&r.bloque),
            escape(&r.created_at),
            actions
        ));
    }
    format!(
        "<table>\n<tr><th>ID</th><th>Actividad</th><th>Tipo</th><th>Aspecto</th><th>Fuente</th><th>Bloque</th><th>Creado</th><th></th></tr>\n{}</table>",
        rows
    )
}

fn counts_list(counts: &EntityCounts) -> String {
    format!(
        "<ul><li>Usuarios: {}</li><li>Aspectos: {}</li><li>Estrategias: {}</li><li>Actividades: {}</li><li>Tareas: {}</li></ul>",
        counts.usuarios, counts.aspectos, counts.estrategias, counts.actividades, counts.tareas
    )
}

pub fn login_page(error: Option<&str>) -> Html<String> {
    let error = error
        .map(|e| format!(r#"<p class="error">{}</p>"#, escape(e)))
        .unwrap_or_default();
    layout(
        "Iniciar sesión",
        None,
        &format!(
            r#"{}
<form method="post" action="/login">
<p><label>Usuario <input name="username" autocomplete="username" required></label></p>
<p><label>Contraseña <input name="password" type="password" autocomplete="current-password" required></label></p>
<p><button type="submit">Ingresar</button></p>
</form>"#,
            error
        ),
    )
}

pub fn home_page(session: &Session, counts: &EntityCounts, recent: &[AspectRecord]) -> Html<String> {
    layout(
        "Inicio",
        Some(session),
        &format!(
            "<p>Bienvenido, {}.</p>\n{}\n<h2>Registros recientes</h2>\n{}",
            escape(&session.username),
            counts_list(counts),
            aspect_rows(recent, Some(session))
        ),
    )
}

pub fn admin_page(
    session: &Session,
    users: &[User],
    counts: &EntityCounts,
    recent: &[AspectRecord],
) -> Html<String> {
    let user_rows: String = users
        .iter()
        .map(|u| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                u.id,
                escape(&u.username),
                u.role,
                escape(&u.created_at)
            )
        })
        .collect();
    layout(
        "Administración",
        Some(session),
        &format!(
            r#"{}
<h2>Usuarios</h2>
<table>
<tr><th>ID</th><th>Usuario</th><th>Rol</th><th>Creado</th></tr>
{}</table>
<h2>Reportes</h2>
<ul>
<li><a href="/api/admin/filtrar">Filtrar aspectos (JSON)</a></li>
<li><a href="/api/admin/exportar_csv">Exportar aspectos (CSV)</a></li>
<li><a href="/api/admin/estadisticas">Estadísticas</a></li>
</ul>
<h2>Registros recientes</h2>
{}"#,
            counts_list(counts),
            user_rows,
            aspect_rows(recent, Some(session))
        ),
    )
}

pub fn aspect_list_page(session: &Session, records: &[AspectRecord]) -> Html<String> {
    layout(
        "Aspectos",
        Some(session),
        &format!(
            r#"<p><a href="/aspectos/crear">Nuevo aspecto</a></p>
{}"#,
            aspect_rows(records, Some(session))
        ),
    )
}

fn options(values: &[&str], selected: Option<&str>) -> String {
    values
        .iter()
        .map(|v| {
            let sel = if selected == Some(*v) { " selected" } else { "" };
            format!(r#"<option value="{0}"{1}>{0}</option>"#, escape(v), sel)
        })
        .collect()
}

pub fn aspect_form_page(
    session: &Session,
    title: &str,
    action: &str,
    values: &AspectInput,
    error: Option<&ValidationError>,
) -> Html<String> {
    let error = error
        .map(|e| format!(r#"<p class="error" data-campo="{}">{}</p>"#, e.field, escape(&e.message)))
        .unwrap_or_default();
    let fuentes: Vec<&str> = Source::ALL.iter().map(|s| s.as_str()).collect();
    let value = |v: &Option<String>| escape(v.as_deref().unwrap_or(""));
    layout(
        title,
        Some(session),
        &format!(
            r#"{error}
<form method="post" action="{action}">
<p><label>Fuente <select name="fuente">{fuentes}</select></label></p>
<p><label>Actividad <input name="actividad" value="{actividad}" required></label></p>
<p><label>Tipo <input name="tipo" value="{tipo}" required></label></p>
<p><label>Aspecto <input name="aspecto" value="{aspecto}" required></label></p>
<p><button type="submit">Guardar</button> <a href="/aspectos">Cancelar</a></p>
</form>
<p>FODA (externo e interno): tipo {polaridades}. FODA externo: aspecto {pestel}. FODA interno: aspecto {areas}. CANVA: texto libre.</p>"#,
            error = error,
            action = escape(action),
            fuentes = options(&fuentes, values.fuente.as_deref()),
            actividad = value(&values.actividad),
            tipo = value(&values.tipo),
            aspecto = value(&values.aspecto),
            polaridades = Polarity::labels().join(" / "),
            pestel = PestleCategory::labels().join(", "),
            areas = InternalArea::labels().join(", "),
        ),
    )
}

pub fn source_page(session: &Session, source: Source, records: &[AspectRecord]) -> Html<String> {
    let (tipos, aspectos): (Vec<&str>, Vec<&str>) = match source {
        Source::FodaExt => (Polarity::labels(), PestleCategory::labels()),
        Source::FodaInt => (Polarity::labels(), InternalArea::labels()),
        Source::Canva => (Vec::new(), Vec::new()),
    };
    let field = |name: &str, values: &[&str]| {
        if values.is_empty() {
            format!(r#"<input name="{}" required>"#, name)
        } else {
            format!(r#"<select name="{}">{}</select>"#, name, options(values, None))
        }
    };
    layout(
        source.title(),
        Some(session),
        &format!(
            r#"<form method="post" action="/aspectos/crear?origen=fuente">
<input type="hidden" name="fuente" value="{fuente}">
<label>Actividad <input name="actividad" required></label>
<label>{tipo_label} {tipo}</label>
<label>Aspecto {aspecto}</label>
<button type="submit">Agregar</button>
</form>
{rows}"#,
            fuente = source.as_str(),
            tipo_label = if source == Source::Canva { "Bloque" } else { "Tipo" },
            tipo = field("tipo", &tipos),
            aspecto = field("aspecto", &aspectos),
            rows = aspect_rows(records, Some(session)),
        ),
    )
}

pub fn cross_page(
    session: &Session,
    internal: &[AspectRecord],
    external: &[AspectRecord],
    strategies: &[StrategyRecord],
) -> Html<String> {
    let element_options = |records: &[AspectRecord]| -> String {
        records
            .iter()
            .map(|r| {
                let kind = r.bloque.as_str();
                format!(
                    r#"<option value="{id}" data-tipo="{kind}" data-texto="{text}">[{kind}] {text}</option>"#,
                    id = r.id,
                    kind = escape(kind),
                    text = escape(&format!("{}: {}", r.actividad, r.aspecto)),
                )
            })
            .collect()
    };
    let axis_options: String = StrategicAxis::ALL
        .iter()
        .map(|a| format!(r#"<option value="{}">{}</option>"#, a.id(), escape(a.display_label())))
        .collect();
    let strategy_rows: String = strategies
        .iter()
        .map(|s| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                s.id,
                s.tipo_cruce.as_str(),
                escape(&s.interno_texto),
                escape(&s.externo_texto),
                escape(&s.estrategia),
                escape(s.eje_label.as_deref().unwrap_or("")),
            )
        })
        .collect();
    layout(
        "Cruce TOWS",
        Some(session),
        &format!(
            r#"<form id="cruce">
<label>Cruce <select name="tipo_cruce">{cruces}</select></label>
<label>Interno <select name="interno">{internos}</select></label>
<label>Externo <select name="externo">{externos}</select></label>
<label>Eje <select name="eje_id"><option value="">(sin eje)</option>{ejes}</select></label>
<label>Estrategia <input name="estrategia" required></label>
<button type="submit">Guardar</button>
<span id="cruce-resultado"></span>
</form>
<script>
document.getElementById("cruce").addEventListener("submit", async (ev) => {{
  ev.preventDefault();
  const f = ev.target;
  const i = f.interno.selectedOptions[0], e = f.externo.selectedOptions[0];
  const body = {{
    tipo_cruce: f.tipo_cruce.value, estrategia: f.estrategia.value, eje_id: f.eje_id.value || null,
    interno_id: i && i.value, interno_tipo: i && i.dataset.tipo, interno_texto: i && i.dataset.texto,
    externo_id: e && e.value, externo_tipo: e && e.dataset.tipo, externo_texto: e && e.dataset.texto,
  }};
  const r = await fetch("/guardar_estrategia_foda", {{ method: "POST", headers: {{ "Content-Type": "application/json" }}, body: JSON.stringify(body) }});
  const j = await r.json();
  if (j.success) {{ location.reload(); }} else {{ document.getElementById("cruce-resultado").textContent = j.error; }}
}});
</script>
<table>
<tr><th>ID</th><th>Cruce</th><th>Interno</th><th>Externo</th><th>Estrategia</th><th>Eje</th></tr>
{rows}</table>"#,
            cruces = options(&["FO", "DO", "FA", "DA"], None),
            internos = element_options(internal),
            externos = element_options(external),
            ejes = axis_options,
            rows = strategy_rows,
        ),
    )
}

pub fn init_db_page(counts: &EntityCounts, seed: &SeedReport) -> Html<String> {
    layout(
        "Base de datos inicializada",
        None,
        &format!(
            r#"<p>Usuarios creados ahora: {}</p>
<p>Aspectos de ejemplo creados ahora: {}</p>
{}
<p><a href="/login">Ir al login</a></p>"#,
            seed.users_created,
            seed.aspects_created,
            counts_list(counts)
        ),
    )
}

pub fn migrate_page(applied_now: &[AppliedMigration], all: &[AppliedMigration]) -> Html<String> {
    let rows: String = all
        .iter()
        .map(|m| {
            let fresh = if applied_now.iter().any(|n| n.version == m.version) {
                " (nueva)"
            } else {
                ""
            };
            format!(
                "<tr><td>{}</td><td>{}{}</td><td>{}</td></tr>\n",
                m.version,
                escape(&m.name),
                fresh,
                escape(&m.applied_at)
            )
        })
        .collect();
    layout(
        "Migraciones",
        None,
        &format!(
            "<p>Migraciones aplicadas en esta ejecución: {}</p>\n<table>\n<tr><th>Versión</th><th>Nombre</th><th>Aplicada</th></tr>\n{}</table>",
            applied_now.len(),
            rows
        ),
    )
}

pub fn error_page(status: StatusCode, message: &str) -> Html<String> {
    layout(
        &format!("Error {}", status.as_u16()),
        None,
        &format!(
            r#"<p class="error">{}</p>
<p><a href="/inicio">Volver al inicio</a></p>"#,
            escape(message)
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(escape(r#"<b a="1">&'"#), "&lt;b a=&quot;1&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn login_page_shows_error() {
        let Html(body) = login_page(Some("Usuario o contraseña incorrectos"));
        assert!(body.contains("Usuario o contraseña incorrectos"));
        assert!(body.contains(r#"action="/login""#));
    }
}
