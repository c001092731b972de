use chrono::NaiveDate;

use crate::domain::Source;

/// Fixed sort orders of the reporting endpoints. Ties always break on id so
/// paging is stable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    Reciente,
    Antiguo,
    Actividad,
    Tipo,
    Aspecto,
}

impl SortKey {
    pub const ALL: [SortKey; 5] = [
        SortKey::Reciente,
        SortKey::Antiguo,
        SortKey::Actividad,
        SortKey::Tipo,
        SortKey::Aspecto,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Reciente => "reciente",
            SortKey::Antiguo => "antiguo",
            SortKey::Actividad => "actividad",
            SortKey::Tipo => "tipo",
            SortKey::Aspecto => "aspecto",
        }
    }

    fn order_by(&self) -> &'static str {
        match self {
            SortKey::Reciente => "created_at DESC, id DESC",
            SortKey::Antiguo => "created_at ASC, id ASC",
            SortKey::Actividad => "actividad ASC, id ASC",
            SortKey::Tipo => "tipo ASC, id ASC",
            SortKey::Aspecto => "aspecto ASC, id ASC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Pagination {
    pub const DEFAULT_PER_PAGE: u32 = 20;
    pub const MAX_PER_PAGE: u32 = 100;

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)
    }

    pub fn pages(&self, total: u64) -> u64 {
        total.div_ceil(u64::from(self.per_page.max(1)))
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: Self::DEFAULT_PER_PAGE,
        }
    }
}

/// Filter over aspect records shared by the JSON filter and the CSV export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AspectQuery {
    pub tipo: Option<String>,
    pub bloque: Option<String>,
    pub fuente: Option<Source>,
    pub desde: Option<NaiveDate>,
    pub hasta: Option<NaiveDate>,
    pub q: Option<String>,
    pub orden: SortKey,
    pub pagination: Option<Pagination>,
}

/// A rendered statement plus its positional text parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlQuery {
    pub sql: String,
    pub params: Vec<String>,
}

pub(crate) const ASPECT_COLUMNS: &str =
    "id, actividad, tipo, aspecto, fuente, bloque, created_at, updated_at, created_by";

/// Name of the Unicode-aware lowercase function registered on every SQLite
/// connection. The built-in `LOWER()` only folds ASCII.
pub const SQLITE_LOWER_FN: &str = "unicode_lower";

/// SQL flavour a query is rendered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    Postgres,
}

impl Dialect {
    /// The n-th (1-based) parameter marker.
    pub fn placeholder(&self, n: usize) -> String {
        match self {
            Dialect::Sqlite => format!("?{}", n),
            Dialect::Postgres => format!("${}", n),
        }
    }

    /// `column` lowercased the same way `str::to_lowercase` does.
    fn lower(&self, column: &str) -> String {
        match self {
            Dialect::Sqlite => format!("{}({})", SQLITE_LOWER_FN, column),
            Dialect::Postgres => format!("LOWER({})", column),
        }
    }
}

impl AspectQuery {
    fn where_clause(&self, dialect: Dialect) -> (String, Vec<String>) {
        let mut clauses: Vec<String> = Vec::new();
        let mut params: Vec<String> = Vec::new();
        let placeholder = |n: usize| dialect.placeholder(n);

        if let Some(ref tipo) = self.tipo {
            params.push(tipo.to_lowercase());
            clauses.push(format!("{} = {}", dialect.lower("tipo"), placeholder(params.len())));
        }
        if let Some(ref bloque) = self.bloque {
            params.push(bloque.to_lowercase());
            clauses.push(format!("{} = {}", dialect.lower("bloque"), placeholder(params.len())));
        }
        if let Some(fuente) = self.fuente {
            params.push(fuente.as_str().to_string());
            clauses.push(format!("fuente = {}", placeholder(params.len())));
        }
        if let Some(desde) = self.desde {
            params.push(desde.format("%Y-%m-%d").to_string());
            clauses.push(format!("created_at >= {}", placeholder(params.len())));
        }
        if let Some(hasta) = self.hasta {
            // Inclusive upper day: compare against the start of the next day.
            let next = hasta.succ_opt().unwrap_or(hasta);
            params.push(next.format("%Y-%m-%d").to_string());
            clauses.push(format!("created_at < {}", placeholder(params.len())));
        }
        if let Some(ref q) = self.q {
            params.push(format!("%{}%", escape_like(&q.to_lowercase())));
            let p = placeholder(params.len());
            let matches: Vec<String> = ["actividad", "tipo", "aspecto"]
                .iter()
                .map(|column| format!("{} LIKE {} ESCAPE '\\'", dialect.lower(column), p))
                .collect();
            clauses.push(format!("({})", matches.join(" OR ")));
        }

        if clauses.is_empty() {
            (String::new(), params)
        } else {
            (format!(" WHERE {}", clauses.join(" AND ")), params)
        }
    }

    /// `SELECT COUNT(*)` over the filtered rows.
    pub fn count_sql(&self, dialect: Dialect) -> SqlQuery {
        let (where_sql, params) = self.where_clause(dialect);
        SqlQuery {
            sql: format!("SELECT COUNT(*) FROM aspectos_ambientales{}", where_sql),
            params,
        }
    }

    /// Ordered (and, when paginated, sliced) row selection.
    pub fn select_sql(&self, dialect: Dialect) -> SqlQuery {
        let (where_sql, params) = self.where_clause(dialect);
        let mut sql = format!(
            "SELECT {} FROM aspectos_ambientales{} ORDER BY {}",
            ASPECT_COLUMNS,
            where_sql,
            self.orden.order_by()
        );
        if let Some(p) = self.pagination {
            sql.push_str(&format!(" LIMIT {} OFFSET {}", p.per_page, p.offset()));
        }
        SqlQuery { sql, params }
    }
}

fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_query_has_no_where() {
        let q = AspectQuery::default();
        let sql = q.select_sql(Dialect::Sqlite);
        assert!(!sql.sql.contains("WHERE"));
        assert!(sql.sql.ends_with("ORDER BY created_at DESC, id DESC"));
        assert!(sql.params.is_empty());
    }

    #[test]
    fn free_text_reuses_one_parameter() {
        let q = AspectQuery {
            fuente: Some(Source::FodaExt),
            q: Some("50%_Polvo".to_string()),
            orden: SortKey::Actividad,
            pagination: Some(Pagination { page: 3, per_page: 10 }),
            ..Default::default()
        };
        let sql = q.select_sql(Dialect::Postgres);
        assert_eq!(sql.params, vec!["foda_ext".to_string(), "%50\\%\\_polvo%".to_string()]);
        assert_eq!(sql.sql.matches("$2").count(), 3);
        assert!(sql.sql.ends_with("LIMIT 10 OFFSET 20"));
    }

    #[test]
    fn sqlite_folds_columns_with_unicode_lower() {
        let q = AspectQuery {
            bloque: Some("Emisión".to_string()),
            q: Some("ÁREA".to_string()),
            ..Default::default()
        };
        let sql = q.count_sql(Dialect::Sqlite);
        assert_eq!(sql.params, vec!["emisión".to_string(), "%área%".to_string()]);
        assert!(sql.sql.contains("unicode_lower(bloque) = ?1"));
        assert!(sql.sql.contains("unicode_lower(aspecto) LIKE ?2"));
        assert!(!sql.sql.contains("LOWER("));
    }

    #[test]
    fn date_range_is_inclusive() {
        let q = AspectQuery {
            desde: NaiveDate::from_ymd_opt(2024, 1, 1),
            hasta: NaiveDate::from_ymd_opt(2024, 1, 31),
            ..Default::default()
        };
        let sql = q.count_sql(Dialect::Sqlite);
        assert_eq!(sql.params, vec!["2024-01-01".to_string(), "2024-02-01".to_string()]);
        assert!(sql.sql.contains("created_at >= ?1 AND created_at < ?2"));
    }

    #[test]
    fn pages_round_up() {
        let p = Pagination { page: 1, per_page: 20 };
        assert_eq!(p.pages(0), 0);
        assert_eq!(p.pages(20), 1);
        assert_eq!(p.pages(21), 2);
    }
}
