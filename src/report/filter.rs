use serde::{Deserialize, Serialize};

use crate::domain::plan::parse_date;
use crate::domain::{Source, ValidationError};
use crate::state::models::{AspectPage, AspectRecord};
use crate::state::query::{AspectQuery, Pagination, SortKey};

/// Raw query-string parameters of the filter and export endpoints.
/// Blank values count as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterParams {
    pub tipo: Option<String>,
    pub bloque: Option<String>,
    pub fuente: Option<String>,
    pub desde: Option<String>,
    pub hasta: Option<String>,
    pub q: Option<String>,
    pub orden: Option<String>,
    pub page: Option<String>,
    pub per_page: Option<String>,
}

impl FilterParams {
    /// Query for the JSON filter: always paginated, page 1 of 20 by default.
    pub fn to_page_query(&self) -> Result<AspectQuery, ValidationError> {
        let mut query = self.base_query()?;
        query.pagination = Some(self.pagination()?);
        Ok(query)
    }

    /// Query for the CSV export: the same slice as the JSON filter when
    /// `page` or `per_page` is given, otherwise every matching row.
    pub fn to_export_query(&self) -> Result<AspectQuery, ValidationError> {
        let mut query = self.base_query()?;
        if present(&self.page).is_some() || present(&self.per_page).is_some() {
            query.pagination = Some(self.pagination()?);
        }
        Ok(query)
    }

    fn base_query(&self) -> Result<AspectQuery, ValidationError> {
        let fuente = present(&self.fuente).map(Source::parse).transpose()?;
        let desde = present(&self.desde)
            .map(|d| parse_date("desde", d))
            .transpose()?;
        let hasta = present(&self.hasta)
            .map(|d| parse_date("hasta", d))
            .transpose()?;
        if let (Some(d), Some(h)) = (desde, hasta) {
            if h < d {
                return Err(ValidationError::new(
                    "hasta",
                    "'hasta' no puede ser anterior a 'desde'",
                ));
            }
        }
        let orden = match present(&self.orden) {
            Some(raw) => parse_sort(raw)?,
            None => SortKey::default(),
        };

        Ok(AspectQuery {
            tipo: present(&self.tipo).map(str::to_string),
            bloque: present(&self.bloque).map(str::to_string),
            fuente,
            desde,
            hasta,
            q: present(&self.q).map(str::to_string),
            orden,
            pagination: None,
        })
    }

    fn pagination(&self) -> Result<Pagination, ValidationError> {
        let page = match present(&self.page) {
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|p| *p >= 1)
                .ok_or_else(|| ValidationError::new("page", "'page' debe ser un entero mayor o igual a 1"))?,
            None => 1,
        };
        let per_page = match present(&self.per_page) {
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|p| (1..=Pagination::MAX_PER_PAGE).contains(p))
                .ok_or_else(|| {
                    ValidationError::new(
                        "per_page",
                        format!(
                            "'per_page' debe ser un entero entre 1 y {}",
                            Pagination::MAX_PER_PAGE
                        ),
                    )
                })?,
            None => Pagination::DEFAULT_PER_PAGE,
        };
        Ok(Pagination { page, per_page })
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_sort(raw: &str) -> Result<SortKey, ValidationError> {
    let key = raw.to_lowercase();
    SortKey::ALL
        .iter()
        .copied()
        .find(|s| s.as_str() == key)
        .ok_or_else(|| {
            let allowed: Vec<&str> = SortKey::ALL.iter().map(|s| s.as_str()).collect();
            ValidationError::not_in("orden", raw, &allowed)
        })
}

/// JSON body of `/api/admin/filtrar`.
#[derive(Debug, Clone, Serialize)]
pub struct FilterResponse {
    pub items: Vec<AspectRecord>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
    pub pages: u64,
}

impl FilterResponse {
    pub fn new(page: AspectPage, pagination: Pagination) -> Self {
        Self {
            pages: pagination.pages(page.total),
            items: page.items,
            total: page.total,
            page: pagination.page,
            per_page: pagination.per_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn params(pairs: &[(&str, &str)]) -> FilterParams {
        let map: serde_json::Map<String, serde_json::Value> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
            .collect();
        serde_json::from_value(serde_json::Value::Object(map)).unwrap()
    }

    #[test]
    fn defaults() {
        let q = params(&[]).to_page_query().unwrap();
        assert_eq!(q.orden, SortKey::Reciente);
        assert_eq!(q.pagination, Some(Pagination::default()));
        assert_eq!(params(&[]).to_export_query().unwrap().pagination, None);
    }

    #[test]
    fn blank_values_are_ignored() {
        let q = params(&[("tipo", " "), ("fuente", ""), ("orden", "")])
            .to_page_query()
            .unwrap();
        assert_eq!(q.tipo, None);
        assert_eq!(q.fuente, None);
    }

    #[test]
    fn parses_every_field() {
        let q = params(&[
            ("tipo", "Negativo"),
            ("bloque", "amenaza"),
            ("fuente", "foda_ext"),
            ("desde", "2024-01-01"),
            ("hasta", "2024-12-31"),
            ("q", "polvo"),
            ("orden", "ACTIVIDAD"),
            ("page", "2"),
            ("per_page", "50"),
        ])
        .to_page_query()
        .unwrap();
        assert_eq!(q.tipo.as_deref(), Some("Negativo"));
        assert_eq!(q.fuente, Some(Source::FodaExt));
        assert_eq!(q.desde, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(q.orden, SortKey::Actividad);
        assert_eq!(q.pagination, Some(Pagination { page: 2, per_page: 50 }));
    }

    #[test]
    fn export_keeps_explicit_slice() {
        let q = params(&[("per_page", "5")]).to_export_query().unwrap();
        assert_eq!(q.pagination, Some(Pagination { page: 1, per_page: 5 }));
    }

    #[test]
    fn invalid_values_name_their_field() {
        let cases = [
            ("page", "0", "page"),
            ("per_page", "101", "per_page"),
            ("per_page", "abc", "per_page"),
            ("orden", "azar", "orden"),
            ("fuente", "otra", "fuente"),
            ("desde", "01/02/2024", "desde"),
        ];
        for (key, value, field) in cases {
            let err = params(&[(key, value)]).to_page_query().unwrap_err();
            assert_eq!(err.field, field, "{}={}", key, value);
        }
        let err = params(&[("desde", "2024-02-01"), ("hasta", "2024-01-01")])
            .to_page_query()
            .unwrap_err();
        assert_eq!(err.field, "hasta");
    }

    #[test]
    fn response_counts_pages() {
        let response = FilterResponse::new(
            AspectPage {
                items: Vec::new(),
                total: 41,
            },
            Pagination { page: 3, per_page: 20 },
        );
        assert_eq!(response.pages, 3);
        assert_eq!(response.page, 3);
    }
}
