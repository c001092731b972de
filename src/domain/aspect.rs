use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::ValidationError;
use super::strategy::ElementKind;
use super::{fold_label, required};

/// Closed label set parsed case- and accent-insensitively.
pub trait Labelled: Sized + Copy + 'static {
    const ALL: &'static [Self];

    /// Canonical persisted form.
    fn label(&self) -> &'static str;

    fn labels() -> Vec<&'static str> {
        Self::ALL.iter().map(|v| v.label()).collect()
    }

    fn parse_field(field: &'static str, raw: &str) -> Result<Self, ValidationError> {
        let key = fold_label(raw);
        Self::ALL
            .iter()
            .copied()
            .find(|v| fold_label(v.label()) == key)
            .ok_or_else(|| ValidationError::not_in(field, raw.trim(), &Self::labels()))
    }
}

// ─── Source tag ─────────────────────────────────────────────────────────────

/// Which analysis form an aspect record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    #[serde(rename = "foda_ext")]
    FodaExt,
    #[serde(rename = "foda_int")]
    FodaInt,
    #[serde(rename = "canva")]
    Canva,
}

impl Source {
    pub const ALL: [Source; 3] = [Source::FodaExt, Source::FodaInt, Source::Canva];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::FodaExt => "foda_ext",
            Source::FodaInt => "foda_int",
            Source::Canva => "canva",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Source::FodaExt => "FODA externo",
            Source::FodaInt => "FODA interno",
            Source::Canva => "CANVA",
        }
    }

    /// Page holding this source's entry form and listing.
    pub fn page_path(&self) -> &'static str {
        match self {
            Source::FodaExt => "/fodaext",
            Source::FodaInt => "/fodaint",
            Source::Canva => "/canvas",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let key = raw.trim().to_lowercase();
        Source::ALL
            .iter()
            .copied()
            .find(|s| s.as_str() == key)
            .ok_or_else(|| ValidationError::not_in("fuente", raw.trim(), &["foda_ext", "foda_int", "canva"]))
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── FODA enumerations ──────────────────────────────────────────────────────

/// Whether a FODA factor helps or hurts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Positivo,
    Negativo,
}

impl Labelled for Polarity {
    const ALL: &'static [Self] = &[Polarity::Positivo, Polarity::Negativo];

    fn label(&self) -> &'static str {
        match self {
            Polarity::Positivo => "Positivo",
            Polarity::Negativo => "Negativo",
        }
    }
}

/// PESTLE category of an external factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PestleCategory {
    Politico,
    Economico,
    Social,
    Tecnologico,
    Ambiental,
    Legal,
}

impl Labelled for PestleCategory {
    const ALL: &'static [Self] = &[
        PestleCategory::Politico,
        PestleCategory::Economico,
        PestleCategory::Social,
        PestleCategory::Tecnologico,
        PestleCategory::Ambiental,
        PestleCategory::Legal,
    ];

    fn label(&self) -> &'static str {
        match self {
            PestleCategory::Politico => "POLITICO",
            PestleCategory::Economico => "ECONOMICO",
            PestleCategory::Social => "SOCIAL",
            PestleCategory::Tecnologico => "TECNOLOGICO",
            PestleCategory::Ambiental => "AMBIENTAL",
            PestleCategory::Legal => "LEGAL",
        }
    }
}

/// Organizational area of an internal factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InternalArea {
    Gerencia,
    Finanzas,
    Operaciones,
    RecursosHumanos,
    Logistica,
    Tecnologia,
    Seguridad,
}

impl Labelled for InternalArea {
    const ALL: &'static [Self] = &[
        InternalArea::Gerencia,
        InternalArea::Finanzas,
        InternalArea::Operaciones,
        InternalArea::RecursosHumanos,
        InternalArea::Logistica,
        InternalArea::Tecnologia,
        InternalArea::Seguridad,
    ];

    fn label(&self) -> &'static str {
        match self {
            InternalArea::Gerencia => "GERENCIA",
            InternalArea::Finanzas => "FINANZAS",
            InternalArea::Operaciones => "OPERACIONES",
            InternalArea::RecursosHumanos => "RECURSOS HUMANOS",
            InternalArea::Logistica => "LOGISTICA",
            InternalArea::Tecnologia => "TECNOLOGIA",
            InternalArea::Seguridad => "SEGURIDAD",
        }
    }
}

// ─── Validated entry ────────────────────────────────────────────────────────

/// An aspect record after per-source validation.
///
/// All three variants share one table; the variant decides what `tipo` and
/// `aspecto` mean and which values they may hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AspectEntry {
    FodaExterno {
        actividad: String,
        polaridad: Polarity,
        categoria: PestleCategory,
    },
    FodaInterno {
        actividad: String,
        polaridad: Polarity,
        area: InternalArea,
    },
    Canva {
        actividad: String,
        bloque: String,
        aspecto: String,
    },
}

impl AspectEntry {
    pub fn source(&self) -> Source {
        match self {
            AspectEntry::FodaExterno { .. } => Source::FodaExt,
            AspectEntry::FodaInterno { .. } => Source::FodaInt,
            AspectEntry::Canva { .. } => Source::Canva,
        }
    }

    pub fn actividad(&self) -> &str {
        match self {
            AspectEntry::FodaExterno { actividad, .. }
            | AspectEntry::FodaInterno { actividad, .. }
            | AspectEntry::Canva { actividad, .. } => actividad,
        }
    }

    /// Persisted `tipo` column.
    pub fn tipo(&self) -> &str {
        match self {
            AspectEntry::FodaExterno { polaridad, .. } | AspectEntry::FodaInterno { polaridad, .. } => {
                polaridad.label()
            }
            AspectEntry::Canva { bloque, .. } => bloque,
        }
    }

    /// Persisted `aspecto` column.
    pub fn aspecto(&self) -> &str {
        match self {
            AspectEntry::FodaExterno { categoria, .. } => categoria.label(),
            AspectEntry::FodaInterno { area, .. } => area.label(),
            AspectEntry::Canva { aspecto, .. } => aspecto,
        }
    }

    /// FODA quadrant, if this is a FODA factor.
    pub fn element_kind(&self) -> Option<ElementKind> {
        match self {
            AspectEntry::FodaExterno { polaridad: Polarity::Positivo, .. } => Some(ElementKind::Oportunidad),
            AspectEntry::FodaExterno { polaridad: Polarity::Negativo, .. } => Some(ElementKind::Amenaza),
            AspectEntry::FodaInterno { polaridad: Polarity::Positivo, .. } => Some(ElementKind::Fortaleza),
            AspectEntry::FodaInterno { polaridad: Polarity::Negativo, .. } => Some(ElementKind::Debilidad),
            AspectEntry::Canva { .. } => None,
        }
    }

    /// Reporting block: the FODA quadrant, or the canvas block for CANVA rows.
    pub fn bloque(&self) -> String {
        match (self.element_kind(), self) {
            (Some(kind), _) => kind.as_str().to_string(),
            (None, AspectEntry::Canva { bloque, .. }) => bloque.clone(),
            (None, _) => String::new(),
        }
    }
}

/// Inbound aspect payload, from JSON or a form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AspectInput {
    pub actividad: Option<String>,
    pub tipo: Option<String>,
    pub aspecto: Option<String>,
    pub fuente: Option<String>,
}

impl AspectInput {
    /// Validate against the source carried in the payload itself.
    pub fn validate(&self) -> Result<AspectEntry, ValidationError> {
        let raw = required("fuente", self.fuente.as_deref())?;
        self.validate_for(Source::parse(&raw)?)
    }

    /// Validate against the enumeration of `source`, ignoring any `fuente` key.
    pub fn validate_for(&self, source: Source) -> Result<AspectEntry, ValidationError> {
        let actividad = required("actividad", self.actividad.as_deref())?;
        let tipo = required("tipo", self.tipo.as_deref())?;
        let aspecto = required("aspecto", self.aspecto.as_deref())?;

        match source {
            Source::FodaExt => Ok(AspectEntry::FodaExterno {
                actividad,
                polaridad: Polarity::parse_field("tipo", &tipo)?,
                categoria: PestleCategory::parse_field("aspecto", &aspecto)?,
            }),
            Source::FodaInt => Ok(AspectEntry::FodaInterno {
                actividad,
                polaridad: Polarity::parse_field("tipo", &tipo)?,
                area: InternalArea::parse_field("aspecto", &aspecto)?,
            }),
            Source::Canva => Ok(AspectEntry::Canva {
                actividad,
                bloque: tipo,
                aspecto,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(actividad: &str, tipo: &str, aspecto: &str) -> AspectInput {
        AspectInput {
            actividad: Some(actividad.to_string()),
            tipo: Some(tipo.to_string()),
            aspecto: Some(aspecto.to_string()),
            fuente: None,
        }
    }

    #[test]
    fn foda_ext_accepts_pestle_and_canonicalizes() {
        let entry = input("Permisología", "negativo", "Legal")
            .validate_for(Source::FodaExt)
            .unwrap();
        assert_eq!(entry.source(), Source::FodaExt);
        assert_eq!(entry.tipo(), "Negativo");
        assert_eq!(entry.aspecto(), "LEGAL");
        assert_eq!(entry.bloque(), "amenaza");
    }

    #[test]
    fn foda_ext_rejects_unknown_category() {
        let err = input("x", "Negativo", "INVALIDO")
            .validate_for(Source::FodaExt)
            .unwrap_err();
        assert_eq!(err.field, "aspecto");
        assert!(err.message.contains("INVALIDO"));
    }

    #[test]
    fn foda_int_uses_internal_areas() {
        let entry = input("Rotación de personal", "Negativo", "Recursos Humanos")
            .validate_for(Source::FodaInt)
            .unwrap();
        assert_eq!(entry.aspecto(), "RECURSOS HUMANOS");
        assert_eq!(entry.bloque(), "debilidad");

        // A PESTLE category is not an internal area.
        let err = input("x", "Positivo", "LEGAL")
            .validate_for(Source::FodaInt)
            .unwrap_err();
        assert_eq!(err.field, "aspecto");
    }

    #[test]
    fn polarity_is_enforced_for_foda() {
        let err = input("x", "Neutro", "SOCIAL")
            .validate_for(Source::FodaExt)
            .unwrap_err();
        assert_eq!(err.field, "tipo");
    }

    #[test]
    fn canva_takes_free_text() {
        let entry = input("Venta de concentrado", "Propuesta de valor", "Cobre de alta ley")
            .validate_for(Source::Canva)
            .unwrap();
        assert_eq!(entry.bloque(), "Propuesta de valor");
        assert_eq!(entry.element_kind(), None);
    }

    #[test]
    fn validate_reads_source_from_payload() {
        let mut payload = input("x", "Positivo", "ECONOMICO");
        assert_eq!(payload.validate().unwrap_err().field, "fuente");
        payload.fuente = Some("foda_ext".to_string());
        assert_eq!(payload.validate().unwrap().bloque(), "oportunidad");
        payload.fuente = Some("otra".to_string());
        assert_eq!(payload.validate().unwrap_err().field, "fuente");
    }
}
