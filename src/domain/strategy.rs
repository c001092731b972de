use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::aspect::Labelled;
use super::error::ValidationError;
use super::{fold_label, required};

/// FODA quadrant of an element taking part in a cross-strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Fortaleza,
    Debilidad,
    Oportunidad,
    Amenaza,
}

impl ElementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Fortaleza => "fortaleza",
            ElementKind::Debilidad => "debilidad",
            ElementKind::Oportunidad => "oportunidad",
            ElementKind::Amenaza => "amenaza",
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, ElementKind::Fortaleza | ElementKind::Debilidad)
    }

    /// Parse a Spanish or English quadrant name.
    pub fn parse(field: &'static str, raw: &str) -> Result<Self, ValidationError> {
        match fold_label(raw).as_str() {
            "FORTALEZA" | "STRENGTH" => Ok(ElementKind::Fortaleza),
            "DEBILIDAD" | "WEAKNESS" => Ok(ElementKind::Debilidad),
            "OPORTUNIDAD" | "OPPORTUNITY" => Ok(ElementKind::Oportunidad),
            "AMENAZA" | "THREAT" => Ok(ElementKind::Amenaza),
            _ => Err(ValidationError::not_in(
                field,
                raw.trim(),
                &["fortaleza", "debilidad", "oportunidad", "amenaza"],
            )),
        }
    }
}

/// TOWS cross code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CrossType {
    Fo,
    Do,
    Fa,
    Da,
}

impl CrossType {
    pub const ALL: [CrossType; 4] = [CrossType::Fo, CrossType::Do, CrossType::Fa, CrossType::Da];

    pub fn as_str(&self) -> &'static str {
        match self {
            CrossType::Fo => "FO",
            CrossType::Do => "DO",
            CrossType::Fa => "FA",
            CrossType::Da => "DA",
        }
    }

    /// Quadrants the two crossed elements must come from.
    pub fn expected_kinds(&self) -> (ElementKind, ElementKind) {
        match self {
            CrossType::Fo => (ElementKind::Fortaleza, ElementKind::Oportunidad),
            CrossType::Do => (ElementKind::Debilidad, ElementKind::Oportunidad),
            CrossType::Fa => (ElementKind::Fortaleza, ElementKind::Amenaza),
            CrossType::Da => (ElementKind::Debilidad, ElementKind::Amenaza),
        }
    }

    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let key = raw.trim().to_uppercase();
        CrossType::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == key)
            .ok_or_else(|| ValidationError::not_in("tipo_cruce", raw.trim(), &["FO", "DO", "FA", "DA"]))
    }
}

/// Thematic classification of a cross-strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategicAxis {
    Educacion,
    Salud,
    MedioAmbiente,
    Empleo,
    Infraestructura,
    DesarrolloEconomico,
    Cultura,
}

impl Labelled for StrategicAxis {
    const ALL: &'static [Self] = &[
        StrategicAxis::Educacion,
        StrategicAxis::Salud,
        StrategicAxis::MedioAmbiente,
        StrategicAxis::Empleo,
        StrategicAxis::Infraestructura,
        StrategicAxis::DesarrolloEconomico,
        StrategicAxis::Cultura,
    ];

    fn label(&self) -> &'static str {
        self.id()
    }
}

impl StrategicAxis {
    pub fn id(&self) -> &'static str {
        match self {
            StrategicAxis::Educacion => "EDUCACION",
            StrategicAxis::Salud => "SALUD",
            StrategicAxis::MedioAmbiente => "MEDIO_AMBIENTE",
            StrategicAxis::Empleo => "EMPLEO",
            StrategicAxis::Infraestructura => "INFRAESTRUCTURA",
            StrategicAxis::DesarrolloEconomico => "DESARROLLO_ECONOMICO",
            StrategicAxis::Cultura => "CULTURA",
        }
    }

    pub fn display_label(&self) -> &'static str {
        match self {
            StrategicAxis::Educacion => "Educación",
            StrategicAxis::Salud => "Salud",
            StrategicAxis::MedioAmbiente => "Medio ambiente",
            StrategicAxis::Empleo => "Empleo local",
            StrategicAxis::Infraestructura => "Infraestructura",
            StrategicAxis::DesarrolloEconomico => "Desarrollo económico",
            StrategicAxis::Cultura => "Cultura y comunidad",
        }
    }
}

/// One side of a cross: a text snapshot of an aspect record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub id: i64,
    pub kind: ElementKind,
    pub text: String,
}

/// A cross-strategy ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStrategy {
    pub cross_type: CrossType,
    pub internal: Element,
    pub external: Element,
    pub estrategia: String,
    pub axis: Option<StrategicAxis>,
}

/// Inbound cross-strategy payload. Element ids may arrive as numbers or strings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StrategyInput {
    pub tipo_cruce: Option<String>,
    pub interno_id: Option<Value>,
    pub interno_tipo: Option<String>,
    pub interno_texto: Option<String>,
    pub externo_id: Option<Value>,
    pub externo_tipo: Option<String>,
    pub externo_texto: Option<String>,
    pub estrategia: Option<String>,
    pub eje_id: Option<String>,
}

impl StrategyInput {
    pub fn validate(&self, require_axis: bool) -> Result<NewStrategy, ValidationError> {
        let tipo_cruce = required("tipo_cruce", self.tipo_cruce.as_deref())?;
        let interno_id = element_id("interno_id", self.interno_id.as_ref())?;
        let interno_tipo = required("interno_tipo", self.interno_tipo.as_deref())?;
        let interno_texto = required("interno_texto", self.interno_texto.as_deref())?;
        let externo_id = element_id("externo_id", self.externo_id.as_ref())?;
        let externo_tipo = required("externo_tipo", self.externo_tipo.as_deref())?;
        let externo_texto = required("externo_texto", self.externo_texto.as_deref())?;
        let estrategia = required("estrategia", self.estrategia.as_deref())?;

        let cross_type = CrossType::parse(&tipo_cruce)?;
        let internal_kind = ElementKind::parse("interno_tipo", &interno_tipo)?;
        let external_kind = ElementKind::parse("externo_tipo", &externo_tipo)?;
        let (want_internal, want_external) = cross_type.expected_kinds();
        if internal_kind != want_internal {
            return Err(ValidationError::new(
                "interno_tipo",
                format!(
                    "El cruce {} requiere un elemento interno de tipo '{}'",
                    cross_type.as_str(),
                    want_internal.as_str()
                ),
            ));
        }
        if external_kind != want_external {
            return Err(ValidationError::new(
                "externo_tipo",
                format!(
                    "El cruce {} requiere un elemento externo de tipo '{}'",
                    cross_type.as_str(),
                    want_external.as_str()
                ),
            ));
        }

        let axis = match self.eje_id.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(StrategicAxis::parse_field("eje_id", raw)?),
            _ if require_axis => return Err(ValidationError::missing("eje_id")),
            _ => None,
        };

        Ok(NewStrategy {
            cross_type,
            internal: Element {
                id: interno_id,
                kind: internal_kind,
                text: interno_texto,
            },
            external: Element {
                id: externo_id,
                kind: external_kind,
                text: externo_texto,
            },
            estrategia,
            axis,
        })
    }
}

fn element_id(field: &'static str, value: Option<&Value>) -> Result<i64, ValidationError> {
    match value {
        None | Some(Value::Null) => Err(ValidationError::missing(field)),
        Some(Value::Number(n)) => n
            .as_i64()
            .ok_or_else(|| ValidationError::new(field, format!("'{}' debe ser un entero", field))),
        Some(Value::String(s)) if s.trim().is_empty() => Err(ValidationError::missing(field)),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| ValidationError::new(field, format!("'{}' debe ser un entero", field))),
        Some(_) => Err(ValidationError::new(field, format!("'{}' debe ser un entero", field))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> StrategyInput {
        serde_json::from_value(json!({
            "tipo_cruce": "FO",
            "interno_id": 3,
            "interno_tipo": "fortaleza",
            "interno_texto": "Equipo técnico con experiencia",
            "externo_id": "7",
            "externo_tipo": "oportunidad",
            "externo_texto": "Alza del precio del cobre",
            "estrategia": "Ampliar la producción en la faena norte"
        }))
        .unwrap()
    }

    #[test]
    fn accepts_complete_payload() {
        let s = payload().validate(false).unwrap();
        assert_eq!(s.cross_type, CrossType::Fo);
        assert_eq!(s.internal.id, 3);
        assert_eq!(s.external.id, 7);
        assert_eq!(s.axis, None);
    }

    #[test]
    fn each_required_field_is_checked() {
        for field in [
            "tipo_cruce",
            "interno_id",
            "interno_tipo",
            "interno_texto",
            "externo_id",
            "externo_tipo",
            "externo_texto",
            "estrategia",
        ] {
            let mut value = serde_json::to_value(json!({
                "tipo_cruce": "FO",
                "interno_id": 3,
                "interno_tipo": "fortaleza",
                "interno_texto": "a",
                "externo_id": 7,
                "externo_tipo": "oportunidad",
                "externo_texto": "b",
                "estrategia": "c"
            }))
            .unwrap();
            value.as_object_mut().unwrap().remove(field);
            let input: StrategyInput = serde_json::from_value(value).unwrap();
            assert_eq!(input.validate(false).unwrap_err().field, field);
        }
    }

    #[test]
    fn rejects_unknown_cross_code() {
        let mut p = payload();
        p.tipo_cruce = Some("XX".to_string());
        assert_eq!(p.validate(false).unwrap_err().field, "tipo_cruce");
    }

    #[test]
    fn cross_code_must_match_element_kinds() {
        let mut p = payload();
        p.tipo_cruce = Some("DA".to_string());
        assert_eq!(p.validate(false).unwrap_err().field, "interno_tipo");

        let mut p = payload();
        p.tipo_cruce = Some("FA".to_string());
        assert_eq!(p.validate(false).unwrap_err().field, "externo_tipo");
    }

    #[test]
    fn axis_is_optional_or_required() {
        assert_eq!(payload().validate(true).unwrap_err().field, "eje_id");

        let mut p = payload();
        p.eje_id = Some("medio ambiente".to_string());
        assert_eq!(p.validate(true).unwrap().axis, Some(StrategicAxis::MedioAmbiente));

        p.eje_id = Some("DEPORTE".to_string());
        assert_eq!(p.validate(false).unwrap_err().field, "eje_id");
    }
}
