use crate::state::models::AspectRecord;

pub const CSV_COLUMNS: [&str; 9] = [
    "id",
    "actividad",
    "tipo",
    "aspecto",
    "fuente",
    "bloque",
    "created_at",
    "updated_at",
    "created_by",
];

/// Render aspect records as CSV with a header row. Fields containing a
/// separator, quote or line break are quoted with inner quotes doubled.
pub fn format_csv(rows: &[AspectRecord]) -> String {
    let mut output = String::new();

    output.push_str(&CSV_COLUMNS.join(","));
    output.push('\n');

    for row in rows {
        let vals = [
            row.id.to_string(),
            row.actividad.clone(),
            row.tipo.clone(),
            row.aspecto.clone(),
            row.fuente.as_str().to_string(),
            row.bloque.clone(),
            row.created_at.clone(),
            row.updated_at.clone(),
            row.created_by.map(|id| id.to_string()).unwrap_or_default(),
        ];
        let line: Vec<String> = vals.iter().map(|v| escape_field(v)).collect();
        output.push_str(&line.join(","));
        output.push('\n');
    }

    output
}

fn escape_field(val: &str) -> String {
    if val.contains(&[',', '"', '\n', '\r'][..]) {
        format!("\"{}\"", val.replace('"', "\"\""))
    } else {
        val.to_string()
    }
}

/// Attachment file name for an export taken at `timestamp` (RFC 3339).
pub fn export_filename(timestamp: &str) -> String {
    let stamp: String = timestamp
        .chars()
        .filter(|c| c.is_ascii_digit())
        .take(14)
        .collect();
    format!("aspectos_{}.csv", stamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Source;

    fn record(id: i64, aspecto: &str) -> AspectRecord {
        AspectRecord {
            id,
            actividad: "Perforación de roca".to_string(),
            tipo: "Negativo".to_string(),
            aspecto: aspecto.to_string(),
            fuente: Source::FodaExt,
            bloque: "amenaza".to_string(),
            created_at: "2024-03-01T10:00:00Z".to_string(),
            updated_at: "2024-03-01T10:00:00Z".to_string(),
            created_by: None,
        }
    }

    #[test]
    fn header_only_when_empty() {
        assert_eq!(
            format_csv(&[]),
            "id,actividad,tipo,aspecto,fuente,bloque,created_at,updated_at,created_by\n"
        );
    }

    #[test]
    fn quotes_special_fields() {
        let csv = format_csv(&[record(1, "LEGAL"), record(2, "polvo, \"fino\"\nsegunda")]);
        let mut lines = csv.lines().skip(1);
        assert_eq!(
            lines.next().unwrap(),
            "1,Perforación de roca,Negativo,LEGAL,foda_ext,amenaza,2024-03-01T10:00:00Z,2024-03-01T10:00:00Z,"
        );
        assert!(csv.contains("2,Perforación de roca,Negativo,\"polvo, \"\"fino\"\"\nsegunda\",foda_ext"));
    }

    #[test]
    fn filename_from_timestamp() {
        assert_eq!(export_filename("2024-03-01T10:05:09Z"), "aspectos_20240301100509.csv");
    }
}
