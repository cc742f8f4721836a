//! CSV and JSON exports of a filtered reading set.
//!
//! CSV values are joined with bare commas and never quoted, so a value that
//! itself contains a comma shifts the remaining columns of its row.

use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::error::PipelineError;
use crate::models::SensorReading;

// ---

pub const CSV_HEADER: &str = "Type,Valeur,Unité,Emplacement,Date";

const CSV_DATE_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    // ---
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    // ---
    pub fn content_type(&self) -> &'static str {
        // ---
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Json => "application/json",
        }
    }

    /// Download name, e.g. `agrilink_data_20250601.csv`.
    pub fn file_name(&self, now: DateTime<Utc>) -> String {
        // ---
        let extension = match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        };
        format!("agrilink_data_{}.{extension}", now.format("%Y%m%d"))
    }

    pub fn render(&self, readings: &[SensorReading]) -> Result<String, serde_json::Error> {
        // ---
        match self {
            ExportFormat::Csv => Ok(to_csv(readings)),
            ExportFormat::Json => to_json(readings),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // ---
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(PipelineError::InvalidFilter(format!(
                "unknown export format '{other}'"
            ))),
        }
    }
}

/// Header line plus one line per reading, every line `\n`-terminated.
pub fn to_csv(readings: &[SensorReading]) -> String {
    // ---
    let mut csv = String::from(CSV_HEADER);
    csv.push('\n');

    for r in readings {
        let row = [
            r.sensor_type.to_string(),
            r.value.to_string(),
            r.unit.clone(),
            r.location.clone(),
            r.timestamp.format(CSV_DATE_FORMAT).to_string(),
        ]
        .join(",");
        csv.push_str(&row);
        csv.push('\n');
    }
    csv
}

/// The reading array, pretty-printed with two-space indentation.
pub fn to_json(readings: &[SensorReading]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(readings)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::models::SensorType;
    use chrono::TimeZone;

    fn water_reading(location: &str) -> SensorReading {
        // ---
        SensorReading {
            id: "w-1".to_string(),
            sensor_id: None,
            sensor_type: SensorType::Water,
            value: 85.0,
            unit: "%".to_string(),
            location: location.to_string(),
            timestamp: Utc.with_ymd_and_hms(2025, 5, 4, 9, 7, 3).unwrap(),
            owner_id: "farm-1".to_string(),
        }
    }

    #[test]
    fn test_csv_single_reading() {
        // ---
        let csv = to_csv(&[water_reading("Zone Sud")]);
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "Type,Valeur,Unité,Emplacement,Date");
        assert_eq!(lines[1], "water,85,%,Zone Sud,04/05/2025 09:07:03");
        assert!(csv.ends_with('\n'));
    }

    #[test]
    fn test_csv_does_not_quote_commas() {
        // ---
        let csv = to_csv(&[water_reading("Parcelle 3, Nord")]);
        let row = csv.lines().nth(1).unwrap();
        assert_eq!(row.split(',').count(), 6);
    }

    #[test]
    fn test_csv_empty_set_is_header_only() {
        // ---
        assert_eq!(to_csv(&[]), format!("{CSV_HEADER}\n"));
    }

    #[test]
    fn test_json_uses_two_space_indent() {
        // ---
        let json = to_json(&[water_reading("Zone Sud")]).unwrap();
        assert!(json.starts_with("[\n  {\n    \"id\": \"w-1\""));
        assert!(json.contains("\"type\": \"water\""));
        assert!(json.contains("\"timestamp\": \"2025-05-04T09:07:03Z\""));
    }

    #[test]
    fn test_format_parsing_and_names() {
        // ---
        assert_eq!("JSON".parse::<ExportFormat>(), Ok(ExportFormat::Json));
        assert!(matches!(
            "xlsx".parse::<ExportFormat>(),
            Err(PipelineError::InvalidFilter(_))
        ));

        let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        assert_eq!(
            ExportFormat::Csv.file_name(now),
            "agrilink_data_20250601.csv"
        );
    }
}
