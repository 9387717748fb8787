/// Reading files.
///
/// Plain comma-separated text with a header row. Columns are located by
/// header name, so files written by older tools (extra `timestamp`,
/// `latitude`, `longitude` columns, or `predicted_disaster` in place of
/// `disaster_type`) load unchanged.
///
/// A field holding a comma or a double quote is written inside double
/// quotes with inner quotes doubled, and read back the same way. One row is
/// one line: line breaks inside a tag are written as spaces.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use crate::model::{LabeledReading, Reading};

/// Header written by `write_readings`.
pub const READINGS_HEADER: &str = "temperature,humidity,pressure,disaster_type";

/// Header written by `append_reading`.
pub const LOG_HEADER: &str = "timestamp,temperature,humidity,pressure,disaster_type,score,severity";

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, PartialEq)]
pub enum CsvError {
    Io(String),
    MissingColumn(String),
    BadValue { line: usize, column: String, value: String },
}

impl fmt::Display for CsvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CsvError::Io(msg) => write!(f, "I/O error: {}", msg),
            CsvError::MissingColumn(name) => write!(f, "missing column: {}", name),
            CsvError::BadValue { line, column, value } => {
                write!(f, "line {}: bad {} value {:?}", line, column, value)
            }
        }
    }
}

impl std::error::Error for CsvError {}

impl From<std::io::Error> for CsvError {
    fn from(e: std::io::Error) -> Self {
        CsvError::Io(e.to_string())
    }
}

// ============================================================================
// Reading
// ============================================================================

/// Parses reading rows from CSV text.
///
/// `temperature`, `humidity` and `pressure` are required columns. The
/// disaster tag is taken from `disaster_type`, falling back to
/// `predicted_disaster`; empty or `null` tags become `None`. Blank lines
/// are skipped. Short rows and unparseable numbers are errors, reported
/// with their 1-based line number.
pub fn parse_readings(text: &str) -> Result<Vec<Reading>, CsvError> {
    let mut lines = text.lines().enumerate();

    let header: Vec<String> = loop {
        match lines.next() {
            Some((_, line)) if line.trim().is_empty() => continue,
            Some((_, line)) => {
                break split_fields(line).iter().map(|h| h.trim().to_ascii_lowercase()).collect();
            }
            None => return Ok(Vec::new()),
        }
    };

    let column = |name: &str| header.iter().position(|h| h == name);
    let require = |name: &str| column(name).ok_or_else(|| CsvError::MissingColumn(name.to_string()));

    let temperature_idx = require("temperature")?;
    let humidity_idx = require("humidity")?;
    let pressure_idx = require("pressure")?;
    let disaster_idx = column("disaster_type").or_else(|| column("predicted_disaster"));

    let mut readings = Vec::new();

    for (i, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        let line_no = i + 1;
        let fields = split_fields(line);

        let number = |idx: usize, name: &str| -> Result<f64, CsvError> {
            let raw = fields.get(idx).map(|s| s.trim()).unwrap_or("");
            raw.parse::<f64>().map_err(|_| CsvError::BadValue {
                line: line_no,
                column: name.to_string(),
                value: raw.to_string(),
            })
        };

        let disaster_type = disaster_idx
            .and_then(|idx| fields.get(idx))
            .map(|s| s.as_str().trim())
            .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("null"))
            .map(String::from);

        readings.push(Reading {
            temperature: number(temperature_idx, "temperature")?,
            humidity: number(humidity_idx, "humidity")?,
            pressure: number(pressure_idx, "pressure")?,
            disaster_type,
        });
    }

    Ok(readings)
}

/// Splits one row into fields, unquoting `"..."` fields (`""` is a
/// literal quote). An unterminated quote runs to the end of the line.
fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' if field.trim().is_empty() => {
                field.clear();
                in_quotes = true;
            }
            ',' if !in_quotes => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }
    fields.push(field);
    fields
}

pub fn load_readings(path: impl AsRef<Path>) -> Result<Vec<Reading>, CsvError> {
    let text = fs::read_to_string(path)?;
    parse_readings(&text)
}

// ============================================================================
// Writing
// ============================================================================

fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

fn quote_field(raw: &str) -> String {
    let flat = raw.replace(['\r', '\n'], " ");
    if flat.contains([',', '"']) {
        format!("\"{}\"", flat.replace('"', "\"\""))
    } else {
        flat
    }
}

fn reading_fields(reading: &Reading) -> String {
    format!(
        "{},{},{},{}",
        reading.temperature,
        reading.humidity,
        reading.pressure,
        quote_field(reading.disaster_type.as_deref().unwrap_or(""))
    )
}

/// Overwrites `path` with a header and one row per reading.
pub fn write_readings(path: impl AsRef<Path>, readings: &[Reading]) -> Result<(), CsvError> {
    let path = path.as_ref();
    ensure_parent(path)?;

    let mut out = String::with_capacity(64 * (readings.len() + 1));
    out.push_str(READINGS_HEADER);
    out.push('\n');
    for reading in readings {
        out.push_str(&reading_fields(reading));
        out.push('\n');
    }

    fs::write(path, out)?;
    Ok(())
}

/// Appends one labeled reading, writing the header first when the file is
/// new or empty.
pub fn append_reading(path: impl AsRef<Path>, labeled: &LabeledReading) -> Result<(), CsvError> {
    let path = path.as_ref();
    ensure_parent(path)?;

    let needs_header = fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;

    if needs_header {
        writeln!(file, "{}", LOG_HEADER)?;
    }
    writeln!(
        file,
        "{},{},{},{}",
        labeled.observed_at.format("%Y-%m-%d %H:%M:%S"),
        reading_fields(&labeled.reading),
        labeled.score,
        labeled.label
    )?;
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::thresholds::ThresholdScorer;
    use crate::model::SeverityLabel;
    use chrono::{TimeZone, Utc};
    use std::path::PathBuf;

    fn scratch_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("disaster_sense_csv_{}", std::process::id()));
        let path = dir.join(name);
        let _ = fs::remove_file(&path);
        path
    }

    // --- Parsing ------------------------------------------------------------

    #[test]
    fn test_parse_sensor_data_file() {
        let text = "temperature,humidity,pressure,disaster_type\n\
                    25.0,70.0,1015.0,flood\n\
                    \n\
                    38.2,44.5,1006.1,wildfire\n";
        let readings = parse_readings(text).expect("well-formed CSV");
        assert_eq!(
            readings,
            vec![
                Reading::new(25.0, 70.0, 1015.0).with_disaster_type("flood"),
                Reading::new(38.2, 44.5, 1006.1).with_disaster_type("wildfire"),
            ]
        );
    }

    #[test]
    fn test_parse_locates_columns_by_header() {
        let text = "timestamp,temperature,humidity,pressure,predicted_disaster,latitude,longitude\n\
                    2024-05-01 12:00:00,28.5,70,1010,None,12.97,77.59\n\
                    2024-05-01 12:00:05,30.1,65,1009,,12.97,77.59\n";
        let readings = parse_readings(text).expect("prediction log layout should parse");
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].temperature, 28.5);
        assert_eq!(readings[0].disaster_type.as_deref(), Some("None"));
        assert_eq!(readings[1].disaster_type, None);
    }

    #[test]
    fn test_parse_without_tag_column() {
        let readings = parse_readings("pressure,humidity,temperature\n1003,35,45\n").expect("should parse");
        assert_eq!(readings, vec![Reading::new(45.0, 35.0, 1003.0)]);
    }

    #[test]
    fn test_empty_text_yields_no_readings() {
        assert_eq!(parse_readings("").expect("empty is fine"), Vec::new());
        assert_eq!(parse_readings("temperature,humidity,pressure\n").expect("header only"), Vec::new());
    }

    #[test]
    fn test_missing_required_column_is_reported() {
        let err = parse_readings("temperature,humidity\n25,70\n").unwrap_err();
        assert_eq!(err, CsvError::MissingColumn("pressure".to_string()));
    }

    #[test]
    fn test_bad_number_reports_line_and_column() {
        let text = "temperature,humidity,pressure\n25,70,1015\n26,wet,1014\n";
        let err = parse_readings(text).unwrap_err();
        assert_eq!(
            err,
            CsvError::BadValue { line: 3, column: "humidity".to_string(), value: "wet".to_string() }
        );
    }

    #[test]
    fn test_short_row_is_a_bad_value() {
        let err = parse_readings("temperature,humidity,pressure\n25,70\n").unwrap_err();
        assert!(matches!(err, CsvError::BadValue { line: 2, ref column, .. } if column == "pressure"));
    }

    // --- Writing ------------------------------------------------------------

    #[test]
    fn test_written_readings_load_back() {
        let path = scratch_path("written.csv");
        let readings = vec![
            Reading::new(25.0, 70.0, 1015.0).with_disaster_type("flood"),
            Reading::new(30.5, 60.0, 1010.2),
        ];
        write_readings(&path, &readings).expect("write should succeed");
        assert_eq!(load_readings(&path).expect("load should succeed"), readings);
    }

    #[test]
    fn test_append_writes_header_once() {
        let path = scratch_path("appended.csv");
        let scorer = ThresholdScorer::default();
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap();

        let first = scorer.classify_at(Reading::new(25.0, 70.0, 1015.0).with_disaster_type("flood"), at);
        let second = scorer.classify_at(Reading::new(30.0, 60.0, 1010.0), at);
        append_reading(&path, &first).expect("first append");
        append_reading(&path, &second).expect("second append");

        let text = fs::read_to_string(&path).expect("log should exist");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], LOG_HEADER);
        assert_eq!(lines[1], "2024-05-01 13:00:00,25,70,1015,flood,45,Safe");
        assert_eq!(lines[2], "2024-05-01 13:00:00,30,60,1010,,60,Warning");

        // The log is itself a readable reading file.
        let reloaded = parse_readings(&text).expect("log should parse");
        assert_eq!(reloaded.len(), 2);
        assert_eq!(
            scorer.policy.label(crate::alert::thresholds::score(&reloaded[1])),
            SeverityLabel::Warning
        );
    }

    #[test]
    fn test_tag_with_comma_survives_write_and_append() {
        let reading = Reading::new(25.0, 70.0, 1015.0).with_disaster_type("flash flood, river");

        let path = scratch_path("comma_tag.csv");
        write_readings(&path, &[reading.clone()]).expect("write should succeed");
        assert_eq!(load_readings(&path).expect("load should succeed"), vec![reading.clone()]);

        let log = scratch_path("comma_log.csv");
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap();
        append_reading(&log, &ThresholdScorer::default().classify_at(reading.clone(), at)).expect("append");
        let text = fs::read_to_string(&log).expect("log should exist");
        let row = text.lines().nth(1).expect("one data row");
        assert_eq!(row, "2024-05-01 13:00:00,25,70,1015,\"flash flood, river\",45,Safe");
        assert_eq!(split_fields(row).len(), LOG_HEADER.split(',').count());
        assert_eq!(parse_readings(&text).expect("log should parse"), vec![reading]);
    }

    #[test]
    fn test_quotes_and_line_breaks_in_tag() {
        let path = scratch_path("quoted_tag.csv");
        write_readings(
            &path,
            &[Reading::new(30.0, 60.0, 1010.0).with_disaster_type("the \"big\" one\nnorth")],
        )
        .expect("write should succeed");

        let readings = load_readings(&path).expect("load should succeed");
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].disaster_type.as_deref(), Some("the \"big\" one north"));
    }

    #[test]
    fn test_split_fields_unquotes() {
        assert_eq!(split_fields("a,\"b,c\",d"), vec!["a", "b,c", "d"]);
        assert_eq!(split_fields("\"say \"\"hi\"\"\",,"), vec!["say \"hi\"", "", ""]);
        assert_eq!(split_fields("plain"), vec!["plain"]);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = load_readings("/nonexistent/sensor_data.csv").unwrap_err();
        assert!(matches!(err, CsvError::Io(_)));
    }
}
