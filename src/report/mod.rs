use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::{debug, warn};

use crate::error::{Error, Result};

/// One compiler performance summary, immutable once parsed. Values stay
/// exactly as read from the report; numeric coercion happens field by field
/// through the accessors below, so a bad field fails at the point of use
/// with its name attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
  fields: BTreeMap<String, String>,
}

impl Summary {
  pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
  where
    K: Into<String>,
    V: Into<String>,
  {
    let fields = pairs
      .into_iter()
      .map(|(k, v)| (k.into(), v.into()))
      .collect();
    Self { fields }
  }

  pub fn get(&self, field: &str) -> Option<&str> {
    self.fields.get(field).map(String::as_str)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }

  pub fn require(&self, field: &'static str) -> Result<&str> {
    self.get(field).ok_or(Error::MissingField { field })
  }

  pub fn require_f64(&self, field: &'static str) -> Result<f64> {
    let value = self.require(field)?;
    value.trim().parse::<f64>().map_err(|_| Error::MalformedField {
      field,
      value: value.to_string(),
    })
  }

  /// Absent field is fine, a present but non-numeric one is not.
  pub fn get_f64(&self, field: &'static str) -> Result<Option<f64>> {
    match self.get(field) {
      None => Ok(None),
      Some(value) => value
        .trim()
        .parse::<f64>()
        .map(Some)
        .map_err(|_| Error::MalformedField {
          field,
          value: value.to_string(),
        }),
    }
  }
}

/// Reads a compiler summary file into a single record. An absent or empty
/// report downgrades to `None` so the caller can still reach a
/// did-not-fit verdict.
pub fn read_summary_file(path: &Path) -> Option<Summary> {
  let text = match fs::read_to_string(path) {
    Ok(text) => text,
    Err(e) => {
      warn!("summary file {} not readable: {}", path.display(), e);
      return None;
    },
  };
  parse_summary(&text)
}

/// Parses header-plus-rows tabular text. The format describes exactly one
/// configuration per file, so anything other than a single data row is
/// treated as no report at all.
pub fn parse_summary(text: &str) -> Option<Summary> {
  let mut lines = text.lines().filter(|line| !line.trim().is_empty());
  let header = lines.next()?;
  let keys: Vec<&str> = header.split(',').map(str::trim).collect();
  let rows: Vec<&str> = lines.collect();

  match rows.len() {
    0 => {
      warn!("summary has a header but no data row");
      None
    },
    1 => {
      let values: Vec<&str> = rows[0].split(',').map(str::trim).collect();
      if values.len() != keys.len() {
        warn!(
          "summary row has {} values for {} header fields",
          values.len(),
          keys.len()
        );
      }
      let summary = Summary::from_pairs(keys.iter().copied().zip(values.iter().copied()));
      for (key, value) in summary.iter() {
        debug!("{} = {}", key, value);
      }
      Some(summary)
    },
    n => {
      warn!("summary has {} data rows, expected exactly one", n);
      None
    },
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_single_row() {
    let text = "memory_mode,core_clock,sram_memory_used\nSram_Only,400000000.0,875.5\n";
    let summary = parse_summary(text).expect("one row expected");
    assert_eq!(summary.get("memory_mode"), Some("Sram_Only"));
    assert_eq!(summary.require_f64("sram_memory_used").unwrap(), 875.5);
    assert_eq!(summary.require_f64("core_clock").unwrap(), 400e6);
  }

  #[test]
  fn header_without_rows_is_missing() {
    assert_eq!(parse_summary("memory_mode,core_clock\n"), None);
  }

  #[test]
  fn empty_text_is_missing() {
    assert_eq!(parse_summary(""), None);
  }

  #[test]
  fn multiple_rows_are_missing() {
    let text = "a,b\n1,2\n3,4\n";
    assert_eq!(parse_summary(text), None);
  }

  #[test]
  fn absent_file_is_missing() {
    assert!(read_summary_file(Path::new("/nonexistent/summary.csv")).is_none());
  }

  #[test]
  fn reads_file_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model_summary_cfg.csv");
    fs::write(&path, "core_clock,inference_time\n400000000.0,0.01395\n").unwrap();
    let summary = read_summary_file(&path).expect("file should parse");
    assert_eq!(summary.require_f64("inference_time").unwrap(), 0.01395);
  }

  #[test]
  fn missing_field_names_the_field() {
    let summary = Summary::from_pairs([("core_clock", "400000000.0")]);
    match summary.require_f64("sram_memory_used") {
      Err(Error::MissingField { field }) => assert_eq!(field, "sram_memory_used"),
      other => panic!("expected MissingField, got {:?}", other),
    }
  }

  #[test]
  fn malformed_field_names_the_field_and_value() {
    let summary = Summary::from_pairs([("sram_memory_used", "lots")]);
    match summary.require_f64("sram_memory_used") {
      Err(Error::MalformedField { field, value }) => {
        assert_eq!(field, "sram_memory_used");
        assert_eq!(value, "lots");
      },
      other => panic!("expected MalformedField, got {:?}", other),
    }
  }

  #[test]
  fn optional_field_tolerates_absence_but_not_garbage() {
    let summary = Summary::from_pairs([("cycles_npu", "0.0")]);
    assert_eq!(summary.get_f64("cycles_npu").unwrap(), Some(0.0));
    assert_eq!(summary.get_f64("cycles_total").unwrap(), None);

    let bad = Summary::from_pairs([("cycles_npu", "n/a")]);
    assert!(bad.get_f64("cycles_npu").is_err());
  }
}
