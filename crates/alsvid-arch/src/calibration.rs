//! Device calibration data.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::dijkstra::Edge;
use crate::error::{ArchError, ArchResult};

/// Calibration record for a single physical qubit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationData {
    /// Physical qubit index.
    pub qubit: u16,
    /// T1 relaxation time (µs).
    pub t1: f64,
    /// T2 dephasing time (µs).
    pub t2: f64,
    /// Qubit frequency (GHz).
    pub frequency: f64,
    /// Readout error rate.
    pub readout_error: f64,
    /// Single-qubit gate error rate.
    pub single_qubit_error: f64,
    /// CNOT error rates keyed by directed edge, this qubit as control.
    pub cnot_errors: FxHashMap<Edge, f64>,
    /// Calibration timestamp, as given in the data file.
    pub date: String,
}

/// Split a CSV line on `separator`, honoring `"`-escaped fields and
/// dropping `\` characters.
pub(crate) fn parse_csv_line(line: &str, separator: char) -> Vec<String> {
    let mut result = vec![];
    let mut word = String::new();
    let mut in_escape = false;
    for c in line.chars() {
        if c == '\\' {
            continue;
        }
        if c == '"' {
            in_escape = !in_escape;
        } else if c == separator && !in_escape {
            result.push(std::mem::take(&mut word));
        } else {
            word.push(c);
        }
    }
    result.push(word);
    result
}

/// Parse a `cnotList` field: entries `u_v: err` separated by `;` or `,`.
pub(crate) fn parse_cnot_list(field: &str) -> ArchResult<Vec<(Edge, f64)>> {
    let mut entries = vec![];
    for raw in field.split([';', ',']) {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        let (pair, value) = raw.split_once(':').ok_or_else(|| {
            ArchError::InvalidCalibration(format!("malformed cnot entry: {raw}"))
        })?;
        let (u, v) = pair.trim().split_once('_').ok_or_else(|| {
            ArchError::InvalidCalibration(format!("malformed cnot edge: {pair}"))
        })?;
        let u: u16 = u.trim().parse().map_err(|_| {
            ArchError::InvalidCalibration(format!("invalid qubit index: {u}"))
        })?;
        let v: u16 = v.trim().parse().map_err(|_| {
            ArchError::InvalidCalibration(format!("invalid qubit index: {v}"))
        })?;
        let err: f64 = value.trim().parse().map_err(|_| {
            ArchError::InvalidCalibration(format!("invalid error rate: {value}"))
        })?;
        entries.push(((u, v), err));
    }
    Ok(entries)
}

impl CalibrationData {
    /// Parse one CSV row `qubit,T1,T2,frequency,readoutError,singleErr,cnotList,date`.
    pub(crate) fn from_csv_row(qubit: u16, line: &str) -> ArchResult<Self> {
        let fields = parse_csv_line(line, ',');
        if fields.len() < 8 {
            return Err(ArchError::InvalidCalibration(format!(
                "expected 8 fields, got {}: {line}",
                fields.len()
            )));
        }
        let num = |idx: usize| -> ArchResult<f64> {
            fields[idx].trim().parse().map_err(|_| {
                ArchError::InvalidCalibration(format!("invalid number in field {idx}: {}", fields[idx]))
            })
        };

        // the cnotList field was split by the csv pass as well; stitch the
        // pieces back together before parsing the edge entries
        let cnot_field = fields[6..fields.len() - 1].join(",");
        let cnot_errors = parse_cnot_list(&cnot_field)?.into_iter().collect();

        Ok(Self {
            qubit,
            t1: num(1)?,
            t2: num(2)?,
            frequency: num(3)?,
            readout_error: num(4)?,
            single_qubit_error: num(5)?,
            cnot_errors,
            date: fields[fields.len() - 1].trim().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_csv_line_with_quotes() {
        let fields = parse_csv_line("0,50.1,70.2,\"a,b\",x", ',');
        assert_eq!(fields, vec!["0", "50.1", "70.2", "a,b", "x"]);
    }

    #[test]
    fn test_parse_cnot_list() {
        let entries = parse_cnot_list("0_1: 0.012; 0_2: 0.034").unwrap();
        assert_eq!(entries, vec![((0, 1), 0.012), ((0, 2), 0.034)]);
    }

    #[test]
    fn test_parse_cnot_list_rejects_garbage() {
        assert!(parse_cnot_list("0-1 0.012").is_err());
    }

    #[test]
    fn test_from_csv_row() {
        let row = "Q0,51.2,70.9,4.97,0.02,0.0005,\"0_1: 0.013, 0_2: 0.021\",2024-11-02";
        let cal = CalibrationData::from_csv_row(0, row).unwrap();
        assert_eq!(cal.qubit, 0);
        assert_eq!(cal.t1, 51.2);
        assert_eq!(cal.single_qubit_error, 0.0005);
        assert_eq!(cal.cnot_errors.get(&(0, 1)), Some(&0.013));
        assert_eq!(cal.cnot_errors.get(&(0, 2)), Some(&0.021));
        assert_eq!(cal.date, "2024-11-02");
    }
}
