//! Reads organization records from a delimited text file.
//!
//! Expected columns (any order, case-insensitive, surrounding whitespace
//! ignored): `<level>_code` holds the natural key and `<level>` the display
//! name, for each of division, facility, department, bu, bsu.

use std::collections::HashMap;
use std::path::Path;

use itertools::Itertools;
use tracing::{debug, instrument};

use crate::domain::{Level, LevelEntry, OrgRecord};
use crate::infrastructure::error::{InfraError, InfraResult};

/// UTF-8 BOM bytes.
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Strip UTF-8 BOM from the beginning of data if present.
fn strip_bom(data: &[u8]) -> &[u8] {
    data.strip_prefix(UTF8_BOM).unwrap_or(data)
}

/// Read all records from `path`.
#[instrument(level = "debug")]
pub fn read_records(path: &Path, delimiter: char) -> InfraResult<Vec<OrgRecord>> {
    let data = std::fs::read(path)
        .map_err(|e| InfraError::io(format!("read {}", path.display()), e))?;
    parse_records(&data, delimiter).map_err(|message| InfraError::csv(path, message))
}

/// Parse records from raw bytes; the error is a human-readable message.
pub fn parse_records(data: &[u8], delimiter: char) -> Result<Vec<OrgRecord>, String> {
    if !delimiter.is_ascii() {
        return Err(format!("delimiter must be an ASCII character: {:?}", delimiter));
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .has_headers(true)
        .flexible(true)
        .from_reader(strip_bom(data));

    let headers: HashMap<String, usize> = reader
        .headers()
        .map_err(|e| format!("cannot read header: {}", e))?
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim().to_lowercase(), i))
        .collect();

    let missing = Level::ALL
        .iter()
        .flat_map(|level| [level.code_column(), level.name_column()])
        .filter(|column| !headers.contains_key(*column))
        .join(", ");
    if !missing.is_empty() {
        return Err(format!("missing headers: {}", missing));
    }

    let column = |name: &str| headers.get(name).copied();
    let mut records = Vec::new();
    for result in reader.records() {
        let row = result.map_err(|e| format!("invalid row: {}", e))?;
        // Header is line 1
        let position = row
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(records.len() + 2);

        let field = |name: &str| -> String {
            column(name)
                .and_then(|i| row.get(i))
                .unwrap_or("")
                .trim()
                .to_string()
        };
        let entries = Level::ALL
            .map(|level| LevelEntry::new(field(level.code_column()), field(level.name_column())));
        records.push(OrgRecord::new(position, entries));
    }

    debug!("parsed {} records", records.len());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "division_code;division;facility_code;facility;department_code;department;bu_code;bu;bsu_code;bsu";

    #[test]
    fn given_bom_and_mixed_case_header_when_parsing_then_reads_rows() {
        let mut data = UTF8_BOM.to_vec();
        data.extend_from_slice(HEADER.to_uppercase().replace("BU;", " bu ;").as_bytes());
        data.extend_from_slice(b"\nD1;Div;F1;Fac;P1;Dep;B1;Bu;U1;Unit\n");

        let records = parse_records(&data, ';').unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].position, 2);
        assert_eq!(records[0].entry(Level::Division), &LevelEntry::new("D1", "Div"));
        assert_eq!(records[0].entry(Level::Bsu), &LevelEntry::new("U1", "Unit"));
    }

    #[test]
    fn given_missing_columns_when_parsing_then_lists_them() {
        let data = b"division_code;division\nD1;Div\n";
        let err = parse_records(data, ';').unwrap_err();
        assert!(err.contains("facility_code"));
        assert!(err.contains("bsu"));
    }

    #[test]
    fn given_separator_only_row_when_parsing_then_keeps_it_as_empty_record() {
        let data = format!("{}\nD1;Div;F1;Fac;P1;Dep;B1;Bu;U1;Unit\n;;;;;;;;;\nD1;Div;F1;Fac;P1;Dep;B1;Bu;U2;Unit 2\n", HEADER);
        let records = parse_records(data.as_bytes(), ';').unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].position, 3);
        assert!(records[1].entry(Level::Division).description.is_empty());
        assert_eq!(records[2].position, 4);
    }
}
