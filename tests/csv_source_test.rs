//! Tests for reading records from delimited files

use std::fs;

use rstest::rstest;
use tempfile::TempDir;

use orgsync::domain::{DomainError, ForestBuilder, Level};
use orgsync::infrastructure::csv_source::read_records;
use orgsync::infrastructure::InfraError;

const HEADER: &str =
    "division_code;division;facility_code;facility;department_code;department;bu_code;bu;bsu_code;bsu";

fn write_csv(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("org.csv");
    fs::write(&path, content).expect("write csv");
    path
}

#[test]
fn given_export_file_when_reading_then_builds_expected_forest() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = write_csv(
        &temp,
        &format!(
            "{}\nD1;North;F1;Plant;P1;Assembly;B1;Body;U1;Doors\nD1;North;F1;Plant;P1;Assembly;B1;Body;U2;Roofs\n",
            HEADER
        ),
    );

    // Act
    let records = read_records(&path, ';').unwrap();
    let (forest, stats) = ForestBuilder::build(records).unwrap();

    // Assert
    assert_eq!(stats.records, 2);
    assert_eq!(stats.nodes_per_level, [1, 1, 1, 1, 2]);
    let root = forest.get_node(forest.roots()[0]).unwrap();
    assert_eq!(root.data.description, "D1");
    assert_eq!(root.data.name, "North");
}

#[test]
fn given_reordered_columns_and_comma_delimiter_when_reading_then_maps_by_header() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = write_csv(
        &temp,
        "BSU,bsu_code,bu,bu_code,department,department_code,facility,facility_code,division,division_code\n\
         Doors,U1,Body,B1,Assembly,P1,Plant,F1,North,D1\n",
    );

    // Act
    let records = read_records(&path, ',').unwrap();

    // Assert
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].entry(Level::Division).description, "D1");
    assert_eq!(records[0].entry(Level::Bsu).name, "Doors");
}

#[test]
fn given_row_with_missing_department_when_building_then_error_names_line() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = write_csv(
        &temp,
        &format!(
            "{}\nD1;North;F1;Plant;P1;Assembly;B1;Body;U1;Doors\nD1;North;F1;Plant;;;B1;Body;U2;Roofs\n",
            HEADER
        ),
    );

    // Act
    let records = read_records(&path, ';').unwrap();
    let err = ForestBuilder::build(records).unwrap_err();

    // Assert
    assert!(err.to_string().contains("record 3"), "{}", err);
}

#[test]
fn given_separator_only_row_when_building_then_rejects_with_its_line() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = write_csv(
        &temp,
        &format!(
            "{}\nD1;North;F1;Plant;P1;Assembly;B1;Body;U1;Doors\n;;;;;;;;;\n",
            HEADER
        ),
    );

    // Act
    let records = read_records(&path, ';').unwrap();
    let err = ForestBuilder::build(records).unwrap_err();

    // Assert
    assert!(matches!(
        err,
        DomainError::MalformedInput {
            position: 3,
            level: Level::Division,
            ..
        }
    ));
}

#[rstest]
#[case::missing_file(None)]
#[case::missing_columns(Some("division_code;division\nD1;North\n"))]
fn given_unusable_input_when_reading_then_fails(#[case] content: Option<&str>) {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = match content {
        Some(content) => write_csv(&temp, content),
        None => temp.path().join("absent.csv"),
    };

    // Act
    let result = read_records(&path, ';');

    // Assert
    match (content, result) {
        (None, Err(InfraError::Io { source, .. })) => {
            assert_eq!(source.kind(), std::io::ErrorKind::NotFound)
        }
        (Some(_), Err(InfraError::Csv { message, .. })) => {
            assert!(message.contains("facility_code"))
        }
        (_, other) => panic!("unexpected result: {:?}", other.map(|r| r.len())),
    }
}
