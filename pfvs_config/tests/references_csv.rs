use std::fs::File;
use std::io::Write;

use pfvs_config::{load_references_csv, read_references};
use pfvs_traits::ColorLabel;
use rstest::rstest;
use tempfile::tempdir;

const HEADER: &str = "material,color,c0,c1,c2,c3,c4,c5,c6,c7,c8,c9,c10,c11,c12,c13,c14,c15,c16,c17";

fn row(material: &str, color: &str, base: f32) -> String {
    let values: Vec<String> = (0..18).map(|i| format!("{:.1}", base + i as f32)).collect();
    format!("{material},{color},{}", values.join(","))
}

#[rstest]
fn parses_rows_in_order() {
    let csv = format!("{HEADER}\n{}\n{}\n", row("PLA", "R", 100.0), row("ASA", "k", 40.0));
    let rows = read_references(csv.as_bytes()).expect("parse");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].material, "PLA");
    assert_eq!(rows[0].color, ColorLabel::R);
    assert!((rows[0].channels[17] - 117.0).abs() < 1e-6);
    assert_eq!(rows[1].color, ColorLabel::K);
}

#[rstest]
fn rejects_wrong_header() {
    let csv = format!("material,colour{}\n", ",c0".repeat(18));
    let err = read_references(csv.as_bytes()).expect_err("bad header");
    assert!(err.to_string().contains("must have headers"));
}

#[rstest]
fn rejects_empty_table() {
    let csv = format!("{HEADER}\n");
    let err = read_references(csv.as_bytes()).expect_err("no rows");
    assert!(err.to_string().contains("no spectra"));
}

#[rstest]
#[case(row("PLA", "Z", 1.0), "unknown color code")]
#[case(row("", "R", 1.0), "material must not be empty")]
#[case(row("PLA", "R", 1.0).replace("10.0", "NaN"), "must be finite")]
#[case(row("PLA", "R", 1.0).replace("10.0", "abc"), "c9")]
fn rejects_bad_rows(#[case] line: String, #[case] expected: &str) {
    let csv = format!("{HEADER}\n{line}\n");
    let err = read_references(csv.as_bytes()).expect_err("bad row");
    assert!(
        format!("{err:#}").contains(expected),
        "expected {expected:?} in {err:#}"
    );
}

#[rstest]
fn rejects_short_rows() {
    let csv = format!("{HEADER}\nPLA,R,1.0,2.0\n");
    let err = read_references(csv.as_bytes()).expect_err("short row");
    assert!(err.to_string().contains("invalid CSV row 2"));
}

#[rstest]
fn loads_from_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("refs.csv");
    let mut f = File::create(&path).unwrap();
    writeln!(f, "{HEADER}").unwrap();
    writeln!(f, "{}", row("PETG", "B", 400.0)).unwrap();
    drop(f);

    let rows = load_references_csv(&path).expect("load");
    assert_eq!(rows[0].material, "PETG");
}

#[rstest]
fn missing_file_names_the_path() {
    let err = load_references_csv(std::path::Path::new("/nonexistent/refs.csv"))
        .expect_err("missing file");
    assert!(err.to_string().contains("refs.csv"));
}
