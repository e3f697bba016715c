// End-to-end: parser JSON → statement page → extraction → period ledger

use securities_ledger::{
    extract, extract_period_key, Amount, CategoryCatalog, Config, Document, InputError, Ledger,
    PeriodKey, Pipeline, TableGrid, UpsertOutcome,
};
use std::fs;

const STATEMENT_JSON: &str = r#"{
    "pages": [
        {"text": "証券残高報告書"},
        {
            "text": "2025年3月中平残 (単位:百万円)\n国 債 1,234,567\n短 期 社 債 12,345\n社 債 67,890\n株 式 42",
            "tables": [[["外国証券", null, "88,000"]]]
        }
    ]
}"#;

fn write_statement(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let path = dir.path().join("statement.json");
    fs::write(&path, STATEMENT_JSON).unwrap();
    path
}

#[test]
fn test_unmentioned_categories_are_not_found() {
    let extraction = extract("国 債 1,234,567", &[]);

    assert_eq!(extraction.amounts.get("government-bond"), Amount::Value(1_234_567));
    for name in ["municipal-bond", "short-term-note", "corporate-bond", "equity"] {
        assert_eq!(extraction.amounts.get(name), Amount::NotFound, "{}", name);
    }
}

#[test]
fn test_short_term_note_is_not_read_as_bond() {
    let extraction = extract("短 期 社 債 12,345", &[]);

    assert_eq!(extraction.amounts.get("short-term-note"), Amount::Value(12_345));
    assert_eq!(extraction.amounts.get("corporate-bond"), Amount::NotFound);

    let extraction = extract("短 期 社 債 12,345\n社 債 67,890", &[]);
    assert_eq!(extraction.amounts.get("short-term-note"), Amount::Value(12_345));
    assert_eq!(extraction.amounts.get("corporate-bond"), Amount::Value(67_890));
}

#[test]
fn test_irregular_spacing_keeps_short_term_note_apart() {
    let extraction = extract("短期 社債 5,000\n社 債 67,890", &[]);
    assert_eq!(extraction.amounts.get("short-term-note"), Amount::Value(5_000));
    assert_eq!(extraction.amounts.get("corporate-bond"), Amount::Value(67_890));

    let table = TableGrid::new(vec![vec![Some("短 期社債".to_string()), None, Some("5,000".to_string())]]);
    let extraction = extract("", &[table]);
    assert_eq!(extraction.amounts.get("short-term-note"), Amount::Value(5_000));
    assert_eq!(extraction.amounts.get("corporate-bond"), Amount::NotFound);
}

#[test]
fn test_short_numbers_never_accepted() {
    let extraction = extract("株 式 123\n地 方 債 9,99", &[]);

    assert_eq!(extraction.amounts.get("equity"), Amount::NotFound);
    assert_eq!(extraction.amounts.get("municipal-bond"), Amount::NotFound);
}

#[test]
fn test_empty_input_does_not_fail() {
    let extraction = extract("", &[TableGrid::default()]);

    assert_eq!(extraction.amounts.len(), 7);
    assert_eq!(extraction.amounts.found_count(), 0);
}

#[test]
fn test_period_from_statement_heading() {
    let key = extract_period_key("2025年3月中平残").unwrap();
    assert_eq!(key, PeriodKey::new(2025, 3).unwrap());
    assert_eq!(key.as_str(), "2025-03");
}

#[test]
fn test_statement_import_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let document = Document::from_json_file(write_statement(&dir)).unwrap();

    let extraction = Pipeline::default().process_document(&document).unwrap();
    assert_eq!(extraction.amounts.get("government-bond"), Amount::Value(1_234_567));
    assert_eq!(extraction.amounts.get("short-term-note"), Amount::Value(12_345));
    assert_eq!(extraction.amounts.get("corporate-bond"), Amount::Value(67_890));
    assert_eq!(extraction.amounts.get("equity"), Amount::NotFound);
    assert_eq!(extraction.amounts.get("foreign-securities"), Amount::Value(88_000));

    let record = extraction.into_record(None, &[]).unwrap();
    let ledger = Ledger::open(dir.path().join("ledger.csv"), CategoryCatalog::standard());

    assert_eq!(ledger.upsert(record.clone()).unwrap(), UpsertOutcome::Inserted);
    assert_eq!(ledger.upsert(record.clone()).unwrap(), UpsertOutcome::Updated);

    let records = ledger.load_all().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].period, record.period);
    assert_eq!(records[0].amounts, record.amounts);
}

#[test]
fn test_ledger_stays_sorted_and_unique() {
    let dir = tempfile::tempdir().unwrap();
    let document = Document::from_json_file(write_statement(&dir)).unwrap();
    let pipeline = Pipeline::default();
    let ledger = Ledger::open(dir.path().join("nested").join("ledger.csv"), CategoryCatalog::standard());

    for (year, month) in [(2025, 3), (2024, 11), (2025, 1), (2024, 11), (2025, 12)] {
        let record = pipeline
            .process_document(&document)
            .unwrap()
            .into_record(PeriodKey::new(year, month), &[])
            .unwrap();
        ledger.upsert(record).unwrap();
    }

    let periods: Vec<String> = ledger
        .load_all()
        .unwrap()
        .into_iter()
        .map(|r| r.period.to_string())
        .collect();
    assert_eq!(periods, vec!["2024-11", "2025-01", "2025-03", "2025-12"]);
    assert_eq!(ledger.latest().unwrap().unwrap().period.as_str(), "2025-12");
}

#[test]
fn test_configured_pipeline_reads_other_page() {
    let dir = tempfile::tempdir().unwrap();
    let document = Document::from_json_file(write_statement(&dir)).unwrap();

    let config = Config {
        statement_page: 0,
        ..Config::default()
    };
    let extraction = Pipeline::from_config(&config)
        .unwrap()
        .process_document(&document)
        .unwrap();

    assert!(extraction.period.is_none());
    assert_eq!(extraction.amounts.found_count(), 0);
    assert!(matches!(
        extraction.into_record(None, &[]),
        Err(InputError::UnknownPeriod)
    ));
}

#[test]
fn test_unreadable_document() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    fs::write(&path, "{ pages: ").unwrap();

    assert!(matches!(Document::from_json_file(&path), Err(InputError::Parse { .. })));
    assert!(matches!(
        Document::from_json_file(dir.path().join("absent.json")),
        Err(InputError::Io { .. })
    ));
}
