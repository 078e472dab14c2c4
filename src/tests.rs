use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::Connection;
use serde_json::json;

use crate::config::{default_db_path, AppConfig};
use crate::domain::aggregate::{compute_aggregates, row_total, ColumnKind};
use crate::domain::entities::dataset::{ColumnOrder, DatasetKind, DatasetState};
use crate::domain::entities::edit::CellEdit;
use crate::domain::entities::row::{parse_number_prefix, CellValue, Row, RowId, ROW_TOTAL_FIELD};
use crate::domain::entities::view::{ColumnTotal, GridKey, GridRow};
use crate::domain::error::ValidationError;
use crate::domain::projection::project;
use crate::domain::store::RowStore;
use crate::infra::import::{read_table, ParseError, SourceFormat};
use crate::infra::sqlite::queries::{
    clear_dataset, collect_headers, list_datasets, load_rows, save_rows,
};
use crate::infra::sqlite::repo::SqliteGateway;
use crate::infra::sqlite::schema::init_db;
use crate::render::render_table;
use crate::usecase::ports::gateway::{
    AckResponse, LoadResponse, PersistenceGateway, RemoteError,
};
use crate::usecase::services::controller::{ControllerError, DatasetController};
use crate::usecase::services::requests::{Applied, RequestKind};
use crate::usecase::services::status::StatusLevel;
use crate::usecase::services::workspace::Workspace;

fn unique_test_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock should be after epoch")
        .as_nanos();
    std::env::temp_dir().join(format!("tabledesk-{prefix}-{nanos}"))
}

fn school(id: i64, name: &str, capacity: i64) -> Row {
    Row::with_fields(
        id,
        [
            ("School Name", CellValue::from(name)),
            ("Capacity", CellValue::from(capacity)),
        ],
    )
}

fn school_columns() -> ColumnOrder {
    ColumnOrder::new(["School Name", "Capacity"])
}

fn totals_of(view: &[GridRow]) -> Option<&crate::domain::entities::view::TotalsRow> {
    match view.last() {
        Some(GridRow::Totals(totals)) => Some(totals),
        _ => None,
    }
}

fn loaded_controller(rows: Vec<Row>, columns: &[&str]) -> DatasetController {
    let mut controller = DatasetController::new(DatasetKind::Configuration);
    controller
        .import_replace(rows, Some(columns.iter().map(|c| c.to_string()).collect()))
        .expect("rows should import");
    controller
}

/// Gateway returning queued answers and recording every save.
#[derive(Default)]
struct ScriptedGateway {
    loads: Mutex<Vec<Result<LoadResponse, RemoteError>>>,
    acks: Mutex<Vec<Result<AckResponse, RemoteError>>>,
    saved: Mutex<Vec<Vec<Row>>>,
}

impl ScriptedGateway {
    fn with_load(self, response: Result<LoadResponse, RemoteError>) -> Self {
        self.loads.lock().expect("lock").push(response);
        self
    }

    fn with_ack(self, response: Result<AckResponse, RemoteError>) -> Self {
        self.acks.lock().expect("lock").push(response);
        self
    }

    fn next_load(&self) -> Result<LoadResponse, RemoteError> {
        let mut loads = self.loads.lock().expect("lock");
        if loads.is_empty() {
            Ok(LoadResponse::loaded(Vec::new(), Vec::new()))
        } else {
            loads.remove(0)
        }
    }

    fn next_ack(&self) -> Result<AckResponse, RemoteError> {
        let mut acks = self.acks.lock().expect("lock");
        if acks.is_empty() {
            Ok(AckResponse {
                success: true,
                message: None,
                error: None,
            })
        } else {
            acks.remove(0)
        }
    }
}

impl PersistenceGateway for ScriptedGateway {
    fn import(&self, _kind: DatasetKind, _file: &Path) -> Result<LoadResponse, RemoteError> {
        self.next_load()
    }

    fn load(&self, _kind: DatasetKind) -> Result<LoadResponse, RemoteError> {
        self.next_load()
    }

    fn save(
        &self,
        _kind: DatasetKind,
        rows: &[Row],
        _id_high_water: RowId,
    ) -> Result<AckResponse, RemoteError> {
        self.saved.lock().expect("lock").push(rows.to_vec());
        self.next_ack()
    }

    fn clear(&self, _kind: DatasetKind) -> Result<AckResponse, RemoteError> {
        self.next_ack()
    }
}

#[test]
fn imported_schools_project_row_totals_and_totals_row() {
    let controller = loaded_controller(
        vec![school(1, "Alpha", 10), school(2, "Beta", 20)],
        &["School Name", "Capacity"],
    );

    let view = controller.view();

    assert_eq!(view.len(), 3);
    assert_eq!(view[0].row_total(), 10.0);
    assert_eq!(view[1].row_total(), 20.0);
    let totals = totals_of(&view).expect("totals row should be last");
    assert_eq!(totals.get("School Name"), Some(ColumnTotal::Blank));
    assert_eq!(totals.get("Capacity"), Some(ColumnTotal::Sum(30.0)));
    assert_eq!(totals.row_total, 30.0);

    assert_eq!(
        view[2].to_json(),
        json!({"id": "total-row", "School Name": "", "Capacity": 30, "rowTotal": 30})
    );
}

#[test]
fn aggregation_ignores_existing_row_total_field() {
    let rows = vec![school(1, "Alpha", 10), school(2, "Beta", 20)];
    let first = compute_aggregates(&rows, &school_columns());

    let redecorated: Vec<Row> = first
        .rows
        .iter()
        .map(|decorated| {
            let mut row = decorated.row.clone();
            row.set(
                ROW_TOTAL_FIELD.to_string(),
                CellValue::Number(decorated.row_total),
            );
            row
        })
        .collect();
    let second = compute_aggregates(&redecorated, &school_columns());

    let before: Vec<f64> = first.rows.iter().map(|row| row.row_total).collect();
    let after: Vec<f64> = second.rows.iter().map(|row| row.row_total).collect();
    assert_eq!(before, after);
    assert_eq!(first.totals, second.totals);
}

#[test]
fn grand_total_is_sum_of_numeric_column_totals() {
    let rows = vec![
        Row::with_fields(1_i64, [("Name", "a"), ("Seats", "4"), ("Rooms", "2.5"), ("Email", "9")]),
        Row::with_fields(2_i64, [("Name", "b"), ("Seats", "x"), ("Rooms", "1"), ("Email", "1")]),
    ];
    let columns = ColumnOrder::new(["Name", "Seats", "Rooms", "Email"]);

    let totals = compute_aggregates(&rows, &columns)
        .totals
        .expect("totals should exist");

    let numeric_sum: f64 = totals
        .columns
        .iter()
        .filter(|(name, _)| ColumnKind::classify(name) == ColumnKind::Numeric)
        .filter_map(|(_, total)| total.sum())
        .sum();
    assert_eq!(totals.row_total, numeric_sum);
    assert_eq!(totals.row_total, 7.5);
}

#[test]
fn totals_reflect_only_filtered_rows() {
    let rows = vec![
        Row::with_fields(1_i64, [("a", CellValue::from("x")), ("n", CellValue::Number(10.0))]),
        Row::with_fields(2_i64, [("a", CellValue::from("y")), ("n", CellValue::Number(20.0))]),
    ];
    let columns = ColumnOrder::new(["a", "n"]);

    let view = project(&rows, &columns, "x");

    assert_eq!(view.len(), 2);
    assert_eq!(view[0].key(), GridKey::Row(RowId(1)));
    let totals = totals_of(&view).expect("totals row should be last");
    assert_eq!(totals.get("n"), Some(ColumnTotal::Sum(10.0)));
}

#[test]
fn search_is_case_insensitive_and_blank_search_shows_all() {
    let rows = vec![school(1, "Alpha", 10), school(2, "Beta", 20)];

    assert_eq!(project(&rows, &school_columns(), "ALP").len(), 2);
    assert_eq!(project(&rows, &school_columns(), "   ").len(), 3);
    assert_eq!(project(&rows, &school_columns(), "20").len(), 2);
    assert!(project(&rows, &school_columns(), "zzz").is_empty());
}

#[test]
fn search_matches_row_id() {
    let rows = vec![school(1, "Alpha", 10), school(42, "Beta", 20)];

    let view = project(&rows, &school_columns(), "42");

    assert_eq!(view[0].key(), GridKey::Row(RowId(42)));
    assert_eq!(view.len(), 2);
}

#[test]
fn empty_rows_produce_no_totals_row() {
    let aggregates = compute_aggregates(&[], &school_columns());

    assert!(aggregates.rows.is_empty());
    assert!(aggregates.totals.is_none());
}

#[test]
fn email_column_totals_to_blank() {
    let rows = vec![
        Row::with_fields(1_i64, [("Email", "a@b.com")]),
        Row::with_fields(2_i64, [("Email", "12")]),
    ];
    let totals = compute_aggregates(&rows, &ColumnOrder::new(["Email"]))
        .totals
        .expect("totals should exist");

    assert_eq!(totals.get("Email"), Some(ColumnTotal::Blank));
    assert_eq!(totals.row_total, 0.0);
}

#[test]
fn column_kind_uses_name_heuristic() {
    assert_eq!(ColumnKind::classify("School Name"), ColumnKind::Text);
    assert_eq!(ColumnKind::classify("Contact EMAIL"), ColumnKind::Text);
    assert_eq!(ColumnKind::classify("Username"), ColumnKind::Text);
    assert_eq!(ColumnKind::classify("Capacity Breakout Session 1"), ColumnKind::Numeric);
}

#[test]
fn number_prefix_parsing_is_best_effort() {
    assert_eq!(parse_number_prefix("12"), Some(12.0));
    assert_eq!(parse_number_prefix("  3.5 seats"), Some(3.5));
    assert_eq!(parse_number_prefix("-.5"), Some(-0.5));
    assert_eq!(parse_number_prefix("1e3x"), Some(1000.0));
    assert_eq!(parse_number_prefix("7e"), Some(7.0));
    assert_eq!(parse_number_prefix("5."), Some(5.0));
    assert_eq!(parse_number_prefix("Infinity"), Some(f64::INFINITY));
    assert_eq!(parse_number_prefix(""), None);
    assert_eq!(parse_number_prefix("."), None);
    assert_eq!(parse_number_prefix("abc 12"), None);
}

#[test]
fn row_total_skips_non_numeric_cells() {
    let row = Row::with_fields(
        1_i64,
        [
            ("Name", CellValue::from("Alpha")),
            ("A", CellValue::from("4 kids")),
            ("B", CellValue::from(f64::NAN)),
            ("C", CellValue::Number(2.0)),
        ],
    );

    assert_eq!(row_total(&row), 6.0);
}

#[test]
fn column_order_falls_back_to_first_row_keys() {
    let rows = vec![school(1, "Alpha", 10)];

    let fallback = ColumnOrder::resolve(None, &rows);
    let empty_declared = ColumnOrder::resolve(Some(Vec::new()), &rows);
    let declared = ColumnOrder::resolve(
        Some(vec!["id".to_string(), "Capacity".to_string()]),
        &rows,
    );

    assert_eq!(fallback.as_slice(), ["School Name", "Capacity"]);
    assert_eq!(empty_declared, fallback);
    assert_eq!(declared.as_slice(), ["Capacity"]);
}

#[test]
fn insert_row_uses_max_id_plus_one() {
    let mut controller = loaded_controller(
        vec![school(1, "A", 1), school(3, "B", 2), school(7, "C", 3)],
        &["School Name", "Capacity"],
    );

    let id = controller.insert_row().expect("row should be inserted");

    assert_eq!(id, RowId(8));
    let inserted = controller.rows().last().expect("row should exist");
    assert_eq!(inserted.id, RowId(8));
    assert_eq!(inserted.get("School Name"), Some(&CellValue::empty()));
    assert_eq!(inserted.get("Capacity"), Some(&CellValue::empty()));
    assert_eq!(
        controller.status().map(|status| status.text.as_str()),
        Some("New row added successfully.")
    );
}

#[test]
fn deleted_ids_are_not_reused() {
    let mut controller = loaded_controller(
        vec![school(1, "A", 1), school(2, "B", 2), school(3, "C", 3)],
        &["School Name", "Capacity"],
    );

    assert_eq!(controller.delete_rows([GridKey::Row(RowId(3))]), 1);
    let id = controller.insert_row().expect("row should be inserted");

    assert_eq!(id, RowId(4));
    let ids: Vec<RowId> = controller.rows().iter().map(|row| row.id).collect();
    assert_eq!(ids, vec![RowId(1), RowId(2), RowId(4)]);
}

#[test]
fn insert_after_largest_possible_id_is_rejected() {
    let mut controller = loaded_controller(
        vec![school(i64::MAX, "A", 1)],
        &["School Name", "Capacity"],
    );

    assert_eq!(
        controller.draft_row(),
        Err(ValidationError::IdSpaceExhausted(RowId(i64::MAX)))
    );
    assert_eq!(controller.insert_row(), None);
    assert_eq!(controller.rows().len(), 1);
    assert!(controller.status().expect("status should be set").is_error());

    let row: Row = serde_json::from_value(json!({"id": 9223372036854775807_i64, "Capacity": 1}))
        .expect("largest integer id should parse");
    let mut controller = DatasetController::new(DatasetKind::Configuration);
    controller
        .import_replace(vec![row], None)
        .expect("row should import");
    assert_eq!(controller.insert_row(), None);
    assert_eq!(controller.rows().len(), 1);
}

#[test]
fn row_json_rejects_float_ids_outside_integer_range() {
    let huge: Result<Row, _> = serde_json::from_value(json!({"id": 1e300}));
    let just_over: Result<Row, _> = serde_json::from_value(json!({"id": 9.3e18}));
    let whole: Row = serde_json::from_value(json!({"id": 3.0})).expect("whole float should parse");

    assert!(huge.is_err());
    assert!(just_over.is_err());
    assert_eq!(whole.id, RowId(3));
}

#[test]
fn deleted_id_stays_retired_across_save_and_reopen() {
    let temp_dir = unique_test_dir("retired-ids");
    fs::create_dir_all(&temp_dir).expect("should create temp dir");
    let db_path = temp_dir.join("app.sqlite");
    let csv_path = temp_dir.join("config.csv");
    fs::write(&csv_path, "School Name,Capacity\nA,1\nB,2\nC,3\n").expect("should write csv");

    let gateway: Arc<dyn PersistenceGateway> = Arc::new(SqliteGateway::new(&db_path));
    let kind = DatasetKind::Configuration;
    let mut workspace = Workspace::new(Arc::clone(&gateway));
    workspace.import(kind, &csv_path).expect("import should succeed");
    workspace.save(kind).expect("save should succeed");
    assert_eq!(workspace.controller_mut(kind).delete_rows([GridKey::Row(RowId(3))]), 1);
    workspace.save(kind).expect("save should succeed");

    assert_eq!(workspace.controller_mut(kind).insert_row(), Some(RowId(4)));

    let mut reopened = Workspace::new(gateway);
    reopened.open(kind).expect("open should succeed");
    assert_eq!(reopened.controller(kind).rows().len(), 2);
    assert_eq!(reopened.controller_mut(kind).insert_row(), Some(RowId(4)));

    fs::remove_dir_all(&temp_dir).expect("should cleanup temp dir");
}

#[test]
fn save_succeeds_when_reload_fails() {
    let gateway = ScriptedGateway::default()
        .with_load(Err(RemoteError::Unavailable("timeout".to_string())));
    let mut controller = loaded_controller(vec![school(1, "A", 1)], &["School Name", "Capacity"]);

    let applied = controller.save(&gateway).expect("save itself should succeed");

    assert_eq!(applied, Applied::Current(()));
    assert_eq!(gateway.saved.lock().expect("lock").len(), 1);
    assert_eq!(controller.rows(), &[school(1, "A", 1)]);
    let status = controller.status().expect("status should be set");
    assert!(status.is_error());
    assert_eq!(status.text, "Error loading data from database.");
}

#[test]
fn numbers_display_like_browser_text() {
    let cases = [
        (f64::INFINITY, "Infinity"),
        (f64::NEG_INFINITY, "-Infinity"),
        (f64::NAN, "NaN"),
        (1e21, "1e+21"),
        (1.25e22, "1.25e+22"),
        (1.5e-7, "1.5e-7"),
        (1e-6, "0.000001"),
        (2.5, "2.5"),
        (100.0, "100"),
        (-0.0, "0"),
    ];

    for (value, expected) in cases {
        assert_eq!(CellValue::Number(value).to_string(), expected, "{value:?}");
    }

    let rows = vec![
        Row::with_fields(1_i64, [("Capacity", CellValue::Number(f64::INFINITY))]),
        Row::with_fields(2_i64, [("Capacity", CellValue::Number(1e21))]),
    ];
    let columns = ColumnOrder::new(["Capacity"]);
    assert_eq!(project(&rows, &columns, "infinity")[0].key(), GridKey::Row(RowId(1)));
    assert_eq!(project(&rows, &columns, "1e+21")[0].key(), GridKey::Row(RowId(2)));
}

#[test]
fn insert_into_empty_store_is_informational_no_op() {
    let mut controller = DatasetController::new(DatasetKind::Preferences);

    assert_eq!(controller.insert_row(), None);
    assert_eq!(controller.state(), DatasetState::Empty);
    assert_eq!(
        controller.status().map(|status| status.level),
        Some(StatusLevel::Info)
    );
}

#[test]
fn edit_cell_changes_only_target_field() {
    let mut controller = loaded_controller(
        vec![
            Row::with_fields(1_i64, [("n", CellValue::Number(1.0)), ("m", CellValue::Number(2.0))]),
            Row::with_fields(2_i64, [("n", CellValue::Number(3.0)), ("m", CellValue::Number(4.0))]),
        ],
        &["n", "m"],
    );
    let before = controller.snapshot();

    controller
        .edit_cell(GridKey::Row(RowId(2)), "n", "5")
        .expect("edit should succeed");
    let after = controller.snapshot();

    assert!(!Arc::ptr_eq(&before.rows, &after.rows));
    assert_eq!(before.rows[0], after.rows[0]);
    assert_eq!(after.rows[1].get("n"), Some(&CellValue::from("5")));
    assert_eq!(after.rows[1].get("m"), before.rows[1].get("m"));
    assert_eq!(after.rows[1].id, RowId(2));
    assert_eq!(before.rows[1].get("n"), Some(&CellValue::Number(3.0)));
    assert_eq!(controller.view()[1].row_total(), 9.0);
}

#[test]
fn edit_cell_rejections_leave_store_untouched() {
    let mut controller = loaded_controller(vec![school(1, "A", 1)], &["School Name", "Capacity"]);
    let before = controller.snapshot();

    assert_eq!(
        controller.edit_cell(GridKey::Totals, "Capacity", "9"),
        Err(ValidationError::ReservedRow)
    );
    assert_eq!(
        controller.edit_cell(GridKey::Row(RowId(99)), "Capacity", "9"),
        Err(ValidationError::RowNotFound(RowId(99)))
    );
    assert_eq!(
        controller.edit_cell(GridKey::Row(RowId(1)), "id", "9"),
        Err(ValidationError::ReservedField("id".to_string()))
    );
    assert_eq!(
        controller.apply_edit(CellEdit::new(RowId(1), "Unknown", "9")),
        Err(ValidationError::UnknownColumn("Unknown".to_string()))
    );

    assert!(Arc::ptr_eq(&before.rows, &controller.snapshot().rows));
    assert!(controller.status().expect("status should be set").is_error());
}

#[test]
fn replace_row_merges_fields_of_existing_row() {
    let mut controller = loaded_controller(
        vec![school(1, "A", 1), school(2, "B", 2)],
        &["School Name", "Capacity"],
    );

    controller
        .replace_row(Row::with_fields(2_i64, [("Capacity", CellValue::Number(12.0))]))
        .expect("row should be replaced");

    let row = &controller.rows()[1];
    assert_eq!(row.get("School Name"), Some(&CellValue::from("B")));
    assert_eq!(row.get("Capacity"), Some(&CellValue::Number(12.0)));
    assert_eq!(
        controller.replace_row(Row::with_fields(2_i64, [("Extra", CellValue::Number(1.0))])),
        Err(ValidationError::UnknownColumn("Extra".to_string()))
    );
}

#[test]
fn delete_ignores_totals_and_clears_selection() {
    let mut controller = loaded_controller(
        vec![school(1, "A", 1), school(2, "B", 2), school(3, "C", 3)],
        &["School Name", "Capacity"],
    );

    assert_eq!(controller.delete_rows(Vec::<GridKey>::new()), 0);
    assert_eq!(controller.delete_rows([GridKey::Totals]), 0);
    assert_eq!(controller.rows().len(), 3);

    assert!(controller.select(GridKey::Row(RowId(1))));
    assert!(!controller.select(GridKey::Totals));
    assert!(!controller.select(GridKey::Row(RowId(42))));
    controller.toggle(GridKey::Row(RowId(3)));
    assert_eq!(controller.selection().len(), 2);

    assert_eq!(controller.delete_selected(), 2);
    assert!(controller.selection().is_empty());
    let ids: Vec<RowId> = controller.rows().iter().map(|row| row.id).collect();
    assert_eq!(ids, vec![RowId(2)]);
    assert_eq!(
        controller.status().map(|status| status.text.as_str()),
        Some("2 row(s) deleted successfully.")
    );
}

#[test]
fn set_selection_drops_unknown_ids() {
    let mut controller = loaded_controller(vec![school(1, "A", 1)], &["School Name", "Capacity"]);

    controller.set_selection([GridKey::Row(RowId(1)), GridKey::Row(RowId(2)), GridKey::Totals]);

    assert_eq!(controller.selection().len(), 1);
    assert!(controller.selection().contains(RowId(1)));
}

#[test]
fn import_with_duplicate_ids_is_rejected() {
    let mut controller = loaded_controller(vec![school(1, "A", 1)], &["School Name", "Capacity"]);

    let result = controller.import_replace(vec![school(5, "X", 1), school(5, "Y", 2)], None);

    assert_eq!(result, Err(ValidationError::DuplicateRowId(RowId(5))));
    assert_eq!(controller.rows(), &[school(1, "A", 1)]);
}

#[test]
fn row_store_set_cell_accepts_declared_column_missing_from_row() {
    let mut store = RowStore::default();
    store
        .replace(
            vec![Row::with_fields(1_i64, [("a", "1")])],
            Some(vec!["a".to_string(), "b".to_string()]),
        )
        .expect("rows should be stored");

    store
        .set_cell(RowId(1), "b", CellValue::from("2"))
        .expect("declared column should be editable");

    assert_eq!(store.rows()[0].get("b"), Some(&CellValue::from("2")));
}

#[test]
fn save_payload_never_contains_totals_row() {
    let gateway = ScriptedGateway::default()
        .with_ack(Ok(AckResponse::ok("stored")))
        .with_load(Ok(LoadResponse::loaded(
            vec![school(1, "Alpha", 10)],
            vec!["School Name".to_string(), "Capacity".to_string()],
        )));
    let mut controller = loaded_controller(
        vec![school(1, "Alpha", 10), school(2, "Beta", 20)],
        &["School Name", "Capacity"],
    );
    assert!(controller.view().iter().any(GridRow::is_totals));

    controller.save(&gateway).expect("save should succeed");

    let saved = gateway.saved.lock().expect("lock");
    assert_eq!(saved.len(), 1);
    for row in &saved[0] {
        assert!(!row.to_json().contains_key("rowTotal"));
        assert_eq!(row.to_json().get("id"), Some(&json!(row.id.0)));
    }
    assert_eq!(saved[0].len(), 2);
    assert_eq!(controller.rows().len(), 1, "save should reload from gateway");
    assert_eq!(
        controller.status().map(|status| status.text.as_str()),
        Some("stored")
    );
}

#[test]
fn failed_save_keeps_local_edits() {
    let gateway = ScriptedGateway::default().with_ack(Ok(AckResponse::failed("")));
    let mut controller = loaded_controller(vec![school(1, "A", 1)], &["School Name", "Capacity"]);
    controller
        .edit_cell(GridKey::Row(RowId(1)), "Capacity", CellValue::Number(7.0))
        .expect("edit should succeed");

    let result = controller.save(&gateway);

    assert!(matches!(
        result,
        Err(ControllerError::Remote(RemoteError::Rejected(_)))
    ));
    assert_eq!(controller.rows()[0].get("Capacity"), Some(&CellValue::Number(7.0)));
    assert_eq!(
        controller.status().map(|status| status.text.as_str()),
        Some("Failed to save configuration.")
    );
}

#[test]
fn failed_load_leaves_store_unchanged() {
    let gateway = ScriptedGateway::default()
        .with_load(Ok(LoadResponse::failed("db offline")))
        .with_load(Err(RemoteError::Unavailable("timeout".to_string())));
    let mut controller = loaded_controller(vec![school(1, "A", 1)], &["School Name", "Capacity"]);

    assert!(controller.load(&gateway).is_err());
    assert_eq!(
        controller.status().map(|status| status.text.as_str()),
        Some("db offline")
    );
    assert!(controller.refresh(&gateway).is_err());
    assert_eq!(
        controller.status().map(|status| status.text.as_str()),
        Some("Error loading data from database.")
    );
    assert_eq!(controller.rows(), &[school(1, "A", 1)]);
}

#[test]
fn empty_load_reports_missing_data() {
    let gateway = ScriptedGateway::default();
    let mut controller = DatasetController::new(DatasetKind::Preferences);

    let applied = controller.load(&gateway).expect("load should succeed");

    assert_eq!(applied, Applied::Current(0));
    assert_eq!(controller.state(), DatasetState::Empty);
    assert_eq!(
        controller.status().map(|status| status.text.as_str()),
        Some("No data found in database. Please upload a preferences file.")
    );
}

#[test]
fn stale_load_response_is_discarded() {
    let mut controller = DatasetController::new(DatasetKind::Configuration);
    let first = controller.begin_request(RequestKind::Load);
    let second = controller.begin_request(RequestKind::Load);

    let newer = controller
        .finish_load(
            second,
            Ok(LoadResponse::loaded(vec![school(2, "New", 2)], Vec::new())),
        )
        .expect("current response should apply");
    let older = controller
        .finish_load(
            first,
            Ok(LoadResponse::loaded(vec![school(1, "Old", 1)], Vec::new())),
        )
        .expect("stale response should be ignored");

    assert_eq!(newer, Applied::Current(1));
    assert_eq!(older, Applied::Stale);
    assert_eq!(controller.rows(), &[school(2, "New", 2)]);
}

#[test]
fn clear_returns_dataset_to_empty() {
    let gateway = ScriptedGateway::default()
        .with_ack(Ok(AckResponse::failed("locked")))
        .with_ack(Ok(AckResponse {
            success: true,
            message: None,
            error: None,
        }));
    let mut controller = loaded_controller(vec![school(1, "A", 1)], &["School Name", "Capacity"]);
    controller.set_search_text("a");

    assert!(controller.clear(&gateway).is_err());
    assert_eq!(controller.state(), DatasetState::Loaded);

    controller.clear(&gateway).expect("clear should succeed");
    assert_eq!(controller.state(), DatasetState::Empty);
    assert!(controller.columns().is_empty());
    assert_eq!(controller.search_text(), "");
    assert!(controller.view().is_empty());
    assert_eq!(
        controller.status().map(|status| status.text.as_str()),
        Some("Configuration data cleared successfully.")
    );
}

#[test]
fn rejected_import_keeps_existing_rows() {
    let gateway = ScriptedGateway::default().with_load(Ok(LoadResponse::failed("")));
    let mut controller = loaded_controller(vec![school(1, "A", 1)], &["School Name", "Capacity"]);

    let result = controller.import_file(&gateway, Path::new("upload.xlsx"));

    assert!(result.is_err());
    assert_eq!(controller.rows(), &[school(1, "A", 1)]);
    assert_eq!(
        controller.status().map(|status| status.text.as_str()),
        Some("Error processing file. Please check the format and try again.")
    );
}

#[test]
fn row_json_rejects_reserved_and_missing_ids() {
    let reserved: Result<Row, _> = serde_json::from_value(json!({"id": "total-row", "a": 1}));
    let missing: Result<Row, _> = serde_json::from_value(json!({"a": 1}));
    let parsed: Row = serde_json::from_value(json!({"id": 4, "b": null, "a": 2.5, "c": true}))
        .expect("row should parse");

    assert!(reserved.is_err());
    assert!(missing.is_err());
    assert_eq!(parsed.id, RowId(4));
    assert_eq!(parsed.field_names().collect::<Vec<_>>(), vec!["b", "a", "c"]);
    assert_eq!(parsed.get("b"), Some(&CellValue::empty()));
    assert_eq!(parsed.get("c"), Some(&CellValue::from("true")));
}

#[test]
fn load_response_reads_wire_shape() {
    let response: LoadResponse = serde_json::from_value(json!({
        "success": true,
        "data": [{"id": 1, "School Name": "Alpha", "Capacity": 10}],
        "columnOrder": ["School Name", "Capacity"]
    }))
    .expect("response should parse");

    assert!(response.success);
    assert_eq!(response.data, vec![school(1, "Alpha", 10)]);
    assert_eq!(response.column_order, vec!["School Name", "Capacity"]);
    assert_eq!(
        LoadResponse::failed("bad").into_result(),
        Err(RemoteError::Rejected("bad".to_string()))
    );
}

#[test]
fn grid_key_parses_totals_and_ids() {
    assert_eq!(GridKey::parse("total-row"), Some(GridKey::Totals));
    assert_eq!(GridKey::parse(" 12 "), Some(GridKey::Row(RowId(12))));
    assert_eq!(GridKey::parse("abc"), None);
}

#[test]
fn render_table_lists_rows_then_totals() {
    let rows = vec![school(1, "Alpha", 10), school(2, "Beta", 20)];
    let view = project(&rows, &school_columns(), "");

    let table = render_table(&school_columns(), &view);
    let lines: Vec<&str> = table.lines().collect();

    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("id"));
    assert!(lines[0].ends_with("rowTotal"));
    assert!(lines[3].starts_with("total-row"));
    assert!(lines[3].ends_with("30"));
}

#[test]
fn init_db_creates_required_tables() {
    let temp_dir = unique_test_dir("init-db");
    fs::create_dir_all(&temp_dir).expect("should create temp dir");
    let db_path = temp_dir.join("app.sqlite");

    let result = init_db(&db_path);

    assert!(result.is_ok(), "init_db should succeed: {result:?}");

    let conn = Connection::open(&db_path).expect("should open sqlite db");
    let table_count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('dataset','column_name','row_entry','cell')",
            [],
            |row| row.get(0),
        )
        .expect("table count query should succeed");

    assert_eq!(table_count, 4, "required tables should exist");

    fs::remove_dir_all(&temp_dir).expect("should cleanup temp dir");
}

#[test]
fn save_rows_round_trips_order_and_value_types() {
    let temp_dir = unique_test_dir("save-load");
    fs::create_dir_all(&temp_dir).expect("should create temp dir");
    let db_path = temp_dir.join("app.sqlite");

    let rows = vec![
        school(9, "Zeta", 5),
        Row::with_fields(
            2_i64,
            [
                ("School Name", CellValue::from("Beta")),
                ("Capacity", CellValue::from("12")),
            ],
        ),
    ];
    save_rows(&db_path, DatasetKind::Configuration, &rows, 12).expect("should save rows");
    save_rows(&db_path, DatasetKind::Preferences, &[school(1, "Other", 1)], 0)
        .expect("should save other kind");

    let stored = load_rows(&db_path, DatasetKind::Configuration).expect("should load rows");

    assert_eq!(stored.column_order, vec!["School Name", "Capacity"]);
    assert_eq!(stored.rows, rows);
    assert_eq!(stored.id_high_water, Some(12));

    let datasets = list_datasets(&db_path).expect("should list datasets");
    assert_eq!(datasets.len(), 2);
    assert_eq!(datasets[0].row_count, 2);
    assert_eq!(datasets[0].column_count, 2);
    assert!(datasets[0].saved_at.is_some());

    clear_dataset(&db_path, DatasetKind::Configuration).expect("should clear");
    let cleared = load_rows(&db_path, DatasetKind::Configuration).expect("should load rows");
    assert!(cleared.column_order.is_empty());
    assert!(cleared.rows.is_empty());
    assert_eq!(cleared.id_high_water, None);
    let other = load_rows(&db_path, DatasetKind::Preferences).expect("should load rows");
    assert_eq!(other.rows.len(), 1, "clear should only affect one dataset");
    assert_eq!(other.id_high_water, Some(1));

    fs::remove_dir_all(&temp_dir).expect("should cleanup temp dir");
}

#[test]
fn csv_import_numbers_rows_and_types_cells() {
    let temp_dir = unique_test_dir("csv-import");
    fs::create_dir_all(&temp_dir).expect("should create temp dir");
    let csv_path = temp_dir.join("schools.csv");
    fs::write(
        &csv_path,
        "School Name,Capacity,\nAlpha,10,x\n,,\nBeta, 20 ,\n",
    )
    .expect("should write csv");

    let table = read_table(&csv_path).expect("csv should parse");

    assert_eq!(table.column_order, vec!["School Name", "Capacity", "Column 3"]);
    assert_eq!(table.rows.len(), 2);
    assert_eq!(table.rows[0].id, RowId(1));
    assert_eq!(table.rows[1].id, RowId(2));
    assert_eq!(table.rows[0].get("Capacity"), Some(&CellValue::Number(10.0)));
    assert_eq!(table.rows[1].get("Capacity"), Some(&CellValue::Number(20.0)));
    assert_eq!(table.rows[1].get("School Name"), Some(&CellValue::from("Beta")));

    fs::remove_dir_all(&temp_dir).expect("should cleanup temp dir");
}

#[test]
fn import_rejects_unsupported_format() {
    assert!(matches!(
        SourceFormat::from_path(Path::new("notes.txt")),
        Err(ParseError::UnsupportedFormat(ext)) if ext == "txt"
    ));
    assert_eq!(
        SourceFormat::from_path(Path::new("Book.XLSX")).ok(),
        Some(SourceFormat::Workbook)
    );

    let gateway = SqliteGateway::new(unique_test_dir("unsupported").join("app.sqlite"));
    let response = gateway
        .import(DatasetKind::Configuration, Path::new("notes.txt"))
        .expect("import should answer");
    assert!(!response.success);
    assert!(response
        .error
        .expect("error should be set")
        .contains("unsupported file type"));

    let message = ParseError::UnsupportedFormat("txt".to_string()).to_string();
    for extension in [".xlsx", ".xls", ".xlsm", ".xlsb", ".ods", ".csv"] {
        assert!(message.contains(extension), "{message} should list {extension}");
    }
}

#[test]
fn save_rows_keeps_columns_missing_from_first_row() {
    let temp_dir = unique_test_dir("column-union");
    fs::create_dir_all(&temp_dir).expect("should create temp dir");
    let db_path = temp_dir.join("app.sqlite");
    let rows = vec![
        Row::with_fields(1_i64, [("a", CellValue::Number(1.0))]),
        Row::with_fields(2_i64, [("a", CellValue::Number(2.0)), ("b", CellValue::Number(3.0))]),
    ];

    assert_eq!(collect_headers(&rows), vec!["a", "b"]);
    save_rows(&db_path, DatasetKind::Preferences, &rows, 0).expect("should save rows");
    let stored = load_rows(&db_path, DatasetKind::Preferences).expect("should load rows");

    assert_eq!(stored.column_order, vec!["a", "b"]);
    assert_eq!(stored.rows, rows);
    assert_eq!(stored.id_high_water, Some(2));

    fs::remove_dir_all(&temp_dir).expect("should cleanup temp dir");
}

#[test]
fn workspace_imports_saves_and_reopens_dataset() {
    let temp_dir = unique_test_dir("workspace");
    fs::create_dir_all(&temp_dir).expect("should create temp dir");
    let db_path = temp_dir.join("app.sqlite");
    let csv_path = temp_dir.join("prefs.csv");
    fs::write(&csv_path, "Student Name,Choice 1,Choice 2\nAnn,3,1\nBob,2,2\n")
        .expect("should write csv");

    let gateway: Arc<dyn PersistenceGateway> = Arc::new(SqliteGateway::new(&db_path));
    let mut workspace = Workspace::new(Arc::clone(&gateway));
    workspace
        .import(DatasetKind::Preferences, &csv_path)
        .expect("import should succeed");
    assert_eq!(
        workspace
            .controller(DatasetKind::Preferences)
            .status()
            .map(|status| status.text.as_str()),
        Some("File processed successfully! Review the data below.")
    );
    workspace
        .controller_mut(DatasetKind::Preferences)
        .edit_cell(GridKey::Row(RowId(2)), "Choice 1", CellValue::Number(4.0))
        .expect("edit should succeed");
    workspace
        .save(DatasetKind::Preferences)
        .expect("save should succeed");

    let mut reopened = Workspace::new(gateway);
    reopened
        .open(DatasetKind::Preferences)
        .expect("open should succeed");
    let controller = reopened.controller(DatasetKind::Preferences);
    let view = controller.view();
    let totals = totals_of(&view).expect("totals row should exist");

    assert_eq!(controller.columns().as_slice(), ["Student Name", "Choice 1", "Choice 2"]);
    assert_eq!(totals.get("Student Name"), Some(ColumnTotal::Blank));
    assert_eq!(totals.get("Choice 1"), Some(ColumnTotal::Sum(7.0)));
    assert_eq!(totals.row_total, 10.0);
    assert_eq!(
        reopened.controller(DatasetKind::Configuration).state(),
        DatasetState::Empty
    );

    fs::remove_dir_all(&temp_dir).expect("should cleanup temp dir");
}

#[test]
fn app_config_prefers_explicit_db_path() {
    let explicit = PathBuf::from("/tmp/explicit.sqlite");

    let config = AppConfig::resolve(Some(explicit.clone())).expect("config should resolve");

    assert_eq!(config.db_path, explicit);
}

#[test]
fn default_db_path_uses_tabledesk_app_directory() {
    let db_path = default_db_path().expect("default db path should resolve");
    let app_dir = db_path
        .parent()
        .and_then(|path| path.file_name())
        .and_then(|name| name.to_str())
        .expect("db path should include app directory");

    assert_eq!(app_dir, "tabledesk");
    assert_eq!(
        db_path.file_name().and_then(|name| name.to_str()),
        Some("datasets.sqlite")
    );
}
