//! Spreadsheet upload validated and loaded into the warehouse

use std::sync::Arc;
use taa_core::schema::TypeMismatch;
use taa_core::workbook::write_workbook;
use taa_core::{Cell, ColumnType, Frame, LoadPartition, SchemaViolation};
use taa_runtime::loader::{DataLoader, LoaderSettings, TableDdl};
use taa_runtime::{Error, ObjectLocation};
use taa_tests::fixtures::{self, SCHEMA_KEY, TABLE, UPLOAD_BUCKET, UPLOAD_KEY};
use taa_tests::mocks::Published;
use taa_tests::{FrameBuilder, InMemoryObjectStore, InMemoryWarehouse, RecordingNotifier};

const PARTITION: LoadPartition = LoadPartition {
    year: 2024,
    month: 1,
    day: 1,
};

fn upload() -> Frame {
    FrameBuilder::with_columns(fixtures::upload_columns())
        .row(vec![
            Cell::text("Core Fixed Income"),
            Cell::Float(1.25),
            Cell::Float(1_500_000.0),
            Cell::Int(12),
        ])
        .row(vec![
            Cell::text("High Yield"),
            Cell::Float(2.5),
            Cell::Float(250_000.5),
            Cell::Int(4),
        ])
        .row(vec![
            Cell::text("Grand Total"),
            Cell::Float(1.8),
            Cell::Float(1_750_000.5),
            Cell::Int(16),
        ])
        .build()
}

struct Harness {
    store: Arc<InMemoryObjectStore>,
    warehouse: Arc<InMemoryWarehouse>,
    notifier: Arc<RecordingNotifier>,
    loader: DataLoader,
}

fn harness(sheet: &Frame, create_table: Option<TableDdl>) -> Harness {
    let store = InMemoryObjectStore::new();
    store.insert(
        UPLOAD_BUCKET,
        UPLOAD_KEY,
        write_workbook(&[("Spreads", sheet)]).unwrap(),
    );
    store.insert(UPLOAD_BUCKET, SCHEMA_KEY, fixtures::SPREAD_SCHEMA);

    let warehouse = InMemoryWarehouse::new();
    let notifier = RecordingNotifier::new();
    let loader = DataLoader::new(
        store.clone(),
        warehouse.clone(),
        notifier.clone(),
        LoaderSettings {
            schema_location: ObjectLocation::new(UPLOAD_BUCKET, SCHEMA_KEY),
            table: TABLE.to_string(),
            create_table,
        },
    );

    Harness {
        store,
        warehouse,
        notifier,
        loader,
    }
}

fn source() -> ObjectLocation {
    ObjectLocation::new(UPLOAD_BUCKET, UPLOAD_KEY)
}

#[tokio::test]
async fn test_load_normalizes_columns_and_stamps_partition() {
    let h = harness(&upload(), None);

    let result = h.loader.load_for(&source(), PARTITION).await.unwrap();
    assert_eq!(result.rows_deleted, 0);
    assert_eq!(result.rows_inserted, 2, "the total row is dropped");
    assert_eq!(result.partition, PARTITION);

    let table = h.warehouse.table(TABLE).unwrap();
    assert_eq!(
        table.columns(),
        [
            "SEGMENT",
            "PURCHASE_SPREAD_PCT",
            "MARKET_VALUE",
            "POSITIONS",
            "YYYY",
            "MM",
            "DD"
        ]
    );
    let first = table.row(0).unwrap();
    assert_eq!(first[0], Cell::text("Core Fixed Income"));
    assert_eq!(first[4..], [Cell::Int(2024), Cell::Int(1), Cell::Int(1)]);

    assert_eq!(
        h.notifier.published(),
        vec![Published {
            subject: Some("Success".to_string()),
            message: "Data loaded to Snowflake table: TAA_SPREADS".to_string(),
        }]
    );
}

#[tokio::test]
async fn test_reloading_a_partition_replaces_its_rows() {
    let h = harness(&upload(), None);

    h.loader.load_for(&source(), PARTITION).await.unwrap();
    let second = h.loader.load_for(&source(), PARTITION).await.unwrap();

    assert_eq!(second.rows_deleted, 2);
    assert_eq!(second.rows_inserted, 2);
    assert_eq!(h.warehouse.table(TABLE).unwrap().len(), 2);

    let next_day = LoadPartition { day: 2, ..PARTITION };
    h.loader.load_for(&source(), next_day).await.unwrap();
    assert_eq!(h.warehouse.table(TABLE).unwrap().len(), 4);
}

#[tokio::test]
async fn test_missing_column_is_rejected_before_any_write() {
    let sheet = FrameBuilder::new(&["Segment", "Purchase Spread (%)", "Market Value ($)"])
        .row(vec![Cell::text("Core"), Cell::Float(1.25), Cell::Float(10.5)])
        .build();
    let h = harness(&sheet, None);

    let err = h.loader.load_for(&source(), PARTITION).await.unwrap_err();
    assert_eq!(
        err,
        Error::SchemaMismatch(SchemaViolation::MissingColumns(vec!["Positions".to_string()]))
    );
    assert!(h.warehouse.table(TABLE).is_none());

    let published = h.notifier.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].subject.as_deref(), Some("Failure"));
    assert_eq!(published[0].message, err.to_string());
}

#[tokio::test]
async fn test_type_mismatch_names_the_column() {
    let sheet = FrameBuilder::with_columns(fixtures::upload_columns())
        .row(vec![
            Cell::text("Core"),
            Cell::Float(1.25),
            Cell::Float(10.5),
            Cell::text("twelve"),
        ])
        .build();
    let h = harness(&sheet, None);

    let err = h.loader.load_for(&source(), PARTITION).await.unwrap_err();
    assert_eq!(
        err,
        Error::SchemaMismatch(SchemaViolation::TypeMismatch(vec![TypeMismatch {
            column: "Positions".to_string(),
            expected: ColumnType::Int,
            found: ColumnType::Text,
        }]))
    );
    assert!(h.warehouse.table(TABLE).is_none());
}

#[tokio::test]
async fn test_column_order_is_enforced() {
    let mut columns = fixtures::upload_columns();
    columns.swap(0, 3);
    let sheet = FrameBuilder::with_columns(columns)
        .row(vec![
            Cell::Int(12),
            Cell::Float(1.25),
            Cell::Float(10.5),
            Cell::text("Core"),
        ])
        .build();
    let h = harness(&sheet, None);

    let err = h.loader.load_for(&source(), PARTITION).await.unwrap_err();
    assert!(matches!(
        err,
        Error::SchemaMismatch(SchemaViolation::OrderMismatch { .. })
    ));
}

#[tokio::test]
async fn test_table_bootstrap_runs_before_load() {
    let ddl = TableDdl {
        template: ObjectLocation::new(UPLOAD_BUCKET, "ddl/create_spreads.sql"),
        database: "ANALYTICS".to_string(),
        schema: "TAA".to_string(),
    };
    let h = harness(&upload(), Some(ddl));
    h.store.insert(
        UPLOAD_BUCKET,
        "ddl/create_spreads.sql",
        "create table if not exists @database.@schema.@table (SEGMENT varchar)",
    );

    h.loader.load_for(&source(), PARTITION).await.unwrap();
    assert_eq!(
        h.warehouse.statements(),
        vec!["create table if not exists ANALYTICS.TAA.TAA_SPREADS (SEGMENT varchar)"]
    );
}

#[tokio::test]
async fn test_missing_upload_publishes_failure() {
    let h = harness(&upload(), None);
    let absent = ObjectLocation::new(UPLOAD_BUCKET, "uploads/absent.xlsx");

    let err = h.loader.load_for(&absent, PARTITION).await.unwrap_err();
    assert!(matches!(err, Error::ResourceUnavailable(_)));
    assert_eq!(
        h.notifier.published()[0].subject.as_deref(),
        Some("Failure")
    );
}
