//! Parser fan-out through to the report download URL

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use taa_core::paths::{
    incoming_key, report_key, temp_csv_prefix, DEFAULT_TEMPLATE_KEY, EDITED_TEMPLATE_KEY,
};
use taa_core::workbook::read_first_sheet;
use taa_core::{Cell, FileDate, Frame, RunDate, SegmentValues, TriggerPayload, HORIZONS};
use taa_runtime::cleanup::IntermediateCleanup;
use taa_runtime::csv_generator::{CsvOutput, SegmentCsvGenerator};
use taa_runtime::excel_generator::{ExcelSettings, WorkbookAssembler};
use taa_runtime::parser::{ParserSettings, SegmentParser};
use taa_runtime::url_generator::{ReportUrlGenerator, UrlSettings};
use taa_runtime::Error;
use taa_tests::fixtures::{self, horizons, BUCKET, TABLE_PROPERTIES_KEY};
use taa_tests::InMemoryObjectStore;

const TEMP_PREFIX: &str = "processing/temp_csv_files/yyyy=2024/mm=01/dd=09/";

fn run_date() -> RunDate {
    RunDate::new(2024, 1, 9).unwrap()
}

fn file_date(year: i64, month: i64, day: i64) -> FileDate {
    RunDate::new(year, month, day).unwrap().file_date()
}

fn seeded_store() -> Arc<InMemoryObjectStore> {
    let store = InMemoryObjectStore::new();
    let date = run_date();
    for (horizon, csv) in HORIZONS.iter().zip(horizons::all()) {
        store.insert(BUCKET, &incoming_key(&date, *horizon), csv);
    }
    store.insert(BUCKET, TABLE_PROPERTIES_KEY, fixtures::TABLE_PROPERTIES);
    store.insert(BUCKET, DEFAULT_TEMPLATE_KEY, fixtures::purchase_template());
    store
}

fn payload() -> TriggerPayload {
    let date = run_date();
    TriggerPayload {
        bucket_name: BUCKET.to_string(),
        key: HORIZONS.iter().map(|h| incoming_key(&date, *h)).collect(),
        file_date: date.file_date(),
    }
}

fn parser(store: &Arc<InMemoryObjectStore>) -> SegmentParser {
    SegmentParser::new(
        store.clone(),
        ParserSettings {
            table_properties_key: TABLE_PROPERTIES_KEY.to_string(),
            template_key: DEFAULT_TEMPLATE_KEY.to_string(),
        },
    )
}

fn frame_at(store: &InMemoryObjectStore, key: &str) -> Frame {
    let bytes = store
        .get(BUCKET, key)
        .unwrap_or_else(|| panic!("{} was not written", key));
    Frame::from_csv(&bytes).unwrap()
}

#[tokio::test]
async fn test_parser_fans_out_one_record_per_gl_code() {
    let store = seeded_store();
    let output = parser(&store).parse(&payload()).await.unwrap();

    assert_eq!(output.status, "Success");
    assert_eq!(
        serde_json::to_value(&output).unwrap()["Output"]["Records"],
        json!([
            {"File_date": "010924", "GL_Code": 4100, "data_path": "processing/gl_codes/4100/data.json"},
            {"File_date": "010924", "GL_Code": 5200, "data_path": "processing/gl_codes/5200/data.json"}
        ])
    );

    let values: SegmentValues =
        serde_json::from_slice(&store.get(BUCKET, "processing/gl_codes/4100/data.json").unwrap())
            .unwrap();
    assert_eq!(values.values_h1, vec![Some(1250.5), Some(980.25)]);
    assert_eq!(values.values_h2, vec![Some(1300.75), None]);
    assert_eq!(values.values_h3, vec![Some(1350.0), Some(1010.5)]);
    assert_eq!(
        store
            .content_type(BUCKET, "processing/gl_codes/4100/data.json")
            .as_deref(),
        Some("application/json")
    );
}

#[tokio::test]
async fn test_parser_writes_table_properties_and_expanded_template() {
    let store = seeded_store();
    parser(&store).parse(&payload()).await.unwrap();

    let table = frame_at(&store, &format!("{}TableProperties.csv", TEMP_PREFIX));
    assert_eq!(table.len(), 3);
    let names: Vec<String> = table
        .column("Name")
        .unwrap()
        .into_iter()
        .map(|c| c.to_string())
        .collect();
    assert_eq!(names, vec!["Summary", "InvestPctSeg4100", "InvestPctSeg5200"]);
    assert_eq!(table.row(1).unwrap()[6], Cell::Int(12));

    let template = frame_at(&store, EDITED_TEMPLATE_KEY);
    let cusips: Vec<String> = template
        .column("ck.Cusip")
        .unwrap()
        .into_iter()
        .map(|c| c.to_string())
        .collect();
    assert_eq!(
        cusips,
        vec!["Header A", "Header B", "Header C", "AL001", "AL002", "AL003"]
    );
}

#[tokio::test]
async fn test_parser_requires_three_keys() {
    let store = seeded_store();
    let mut short = payload();
    short.key.truncate(2);

    let err = parser(&store).parse(&short).await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}

#[tokio::test]
async fn test_parser_reports_missing_horizon_result() {
    let store = seeded_store();
    let mut missing = payload();
    missing.key[1] = "processing/incoming/absent.csv".to_string();

    let err = parser(&store).parse(&missing).await.unwrap_err();
    assert!(matches!(err, Error::ResourceUnavailable(_)));
}

#[tokio::test]
async fn test_segment_csv_fills_horizon_passes() {
    let store = seeded_store();
    let output = parser(&store).parse(&payload()).await.unwrap();
    let generator = SegmentCsvGenerator::new(store.clone(), BUCKET);

    let first = generator.generate(&output.output.records[0]).await.unwrap();
    assert_eq!(
        first,
        CsvOutput {
            status: "Success".to_string(),
            file_name: "InvestPctSeg4100.csv".to_string(),
            file_date: file_date(2024, 1, 9),
        }
    );

    let sheet = frame_at(&store, &format!("{}InvestPctSeg4100.csv", TEMP_PREFIX));
    let values = |row: usize| -> Vec<Option<f64>> {
        sheet.row(row).unwrap()[2..].iter().map(Cell::as_f64).collect()
    };

    // AL001: 12 x h1, 12 x h2, the remaining 2 x h3
    let al001 = values(3);
    assert!(al001[..12].iter().all(|v| *v == Some(1250.5)));
    assert!(al001[12..24].iter().all(|v| *v == Some(1300.75)));
    assert!(al001[24..].iter().all(|v| *v == Some(1350.0)));

    // AL002 has no horizon 2 value, so h3 takes every cell after the first 12
    let al002 = values(4);
    assert!(al002[..12].iter().all(|v| *v == Some(980.25)));
    assert!(al002[12..].iter().all(|v| *v == Some(1010.5)));

    // AL003 belongs to the other segment and stays empty
    assert!(values(5).iter().all(|v| v.is_none()));
}

#[tokio::test]
async fn test_full_report_chain() {
    let store = seeded_store();
    let output = parser(&store).parse(&payload()).await.unwrap();

    let generator = SegmentCsvGenerator::new(store.clone(), BUCKET);
    let mut results = Vec::new();
    for record in &output.output.records {
        results.push(generator.generate(record).await.unwrap());
    }

    let assembler = WorkbookAssembler::new(
        store.clone(),
        ExcelSettings {
            bucket_name: BUCKET.to_string(),
            csv_root: "processing/temp_csv_files".to_string(),
            report_name: "Purchassetspreads".to_string(),
        },
    );
    let excel = assembler.assemble(&results).await.unwrap();

    let key = report_key(&run_date(), "Purchassetspreads");
    assert_eq!(excel.report_key, key);
    assert_eq!(excel.status, "success");
    assert_eq!(excel.deleted, 3);
    assert!(store
        .keys(BUCKET)
        .iter()
        .all(|k| !k.starts_with(TEMP_PREFIX)));

    let first_sheet = read_first_sheet(store.get(BUCKET, &key).unwrap()).unwrap();
    assert_eq!(first_sheet.len(), 3, "Table Properties comes first");
    assert_eq!(first_sheet.columns()[0], "Name");

    let urls = ReportUrlGenerator::new(
        store.clone(),
        UrlSettings {
            bucket_name: BUCKET.to_string(),
            report_name: "Purchassetspreads".to_string(),
            expires_in: Duration::from_secs(900),
        },
    );
    let response = urls.generate_url("2024-01-09").await.unwrap();
    assert_eq!(response.status_code, 200);
    assert!(response.url.contains(&key));
    assert!(response.url.contains("X-Amz-Expires=900"));

    assert!(matches!(
        urls.generate_url("2024-01-10").await,
        Err(Error::ResourceNotFound(_))
    ));
    assert!(matches!(
        urls.generate_url("01/09/2024").await,
        Err(Error::InvalidInput(_))
    ));
}

#[tokio::test]
async fn test_custom_csv_root_is_used_by_every_stage() {
    const ROOT: &str = "staging/csv";
    const PREFIX: &str = "staging/csv/yyyy=2024/mm=01/dd=09/";

    let store = seeded_store();
    let output = parser(&store)
        .with_csv_root(ROOT)
        .parse(&payload())
        .await
        .unwrap();
    assert!(store.contains(BUCKET, &format!("{}TableProperties.csv", PREFIX)));

    let generator = SegmentCsvGenerator::new(store.clone(), BUCKET).with_csv_root(ROOT);
    let mut results = Vec::new();
    for record in &output.output.records {
        results.push(generator.generate(record).await.unwrap());
    }
    assert!(store.contains(BUCKET, &format!("{}InvestPctSeg5200.csv", PREFIX)));
    assert!(store.keys(BUCKET).iter().all(|k| !k.starts_with(TEMP_PREFIX)));

    let assembler = WorkbookAssembler::new(
        store.clone(),
        ExcelSettings {
            bucket_name: BUCKET.to_string(),
            csv_root: ROOT.to_string(),
            report_name: "Purchassetspreads".to_string(),
        },
    );
    let excel = assembler.assemble(&results).await.unwrap();
    assert_eq!(excel.deleted, 3);

    store.insert(BUCKET, &format!("{}InvestPctSeg4100.csv", PREFIX), "Name\n");
    let cleanup = IntermediateCleanup::new(store.clone(), BUCKET).with_csv_root(ROOT);
    let cleared = cleanup.clear(run_date().file_date()).await.unwrap();
    assert_eq!(cleared.deleted, 1);
    assert!(store.keys(BUCKET).iter().all(|k| !k.starts_with(PREFIX)));
}

#[tokio::test]
async fn test_assembler_rejects_empty_and_mixed_results() {
    let store = seeded_store();
    let assembler = WorkbookAssembler::new(
        store.clone(),
        ExcelSettings {
            bucket_name: BUCKET.to_string(),
            csv_root: "processing/temp_csv_files".to_string(),
            report_name: "Purchassetspreads".to_string(),
        },
    );

    assert!(matches!(
        assembler.assemble(&[]).await,
        Err(Error::InvalidInput(_))
    ));

    let result = |file_date: FileDate| CsvOutput {
        status: "Success".to_string(),
        file_name: "InvestPctSeg4100.csv".to_string(),
        file_date,
    };
    let mixed = [
        result(file_date(2024, 1, 9)),
        result(file_date(2024, 1, 10)),
    ];
    assert!(matches!(
        assembler.assemble(&mixed).await,
        Err(Error::InvalidInput(_))
    ));

    let repeated = [result(file_date(2024, 1, 9)), result(file_date(2024, 1, 9))];
    match assembler.assemble(&repeated).await {
        Err(Error::InvalidInput(msg)) => assert!(msg.contains("InvestPctSeg4100.csv")),
        other => panic!("expected InvalidInput, got {:?}", other),
    }
    assert!(store
        .keys(BUCKET)
        .iter()
        .all(|k| !k.starts_with("processed/")));
}

#[tokio::test]
async fn test_cleanup_clears_only_the_run_prefix() {
    let store = seeded_store();
    parser(&store).parse(&payload()).await.unwrap();
    store.insert(
        BUCKET,
        "processing/temp_csv_files/yyyy=2024/mm=01/dd=10/TableProperties.csv",
        "Name\n",
    );
    assert_eq!(temp_csv_prefix(&run_date()), TEMP_PREFIX);

    let cleanup = IntermediateCleanup::new(store.clone(), BUCKET);
    let cleared = cleanup.clear(run_date().file_date()).await.unwrap();
    assert_eq!(cleared.deleted, 1);
    assert!(store.contains(
        BUCKET,
        "processing/temp_csv_files/yyyy=2024/mm=01/dd=10/TableProperties.csv"
    ));

    let again = cleanup.clear(run_date().file_date()).await.unwrap();
    assert_eq!(again.deleted, 0);
}
