//! Test data for the pipeline stages
//!
//! The horizon results cover two GL codes (4100 with two ALFA ids, 5200
//! with one) so fan-out, merge gaps and template expansion all show up.

/// Pipeline bucket used throughout the tests
pub const BUCKET: &str = "taa-pipeline";

/// Bucket the query engine writes results to
pub const QUERY_BUCKET: &str = "taa-athena-results";

pub const QUERY_KEY: &str = "queries/purchase_assets.sql";
pub const TABLE_PROPERTIES_KEY: &str = "template_files/TableProperties.csv";

/// Query template with every substitution token
pub const QUERY_TEMPLATE: &str = "SELECT * FROM purchase_assets \
WHERE yyyy = '@year' AND mm = '@month' AND dd = '@day' AND horizon = @horizon";

pub mod horizons {
    pub const H1: &str = "GL Code,ALFA_ID,FinalDollars_h1\n\
4100,AL001,1250.5\n\
4100,AL002,980.25\n\
5200,AL003,410\n";

    /// AL002 has no horizon 2 row
    pub const H2: &str = "GL Code,ALFA_ID,FinalDollars_h2\n\
4100,AL001,1300.75\n\
5200,AL003,415.5\n";

    pub const H3: &str = "GL Code,ALFA_ID,FinalDollars_h3\n\
4100,AL001,1350\n\
4100,AL002,1010.5\n\
5200,AL003,420.25\n";

    pub fn all() -> [&'static str; 3] {
        [H1, H2, H3]
    }
}

/// Base Table Properties sheet with its one fixed row
pub const TABLE_PROPERTIES: &str = "Name,SheetName,ModuleGroup,IndexType,DataType,Description,DisplayWidth,DisplayDecimals\n\
Summary,Summary,Asset,ProjectionYearAndMonth,Real,Summary of segments,12,10\n";

/// Purchase template: three header rows, then the model row at position 3
///
/// The model row has two fixed cells and 26 empty projection cells.
pub fn purchase_template() -> String {
    let mut header = vec!["ck.Cusip".to_string(), "Basis".to_string()];
    header.extend((1..=26).map(|m| format!("M{}", m)));

    let fixed_row = |label: &str| {
        let mut row = vec![label.to_string(), "Book".to_string()];
        row.extend((1..=26).map(|m| m.to_string()));
        row.join(",")
    };
    let mut model = vec!["MODEL".to_string(), "Book".to_string()];
    model.extend(std::iter::repeat(String::new()).take(26));

    [
        header.join(","),
        fixed_row("Header A"),
        fixed_row("Header B"),
        fixed_row("Header C"),
        model.join(","),
    ]
    .join("\n")
        + "\n"
}

/// Schema descriptor for [`upload_columns`]
pub const SPREAD_SCHEMA: &str = r#"{
    "Segment": "object",
    "Purchase Spread (%)": "float64",
    "Market Value ($)": "float",
    "Positions": "int64"
}"#;

/// Header of the uploaded spreadsheet
pub fn upload_columns() -> Vec<String> {
    ["Segment", "Purchase Spread (%)", "Market Value ($)", "Positions"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

pub const TABLE: &str = "TAA_SPREADS";
pub const SCHEMA_KEY: &str = "schemas/taa_spreads.json";
pub const UPLOAD_BUCKET: &str = "taa-uploads";
pub const UPLOAD_KEY: &str = "uploads/TAA Spreads.xlsx";
