//! The five source datasets: their column layouts and how each one is
//! loaded and brought into the shape the charts consume.

use crate::config::DashboardConfig;
use crate::error::DataLoadError;
use crate::fetch::Fetcher;

use super::geo::{decode_topojson, Feature};
use super::loader::{load_path, load_text, ColumnType, TableSpec};
use super::model::Table;
use super::reshape::reshape;

pub const DEATHS_BY_AGE: &str = "smoking deaths by age";
pub const RISK_FACTORS: &str = "deaths by risk factor";
pub const SALES: &str = "cigarette sales";
pub const CONTROL_POLICY: &str = "control policy";
pub const DEATH_COUNTS: &str = "smoking death counts";
pub const BOUNDARIES: &str = "world boundaries";

/// Long-form field names shared by the death datasets.
pub mod fields {
    pub const COUNTRY: &str = "country";
    pub const YEAR: &str = "year";
    pub const VALUE: &str = "value";
    pub const AGE: &str = "Age";
    pub const RISK_FACTOR: &str = "Risk Factor";
}

/// Field names of the sales and reference datasets (header spelling).
pub mod ref_fields {
    pub const COUNTRY: &str = "Country";
    pub const YEAR: &str = "Year";
    pub const NUM_CIG: &str = "NumCig";
    pub const DEATHS: &str = "deaths";
    pub const ID: &str = "ID";
}

pub const AGE_BANDS: [&str; 3] = ["15 to 49", "50 to 69", "Above 70"];

/// Every risk factor column of the source file, in file order.
pub const RISK_FACTOR_COLUMNS: [&str; 35] = [
    "Diet low in vegetables",
    "Diet low in whole grains",
    "Diet low in nuts and seeds",
    "Diet low in calcium",
    "Unsafe sex",
    "No access to handwashing facility",
    "Child wasting",
    "Child stunting",
    "Diet high in red meat",
    "Diet low in fiber",
    "Diet low in seafood omega-3 fatty acids",
    "Diet high in sodium",
    "Low physical activity",
    "Non-exclusive breastfeeding",
    "Discontinued breastfeeding",
    "Iron deficiency",
    "Vitamin A deficiency",
    "Zinc deficiency",
    "Smoking",
    "Secondhand smoke",
    "Alcohol use",
    "Drug use",
    "High fasting plasma glucose",
    "High total cholesterol",
    "High systolic blood pressure",
    "High body-mass index",
    "Low bone mineral density",
    "Diet low in fruits",
    "Diet low in legumes",
    "Low birth weight for gestation",
    "Unsafe water source",
    "Unsafe sanitation",
    "Household air pollution from solid fuels",
    "Air pollution",
    "Outdoor air pollution",
];

/// Risk factor left out of the bar chart.
pub const EXCLUDED_RISK_FACTOR: &str = "Diet low in whole grains";

/// The highlighted bar.
pub const SMOKING: &str = "Smoking";

/// WHO control measures, each scored 1 (worst) to 5 (best).
pub const CONTROL_METRICS: [&str; 7] = [
    "Monitor",
    "Protect from tobacco smoke",
    "Offer help to quit tobacco use",
    "Warn about the dangers of tobacco",
    "Enforce bans on tobacco advertising",
    "Raise taxes on tobacco",
    "Anti-tobacco mass media campaigns",
];

/// Years in which the control measures were assessed.
pub const POLICY_YEARS: [i64; 6] = [2008, 2010, 2012, 2014, 2016, 2018];

fn id_columns() -> Vec<(&'static str, ColumnType)> {
    vec![
        (fields::COUNTRY, ColumnType::Text),
        ("code", ColumnType::Text),
        (fields::YEAR, ColumnType::Integer),
    ]
}

pub fn deaths_by_age_spec() -> TableSpec {
    let mut cols = id_columns();
    cols.extend(AGE_BANDS.iter().map(|c| (*c, ColumnType::Float)));
    TableSpec::declared(DEATHS_BY_AGE, &cols)
}

pub fn risk_factors_spec() -> TableSpec {
    let mut cols = id_columns();
    cols.extend(RISK_FACTOR_COLUMNS.iter().map(|c| (*c, ColumnType::Float)));
    TableSpec::declared(RISK_FACTORS, &cols)
}

pub fn sales_spec() -> TableSpec {
    TableSpec::declared(
        SALES,
        &[
            (ref_fields::COUNTRY, ColumnType::Text),
            ("Code", ColumnType::Text),
            (ref_fields::YEAR, ColumnType::Integer),
            (ref_fields::NUM_CIG, ColumnType::Float),
        ],
    )
}

pub fn control_policy_spec() -> TableSpec {
    CONTROL_METRICS.iter().fold(
        TableSpec::from_header(CONTROL_POLICY)
            .hint(ref_fields::COUNTRY, ColumnType::Text)
            .hint(ref_fields::YEAR, ColumnType::Integer)
            .hint(ref_fields::ID, ColumnType::Text),
        |spec, metric| spec.hint(metric, ColumnType::Float),
    )
}

pub fn death_counts_spec() -> TableSpec {
    TableSpec::from_header(DEATH_COUNTS)
        .hint(ref_fields::COUNTRY, ColumnType::Text)
        .hint(ref_fields::YEAR, ColumnType::Integer)
        .hint(ref_fields::DEATHS, ColumnType::Float)
        .hint(ref_fields::ID, ColumnType::Text)
}

/// Smoking deaths by age band in long form: `country, year, Age, value`.
pub fn load_deaths_by_age(config: &DashboardConfig) -> Result<Table, DataLoadError> {
    let wide = load_path(&config.deaths_by_age_path(), &deaths_by_age_spec())?;
    Ok(to_long(wide, &AGE_BANDS, fields::AGE))
}

/// Deaths by risk factor in long form: `country, year, Risk Factor, value`.
pub fn load_risk_factors(config: &DashboardConfig) -> Result<Table, DataLoadError> {
    let wide = load_path(&config.risk_factors_path(), &risk_factors_spec())?;
    let factors: Vec<&str> = RISK_FACTOR_COLUMNS
        .iter()
        .copied()
        .filter(|f| *f != EXCLUDED_RISK_FACTOR)
        .collect();
    Ok(to_long(wide, &factors, fields::RISK_FACTOR))
}

pub fn load_sales(config: &DashboardConfig) -> Result<Table, DataLoadError> {
    load_path(&config.sales_path(), &sales_spec())
}

pub fn load_control_policy(config: &DashboardConfig, fetcher: &Fetcher) -> Result<Table, DataLoadError> {
    let text = fetcher.fetch_text(&config.control_policy_source, CONTROL_POLICY)?;
    let table = load_text(&text, &control_policy_spec())?;
    log::info!("Loaded {} rows of '{}'", table.len(), table.name);
    Ok(table)
}

pub fn load_death_counts(config: &DashboardConfig, fetcher: &Fetcher) -> Result<Table, DataLoadError> {
    let text = fetcher.fetch_text(&config.deaths_source, DEATH_COUNTS)?;
    let table = load_text(&text, &death_counts_spec())?;
    log::info!("Loaded {} rows of '{}'", table.len(), table.name);
    Ok(table)
}

pub fn load_boundaries(config: &DashboardConfig, fetcher: &Fetcher) -> Result<Vec<Feature>, DataLoadError> {
    let text = fetcher.fetch_text(&config.boundaries_source, BOUNDARIES)?;
    let features = decode_topojson(&text, &config.boundaries_object, BOUNDARIES)?;
    log::info!("Decoded {} boundary features", features.len());
    Ok(features)
}

fn to_long(wide: Table, value_fields: &[&str], category: &str) -> Table {
    let id_fields = [fields::COUNTRY, fields::YEAR];
    let records = reshape(&wide.records, &id_fields, value_fields, category, fields::VALUE);
    let columns = [fields::COUNTRY, fields::YEAR, category, fields::VALUE]
        .iter()
        .map(|c| c.to_string())
        .collect();
    Table::new(wide.name, columns, records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_factor_long_form_skips_whole_grains() {
        let dir = tempfile::tempdir().unwrap();
        let header: Vec<String> = ["Entity", "Code", "Year"]
            .iter()
            .map(|s| s.to_string())
            .chain(RISK_FACTOR_COLUMNS.iter().map(|s| s.to_string()))
            .collect();
        let row: Vec<String> = ["France", "FRA", "1990"]
            .iter()
            .map(|s| s.to_string())
            .chain((0..RISK_FACTOR_COLUMNS.len()).map(|i| i.to_string()))
            .collect();
        std::fs::write(
            dir.path().join("number-of-deaths-by-risk-factor.csv"),
            format!("{}\n{}\n", header.join(","), row.join(",")),
        )
        .unwrap();

        let config = DashboardConfig::default().with_local_dir(dir.path());
        let long = load_risk_factors(&config).unwrap();
        assert_eq!(long.len(), RISK_FACTOR_COLUMNS.len() - 1);
        assert!(long
            .records
            .iter()
            .all(|r| r.text(fields::RISK_FACTOR) != Some(EXCLUDED_RISK_FACTOR)));
        assert_eq!(
            long.columns,
            vec!["country", "year", "Risk Factor", "value"]
        );
    }

    #[test]
    fn control_policy_reads_header_with_metric_hints() {
        let text = "Country,Year,Monitor,ID\nFrance,2008,4,France2008\n";
        let t = load_text(text, &control_policy_spec()).unwrap();
        assert_eq!(t.records[0].number("Monitor"), Some(4.0));
        assert_eq!(t.records[0].value(ref_fields::YEAR).as_i64(), Some(2008));
    }
}
