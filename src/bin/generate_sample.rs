//! Writes a small synthetic copy of every dashboard dataset into a folder
//! (default `sample_data/`), ready for "Open data folder…".

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use serde_json::json;

use tobacco_dashboard::config::DashboardConfig;
use tobacco_dashboard::data::datasets::{
    AGE_BANDS, CONTROL_METRICS, POLICY_YEARS, RISK_FACTOR_COLUMNS, SMOKING,
};

const COUNTRIES: [(&str, &str); 12] = [
    ("France", "FRA"),
    ("Germany", "DEU"),
    ("Spain", "ESP"),
    ("Italy", "ITA"),
    ("United Kingdom", "GBR"),
    ("Poland", "POL"),
    ("Norway", "NOR"),
    ("Greece", "GRC"),
    ("Portugal", "PRT"),
    ("Sweden", "SWE"),
    ("Netherlands", "NLD"),
    ("Belgium", "BEL"),
];

/// Present everywhere except in the death counts, so the scatterplot has
/// one excluded country.
const NO_DEATH_COUNTS: &str = "Belgium";

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    /// Uniform in `[lo, hi)`.
    fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        let unit = (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64;
        lo + (hi - lo) * unit
    }

    /// Integer score in `1..=5`.
    fn score(&mut self) -> i64 {
        1 + (self.next_u64() % 5) as i64
    }
}

fn csv_writer(dir: &Path, name: &str) -> Result<csv::Writer<std::fs::File>> {
    let path = dir.join(name);
    csv::Writer::from_path(&path).with_context(|| format!("creating {}", path.display()))
}

fn round1(v: f64) -> String {
    format!("{:.1}", v)
}

fn write_deaths_by_age(dir: &Path, file: &str, rng: &mut SimpleRng) -> Result<()> {
    let mut w = csv_writer(dir, file)?;
    let mut header = vec!["Entity", "Code", "Year"];
    header.extend(AGE_BANDS);
    w.write_record(&header)?;

    for (country, code) in COUNTRIES {
        let base = rng.uniform(2_000.0, 40_000.0);
        for year in 1990..=2017 {
            let trend = 1.0 - 0.01 * (year - 1990) as f64;
            let mut row = vec![country.to_string(), code.to_string(), year.to_string()];
            for weight in [0.15, 0.45, 0.40] {
                row.push(round1(base * weight * trend * rng.uniform(0.9, 1.1)));
            }
            w.write_record(&row)?;
        }
    }
    w.flush()?;
    Ok(())
}

fn write_risk_factors(dir: &Path, file: &str, rng: &mut SimpleRng) -> Result<()> {
    let mut w = csv_writer(dir, file)?;
    let mut header = vec!["Entity", "Code", "Year"];
    header.extend(RISK_FACTOR_COLUMNS);
    w.write_record(&header)?;

    for (country, code) in COUNTRIES {
        let scale = rng.uniform(0.5, 3.0);
        for year in 1990..=2017 {
            let mut row = vec![country.to_string(), code.to_string(), year.to_string()];
            for factor in RISK_FACTOR_COLUMNS {
                let magnitude = if factor == SMOKING { 50_000.0 } else { 8_000.0 };
                row.push(round1(scale * magnitude * rng.uniform(0.0, 1.0)));
            }
            w.write_record(&row)?;
        }
    }
    w.flush()?;
    Ok(())
}

struct SalesRows {
    country: Vec<String>,
    code: Vec<String>,
    year: Vec<i64>,
    num_cig: Vec<f64>,
}

fn sales_rows(rng: &mut SimpleRng) -> SalesRows {
    let mut rows = SalesRows {
        country: Vec::new(),
        code: Vec::new(),
        year: Vec::new(),
        num_cig: Vec::new(),
    };
    for (i, (country, code)) in COUNTRIES.iter().enumerate() {
        // Later countries start reporting later.
        let first_year = 1950 + 2 * i as i64;
        let peak = rng.uniform(1970.0, 1985.0);
        let height = rng.uniform(5.0, 10.0);
        for year in first_year..=2010 {
            let d = (year as f64 - peak) / 20.0;
            rows.country.push(country.to_string());
            rows.code.push(code.to_string());
            rows.year.push(year);
            rows.num_cig.push((height * (-d * d).exp() * 10.0).round() / 10.0);
        }
    }
    rows
}

fn write_sales(dir: &Path, file: &str, rows: &SalesRows) -> Result<()> {
    let mut w = csv_writer(dir, file)?;
    w.write_record(["Entity", "Code", "Year", "NumCig"])?;
    for i in 0..rows.year.len() {
        w.write_record([
            rows.country[i].clone(),
            rows.code[i].clone(),
            rows.year[i].to_string(),
            rows.num_cig[i].to_string(),
        ])?;
    }
    w.flush()?;
    Ok(())
}

fn write_sales_parquet(path: &Path, rows: &SalesRows) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("Country", DataType::Utf8, false),
        Field::new("Code", DataType::Utf8, false),
        Field::new("Year", DataType::Int64, false),
        Field::new("NumCig", DataType::Float64, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(rows.country.clone())),
            Arc::new(StringArray::from(rows.code.clone())),
            Arc::new(Int64Array::from(rows.year.clone())),
            Arc::new(Float64Array::from(rows.num_cig.clone())),
        ],
    )
    .context("building sales record batch")?;

    let file = std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn write_control_policy(dir: &Path, rng: &mut SimpleRng) -> Result<()> {
    let mut w = csv_writer(dir, "control_policy.csv")?;
    let mut header = vec!["Country", "Year"];
    header.extend(CONTROL_METRICS);
    header.push("ID");
    w.write_record(&header)?;

    for (country, _) in COUNTRIES {
        for year in POLICY_YEARS {
            let mut row = vec![country.to_string(), year.to_string()];
            row.extend(CONTROL_METRICS.iter().map(|_| rng.score().to_string()));
            row.push(format!("{country}{year}"));
            w.write_record(&row)?;
        }
    }
    w.flush()?;
    Ok(())
}

fn write_death_counts(dir: &Path, rng: &mut SimpleRng) -> Result<()> {
    let mut w = csv_writer(dir, "deaths.csv")?;
    w.write_record(["Country", "Year", "deaths", "ID"])?;

    for (country, _) in COUNTRIES.iter().filter(|(c, _)| *c != NO_DEATH_COUNTS) {
        let mut deaths = rng.uniform(5_000.0, 100_000.0);
        for year in POLICY_YEARS {
            w.write_record([
                country.to_string(),
                year.to_string(),
                format!("{:.0}", deaths),
                format!("{country}{year}"),
            ])?;
            deaths *= rng.uniform(0.85, 1.1);
        }
    }
    w.flush()?;
    Ok(())
}

/// One square per country on a 4 x 3 grid over Europe, unquantised.
fn write_boundaries(dir: &Path, object: &str) -> Result<()> {
    let mut arcs = Vec::new();
    let mut geometries = Vec::new();
    for (i, (country, _)) in COUNTRIES.iter().enumerate() {
        let x0 = -10.0 + 10.0 * (i % 4) as f64;
        let y0 = 35.0 + 8.0 * (i / 4) as f64;
        arcs.push(json!([
            [x0, y0],
            [x0 + 9.5, y0],
            [x0 + 9.5, y0 + 7.5],
            [x0, y0 + 7.5],
            [x0, y0]
        ]));
        geometries.push(json!({
            "type": "Polygon",
            "arcs": [[i]],
            "properties": {"name": country}
        }));
    }
    let topology = json!({
        "type": "Topology",
        "arcs": arcs,
        "objects": {
            object: {"type": "GeometryCollection", "geometries": geometries}
        }
    });

    let path = dir.join("world-countries.json");
    std::fs::write(&path, serde_json::to_string_pretty(&topology)?)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("sample_data"));
    std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

    let config = DashboardConfig::default();
    let mut rng = SimpleRng::new(42);

    write_deaths_by_age(&dir, &config.deaths_by_age_file, &mut rng)?;
    write_risk_factors(&dir, &config.risk_factors_file, &mut rng)?;
    let sales = sales_rows(&mut rng);
    write_sales(&dir, &config.sales_file, &sales)?;
    write_sales_parquet(&dir.join("sales.parquet"), &sales)?;
    write_control_policy(&dir, &mut rng)?;
    write_death_counts(&dir, &mut rng)?;
    write_boundaries(&dir, &config.boundaries_object)?;

    println!(
        "Wrote {} countries of sample data to {}",
        COUNTRIES.len(),
        dir.display()
    );
    Ok(())
}
