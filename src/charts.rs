//! Chart-ready data. Every builder is a pure function of the loaded records
//! and the current widget values; nothing here keeps state between frames.

use crate::data::datasets::{fields, ref_fields};
use crate::data::derive::{derive_change, pair_changes, DerivedMetricRecord, DerivedMetrics};
use crate::data::filter::{filter_and_aggregate, Aggregate, Predicate};
use crate::data::geo::Feature;
use crate::data::join::{index_by, lookup};
use crate::data::model::Record;
use crate::data::stats::{bin, linear_regression, normalized_stack, Bin};
use crate::error::JoinError;

/// Inclusive numeric interval chosen with a brush or a range slider.
pub type Interval = (f64, f64);

/// Axis extent of the metric-change histogram and scatter x axis.
pub const METRIC_EXTENT: Interval = (-100.0, 400.0);
/// Axis extent of the deaths-change histogram and scatter y axis.
pub const OUTCOME_EXTENT: Interval = (-100.0, 200.0);
pub const METRIC_MAXBINS: usize = 10;
pub const OUTCOME_MAXBINS: usize = 20;

fn year_predicate(field: &str, brush: Option<Interval>) -> Option<Predicate> {
    brush.map(|(lo, hi)| Predicate::range(field, lo.min(hi), lo.max(hi)))
}

fn numeric_pairs(rows: &[Record], x: &str, y: &str) -> Vec<(i64, f64)> {
    rows.iter()
        .filter_map(|r| Some((r.value(x).as_i64()?, r.number(y)?)))
        .collect()
}

// ---------------------------------------------------------------------------
// Smoking deaths
// ---------------------------------------------------------------------------

/// Total smoking deaths (all ages) per year for one country, sorted by year.
pub fn deaths_per_year(deaths: &[Record], country: &str) -> Vec<(i64, f64)> {
    let rows = filter_and_aggregate(
        deaths,
        &[Predicate::equals(fields::COUNTRY, country)],
        &[fields::YEAR],
        &Aggregate::Sum(fields::VALUE.into()),
    );
    let mut points = numeric_pairs(&rows, fields::YEAR, fields::VALUE);
    points.sort_by_key(|p| p.0);
    points
}

/// Normalised share of deaths per age band, per year, for one country and
/// the brushed years. Each band is `(year, lower, upper)` with bands stacked
/// from 0 to 1.
pub fn age_shares(
    deaths: &[Record],
    country: &str,
    brush: Option<Interval>,
) -> Vec<(String, Vec<(i64, f64, f64)>)> {
    let mut predicates = vec![Predicate::equals(fields::COUNTRY, country)];
    predicates.extend(year_predicate(fields::YEAR, brush));

    let rows = filter_and_aggregate::<&str>(deaths, &predicates, &[], &Aggregate::PassThrough);
    let triples: Vec<(i64, String, f64)> = rows
        .iter()
        .filter_map(|r| {
            Some((
                r.value(fields::YEAR).as_i64()?,
                r.text(fields::AGE)?.to_string(),
                r.number(fields::VALUE)?,
            ))
        })
        .collect();
    normalized_stack(&triples)
}

/// Total deaths per risk factor for one country and the brushed years,
/// largest first. Factors with no data at all are left out.
pub fn risk_factor_totals(
    factors: &[Record],
    country: &str,
    brush: Option<Interval>,
) -> Vec<(String, f64)> {
    let mut predicates = vec![Predicate::equals(fields::COUNTRY, country)];
    predicates.extend(year_predicate(fields::YEAR, brush));

    let rows = filter_and_aggregate(
        factors,
        &predicates,
        &[fields::RISK_FACTOR],
        &Aggregate::Sum(fields::VALUE.into()),
    );
    let mut totals: Vec<(String, f64)> = rows
        .iter()
        .filter_map(|r| Some((r.text(fields::RISK_FACTOR)?.to_string(), r.number(fields::VALUE)?)))
        .collect();
    totals.sort_by(|a, b| b.1.total_cmp(&a.1));
    totals
}

// ---------------------------------------------------------------------------
// Cigarette sales
// ---------------------------------------------------------------------------

/// Sales rows of the chosen countries within the inclusive year range, in
/// file order.
pub fn sales_rows(sales: &[Record], countries: &[String], years: (i64, i64)) -> Vec<Record> {
    let predicates = [
        Predicate::one_of(ref_fields::COUNTRY, countries.iter().cloned()),
        Predicate::range(ref_fields::YEAR, years.0 as f64, years.1 as f64),
    ];
    filter_and_aggregate::<&str>(sales, &predicates, &[], &Aggregate::PassThrough)
}

/// One `(year, daily cigarettes)` line per country, countries in order of
/// first appearance. Rows without a sales figure are skipped.
pub fn sales_series(
    sales: &[Record],
    countries: &[String],
    years: (i64, i64),
) -> Vec<(String, Vec<(i64, f64)>)> {
    let mut series: Vec<(String, Vec<(i64, f64)>)> = Vec::new();
    for row in sales_rows(sales, countries, years) {
        let (Some(country), Some(year), Some(v)) = (
            row.text(ref_fields::COUNTRY),
            row.value(ref_fields::YEAR).as_i64(),
            row.number(ref_fields::NUM_CIG),
        ) else {
            continue;
        };
        match series.iter_mut().find(|(c, _)| c == country) {
            Some((_, points)) => points.push((year, v)),
            None => series.push((country.to_string(), vec![(year, v)])),
        }
    }
    series
}

// ---------------------------------------------------------------------------
// Control policies
// ---------------------------------------------------------------------------

/// A boundary feature with the policy score it is coloured by.
#[derive(Debug)]
pub struct Region<'a> {
    pub feature: &'a Feature,
    pub score: Option<f64>,
}

#[derive(Debug)]
pub struct Choropleth<'a> {
    pub regions: Vec<Region<'a>>,
    /// Features without a score for the chosen year.
    pub misses: Vec<JoinError>,
}

/// Score of `metric` in `year` for every boundary feature, matched on the
/// country name.
pub fn choropleth<'a>(
    features: &'a [Feature],
    control: &[Record],
    metric: &str,
    year: i64,
    dataset: &str,
) -> Choropleth<'a> {
    let in_year = filter_and_aggregate::<&str>(
        control,
        &[Predicate::equals(ref_fields::YEAR, year)],
        &[],
        &Aggregate::PassThrough,
    );
    let index = index_by(&in_year, ref_fields::COUNTRY);
    let found = lookup(features.iter().map(|f| f.name.as_str()), &index, dataset);

    let regions = features
        .iter()
        .zip(found.matched)
        .map(|(feature, (_, hit))| Region {
            feature,
            score: hit.and_then(|r| r.number(metric)),
        })
        .collect();
    Choropleth {
        regions,
        misses: found.misses,
    }
}

/// Percentage change of the chosen control metric against the percentage
/// change of smoking deaths between `years`, one record per country present
/// in both datasets.
pub fn policy_effect(
    control: &[Record],
    deaths: &[Record],
    metric: &str,
    years: (i64, i64),
    deaths_dataset: &str,
) -> DerivedMetrics {
    let (a, b) = years;
    let metric_change = derive_change(control, ref_fields::COUNTRY, ref_fields::YEAR, metric, a, b);
    let deaths_change = derive_change(
        deaths,
        ref_fields::COUNTRY,
        ref_fields::YEAR,
        ref_fields::DEATHS,
        a,
        b,
    );
    pair_changes(&metric_change, &deaths_change, deaths_dataset)
}

fn inside(v: f64, brush: Option<Interval>) -> bool {
    brush.is_none_or(|(lo, hi)| lo.min(hi) <= v && v <= lo.max(hi))
}

/// Points inside both histogram brushes (an absent brush passes everything).
pub fn brushed<'a>(
    records: &'a [DerivedMetricRecord],
    metric_brush: Option<Interval>,
    outcome_brush: Option<Interval>,
) -> Vec<&'a DerivedMetricRecord> {
    records
        .iter()
        .filter(|r| inside(r.metric_change_pct, metric_brush) && inside(r.outcome_change_pct, outcome_brush))
        .collect()
}

pub fn metric_histogram(records: &[DerivedMetricRecord]) -> Vec<Bin> {
    let values: Vec<f64> = records.iter().map(|r| r.metric_change_pct).collect();
    bin(&values, METRIC_MAXBINS, METRIC_EXTENT)
}

pub fn outcome_histogram(records: &[DerivedMetricRecord]) -> Vec<Bin> {
    let values: Vec<f64> = records.iter().map(|r| r.outcome_change_pct).collect();
    bin(&values, OUTCOME_MAXBINS, OUTCOME_EXTENT)
}

/// Endpoints of the least-squares line over the x range of the points.
pub fn regression_segment(points: &[&DerivedMetricRecord]) -> Option<[[f64; 2]; 2]> {
    let xy: Vec<(f64, f64)> = points
        .iter()
        .map(|r| (r.metric_change_pct, r.outcome_change_pct))
        .collect();
    let fit = linear_regression(&xy)?;
    let (lo, hi) = xy
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| (lo.min(p.0), hi.max(p.0)));
    Some([[lo, fit.at(lo)], [hi, fit.at(hi)]])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long(country: &str, year: i64, cat_field: &str, cat: &str, v: Option<f64>) -> Record {
        Record::new()
            .with(fields::COUNTRY, country)
            .with(fields::YEAR, year)
            .with(cat_field, cat)
            .with(fields::VALUE, v)
    }

    #[test]
    fn deaths_per_year_sums_age_bands() {
        let deaths = vec![
            long("France", 1991, fields::AGE, "15 to 49", Some(1.0)),
            long("France", 1990, fields::AGE, "15 to 49", Some(2.0)),
            long("France", 1990, fields::AGE, "Above 70", Some(3.0)),
            long("Spain", 1990, fields::AGE, "Above 70", Some(100.0)),
        ];
        assert_eq!(deaths_per_year(&deaths, "France"), vec![(1990, 5.0), (1991, 1.0)]);
    }

    #[test]
    fn age_shares_respect_the_brush() {
        let deaths = vec![
            long("France", 1990, fields::AGE, "15 to 49", Some(1.0)),
            long("France", 1990, fields::AGE, "Above 70", Some(3.0)),
            long("France", 2000, fields::AGE, "15 to 49", Some(1.0)),
        ];
        let bands = age_shares(&deaths, "France", Some((1989.0, 1995.0)));
        assert_eq!(bands.len(), 2);
        assert_eq!(bands[0].1, vec![(1990, 0.0, 0.25)]);
    }

    #[test]
    fn risk_factors_sorted_descending_without_empty_factors() {
        let f = fields::RISK_FACTOR;
        let factors = vec![
            long("France", 1990, f, "Alcohol use", Some(5.0)),
            long("France", 1990, f, "Smoking", Some(9.0)),
            long("France", 1991, f, "Alcohol use", Some(5.0)),
            long("France", 1990, f, "High total cholesterol", None),
            long("France", 2010, f, "Smoking", Some(1000.0)),
        ];
        let totals = risk_factor_totals(&factors, "France", Some((1990.0, 2000.0)));
        assert_eq!(
            totals,
            vec![("Alcohol use".to_string(), 10.0), ("Smoking".to_string(), 9.0)]
        );
    }

    #[test]
    fn sales_series_group_per_country() {
        let row = |c: &str, y: i64, v: f64| {
            Record::new()
                .with(ref_fields::COUNTRY, c)
                .with(ref_fields::YEAR, y)
                .with(ref_fields::NUM_CIG, v)
        };
        let sales = vec![
            row("Spain", 1980, 5.0),
            row("France", 1980, 6.0),
            row("Spain", 1981, 5.5),
            row("Italy", 1980, 4.0),
        ];
        let series = sales_series(&sales, &["France".into(), "Spain".into()], (1980, 1990));
        assert_eq!(series[0], ("Spain".to_string(), vec![(1980, 5.0), (1981, 5.5)]));
        assert_eq!(series[1], ("France".to_string(), vec![(1980, 6.0)]));
    }

    #[test]
    fn choropleth_colours_matched_features_only() {
        let features = vec![
            Feature { name: "France".into(), polygons: vec![] },
            Feature { name: "Atlantis".into(), polygons: vec![] },
        ];
        let control = vec![
            Record::new().with("Country", "France").with("Year", 2010i64).with("Monitor", 4.0),
            Record::new().with("Country", "France").with("Year", 2008i64).with("Monitor", 2.0),
        ];
        let map = choropleth(&features, &control, "Monitor", 2010, "control policy");
        assert_eq!(map.regions[0].score, Some(4.0));
        assert_eq!(map.regions[1].score, None);
        assert_eq!(map.misses.len(), 1);
    }

    #[test]
    fn brushes_and_regression() {
        let recs = vec![
            DerivedMetricRecord { entity: "A".into(), metric_change_pct: 0.0, outcome_change_pct: 10.0 },
            DerivedMetricRecord { entity: "B".into(), metric_change_pct: 100.0, outcome_change_pct: -10.0 },
            DerivedMetricRecord { entity: "C".into(), metric_change_pct: 300.0, outcome_change_pct: -50.0 },
        ];
        let all = brushed(&recs, None, None);
        assert_eq!(all.len(), 3);
        let some = brushed(&recs, Some((150.0, -10.0)), None);
        assert_eq!(some.iter().map(|r| r.entity.as_str()).collect::<Vec<_>>(), vec!["A", "B"]);

        let seg = regression_segment(&some).unwrap();
        assert_eq!(seg[0][0], 0.0);
        assert!((seg[0][1] - 10.0).abs() < 1e-9);
        assert!((seg[1][1] + 10.0).abs() < 1e-9);

        assert_eq!(metric_histogram(&recs).iter().map(|b| b.count).sum::<usize>(), 3);
    }
}
