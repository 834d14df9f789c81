//! Percentage change of a value between two reference years, per entity, and
//! the pairing of two such changes into scatterplot records.

use std::collections::BTreeMap;

use super::model::Record;
use crate::error::{ComputationError, JoinError};

/// Per-entity outcome of [`derive_change`]. Failures are tagged per entity
/// and never abort the other entities.
pub type Changes = BTreeMap<String, Result<f64, ComputationError>>;

/// `((b / a) - 1) * 100`
pub fn pct_change(a: f64, b: f64) -> f64 {
    ((b / a) - 1.0) * 100.0
}

#[derive(Default)]
struct YearSums {
    a: f64,
    b: f64,
    seen_a: bool,
    seen_b: bool,
}

/// Group `records` by `entity_field` and compute, for each entity, the
/// percentage change of the summed `value_field` from `year_a` to `year_b`.
///
/// An entity without any record for either year is tagged
/// [`ComputationError::MissingYear`]; a zero baseline sum is tagged
/// [`ComputationError::ZeroBaseline`]. Null values do not contribute to the
/// sums, so a year whose values are all null counts as missing. Records
/// without an entity are ignored.
pub fn derive_change(
    records: &[Record],
    entity_field: &str,
    year_field: &str,
    value_field: &str,
    year_a: i64,
    year_b: i64,
) -> Changes {
    let mut sums: BTreeMap<&str, YearSums> = BTreeMap::new();

    for record in records {
        let Some(entity) = record.text(entity_field) else {
            continue;
        };
        let slot = sums.entry(entity).or_default();
        let Some(value) = record.number(value_field) else {
            continue;
        };
        let year = record.value(year_field).as_i64();
        if year == Some(year_a) {
            slot.a += value;
            slot.seen_a = true;
        }
        if year == Some(year_b) {
            slot.b += value;
            slot.seen_b = true;
        }
    }

    sums.into_iter()
        .map(|(entity, s)| {
            let result = if !s.seen_a {
                Err(ComputationError::MissingYear {
                    entity: entity.to_string(),
                    year: year_a,
                })
            } else if !s.seen_b {
                Err(ComputationError::MissingYear {
                    entity: entity.to_string(),
                    year: year_b,
                })
            } else if s.a == 0.0 {
                Err(ComputationError::ZeroBaseline {
                    entity: entity.to_string(),
                    year: year_a,
                })
            } else {
                let pct = pct_change(s.a, s.b);
                if pct.is_finite() {
                    Ok(pct)
                } else {
                    Err(ComputationError::NonFinite {
                        entity: entity.to_string(),
                    })
                }
            };
            (entity.to_string(), result)
        })
        .collect()
}

/// One scatterplot point.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedMetricRecord {
    pub entity: String,
    pub metric_change_pct: f64,
    pub outcome_change_pct: f64,
}

/// Why an entity is missing from the scatterplot.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Skipped {
    #[error(transparent)]
    Computation(#[from] ComputationError),
    #[error(transparent)]
    Join(#[from] JoinError),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedMetrics {
    /// One record per entity with both changes defined, sorted by entity.
    pub records: Vec<DerivedMetricRecord>,
    pub skipped: Vec<Skipped>,
}

/// Pair a metric change with an outcome change per entity.
///
/// Entities are driven by `metric`: an entity absent from `outcome` becomes a
/// [`JoinError`], an entity whose change failed on either side carries its
/// [`ComputationError`]. Both end up in `skipped`, never in `records`.
pub fn pair_changes(metric: &Changes, outcome: &Changes, outcome_dataset: &str) -> DerivedMetrics {
    let mut out = DerivedMetrics::default();

    for (entity, metric_change) in metric {
        let Some(outcome_change) = outcome.get(entity) else {
            log::debug!("{entity} has no counterpart in {outcome_dataset}");
            out.skipped.push(
                JoinError::MissingKey {
                    key: entity.clone(),
                    dataset: outcome_dataset.to_string(),
                }
                .into(),
            );
            continue;
        };
        match (metric_change, outcome_change) {
            (Ok(m), Ok(o)) => out.records.push(DerivedMetricRecord {
                entity: entity.clone(),
                metric_change_pct: *m,
                outcome_change_pct: *o,
            }),
            (Err(e), _) | (_, Err(e)) => out.skipped.push(e.clone().into()),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(entity: &str, year: i64, v: f64) -> Record {
        Record::new()
            .with("Country", entity)
            .with("Year", year)
            .with("v", v)
    }

    #[test]
    fn fifty_percent_increase() {
        let records = vec![
            rec("France", 2008, 60.0),
            rec("France", 2008, 40.0),
            rec("France", 2012, 999.0),
            rec("France", 2016, 150.0),
        ];
        let changes = derive_change(&records, "Country", "Year", "v", 2008, 2016);
        assert_eq!(changes["France"], Ok(50.0));
    }

    #[test]
    fn zero_baseline_is_tagged_not_zero() {
        let records = vec![rec("Chad", 2008, 0.0), rec("Chad", 2016, 10.0)];
        let changes = derive_change(&records, "Country", "Year", "v", 2008, 2016);
        assert_eq!(
            changes["Chad"],
            Err(ComputationError::ZeroBaseline {
                entity: "Chad".into(),
                year: 2008
            })
        );
    }

    #[test]
    fn missing_year_is_tagged_and_other_entities_survive() {
        let records = vec![
            rec("Chad", 2016, 10.0),
            rec("Peru", 2008, 2.0),
            rec("Peru", 2016, 1.0),
            rec("Togo", 2008, 2.0),
        ];
        let changes = derive_change(&records, "Country", "Year", "v", 2008, 2016);
        assert!(matches!(
            changes["Chad"],
            Err(ComputationError::MissingYear { year: 2008, .. })
        ));
        assert!(matches!(
            changes["Togo"],
            Err(ComputationError::MissingYear { year: 2016, .. })
        ));
        assert_eq!(changes["Peru"], Ok(-50.0));
    }

    #[test]
    fn year_given_as_text_is_accepted() {
        let records = vec![
            Record::new().with("Country", "Peru").with("Year", "2008").with("v", 4.0),
            Record::new().with("Country", "Peru").with("Year", "2016").with("v", 5.0),
        ];
        let changes = derive_change(&records, "Country", "Year", "v", 2008, 2016);
        assert_eq!(changes["Peru"], Ok(25.0));
    }

    #[test]
    fn null_only_year_is_missing_not_minus_hundred() {
        let null = |entity: &str, year: i64| {
            Record::new()
                .with("Country", entity)
                .with("Year", year)
                .with("v", None::<f64>)
        };
        let records = vec![
            rec("France", 2008, 100.0),
            null("France", 2016),
            null("Chad", 2008),
            rec("Chad", 2016, 10.0),
        ];
        let changes = derive_change(&records, "Country", "Year", "v", 2008, 2016);
        assert_eq!(
            changes["France"],
            Err(ComputationError::MissingYear {
                entity: "France".into(),
                year: 2016
            })
        );
        assert_eq!(
            changes["Chad"],
            Err(ComputationError::MissingYear {
                entity: "Chad".into(),
                year: 2008
            })
        );
    }

    #[test]
    fn pairing_excludes_join_misses_and_failures() {
        let metric: Changes = [
            ("France".to_string(), Ok(10.0)),
            ("Narnia".to_string(), Ok(5.0)),
            ("Chad".to_string(), Ok(1.0)),
        ]
        .into_iter()
        .collect();
        let outcome: Changes = [
            ("France".to_string(), Ok(-3.0)),
            (
                "Chad".to_string(),
                Err(ComputationError::ZeroBaseline {
                    entity: "Chad".into(),
                    year: 2008,
                }),
            ),
        ]
        .into_iter()
        .collect();

        let paired = pair_changes(&metric, &outcome, "deaths");
        assert_eq!(
            paired.records,
            vec![DerivedMetricRecord {
                entity: "France".into(),
                metric_change_pct: 10.0,
                outcome_change_pct: -3.0,
            }]
        );
        assert_eq!(paired.skipped.len(), 2);
        assert!(paired.skipped.contains(&Skipped::Join(JoinError::MissingKey {
            key: "Narnia".into(),
            dataset: "deaths".into(),
        })));
    }
}
