use std::collections::{BTreeMap, BTreeSet};

use super::model::{Record, Value};

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

/// One condition on a record. A record whose field is absent or null never
/// satisfies a predicate. Numbers compare by value, so `Integer(2010)`
/// matches `Float(2010.0)`.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `field == value`
    Equals(String, Value),
    /// `field ∈ allowed`. An empty set matches nothing.
    OneOf(String, BTreeSet<Value>),
    /// `lo <= field <= hi`, numeric.
    Range(String, f64, f64),
}

impl Predicate {
    pub fn equals(field: &str, value: impl Into<Value>) -> Self {
        Predicate::Equals(field.to_string(), value.into())
    }

    pub fn one_of<V: Into<Value>>(field: &str, values: impl IntoIterator<Item = V>) -> Self {
        Predicate::OneOf(
            field.to_string(),
            values.into_iter().map(Into::into).collect(),
        )
    }

    pub fn range(field: &str, lo: f64, hi: f64) -> Self {
        Predicate::Range(field.to_string(), lo, hi)
    }

    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Predicate::Equals(field, expected) => {
                let v = record.value(field);
                !v.is_null() && (v == expected || same_number(v, expected))
            }
            Predicate::OneOf(field, allowed) => {
                let v = record.value(field);
                !v.is_null()
                    && (allowed.contains(v) || allowed.iter().any(|a| same_number(v, a)))
            }
            Predicate::Range(field, lo, hi) => record
                .number(field)
                .is_some_and(|x| *lo <= x && x <= *hi),
        }
    }
}

fn same_number(a: &Value, b: &Value) -> bool {
    matches!((a.as_f64(), b.as_f64()), (Some(x), Some(y)) if x == y)
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Output column used by [`Aggregate::Count`].
pub const COUNT_FIELD: &str = "count";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Aggregate {
    /// Keep the filtered rows as they are.
    PassThrough,
    /// Sum a numeric field per group; the result keeps the field's name.
    Sum(String),
    /// Count non-null values of a field, or rows when no field is given.
    Count(Option<String>),
}

/// Running state of one group.
#[derive(Default)]
struct Accumulator {
    int_sum: i64,
    float_sum: f64,
    seen_float: bool,
    non_null: usize,
    rows: usize,
}

impl Accumulator {
    fn add(&mut self, v: &Value) {
        self.rows += 1;
        match v {
            Value::Integer(i) => {
                match self.int_sum.checked_add(*i) {
                    Some(sum) => self.int_sum = sum,
                    // Past i64 the group is summed as a float.
                    None => {
                        self.float_sum += *i as f64;
                        self.seen_float = true;
                    }
                }
                self.non_null += 1;
            }
            Value::Float(f) => {
                self.float_sum += f;
                self.seen_float = true;
                self.non_null += 1;
            }
            // Text and null do not contribute to sums or field counts.
            Value::Text(_) | Value::Null => {}
        }
    }

    fn sum(&self) -> Value {
        if self.non_null == 0 {
            Value::Null
        } else if self.seen_float {
            Value::Float(self.float_sum + self.int_sum as f64)
        } else {
            Value::Integer(self.int_sum)
        }
    }
}

/// Keep only the records that satisfy every predicate.
pub fn filter<'a>(
    records: &'a [Record],
    predicates: &'a [Predicate],
) -> impl Iterator<Item = &'a Record> + 'a {
    records
        .iter()
        .filter(move |r| predicates.iter().all(|p| p.matches(r)))
}

/// Filter records with ANDed predicates, then group and aggregate.
///
/// Groups appear in the order their key first occurs in `records`. With an
/// empty `group_by` the whole filtered set forms one group, and that group is
/// emitted even when it is empty so a total of zero rows still yields a
/// count of `0`.
pub fn filter_and_aggregate<S: AsRef<str>>(
    records: &[Record],
    predicates: &[Predicate],
    group_by: &[S],
    agg: &Aggregate,
) -> Vec<Record> {
    let kept = filter(records, predicates);

    let (field, count_rows) = match agg {
        Aggregate::PassThrough => return kept.cloned().collect(),
        Aggregate::Sum(f) => (Some(f.as_str()), false),
        Aggregate::Count(f) => (f.as_deref(), f.is_none()),
    };

    let mut order: Vec<Vec<Value>> = Vec::new();
    let mut groups: BTreeMap<Vec<Value>, Accumulator> = BTreeMap::new();
    if group_by.is_empty() {
        order.push(Vec::new());
        groups.insert(Vec::new(), Accumulator::default());
    }

    for record in kept {
        let key: Vec<Value> = group_by
            .iter()
            .map(|g| record.value(g.as_ref()).clone())
            .collect();
        let acc = groups.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            Accumulator::default()
        });
        acc.add(field.map_or(&Value::Null, |f| record.value(f)));
    }

    order
        .into_iter()
        .map(|key| {
            let acc = groups.remove(&key).unwrap_or_default();
            let result = match agg {
                Aggregate::Sum(f) => (f.clone(), acc.sum()),
                _ => {
                    let n = if count_rows { acc.rows } else { acc.non_null };
                    (COUNT_FIELD.to_string(), Value::Integer(n as i64))
                }
            };
            group_by
                .iter()
                .map(|g| g.as_ref().to_string())
                .zip(key)
                .chain(std::iter::once(result))
                .collect()
        })
        .collect()
}

/// Distinct text values of a field, sorted (dropdown options).
pub fn sorted_labels(records: &[Record], field: &str) -> Vec<String> {
    records
        .iter()
        .filter_map(|r| r.text(field))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(country: &str, year: i64, v: Option<i64>) -> Record {
        Record::new()
            .with("country", country)
            .with("year", year)
            .with("v", v)
    }

    fn sample() -> Vec<Record> {
        vec![
            row("France", 1980, Some(6)),
            row("France", 1990, Some(4)),
            row("Spain", 1980, Some(5)),
        ]
    }

    #[test]
    fn membership_and_range_then_sum() {
        let out = filter_and_aggregate(
            &sample(),
            &[
                Predicate::one_of("country", ["France"]),
                Predicate::range("year", 1980.0, 1985.0),
            ],
            &["country"],
            &Aggregate::Sum("v".into()),
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text("country"), Some("France"));
        assert_eq!(out[0].value("v"), &Value::Integer(6));
    }

    #[test]
    fn groups_keep_first_occurrence_order() {
        let records = vec![
            row("Spain", 1980, Some(1)),
            row("France", 1980, Some(2)),
            row("Spain", 1990, Some(3)),
        ];
        let out = filter_and_aggregate(&records, &[], &["country"], &Aggregate::Sum("v".into()));
        let keys: Vec<_> = out.iter().filter_map(|r| r.text("country")).collect();
        assert_eq!(keys, vec!["Spain", "France"]);
        assert_eq!(out[0].number("v"), Some(4.0));
    }

    #[test]
    fn nulls_are_excluded_from_sums_and_counts() {
        let records = vec![
            row("France", 1980, Some(6)),
            row("France", 1990, None),
            row("Spain", 1990, None),
        ];
        let sums = filter_and_aggregate(&records, &[], &["country"], &Aggregate::Sum("v".into()));
        assert_eq!(sums[0].value("v"), &Value::Integer(6));
        assert!(sums[1].value("v").is_null());

        let counts = filter_and_aggregate(
            &records,
            &[],
            &["country"],
            &Aggregate::Count(Some("v".into())),
        );
        assert_eq!(counts[0].value(COUNT_FIELD), &Value::Integer(1));
        assert_eq!(counts[1].value(COUNT_FIELD), &Value::Integer(0));

        let rows = filter_and_aggregate::<&str>(&records, &[], &[], &Aggregate::Count(None));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value(COUNT_FIELD), &Value::Integer(3));
    }

    #[test]
    fn mixed_numeric_sum_is_float() {
        let records = vec![
            Record::new().with("k", "a").with("v", 1i64),
            Record::new().with("k", "a").with("v", 0.5),
        ];
        let out = filter_and_aggregate(&records, &[], &["k"], &Aggregate::Sum("v".into()));
        assert_eq!(out[0].value("v"), &Value::Float(1.5));
    }

    #[test]
    fn pass_through_keeps_rows_in_order() {
        let out = filter_and_aggregate::<&str>(
            &sample(),
            &[Predicate::equals("year", 1980i64)],
            &[],
            &Aggregate::PassThrough,
        );
        assert_eq!(out, vec![sample()[0].clone(), sample()[2].clone()]);
    }

    #[test]
    fn empty_membership_set_matches_nothing() {
        let none: [&str; 0] = [];
        let out = filter(&sample(), &[Predicate::one_of("country", none)]).count();
        assert_eq!(out, 0);
    }

    #[test]
    fn null_field_never_matches() {
        let p = Predicate::range("v", f64::NEG_INFINITY, f64::INFINITY);
        assert!(!p.matches(&row("Spain", 1990, None)));
        assert!(p.matches(&row("Spain", 1990, Some(1))));
    }

    #[test]
    fn sorted_labels_are_distinct() {
        let records = vec![
            row("Spain", 1980, None),
            row("France", 1980, None),
            row("Spain", 1990, None),
        ];
        assert_eq!(sorted_labels(&records, "country"), vec!["France", "Spain"]);
    }

    #[test]
    fn integer_sum_past_i64_falls_back_to_float() {
        let records = vec![row("France", 1980, Some(i64::MAX)), row("France", 1990, Some(1))];
        let out = filter_and_aggregate(&records, &[], &["country"], &Aggregate::Sum("v".into()));
        match out[0].value("v") {
            Value::Float(f) => assert!((f - (i64::MAX as f64 + 1.0)).abs() < 1e4),
            other => panic!("expected a float sum, got {other:?}"),
        }
    }

    #[test]
    fn equality_on_numbers_ignores_integer_or_float() {
        let france = row("France", 1980, Some(6));
        assert!(Predicate::equals("year", 1980.0).matches(&france));
        assert!(Predicate::one_of("year", [1980.0, 1990.0]).matches(&france));
        assert!(!Predicate::equals("year", 1980.5).matches(&france));
        assert!(!Predicate::equals("country", 1980.0).matches(&france));
    }
}
