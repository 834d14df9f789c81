use std::collections::BTreeMap;

use super::model::{Record, Value};

/// Unpivot wide records into long ones.
///
/// For every input record, in input order, one output record is emitted per
/// entry of `value_fields`, in the order given. Each output carries the
/// `id_fields` verbatim, `category_name` set to the source column name and
/// `value_name` set to the cell. Null or absent cells stay null, so
/// `output.len() == records.len() * value_fields.len()` always holds.
pub fn reshape<S: AsRef<str>>(
    records: &[Record],
    id_fields: &[S],
    value_fields: &[S],
    category_name: &str,
    value_name: &str,
) -> Vec<Record> {
    let mut out = Vec::with_capacity(records.len() * value_fields.len());
    for record in records {
        for column in value_fields {
            let column = column.as_ref();
            let long: Record = id_fields
                .iter()
                .map(|id| (id.as_ref().to_string(), record.value(id.as_ref()).clone()))
                .chain([
                    (category_name.to_string(), Value::from(column)),
                    (value_name.to_string(), record.value(column).clone()),
                ])
                .collect();
            out.push(long);
        }
    }
    out
}

/// Inverse of [`reshape`]: regroup long records by their id tuple (in order
/// of first occurrence) and turn each category back into a column.
pub fn widen<S: AsRef<str>>(
    records: &[Record],
    id_fields: &[S],
    category_name: &str,
    value_name: &str,
) -> Vec<Record> {
    let mut order: Vec<Vec<Value>> = Vec::new();
    let mut groups: BTreeMap<Vec<Value>, Vec<(String, Value)>> = BTreeMap::new();

    for record in records {
        let key: Vec<Value> = id_fields
            .iter()
            .map(|id| record.value(id.as_ref()).clone())
            .collect();
        let Some(category) = record.value(category_name).as_str() else {
            continue;
        };
        let entry = groups.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            Vec::new()
        });
        entry.push((category.to_string(), record.value(value_name).clone()));
    }

    order
        .into_iter()
        .map(|key| {
            let cells = groups.remove(&key).unwrap_or_default();
            id_fields
                .iter()
                .map(|id| id.as_ref().to_string())
                .zip(key)
                .chain(cells)
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const AGES: [&str; 3] = ["15 to 49", "50 to 69", "Above 70"];

    fn wide(country: &str, year: i64, values: [Option<f64>; 3]) -> Record {
        let mut r = Record::new()
            .with("country", country)
            .with("code", "XXX")
            .with("year", year);
        for (age, v) in AGES.iter().zip(values) {
            r = r.with(*age, v);
        }
        r
    }

    #[test]
    fn emits_one_record_per_value_field_in_order() {
        let input = vec![
            wide("France", 1990, [Some(1.0), Some(2.0), Some(3.0)]),
            wide("Spain", 1990, [Some(4.0), None, Some(6.0)]),
        ];
        let long = reshape(&input, &["country", "year"], &AGES, "Age", "value");

        assert_eq!(long.len(), 6);
        let cats: Vec<_> = long.iter().filter_map(|r| r.text("Age")).collect();
        assert_eq!(cats, [AGES, AGES].concat());
        assert_eq!(long[0].text("country"), Some("France"));
        assert_eq!(long[3].text("country"), Some("Spain"));
        assert_eq!(long[2].number("value"), Some(3.0));
        // Ids not asked for are not carried.
        assert!(long[0].get("code").is_none());
    }

    #[test]
    fn null_cells_are_preserved() {
        let input = vec![wide("Spain", 1990, [Some(4.0), None, Some(6.0)])];
        let long = reshape(&input, &["country", "year"], &AGES, "Age", "value");
        assert!(long[1].value("value").is_null());
        assert_eq!(long[1].text("Age"), Some("50 to 69"));
    }

    proptest! {
        #[test]
        fn output_size_and_ids_match_input(
            rows in proptest::collection::vec(
                ("[A-Z][a-z]{1,8}", 1990i64..2018, proptest::array::uniform3(proptest::option::of(0.0f64..1e6))),
                0..20,
            )
        ) {
            let input: Vec<Record> = rows.iter().map(|(c, y, v)| wide(c, *y, *v)).collect();
            let long = reshape(&input, &["country", "year"], &AGES, "Age", "value");
            prop_assert_eq!(long.len(), input.len() * AGES.len());
            for (i, r) in long.iter().enumerate() {
                let src = &input[i / AGES.len()];
                prop_assert_eq!(r.value("country"), src.value("country"));
                prop_assert_eq!(r.value("year"), src.value("year"));
            }
        }

        #[test]
        fn widening_restores_non_null_cells(
            rows in proptest::collection::vec(
                proptest::array::uniform3(proptest::option::of(-1e6f64..1e6)),
                1..10,
            )
        ) {
            // Distinct (country, year) per row so groups do not merge.
            let input: Vec<Record> = rows
                .iter()
                .enumerate()
                .map(|(i, v)| wide("Country", 1990 + i as i64, *v))
                .collect();
            let long = reshape(&input, &["country", "year"], &AGES, "Age", "value");
            let back = widen(&long, &["country", "year"], "Age", "value");
            prop_assert_eq!(back.len(), input.len());
            for (orig, rebuilt) in input.iter().zip(&back) {
                for age in AGES {
                    if !orig.value(age).is_null() {
                        prop_assert_eq!(orig.value(age), rebuilt.value(age));
                    }
                }
            }
        }
    }
}
