use std::collections::BTreeMap;

use super::model::Record;
use crate::error::JoinError;

/// Index records by a text key. The first record with a given key wins,
/// matching a lookup transform that takes the first match.
pub fn index_by<'a>(records: &'a [Record], key_field: &str) -> BTreeMap<&'a str, &'a Record> {
    let mut index = BTreeMap::new();
    for record in records {
        if let Some(key) = record.text(key_field) {
            index.entry(key).or_insert(record);
        }
    }
    index
}

/// Result of looking up a list of keys in an indexed dataset.
#[derive(Debug)]
pub struct Lookup<'a, K> {
    /// Every requested key in order, with its match if any.
    pub matched: Vec<(K, Option<&'a Record>)>,
    /// One error per key without a match.
    pub misses: Vec<JoinError>,
}

/// Look up each key in `index`. Misses are reported, not fatal.
pub fn lookup<'a, K: AsRef<str>>(
    keys: impl IntoIterator<Item = K>,
    index: &BTreeMap<&'a str, &'a Record>,
    dataset: &str,
) -> Lookup<'a, K> {
    let mut matched = Vec::new();
    let mut misses = Vec::new();
    for key in keys {
        let hit = index.get(key.as_ref()).copied();
        if hit.is_none() {
            misses.push(JoinError::MissingKey {
                key: key.as_ref().to_string(),
                dataset: dataset.to_string(),
            });
        }
        matched.push((key, hit));
    }
    Lookup { matched, misses }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_record_wins_and_misses_are_reported() {
        let records = vec![
            Record::new().with("Country", "France").with("v", 1i64),
            Record::new().with("Country", "France").with("v", 2i64),
            Record::new().with("Country", "Spain").with("v", 3i64),
        ];
        let index = index_by(&records, "Country");
        let result = lookup(["Spain", "France", "Atlantis"], &index, "control policy");

        assert_eq!(result.matched.len(), 3);
        assert_eq!(result.matched[1].1.and_then(|r| r.number("v")), Some(1.0));
        assert!(result.matched[2].1.is_none());
        assert_eq!(
            result.misses,
            vec![JoinError::MissingKey {
                key: "Atlantis".into(),
                dataset: "control policy".into()
            }]
        );
    }
}
