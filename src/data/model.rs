use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Value – a single typed cell
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value. Missing CSV cells are carried as
/// [`Value::Null`] rather than dropped, so every aggregation has to decide
/// what to do with them.
///
/// Values are placed in `BTreeSet`s (predicate sets) so
/// `Value` must be `Ord`. An integer and an equal float stay distinct
/// here; predicates compare numbers by value.
#[derive(Debug, Clone)]
pub enum Value {
    Text(String),
    Integer(i64),
    Float(f64),
    Null,
}

// -- Manual Eq/Ord so we can put Value in BTreeSet --

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use std::cmp::Ordering;
        fn rank(v: &Value) -> u8 {
            match v {
                Value::Null => 0,
                Value::Integer(_) | Value::Float(_) => 1,
                Value::Text(_) => 2,
            }
        }
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            // Mixed numerics compare numerically; ties keep integers first.
            (Value::Integer(a), Value::Float(b)) => {
                (*a as f64).total_cmp(b).then(Ordering::Less)
            }
            (Value::Float(a), Value::Integer(b)) => {
                a.total_cmp(&(*b as f64)).then(Ordering::Greater)
            }
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            _ => rank(self).cmp(&rank(other)),
        }
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Text(s) => s.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Null => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Null => write!(f, "<null>"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl Value {
    /// Numeric view of the value. Text is never parsed here.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Interpret the value as a whole number (years, ids). Accepts integral
    /// floats and numeric text such as `"2008"`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Float(v) if v.fract() == 0.0 && v.is_finite() => Some(*v as i64),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

// ---------------------------------------------------------------------------
// Record – one row
// ---------------------------------------------------------------------------

/// One tabular row: column name → value. Records are never mutated once
/// built; every pipeline stage produces fresh ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

static NULL: Value = Value::Null;

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field insertion, used while a record is being assembled.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(column.into(), value.into());
        self
    }

    /// Raw lookup; `None` when the column is absent altogether.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(column)
    }

    /// Lookup that treats an absent column as null.
    pub fn value(&self, column: &str) -> &Value {
        self.fields.get(column).unwrap_or(&NULL)
    }

    pub fn text(&self, column: &str) -> Option<&str> {
        self.value(column).as_str()
    }

    pub fn number(&self, column: &str) -> Option<f64> {
        self.value(column).as_f64()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Record {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Table – a loaded dataset
// ---------------------------------------------------------------------------

/// A named, ordered sequence of records as produced by the loader.
#[derive(Debug, Clone)]
pub struct Table {
    /// Dataset name used in log lines and error messages.
    pub name: String,
    /// Column names in declaration (or header) order.
    pub columns: Vec<String>,
    /// Rows in file order.
    pub records: Vec<Record>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<String>, records: Vec<Record>) -> Self {
        Table {
            name: name.into(),
            columns,
            records,
        }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    #[test]
    fn numeric_values_order_numerically_across_variants() {
        let mut set = BTreeSet::new();
        set.insert(Value::Float(2.5));
        set.insert(Value::Integer(3));
        set.insert(Value::Integer(1));
        set.insert(Value::Null);
        set.insert(Value::from("a"));
        let ordered: Vec<_> = set.into_iter().collect();
        assert_eq!(
            ordered,
            vec![
                Value::Null,
                Value::Integer(1),
                Value::Float(2.5),
                Value::Integer(3),
                Value::from("a"),
            ]
        );
    }

    #[test]
    fn as_i64_accepts_year_spellings() {
        assert_eq!(Value::Integer(2008).as_i64(), Some(2008));
        assert_eq!(Value::Float(2010.0).as_i64(), Some(2010));
        assert_eq!(Value::from(" 2016 ").as_i64(), Some(2016));
        assert_eq!(Value::Float(2010.5).as_i64(), None);
        assert_eq!(Value::Null.as_i64(), None);
    }

    #[test]
    fn absent_column_reads_as_null() {
        let r = Record::new().with("country", "France");
        assert!(r.get("year").is_none());
        assert!(r.value("year").is_null());
        assert_eq!(r.text("country"), Some("France"));
    }
}
