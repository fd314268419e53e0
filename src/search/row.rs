use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Category,
    Number,
    Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
}

impl Field {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Field {
            name: name.into(),
            kind,
        }
    }
}

/// Ordered set of named fields every row is aligned with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Schema { fields }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn field(&self, idx: usize) -> Option<&Field> {
        self.fields.get(idx)
    }

    /// Names of all fields of the given kind, in schema order.
    pub fn names_of_kind(&self, kind: FieldKind) -> Vec<String> {
        self.fields
            .iter()
            .filter(|f| f.kind == kind)
            .map(|f| f.name.clone())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    /// Integer cells keep every digit, `i128` holds both `i64` and `u64`.
    Integer(i128),
    Number(f64),
    Timestamp(NaiveDateTime),
}

impl Value {
    /// Canonical text form, used for equality filters, keyword matching and display.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Value::Text(s) => Cow::Borrowed(s.as_str()),
            Value::Integer(i) => Cow::Owned(i.to_string()),
            Value::Number(n) => Cow::Owned(n.to_string()),
            Value::Timestamp(ts) => {
                if ts.time() == NaiveTime::MIN {
                    Cow::Owned(ts.format("%Y-%m-%d").to_string())
                } else {
                    Cow::Owned(ts.format("%Y-%m-%d %H:%M:%S").to_string())
                }
            }
        }
    }

    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    /// Native ordering for values of the same kind, text form otherwise.
    pub fn native_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Number(a), Value::Number(b)) => a.total_cmp(b),
            (Value::Integer(a), Value::Number(b)) => cmp_integer_number(*a, *b),
            (Value::Number(a), Value::Integer(b)) => cmp_integer_number(*b, *a).reverse(),
            (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),
            (a, b) => a.as_text().cmp(&b.as_text()),
        }
    }

    /// Parse a raw cell into a value of the given kind. Unparseable input is missing.
    pub fn parse(raw: &str, kind: FieldKind) -> Option<Value> {
        match kind {
            FieldKind::Text | FieldKind::Category => Some(Value::Text(raw.to_string())),
            FieldKind::Number => {
                let raw = raw.trim();
                match raw.parse::<i128>() {
                    Ok(i) => Some(Value::Integer(i)),
                    Err(_) => raw.parse::<f64>().ok().map(Value::Number),
                }
            }
            FieldKind::Timestamp => parse_timestamp(raw).map(Value::Timestamp),
        }
    }
}

// When the float rounding of `i` equals `n`, `n` is integral and converts back
// without loss, so the tie is settled on integers. NaN sorts last.
fn cmp_integer_number(i: i128, n: f64) -> Ordering {
    match (i as f64).partial_cmp(&n) {
        Some(Ordering::Equal) => i.cmp(&(n as i128)),
        Some(ord) => ord,
        None => Ordering::Less,
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
];

/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS[.f]`, the `T` separated variant and RFC 3339.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date.and_time(NaiveTime::MIN));
    }
    if let Some(ts) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    {
        return Some(ts);
    }
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%z"))
        .ok()
        .map(|dt| dt.naive_utc())
}

/// One record. Cells are aligned with the [`Schema`] the row was loaded with.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: Vec<Option<Value>>,
}

impl Row {
    pub fn new(cells: Vec<Option<Value>>) -> Self {
        Row { cells }
    }

    pub fn get(&self, idx: usize) -> Option<&Value> {
        self.cells.get(idx).and_then(Option::as_ref)
    }

    pub fn cells(&self) -> &[Option<Value>] {
        &self.cells
    }

    /// Text form of a cell, empty for missing values.
    pub fn text(&self, idx: usize) -> Cow<'_, str> {
        self.get(idx)
            .map(Value::as_text)
            .unwrap_or(Cow::Borrowed(""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_supported_timestamp_forms() {
        let midnight = date(2025, 1, 10).and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2025-01-10"), Some(midnight));
        assert_eq!(
            parse_timestamp("2025-01-10 13:45:00"),
            Some(date(2025, 1, 10).and_hms_opt(13, 45, 0).unwrap())
        );
        assert_eq!(
            parse_timestamp("2025-01-10T13:45:00.250"),
            Some(date(2025, 1, 10).and_hms_milli_opt(13, 45, 0, 250).unwrap())
        );
        assert_eq!(
            parse_timestamp("2025-01-10T13:45:00+02:00"),
            Some(date(2025, 1, 10).and_hms_opt(11, 45, 0).unwrap())
        );
        assert_eq!(parse_timestamp("10/01/2025"), None);
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn text_form_of_values() {
        assert_eq!(Value::Number(3.0).as_text(), "3");
        assert_eq!(Value::Number(2.5).as_text(), "2.5");
        let ts = date(2025, 2, 1).and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(Value::Timestamp(ts).as_text(), "2025-02-01");
        let ts = date(2025, 2, 1).and_hms_opt(8, 30, 5).unwrap();
        assert_eq!(Value::Timestamp(ts).as_text(), "2025-02-01 08:30:05");
    }

    #[test]
    fn unparseable_cells_are_missing() {
        assert_eq!(Value::parse("n/a", FieldKind::Number), None);
        assert_eq!(Value::parse("someday", FieldKind::Timestamp), None);
        assert_eq!(
            Value::parse(" 42 ", FieldKind::Number),
            Some(Value::Integer(42))
        );
        assert_eq!(
            Value::parse("42.5", FieldKind::Number),
            Some(Value::Number(42.5))
        );
    }

    #[test]
    fn large_integers_keep_every_digit() {
        let a = Value::parse("9007199254740993", FieldKind::Number).unwrap();
        let b = Value::parse("9007199254740992", FieldKind::Number).unwrap();
        assert_eq!(a.as_text(), "9007199254740993");
        assert_eq!(b.as_text(), "9007199254740992");
        assert_eq!(a.native_cmp(&b), Ordering::Greater);

        let max = Value::parse("18446744073709551615", FieldKind::Number).unwrap();
        assert_eq!(max.as_text(), "18446744073709551615");
    }

    #[test]
    fn integers_and_floats_order_numerically() {
        assert_eq!(Value::Integer(3).native_cmp(&Value::Number(2.5)), Ordering::Greater);
        assert_eq!(Value::Number(2.5).native_cmp(&Value::Integer(3)), Ordering::Less);
        assert_eq!(Value::Integer(10).native_cmp(&Value::Number(10.0)), Ordering::Equal);
        // 2^53 + 1 rounds to 2^53 as a float but is still larger
        assert_eq!(
            Value::Integer(9007199254740993).native_cmp(&Value::Number(9007199254740992.0)),
            Ordering::Greater
        );
        assert_eq!(Value::Integer(1).native_cmp(&Value::Number(f64::NAN)), Ordering::Less);
    }

    #[test]
    fn missing_cells_read_as_empty_text() {
        let row = Row::new(vec![Some(Value::Text("a".into())), None]);
        assert_eq!(row.text(0), "a");
        assert_eq!(row.text(1), "");
        assert_eq!(row.text(7), "");
    }
}
