use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::domain::error::ValidationError;

/// Wire id of the synthetic totals row. Never assigned to a stored row.
pub const TOTALS_ROW_ID: &str = "total-row";
pub const ID_FIELD: &str = "id";
pub const ROW_TOTAL_FIELD: &str = "rowTotal";

// Integers above this lose precision as f64, so they stay floats on the wire.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;
// 2^63; `i64::MAX as f64` rounds up to this, so it is an exclusive bound.
const I64_UPPER_BOUND: f64 = 9_223_372_036_854_775_808.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(pub i64);

impl From<i64> for RowId {
    fn from(value: i64) -> Self {
        RowId(value)
    }
}

impl From<RowId> for i64 {
    fn from(value: RowId) -> Self {
        value.0
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn empty() -> Self {
        CellValue::Text(String::new())
    }

    /// Best-effort numeric reading. Text contributes its leading numeric
    /// prefix (`"12 seats"` reads as 12), anything else reads as `None`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(value) if value.is_nan() => None,
            CellValue::Number(value) => Some(*value),
            CellValue::Text(text) => parse_number_prefix(text),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            CellValue::Text(text) => Value::String(text.clone()),
            CellValue::Number(value) => number_to_json(*value),
        }
    }

    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => CellValue::empty(),
            Value::String(text) => CellValue::Text(text.clone()),
            Value::Number(number) => match number.as_f64() {
                Some(value) => CellValue::Number(value),
                None => CellValue::Text(number.to_string()),
            },
            other => CellValue::Text(other.to_string()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(text) => f.write_str(text),
            CellValue::Number(value) => f.write_str(&format_number(*value)),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Number(value as f64)
    }
}

/// Number as a browser would print it: `Infinity`, `NaN`, plain digits for
/// `1e-6 <= |n| < 1e21`, exponent form (`1e+21`, `1.5e-7`) outside that.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    let magnitude = value.abs();
    if (1e-6..1e21).contains(&magnitude) {
        return format!("{value}");
    }
    let exponential = format!("{value:e}");
    match exponential.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{mantissa}e+{exponent}")
        }
        _ => exponential,
    }
}

pub fn number_to_json(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() <= MAX_SAFE_INTEGER {
        return Value::Number(Number::from(value as i64));
    }
    Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Reads the longest numeric prefix of `text` after leading whitespace.
pub fn parse_number_prefix(text: &str) -> Option<f64> {
    let trimmed = text.trim_start();
    let bytes = trimmed.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }
    if trimmed[end..].starts_with("Infinity") {
        let infinity = if bytes.first() == Some(&b'-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
        return Some(infinity);
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut mantissa_digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        mantissa_digits += frac_end - frac_start;
        if mantissa_digits > 0 {
            end = frac_end;
        }
    }

    if mantissa_digits == 0 {
        return None;
    }

    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && matches!(bytes[exp_end], b'+' | b'-') {
            exp_end += 1;
        }
        let digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > digits_start {
            end = exp_end;
        }
    }

    trimmed[..end].parse::<f64>().ok()
}

/// One stored record. Field order is the row's own key order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Row {
    pub id: RowId,
    fields: Vec<(String, CellValue)>,
}

impl Row {
    pub fn new(id: RowId) -> Self {
        Self {
            id,
            fields: Vec::new(),
        }
    }

    pub fn with_fields<I, K, V>(id: impl Into<RowId>, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<CellValue>,
    {
        let mut row = Row::new(id.into());
        for (name, value) in fields {
            row.set(name.into(), value.into());
        }
        row
    }

    pub fn get(&self, name: &str) -> Option<&CellValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Sets `name`, keeping its position if present and appending otherwise.
    pub fn set(&mut self, name: String, value: CellValue) {
        match self.fields.iter_mut().find(|(field, _)| *field == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn to_json(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(ID_FIELD.to_string(), Value::from(self.id.0));
        for (name, value) in &self.fields {
            map.insert(name.clone(), value.to_json());
        }
        map
    }
}

impl TryFrom<Map<String, Value>> for Row {
    type Error = ValidationError;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        let id = match map.get(ID_FIELD) {
            Some(Value::String(text)) if text == TOTALS_ROW_ID => {
                return Err(ValidationError::ReservedRow)
            }
            Some(Value::Number(number)) => number
                .as_i64()
                .or_else(|| {
                    number
                        .as_f64()
                        .filter(|value| {
                            value.fract() == 0.0
                                && *value >= -I64_UPPER_BOUND
                                && *value < I64_UPPER_BOUND
                        })
                        .map(|value| value as i64)
                })
                .ok_or_else(|| ValidationError::InvalidRowId(number.to_string()))?,
            Some(other) => return Err(ValidationError::InvalidRowId(other.to_string())),
            None => return Err(ValidationError::MissingRowId),
        };

        let fields = map
            .iter()
            .filter(|(name, _)| name.as_str() != ID_FIELD)
            .map(|(name, value)| (name.clone(), CellValue::from_json(value)))
            .collect();

        Ok(Row {
            id: RowId(id),
            fields,
        })
    }
}

impl From<Row> for Map<String, Value> {
    fn from(row: Row) -> Self {
        row.to_json()
    }
}
