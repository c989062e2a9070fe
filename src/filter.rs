//! Filter definitions and the predicate compiler.
//!
//! A [`Filter`] is the user-editable form (operator code and raw operand
//! strings). [`compile`] resolves each active filter against the schema and
//! turns it into a per-field test; the tests are ANDed into a [`Predicate`].

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::catalog::{
    ArrayOperator, BoolOperator, DateOperator, IntOperator, Operator, StringOperator,
};
use crate::schema::{Record, Schema};
use crate::value::{as_number, coerce_string, is_nil};

/// A filter as held in query state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub id: String,
    pub name: String,
    pub operator: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value1: Option<String>,
    pub active: bool,
}

impl Filter {
    /// New active `eq` filter on `name` with an empty operand.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            operator: "eq".to_string(),
            value: String::new(),
            value1: None,
            active: true,
        }
    }

    /// Parse `FIELD:OPERATOR[:VALUE[:VALUE1]]` into an update for a filter on
    /// FIELD. Only `btw` splits its operand into a pair, so regex and string
    /// operands may contain `:`.
    pub fn parse_spec(spec: &str) -> Result<(String, FilterUpdate)> {
        let mut parts = spec.splitn(3, ':');
        let name = parts.next().unwrap_or_default().trim();
        let operator = parts.next().map(str::trim).unwrap_or_default();
        if name.is_empty() || operator.is_empty() {
            return Err(eyre!(
                "Invalid filter '{}'. Expected FIELD:OPERATOR[:VALUE[:VALUE1]]",
                spec
            ));
        }
        let rest = parts.next().unwrap_or_default();

        let (value, value1) = if operator == "btw" {
            match rest.split_once(':') {
                Some((a, b)) => (a.to_string(), Some(b.to_string())),
                None => (rest.to_string(), None),
            }
        } else {
            (rest.to_string(), None)
        };

        Ok((
            name.to_string(),
            FilterUpdate {
                operator: Some(operator.to_string()),
                value: Some(value),
                value1,
                ..FilterUpdate::default()
            },
        ))
    }
}

/// Partial update merged into an existing filter; `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterUpdate {
    pub name: Option<String>,
    pub operator: Option<String>,
    pub value: Option<String>,
    pub value1: Option<String>,
    pub active: Option<bool>,
}

impl FilterUpdate {
    pub fn active(active: bool) -> Self {
        Self {
            active: Some(active),
            ..Self::default()
        }
    }

    pub fn value(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn apply_to(self, filter: &mut Filter) {
        if let Some(name) = self.name {
            filter.name = name;
        }
        if let Some(operator) = self.operator {
            filter.operator = operator;
        }
        if let Some(value) = self.value {
            filter.value = value;
        }
        if let Some(value1) = self.value1 {
            filter.value1 = Some(value1);
        }
        if let Some(active) = self.active {
            filter.active = active;
        }
    }
}

type FieldTest = Box<dyn Fn(Option<&Value>) -> bool>;

/// Conjunction of per-field tests. At most one test per field: compiling a
/// later filter on the same field replaces the earlier test.
#[derive(Default)]
pub struct Predicate {
    tests: Vec<(String, FieldTest)>,
}

impl Predicate {
    fn set(&mut self, field: &str, test: FieldTest) {
        match self.tests.iter_mut().find(|(name, _)| name == field) {
            Some(entry) => entry.1 = test,
            None => self.tests.push((field.to_string(), test)),
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.tests.iter().all(|(field, test)| test(record.get(field)))
    }

    /// Fields that carry a constraint, in first-constrained order.
    pub fn constrained_fields(&self) -> Vec<&str> {
        self.tests.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    pub fn filter(&self, records: &[Record]) -> Vec<Record> {
        records
            .iter()
            .filter(|record| self.matches(record))
            .cloned()
            .collect()
    }
}

impl std::fmt::Debug for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Predicate")
            .field("fields", &self.constrained_fields())
            .finish()
    }
}

/// Compile the active filters into one record predicate.
///
/// Inactive filters, filters on fields missing from the schema, operators
/// outside the field type's set and unusable operands all contribute no
/// constraint. The only error is a `rgm` pattern that does not compile.
pub fn compile(schema: &Schema, filters: &[Filter]) -> Result<Predicate> {
    let mut predicate = Predicate::default();

    for filter in filters.iter().filter(|f| f.active) {
        let Some(field_type) = schema.get(&filter.name) else {
            debug!(field = %filter.name, "filter on field missing from schema skipped");
            continue;
        };
        let Some(operator) = Operator::resolve(field_type, &filter.operator) else {
            debug!(
                field = %filter.name,
                operator = %filter.operator,
                field_type = %field_type,
                "operator not valid for field type, filter skipped"
            );
            continue;
        };

        let test = match operator {
            Operator::String(op) => string_test(op, filter)?,
            Operator::Int(op) => int_test(op, filter),
            Operator::Bool(op) => Some(bool_test(op)),
            Operator::Date(op) => date_test(op, filter),
            Operator::Array(op) => array_test(op, filter),
        };

        match test {
            Some(test) => predicate.set(&filter.name, test),
            None => debug!(
                field = %filter.name,
                operator = %filter.operator,
                "operand missing or unusable, filter skipped"
            ),
        }
    }

    Ok(predicate)
}

/// Filter `records` with the active filters, preserving order.
pub fn apply(schema: &Schema, filters: &[Filter], records: &[Record]) -> Result<Vec<Record>> {
    Ok(compile(schema, filters)?.filter(records))
}

fn null_test(negate: bool) -> FieldTest {
    Box::new(move |v| is_nil(v) != negate)
}

fn one_of(operand: &str) -> impl Fn(Option<&Value>) -> bool {
    let options: Vec<String> = operand.split(',').map(str::to_string).collect();
    move |v| {
        let needle = coerce_string(v);
        options.iter().any(|o| *o == needle)
    }
}

fn non_empty(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}

fn parse_number(operand: &str) -> Option<f64> {
    operand.trim().parse::<f64>().ok().filter(|n| !n.is_nan())
}

/// Compile a `rgm` operand. `/body/flags` uses the body as the pattern with
/// `i` and `m` flags honoured (`g` has no meaning for a test); any other
/// operand is the pattern itself.
pub fn build_regex(operand: &str) -> Result<Regex> {
    let (pattern, flags) = match operand.rfind('/') {
        Some(end)
            if end > 0
                && operand.starts_with('/')
                && operand[end + 1..].chars().all(|c| matches!(c, 'g' | 'i' | 'm')) =>
        {
            (&operand[1..end], &operand[end + 1..])
        }
        _ => (operand, ""),
    };

    RegexBuilder::new(pattern)
        .case_insensitive(flags.contains('i'))
        .multi_line(flags.contains('m'))
        .build()
        .map_err(|e| eyre!("Invalid regular expression '{}': {}", operand, e))
}

fn string_test(op: StringOperator, filter: &Filter) -> Result<Option<FieldTest>> {
    let test: FieldTest = match op {
        StringOperator::Null => return Ok(Some(null_test(false))),
        StringOperator::NotNull => return Ok(Some(null_test(true))),
        _ => {
            let Some(operand) = non_empty(&filter.value) else {
                return Ok(None);
            };
            match op {
                StringOperator::Eq => {
                    let expected = operand.to_string();
                    Box::new(move |v| v.and_then(Value::as_str) == Some(expected.as_str()))
                }
                StringOperator::Neq => {
                    let expected = operand.to_string();
                    Box::new(move |v| v.and_then(Value::as_str) != Some(expected.as_str()))
                }
                StringOperator::OneOf => Box::new(one_of(operand)),
                StringOperator::NotOneOf => {
                    let test = one_of(operand);
                    Box::new(move |v| !test(v))
                }
                StringOperator::Matches => {
                    let regex = build_regex(operand)?;
                    Box::new(move |v| v.and_then(Value::as_str).is_some_and(|s| regex.is_match(s)))
                }
                StringOperator::Null | StringOperator::NotNull => unreachable!(),
            }
        }
    };
    Ok(Some(test))
}

fn int_test(op: IntOperator, filter: &Filter) -> Option<FieldTest> {
    if let IntOperator::Null | IntOperator::NotNull = op {
        return Some(null_test(op == IntOperator::NotNull));
    }
    let operand = non_empty(&filter.value)?;

    let test: FieldTest = match op {
        IntOperator::OneOf => Box::new(one_of(operand)),
        IntOperator::NotOneOf => {
            let test = one_of(operand);
            Box::new(move |v| !test(v))
        }
        IntOperator::Between => {
            let start = parse_number(operand)?;
            let end = parse_number(non_empty(filter.value1.as_deref()?)?)?;
            Box::new(move |v| as_number(v).is_some_and(|n| n > start && n < end))
        }
        _ => {
            let target = parse_number(operand)?;
            let compare: fn(f64, f64) -> bool = match op {
                IntOperator::Eq => |n: f64, t: f64| n == t,
                IntOperator::Gt => |n: f64, t: f64| n > t,
                IntOperator::Gte => |n: f64, t: f64| n >= t,
                IntOperator::Lt => |n: f64, t: f64| n < t,
                IntOperator::Lte => |n: f64, t: f64| n <= t,
                IntOperator::Neq => return Some(Box::new(move |v| as_number(v) != Some(target))),
                _ => unreachable!(),
            };
            Box::new(move |v| as_number(v).is_some_and(|n| compare(n, target)))
        }
    };
    Some(test)
}

fn bool_test(op: BoolOperator) -> FieldTest {
    match op {
        BoolOperator::Null => null_test(false),
        BoolOperator::NotNull => null_test(true),
        BoolOperator::True => Box::new(|v| v.and_then(Value::as_bool) == Some(true)),
        BoolOperator::False => Box::new(|v| v.and_then(Value::as_bool) == Some(false)),
    }
}

/// Parse an ISO-ish date value from a record: RFC3339, `YYYY-MM-DDTHH:MM:SS`,
/// `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DD` or `YYYYMMDD`. Offsets are dropped in
/// favour of the local wall-clock time written in the value.
pub(crate) fn parse_date_value(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }
    for format in ["%Y-%m-%d", "%Y%m%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, format) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Validate an 8-digit `YYYYMMDD` operand.
pub fn parse_compact_date(operand: &str) -> Option<NaiveDate> {
    if operand.len() != 8 || !operand.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(operand, "%Y%m%d").ok()
}

fn record_date(v: Option<&Value>) -> Option<NaiveDateTime> {
    v.and_then(Value::as_str).and_then(parse_date_value)
}

fn date_test(op: DateOperator, filter: &Filter) -> Option<FieldTest> {
    if let DateOperator::Null | DateOperator::NotNull = op {
        return Some(null_test(op == DateOperator::NotNull));
    }
    let operand = non_empty(&filter.value)?;

    let test: FieldTest = match op {
        DateOperator::Eq => {
            let expected = operand.to_string();
            Box::new(move |v| v.and_then(Value::as_str) == Some(expected.as_str()))
        }
        DateOperator::Neq => {
            let expected = operand.to_string();
            Box::new(move |v| v.and_then(Value::as_str) != Some(expected.as_str()))
        }
        DateOperator::SameDay => {
            let day = parse_compact_date(operand)?;
            Box::new(move |v| record_date(v).is_some_and(|d| d.date() == day))
        }
        DateOperator::Before => {
            let start = parse_compact_date(operand)?.and_hms_opt(0, 0, 0)?;
            Box::new(move |v| record_date(v).is_some_and(|d| d < start))
        }
        DateOperator::After => {
            let start = parse_compact_date(operand)?.and_hms_opt(0, 0, 0)?;
            Box::new(move |v| record_date(v).is_some_and(|d| d > start))
        }
        DateOperator::Between => {
            let start = parse_compact_date(operand)?.and_hms_opt(0, 0, 0)?;
            let end = parse_compact_date(filter.value1.as_deref()?)?.and_hms_opt(0, 0, 0)?;
            Box::new(move |v| record_date(v).is_some_and(|d| d > start && d < end))
        }
        DateOperator::Null | DateOperator::NotNull => unreachable!(),
    };
    Some(test)
}

fn array_len(v: Option<&Value>) -> Option<usize> {
    v.and_then(Value::as_array).map(Vec::len)
}

fn array_test(op: ArrayOperator, filter: &Filter) -> Option<FieldTest> {
    let operand = non_empty(&filter.value)?;

    let test: FieldTest = match op {
        ArrayOperator::ContainsString => {
            let needle = operand.to_string();
            Box::new(move |v| {
                v.and_then(Value::as_array)
                    .is_some_and(|items| items.iter().any(|i| i.as_str() == Some(needle.as_str())))
            })
        }
        ArrayOperator::ContainsNumber => {
            let needle = parse_number(operand)?;
            Box::new(move |v| {
                v.and_then(Value::as_array)
                    .is_some_and(|items| items.iter().any(|i| i.as_f64() == Some(needle)))
            })
        }
        _ => {
            let target: usize = operand.trim().parse().ok()?;
            let compare: fn(usize, usize) -> bool = match op {
                ArrayOperator::HasLength => |len: usize, t: usize| len == t,
                ArrayOperator::NotHasLength => |len: usize, t: usize| len != t,
                ArrayOperator::LengthGt => |len: usize, t: usize| len > t,
                ArrayOperator::LengthGte => |len: usize, t: usize| len >= t,
                ArrayOperator::LengthLt => |len: usize, t: usize| len < t,
                ArrayOperator::LengthLte => |len: usize, t: usize| len <= t,
                ArrayOperator::ContainsString | ArrayOperator::ContainsNumber => unreachable!(),
            };
            Box::new(move |v| array_len(v).is_some_and(|len| compare(len, target)))
        }
    };
    Some(test)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldType;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().unwrap().clone()
    }

    fn filter(name: &str, operator: &str, value: &str) -> Filter {
        Filter {
            id: format!("{name}-{operator}"),
            name: name.to_string(),
            operator: operator.to_string(),
            value: value.to_string(),
            value1: None,
            active: true,
        }
    }

    fn passes(schema: &Schema, f: Filter, r: Value) -> bool {
        compile(schema, &[f]).unwrap().matches(&record(r))
    }

    #[test]
    fn test_new_filter_defaults() {
        let f = Filter::new("Genre");
        assert_eq!(f.operator, "eq");
        assert_eq!(f.value, "");
        assert!(f.active);
        assert!(!f.id.is_empty());
        assert_ne!(Filter::new("Genre").id, f.id);
    }

    #[test]
    fn test_parse_spec_splits_between_pair() {
        let (name, update) = Filter::parse_spec("Year:btw:20000101:20101231").unwrap();
        assert_eq!(name, "Year");
        assert_eq!(update.operator.as_deref(), Some("btw"));
        assert_eq!(update.value.as_deref(), Some("20000101"));
        assert_eq!(update.value1.as_deref(), Some("20101231"));

        let (_, update) = Filter::parse_spec("Title:rgm:^a:b$").unwrap();
        assert_eq!(update.value.as_deref(), Some("^a:b$"));
        assert_eq!(update.value1, None);

        let (_, update) = Filter::parse_spec("Title:nl").unwrap();
        assert_eq!(update.value.as_deref(), Some(""));

        assert!(Filter::parse_spec("Title").is_err());
        assert!(Filter::parse_spec(":eq:x").is_err());
    }

    #[test]
    fn test_update_merges_fields() {
        let mut f = Filter::new("a");
        FilterUpdate {
            operator: Some("neq".into()),
            value: Some("x".into()),
            ..Default::default()
        }
        .apply_to(&mut f);
        assert_eq!(f.operator, "neq");
        assert_eq!(f.value, "x");
        assert!(f.active);
        FilterUpdate::active(false).apply_to(&mut f);
        assert!(!f.active);
    }

    #[test]
    fn test_string_equality_is_exact() {
        let schema = Schema::new().with_field("Genre", FieldType::String);
        assert!(passes(&schema, filter("Genre", "eq", "rock"), json!({"Genre": "rock"})));
        assert!(!passes(&schema, filter("Genre", "eq", "rock"), json!({"Genre": "Rock"})));
        assert!(!passes(&schema, filter("Genre", "neq", "rock"), json!({"Genre": "rock"})));
        assert!(passes(&schema, filter("Genre", "neq", "rock"), json!({})));
    }

    #[test]
    fn test_empty_operand_is_no_constraint() {
        let schema = Schema::new().with_field("Genre", FieldType::String);
        let predicate = compile(&schema, &[filter("Genre", "eq", "")]).unwrap();
        assert!(predicate.is_empty());
        assert!(predicate.matches(&record(json!({"Genre": "jazz"}))));
    }

    #[test]
    fn test_null_checks_ignore_operand() {
        let schema = Schema::new().with_field("Genre", FieldType::String);
        assert!(passes(&schema, filter("Genre", "nl", ""), json!({})));
        assert!(passes(&schema, filter("Genre", "nl", "zzz"), json!({"Genre": null})));
        assert!(!passes(&schema, filter("Genre", "nl", ""), json!({"Genre": "x"})));
        assert!(passes(&schema, filter("Genre", "nnl", ""), json!({"Genre": "x"})));
    }

    #[test]
    fn test_one_of_coerces_record_value() {
        let schema = Schema::new()
            .with_field("Genre", FieldType::String)
            .with_field("Track", FieldType::Int);
        let f = filter("Track", "iof", "1,2,3");
        assert!(passes(&schema, f.clone(), json!({"Track": 2})));
        assert!(!passes(&schema, f, json!({"Track": 4})));
        assert!(passes(&schema, filter("Genre", "iof", "a,,b"), json!({})));
        assert!(passes(&schema, filter("Genre", "inof", "a,b"), json!({"Genre": "c"})));
        assert!(!passes(&schema, filter("Genre", "inof", "a,b"), json!({"Genre": "b"})));
    }

    #[test]
    fn test_regex_with_and_without_flags() {
        let schema = Schema::new().with_field("Title", FieldType::String);
        assert!(passes(&schema, filter("Title", "rgm", "^Hel+o"), json!({"Title": "Hello"})));
        assert!(!passes(&schema, filter("Title", "rgm", "^hello"), json!({"Title": "Hello"})));
        assert!(passes(&schema, filter("Title", "rgm", "/^hello/i"), json!({"Title": "Hello"})));
        assert!(passes(&schema, filter("Title", "rgm", "/a/b/"), json!({"Title": "xa/by"})));
        assert!(!passes(&schema, filter("Title", "rgm", "x"), json!({"Title": 5})));
    }

    #[test]
    fn test_invalid_regex_is_an_error() {
        let schema = Schema::new().with_field("Title", FieldType::String);
        let err = compile(&schema, &[filter("Title", "rgm", "(unclosed")]).unwrap_err();
        assert!(err.to_string().contains("Invalid regular expression"));
    }

    #[test]
    fn test_numeric_comparisons() {
        let schema = Schema::new().with_field("Length", FieldType::Int);
        let r = json!({"Length": 200});
        assert!(passes(&schema, filter("Length", "eq", "200.0"), r.clone()));
        assert!(passes(&schema, filter("Length", "gt", "199.5"), r.clone()));
        assert!(!passes(&schema, filter("Length", "gt", "200"), r.clone()));
        assert!(passes(&schema, filter("Length", "gte", "200"), r.clone()));
        assert!(passes(&schema, filter("Length", "lt", "201"), r.clone()));
        assert!(passes(&schema, filter("Length", "lte", "200"), r.clone()));
        assert!(passes(&schema, filter("Length", "neq", "100"), r.clone()));
        assert!(!passes(&schema, filter("Length", "gt", "1"), json!({"Length": "300"})));
    }

    #[test]
    fn test_non_numeric_operand_is_no_constraint() {
        let schema = Schema::new().with_field("Length", FieldType::Int);
        let predicate = compile(&schema, &[filter("Length", "gt", "abc")]).unwrap();
        assert!(predicate.is_empty());
    }

    #[test]
    fn test_int_between_is_exclusive_and_needs_both_operands() {
        let schema = Schema::new().with_field("Length", FieldType::Int);
        let mut f = filter("Length", "btw", "10");
        assert!(compile(&schema, &[f.clone()]).unwrap().is_empty());
        f.value1 = Some("20".to_string());
        assert!(passes(&schema, f.clone(), json!({"Length": 15})));
        assert!(!passes(&schema, f.clone(), json!({"Length": 10})));
        assert!(!passes(&schema, f, json!({"Length": 20})));
    }

    #[test]
    fn test_bool_operators() {
        let schema = Schema::new().with_field("live", FieldType::Bool);
        assert!(passes(&schema, filter("live", "true", ""), json!({"live": true})));
        assert!(!passes(&schema, filter("live", "true", ""), json!({"live": "true"})));
        assert!(passes(&schema, filter("live", "false", ""), json!({"live": false})));
        assert!(passes(&schema, filter("live", "nnl", ""), json!({"live": false})));
    }

    #[test]
    fn test_date_equality_is_raw_string() {
        let schema = Schema::new().with_field("Year", FieldType::Date);
        assert!(passes(&schema, filter("Year", "eq", "2001-05-06"), json!({"Year": "2001-05-06"})));
        assert!(!passes(&schema, filter("Year", "eq", "20010506"), json!({"Year": "2001-05-06"})));
    }

    #[test]
    fn test_date_calendar_operators() {
        let schema = Schema::new().with_field("Year", FieldType::Date);
        let r = json!({"Year": "2001-05-06T13:00:00"});
        assert!(passes(&schema, filter("Year", "sd", "20010506"), r.clone()));
        assert!(!passes(&schema, filter("Year", "sd", "20010507"), r.clone()));
        assert!(passes(&schema, filter("Year", "be", "20010507"), r.clone()));
        assert!(passes(&schema, filter("Year", "af", "20010506"), r.clone()));
        assert!(!passes(&schema, filter("Year", "af", "20010507"), r.clone()));

        let mut btw = filter("Year", "btw", "20010101");
        btw.value1 = Some("20011231".to_string());
        assert!(passes(&schema, btw, r));
    }

    #[test]
    fn test_date_boundaries_are_exclusive() {
        let schema = Schema::new().with_field("Year", FieldType::Date);
        let midnight = json!({"Year": "2001-05-06"});
        assert!(!passes(&schema, filter("Year", "be", "20010506"), midnight.clone()));
        assert!(!passes(&schema, filter("Year", "af", "20010506"), midnight.clone()));
        assert!(passes(&schema, filter("Year", "sd", "20010506"), midnight.clone()));

        let between = |start: &str, end: &str| {
            let mut btw = filter("Year", "btw", start);
            btw.value1 = Some(end.to_string());
            btw
        };
        assert!(!passes(&schema, between("20010506", "20010510"), midnight.clone()));
        assert!(!passes(&schema, between("20010501", "20010506"), midnight.clone()));
        assert!(passes(&schema, between("20010505", "20010507"), midnight));

        let later = json!({"Year": "2001-05-06T00:00:01"});
        assert!(passes(&schema, between("20010506", "20010510"), later));
    }

    #[test]
    fn test_invalid_compact_date_is_no_constraint() {
        let schema = Schema::new().with_field("Year", FieldType::Date);
        for operand in ["2001", "2001-05-06", "20011332", "2001050x"] {
            let predicate = compile(&schema, &[filter("Year", "be", operand)]).unwrap();
            assert!(predicate.is_empty(), "{operand} should not constrain");
        }
        let mut btw = filter("Year", "btw", "20010101");
        btw.value1 = Some("2001".to_string());
        assert!(compile(&schema, &[btw]).unwrap().is_empty());
    }

    #[test]
    fn test_array_operators() {
        let schema = Schema::new().with_field("tags", FieldType::Array);
        let r = json!({"tags": ["a", 2, "c"]});
        assert!(passes(&schema, filter("tags", "cos", "a"), r.clone()));
        assert!(!passes(&schema, filter("tags", "cos", "2"), r.clone()));
        assert!(passes(&schema, filter("tags", "con", "2"), r.clone()));
        assert!(passes(&schema, filter("tags", "hl", "3"), r.clone()));
        assert!(passes(&schema, filter("tags", "dhl", "2"), r.clone()));
        assert!(passes(&schema, filter("tags", "hlgt", "2"), r.clone()));
        assert!(passes(&schema, filter("tags", "hlgte", "3"), r.clone()));
        assert!(passes(&schema, filter("tags", "hllt", "4"), r.clone()));
        assert!(passes(&schema, filter("tags", "hllte", "3"), r.clone()));
        assert!(!passes(&schema, filter("tags", "hl", "3"), json!({"tags": "abc"})));
    }

    #[test]
    fn test_inactive_unknown_and_foreign_filters_are_ignored() {
        let schema = Schema::new().with_field("Genre", FieldType::String);
        let mut inactive = filter("Genre", "eq", "rock");
        inactive.active = false;
        let unknown = filter("Missing", "eq", "x");
        let foreign = filter("Genre", "gt", "1");
        let predicate = compile(&schema, &[inactive, unknown, foreign]).unwrap();
        assert!(predicate.is_empty());
    }

    #[test]
    fn test_last_filter_on_a_field_wins() {
        let schema = Schema::new().with_field("Genre", FieldType::String);
        let filters = [filter("Genre", "eq", "rock"), filter("Genre", "eq", "jazz")];
        let predicate = compile(&schema, &filters).unwrap();
        assert_eq!(predicate.constrained_fields(), vec!["Genre"]);
        assert!(predicate.matches(&record(json!({"Genre": "jazz"}))));
        assert!(!predicate.matches(&record(json!({"Genre": "rock"}))));

        // A later filter with no usable operand leaves the earlier one in place
        let filters = [filter("Genre", "eq", "rock"), filter("Genre", "eq", "")];
        let predicate = compile(&schema, &filters).unwrap();
        assert!(predicate.matches(&record(json!({"Genre": "rock"}))));
        assert!(!predicate.matches(&record(json!({"Genre": "jazz"}))));
    }

    #[test]
    fn test_filters_on_different_fields_are_anded() {
        let schema = Schema::new()
            .with_field("Genre", FieldType::String)
            .with_field("Length", FieldType::Int);
        let filters = [filter("Genre", "eq", "rock"), filter("Length", "gt", "100")];
        let records = vec![
            record(json!({"Genre": "rock", "Length": 50})),
            record(json!({"Genre": "rock", "Length": 150})),
            record(json!({"Genre": "jazz", "Length": 150})),
        ];
        let result = apply(&schema, &filters, &records).unwrap();
        assert_eq!(result, vec![records[1].clone()]);
    }
}
