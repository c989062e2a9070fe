use serde::{Deserialize, Serialize};

use crate::schema::Record;
use crate::value::compare;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sorter {
    pub field: String,
    pub direction: SortDirection,
}

impl Sorter {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    /// Parse `FIELD[:asc|desc]`; the direction defaults to ascending.
    pub fn parse_spec(spec: &str) -> Option<Self> {
        let (field, direction) = match spec.rsplit_once(':') {
            Some((field, dir)) => (field, SortDirection::parse(dir)?),
            None => (spec, SortDirection::Asc),
        };
        let field = field.trim();
        (!field.is_empty()).then(|| Self::new(field, direction))
    }
}

/// Stable sort by one field. Descending reverses the ascending result, so
/// records with equal keys come out in reverse input order.
pub fn sort(field: &str, direction: SortDirection, records: &[Record]) -> Vec<Record> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| compare(a.get(field), b.get(field)));
    if direction == SortDirection::Desc {
        sorted.reverse();
    }
    sorted
}

/// Apply several sorters, the first being the primary key. Each pass is
/// stable, so sorters run from last to first.
pub fn sort_all(sorters: &[Sorter], records: &[Record]) -> Vec<Record> {
    sorters
        .iter()
        .rev()
        .fold(records.to_vec(), |acc, sorter| {
            sort(&sorter.field, sorter.direction, &acc)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn records(value: Value) -> Vec<Record> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().unwrap().clone())
            .collect()
    }

    #[test]
    fn test_sort_ascending_and_descending() {
        let data = records(json!([{"n": 3}, {"n": 1}, {"n": 2}]));
        let asc = sort("n", SortDirection::Asc, &data);
        assert_eq!(asc, records(json!([{"n": 1}, {"n": 2}, {"n": 3}])));
        let mut desc = sort("n", SortDirection::Desc, &data);
        desc.reverse();
        assert_eq!(desc, asc);
    }

    #[test]
    fn test_desc_reverses_ties() {
        let data = records(json!([{"n": 1, "id": "a"}, {"n": 1, "id": "b"}, {"n": 0, "id": "c"}]));
        let asc = sort("n", SortDirection::Asc, &data);
        let ids: Vec<_> = asc.iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!("c"), json!("a"), json!("b")]);
        let desc = sort("n", SortDirection::Desc, &data);
        let ids: Vec<_> = desc.iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!("b"), json!("a"), json!("c")]);
    }

    #[test]
    fn test_strings_sort_lexically() {
        let data = records(json!([{"s": "b"}, {"s": "B"}, {"s": "a"}, {"s": "10"}, {"s": "9"}]));
        let sorted: Vec<_> = sort("s", SortDirection::Asc, &data)
            .iter()
            .map(|r| r["s"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(sorted, vec!["10", "9", "B", "a", "b"]);
    }

    #[test]
    fn test_missing_values_sort_first() {
        let data = records(json!([{"n": 2}, {}, {"n": 1}]));
        let sorted = sort("n", SortDirection::Asc, &data);
        assert_eq!(sorted, records(json!([{}, {"n": 1}, {"n": 2}])));
    }

    #[test]
    fn test_sort_all_first_sorter_is_primary() {
        let data = records(json!([
            {"g": "b", "n": 1},
            {"g": "a", "n": 2},
            {"g": "b", "n": 3},
            {"g": "a", "n": 1}
        ]));
        let sorters = vec![
            Sorter::new("g", SortDirection::Asc),
            Sorter::new("n", SortDirection::Desc),
        ];
        let sorted = sort_all(&sorters, &data);
        assert_eq!(
            sorted,
            records(json!([
                {"g": "a", "n": 2},
                {"g": "a", "n": 1},
                {"g": "b", "n": 3},
                {"g": "b", "n": 1}
            ]))
        );
    }

    #[test]
    fn test_parse_spec() {
        assert_eq!(
            Sorter::parse_spec("Year:desc"),
            Some(Sorter::new("Year", SortDirection::Desc))
        );
        assert_eq!(
            Sorter::parse_spec("Year"),
            Some(Sorter::new("Year", SortDirection::Asc))
        );
        assert_eq!(Sorter::parse_spec("Year:sideways"), None);
        assert_eq!(Sorter::parse_spec(":asc"), None);
    }
}
