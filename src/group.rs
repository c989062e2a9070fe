//! Recursive multi-level grouping.

use color_eyre::eyre::eyre;
use color_eyre::Result;
use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::fmt;

use crate::schema::Record;
use crate::sort::SortDirection;
use crate::value::group_key;

/// Key of the bucket that collects groups cut off by a group limit.
pub const REMAINDER_KEY: &str = "Other";

/// One collapsed group: its key and the number of records in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupCount {
    pub key: String,
    pub count: usize,
}

impl fmt::Display for GroupCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.count)
    }
}

impl Serialize for GroupCount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Output of [`group`]. Intermediate levels are keyed groups in first
/// encounter order; the deepest level is either the raw records or, in counts
/// mode, the ranked `key: count` list.
#[derive(Debug, Clone, PartialEq)]
pub enum Grouped {
    Records(Vec<Record>),
    Counts(Vec<GroupCount>),
    Groups(Vec<(String, Grouped)>),
}

impl Serialize for Grouped {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Grouped::Records(records) => serializer.collect_seq(records),
            Grouped::Counts(counts) => serializer.collect_seq(counts),
            Grouped::Groups(groups) => {
                let mut map = serializer.serialize_map(Some(groups.len()))?;
                for (key, inner) in groups {
                    map.serialize_entry(key, inner)?;
                }
                map.end()
            }
        }
    }
}

/// Partition records by one field, keeping buckets in first-encounter order.
fn partition(field: &str, records: Vec<Record>) -> Vec<(String, Vec<Record>)> {
    let mut buckets: IndexMap<String, Vec<Record>> = IndexMap::new();
    for record in records {
        buckets
            .entry(group_key(record.get(field)))
            .or_default()
            .push(record);
    }
    buckets.into_iter().collect()
}

/// Collapse buckets into counts, largest first. The sort is stable so equal
/// counts keep their encounter order.
fn rank_counts(buckets: Vec<(String, Vec<Record>)>) -> Vec<GroupCount> {
    let mut counts: Vec<GroupCount> = buckets
        .into_iter()
        .map(|(key, bucket)| GroupCount {
            key,
            count: bucket.len(),
        })
        .collect();
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}

fn group_level(fields: &[String], show_counts: bool, records: Vec<Record>) -> Grouped {
    let Some((field, rest)) = fields.split_first() else {
        return Grouped::Records(records);
    };
    let buckets = partition(field, records);

    if rest.is_empty() {
        if show_counts {
            return Grouped::Counts(rank_counts(buckets));
        }
        return Grouped::Groups(
            buckets
                .into_iter()
                .map(|(key, bucket)| (key, Grouped::Records(bucket)))
                .collect(),
        );
    }

    Grouped::Groups(
        buckets
            .into_iter()
            .map(|(key, bucket)| (key, group_level(rest, show_counts, bucket)))
            .collect(),
    )
}

/// Group `records` by `fields` in order, nesting one level per field.
///
/// With no fields the records come back unchanged; asking for counts without
/// a grouping field is rejected.
pub fn group(fields: &[String], show_counts: bool, records: &[Record]) -> Result<Grouped> {
    if fields.is_empty() && show_counts {
        return Err(eyre!("Group counts require at least one grouping field"));
    }
    Ok(group_level(fields, show_counts, records.to_vec()))
}

impl Grouped {
    pub fn is_counts(&self) -> bool {
        match self {
            Grouped::Counts(_) => true,
            Grouped::Records(_) => false,
            Grouped::Groups(groups) => groups.first().is_some_and(|(_, g)| g.is_counts()),
        }
    }

    /// Number of top-level entries (groups, counts or records).
    pub fn len(&self) -> usize {
        match self {
            Grouped::Records(records) => records.len(),
            Grouped::Counts(counts) => counts.len(),
            Grouped::Groups(groups) => groups.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of every leaf group across all levels, in traversal order. A
    /// counted group contributes its count.
    pub fn leaf_sizes(&self) -> Vec<usize> {
        let mut sizes = Vec::new();
        self.collect_leaf_sizes(&mut sizes);
        sizes
    }

    fn collect_leaf_sizes(&self, sizes: &mut Vec<usize>) {
        match self {
            Grouped::Records(records) => sizes.push(records.len()),
            Grouped::Counts(counts) => sizes.extend(counts.iter().map(|c| c.count)),
            Grouped::Groups(groups) => {
                for (_, inner) in groups {
                    inner.collect_leaf_sizes(sizes);
                }
            }
        }
    }

    /// All records held in the structure, flattened in traversal order.
    pub fn leaf_records(&self) -> Vec<&Record> {
        let mut out = Vec::new();
        self.collect_records(&mut out);
        out
    }

    fn collect_records<'a>(&'a self, out: &mut Vec<&'a Record>) {
        match self {
            Grouped::Records(records) => out.extend(records.iter()),
            Grouped::Counts(_) => {}
            Grouped::Groups(groups) => {
                for (_, inner) in groups {
                    inner.collect_records(out);
                }
            }
        }
    }

    fn for_each_counts(&mut self, f: &mut impl FnMut(&mut Vec<GroupCount>)) {
        match self {
            Grouped::Counts(counts) => f(counts),
            Grouped::Records(_) => {}
            Grouped::Groups(groups) => {
                for (_, inner) in groups.iter_mut() {
                    inner.for_each_counts(f);
                }
            }
        }
    }

    /// Order every counts list. Counts are ranked descending on creation, so
    /// ascending flips each list.
    pub fn order_counts(&mut self, direction: SortDirection) {
        if direction == SortDirection::Asc {
            self.for_each_counts(&mut |counts| counts.reverse());
        }
    }

    /// Keep the first `limit` entries of every counts list. With
    /// `combine_remainder`, the dropped entries are summed into a trailing
    /// [`REMAINDER_KEY`] entry.
    pub fn limit_counts(&mut self, limit: usize, combine_remainder: bool) {
        self.for_each_counts(&mut |counts| {
            if counts.len() <= limit {
                return;
            }
            let dropped: usize = counts.drain(limit..).map(|c| c.count).sum();
            if combine_remainder {
                counts.push(GroupCount {
                    key: REMAINDER_KEY.to_string(),
                    count: dropped,
                });
            }
        });
    }
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

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_no_fields_returns_input() {
        let data = records(json!([{"a": 1}, {"a": 2}]));
        assert_eq!(group(&[], false, &data).unwrap(), Grouped::Records(data));
    }

    #[test]
    fn test_counts_without_fields_is_rejected() {
        assert!(group(&[], true, &[]).is_err());
    }

    #[test]
    fn test_single_level_groups() {
        let data = records(json!([{"Genre": "rock"}, {"Genre": "jazz"}, {"Genre": "rock"}]));
        let grouped = group(&fields(&["Genre"]), false, &data).unwrap();
        assert_eq!(
            serde_json::to_value(&grouped).unwrap(),
            json!({
                "rock": [{"Genre": "rock"}, {"Genre": "rock"}],
                "jazz": [{"Genre": "jazz"}]
            })
        );
    }

    #[test]
    fn test_single_level_counts() {
        let data = records(json!([{"Genre": "rock"}, {"Genre": "jazz"}, {"Genre": "rock"}]));
        let grouped = group(&fields(&["Genre"]), true, &data).unwrap();
        assert_eq!(
            serde_json::to_value(&grouped).unwrap(),
            json!(["rock: 2", "jazz: 1"])
        );
        assert!(grouped.is_counts());
    }

    #[test]
    fn test_count_ties_keep_encounter_order() {
        let data = records(json!([
            {"k": "a"}, {"k": "b"}, {"k": "c"}, {"k": "c"}, {"k": "b"}
        ]));
        let grouped = group(&fields(&["k"]), true, &data).unwrap();
        assert_eq!(
            serde_json::to_value(&grouped).unwrap(),
            json!(["b: 2", "c: 2", "a: 1"])
        );
    }

    #[test]
    fn test_missing_and_null_keys() {
        let data = records(json!([{"k": null}, {}, {"k": 1.0}, {"k": 1}]));
        let grouped = group(&fields(&["k"]), true, &data).unwrap();
        assert_eq!(
            serde_json::to_value(&grouped).unwrap(),
            json!(["1: 2", "null: 1", "undefined: 1"])
        );
    }

    #[test]
    fn test_nested_groups_and_counts() {
        let data = records(json!([
            {"Artist": "A", "Album": "x"},
            {"Artist": "A", "Album": "y"},
            {"Artist": "B", "Album": "z"},
            {"Artist": "A", "Album": "x"}
        ]));
        let grouped = group(&fields(&["Artist", "Album"]), false, &data).unwrap();
        assert_eq!(grouped.leaf_sizes(), vec![2, 1, 1]);
        assert_eq!(grouped.leaf_records().len(), 4);
        assert!(!grouped.is_counts());

        let counted = group(&fields(&["Artist", "Album"]), true, &data).unwrap();
        assert_eq!(
            serde_json::to_value(&counted).unwrap(),
            json!({"A": ["x: 2", "y: 1"], "B": ["z: 1"]})
        );
        assert!(counted.is_counts());
    }

    #[test]
    fn test_order_and_limit_counts() {
        let data = records(json!([
            {"k": "a"}, {"k": "a"}, {"k": "a"}, {"k": "b"}, {"k": "b"}, {"k": "c"}, {"k": "d"}
        ]));
        let mut grouped = group(&fields(&["k"]), true, &data).unwrap();
        grouped.limit_counts(2, true);
        assert_eq!(
            serde_json::to_value(&grouped).unwrap(),
            json!(["a: 3", "b: 2", "Other: 2"])
        );

        let mut grouped = group(&fields(&["k"]), true, &data).unwrap();
        grouped.order_counts(SortDirection::Asc);
        grouped.limit_counts(2, false);
        assert_eq!(
            serde_json::to_value(&grouped).unwrap(),
            json!(["d: 1", "c: 1"])
        );
    }

    #[test]
    fn test_limit_larger_than_groups_adds_no_remainder() {
        let data = records(json!([{"k": "a"}, {"k": "b"}]));
        let mut grouped = group(&fields(&["k"]), true, &data).unwrap();
        grouped.limit_counts(5, true);
        assert_eq!(grouped.len(), 2);
    }

    #[test]
    fn test_group_does_not_mutate_input() {
        let data = records(json!([{"k": "a"}, {"k": "b"}]));
        let before = data.clone();
        let _ = group(&fields(&["k"]), false, &data).unwrap();
        assert_eq!(data, before);
    }

    #[test]
    fn test_high_cardinality_keeps_encounter_order() {
        // Every key appears twice, the second time after all the others.
        let data: Vec<Record> = (0..20_000)
            .chain(0..20_000)
            .map(|i| json!({"id": i}).as_object().unwrap().clone())
            .collect();
        let grouped = group(&fields(&["id"]), true, &data).unwrap();
        let Grouped::Counts(counts) = grouped else {
            panic!("expected counts");
        };
        assert_eq!(counts.len(), 20_000);
        assert!(counts.iter().all(|c| c.count == 2));
        assert_eq!(counts[0].key, "0");
        assert_eq!(counts[19_999].key, "19999");
    }
}
