use serde::Serialize;

use crate::group::Grouped;
use crate::schema::Record;

/// One named figure in a statistics listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stat {
    pub name: String,
    pub value: f64,
}

impl Stat {
    fn new(name: &str, value: f64) -> Self {
        Self {
            name: name.to_string(),
            value,
        }
    }
}

/// Round to `decimals` places, halves away from zero.
pub fn round(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Summary of group sizes across every level of a grouped result: number of
/// groups, max/min size and the mean size rounded to 2 places. Empty when
/// there are no groups.
pub fn group_stats(grouped: &Grouped) -> Vec<Stat> {
    let sizes = match grouped {
        // Ungrouped records are not a group set.
        Grouped::Records(_) => return Vec::new(),
        _ => grouped.leaf_sizes(),
    };
    let (Some(max), Some(min)) = (sizes.iter().max(), sizes.iter().min()) else {
        return Vec::new();
    };
    let total: usize = sizes.iter().sum();
    let mean = total as f64 / sizes.len() as f64;

    vec![
        Stat::new("No. of Groups", sizes.len() as f64),
        Stat::new("Max Group Size", *max as f64),
        Stat::new("Min Group Size", *min as f64),
        Stat::new("Average Group Size", round(mean, 2)),
    ]
}

/// Numeric values of `field`, skipping records where it is missing or not a
/// number.
pub fn numeric_values<'a>(field: &str, records: impl IntoIterator<Item = &'a Record>) -> Vec<f64> {
    records
        .into_iter()
        .filter_map(|r| r.get(field).and_then(|v| v.as_f64()))
        .collect()
}

pub fn sum<'a>(field: &str, records: impl IntoIterator<Item = &'a Record>) -> f64 {
    numeric_values(field, records)
        .iter()
        .fold(0.0, |acc, v| acc + v)
}

/// Mean of the numeric values of `field`, rounded to 2 places. None when the
/// field has no numeric values.
pub fn average<'a>(field: &str, records: impl IntoIterator<Item = &'a Record>) -> Option<f64> {
    let values = numeric_values(field, records);
    if values.is_empty() {
        return None;
    }
    Some(round(values.iter().sum::<f64>() / values.len() as f64, 2))
}

/// Single-field aggregate used by analysis mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSummary {
    pub field: String,
    pub count: usize,
    pub sum: f64,
    pub average: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl FieldSummary {
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn as_stats(&self) -> Vec<Stat> {
        let mut stats = vec![
            Stat::new("Count", self.count as f64),
            Stat::new("Sum", self.sum),
        ];
        if let (Some(average), Some(min), Some(max)) = (self.average, self.min, self.max) {
            stats.push(Stat::new("Average", average));
            stats.push(Stat::new("Min", min));
            stats.push(Stat::new("Max", max));
        }
        stats
    }
}

pub fn summarise<'a>(field: &str, records: impl IntoIterator<Item = &'a Record>) -> FieldSummary {
    let values = numeric_values(field, records);
    let total = values.iter().fold(0.0, |acc, v| acc + v);
    let average = (!values.is_empty()).then(|| round(total / values.len() as f64, 2));

    FieldSummary {
        field: field.to_string(),
        count: values.len(),
        sum: total,
        average,
        min: values.iter().copied().reduce(f64::min),
        max: values.iter().copied().reduce(f64::max),
    }
}
