//! Derive the displayed view from a query state snapshot.

use color_eyre::Result;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::calc;
use crate::filter;
use crate::group::{group, Grouped};
use crate::schema::{Record, Schema};
use crate::sort::sort_all;
use crate::statistics::{group_stats, summarise, FieldSummary, Stat};
use crate::store::QueryState;

/// The result a caller renders or exports.
#[derive(Debug, Clone, PartialEq)]
pub enum View {
    Flat(Vec<Record>),
    Grouped { grouped: Grouped, stats: Vec<Stat> },
    Analysis(FieldSummary),
}

impl View {
    pub fn is_empty(&self) -> bool {
        match self {
            View::Flat(records) => records.is_empty(),
            View::Grouped { grouped, .. } => grouped.is_empty(),
            View::Analysis(summary) => summary.is_empty(),
        }
    }

    /// Group statistics; empty for views that are not grouped.
    pub fn stats(&self) -> &[Stat] {
        match self {
            View::Grouped { stats, .. } => stats,
            _ => &[],
        }
    }
}

impl Serialize for View {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            View::Flat(records) => serializer.collect_seq(records),
            View::Grouped { grouped, .. } => grouped.serialize(serializer),
            View::Analysis(summary) => {
                let stats = summary.as_stats();
                let mut map = serializer.serialize_map(Some(stats.len() + 1))?;
                map.serialize_entry("field", &summary.field)?;
                for stat in &stats {
                    map.serialize_entry(&stat.name, &stat.value)?;
                }
                map.end()
            }
        }
    }
}

/// Keep only `fields` in each record, in that order. Fields a record lacks
/// are left out rather than filled in.
pub fn project(fields: &[String], records: Vec<Record>) -> Vec<Record> {
    records
        .into_iter()
        .map(|record| {
            fields
                .iter()
                .filter_map(|f| record.get(f).map(|v| (f.clone(), v.clone())))
                .collect()
        })
        .collect()
}

/// Run the full transformation for `state`: calculated fields, filters and
/// sorters, then either analysis or projection followed by grouping or the
/// row limit.
pub fn derive_view(state: &QueryState) -> Result<View> {
    let Some(data) = state.data.as_deref() else {
        return Ok(View::Flat(Vec::new()));
    };
    let base_schema = state.schema.clone().unwrap_or_default();
    let schema: Schema = calc::augment_schema(&state.calculated_fields, &base_schema);

    let records = calc::apply_all(&state.calculated_fields, data);
    let records = filter::apply(&schema, &state.filters, &records)?;
    debug!(input = data.len(), kept = records.len(), "filtered");

    let records = sort_all(&state.sorters, &records);

    // Analysis reads the field whether or not it is among the result fields.
    if let Some(field) = &state.analyse {
        debug!(field = %field, "analysis view");
        return Ok(View::Analysis(summarise(field, &records)));
    }

    let records = match &state.result_fields {
        Some(fields) => project(fields, records),
        None => records,
    };

    if !state.groupings.is_empty() {
        let mut grouped = group(&state.groupings, state.show_counts, &records)?;
        if state.show_counts {
            grouped.order_counts(state.group_sort);
            if let Some(limit) = state.group_limit {
                grouped.limit_counts(limit, state.combine_remainder);
            }
        }
        let stats = group_stats(&grouped);
        debug!(groups = grouped.len(), counts = state.show_counts, "grouped view");
        return Ok(View::Grouped { grouped, stats });
    }

    let mut records = records;
    if let Some(limit) = state.limit {
        records.truncate(limit);
    }
    Ok(View::Flat(records))
}
