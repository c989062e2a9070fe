//! Query options gathered from the command line and config file, and their
//! translation into store actions.

use color_eyre::eyre::eyre;
use color_eyre::Result;

use crate::calc::parse_calculations;
use crate::config::AppConfig;
use crate::filter::{Filter, FilterUpdate};
use crate::schema::{Record, Schema};
use crate::sort::{SortDirection, Sorter};
use crate::store::{Action, Store};
use crate::Args;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    pub calculations: Option<String>,
    pub filters: Vec<(String, FilterUpdate)>,
    pub sorters: Vec<Sorter>,
    pub fields: Option<Vec<String>>,
    pub groupings: Vec<String>,
    pub show_counts: bool,
    pub group_sort: Option<SortDirection>,
    pub group_limit: Option<usize>,
    pub combine_remainder: bool,
    pub limit: Option<usize>,
    pub analyse: Option<String>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter from `FIELD:OPERATOR[:VALUE[:VALUE1]]`.
    pub fn with_filter(mut self, spec: &str) -> Result<Self> {
        self.filters.push(Filter::parse_spec(spec)?);
        Ok(self)
    }

    /// Add a sorter from `FIELD[:asc|desc]`.
    pub fn with_sorter(mut self, spec: &str) -> Result<Self> {
        let sorter = Sorter::parse_spec(spec)
            .ok_or_else(|| eyre!("Invalid sort '{}'. Expected FIELD[:asc|desc]", spec))?;
        self.sorters.push(sorter);
        Ok(self)
    }

    pub fn with_grouping(mut self, field: impl Into<String>) -> Self {
        self.groupings.push(field.into());
        self
    }

    pub fn with_counts(mut self, show_counts: bool) -> Self {
        self.show_counts = show_counts;
        self
    }

    pub fn with_group_sort(mut self, direction: SortDirection) -> Self {
        self.group_sort = Some(direction);
        self
    }

    pub fn with_group_limit(mut self, limit: usize) -> Self {
        self.group_limit = Some(limit);
        self
    }

    pub fn with_combine_remainder(mut self, combine: bool) -> Self {
        self.combine_remainder = combine;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_analyse(mut self, field: impl Into<String>) -> Self {
        self.analyse = Some(field.into());
        self
    }

    pub fn with_fields(mut self, fields: Vec<String>) -> Self {
        self.fields = Some(fields);
        self
    }

    pub fn with_calculations(mut self, calculations: impl Into<String>) -> Self {
        self.calculations = Some(calculations.into());
        self
    }

    /// Options from parsed arguments, with config values filling the gaps
    /// the arguments leave.
    pub fn from_args(args: &Args, config: &AppConfig) -> Result<Self> {
        let mut opts = QueryOptions::new();
        for spec in &args.filters {
            opts = opts.with_filter(spec)?;
        }
        for spec in &args.sort {
            opts = opts.with_sorter(spec)?;
        }
        for field in &args.group_by {
            opts = opts.with_grouping(field.as_str());
        }
        if !args.fields.is_empty() {
            opts = opts.with_fields(args.fields.clone());
        }
        if let Some(calc) = &args.calc {
            opts = opts.with_calculations(calc.as_str());
        }
        opts = opts
            .with_counts(args.counts)
            .with_combine_remainder(args.combine_remainder);

        let group_sort = match args.group_sort.as_deref() {
            Some(s) => SortDirection::parse(s)
                .ok_or_else(|| eyre!("Invalid group sort '{}'. Expected asc or desc", s))?,
            None => config.group_sort(),
        };
        opts = opts.with_group_sort(group_sort);
        if let Some(limit) = args.group_limit.or(config.query.group_limit) {
            opts = opts.with_group_limit(limit);
        }
        if let Some(limit) = args.limit.or(config.query.limit) {
            opts = opts.with_limit(limit);
        }
        if let Some(field) = &args.analyse {
            opts = opts.with_analyse(field.as_str());
        }
        Ok(opts)
    }

    /// Dispatch these options into `store`, one action per setting, in the
    /// order a user would apply them interactively: calculations, filters,
    /// sorters, result fields, groupings, counts settings, limit, analysis.
    pub fn apply(&self, store: &mut Store) -> Result<()> {
        if let Some(calculations) = &self.calculations {
            let fields = parse_calculations(calculations)?;
            let names: Vec<String> = fields.iter().map(|f| f.name.clone()).collect();
            store.dispatch(Action::SaveCalculationsString(Some(calculations.clone())));
            store.dispatch(Action::SaveCalculatedFields(fields));

            // Calculated fields join the visible result fields.
            if let Some(mut visible) = store.state().result_fields.clone() {
                for name in names {
                    if !visible.contains(&name) {
                        visible.push(name);
                    }
                }
                store.dispatch(Action::UpdateResultFields(Some(visible)));
            }
        }

        for (name, update) in &self.filters {
            let id = store
                .add_filter(name.as_str())
                .ok_or_else(|| eyre!("Failed to add filter on '{}'", name))?;
            store.dispatch(Action::UpdateFilter {
                id,
                update: update.clone(),
            });
        }

        for sorter in &self.sorters {
            store.dispatch(Action::AddSorter(sorter.clone()));
        }

        if let Some(fields) = &self.fields {
            store.dispatch(Action::UpdateResultFields(Some(fields.clone())));
        }

        for field in &self.groupings {
            store.dispatch(Action::AddGrouping(field.clone()));
        }

        if self.show_counts {
            store.dispatch(Action::ShowCounts(true));
            if let Some(direction) = self.group_sort {
                store.dispatch(Action::GroupSort(direction));
            }
            if let Some(limit) = self.group_limit {
                store.dispatch(Action::GroupLimit(Some(limit)));
            }
            if self.combine_remainder && self.group_limit.is_some() {
                store.dispatch(Action::CombineRemainder(true));
            }
        }

        if let Some(limit) = self.limit {
            store.dispatch(Action::Limit(Some(limit)));
        }

        if let Some(field) = &self.analyse {
            store.dispatch(Action::Analyse(Some(field.clone())));
        }

        Ok(())
    }
}

/// A fresh store holding `schema` and `data` with `options` applied.
pub fn build_store(schema: Schema, data: Vec<Record>, options: &QueryOptions) -> Result<Store> {
    let mut store = Store::new();
    store.dispatch(Action::SaveSchema(schema));
    store.dispatch(Action::SaveData(data));
    options.apply(&mut store)?;
    Ok(store)
}
