//! Query state and the action reducer.
//!
//! [`QueryState`] is a plain value. [`reduce`] is the single transition
//! function; each [`Action`] applies its own cascading resets so that the
//! grouping, counts and analysis controls never contradict each other.
//! [`Store`] owns one state instance and adds the follow-up dispatches some
//! actions imply.

use std::mem;

use tracing::debug;

use crate::calc::CalculatedField;
use crate::filter::{Filter, FilterUpdate};
use crate::schema::{Record, Schema};
use crate::sort::{SortDirection, Sorter};

#[derive(Debug, Clone, PartialEq)]
pub struct QueryState {
    pub filters: Vec<Filter>,
    pub groupings: Vec<String>,
    pub sorters: Vec<Sorter>,
    pub schema: Option<Schema>,
    pub data: Option<Vec<Record>>,
    pub result_fields: Option<Vec<String>>,
    pub show_counts: bool,
    pub group_sort: SortDirection,
    pub group_limit: Option<usize>,
    pub limit: Option<usize>,
    pub analyse: Option<String>,
    pub calculated_fields: Vec<CalculatedField>,
    pub calculations_string: Option<String>,
    pub combine_remainder: bool,
}

impl Default for QueryState {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            groupings: Vec::new(),
            sorters: Vec::new(),
            schema: None,
            data: None,
            result_fields: None,
            show_counts: false,
            group_sort: SortDirection::Desc,
            group_limit: None,
            limit: None,
            analyse: None,
            calculated_fields: Vec::new(),
            calculations_string: None,
            combine_remainder: false,
        }
    }
}

impl QueryState {
    /// Clear the counts-view settings that only make sense while grouped
    /// counts are shown.
    fn reset_group_view(&mut self) {
        self.group_sort = SortDirection::Desc;
        self.group_limit = None;
        self.combine_remainder = false;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Replace the schema. Clears the whole query configuration.
    SaveSchema(Schema),
    SaveData(Vec<Record>),
    /// Append a new filter on a field. The reducer assigns the id.
    AddFilter(String),
    DeleteFilter(String),
    UpdateFilter { id: String, update: FilterUpdate },
    AddGrouping(String),
    RemoveGrouping(String),
    AddSorter(Sorter),
    /// Remove every sorter on the named field.
    RemoveSorter(String),
    Limit(Option<usize>),
    ShowCounts(bool),
    Analyse(Option<String>),
    GroupSort(SortDirection),
    GroupLimit(Option<usize>),
    CombineRemainder(bool),
    SaveCalculatedFields(Vec<CalculatedField>),
    SaveCalculationsString(Option<String>),
    UpdateResultFields(Option<Vec<String>>),
    Reset,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::SaveSchema(_) | Action::SaveData(_) => "saveJson",
            Action::AddFilter(_) => "addFilter",
            Action::DeleteFilter(_) => "deleteFilter",
            Action::UpdateFilter { .. } => "updateFilter",
            Action::AddGrouping(_) => "addGrouping",
            Action::RemoveGrouping(_) => "removeGrouping",
            Action::AddSorter(_) => "addSorter",
            Action::RemoveSorter(_) => "removeSorter",
            Action::Limit(_) => "limit",
            Action::ShowCounts(_) => "showCounts",
            Action::Analyse(_) => "analyse",
            Action::GroupSort(_) => "groupSort",
            Action::GroupLimit(_) => "groupLimit",
            Action::CombineRemainder(_) => "combineRemainder",
            Action::SaveCalculatedFields(_) => "saveCalculatedFields",
            Action::SaveCalculationsString(_) => "saveCalculationsString",
            Action::UpdateResultFields(_) => "updateResultFields",
            Action::Reset => "reset",
        }
    }
}

/// Apply one action to `state` and return the next state.
pub fn reduce(mut state: QueryState, action: Action) -> QueryState {
    match action {
        Action::SaveSchema(schema) => {
            state.schema = Some(schema);
            state.filters.clear();
            state.groupings.clear();
            state.sorters.clear();
            state.limit = None;
            state.analyse = None;
            state.show_counts = false;
        }
        Action::SaveData(data) => state.data = Some(data),
        Action::AddFilter(name) => state.filters.push(Filter::new(name)),
        Action::DeleteFilter(id) => state.filters.retain(|f| f.id != id),
        Action::UpdateFilter { id, update } => {
            if let Some(filter) = state.filters.iter_mut().find(|f| f.id == id) {
                update.apply_to(filter);
            }
        }
        Action::AddGrouping(name) => {
            if let Some(fields) = state.result_fields.as_mut() {
                if !fields.contains(&name) {
                    fields.push(name.clone());
                }
            }
            if !state.groupings.contains(&name) {
                state.groupings.push(name);
            }
            state.analyse = None;
        }
        Action::RemoveGrouping(name) => {
            state.groupings.retain(|g| *g != name);
            if state.groupings.is_empty() {
                state.show_counts = false;
                state.reset_group_view();
            }
        }
        Action::AddSorter(sorter) => state.sorters.push(sorter),
        Action::RemoveSorter(field) => state.sorters.retain(|s| s.field != field),
        Action::Limit(limit) => state.limit = limit,
        Action::ShowCounts(show) => {
            state.show_counts = show;
            if !show {
                state.reset_group_view();
            }
        }
        Action::Analyse(field) => {
            state.analyse = field;
            state.groupings.clear();
            state.show_counts = false;
            state.reset_group_view();
        }
        Action::GroupSort(direction) => state.group_sort = direction,
        Action::GroupLimit(limit) => {
            state.group_limit = limit;
            if limit.is_none() {
                state.combine_remainder = false;
            }
        }
        Action::CombineRemainder(combine) => state.combine_remainder = combine,
        Action::SaveCalculatedFields(fields) => state.calculated_fields = fields,
        Action::SaveCalculationsString(s) => state.calculations_string = s,
        Action::UpdateResultFields(fields) => state.result_fields = fields,
        Action::Reset => {
            state.filters.clear();
            state.groupings.clear();
            state.sorters.clear();
            state.show_counts = false;
            state.limit = None;
            state.analyse = None;
            state.reset_group_view();
        }
    }
    state
}

/// Owner of one query state. Each session or request gets its own store.
#[derive(Debug, Default)]
pub struct Store {
    state: QueryState,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: QueryState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &QueryState {
        &self.state
    }

    pub fn into_state(self) -> QueryState {
        self.state
    }

    pub fn dispatch(&mut self, action: Action) {
        debug!(action = action.name(), "dispatch");
        // A new schema also publishes its field names as the result fields.
        let follow_up = match &action {
            Action::SaveSchema(schema) => Some(Action::UpdateResultFields(Some(schema.field_names()))),
            _ => None,
        };
        let state = mem::take(&mut self.state);
        self.state = reduce(state, action);
        if let Some(follow_up) = follow_up {
            self.dispatch(follow_up);
        }
    }

    /// Add a filter on `name` and return its generated id.
    pub fn add_filter(&mut self, name: impl Into<String>) -> Option<String> {
        self.dispatch(Action::AddFilter(name.into()));
        self.state.filters.last().map(|f| f.id.clone())
    }

    /// Back to a freshly created state, data and schema included.
    pub fn reset_state(&mut self) {
        self.state = QueryState::default();
    }
}
