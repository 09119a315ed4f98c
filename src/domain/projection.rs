//! Read-only derivation of what the board renders.
//!
//! Projection never writes `rank`; display sorts only reorder the output.

use crate::domain::board::BoardConfig;
use crate::domain::sorting::{sort_tasks, SortField, SortOrder};
use crate::domain::task::{Lane, Task};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Case-insensitive substring filters. Empty strings are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFilter {
    /// Matched against title, description, assignee and label
    pub search: Option<String>,
    pub assignee: Option<String>,
    pub label: Option<String>,
}

impl TaskFilter {
    pub fn search(text: impl Into<String>) -> Self {
        Self {
            search: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        [&self.search, &self.assignee, &self.label]
            .iter()
            .all(|f| needle(f).is_none())
    }

    pub fn matches(&self, task: &Task) -> bool {
        if let Some(query) = needle(&self.search) {
            let hit = contains(Some(task.title.as_str()), &query)
                || contains(task.description.as_deref(), &query)
                || contains(task.assignee.as_deref(), &query)
                || contains(task.label.as_deref(), &query);
            if !hit {
                return false;
            }
        }
        if let Some(query) = needle(&self.assignee) {
            if !contains(task.assignee.as_deref(), &query) {
                return false;
            }
        }
        if let Some(query) = needle(&self.label) {
            if !contains(task.label.as_deref(), &query) {
                return false;
            }
        }
        true
    }
}

fn needle(field: &Option<String>) -> Option<String> {
    field
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
}

fn contains(haystack: Option<&str>, needle_lower: &str) -> bool {
    haystack
        .map(|h| h.to_lowercase().contains(needle_lower))
        .unwrap_or(false)
}

/// What to show: an optional lane tab, filters and a display sort
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewQuery {
    pub lane: Option<Lane>,
    pub filter: TaskFilter,
    pub sort: SortField,
    pub order: SortOrder,
}

impl ViewQuery {
    pub fn with_lane(mut self, lane: Lane) -> Self {
        self.lane = Some(lane);
        self
    }

    pub fn with_filter(mut self, filter: TaskFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn sorted_by(mut self, sort: SortField, order: SortOrder) -> Self {
        self.sort = sort;
        self.order = order;
        self
    }
}

/// One rendered column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaneColumn {
    pub lane: Lane,
    pub label: String,
    pub tasks: Vec<Task>,
}

/// Every lane of the board, in render order, each holding its visible tasks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaneView {
    pub columns: Vec<LaneColumn>,
}

impl LaneView {
    /// Visible tasks of one lane; empty when the lane is filtered out
    pub fn lane(&self, lane: Lane) -> &[Task] {
        self.columns
            .iter()
            .find(|col| col.lane == lane)
            .map(|col| col.tasks.as_slice())
            .unwrap_or(&[])
    }

    pub fn total(&self) -> usize {
        self.columns.iter().map(|col| col.tasks.len()).sum()
    }

    pub fn into_map(self) -> BTreeMap<Lane, Vec<Task>> {
        self.columns
            .into_iter()
            .map(|col| (col.lane, col.tasks))
            .collect()
    }
}

/// Projects tasks onto the default three-lane board
pub fn project(tasks: &[Task], query: &ViewQuery) -> LaneView {
    project_with(&BoardConfig::default(), tasks, query)
}

/// Projects tasks onto the lanes of `config`
pub fn project_with(config: &BoardConfig, tasks: &[Task], query: &ViewQuery) -> LaneView {
    let columns = config
        .lane_order()
        .into_iter()
        .map(|lane| {
            let mut visible: Vec<Task> = if query.lane.map_or(true, |tab| tab == lane) {
                tasks
                    .iter()
                    .filter(|t| t.status == lane && query.filter.matches(t))
                    .cloned()
                    .collect()
            } else {
                Vec::new()
            };
            sort_tasks(&mut visible, query.sort, query.order);
            LaneColumn {
                lane,
                label: config.label_for(lane).to_string(),
                tasks: visible,
            }
        })
        .collect();

    LaneView { columns }
}
