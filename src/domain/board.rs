use crate::domain::task::{Lane, Task};
use serde::{Deserialize, Serialize};

/// Configuration for a board column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub lane: Lane,
}

impl Column {
    pub fn new(name: impl Into<String>, lane: Lane) -> Self {
        Self {
            name: name.into(),
            lane,
        }
    }
}

/// Board configuration: column labels and the order lanes are rendered in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    pub name: String,
    pub columns: Vec<Column>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            name: "Task Board".to_string(),
            columns: Lane::ALL
                .iter()
                .map(|&lane| Column::new(lane.label(), lane))
                .collect(),
        }
    }
}

impl BoardConfig {
    /// Gets the column configuration for a lane
    pub fn get_column_for_lane(&self, lane: Lane) -> Option<&Column> {
        self.columns.iter().find(|col| col.lane == lane)
    }

    /// Column label, falling back to the lane's own label
    pub fn label_for(&self, lane: Lane) -> &str {
        self.get_column_for_lane(lane)
            .map(|col| col.name.as_str())
            .unwrap_or_else(|| lane.label())
    }

    /// Lanes in render order. Lanes missing from the configuration are
    /// appended in their natural order so no task is ever hidden.
    pub fn lane_order(&self) -> Vec<Lane> {
        let mut order: Vec<Lane> = Vec::with_capacity(Lane::ALL.len());
        for col in &self.columns {
            if !order.contains(&col.lane) {
                order.push(col.lane);
            }
        }
        for lane in Lane::ALL {
            if !order.contains(&lane) {
                order.push(lane);
            }
        }
        order
    }
}

/// Task counts per lane, as shown on the board tabs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneCounts {
    pub all: usize,
    pub todo: usize,
    pub in_progress: usize,
    pub completed: usize,
}

impl LaneCounts {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        tasks.iter().fold(Self::default(), |mut acc, task| {
            acc.all += 1;
            match task.status {
                Lane::Todo => acc.todo += 1,
                Lane::InProgress => acc.in_progress += 1,
                Lane::Completed => acc.completed += 1,
            }
            acc
        })
    }

    pub fn get(&self, lane: Lane) -> usize {
        match lane {
            Lane::Todo => self.todo,
            Lane::InProgress => self.in_progress,
            Lane::Completed => self.completed,
        }
    }
}
