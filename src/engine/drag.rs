//! Turns the outcome of a drag gesture into a move intent.
//!
//! Nothing here touches the store. The pointer/touch layer reports what the
//! dragged card was released over as a [`DropTarget`]; [`compute_move_intent`]
//! resolves it against a [`LaneIndex`] of the currently visible tasks.

use crate::domain::{ranking, Lane, Task, TaskId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// What the dragged card was released over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropTarget {
    /// Empty space of a lane
    Lane(Lane),
    /// Another card
    Item(TaskId),
}

/// Where a task should go: lane plus zero-based rank in that lane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveIntent {
    pub task_id: TaskId,
    pub to_lane: Lane,
    pub to_rank: usize,
}

impl MoveIntent {
    pub fn new(task_id: TaskId, to_lane: Lane, to_rank: usize) -> Self {
        Self {
            task_id,
            to_lane,
            to_rank,
        }
    }
}

/// Rank-ordered lane membership of a task collection
#[derive(Debug, Clone, Default)]
pub struct LaneIndex {
    lanes: HashMap<Lane, Vec<TaskId>>,
    lane_of: HashMap<TaskId, Lane>,
}

impl LaneIndex {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let mut index = Self::default();
        for lane in Lane::ALL {
            let members: Vec<TaskId> = ranking::lane_members(tasks, lane)
                .into_iter()
                .map(|t| t.id)
                .collect();
            for id in &members {
                index.lane_of.insert(*id, lane);
            }
            index.lanes.insert(lane, members);
        }
        index
    }

    pub fn len(&self, lane: Lane) -> usize {
        self.lanes.get(&lane).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.lane_of.is_empty()
    }

    pub fn lane_of(&self, id: TaskId) -> Option<Lane> {
        self.lane_of.get(&id).copied()
    }

    /// Position of `id` within `lane`, if it is there
    pub fn rank_of(&self, lane: Lane, id: TaskId) -> Option<usize> {
        self.lanes.get(&lane)?.iter().position(|&member| member == id)
    }
}

/// Resolves a drop into a move intent.
///
/// - no target: `None` (drag cancelled or released outside every lane)
/// - lane target: append to the end of that lane
/// - item target: take the hovered card's rank in the hovered card's lane
///
/// A hovered card that is no longer on the board falls back to appending to
/// the dragged card's own lane.
pub fn compute_move_intent(
    dragged: TaskId,
    target: Option<DropTarget>,
    index: &LaneIndex,
) -> Option<MoveIntent> {
    match target? {
        DropTarget::Lane(lane) => Some(MoveIntent::new(dragged, lane, index.len(lane))),
        DropTarget::Item(hovered) => {
            if let Some(lane) = index.lane_of(hovered) {
                if let Some(rank) = index.rank_of(lane, hovered) {
                    return Some(MoveIntent::new(dragged, lane, rank));
                }
            }
            let lane = index.lane_of(dragged)?;
            debug!(task = %dragged, hovered = %hovered, "hovered card is stale, appending");
            Some(MoveIntent::new(dragged, lane, index.len(lane)))
        }
    }
}

/// Tracks the card being dragged between drag start and drop
#[derive(Debug, Default)]
pub struct DragSession {
    active: Option<TaskId>,
}

impl DragSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, task_id: TaskId) {
        self.active = Some(task_id);
    }

    pub fn active(&self) -> Option<TaskId> {
        self.active
    }

    /// Ends the drag. Yields an intent only if a drag was active and the
    /// card was released over a target.
    pub fn end(&mut self, target: Option<DropTarget>, index: &LaneIndex) -> Option<MoveIntent> {
        let dragged = self.active.take()?;
        compute_move_intent(dragged, target, index)
    }

    pub fn cancel(&mut self) -> Option<TaskId> {
        self.active.take()
    }
}
