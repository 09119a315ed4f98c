pub mod board;
pub mod projection;
pub mod ranking;
pub mod sorting;
pub mod task;

pub use board::{BoardConfig, Column, LaneCounts};
pub use projection::{project, project_with, LaneColumn, LaneView, TaskFilter, ViewQuery};
pub use ranking::{clone_all, move_local, normalize_ranks, ranks_are_contiguous};
pub use sorting::{sort_tasks, SortField, SortOrder};
pub use task::{Lane, NewTask, Priority, Task, TaskId, TaskPatch};
