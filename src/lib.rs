//! # Taskboard Core
//!
//! Ordering and optimistic synchronization for a three-lane task board.
//!
//! The [`engine::TaskStore`] holds the visible collection and publishes every
//! change. Drag gestures resolve to a [`engine::MoveIntent`], which the
//! [`engine::SyncController`] applies optimistically, sends to a
//! [`api::TaskApi`] backend, and then either replaces with canonical state or
//! rolls back. Rendering goes through [`domain::project`], which never
//! touches stored ranks.

pub mod api;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;

// Re-export commonly used types
pub use api::{ListQuery, MemoryApi, MoveRequest, MoveResponse, TaskApi};
pub use config::{Settings, SyncSettings, ViewSettings};
pub use domain::{
    board::{BoardConfig, Column, LaneCounts},
    projection::{LaneView, TaskFilter, ViewQuery},
    sorting::{SortField, SortOrder},
    task::{Lane, NewTask, Priority, Task, TaskId, TaskPatch},
};
pub use engine::{
    DragSession, DropTarget, LaneIndex, MoveIntent, MoveOutcome, SyncController, SyncEvent,
    TaskStore,
};
pub use error::{BoardError, Result};
