use crate::{
    domain::{Lane, NewTask, SortField, SortOrder, Task, TaskId, TaskPatch},
    error::Result,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub mod memory;

pub use memory::MemoryApi;

/// Server-side filter and sort for [`TaskApi::list_tasks`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Lane>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<SortOrder>,
}

/// Body of an authoritative reorder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub to_status: Lane,
    pub to_index: usize,
}

/// Backends answer a move with either the moved record or the whole list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MoveResponse {
    Task(Task),
    List(Vec<Task>),
}

/// Persistence collaborator owning the canonical copy of the board.
///
/// Every call is a round trip and may fail with a transport, validation or
/// conflict error.
#[async_trait]
pub trait TaskApi: Send + Sync {
    /// Lists canonical tasks, optionally filtered and sorted server-side
    async fn list_tasks(&self, query: &ListQuery) -> Result<Vec<Task>>;

    /// Creates a task; the backend assigns id and rank
    async fn create_task(&self, payload: &NewTask) -> Result<Task>;

    /// Applies a partial update and returns the canonical record
    async fn update_task(&self, id: TaskId, patch: &TaskPatch) -> Result<Task>;

    /// Deletes a task
    async fn delete_task(&self, id: TaskId) -> Result<()>;

    /// Moves a task to `request.to_index` in `request.to_status`
    async fn move_task(&self, id: TaskId, request: &MoveRequest) -> Result<MoveResponse>;
}

#[async_trait]
impl<T: TaskApi + ?Sized> TaskApi for Arc<T> {
    async fn list_tasks(&self, query: &ListQuery) -> Result<Vec<Task>> {
        (**self).list_tasks(query).await
    }

    async fn create_task(&self, payload: &NewTask) -> Result<Task> {
        (**self).create_task(payload).await
    }

    async fn update_task(&self, id: TaskId, patch: &TaskPatch) -> Result<Task> {
        (**self).update_task(id, patch).await
    }

    async fn delete_task(&self, id: TaskId) -> Result<()> {
        (**self).delete_task(id).await
    }

    async fn move_task(&self, id: TaskId, request: &MoveRequest) -> Result<MoveResponse> {
        (**self).move_task(id, request).await
    }
}
