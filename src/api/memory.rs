use crate::{
    api::{ListQuery, MoveRequest, MoveResponse, TaskApi},
    domain::{
        ranking::{self, lane_len},
        sort_tasks, NewTask, Task, TaskFilter, TaskId, TaskPatch,
    },
    error::{BoardError, Result},
};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tracing::debug;

#[derive(Debug)]
struct BackendState {
    tasks: Vec<Task>,
    next_task_number: u64,
}

/// In-process backend holding the canonical board.
///
/// Ids are issued from a counter and never reused. New tasks go to the end
/// of their lane and every write leaves each lane ranked `0..n`.
#[derive(Debug)]
pub struct MemoryApi {
    state: Mutex<BackendState>,
    list_responses: bool,
}

impl MemoryApi {
    pub fn new() -> Self {
        Self::with_tasks(Vec::new())
    }

    /// Seeds the backend. Ranks are normalized and the id counter starts
    /// past the highest seeded id.
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        let next_task_number = tasks.iter().map(|t| t.id.value()).max().unwrap_or(0) + 1;
        Self {
            state: Mutex::new(BackendState {
                tasks: ranking::normalize_ranks(&tasks),
                next_task_number,
            }),
            list_responses: false,
        }
    }

    /// Answer moves with the full list instead of the moved record
    pub fn with_list_responses(mut self) -> Self {
        self.list_responses = true;
        self
    }

    /// Current canonical collection
    pub fn tasks(&self) -> Vec<Task> {
        self.state.lock().tasks.clone()
    }

    fn next_task_id(state: &mut BackendState) -> TaskId {
        let id = TaskId::new(state.next_task_number);
        state.next_task_number += 1;
        id
    }
}

impl Default for MemoryApi {
    fn default() -> Self {
        Self::new()
    }
}

/// Lane, then rank, then id
fn canonical_order(tasks: &mut [Task]) {
    tasks.sort_by_key(|t| (t.status, t.rank, t.id));
}

fn find(tasks: &[Task], id: TaskId) -> Result<&Task> {
    tasks
        .iter()
        .find(|t| t.id == id)
        .ok_or_else(|| BoardError::TaskNotFound(id.to_string()))
}

#[async_trait]
impl TaskApi for MemoryApi {
    async fn list_tasks(&self, query: &ListQuery) -> Result<Vec<Task>> {
        let state = self.state.lock();
        let filter = TaskFilter {
            search: query.search.clone(),
            ..TaskFilter::default()
        };

        let mut tasks: Vec<Task> = state
            .tasks
            .iter()
            .filter(|t| query.status.map_or(true, |lane| t.status == lane))
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();

        match query.sort {
            Some(field) => sort_tasks(&mut tasks, field, query.order.unwrap_or_default()),
            None => canonical_order(&mut tasks),
        }
        Ok(tasks)
    }

    async fn create_task(&self, payload: &NewTask) -> Result<Task> {
        payload.validate()?;
        let mut state = self.state.lock();

        let id = Self::next_task_id(&mut state);
        let mut task = Task::new(id, payload.title.clone()).in_lane(payload.lane(), 0);
        task.description = payload.description.clone();
        task.priority = payload.priority;
        task.assignee = payload.assignee.clone();
        task.label = payload.label.clone();
        task.due_date = payload.due_date;

        state.tasks = ranking::insert_at_end(&state.tasks, task);
        let created = find(&state.tasks, id)?.clone();
        debug!(task = %id, lane = %created.status, rank = created.rank, "created task");
        Ok(created)
    }

    async fn update_task(&self, id: TaskId, patch: &TaskPatch) -> Result<Task> {
        patch.validate()?;
        let mut state = self.state.lock();

        let mut task = find(&state.tasks, id)?.clone();
        patch.apply_metadata(&mut task)?;

        match patch.status {
            Some(lane) if lane != task.status => {
                let end = lane_len(&state.tasks, lane);
                let moved = ranking::move_local(&state.tasks, id, lane, end);
                let placed = find(&moved, id)?;
                task.status = placed.status;
                task.rank = placed.rank;
                task.updated_at = Utc::now();
                state.tasks = ranking::upsert(&moved, task);
            }
            _ => state.tasks = ranking::upsert(&state.tasks, task),
        }

        Ok(find(&state.tasks, id)?.clone())
    }

    async fn delete_task(&self, id: TaskId) -> Result<()> {
        let mut state = self.state.lock();
        find(&state.tasks, id)?;
        state.tasks = ranking::remove(&state.tasks, id);
        debug!(task = %id, "deleted task");
        Ok(())
    }

    async fn move_task(&self, id: TaskId, request: &MoveRequest) -> Result<MoveResponse> {
        let mut state = self.state.lock();
        find(&state.tasks, id)?;

        let mut moved =
            ranking::move_local(&state.tasks, id, request.to_status, request.to_index);
        if let Some(task) = moved.iter_mut().find(|t| t.id == id) {
            task.updated_at = Utc::now();
        }
        state.tasks = moved;

        if self.list_responses {
            let mut list = state.tasks.clone();
            canonical_order(&mut list);
            Ok(MoveResponse::List(list))
        } else {
            Ok(MoveResponse::Task(find(&state.tasks, id)?.clone()))
        }
    }
}
