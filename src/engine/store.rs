use crate::domain::{
    board::{BoardConfig, LaneCounts},
    projection::{project_with, LaneView, ViewQuery},
    ranking, Task, TaskId,
};
use tokio::sync::watch;

/// A published collection together with its publish counter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardState {
    pub tasks: Vec<Task>,
    pub version: u64,
}

/// Holds the visible (possibly optimistic) task collection.
///
/// Every replacement is published to subscribers. Publishing never fails,
/// even when nobody is subscribed. Dropping the store closes the channel.
#[derive(Debug)]
pub struct TaskStore {
    tx: watch::Sender<BoardState>,
}

impl TaskStore {
    pub fn new(tasks: Vec<Task>) -> Self {
        let (tx, _rx) = watch::channel(BoardState { tasks, version: 0 });
        Self { tx }
    }

    /// Deep copy of the visible collection
    pub fn snapshot(&self) -> Vec<Task> {
        ranking::clone_all(&self.tx.borrow().tasks)
    }

    pub fn version(&self) -> u64 {
        self.tx.borrow().version
    }

    pub fn get(&self, id: TaskId) -> Option<Task> {
        self.tx.borrow().tasks.iter().find(|t| t.id == id).cloned()
    }

    pub fn counts(&self) -> LaneCounts {
        LaneCounts::from_tasks(&self.tx.borrow().tasks)
    }

    /// Projects the visible collection for rendering
    pub fn view(&self, config: &BoardConfig, query: &ViewQuery) -> LaneView {
        project_with(config, &self.tx.borrow().tasks, query)
    }

    pub fn subscribe(&self) -> watch::Receiver<BoardState> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Publishes `tasks` wholesale and returns the new version
    pub fn replace(&self, tasks: Vec<Task>) -> u64 {
        let mut version = 0;
        self.tx.send_modify(|state| {
            state.tasks = tasks;
            state.version += 1;
            version = state.version;
        });
        version
    }

    /// Computes a replacement from the current collection while holding the
    /// write side, so no other publish can interleave. When `f` returns a new
    /// collection it is published and the previous one is handed back.
    pub fn apply<F>(&self, f: F) -> Option<Vec<Task>>
    where
        F: FnOnce(&[Task]) -> Option<Vec<Task>>,
    {
        let mut previous = None;
        self.tx.send_if_modified(|state| match f(&state.tasks) {
            Some(next) => {
                previous = Some(std::mem::replace(&mut state.tasks, next));
                state.version += 1;
                true
            }
            None => false,
        });
        previous
    }
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
