//! Optimistic moves with authoritative reconciliation.
//!
//! A move goes `Idle -> OptimisticallyApplied -> {Confirmed, RolledBack}`.
//! The optimistic collection is published before the request is sent. On
//! success the canonical list replaces it wholesale; on failure the snapshot
//! taken when the move started is restored, canonical state is re-fetched
//! as a second repair step, and the error is returned to the caller.
//!
//! Each move snapshots the collection visible when *it* starts, so chained
//! moves roll back to their own predecessor. Moves on different tasks may be
//! in flight together; whichever reconciles last wins.

use crate::{
    api::{ListQuery, MoveRequest, MoveResponse, TaskApi},
    config::SyncSettings,
    domain::{ranking, NewTask, Task, TaskId, TaskPatch},
    engine::{
        drag::{compute_move_intent, DropTarget, LaneIndex, MoveIntent},
        store::TaskStore,
    },
    error::{BoardError, Result},
};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// How a move request ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Applied locally and accepted by the backend
    Confirmed,
    /// Task unknown locally; nothing was sent
    Skipped,
    /// Drop maps to the task's current position; nothing was sent
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
    Create,
    Update,
    Delete,
}

/// Notifications for whoever renders toasts or spinners
#[derive(Debug, Clone)]
pub enum SyncEvent {
    MoveApplied {
        move_id: Uuid,
        intent: MoveIntent,
    },
    MoveConfirmed {
        move_id: Uuid,
        task_id: TaskId,
    },
    MoveRolledBack {
        move_id: Uuid,
        task_id: TaskId,
        error: String,
    },
    WriteFailed {
        operation: WriteOp,
        error: String,
    },
}

/// Releases a task's in-flight slot on every exit path
struct InFlight<'a> {
    set: &'a Mutex<HashSet<TaskId>>,
    id: TaskId,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set.lock().remove(&self.id);
    }
}

/// The only component allowed to reconcile the store with the backend
pub struct SyncController<A> {
    api: A,
    store: Arc<TaskStore>,
    settings: SyncSettings,
    query: Mutex<ListQuery>,
    in_flight: Mutex<HashSet<TaskId>>,
    writes_enabled: AtomicBool,
    events: broadcast::Sender<SyncEvent>,
}

impl<A: TaskApi> SyncController<A> {
    pub fn new(api: A, store: Arc<TaskStore>, settings: SyncSettings) -> Self {
        let (events, _) = broadcast::channel(settings.event_capacity.max(1));
        Self {
            api,
            store,
            settings,
            query: Mutex::new(ListQuery::default()),
            in_flight: Mutex::new(HashSet::new()),
            writes_enabled: AtomicBool::new(true),
            events,
        }
    }

    pub fn store(&self) -> &Arc<TaskStore> {
        &self.store
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Server-side filter used by every refresh
    pub fn set_query(&self, query: ListQuery) {
        *self.query.lock() = query;
    }

    pub fn query(&self) -> ListQuery {
        self.query.lock().clone()
    }

    /// Marks the backend (un)available. While unavailable every mutation
    /// fails with [`BoardError::WritesDisabled`] before touching the store.
    pub fn set_writes_enabled(&self, enabled: bool) {
        self.writes_enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn writes_enabled(&self) -> bool {
        self.writes_enabled.load(Ordering::SeqCst)
    }

    pub fn is_in_flight(&self, id: TaskId) -> bool {
        self.in_flight.lock().contains(&id)
    }

    /// Replaces the store with the canonical list
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<()> {
        let tasks = self.fetch_canonical().await?;
        self.publish_canonical(tasks);
        Ok(())
    }

    /// Resolves a drop against the visible board and moves accordingly.
    /// A drop outside every lane is [`MoveOutcome::Skipped`].
    pub async fn handle_drop(
        &self,
        dragged: TaskId,
        target: Option<DropTarget>,
    ) -> Result<MoveOutcome> {
        let index = LaneIndex::from_tasks(&self.store.snapshot());
        match compute_move_intent(dragged, target, &index) {
            Some(intent) => self.move_task(intent).await,
            None => Ok(MoveOutcome::Skipped),
        }
    }

    #[instrument(skip(self), fields(task = %intent.task_id))]
    pub async fn move_task(&self, intent: MoveIntent) -> Result<MoveOutcome> {
        self.ensure_writable()?;
        let _claim = self.claim(intent.task_id)?;

        let mut skipped = MoveOutcome::Skipped;
        let snapshot = self.store.apply(|current| match plan_move(current, &intent) {
            Ok(next) => Some(next),
            Err(outcome) => {
                skipped = outcome;
                None
            }
        });
        let Some(snapshot) = snapshot else {
            debug!(outcome = ?skipped, "move needs no request");
            return Ok(skipped);
        };

        let move_id = Uuid::new_v4();
        debug!(%move_id, lane = intent.to_lane.as_str(), rank = intent.to_rank, "optimistic move applied");
        self.emit(SyncEvent::MoveApplied { move_id, intent });

        let request = MoveRequest {
            to_status: intent.to_lane,
            to_index: intent.to_rank,
        };
        let result = match self.api.move_task(intent.task_id, &request).await {
            Ok(response) => self.confirm(response).await,
            Err(err) => Err(err),
        };

        match result {
            Ok(()) => {
                info!(%move_id, "move confirmed");
                self.emit(SyncEvent::MoveConfirmed {
                    move_id,
                    task_id: intent.task_id,
                });
                Ok(MoveOutcome::Confirmed)
            }
            Err(err) => {
                warn!(%move_id, error = %err, "move failed, rolling back");
                self.roll_back(snapshot).await;
                self.emit(SyncEvent::MoveRolledBack {
                    move_id,
                    task_id: intent.task_id,
                    error: err.to_string(),
                });
                Err(err)
            }
        }
    }

    #[instrument(skip(self, payload), fields(title = %payload.title))]
    pub async fn create_task(&self, payload: NewTask) -> Result<Task> {
        payload.validate()?;
        self.ensure_writable()?;

        let created = match self.api.create_task(&payload).await {
            Ok(task) => task,
            Err(err) => return Err(self.write_failed(WriteOp::Create, err)),
        };
        info!(task = %created.id, "task created");

        let record = created.clone();
        self.store
            .apply(move |current| Some(ranking::upsert(current, record)));
        self.refresh_after_write().await;
        Ok(created)
    }

    #[instrument(skip(self, patch))]
    pub async fn update_task(&self, id: TaskId, patch: TaskPatch) -> Result<Task> {
        patch.validate()?;
        self.ensure_writable()?;

        let updated = match self.api.update_task(id, &patch).await {
            Ok(task) => task,
            Err(err) => return Err(self.write_failed(WriteOp::Update, err)),
        };
        debug!(task = %id, "task updated");

        let record = updated.clone();
        self.store
            .apply(move |current| Some(ranking::upsert(current, record)));
        self.refresh_after_write().await;
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete_task(&self, id: TaskId) -> Result<()> {
        self.ensure_writable()?;

        if let Err(err) = self.api.delete_task(id).await {
            return Err(self.write_failed(WriteOp::Delete, err));
        }
        info!(task = %id, "task deleted");

        self.store
            .apply(|current| Some(ranking::remove(current, id)));
        self.refresh_after_write().await;
        Ok(())
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.writes_enabled() {
            Ok(())
        } else {
            Err(BoardError::WritesDisabled)
        }
    }

    fn claim(&self, id: TaskId) -> Result<InFlight<'_>> {
        let mut set = self.in_flight.lock();
        if !set.insert(id) {
            return Err(BoardError::MoveInFlight(id.to_string()));
        }
        Ok(InFlight {
            set: &self.in_flight,
            id,
        })
    }

    async fn confirm(&self, response: MoveResponse) -> Result<()> {
        let canonical = match response {
            MoveResponse::List(list) if !self.settings.refetch_after_move => list,
            _ => self.fetch_canonical().await?,
        };
        self.publish_canonical(canonical);
        Ok(())
    }

    async fn roll_back(&self, snapshot: Vec<Task>) {
        self.store.replace(snapshot);
        match self.fetch_canonical().await {
            Ok(tasks) => self.publish_canonical(tasks),
            Err(err) => warn!(error = %err, "refresh after rollback failed, keeping snapshot"),
        }
    }

    async fn fetch_canonical(&self) -> Result<Vec<Task>> {
        let query = self.query();
        self.api.list_tasks(&query).await
    }

    fn publish_canonical(&self, tasks: Vec<Task>) {
        if !ranking::ranks_are_contiguous(&tasks) {
            warn!("canonical list has non-contiguous ranks");
        }
        let version = self.store.replace(tasks);
        debug!(version, "canonical state published");
    }

    async fn refresh_after_write(&self) {
        if !self.settings.refresh_after_write {
            return;
        }
        if let Err(err) = self.refresh().await {
            warn!(error = %err, "refresh after write failed");
        }
    }

    fn write_failed(&self, operation: WriteOp, err: BoardError) -> BoardError {
        warn!(?operation, error = %err, "write failed");
        self.emit(SyncEvent::WriteFailed {
            operation,
            error: err.to_string(),
        });
        err
    }

    fn emit(&self, event: SyncEvent) {
        // no listeners is fine
        let _ = self.events.send(event);
    }
}

impl<A: TaskApi + 'static> SyncController<A> {
    /// Runs the move on the runtime so it reconciles even if the caller
    /// stops waiting for it.
    pub fn spawn_move(self: &Arc<Self>, intent: MoveIntent) -> JoinHandle<Result<MoveOutcome>> {
        let controller = Arc::clone(self);
        tokio::spawn(async move { controller.move_task(intent).await })
    }
}

/// The optimistic collection for `intent`, or why no request is needed
fn plan_move(current: &[Task], intent: &MoveIntent) -> std::result::Result<Vec<Task>, MoveOutcome> {
    if ranking::position_of(current, intent.task_id).is_none() {
        return Err(MoveOutcome::Skipped);
    }
    let next = ranking::move_local(current, intent.task_id, intent.to_lane, intent.to_rank);
    if next == ranking::normalize_ranks(current) {
        return Err(MoveOutcome::Unchanged);
    }
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MemoryApi;
    use crate::domain::Lane;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    /// Canonical backend with failure injection and per-task gates that
    /// hold a move request until released.
    #[derive(Default)]
    struct ScriptedApi {
        backend: MemoryApi,
        failing_moves: Mutex<HashSet<TaskId>>,
        failing_writes: AtomicBool,
        failing_lists: AtomicBool,
        gates: Mutex<HashMap<TaskId, Arc<Notify>>>,
        move_calls: AtomicUsize,
        list_calls: AtomicUsize,
    }

    impl ScriptedApi {
        fn with_tasks(tasks: Vec<Task>) -> Self {
            Self {
                backend: MemoryApi::with_tasks(tasks),
                ..Self::default()
            }
        }

        fn fail_move(&self, id: TaskId) {
            self.failing_moves.lock().insert(id);
        }

        fn gate(&self, id: TaskId) -> Arc<Notify> {
            let gate = Arc::new(Notify::new());
            self.gates.lock().insert(id, Arc::clone(&gate));
            gate
        }
    }

    #[async_trait]
    impl TaskApi for ScriptedApi {
        async fn list_tasks(&self, query: &ListQuery) -> Result<Vec<Task>> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            if self.failing_lists.load(Ordering::SeqCst) {
                return Err(BoardError::Transport("list unavailable".to_string()));
            }
            self.backend.list_tasks(query).await
        }

        async fn create_task(&self, payload: &NewTask) -> Result<Task> {
            if self.failing_writes.load(Ordering::SeqCst) {
                return Err(BoardError::Rejected("create refused".to_string()));
            }
            self.backend.create_task(payload).await
        }

        async fn update_task(&self, id: TaskId, patch: &TaskPatch) -> Result<Task> {
            if self.failing_writes.load(Ordering::SeqCst) {
                return Err(BoardError::Rejected("update refused".to_string()));
            }
            self.backend.update_task(id, patch).await
        }

        async fn delete_task(&self, id: TaskId) -> Result<()> {
            if self.failing_writes.load(Ordering::SeqCst) {
                return Err(BoardError::Transport("connection reset".to_string()));
            }
            self.backend.delete_task(id).await
        }

        async fn move_task(&self, id: TaskId, request: &MoveRequest) -> Result<MoveResponse> {
            self.move_calls.fetch_add(1, Ordering::SeqCst);
            let gate = self.gates.lock().get(&id).cloned();
            if let Some(gate) = gate {
                gate.notified().await;
            }
            if self.failing_moves.lock().contains(&id) {
                return Err(BoardError::Conflict(format!("move of {} rejected", id)));
            }
            self.backend.move_task(id, request).await
        }
    }

    type Controller = SyncController<Arc<ScriptedApi>>;

    fn task(id: u64, lane: Lane, rank: usize) -> Task {
        Task::new(TaskId::new(id), format!("Task {}", id)).in_lane(lane, rank)
    }

    fn id(value: u64) -> TaskId {
        TaskId::new(value)
    }

    async fn setup(tasks: Vec<Task>) -> (Arc<ScriptedApi>, Arc<Controller>) {
        let api = Arc::new(ScriptedApi::with_tasks(tasks));
        let store = Arc::new(TaskStore::default());
        let controller = Arc::new(SyncController::new(
            Arc::clone(&api),
            store,
            SyncSettings::default(),
        ));
        controller.refresh().await.unwrap();
        (api, controller)
    }

    fn lane_ids(controller: &Controller, lane: Lane) -> Vec<u64> {
        let tasks = controller.store().snapshot();
        ranking::lane_members(&tasks, lane)
            .into_iter()
            .map(|t| t.id.value())
            .collect()
    }

    fn ranks(controller: &Controller, lane: Lane) -> Vec<usize> {
        let tasks = controller.store().snapshot();
        ranking::lane_members(&tasks, lane)
            .into_iter()
            .map(|t| t.rank)
            .collect()
    }

    async fn wait_for_applied(rx: &mut broadcast::Receiver<SyncEvent>) -> MoveIntent {
        loop {
            if let SyncEvent::MoveApplied { intent, .. } = rx.recv().await.unwrap() {
                return intent;
            }
        }
    }

    fn drain(rx: &mut broadcast::Receiver<SyncEvent>) -> Vec<SyncEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_reorder_within_lane_confirms() {
        let (api, controller) = setup(vec![
            task(1, Lane::Todo, 0),
            task(2, Lane::Todo, 1),
            task(3, Lane::Todo, 2),
        ])
        .await;

        let outcome = controller
            .move_task(MoveIntent::new(id(3), Lane::Todo, 0))
            .await
            .unwrap();

        assert_eq!(outcome, MoveOutcome::Confirmed);
        assert_eq!(lane_ids(&controller, Lane::Todo), vec![3, 1, 2]);
        assert_eq!(ranks(&controller, Lane::Todo), vec![0, 1, 2]);
        assert_eq!(api.move_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cross_lane_append_confirms() {
        let (_api, controller) = setup(vec![
            task(1, Lane::Todo, 0),
            task(2, Lane::Todo, 1),
            task(3, Lane::InProgress, 0),
        ])
        .await;

        controller
            .move_task(MoveIntent::new(id(1), Lane::InProgress, 1))
            .await
            .unwrap();

        assert_eq!(lane_ids(&controller, Lane::Todo), vec![2]);
        assert_eq!(ranks(&controller, Lane::Todo), vec![0]);
        assert_eq!(lane_ids(&controller, Lane::InProgress), vec![3, 1]);
        assert_eq!(ranks(&controller, Lane::InProgress), vec![0, 1]);
    }

    #[tokio::test]
    async fn test_move_to_empty_lane_clamps() {
        let (_api, controller) = setup(vec![task(1, Lane::Todo, 0), task(2, Lane::Todo, 1)]).await;

        controller
            .move_task(MoveIntent::new(id(1), Lane::Completed, 9))
            .await
            .unwrap();

        assert_eq!(lane_ids(&controller, Lane::Completed), vec![1]);
        assert_eq!(ranks(&controller, Lane::Completed), vec![0]);
    }

    #[tokio::test]
    async fn test_optimistic_state_visible_before_confirmation() {
        let (api, controller) = setup(vec![task(1, Lane::Todo, 0), task(2, Lane::Todo, 1)]).await;
        let gate = api.gate(id(2));
        let mut events = controller.subscribe_events();

        let handle = controller.spawn_move(MoveIntent::new(id(2), Lane::Todo, 0));
        wait_for_applied(&mut events).await;

        assert_eq!(lane_ids(&controller, Lane::Todo), vec![2, 1]);
        assert!(controller.is_in_flight(id(2)));
        // the backend has not moved anything yet
        assert_eq!(
            ranking::position_of(&api.backend.tasks(), id(2)),
            Some((Lane::Todo, 1))
        );

        gate.notify_one();
        assert_eq!(handle.await.unwrap().unwrap(), MoveOutcome::Confirmed);
        assert_eq!(lane_ids(&controller, Lane::Todo), vec![2, 1]);
        assert!(!controller.is_in_flight(id(2)));
    }

    #[tokio::test]
    async fn test_failed_move_rolls_back_and_reports_once() {
        let (api, controller) = setup(vec![task(1, Lane::Todo, 0), task(2, Lane::Todo, 1)]).await;
        api.fail_move(id(2));
        let gate = api.gate(id(2));
        let mut events = controller.subscribe_events();

        let handle = controller.spawn_move(MoveIntent::new(id(2), Lane::Todo, 0));
        wait_for_applied(&mut events).await;
        assert_eq!(lane_ids(&controller, Lane::Todo), vec![2, 1]);

        gate.notify_one();
        let err = handle.await.unwrap().unwrap_err();

        assert!(matches!(err, BoardError::Conflict(_)));
        assert_eq!(lane_ids(&controller, Lane::Todo), vec![1, 2]);
        assert_eq!(ranks(&controller, Lane::Todo), vec![0, 1]);

        let rolled_back = drain(&mut events)
            .into_iter()
            .filter(|e| matches!(e, SyncEvent::MoveRolledBack { .. }))
            .count();
        assert_eq!(rolled_back, 1);
        assert!(!controller.is_in_flight(id(2)));
    }

    #[tokio::test]
    async fn test_rollback_keeps_snapshot_when_refresh_fails() {
        let (api, controller) = setup(vec![task(1, Lane::Todo, 0), task(2, Lane::Todo, 1)]).await;
        let before = controller.store().snapshot();
        api.fail_move(id(1));
        api.failing_lists.store(true, Ordering::SeqCst);

        let result = controller
            .move_task(MoveIntent::new(id(1), Lane::Completed, 0))
            .await;

        assert!(result.is_err());
        assert_eq!(controller.store().snapshot(), before);
    }

    #[tokio::test]
    async fn test_refresh_failure_after_accepted_move_rolls_back() {
        let (api, controller) = setup(vec![task(1, Lane::Todo, 0), task(2, Lane::Todo, 1)]).await;
        let before = controller.store().snapshot();
        api.failing_lists.store(true, Ordering::SeqCst);

        let err = controller
            .move_task(MoveIntent::new(id(2), Lane::Todo, 0))
            .await
            .unwrap_err();

        assert!(matches!(err, BoardError::Transport(_)));
        assert_eq!(controller.store().snapshot(), before);
        assert!(ranking::ranks_are_contiguous(&controller.store().snapshot()));
    }

    #[tokio::test]
    async fn test_chained_moves_roll_back_to_their_own_snapshot() {
        let (api, controller) = setup(vec![
            task(1, Lane::Todo, 0),
            task(2, Lane::Todo, 1),
            task(3, Lane::Todo, 2),
        ])
        .await;
        let first_gate = api.gate(id(3));
        let second_gate = api.gate(id(1));
        api.fail_move(id(1));
        let mut events = controller.subscribe_events();

        let first = controller.spawn_move(MoveIntent::new(id(3), Lane::Todo, 0));
        wait_for_applied(&mut events).await;
        assert_eq!(lane_ids(&controller, Lane::Todo), vec![3, 1, 2]);

        let second = controller.spawn_move(MoveIntent::new(id(1), Lane::Completed, 0));
        wait_for_applied(&mut events).await;
        assert_eq!(lane_ids(&controller, Lane::Todo), vec![3, 2]);

        // second fails while the canonical list is unreachable: it must
        // restore the board as it looked when it started, not the initial one
        api.failing_lists.store(true, Ordering::SeqCst);
        second_gate.notify_one();
        assert!(second.await.unwrap().is_err());
        assert_eq!(lane_ids(&controller, Lane::Todo), vec![3, 1, 2]);
        assert!(lane_ids(&controller, Lane::Completed).is_empty());

        api.failing_lists.store(false, Ordering::SeqCst);
        first_gate.notify_one();
        assert_eq!(first.await.unwrap().unwrap(), MoveOutcome::Confirmed);
        assert_eq!(lane_ids(&controller, Lane::Todo), vec![3, 1, 2]);
        assert_eq!(ranks(&controller, Lane::Todo), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_concurrent_moves_last_reconciliation_wins() {
        let (api, controller) = setup(vec![
            task(1, Lane::Todo, 0),
            task(2, Lane::Todo, 1),
            task(3, Lane::InProgress, 0),
        ])
        .await;
        let gate_one = api.gate(id(1));
        let gate_three = api.gate(id(3));
        let mut events = controller.subscribe_events();

        let move_one = controller.spawn_move(MoveIntent::new(id(1), Lane::Completed, 0));
        wait_for_applied(&mut events).await;
        let move_three = controller.spawn_move(MoveIntent::new(id(3), Lane::Completed, 0));
        wait_for_applied(&mut events).await;

        gate_three.notify_one();
        move_three.await.unwrap().unwrap();
        gate_one.notify_one();
        move_one.await.unwrap().unwrap();

        // canonical order: 3 was applied first, then 1 was placed at rank 0
        assert_eq!(lane_ids(&controller, Lane::Completed), vec![1, 3]);
        assert_eq!(lane_ids(&controller, Lane::Todo), vec![2]);
        let canonical = api.backend.list_tasks(&ListQuery::default()).await.unwrap();
        assert_eq!(controller.store().snapshot(), canonical);
    }

    #[tokio::test]
    async fn test_second_move_of_same_task_rejected_while_in_flight() {
        let (api, controller) = setup(vec![task(1, Lane::Todo, 0), task(2, Lane::Todo, 1)]).await;
        let gate = api.gate(id(1));
        let mut events = controller.subscribe_events();

        let first = controller.spawn_move(MoveIntent::new(id(1), Lane::InProgress, 0));
        wait_for_applied(&mut events).await;
        let visible = controller.store().snapshot();

        let err = controller
            .move_task(MoveIntent::new(id(1), Lane::Completed, 0))
            .await
            .unwrap_err();

        assert!(matches!(err, BoardError::MoveInFlight(_)));
        assert_eq!(controller.store().snapshot(), visible);

        gate.notify_one();
        first.await.unwrap().unwrap();
        assert_eq!(api.move_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_task_is_skipped_without_request() {
        let (api, controller) = setup(vec![task(1, Lane::Todo, 0)]).await;
        let version = controller.store().version();

        let outcome = controller
            .move_task(MoveIntent::new(id(77), Lane::Todo, 0))
            .await
            .unwrap();

        assert_eq!(outcome, MoveOutcome::Skipped);
        assert_eq!(controller.store().version(), version);
        assert_eq!(api.move_calls.load(Ordering::SeqCst), 0);
        assert!(!controller.is_in_flight(id(77)));
    }

    #[tokio::test]
    async fn test_drop_on_current_position_is_unchanged() {
        let (api, controller) = setup(vec![task(1, Lane::Todo, 0), task(2, Lane::Todo, 1)]).await;

        let outcome = controller
            .handle_drop(id(2), Some(DropTarget::Lane(Lane::Todo)))
            .await
            .unwrap();

        assert_eq!(outcome, MoveOutcome::Unchanged);
        assert_eq!(api.move_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_handle_drop_on_item_and_outside() {
        let (_api, controller) = setup(vec![
            task(1, Lane::Todo, 0),
            task(2, Lane::InProgress, 0),
            task(3, Lane::InProgress, 1),
        ])
        .await;

        let outcome = controller
            .handle_drop(id(1), Some(DropTarget::Item(id(3))))
            .await
            .unwrap();
        assert_eq!(outcome, MoveOutcome::Confirmed);
        assert_eq!(lane_ids(&controller, Lane::InProgress), vec![2, 1, 3]);

        let outcome = controller.handle_drop(id(2), None).await.unwrap();
        assert_eq!(outcome, MoveOutcome::Skipped);

        let outcome = controller
            .handle_drop(id(2), Some(DropTarget::Item(id(404))))
            .await
            .unwrap();
        assert_eq!(outcome, MoveOutcome::Confirmed);
        assert_eq!(lane_ids(&controller, Lane::InProgress), vec![1, 3, 2]);
    }

    #[tokio::test]
    async fn test_move_reconciles_without_any_listener() {
        let (api, controller) = setup(vec![task(1, Lane::Todo, 0), task(2, Lane::Todo, 1)]).await;
        assert_eq!(controller.store().subscriber_count(), 0);

        let handle = controller.spawn_move(MoveIntent::new(id(2), Lane::Completed, 0));
        drop(handle);

        for _ in 0..100 {
            if !controller.is_in_flight(id(2)) && api.list_calls.load(Ordering::SeqCst) >= 2 {
                break;
            }
            tokio::task::yield_now().await;
        }

        assert_eq!(lane_ids(&controller, Lane::Completed), vec![2]);
        let canonical = api.backend.list_tasks(&ListQuery::default()).await.unwrap();
        assert_eq!(controller.store().snapshot(), canonical);
    }

    #[tokio::test]
    async fn test_list_response_used_when_refetch_disabled() {
        let api = Arc::new(ScriptedApi {
            backend: MemoryApi::with_tasks(vec![task(1, Lane::Todo, 0), task(2, Lane::Todo, 1)])
                .with_list_responses(),
            ..ScriptedApi::default()
        });
        let settings = SyncSettings {
            refetch_after_move: false,
            ..SyncSettings::default()
        };
        let controller =
            SyncController::new(Arc::clone(&api), Arc::new(TaskStore::default()), settings);
        controller.refresh().await.unwrap();
        let lists_before = api.list_calls.load(Ordering::SeqCst);

        controller
            .move_task(MoveIntent::new(id(2), Lane::Todo, 0))
            .await
            .unwrap();

        assert_eq!(api.list_calls.load(Ordering::SeqCst), lists_before);
        assert_eq!(lane_ids(&controller, Lane::Todo), vec![2, 1]);
    }

    #[tokio::test]
    async fn test_writes_disabled_blocks_every_mutation() {
        let (api, controller) = setup(vec![task(1, Lane::Todo, 0)]).await;
        controller.set_writes_enabled(false);
        let before = controller.store().snapshot();

        assert!(matches!(
            controller
                .move_task(MoveIntent::new(id(1), Lane::Completed, 0))
                .await,
            Err(BoardError::WritesDisabled)
        ));
        assert!(matches!(
            controller.create_task(NewTask::new("New")).await,
            Err(BoardError::WritesDisabled)
        ));
        assert!(matches!(
            controller.delete_task(id(1)).await,
            Err(BoardError::WritesDisabled)
        ));

        assert_eq!(controller.store().snapshot(), before);
        assert_eq!(api.move_calls.load(Ordering::SeqCst), 0);

        controller.set_writes_enabled(true);
        assert!(controller.writes_enabled());
    }

    #[tokio::test]
    async fn test_create_validates_before_request() {
        let (api, controller) = setup(vec![]).await;
        let version = controller.store().version();

        let err = controller.create_task(NewTask::new("  ")).await.unwrap_err();

        assert!(matches!(err, BoardError::Validation(_)));
        assert_eq!(controller.store().version(), version);
        assert!(api.backend.tasks().is_empty());
    }

    #[tokio::test]
    async fn test_create_update_delete_round_trip() {
        let (_api, controller) = setup(vec![task(1, Lane::Todo, 0)]).await;

        let created = controller
            .create_task(NewTask::new("Order gloves").with_status(Lane::InProgress))
            .await
            .unwrap();
        assert_eq!(created.id, id(2));
        assert_eq!(lane_ids(&controller, Lane::InProgress), vec![2]);

        let updated = controller
            .update_task(
                created.id,
                TaskPatch {
                    title: Some("Order nitrile gloves".to_string()),
                    status: Some(Lane::Todo),
                    ..TaskPatch::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, Lane::Todo);
        assert_eq!(lane_ids(&controller, Lane::Todo), vec![1, 2]);
        assert_eq!(
            controller.store().get(created.id).map(|t| t.title),
            Some("Order nitrile gloves".to_string())
        );

        controller.delete_task(id(1)).await.unwrap();
        assert_eq!(lane_ids(&controller, Lane::Todo), vec![2]);
        assert_eq!(ranks(&controller, Lane::Todo), vec![0]);
    }

    #[tokio::test]
    async fn test_failed_writes_leave_store_untouched() {
        let (api, controller) = setup(vec![task(1, Lane::Todo, 0)]).await;
        api.failing_writes.store(true, Ordering::SeqCst);
        let before = controller.store().snapshot();
        let mut events = controller.subscribe_events();

        assert!(controller.create_task(NewTask::new("x")).await.is_err());
        assert!(controller
            .update_task(id(1), TaskPatch::default())
            .await
            .is_err());
        let err = controller.delete_task(id(1)).await.unwrap_err();
        assert!(err.is_retryable());

        assert_eq!(controller.store().snapshot(), before);
        let failures: Vec<WriteOp> = drain(&mut events)
            .into_iter()
            .filter_map(|e| match e {
                SyncEvent::WriteFailed { operation, .. } => Some(operation),
                _ => None,
            })
            .collect();
        assert_eq!(failures, vec![WriteOp::Create, WriteOp::Update, WriteOp::Delete]);
    }

    #[tokio::test]
    async fn test_refresh_uses_server_side_query() {
        let (_api, controller) = setup(vec![
            task(1, Lane::Todo, 0),
            task(2, Lane::Completed, 0),
        ])
        .await;

        controller.set_query(ListQuery {
            status: Some(Lane::Completed),
            ..ListQuery::default()
        });
        controller.refresh().await.unwrap();

        assert_eq!(controller.store().counts().all, 1);
        assert_eq!(controller.query().status, Some(Lane::Completed));
    }
}
