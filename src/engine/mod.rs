pub mod drag;
pub mod store;
pub mod sync;

pub use drag::{compute_move_intent, DragSession, DropTarget, LaneIndex, MoveIntent};
pub use store::{BoardState, TaskStore};
pub use sync::{MoveOutcome, SyncController, SyncEvent, WriteOp};
