//! Per-lane rank bookkeeping.
//!
//! Every function here is pure: it takes a task collection and returns a new
//! one. After [`normalize_ranks`] the ranks of each lane are exactly
//! `0..n` with no gaps or duplicates. Ties are broken by id, so normalizing
//! twice gives the same result as normalizing once.

use crate::domain::task::{Lane, Task, TaskId};

/// Deep copy of the collection, used as a rollback snapshot
pub fn clone_all(tasks: &[Task]) -> Vec<Task> {
    tasks.to_vec()
}

/// Returns a copy of `tasks` where each lane is re-ranked `0..n` by
/// `(rank, id)`. Vector order is preserved; only `rank` changes.
pub fn normalize_ranks(tasks: &[Task]) -> Vec<Task> {
    let mut next = clone_all(tasks);
    normalize_in_place(&mut next);
    next
}

fn normalize_in_place(tasks: &mut [Task]) {
    for lane in Lane::ALL {
        let mut members: Vec<usize> = tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.status == lane)
            .map(|(i, _)| i)
            .collect();
        members.sort_by_key(|&i| (tasks[i].rank, tasks[i].id));
        for (rank, i) in members.into_iter().enumerate() {
            tasks[i].rank = rank;
        }
    }
}

/// Number of tasks currently in `lane`
pub fn lane_len(tasks: &[Task], lane: Lane) -> usize {
    tasks.iter().filter(|t| t.status == lane).count()
}

/// Lane and rank of a task, if present
pub fn position_of(tasks: &[Task], id: TaskId) -> Option<(Lane, usize)> {
    tasks.iter().find(|t| t.id == id).map(|t| (t.status, t.rank))
}

/// Checks the per-lane invariant: ranks are exactly `0..n` for each lane
pub fn ranks_are_contiguous(tasks: &[Task]) -> bool {
    Lane::ALL.iter().all(|&lane| {
        let mut ranks: Vec<usize> = tasks
            .iter()
            .filter(|t| t.status == lane)
            .map(|t| t.rank)
            .collect();
        ranks.sort_unstable();
        ranks.iter().enumerate().all(|(expected, &rank)| rank == expected)
    })
}

/// Moves `task_id` to `to_rank` in `to_lane`.
///
/// The rank is clamped to `[0, n]` where `n` counts the destination lane
/// without the moved task. An unknown id returns the input unchanged.
pub fn move_local(tasks: &[Task], task_id: TaskId, to_lane: Lane, to_rank: usize) -> Vec<Task> {
    let mut next = normalize_ranks(tasks);
    let Some(idx) = next.iter().position(|t| t.id == task_id) else {
        return clone_all(tasks);
    };

    let from_lane = next[idx].status;
    let from_rank = next[idx].rank;

    // Close the gap left in the source lane
    for t in next.iter_mut() {
        if t.status == from_lane && t.id != task_id && t.rank > from_rank {
            t.rank -= 1;
        }
    }

    next[idx].status = to_lane;

    let dest_count = next
        .iter()
        .filter(|t| t.status == to_lane && t.id != task_id)
        .count();
    let clamped = to_rank.min(dest_count);

    // Open a slot in the destination lane
    for t in next.iter_mut() {
        if t.status == to_lane && t.id != task_id && t.rank >= clamped {
            t.rank += 1;
        }
    }

    next[idx].rank = clamped;

    normalize_in_place(&mut next);
    next
}

/// Appends `task` to the end of its lane, replacing any record with the same id
pub fn insert_at_end(tasks: &[Task], mut task: Task) -> Vec<Task> {
    let mut next: Vec<Task> = tasks.iter().filter(|t| t.id != task.id).cloned().collect();
    task.rank = lane_len(&next, task.status);
    next.push(task);
    next
}

/// Replaces the record with the same id, or adds it, keeping its rank as a
/// placement hint. Lanes are normalized afterwards.
pub fn upsert(tasks: &[Task], task: Task) -> Vec<Task> {
    let mut next = clone_all(tasks);
    match next.iter_mut().find(|t| t.id == task.id) {
        Some(existing) => *existing = task,
        None => next.push(task),
    }
    normalize_in_place(&mut next);
    next
}

/// Removes a task and closes the gap it leaves behind
pub fn remove(tasks: &[Task], task_id: TaskId) -> Vec<Task> {
    let remaining: Vec<Task> = tasks.iter().filter(|t| t.id != task_id).cloned().collect();
    normalize_ranks(&remaining)
}

/// Tasks of one lane in rank order, ties by id
pub fn lane_members(tasks: &[Task], lane: Lane) -> Vec<&Task> {
    let mut members: Vec<&Task> = tasks.iter().filter(|t| t.status == lane).collect();
    members.sort_by_key(|t| (t.rank, t.id));
    members
}
