use crate::domain::task::Task;
use crate::error::BoardError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

/// Fields available for sorting tasks for display.
///
/// Serialized with the backend's query keys (`order`, `createdAt`, ...);
/// the short names are accepted as aliases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    /// Manual drag order
    #[default]
    #[serde(rename = "order", alias = "rank")]
    Rank,
    #[serde(rename = "createdAt", alias = "created")]
    Created,
    #[serde(rename = "updatedAt", alias = "updated")]
    Updated,
    #[serde(alias = "due")]
    DueDate,
    Priority,
    Title,
    Id,
}

/// Sort order direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    #[serde(alias = "asc")]
    Ascending,
    #[serde(alias = "desc")]
    Descending,
}

impl FromStr for SortField {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "order" | "rank" => Ok(SortField::Rank),
            "createdat" | "created" => Ok(SortField::Created),
            "updatedat" | "updated" => Ok(SortField::Updated),
            "duedate" | "due" => Ok(SortField::DueDate),
            "priority" => Ok(SortField::Priority),
            "title" => Ok(SortField::Title),
            "id" => Ok(SortField::Id),
            _ => Err(BoardError::InvalidSortField(s.to_string())),
        }
    }
}

impl FromStr for SortOrder {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortOrder::Ascending),
            "desc" | "descending" => Ok(SortOrder::Descending),
            _ => Err(BoardError::InvalidSortOrder(s.to_string())),
        }
    }
}

/// Sorts tasks in-place for display.
///
/// Equal keys always fall back to `id` ascending, whatever the direction,
/// so the output is deterministic. Tasks without a due date or priority
/// sort after tasks that have one. `rank` itself is never modified.
///
/// # Examples
/// ```
/// use taskboard_core::domain::sorting::{sort_tasks, SortField, SortOrder};
/// use taskboard_core::domain::task::{Task, TaskId};
///
/// let mut tasks = vec![
///     Task::new(TaskId::new(3), "C".to_string()),
///     Task::new(TaskId::new(1), "A".to_string()),
///     Task::new(TaskId::new(2), "B".to_string()),
/// ];
///
/// sort_tasks(&mut tasks, SortField::Title, SortOrder::Descending);
/// assert_eq!(tasks[0].title, "C");
/// ```
pub fn sort_tasks(tasks: &mut [Task], field: SortField, order: SortOrder) {
    tasks.sort_by(|a, b| compare_tasks(a, b, field, order));
}

/// Comparator behind [`sort_tasks`]
pub fn compare_tasks(a: &Task, b: &Task, field: SortField, order: SortOrder) -> Ordering {
    let directed = |cmp: Ordering| match order {
        SortOrder::Ascending => cmp,
        SortOrder::Descending => cmp.reverse(),
    };

    let cmp = match field {
        SortField::Rank => directed(a.rank.cmp(&b.rank)),
        SortField::Created => directed(a.created_at.cmp(&b.created_at)),
        SortField::Updated => directed(a.updated_at.cmp(&b.updated_at)),
        SortField::DueDate => compare_option(a.due_date, b.due_date, directed),
        SortField::Priority => compare_option(a.priority, b.priority, directed),
        SortField::Title => directed(a.title.to_lowercase().cmp(&b.title.to_lowercase())),
        SortField::Id => directed(a.id.cmp(&b.id)),
    };

    cmp.then_with(|| a.id.cmp(&b.id))
}

/// Compare optional keys with `None` always sorting to the end
fn compare_option<T: Ord>(
    a: Option<T>,
    b: Option<T>,
    directed: impl Fn(Ordering) -> Ordering,
) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => directed(a.cmp(&b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
