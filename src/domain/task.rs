use crate::error::{BoardError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Maximum number of characters in a task title
pub const MAX_TITLE_LENGTH: usize = 256;

/// Server-assigned identifier for a task. Never reused once issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(u64);

impl TaskId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl FromStr for TaskId {
    type Err = BoardError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .ok()
            .filter(|&value| value > 0)
            .map(Self)
            .ok_or_else(|| BoardError::InvalidTaskId(s.to_string()))
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TaskId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Lane (column) a task lives in. Declaration order is board order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Lane {
    Todo,
    InProgress,
    Completed,
}

impl Lane {
    pub const ALL: [Lane; 3] = [Lane::Todo, Lane::InProgress, Lane::Completed];

    /// Wire name, as used by the persistence API
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Todo => "TODO",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
        }
    }

    /// Label shown on the board column header
    pub fn label(&self) -> &'static str {
        match self {
            Self::Todo => "To do",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
        }
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Lane {
    type Err = BoardError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "todo" | "to_do" => Ok(Self::Todo),
            "in_progress" => Ok(Self::InProgress),
            "completed" | "done" => Ok(Self::Completed),
            _ => Err(BoardError::InvalidLane(s.to_string())),
        }
    }
}

/// Optional urgency marker, ordered from least to most urgent
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

impl FromStr for Priority {
    type Err = BoardError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(BoardError::InvalidPriority(s.to_string())),
        }
    }
}

/// Rejects titles that are blank or longer than [`MAX_TITLE_LENGTH`]
pub fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(BoardError::Validation("title must not be empty".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(BoardError::Validation(format!(
            "title must be at most {} characters",
            MAX_TITLE_LENGTH
        )));
    }
    Ok(())
}

/// A work item on the board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: Option<String>,
    pub status: Lane,
    /// Position within `status`, zero-based
    #[serde(alias = "order")]
    pub rank: usize,
    pub assignee: Option<String>,
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a task at the top of the TODO lane
    pub fn new(id: TaskId, title: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            title,
            description: None,
            status: Lane::Todo,
            rank: 0,
            assignee: None,
            label: None,
            priority: None,
            due_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Places the task at `rank` in `lane`
    pub fn in_lane(mut self, lane: Lane, rank: usize) -> Self {
        self.status = lane;
        self.rank = rank;
        self
    }

    pub fn set_title(&mut self, title: String) -> Result<()> {
        validate_title(&title)?;
        self.title = title;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn set_description(&mut self, description: Option<String>) {
        self.description = description;
        self.updated_at = Utc::now();
    }

    pub fn set_assignee(&mut self, assignee: Option<String>) {
        self.assignee = assignee;
        self.updated_at = Utc::now();
    }

    pub fn set_label(&mut self, label: Option<String>) {
        self.label = label;
        self.updated_at = Utc::now();
    }

    pub fn set_priority(&mut self, priority: Option<Priority>) {
        self.priority = priority;
        self.updated_at = Utc::now();
    }

    pub fn set_due_date(&mut self, due_date: Option<DateTime<Utc>>) {
        self.due_date = due_date;
        self.updated_at = Utc::now();
    }
}

/// Payload for creating a task. The backend assigns id and rank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    /// Lane to create in; TODO when absent
    pub status: Option<Lane>,
    pub priority: Option<Priority>,
    pub assignee: Option<String>,
    pub label: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_status(mut self, lane: Lane) -> Self {
        self.status = Some(lane);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assignee = Some(assignee.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_due_date(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_title(&self.title)
    }

    pub fn lane(&self) -> Lane {
        self.status.unwrap_or(Lane::Todo)
    }
}

/// Partial update. `None` leaves a field alone; `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Lane>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Option<Priority>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<DateTime<Utc>>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn validate(&self) -> Result<()> {
        match &self.title {
            Some(title) => validate_title(title),
            None => Ok(()),
        }
    }

    /// Applies every non-ordering field. Lane changes are left to the caller
    /// because they also decide the rank.
    pub fn apply_metadata(&self, task: &mut Task) -> Result<()> {
        if let Some(title) = &self.title {
            task.set_title(title.clone())?;
        }
        if let Some(description) = &self.description {
            task.set_description(description.clone());
        }
        if let Some(priority) = self.priority {
            task.set_priority(priority);
        }
        if let Some(assignee) = &self.assignee {
            task.set_assignee(assignee.clone());
        }
        if let Some(label) = &self.label {
            task.set_label(label.clone());
        }
        if let Some(due_date) = self.due_date {
            task.set_due_date(due_date);
        }
        Ok(())
    }
}
