//! Row types for cleanup plans

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const ACTION_PENDING: &str = "pending";
pub const ACTION_CANCELLED: &str = "cancelled";
pub const ACTION_WOULD_DELETE: &str = "would-delete";
pub const ACTION_DELETED: &str = "deleted";

/// Outcome cell of a row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionState {
    /// Waiting for confirmation and execution
    Pending,
    /// Dry-run preview, e.g. `would-delete`
    WouldAct(String),
    /// The user declined
    Cancelled,
    /// The mutation ran, e.g. `deleted`, `updated`, `created`
    Succeeded(String),
    /// The mutation failed
    Failed(String),
    /// The mutation was not attempted or was already done
    Skipped(String),
}

impl ActionState {
    pub fn would_delete() -> Self {
        Self::WouldAct(ACTION_WOULD_DELETE.to_string())
    }

    pub fn deleted() -> Self {
        Self::Succeeded(ACTION_DELETED.to_string())
    }

    /// A failure with surrounding whitespace trimmed.
    pub fn failed(reason: impl AsRef<str>) -> Self {
        Self::Failed(reason.as_ref().trim().to_string())
    }

    /// A failure rendered from an error via [`crate::format_user_message`].
    pub fn failed_from(err: &anyhow::Error) -> Self {
        Self::failed(crate::classify::format_user_message(Some(err)))
    }

    pub fn skipped(reason: impl AsRef<str>) -> Self {
        Self::Skipped(reason.as_ref().trim().to_string())
    }

    /// Initial state for a freshly discovered row.
    pub fn initial(dry_run: bool, preview: Self) -> Self {
        if dry_run { preview } else { Self::Pending }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

impl fmt::Display for ActionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str(ACTION_PENDING),
            Self::Cancelled => f.write_str(ACTION_CANCELLED),
            Self::WouldAct(label) | Self::Succeeded(label) => f.write_str(label),
            Self::Failed(reason) => {
                let reason = if reason.is_empty() { "unknown" } else { reason };
                write!(f, "failed:{reason}")
            }
            Self::Skipped(reason) => {
                let reason = if reason.is_empty() { "skipped" } else { reason };
                write!(f, "skipped:{reason}")
            }
        }
    }
}

/// One reported resource: identity and metadata columns plus its action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRow {
    pub columns: Vec<String>,
    pub action: ActionState,
}

impl ActionRow {
    pub fn new<I, S>(columns: I, action: ActionState) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            action,
        }
    }

    /// Cells with the action rendered at `action_column` (clamped to the end).
    pub fn cells(&self, action_column: usize) -> Vec<String> {
        let mut cells = self.columns.clone();
        let at = action_column.min(cells.len());
        cells.insert(at, self.action.to_string());
        cells
    }
}

/// Headers plus rendered string cells, ready for an output formatter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// The full set of rows for one command invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowSet {
    pub headers: Vec<String>,
    /// Position of the action cell among the rendered cells
    pub action_column: usize,
    pub rows: Vec<ActionRow>,
}

impl RowSet {
    /// An empty row set; the action column is the last header.
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let headers: Vec<String> = headers.into_iter().map(Into::into).collect();
        let action_column = headers.len().saturating_sub(1);
        Self {
            headers,
            action_column,
            rows: Vec::new(),
        }
    }

    /// Append a row and return its index.
    pub fn push(&mut self, row: ActionRow) -> usize {
        self.rows.push(row);
        self.rows.len() - 1
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ActionRow> {
        self.rows.get(index)
    }

    pub fn set_action(&mut self, index: usize, action: ActionState) -> Result<(), Error> {
        let row = self
            .rows
            .get_mut(index)
            .ok_or(Error::RowOutOfBounds(index))?;
        row.action = action;
        Ok(())
    }

    pub fn set_action_for_all(&mut self, action: &ActionState) {
        for row in &mut self.rows {
            row.action = action.clone();
        }
    }

    pub fn actions(&self) -> impl Iterator<Item = &ActionState> {
        self.rows.iter().map(|row| &row.action)
    }

    pub fn to_dataset(&self) -> Dataset {
        Dataset {
            headers: self.headers.clone(),
            rows: self
                .rows
                .iter()
                .map(|row| row.cells(self.action_column))
                .collect(),
        }
    }

    pub fn summary(&self) -> RowSummary {
        let mut summary = RowSummary::default();
        for action in self.actions() {
            summary.add(action);
        }
        summary
    }
}

/// Count of row outcomes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowSummary {
    pub pending: usize,
    pub previewed: usize,
    pub cancelled: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl RowSummary {
    pub fn add(&mut self, action: &ActionState) {
        match action {
            ActionState::Pending => self.pending += 1,
            ActionState::WouldAct(_) => self.previewed += 1,
            ActionState::Cancelled => self.cancelled += 1,
            ActionState::Succeeded(_) => self.succeeded += 1,
            ActionState::Failed(_) => self.failed += 1,
            ActionState::Skipped(_) => self.skipped += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.pending + self.previewed + self.cancelled + self.succeeded + self.failed + self.skipped
    }

    /// Check if execution was fully successful (no failures)
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}
