//! Ordered delete cascades
//!
//! A cascade deletes one parent resource after clearing everything that
//! blocks it. Dependents run first, in the order they were added; the parent
//! (the terminal operation) runs last and only if every dependent was cleared.
//!
//! ```ignore
//! let mut builder = CascadeBuilder::new(["username", "step", "resource", "action"], ["alice"], dry_run);
//! for key in keys {
//!     builder.dependent(DeleteOperation::new("access-key", key.clone(), move |cancel| {
//!         api.delete_key(cancel, "alice", &key)
//!     }));
//! }
//! builder.terminal(DeleteOperation::new("user", "alice", move |cancel| api.delete_user(cancel, "alice")));
//! let rows = CascadeExecutor::new(opts).run(builder.build("Delete alice")?, &mut prompter, &cancel)?;
//! ```

use crate::classify::classify;
use crate::context::{CancelToken, ConfirmCallback};
use crate::error::Error;
use crate::plan::PlanOptions;
use crate::row::{ActionRow, ActionState, RowSet};
use anyhow::Result;

/// Reason recorded on the terminal row when a dependent could not be cleared.
pub const DEPENDENCY_FAILED: &str = "dependency cleanup failed";
/// Reason recorded when the resource was already gone.
pub const NOT_FOUND: &str = "not-found";

type ExecuteFn<'a> = Box<dyn FnOnce(&CancelToken) -> Result<()> + 'a>;

/// One delete step of a cascade.
///
/// The closure should capture everything it needs by value.
pub struct DeleteOperation<'a> {
    /// Dependency step label, e.g. `access-key`, `app`, `user-profile`
    pub step: String,
    /// Display identity of the resource
    pub resource: String,
    row: usize,
    success: ActionState,
    execute: ExecuteFn<'a>,
}

impl<'a> DeleteOperation<'a> {
    pub fn new<F>(step: impl Into<String>, resource: impl Into<String>, execute: F) -> Self
    where
        F: FnOnce(&CancelToken) -> Result<()> + 'a,
    {
        Self {
            step: step.into(),
            resource: resource.into(),
            row: 0,
            success: ActionState::deleted(),
            execute: Box::new(execute),
        }
    }

    /// Label recorded on success instead of `deleted`.
    pub fn with_success(mut self, label: impl Into<String>) -> Self {
        self.success = ActionState::Succeeded(label.into());
        self
    }

    /// Index of the row this operation reports into.
    pub fn row(&self) -> usize {
        self.row
    }

    fn attempt(self, cancel: &CancelToken) -> (usize, ActionState, Option<anyhow::Error>) {
        let Self {
            row,
            success,
            execute,
            ..
        } = self;
        let result = cancel.check().map_err(anyhow::Error::from).and_then(|()| execute(cancel));
        match result {
            Ok(()) => (row, success, None),
            Err(err) => (row, success, Some(err)),
        }
    }
}

impl std::fmt::Debug for DeleteOperation<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeleteOperation")
            .field("step", &self.step)
            .field("resource", &self.resource)
            .field("row", &self.row)
            .finish_non_exhaustive()
    }
}

/// Assembles rows and operations for one parent resource.
pub struct CascadeBuilder<'a> {
    rows: RowSet,
    parent_columns: Vec<String>,
    dry_run: bool,
    dependents: Vec<DeleteOperation<'a>>,
    terminal: Option<DeleteOperation<'a>>,
    settle: Option<ExecuteFn<'a>>,
    list_failures: usize,
}

impl<'a> CascadeBuilder<'a> {
    /// Rows render as `parent_columns + [step, resource, action]`.
    pub fn new<H, HS, P, PS>(headers: H, parent_columns: P, dry_run: bool) -> Self
    where
        H: IntoIterator<Item = HS>,
        HS: Into<String>,
        P: IntoIterator<Item = PS>,
        PS: Into<String>,
    {
        Self {
            rows: RowSet::new(headers),
            parent_columns: parent_columns.into_iter().map(Into::into).collect(),
            dry_run,
            dependents: Vec::new(),
            terminal: None,
            settle: None,
            list_failures: 0,
        }
    }

    fn row_for(&self, step: &str, resource: &str, action: ActionState) -> ActionRow {
        let mut columns = self.parent_columns.clone();
        columns.push(step.to_string());
        columns.push(resource.to_string());
        ActionRow::new(columns, action)
    }

    fn initial(&self) -> ActionState {
        ActionState::initial(self.dry_run, ActionState::would_delete())
    }

    /// Add a dependent operation. Dependents run in the order they are added.
    pub fn dependent(&mut self, mut op: DeleteOperation<'a>) -> &mut Self {
        let row = self.row_for(&op.step, &op.resource, self.initial());
        op.row = self.rows.push(row);
        self.dependents.push(op);
        self
    }

    /// Record that a dependent listing failed.
    ///
    /// The row is already terminal (`failed:<message>`) and blocks the parent.
    pub fn list_failure(&mut self, step: &str, err: &anyhow::Error) -> &mut Self {
        log::warn!("listing {step} failed: {err:#}");
        let row = self.row_for(step, "-", ActionState::failed_from(err));
        self.rows.push(row);
        self.list_failures += 1;
        self
    }

    /// Set the parent operation. Its row is always the last row.
    pub fn terminal(&mut self, op: DeleteOperation<'a>) -> &mut Self {
        self.terminal = Some(op);
        self
    }

    /// Wait to run after every dependent is cleared and before the parent.
    pub fn settle<F>(&mut self, wait: F) -> &mut Self
    where
        F: FnOnce(&CancelToken) -> Result<()> + 'a,
    {
        self.settle = Some(Box::new(wait));
        self
    }

    pub fn dependent_count(&self) -> usize {
        self.dependents.len()
    }

    pub fn build(self, prompt: impl Into<String>) -> Result<CascadePlan<'a>, Error> {
        let Self {
            mut rows,
            parent_columns,
            dry_run,
            dependents,
            terminal,
            settle,
            list_failures,
        } = self;
        let mut terminal = terminal.ok_or(Error::MissingTerminal)?;

        let mut columns = parent_columns;
        columns.push(terminal.step.clone());
        columns.push(terminal.resource.clone());
        let action = ActionState::initial(dry_run, ActionState::would_delete());
        terminal.row = rows.push(ActionRow::new(columns, action));

        Ok(CascadePlan {
            rows,
            prompt: prompt.into(),
            dependents,
            terminal,
            settle,
            list_failures,
        })
    }
}

/// Dependents, then exactly one terminal operation, plus the rows they report into.
pub struct CascadePlan<'a> {
    rows: RowSet,
    prompt: String,
    dependents: Vec<DeleteOperation<'a>>,
    terminal: DeleteOperation<'a>,
    settle: Option<ExecuteFn<'a>>,
    list_failures: usize,
}

impl<'a> CascadePlan<'a> {
    pub fn rows(&self) -> &RowSet {
        &self.rows
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn dependents(&self) -> &[DeleteOperation<'a>] {
        &self.dependents
    }

    pub fn terminal(&self) -> &DeleteOperation<'a> {
        &self.terminal
    }
}

/// Runs a [`CascadePlan`] with the partial-failure isolation rule.
pub struct CascadeExecutor {
    opts: PlanOptions,
}

impl CascadeExecutor {
    pub fn new(opts: PlanOptions) -> Self {
        Self { opts }
    }

    /// Execute the plan and return its rows.
    ///
    /// Only a confirmation failure is an error. A dependent that fails marks
    /// its row failed and blocks the terminal; one that is already gone is
    /// skipped and does not.
    pub fn run(
        &self,
        plan: CascadePlan<'_>,
        confirm: &mut dyn ConfirmCallback,
        cancel: &CancelToken,
    ) -> Result<RowSet> {
        let CascadePlan {
            mut rows,
            prompt,
            dependents,
            terminal,
            settle,
            list_failures,
        } = plan;

        if self.opts.dry_run {
            return Ok(rows);
        }

        if !confirm.confirm(&prompt, self.opts.no_confirm)? {
            log::info!("declined: {prompt}");
            for row in rows.rows.iter_mut().filter(|row| row.action.is_pending()) {
                row.action = ActionState::Cancelled;
            }
            return Ok(rows);
        }

        let mut dependency_failed = list_failures > 0;
        for op in dependents {
            let label = format!("{} {}", op.step, op.resource);
            let (row, outcome) = settle_outcome(op.attempt(cancel));
            if outcome.is_failure() {
                log::warn!("{label}: {outcome}");
                dependency_failed = true;
            } else {
                log::debug!("{label}: {outcome}");
            }
            rows.set_action(row, outcome)?;
        }

        let terminal_row = terminal.row;
        if dependency_failed {
            log::warn!(
                "skipping {} {}: {DEPENDENCY_FAILED}",
                terminal.step,
                terminal.resource
            );
            rows.set_action(terminal_row, ActionState::skipped(DEPENDENCY_FAILED))?;
            return Ok(rows);
        }

        if let Some(wait) = settle
            && let Err(err) = wait(cancel)
        {
            log::warn!("waiting before {} failed: {err:#}", terminal.step);
            rows.set_action(terminal_row, ActionState::failed_from(&err))?;
            return Ok(rows);
        }

        let (row, outcome) = settle_outcome(terminal.attempt(cancel));
        rows.set_action(row, outcome)?;
        Ok(rows)
    }
}

fn settle_outcome(
    (row, success, err): (usize, ActionState, Option<anyhow::Error>),
) -> (usize, ActionState) {
    let Some(err) = err else {
        return (row, success);
    };
    let classified = classify(&err);
    if classified.kind.is_not_found() {
        (row, ActionState::skipped(NOT_FOUND))
    } else {
        (row, ActionState::failed(classified.user_message()))
    }
}
