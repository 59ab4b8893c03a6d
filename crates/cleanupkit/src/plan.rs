//! Preview, confirm, execute over a flat list of rows

use crate::context::ConfirmCallback;
use crate::row::{ActionRow, ActionState, RowSet};
use anyhow::Result;

/// Options shared by every destructive command
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
    /// Accept the confirmation prompt without asking
    pub no_confirm: bool,
}

/// Rows to act on and the question to ask before acting
#[derive(Debug, Clone)]
pub struct ActionPlan {
    pub rows: RowSet,
    pub prompt: String,
}

impl ActionPlan {
    pub fn new(rows: RowSet, prompt: impl Into<String>) -> Self {
        Self {
            rows,
            prompt: prompt.into(),
        }
    }
}

/// Run the three-phase safety pattern over `plan`.
///
/// 1. Empty plans and dry runs return the rows as built.
/// 2. The user is asked once; a decline marks every row cancelled.
/// 3. `mutate` runs once per row, in order. `None` leaves the row as is,
///    `Some(state)` replaces its action.
///
/// Only a confirmation failure is returned as an error; per-row failures are
/// the caller's to encode in the returned state.
pub fn execute_plan<M>(
    plan: ActionPlan,
    opts: &PlanOptions,
    confirm: &mut dyn ConfirmCallback,
    mut mutate: M,
) -> Result<RowSet>
where
    M: FnMut(usize, &ActionRow) -> Option<ActionState>,
{
    let ActionPlan { mut rows, prompt } = plan;

    if rows.is_empty() || opts.dry_run {
        return Ok(rows);
    }

    if !confirm.confirm(&prompt, opts.no_confirm)? {
        log::info!("declined: {prompt}");
        rows.set_action_for_all(&ActionState::Cancelled);
        return Ok(rows);
    }

    for (index, row) in rows.rows.iter_mut().enumerate() {
        if let Some(next) = mutate(index, row) {
            log::debug!("row {index}: {} -> {next}", row.action);
            row.action = next;
        }
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{AutoConfirm, AutoDecline};
    use anyhow::anyhow;

    struct FailingConfirm;

    impl ConfirmCallback for FailingConfirm {
        fn confirm(&mut self, _prompt: &str, _auto_confirm: bool) -> Result<bool> {
            Err(anyhow!("stdin closed"))
        }
    }

    /// Records the prompt and auto-confirm flag it was called with
    struct RecordingConfirm {
        answer: bool,
        seen: Vec<(String, bool)>,
    }

    impl ConfirmCallback for RecordingConfirm {
        fn confirm(&mut self, prompt: &str, auto_confirm: bool) -> Result<bool> {
            self.seen.push((prompt.to_string(), auto_confirm));
            Ok(self.answer || auto_confirm)
        }
    }

    fn plan_of(names: &[&str]) -> ActionPlan {
        let mut rows = RowSet::new(["name", "action"]);
        for name in names {
            rows.push(ActionRow::new([*name], ActionState::Pending));
        }
        ActionPlan::new(rows, format!("Delete {} item(s)", names.len()))
    }

    #[test]
    fn test_dry_run_never_mutates() {
        let mut rows = RowSet::new(["name", "action"]);
        for name in ["a", "b", "c"] {
            rows.push(ActionRow::new([name], ActionState::would_delete()));
        }
        let plan = ActionPlan::new(rows.clone(), "Delete");
        let opts = PlanOptions {
            dry_run: true,
            no_confirm: true,
        };

        let mut calls = 0;
        let result = execute_plan(plan, &opts, &mut AutoConfirm, |_, _| {
            calls += 1;
            Some(ActionState::deleted())
        })
        .unwrap();

        assert_eq!(calls, 0);
        assert_eq!(result, rows);
    }

    #[test]
    fn test_empty_plan_skips_confirmation() {
        let mut confirm = RecordingConfirm {
            answer: true,
            seen: Vec::new(),
        };
        let result = execute_plan(plan_of(&[]), &PlanOptions::default(), &mut confirm, |_, _| {
            Some(ActionState::deleted())
        })
        .unwrap();

        assert!(result.is_empty());
        assert!(confirm.seen.is_empty());
    }

    #[test]
    fn test_decline_cancels_every_row() {
        let mut calls = 0;
        let result = execute_plan(
            plan_of(&["a", "b"]),
            &PlanOptions::default(),
            &mut AutoDecline,
            |_, _| {
                calls += 1;
                Some(ActionState::deleted())
            },
        )
        .unwrap();

        assert_eq!(calls, 0);
        assert!(result.actions().all(|a| *a == ActionState::Cancelled));
    }

    #[test]
    fn test_confirm_failure_propagates_without_mutation() {
        let mut calls = 0;
        let err = execute_plan(
            plan_of(&["a"]),
            &PlanOptions::default(),
            &mut FailingConfirm,
            |_, _| {
                calls += 1;
                None
            },
        )
        .unwrap_err();

        assert_eq!(err.to_string(), "stdin closed");
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_no_confirm_flag_reaches_callback() {
        let mut confirm = RecordingConfirm {
            answer: false,
            seen: Vec::new(),
        };
        let opts = PlanOptions {
            dry_run: false,
            no_confirm: true,
        };
        let result = execute_plan(plan_of(&["a"]), &opts, &mut confirm, |_, _| {
            Some(ActionState::deleted())
        })
        .unwrap();

        assert_eq!(confirm.seen, vec![("Delete 1 item(s)".to_string(), true)]);
        assert_eq!(result.rows[0].action, ActionState::deleted());
    }

    #[test]
    fn test_execute_continues_past_failures_and_keeps_noop_rows() {
        let mut order = Vec::new();
        let result = execute_plan(
            plan_of(&["a", "b", "c"]),
            &PlanOptions::default(),
            &mut AutoConfirm,
            |index, row| {
                order.push(row.columns[0].clone());
                match index {
                    0 => Some(ActionState::failed("denied (AccessDenied)")),
                    1 => None,
                    _ => Some(ActionState::deleted()),
                }
            },
        )
        .unwrap();

        assert_eq!(order, vec!["a", "b", "c"]);
        let actions: Vec<String> = result.actions().map(ToString::to_string).collect();
        assert_eq!(
            actions,
            vec!["failed:denied (AccessDenied)", "pending", "deleted"]
        );
    }
}
