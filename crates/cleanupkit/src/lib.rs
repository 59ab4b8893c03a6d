//! # cleanupkit
//!
//! The orchestration engine behind bulk cleanup commands.
//!
//! A cleanup command discovers candidate resources, shows what it would do,
//! asks once, then mutates each resource and reports a per-resource outcome.
//! This crate owns that workflow; it knows nothing about any particular
//! provider API.
//!
//! ## Core Concepts
//!
//! - **Page / drain**: walk a cursor-paginated listing into one `Vec`
//! - **classify**: map a failure onto a fixed [`ErrorKind`] and a stable
//!   `"<message> (<code>)"` string
//! - **RowSet / execute_plan**: preview, confirm and execute over flat rows
//! - **CascadeBuilder / CascadeExecutor**: delete a parent after its
//!   dependents, skipping the parent if a dependent could not be cleared
//! - **Waiter**: poll a remote predicate with a bounded attempt budget
//!
//! ## Provider Traits
//!
//! Collaborators are injected rather than hard-wired:
//!
//! - [`ConfirmCallback`]: asks the user (or auto-confirms)
//! - [`Sleeper`]: pauses between polls
//! - [`CancelToken`]: cooperative cancellation with an optional deadline
//!
//! Listing and mutation capabilities are plain closures. Both carry the
//! cancel token into every remote call; `drain` also checks it before each
//! page.

pub mod cascade;
pub mod classify;
pub mod context;
pub mod error;
pub mod pagination;
pub mod plan;
pub mod row;
pub mod waiter;

// Re-export main types at crate root
pub use cascade::{
    CascadeBuilder, CascadeExecutor, CascadePlan, DEPENDENCY_FAILED, DeleteOperation, NOT_FOUND,
};
pub use classify::{ClassifiedError, ErrorKind, classify, format_user_message};
pub use context::{
    AutoConfirm, AutoDecline, CancelToken, ConfirmCallback, Sleeper, ThreadSleeper,
};
pub use error::{Error, RemoteError};
pub use pagination::{Page, drain};
pub use plan::{ActionPlan, PlanOptions, execute_plan};
pub use row::{ActionRow, ActionState, Dataset, RowSet, RowSummary};
pub use waiter::{PollStatus, WaitConfig, Waiter};
