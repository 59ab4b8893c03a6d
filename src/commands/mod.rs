// Cleanup commands, one module per service
pub mod cloudformation;
pub mod iam;
pub mod sagemaker;

use anyhow::{Result, anyhow, bail};
use cleanupkit::format_user_message;

/// Trim a required flag value, rejecting an empty one.
pub(crate) fn required(value: &str, flag: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        bail!("{flag} is required");
    }
    Ok(value.to_string())
}

/// Abort error for a listing that the command cannot proceed without.
pub(crate) fn listing_failed(what: &str, err: &anyhow::Error) -> anyhow::Error {
    anyhow!("{what}: {}", format_user_message(Some(err)))
}
