//! Bounded polling for asynchronous remote state

use crate::context::{CancelToken, Sleeper};
use crate::error::Error;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Poll interval and attempt budget for one kind of wait
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitConfig {
    #[serde(with = "secs", rename = "poll_interval_secs")]
    pub poll_interval: Duration,
    pub max_attempts: u32,
}

impl WaitConfig {
    pub fn new(poll_interval: Duration, max_attempts: u32) -> Self {
        Self {
            poll_interval,
            max_attempts,
        }
    }

    /// Upper bound on time spent sleeping.
    pub fn budget(&self) -> Duration {
        self.poll_interval
            .saturating_mul(self.max_attempts.saturating_sub(1))
    }
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self::new(Duration::from_secs(5), 120)
    }
}

mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

/// What one poll observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStatus {
    /// The awaited state was reached
    Done,
    /// Not there yet; poll again
    Pending,
    /// The remote gave up, e.g. `FAILED` or `STOPPED`
    Terminal {
        status: String,
        reason: Option<String>,
    },
}

/// Polls a predicate until it reports done, fails, or runs out of attempts.
pub struct Waiter<'a> {
    config: WaitConfig,
    sleeper: &'a dyn Sleeper,
}

impl<'a> Waiter<'a> {
    pub fn new(config: WaitConfig, sleeper: &'a dyn Sleeper) -> Self {
        Self { config, sleeper }
    }

    pub fn config(&self) -> &WaitConfig {
        &self.config
    }

    /// Poll until `poll` reports [`PollStatus::Done`].
    ///
    /// * a poll error is returned unchanged and not retried
    /// * [`PollStatus::Terminal`] fails with [`Error::TerminalState`]
    /// * cancellation is checked before every sleep
    /// * no sleep follows the final attempt; running out of attempts fails
    ///   with [`Error::WaitTimedOut`] naming `target`
    pub fn wait_until<P>(&self, target: &str, cancel: &CancelToken, mut poll: P) -> Result<()>
    where
        P: FnMut(&CancelToken) -> Result<PollStatus>,
    {
        let max_attempts = self.config.max_attempts;
        let mut last = None;

        for attempt in 1..=max_attempts {
            let status = poll(cancel)?;
            log::debug!("waiting for {target}: attempt {attempt}/{max_attempts} -> {status:?}");

            match status {
                PollStatus::Done => return Ok(()),
                PollStatus::Terminal { status, reason } => {
                    return Err(Error::TerminalState {
                        target: target.to_string(),
                        status,
                        reason,
                    }
                    .into());
                }
                PollStatus::Pending => last = Some(PollStatus::Pending),
            }

            if attempt == max_attempts {
                break;
            }
            cancel.check()?;
            self.sleeper.sleep(self.config.poll_interval);
        }

        log::warn!("gave up waiting for {target} after {max_attempts} attempt(s), last: {last:?}");
        Err(Error::WaitTimedOut(target.to_string()).into())
    }
}
