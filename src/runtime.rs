use crate::config::Config;
use crate::prompt;
use cleanupkit::{CancelToken, ConfirmCallback, PlanOptions, Sleeper, ThreadSleeper};
use std::time::Duration;

/// Everything a cleanup command needs besides its API client.
///
/// Fields are public so a command can lend `sleeper` to its wait closures
/// while `confirm` is borrowed mutably by the executor.
pub struct CommandRuntime {
    pub opts: PlanOptions,
    pub config: Config,
    pub cancel: CancelToken,
    pub confirm: Box<dyn ConfirmCallback>,
    pub sleeper: Box<dyn Sleeper>,
}

impl CommandRuntime {
    /// Runtime for the real process: stdin prompter, thread sleeps, and a
    /// deadline when `timeout` is set.
    pub fn new(opts: PlanOptions, config: Config, timeout: Option<Duration>) -> Self {
        let cancel = timeout.map_or_else(CancelToken::new, CancelToken::with_timeout);
        Self {
            opts,
            config,
            cancel,
            confirm: prompt::stdin_prompter(),
            sleeper: Box::new(ThreadSleeper),
        }
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records requested sleeps instead of sleeping
    #[derive(Clone, Default)]
    pub struct RecordingSleeper {
        pub naps: Rc<RefCell<Vec<Duration>>>,
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, duration: Duration) {
            self.naps.borrow_mut().push(duration);
        }
    }

    /// Answers every prompt with `answer` and records the prompts
    #[derive(Clone)]
    pub struct ScriptedConfirm {
        pub answer: bool,
        pub prompts: Rc<RefCell<Vec<String>>>,
    }

    impl ConfirmCallback for ScriptedConfirm {
        fn confirm(&mut self, prompt: &str, auto_confirm: bool) -> anyhow::Result<bool> {
            self.prompts.borrow_mut().push(prompt.to_string());
            Ok(self.answer || auto_confirm)
        }
    }

    pub struct Harness {
        pub runtime: CommandRuntime,
        pub naps: Rc<RefCell<Vec<Duration>>>,
        pub prompts: Rc<RefCell<Vec<String>>>,
    }

    /// A runtime that never blocks: scripted answer, recorded sleeps.
    pub fn harness(dry_run: bool, answer: bool) -> Harness {
        let sleeper = RecordingSleeper::default();
        let confirm = ScriptedConfirm {
            answer,
            prompts: Rc::default(),
        };
        Harness {
            naps: Rc::clone(&sleeper.naps),
            prompts: Rc::clone(&confirm.prompts),
            runtime: CommandRuntime {
                opts: PlanOptions {
                    dry_run,
                    no_confirm: false,
                },
                config: Config::default(),
                cancel: CancelToken::new(),
                confirm: Box::new(confirm),
                sleeper: Box::new(sleeper),
            },
        }
    }
}
