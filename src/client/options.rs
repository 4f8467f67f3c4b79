//! Client configuration.

use std::time::Duration;

use crate::http::{
    DEFAULT_BACKOFF_BASE_DELAY, DEFAULT_BACKOFF_MAX_DELAY, DEFAULT_BACKOFF_MAX_TRIES,
    DEFAULT_EXTENDED_TIMEOUT, DEFAULT_TIMEOUT, RetryPolicy,
};

/// Delay before the first job status poll.
pub const DEFAULT_JOB_POLL_INITIAL_DELAY: Duration = Duration::from_secs(1);

/// Upper bound for the delay between two job status polls.
pub const DEFAULT_JOB_POLL_MAX_DELAY: Duration = Duration::from_secs(20);

/// Settings for a [`Client`](super::Client).
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Stack URL, e.g. `https://connection.keboola.com`.
    pub url: String,
    pub token: String,
    pub user_agent: String,
    pub backoff_max_tries: usize,
    pub backoff_base_delay: Duration,
    pub backoff_max_delay: Duration,
    pub job_poll_initial_delay: Duration,
    pub job_poll_max_delay: Duration,
    /// Give up waiting for a job after this long. `None` waits forever.
    pub job_poll_timeout: Option<Duration>,
    pub timeout: Duration,
    pub extended_timeout: Duration,
    pub run_id: Option<String>,
    pub branch_id: Option<String>,
}

impl ClientOptions {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            user_agent: format!("kbc-storage/{}", env!("KBC_STORAGE_VERSION")),
            backoff_max_tries: DEFAULT_BACKOFF_MAX_TRIES,
            backoff_base_delay: DEFAULT_BACKOFF_BASE_DELAY,
            backoff_max_delay: DEFAULT_BACKOFF_MAX_DELAY,
            job_poll_initial_delay: DEFAULT_JOB_POLL_INITIAL_DELAY,
            job_poll_max_delay: DEFAULT_JOB_POLL_MAX_DELAY,
            job_poll_timeout: None,
            timeout: DEFAULT_TIMEOUT,
            extended_timeout: DEFAULT_EXTENDED_TIMEOUT,
            run_id: None,
            branch_id: None,
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_backoff(mut self, max_tries: usize, base_delay: Duration, max_delay: Duration) -> Self {
        self.backoff_max_tries = max_tries;
        self.backoff_base_delay = base_delay;
        self.backoff_max_delay = max_delay;
        self
    }

    pub fn with_job_polling(
        mut self,
        initial_delay: Duration,
        max_delay: Duration,
        timeout: Option<Duration>,
    ) -> Self {
        self.job_poll_initial_delay = initial_delay;
        self.job_poll_max_delay = max_delay;
        self.job_poll_timeout = timeout;
        self
    }

    pub fn with_timeouts(mut self, timeout: Duration, extended_timeout: Duration) -> Self {
        self.timeout = timeout;
        self.extended_timeout = extended_timeout;
        self
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    pub fn with_branch(mut self, branch_id: impl Into<String>) -> Self {
        self.branch_id = Some(branch_id.into());
        self
    }

    pub(crate) fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_tries: self.backoff_max_tries,
            base_delay: self.backoff_base_delay,
            max_delay: self.backoff_max_delay,
        }
    }
}

/// Per-request switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestOptions {
    /// Use the extended timeout (workspace provisioning and similar).
    pub extended_timeout: bool,
    /// Wait for the job when the API answers `202 Accepted`.
    pub handle_async_task: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            extended_timeout: false,
            handle_async_task: true,
        }
    }
}

impl RequestOptions {
    pub fn extended() -> Self {
        Self {
            extended_timeout: true,
            ..Self::default()
        }
    }

    pub fn no_wait() -> Self {
        Self {
            handle_async_task: false,
            ..Self::default()
        }
    }
}
