//! Asynchronous job polling.

use anyhow::{Context, Result};
use log::{debug, info};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};

use super::Client;
use crate::error::ClientError;
use crate::settle::settle;

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Waiting,
    Processing,
    Success,
    Error,
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    pub fn is_finished(self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Error)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobError {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub exception_id: Option<String>,
}

/// A server-side asynchronous task.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: u64,
    pub status: JobStatus,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub operation_name: Option<String>,
    #[serde(default)]
    pub results: Option<Value>,
    #[serde(default)]
    pub error: Option<JobError>,
}

impl Job {
    /// Turns a finished job into its results, or into a [`ClientError`]
    /// when it failed.
    pub fn into_results(self) -> Result<Value> {
        match self.status {
            JobStatus::Error => Err(self.failure().into()),
            _ => Ok(self.results.unwrap_or(Value::Null)),
        }
    }

    fn failure(&self) -> ClientError {
        let error = self.error.clone().unwrap_or(JobError {
            message: None,
            code: None,
            exception_id: None,
        });
        let mut client_error = ClientError::new(
            error
                .message
                .unwrap_or_else(|| format!("Job {} failed", self.id)),
        );
        client_error.code = error.code;
        client_error.exception_id = error.exception_id;
        client_error
    }
}

impl Client {
    #[tracing::instrument(skip(self))]
    pub async fn get_job(&self, job_id: u64) -> Result<Job> {
        let url = self.global_url(&format!("jobs/{}", job_id));
        let response = self.send(Method::GET, &url, None, false).await?;
        serde_json::from_value(response.json()?).context("Failed to parse job from Storage API")
    }

    /// Polls a job until it finishes. A failed job becomes a [`ClientError`]
    /// carrying the job's message and string code.
    #[tracing::instrument(skip(self))]
    pub async fn wait_for_job(&self, job_id: u64) -> Result<Job> {
        let started = Instant::now();
        let mut delay = self.options.job_poll_initial_delay;

        loop {
            let job = self.get_job(job_id).await?;
            debug!("Job {} is {:?}", job.id, job.status);

            match job.status {
                JobStatus::Success => return Ok(job),
                JobStatus::Error => return Err(job.failure().into()),
                _ => {}
            }

            if let Some(timeout) = self.options.job_poll_timeout {
                if started.elapsed() >= timeout {
                    return Err(ClientError::new(format!(
                        "Job {} did not finish in {} seconds",
                        job_id,
                        timeout.as_secs()
                    ))
                    .with_code("jobTimeout")
                    .into());
                }
            }

            tokio::time::sleep(delay).await;
            delay = next_poll_delay(delay, self.options.job_poll_max_delay);
        }
    }

    /// Waits for a job returned by an asynchronous endpoint and returns its
    /// results.
    pub async fn handle_async_task(&self, job: Job) -> Result<Value> {
        if job.status.is_finished() {
            return job.into_results();
        }
        info!(
            "Waiting for job {} ({})...",
            job.id,
            job.operation_name.as_deref().unwrap_or("unknown operation")
        );
        self.wait_for_job(job.id).await?.into_results()
    }

    /// Waits for several jobs concurrently. Results keep the input order;
    /// the first failure is returned once every job has settled.
    pub async fn handle_async_tasks(&self, jobs: Vec<Job>) -> Result<Vec<Value>> {
        let outcomes = settle(
            jobs.into_iter()
                .map(|job| (job.id, self.handle_async_task(job))),
        )
        .await;

        outcomes.into_iter().map(|(_, outcome)| outcome).collect()
    }
}

fn next_poll_delay(delay: Duration, max_delay: Duration) -> Duration {
    delay.saturating_mul(2).min(max_delay)
}
