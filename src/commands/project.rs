//! Project-wide commands: token, components, triggers, events and jobs.

use anyhow::Result;

use super::{Config, print_json};
use crate::api::{ListComponentsOptions, ListEventsOptions};

#[tracing::instrument(skip(config))]
pub async fn verify_token(config: &Config) -> Result<()> {
    let token = config.client.verify_token().await?;
    print_json(&token)
}

#[tracing::instrument(skip(config))]
pub async fn list_components(config: &Config, component_type: Option<String>) -> Result<()> {
    let components = config
        .client
        .list_components(&ListComponentsOptions {
            component_type,
            ..ListComponentsOptions::default()
        })
        .await?;
    print_json(&components)
}

#[tracing::instrument(skip(config))]
pub async fn list_triggers(
    config: &Config,
    component: Option<&str>,
    configuration_id: Option<&str>,
) -> Result<()> {
    let triggers = config
        .client
        .list_triggers(component, configuration_id)
        .await?;
    print_json(&triggers)
}

#[tracing::instrument(skip(config))]
pub async fn list_events(config: &Config, limit: Option<u32>, run_id: Option<String>) -> Result<()> {
    let events = config
        .client
        .list_events(&ListEventsOptions {
            limit,
            run_id,
            ..ListEventsOptions::default()
        })
        .await?;
    print_json(&events)
}

#[tracing::instrument(skip(config))]
pub async fn get_job(config: &Config, job_id: u64) -> Result<()> {
    let job = config.client.get_job(job_id).await?;
    print_json(&serde_json::to_value(job)?)
}
