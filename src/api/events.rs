//! Project events.

use anyhow::Result;
use serde_json::Value;

use super::Query;
use crate::client::Client;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListEventsOptions {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub run_id: Option<String>,
    /// Full-text search query.
    pub q: Option<String>,
    pub component: Option<String>,
    pub since_id: Option<u64>,
    pub max_id: Option<u64>,
}

impl Client {
    #[tracing::instrument(skip(self))]
    pub async fn list_events(&self, options: &ListEventsOptions) -> Result<Value> {
        let path = Query::new()
            .push_opt("limit", options.limit)
            .push_opt("offset", options.offset)
            .push_opt("runId", options.run_id.as_deref())
            .push_opt("q", options.q.as_deref())
            .push_opt("component", options.component.as_deref())
            .push_opt("sinceId", options.since_id)
            .push_opt("maxId", options.max_id)
            .append_to("events");
        self.api_get(&path).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_event(&self, event_id: u64) -> Result<Value> {
        self.api_get(&format!("events/{}", event_id)).await
    }

    /// `event` carries `component`, `message`, `type` and optional `params`
    /// and `results`.
    #[tracing::instrument(skip(self, event))]
    pub async fn create_event(&self, event: &Value) -> Result<Value> {
        self.api_post("events", Some(event)).await
    }
}
