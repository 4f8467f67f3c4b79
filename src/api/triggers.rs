//! Triggers: run a configuration when watched tables change.

use anyhow::Result;
use serde_json::Value;

use super::Query;
use crate::client::Client;

impl Client {
    /// `trigger` carries `component`, `configurationId`, `runWithTokenId`,
    /// `coolDownPeriodMinutes` and `tableIds`.
    #[tracing::instrument(skip(self, trigger))]
    pub async fn create_trigger(&self, trigger: &Value) -> Result<Value> {
        self.api_post("triggers", Some(trigger)).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_trigger(&self, trigger_id: u64) -> Result<Value> {
        self.api_get(&format!("triggers/{}", trigger_id)).await
    }

    #[tracing::instrument(skip(self, trigger))]
    pub async fn update_trigger(&self, trigger_id: u64, trigger: &Value) -> Result<Value> {
        self.api_put(&format!("triggers/{}", trigger_id), Some(trigger))
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_trigger(&self, trigger_id: u64) -> Result<()> {
        self.api_delete(&format!("triggers/{}", trigger_id)).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_triggers(
        &self,
        component: Option<&str>,
        configuration_id: Option<&str>,
    ) -> Result<Value> {
        let path = Query::new()
            .push_opt("component", component)
            .push_opt("configuration", configuration_id)
            .append_to("triggers");
        self.api_get(&path).await
    }
}
