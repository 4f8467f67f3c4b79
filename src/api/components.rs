//! Component configurations, their rows, versions and metadata.
//!
//! Configuration and state bodies are sent as JSON-encoded strings, the way
//! the API expects them in form-like payloads.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::{Query, insert_opt};
use crate::client::Client;
use crate::error::ClientError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Configuration {
    pub component_id: String,
    pub configuration_id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub configuration: Option<Value>,
    pub state: Option<Value>,
    pub change_description: Option<String>,
    pub is_disabled: Option<bool>,
}

impl Configuration {
    pub fn new(component_id: impl Into<String>) -> Self {
        Self {
            component_id: component_id.into(),
            ..Self::default()
        }
    }

    pub fn with_configuration_id(mut self, id: impl Into<String>) -> Self {
        self.configuration_id = Some(id.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_configuration(mut self, configuration: Value) -> Self {
        self.configuration = Some(configuration);
        self
    }

    pub fn with_state(mut self, state: Value) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_change_description(mut self, change_description: impl Into<String>) -> Self {
        self.change_description = Some(change_description.into());
        self
    }

    fn require_id(&self) -> Result<&str> {
        self.configuration_id.as_deref().ok_or_else(|| {
            ClientError::new(format!(
                "Configuration id must be set for component {}",
                self.component_id
            ))
            .into()
        })
    }

    fn body(&self) -> Result<Map<String, Value>> {
        let mut body = Map::new();
        insert_opt(&mut body, "name", self.name.as_deref());
        insert_opt(&mut body, "description", self.description.as_deref());
        insert_opt(&mut body, "configuration", encode(self.configuration.as_ref())?);
        insert_opt(&mut body, "state", encode(self.state.as_ref())?);
        insert_opt(&mut body, "changeDescription", self.change_description.as_deref());
        insert_opt(&mut body, "isDisabled", self.is_disabled);
        Ok(body)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigurationRow {
    pub component_id: String,
    pub configuration_id: String,
    pub row_id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub configuration: Option<Value>,
    pub state: Option<Value>,
    pub change_description: Option<String>,
    pub is_disabled: Option<bool>,
}

impl ConfigurationRow {
    pub fn new(configuration: &Configuration) -> Self {
        Self {
            component_id: configuration.component_id.clone(),
            configuration_id: configuration.configuration_id.clone().unwrap_or_default(),
            ..Self::default()
        }
    }

    pub fn with_row_id(mut self, row_id: impl Into<String>) -> Self {
        self.row_id = Some(row_id.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_configuration(mut self, configuration: Value) -> Self {
        self.configuration = Some(configuration);
        self
    }

    pub fn with_state(mut self, state: Value) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_is_disabled(mut self, is_disabled: bool) -> Self {
        self.is_disabled = Some(is_disabled);
        self
    }

    pub fn with_change_description(mut self, change_description: impl Into<String>) -> Self {
        self.change_description = Some(change_description.into());
        self
    }

    fn rows_path(&self) -> String {
        format!(
            "components/{}/configs/{}/rows",
            self.component_id, self.configuration_id
        )
    }

    fn body(&self) -> Result<Map<String, Value>> {
        let mut body = Map::new();
        insert_opt(&mut body, "name", self.name.as_deref());
        insert_opt(&mut body, "description", self.description.as_deref());
        insert_opt(&mut body, "configuration", encode(self.configuration.as_ref())?);
        insert_opt(&mut body, "state", encode(self.state.as_ref())?);
        insert_opt(&mut body, "changeDescription", self.change_description.as_deref());
        insert_opt(&mut body, "isDisabled", self.is_disabled);
        Ok(body)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationMetadata {
    pub component_id: String,
    pub configuration_id: String,
    pub metadata: Vec<MetadataEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListComponentsOptions {
    pub component_type: Option<String>,
    pub include: Vec<String>,
    pub is_deleted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListConfigurationVersionsOptions {
    pub component_id: String,
    pub configuration_id: String,
    pub include: Vec<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// JSON-encodes a configuration or state. Null and empty values are left
/// out so an update does not clear them.
fn encode(value: Option<&Value>) -> Result<Option<String>> {
    let value = value.filter(|value| match value {
        Value::Null => false,
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => true,
    });
    Ok(value.map(serde_json::to_string).transpose()?)
}

fn config_path(component_id: &str, configuration_id: &str) -> String {
    format!("components/{}/configs/{}", component_id, configuration_id)
}

impl Client {
    // Configurations

    #[tracing::instrument(skip(self, configuration), fields(component = %configuration.component_id))]
    pub async fn add_configuration(&self, configuration: &Configuration) -> Result<Value> {
        let mut body = configuration.body()?;
        insert_opt(
            &mut body,
            "configurationId",
            configuration.configuration_id.as_deref(),
        );
        self.api_post(
            &format!("components/{}/configs", configuration.component_id),
            Some(&Value::Object(body)),
        )
        .await
    }

    /// Updates only the fields set on `configuration`.
    #[tracing::instrument(skip(self, configuration), fields(component = %configuration.component_id))]
    pub async fn update_configuration(&self, configuration: &Configuration) -> Result<Value> {
        let id = configuration.require_id()?;
        self.api_put(
            &config_path(&configuration.component_id, id),
            Some(&Value::Object(configuration.body()?)),
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_configuration(&self, component_id: &str, configuration_id: &str) -> Result<Value> {
        self.api_get(&config_path(component_id, configuration_id))
            .await
    }

    /// Moves a configuration to trash; deleting a trashed one purges it.
    #[tracing::instrument(skip(self))]
    pub async fn delete_configuration(&self, component_id: &str, configuration_id: &str) -> Result<()> {
        self.api_delete(&config_path(component_id, configuration_id))
            .await?;
        Ok(())
    }

    /// Restores a configuration from trash.
    #[tracing::instrument(skip(self))]
    pub async fn restore_component_configuration(
        &self,
        component_id: &str,
        configuration_id: &str,
    ) -> Result<Value> {
        self.api_post(
            &format!("{}/restore", config_path(component_id, configuration_id)),
            None,
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_components(&self, options: &ListComponentsOptions) -> Result<Value> {
        let mut query = Query::new().push_opt("componentType", options.component_type.as_deref());
        if !options.include.is_empty() {
            query = query.push("include", options.include.join(","));
        }
        if options.is_deleted {
            query = query.push_flag("isDeleted", true);
        }
        self.api_get(&query.append_to("components")).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_component_configurations(
        &self,
        component_id: &str,
        is_deleted: bool,
    ) -> Result<Value> {
        let mut query = Query::new();
        if is_deleted {
            query = query.push_flag("isDeleted", true);
        }
        self.api_get(&query.append_to(&format!("components/{}/configs", component_id)))
            .await
    }

    // Versions

    #[tracing::instrument(skip(self))]
    pub async fn list_configuration_versions(
        &self,
        options: &ListConfigurationVersionsOptions,
    ) -> Result<Value> {
        let mut query = Query::new()
            .push_opt("limit", options.limit)
            .push_opt("offset", options.offset);
        if !options.include.is_empty() {
            query = query.push("include", options.include.join(","));
        }
        let path = format!(
            "{}/versions",
            config_path(&options.component_id, &options.configuration_id)
        );
        self.api_get(&query.append_to(&path)).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_configuration_version(
        &self,
        component_id: &str,
        configuration_id: &str,
        version: u64,
    ) -> Result<Value> {
        self.api_get(&format!(
            "{}/versions/{}",
            config_path(component_id, configuration_id),
            version
        ))
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn rollback_configuration(
        &self,
        component_id: &str,
        configuration_id: &str,
        version: u64,
        change_description: Option<&str>,
    ) -> Result<Value> {
        let body = change_description.map(|d| json!({ "changeDescription": d }));
        self.api_post(
            &format!(
                "{}/versions/{}/rollback",
                config_path(component_id, configuration_id),
                version
            ),
            body.as_ref(),
        )
        .await
    }

    /// Copies a configuration version into a new configuration.
    #[tracing::instrument(skip(self))]
    pub async fn create_configuration_from_version(
        &self,
        component_id: &str,
        configuration_id: &str,
        version: u64,
        name: &str,
        description: Option<&str>,
    ) -> Result<Value> {
        let mut body = Map::new();
        body.insert("name".into(), json!(name));
        insert_opt(&mut body, "description", description);
        self.api_post(
            &format!(
                "{}/versions/{}/create",
                config_path(component_id, configuration_id),
                version
            ),
            Some(&Value::Object(body)),
        )
        .await
    }

    // Rows

    #[tracing::instrument(skip(self, row), fields(component = %row.component_id))]
    pub async fn add_configuration_row(&self, row: &ConfigurationRow) -> Result<Value> {
        let mut body = row.body()?;
        insert_opt(&mut body, "rowId", row.row_id.as_deref());
        self.api_post(&row.rows_path(), Some(&Value::Object(body)))
            .await
    }

    #[tracing::instrument(skip(self, row), fields(component = %row.component_id))]
    pub async fn update_configuration_row(&self, row: &ConfigurationRow) -> Result<Value> {
        let row_id = row
            .row_id
            .as_deref()
            .ok_or_else(|| ClientError::new("Row id must be set to update a configuration row"))?;
        self.api_put(
            &format!("{}/{}", row.rows_path(), row_id),
            Some(&Value::Object(row.body()?)),
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_configuration_row(
        &self,
        component_id: &str,
        configuration_id: &str,
        row_id: &str,
    ) -> Result<()> {
        self.api_delete(&format!(
            "{}/rows/{}",
            config_path(component_id, configuration_id),
            row_id
        ))
        .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_configuration_rows(
        &self,
        component_id: &str,
        configuration_id: &str,
    ) -> Result<Value> {
        self.api_get(&format!("{}/rows", config_path(component_id, configuration_id)))
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_configuration_row(
        &self,
        component_id: &str,
        configuration_id: &str,
        row_id: &str,
    ) -> Result<Value> {
        self.api_get(&format!(
            "{}/rows/{}",
            config_path(component_id, configuration_id),
            row_id
        ))
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_configuration_row_versions(
        &self,
        component_id: &str,
        configuration_id: &str,
        row_id: &str,
    ) -> Result<Value> {
        self.api_get(&format!(
            "{}/rows/{}/versions",
            config_path(component_id, configuration_id),
            row_id
        ))
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_configuration_row_version(
        &self,
        component_id: &str,
        configuration_id: &str,
        row_id: &str,
        version: u64,
    ) -> Result<Value> {
        self.api_get(&format!(
            "{}/rows/{}/versions/{}",
            config_path(component_id, configuration_id),
            row_id,
            version
        ))
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn rollback_configuration_row(
        &self,
        component_id: &str,
        configuration_id: &str,
        row_id: &str,
        version: u64,
    ) -> Result<Value> {
        self.api_post(
            &format!(
                "{}/rows/{}/versions/{}/rollback",
                config_path(component_id, configuration_id),
                row_id,
                version
            ),
            None,
        )
        .await
    }

    /// Copies a row version, optionally into another configuration of the
    /// same component.
    #[tracing::instrument(skip(self))]
    pub async fn create_configuration_row_from_version(
        &self,
        component_id: &str,
        configuration_id: &str,
        row_id: &str,
        version: u64,
        target_configuration_id: Option<&str>,
    ) -> Result<Value> {
        let body = target_configuration_id.map(|id| json!({ "targetConfigId": id }));
        self.api_post(
            &format!(
                "{}/rows/{}/versions/{}/create",
                config_path(component_id, configuration_id),
                row_id,
                version
            ),
            body.as_ref(),
        )
        .await
    }

    // Metadata

    /// Adds metadata entries and returns the configuration's metadata.
    #[tracing::instrument(skip(self, metadata))]
    pub async fn add_configuration_metadata(
        &self,
        metadata: &ConfigurationMetadata,
    ) -> Result<Value> {
        self.api_post(
            &format!(
                "{}/metadata",
                config_path(&metadata.component_id, &metadata.configuration_id)
            ),
            Some(&json!({ "metadata": metadata.metadata })),
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_configuration_metadata(
        &self,
        component_id: &str,
        configuration_id: &str,
    ) -> Result<Value> {
        self.api_get(&format!(
            "{}/metadata",
            config_path(component_id, configuration_id)
        ))
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_configuration_metadata(
        &self,
        component_id: &str,
        configuration_id: &str,
        metadata_id: &str,
    ) -> Result<()> {
        self.api_delete(&format!(
            "{}/metadata/{}",
            config_path(component_id, configuration_id),
            metadata_id
        ))
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_support::test_client;
    use mockito::Matcher;

    #[test]
    fn test_configuration_body_encodes_json() {
        let configuration = Configuration::new("wr-db")
            .with_name("Main")
            .with_configuration(json!({"parameters": {"db": "x"}}));
        let body = configuration.body().unwrap();

        assert_eq!(body["name"], "Main");
        assert_eq!(body["configuration"], r#"{"parameters":{"db":"x"}}"#);
        assert!(!body.contains_key("state"));
        assert!(!body.contains_key("description"));
    }

    #[tokio::test]
    async fn test_update_configuration_skips_empty_configuration_and_state() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/v2/storage/components/wr-db/configs/main-1")
            .match_body(Matcher::Json(json!({"name": "Renamed"})))
            .with_status(200)
            .with_body(r#"{"id": "main-1", "version": 3}"#)
            .create_async()
            .await;

        let client = test_client(&server.url());
        client
            .update_configuration(
                &Configuration::new("wr-db")
                    .with_configuration_id("main-1")
                    .with_name("Renamed")
                    .with_configuration(json!({}))
                    .with_state(json!([])),
            )
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_add_configuration() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v2/storage/components/wr-db/configs")
            .match_body(Matcher::Json(json!({
                "name": "Main",
                "configurationId": "main-1",
                "state": r#"{"cursor":10}"#
            })))
            .with_status(201)
            .with_body(r#"{"id": "main-1", "name": "Main", "version": 1}"#)
            .create_async()
            .await;

        let client = test_client(&server.url());
        let created = client
            .add_configuration(
                &Configuration::new("wr-db")
                    .with_configuration_id("main-1")
                    .with_name("Main")
                    .with_state(json!({"cursor": 10})),
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(created["version"], 1);
    }

    #[tokio::test]
    async fn test_update_configuration_sends_only_set_fields() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/v2/storage/components/wr-db/configs/main-1")
            .match_body(Matcher::Json(json!({
                "description": "Updated",
                "changeDescription": "Describe it"
            })))
            .with_status(200)
            .with_body(r#"{"id": "main-1", "version": 2}"#)
            .create_async()
            .await;

        let client = test_client(&server.url());
        let updated = client
            .update_configuration(
                &Configuration::new("wr-db")
                    .with_configuration_id("main-1")
                    .with_description("Updated")
                    .with_change_description("Describe it"),
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(updated["version"], 2);
    }

    #[tokio::test]
    async fn test_update_configuration_requires_id() {
        let client = test_client("http://127.0.0.1:9");
        let err = client
            .update_configuration(&Configuration::new("wr-db").with_name("x"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Configuration id must be set"));
    }

    #[tokio::test]
    async fn test_list_components_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v2/storage/components")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("componentType".into(), "writer".into()),
                Matcher::UrlEncoded("include".into(), "configuration,rows".into()),
                Matcher::UrlEncoded("isDeleted".into(), "1".into()),
            ]))
            .with_status(200)
            .with_body(r#"[{"id": "wr-db", "configurations": []}]"#)
            .create_async()
            .await;

        let client = test_client(&server.url());
        let components = client
            .list_components(&ListComponentsOptions {
                component_type: Some("writer".into()),
                include: vec!["configuration".into(), "rows".into()],
                is_deleted: true,
            })
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(components[0]["id"], "wr-db");
    }

    #[tokio::test]
    async fn test_list_configuration_versions() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v2/storage/components/wr-db/configs/main-1/versions")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("limit".into(), "2".into()),
                Matcher::UrlEncoded("offset".into(), "1".into()),
            ]))
            .with_status(200)
            .with_body(r#"[{"version": 3}, {"version": 2}]"#)
            .create_async()
            .await;

        let client = test_client(&server.url());
        let versions = client
            .list_configuration_versions(&ListConfigurationVersionsOptions {
                component_id: "wr-db".into(),
                configuration_id: "main-1".into(),
                limit: Some(2),
                offset: Some(1),
                ..ListConfigurationVersionsOptions::default()
            })
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(versions[0]["version"], 3);
    }

    #[tokio::test]
    async fn test_create_configuration_from_version() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock(
                "POST",
                "/v2/storage/components/wr-db/configs/main-1/versions/2/create",
            )
            .match_body(Matcher::Json(json!({"name": "Copy"})))
            .with_status(201)
            .with_body(r#"{"id": "copy-1"}"#)
            .create_async()
            .await;

        let client = test_client(&server.url());
        let copy = client
            .create_configuration_from_version("wr-db", "main-1", 2, "Copy", None)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(copy["id"], "copy-1");
    }

    #[tokio::test]
    async fn test_add_configuration_row() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v2/storage/components/wr-db/configs/main-1/rows")
            .match_body(Matcher::Json(json!({
                "rowId": "row-1",
                "configuration": r#"{"table":"orders"}"#,
                "isDisabled": true
            })))
            .with_status(201)
            .with_body(r#"{"id": "row-1", "version": 1}"#)
            .create_async()
            .await;

        let client = test_client(&server.url());
        let configuration = Configuration::new("wr-db").with_configuration_id("main-1");
        let row = client
            .add_configuration_row(
                &ConfigurationRow::new(&configuration)
                    .with_row_id("row-1")
                    .with_configuration(json!({"table": "orders"}))
                    .with_is_disabled(true),
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(row["id"], "row-1");
    }

    #[tokio::test]
    async fn test_rollback_configuration_row() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock(
                "POST",
                "/v2/storage/components/wr-db/configs/main-1/rows/row-1/versions/1/rollback",
            )
            .with_status(200)
            .with_body(r#"{"id": "row-1", "version": 4}"#)
            .create_async()
            .await;

        let client = test_client(&server.url());
        let row = client
            .rollback_configuration_row("wr-db", "main-1", "row-1", 1)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(row["version"], 4);
    }

    #[tokio::test]
    async fn test_add_configuration_metadata() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v2/storage/components/transformation/configs/main-1/metadata")
            .match_body(Matcher::Json(json!({
                "metadata": [
                    {"key": "KBC.SomeEnity.metadataKey", "value": "some-value"},
                    {"key": "someMetadataKey", "value": "some-value"}
                ]
            })))
            .with_status(201)
            .with_body(r#"[{"id": "1", "key": "KBC.SomeEnity.metadataKey"}, {"id": "2", "key": "someMetadataKey"}]"#)
            .create_async()
            .await;

        let client = test_client(&server.url());
        let metadata = client
            .add_configuration_metadata(&ConfigurationMetadata {
                component_id: "transformation".into(),
                configuration_id: "main-1".into(),
                metadata: vec![
                    MetadataEntry {
                        key: "KBC.SomeEnity.metadataKey".into(),
                        value: "some-value".into(),
                    },
                    MetadataEntry {
                        key: "someMetadataKey".into(),
                        value: "some-value".into(),
                    },
                ],
            })
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(metadata.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_configuration_metadata() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock(
                "DELETE",
                "/v2/storage/components/transformation/configs/main-1/metadata/2",
            )
            .with_status(204)
            .create_async()
            .await;

        let client = test_client(&server.url());
        client
            .delete_configuration_metadata("transformation", "main-1", "2")
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_restore_in_branch() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock(
                "POST",
                "/v2/storage/branch/77/components/wr-db/configs/main-1/restore",
            )
            .with_status(200)
            .with_body(r#"{"id": "main-1", "isDeleted": false}"#)
            .create_async()
            .await;

        let client = test_client(&server.url()).branch_aware("77");
        client
            .restore_component_configuration("wr-db", "main-1")
            .await
            .unwrap();
        mock.assert_async().await;
    }
}
