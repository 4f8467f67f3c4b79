//! Storage API resources, one module per resource family. Every operation
//! is a method on [`Client`](crate::client::Client).

pub mod buckets;
pub mod components;
pub mod dev_branches;
pub mod direct_access;
pub mod events;
pub mod files;
pub mod merge_requests;
pub mod table_exporter;
pub mod tables;
pub mod tokens;
pub mod triggers;
pub mod workspaces;

pub use buckets::{BucketAttribute, DropBucketOptions};
pub use components::{
    Configuration, ConfigurationMetadata, ConfigurationRow, ListComponentsOptions,
    ListConfigurationVersionsOptions, MetadataEntry,
};
pub use events::ListEventsOptions;
pub use files::{FileUploadOptions, ListFilesOptions, PreparedFile, UploadParams};
pub use tables::{
    CreateAliasTableOptions, CreateTableOptions, DataPreviewOptions, ExportTableOptions,
    ImportTableOptions, OrderBy, WorkspaceImportOptions,
};
pub use table_exporter::{FileDownload, S3Path};
pub use tokens::TokenOptions;
pub use workspaces::{CreateWorkspaceOptions, DeleteWorkspaceOptions};

/// Query string builder. Unset values are skipped.
#[derive(Debug, Default, Clone)]
pub(crate) struct Query {
    pairs: Vec<(String, String)>,
}

impl Query {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(mut self, key: &str, value: impl ToString) -> Self {
        self.pairs.push((key.to_string(), value.to_string()));
        self
    }

    pub(crate) fn push_opt<T: ToString>(self, key: &str, value: Option<T>) -> Self {
        match value {
            Some(value) => self.push(key, value),
            None => self,
        }
    }

    /// Booleans travel as `1`/`0`.
    pub(crate) fn push_flag(self, key: &str, value: bool) -> Self {
        self.push(key, if value { "1" } else { "0" })
    }

    /// Repeats `key[]` for every value.
    pub(crate) fn push_list(mut self, key: &str, values: &[String]) -> Self {
        let key = format!("{}[]", key);
        for value in values {
            self.pairs.push((key.clone(), value.clone()));
        }
        self
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// `path?k=v&...`, or `path` alone when nothing was pushed.
    pub(crate) fn append_to(&self, path: &str) -> String {
        if self.is_empty() {
            return path.to_string();
        }
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in &self.pairs {
            serializer.append_pair(key, value);
        }
        format!("{}?{}", path, serializer.finish())
    }
}

/// Reads the `id` of a created resource. Ids come as strings or numbers.
pub(crate) fn result_id(value: &serde_json::Value) -> anyhow::Result<String> {
    match value.get("id") {
        Some(serde_json::Value::String(id)) => Ok(id.clone()),
        Some(serde_json::Value::Number(id)) => Ok(id.to_string()),
        _ => Err(crate::error::ClientError::new(format!(
            "Storage API response has no id: {}",
            value
        ))
        .into()),
    }
}

/// Serializes an options struct into a JSON object body.
pub(crate) fn to_object<T: serde::Serialize>(
    value: &T,
) -> anyhow::Result<serde_json::Map<String, serde_json::Value>> {
    match serde_json::to_value(value)? {
        serde_json::Value::Object(map) => Ok(map),
        _ => Ok(serde_json::Map::new()),
    }
}

/// Inserts `value` under `key` when set.
pub(crate) fn insert_opt<T: serde::Serialize>(
    body: &mut serde_json::Map<String, serde_json::Value>,
    key: &str,
    value: Option<T>,
) {
    if let Some(value) = value {
        body.insert(key.to_string(), serde_json::json!(value));
    }
}
