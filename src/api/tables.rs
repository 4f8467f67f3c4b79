//! Tables: creation, imports, exports and data preview.

use anyhow::{Context, Result};
use log::info;
use serde::Serialize;
use serde_json::{Value, json};
use std::ops::Not;
use std::path::Path;

use super::files::FileUploadOptions;
use super::{Query, result_id, to_object};
use crate::client::{Client, Job, RequestOptions};
use crate::upload::FileUploadTransferOptions;

/// CSV settings for a new table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTableOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enclosure: Option<String>,
    /// Comma separated column names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distribution_key: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportTableOptions {
    #[serde(skip_serializing_if = "Not::not")]
    pub incremental: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enclosure: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,
    #[serde(skip_serializing_if = "Not::not")]
    pub without_headers: bool,
}

/// Import from a table in a workspace instead of a file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceImportOptions {
    pub data_workspace_id: String,
    pub data_table_name: String,
    #[serde(skip_serializing_if = "Not::not")]
    pub incremental: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAliasTableOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias_filter: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alias_columns: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataPreviewOptions {
    pub limit: Option<u32>,
    pub columns: Vec<String>,
    pub where_column: Option<String>,
    pub where_values: Vec<String>,
    pub where_operator: Option<String>,
    pub changed_since: Option<String>,
    /// Full-text match against every column.
    pub fulltext_search: Option<String>,
    pub order_by: Vec<OrderBy>,
}

/// One sort key of a data preview.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    /// `ASC` or `DESC`
    pub order: Option<String>,
    pub data_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportTableOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Not::not")]
    pub gzip: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changed_since: Option<String>,
}

impl Client {
    /// Tables of one bucket, or of the whole project.
    #[tracing::instrument(skip(self))]
    pub async fn list_tables(&self, bucket_id: Option<&str>, include: Option<&str>) -> Result<Value> {
        let path = match bucket_id {
            Some(bucket_id) => format!("buckets/{}/tables", bucket_id),
            None => "tables".to_string(),
        };
        self.api_get(&Query::new().push_opt("include", include).append_to(&path))
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_table(&self, table_id: &str) -> Result<Value> {
        self.api_get(&format!("tables/{}", table_id)).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn drop_table(&self, table_id: &str, force: bool) -> Result<()> {
        let mut query = Query::new();
        if force {
            query = query.push_flag("force", true);
        }
        self.api_delete(&query.append_to(&format!("tables/{}", table_id)))
            .await?;
        Ok(())
    }

    /// Creates a table from an uploaded file and returns the table id.
    #[tracing::instrument(skip(self, options))]
    pub async fn create_table_async(
        &self,
        bucket_id: &str,
        name: &str,
        file_id: u64,
        options: &CreateTableOptions,
    ) -> Result<String> {
        let mut body = to_object(options)?;
        body.insert("name".into(), json!(name));
        body.insert("dataFileId".into(), json!(file_id));

        let results = self
            .api_post(
                &format!("buckets/{}/tables-async", bucket_id),
                Some(&Value::Object(body)),
            )
            .await?;
        let table_id = result_id(&results)?;
        info!("Created table {}", table_id);
        Ok(table_id)
    }

    /// Uploads a local CSV file and creates a table from it.
    #[tracing::instrument(skip(self, options))]
    pub async fn create_table_async_direct(
        &self,
        bucket_id: &str,
        name: &str,
        path: &Path,
        options: &CreateTableOptions,
    ) -> Result<String> {
        let file_id = self
            .upload_file(
                path,
                &FileUploadOptions::default(),
                &FileUploadTransferOptions::default(),
            )
            .await?;
        self.create_table_async(bucket_id, name, file_id, options)
            .await
    }

    /// Imports an uploaded file into a table and returns the import results.
    #[tracing::instrument(skip(self, options))]
    pub async fn write_table_async(
        &self,
        table_id: &str,
        file_id: u64,
        options: &ImportTableOptions,
    ) -> Result<Value> {
        let mut body = to_object(options)?;
        body.insert("dataFileId".into(), json!(file_id));
        self.api_post(
            &format!("tables/{}/import-async", table_id),
            Some(&Value::Object(body)),
        )
        .await
    }

    /// Imports a workspace table into a table.
    #[tracing::instrument(skip(self, options))]
    pub async fn write_table_async_direct(
        &self,
        table_id: &str,
        options: &WorkspaceImportOptions,
    ) -> Result<Value> {
        self.api_post(
            &format!("tables/{}/import-async", table_id),
            Some(&Value::Object(to_object(options)?)),
        )
        .await
    }

    /// Starts an import and returns the job without waiting for it.
    #[tracing::instrument(skip(self, options))]
    pub async fn queue_table_import(
        &self,
        table_id: &str,
        file_id: u64,
        options: &ImportTableOptions,
    ) -> Result<Job> {
        let mut body = to_object(options)?;
        body.insert("dataFileId".into(), json!(file_id));
        let job = self
            .api_post_with_options(
                &format!("tables/{}/import-async", table_id),
                Some(&Value::Object(body)),
                RequestOptions::no_wait(),
            )
            .await?;
        serde_json::from_value(job).context("Failed to parse import job from Storage API")
    }

    /// Creates an alias of `source_table_id` in `bucket_id` and returns the
    /// alias id.
    #[tracing::instrument(skip(self, options))]
    pub async fn create_alias_table(
        &self,
        bucket_id: &str,
        source_table_id: &str,
        name: Option<&str>,
        options: &CreateAliasTableOptions,
    ) -> Result<String> {
        let mut body = to_object(options)?;
        body.insert("sourceTable".into(), json!(source_table_id));
        if let Some(name) = name {
            body.insert("name".into(), json!(name));
        }

        let alias = self
            .api_post(
                &format!("buckets/{}/table-aliases", bucket_id),
                Some(&Value::Object(body)),
            )
            .await?;
        result_id(&alias)
    }

    /// First rows of a table as RFC 4180 CSV.
    #[tracing::instrument(skip(self, options))]
    pub async fn get_table_data_preview(
        &self,
        table_id: &str,
        options: &DataPreviewOptions,
    ) -> Result<String> {
        let mut query = Query::new()
            .push("format", "rfc")
            .push_opt("limit", options.limit)
            .push_opt("whereColumn", options.where_column.as_deref())
            .push_list("whereValues", &options.where_values)
            .push_opt("whereOperator", options.where_operator.as_deref())
            .push_opt("changedSince", options.changed_since.as_deref())
            .push_opt("fulltextSearch", options.fulltext_search.as_deref());
        if !options.columns.is_empty() {
            query = query.push("columns", options.columns.join(","));
        }
        for (index, order_by) in options.order_by.iter().enumerate() {
            query = query
                .push(&format!("orderBy[{}][column]", index), &order_by.column)
                .push_opt(&format!("orderBy[{}][order]", index), order_by.order.as_deref())
                .push_opt(
                    &format!("orderBy[{}][dataType]", index),
                    order_by.data_type.as_deref(),
                );
        }

        self.api_get_raw(&query.append_to(&format!("tables/{}/data-preview", table_id)))
            .await
    }

    /// Exports a table to a file. The results carry `file.id`.
    #[tracing::instrument(skip(self, options))]
    pub async fn export_table_async(
        &self,
        table_id: &str,
        options: &ExportTableOptions,
    ) -> Result<Value> {
        self.api_post(
            &format!("tables/{}/export-async", table_id),
            Some(&Value::Object(to_object(options)?)),
        )
        .await
    }
}
