use anyhow::Result;
use serde_json::json;
use std::path::Path;

use super::{Config, print_json};
use crate::api::{DataPreviewOptions, ExportTableOptions};

#[tracing::instrument(skip(config))]
pub async fn list(config: &Config, bucket_id: Option<&str>) -> Result<()> {
    let tables = config.client.list_tables(bucket_id, None).await?;
    print_json(&tables)
}

#[tracing::instrument(skip(config))]
pub async fn get(config: &Config, table_id: &str) -> Result<()> {
    let table = config.client.get_table(table_id).await?;
    print_json(&table)
}

/// Prints the first rows of a table as CSV.
#[tracing::instrument(skip(config))]
pub async fn preview(
    config: &Config,
    table_id: &str,
    limit: Option<u32>,
    columns: Vec<String>,
) -> Result<()> {
    let csv = config
        .client
        .get_table_data_preview(
            table_id,
            &DataPreviewOptions {
                limit,
                columns,
                ..DataPreviewOptions::default()
            },
        )
        .await?;
    print!("{}", csv);
    Ok(())
}

#[tracing::instrument(skip(config))]
pub async fn export(
    config: &Config,
    table_id: &str,
    path: &Path,
    format: Option<String>,
    gzip: bool,
) -> Result<()> {
    config
        .client
        .export_table(
            table_id,
            path,
            &ExportTableOptions {
                format,
                gzip,
                ..ExportTableOptions::default()
            },
        )
        .await?;
    print_json(&json!({ "id": table_id, "path": path.display().to_string() }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_config;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_preview_requests_rfc_csv() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v2/storage/tables/in.c-main.users/data-preview")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("format".into(), "rfc".into()),
                Matcher::UrlEncoded("limit".into(), "10".into()),
                Matcher::UrlEncoded("columns".into(), "id,name".into()),
            ]))
            .with_status(200)
            .with_body("\"id\",\"name\"\n\"1\",\"martin\"\n")
            .create_async()
            .await;

        let config = test_config(&server.url());
        preview(
            &config,
            "in.c-main.users",
            Some(10),
            vec!["id".into(), "name".into()],
        )
        .await
        .unwrap();

        mock.assert_async().await;
    }
}
