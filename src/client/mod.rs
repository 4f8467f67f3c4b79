//! Storage API client: request plumbing shared by every resource module.
//!
//! Resource operations (buckets, tables, components, ...) are implemented as
//! `impl Client` blocks in [`crate::api`]; this module owns URLs, headers,
//! run ids and the handling of asynchronous responses.

mod jobs;
mod options;

use anyhow::{Context, Result};
use log::debug;
use rand::Rng;
use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde_json::Value;

use crate::error::ClientError;
use crate::http::{HttpClient, HttpRequest, RawResponse};

pub use jobs::{Job, JobError, JobStatus};
pub use options::{
    ClientOptions, DEFAULT_JOB_POLL_INITIAL_DELAY, DEFAULT_JOB_POLL_MAX_DELAY, RequestOptions,
};

pub const TOKEN_HEADER: &str = "X-StorageApi-Token";
pub const RUN_ID_HEADER: &str = "X-KBC-RunId";

#[derive(Clone)]
pub struct Client {
    http: HttpClient,
    options: ClientOptions,
    /// `{url}/v2/storage/`
    api_url: String,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("api_url", &self.api_url)
            .field("branch_id", &self.options.branch_id)
            .field("run_id", &self.options.run_id)
            .finish_non_exhaustive()
    }
}

impl Client {
    #[tracing::instrument(skip(options), fields(url = %options.url))]
    pub fn new(options: ClientOptions) -> Result<Self> {
        if options.url.trim().is_empty() {
            return Err(ClientError::new("Storage API URL must be set").into());
        }
        if options.token.trim().is_empty() {
            return Err(ClientError::new("Storage API token must be set").into());
        }

        let client = reqwest::Client::builder()
            .user_agent(options.user_agent.clone())
            .build()
            .context("Failed to build HTTP client")?;
        let http = HttpClient::new(client, options.retry_policy())
            .with_timeouts(options.timeout, options.extended_timeout);

        let api_url = format!("{}/v2/storage/", options.url.trim_end_matches('/'));
        debug!(
            "Storage API client for {} (token {})",
            api_url,
            mask_token(&options.token)
        );

        Ok(Self {
            http,
            options,
            api_url,
        })
    }

    /// Base URL of the API, without any branch prefix.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn token(&self) -> &str {
        &self.options.token
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    pub fn branch_id(&self) -> Option<&str> {
        self.options.branch_id.as_deref()
    }

    pub fn run_id(&self) -> Option<&str> {
        self.options.run_id.as_deref()
    }

    pub fn set_run_id(&mut self, run_id: impl Into<String>) {
        self.options.run_id = Some(run_id.into());
    }

    /// Generates a new run id. A previous id becomes the parent:
    /// `{previous}.{new}`.
    pub fn generate_run_id(&self, previous: Option<&str>) -> String {
        let id: u64 = rand::thread_rng().gen_range(100_000_000..u64::from(u32::MAX));
        match previous {
            Some(previous) if !previous.is_empty() => format!("{}.{}", previous, id),
            _ => id.to_string(),
        }
    }

    /// Returns a client working in the given development branch. Every
    /// resource path is prefixed with `branch/{branchId}/`.
    pub fn branch_aware(&self, branch_id: impl Into<String>) -> Client {
        let mut client = self.clone();
        client.options.branch_id = Some(branch_id.into());
        client
    }

    /// Resolves a resource path. Absolute URLs (e.g. a job `url`) pass
    /// through untouched.
    pub fn resource_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let path = path.trim_start_matches('/');
        match &self.options.branch_id {
            Some(branch_id) => format!("{}branch/{}/{}", self.api_url, branch_id, path),
            None => format!("{}{}", self.api_url, path),
        }
    }

    /// Resolves a path outside of any branch. Jobs, dev branches and merge
    /// requests are project-wide.
    pub fn global_url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path.trim_start_matches('/'))
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let mut token = HeaderValue::from_str(&self.options.token)
            .context("Storage API token contains invalid characters")?;
        token.set_sensitive(true);
        headers.insert(HeaderName::from_static("x-storageapi-token"), token);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(run_id) = &self.options.run_id {
            headers.insert(
                HeaderName::from_static("x-kbc-runid"),
                HeaderValue::from_str(run_id).context("Run id contains invalid characters")?,
            );
        }
        Ok(headers)
    }

    #[tracing::instrument(skip(self))]
    pub async fn api_get(&self, path: &str) -> Result<Value> {
        self.api_request(Method::GET, path, None, RequestOptions::default())
            .await
    }

    /// GET returning the raw body (CSV endpoints such as data preview).
    #[tracing::instrument(skip(self))]
    pub async fn api_get_raw(&self, path: &str) -> Result<String> {
        let url = self.resource_url(path);
        let response = self.send(Method::GET, &url, None, false).await?;
        Ok(response.body)
    }

    #[tracing::instrument(skip(self, body))]
    pub async fn api_post(&self, path: &str, body: Option<&Value>) -> Result<Value> {
        self.api_request(Method::POST, path, body, RequestOptions::default())
            .await
    }

    #[tracing::instrument(skip(self, body))]
    pub async fn api_post_with_options(
        &self,
        path: &str,
        body: Option<&Value>,
        options: RequestOptions,
    ) -> Result<Value> {
        self.api_request(Method::POST, path, body, options).await
    }

    #[tracing::instrument(skip(self, body))]
    pub async fn api_put(&self, path: &str, body: Option<&Value>) -> Result<Value> {
        self.api_request(Method::PUT, path, body, RequestOptions::default())
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn api_delete(&self, path: &str) -> Result<Value> {
        self.api_request(Method::DELETE, path, None, RequestOptions::default())
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn api_delete_with_options(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<Value> {
        self.api_request(Method::DELETE, path, None, options).await
    }

    /// Sends a request and decodes the JSON answer. A `202 Accepted` answer
    /// carries a job; unless disabled in `options` the job is awaited and its
    /// `results` returned.
    pub async fn api_request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        options: RequestOptions,
    ) -> Result<Value> {
        let url = self.resource_url(path);
        let response = self
            .send(method, &url, body, options.extended_timeout)
            .await?;

        let json = response.json()?;
        if response.status == StatusCode::ACCEPTED && options.handle_async_task {
            let job: Job = serde_json::from_value(json)
                .context("Failed to parse asynchronous job from Storage API")?;
            return self.handle_async_task(job).await;
        }

        Ok(json)
    }

    /// Sends one request without any asynchronous job handling.
    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        extended_timeout: bool,
    ) -> Result<RawResponse> {
        self.http
            .send(HttpRequest {
                method,
                url,
                headers: self.headers()?,
                body,
                extended_timeout,
            })
            .await
    }
}

/// Shortens a token for logs: first 8 and last 4 characters.
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 12 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}*********{}", head, tail)
}


#[cfg(test)]
mod tests {
    use super::test_support::test_client;
    use super::*;
    use mockito::Matcher;

    #[test]
    fn test_new_requires_url_and_token() {
        let err = Client::new(ClientOptions::new("", "token")).unwrap_err();
        assert!(err.to_string().contains("URL"));

        let err = Client::new(ClientOptions::new("https://example.com", " ")).unwrap_err();
        assert!(err.to_string().contains("token"));
    }

    #[test]
    fn test_resource_url() {
        let client = test_client("https://connection.keboola.com/");
        assert_eq!(client.api_url(), "https://connection.keboola.com/v2/storage/");
        assert_eq!(
            client.resource_url("buckets/in.c-main"),
            "https://connection.keboola.com/v2/storage/buckets/in.c-main"
        );
        assert_eq!(
            client.resource_url("/tokens/verify"),
            "https://connection.keboola.com/v2/storage/tokens/verify"
        );
        assert_eq!(
            client.resource_url("https://other.example.com/jobs/1"),
            "https://other.example.com/jobs/1"
        );
    }

    #[test]
    fn test_branch_aware_prefixes_paths() {
        let client = test_client("https://connection.keboola.com");
        let branch = client.branch_aware("123");

        assert_eq!(branch.branch_id(), Some("123"));
        assert_eq!(client.branch_id(), None);
        assert_eq!(
            branch.resource_url("components/wr-db/configs"),
            "https://connection.keboola.com/v2/storage/branch/123/components/wr-db/configs"
        );
        assert_eq!(
            branch.global_url("dev-branches"),
            "https://connection.keboola.com/v2/storage/dev-branches"
        );
    }

    #[test]
    fn test_generate_run_id() {
        let client = test_client("https://connection.keboola.com");

        let root = client.generate_run_id(None);
        assert!(!root.is_empty());
        assert!(root.chars().all(|c| c.is_ascii_digit()));

        let child = client.generate_run_id(Some(&root));
        assert!(child.starts_with(&format!("{}.", root)));
        assert_eq!(child.split('.').count(), 2);

        assert!(!client.generate_run_id(Some("")).contains('.'));
    }

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("1234-abcdefghijklmnop"), "1234-abc*********mnop");
        assert_eq!(mask_token("short"), "*****");
    }

    #[test]
    fn test_debug_does_not_leak_token() {
        let client = test_client("https://connection.keboola.com");
        let debug = format!("{:?}", client);
        assert!(!debug.contains("test-token-1234567890"));
    }

    #[tokio::test]
    async fn test_api_get_sends_token_and_run_id() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v2/storage/tokens/verify")
            .match_header(TOKEN_HEADER, "test-token-1234567890")
            .match_header(RUN_ID_HEADER, "1234.5678")
            .match_header("accept", "application/json")
            .with_status(200)
            .with_body(r#"{"id": "42", "description": "master"}"#)
            .create_async()
            .await;

        let mut client = test_client(&server.url());
        client.set_run_id("1234.5678");
        let token = client.api_get("tokens/verify").await.unwrap();

        mock.assert_async().await;
        assert_eq!(token["id"], "42");
        assert_eq!(client.run_id(), Some("1234.5678"));
    }

    #[tokio::test]
    async fn test_api_get_without_run_id_omits_header() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v2/storage/buckets")
            .match_header(RUN_ID_HEADER, Matcher::Missing)
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let client = test_client(&server.url());
        let buckets = client.api_get("buckets").await.unwrap();

        mock.assert_async().await;
        assert_eq!(buckets, serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_api_post_async_waits_for_job() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let create = server
            .mock("POST", "/v2/storage/workspaces")
            .with_status(202)
            .with_body(r#"{"id": 7, "status": "waiting", "url": "ignored"}"#)
            .create_async()
            .await;
        let job = server
            .mock("GET", "/v2/storage/jobs/7")
            .with_status(200)
            .with_body(r#"{"id": 7, "status": "success", "results": {"id": 99}}"#)
            .create_async()
            .await;

        let client = test_client(&url);
        let result = client
            .api_post("workspaces", Some(&serde_json::json!({"backend": "snowflake"})))
            .await
            .unwrap();

        create.assert_async().await;
        job.assert_async().await;
        assert_eq!(result, serde_json::json!({"id": 99}));
    }

    #[tokio::test]
    async fn test_api_post_async_without_waiting_returns_job() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/v2/storage/tables/in.c-main.t/import-async")
            .with_status(202)
            .with_body(r#"{"id": 8, "status": "waiting"}"#)
            .create_async()
            .await;

        let client = test_client(&server.url());
        let result = client
            .api_post_with_options(
                "tables/in.c-main.t/import-async",
                None,
                RequestOptions::no_wait(),
            )
            .await
            .unwrap();

        assert_eq!(result["id"], 8);
        assert_eq!(result["status"], "waiting");
    }

    #[tokio::test]
    async fn test_api_delete_no_content() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("DELETE", "/v2/storage/triggers/3")
            .with_status(204)
            .create_async()
            .await;

        let client = test_client(&server.url());
        let result = client.api_delete("triggers/3").await.unwrap();

        mock.assert_async().await;
        assert_eq!(result, Value::Null);
    }

    #[tokio::test]
    async fn test_api_get_raw() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/v2/storage/tables/in.c-main.t/data-preview")
            .with_status(200)
            .with_header("content-type", "text/csv")
            .with_body("\"id\",\"name\"\n\"1\",\"a\"\n")
            .create_async()
            .await;

        let client = test_client(&server.url());
        let csv = client
            .api_get_raw("tables/in.c-main.t/data-preview")
            .await
            .unwrap();
        assert_eq!(csv, "\"id\",\"name\"\n\"1\",\"a\"\n");
    }
}
