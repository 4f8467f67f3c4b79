use anyhow::{Context, Result};
use log::debug;

use crate::client::{Client, ClientOptions, mask_token};
use crate::runtime::Runtime;

pub const URL_ENV: &str = "KBC_STORAGE_API_URL";
pub const TOKEN_ENV: &str = "KBC_STORAGE_API_TOKEN";
pub const RUN_ID_ENV: &str = "KBC_RUNID";
pub const DEFAULT_URL: &str = "https://connection.keboola.com";

/// Connection settings given on the command line. Missing values fall back
/// to the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionArgs {
    pub url: Option<String>,
    pub token: Option<String>,
    pub branch: Option<String>,
}

pub struct Config {
    pub client: Client,
}

impl Config {
    pub fn new(runtime: &impl Runtime, args: ConnectionArgs) -> Result<Self> {
        let url = match args.url {
            Some(url) => url,
            None => runtime
                .env_var(URL_ENV)
                .unwrap_or_else(|_| DEFAULT_URL.to_string()),
        };

        let token = match args.token {
            Some(token) => token,
            None => runtime.env_var(TOKEN_ENV).with_context(|| {
                format!("Storage API token is not set. Use --token or {}", TOKEN_ENV)
            })?,
        };
        debug!("Connecting to {} with token {}", url, mask_token(&token));

        let mut options = ClientOptions::new(url, token);
        if let Some(branch) = args.branch {
            options = options.with_branch(branch);
        }
        let mut client = Client::new(options)?;

        // Child of the caller's run id when one is set
        let previous = runtime.env_var(RUN_ID_ENV).ok();
        let run_id = client.generate_run_id(previous.as_deref());
        debug!("Run id {}", run_id);
        client.set_run_id(run_id);

        Ok(Self { client })
    }
}
