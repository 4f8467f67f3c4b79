//! Command handlers for the `kbc-storage` binary. Every handler prints its
//! result as pretty JSON on stdout.

use anyhow::Result;
use serde_json::Value;

pub mod buckets;
pub mod config;
pub mod files;
pub mod project;
pub mod tables;
pub mod workspaces;

pub use config::{Config, ConnectionArgs};

pub(crate) fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
pub(crate) fn test_config(url: &str) -> Config {
    let mut runtime = crate::runtime::MockRuntime::new();
    runtime
        .expect_env_var()
        .returning(|_| Err(std::env::VarError::NotPresent));
    Config::new(
        &runtime,
        ConnectionArgs {
            url: Some(url.to_string()),
            token: Some("123-abcdefghijklmn".into()),
            branch: None,
        },
    )
    .unwrap()
}
