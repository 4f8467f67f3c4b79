pub mod api;
pub mod client;
pub mod commands;
pub mod error;
pub mod http;
pub mod runtime;
pub mod settle;
pub mod upload;
