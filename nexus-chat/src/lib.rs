// Library root: re-exports all modules so integration tests and both
// binaries can access the crate's public API.

pub mod app;
pub mod chat;
pub mod config;
pub mod message;
pub mod protocol;
pub mod store;
pub mod tui;
pub mod ws_server;
