// Library root: re-exports all modules so integration tests can reach the
// application's public API.

pub mod app;
pub mod config;
pub mod console;
pub mod db;
pub mod protocol;
