// Library surface for the binary and for headless/integration tests.
// Nothing in here touches the real terminal; main.rs owns that.
pub mod app;
pub mod app_dirs;
pub mod celebration;
pub mod config;
pub mod context;
pub mod controller;
pub mod difficulty;
pub mod error;
pub mod persist;
pub mod runtime;
pub mod session;
pub mod stats;
pub mod store;
pub mod typing_policy;
pub mod ui;
pub mod util;
pub mod words;
