pub mod app;
pub mod cli;
pub mod config;
pub mod highlight;
pub mod host;
pub mod search;
pub mod storage;
pub mod ui;

pub use app::{ActionDispatcher, AppState, Event};
pub use config::{AppConfig, ConfigLoader, ConfigPaths};
pub use storage::{KeyValueStore, StateStore, StoreError};
