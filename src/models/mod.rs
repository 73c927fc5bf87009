// src/models/mod.rs

//! Domain models for the watcher application.

mod config;
mod item;

// Re-export all public types
pub use config::{
    ApiFields, Config, EnvSettings, FetchConfig, NotifyConfig, PageSelectors, PollConfig,
    SourceConfig, StateConfig,
};
pub use item::{Item, UNKNOWN_DATE};
