pub mod cache;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod repository;
pub mod services;
pub mod utils;

pub use cache::{RedisSuggestionCache, SuggestionCache};
pub use config::{CacheConfig, Config, EngineConfig};
pub use error::{SignalError, Stage, StoreError, SuggestionError};
pub use repository::{InMemoryStore, PostgresSuggestionStore, Stores};
pub use services::SuggestionEngine;
