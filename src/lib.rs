pub mod api;
pub mod cleaner;
pub mod config;
pub mod loader;
pub mod logging;
pub mod match_query;
pub mod match_store;
pub mod matches;
pub mod merger;
