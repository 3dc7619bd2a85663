pub mod api;
pub mod config;
pub mod db;
pub mod export;
pub mod extract;
pub mod language;
pub mod lookup;
pub mod metrics;
pub mod pipeline;
pub mod queue;
pub mod ranking;
pub mod render;
pub mod tags;
pub mod translation;
pub mod worker_pool;
