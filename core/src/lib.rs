pub mod aggregate;
pub mod cohort;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod reconciliation;
pub mod record;
pub mod rng;
pub mod segmentation;
pub mod source;
pub mod store;
pub mod synthetic;
pub mod timeliness;
pub mod trend;
pub mod types;
pub mod win_rate;
