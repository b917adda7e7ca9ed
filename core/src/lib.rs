pub mod accounting_cache;
pub mod cache;
pub mod clock;
pub mod config;
pub mod context;
pub mod deadline;
pub mod engine;
pub mod error;
pub mod event;
pub mod features;
pub mod leaderboard;
pub mod money;
pub mod notification;
pub mod payment_breakdown;
pub mod reg_counts;
pub mod settings;
pub mod snapshot;
pub mod status;
pub mod store;
pub mod subscriber;
pub mod transfer;
pub mod types;
