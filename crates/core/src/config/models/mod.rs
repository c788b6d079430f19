pub mod app_config;
pub mod broker;
pub mod clients;
pub mod database;
pub mod ingest;
pub mod observability;

pub use app_config::*;
pub use broker::*;
pub use clients::*;
pub use database::*;
pub use ingest::*;
pub use observability::*;
