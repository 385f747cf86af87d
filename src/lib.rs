pub mod config;
pub mod db;
pub mod query;
pub mod sanitize;
pub mod timestamp;
pub mod tools;

pub use config::{ConfigError, MongoConfig, MongoSettings};
pub use db::{MailpieceStore, MongoStore};
pub use tools::MailtrackingServer;
