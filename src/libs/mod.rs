pub mod catalog;
pub mod config;
pub mod database;
pub mod error;
pub mod orm;
pub mod query_builder;
pub mod reconcile;
pub mod schema;
pub mod seed;
pub mod setup;

// Re-export them for easier access from main.rs
pub use config::*;
pub use database::*;
pub use error::*;
pub use orm::*;
pub use query_builder::*;
pub use reconcile::*;
pub use schema::*;
pub use seed::*;
pub use setup::*;
