//! A dynamic GraphQL selection engine whose objects are identified by the
//! chain of field calls that produced them.
//!
//! Domain types register [`class::Fields`] against a [`Server`]; queries are
//! resolved concurrently against the root object and every resolved object
//! carries an [`id::Id`] that can later be handed back to [`Server::load`].

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]
#![warn(unreachable_pub)]

pub mod cache;
pub mod class;
mod configuration;
mod context;
pub mod error;
pub mod graphql;
pub mod id;
pub mod json_ext;
pub mod literal;
pub mod query;
pub mod selection;
mod server;
pub mod types;

pub use configuration::Cache;
pub use configuration::Configuration;
pub use configuration::generate_config_schema;
pub use configuration::ConfigurationError;
pub use configuration::Limits;
pub use context::Context;
pub use error::DagqlError;
pub use server::Resolved;
pub use server::ResolvedMap;
pub use server::Server;
