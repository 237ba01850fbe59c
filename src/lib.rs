//! Translation between OpenTherm message payloads and the entities they carry.
//!
//! [`registry::Registry`] holds the entity tables, [`codec`] turns payload bytes into values and
//! back, and [`resolver`] works out which messages a set of enabled entities needs.

pub mod codec;
pub mod commands;
pub mod messages;
pub mod output;
pub mod registry;
pub mod resolver;
pub mod schema;
pub mod selection;
