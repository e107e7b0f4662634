//! BlueCat Address Manager client.
//!
//! Every provider operation opens its own BAM session through a
//! [`Connector`], issues one call per logical step, and logs out when done.
//! [`Session::finish`] guarantees the logout happens on both the success and
//! the error path.

pub mod client;
pub mod entity;
pub mod properties;
pub mod rest;

pub use client::{BamClient, Connector, Session};
pub use entity::{ApiEntity, ObjectType};
pub use rest::RestConnector;
