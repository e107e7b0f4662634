//! BlueCat Address Manager provider.
//!
//! A provider plugin that manages IPv4 networks in BlueCat Address Manager
//! (BAM) and looks up the block, network or DHCP range containing an
//! address. The host spawns the binary, reads the handshake from stdout and
//! drives it over gRPC.
//!
//! # Resources
//!
//! - `bluecat_ip4_network`: allocates the next free network of a given size
//!   inside an IP4 block and names it. Renames happen in place; changing
//!   `parent_id` or `size` replaces the network.
//!
//! # Data Sources
//!
//! - `bluecat_ip4_nbr`: finds the IP4 block, network or DHCP range in a
//!   container that holds an address.
//!
//! Both report the object's parsed properties and, for CIDR objects, how many
//! addresses are allocated.
//!
//! # Handshake Protocol
//!
//! Once its port is bound the provider prints one line to stdout:
//!
//! ```text
//! HEMMER_PROVIDER|1|127.0.0.1:50051
//! ```
//!
//! Format: `HEMMER_PROVIDER|<protocol_version>|<address>`. Logs go to stderr.
//!
//! # Running
//!
//! ```ignore
//! use bluecat_provider::{init_logging, serve, BlueCatProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_logging();
//!     serve(BlueCatProvider::new()).await
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bam;
pub mod config;
pub mod error;
pub mod ip4_network;
pub mod logging;
pub mod plan;
pub mod provider;
pub mod schema;
pub mod server;
pub mod testing;
pub mod types;
pub mod validation;

#[allow(missing_docs)]
#[allow(clippy::all)]
pub mod generated;

pub use config::BamConfig;
pub use error::{BamError, ProviderError};
pub use logging::{init_logging, try_init_logging};
pub use provider::BlueCatProvider;
pub use schema::ProviderSchema;
pub use server::{serve, serve_with_options, ProviderService, ServeOptions};
pub use types::{
    AttributeChange, ImportedResource, PlanResult, ProviderMetadata, ServerCapabilities,
    HANDSHAKE_PREFIX, PROTOCOL_VERSION,
};
pub use validation::{validate, validate_result};
