//! The `bluecat_ip4_network` resource.
//!
//! Functions here issue the BAM calls of one operation against an already
//! logged-in client. Locking and the session lifecycle belong to the caller.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::{parse_id, with_object_attributes, NetworkObject};
use crate::bam::client::BamClient;
use crate::bam::entity::{ApiEntity, ObjectType};
use crate::bam::properties::Ip4NetworkProperties;
use crate::error::ProviderError;
use crate::schema::{Attribute, Schema};

/// Resource type name.
pub const RESOURCE_TYPE: &str = "bluecat_ip4_network";

/// Schema of the resource.
pub fn schema() -> Schema {
    with_object_attributes(Schema::v0())
        .with_description("An IPv4 network allocated from a BlueCat IP4 block.")
        .with_attribute(
            "parent_id",
            Attribute::required_string()
                .with_force_new()
                .with_description("Id of the IP4 block to allocate the network from."),
        )
        .with_attribute(
            "name",
            Attribute::required_string().with_description("Name of the network."),
        )
        .with_attribute(
            "size",
            Attribute::required_int64()
                .with_force_new()
                .with_description("Number of addresses in the network, a power of two."),
        )
        .with_attribute(
            "is_larger_allowed",
            Attribute::optional_bool()
                .with_default(json!(false))
                .with_description("Allow a larger network when no network of `size` is free."),
        )
}

/// Configured and stored attributes the operations read.
///
/// Every field is optional so the same type accepts configuration, planned
/// state and prior state.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NetworkArgs {
    /// BAM id of the network, known once created.
    pub id: Option<String>,
    /// Id of the IP4 block the network is allocated from.
    pub parent_id: Option<String>,
    /// Network name.
    pub name: Option<String>,
    /// Number of addresses requested.
    pub size: Option<i64>,
    /// Whether BAM may hand out a larger network than `size`.
    pub is_larger_allowed: Option<bool>,
}

impl NetworkArgs {
    /// Decode from a JSON object; `null` decodes to empty arguments.
    pub fn from_value(value: Value) -> Result<Self, ProviderError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(value)?)
    }

    /// The arguments with `id` set.
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id.to_string());
        self
    }

    /// The BAM id from state.
    pub fn id(&self) -> Result<i64, ProviderError> {
        parse_id("id", self.id.as_deref().unwrap_or_default())
    }

    fn parent_id(&self) -> Result<i64, ProviderError> {
        parse_id("parent_id", self.parent_id.as_deref().unwrap_or_default())
    }

    fn name(&self) -> Result<&str, ProviderError> {
        self.name
            .as_deref()
            .ok_or_else(|| ProviderError::Validation("name is required".to_string()))
    }

    fn size(&self) -> Result<i64, ProviderError> {
        self.size
            .ok_or_else(|| ProviderError::Validation("size is required".to_string()))
    }
}

/// State of a managed network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkState {
    /// As configured.
    pub parent_id: String,
    /// As configured.
    pub size: i64,
    /// As configured, `false` when unset.
    pub is_larger_allowed: bool,
    /// What BAM reports for the network.
    #[serde(flatten)]
    pub object: NetworkObject,
}

/// Allocate the next free network under `parent_id` and name it.
///
/// Returns the id of the new network. If naming fails the allocated network
/// is deleted again and the naming error is returned.
pub async fn create(client: &dyn BamClient, args: &NetworkArgs) -> Result<i64, ProviderError> {
    let parent_id = args.parent_id()?;
    let size = args.size()?;
    let name = args.name()?;
    let is_larger_allowed = args.is_larger_allowed.unwrap_or(false);

    let id = client
        .get_next_available_ip4_network(parent_id, size, is_larger_allowed, true)
        .await?;
    info!(id, parent_id, size, "Allocated IP4 network");

    if let Err(err) = client
        .update(&ApiEntity::new(id, name, ObjectType::Ip4Network))
        .await
    {
        match client.delete(id).await {
            Ok(()) => info!(id, "Deleted IP4 network that could not be named"),
            Err(cleanup) => warn!(
                id,
                error = %cleanup,
                "Failed to delete IP4 network that could not be named"
            ),
        }
        return Err(err.into());
    }

    Ok(id)
}

/// Read the network named by `args.id`.
///
/// Returns `None` when BAM no longer has the object.
pub async fn read(
    client: &dyn BamClient,
    args: &NetworkArgs,
) -> Result<Option<NetworkState>, ProviderError> {
    let id = args.id()?;
    let entity = client.get_entity_by_id(id).await?;

    if !entity.exists() {
        info!(id, "IP4 network no longer exists");
        return Ok(None);
    }

    let object = NetworkObject::load(client, entity).await?;
    Ok(Some(NetworkState {
        parent_id: args.parent_id.clone().unwrap_or_default(),
        size: args.size.unwrap_or_default(),
        is_larger_allowed: args.is_larger_allowed.unwrap_or(false),
        object,
    }))
}

/// Apply a new name to the network named by `args.id`.
pub async fn update(client: &dyn BamClient, args: &NetworkArgs) -> Result<(), ProviderError> {
    let id = args.id()?;
    let name = args.name()?;

    client
        .update(&ApiEntity::new(id, name, ObjectType::Ip4Network))
        .await?;
    debug!(id, name, "Renamed IP4 network");

    Ok(())
}

/// Delete the network named by `args.id`. A network that is already gone
/// is not an error.
pub async fn delete(client: &dyn BamClient, args: &NetworkArgs) -> Result<(), ProviderError> {
    let id = args.id()?;
    let entity = client.get_entity_by_id(id).await?;

    if !entity.exists() {
        info!(id, "IP4 network already deleted");
        return Ok(());
    }

    client.delete(id).await?;
    info!(id, "Deleted IP4 network");
    Ok(())
}

/// Recover the configurable attributes of an existing network.
///
/// `parent_id` comes from the object's parent and `size` from its CIDR.
pub async fn import(client: &dyn BamClient, id: &str) -> Result<NetworkArgs, ProviderError> {
    let id = parse_id("id", id)?;
    let entity = client.get_entity_by_id(id).await?;

    if !entity.exists() {
        return Err(ProviderError::NotFound(format!("IP4 network {}", id)));
    }
    if entity.object_type() != ObjectType::Ip4Network.as_str() {
        return Err(ProviderError::Validation(format!(
            "object {} is a {}, not an IP4Network",
            id,
            entity.object_type()
        )));
    }

    let parent = client.get_parent(id).await?;
    let prefix = Ip4NetworkProperties::parse(entity.properties())?.prefix_len()?;

    Ok(NetworkArgs {
        id: Some(id.to_string()),
        parent_id: Some(parent.id.to_string()),
        name: Some(entity.name().to_string()),
        size: prefix.map(|p| 1i64 << (32 - u32::from(p))),
        is_larger_allowed: Some(false),
    })
}
