//! The `bluecat_ip4_nbr` data source: the block, network or range in a
//! container that holds a given address.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{parse_id, with_object_attributes, NetworkObject};
use crate::bam::client::BamClient;
use crate::bam::entity::ObjectType;
use crate::error::ProviderError;
use crate::schema::{Attribute, Schema};

/// Data source type name.
pub const DATA_SOURCE_TYPE: &str = "bluecat_ip4_nbr";

/// Values accepted for `type`. The empty string matches any of them.
pub const LOOKUP_TYPES: [&str; 4] = [
    ObjectType::Ip4Block.as_str(),
    ObjectType::Ip4Network.as_str(),
    ObjectType::Dhcp4Range.as_str(),
    "",
];

/// Schema of the data source.
pub fn schema() -> Schema {
    with_object_attributes(Schema::v0())
        .with_description("Looks up the IP4 block, network or DHCP range containing an address.")
        .with_attribute(
            "container_id",
            Attribute::required_string()
                .with_description("Id of the configuration or block to search."),
        )
        .with_attribute(
            "type",
            Attribute::required_string()
                .with_allowed_values(LOOKUP_TYPES)
                .with_description("Object type to look for, or \"\" for any."),
        )
        .with_attribute(
            "address",
            Attribute::required_string().with_description("IPv4 address to look up."),
        )
        .with_attribute(
            "name",
            Attribute::computed_string().with_description("Name of the object found."),
        )
}

/// Configured attributes of a lookup.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LookupArgs {
    /// Id of the configuration or block to search.
    pub container_id: Option<String>,
    /// One of [`LOOKUP_TYPES`].
    #[serde(rename = "type")]
    pub object_type: Option<String>,
    /// Dotted-quad address to look up.
    pub address: Option<String>,
}

impl LookupArgs {
    /// Decode from a JSON object; `null` decodes to empty arguments.
    pub fn from_value(value: Value) -> Result<Self, ProviderError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(value)?)
    }
}

/// Result of a lookup. `type` reports the type of the object found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LookupState {
    /// As configured.
    pub container_id: String,
    /// As configured.
    pub address: String,
    /// The object found.
    #[serde(flatten)]
    pub object: NetworkObject,
}

/// Find the object containing `args.address`.
pub async fn read(client: &dyn BamClient, args: &LookupArgs) -> Result<LookupState, ProviderError> {
    let container = args.container_id.as_deref().unwrap_or_default();
    let container_id = parse_id("container_id", container)?;
    let object_type = args.object_type.as_deref().unwrap_or_default();
    let address = args.address.as_deref().unwrap_or_default();

    let entity = client
        .get_ip_ranged_by_ip(container_id, object_type, address)
        .await?;

    if !entity.exists() {
        let wanted = if object_type.is_empty() {
            "IP4 block, network or range"
        } else {
            object_type
        };
        return Err(ProviderError::NotFound(format!(
            "no {} containing {} in container {}",
            wanted, address, container_id
        )));
    }

    debug!(
        id = entity.id,
        object_type = entity.object_type(),
        address,
        "Found object containing address"
    );

    Ok(LookupState {
        container_id: container.to_string(),
        address: address.to_string(),
        object: NetworkObject::load(client, entity).await?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBam;
    use crate::validation::validate;
    use serde_json::json;

    fn lookup(container_id: &str, object_type: &str, address: &str) -> LookupArgs {
        LookupArgs::from_value(json!({
            "container_id": container_id,
            "type": object_type,
            "address": address
        }))
        .unwrap()
    }

    #[test]
    fn test_type_is_restricted() {
        let schema = schema();
        let config = |t: &str| json!({"container_id": "1", "type": t, "address": "10.0.0.1"});

        for t in LOOKUP_TYPES {
            assert!(validate(&schema, &config(t)).is_empty(), "{:?} rejected", t);
        }

        let diagnostics = validate(&schema, &config("IP6Network"));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("type"));
    }

    #[tokio::test]
    async fn test_read_finds_network() {
        let bam = FakeBam::new();
        let block = bam.add_block(0, "10.0.0.0/8");
        let network = bam.add_network(block, "office", "CIDR=10.20.0.0/24|gateway=10.20.0.1|");
        bam.add_addresses(network, 2);

        let state = read(&bam, &lookup(&block.to_string(), "IP4Network", "10.20.0.77"))
            .await
            .unwrap();

        assert_eq!(state.object.id, network.to_string());
        assert_eq!(state.object.object_type, "IP4Network");
        assert_eq!(state.object.parsed.gateway, "10.20.0.1");
        assert_eq!(state.object.usage.addresses_in_use, 2);

        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["container_id"], block.to_string());
        assert_eq!(value["address"], "10.20.0.77");
    }

    #[tokio::test]
    async fn test_read_range_has_no_usage() {
        let bam = FakeBam::new();
        let network = bam.add_network(0, "office", "CIDR=10.20.0.0/24|");
        bam.add_entity(
            network,
            "pool",
            ObjectType::Dhcp4Range,
            "start=10.20.0.100|end=10.20.0.150|",
        );

        let state = read(&bam, &lookup(&network.to_string(), "", "10.20.0.120"))
            .await
            .unwrap();

        assert_eq!(state.object.object_type, "DHCP4Range");
        assert_eq!(state.object.usage.addresses_in_use, 0);
        assert_eq!(state.object.usage.addresses_free, 0);
        assert!(!bam.called("GetEntities"));
    }

    #[tokio::test]
    async fn test_read_not_found() {
        let bam = FakeBam::new();
        let block = bam.add_block(0, "10.0.0.0/8");

        let err = read(&bam, &lookup(&block.to_string(), "IP4Network", "10.20.0.77"))
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_read_bad_container_id() {
        let bam = FakeBam::new();

        let err = read(&bam, &lookup("config", "", "10.0.0.1"))
            .await
            .unwrap_err();

        assert!(err
            .to_string()
            .contains("Unable to convert container_id from string to int64"));
        assert!(bam.calls().is_empty());
    }
}
