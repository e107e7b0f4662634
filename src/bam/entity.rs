//! The generic BAM object representation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A BAM `APIEntity`.
///
/// BAM signals "no such object" by returning an entity whose id is `0`
/// rather than an error, so callers check [`ApiEntity::exists`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiEntity {
    /// Object id, `0` when the object does not exist.
    #[serde(default)]
    pub id: i64,
    /// Object name.
    #[serde(default)]
    pub name: Option<String>,
    /// BAM type name such as `IP4Network`.
    #[serde(rename = "type", default)]
    pub object_type: Option<String>,
    /// Raw `key=value|` property string.
    #[serde(default)]
    pub properties: Option<String>,
}

impl ApiEntity {
    /// An entity with an empty property string.
    pub fn new(id: i64, name: impl Into<String>, object_type: ObjectType) -> Self {
        Self {
            id,
            name: Some(name.into()),
            object_type: Some(object_type.to_string()),
            properties: Some(String::new()),
        }
    }

    /// Replace the property string.
    pub fn with_properties(mut self, properties: impl Into<String>) -> Self {
        self.properties = Some(properties.into());
        self
    }

    /// Whether BAM returned a real object.
    pub fn exists(&self) -> bool {
        self.id != 0
    }

    /// The name, or `""` if unset.
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    /// The type name, or `""` if unset.
    pub fn object_type(&self) -> &str {
        self.object_type.as_deref().unwrap_or_default()
    }

    /// The property string, or `""` if unset.
    pub fn properties(&self) -> &str {
        self.properties.as_deref().unwrap_or_default()
    }
}

/// BAM object types handled by this provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    /// `IP4Block`
    Ip4Block,
    /// `IP4Network`
    Ip4Network,
    /// `DHCP4Range`
    Dhcp4Range,
    /// `IP4Address`
    Ip4Address,
}

impl ObjectType {
    /// The name BAM uses for the type.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ip4Block => "IP4Block",
            Self::Ip4Network => "IP4Network",
            Self::Dhcp4Range => "DHCP4Range",
            Self::Ip4Address => "IP4Address",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entity_deserialize() {
        let entity: ApiEntity = serde_json::from_value(json!({
            "id": 1001,
            "name": "office",
            "type": "IP4Network",
            "properties": "CIDR=10.0.0.0/24|"
        }))
        .unwrap();

        assert!(entity.exists());
        assert_eq!(entity.name(), "office");
        assert_eq!(entity.object_type(), "IP4Network");
        assert_eq!(entity.properties(), "CIDR=10.0.0.0/24|");
    }

    #[test]
    fn test_missing_entity_has_zero_id() {
        let entity: ApiEntity = serde_json::from_value(json!({
            "id": 0,
            "name": null,
            "type": null,
            "properties": null
        }))
        .unwrap();

        assert!(!entity.exists());
        assert_eq!(entity.name(), "");
        assert_eq!(entity.properties(), "");
    }

    #[test]
    fn test_entity_serializes_type_field() {
        let entity = ApiEntity::new(7, "lab", ObjectType::Ip4Network);
        let value = serde_json::to_value(&entity).unwrap();
        assert_eq!(value["type"], "IP4Network");
        assert_eq!(value["properties"], "");
    }
}
