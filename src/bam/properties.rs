//! Parsing of BAM property strings.
//!
//! BAM returns object attributes as a single string of `key=value` fields
//! separated by `|`, usually with a trailing `|`:
//!
//! ```text
//! CIDR=10.10.0.0/24|allowDuplicateHost=disable|inheritAllowDuplicateHost=true|
//! ```

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

/// Errors raised while parsing a property string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropertyError {
    /// A field had no `=` between key and value.
    #[error("property field '{0}' is not of the form key=value")]
    MissingSeparator(String),

    /// A boolean-valued property held something other than a boolean.
    #[error("unable to parse {key} to bool: '{value}'")]
    InvalidBool {
        /// The property key.
        key: String,
        /// The offending value.
        value: String,
    },

    /// A CIDR value had no usable prefix length.
    #[error("error parsing netmask from CIDR '{0}'")]
    InvalidCidr(String),
}

/// Split a property string into its `(key, value)` fields, in order.
///
/// Empty fields (including the one after a trailing `|`) are skipped. The
/// value is everything after the first `=`.
pub fn parse_properties(raw: &str) -> Result<Vec<(&str, &str)>, PropertyError> {
    raw.split('|')
        .filter(|field| !field.is_empty())
        .map(|field| {
            field
                .split_once('=')
                .ok_or_else(|| PropertyError::MissingSeparator(field.to_string()))
        })
        .collect()
}

/// Parse a boolean the way BAM clients conventionally do.
pub fn parse_bool(key: &str, value: &str) -> Result<bool, PropertyError> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        _ => Err(PropertyError::InvalidBool {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Prefix length of a CIDR string such as `10.0.0.0/24`.
pub fn cidr_prefix_len(cidr: &str) -> Result<u8, PropertyError> {
    let (_, prefix) = cidr
        .split_once('/')
        .ok_or_else(|| PropertyError::InvalidCidr(cidr.to_string()))?;

    match prefix.parse::<u8>() {
        Ok(len) if len <= 32 => Ok(len),
        _ => Err(PropertyError::InvalidCidr(cidr.to_string())),
    }
}

fn parse_id_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// Typed view of an IP4 block, network or range property string.
///
/// Field names serialize to the state attribute names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Ip4NetworkProperties {
    /// `CIDR`, empty for ranges.
    pub cidr: String,
    /// Id of the applied IP4 template.
    pub template: String,
    /// Gateway address.
    pub gateway: String,
    /// Ids of the default DNS domains.
    pub default_domains: Vec<String>,
    /// Id of the default DNS view.
    pub default_view: String,
    /// Ids of the DNS restrictions.
    pub dns_restrictions: Vec<String>,
    /// `enable` or `disable`.
    pub allow_duplicate_host: String,
    /// `enable` or `disable`.
    pub ping_before_assign: String,
    /// Free-form reference text.
    pub reference: String,
    /// Whether `allow_duplicate_host` comes from the parent.
    pub inherit_allow_duplicate_host: bool,
    /// Whether `ping_before_assign` comes from the parent.
    pub inherit_ping_before_assign: bool,
    /// Whether `dns_restrictions` come from the parent.
    pub inherit_dns_restrictions: bool,
    /// Whether `default_domains` come from the parent.
    pub inherit_default_domains: bool,
    /// Whether `default_view` comes from the parent.
    pub inherit_default_view: bool,
    /// Location code such as `US NYC`.
    pub location_code: String,
    /// Whether the location comes from the parent.
    pub location_inherited: bool,
    /// User-defined fields and any other keys not listed above.
    pub custom_properties: BTreeMap<String, String>,
}

impl Ip4NetworkProperties {
    /// Parse a property string. Unknown keys are logged and collected into
    /// `custom_properties`.
    pub fn parse(raw: &str) -> Result<Self, PropertyError> {
        let mut props = Self::default();

        for (key, value) in parse_properties(raw)? {
            match key {
                "CIDR" => props.cidr = value.to_string(),
                "template" => props.template = value.to_string(),
                "gateway" => props.gateway = value.to_string(),
                "defaultDomains" => props.default_domains = parse_id_list(value),
                "defaultView" => props.default_view = value.to_string(),
                "dnsRestrictions" => props.dns_restrictions = parse_id_list(value),
                "allowDuplicateHost" => props.allow_duplicate_host = value.to_string(),
                "pingBeforeAssign" => props.ping_before_assign = value.to_string(),
                "reference" => props.reference = value.to_string(),
                "inheritAllowDuplicateHost" => {
                    props.inherit_allow_duplicate_host = parse_bool(key, value)?
                }
                "inheritPingBeforeAssign" => {
                    props.inherit_ping_before_assign = parse_bool(key, value)?
                }
                "inheritDNSRestrictions" => {
                    props.inherit_dns_restrictions = parse_bool(key, value)?
                }
                "inheritDefaultDomains" => props.inherit_default_domains = parse_bool(key, value)?,
                "inheritDefaultView" => props.inherit_default_view = parse_bool(key, value)?,
                "locationCode" => props.location_code = value.to_string(),
                "locationInherited" => props.location_inherited = parse_bool(key, value)?,
                _ => {
                    warn!(property = key, "Unknown IP4 network property");
                    props
                        .custom_properties
                        .insert(key.to_string(), value.to_string());
                }
            }
        }

        Ok(props)
    }

    /// Prefix length of the `CIDR` property, or `None` when the object has
    /// no CIDR (ranges, for example).
    pub fn prefix_len(&self) -> Result<Option<u8>, PropertyError> {
        if self.cidr.is_empty() {
            return Ok(None);
        }
        cidr_prefix_len(&self.cidr).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NETWORK: &str = "CIDR=10.10.0.0/24|template=3001|gateway=10.10.0.1|\
        defaultDomains=2001,2002|defaultView=1050|dnsRestrictions=4001|\
        allowDuplicateHost=disable|pingBeforeAssign=enable|\
        inheritAllowDuplicateHost=true|inheritPingBeforeAssign=false|\
        inheritDNSRestrictions=true|inheritDefaultDomains=true|\
        inheritDefaultView=false|locationCode=US NYC|locationInherited=true|";

    #[test]
    fn test_parse_properties_pairs() {
        let fields = parse_properties("CIDR=10.0.0.0/8|gateway=10.0.0.1|").unwrap();
        assert_eq!(fields, vec![("CIDR", "10.0.0.0/8"), ("gateway", "10.0.0.1")]);
    }

    #[test]
    fn test_trailing_separator_optional() {
        let with = parse_properties("a=1|b=2|").unwrap();
        let without = parse_properties("a=1|b=2").unwrap();
        assert_eq!(with, without);
        assert!(parse_properties("").unwrap().is_empty());
    }

    #[test]
    fn test_value_may_contain_equals() {
        let fields = parse_properties("reference=a=b|").unwrap();
        assert_eq!(fields, vec![("reference", "a=b")]);
    }

    #[test]
    fn test_field_without_separator() {
        let err = parse_properties("CIDR=10.0.0.0/8|broken|").unwrap_err();
        assert_eq!(err, PropertyError::MissingSeparator("broken".to_string()));
    }

    #[test]
    fn test_parse_bool_variants() {
        for v in ["1", "t", "T", "TRUE", "true", "True"] {
            assert!(parse_bool("k", v).unwrap());
        }
        for v in ["0", "f", "F", "FALSE", "false", "False"] {
            assert!(!parse_bool("k", v).unwrap());
        }
        assert!(matches!(
            parse_bool("inheritDefaultView", "yes"),
            Err(PropertyError::InvalidBool { .. })
        ));
    }

    #[test]
    fn test_parse_network_properties() {
        let props = Ip4NetworkProperties::parse(NETWORK).unwrap();

        assert_eq!(props.cidr, "10.10.0.0/24");
        assert_eq!(props.template, "3001");
        assert_eq!(props.gateway, "10.10.0.1");
        assert_eq!(props.default_domains, vec!["2001", "2002"]);
        assert_eq!(props.default_view, "1050");
        assert_eq!(props.dns_restrictions, vec!["4001"]);
        assert_eq!(props.allow_duplicate_host, "disable");
        assert_eq!(props.ping_before_assign, "enable");
        assert!(props.inherit_allow_duplicate_host);
        assert!(!props.inherit_ping_before_assign);
        assert!(props.inherit_dns_restrictions);
        assert!(props.inherit_default_domains);
        assert!(!props.inherit_default_view);
        assert_eq!(props.location_code, "US NYC");
        assert!(props.location_inherited);
    }

    #[test]
    fn test_unknown_keys_become_custom_properties() {
        let props = Ip4NetworkProperties::parse(
            "CIDR=10.0.0.0/16|sharedNetwork=77|costCenter=ops=east|",
        )
        .unwrap();
        assert_eq!(props.cidr, "10.0.0.0/16");
        assert_eq!(props.custom_properties.len(), 2);
        assert_eq!(props.custom_properties["sharedNetwork"], "77");
        assert_eq!(props.custom_properties["costCenter"], "ops=east");

        let known = Ip4NetworkProperties::parse(NETWORK).unwrap();
        assert!(known.custom_properties.is_empty());
    }

    #[test]
    fn test_custom_properties_serialize_as_map() {
        let props = Ip4NetworkProperties::parse("sharedNetwork=77|").unwrap();
        let value = serde_json::to_value(&props).unwrap();
        assert_eq!(
            value["custom_properties"],
            serde_json::json!({"sharedNetwork": "77"})
        );
    }

    #[test]
    fn test_bad_bool_names_key() {
        let err = Ip4NetworkProperties::parse("inheritDefaultView=maybe|").unwrap_err();
        assert_eq!(
            err.to_string(),
            "unable to parse inheritDefaultView to bool: 'maybe'"
        );
    }

    #[test]
    fn test_cidr_prefix_len() {
        assert_eq!(cidr_prefix_len("10.0.0.0/24").unwrap(), 24);
        assert_eq!(cidr_prefix_len("0.0.0.0/0").unwrap(), 0);
        assert_eq!(cidr_prefix_len("10.0.0.1/32").unwrap(), 32);
        assert!(cidr_prefix_len("10.0.0.0").is_err());
        assert!(cidr_prefix_len("10.0.0.0/33").is_err());
        assert!(cidr_prefix_len("10.0.0.0/x").is_err());
    }

    #[test]
    fn test_prefix_len_without_cidr() {
        let props = Ip4NetworkProperties::parse("start=10.0.0.10|end=10.0.0.20|").unwrap();
        assert_eq!(props.prefix_len().unwrap(), None);
    }
}
