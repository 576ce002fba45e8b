//! Hack The Box domain models.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use htb_core::Error;
use serde::de::{self, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

/// A lab machine as returned by the machine endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Machine {
    /// Machine identifier.
    pub id: u64,
    /// Machine name. Omitted by some endpoints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Network address, present once the machine is running.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
}

/// Machines in the order the server returned them.
pub type MachinesList = Vec<Machine>;

/// Body posted to the spawn and terminate endpoints.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct MachineAction {
    /// Target machine.
    pub machine_id: u64,
}

/// A VPN connection server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VpnServer {
    /// Server identifier.
    pub id: u64,
    /// Display name, e.g. `EU VIP+ 3`.
    pub friendly_name: String,
    /// Location label.
    #[serde(default)]
    pub location: String,
}

impl VpnServer {
    /// Subscription tier the server belongs to, derived from its display name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownSubscriptionTier`] when the name carries none of
    /// the known tier tokens.
    pub fn subscription_tier(&self) -> Result<SubscriptionTier, Error> {
        let name = self.friendly_name.to_lowercase();
        SubscriptionTier::precedence()
            .iter()
            .copied()
            .find(|tier| name.contains(tier.as_str()))
            .ok_or_else(|| Error::UnknownSubscriptionTier {
                friendly_name: self.friendly_name.clone(),
            })
    }
}

/// VPN servers flattened into a single list.
pub type VpnServersList = Vec<VpnServer>;

/// Lab subscription tier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SubscriptionTier {
    /// Free servers
    #[serde(rename = "free")]
    Free,
    /// VIP servers
    #[serde(rename = "vip")]
    Vip,
    /// VIP+ servers
    #[serde(rename = "vip+")]
    VipPlus,
}

impl SubscriptionTier {
    /// Token that marks the tier in a server's display name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Vip => "vip",
            Self::VipPlus => "vip+",
        }
    }

    /// Order in which tokens are matched. `vip+` precedes `vip` because the
    /// latter is a substring of the former.
    #[must_use]
    pub const fn precedence() -> &'static [Self] {
        &[Self::Free, Self::VipPlus, Self::Vip]
    }
}

impl fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Product a VPN server list is requested for.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Product {
    /// Main labs
    #[default]
    Labs,
    /// Starting Point
    StartingPoint,
    /// Fortresses
    Fortresses,
    /// Endgames
    Endgames,
    /// Pro Labs
    Prolabs,
    /// Competitive (battlegrounds)
    Competitive,
}

impl Product {
    /// Value sent in the `product` query parameter.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Labs => "labs",
            Self::StartingPoint => "starting_point",
            Self::Fortresses => "fortresses",
            Self::Endgames => "endgames",
            Self::Prolabs => "prolabs",
            Self::Competitive => "competitive",
        }
    }

    /// Returns all products.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Labs,
            Self::StartingPoint,
            Self::Fortresses,
            Self::Endgames,
            Self::Prolabs,
            Self::Competitive,
        ]
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Product {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|product| product.as_str() == lowered)
            .ok_or_else(|| Error::ValidationError(format!("Unknown product: {s}")))
    }
}

/// Servers grouped under one option of the VPN listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VpnServerOption {
    /// Servers keyed by an opaque identifier.
    #[serde(default, deserialize_with = "deserialize_map")]
    pub servers: BTreeMap<String, VpnServer>,
}

/// Payload of the VPN servers endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VpnServersData {
    /// Server currently bound to the account, if any.
    #[serde(default)]
    pub assigned: Option<VpnServer>,
    /// Servers grouped by region, then by category.
    #[serde(default, deserialize_with = "deserialize_nested_map")]
    pub options: BTreeMap<String, BTreeMap<String, VpnServerOption>>,
}

impl VpnServersData {
    /// Flatten every option into one list.
    ///
    /// Order follows the sorted outer keys, then the sorted inner keys, then the
    /// sorted server keys.
    #[must_use]
    pub fn into_servers(self) -> VpnServersList {
        self.options
            .into_values()
            .flat_map(BTreeMap::into_values)
            .flat_map(|option| option.servers.into_values())
            .collect()
    }
}

/// Decode a map that the API may also send as `null` or as an empty array.
fn deserialize_map<'de, D, V>(deserializer: D) -> Result<BTreeMap<String, V>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    deserializer.deserialize_any(LenientMapVisitor(std::marker::PhantomData))
}

fn deserialize_nested_map<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<String, BTreeMap<String, VpnServerOption>>, D::Error>
where
    D: Deserializer<'de>,
{
    let outer: BTreeMap<String, LenientMap<VpnServerOption>> = deserialize_map(deserializer)?;
    Ok(outer
        .into_iter()
        .map(|(key, inner)| (key, inner.0))
        .collect())
}

/// Map wrapper decoded with the same leniency as [`deserialize_map`].
struct LenientMap<V>(BTreeMap<String, V>);

impl<'de, V> Deserialize<'de> for LenientMap<V>
where
    V: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserialize_map(deserializer).map(LenientMap)
    }
}

struct LenientMapVisitor<V>(std::marker::PhantomData<V>);

impl<'de, V> Visitor<'de> for LenientMapVisitor<V>
where
    V: Deserialize<'de>,
{
    type Value = BTreeMap<String, V>;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a map, null, or an empty array")
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(BTreeMap::new())
    }

    fn visit_none<E>(self) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(BTreeMap::new())
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        if seq.next_element::<IgnoredAny>()?.is_some() {
            return Err(de::Error::invalid_length(1, &"an empty array"));
        }
        Ok(BTreeMap::new())
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut values = BTreeMap::new();
        while let Some((key, value)) = map.next_entry::<String, V>()? {
            values.insert(key, value);
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn server(id: u64, friendly_name: &str) -> VpnServer {
        VpnServer {
            id,
            friendly_name: friendly_name.to_string(),
            location: "EU".to_string(),
        }
    }

    #[test]
    fn subscription_tier_free() {
        assert_eq!(
            server(1, "EU Free 1").subscription_tier().unwrap(),
            SubscriptionTier::Free
        );
    }

    #[test]
    fn subscription_tier_vip_plus_before_vip() {
        assert_eq!(
            server(2, "US VIP+ 3").subscription_tier().unwrap(),
            SubscriptionTier::VipPlus
        );
    }

    #[test]
    fn subscription_tier_vip() {
        assert_eq!(
            server(3, "DE VIP 2").subscription_tier().unwrap(),
            SubscriptionTier::Vip
        );
    }

    #[test]
    fn subscription_tier_unknown_is_error() {
        let err = server(4, "Mystery Server").subscription_tier().unwrap_err();
        match err {
            Error::UnknownSubscriptionTier { friendly_name } => {
                assert_eq!(friendly_name, "Mystery Server");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn machine_optional_fields() {
        let machine: Machine = serde_json::from_value(json!({ "id": 7 })).unwrap();
        assert_eq!(machine.id, 7);
        assert!(machine.name.is_none());
        assert!(machine.ip.is_none());

        let machine: Machine =
            serde_json::from_value(json!({ "id": 8, "name": "Lame", "ip": "10.10.10.3" }))
                .unwrap();
        assert_eq!(machine.name.as_deref(), Some("Lame"));
        assert_eq!(machine.ip.as_deref(), Some("10.10.10.3"));
    }

    #[test]
    fn identifiers_beyond_32_bits_decode() {
        let machine: Machine = serde_json::from_value(json!({ "id": 5_000_000_000_u64 })).unwrap();
        assert_eq!(machine.id, 5_000_000_000);

        let vpn: VpnServer = serde_json::from_value(
            json!({ "id": 4_294_967_296_u64, "friendly_name": "EU Free 9" }),
        )
        .unwrap();
        assert_eq!(vpn.id, u64::from(u32::MAX) + 1);
    }

    #[test]
    fn machine_action_body() {
        let body = serde_json::to_value(MachineAction { machine_id: 42 }).unwrap();
        assert_eq!(body, json!({ "machine_id": 42 }));
    }

    #[test]
    fn product_roundtrip() {
        for product in Product::all() {
            assert_eq!(product.as_str().parse::<Product>().unwrap(), *product);
            assert_eq!(
                serde_json::to_value(product).unwrap(),
                json!(product.as_str())
            );
        }
        assert!("arena".parse::<Product>().is_err());
    }

    #[test]
    fn flatten_yields_every_server() {
        let data: VpnServersData = serde_json::from_value(json!({
            "assigned": null,
            "options": {
                "EU": { "a": { "servers": { "s1": { "id": 1, "friendly_name": "EU Free 1", "location": "EU" } } } },
                "US": { "b": { "servers": { "s2": { "id": 2, "friendly_name": "US VIP 1", "location": "US" } } } }
            }
        }))
        .unwrap();

        let ids: Vec<u64> = data.into_servers().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn flatten_orders_by_keys() {
        let data: VpnServersData = serde_json::from_value(json!({
            "options": {
                "US": { "z": { "servers": { "b": { "id": 4, "friendly_name": "US VIP 2", "location": "US" },
                                             "a": { "id": 3, "friendly_name": "US VIP 1", "location": "US" } } } },
                "EU": { "y": { "servers": { "c": { "id": 2, "friendly_name": "EU VIP 2", "location": "EU" } } },
                        "x": { "servers": { "d": { "id": 1, "friendly_name": "EU VIP 1", "location": "EU" } } } }
            }
        }))
        .unwrap();

        let ids: Vec<u64> = data.into_servers().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn empty_array_options_decode_as_empty() {
        let data: VpnServersData =
            serde_json::from_value(json!({ "assigned": null, "options": [] })).unwrap();
        assert!(data.options.is_empty());
        assert!(data.into_servers().is_empty());

        let data: VpnServersData = serde_json::from_value(json!({
            "options": { "EU": { "a": { "servers": [] } } }
        }))
        .unwrap();
        assert!(data.into_servers().is_empty());
    }

    #[test]
    fn null_or_missing_options_decode_as_empty() {
        let data: VpnServersData = serde_json::from_value(json!({ "options": null })).unwrap();
        assert!(data.options.is_empty());

        let data: VpnServersData = serde_json::from_value(json!({})).unwrap();
        assert!(data.assigned.is_none());
        assert!(data.options.is_empty());
    }

    #[test]
    fn non_empty_array_options_are_rejected() {
        let result =
            serde_json::from_value::<VpnServersData>(json!({ "options": [{ "servers": {} }] }));
        assert!(result.is_err());
    }
}
