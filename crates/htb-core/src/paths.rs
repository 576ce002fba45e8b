//! Fixed Hack The Box API endpoints.
//!
//! The platform exposes a small, fixed set of paths under a single compiled-in
//! host. Requests can only target one of the [`ApiPath`] variants.

use std::str::FromStr;

use crate::error::{Error, Result};

/// Origin every request is sent to unless the client configuration overrides it.
pub const HTB_HOST: &str = "https://www.hackthebox.eu";

/// Query key for the listing page size.
pub const QUERY_KEY_PER_PAGE: &str = "per_page";
/// Query key for the machine name filter.
pub const QUERY_KEY_KEYWORD: &str = "keyword";
/// Query key for the VPN product.
pub const QUERY_KEY_PRODUCT: &str = "product";

/// Page size used for every machine listing.
pub const MACHINE_PAGE_SIZE: u32 = 100;

/// Supported API paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiPath {
    /// Paginated listing of retired machines
    ListRetiredMachines,
    /// Paginated listing of active machines
    ListActiveMachines,
    /// VPN servers for a product
    VpnServers,
    /// The machine currently running for the account
    ActiveMachine,
    /// Spawn a machine
    SpawnMachine,
    /// Terminate a machine
    TerminateMachine,
}

impl ApiPath {
    /// Returns the path component of the endpoint.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ListRetiredMachines => "/api/v4/machine/list/retired/paginated",
            Self::ListActiveMachines => "/api/v4/machine/paginated",
            Self::VpnServers => "/api/v4/connections/servers",
            Self::ActiveMachine => "/api/v4/machine/active",
            Self::SpawnMachine => "/api/v4/vm/spawn",
            Self::TerminateMachine => "/api/v4/vm/terminate",
        }
    }

    /// Returns all known paths.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::ListRetiredMachines,
            Self::ListActiveMachines,
            Self::VpnServers,
            Self::ActiveMachine,
            Self::SpawnMachine,
            Self::TerminateMachine,
        ]
    }
}

impl FromStr for ApiPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|path| path.as_str() == s)
            .ok_or_else(|| Error::ConfigError(format!("Unknown API path: {s}")))
    }
}

impl std::fmt::Display for ApiPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_values() {
        assert_eq!(
            ApiPath::ListActiveMachines.as_str(),
            "/api/v4/machine/paginated"
        );
        assert_eq!(ApiPath::VpnServers.as_str(), "/api/v4/connections/servers");
        assert_eq!(ApiPath::ActiveMachine.as_str(), "/api/v4/machine/active");
        assert_eq!(ApiPath::SpawnMachine.as_str(), "/api/v4/vm/spawn");
        assert_eq!(ApiPath::TerminateMachine.as_str(), "/api/v4/vm/terminate");
    }

    #[test]
    fn test_path_from_str_roundtrip() {
        for path in ApiPath::all() {
            assert_eq!(path.as_str().parse::<ApiPath>().unwrap(), *path);
            assert_eq!(path.to_string(), path.as_str());
        }
        assert!("/api/v4/unknown".parse::<ApiPath>().is_err());
    }

    #[test]
    fn test_host_has_no_trailing_slash() {
        assert!(!HTB_HOST.ends_with('/'));
    }
}
