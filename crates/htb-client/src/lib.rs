//! # htb-client
//!
//! Typed asynchronous client for the Hack The Box platform API.
//!
//! [`HtbClient`] exposes the machine and VPN operations; request construction
//! and response classification are provided by [`htb_core`].
//!
//! ```no_run
//! use htb_client::{HtbClient, Product};
//!
//! # async fn example() -> htb_client::Result<()> {
//! let client = HtbClient::new("app-token")?;
//! let machine = client.find_active_machine_by_name("Lame").await?;
//! client.spawn_machine(machine.id).await?;
//!
//! let vpn = client.get_assigned_vpn_server(Product::Labs).await?;
//! println!("{} ({})", vpn.friendly_name, vpn.subscription_tier()?);
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod models;

pub use client::{HtbClient, HtbClientBuilder};
pub use htb_core::config::HtbClientConfig;
pub use htb_core::{Error, RequestContext, TransportError};
pub use models::{
    Machine, MachineAction, MachinesList, Product, SubscriptionTier, VpnServer, VpnServerOption,
    VpnServersData, VpnServersList,
};

/// Result type for client operations.
pub type Result<T> = htb_core::Result<T>;
