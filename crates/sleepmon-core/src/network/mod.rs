//! Network bring-up: credentials, access point provisioning and cloud pairing.
//!
//! The radio, the captive portal (DNS responder plus HTTP server) and the TLS
//! transport to the relay are platform capabilities. They are reached only
//! through [`WifiRadio`], [`CaptivePortal`] and [`RelayConnector`], so the
//! [`Provisioner`] state machine runs unchanged on hardware, in the simulator
//! and in tests.

pub mod identity;
pub mod provisioning;
pub mod relay;
pub mod session;

pub use identity::{DeviceIdentity, Guid, Pin};
pub use provisioning::{Provisioner, ProvisioningError, ProvisioningState};
pub use relay::{RelayClient, RelayConnector, RelayError, RelayResponse};
pub use session::ProvisioningSession;

use core::net::Ipv4Addr;

use thiserror_no_std::Error;

/// Most network names listed on the portal page
pub const MAX_VISIBLE_NETWORKS: usize = 16;

pub type NetworkName = heapless::String<32>;
pub type VisibleNetworks = heapless::Vec<NetworkName, MAX_VISIBLE_NETWORKS>;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioError {
    #[error("could not associate with the network")]
    AssociationFailed,
    #[error("access point failed to start")]
    AccessPointStart,
    #[error("network scan failed")]
    ScanFailed,
    #[error("captive portal failed to start")]
    PortalStart,
}

/// Station and access point control of the Wi-Fi radio
pub trait WifiRadio {
    /// Join a network as a station, announcing `hostname`. Blocks until the
    /// radio reports success or gives up.
    fn join(&mut self, ssid: &[u8], password: &[u8], hostname: &str) -> Result<(), RadioError>;

    /// Fill `found` with the names of nearby networks.
    fn scan(&mut self, found: &mut VisibleNetworks) -> Result<(), RadioError>;

    fn start_access_point(&mut self, ssid: &str, address: Ipv4Addr) -> Result<(), RadioError>;

    fn stop_access_point(&mut self);

    /// Station address once joined
    fn local_address(&self) -> Option<Ipv4Addr>;
}

/// Where the captive portal listens on the access point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortalEndpoint {
    pub address: Ipv4Addr,
    pub dns_port: u16,
    pub http_port: u16,
}

/// What the portal page shows
#[derive(Debug, Clone, Copy)]
pub struct PortalView<'a> {
    pub pin: &'a str,
    pub networks: &'a [NetworkName],
    pub access_point_ssid: &'a str,
}

/// DNS redirector and HTTP server of the provisioning access point.
///
/// The HTML and the request codec live with the implementation. A `POST
/// /connect` feeds its decoded form pairs into the session through
/// [`ProvisioningSession::apply_form`].
pub trait CaptivePortal {
    /// Start the DNS responder and HTTP server. Called once.
    fn start(&mut self, endpoint: PortalEndpoint) -> Result<(), RadioError>;

    /// Handle whatever requests are pending, then return without blocking.
    fn poll(&mut self, view: &PortalView<'_>, session: &mut ProvisioningSession);
}
