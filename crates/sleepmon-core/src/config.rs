use core::net::Ipv4Addr;

use alloc::vec::Vec;
use log::warn;
use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

use crate::network::PortalEndpoint;
use crate::storage::LogConfig;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("configuration blob could not be decoded")]
    Decode,
    #[error("configuration could not be encoded")]
    Encode,
}

/// Device-wide settings. `Default` matches the shipped hardware.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(bound(deserialize = "'de: 'a"))]
pub struct DeviceConfig<'a> {
    /// SSID of the provisioning access point
    pub access_point_ssid: &'a str,
    /// Hostname announced when joining the home network
    pub hostname: &'a str,
    pub access_point_ip: [u8; 4],
    pub dns_port: u16,
    pub http_port: u16,
    /// Port the companion app reaches the device on, reported to the relay
    pub listen_port: u16,
    pub log_capacity: u32,
    pub sample_interval_secs: u32,
    pub relay: RelayConfig<'a>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(bound(deserialize = "'de: 'a"))]
pub struct RelayConfig<'a> {
    pub host: &'a str,
    pub port: u16,
    pub path: &'a str,
    pub user_agent: &'a str,
}

impl Default for DeviceConfig<'_> {
    fn default() -> Self {
        Self {
            access_point_ssid: "SleepMonitor",
            hostname: "SleepMonitor",
            access_point_ip: [192, 168, 1, 1],
            dns_port: 53,
            http_port: 80,
            listen_port: 36099,
            // One week at one sample per minute
            log_capacity: 7 * 24 * 60,
            sample_interval_secs: 60,
            relay: RelayConfig::default(),
        }
    }
}

impl Default for RelayConfig<'_> {
    fn default() -> Self {
        Self {
            host: "y0pths7tg4.execute-api.us-east-1.amazonaws.com",
            port: 443,
            path: "/prod/guid",
            user_agent: "SleepMonitor",
        }
    }
}

impl<'a> DeviceConfig<'a> {
    pub fn access_point_address(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.access_point_ip)
    }

    pub fn portal_endpoint(&self) -> PortalEndpoint {
        PortalEndpoint {
            address: self.access_point_address(),
            dns_port: self.dns_port,
            http_port: self.http_port,
        }
    }

    pub fn log_config(&self) -> LogConfig {
        LogConfig::new(self.log_capacity)
    }

    /// Decode a config blob written by [`to_postcard`](Self::to_postcard).
    /// String fields borrow from `bytes`.
    pub fn from_postcard(bytes: &'a [u8]) -> Result<Self, ConfigError> {
        postcard::from_bytes(bytes).map_err(|e| {
            warn!("Failed to decode device config: {:?}", e);
            ConfigError::Decode
        })
    }

    pub fn to_postcard(&self) -> Result<Vec<u8>, ConfigError> {
        postcard::to_allocvec(self).map_err(|e| {
            warn!("Failed to encode device config: {:?}", e);
            ConfigError::Encode
        })
    }
}
