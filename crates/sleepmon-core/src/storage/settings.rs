//! Persisted Wi-Fi settings block.
//!
//! One fixed 132-byte block at offset 0 of the settings resource:
//!
//! ```text
//! 0..32    ssid      NUL-padded
//! 32..96   password  NUL-padded
//! 96..128  guid      NUL-padded ASCII hex
//! 128..132 pin       ASCII digits
//! ```
//!
//! There is no checksum. A block torn by a power loss mid-write decodes as
//! whatever bytes landed; the provisioning flow then falls back to the portal
//! when the stored credentials fail to associate.

use core::fmt;

use log::{info, warn};

use super::{BlockStore, StorageError};

pub const SSID_LEN: usize = 32;
pub const PASSWORD_LEN: usize = 64;
pub const GUID_LEN: usize = 32;
pub const PIN_LEN: usize = 4;

/// Encoded size of [`WifiSettings`]
pub const SETTINGS_LEN: usize = SSID_LEN + PASSWORD_LEN + GUID_LEN + PIN_LEN;

const PASSWORD_AT: usize = SSID_LEN;
const GUID_AT: usize = PASSWORD_AT + PASSWORD_LEN;
const PIN_AT: usize = GUID_AT + GUID_LEN;

/// Network credentials plus the device's pairing identity
#[derive(Clone, PartialEq, Eq)]
pub struct WifiSettings {
    ssid: [u8; SSID_LEN],
    password: [u8; PASSWORD_LEN],
    guid: [u8; GUID_LEN],
    pin: [u8; PIN_LEN],
}

impl Default for WifiSettings {
    fn default() -> Self {
        Self::empty()
    }
}

impl WifiSettings {
    pub const fn empty() -> Self {
        Self {
            ssid: [0; SSID_LEN],
            password: [0; PASSWORD_LEN],
            guid: [0; GUID_LEN],
            pin: [0; PIN_LEN],
        }
    }

    pub fn ssid(&self) -> &[u8] {
        until_nul(&self.ssid)
    }

    pub fn password(&self) -> &[u8] {
        until_nul(&self.password)
    }

    pub fn guid(&self) -> &[u8] {
        until_nul(&self.guid)
    }

    pub fn pin(&self) -> &[u8] {
        until_nul(&self.pin)
    }

    /// Store `ssid`, truncated to 32 bytes.
    pub fn set_ssid(&mut self, ssid: &[u8]) {
        fill(&mut self.ssid, ssid);
    }

    /// Store `password`, truncated to 64 bytes.
    pub fn set_password(&mut self, password: &[u8]) {
        fill(&mut self.password, password);
    }

    pub fn set_identity(&mut self, guid: &[u8], pin: &[u8]) {
        fill(&mut self.guid, guid);
        fill(&mut self.pin, pin);
    }

    /// Whether both an SSID and a password are stored
    pub fn has_credentials(&self) -> bool {
        !self.ssid().is_empty() && !self.password().is_empty()
    }

    /// Whether a pairing identity is stored
    pub fn has_identity(&self) -> bool {
        !self.guid().is_empty() && !self.pin().is_empty()
    }

    /// Forget SSID and password, keeping the identity.
    pub fn clear_credentials(&mut self) {
        self.ssid = [0; SSID_LEN];
        self.password = [0; PASSWORD_LEN];
    }

    pub fn to_bytes(&self) -> [u8; SETTINGS_LEN] {
        let mut bytes = [0u8; SETTINGS_LEN];

        bytes[..PASSWORD_AT].copy_from_slice(&self.ssid);
        bytes[PASSWORD_AT..GUID_AT].copy_from_slice(&self.password);
        bytes[GUID_AT..PIN_AT].copy_from_slice(&self.guid);
        bytes[PIN_AT..].copy_from_slice(&self.pin);

        bytes
    }

    pub fn from_bytes(bytes: &[u8; SETTINGS_LEN]) -> Self {
        let mut settings = Self::empty();

        settings.ssid.copy_from_slice(&bytes[..PASSWORD_AT]);
        settings.password.copy_from_slice(&bytes[PASSWORD_AT..GUID_AT]);
        settings.guid.copy_from_slice(&bytes[GUID_AT..PIN_AT]);
        settings.pin.copy_from_slice(&bytes[PIN_AT..]);

        settings
    }
}

impl fmt::Debug for WifiSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WifiSettings")
            .field("ssid", &Lossy(self.ssid()))
            .field("password", &"<redacted>")
            .field("guid", &Lossy(self.guid()))
            .field("pin", &Lossy(self.pin()))
            .finish()
    }
}

struct Lossy<'a>(&'a [u8]);

impl fmt::Debug for Lossy<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match core::str::from_utf8(self.0) {
            Ok(text) => write!(f, "{:?}", text),
            Err(_) => write!(f, "{:02X?}", self.0),
        }
    }
}

fn until_nul(field: &[u8]) -> &[u8] {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    &field[..end]
}

fn fill(field: &mut [u8], value: &[u8]) {
    let len = value.len().min(field.len());
    field.fill(0);
    field[..len].copy_from_slice(&value[..len]);
}

/// Loads and saves [`WifiSettings`] at offset 0 of a [`BlockStore`]
pub struct SettingsStore<B: BlockStore> {
    store: B,
}

impl<B: BlockStore> SettingsStore<B> {
    pub fn new(store: B) -> Self {
        Self { store }
    }

    /// `Ok(None)` when no complete block has been written yet.
    pub fn load(&mut self) -> Result<Option<WifiSettings>, StorageError> {
        let size = self.store.size()?;
        if (size as usize) < SETTINGS_LEN {
            if size != 0 {
                warn!("Settings file holds {} bytes, expected {}", size, SETTINGS_LEN);
            }
            return Ok(None);
        }

        let mut raw = [0u8; SETTINGS_LEN];
        self.store.read_exact_at(0, &mut raw)?;

        let settings = WifiSettings::from_bytes(&raw);
        info!("Loaded settings: {:?}", settings);
        Ok(Some(settings))
    }

    /// Overwrite the block in place.
    pub fn save(&mut self, settings: &WifiSettings) -> Result<(), StorageError> {
        self.store.write_at(0, &settings.to_bytes())?;
        info!("Saved settings: {:?}", settings);
        Ok(())
    }

    pub fn into_inner(self) -> B {
        self.store
    }
}
