//! Pairing identity: a random GUID and a short PIN.
//!
//! Both are shown to the user and sent to the relay, so they must come from a
//! cryptographic generator; the `CryptoRng` bound rules out clock-seeded ones.

use rand_core::{CryptoRng, RngCore};

use crate::storage::settings::{GUID_LEN, PIN_LEN};

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// 32 uppercase hex characters encoding 16 random bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Guid([u8; GUID_LEN]);

/// Four decimal digits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pin([u8; PIN_LEN]);

impl Guid {
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut raw = [0u8; GUID_LEN / 2];
        rng.fill_bytes(&mut raw);

        let mut text = [0u8; GUID_LEN];
        for (i, byte) in raw.iter().enumerate() {
            text[2 * i] = HEX_DIGITS[(byte >> 4) as usize];
            text[2 * i + 1] = HEX_DIGITS[(byte & 0x0F) as usize];
        }
        Self(text)
    }

    /// Take a GUID read back from settings. Only the length is checked.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        bytes.try_into().ok().map(Self)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl Pin {
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut digits = [b'0'; PIN_LEN];
        let mut filled = 0;

        // Bytes 250..=255 would skew the digits towards 0-5.
        while filled < PIN_LEN {
            let mut byte = [0u8; 1];
            rng.fill_bytes(&mut byte);
            if byte[0] < 250 {
                digits[filled] = b'0' + byte[0] % 10;
                filled += 1;
            }
        }
        Self(digits)
    }

    /// Take a PIN read back from settings. Only the length is checked.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        bytes.try_into().ok().map(Self)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.0).unwrap_or_default()
    }
}

/// GUID and PIN generated together on first boot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub guid: Guid,
    pub pin: Pin,
}

impl DeviceIdentity {
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self {
            guid: Guid::generate(rng),
            pin: Pin::generate(rng),
        }
    }
}
