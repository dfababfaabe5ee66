use core::fmt;

use heapless::Vec;

use crate::storage::settings::{PASSWORD_LEN, SSID_LEN};

/// Credentials collected from the portal while the access point is up.
///
/// Lives only between starting the access point and the next connection
/// attempt.
#[derive(Default, Clone, PartialEq, Eq)]
pub struct ProvisioningSession {
    ssid: Vec<u8, SSID_LEN>,
    password: Vec<u8, PASSWORD_LEN>,
}

impl ProvisioningSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one decoded form field. `ssid` and `pw` are recognised; other
    /// names are ignored and reported as `false`. Values are truncated to the
    /// settings field widths, and an empty `pw` clears the password.
    pub fn apply_field(&mut self, name: &str, value: &str) -> bool {
        match name {
            "ssid" => {
                store(&mut self.ssid, value.as_bytes());
                true
            }
            "pw" => {
                store(&mut self.password, value.as_bytes());
                true
            }
            _ => false,
        }
    }

    pub fn apply_form<'f, I>(&mut self, fields: I)
    where
        I: IntoIterator<Item = (&'f str, &'f str)>,
    {
        for (name, value) in fields {
            self.apply_field(name, value);
        }
    }

    pub fn ssid(&self) -> &[u8] {
        &self.ssid
    }

    pub fn password(&self) -> &[u8] {
        &self.password
    }

    /// Both an SSID and a password have been submitted
    pub fn is_complete(&self) -> bool {
        !self.ssid.is_empty() && !self.password.is_empty()
    }
}

fn store<const N: usize>(field: &mut Vec<u8, N>, value: &[u8]) {
    field.clear();
    let len = value.len().min(N);
    // Cannot fail, `len` fits the capacity.
    let _ = field.extend_from_slice(&value[..len]);
}

impl fmt::Debug for ProvisioningSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvisioningSession")
            .field("ssid", &core::str::from_utf8(&self.ssid).unwrap_or("<binary>"))
            .field("password_set", &!self.password.is_empty())
            .finish()
    }
}
