//! Wi-Fi provisioning state machine.
//!
//! ```text
//!            stored credentials
//!   Idle ──────────────────────> TryStoredCredentials ──ok──> Connected
//!    │                                  │ fail
//!    │ none                             v
//!    └────────────────────────> AccessPointActive <────────────┐
//!                                       │                      │ fail
//!                                       v                      │
//!                               AwaitingSubmission ──> TryNewCredentials ──ok──> Connected
//! ```
//!
//! Any failure to bring up the access point or the portal ends in `Failed`.
//! The host drives the machine by calling [`Provisioner::poll`], which does
//! one step and returns, so it can interleave provisioning with sampling or
//! give up at any time with [`Provisioner::cancel`].

use core::str;

use log::{debug, error, info, warn};
use rand_core::{CryptoRng, RngCore};
use thiserror_no_std::Error;

use super::identity::{DeviceIdentity, Guid, Pin};
use super::relay::{RelayClient, RelayConnector, RelayError, RelayResponse};
use super::session::ProvisioningSession;
use super::{CaptivePortal, PortalView, VisibleNetworks, WifiRadio};
use crate::config::DeviceConfig;
use crate::storage::{BlockStore, SettingsStore, WifiSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisioningState {
    Idle,
    TryStoredCredentials,
    AccessPointActive,
    AwaitingSubmission,
    TryNewCredentials,
    Connected,
    Failed,
}

impl ProvisioningState {
    /// No further progress is possible from this state
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Connected | Self::Failed)
    }
}

/// Unrecoverable provisioning failures
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisioningError {
    #[error("access point failed to start")]
    AccessPointStart,
    #[error("captive portal failed to start")]
    PortalStart,
}

pub struct Provisioner<'a, R, P, C, B, E>
where
    R: WifiRadio,
    P: CaptivePortal,
    C: RelayConnector,
    B: BlockStore,
    E: RngCore + CryptoRng,
{
    config: DeviceConfig<'a>,
    radio: R,
    portal: P,
    connector: C,
    settings_store: SettingsStore<B>,
    entropy: E,

    settings: WifiSettings,
    session: Option<ProvisioningSession>,
    networks: VisibleNetworks,
    state: ProvisioningState,
    scanned: bool,
    access_point_up: bool,
    portal_started: bool,
    /// Identity generated this boot and not yet written to the store
    identity_unsaved: bool,
    failure: Option<ProvisioningError>,
    registration: Option<Result<RelayResponse, RelayError>>,
}

impl<'a, R, P, C, B, E> Provisioner<'a, R, P, C, B, E>
where
    R: WifiRadio,
    P: CaptivePortal,
    C: RelayConnector,
    B: BlockStore,
    E: RngCore + CryptoRng,
{
    pub fn new(
        config: DeviceConfig<'a>,
        radio: R,
        portal: P,
        connector: C,
        settings_store: SettingsStore<B>,
        entropy: E,
    ) -> Self {
        Self {
            config,
            radio,
            portal,
            connector,
            settings_store,
            entropy,
            settings: WifiSettings::empty(),
            session: None,
            networks: VisibleNetworks::new(),
            state: ProvisioningState::Idle,
            scanned: false,
            access_point_up: false,
            portal_started: false,
            identity_unsaved: false,
            failure: None,
            registration: None,
        }
    }

    pub fn state(&self) -> ProvisioningState {
        self.state
    }

    /// Settings as currently held in memory
    pub fn settings(&self) -> &WifiSettings {
        &self.settings
    }

    /// Networks found by the scan when the access point first came up
    pub fn networks(&self) -> &VisibleNetworks {
        &self.networks
    }

    /// Outcome of the relay registration, once attempted
    pub fn registration(&self) -> Option<&Result<RelayResponse, RelayError>> {
        self.registration.as_ref()
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    pub fn portal(&self) -> &P {
        &self.portal
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Advance the machine by one step.
    ///
    /// In `AwaitingSubmission` a step is one pass of the portal. Once
    /// `Connected`, further calls do nothing. Once `Failed`, every call returns
    /// the error that caused it.
    pub fn poll(&mut self) -> Result<ProvisioningState, ProvisioningError> {
        let next = match self.state {
            ProvisioningState::Idle => self.load_settings(),
            ProvisioningState::TryStoredCredentials => self.try_stored_credentials(),
            ProvisioningState::AccessPointActive => match self.open_access_point() {
                Ok(next) => next,
                Err(e) => {
                    error!("Provisioning halted: {}", e);
                    self.failure = Some(e);
                    self.state = ProvisioningState::Failed;
                    return Err(e);
                }
            },
            ProvisioningState::AwaitingSubmission => self.await_submission(),
            ProvisioningState::TryNewCredentials => self.try_new_credentials(),
            ProvisioningState::Connected => ProvisioningState::Connected,
            ProvisioningState::Failed => {
                return Err(self.failure.unwrap_or(ProvisioningError::AccessPointStart));
            }
        };

        if next != self.state {
            debug!("Provisioning {:?} -> {:?}", self.state, next);
        }
        self.state = next;
        Ok(next)
    }

    /// Poll until a terminal state, or until `keep_going` returns `false` for
    /// the state just reached.
    pub fn run_until<F>(&mut self, mut keep_going: F) -> Result<ProvisioningState, ProvisioningError>
    where
        F: FnMut(ProvisioningState) -> bool,
    {
        loop {
            let state = self.poll()?;
            if state.is_terminal() || !keep_going(state) {
                return Ok(state);
            }
        }
    }

    /// Stop the access point if it is up and start over from `Idle`.
    ///
    /// The portal keeps running; it is not started a second time.
    pub fn cancel(&mut self) {
        if self.access_point_up {
            self.radio.stop_access_point();
            self.access_point_up = false;
        }
        self.session = None;
        self.failure = None;
        self.state = ProvisioningState::Idle;
        info!("Provisioning cancelled");
    }

    fn load_settings(&mut self) -> ProvisioningState {
        let loaded = match self.settings_store.load() {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!("Could not read settings, provisioning from scratch: {}", e);
                None
            }
        };

        let next = match &loaded {
            Some(settings) if settings.has_credentials() => ProvisioningState::TryStoredCredentials,
            Some(_) => {
                info!("Stored settings hold no credentials");
                ProvisioningState::AccessPointActive
            }
            None => {
                info!("No stored settings");
                ProvisioningState::AccessPointActive
            }
        };

        let held = core::mem::replace(&mut self.settings, loaded.unwrap_or_else(WifiSettings::empty));
        self.ensure_identity(&held);
        next
    }

    /// Give the settings a usable identity: the stored one, else the one
    /// already shown this boot, else a fresh one.
    fn ensure_identity(&mut self, held: &WifiSettings) {
        if identity_usable(&self.settings) {
            return;
        }

        if identity_usable(held) {
            self.settings.set_identity(held.guid(), held.pin());
            debug!("Keeping the identity generated earlier this boot");
        } else {
            let identity = DeviceIdentity::generate(&mut self.entropy);
            self.settings
                .set_identity(identity.guid.as_bytes(), identity.pin.as_bytes());
            info!("Generated device identity {}", identity.guid.as_str());
        }
        self.identity_unsaved = true;
    }

    fn save_settings(&mut self) {
        match self.settings_store.save(&self.settings) {
            Ok(()) => self.identity_unsaved = false,
            Err(e) => error!("Connected, but settings could not be saved: {}", e),
        }
    }

    fn try_stored_credentials(&mut self) -> ProvisioningState {
        if self.join() {
            if self.identity_unsaved {
                self.save_settings();
            }
            self.register();
            return ProvisioningState::Connected;
        }

        // The stored copy stays on the card until new credentials are saved.
        warn!("Stored credentials failed, falling back to access point");
        self.settings.clear_credentials();
        ProvisioningState::AccessPointActive
    }

    fn open_access_point(&mut self) -> Result<ProvisioningState, ProvisioningError> {
        let address = self.config.access_point_address();

        if !self.scanned {
            self.networks.clear();
            if let Err(e) = self.radio.scan(&mut self.networks) {
                warn!("Network scan failed, portal will list none: {}", e);
                self.networks.clear();
            }
            info!("Found {} networks", self.networks.len());
            self.scanned = true;
        }

        if !self.access_point_up {
            self.radio
                .start_access_point(self.config.access_point_ssid, address)
                .map_err(|e| {
                    error!("Access point failed to start: {}", e);
                    ProvisioningError::AccessPointStart
                })?;
            self.access_point_up = true;
            info!("Access point {} up at {}", self.config.access_point_ssid, address);
        }

        if !self.portal_started {
            let endpoint = self.config.portal_endpoint();
            self.portal.start(endpoint).map_err(|e| {
                error!("Captive portal failed to start: {}", e);
                ProvisioningError::PortalStart
            })?;
            self.portal_started = true;
            info!(
                "Captive portal up, DNS on port {}, HTTP on port {}",
                endpoint.dns_port, endpoint.http_port
            );
        }

        self.session = Some(ProvisioningSession::new());
        Ok(ProvisioningState::AwaitingSubmission)
    }

    fn await_submission(&mut self) -> ProvisioningState {
        let session = self.session.get_or_insert_with(ProvisioningSession::new);
        let view = PortalView {
            pin: str::from_utf8(self.settings.pin()).unwrap_or_default(),
            networks: &self.networks,
            access_point_ssid: self.config.access_point_ssid,
        };

        self.portal.poll(&view, session);

        if !session.is_complete() {
            return ProvisioningState::AwaitingSubmission;
        }

        info!("Credentials submitted: {:?}", session);
        self.radio.stop_access_point();
        self.access_point_up = false;
        ProvisioningState::TryNewCredentials
    }

    fn try_new_credentials(&mut self) -> ProvisioningState {
        if let Some(session) = self.session.take() {
            self.settings.set_ssid(session.ssid());
            self.settings.set_password(session.password());
        }

        if !self.join() {
            warn!("Submitted credentials failed, reopening access point");
            self.settings.clear_credentials();
            return ProvisioningState::AccessPointActive;
        }

        self.save_settings();
        self.register();
        ProvisioningState::Connected
    }

    fn join(&mut self) -> bool {
        let ssid = self.settings.ssid();
        info!("Joining {}", str::from_utf8(ssid).unwrap_or("<non-utf8 ssid>"));

        match self
            .radio
            .join(ssid, self.settings.password(), self.config.hostname)
        {
            Ok(()) => {
                match self.radio.local_address() {
                    Some(address) => info!("Connected as {}", address),
                    None => info!("Connected"),
                }
                true
            }
            Err(e) => {
                warn!("Join failed: {}", e);
                false
            }
        }
    }

    /// Best effort: a failure is logged and kept for inspection only.
    fn register(&mut self) {
        let guid = Guid::from_bytes(self.settings.guid());
        let pin = Pin::from_bytes(self.settings.pin());

        let result = match (guid, pin) {
            (Some(guid), Some(pin)) => RelayClient::new(self.config.relay).register(
                &mut self.connector,
                &guid,
                &pin,
                self.config.listen_port,
            ),
            _ => Err(RelayError::InvalidIdentity),
        };

        if let Err(e) = &result {
            warn!("Relay registration failed, continuing without it: {}", e);
        }
        self.registration = Some(result);
    }
}

fn identity_usable(settings: &WifiSettings) -> bool {
    Guid::from_bytes(settings.guid()).is_some() && Pin::from_bytes(settings.pin()).is_some()
}

#[cfg(test)]
mod tests {
    use alloc::format;
    use alloc::string::String;
    use core::net::Ipv4Addr;

    use super::*;
    use crate::mock::{CountingEntropy, MockConnector, MockPortal, MockRadio};
    use crate::network::PortalEndpoint;
    use crate::storage::{MemoryBlockStore, SETTINGS_LEN};

    type TestProvisioner<'s> =
        Provisioner<'static, MockRadio, MockPortal, MockConnector, &'s mut MemoryBlockStore, CountingEntropy>;

    const RELAY_OK: &[u8] = b"HTTP/1.1 200 OK\r\n\r\n";

    fn stored(ssid: &[u8], password: &[u8]) -> MemoryBlockStore {
        let mut settings = WifiSettings::empty();
        settings.set_ssid(ssid);
        settings.set_password(password);
        settings.set_identity(b"00112233445566778899AABBCCDDEEFF", b"1234");
        MemoryBlockStore::from_bytes(settings.to_bytes().to_vec())
    }

    fn provisioner<'s>(
        store: &'s mut MemoryBlockStore,
        radio: MockRadio,
        portal: MockPortal,
        connector: MockConnector,
    ) -> TestProvisioner<'s> {
        Provisioner::new(
            DeviceConfig::default(),
            radio,
            portal,
            connector,
            SettingsStore::new(store),
            CountingEntropy::default(),
        )
    }

    fn run(machine: &mut TestProvisioner<'_>) -> Result<ProvisioningState, ProvisioningError> {
        let mut budget = 50;
        machine.run_until(|_| {
            budget -= 1;
            budget > 0
        })
    }

    #[test]
    fn test_no_settings_opens_access_point_without_joining() {
        let mut store = MemoryBlockStore::new();
        let mut machine = provisioner(
            &mut store,
            MockRadio::accepting(b"HomeNet", b"hunter22"),
            MockPortal::default(),
            MockConnector::answering(RELAY_OK),
        );

        assert_eq!(machine.poll(), Ok(ProvisioningState::AccessPointActive));
        assert_eq!(machine.poll(), Ok(ProvisioningState::AwaitingSubmission));

        assert_eq!(machine.radio().joins, 0);
        assert_eq!(machine.radio().ap_starts, 1);
        assert_eq!(machine.portal().starts, 1);
        assert_eq!(machine.settings().guid().len(), 32);
        assert_eq!(machine.settings().pin().len(), 4);
    }

    #[test]
    fn test_stored_credentials_connect_and_register() {
        let mut store = stored(b"HomeNet", b"hunter22");
        let mut machine = provisioner(
            &mut store,
            MockRadio::accepting(b"HomeNet", b"hunter22"),
            MockPortal::default(),
            MockConnector::answering(RELAY_OK),
        );

        assert_eq!(machine.poll(), Ok(ProvisioningState::TryStoredCredentials));
        assert_eq!(machine.poll(), Ok(ProvisioningState::Connected));

        assert_eq!(machine.radio().ap_starts, 0);
        assert_eq!(machine.radio().last_hostname.as_deref(), Some("SleepMonitor"));
        assert_eq!(
            machine.registration().map(|r| r.map(|resp| resp.status)),
            Some(Ok(Some(200)))
        );
        let sent = String::from_utf8(machine.connector().sent()).unwrap();
        assert!(sent.contains("guid=00112233445566778899AABBCCDDEEFF&pin=1234&port=36099"));
    }

    #[test]
    fn test_failed_stored_credentials_clear_and_start_access_point_once() {
        let mut store = stored(b"OldNet", b"stale");
        let mut machine = provisioner(
            &mut store,
            MockRadio::accepting(b"HomeNet", b"hunter22"),
            MockPortal::default(),
            MockConnector::answering(RELAY_OK),
        );

        assert_eq!(machine.poll(), Ok(ProvisioningState::TryStoredCredentials));
        assert_eq!(machine.poll(), Ok(ProvisioningState::AccessPointActive));
        assert!(!machine.settings().has_credentials());
        assert_eq!(machine.settings().pin(), b"1234");

        assert_eq!(machine.poll(), Ok(ProvisioningState::AwaitingSubmission));
        for _ in 0..5 {
            assert_eq!(machine.poll(), Ok(ProvisioningState::AwaitingSubmission));
        }

        assert_eq!(machine.radio().joins, 1);
        assert_eq!(machine.radio().ap_starts, 1);
        drop(machine);

        // Nothing new was saved, the card still has the old block.
        assert_eq!(&store.as_bytes()[..6], b"OldNet");
    }

    #[test]
    fn test_portal_submission_connects_and_persists() {
        let mut store = MemoryBlockStore::new();
        let mut portal = MockPortal::default();
        portal.submit(&[("ssid", "HomeNet"), ("pw", "hunter22")]);
        let mut machine = provisioner(
            &mut store,
            MockRadio::accepting(b"HomeNet", b"hunter22").with_networks(&["HomeNet", "Neighbour"]),
            portal,
            MockConnector::answering(RELAY_OK),
        );

        assert_eq!(run(&mut machine), Ok(ProvisioningState::Connected));
        assert_eq!(machine.networks().len(), 2);
        assert_eq!(machine.radio().ap_stops, 1);
        assert_eq!(machine.portal().last_pin.len(), 4);
        let pin = machine.settings().pin().to_vec();
        drop(machine);

        let saved = SettingsStore::new(&mut store).load().unwrap().unwrap();
        assert_eq!(saved.ssid(), b"HomeNet");
        assert_eq!(saved.password(), b"hunter22");
        assert_eq!(saved.pin(), pin.as_slice());
        assert_eq!(store.as_bytes().len(), SETTINGS_LEN);
    }

    #[test]
    fn test_wrong_password_restarts_access_point_only() {
        let mut store = MemoryBlockStore::new();
        let mut portal = MockPortal::default();
        portal.submit(&[("ssid", "HomeNet"), ("pw", "wrong")]);
        portal.submit(&[("ssid", "HomeNet"), ("pw", "hunter22")]);
        let mut machine = provisioner(
            &mut store,
            MockRadio::accepting(b"HomeNet", b"hunter22"),
            portal,
            MockConnector::answering(RELAY_OK),
        );

        assert_eq!(run(&mut machine), Ok(ProvisioningState::Connected));
        assert_eq!(machine.radio().joins, 2);
        assert_eq!(machine.radio().ap_starts, 2);
        assert_eq!(machine.portal().starts, 1);
    }

    #[test]
    fn test_access_point_failure_is_fatal() {
        let mut store = MemoryBlockStore::new();
        let mut machine = provisioner(
            &mut store,
            MockRadio::accepting(b"HomeNet", b"hunter22").failing_access_point(),
            MockPortal::default(),
            MockConnector::answering(RELAY_OK),
        );

        assert_eq!(run(&mut machine), Err(ProvisioningError::AccessPointStart));
        assert_eq!(machine.state(), ProvisioningState::Failed);
        assert_eq!(machine.poll(), Err(ProvisioningError::AccessPointStart));
        assert_eq!(machine.portal().starts, 0);
    }

    #[test]
    fn test_portal_listens_on_configured_ports() {
        let mut store = MemoryBlockStore::new();
        let config = DeviceConfig {
            access_point_ip: [10, 0, 0, 1],
            dns_port: 5353,
            http_port: 8080,
            ..DeviceConfig::default()
        };
        let mut machine = Provisioner::new(
            config,
            MockRadio::accepting(b"HomeNet", b"hunter22"),
            MockPortal::default(),
            MockConnector::answering(RELAY_OK),
            SettingsStore::new(&mut store),
            CountingEntropy::default(),
        );

        machine.poll().unwrap();
        machine.poll().unwrap();

        assert_eq!(
            machine.portal().endpoint,
            Some(PortalEndpoint {
                address: Ipv4Addr::new(10, 0, 0, 1),
                dns_port: 5353,
                http_port: 8080,
            })
        );
    }

    #[test]
    fn test_portal_failure_is_fatal() {
        let mut store = MemoryBlockStore::new();
        let mut machine = provisioner(
            &mut store,
            MockRadio::accepting(b"HomeNet", b"hunter22"),
            MockPortal::failing(),
            MockConnector::answering(RELAY_OK),
        );

        assert_eq!(run(&mut machine), Err(ProvisioningError::PortalStart));
        assert_eq!(machine.state(), ProvisioningState::Failed);
    }

    #[test]
    fn test_unreachable_relay_still_connects() {
        let mut store = stored(b"HomeNet", b"hunter22");
        let mut machine = provisioner(
            &mut store,
            MockRadio::accepting(b"HomeNet", b"hunter22"),
            MockPortal::default(),
            MockConnector::unreachable(),
        );

        assert_eq!(run(&mut machine), Ok(ProvisioningState::Connected));
        assert_eq!(machine.registration(), Some(&Err(RelayError::Connect)));
    }

    #[test]
    fn test_scan_failure_shows_empty_list() {
        let mut store = MemoryBlockStore::new();
        let mut machine = provisioner(
            &mut store,
            MockRadio::accepting(b"HomeNet", b"hunter22").failing_scan(),
            MockPortal::default(),
            MockConnector::answering(RELAY_OK),
        );

        machine.poll().unwrap();
        assert_eq!(machine.poll(), Ok(ProvisioningState::AwaitingSubmission));
        assert!(machine.networks().is_empty());
    }

    #[test]
    fn test_incomplete_submission_keeps_waiting() {
        let mut store = MemoryBlockStore::new();
        let mut portal = MockPortal::default();
        portal.submit(&[("ssid", "HomeNet")]);
        let mut machine = provisioner(
            &mut store,
            MockRadio::accepting(b"HomeNet", b"hunter22"),
            portal,
            MockConnector::answering(RELAY_OK),
        );

        let mut polls = 0;
        let state = machine.run_until(|_| {
            polls += 1;
            polls < 10
        });

        assert_eq!(state, Ok(ProvisioningState::AwaitingSubmission));
        assert_eq!(machine.radio().joins, 0);
    }

    #[test]
    fn test_cancel_stops_access_point() {
        let mut store = MemoryBlockStore::new();
        let mut machine = provisioner(
            &mut store,
            MockRadio::accepting(b"HomeNet", b"hunter22"),
            MockPortal::default(),
            MockConnector::answering(RELAY_OK),
        );
        machine.poll().unwrap();
        machine.poll().unwrap();

        machine.cancel();

        assert_eq!(machine.state(), ProvisioningState::Idle);
        assert_eq!(machine.radio().ap_stops, 1);
    }

    #[test]
    fn test_cancel_keeps_unsaved_identity() {
        let mut store = MemoryBlockStore::new();
        let mut machine = provisioner(
            &mut store,
            MockRadio::accepting(b"HomeNet", b"hunter22"),
            MockPortal::default(),
            MockConnector::answering(RELAY_OK),
        );
        machine.poll().unwrap();
        machine.poll().unwrap();
        machine.poll().unwrap();
        let shown = machine.portal().last_pin.clone();
        let guid = machine.settings().guid().to_vec();

        machine.cancel();
        assert_eq!(machine.poll(), Ok(ProvisioningState::AccessPointActive));
        machine.poll().unwrap();
        machine.poll().unwrap();

        assert_eq!(machine.settings().guid(), guid.as_slice());
        assert_eq!(machine.portal().last_pin, shown);
        assert_eq!(shown.len(), 4);
    }

    #[test]
    fn test_identity_generated_for_stored_credentials_is_saved() {
        let mut settings = WifiSettings::empty();
        settings.set_ssid(b"HomeNet");
        settings.set_password(b"hunter22");
        let mut store = MemoryBlockStore::from_bytes(settings.to_bytes().to_vec());
        let mut machine = provisioner(
            &mut store,
            MockRadio::accepting(b"HomeNet", b"hunter22"),
            MockPortal::default(),
            MockConnector::answering(RELAY_OK),
        );

        assert_eq!(run(&mut machine), Ok(ProvisioningState::Connected));
        assert_eq!(machine.radio().ap_starts, 0);
        let guid = machine.settings().guid().to_vec();
        let pin = machine.settings().pin().to_vec();
        let sent = String::from_utf8(machine.connector().sent()).unwrap();
        assert!(sent.contains(&format!("pin={}", str::from_utf8(&pin).unwrap())));
        drop(machine);

        let saved = SettingsStore::new(&mut store).load().unwrap().unwrap();
        assert_eq!(saved.guid(), guid.as_slice());
        assert_eq!(saved.pin(), pin.as_slice());
        assert_eq!(saved.ssid(), b"HomeNet");
    }

    #[test]
    fn test_stored_identity_is_not_rewritten() {
        let mut store = stored(b"HomeNet", b"hunter22");
        let before = store.as_bytes().to_vec();
        let mut machine = provisioner(
            &mut store,
            MockRadio::accepting(b"HomeNet", b"hunter22"),
            MockPortal::default(),
            MockConnector::answering(RELAY_OK),
        );

        assert_eq!(run(&mut machine), Ok(ProvisioningState::Connected));
        drop(machine);

        assert_eq!(store.as_bytes(), before.as_slice());
    }

    #[test]
    fn test_settings_without_credentials_keep_identity() {
        let mut store = stored(b"", b"");
        let mut machine = provisioner(
            &mut store,
            MockRadio::accepting(b"HomeNet", b"hunter22"),
            MockPortal::default(),
            MockConnector::answering(RELAY_OK),
        );

        assert_eq!(machine.poll(), Ok(ProvisioningState::AccessPointActive));
        assert_eq!(machine.settings().guid(), b"00112233445566778899AABBCCDDEEFF");
    }
}
