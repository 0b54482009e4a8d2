use log::{debug, info, trace, warn};

use crate::device::advertisement::contains_name;
use crate::device::constants::{
    SCAN_INTERVAL, SCAN_WINDOW, SPARK_40_CHARACTERISTIC_RX_UUID, SPARK_40_CHARACTERISTIC_TX_UUID, SPARK_40_DEVICE_NAME,
    SPARK_40_SERVICE_UUID,
};
use crate::device::protocol::{decode_notification, hex_dump, Command, NotificationEvent};
use crate::device::transport::{
    AdvertisementReport, AttStatus, CharacteristicHandle, ConnectionHandle, DeviceIdentity, Request, ServiceHandle,
    TransportEvent,
};
use crate::device::types::DeviceState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingAdvertisement,
    AwaitingServiceDiscovery,
    AwaitingRxCharacteristic,
    AwaitingTxCharacteristic,
    AwaitingSubscriptionAck,
    Connected,
}

impl SessionState {
    /// States in which the session waits on the peripheral after connecting.
    pub fn is_discovering(&self) -> bool {
        matches!(
            self,
            SessionState::AwaitingServiceDiscovery
                | SessionState::AwaitingRxCharacteristic
                | SessionState::AwaitingTxCharacteristic
                | SessionState::AwaitingSubscriptionAck
        )
    }

    pub fn device_state(&self) -> DeviceState {
        match self {
            SessionState::AwaitingAdvertisement => DeviceState::Scanning,
            SessionState::Connected => DeviceState::Connected,
            _ => DeviceState::Connecting,
        }
    }
}

/// What the session looks for and how it scans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub device_name: String,
    pub service_uuid: u16,
    pub rx_uuid: u16,
    pub tx_uuid: u16,
    pub scan_interval: u16,
    pub scan_window: u16,
    pub active_scan: bool,
    pub log_messages: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        SessionSettings {
            device_name: SPARK_40_DEVICE_NAME.to_string(),
            service_uuid: SPARK_40_SERVICE_UUID,
            rx_uuid: SPARK_40_CHARACTERISTIC_RX_UUID,
            tx_uuid: SPARK_40_CHARACTERISTIC_TX_UUID,
            scan_interval: SCAN_INTERVAL,
            scan_window: SCAN_WINDOW,
            active_scan: true,
            log_messages: false,
        }
    }
}

/// Everything learned about the peer during one session. Dropped as a whole
/// whenever the session goes back to scanning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub identity: Option<DeviceIdentity>,
    pub connection: Option<ConnectionHandle>,
    pub service: Option<ServiceHandle>,
    pub rx: Option<CharacteristicHandle>,
    pub tx: Option<CharacteristicHandle>,
}

/// Output of one transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Request(Request),
    /// Notifications are enabled; the session is usable.
    Ready,
    Notification(NotificationEvent),
}

#[derive(Debug)]
pub struct SessionStateMachine {
    settings: SessionSettings,
    state: SessionState,
    session: Session,
}

impl SessionStateMachine {
    pub fn new(settings: SessionSettings) -> Self {
        SessionStateMachine {
            settings,
            state: SessionState::AwaitingAdvertisement,
            session: Session::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Feeds one transport event through the state machine. Security events
    /// are not handled here.
    pub fn handle(&mut self, event: TransportEvent) -> Vec<Effect> {
        match (self.state, event) {
            (SessionState::AwaitingAdvertisement, TransportEvent::Ready) => self.start_scanning(),
            (SessionState::AwaitingAdvertisement, TransportEvent::Advertisement(report)) => {
                self.on_advertisement(&report)
            },
            (SessionState::AwaitingAdvertisement, TransportEvent::ConnectionComplete(connection)) => {
                self.on_connected(connection)
            },
            (SessionState::AwaitingAdvertisement, TransportEvent::ConnectionFailed) => {
                if self.session.identity.is_none() {
                    return Vec::new();
                }
                warn!("Connecting to Spark 40 failed");
                self.start_scanning()
            },
            (state, TransportEvent::DisconnectionComplete(connection)) => {
                if state == SessionState::AwaitingAdvertisement || !self.is_current(connection) {
                    trace!("Ignoring disconnection of {:?}", connection);
                    return Vec::new();
                }
                warn!("Connection lost");
                self.start_scanning()
            },
            (SessionState::AwaitingServiceDiscovery, TransportEvent::ServiceQueryResult { connection, service })
                if self.is_current(connection) =>
            {
                self.on_service_discovered(service)
            },
            (
                SessionState::AwaitingRxCharacteristic | SessionState::AwaitingTxCharacteristic,
                TransportEvent::CharacteristicQueryResult { connection, characteristic },
            ) if self.is_current(connection) => self.on_characteristic_discovered(characteristic),
            (SessionState::AwaitingServiceDiscovery, TransportEvent::QueryComplete { connection, status })
                if self.is_current(connection) =>
            {
                self.on_service_discovery_complete(status)
            },
            (
                SessionState::AwaitingRxCharacteristic | SessionState::AwaitingTxCharacteristic,
                TransportEvent::QueryComplete { connection, status },
            ) if self.is_current(connection) => self.on_characteristic_discovery_complete(status),
            (SessionState::AwaitingSubscriptionAck, TransportEvent::QueryComplete { connection, status })
                if self.is_current(connection) =>
            {
                self.on_subscription_ack(status)
            },
            (SessionState::Connected, TransportEvent::Notification { connection, characteristic, value })
                if self.is_current(connection) && self.session.rx == Some(characteristic) =>
            {
                self.on_notification(&value)
            },
            (state, event) => {
                trace!("Ignoring {:?} in state {:?}", event, state);
                Vec::new()
            },
        }
    }

    pub fn on_advertisement(&mut self, report: &AdvertisementReport) -> Vec<Effect> {
        if self.state != SessionState::AwaitingAdvertisement || self.session.identity.is_some() {
            return Vec::new();
        }
        if !contains_name(&report.data, &self.settings.device_name) {
            return Vec::new();
        }

        info!("Found Spark 40 - {}", report.identity);
        self.session.identity = Some(report.identity);
        vec![
            Effect::Request(Request::StopScan),
            Effect::Request(Request::Connect(report.identity)),
        ]
    }

    pub fn on_connected(&mut self, connection: ConnectionHandle) -> Vec<Effect> {
        if self.state != SessionState::AwaitingAdvertisement || self.session.identity.is_none() {
            debug!("Unexpected connection {:?}", connection);
            return Vec::new();
        }

        info!("Connection complete, discover services");
        self.session.connection = Some(connection);
        self.state = SessionState::AwaitingServiceDiscovery;
        vec![Effect::Request(Request::DiscoverPrimaryService {
            connection,
            uuid: self.settings.service_uuid,
        })]
    }

    pub fn on_service_discovered(&mut self, service: ServiceHandle) -> Vec<Effect> {
        if self.state == SessionState::AwaitingServiceDiscovery {
            self.session.service = Some(service);
        }
        Vec::new()
    }

    pub fn on_service_discovery_complete(&mut self, status: AttStatus) -> Vec<Effect> {
        if self.state != SessionState::AwaitingServiceDiscovery {
            return Vec::new();
        }
        if !status.is_success() {
            warn!("SERVICE_QUERY_RESULT - Error status {}", status);
            return self.fail();
        }
        let (Some(connection), Some(service)) = (self.session.connection, self.session.service) else {
            warn!("Spark 40 service {:04x} not found", self.settings.service_uuid);
            return self.fail();
        };

        info!("Search for Spark 40 RX characteristic");
        self.state = SessionState::AwaitingRxCharacteristic;
        vec![Effect::Request(Request::DiscoverCharacteristic {
            connection,
            service,
            uuid: self.settings.rx_uuid,
        })]
    }

    pub fn on_characteristic_discovered(&mut self, characteristic: CharacteristicHandle) -> Vec<Effect> {
        match self.state {
            SessionState::AwaitingRxCharacteristic => self.session.rx = Some(characteristic),
            SessionState::AwaitingTxCharacteristic => self.session.tx = Some(characteristic),
            _ => {},
        }
        Vec::new()
    }

    pub fn on_characteristic_discovery_complete(&mut self, status: AttStatus) -> Vec<Effect> {
        if !matches!(
            self.state,
            SessionState::AwaitingRxCharacteristic | SessionState::AwaitingTxCharacteristic
        ) {
            return Vec::new();
        }
        if !status.is_success() {
            warn!("CHARACTERISTIC_QUERY_RESULT - Error status {}", status);
            return self.fail();
        }

        let Session { connection: Some(connection), service: Some(service), rx, tx, .. } = self.session else {
            return self.fail();
        };

        match (self.state, rx, tx) {
            (SessionState::AwaitingRxCharacteristic, Some(_), _) => {
                info!("Search for Spark 40 TX characteristic");
                self.state = SessionState::AwaitingTxCharacteristic;
                vec![Effect::Request(Request::DiscoverCharacteristic {
                    connection,
                    service,
                    uuid: self.settings.tx_uuid,
                })]
            },
            (SessionState::AwaitingTxCharacteristic, Some(rx), Some(_)) => {
                info!("Subscribe for Spark 40 RX characteristic");
                self.state = SessionState::AwaitingSubscriptionAck;
                vec![
                    Effect::Request(Request::ListenForNotifications { connection, characteristic: rx }),
                    Effect::Request(Request::EnableNotifications { connection, characteristic: rx }),
                ]
            },
            (state, ..) => {
                warn!("Spark 40 characteristic missing in state {:?}", state);
                self.fail()
            },
        }
    }

    pub fn on_subscription_ack(&mut self, status: AttStatus) -> Vec<Effect> {
        if self.state != SessionState::AwaitingSubscriptionAck {
            return Vec::new();
        }
        info!("Notifications enabled, ATT status {}", status);
        if !status.is_success() {
            warn!("Could not enable notifications, session stalled");
            return Vec::new();
        }

        self.state = SessionState::Connected;
        vec![Effect::Ready]
    }

    /// The discovery deadline armed on entering `armed_in` expired. Ignored once
    /// the session has moved on.
    pub fn on_discovery_timeout(&mut self, armed_in: SessionState) -> Vec<Effect> {
        if self.state != armed_in || !self.state.is_discovering() {
            trace!("Ignoring timeout armed in {:?}, now in {:?}", armed_in, self.state);
            return Vec::new();
        }
        warn!("Timeout in state {:?}", self.state);
        self.fail()
    }

    pub fn on_notification(&mut self, payload: &[u8]) -> Vec<Effect> {
        if self.state != SessionState::Connected {
            return Vec::new();
        }
        if self.settings.log_messages {
            info!("RX: {}", hex_dump(payload));
        }

        vec![Effect::Notification(decode_notification(payload))]
    }

    /// A write of `command` to the TX characteristic, or `None` unless connected.
    pub fn write_command(&self, command: &Command) -> Option<Request> {
        if self.state != SessionState::Connected {
            return None;
        }
        let connection = self.session.connection?;
        let characteristic = self.session.tx?;

        let value = command.encode();
        if self.settings.log_messages {
            info!("TX: {}", hex_dump(&value));
        }
        Some(Request::WriteValue { connection, characteristic, value })
    }

    fn is_current(&self, connection: ConnectionHandle) -> bool {
        self.session.connection == Some(connection)
    }

    fn start_scanning(&mut self) -> Vec<Effect> {
        info!("Start scanning!");
        self.state = SessionState::AwaitingAdvertisement;
        self.session = Session::default();
        vec![Effect::Request(Request::StartScan {
            interval: self.settings.scan_interval,
            window: self.settings.scan_window,
            active: self.settings.active_scan,
        })]
    }

    fn fail(&mut self) -> Vec<Effect> {
        let disconnect = self.session.connection.map(|connection| Effect::Request(Request::Disconnect(connection)));
        disconnect.into_iter().chain(self.start_scanning()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::advertisement::encode_local_name;
    use crate::device::transport::{Address, AddressType};

    const CONNECTION: ConnectionHandle = ConnectionHandle(0x40);
    const SERVICE: ServiceHandle = ServiceHandle(1);
    const RX: CharacteristicHandle = CharacteristicHandle(2);
    const TX: CharacteristicHandle = CharacteristicHandle(3);

    fn identity() -> DeviceIdentity {
        DeviceIdentity {
            address: Address([0xF7, 0xEB, 0xED, 0x2B, 0x41, 0x06]),
            address_type: AddressType::Public,
        }
    }

    fn advertisement(name: &str) -> TransportEvent {
        TransportEvent::Advertisement(AdvertisementReport {
            identity: identity(),
            data: encode_local_name(name),
        })
    }

    fn complete(status: AttStatus) -> TransportEvent {
        TransportEvent::QueryComplete { connection: CONNECTION, status }
    }

    fn start_scan() -> Effect {
        Effect::Request(Request::StartScan { interval: 0x30, window: 0x30, active: true })
    }

    fn scanning() -> SessionStateMachine {
        let mut machine = SessionStateMachine::new(SessionSettings::default());
        assert_eq!(machine.handle(TransportEvent::Ready), vec![start_scan()]);
        machine
    }

    fn discovering() -> SessionStateMachine {
        let mut machine = scanning();
        machine.handle(advertisement("Spark 40 BLE"));
        machine.handle(TransportEvent::ConnectionComplete(CONNECTION));
        machine
    }

    fn connected() -> SessionStateMachine {
        let mut machine = discovering();
        machine.handle(TransportEvent::ServiceQueryResult { connection: CONNECTION, service: SERVICE });
        machine.handle(complete(AttStatus::SUCCESS));
        machine.handle(TransportEvent::CharacteristicQueryResult { connection: CONNECTION, characteristic: RX });
        machine.handle(complete(AttStatus::SUCCESS));
        machine.handle(TransportEvent::CharacteristicQueryResult { connection: CONNECTION, characteristic: TX });
        machine.handle(complete(AttStatus::SUCCESS));
        assert_eq!(machine.handle(complete(AttStatus::SUCCESS)), vec![Effect::Ready]);
        machine
    }

    #[test]
    fn test_matching_advertisement_connects() {
        let mut machine = scanning();
        let effects = machine.handle(advertisement("Spark 40 BLE"));
        assert_eq!(
            effects,
            vec![Effect::Request(Request::StopScan), Effect::Request(Request::Connect(identity()))]
        );
        assert_eq!(machine.session().identity, Some(identity()));
    }

    #[test]
    fn test_other_advertisement_is_ignored() {
        let mut machine = scanning();
        assert!(machine.handle(advertisement("Other Device")).is_empty());
        assert_eq!(machine.state(), SessionState::AwaitingAdvertisement);
        assert_eq!(machine.session().identity, None);
    }

    #[test]
    fn test_second_advertisement_while_connecting_is_ignored() {
        let mut machine = scanning();
        machine.handle(advertisement("Spark 40 BLE"));
        assert!(machine.handle(advertisement("Spark 40 BLE")).is_empty());
    }

    #[test]
    fn test_connection_starts_service_discovery() {
        let mut machine = scanning();
        machine.handle(advertisement("Spark 40 BLE"));
        let effects = machine.handle(TransportEvent::ConnectionComplete(CONNECTION));
        assert_eq!(
            effects,
            vec![Effect::Request(Request::DiscoverPrimaryService { connection: CONNECTION, uuid: 0xFFC0 })]
        );
        assert_eq!(machine.state(), SessionState::AwaitingServiceDiscovery);
    }

    #[test]
    fn test_unrequested_connection_is_ignored() {
        let mut machine = scanning();
        assert!(machine.handle(TransportEvent::ConnectionComplete(CONNECTION)).is_empty());
        assert_eq!(machine.state(), SessionState::AwaitingAdvertisement);
    }

    #[test]
    fn test_connection_failure_rescans() {
        let mut machine = scanning();
        machine.handle(advertisement("Spark 40 BLE"));
        assert_eq!(machine.handle(TransportEvent::ConnectionFailed), vec![start_scan()]);
        assert_eq!(machine.session().identity, None);
    }

    #[test]
    fn test_service_discovery_failure_rescans() {
        let mut machine = discovering();
        let effects = machine.handle(complete(AttStatus::ATTRIBUTE_NOT_FOUND));
        assert_eq!(
            effects,
            vec![Effect::Request(Request::Disconnect(CONNECTION)), start_scan()]
        );
        assert_eq!(machine.state(), SessionState::AwaitingAdvertisement);
        assert_eq!(machine.session(), &Session::default());
    }

    #[test]
    fn test_service_discovery_without_result_rescans() {
        let mut machine = discovering();
        let effects = machine.handle(complete(AttStatus::SUCCESS));
        assert_eq!(effects[0], Effect::Request(Request::Disconnect(CONNECTION)));
        assert_eq!(machine.state(), SessionState::AwaitingAdvertisement);
    }

    #[test]
    fn test_last_service_result_wins() {
        let mut machine = discovering();
        machine.handle(TransportEvent::ServiceQueryResult { connection: CONNECTION, service: ServiceHandle(7) });
        machine.handle(TransportEvent::ServiceQueryResult { connection: CONNECTION, service: SERVICE });
        let effects = machine.handle(complete(AttStatus::SUCCESS));
        assert_eq!(
            effects,
            vec![Effect::Request(Request::DiscoverCharacteristic {
                connection: CONNECTION,
                service: SERVICE,
                uuid: 0xFFC2,
            })]
        );
    }

    #[test]
    fn test_tx_discovery_subscribes_to_rx() {
        let mut machine = discovering();
        machine.handle(TransportEvent::ServiceQueryResult { connection: CONNECTION, service: SERVICE });
        machine.handle(complete(AttStatus::SUCCESS));
        machine.handle(TransportEvent::CharacteristicQueryResult { connection: CONNECTION, characteristic: RX });
        let effects = machine.handle(complete(AttStatus::SUCCESS));
        assert_eq!(
            effects,
            vec![Effect::Request(Request::DiscoverCharacteristic {
                connection: CONNECTION,
                service: SERVICE,
                uuid: 0xFFC1,
            })]
        );

        machine.handle(TransportEvent::CharacteristicQueryResult { connection: CONNECTION, characteristic: TX });
        let effects = machine.handle(complete(AttStatus::SUCCESS));
        assert_eq!(
            effects,
            vec![
                Effect::Request(Request::ListenForNotifications { connection: CONNECTION, characteristic: RX }),
                Effect::Request(Request::EnableNotifications { connection: CONNECTION, characteristic: RX }),
            ]
        );
        assert_eq!(machine.state(), SessionState::AwaitingSubscriptionAck);
    }

    #[test]
    fn test_characteristic_discovery_failure_rescans() {
        let mut machine = discovering();
        machine.handle(TransportEvent::ServiceQueryResult { connection: CONNECTION, service: SERVICE });
        machine.handle(complete(AttStatus::SUCCESS));
        machine.handle(TransportEvent::CharacteristicQueryResult { connection: CONNECTION, characteristic: RX });
        machine.handle(complete(AttStatus::SUCCESS));
        let effects = machine.handle(complete(AttStatus::UNLIKELY_ERROR));
        assert_eq!(
            effects,
            vec![Effect::Request(Request::Disconnect(CONNECTION)), start_scan()]
        );
        assert_eq!(machine.session().rx, None);
    }

    #[test]
    fn test_happy_path_ends_connected() {
        let machine = connected();
        assert_eq!(machine.state(), SessionState::Connected);
        assert_eq!(machine.session().rx, Some(RX));
        assert_eq!(machine.session().tx, Some(TX));
    }

    #[test]
    fn test_subscription_failure_stalls() {
        let mut machine = discovering();
        machine.handle(TransportEvent::ServiceQueryResult { connection: CONNECTION, service: SERVICE });
        machine.handle(complete(AttStatus::SUCCESS));
        machine.handle(TransportEvent::CharacteristicQueryResult { connection: CONNECTION, characteristic: RX });
        machine.handle(complete(AttStatus::SUCCESS));
        machine.handle(TransportEvent::CharacteristicQueryResult { connection: CONNECTION, characteristic: TX });
        machine.handle(complete(AttStatus::SUCCESS));
        assert!(machine.handle(complete(AttStatus(0x03))).is_empty());
        assert_eq!(machine.state(), SessionState::AwaitingSubscriptionAck);
    }

    #[test]
    fn test_notification_is_decoded_when_connected() {
        let mut machine = connected();
        let mut payload = vec![0u8; 26];
        payload[6] = 0x1A;
        payload[20] = 0x03;
        payload[21] = 0x38;
        payload[24] = 1;
        let effects = machine.handle(TransportEvent::Notification {
            connection: CONNECTION,
            characteristic: RX,
            value: payload,
        });
        assert_eq!(effects, vec![Effect::Notification(NotificationEvent::PresetChanged { preset: 1 })]);
    }

    #[test]
    fn test_notification_before_connected_is_ignored() {
        let mut machine = discovering();
        let effects = machine.handle(TransportEvent::Notification {
            connection: CONNECTION,
            characteristic: RX,
            value: vec![0; 26],
        });
        assert!(effects.is_empty());
    }

    #[test]
    fn test_stale_events_are_ignored() {
        let mut machine = discovering();
        let stale = ConnectionHandle(0x41);
        assert!(machine
            .handle(TransportEvent::ServiceQueryResult { connection: stale, service: SERVICE })
            .is_empty());
        assert!(machine
            .handle(TransportEvent::QueryComplete { connection: stale, status: AttStatus::UNLIKELY_ERROR })
            .is_empty());
        assert!(machine.handle(TransportEvent::DisconnectionComplete(stale)).is_empty());
        assert_eq!(machine.state(), SessionState::AwaitingServiceDiscovery);
    }

    #[test]
    fn test_completion_after_failure_is_ignored() {
        let mut machine = discovering();
        machine.handle(complete(AttStatus::UNLIKELY_ERROR));
        assert!(machine.handle(complete(AttStatus::SUCCESS)).is_empty());
        assert!(machine.handle(TransportEvent::DisconnectionComplete(CONNECTION)).is_empty());
        assert_eq!(machine.state(), SessionState::AwaitingAdvertisement);
    }

    #[test]
    fn test_disconnection_rescans() {
        let mut machine = connected();
        assert_eq!(machine.handle(TransportEvent::DisconnectionComplete(CONNECTION)), vec![start_scan()]);
        assert_eq!(machine.state(), SessionState::AwaitingAdvertisement);
        assert_eq!(machine.session(), &Session::default());
    }

    #[test]
    fn test_timeout_while_discovering() {
        let mut machine = discovering();
        assert_eq!(
            machine.on_discovery_timeout(SessionState::AwaitingServiceDiscovery),
            vec![Effect::Request(Request::Disconnect(CONNECTION)), start_scan()]
        );

        let mut machine = connected();
        assert!(machine.on_discovery_timeout(SessionState::Connected).is_empty());
        assert_eq!(machine.state(), SessionState::Connected);
    }

    #[test]
    fn test_timeout_after_progress_is_ignored() {
        let mut machine = discovering();
        machine.handle(TransportEvent::ServiceQueryResult { connection: CONNECTION, service: SERVICE });
        machine.handle(complete(AttStatus::SUCCESS));
        assert_eq!(machine.state(), SessionState::AwaitingRxCharacteristic);

        assert!(machine.on_discovery_timeout(SessionState::AwaitingServiceDiscovery).is_empty());
        assert_eq!(machine.state(), SessionState::AwaitingRxCharacteristic);
        assert_eq!(machine.session().service, Some(SERVICE));
    }

    #[test]
    fn test_ready_only_starts_scanning_when_idle() {
        let mut machine = connected();
        assert!(machine.handle(TransportEvent::Ready).is_empty());
        assert_eq!(machine.state(), SessionState::Connected);
        assert_eq!(machine.session().connection, Some(CONNECTION));

        let mut machine = discovering();
        assert!(machine.handle(TransportEvent::Ready).is_empty());
        assert_eq!(machine.state(), SessionState::AwaitingServiceDiscovery);
    }

    #[test]
    fn test_write_command_requires_connected() {
        let machine = discovering();
        assert_eq!(machine.write_command(&Command::SelectPreset(2)), None);

        let machine = connected();
        assert_eq!(
            machine.write_command(&Command::SelectPreset(2)),
            Some(Request::WriteValue {
                connection: CONNECTION,
                characteristic: TX,
                value: Command::SelectPreset(2).encode(),
            })
        );
    }

    #[test]
    fn test_custom_device_name() {
        let settings = SessionSettings { device_name: "Spark MINI".to_string(), ..SessionSettings::default() };
        let mut machine = SessionStateMachine::new(settings);
        machine.handle(TransportEvent::Ready);
        assert!(machine.handle(advertisement("Spark 40 BLE")).is_empty());
        assert_eq!(machine.handle(advertisement("Spark MINI BLE")).len(), 2);
    }
}
