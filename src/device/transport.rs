use std::fmt;

/// Bluetooth device address, most significant byte first (as printed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Address(pub [u8; 6]);

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}", a, b, c, d, e, g)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressType {
    Public,
    Random,
    PublicIdentity,
    RandomIdentity,
}

/// The peer we talk to for the lifetime of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceIdentity {
    pub address: Address,
    pub address_type: AddressType,
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?})", self.address, self.address_type)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionHandle(pub u16);

/// Opaque id of a discovered primary service, assigned by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServiceHandle(pub u16);

/// Opaque id of a discovered characteristic, assigned by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CharacteristicHandle(pub u16);

/// Attribute protocol status of a finished GATT query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttStatus(pub u8);

impl AttStatus {
    pub const SUCCESS: AttStatus = AttStatus(0x00);
    pub const ATTRIBUTE_NOT_FOUND: AttStatus = AttStatus(0x0A);
    pub const UNLIKELY_ERROR: AttStatus = AttStatus(0x0E);

    pub fn is_success(&self) -> bool {
        *self == AttStatus::SUCCESS
    }
}

impl fmt::Display for AttStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}", self.0)
    }
}

/// HCI status code carried by security manager completion events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HciStatus {
    Success,
    AuthenticationFailure,
    PinOrKeyMissing,
    ConnectionTimeout,
    RemoteUserTerminatedConnection,
    Other(u8),
}

/// An advertising report as delivered by the transport while scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertisementReport {
    pub identity: DeviceIdentity,
    /// Raw advertising data (length / type / value structures).
    pub data: Vec<u8>,
}

/// Requests the core issues to the transport layer. Each one is answered, if at
/// all, by a later [`TransportEvent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    StartScan {
        interval: u16,
        window: u16,
        active: bool,
    },
    StopScan,
    Connect(DeviceIdentity),
    Disconnect(ConnectionHandle),
    DiscoverPrimaryService {
        connection: ConnectionHandle,
        uuid: u16,
    },
    DiscoverCharacteristic {
        connection: ConnectionHandle,
        service: ServiceHandle,
        uuid: u16,
    },
    ListenForNotifications {
        connection: ConnectionHandle,
        characteristic: CharacteristicHandle,
    },
    /// Write the client characteristic configuration descriptor to enable notifications.
    EnableNotifications {
        connection: ConnectionHandle,
        characteristic: CharacteristicHandle,
    },
    WriteValue {
        connection: ConnectionHandle,
        characteristic: CharacteristicHandle,
        value: Vec<u8>,
    },
    ConfirmJustWorks(ConnectionHandle),
    ConfirmNumericComparison(ConnectionHandle),
    DeleteBonding(DeviceIdentity),
    RequestPairing(ConnectionHandle),
}

/// Security manager events, routed to the pairing coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecurityEvent {
    JustWorksRequest {
        connection: ConnectionHandle,
    },
    NumericComparisonRequest {
        connection: ConnectionHandle,
        passkey: u32,
    },
    PairingStarted {
        connection: ConnectionHandle,
    },
    PairingComplete {
        connection: ConnectionHandle,
        status: HciStatus,
        reason: u8,
    },
    ReencryptionStarted {
        connection: ConnectionHandle,
        identity: DeviceIdentity,
    },
    ReencryptionComplete {
        connection: ConnectionHandle,
        identity: DeviceIdentity,
        status: HciStatus,
    },
}

/// Events the transport layer delivers to the core, one at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The host stack is powered and working.
    Ready,
    Advertisement(AdvertisementReport),
    ConnectionComplete(ConnectionHandle),
    ConnectionFailed,
    DisconnectionComplete(ConnectionHandle),
    ServiceQueryResult {
        connection: ConnectionHandle,
        service: ServiceHandle,
    },
    CharacteristicQueryResult {
        connection: ConnectionHandle,
        characteristic: CharacteristicHandle,
    },
    /// Ends every discovery and descriptor write request.
    QueryComplete {
        connection: ConnectionHandle,
        status: AttStatus,
    },
    Notification {
        connection: ConnectionHandle,
        characteristic: CharacteristicHandle,
        value: Vec<u8>,
    },
    Security(SecurityEvent),
}
