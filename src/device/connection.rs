use std::collections::HashMap;
use std::pin::Pin;
use btleplug::api::bleuuid::uuid_from_u16;
use btleplug::api::{
    AddressType as BtleAddressType, BDAddr, Central, CentralEvent, Characteristic, Manager as _, Peripheral as _,
    PeripheralProperties, ScanFilter, Service, ValueNotification, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures::future::pending;
use futures::{Stream, StreamExt};
use log::{debug, info, warn};
use tokio::spawn;
use tokio::task::JoinHandle;
use tokio::time::{sleep, sleep_until, Duration, Instant};
use tokio_util::sync::{CancellationToken, DropGuard};
use uuid::Uuid;

use crate::config::types::Config;
use crate::device::advertisement::encode_local_name;
use crate::device::client::SparkClient;
use crate::device::constants::{CONNECT_DELAY, WRITE_DEADLINE};
use crate::device::controller::ControlCommand;
use crate::device::session::SessionState;
use crate::device::transport::{
    Address, AddressType, AdvertisementReport, AttStatus, CharacteristicHandle, ConnectionHandle, DeviceIdentity,
    Request, ServiceHandle, TransportEvent,
};
use crate::device::types::DeviceEvent;
use crate::error::DeviceError;

type CentralEvents = Pin<Box<dyn Stream<Item = CentralEvent> + Send>>;

fn identity_from_properties(properties: &PeripheralProperties) -> DeviceIdentity {
    DeviceIdentity {
        address: Address(properties.address.into_inner()),
        address_type: match properties.address_type {
            Some(BtleAddressType::Random) => AddressType::Random,
            _ => AddressType::Public,
        },
    }
}

/// Forwards notifications of one characteristic as transport events. The
/// task is cancelled when this is dropped.
struct NotificationTask {
    guard: DropGuard,
    handle: JoinHandle<()>,
}

impl NotificationTask {
    async fn stop(self) {
        let NotificationTask { guard, handle } = self;
        drop(guard);
        let _ = handle.await;
    }
}

fn forward_notifications<S>(
    mut notification_stream: S,
    uuid: Uuid,
    connection: ConnectionHandle,
    characteristic: CharacteristicHandle,
    events: UnboundedSender<TransportEvent>,
) -> NotificationTask
where
    S: Stream<Item = ValueNotification> + Send + Unpin + 'static,
{
    let cancel = CancellationToken::new();
    let task_cancel = cancel.clone();

    let handle = spawn(async move {
        'mainloop: loop {
            tokio::select! {
                _ = task_cancel.cancelled() => {
                    break 'mainloop;
                },
                data = notification_stream.next() => match data {
                    Some(data) if data.uuid == uuid => {
                        let event = TransportEvent::Notification { connection, characteristic, value: data.value };
                        if events.unbounded_send(event).is_err() {
                            break 'mainloop;
                        }
                    },
                    Some(_) => {},
                    None => break 'mainloop,
                },
            }
        }
    });

    NotificationTask { guard: cancel.drop_guard(), handle }
}

struct Link {
    peripheral: Peripheral,
    connection: ConnectionHandle,
    services: HashMap<ServiceHandle, Service>,
    characteristics: HashMap<CharacteristicHandle, Characteristic>,
    notifications: Option<NotificationTask>,
}

/// Carries out transport requests with btleplug and reports the results as
/// [`TransportEvent`]s. Pairing and bonding are handled by the operating
/// system, so security requests are only logged.
pub struct BtleTransport {
    adapter: Adapter,
    events: UnboundedSender<TransportEvent>,
    scanning: bool,
    link: Option<Link>,
    next_handle: u16,
}

impl BtleTransport {
    pub async fn new(manager: &Manager, events: UnboundedSender<TransportEvent>) -> Result<Self, DeviceError> {
        let adapter = manager.adapters().await?.into_iter().next().ok_or(DeviceError::NoAdapter)?;
        info!("Using adapter {}", adapter.adapter_info().await.unwrap_or("UNKNOWN".to_string()));

        Ok(BtleTransport {
            adapter,
            events,
            scanning: false,
            link: None,
            next_handle: 0x40,
        })
    }

    pub async fn central_events(&self) -> Result<CentralEvents, DeviceError> {
        Ok(self.adapter.events().await?)
    }

    fn emit(&self, event: TransportEvent) {
        // the receiver lives as long as the run loop
        let _ = self.events.unbounded_send(event);
    }

    fn allocate_handle(&mut self) -> u16 {
        let handle = self.next_handle;
        self.next_handle = self.next_handle.wrapping_add(1);
        handle
    }

    fn current_link(&mut self, connection: ConnectionHandle) -> Option<&mut Link> {
        self.link.as_mut().filter(|link| link.connection == connection)
    }

    /// Forgets the current link after stopping its notification task.
    async fn release_link(&mut self) -> Option<Peripheral> {
        let link = self.link.take()?;
        if let Some(notifications) = link.notifications {
            notifications.stop().await;
        }
        Some(link.peripheral)
    }

    /// Translates a btleplug central event into a transport event, if it is one we care about.
    pub async fn translate(&mut self, event: CentralEvent) -> Option<TransportEvent> {
        match event {
            CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) if self.scanning => {
                let peripheral = self.adapter.peripheral(&id).await.ok()?;
                let properties = match peripheral.properties().await {
                    Ok(Some(properties)) => properties,
                    Ok(None) => return None,
                    Err(err) => {
                        warn!("Could not query peripheral for properties: {:?}", err);
                        return None;
                    },
                };
                let name = properties.local_name.as_deref()?;

                Some(TransportEvent::Advertisement(AdvertisementReport {
                    identity: identity_from_properties(&properties),
                    data: encode_local_name(name),
                }))
            },
            CentralEvent::DeviceDisconnected(id) => {
                let connection = self.link.as_ref().filter(|link| link.peripheral.id() == id)?.connection;
                self.release_link().await;
                Some(TransportEvent::DisconnectionComplete(connection))
            },
            _ => None,
        }
    }

    pub async fn execute(&mut self, request: Request) {
        match request {
            Request::StartScan { interval, window, active } => {
                debug!("Scan interval {:#06x} window {:#06x} active {} (chosen by the OS)", interval, window, active);
                if let Err(err) = self.adapter.start_scan(ScanFilter::default()).await {
                    warn!("Scanning failed {:?}", err);
                    let events = self.events.clone();
                    spawn(async move {
                        sleep(Duration::from_millis(CONNECT_DELAY)).await;
                        let _ = events.unbounded_send(TransportEvent::Ready);
                    });
                    return;
                }
                self.scanning = true;
            },
            Request::StopScan => {
                self.scanning = false;
                if let Err(err) = self.adapter.stop_scan().await {
                    warn!("Stopping scan failed {:?}", err);
                }
            },
            Request::Connect(identity) => match self.connect(identity).await {
                Ok(connection) => self.emit(TransportEvent::ConnectionComplete(connection)),
                Err(err) => {
                    warn!("Connecting to peripheral failed: {:?}", err);
                    sleep(Duration::from_millis(CONNECT_DELAY)).await;
                    self.emit(TransportEvent::ConnectionFailed);
                },
            },
            Request::Disconnect(connection) => {
                if self.current_link(connection).is_none() {
                    return;
                }
                if let Some(peripheral) = self.release_link().await {
                    if let Err(err) = peripheral.disconnect().await {
                        warn!("Disconnecting failed: {:?}", err);
                    }
                }
                self.emit(TransportEvent::DisconnectionComplete(connection));
            },
            Request::DiscoverPrimaryService { connection, uuid } => {
                let status = match self.discover_service(connection, uuid).await {
                    Ok(()) => AttStatus::SUCCESS,
                    Err(err) => {
                        warn!("Service discovery failed: {:?}", err);
                        AttStatus::UNLIKELY_ERROR
                    },
                };
                self.emit(TransportEvent::QueryComplete { connection, status });
            },
            Request::DiscoverCharacteristic { connection, service, uuid } => {
                let status = self.discover_characteristic(connection, service, uuid);
                self.emit(TransportEvent::QueryComplete { connection, status });
            },
            Request::ListenForNotifications { connection, characteristic } => {
                if let Err(err) = self.listen(connection, characteristic).await {
                    warn!("Listening for notifications failed: {:?}", err);
                }
            },
            Request::EnableNotifications { connection, characteristic } => {
                let status = match self.subscribe(connection, characteristic).await {
                    Ok(()) => AttStatus::SUCCESS,
                    Err(err) => {
                        warn!("Subscribing failed: {:?}", err);
                        AttStatus::UNLIKELY_ERROR
                    },
                };
                self.emit(TransportEvent::QueryComplete { connection, status });
            },
            Request::WriteValue { connection, characteristic, value } => {
                self.write(connection, characteristic, &value).await;
            },
            Request::ConfirmJustWorks(connection) | Request::ConfirmNumericComparison(connection) => {
                debug!("Pairing confirmation for {:?} is left to the operating system", connection);
            },
            Request::DeleteBonding(identity) => {
                info!("Bond for {} has to be removed in the operating system settings", identity);
            },
            Request::RequestPairing(connection) => {
                debug!("Pairing of {:?} is left to the operating system", connection);
            },
        }
    }

    async fn find_peripheral(&self, identity: DeviceIdentity) -> Result<Peripheral, DeviceError> {
        let address = BDAddr::from(identity.address.0);
        for peripheral in self.adapter.peripherals().await? {
            if peripheral.address() == address {
                return Ok(peripheral);
            }
        }
        Err(DeviceError::UnknownPeripheral(identity.address.to_string()))
    }

    async fn connect(&mut self, identity: DeviceIdentity) -> Result<ConnectionHandle, DeviceError> {
        if let Some(previous) = self.release_link().await {
            debug!("Dropping previous link to {:?}", previous.id());
        }
        let peripheral = self.find_peripheral(identity).await?;

        info!("Connecting to peripheral...");
        peripheral.connect().await?;

        let connection = ConnectionHandle(self.allocate_handle());
        self.link = Some(Link {
            peripheral,
            connection,
            services: HashMap::new(),
            characteristics: HashMap::new(),
            notifications: None,
        });
        Ok(connection)
    }

    async fn discover_service(&mut self, connection: ConnectionHandle, uuid: u16) -> Result<(), DeviceError> {
        let uuid = uuid_from_u16(uuid);
        let peripheral = self.current_link(connection).ok_or(DeviceError::NotConnected)?.peripheral.clone();
        peripheral.discover_services().await?;

        for service in peripheral.services() {
            if service.uuid != uuid || !service.primary {
                continue;
            }
            let handle = ServiceHandle(self.allocate_handle());
            if let Some(link) = self.current_link(connection) {
                link.services.insert(handle, service);
            }
            self.emit(TransportEvent::ServiceQueryResult { connection, service: handle });
        }
        Ok(())
    }

    fn discover_characteristic(&mut self, connection: ConnectionHandle, service: ServiceHandle, uuid: u16) -> AttStatus {
        let uuid = uuid_from_u16(uuid);
        let found = match self.current_link(connection).and_then(|link| link.services.get(&service)) {
            Some(service) => service
                .characteristics
                .iter()
                .filter(|characteristic| characteristic.uuid == uuid)
                .cloned()
                .collect::<Vec<_>>(),
            None => return AttStatus::ATTRIBUTE_NOT_FOUND,
        };

        for characteristic in found {
            let handle = CharacteristicHandle(self.allocate_handle());
            if let Some(link) = self.current_link(connection) {
                link.characteristics.insert(handle, characteristic);
            }
            self.emit(TransportEvent::CharacteristicQueryResult { connection, characteristic: handle });
        }
        AttStatus::SUCCESS
    }

    async fn listen(&mut self, connection: ConnectionHandle, handle: CharacteristicHandle) -> Result<(), DeviceError> {
        let events = self.events.clone();
        let link = self.current_link(connection).ok_or(DeviceError::NotConnected)?;
        let uuid = link.characteristics.get(&handle).ok_or(DeviceError::MissingCharacteristic)?.uuid;

        let notification_stream = link.peripheral.notifications().await?;
        let task = forward_notifications(notification_stream, uuid, connection, handle, events);

        if let Some(previous) = link.notifications.replace(task) {
            previous.stop().await;
        }
        Ok(())
    }

    async fn subscribe(&mut self, connection: ConnectionHandle, handle: CharacteristicHandle) -> Result<(), DeviceError> {
        let link = self.current_link(connection).ok_or(DeviceError::NotConnected)?;
        let characteristic = link.characteristics.get(&handle).ok_or(DeviceError::MissingCharacteristic)?;

        info!("Subscribing to characteristic {:?} {:?}", characteristic.service_uuid, characteristic.uuid);
        link.peripheral.subscribe(characteristic).await?;
        Ok(())
    }

    async fn write(&mut self, connection: ConnectionHandle, handle: CharacteristicHandle, value: &[u8]) {
        let Some(link) = self.current_link(connection) else {
            warn!("Dropping write for stale connection {:?}", connection);
            return;
        };
        let Some(characteristic) = link.characteristics.get(&handle) else {
            warn!("Dropping write for unknown characteristic {:?}", handle);
            return;
        };

        let fut = link.peripheral.write(characteristic, value, WriteType::WithResponse);

        tokio::select! {
            _ = sleep(Duration::from_millis(WRITE_DEADLINE)) => {
                warn!("Sending to TX characteristic took too long");
            }
            result = fut => {
                if let Err(err) = result {
                    warn!("Failed to send to TX characteristic: {:?}", err);
                }
            }
        };
    }

    pub async fn shutdown(&mut self) {
        if let Some(connection) = self.link.as_ref().map(|link| link.connection) {
            self.execute(Request::Disconnect(connection)).await;
        }
        if self.scanning {
            self.execute(Request::StopScan).await;
        }
    }
}

/// Drives a [`SparkClient`] with btleplug until `cancel` fires. Commands
/// arriving while not connected are dropped.
pub async fn run_client(
    cancel: CancellationToken,
    config: Config,
    mut commands: UnboundedReceiver<ControlCommand>,
    observers: Vec<UnboundedSender<DeviceEvent>>,
) -> Result<(), DeviceError> {
    let manager = Manager::new().await?;
    let (event_sender, mut event_receiver) = unbounded::<TransportEvent>();
    let mut transport = BtleTransport::new(&manager, event_sender.clone()).await?;
    let mut central_events = transport.central_events().await?;

    let mut client = SparkClient::new(config.session_settings());
    for observer in observers {
        client.add_observer(observer);
    }

    let discovery_timeout = config.discovery_timeout();
    let mut deadline: Option<(Instant, SessionState)> = None;
    let mut previous_state = client.state();

    // the adapter is powered by the time we get here
    let _ = event_sender.unbounded_send(TransportEvent::Ready);

    'mainloop: loop {
        let timer = async move {
            match deadline {
                Some((at, _)) => sleep_until(at).await,
                None => pending::<()>().await,
            }
        };

        tokio::select! {
            _ = cancel.cancelled() => {
                break 'mainloop;
            },
            Some(event) = event_receiver.next() => {
                for request in client.handle(event) {
                    transport.execute(request).await;
                }
            },
            Some(event) = central_events.next() => {
                if let Some(event) = transport.translate(event).await {
                    let _ = event_sender.unbounded_send(event);
                }
            },
            Some(command) = commands.next() => {
                match client.apply(command) {
                    Some(request) => transport.execute(request).await,
                    None => info!("Not connected, ignoring {:?}", command),
                }
            },
            _ = timer => {
                if let Some((_, armed_in)) = deadline.take() {
                    for request in client.on_discovery_timeout(armed_in) {
                        transport.execute(request).await;
                    }
                }
            },
        }

        let state = client.state();
        if state != previous_state {
            deadline = match discovery_timeout {
                Some(timeout) if state.is_discovering() => Some((Instant::now() + timeout, state)),
                _ => None,
            };
            previous_state = state;
        }
    }

    info!("Shutting down");
    transport.shutdown().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::constants::SPARK_40_CHARACTERISTIC_RX_UUID;
    use futures::stream;

    const CONNECTION: ConnectionHandle = ConnectionHandle(0x40);
    const RX: CharacteristicHandle = CharacteristicHandle(0x42);

    fn rx_uuid() -> Uuid {
        uuid_from_u16(SPARK_40_CHARACTERISTIC_RX_UUID)
    }

    #[test]
    fn test_short_uuid_expansion() {
        assert_eq!(rx_uuid().to_string(), "0000ffc2-0000-1000-8000-00805f9b34fb");
    }

    #[tokio::test]
    async fn test_forwards_notifications_of_one_characteristic() {
        let (events, mut receiver) = unbounded();
        let notifications = stream::iter(vec![
            ValueNotification { uuid: uuid_from_u16(0x2A19), value: vec![0x64] },
            ValueNotification { uuid: rx_uuid(), value: vec![0x01, 0xFE] },
        ])
        .chain(stream::pending());

        let task = forward_notifications(notifications, rx_uuid(), CONNECTION, RX, events);
        assert_eq!(
            receiver.next().await,
            Some(TransportEvent::Notification { connection: CONNECTION, characteristic: RX, value: vec![0x01, 0xFE] })
        );

        task.stop().await;
        assert_eq!(receiver.next().await, None);
    }

    #[tokio::test]
    async fn test_dropping_notification_task_ends_it() {
        let (events, mut receiver) = unbounded();
        let task = forward_notifications(stream::pending::<ValueNotification>(), rx_uuid(), CONNECTION, RX, events);

        drop(task);
        assert_eq!(receiver.next().await, None);
    }
}
