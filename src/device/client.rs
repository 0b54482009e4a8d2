use futures::channel::mpsc::UnboundedSender;
use log::debug;

use crate::device::controller::{ControlCommand, DeviceController};
use crate::device::pairing::PairingCoordinator;
use crate::device::session::{Effect, SessionSettings, SessionState, SessionStateMachine};
use crate::device::transport::{Request, TransportEvent};
use crate::device::types::{DeviceEvent, DeviceState};

/// The transport independent part of the Spark client: routes transport
/// events to the session or the pairing coordinator and user commands to the
/// controller. Returns the requests the transport has to carry out.
#[derive(Debug)]
pub struct SparkClient {
    session: SessionStateMachine,
    pairing: PairingCoordinator,
    controller: DeviceController,
    reported_state: DeviceState,
}

impl SparkClient {
    pub fn new(settings: SessionSettings) -> Self {
        SparkClient {
            session: SessionStateMachine::new(settings),
            pairing: PairingCoordinator::new(),
            controller: DeviceController::new(),
            reported_state: DeviceState::Initial,
        }
    }

    pub fn session(&self) -> &SessionStateMachine {
        &self.session
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn pairing(&self) -> &PairingCoordinator {
        &self.pairing
    }

    pub fn preset(&self) -> u8 {
        self.controller.preset()
    }

    pub fn add_observer(&mut self, observer: UnboundedSender<DeviceEvent>) {
        self.controller.add_observer(observer);
    }

    pub fn handle(&mut self, event: TransportEvent) -> Vec<Request> {
        if let TransportEvent::Security(event) = event {
            return self.pairing.handle(event);
        }

        let previous_state = self.session.state();
        let effects = self.session.handle(event);
        self.process(previous_state, effects)
    }

    /// Fails the session if it is still in `armed_in` when the discovery
    /// deadline expires.
    pub fn on_discovery_timeout(&mut self, armed_in: SessionState) -> Vec<Request> {
        let previous_state = self.session.state();
        let effects = self.session.on_discovery_timeout(armed_in);
        self.process(previous_state, effects)
    }

    pub fn apply(&mut self, command: ControlCommand) -> Option<Request> {
        self.controller.apply(&self.session, command)
    }

    fn process(&mut self, previous_state: SessionState, effects: Vec<Effect>) -> Vec<Request> {
        let state = self.session.state();
        if state != previous_state {
            debug!("Session state {:?} -> {:?}", previous_state, state);
        }
        if state.device_state() != self.reported_state {
            self.reported_state = state.device_state();
            self.controller.on_state_change(self.reported_state);
        }

        let mut requests = Vec::new();
        for effect in effects {
            match effect {
                Effect::Request(request) => requests.push(request),
                Effect::Ready => requests.extend(self.controller.select_preset(&self.session, 0)),
                Effect::Notification(notification) => self.controller.on_notification(notification),
            }
        }

        requests
    }
}
