use futures::channel::mpsc::UnboundedSender;
use log::{debug, info};

use crate::device::protocol::{Command, NotificationEvent};
use crate::device::session::SessionStateMachine;
use crate::device::transport::Request;
use crate::device::types::{DeviceEvent, DeviceState};

/// Intents coming from the keyboard or the button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    SelectPreset(u8),
    /// Switch between preset 0 and 1
    TogglePreset,
    /// Config slot 0 to 3
    SetConfigValue(u8),
    RequestHardwareId,
}

/// Tracks the active preset and turns intents into writes. Every command is a
/// no-op unless the session is connected.
#[derive(Debug, Default)]
pub struct DeviceController {
    preset: u8,
    observers: Vec<UnboundedSender<DeviceEvent>>,
}

impl DeviceController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn preset(&self) -> u8 {
        self.preset
    }

    pub fn add_observer(&mut self, observer: UnboundedSender<DeviceEvent>) {
        self.observers.push(observer);
    }

    pub fn apply(&mut self, session: &SessionStateMachine, command: ControlCommand) -> Option<Request> {
        match command {
            ControlCommand::SelectPreset(preset) => self.select_preset(session, preset),
            ControlCommand::TogglePreset => self.select_preset(session, 1 - (self.preset & 1)),
            ControlCommand::SetConfigValue(slot) => self.set_config_value(session, slot),
            ControlCommand::RequestHardwareId => self.request_hardware_id(session),
        }
    }

    pub fn select_preset(&mut self, session: &SessionStateMachine, preset: u8) -> Option<Request> {
        let request = session.write_command(&Command::SelectPreset(preset))?;
        self.update_preset(preset);
        Some(request)
    }

    /// The amp derives the value from the slot, so the slot is the only byte
    /// the command carries.
    pub fn set_config_value(&mut self, session: &SessionStateMachine, slot: u8) -> Option<Request> {
        session.write_command(&Command::SetConfigValue(slot))
    }

    pub fn request_hardware_id(&mut self, session: &SessionStateMachine) -> Option<Request> {
        session.write_command(&Command::RequestHardwareId)
    }

    pub fn on_notification(&mut self, event: NotificationEvent) {
        match event {
            NotificationEvent::PresetChanged { preset } => self.update_preset(preset),
            NotificationEvent::Unrecognized => debug!("Unrecognized notification"),
        }
    }

    pub fn on_state_change(&mut self, state: DeviceState) {
        self.notify(DeviceEvent::StateChange(state));
    }

    fn update_preset(&mut self, preset: u8) {
        self.preset = preset;
        info!("[+] Preset: {}", preset);
        self.notify(DeviceEvent::PresetChanged(preset));
    }

    fn notify(&mut self, event: DeviceEvent) {
        // observers whose receiver is gone are dropped
        self.observers.retain(|observer| observer.unbounded_send(event).is_ok());
    }
}
