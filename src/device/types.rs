#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Initial,
    Scanning,
    Connecting,
    Connected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceEvent {
    StateChange(DeviceState),
    PresetChanged(u8), // 0 based
}
