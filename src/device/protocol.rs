//! Spark 40 wire protocol
//!
//! Commands are wrapped in a fixed frame before they are written to the TX
//! characteristic; the amp answers (and reports knob changes) with
//! notifications on the RX characteristic. Only the preset change
//! notification is understood, everything else is reported as
//! [`NotificationEvent::Unrecognized`].
//!
//! Message format follows
//! <https://github.com/jrnelson90/tinderboxpedal/blob/master/src/BLE%20message%20format.md>

use crate::device::constants::MAX_WRITE_LEN;

const FRAME_PREFIX: [u8; 6] = [0x01, 0xFE, 0x00, 0x00, 0x53, 0xFE];
const FRAME_MIDDLE: [u8; 13] = [
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xF0, 0x01, 0x01, 0x01,
];
const FRAME_TERMINATOR: u8 = 0xF7;

/// Bytes a frame adds around the opcode bytes.
pub const FRAME_OVERHEAD: usize = FRAME_PREFIX.len() + 1 + FRAME_MIDDLE.len() + 1;

/// Longest opcode sequence that still fits into a single write.
pub const MAX_OPCODE_LEN: usize = MAX_WRITE_LEN - FRAME_OVERHEAD;

const PRESET_CHANGE_MARKER_OFFSET: usize = 6;
const PRESET_CHANGE_MARKER: u8 = 0x1A;
const PRESET_CHANGE_LEN: usize = 0x1A;
const PRESET_CHANGE_SUB_MARKER_OFFSET: usize = 20;
const PRESET_CHANGE_SUB_MARKER: [u8; 2] = [0x03, 0x38];
const PRESET_CHANGE_PRESET_OFFSET: usize = 24;

/// Commands understood by the amp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Switch to preset `n` (0 based)
    SelectPreset(u8),
    /// Config slot, written into the value byte. Its meaning is defined by the amp.
    SetConfigValue(u8),
    RequestHardwareId,
}

impl Command {
    /// The opcode bytes carried inside the frame
    pub fn opcode(&self) -> Vec<u8> {
        match *self {
            Self::SelectPreset(preset) => vec![0x01, 0x38, 0x00, 0x00, preset],
            Self::SetConfigValue(slot) => vec![0x02, 0x01, 0x00, 0x00, slot],
            Self::RequestHardwareId => vec![0x02, 0x23],
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        encode_command(&self.opcode())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationEvent {
    PresetChanged { preset: u8 },
    Unrecognized,
}

/// Wraps `opcode` into a command frame
///
/// ```text
/// [0..6]   : 01 FE 00 00 53 FE
/// [6]      : total frame length
/// [7..20]  : 00 00 00 00 00 00 00 00 00 F0 01 01 01
/// [20..]   : opcode bytes
/// [last]   : F7
/// ```
///
/// `opcode` must not be longer than [`MAX_OPCODE_LEN`].
pub fn encode_command(opcode: &[u8]) -> Vec<u8> {
    let len = FRAME_OVERHEAD + opcode.len();
    debug_assert!(len <= MAX_WRITE_LEN, "command frame of {} bytes exceeds write size", len);

    let mut frame = Vec::with_capacity(len);
    frame.extend_from_slice(&FRAME_PREFIX);
    frame.push(len as u8);
    frame.extend_from_slice(&FRAME_MIDDLE);
    frame.extend_from_slice(opcode);
    frame.push(FRAME_TERMINATOR);
    frame
}

/// Classifies a notification received on the RX characteristic. Anything
/// that is not a well formed preset change is `Unrecognized`.
pub fn decode_notification(payload: &[u8]) -> NotificationEvent {
    if payload.len() < 7 {
        return NotificationEvent::Unrecognized;
    }

    if payload[PRESET_CHANGE_MARKER_OFFSET] != PRESET_CHANGE_MARKER || payload.len() != PRESET_CHANGE_LEN {
        return NotificationEvent::Unrecognized;
    }

    let sub_marker = &payload[PRESET_CHANGE_SUB_MARKER_OFFSET..PRESET_CHANGE_SUB_MARKER_OFFSET + 2];
    if sub_marker != PRESET_CHANGE_SUB_MARKER {
        return NotificationEvent::Unrecognized;
    }

    NotificationEvent::PresetChanged {
        preset: payload[PRESET_CHANGE_PRESET_OFFSET],
    }
}

/// Lower case hex dump used when message logging is enabled.
pub fn hex_dump(data: &[u8]) -> String {
    data.iter()
        .map(|byte| format!("{:02x}", byte))
        .collect::<Vec<_>>()
        .join(" ")
}
