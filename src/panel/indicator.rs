use futures::channel::mpsc::{unbounded, UnboundedSender};
use futures::StreamExt;
use log::info;
use tokio::spawn;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::device::types::{DeviceEvent, DeviceState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Color {
    pub const BLUE: Color = Color { red: 0x00, green: 0x00, blue: 0xff };
    pub const GREEN: Color = Color { red: 0x00, green: 0xff, blue: 0x00 };
    pub const RED: Color = Color { red: 0xff, green: 0x00, blue: 0x00 };
}

pub trait Indicator: Send + 'static {
    fn set_color(&mut self, color: Color);
}

/// Indicator for hosts without an LED.
#[derive(Debug, Default)]
pub struct LogIndicator;

impl Indicator for LogIndicator {
    fn set_color(&mut self, color: Color) {
        info!("LED #{:02x}{:02x}{:02x}", color.red, color.green, color.blue);
    }
}

/// Blue while scanning, green for the clean preset (0), red for distortion
/// (1). Other presets leave the colour as it is.
pub fn color_for_event(event: &DeviceEvent) -> Option<Color> {
    match event {
        DeviceEvent::StateChange(DeviceState::Scanning) => Some(Color::BLUE),
        DeviceEvent::PresetChanged(0) => Some(Color::GREEN),
        DeviceEvent::PresetChanged(1) => Some(Color::RED),
        _ => None,
    }
}

pub fn indicator_task<I: Indicator>(cancel: CancellationToken, mut indicator: I) -> (UnboundedSender<DeviceEvent>, JoinHandle<()>) {
    let (tx, mut rx) = unbounded::<DeviceEvent>();

    let handle = spawn(async move {
        let mut current: Option<Color> = None;

        'mainloop: loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    break 'mainloop;
                },
                event = rx.next() => match event {
                    Some(event) => {
                        if let Some(color) = color_for_event(&event) {
                            if current != Some(color) {
                                indicator.set_color(color);
                                current = Some(color);
                            }
                        }
                    },
                    None => break 'mainloop,
                },
            }
        }
    });

    (tx, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct RecordingIndicator {
        colors: Arc<Mutex<Vec<Color>>>,
    }

    impl Indicator for RecordingIndicator {
        fn set_color(&mut self, color: Color) {
            self.colors.lock().unwrap().push(color);
        }
    }

    #[test]
    fn test_preset_colors() {
        assert_eq!(color_for_event(&DeviceEvent::PresetChanged(0)), Some(Color::GREEN));
        assert_eq!(color_for_event(&DeviceEvent::PresetChanged(1)), Some(Color::RED));
        assert_eq!(color_for_event(&DeviceEvent::PresetChanged(2)), None);
        assert_eq!(color_for_event(&DeviceEvent::StateChange(DeviceState::Scanning)), Some(Color::BLUE));
        assert_eq!(color_for_event(&DeviceEvent::StateChange(DeviceState::Connected)), None);
    }

    #[tokio::test]
    async fn test_indicator_task_skips_repeated_colors() {
        let indicator = RecordingIndicator::default();
        let colors = indicator.colors.clone();
        let (tx, handle) = indicator_task(CancellationToken::new(), indicator);

        tx.unbounded_send(DeviceEvent::StateChange(DeviceState::Scanning)).unwrap();
        tx.unbounded_send(DeviceEvent::PresetChanged(0)).unwrap();
        tx.unbounded_send(DeviceEvent::PresetChanged(0)).unwrap();
        tx.unbounded_send(DeviceEvent::PresetChanged(3)).unwrap();
        tx.unbounded_send(DeviceEvent::PresetChanged(1)).unwrap();
        drop(tx);
        handle.await.unwrap();

        assert_eq!(*colors.lock().unwrap(), vec![Color::BLUE, Color::GREEN, Color::RED]);
    }
}
