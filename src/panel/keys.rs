use futures::channel::mpsc::{unbounded, UnboundedReceiver};
use log::warn;
use tokio::io::{stdin, AsyncBufReadExt, BufReader};
use tokio::spawn;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::device::controller::ControlCommand;

/// `1`-`4` select presets 0-3, `5`-`8` send config values 0-3, `9` asks for
/// the hardware id and space presses the button.
pub fn command_for_key(key: char) -> Option<ControlCommand> {
    match key {
        '1'..='4' => Some(ControlCommand::SelectPreset(key as u8 - b'1')),
        '5'..='8' => Some(ControlCommand::SetConfigValue(key as u8 - b'5')),
        '9' => Some(ControlCommand::RequestHardwareId),
        ' ' => Some(ControlCommand::TogglePreset),
        _ => None,
    }
}

/// Reads stdin line by line and forwards every recognised key.
pub fn stdin_task(cancel: CancellationToken) -> (UnboundedReceiver<ControlCommand>, JoinHandle<()>) {
    let (tx, rx) = unbounded::<ControlCommand>();

    let handle = spawn(async move {
        let mut lines = BufReader::new(stdin()).lines();

        'mainloop: loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    break 'mainloop;
                },
                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        for command in line.chars().filter_map(command_for_key) {
                            if tx.unbounded_send(command).is_err() {
                                break 'mainloop;
                            }
                        }
                    },
                    Ok(None) => break 'mainloop,
                    Err(err) => {
                        warn!("Failed to read stdin: {:?}", err);
                        break 'mainloop;
                    },
                },
            }
        }
    });

    (rx, handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_keys() {
        assert_eq!(command_for_key('1'), Some(ControlCommand::SelectPreset(0)));
        assert_eq!(command_for_key('4'), Some(ControlCommand::SelectPreset(3)));
    }

    #[test]
    fn test_config_keys() {
        assert_eq!(command_for_key('5'), Some(ControlCommand::SetConfigValue(0)));
        assert_eq!(command_for_key('8'), Some(ControlCommand::SetConfigValue(3)));
    }

    #[test]
    fn test_other_keys() {
        assert_eq!(command_for_key('9'), Some(ControlCommand::RequestHardwareId));
        assert_eq!(command_for_key(' '), Some(ControlCommand::TogglePreset));
        assert_eq!(command_for_key('0'), None);
        assert_eq!(command_for_key('q'), None);
    }
}
