use log::{debug, info, warn};

use crate::device::transport::{HciStatus, Request, SecurityEvent};

/// Result of one pairing attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingOutcome {
    Success,
    Timeout,
    Disconnected,
    AuthenticationFailure { reason: u8 },
    Failed(u8),
}

/// Result of re-encrypting a link with stored bonding information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReencryptionOutcome {
    Success,
    Timeout,
    Disconnected,
    /// The peer no longer has our keys; bond deleted and pairing restarted.
    BondingInformationMissing,
    Failed(u8),
}

/// Confirms pairing prompts unattended and recovers links whose peer lost
/// its bonding information.
#[derive(Debug, Default)]
pub struct PairingCoordinator {
    last_pairing: Option<PairingOutcome>,
    last_reencryption: Option<ReencryptionOutcome>,
}

impl PairingCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_pairing(&self) -> Option<PairingOutcome> {
        self.last_pairing
    }

    pub fn last_reencryption(&self) -> Option<ReencryptionOutcome> {
        self.last_reencryption
    }

    pub fn handle(&mut self, event: SecurityEvent) -> Vec<Request> {
        match event {
            SecurityEvent::JustWorksRequest { connection } => {
                info!("Just works requested");
                vec![Request::ConfirmJustWorks(connection)]
            },
            SecurityEvent::NumericComparisonRequest { connection, passkey } => {
                info!("Confirming numeric comparison: {}", passkey);
                vec![Request::ConfirmNumericComparison(connection)]
            },
            SecurityEvent::PairingStarted { .. } => {
                info!("Pairing started");
                Vec::new()
            },
            SecurityEvent::PairingComplete { status, reason, .. } => {
                let outcome = match status {
                    HciStatus::Success => {
                        info!("Pairing complete, success");
                        PairingOutcome::Success
                    },
                    HciStatus::ConnectionTimeout => {
                        warn!("Pairing failed, timeout");
                        PairingOutcome::Timeout
                    },
                    HciStatus::RemoteUserTerminatedConnection => {
                        warn!("Pairing failed, disconnected");
                        PairingOutcome::Disconnected
                    },
                    HciStatus::AuthenticationFailure => {
                        warn!("Pairing failed, authentication failure with reason = {}", reason);
                        PairingOutcome::AuthenticationFailure { reason }
                    },
                    HciStatus::PinOrKeyMissing => PairingOutcome::Failed(0x06),
                    HciStatus::Other(code) => {
                        debug!("Pairing complete with status {:02x}", code);
                        PairingOutcome::Failed(code)
                    },
                };
                self.last_pairing = Some(outcome);
                Vec::new()
            },
            SecurityEvent::ReencryptionStarted { identity, .. } => {
                info!(
                    "Bonding information exists for addr type {:?}, identity addr {} -> start re-encryption",
                    identity.address_type, identity.address
                );
                Vec::new()
            },
            SecurityEvent::ReencryptionComplete { connection, identity, status } => {
                let (outcome, requests) = match status {
                    HciStatus::Success => {
                        info!("Re-encryption complete, success");
                        (ReencryptionOutcome::Success, Vec::new())
                    },
                    HciStatus::ConnectionTimeout => {
                        warn!("Re-encryption failed, timeout");
                        (ReencryptionOutcome::Timeout, Vec::new())
                    },
                    HciStatus::RemoteUserTerminatedConnection => {
                        warn!("Re-encryption failed, disconnected");
                        (ReencryptionOutcome::Disconnected, Vec::new())
                    },
                    HciStatus::PinOrKeyMissing => {
                        warn!("Re-encryption failed, bonding information missing");
                        info!("Assuming remote lost bonding information");
                        info!("Deleting local bonding information for {} and start new pairing...", identity);
                        (
                            ReencryptionOutcome::BondingInformationMissing,
                            vec![Request::DeleteBonding(identity), Request::RequestPairing(connection)],
                        )
                    },
                    HciStatus::AuthenticationFailure => (ReencryptionOutcome::Failed(0x05), Vec::new()),
                    HciStatus::Other(code) => {
                        debug!("Re-encryption complete with status {:02x}", code);
                        (ReencryptionOutcome::Failed(code), Vec::new())
                    },
                };
                self.last_reencryption = Some(outcome);
                requests
            },
        }
    }
}
