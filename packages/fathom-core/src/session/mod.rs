//! Device session factory.
//!
//! Opens an authenticated, type-specific session for a fingerprinted
//! device: an enable-mode switch CLI, a firewall XML API handle, or a
//! plain SSH shell. Session establishment failures are returned to the
//! caller to log and skip — this layer never retries.

mod panos;
pub mod ssh;
mod switch;

pub use panos::PanosApi;
pub use ssh::{CommandOutput, SshClient, SshSession};
pub use switch::SwitchSession;

use thiserror::Error;

use crate::credentials::Credential;
use crate::records::{DeviceRecord, DeviceType};

/// Why a device session could not be established.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{host}: could not connect over ssh (port {port})")]
    Connect { host: String, port: u16 },

    #[error("{host}: authentication failed for user '{username}'")]
    Auth { host: String, username: String },

    #[error("{host}: could not enter enable mode, check secret")]
    Enable { host: String },

    #[error("{host}: api authentication failed")]
    ApiAuth { host: String },

    #[error("{host}: timed out waiting for device output")]
    Timeout { host: String },

    #[error("{host}: transport failure: {message}")]
    Transport { host: String, message: String },

    #[error("{host}: no session type for device_type {device_type}")]
    Unsupported { host: String, device_type: DeviceType },
}

/// A type-specific open session.
pub enum DeviceSession {
    /// Enable-mode switch CLI over SSH.
    Switch(SwitchSession),
    /// Authenticated firewall XML API handle.
    Firewall(PanosApi),
    /// Plain SSH shell, no enable mode.
    Shell(SshSession),
}

/// Open the session matching the record's device type, authenticated
/// with the given credential.
pub async fn open_session(
    record: &DeviceRecord,
    credential: &Credential,
) -> Result<DeviceSession, SessionError> {
    match record.device_type {
        DeviceType::CiscoIos | DeviceType::CiscoNxos | DeviceType::AristaEos => Ok(
            DeviceSession::Switch(SwitchSession::open(&record.ip, credential, &record.hostname).await?),
        ),
        DeviceType::PaloaltoPanos => Ok(DeviceSession::Firewall(
            PanosApi::connect(
                &record.ip,
                &credential.username,
                &credential.password,
                &record.hostname,
            )
            .await?,
        )),
        DeviceType::Linux => Ok(DeviceSession::Shell(
            SshClient::new(&record.ip, &credential.username, &credential.password)
                .connect()
                .await?,
        )),
        DeviceType::Unknown => Err(SessionError::Unsupported {
            host: record.hostname.clone(),
            device_type: record.device_type,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::DeviceType;

    fn record(device_type: DeviceType) -> DeviceRecord {
        DeviceRecord {
            ip: "127.0.0.1".to_string(),
            hostname: "test-device".to_string(),
            credential_id: 1,
            device_type,
            update_time: "2024-01-01 00:00:00".to_string(),
            storage_id: None,
        }
    }

    fn credential() -> Credential {
        Credential {
            id: 1,
            username: "admin".to_string(),
            password: "pw".to_string(),
            secret: "en".to_string(),
        }
    }

    #[tokio::test]
    async fn unknown_devices_have_no_session_type() {
        let err = open_session(&record(DeviceType::Unknown), &credential())
            .await
            .err()
            .expect("unknown must not open a session");
        assert!(matches!(err, SessionError::Unsupported { .. }));
    }

    #[test]
    fn error_messages_carry_device_context() {
        let err = SessionError::Enable {
            host: "sw1.example.net".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "sw1.example.net: could not enter enable mode, check secret"
        );
    }
}
