use std::{path::Path, time::Duration};

use serde::Deserialize;

use crate::{client::ConnectionSettings, lib::errors::ConfigError};

pub const DEFAULT_HANDSHAKE_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 3;

#[derive(Debug, Deserialize, Default)]
pub struct RawConnectionSection {
    pub handshake_timeout_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub shutdown_grace_secs: Option<u64>,
}

pub fn parse_connection_section(
    raw: Option<RawConnectionSection>,
    path: &Path,
) -> Result<ConnectionSettings, ConfigError> {
    let raw = raw.unwrap_or_default();
    let handshake = raw
        .handshake_timeout_secs
        .unwrap_or(DEFAULT_HANDSHAKE_TIMEOUT_SECS);
    let request = raw
        .request_timeout_secs
        .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
    let grace = raw
        .shutdown_grace_secs
        .unwrap_or(DEFAULT_SHUTDOWN_GRACE_SECS);

    super::validate_timeout_secs(handshake, "connection.handshake_timeout_secs", path)?;
    super::validate_timeout_secs(request, "connection.request_timeout_secs", path)?;
    super::validate_timeout_secs(grace, "connection.shutdown_grace_secs", path)?;

    Ok(ConnectionSettings {
        handshake_timeout: Duration::from_secs(handshake),
        request_timeout: Duration::from_secs(request),
        shutdown_grace: Duration::from_secs(grace),
    })
}
