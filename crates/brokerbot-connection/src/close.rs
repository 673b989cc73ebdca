// SPDX-FileCopyrightText: 2026 Brokerbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Classification of session closures.

use std::fmt;

/// Status reported when the credentials were rejected or the device logged out.
pub const STATUS_LOGGED_OUT: u16 = 401;

/// Status reported when the network asks the device to reconnect.
pub const STATUS_RESTART_REQUIRED: u16 = 515;

/// Status reported when the session timed out.
pub const STATUS_TIMED_OUT: u16 = 440;

/// Status used when the event stream ends without a closure event.
pub const STATUS_CONNECTION_LOST: u16 = 428;

/// Why a session closed. Closed set; every closure maps to exactly one variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Logged out or credentials rejected (401): clear credentials, retry at once.
    CredentialsInvalid,
    /// Device removed / restart required (515): fixed short delay.
    DeviceRemoved,
    /// Session timed out (440): fixed longer delay.
    TimedOut,
    /// Any other status: exponential backoff.
    Failure(u16),
    /// Closure without a status: do not reconnect.
    CleanShutdown,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CredentialsInvalid => f.write_str("credentials invalid"),
            Self::DeviceRemoved => f.write_str("device removed"),
            Self::TimedOut => f.write_str("timed out"),
            Self::Failure(code) => write!(f, "failure {code}"),
            Self::CleanShutdown => f.write_str("clean shutdown"),
        }
    }
}

impl CloseReason {
    pub fn classify(status: Option<u16>) -> Self {
        match status {
            None => Self::CleanShutdown,
            Some(STATUS_LOGGED_OUT) => Self::CredentialsInvalid,
            Some(STATUS_RESTART_REQUIRED) => Self::DeviceRemoved,
            Some(STATUS_TIMED_OUT) => Self::TimedOut,
            Some(code) => Self::Failure(code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_codes() {
        assert_eq!(CloseReason::classify(Some(401)), CloseReason::CredentialsInvalid);
        assert_eq!(CloseReason::classify(Some(515)), CloseReason::DeviceRemoved);
        assert_eq!(CloseReason::classify(Some(440)), CloseReason::TimedOut);
        assert_eq!(CloseReason::classify(Some(500)), CloseReason::Failure(500));
        assert_eq!(CloseReason::classify(Some(428)), CloseReason::Failure(428));
        assert_eq!(CloseReason::classify(None), CloseReason::CleanShutdown);
    }

    #[test]
    fn display_includes_code() {
        assert_eq!(CloseReason::Failure(503).to_string(), "failure 503");
        assert_eq!(CloseReason::TimedOut.to_string(), "timed out");
    }
}
