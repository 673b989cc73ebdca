// SPDX-FileCopyrightText: 2026 Brokerbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reconnect policy: what to do, and after how long, for each closure reason.

use std::time::Duration;

use brokerbot_config::model::ConnectionConfig;

use crate::close::CloseReason;

/// Decision taken after a session closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectAction {
    Retry {
        delay: Duration,
        clear_credentials: bool,
    },
    Stop,
}

/// Delays applied by the connection manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub device_removed_delay: Duration,
    pub timeout_delay: Duration,
    pub backoff_base: Duration,
    pub backoff_cap: Duration,
    /// Setup failures tolerated before the first successful open.
    pub max_setup_attempts: u32,
    pub setup_retry_step: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from(&ConnectionConfig::default())
    }
}

impl From<&ConnectionConfig> for ReconnectPolicy {
    fn from(config: &ConnectionConfig) -> Self {
        Self {
            device_removed_delay: Duration::from_secs(config.device_removed_delay_secs),
            timeout_delay: Duration::from_secs(config.timeout_delay_secs),
            backoff_base: Duration::from_secs(config.backoff_base_secs),
            backoff_cap: Duration::from_secs(config.backoff_cap_secs),
            max_setup_attempts: config.max_setup_attempts,
            setup_retry_step: Duration::from_secs(config.setup_retry_step_secs),
        }
    }
}

impl ReconnectPolicy {
    /// Action for a closure, given the manager-lifetime reconnect counter.
    pub fn on_close(&self, reason: CloseReason, attempt: u32) -> ReconnectAction {
        match reason {
            CloseReason::CredentialsInvalid => ReconnectAction::Retry {
                delay: Duration::ZERO,
                clear_credentials: true,
            },
            CloseReason::DeviceRemoved => ReconnectAction::Retry {
                delay: self.device_removed_delay,
                clear_credentials: false,
            },
            CloseReason::TimedOut => ReconnectAction::Retry {
                delay: self.timeout_delay,
                clear_credentials: false,
            },
            CloseReason::Failure(_) => ReconnectAction::Retry {
                delay: self.backoff(attempt),
                clear_credentials: false,
            },
            CloseReason::CleanShutdown => ReconnectAction::Stop,
        }
    }

    /// `min(2^attempt * base, cap)`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.backoff_base.saturating_mul(factor).min(self.backoff_cap)
    }

    /// Delay before retrying the `failures`-th consecutive setup failure, or
    /// `None` once the budget is spent.
    pub fn setup_retry(&self, failures: u32) -> Option<Duration> {
        (failures <= self.max_setup_attempts).then(|| self.setup_retry_step.saturating_mul(failures))
    }
}
