// SPDX-FileCopyrightText: 2026 Brokerbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat transport over a WebSocket to a protocol sidecar.
//!
//! The sidecar hosts the chat-network client and speaks a small JSON frame
//! protocol (see [`protocol`]). [`BridgeTransport`] implements
//! `brokerbot_core::Transport`; each open yields a [`BridgeSession`] and an
//! ordered event stream.

pub mod protocol;
pub mod transport;

pub use transport::{BridgeSession, BridgeTransport};
