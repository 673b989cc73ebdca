// SPDX-FileCopyrightText: 2026 Brokerbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat session lifecycle.
//!
//! [`ConnectionManager`] keeps one session alive across transient failures,
//! credential invalidation and device removal. Closures are classified into
//! [`CloseReason`] and mapped to a [`ReconnectAction`] by the
//! [`ReconnectPolicy`]; credentials persist through a [`FileCredentialStore`].

pub mod close;
pub mod credentials;
pub mod manager;
pub mod policy;

pub use close::CloseReason;
pub use credentials::FileCredentialStore;
pub use manager::ConnectionManager;
pub use policy::{ReconnectAction, ReconnectPolicy};
