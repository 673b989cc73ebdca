// SPDX-FileCopyrightText: 2026 Brokerbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! Every external collaborator sits behind one of these traits so the
//! connection manager and the pipelines can be driven by mocks in tests.
//! All adapters extend [`PluginAdapter`] and use `#[async_trait]` for
//! dynamic dispatch compatibility.

pub mod adapter;
pub mod credentials;
pub mod provider;
pub mod store;
pub mod transport;

pub use adapter::PluginAdapter;
pub use credentials::CredentialStore;
pub use provider::ProviderAdapter;
pub use store::TabularStore;
pub use transport::{Session, Transport, TransportEvents};
