// SPDX-FileCopyrightText: 2026 Brokerbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `brokerbot serve` command implementation.
//!
//! Builds every service object once (model provider, spreadsheet store,
//! credential store, transport, bus, connection manager, row writer, query
//! engine, router), wires them together, and runs until a shutdown signal
//! or a fatal connection failure.

use std::sync::Arc;

use brokerbot_bridge::BridgeTransport;
use brokerbot_bus::{BusEvent, EventBus, QueryBotStatus};
use brokerbot_config::BrokerConfig;
use brokerbot_connection::{ConnectionManager, FileCredentialStore, ReconnectPolicy};
use brokerbot_core::{BrokerError, ProviderAdapter, TabularStore};
use brokerbot_openai::OpenAiProvider;
use brokerbot_pipeline::{
    MessageExtractor, MessageRouter, PromptStore, QueryEngine, QuerySettings, RowWriter,
    RoutingRules,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::events;
use crate::shutdown;

/// Runs the `brokerbot serve` command.
pub async fn run_serve(config: BrokerConfig, json_events: bool) -> Result<(), BrokerError> {
    init_tracing(&config.bot.log_level);
    info!(name = %config.bot.name, "starting brokerbot serve");

    let cancel = shutdown::install_signal_handler();
    let bus = EventBus::default();
    let reporter_cancel = CancellationToken::new();
    let reporter = tokio::spawn(events::report(
        bus.subscribe(),
        json_events,
        reporter_cancel.clone(),
    ));

    let result = serve(&config, bus, cancel).await;
    if let Err(e) = &result {
        error!(error = %e, "brokerbot stopped with an error");
    }

    reporter_cancel.cancel();
    if let Err(e) = reporter.await {
        warn!(error = %e, "event reporter task failed");
    }
    result
}

async fn serve(
    config: &BrokerConfig,
    bus: EventBus,
    cancel: CancellationToken,
) -> Result<(), BrokerError> {
    let provider: Arc<dyn ProviderAdapter> = Arc::new(OpenAiProvider::new(&config.openai)?);
    let store: Arc<dyn TabularStore> = Arc::new(brokerbot_sheets::from_config(&config.sheets).await?);
    let prompts = Arc::new(PromptStore::new(&config.prompts.dir));

    let manager = Arc::new(ConnectionManager::new(
        Arc::new(BridgeTransport::new(&config.connection.bridge_url)),
        Arc::new(FileCredentialStore::new(&config.connection.auth_dir)),
        ReconnectPolicy::from(&config.connection),
        config.connection.session_options(),
        bus.clone(),
    ));
    let inbound = manager
        .take_inbound()
        .ok_or_else(|| BrokerError::Internal("inbound queue already taken".into()))?;

    // The writer outlives the router so in-flight listings can still land.
    let writer_cancel = CancellationToken::new();
    let (writer, writer_handle) = RowWriter::spawn(store.clone(), bus.clone(), writer_cancel.clone());

    let extractor = Arc::new(MessageExtractor::new(
        provider.clone(),
        store.clone(),
        prompts.clone(),
        writer,
        config.openai.extraction_model.clone(),
    ));
    let engine = Arc::new(QueryEngine::new(
        provider,
        store,
        prompts,
        QuerySettings {
            interpret_model: config.openai.interpret_model.clone(),
            summarize_model: config.openai.summarize_model.clone(),
            summary_limit: config.bot.summary_limit,
        },
    ));
    let router = Arc::new(MessageRouter::new(
        RoutingRules::new(
            config.monitor.groups.iter().cloned(),
            config.bot.response_marker.clone(),
            config.bot.query_enabled,
        ),
        extractor,
        engine,
        bus.clone(),
    ));
    if config.monitor.groups.is_empty() {
        warn!("no monitored groups configured, only queries will be handled");
        bus.warn("No groups are monitored; add group ids to [monitor] groups");
    } else {
        info!(groups = config.monitor.groups.len(), "monitoring groups");
    }

    let router_task = tokio::spawn(router.clone().run(inbound, cancel.clone()));
    let announcer = tokio::spawn(announce_query_bot(
        manager.clone(),
        bus.clone(),
        config.bot.query_enabled,
    ));

    let result = manager.run(cancel.clone()).await;

    // A fatal connection failure ends the router too.
    cancel.cancel();
    announcer.abort();
    if let Err(e) = router_task.await {
        warn!(error = %e, "router task failed");
    }
    info!(in_flight = router.in_flight(), "waiting for running pipelines");
    router.drain().await;
    writer_cancel.cancel();
    if let Err(e) = writer_handle.await {
        warn!(error = %e, "row writer task failed");
    }

    info!("brokerbot stopped");
    result
}

/// Publishes the query bot status once the first session is open.
async fn announce_query_bot(manager: Arc<ConnectionManager>, bus: EventBus, enabled: bool) {
    if !enabled {
        bus.publish(BusEvent::QueryBot(QueryBotStatus::Unavailable {
            reason: "queries are disabled in the configuration".into(),
        }));
        return;
    }
    if let Some(active) = manager.wait_open().await {
        let number = active.identity.user().to_string();
        info!(%number, "query bot ready");
        bus.publish(BusEvent::QueryBot(QueryBotStatus::Ready { number }));
    }
}

/// Initializes the tracing subscriber with an env filter.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("brokerbot={log_level},warn")));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use brokerbot_test_utils::{MemoryCredentialStore, ScriptedTransport};

    #[tokio::test]
    async fn query_bot_ready_is_published_on_first_open() {
        let transport = Arc::new(ScriptedTransport::new());
        let script = transport.push_session();
        let bus = EventBus::new(32);
        let mut events = bus.subscribe();
        let manager = Arc::new(ConnectionManager::new(
            transport,
            Arc::new(MemoryCredentialStore::new()),
            ReconnectPolicy::default(),
            Default::default(),
            bus.clone(),
        ));

        let announcer = tokio::spawn(announce_query_bot(manager.clone(), bus.clone(), true));
        let cancel = CancellationToken::new();
        let driver = {
            let manager = manager.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { manager.run(cancel).await })
        };
        script.open("972501234567:2@s.whatsapp.net").await;

        announcer.await.unwrap();
        cancel.cancel();
        driver.await.unwrap().unwrap();

        let mut ready = None;
        while let Ok(envelope) = events.try_recv() {
            if let BusEvent::QueryBot(status) = envelope.event {
                ready = Some(status);
            }
        }
        assert_eq!(
            ready,
            Some(QueryBotStatus::Ready {
                number: "972501234567".into()
            })
        );
    }

    #[tokio::test]
    async fn disabled_queries_are_reported_unavailable() {
        let bus = EventBus::new(8);
        let mut events = bus.subscribe();
        let manager = Arc::new(ConnectionManager::new(
            Arc::new(ScriptedTransport::new()),
            Arc::new(MemoryCredentialStore::new()),
            ReconnectPolicy::default(),
            Default::default(),
            bus.clone(),
        ));

        announce_query_bot(manager, bus, false).await;
        let envelope = events.try_recv().unwrap();
        assert!(matches!(
            envelope.event,
            BusEvent::QueryBot(QueryBotStatus::Unavailable { .. })
        ));
    }

    #[tokio::test]
    async fn missing_sheet_credentials_fail_before_connecting() {
        let mut config = BrokerConfig::default();
        config.openai.api_key = Some("sk-test".into());
        let err = serve(&config, EventBus::new(8), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::Config(_)));
    }
}
