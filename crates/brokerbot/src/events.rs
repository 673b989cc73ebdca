// SPDX-FileCopyrightText: 2026 Brokerbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Terminal rendering of bus events.
//!
//! With `--json-events` every event is printed to stdout as one JSON line
//! for a supervising process. Otherwise pairing codes are drawn as QR codes
//! and finished rows and query-bot status are summarized; log events are
//! already covered by the tracing output.

use brokerbot_bus::{BusEnvelope, BusEvent, QueryBotStatus};
use qrcode::render::unicode::Dense1x2;
use qrcode::QrCode;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Renders a pairing code as a block-character QR code.
pub fn render_qr(code: &str) -> Option<String> {
    match QrCode::new(code.as_bytes()) {
        Ok(qr) => Some(
            qr.render::<Dense1x2>()
                .dark_color(Dense1x2::Light)
                .light_color(Dense1x2::Dark)
                .quiet_zone(true)
                .build(),
        ),
        Err(e) => {
            warn!(error = %e, "pairing code cannot be rendered as a QR code");
            None
        }
    }
}

/// Human-readable text for an event, or `None` for events left to tracing.
pub fn describe(event: &BusEvent) -> Option<String> {
    match event {
        BusEvent::PairingCode { code } => {
            let qr = render_qr(code).unwrap_or_else(|| code.clone());
            Some(format!(
                "{qr}\nScan this code from the phone: Linked devices > Link a device"
            ))
        }
        BusEvent::RowReady { row } => {
            let id = row.first().map_or("", String::as_str);
            Some(format!("new listing {id}: {}", row.join(" | ")))
        }
        BusEvent::QueryBot(QueryBotStatus::Ready { number }) => {
            Some(format!("query bot ready: send questions to your own chat ({number})"))
        }
        BusEvent::QueryBot(QueryBotStatus::Unavailable { reason }) => {
            Some(format!("query bot unavailable: {reason}"))
        }
        BusEvent::Log { .. } | BusEvent::Connection { .. } => None,
    }
}

fn emit(envelope: &BusEnvelope, json: bool) {
    if json {
        let line = envelope.to_json_line();
        if !line.is_empty() {
            println!("{line}");
        }
    } else if let Some(text) = describe(&envelope.event) {
        println!("{text}");
    }
}

/// Prints events until `cancel` fires, then flushes what is already queued.
pub async fn report(
    mut rx: broadcast::Receiver<BusEnvelope>,
    json: bool,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            received = rx.recv() => match received {
                Ok(envelope) => emit(&envelope, json),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "event reporter fell behind"),
                Err(RecvError::Closed) => return,
            },
            () = cancel.cancelled() => break,
        }
    }
    while let Ok(envelope) = rx.try_recv() {
        emit(&envelope, json);
    }
}
