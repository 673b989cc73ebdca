// SPDX-FileCopyrightText: 2026 Brokerbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The single row writer.
//!
//! Asset ids are derived from the id column at write time, so allocating an
//! id and appending the row that uses it must not interleave with another
//! append. One worker task owns both steps and handles one listing at a
//! time; extraction pipelines submit listings through a bounded queue and
//! wait for the written row.

use std::sync::Arc;

use brokerbot_bus::{BusEvent, EventBus};
use brokerbot_core::{BrokerError, Row, TabularStore};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::assets::allocate_asset_id;
use crate::error::ExtractError;
use crate::row::{ListingRow, APPEND_RANGE};

const QUEUE_CAPACITY: usize = 64;

struct WriteRequest {
    listing: ListingRow,
    reply: oneshot::Sender<Result<Row, BrokerError>>,
}

/// Handle to the writer task. Cheap to clone.
#[derive(Clone)]
pub struct RowWriter {
    tx: mpsc::Sender<WriteRequest>,
}

impl RowWriter {
    /// Starts the worker.
    ///
    /// Once `cancel` fires, new submissions are refused and the listings
    /// already queued are still written before the task exits.
    pub fn spawn(
        store: Arc<dyn TabularStore>,
        bus: EventBus,
        cancel: CancellationToken,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let handle = tokio::spawn(run(rx, store, bus, cancel));
        (Self { tx }, handle)
    }

    /// Queues a listing and waits until its row has been appended.
    pub async fn submit(&self, listing: ListingRow) -> Result<Row, ExtractError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(WriteRequest { listing, reply })
            .await
            .map_err(|_| ExtractError::WriterClosed)?;
        rx.await.map_err(|_| ExtractError::WriterClosed)?.map_err(ExtractError::from)
    }
}

async fn run(
    mut rx: mpsc::Receiver<WriteRequest>,
    store: Arc<dyn TabularStore>,
    bus: EventBus,
    cancel: CancellationToken,
) {
    let mut draining = false;
    loop {
        let request = if draining {
            rx.recv().await
        } else {
            tokio::select! {
                request = rx.recv() => request,
                () = cancel.cancelled() => {
                    debug!("row writer draining");
                    rx.close();
                    draining = true;
                    continue;
                }
            }
        };
        let Some(WriteRequest { listing, reply }) = request else {
            break;
        };

        let result = write(store.as_ref(), &bus, listing).await;
        // The submitter may have gone away; the row is written either way.
        let _ = reply.send(result);
    }
    debug!("row writer stopped");
}

async fn write(
    store: &dyn TabularStore,
    bus: &EventBus,
    listing: ListingRow,
) -> Result<Row, BrokerError> {
    let asset_id = allocate_asset_id(store).await;
    let row = listing.into_row(&asset_id);
    match store.append_row(APPEND_RANGE, row.clone()).await {
        Ok(()) => {
            info!(%asset_id, "listing row appended");
            bus.info(format!("Listing {asset_id} added to the sheet"));
            bus.publish(BusEvent::RowReady { row: row.clone() });
            Ok(row)
        }
        Err(e) => {
            error!(%asset_id, error = %e, "failed to append listing row");
            bus.error(format!("Failed to append listing {asset_id}: {e}"));
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use brokerbot_test_utils::MemoryStore;

    use crate::record::ExtractedRecord;
    use crate::row::COL_PHONE;

    fn listing(phone: &str) -> ListingRow {
        ListingRow {
            record: ExtractedRecord::default(),
            realtor_name: String::new(),
            phone: phone.into(),
            timestamp: "14/11/2023 22:13".into(),
            group_name: "דירות".into(),
        }
    }

    #[tokio::test]
    async fn concurrent_submissions_get_distinct_ids() {
        let store = Arc::new(MemoryStore::new().with_sheet("Assets", [vec!["מזהה"], vec!["0007"]]));
        store.set_read_delay(Duration::from_millis(20));
        let (writer, _handle) = RowWriter::spawn(store.clone(), EventBus::default(), CancellationToken::new());

        let (a, b) = tokio::join!(
            writer.submit(listing("972500000001")),
            writer.submit(listing("972500000002"))
        );
        let mut ids = vec![a.unwrap()[0].clone(), b.unwrap()[0].clone()];
        ids.sort();
        assert_eq!(ids, vec!["0008", "0009"]);
        assert_eq!(store.sheet("Assets").len(), 4);
    }

    #[tokio::test]
    async fn rows_are_published_on_the_bus() {
        let store = Arc::new(MemoryStore::new());
        let bus = EventBus::new(16);
        let mut events = bus.subscribe();
        let (writer, _handle) = RowWriter::spawn(store, bus, CancellationToken::new());

        let row = writer.submit(listing("972501234567")).await.unwrap();
        assert_eq!(row[0], "0001");

        let mut published = None;
        while let Ok(envelope) = events.try_recv() {
            if let BusEvent::RowReady { row } = envelope.event {
                published = Some(row);
            }
        }
        assert_eq!(published.unwrap()[COL_PHONE], "972501234567");
    }

    #[tokio::test]
    async fn append_failure_is_reported_and_worker_survives() {
        let store = Arc::new(MemoryStore::new());
        let (writer, _handle) = RowWriter::spawn(store.clone(), EventBus::default(), CancellationToken::new());

        store.fail_appends(true);
        let err = writer.submit(listing("1")).await.unwrap_err();
        assert!(matches!(err, ExtractError::Broker(BrokerError::Store { .. })));

        store.fail_appends(false);
        assert!(writer.submit(listing("2")).await.is_ok());
    }

    #[tokio::test]
    async fn cancel_drains_then_refuses() {
        let store = Arc::new(MemoryStore::new());
        store.set_read_delay(Duration::from_millis(20));
        let cancel = CancellationToken::new();
        let (writer, handle) = RowWriter::spawn(store.clone(), EventBus::default(), cancel.clone());

        let pending = {
            let writer = writer.clone();
            tokio::spawn(async move { writer.submit(listing("1")).await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        cancel.cancel();

        assert!(pending.await.unwrap().is_ok());
        handle.await.unwrap();
        assert!(matches!(
            writer.submit(listing("2")).await,
            Err(ExtractError::WriterClosed)
        ));
        assert_eq!(store.sheet("Assets").len(), 1);
    }
}
