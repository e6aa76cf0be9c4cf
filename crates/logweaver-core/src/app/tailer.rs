//! Tailer - 実行中タスクのログを incremental fetch で追いかける
//!
//! - 1 ラウンド = fetch_incremental 1 回。新しいバイトがあったラウンドだけ送る
//! - `shutdown_tx` に true を送る（または Tailer を drop する）とループが止まる
//! - RetrievalError はそのまま送ってループを終える

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::service::{RetrievalError, RetrievalService};
use crate::domain::{KnownOffsets, LogResult, TaskExecutionRef};

pub type TailItem = Result<LogResult, RetrievalError>;

/// Tail handle.
pub struct Tailer {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl Tailer {
    /// Spawn the polling loop. Rounds arrive on the returned receiver.
    pub fn spawn(
        service: Arc<RetrievalService>,
        task: TaskExecutionRef,
        poll_interval: Duration,
    ) -> (Self, mpsc::Receiver<TailItem>) {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (tx, rx) = mpsc::channel(16);

        let join = tokio::spawn(async move {
            tail_loop(service, task, poll_interval, tx, shutdown_rx).await;
        });

        (Self { shutdown_tx, join }, rx)
    }

    /// In-flight fetches finish; no new round starts.
    pub fn request_shutdown(&self) {
        // receivers may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        let _ = self.join.await;
    }
}

async fn tail_loop(
    service: Arc<RetrievalService>,
    task: TaskExecutionRef,
    poll_interval: Duration,
    tx: mpsc::Sender<TailItem>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut offsets = KnownOffsets::new();
    let mut round: u64 = 0;

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        match service.fetch_incremental(&task, &offsets).await {
            Ok(result) => {
                round += 1;
                let fresh = result.has_new_content();
                offsets.extend(result.offsets());
                debug!(round, fresh, status = ?result.overall_status, "tail round");
                if fresh && tx.send(Ok(result)).await.is_err() {
                    break;
                }
            }
            Err(err) => {
                warn!(error = %err, "tail stopped");
                let _ = tx.send(Err(err)).await;
                break;
            }
        }

        tokio::select! {
            changed = shutdown_rx.changed() => {
                // sender が drop された場合も止める
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::time::sleep(poll_interval) => {}
        }
    }
}
