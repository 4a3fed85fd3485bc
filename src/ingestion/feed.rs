//! Backfill feed: decoded events as JSON lines.
//!
//! The log-decoding collaborator emits one `DecodedEvent` object per line;
//! this reader forwards them onto the pipeline channel. Undecodable lines
//! are skipped and counted, never fatal.

use std::path::Path;

use metrics::counter;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::models::DecodedEvent;

pub async fn run_file_feed(
    path: impl AsRef<Path>,
    event_tx: mpsc::Sender<DecodedEvent>,
) -> anyhow::Result<()> {
    let file = File::open(path.as_ref()).await?;
    let mut lines = BufReader::new(file).lines();

    let mut line_no: u64 = 0;
    let mut sent: u64 = 0;
    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<DecodedEvent>(line) {
            Ok(event) => {
                if event_tx.send(event).await.is_err() {
                    tracing::warn!("pipeline channel closed, stopping feed");
                    break;
                }
                sent += 1;
            }
            Err(e) => {
                tracing::warn!(line = line_no, error = %e, "skipping undecodable feed line");
                counter!("feed_lines_skipped_total").increment(1);
            }
        }
    }

    tracing::info!(events = sent, "file feed drained");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_feed_skips_bad_lines_and_forwards_good_ones() {
        let path = std::env::temp_dir().join(format!(
            "ctfindex-feed-test-{}.jsonl",
            std::process::id()
        ));
        let good = r#"{"contract_address":"0x4d97dcd97ec945f40cf65f87097ace5ea0476045","event_name":"PositionSplit","transaction_hash":"0x00000000000000000000000000000000000000000000000000000000000000aa","log_index":1,"block_number":42,"block_timestamp":1700000084,"params":{"conditionId":"0x383f8266f40728c7b01e2f1fdf6bf36838b74329e6b3b4c05a616aa966a988a2"}}"#;
        let contents = format!("{good}\nnot json at all\n\n{good}\n");
        tokio::fs::write(&path, contents).await.unwrap();

        let (tx, mut rx) = mpsc::channel(16);
        run_file_feed(&path, tx).await.unwrap();
        tokio::fs::remove_file(&path).await.ok();

        let mut received = Vec::new();
        while let Some(event) = rx.recv().await {
            received.push(event);
        }
        assert_eq!(received.len(), 2);
        assert_eq!(received[0].event_name, "PositionSplit");
        assert_eq!(received[0].block_number, 42);
    }
}
