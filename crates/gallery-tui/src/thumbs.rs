//! Thumbnail availability checks.
//!
//! A terminal cannot show the images, but it can tell whether they would
//! load: URLs get a HEAD request, anything else is treated as a local path.
//! Results come back to the event loop as `AppMessage::ThumbProbed`.

use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tracing::debug;

use crate::app::AppMessage;

const CONCURRENCY: usize = 6;
const TIMEOUT: Duration = Duration::from_secs(10);

fn is_remote(thumb: &str) -> bool {
    thumb.starts_with("http://") || thumb.starts_with("https://")
}

/// Whether `thumb` can be fetched. Servers that refuse HEAD get a GET.
pub async fn probe(client: &reqwest::Client, thumb: &str) -> bool {
    if !is_remote(thumb) {
        return tokio::fs::metadata(thumb).await.map(|m| m.is_file()).unwrap_or(false);
    }
    match client.head(thumb).send().await {
        Ok(resp) if resp.status().is_success() => true,
        Ok(resp) if resp.status() == reqwest::StatusCode::METHOD_NOT_ALLOWED => client
            .get(thumb)
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false),
        Ok(resp) => {
            debug!("thumb probe {}: HTTP {}", thumb, resp.status());
            false
        }
        Err(e) => {
            debug!("thumb probe {}: {}", thumb, e);
            false
        }
    }
}

/// Probe every thumbnail in the background, a few at a time.
pub fn spawn_probes(thumbs: Vec<String>, tx: mpsc::Sender<AppMessage>) {
    if thumbs.is_empty() {
        return;
    }
    tokio::spawn(async move {
        let client = match reqwest::Client::builder().timeout(TIMEOUT).build() {
            Ok(c) => c,
            Err(e) => {
                debug!("thumb probe client: {}", e);
                return;
            }
        };
        let client = &client;
        let mut results = futures_util::stream::iter(thumbs)
            .map(|thumb| async move {
                let ok = probe(client, &thumb).await;
                (thumb, ok)
            })
            .buffer_unordered(CONCURRENCY);
        while let Some((thumb, ok)) = results.next().await {
            if tx.send(AppMessage::ThumbProbed { thumb, ok }).await.is_err() {
                break;
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_paths_checked_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let img = dir.path().join("a.jpg");
        std::fs::write(&img, b"jpg").unwrap();
        let client = reqwest::Client::new();

        assert!(probe(&client, img.to_str().unwrap()).await);
        assert!(!probe(&client, dir.path().join("missing.jpg").to_str().unwrap()).await);
        // A directory is not an image
        assert!(!probe(&client, dir.path().to_str().unwrap()).await);
    }

    #[test]
    fn test_remote_detection() {
        assert!(is_remote("https://cdn.example/a.jpg"));
        assert!(is_remote("http://cdn.example/a.jpg"));
        assert!(!is_remote("thumbs/a.jpg"));
    }
}
