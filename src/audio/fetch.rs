//! Off-thread fetching of stream and artwork bytes.
//!
//! Each fetch runs on its own short-lived thread and posts the result back
//! to the audio thread's command channel, tagged with the generation it
//! was started for.

use std::path::Path;
use std::sync::mpsc::Sender;
use std::thread;

use tracing::debug;

use crate::error::PlaybackError;

use super::backend::Fetcher;
use super::types::{AudioCmd, Generation};

pub(super) struct ThreadFetcher {
    tx: Sender<AudioCmd>,
    client: reqwest::blocking::Client,
}

impl ThreadFetcher {
    pub(super) fn new(tx: Sender<AudioCmd>) -> Self {
        Self {
            tx,
            client: reqwest::blocking::Client::new(),
        }
    }

    fn spawn<F>(&self, uri: &str, wrap: F)
    where
        F: FnOnce(Result<Vec<u8>, String>) -> AudioCmd + Send + 'static,
    {
        let tx = self.tx.clone();
        let client = self.client.clone();
        let uri = uri.to_string();
        thread::spawn(move || {
            debug!(%uri, "fetching");
            let result = read_uri(&client, &uri);
            // The audio thread may already be gone on shutdown.
            let _ = tx.send(wrap(result));
        });
    }
}

impl Fetcher for ThreadFetcher {
    fn fetch_stream(&self, generation: Generation, uri: &str) {
        self.spawn(uri, move |result| AudioCmd::StreamLoaded {
            generation,
            result: result.map_err(PlaybackError::StreamOpenFailed),
        });
    }

    fn fetch_artwork(&self, generation: Generation, uri: &str) {
        self.spawn(uri, move |result| AudioCmd::ArtworkLoaded {
            generation,
            result: result.map_err(PlaybackError::ArtworkFetchFailed),
        });
    }
}

/// Read the full body behind `uri`: `http(s)://` over the network,
/// `file://` and bare paths from disk.
pub(super) fn read_uri(client: &reqwest::blocking::Client, uri: &str) -> Result<Vec<u8>, String> {
    if uri.starts_with("http://") || uri.starts_with("https://") {
        let response = client
            .get(uri)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| format!("{uri}: {e}"))?;
        let body = response.bytes().map_err(|e| format!("{uri}: {e}"))?;
        return Ok(body.to_vec());
    }

    let path = uri.strip_prefix("file://").unwrap_or(uri);
    std::fs::read(Path::new(path)).map_err(|e| format!("{path}: {e}"))
}
