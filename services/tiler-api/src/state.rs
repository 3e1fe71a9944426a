//! Application state for the tiler API.

use tiling::{ArtifactStore, Pipeline, TilingConfig};
use uuid::Uuid;

/// Shared application state.
pub struct AppState {
    /// Tiling pipeline, also owning the artifact store.
    pub pipeline: Pipeline,

    /// Prefix for links in responses, e.g. `https://tiler.example.com`.
    /// Empty means links are relative to the server root.
    pub base_url: String,

    /// Largest accepted upload in bytes.
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(config: TilingConfig, base_url: impl Into<String>, max_upload_bytes: usize) -> Self {
        Self {
            pipeline: Pipeline::new(config),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_upload_bytes,
        }
    }

    pub fn store(&self) -> &ArtifactStore {
        self.pipeline.store()
    }

    /// Link to a run summary.
    pub fn run_url(&self, run_id: &Uuid) -> String {
        format!("{}/runs/{}", self.base_url, run_id)
    }

    /// Link to one artifact of a run.
    pub fn file_url(&self, run_id: &Uuid, name: &str) -> String {
        format!(
            "{}/runs/{}/files/{}",
            self.base_url,
            run_id,
            encode_path_segment(name)
        )
    }
}

/// Percent-encode everything outside the RFC 3986 unreserved set.
fn encode_path_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
