//! Render configuration.

use crate::attributes::VoidElements;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Options recognized by a streaming render.
///
/// Every field has a default, so partial configuration documents are accepted:
///
/// ```
/// use xssr_core::RenderOptions;
///
/// let options = RenderOptions::from_json(r#"{"chunkSize": 1024, "staticMode": true}"#).unwrap();
/// assert_eq!(options.chunk_size(), 1024);
/// assert!(options.static_mode);
/// assert_eq!(options.yield_frame_threshold(), 512);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderOptions {
    /// Bytes buffered before a chunk is delivered downstream.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Frames processed between yield points at most.
    #[serde(default = "default_yield_frame_threshold")]
    pub yield_frame_threshold: u32,
    /// Milliseconds of work between yield points at most.
    #[serde(default = "default_yield_time_threshold_ms")]
    pub yield_time_threshold_ms: u64,
    /// Suppresses identity markers (output not meant for client reconciliation).
    #[serde(default)]
    pub static_mode: bool,
    /// Nested component expansions allowed along one path.
    #[serde(default = "default_max_expansion_depth")]
    pub max_expansion_depth: u32,
    /// How long the consumer may keep the output paused; unbounded when unset.
    #[serde(default)]
    pub backpressure_timeout_ms: Option<u64>,
    /// Undelivered chunks a stream holds before pausing the render.
    #[serde(default = "default_max_pending_chunks")]
    pub max_pending_chunks: usize,
    /// Attribute carrying per-element identity markers.
    #[serde(default = "default_identity_attribute")]
    pub identity_attribute: String,
    /// Tags rendered self-closed, without children.
    #[serde(default)]
    pub void_elements: VoidElements,
}

impl RenderOptions {
    /// Parses options from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Options for static output (no identity markers).
    pub fn static_markup() -> Self {
        Self {
            static_mode: true,
            ..Self::default()
        }
    }

    /// Chunk size in bytes, at least one.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size.max(1)
    }

    /// Frame threshold, at least one.
    pub fn yield_frame_threshold(&self) -> u32 {
        self.yield_frame_threshold.max(1)
    }

    /// Time threshold as a duration.
    pub fn yield_time_threshold(&self) -> Duration {
        Duration::from_millis(self.yield_time_threshold_ms)
    }

    /// Backpressure ceiling as a duration.
    pub fn backpressure_timeout(&self) -> Option<Duration> {
        self.backpressure_timeout_ms.map(Duration::from_millis)
    }

    /// Pending chunk limit, at least one.
    pub fn max_pending_chunks(&self) -> usize {
        self.max_pending_chunks.max(1)
    }

    /// Identity attribute name, or `None` in static mode.
    pub fn identity_marker(&self) -> Option<&str> {
        if self.static_mode {
            None
        } else {
            Some(&self.identity_attribute)
        }
    }
}

fn default_chunk_size() -> usize {
    4096
}

fn default_yield_frame_threshold() -> u32 {
    512
}

fn default_yield_time_threshold_ms() -> u64 {
    5
}

fn default_max_expansion_depth() -> u32 {
    256
}

fn default_max_pending_chunks() -> usize {
    4
}

fn default_identity_attribute() -> String {
    "data-vid".to_string()
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            yield_frame_threshold: default_yield_frame_threshold(),
            yield_time_threshold_ms: default_yield_time_threshold_ms(),
            static_mode: false,
            max_expansion_depth: default_max_expansion_depth(),
            backpressure_timeout_ms: None,
            max_pending_chunks: default_max_pending_chunks(),
            identity_attribute: default_identity_attribute(),
            void_elements: VoidElements::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_matches_default() {
        let options = RenderOptions::from_json("{}").unwrap();
        assert_eq!(options, RenderOptions::default());
    }

    #[test]
    fn parses_all_fields() {
        let options = RenderOptions::from_json(
            r#"{
                "chunkSize": 64,
                "yieldFrameThreshold": 8,
                "yieldTimeThresholdMs": 2,
                "staticMode": true,
                "maxExpansionDepth": 3,
                "backpressureTimeoutMs": 250,
                "maxPendingChunks": 2,
                "identityAttribute": "data-id",
                "voidElements": ["br", "x-void"]
            }"#,
        )
        .unwrap();
        assert_eq!(options.chunk_size(), 64);
        assert_eq!(options.yield_frame_threshold(), 8);
        assert_eq!(options.yield_time_threshold(), Duration::from_millis(2));
        assert_eq!(options.max_expansion_depth, 3);
        assert_eq!(options.backpressure_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(options.max_pending_chunks(), 2);
        assert_eq!(options.identity_marker(), None);
        assert!(options.void_elements.contains("x-void"));
        assert!(!options.void_elements.contains("img"));
    }

    #[test]
    fn zero_thresholds_are_clamped() {
        let options = RenderOptions {
            chunk_size: 0,
            yield_frame_threshold: 0,
            max_pending_chunks: 0,
            ..RenderOptions::default()
        };
        assert_eq!(options.chunk_size(), 1);
        assert_eq!(options.yield_frame_threshold(), 1);
        assert_eq!(options.max_pending_chunks(), 1);
    }

    #[test]
    fn identity_marker_follows_static_mode() {
        assert_eq!(RenderOptions::default().identity_marker(), Some("data-vid"));
        assert_eq!(RenderOptions::static_markup().identity_marker(), None);
    }

    #[test]
    fn rejects_unknown_types() {
        assert!(RenderOptions::from_json(r#"{"chunkSize": "big"}"#).is_err());
    }
}
