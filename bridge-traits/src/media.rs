//! Media processing boundary.
//!
//! Encoding, trimming and thumbnail extraction happen outside the core. The
//! core only forwards requests to a host-provided [`MediaProcessor`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Parameters for an export request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportParams {
    pub width: u32,
    pub height: u32,
    pub trim_start_ms: Option<i64>,
    pub trim_end_ms: Option<i64>,
    /// Burn the app watermark into the output.
    pub watermark: bool,
}

impl ExportParams {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            trim_start_ms: None,
            trim_end_ms: None,
            watermark: false,
        }
    }

    pub fn with_trim(mut self, start_ms: i64, end_ms: i64) -> Self {
        self.trim_start_ms = Some(start_ms);
        self.trim_end_ms = Some(end_ms);
        self
    }

    pub fn with_watermark(mut self, watermark: bool) -> Self {
        self.watermark = watermark;
        self
    }
}

/// Technical metadata of a media artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaMetadata {
    pub duration_ms: i64,
    pub size_bytes: i64,
    pub width: u32,
    pub height: u32,
    pub thumbnail_ref: Option<String>,
}

#[async_trait]
pub trait MediaProcessor: Send + Sync {
    /// Export `input_ref` with `params`, returning the output reference.
    async fn export(&self, input_ref: &str, params: &ExportParams) -> Result<String>;

    /// Read technical metadata, `None` when the artifact cannot be probed.
    async fn get_metadata(&self, reference: &str) -> Result<Option<MediaMetadata>>;
}
