//! Running modes shared by all vision tasks

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a vision task receives its input
///
/// Chosen once at task creation and never changed afterwards. Each mode
/// admits exactly one call shape on the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunningMode {
    /// Independent single images; synchronous, no caller timestamps
    #[default]
    Image,

    /// Decoded frames of a recorded video; synchronous, caller timestamps
    Video,

    /// Live camera frames; asynchronous, results delivered to a callback
    LiveStream,
}

impl RunningMode {
    /// Whether the runner should treat the input as a continuous stream
    pub fn is_streaming(&self) -> bool {
        !matches!(self, RunningMode::Image)
    }

    /// Upper-case name used in logs and error messages
    pub fn as_str(&self) -> &'static str {
        match self {
            RunningMode::Image => "IMAGE",
            RunningMode::Video => "VIDEO",
            RunningMode::LiveStream => "LIVE_STREAM",
        }
    }
}

impl fmt::Display for RunningMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunningMode {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "image" => Ok(RunningMode::Image),
            "video" => Ok(RunningMode::Video),
            "live_stream" | "livestream" => Ok(RunningMode::LiveStream),
            other => Err(crate::Error::InvalidArgument(format!(
                "Unknown running mode: {}",
                other
            ))),
        }
    }
}
