//! Output marshaling
//!
//! Reads the classification result (and, in live-stream mode, the echoed
//! image) out of the runner's output packets.

use crate::graph::{CLASSIFICATION_RESULT_STREAM_NAME, IMAGE_OUT_STREAM_NAME};
use crate::options::ResultCallback;
use crate::result::{ClassificationResult, ClassifierOutput};
use parking_lot::RwLock;
use std::sync::Arc;
use vision_tasks_core::runner::PacketsCallback;
use vision_tasks_core::{Error, Image, Packet, PacketMap, Result};

fn output_packet<'a>(packets: &'a PacketMap, stream: &str) -> Result<&'a Packet> {
    packets
        .get(stream)
        .ok_or_else(|| Error::Backend(format!("Runner output is missing stream '{}'", stream)))
}

/// Classification result of a synchronous call
pub fn extract_result(packets: &PacketMap) -> Result<ClassificationResult> {
    output_packet(packets, CLASSIFICATION_RESULT_STREAM_NAME)?
        .get::<ClassificationResult>()
        .cloned()
}

fn extract_output(packets: &PacketMap) -> Result<Option<ClassifierOutput>> {
    let image_packet = output_packet(packets, IMAGE_OUT_STREAM_NAME)?;
    if image_packet.is_empty() {
        // frame dropped by the flow limiter
        return Ok(None);
    }
    let result_packet = output_packet(packets, CLASSIFICATION_RESULT_STREAM_NAME)?;
    Ok(Some(ClassifierOutput {
        result: result_packet.get::<ClassificationResult>()?.clone(),
        image: image_packet.get::<Image>()?.clone(),
        timestamp_ms: result_packet.timestamp().to_millis(),
    }))
}

/// Wrap a user callback as a runner packets callback
///
/// Runner errors are forwarded as-is. Output sets with an empty image are
/// skipped. The user callback runs under a read guard on `alive`, so
/// clearing the flag through a write guard waits for a running invocation
/// and nothing is forwarded afterwards.
///
/// The user callback must not release the classifier that invokes it.
pub fn live_stream_callback(callback: ResultCallback, alive: Arc<RwLock<bool>>) -> PacketsCallback {
    Arc::new(move |outputs: Result<PacketMap>| {
        let alive = alive.read();
        if !*alive {
            tracing::warn!("Dropping classification output delivered after the classifier was released");
            return;
        }
        match outputs.and_then(|packets| extract_output(&packets)) {
            Ok(Some(output)) => callback(Ok(output)),
            Ok(None) => tracing::trace!("Skipping output set without an image"),
            Err(e) => callback(Err(e)),
        }
    })
}
