//! Input normalization
//!
//! Turns a caller's image, optional region of interest and optional
//! timestamp into the packet map the classification graph consumes.

use crate::graph::{IMAGE_IN_STREAM_NAME, NORM_RECT_STREAM_NAME};
use vision_tasks_core::{Error, Image, NormalizedRect, Packet, PacketMap, Result, Timestamp};

/// Reject GPU-backed images
pub fn ensure_cpu_image(image: &Image) -> Result<()> {
    if image.uses_gpu() {
        return Err(Error::UnsupportedInput(
            "GPU input images are currently not supported.".to_string(),
        ));
    }
    Ok(())
}

/// Build the input packets for one classification request
///
/// A missing `roi` means the whole image. When `timestamp` is given both
/// packets carry it; otherwise the runner assigns one.
pub fn build_packets(
    image: &Image,
    roi: Option<NormalizedRect>,
    timestamp: Option<Timestamp>,
) -> PacketMap {
    let roi = roi.unwrap_or_else(NormalizedRect::full_image);
    let mut image_packet = Packet::new(image.clone());
    let mut roi_packet = Packet::new(roi);
    if let Some(ts) = timestamp {
        image_packet = image_packet.at(ts);
        roi_packet = roi_packet.at(ts);
    }

    let mut packets = PacketMap::with_capacity(2);
    packets.insert(IMAGE_IN_STREAM_NAME.to_string(), image_packet);
    packets.insert(NORM_RECT_STREAM_NAME.to_string(), roi_packet);
    packets
}
