//! Normalized rectangles used as regions of interest

use serde::{Deserialize, Serialize};

/// Rectangle in coordinates normalized to the image size
///
/// All fields are fractions of the image width/height in `[0, 1]`.
/// `rotation` is in radians and is passed through to the runner as-is.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRect {
    /// Horizontal center
    pub x_center: f32,
    /// Vertical center
    pub y_center: f32,
    /// Width as a fraction of the image width
    pub width: f32,
    /// Height as a fraction of the image height
    pub height: f32,
    /// Clockwise rotation in radians
    #[serde(default)]
    pub rotation: f32,
}

impl NormalizedRect {
    /// Rectangle with no rotation
    pub fn new(x_center: f32, y_center: f32, width: f32, height: f32) -> Self {
        Self {
            x_center,
            y_center,
            width,
            height,
            rotation: 0.0,
        }
    }

    /// Rectangle covering the entire image
    pub fn full_image() -> Self {
        Self::new(0.5, 0.5, 1.0, 1.0)
    }

    /// Builder pattern: set rotation
    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }
}

impl Default for NormalizedRect {
    fn default() -> Self {
        Self::full_image()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_full_image() {
        let rect = NormalizedRect::default();
        assert_eq!(
            (rect.x_center, rect.y_center, rect.width, rect.height),
            (0.5, 0.5, 1.0, 1.0)
        );
        assert_eq!(rect.rotation, 0.0);
    }

    #[test]
    fn test_rotation_defaults_when_missing() {
        let rect: NormalizedRect =
            serde_json::from_str(r#"{"x_center":0.25,"y_center":0.5,"width":0.5,"height":1.0}"#)
                .unwrap();
        assert_eq!(rect, NormalizedRect::new(0.25, 0.5, 0.5, 1.0));
    }
}
