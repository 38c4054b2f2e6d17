//! Pipeline Settings
//!
//! ```rust,ignore
//! use prism::{PipelineSettings, Precision};
//!
//! let settings = PipelineSettings {
//!     frame_buffer_precision: Precision::Low,
//!     dithering: true,
//!     ..Default::default()
//! };
//! ```

use serde::{Deserialize, Serialize};

use crate::device::DeviceLimits;
use crate::resources::Precision;

/// Configuration of a [`RenderPipeline`](crate::pipeline::RenderPipeline).
///
/// | Field                     | Default   | Effect                                             |
/// |---------------------------|-----------|----------------------------------------------------|
/// | `frame_buffer_precision`  | `High`    | Precision of intermediates nobody declares one for |
/// | `render_to_screen`        | `true`    | Last enabled pass draws to the screen              |
/// | `max_prebuilt_optional`   | `4`       | Optional-effect ceiling for pre-building, max 16   |
/// | `dithering`               | `false`   | Adds ordered noise to effect outputs               |
/// | `fallback_limits`         | WebGL 2   | Used when the device reports zero limits           |
/// | `size`                    | `(1, 1)`  | Initial target size in pixels                      |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub frame_buffer_precision: Precision,
    pub render_to_screen: bool,
    pub max_prebuilt_optional: usize,
    pub dithering: bool,
    pub fallback_limits: DeviceLimits,
    pub size: (u32, u32),
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            frame_buffer_precision: Precision::High,
            render_to_screen: true,
            max_prebuilt_optional: 4,
            dithering: false,
            fallback_limits: DeviceLimits::default(),
            size: (1, 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_falls_back_to_defaults() -> serde_json::Result<()> {
        let settings: PipelineSettings =
            serde_json::from_str(r#"{ "dithering": true, "size": [640, 480] }"#)?;

        assert!(settings.dithering);
        assert_eq!(settings.size, (640, 480));
        assert_eq!(settings.max_prebuilt_optional, 4);
        assert!(settings.render_to_screen);
        Ok(())
    }
}
