//! Render Targets
//!
//! A [`RenderTarget`] is the CPU-side record of an off-screen buffer: a
//! label, its size, and one [`TextureInfo`] per color attachment. The GPU
//! object behind it is an opaque [`TargetHandle`] created by the
//! [`RenderDevice`](crate::device::RenderDevice). The resolver only ever
//! touches attachment indices and the precision/color-space flags.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::resource::{Disposable, ResourceKey};

/// Storage precision of a color attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Precision {
    /// 8 bits per channel.
    Low,
    /// 16-bit float per channel.
    #[default]
    High,
}

/// Encoding of the values stored in a color attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ColorSpace {
    #[default]
    Linear,
    /// Display encoding, used for low-precision intermediates to avoid banding.
    Srgb,
}

impl ColorSpace {
    /// Color space a texture should use when stored at `precision`.
    #[must_use]
    pub const fn for_precision(precision: Precision) -> Self {
        match precision {
            Precision::Low => Self::Srgb,
            Precision::High => Self::Linear,
        }
    }
}

/// Metadata of one color attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextureInfo {
    pub precision: Precision,
    pub color_space: ColorSpace,
}

/// Points at one attachment of a render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureRef {
    pub target: ResourceKey,
    pub attachment: u32,
}

impl TextureRef {
    #[must_use]
    pub const fn new(target: ResourceKey, attachment: u32) -> Self {
        Self { target, attachment }
    }
}

/// Description handed to the device when a target is allocated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderTargetDesc {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub attachments: SmallVec<[TextureInfo; 4]>,
}

/// Device-side object backing a [`RenderTarget`].
pub trait TargetHandle {
    fn resize(&mut self, width: u32, height: u32);
    fn dispose(&mut self);
}

/// An off-screen buffer with one or more color attachments.
pub struct RenderTarget {
    label: String,
    width: u32,
    height: u32,
    attachments: SmallVec<[TextureInfo; 4]>,
    handle: Option<Box<dyn TargetHandle>>,
}

impl RenderTarget {
    #[must_use]
    pub fn new(desc: RenderTargetDesc, handle: Box<dyn TargetHandle>) -> Self {
        Self {
            label: desc.label,
            width: desc.width,
            height: desc.height,
            attachments: desc.attachments,
            handle: Some(handle),
        }
    }

    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    #[must_use]
    pub fn attachment_count(&self) -> usize {
        self.attachments.len()
    }

    #[must_use]
    pub fn attachment(&self, index: u32) -> Option<&TextureInfo> {
        self.attachments.get(index as usize)
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.handle.is_none()
    }

    pub fn set_size(&mut self, width: u32, height: u32) {
        if (self.width, self.height) == (width, height) {
            return;
        }
        self.width = width;
        self.height = height;
        if let Some(handle) = self.handle.as_mut() {
            handle.resize(width, height);
        }
    }
}

impl Disposable for RenderTarget {
    fn dispose(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.dispose();
        }
    }
}

impl std::fmt::Debug for RenderTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderTarget")
            .field("label", &self.label)
            .field("size", &(self.width, self.height))
            .field("attachments", &self.attachments)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
