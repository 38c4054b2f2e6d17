//! G-Buffer Components
//!
//! A geometry pass writes several logical channels into one multi-attachment
//! render target. [`GBufferComponents`] is the set of channels requested;
//! [`GBufferLayout`] fixes which attachment index each channel occupies.
//!
//! | Component  | Define            |
//! |------------|-------------------|
//! | `COLOR`    | `GBUFFER_COLOR`   |
//! | `NORMAL`   | `GBUFFER_NORMAL`  |
//! | `DEPTH`    | `GBUFFER_DEPTH`   |
//! | `VELOCITY` | `GBUFFER_VELOCITY`|
//! | `POSITION` | `GBUFFER_POSITION`|
//! | `EMISSION` | `GBUFFER_EMISSION`|
//! | `ORM`      | `GBUFFER_ORM`     |
//!
//! Color always occupies attachment 0; the remaining channels follow in the
//! bit order of the table above.

use bitflags::bitflags;
use smallvec::SmallVec;

use super::shader_defines::ShaderDefines;

bitflags! {
    /// Set of logical G-Buffer channels.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct GBufferComponents: u32 {
        const COLOR    = 1 << 0;
        const NORMAL   = 1 << 1;
        const DEPTH    = 1 << 2;
        const VELOCITY = 1 << 3;
        const POSITION = 1 << 4;
        const EMISSION = 1 << 5;
        const ORM      = 1 << 6;
    }
}

const COMPONENT_DEFINES: [(GBufferComponents, &str); 7] = [
    (GBufferComponents::COLOR, "GBUFFER_COLOR"),
    (GBufferComponents::NORMAL, "GBUFFER_NORMAL"),
    (GBufferComponents::DEPTH, "GBUFFER_DEPTH"),
    (GBufferComponents::VELOCITY, "GBUFFER_VELOCITY"),
    (GBufferComponents::POSITION, "GBUFFER_POSITION"),
    (GBufferComponents::EMISSION, "GBUFFER_EMISSION"),
    (GBufferComponents::ORM, "GBUFFER_ORM"),
];

impl GBufferComponents {
    /// Macro name announcing a single channel to generated shaders.
    #[must_use]
    pub fn define_name(self) -> Option<&'static str> {
        COMPONENT_DEFINES
            .iter()
            .find(|(c, _)| *c == self)
            .map(|&(_, define)| define)
    }
}

/// Attachment index of every channel in a G-Buffer target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct GBufferLayout {
    components: GBufferComponents,
    indices: SmallVec<[(GBufferComponents, u32); 8]>,
}

impl GBufferLayout {
    /// Builds the layout for `components`; color is always included.
    #[must_use]
    pub fn new(components: GBufferComponents) -> Self {
        let components = components | GBufferComponents::COLOR;
        let indices = components
            .iter()
            .enumerate()
            .map(|(i, c)| (c, i as u32))
            .collect();

        Self {
            components,
            indices,
        }
    }

    #[inline]
    #[must_use]
    pub fn components(&self) -> GBufferComponents {
        self.components
    }

    #[must_use]
    pub fn index_of(&self, component: GBufferComponents) -> Option<u32> {
        self.indices
            .iter()
            .find(|(c, _)| *c == component)
            .map(|&(_, i)| i)
    }

    #[inline]
    #[must_use]
    pub fn attachment_count(&self) -> usize {
        self.indices.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (GBufferComponents, u32)> + '_ {
        self.indices.iter().copied()
    }

    /// `GBUFFER_*` macros carrying each channel's attachment index.
    #[must_use]
    pub fn defines(&self) -> ShaderDefines {
        let mut defines = ShaderDefines::with_capacity(self.indices.len());
        for (component, index) in self.iter() {
            if let Some(name) = component.define_name() {
                defines.set(name, &index.to_string());
            }
        }
        defines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_is_always_first() {
        let layout = GBufferLayout::new(GBufferComponents::NORMAL | GBufferComponents::VELOCITY);
        assert_eq!(layout.index_of(GBufferComponents::COLOR), Some(0));
        assert_eq!(layout.index_of(GBufferComponents::NORMAL), Some(1));
        assert_eq!(layout.index_of(GBufferComponents::VELOCITY), Some(2));
        assert_eq!(layout.index_of(GBufferComponents::DEPTH), None);
        assert_eq!(layout.attachment_count(), 3);
    }

    #[test]
    fn empty_set_yields_color_only() {
        let layout = GBufferLayout::new(GBufferComponents::empty());
        assert_eq!(layout.components(), GBufferComponents::COLOR);
        assert_eq!(layout.attachment_count(), 1);
    }

    #[test]
    fn defines_carry_indices() {
        let layout = GBufferLayout::new(GBufferComponents::DEPTH);
        let defines = layout.defines();
        assert_eq!(defines.get("GBUFFER_COLOR"), Some("0"));
        assert_eq!(defines.get("GBUFFER_DEPTH"), Some("1"));
    }
}
