//! Geometry Pass
//!
//! Draws the scene into the G-Buffer. The first enabled geometry pass of a
//! pipeline is the *primary* one: the resolver sizes its target to every
//! channel a later pass reads. Further geometry passes draw into the same
//! target and are usually built [`without_clear`](GeometryPass::without_clear).

use std::any::Any;

use crate::device::GeometryDraw;
use crate::pipeline::pass::{FrameContext, Pass, PassBase, PassKind};

pub struct GeometryPass {
    base: PassBase,
    clear: bool,
}

impl GeometryPass {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let mut base = PassBase::new(name);
        base.set_uses_default_input(false);
        Self { base, clear: true }
    }

    /// Draws on top of existing content instead of clearing first.
    #[must_use]
    pub fn without_clear(mut self) -> Self {
        self.clear = false;
        self
    }

    #[must_use]
    pub fn clears(&self) -> bool {
        self.clear
    }
}

impl Pass for GeometryPass {
    fn base(&self) -> &PassBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut PassBase {
        &mut self.base
    }

    fn kind(&self) -> PassKind {
        PassKind::Geometry
    }

    fn render(&mut self, ctx: &mut FrameContext<'_>) {
        let output = self.base.output();
        let attachments = output.gbuffer_layout().map_or(1, |l| l.attachment_count());

        ctx.device.draw_geometry(&GeometryDraw {
            label: self.base.name(),
            attachments,
            clear: self.clear,
            target: output.draw_target(),
        });
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
