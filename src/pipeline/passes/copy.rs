//! Copy Pass
//!
//! Copies its default input to its output with the pass-through effect
//! material. Typically appended to present an intermediate result on screen,
//! or inserted to change the precision of a buffer.

use std::any::Any;
use std::sync::Arc;

use crate::device::FullscreenDraw;
use crate::effects::{EffectMaterial, EffectMaterialManager};
use crate::errors::PassError;
use crate::pipeline::pass::{FrameContext, Pass, PassBase};
use crate::resources::{Precision, Uniforms};

pub struct CopyPass {
    base: PassBase,
    manager: EffectMaterialManager,
    material: Option<Arc<EffectMaterial>>,
    uniforms: Uniforms,
}

impl CopyPass {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            base: PassBase::new(name),
            manager: EffectMaterialManager::new(),
            material: None,
            uniforms: Uniforms::new(),
        }
    }

    /// Requests that the buffer this pass reads be stored at `precision`.
    #[must_use]
    pub fn with_input_precision(mut self, precision: Precision) -> Self {
        self.base.set_input_precision(Some(precision));
        self
    }
}

impl Pass for CopyPass {
    fn base(&self) -> &PassBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut PassBase {
        &mut self.base
    }

    fn prepare(&mut self, ctx: &mut FrameContext<'_>) -> Result<(), PassError> {
        self.manager.set_precision(
            self.base
                .input()
                .precision()
                .unwrap_or(ctx.settings.frame_buffer_precision),
        );

        let material = self.manager.get_material(&[])?;
        let changed = self
            .material
            .as_ref()
            .is_none_or(|m| !Arc::ptr_eq(m, &material));
        if changed {
            ctx.device.compile(&material);
        }
        self.material = Some(material);
        Ok(())
    }

    fn render(&mut self, ctx: &mut FrameContext<'_>) {
        let Some(material) = self.material.as_ref() else {
            return;
        };

        ctx.device.draw_fullscreen(&FullscreenDraw {
            label: self.base.name(),
            material,
            input: self.base.input().default_texture(),
            buffers: &[],
            uniforms: &self.uniforms,
            target: self.base.output().draw_target(),
        });
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
