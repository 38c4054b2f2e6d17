//! Effect Pass
//!
//! Runs the enabled effects of a list as one full-screen draw. The merged
//! program comes from the pass's own [`EffectMaterialManager`]; switching
//! effects on and off only selects another cached material.
//!
//! A combination that cannot be merged (two convolution effects, a UV
//! transform next to a convolution, an effect without entry point) disables
//! the pass. The rest of the pipeline keeps rendering and the pass can be
//! re-enabled once its effects are fixed.

use std::any::Any;
use std::sync::Arc;

use glam::Vec2;
use rustc_hash::FxHashSet;

use crate::device::FullscreenDraw;
use crate::effects::{Effect, EffectId, EffectMaterial, EffectMaterialManager, UniformBinding};
use crate::errors::PassError;
use crate::pipeline::pass::{FrameContext, Pass, PassBase, PassKind};
use crate::resources::{GBufferComponents, GBufferLayout, UniformValue, Uniforms};

pub struct EffectPass {
    base: PassBase,
    effects: Vec<Effect>,
    manager: EffectMaterialManager,
    material: Option<Arc<EffectMaterial>>,
    compiled: FxHashSet<u128>,
    uniforms: Uniforms,
}

impl EffectPass {
    #[must_use]
    pub fn new(name: impl Into<String>, effects: Vec<Effect>) -> Self {
        let mut pass = Self {
            base: PassBase::new(name),
            effects,
            manager: EffectMaterialManager::new(),
            material: None,
            compiled: FxHashSet::default(),
            uniforms: Uniforms::new(),
        };
        pass.update_requirements();
        pass
    }

    #[must_use]
    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    #[must_use]
    pub fn effect(&self, id: EffectId) -> Option<&Effect> {
        self.effects.iter().find(|e| e.id() == id)
    }

    /// Mutates one effect and refreshes the G-Buffer channels the pass reads.
    pub fn with_effect_mut<R>(
        &mut self,
        id: EffectId,
        f: impl FnOnce(&mut Effect) -> R,
    ) -> Option<R> {
        let effect = self.effects.iter_mut().find(|e| e.id() == id)?;
        let result = f(effect);
        self.update_requirements();
        Some(result)
    }

    pub fn add_effect(&mut self, effect: Effect) -> EffectId {
        let id = effect.id();
        self.effects.push(effect);
        self.update_requirements();
        id
    }

    pub fn remove_effect(&mut self, id: EffectId) -> Option<Effect> {
        let index = self.effects.iter().position(|e| e.id() == id)?;
        let effect = self.effects.remove(index);
        self.update_requirements();
        Some(effect)
    }

    #[must_use]
    pub fn manager(&self) -> &EffectMaterialManager {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut EffectMaterialManager {
        &mut self.manager
    }

    /// Material selected by the last [`prepare`](Pass::prepare).
    #[must_use]
    pub fn material(&self) -> Option<&Arc<EffectMaterial>> {
        self.material.as_ref()
    }

    /// Recomputes the G-Buffer channels of the enabled effects, including
    /// skipped ones: they contribute no text but keep their depth need.
    pub fn update_requirements(&mut self) {
        let components = self
            .effects
            .iter()
            .filter(|e| e.is_enabled())
            .fold(GBufferComponents::empty(), |acc, e| acc | e.required_components());
        self.base.set_required_components(components);
    }

    /// Current values of every uniform of the active material, read from the
    /// live effects.
    #[must_use]
    pub fn uniform_values(&self) -> Uniforms {
        let mut values = Uniforms::new();
        let Some(material) = self.material.as_ref() else {
            return values;
        };

        for (name, binding) in material.uniforms() {
            let value = match binding {
                UniformBinding::Effect { effect, name: uniform } => self
                    .effect(*effect)
                    .and_then(|e| e.uniform(uniform))
                    .copied(),
                UniformBinding::BlendOpacity(effect) => self
                    .effect(*effect)
                    .map(|e| UniformValue::Float(e.blend_mode().opacity)),
            };
            if let Some(value) = value {
                values.insert(name.clone(), value);
            }
        }
        values
    }
}

impl Pass for EffectPass {
    fn base(&self) -> &PassBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut PassBase {
        &mut self.base
    }

    fn kind(&self) -> PassKind {
        PassKind::Effect
    }

    fn prepare(&mut self, ctx: &mut FrameContext<'_>) -> Result<(), PassError> {
        self.update_requirements();

        self.manager.set_limits(ctx.limits());
        self.manager.set_dithering(ctx.settings.dithering);
        self.manager.set_max_prebuilt_optional(ctx.settings.max_prebuilt_optional);
        self.manager.set_precision(
            self.base
                .input()
                .precision()
                .unwrap_or(ctx.settings.frame_buffer_precision),
        );

        match self.manager.get_material(&self.effects) {
            Ok(material) => {
                if self.compiled.insert(material.source_hash()) {
                    ctx.device.compile(&material);
                }
                self.material = Some(material);
                Ok(())
            }
            Err(e) => {
                log::error!("Effect pass '{}' disabled: {e}", self.base.name());
                self.material = None;
                self.base.set_enabled(false);
                Err(e.into())
            }
        }
    }

    fn render(&mut self, ctx: &mut FrameContext<'_>) {
        let Some(material) = self.material.clone() else {
            return;
        };

        let mut uniforms = self.uniform_values();
        let (width, height) = ctx.size;
        let resolution = Vec2::new(width.max(1) as f32, height.max(1) as f32);
        uniforms.insert("resolution".into(), UniformValue::Vec2(resolution));
        uniforms.insert("texelSize".into(), UniformValue::Vec2(resolution.recip()));
        uniforms.insert("aspect".into(), UniformValue::Float(resolution.x / resolution.y));
        uniforms.insert("time".into(), UniformValue::Float(ctx.elapsed));
        self.uniforms = uniforms;

        let buffers = self.base.input().bound_buffers();
        ctx.device.draw_fullscreen(&FullscreenDraw {
            label: self.base.name(),
            material: &material,
            input: self.base.input().default_texture(),
            buffers: &buffers,
            uniforms: &self.uniforms,
            target: self.base.output().draw_target(),
        });
    }

    fn set_gbuffer_layout(&mut self, layout: &GBufferLayout) {
        self.manager.set_gbuffer_layout(layout);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
