//! Render Pipeline
//!
//! Ordered list of passes plus the machinery that wires them together. The
//! pipeline owns the [`RenderDevice`], the [`BufferManager`] and the
//! [`IoManager`]; any change to the pass list or to a pass's topology
//! triggers a full re-resolution before the next pass touches a buffer.
//!
//! ```rust,ignore
//! use prism::pipeline::{RenderPipeline, passes::{EffectPass, GeometryPass}};
//!
//! let mut pipeline = RenderPipeline::new(Box::new(device), PipelineSettings::default());
//! pipeline.add_pass(GeometryPass::new("scene"));
//! let post = pipeline.add_pass(EffectPass::new("post", vec![vignette, bloom]));
//!
//! pipeline.render(1.0 / 60.0);
//! ```

use std::rc::Rc;

use super::buffer_manager::BufferManager;
use super::io_manager::{IoManager, ResolveReport};
use super::pass::{FrameContext, Pass, PassId};
use crate::device::RenderDevice;
use crate::errors::{PrismError, Result};
use crate::resources::{RenderTarget, SharedRegistry, TextureRef};
use crate::settings::PipelineSettings;
use crate::utils::interner;

pub struct RenderPipeline {
    device: Box<dyn RenderDevice>,
    settings: PipelineSettings,
    passes: Vec<Box<dyn Pass>>,
    buffers: BufferManager,
    io: IoManager,
    /// Pass identities and topology versions at the last resolution.
    resolved_topology: Vec<(PassId, bool, u64)>,
    needs_resolve: bool,
    elapsed: f32,
}

impl RenderPipeline {
    #[must_use]
    pub fn new(device: Box<dyn RenderDevice>, settings: PipelineSettings) -> Self {
        interner::preload_common_macros();
        let buffers = BufferManager::new(settings.size);
        Self {
            device,
            settings,
            passes: Vec::new(),
            buffers,
            io: IoManager::new(),
            resolved_topology: Vec::new(),
            needs_resolve: true,
            elapsed: 0.0,
        }
    }

    // ---- Passes ----

    /// Appends a pass and re-resolves. Returns its index.
    pub fn add_pass(&mut self, pass: impl Pass) -> usize {
        self.passes.push(Box::new(pass));
        self.resolve();
        self.passes.len() - 1
    }

    pub fn insert_pass(&mut self, index: usize, pass: impl Pass) -> Result<()> {
        if index > self.passes.len() {
            return Err(PrismError::PassIndexOutOfBounds {
                index,
                len: self.passes.len(),
            });
        }
        self.passes.insert(index, Box::new(pass));
        self.resolve();
        Ok(())
    }

    /// Removes a pass, releases its buffer references and re-resolves.
    pub fn remove_pass(&mut self, index: usize) -> Result<Box<dyn Pass>> {
        if index >= self.passes.len() {
            return Err(PrismError::PassIndexOutOfBounds {
                index,
                len: self.passes.len(),
            });
        }
        let mut pass = self.passes.remove(index);
        let base = pass.base_mut();
        base.input.clear();
        base.output.clear();
        self.resolve();
        Ok(pass)
    }

    #[must_use]
    pub fn pass(&self, index: usize) -> Option<&dyn Pass> {
        self.passes.get(index).map(|p| &**p)
    }

    /// The pass at `index`, if it is a `P`.
    #[must_use]
    pub fn pass_as<P: Pass>(&self, index: usize) -> Option<&P> {
        self.passes.get(index)?.as_any().downcast_ref::<P>()
    }

    /// Mutates the pass at `index` if it is a `P`, re-resolving when the
    /// closure changed the pipeline topology.
    pub fn with_pass_mut<P: Pass, R>(
        &mut self,
        index: usize,
        f: impl FnOnce(&mut P) -> R,
    ) -> Option<R> {
        let pass = self.passes.get_mut(index)?.as_any_mut().downcast_mut::<P>()?;
        let result = f(pass);
        if self.topology_changed() {
            self.resolve();
        }
        Some(result)
    }

    pub fn passes(&self) -> impl Iterator<Item = &dyn Pass> {
        self.passes.iter().map(|p| &**p)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    // ---- Resolution ----

    fn topology_signature(&self) -> Vec<(PassId, bool, u64)> {
        self.passes
            .iter()
            .map(|p| {
                let base = p.base();
                (base.id(), base.is_enabled(), base.topology_version())
            })
            .collect()
    }

    fn topology_changed(&self) -> bool {
        self.needs_resolve || self.resolved_topology != self.topology_signature()
    }

    /// Recomputes every pass's inputs and outputs.
    pub fn resolve(&mut self) -> &ResolveReport {
        self.io.resolve(
            &mut self.passes,
            &mut self.buffers,
            self.device.as_mut(),
            &self.settings,
        );
        self.resolved_topology = self.topology_signature();
        self.needs_resolve = false;
        self.io.last_report()
    }

    #[must_use]
    pub fn report(&self) -> &ResolveReport {
        self.io.last_report()
    }

    #[must_use]
    pub fn resolution_count(&self) -> u64 {
        self.io.resolution_count()
    }

    // ---- Frame ----

    /// Prepares and renders every enabled pass in order.
    pub fn render(&mut self, delta: f32) {
        if self.topology_changed() {
            self.resolve();
        }
        self.elapsed += delta;

        let registry = Rc::clone(self.buffers.registry());
        let size = self.buffers.size();

        {
            let mut ctx = FrameContext {
                device: self.device.as_mut(),
                registry: &registry,
                settings: &self.settings,
                delta,
                elapsed: self.elapsed,
                size,
            };

            for pass in self.passes.iter_mut().filter(|p| p.base().is_enabled()) {
                if let Err(e) = pass.prepare(&mut ctx) {
                    log::warn!("Pass '{}' failed to prepare: {e}", pass.name());
                }
            }
        }

        // Failed passes disabled themselves and prepare may have changed
        // G-Buffer requirements.
        if self.topology_changed() {
            self.resolve();
        }

        let mut ctx = FrameContext {
            device: self.device.as_mut(),
            registry: &registry,
            settings: &self.settings,
            delta,
            elapsed: self.elapsed,
            size,
        };
        for pass in self.passes.iter_mut().filter(|p| p.base().is_enabled()) {
            pass.render(&mut ctx);
        }
    }

    /// Resizes every target.
    pub fn set_size(&mut self, width: u32, height: u32) {
        self.settings.size = (width, height);
        self.buffers.set_size(width, height);
    }

    /// Replaces the settings and re-resolves.
    pub fn set_settings(&mut self, settings: PipelineSettings) {
        let size = settings.size;
        self.settings = settings;
        self.buffers.set_size(size.0, size.1);
        self.resolve();
    }

    /// Releases every buffer. The next [`render`](Self::render) re-resolves.
    pub fn dispose(&mut self) {
        for pass in &mut self.passes {
            let base = pass.base_mut();
            base.input.clear();
            base.output.clear();
        }
        self.buffers.dispose();
        self.needs_resolve = true;
    }

    // ---- Accessors ----

    #[must_use]
    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    #[must_use]
    pub fn registry(&self) -> &SharedRegistry<RenderTarget> {
        self.buffers.registry()
    }

    #[must_use]
    pub fn buffers(&self) -> &BufferManager {
        &self.buffers
    }

    #[must_use]
    pub fn device(&self) -> &dyn RenderDevice {
        self.device.as_ref()
    }

    pub fn device_mut(&mut self) -> &mut dyn RenderDevice {
        self.device.as_mut()
    }

    /// Default output of the last enabled pass; `None` when it draws to the
    /// screen.
    #[must_use]
    pub fn output_texture(&self) -> Option<TextureRef> {
        self.passes
            .iter()
            .rev()
            .find(|p| p.base().is_enabled())
            .and_then(|p| p.base().output().default_texture())
    }
}
