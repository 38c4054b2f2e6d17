//! Buffer Manager
//!
//! Allocates and owns the render targets of a pipeline: the primary G-Buffer
//! and one intermediate color target per pass that needs one.
//!
//! The manager keeps one [`Resource`] reference per target; pass bindings
//! hold the others. A target superseded by a new allocation is therefore
//! disposed exactly when the last pass stops pointing at it.
//!
//! ```text
//!            ┌───────────── G-Buffer (color, normal, depth, ...) ─────────┐
//! Geometry ──┤                                                            │
//!            └── color ──► Effect A ──► intermediate A ──► Effect B ──► screen
//!                              ▲                               ▲
//!                              └── normal (index 1) ───────────┘
//! ```

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use super::pass::PassId;
use crate::device::RenderDevice;
use crate::resources::{
    GBufferLayout, RenderTarget, RenderTargetDesc, Resource, ResourceKey, ResourceRegistry,
    SharedRegistry, TextureInfo,
};

struct Allocation {
    resource: Resource<RenderTarget>,
    attachments: SmallVec<[TextureInfo; 4]>,
}

pub struct BufferManager {
    registry: SharedRegistry<RenderTarget>,
    size: (u32, u32),
    gbuffer: Option<(Allocation, GBufferLayout)>,
    intermediates: FxHashMap<PassId, Allocation>,
    allocated: usize,
}

impl BufferManager {
    #[must_use]
    pub fn new(size: (u32, u32)) -> Self {
        Self {
            registry: ResourceRegistry::shared(),
            size,
            gbuffer: None,
            intermediates: FxHashMap::default(),
            allocated: 0,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &SharedRegistry<RenderTarget> {
        &self.registry
    }

    #[inline]
    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Total number of targets allocated so far.
    #[inline]
    #[must_use]
    pub fn allocated_count(&self) -> usize {
        self.allocated
    }

    /// Number of targets disposed so far.
    #[must_use]
    pub fn disposed_count(&self) -> usize {
        self.registry.borrow().disposed_count()
    }

    /// Number of targets currently alive.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.registry.borrow().len()
    }

    fn allocate(
        &mut self,
        device: &mut dyn RenderDevice,
        label: &str,
        attachments: SmallVec<[TextureInfo; 4]>,
    ) -> Allocation {
        let desc = RenderTargetDesc {
            label: label.to_string(),
            width: self.size.0,
            height: self.size.1,
            attachments: attachments.clone(),
        };
        let handle = device.create_target(&desc);
        let key = self
            .registry
            .borrow_mut()
            .insert(RenderTarget::new(desc, handle));
        self.allocated += 1;
        log::debug!(
            "Allocated render target '{label}' ({} attachments, {}x{})",
            attachments.len(),
            self.size.0,
            self.size.1
        );

        Allocation {
            resource: Resource::with_value(&self.registry, key),
            attachments,
        }
    }

    /// Returns the primary G-Buffer target, (re)allocating it when the layout
    /// or the color attachment format differs from the current one.
    pub fn ensure_gbuffer(
        &mut self,
        device: &mut dyn RenderDevice,
        layout: &GBufferLayout,
        color: TextureInfo,
    ) -> Option<ResourceKey> {
        let mut attachments: SmallVec<[TextureInfo; 4]> =
            layout.iter().map(|_| TextureInfo::default()).collect();
        if let Some(first) = attachments.first_mut() {
            *first = color;
        }

        if let Some((allocation, current)) = &self.gbuffer
            && current == layout
            && allocation.attachments == attachments
        {
            return allocation.resource.value();
        }

        let allocation = self.allocate(device, "G-Buffer", attachments);
        let key = allocation.resource.value();
        // The previous target lives on until passes rebind away from it.
        self.gbuffer = Some((allocation, layout.clone()));
        key
    }

    #[must_use]
    pub fn gbuffer(&self) -> Option<ResourceKey> {
        self.gbuffer.as_ref().and_then(|(a, _)| a.resource.value())
    }

    #[must_use]
    pub fn gbuffer_layout(&self) -> Option<&GBufferLayout> {
        self.gbuffer.as_ref().map(|(_, layout)| layout)
    }

    pub fn release_gbuffer(&mut self) {
        self.gbuffer = None;
    }

    /// Returns the intermediate output target of `pass`, reallocating it when
    /// its format changed.
    pub fn ensure_intermediate(
        &mut self,
        device: &mut dyn RenderDevice,
        pass: PassId,
        label: &str,
        info: TextureInfo,
    ) -> Option<ResourceKey> {
        if let Some(allocation) = self.intermediates.get(&pass)
            && allocation.attachments.as_slice() == [info]
        {
            return allocation.resource.value();
        }

        let allocation = self.allocate(device, label, SmallVec::from_slice(&[info]));
        let key = allocation.resource.value();
        self.intermediates.insert(pass, allocation);
        key
    }

    #[must_use]
    pub fn intermediate(&self, pass: PassId) -> Option<ResourceKey> {
        self.intermediates
            .get(&pass)
            .and_then(|a| a.resource.value())
    }

    pub fn release_intermediate(&mut self, pass: PassId) {
        self.intermediates.remove(&pass);
    }

    /// Drops the intermediates of passes for which `keep` returns `false`.
    pub fn retain_intermediates(&mut self, mut keep: impl FnMut(PassId) -> bool) {
        self.intermediates.retain(|&id, _| keep(id));
    }

    /// Resizes every live target.
    pub fn set_size(&mut self, width: u32, height: u32) {
        if self.size == (width, height) {
            return;
        }
        self.size = (width, height);
        for target in self.registry.borrow_mut().values_mut() {
            target.set_size(width, height);
        }
    }

    /// Releases the manager's references and disposes everything no pass
    /// still points at.
    pub fn dispose(&mut self) {
        self.gbuffer = None;
        self.intermediates.clear();
        self.registry.borrow_mut().purge_unreferenced();
    }
}
