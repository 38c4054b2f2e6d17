//! Input/Output Resolver
//!
//! Recomputes which buffer every enabled pass reads from and writes to. Runs
//! eagerly whenever the pipeline topology changes, over the enabled passes in
//! order:
//!
//! 1. **G-Buffer sizing**: the primary (first enabled) geometry pass gets a
//!    target holding color plus every channel any other pass requires.
//! 2. **Wiring**: secondary geometry passes draw into the same target. Every
//!    other pass gets its required channels bound at their attachment index,
//!    its default input bound to the previous pass's default output, and an
//!    intermediate output of its own. The last pass draws to the screen when
//!    configured to.
//! 3. **Formats**: a default output is stored at the precision its reader
//!    declares (or the pipeline default); low precision implies sRGB.
//!
//! Re-running without a topology change rebinds the same keys: nothing is
//! allocated and nothing is disposed.
//!
//! A channel required without any geometry pass to produce it is skipped
//! with a warning and listed in [`ResolveReport::missing_components`].

use std::rc::Rc;

use rustc_hash::FxHashSet;

use super::buffer_manager::BufferManager;
use super::pass::{Pass, PassId, PassKind};
use crate::device::RenderDevice;
use crate::resources::{ColorSpace, GBufferComponents, GBufferLayout, TextureInfo, TextureRef};
use crate::settings::PipelineSettings;

/// Outcome of one resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveReport {
    /// Channels a pass requires that no geometry pass produces, by pass name.
    pub missing_components: Vec<(String, GBufferComponents)>,
    /// Targets allocated by this resolution.
    pub allocated: usize,
    /// Targets disposed by this resolution.
    pub released: usize,
    /// Layout of the primary G-Buffer, if there is a geometry pass.
    pub gbuffer_layout: Option<GBufferLayout>,
}

impl ResolveReport {
    /// Union of every missing channel.
    #[must_use]
    pub fn missing(&self) -> GBufferComponents {
        self.missing_components
            .iter()
            .fold(GBufferComponents::empty(), |acc, (_, c)| acc | *c)
    }
}

#[derive(Debug, Default)]
pub struct IoManager {
    last_report: ResolveReport,
    resolutions: u64,
}

impl IoManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn last_report(&self) -> &ResolveReport {
        &self.last_report
    }

    /// Number of resolutions run so far.
    #[must_use]
    pub fn resolution_count(&self) -> u64 {
        self.resolutions
    }

    pub fn resolve(
        &mut self,
        passes: &mut [Box<dyn Pass>],
        buffers: &mut BufferManager,
        device: &mut dyn RenderDevice,
        settings: &PipelineSettings,
    ) -> &ResolveReport {
        let registry = Rc::clone(buffers.registry());
        let allocated_before = buffers.allocated_count();
        let disposed_before = buffers.disposed_count();
        let mut report = ResolveReport::default();

        let live: FxHashSet<PassId> = passes.iter().map(|p| p.base().id()).collect();
        buffers.retain_intermediates(|id| live.contains(&id));

        for pass in passes.iter_mut().filter(|p| !p.base().is_enabled()) {
            let base = pass.base_mut();
            base.input.clear();
            base.output.clear();
            buffers.release_intermediate(base.id());
        }

        let enabled: Vec<usize> = (0..passes.len())
            .filter(|&i| passes[i].base().is_enabled())
            .collect();
        let primary = enabled
            .iter()
            .copied()
            .find(|&i| passes[i].kind() == PassKind::Geometry);

        // 1. G-Buffer sizing
        let required = enabled
            .iter()
            .filter(|&&i| Some(i) != primary)
            .fold(GBufferComponents::empty(), |acc, &i| {
                acc | passes[i].base().input().required_components()
            });

        let view: &[Box<dyn Pass>] = passes;
        let output_infos: Vec<TextureInfo> = (0..enabled.len())
            .map(|position| output_info(view, &enabled[position + 1..], settings))
            .collect();

        let (layout, gbuffer) = match primary {
            Some(index) => {
                let layout = GBufferLayout::new(required);
                let position = enabled.iter().position(|&i| i == index).unwrap_or_default();
                let key = buffers.ensure_gbuffer(device, &layout, output_infos[position]);
                report.gbuffer_layout = Some(layout.clone());
                (layout, key)
            }
            None => {
                buffers.release_gbuffer();
                (GBufferLayout::new(GBufferComponents::COLOR), None)
            }
        };
        let gbuffer_color = gbuffer.map(|key| TextureRef::new(key, 0));

        // 2. Wiring
        let last = enabled.last().copied();
        let mut previous: Option<TextureRef> = None;

        for (position, &index) in enabled.iter().enumerate() {
            let pass = &mut passes[index];
            pass.set_gbuffer_layout(&layout);
            let kind = pass.kind();
            let base = pass.base_mut();
            let id = base.id();

            if kind == PassKind::Geometry {
                base.input.clear();
                buffers.release_intermediate(id);
                match gbuffer_color {
                    Some(color) => {
                        base.output.default.bind(&registry, color);
                        base.output.gbuffer_layout = Some(layout.clone());
                    }
                    None => base.output.clear(),
                }
                previous = gbuffer_color;
                continue;
            }

            let wanted = base.input.required_components() - GBufferComponents::COLOR;
            let mut missing = GBufferComponents::empty();
            for component in wanted.iter() {
                match (gbuffer, layout.index_of(component)) {
                    (Some(key), Some(attachment)) => base
                        .input
                        .buffers
                        .entry(component)
                        .or_default()
                        .bind(&registry, TextureRef::new(key, attachment)),
                    _ => missing |= component,
                }
            }
            base.input.buffers.retain(|c, binding| {
                wanted.contains(*c) && !missing.contains(*c) && binding.is_bound()
            });

            if !missing.is_empty() {
                log::warn!(
                    "Pass '{}' reads G-Buffer channels {missing:?} but no geometry pass produces them",
                    base.name()
                );
                report
                    .missing_components
                    .push((base.name().to_string(), missing));
            }

            if base.input.uses_default() {
                match previous {
                    Some(texture) => base.input.default.bind(&registry, texture),
                    None => base.input.default.clear(),
                }
            }

            base.output.gbuffer_layout = None;
            if Some(index) == last && settings.render_to_screen {
                base.output.default.clear();
                buffers.release_intermediate(id);
                previous = None;
                continue;
            }

            let label = format!("{} output", base.name());
            match buffers.ensure_intermediate(device, id, &label, output_infos[position]) {
                Some(key) => {
                    let texture = TextureRef::new(key, 0);
                    base.output.default.bind(&registry, texture);
                    previous = Some(texture);
                }
                None => {
                    base.output.default.clear();
                    previous = None;
                }
            }
        }

        report.allocated = buffers.allocated_count() - allocated_before;
        report.released = buffers.disposed_count() - disposed_before;
        self.resolutions += 1;

        log::debug!(
            "Resolved {} enabled passes: {} allocated, {} released",
            enabled.len(),
            report.allocated,
            report.released
        );

        self.last_report = report;
        &self.last_report
    }
}

/// Format of a default output, chosen by the first non-geometry pass among
/// `readers` (the enabled passes that follow).
fn output_info(
    passes: &[Box<dyn Pass>],
    readers: &[usize],
    settings: &PipelineSettings,
) -> TextureInfo {
    let precision = readers
        .iter()
        .map(|&i| &passes[i])
        .find(|p| p.kind() != PassKind::Geometry)
        .filter(|p| p.base().input().uses_default())
        .and_then(|p| p.base().input().precision())
        .unwrap_or(settings.frame_buffer_precision);

    TextureInfo {
        precision,
        color_space: ColorSpace::for_precision(precision),
    }
}
