//! Shared test fixtures: a recording render device and a few effects.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use prism::device::{DeviceLimits, DrawTarget, FullscreenDraw, GeometryDraw, RenderDevice};
use prism::effects::{Effect, EffectAttributes, EffectMaterial};
use prism::resources::{GBufferComponents, RenderTargetDesc, TargetHandle, TextureRef};

/// Everything the mock device saw.
#[derive(Debug, Default)]
pub struct DeviceLog {
    pub created: Vec<RenderTargetDesc>,
    pub disposed: Vec<String>,
    pub resized: Vec<(String, u32, u32)>,
    pub compiled: Vec<u128>,
    pub fullscreen: Vec<FullscreenRecord>,
    pub geometry: Vec<GeometryRecord>,
}

#[derive(Debug, Clone)]
pub struct FullscreenRecord {
    pub label: String,
    pub source_hash: u128,
    pub input: Option<TextureRef>,
    pub buffers: Vec<(GBufferComponents, TextureRef)>,
    pub target: DrawTarget,
}

#[derive(Debug, Clone)]
pub struct GeometryRecord {
    pub label: String,
    pub attachments: usize,
    pub clear: bool,
    pub target: DrawTarget,
}

pub type SharedLog = Rc<RefCell<DeviceLog>>;

pub struct MockDevice {
    pub log: SharedLog,
    pub limits: DeviceLimits,
}

impl MockDevice {
    pub fn new() -> (Self, SharedLog) {
        let log = SharedLog::default();
        let device = Self {
            log: Rc::clone(&log),
            limits: DeviceLimits::default(),
        };
        (device, log)
    }
}

struct MockTarget {
    label: String,
    log: SharedLog,
}

impl TargetHandle for MockTarget {
    fn resize(&mut self, width: u32, height: u32) {
        self.log
            .borrow_mut()
            .resized
            .push((self.label.clone(), width, height));
    }

    fn dispose(&mut self) {
        self.log.borrow_mut().disposed.push(self.label.clone());
    }
}

impl RenderDevice for MockDevice {
    fn limits(&self) -> DeviceLimits {
        self.limits
    }

    fn create_target(&mut self, desc: &RenderTargetDesc) -> Box<dyn TargetHandle> {
        self.log.borrow_mut().created.push(desc.clone());
        Box::new(MockTarget {
            label: desc.label.clone(),
            log: Rc::clone(&self.log),
        })
    }

    fn compile(&mut self, material: &EffectMaterial) {
        self.log.borrow_mut().compiled.push(material.source_hash());
    }

    fn draw_fullscreen(&mut self, draw: &FullscreenDraw<'_>) {
        self.log.borrow_mut().fullscreen.push(FullscreenRecord {
            label: draw.label.to_string(),
            source_hash: draw.material.source_hash(),
            input: draw.input,
            buffers: draw.buffers.to_vec(),
            target: draw.target,
        });
    }

    fn draw_geometry(&mut self, draw: &GeometryDraw<'_>) {
        self.log.borrow_mut().geometry.push(GeometryRecord {
            label: draw.label.to_string(),
            attachments: draw.attachments,
            clear: draw.clear,
            target: draw.target,
        });
    }
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub const PASS_THROUGH_IMAGE: &str = "void mainImage(const in vec4 inputColor, const in vec2 uv, out vec4 outputColor) {\n\
    \toutputColor = inputColor;\n\
    }\n";

/// A simple color effect declaring a helper named `adjust`.
pub fn color_effect(name: &str) -> Effect {
    Effect::new(name)
        .with_fragment_shader(
            "uniform float strength;\n\
             vec3 adjust(const in vec3 c) {\n\
             \treturn c * strength;\n\
             }\n\
             void mainImage(const in vec4 inputColor, const in vec2 uv, out vec4 outputColor) {\n\
             \toutputColor = vec4(adjust(inputColor.rgb), inputColor.a);\n\
             }\n",
        )
        .with_uniform("strength", 1.0_f32)
}

/// An effect that samples depth through `mainImage`.
pub fn depth_effect(name: &str) -> Effect {
    Effect::new(name)
        .with_fragment_shader(
            "void mainImage(const in vec4 inputColor, const in vec2 uv, const in float depth, out vec4 outputColor) {\n\
             \toutputColor = vec4(inputColor.rgb * depth, inputColor.a);\n\
             }\n",
        )
        .with_attributes(EffectAttributes::DEPTH)
}

/// A multi-sample effect.
pub fn convolution_effect(name: &str) -> Effect {
    Effect::new(name)
        .with_fragment_shader(PASS_THROUGH_IMAGE)
        .with_attributes(EffectAttributes::CONVOLUTION)
}

/// An effect that only transforms UVs.
pub fn uv_effect(name: &str) -> Effect {
    Effect::new(name).with_fragment_shader("void mainUv(inout vec2 uv) {\n\tuv = uv * 0.5 + 0.25;\n}\n")
}

/// An effect reading the normal channel of the G-Buffer.
pub fn normal_effect(name: &str) -> Effect {
    Effect::new(name)
        .with_fragment_shader(PASS_THROUGH_IMAGE)
        .with_gbuffer_reads(GBufferComponents::NORMAL)
}
