//! Shader Template Environment
//!
//! Merged effect programs are produced by filling two embedded templates
//! (`effect_material.frag`, `effect_material.vert`) with the concatenated
//! [`ShaderParts`](super::shader_parts::ShaderParts). Blend-function bodies
//! live next to them under `blend/`.
//!
//! Template syntax uses `{$ ... $}` for blocks, `{{ ... }}` for variables and
//! `$$` for line statements, so GLSL braces never need escaping.

use std::borrow::Cow;
use std::sync::OnceLock;

use minijinja::syntax::SyntaxConfig;
use minijinja::{Environment, Error, ErrorKind};
use rust_embed::RustEmbed;
use serde::Serialize;

use crate::errors::Result;

static SHADER_ENV: OnceLock<Environment<'static>> = OnceLock::new();

#[derive(RustEmbed)]
#[folder = "src/effects/shaders"]
struct ShaderAssets;

/// Fragment template name.
pub const FRAGMENT_TEMPLATE: &str = "effect_material.frag";
/// Vertex template name.
pub const VERTEX_TEMPLATE: &str = "effect_material.vert";

fn get_env() -> &'static Environment<'static> {
    SHADER_ENV.get_or_init(|| {
        let mut env = Environment::new();

        match SyntaxConfig::builder()
            .block_delimiters("{$", "$}")
            .variable_delimiters("{{", "}}")
            .line_statement_prefix("$$")
            .build()
        {
            Ok(syntax) => env.set_syntax(syntax),
            Err(e) => log::error!("Failed to configure shader template syntax: {e}"),
        }

        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_undefined_behavior(minijinja::UndefinedBehavior::Strict);
        env.set_loader(shader_loader);

        env
    })
}

fn shader_loader(name: &str) -> std::result::Result<Option<String>, Error> {
    match chunk(name) {
        Some(source) => Ok(Some(source.into_owned())),
        None if name.contains("..") => Err(Error::new(
            ErrorKind::TemplateNotFound,
            format!("Invalid shader path: {name}"),
        )),
        None => Ok(None),
    }
}

/// Raw text of an embedded shader file, e.g. `"blend/add.frag"`.
#[must_use]
pub fn chunk(name: &str) -> Option<Cow<'static, str>> {
    let file = ShaderAssets::get(name)?;
    match file.data {
        Cow::Borrowed(bytes) => std::str::from_utf8(bytes).ok().map(Cow::Borrowed),
        Cow::Owned(bytes) => String::from_utf8(bytes).ok().map(Cow::Owned),
    }
}

/// Renders an embedded template with `ctx`.
pub fn render<S: Serialize>(template_name: &str, ctx: &S) -> Result<String> {
    let template = get_env().get_template(template_name)?;
    Ok(template.render(ctx)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blend_chunks_are_embedded() {
        let add = chunk("blend/add.frag").unwrap_or_default();
        assert!(add.contains("vec4 blend("));
        assert!(chunk("blend/missing.frag").is_none());
    }

    #[test]
    fn vertex_template_renders_splice_points() {
        #[derive(Serialize)]
        struct Ctx {
            vertex_head: &'static str,
            vertex_main_support: &'static str,
        }

        let source = render(
            VERTEX_TEMPLATE,
            &Ctx {
                vertex_head: "varying vec2 e0VUv2;",
                vertex_main_support: "e0MainSupport(vUv);",
            },
        )
        .unwrap_or_default();

        assert!(source.contains("varying vec2 e0VUv2;"));
        assert!(source.contains("e0MainSupport(vUv);"));
    }

    #[test]
    fn missing_variable_is_an_error() {
        #[derive(Serialize)]
        struct Empty {}

        assert!(render(VERTEX_TEMPLATE, &Empty {}).is_err());
    }
}
