//! Shader Parts
//!
//! The five splice points of the effect material templates. Each effect
//! appends to them in priority order; the material manager then finalizes the
//! text and renders it into the templates.

/// Named section of a merged effect program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    FragmentHead,
    FragmentMainUv,
    FragmentMainImage,
    VertexHead,
    VertexMainSupport,
}

impl Section {
    pub const ALL: [Section; 5] = [
        Section::FragmentHead,
        Section::FragmentMainUv,
        Section::FragmentMainImage,
        Section::VertexHead,
        Section::VertexMainSupport,
    ];
}

/// Accumulated text of every [`Section`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderParts {
    fragment_head: String,
    fragment_main_uv: String,
    fragment_main_image: String,
    vertex_head: String,
    vertex_main_support: String,
}

impl ShaderParts {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, section: Section) -> &str {
        match section {
            Section::FragmentHead => &self.fragment_head,
            Section::FragmentMainUv => &self.fragment_main_uv,
            Section::FragmentMainImage => &self.fragment_main_image,
            Section::VertexHead => &self.vertex_head,
            Section::VertexMainSupport => &self.vertex_main_support,
        }
    }

    fn get_mut(&mut self, section: Section) -> &mut String {
        match section {
            Section::FragmentHead => &mut self.fragment_head,
            Section::FragmentMainUv => &mut self.fragment_main_uv,
            Section::FragmentMainImage => &mut self.fragment_main_image,
            Section::VertexHead => &mut self.vertex_head,
            Section::VertexMainSupport => &mut self.vertex_main_support,
        }
    }

    pub fn append(&mut self, section: Section, text: &str) {
        self.get_mut(section).push_str(text);
    }

    pub fn prepend(&mut self, section: Section, text: &str) {
        self.get_mut(section).insert_str(0, text);
    }

    /// Trims every section and moves a leading preprocessor directive onto
    /// its own line, since sections are spliced mid-line in the templates.
    pub fn finalize(&mut self) {
        for section in Section::ALL {
            let text = self.get_mut(section);
            let trimmed = text.trim();
            *text = if trimmed.starts_with('#') {
                format!("\n{trimmed}")
            } else {
                trimmed.to_string()
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finalize_trims_and_breaks_leading_directive() {
        let mut parts = ShaderParts::new();
        parts.append(Section::FragmentHead, "\n  #ifdef A\nfloat a;\n#endif\n\n");
        parts.append(Section::FragmentMainImage, "\tcall();\n\t");
        parts.finalize();

        assert_eq!(parts.get(Section::FragmentHead), "\n#ifdef A\nfloat a;\n#endif");
        assert_eq!(parts.get(Section::FragmentMainImage), "call();");
        assert_eq!(parts.get(Section::VertexHead), "");
    }

    #[test]
    fn prepend_goes_before_existing_text() {
        let mut parts = ShaderParts::new();
        parts.append(Section::FragmentMainUv, "e0MainUv(UV);");
        parts.prepend(Section::FragmentMainUv, "vec2 transformedUv = vUv;\n");
        assert_eq!(
            parts.get(Section::FragmentMainUv),
            "vec2 transformedUv = vUv;\ne0MainUv(UV);"
        );
    }
}
