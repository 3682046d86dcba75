/// Comment line separating the vertex section from the fragment section in
/// generated shader text.
pub const FRAGMENT_MARKER: &str = "// Fragment Shader";

/// Returns the fragment portion of generated shader text.
///
/// The section between the first [`FRAGMENT_MARKER`] and the next one (or the
/// end of the text) is used, trimmed. Text without the marker, or with the
/// marker as its very last characters, is treated as a fragment shader in its
/// entirety.
pub fn extract_fragment_source(shader_code: &str) -> String {
    let section = shader_code
        .split(FRAGMENT_MARKER)
        .nth(1)
        .filter(|section| !section.is_empty())
        .unwrap_or(shader_code);
    section.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_text_after_marker() {
        let code = "// Vertex Shader\nattribute vec2 position;\nvoid main() {}\n\n// Fragment Shader\nprecision mediump float;\nvoid main() { gl_FragColor = vec4(1.0); }\n";
        assert_eq!(
            extract_fragment_source(code),
            "precision mediump float;\nvoid main() { gl_FragColor = vec4(1.0); }"
        );
    }

    #[test]
    fn missing_marker_uses_whole_text() {
        let code = "\n  precision mediump float;\nvoid main() { gl_FragColor = vec4(0.5); }\n";
        assert_eq!(
            extract_fragment_source(code),
            "precision mediump float;\nvoid main() { gl_FragColor = vec4(0.5); }"
        );
    }

    #[test]
    fn whitespace_after_marker_yields_empty_fragment() {
        let code = "V\n// Fragment Shader\n   ";
        assert_eq!(extract_fragment_source(code), "");
    }

    #[test]
    fn marker_at_end_falls_back_to_whole_text() {
        let code = "void main() {}\n// Fragment Shader";
        assert_eq!(extract_fragment_source(code), code);
    }

    #[test]
    fn section_stops_at_second_marker() {
        let code = "// Fragment Shader\nA\n// Fragment Shader\nB";
        assert_eq!(extract_fragment_source(code), "A");
    }
}
