//! CSS and JavaScript minification.

/// Asset minifiers used by the bundler.
pub struct AssetPipeline;

impl AssetPipeline {
    /// Minify CSS using lightningcss. License comments are dropped too.
    pub fn minify_css(css: &str) -> Result<String, String> {
        use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};

        let mut stylesheet = StyleSheet::parse(css, ParserOptions::default())
            .map_err(|e| format!("CSS parse error: {}", e))?;
        stylesheet.license_comments.clear();

        let minified = stylesheet
            .to_css(PrinterOptions {
                minify: true,
                ..Default::default()
            })
            .map_err(|e| format!("CSS minify error: {}", e))?;

        Ok(minified.code)
    }

    /// Compress, mangle and print JavaScript using oxc.
    pub fn minify_js(js: &str) -> Result<String, String> {
        use oxc_allocator::Allocator;
        use oxc_codegen::{Codegen, CodegenOptions};
        use oxc_minifier::{Minifier, MinifierOptions};
        use oxc_parser::Parser;
        use oxc_span::SourceType;

        let allocator = Allocator::default();
        let parsed = Parser::new(&allocator, js, SourceType::cjs()).parse();

        if parsed.panicked || !parsed.errors.is_empty() {
            let messages: Vec<String> = parsed.errors.iter().map(|e| e.to_string()).collect();
            return Err(format!("JS parse error: {}", messages.join("; ")));
        }

        let mut program = parsed.program;
        let minified = Minifier::new(MinifierOptions::default()).build(&allocator, &mut program);

        let code = Codegen::new()
            .with_options(CodegenOptions::minify())
            .with_scoping(minified.scoping)
            .build(&program)
            .code;

        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minifies_css() {
        let css = r#"
/*! license banner */
.button {
    background-color: blue;
    padding: 10px;
}
        "#;

        let minified = AssetPipeline::minify_css(css).unwrap();

        assert!(!minified.contains('\n'));
        assert!(!minified.contains("license banner"));
        assert!(minified.contains(".button"));
    }

    #[test]
    fn minifies_js() {
        let js = r#"
// greeting
function greet(name) {
    var message = "Hello, " + name;
    console.log(message);
}
greet("world");
"#;

        let minified = AssetPipeline::minify_js(js).unwrap();

        assert!(!minified.contains("// greeting"));
        assert!(minified.contains("console.log"));
        assert!(minified.len() < js.len());
    }

    #[test]
    fn reports_js_syntax_errors() {
        let err = AssetPipeline::minify_js("function (").unwrap_err();
        assert!(err.starts_with("JS parse error"));
    }
}
