//! Image optimization.
//!
//! PNGs are recompressed losslessly with oxipng, SVGs lose comments and
//! whitespace between tags, everything else is passed through unchanged.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::ImageOptions;
use crate::error::PipelineError;

static SVG_COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("Invalid SVG comment regex"));

/// Whitespace between tags that spans a line break. Same-line gaps may be
/// text content, as in `<tspan>a</tspan> <tspan>b</tspan>`.
static SVG_GAP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r">\s*\n\s*<").expect("Invalid SVG whitespace regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Svg,
    Other,
}

impl ImageKind {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match ext.as_deref() {
            Some("png") => ImageKind::Png,
            Some("svg") => ImageKind::Svg,
            _ => ImageKind::Other,
        }
    }
}

/// Optimize the image at `path` whose contents are `data`.
pub fn optimize(
    path: &Path,
    data: &[u8],
    options: &ImageOptions,
) -> Result<Vec<u8>, PipelineError> {
    match ImageKind::from_path(path) {
        ImageKind::Png => optimize_png(data, options).map_err(|message| PipelineError::Image {
            path: path.to_path_buf(),
            message,
        }),
        ImageKind::Svg => {
            let text = String::from_utf8_lossy(data);
            Ok(minify_svg(&text).into_bytes())
        }
        ImageKind::Other => Ok(data.to_vec()),
    }
}

fn optimize_png(data: &[u8], options: &ImageOptions) -> Result<Vec<u8>, String> {
    let mut opts = oxipng::Options::from_preset(options.level.min(6));
    if options.interlaced {
        opts.interlace = Some(oxipng::Interlacing::Adam7);
    }

    oxipng::optimize_from_memory(data, &opts).map_err(|e| e.to_string())
}

/// Strip comments and inter-tag whitespace from an SVG document.
pub fn minify_svg(svg: &str) -> String {
    let without_comments = SVG_COMMENT_RE.replace_all(svg, "");
    SVG_GAP_RE
        .replace_all(&without_comments, "><")
        .trim()
        .to_string()
}
