//! Build-block asset bundler.
//!
//! Pages mark groups of assets with build comments:
//!
//! ```html
//! <!-- build:js scripts/app.js -->
//! <script src="scripts/a.js"></script>
//! <script src="scripts/b.js"></script>
//! <!-- endbuild -->
//! ```
//!
//! Each block is replaced by a single reference to its target, and the
//! referenced files are concatenated into that target. `build:remove`
//! blocks are dropped.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::assets::AssetPipeline;
use crate::error::PipelineError;
use crate::markup::{tokenize, Token};

static BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<!--\s*build:(\w+)(?:\s+(\S+))?\s*-->(.*?)<!--\s*endbuild\s*-->")
        .expect("Invalid build block regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Js,
    Css,
    Remove,
}

impl BlockKind {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "js" => Some(BlockKind::Js),
            "css" => Some(BlockKind::Css),
            "remove" => Some(BlockKind::Remove),
            _ => None,
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BlockKind::Js => "js",
            BlockKind::Css => "css",
            BlockKind::Remove => "remove",
        };
        f.write_str(s)
    }
}

/// A concatenation target collected from a build block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    /// Output path as written in the block, relative to the output root
    pub target: String,
    pub kind: BlockKind,
    /// Resolved input files, in document order
    pub sources: Vec<PathBuf>,
}

impl Bundle {
    /// Concatenate the sources.
    pub fn concat(&self) -> Result<String, PipelineError> {
        let mut out = String::new();
        for source in &self.sources {
            let contents = fs::read_to_string(source).map_err(|e| PipelineError::read(source, e))?;
            out.push_str(&contents);
            if !out.ends_with('\n') {
                out.push('\n');
            }
        }
        Ok(out)
    }

    /// Concatenate and minify the sources.
    pub fn build(&self) -> Result<String, PipelineError> {
        let joined = self.concat()?;
        let minified = match self.kind {
            BlockKind::Js => AssetPipeline::minify_js(&joined),
            BlockKind::Css => AssetPipeline::minify_css(&joined),
            BlockKind::Remove => Ok(String::new()),
        };
        minified.map_err(|message| PipelineError::Minify {
            path: PathBuf::from(&self.target),
            message,
        })
    }
}

/// A page with its build blocks replaced.
#[derive(Debug)]
pub struct BundledPage {
    pub html: String,
    pub bundles: Vec<Bundle>,
}

/// Replace every build block in `html` and collect the bundles.
///
/// References are looked up under each of `search_paths` in order. A
/// reference that cannot be found is an error.
pub fn bundle_page(
    page: &Path,
    html: &str,
    search_paths: &[PathBuf],
) -> Result<BundledPage, PipelineError> {
    let mut out = String::with_capacity(html.len());
    let mut bundles = Vec::new();
    let mut last = 0;

    for caps in BLOCK_RE.captures_iter(html) {
        let (Some(whole), Some(kind)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        out.push_str(&html[last..whole.start()]);
        last = whole.end();

        let kind = BlockKind::parse(kind.as_str()).ok_or_else(|| {
            bundle_error(page, format!("unknown build block type '{}'", kind.as_str()))
        })?;

        if kind == BlockKind::Remove {
            continue;
        }

        let target = caps
            .get(2)
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| bundle_error(page, format!("build:{kind} block has no target")))?;
        let body = caps.get(3).map_or("", |m| m.as_str());

        let sources = references(body, kind)
            .into_iter()
            .map(|reference| {
                resolve(&reference, search_paths).ok_or_else(|| {
                    bundle_error(page, format!("referenced file '{reference}' not found"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        out.push_str(&replacement(kind, &target));
        bundles.push(Bundle {
            target,
            kind,
            sources,
        });
    }
    out.push_str(&html[last..]);

    Ok(BundledPage { html: out, bundles })
}

fn references(body: &str, kind: BlockKind) -> Vec<String> {
    tokenize(body)
        .into_iter()
        .filter_map(|token| match token {
            Token::Start(tag) => {
                let attr = match (kind, tag.lower_name().as_str()) {
                    (BlockKind::Js, "script") => "src",
                    (BlockKind::Css, "link") => "href",
                    _ => return None,
                };
                tag.attr(attr).and_then(|a| a.value).map(str::to_string)
            }
            _ => None,
        })
        .filter(|r| !r.is_empty())
        .collect()
}

fn resolve(reference: &str, search_paths: &[PathBuf]) -> Option<PathBuf> {
    let clean = reference
        .split(['?', '#'])
        .next()
        .unwrap_or(reference)
        .trim_start_matches('/');

    search_paths
        .iter()
        .map(|root| root.join(clean))
        .find(|candidate| candidate.is_file())
}

fn replacement(kind: BlockKind, target: &str) -> String {
    match kind {
        BlockKind::Js => format!("<script src=\"{target}\"></script>"),
        BlockKind::Css => format!("<link rel=\"stylesheet\" href=\"{target}\">"),
        BlockKind::Remove => String::new(),
    }
}

fn bundle_error(page: &Path, message: String) -> PipelineError {
    PipelineError::Bundle {
        path: page.to_path_buf(),
        message,
    }
}
