//! Task bodies and the pipeline graph.

use std::collections::BTreeMap;
use std::fs;
use std::time::Duration;

use rayon::prelude::*;

use kiln_graph::{GraphError, TaskError, TaskGraph};
use kiln_server::{DispatchTable, FileWatcher, StaticServer};

use crate::bundle::{bundle_page, Bundle};
use crate::context::{ActiveWatch, TaskContext};
use crate::error::PipelineError;
use crate::files::{expand, remove_tree, write_file};
use crate::ids::TaskId;
use crate::{images, include, lint, prettify};

/// The pipeline's tasks and their prerequisites.
pub fn pipeline_graph() -> Result<TaskGraph<TaskId, TaskContext>, GraphError> {
    let mut builder = TaskGraph::builder();

    builder
        .register(TaskId::Clean, &[], task(clean))?
        .register(TaskId::FileInclude, &[TaskId::Clean], task(file_include))?
        .register(TaskId::HtmlHint, &[TaskId::FileInclude], task(html_hint))?
        .register(TaskId::Sass, &[TaskId::HtmlHint], task(sass))?
        .register(TaskId::Minify, &[], task(minify))?
        .register(TaskId::ImageMin, &[], task(image_min))?
        .register(TaskId::CopyFonts, &[], task(copy_fonts))?
        .register(TaskId::Prettify, &[TaskId::CopyFonts], task(prettify_pages))?
        .register(TaskId::ConnectDev, &[], task(connect_dev))?
        .register(TaskId::ConnectProd, &[], task(connect_prod))?
        .register(TaskId::Stream, &[], task(stream))?;

    builder.build()
}

type Body = fn(&TaskContext) -> Result<(), PipelineError>;

fn task(body: Body) -> impl Fn(&TaskContext) -> Result<(), TaskError> + Send + Sync {
    move |ctx: &TaskContext| body(ctx).map_err(TaskError::from)
}

fn clean(ctx: &TaskContext) -> Result<(), PipelineError> {
    let config = ctx.config();
    remove_tree(&config.tmp())?;
    remove_tree(&config.dist())
}

fn file_include(ctx: &TaskContext) -> Result<(), PipelineError> {
    let config = ctx.config();
    let pages = expand(&config.pages_dir(), "*.html")?;
    let dest = config.src();

    pages.par_iter().try_for_each(|page| {
        let html = include::render(&page.path)?;
        write_file(&page.dest_in(&dest), html)
    })?;

    tracing::info!("Assembled {} page(s)", pages.len());
    ctx.notify_reload();
    Ok(())
}

fn html_hint(ctx: &TaskContext) -> Result<(), PipelineError> {
    let files = expand(&ctx.config().src(), "*.html")?;
    if files.is_empty() {
        tracing::warn!("No pages to lint");
        return Ok(());
    }

    let mut violations = Vec::new();
    for file in &files {
        let html = fs::read_to_string(&file.path).map_err(|e| PipelineError::read(&file.path, e))?;
        violations.extend(lint::lint(&file.path, &html));
    }

    if violations.is_empty() {
        tracing::info!("Linted {} page(s)", files.len());
        return Ok(());
    }

    for violation in &violations {
        tracing::warn!("{}", violation);
    }
    Err(PipelineError::Lint { violations })
}

fn sass(ctx: &TaskContext) -> Result<(), PipelineError> {
    let config = ctx.config();
    let dest = config.tmp_styles_dir();
    let sheets: Vec<_> = expand(&config.styles_dir(), "**/*.scss")?
        .into_iter()
        .filter(|sheet| {
            !sheet
                .path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with('_'))
        })
        .collect();

    sheets.par_iter().try_for_each(|sheet| {
        let css = grass::from_path(&sheet.path, &grass::Options::default()).map_err(|e| {
            PipelineError::Compile {
                path: sheet.path.clone(),
                message: e.to_string(),
            }
        })?;
        tracing::debug!("Compiled {}", sheet.relative.display());
        write_file(&dest.join(sheet.relative.with_extension("css")), css)
    })?;

    tracing::info!("Compiled {} stylesheet(s)", sheets.len());
    ctx.notify_reload();
    Ok(())
}

fn minify(ctx: &TaskContext) -> Result<(), PipelineError> {
    let config = ctx.config();
    let dist = config.dist();
    let search = config.asset_search_paths();
    let pages = expand(&config.src(), "*.html")?;

    let mut bundles: BTreeMap<String, Bundle> = BTreeMap::new();
    let mut rewritten = Vec::with_capacity(pages.len());

    for page in &pages {
        let html = fs::read_to_string(&page.path).map_err(|e| PipelineError::read(&page.path, e))?;
        let bundled = bundle_page(&page.path, &html, &search)?;
        for bundle in bundled.bundles {
            bundles.entry(bundle.target.clone()).or_insert(bundle);
        }
        rewritten.push((page.dest_in(&dist), bundled.html));
    }

    bundles.par_iter().try_for_each(|(target, bundle)| {
        let contents = bundle.build()?;
        tracing::debug!("Bundled {} file(s) into {}", bundle.sources.len(), target);
        write_file(&dist.join(target), contents)
    })?;

    for (path, html) in &rewritten {
        write_file(path, html)?;
    }

    tracing::info!(
        "Bundled {} page(s) into {} asset(s)",
        rewritten.len(),
        bundles.len()
    );
    Ok(())
}

fn image_min(ctx: &TaskContext) -> Result<(), PipelineError> {
    let config = ctx.config();
    let dest = config.dist().join("images");
    let files = expand(&config.images_dir(), "**/*")?;

    files.par_iter().try_for_each(|file| {
        let data = fs::read(&file.path).map_err(|e| PipelineError::read(&file.path, e))?;
        let optimized = images::optimize(&file.path, &data, &config.images)?;
        tracing::debug!(
            "Optimized {} ({} -> {} bytes)",
            file.relative.display(),
            data.len(),
            optimized.len()
        );
        write_file(&file.dest_in(&dest), optimized)
    })?;

    tracing::info!("Optimized {} image(s)", files.len());
    Ok(())
}

fn copy_fonts(ctx: &TaskContext) -> Result<(), PipelineError> {
    let config = ctx.config();
    let dest = config.dist().join("fonts");
    let files = expand(&config.fonts_dir(), "**/*")?;

    for file in &files {
        let data = fs::read(&file.path).map_err(|e| PipelineError::read(&file.path, e))?;
        write_file(&file.dest_in(&dest), data)?;
    }

    tracing::info!("Copied {} font file(s)", files.len());
    Ok(())
}

fn prettify_pages(ctx: &TaskContext) -> Result<(), PipelineError> {
    let config = ctx.config();
    let pages = expand(&config.dist(), "*.html")?;

    pages.par_iter().try_for_each(|page| {
        let html = fs::read_to_string(&page.path).map_err(|e| PipelineError::read(&page.path, e))?;
        write_file(&page.path, prettify::prettify(&html, &config.prettify))
    })?;

    tracing::info!("Beautified {} page(s)", pages.len());
    Ok(())
}

fn connect_dev(ctx: &TaskContext) -> Result<(), PipelineError> {
    StaticServer::new(ctx.config().dev_server(), ctx.reload_hub().clone()).spawn()?;
    Ok(())
}

fn connect_prod(ctx: &TaskContext) -> Result<(), PipelineError> {
    StaticServer::new(ctx.config().prod_server(), ctx.reload_hub().clone()).spawn()?;
    Ok(())
}

/// Dispatch table for the dev session: markup re-runs includes, stylesheets
/// re-run the compiler.
pub fn watch_table(ctx: &TaskContext) -> Result<DispatchTable<TaskId>, PipelineError> {
    let config = ctx.config();
    Ok(DispatchTable::new()
        .on(&config.watch_pattern("views", "**/*.html"), TaskId::FileInclude)?
        .on(&config.watch_pattern("styles", "**/*.scss"), TaskId::Sass)?)
}

fn stream(ctx: &TaskContext) -> Result<(), PipelineError> {
    let config = ctx.config();
    let table = watch_table(ctx)?;
    let (watcher, events) = FileWatcher::new(
        &config.root,
        &[config.views_dir(), config.styles_dir()],
        Duration::from_millis(config.watch.debounce_ms),
    )?;

    for (pattern, task) in table.rules() {
        tracing::info!("Watching {} -> '{}'", pattern, task);
    }

    ctx.install_watch(ActiveWatch::new(watcher, events, table));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::ids::Entry;
    use crate::testing::{site, write};
    use kiln_graph::RunError;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    fn context(root: &Path) -> TaskContext {
        TaskContext::new(SiteConfig::with_root(root))
    }

    #[test]
    fn graph_wires_prerequisites() {
        let graph = pipeline_graph().unwrap();

        assert_eq!(graph.len(), TaskId::ALL.len());
        assert_eq!(graph.prerequisites(TaskId::Sass), Some(&[TaskId::HtmlHint][..]));
        assert_eq!(graph.prerequisites(TaskId::Prettify), Some(&[TaskId::CopyFonts][..]));
        assert_eq!(graph.prerequisites(TaskId::Minify), Some(&[][..]));
    }

    #[test]
    fn clean_twice_succeeds() {
        let temp = site();
        let ctx = context(temp.path());
        write(temp.path(), "dist/index.html", "old");
        write(temp.path(), ".tmp/styles/main.css", "old");
        let graph = pipeline_graph().unwrap();

        graph.execution().run_task(&ctx, TaskId::Clean).unwrap();
        graph.execution().run_task(&ctx, TaskId::Clean).unwrap();

        assert!(!temp.path().join("dist").exists());
        assert!(!temp.path().join(".tmp").exists());
    }

    #[test]
    fn build_produces_distribution() {
        let temp = site();
        let ctx = context(temp.path());
        let graph = pipeline_graph().unwrap();

        graph
            .execution()
            .run_sequence(&ctx, &Entry::Build.steps())
            .unwrap();

        let dist = temp.path().join("dist");
        let index = fs::read_to_string(dist.join("index.html")).unwrap();
        assert!(index.contains("<h1>Welcome</h1>"));
        assert!(index.contains("<link rel=\"stylesheet\" href=\"styles/main.css\">"));
        assert!(index.contains("<script src=\"scripts/app.js\"></script>"));
        assert!(index.starts_with("<!DOCTYPE html>\n<html lang=\"en\">\n  <head>"));

        let css = fs::read_to_string(dist.join("styles/main.css")).unwrap();
        assert!(css.contains("h1{color:#333}"));
        assert!(dist.join("scripts/app.js").is_file());
        assert!(dist.join("images/icon.svg").is_file());
        assert!(dist.join("fonts/site.woff2").is_file());
        assert!(!temp.path().join(".tmp/styles/_base.css").exists());
    }

    #[test]
    fn lint_violation_halts_build_before_minify() {
        let temp = site();
        write(
            temp.path(),
            "src/views/pages/broken.html",
            "<html><head><title>Broken</title></head><body></body></html>",
        );
        let ctx = context(temp.path());
        let graph = pipeline_graph().unwrap();
        let mut exec = graph.execution();

        let err = exec.run_sequence(&ctx, &Entry::Build.steps()).unwrap_err();

        assert_eq!(err.task(), TaskId::HtmlHint);
        match err {
            RunError::Failed { source, .. } => {
                let lint = source.downcast_ref::<PipelineError>().unwrap();
                assert!(matches!(lint, PipelineError::Lint { violations } if violations.len() == 1));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!exec.is_completed(TaskId::Minify));
        assert!(!temp.path().join("dist/index.html").exists());
        assert!(!temp.path().join("dist/broken.html").exists());
    }

    #[test]
    fn missing_input_root_fails() {
        let temp = site();
        fs::remove_dir_all(temp.path().join("src/fonts")).unwrap();
        let ctx = context(temp.path());
        let graph = pipeline_graph().unwrap();

        let err = graph
            .execution()
            .run_task(&ctx, TaskId::CopyFonts)
            .unwrap_err();

        assert_eq!(err.task(), TaskId::CopyFonts);
    }

    #[test]
    fn watch_table_routes_by_directory() {
        let temp = site();
        let ctx = context(temp.path());
        let table = watch_table(&ctx).unwrap();

        assert_eq!(
            table.coalesce([
                Path::new("src/styles/base/_base.scss"),
                Path::new("src/views/partials/head.html"),
                Path::new("src/index.html"),
            ]),
            vec![TaskId::Sass, TaskId::FileInclude]
        );
    }
}
