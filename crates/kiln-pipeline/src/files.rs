//! Input glob resolution.

use std::fs;
use std::path::{Path, PathBuf};

use globset::GlobBuilder;
use walkdir::WalkDir;

use crate::error::PipelineError;

/// A file matched by a source glob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path on disk
    pub path: PathBuf,

    /// Path relative to the glob's root
    pub relative: PathBuf,
}

impl SourceFile {
    /// Destination for this file under `dest`, keeping its relative layout.
    pub fn dest_in(&self, dest: &Path) -> PathBuf {
        dest.join(&self.relative)
    }
}

/// Files under `root` matching `pattern`, sorted by relative path.
///
/// `*` does not cross directory separators; `**` does. A missing root is an
/// error.
pub fn expand(root: &Path, pattern: &str) -> Result<Vec<SourceFile>, PipelineError> {
    if !root.is_dir() {
        return Err(PipelineError::MissingRoot(root.to_path_buf()));
    }

    let matcher = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|e| PipelineError::InvalidGlob {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?
        .compile_matcher();

    let mut walker = WalkDir::new(root).follow_links(true);
    if !pattern.contains('/') {
        walker = walker.max_depth(1);
    }

    let mut files: Vec<SourceFile> = walker
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let relative = e.path().strip_prefix(root).ok()?.to_path_buf();
            matcher.is_match(&relative).then(|| SourceFile {
                path: e.path().to_path_buf(),
                relative,
            })
        })
        .collect();

    files.sort_by(|a, b| a.relative.cmp(&b.relative));

    Ok(files)
}

/// Write `contents` to `path`, creating parent directories.
pub fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| PipelineError::write(parent, e))?;
    }
    fs::write(path, contents).map_err(|e| PipelineError::write(path, e))
}

/// Delete `path` recursively. Succeeds if it does not exist.
pub fn remove_tree(path: &Path) -> Result<(), PipelineError> {
    let result = if path.is_file() {
        fs::remove_file(path)
    } else {
        fs::remove_dir_all(path)
    };

    match result {
        Ok(()) => {
            tracing::debug!("Removed {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(PipelineError::Remove {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn single_star_stays_in_root() {
        let temp = tempdir().unwrap();
        touch(&temp.path().join("index.html"));
        touch(&temp.path().join("about.html"));
        touch(&temp.path().join("views/pages/index.html"));

        let files = expand(temp.path(), "*.html").unwrap();
        let names: Vec<_> = files.iter().map(|f| f.relative.clone()).collect();

        assert_eq!(names, vec![PathBuf::from("about.html"), PathBuf::from("index.html")]);
    }

    #[test]
    fn double_star_recurses() {
        let temp = tempdir().unwrap();
        touch(&temp.path().join("main.scss"));
        touch(&temp.path().join("base/_reset.scss"));
        touch(&temp.path().join("base/notes.txt"));

        let files = expand(temp.path(), "**/*.scss").unwrap();

        assert_eq!(files.len(), 2);
        assert_eq!(files[0].relative, PathBuf::from("base/_reset.scss"));
        assert_eq!(
            files[1].dest_in(Path::new("out")),
            PathBuf::from("out/main.scss")
        );
    }

    #[test]
    fn missing_root_is_an_error() {
        let temp = tempdir().unwrap();
        let err = expand(&temp.path().join("nope"), "*").unwrap_err();
        assert!(matches!(err, PipelineError::MissingRoot(_)));
    }

    #[test]
    fn remove_tree_is_idempotent() {
        let temp = tempdir().unwrap();
        let dist = temp.path().join("dist");
        touch(&dist.join("index.html"));

        remove_tree(&dist).unwrap();
        remove_tree(&dist).unwrap();

        assert!(!dist.exists());
    }
}
