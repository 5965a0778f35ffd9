//! Site configuration (kiln.toml).

use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Deserializer};

use kiln_server::ServerConfig;

/// Errors loading the configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {message}")]
    Read { path: String, message: String },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Development and production servers cannot share port {0}")]
    PortConflict(u16),
}

/// Immutable configuration shared by every task.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Project directory every relative path is resolved against
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default = "default_dev_server", deserialize_with = "dev_section")]
    pub dev: ServerSettings,

    #[serde(default = "default_prod_server", deserialize_with = "prod_section")]
    pub prod: ServerSettings,

    #[serde(default)]
    pub images: ImageOptions,

    #[serde(default)]
    pub prettify: PrettifyOptions,

    #[serde(default)]
    pub watch: WatchSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_src")]
    pub src: PathBuf,
    #[serde(default = "default_dist")]
    pub dist: PathBuf,
    #[serde(default = "default_tmp")]
    pub tmp: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub livereload: bool,
}

/// A `[dev]` or `[prod]` table as written; the port default depends on which.
#[derive(Deserialize)]
struct ServerSection {
    #[serde(default = "default_host")]
    host: String,
    port: Option<u16>,
    #[serde(default = "default_true")]
    livereload: bool,
}

impl ServerSection {
    fn with_default_port(self, port: u16) -> ServerSettings {
        ServerSettings {
            host: self.host,
            port: self.port.unwrap_or(port),
            livereload: self.livereload,
        }
    }
}

fn dev_section<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ServerSettings, D::Error> {
    ServerSection::deserialize(deserializer).map(|s| s.with_default_port(DEV_PORT))
}

fn prod_section<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ServerSettings, D::Error> {
    ServerSection::deserialize(deserializer).map(|s| s.with_default_port(PROD_PORT))
}

/// Image optimizer settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageOptions {
    /// Optimization level (0-6)
    #[serde(default = "default_image_level")]
    pub level: u8,
    /// Progressive JPEG output
    #[serde(default = "default_true")]
    pub progressive: bool,
    /// Interlaced PNG/GIF output
    #[serde(default = "default_true")]
    pub interlaced: bool,
}

/// Markup beautifier settings.
#[derive(Debug, Clone, Deserialize)]
pub struct PrettifyOptions {
    #[serde(default = "default_indent_size")]
    pub indent_size: usize,
    #[serde(default = "default_indent_char")]
    pub indent_char: char,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WatchSettings {
    /// Quiet period before a burst of changes is dispatched
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

const DEV_PORT: u16 = 9000;
const PROD_PORT: u16 = 9090;

fn default_src() -> PathBuf {
    PathBuf::from("src")
}
fn default_dist() -> PathBuf {
    PathBuf::from("dist")
}
fn default_tmp() -> PathBuf {
    PathBuf::from(".tmp")
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_true() -> bool {
    true
}
fn default_dev_server() -> ServerSettings {
    ServerSettings {
        host: default_host(),
        port: DEV_PORT,
        livereload: true,
    }
}
fn default_prod_server() -> ServerSettings {
    ServerSettings {
        host: default_host(),
        port: PROD_PORT,
        livereload: true,
    }
}
fn default_image_level() -> u8 {
    5
}
fn default_indent_size() -> usize {
    2
}
fn default_indent_char() -> char {
    ' '
}
fn default_debounce_ms() -> u64 {
    100
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            src: default_src(),
            dist: default_dist(),
            tmp: default_tmp(),
        }
    }
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            level: default_image_level(),
            progressive: true,
            interlaced: true,
        }
    }
}

impl Default for PrettifyOptions {
    fn default() -> Self {
        Self {
            indent_size: default_indent_size(),
            indent_char: default_indent_char(),
        }
    }
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            paths: PathsConfig::default(),
            dev: default_dev_server(),
            prod: default_prod_server(),
            images: ImageOptions::default(),
            prettify: PrettifyOptions::default(),
            watch: WatchSettings::default(),
        }
    }
}

impl SiteConfig {
    /// Defaults rooted at `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    /// Load configuration from `path` if it exists.
    ///
    /// Relative paths are resolved against the file's directory. A missing
    /// file yields the defaults; a malformed one is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let root = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        if !path.exists() {
            return Ok(Self::with_root(root));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let mut config: SiteConfig = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.root = root;

        config.validate()?;
        tracing::info!("Loaded config from {}", path.display());

        Ok(config)
    }

    /// Check invariants that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dev.port == self.prod.port && self.dev.port != 0 {
            return Err(ConfigError::PortConflict(self.dev.port));
        }
        Ok(())
    }

    /// Source root.
    pub fn src(&self) -> PathBuf {
        self.root.join(&self.paths.src)
    }

    /// Distribution root.
    pub fn dist(&self) -> PathBuf {
        self.root.join(&self.paths.dist)
    }

    /// Temporary root.
    pub fn tmp(&self) -> PathBuf {
        self.root.join(&self.paths.tmp)
    }

    /// Page templates fed to the include engine.
    pub fn pages_dir(&self) -> PathBuf {
        self.src().join("views").join("pages")
    }

    /// Every markup source, pages and partials.
    pub fn views_dir(&self) -> PathBuf {
        self.src().join("views")
    }

    pub fn styles_dir(&self) -> PathBuf {
        self.src().join("styles")
    }

    pub fn images_dir(&self) -> PathBuf {
        self.src().join("images")
    }

    pub fn fonts_dir(&self) -> PathBuf {
        self.src().join("fonts")
    }

    /// Compiled stylesheet output.
    pub fn tmp_styles_dir(&self) -> PathBuf {
        self.tmp().join("styles")
    }

    /// Roots searched when resolving asset references in pages.
    pub fn asset_search_paths(&self) -> Vec<PathBuf> {
        vec![self.src(), self.tmp(), self.root.clone()]
    }

    /// Watch pattern for a directory below the source root, relative to `root`.
    pub fn watch_pattern(&self, dir: &str, tail: &str) -> String {
        let mut parts: Vec<String> = normalized(&self.paths.src)
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect();
        parts.push(dir.to_string());
        parts.push(tail.to_string());
        parts.join("/")
    }

    /// Development server: source, temporary and project roots.
    pub fn dev_server(&self) -> ServerConfig {
        ServerConfig {
            name: "Development".to_string(),
            host: self.dev.host.clone(),
            port: self.dev.port,
            roots: vec![self.src(), self.tmp(), self.root.clone()],
            fallback: self.src().join("index.html"),
            livereload: self.dev.livereload,
        }
    }

    /// Production server: distribution root only.
    pub fn prod_server(&self) -> ServerConfig {
        ServerConfig {
            name: "Production".to_string(),
            host: self.prod.host.clone(),
            port: self.prod.port,
            roots: vec![self.dist()],
            fallback: self.dist().join("index.html"),
            livereload: self.prod.livereload,
        }
    }
}

/// Drop `.` components so `./src` and `src` compare equal.
fn normalized(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_match_project_layout() {
        let config = SiteConfig::default();

        assert_eq!(config.dev.port, 9000);
        assert_eq!(config.prod.port, 9090);
        assert_eq!(config.dev.host, "0.0.0.0");
        assert_eq!(config.images.level, 5);
        assert_eq!(config.prettify.indent_size, 2);
        assert_eq!(config.tmp_styles_dir(), PathBuf::from("./.tmp/styles"));
    }

    #[test]
    fn servers_use_distinct_ports_and_fallbacks() {
        let config = SiteConfig::with_root("/site");
        let dev = config.dev_server();
        let prod = config.prod_server();

        assert_ne!(dev.port, prod.port);
        assert_eq!(dev.fallback, PathBuf::from("/site/src/index.html"));
        assert_eq!(prod.fallback, PathBuf::from("/site/dist/index.html"));
        assert_eq!(
            dev.roots,
            vec![
                PathBuf::from("/site/src"),
                PathBuf::from("/site/.tmp"),
                PathBuf::from("/site")
            ]
        );
        assert_eq!(prod.roots, vec![PathBuf::from("/site/dist")]);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let temp = tempdir().unwrap();
        let config = SiteConfig::load(&temp.path().join("kiln.toml")).unwrap();

        assert_eq!(config.root, temp.path());
        assert_eq!(config.dev.port, 9000);
    }

    #[test]
    fn loads_partial_overrides() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("kiln.toml");
        fs::write(
            &path,
            r#"
[paths]
src = "./app"

[dev]
port = 3000

[images]
level = 2
"#,
        )
        .unwrap();

        let config = SiteConfig::load(&path).unwrap();

        assert_eq!(config.dev.port, 3000);
        assert!(config.dev.livereload);
        assert_eq!(config.prod.port, 9090);
        assert_eq!(config.images.level, 2);
        assert!(config.images.interlaced);
        assert_eq!(config.paths.dist, PathBuf::from("dist"));
        assert_eq!(config.watch_pattern("styles", "**/*.scss"), "app/styles/**/*.scss");
    }

    #[test]
    fn server_sections_keep_their_own_port_defaults() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("kiln.toml");
        fs::write(&path, "[dev]\nlivereload = false\n\n[prod]\nhost = \"127.0.0.1\"\n").unwrap();

        let config = SiteConfig::load(&path).unwrap();

        assert_eq!(config.dev.port, 9000);
        assert!(!config.dev.livereload);
        assert_eq!(config.dev.host, "0.0.0.0");
        assert_eq!(config.prod.port, 9090);
        assert_eq!(config.prod.host, "127.0.0.1");
        assert!(config.prod.livereload);
    }

    #[test]
    fn rejects_shared_ports() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("kiln.toml");
        fs::write(&path, "[dev]\nport = 8000\n[prod]\nport = 8000\n").unwrap();

        let err = SiteConfig::load(&path).unwrap_err();

        assert!(matches!(err, ConfigError::PortConflict(8000)));
    }

    #[test]
    fn rejects_malformed_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("kiln.toml");
        fs::write(&path, "[dev\nport = ").unwrap();

        assert!(matches!(
            SiteConfig::load(&path).unwrap_err(),
            ConfigError::Parse { .. }
        ));
    }
}
