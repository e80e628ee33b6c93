//! XDG-compliant path resolution for fabula.
//!
//! [`FabulaPaths`] resolves the global directories; [`DataLayout`] names the
//! individual files of one knowledge base (stories, factoids, allow-lists and
//! the semantic-network response cache).

use std::path::{Path, PathBuf};

use miette::Diagnostic;
use thiserror::Error;

/// Errors from path resolution.
#[derive(Debug, Error, Diagnostic)]
pub enum PathError {
    #[error("cannot determine home directory")]
    #[diagnostic(
        code(fabula::paths::no_home),
        help("Set the HOME environment variable or pass --data-dir explicitly.")
    )]
    NoHome,

    #[error("failed to create directory: {path}")]
    #[diagnostic(
        code(fabula::paths::create_dir),
        help("Check that the parent directory exists and you have write permissions.")
    )]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type PathResult<T> = std::result::Result<T, PathError>;

/// Global XDG-compliant directories for fabula.
#[derive(Debug, Clone)]
pub struct FabulaPaths {
    /// `$XDG_CONFIG_HOME/fabula/`
    pub config_dir: PathBuf,
    /// `$XDG_DATA_HOME/fabula/`
    pub data_dir: PathBuf,
    /// `$XDG_CACHE_HOME/fabula/`
    pub cache_dir: PathBuf,
}

impl FabulaPaths {
    /// Resolve XDG directories from environment variables with standard fallbacks.
    pub fn resolve() -> PathResult<Self> {
        let home = std::env::var("HOME")
            .map(PathBuf::from)
            .map_err(|_| PathError::NoHome)?;

        let config_dir = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home.join(".config"))
            .join("fabula");

        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home.join(".local/share"))
            .join("fabula");

        let cache_dir = std::env::var("XDG_CACHE_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home.join(".cache"))
            .join("fabula");

        Ok(Self {
            config_dir,
            data_dir,
            cache_dir,
        })
    }

    /// Path to the global config file.
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Layout of the default knowledge base.
    pub fn layout(&self) -> DataLayout {
        DataLayout {
            root: self.data_dir.clone(),
            cache_dir: self.cache_dir.join("semantic"),
        }
    }
}

/// File layout of one knowledge base.
#[derive(Debug, Clone)]
pub struct DataLayout {
    /// Directory holding stories, factoids and allow-lists.
    pub root: PathBuf,
    /// One JSON file per cached semantic-network response.
    pub cache_dir: PathBuf,
}

impl DataLayout {
    /// Self-contained layout rooted at `root`, with the cache inside it.
    pub fn rooted_at(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            cache_dir: root.join("cache"),
            root,
        }
    }

    /// `root/stories/`: one `<story id>.json` per story.
    pub fn stories_dir(&self) -> PathBuf {
        self.root.join("stories")
    }

    /// `root/factoids.json`
    pub fn factoids_file(&self) -> PathBuf {
        self.root.join("factoids.json")
    }

    /// `root/valid_terms.json`
    pub fn valid_terms_file(&self) -> PathBuf {
        self.root.join("valid_terms.json")
    }

    /// `root/valid_relations.json`
    pub fn valid_relations_file(&self) -> PathBuf {
        self.root.join("valid_relations.json")
    }

    /// Create all directories. Idempotent.
    pub fn ensure_dirs(&self) -> PathResult<()> {
        for dir in [&self.root, &self.stories_dir(), &self.cache_dir] {
            create_dir(dir)?;
        }
        Ok(())
    }
}

fn create_dir(dir: &Path) -> PathResult<()> {
    std::fs::create_dir_all(dir).map_err(|e| PathError::CreateDir {
        path: dir.display().to_string(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolved_paths_use_xdg_layout() {
        // Reads the real environment; never mutates it (unsafe in edition 2024).
        let paths = FabulaPaths::resolve().unwrap();
        assert!(paths.data_dir.ends_with("fabula"));
        assert!(paths.config_file().ends_with("fabula/config.toml"));
        assert!(paths.layout().cache_dir.starts_with(&paths.cache_dir));
    }

    #[test]
    fn rooted_layout_keeps_everything_under_root() {
        let layout = DataLayout::rooted_at("/data/fabula");
        assert_eq!(layout.stories_dir(), PathBuf::from("/data/fabula/stories"));
        assert_eq!(
            layout.factoids_file(),
            PathBuf::from("/data/fabula/factoids.json")
        );
        assert_eq!(
            layout.valid_relations_file(),
            PathBuf::from("/data/fabula/valid_relations.json")
        );
        assert_eq!(layout.cache_dir, PathBuf::from("/data/fabula/cache"));
    }

    #[test]
    fn ensure_dirs_is_idempotent() {
        let tmp = tempfile::TempDir::new().unwrap();
        let layout = DataLayout::rooted_at(tmp.path().join("kb"));
        layout.ensure_dirs().unwrap();
        layout.ensure_dirs().unwrap();
        assert!(layout.stories_dir().is_dir());
        assert!(layout.cache_dir.is_dir());
    }
}
