//! Configuration loading and data directory resolution
//!
//! Data directory resolution priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming the data directory
pub const DATA_DIR_ENV: &str = "BOOKFUSE_DATA";

/// TOML config file contents (`~/.config/bookfuse/config.toml`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Data directory holding checkpoints and the catalog database
    pub data_dir: Option<PathBuf>,
    /// Listen port for the read API (bookfuse-api)
    pub api_port: Option<u16>,
}

/// All file locations derived from one data directory
///
/// Checkpoints are one artifact per source; the final catalog artifact
/// and the SQLite database live alongside them.
#[derive(Debug, Clone)]
pub struct CatalogPaths {
    pub data_dir: PathBuf,
}

impl CatalogPaths {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Base inventory snapshot (one row per physical item)
    pub fn base_inventory_csv(&self) -> PathBuf {
        self.data_dir.join("base_inventory.csv")
    }

    /// Library catalog (OPAC) checkpoint, merge-on-write, keyed by ISBN
    pub fn library_catalog_checkpoint(&self) -> PathBuf {
        self.data_dir.join("interim").join("library_catalog.csv")
    }

    /// OpenLibrary checkpoint, append-only, keyed by row_id
    pub fn openlibrary_checkpoint(&self) -> PathBuf {
        self.data_dir.join("interim").join("openlibrary.csv")
    }

    /// OpenAlex checkpoint, append-only, keyed by row_id
    pub fn openalex_checkpoint(&self) -> PathBuf {
        self.data_dir.join("interim").join("openalex.csv")
    }

    /// Final fused catalog artifact (sole contract with storage)
    pub fn final_catalog_csv(&self) -> PathBuf {
        self.data_dir.join("catalog").join("final_catalog.csv")
    }

    /// SQLite catalog database
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("catalog.db")
    }

    /// Create the directories the pipeline writes into
    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(self.data_dir.join("interim"))?;
        std::fs::create_dir_all(self.data_dir.join("catalog"))?;
        Ok(())
    }
}

/// Resolve the data directory following the priority order above
pub fn resolve_data_dir(cli_arg: Option<&Path>) -> CatalogPaths {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return CatalogPaths::new(path);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(DATA_DIR_ENV) {
        if !path.trim().is_empty() {
            return CatalogPaths::new(path);
        }
    }

    // Priority 3: TOML config file
    if let Ok(config) = load_toml_config() {
        if let Some(dir) = config.data_dir {
            return CatalogPaths::new(dir);
        }
    }

    // Priority 4: OS-dependent compiled default
    CatalogPaths::new(default_data_dir())
}

/// Load the TOML config file if one exists
pub fn load_toml_config() -> Result<TomlConfig> {
    let path = config_file_path()
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;

    if !path.exists() {
        return Err(Error::Config(format!(
            "Config file not found: {}",
            path.display()
        )));
    }

    let content = std::fs::read_to_string(&path)?;
    toml::from_str(&content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
}

fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("bookfuse").join("config.toml"))
}

/// OS-dependent default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("bookfuse"))
        .unwrap_or_else(|| PathBuf::from("./bookfuse_data"))
}
