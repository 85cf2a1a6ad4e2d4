//! CLI execution context.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use storefront_cache::{Cache, FileStore};
use storefront_state::{MedusaBackend, Storefront, StorefrontConfig};

use crate::output::Output;

/// Config file names searched for, nearest directory first.
pub const CONFIG_NAMES: [&str; 3] = ["storefront.toml", ".storefront.toml", "storefront.json"];

/// Execution context for CLI commands.
pub struct Context {
    /// Effective configuration, environment overrides applied.
    pub config: StorefrontConfig,
    /// File the configuration came from, if any.
    pub config_path: Option<PathBuf>,
    /// Output handler.
    pub output: Output,
    /// Working directory.
    pub cwd: PathBuf,
}

impl Context {
    /// Load context from a config file.
    pub fn load(config_path: Option<&str>, output: Output) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;

        let (config, config_path) = if let Some(path) = config_path {
            let path = resolve(&cwd, path);
            (StorefrontConfig::load(&path)?, Some(path))
        } else {
            match find_config(&cwd) {
                Some((config, path)) => (config, Some(path)),
                None => (StorefrontConfig::default(), None),
            }
        };

        Ok(Self {
            config: config.with_env(),
            config_path,
            output,
            cwd,
        })
    }

    /// Directory holding the session's persisted identifiers.
    pub fn session_dir(&self) -> PathBuf {
        self.cwd.join(".storefront")
    }

    /// Where `config init` and `config set` write.
    pub fn config_target(&self) -> PathBuf {
        self.config_path
            .clone()
            .unwrap_or_else(|| self.cwd.join(CONFIG_NAMES[0]))
    }

    /// Connect to the backend and restore the persisted cart.
    pub async fn session(&self) -> Result<Storefront<MedusaBackend>> {
        let store = FileStore::open(self.session_dir().join("session.json"))
            .context("Failed to open session store")?;
        let storefront = Storefront::connect(&self.config, Cache::new(Arc::new(store)))?;

        if let Err(e) = storefront.initialize().await {
            self.output.debug(&format!("cart not restored: {}", e));
        }
        Ok(storefront)
    }
}

fn resolve(cwd: &Path, path: &str) -> PathBuf {
    let path = PathBuf::from(path);
    if path.is_absolute() {
        path
    } else {
        cwd.join(path)
    }
}

/// Find a config file in the directory tree.
fn find_config(start: &Path) -> Option<(StorefrontConfig, PathBuf)> {
    let mut current = start.to_path_buf();
    loop {
        for name in &CONFIG_NAMES {
            let path = current.join(name);
            if path.exists() {
                match StorefrontConfig::load(&path) {
                    Ok(config) => return Some((config, path)),
                    Err(e) => tracing::warn!(error = %e, "skipping config file"),
                }
            }
        }

        if !current.pop() {
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_config_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("storefront.toml"),
            "[store]\nregion_id = \"reg_de\"\n",
        )
        .unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let (config, path) = find_config(&nested).unwrap();
        assert_eq!(config.store.region_id, "reg_de");
        assert_eq!(path, dir.path().join("storefront.toml"));
    }

    #[test]
    fn test_resolve_relative_path() {
        let cwd = Path::new("/srv/shop");
        assert_eq!(resolve(cwd, "conf.toml"), PathBuf::from("/srv/shop/conf.toml"));
        assert_eq!(resolve(cwd, "/etc/shop.toml"), PathBuf::from("/etc/shop.toml"));
    }
}
