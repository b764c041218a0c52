//! Data root resolution and file layout.

use crate::constants;
use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ShopmonPaths {
    pub root: PathBuf,
    pub config_toml: PathBuf,
    pub audit_log: PathBuf,
    pub audit_lock: PathBuf,
    pub provision_lock: PathBuf,
}

impl ShopmonPaths {
    /// Resolve the data root from CLI arg, env var, or auto-detection.
    pub fn resolve(root_arg: Option<PathBuf>) -> Result<Self> {
        if let Some(root) = root_arg {
            return Ok(Self::from_root(root));
        }
        if let Ok(root) = env::var("SHOPMON_ROOT") {
            return Ok(Self::from_root(PathBuf::from(root)));
        }
        if let Some(found) = find_config_root()? {
            return Ok(Self::from_root(found));
        }
        Ok(Self::from_root(PathBuf::from(constants::DEFAULT_ROOT)))
    }

    pub fn from_root(root: PathBuf) -> Self {
        let config_toml = root.join(constants::CONFIG_FILE_NAME);
        let audit_log = root.join("audit.log");
        let audit_lock = root.join("audit.lock");
        let provision_lock = root.join("provision.lock");
        Self {
            root,
            config_toml,
            audit_log,
            audit_lock,
            provision_lock,
        }
    }

    /// Database location: explicit override, else the configured path under the root.
    pub fn database(&self, configured: &str, override_path: Option<&Path>) -> PathBuf {
        if let Some(path) = override_path {
            return path.to_path_buf();
        }
        let configured = Path::new(configured);
        if configured.is_absolute() {
            configured.to_path_buf()
        } else {
            self.root.join(configured)
        }
    }
}

fn find_config_root() -> Result<Option<PathBuf>> {
    let cwd = env::current_dir().context("resolve current directory")?;
    Ok(cwd
        .ancestors()
        .find(|dir| dir.join(constants::CONFIG_FILE_NAME).is_file())
        .map(Path::to_path_buf))
}

impl std::fmt::Display for ShopmonPaths {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "shopmon@{}", self.root.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_root() {
        let paths = ShopmonPaths::from_root(PathBuf::from("/test"));
        assert_eq!(paths.root, PathBuf::from("/test"));
        assert_eq!(paths.config_toml, PathBuf::from("/test/shopmon.toml"));
        assert_eq!(paths.audit_log, PathBuf::from("/test/audit.log"));
        assert_eq!(paths.provision_lock, PathBuf::from("/test/provision.lock"));
    }

    #[test]
    fn test_database_resolution() {
        let paths = ShopmonPaths::from_root(PathBuf::from("/test"));
        assert_eq!(paths.database("shopware.db", None), PathBuf::from("/test/shopware.db"));
        assert_eq!(paths.database("/srv/db.sqlite", None), PathBuf::from("/srv/db.sqlite"));
        assert_eq!(
            paths.database("shopware.db", Some(Path::new("/tmp/x.db"))),
            PathBuf::from("/tmp/x.db")
        );
    }
}
