//! Object keys and namespace routing.
//!
//! Every synchronized file is addressed by a path key. Two namespaces share
//! one flat key space, distinguished solely by prefix:
//!
//! - plain keys resolve relative to the installation root;
//! - keys prefixed `assets/` resolve (prefix stripped) relative to the
//!   shared, bundle-independent assets directory.
//!
//! A key's namespace is determined by its prefix alone, never by where the
//! file happens to sit on disk. Keys always use forward slashes, on every
//! platform.

use std::path::{Path, PathBuf};

/// Prefix marking the shared asset namespace.
pub const ASSET_PREFIX: &str = "assets/";

/// Returns true when the key addresses the shared asset namespace.
pub fn is_asset_key(key: &str) -> bool {
    key.starts_with(ASSET_PREFIX)
}

/// Build a key from a path relative to its namespace root.
///
/// Path separators are normalized to forward slashes; non-UTF-8 components
/// are replaced lossily.
pub fn key_from_relative_path(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Maps object keys onto local filesystem paths.
#[derive(Clone, Debug)]
pub struct ObjectResolver {
    install_dir: PathBuf,
    assets_dir: PathBuf,
}

impl ObjectResolver {
    /// Create a resolver over the two namespace roots.
    pub fn new(install_dir: PathBuf, assets_dir: PathBuf) -> Self {
        Self {
            install_dir,
            assets_dir,
        }
    }

    /// Resolve a key to its destination path.
    pub fn resolve(&self, key: &str) -> PathBuf {
        match key.strip_prefix(ASSET_PREFIX) {
            Some(rest) => join_key(&self.assets_dir, rest),
            None => join_key(&self.install_dir, key),
        }
    }

    /// The installation root.
    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    /// The shared assets directory.
    pub fn assets_dir(&self) -> &Path {
        &self.assets_dir
    }
}

/// Remote location of one object: base + bundle + "/" + key, with the key
/// used verbatim (asset prefix included).
pub fn object_url(base_url: &str, bundle: &str, key: &str) -> String {
    format!("{}{}/{}", base_url, bundle, key)
}

fn join_key(root: &Path, key: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    for part in key.split('/').filter(|p| !p.is_empty()) {
        path.push(part);
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_key_detection() {
        assert!(is_asset_key("assets/x/y.png"));
        assert!(!is_asset_key("mods/foo.jar"));
        assert!(!is_asset_key("my-assets/z.png"));
    }

    #[test]
    fn test_key_from_relative_path() {
        let key = key_from_relative_path(&PathBuf::from("mods").join("foo.jar"));
        assert_eq!(key, "mods/foo.jar");
    }

    #[test]
    fn test_asset_key_routes_to_assets_dir() {
        let resolver = ObjectResolver::new(
            PathBuf::from("/install"),
            PathBuf::from("/shared/assets"),
        );
        assert_eq!(
            resolver.resolve("assets/x/y.png"),
            PathBuf::from("/shared/assets/x/y.png")
        );
    }

    #[test]
    fn test_plain_key_routes_to_install_root() {
        let resolver = ObjectResolver::new(
            PathBuf::from("/install"),
            PathBuf::from("/shared/assets"),
        );
        assert_eq!(
            resolver.resolve("mods/foo.jar"),
            PathBuf::from("/install/mods/foo.jar")
        );
    }

    #[test]
    fn test_object_url_uses_key_verbatim() {
        let url = object_url("https://packs.test/", "modpack-x", "assets/b.png");
        assert_eq!(url, "https://packs.test/modpack-x/assets/b.png");
    }
}
