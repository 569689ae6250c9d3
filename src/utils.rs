use dirs::data_dir;
use once_cell::sync::Lazy;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::warn;

static DATA_ROOT: Lazy<PathBuf> = Lazy::new(|| {
    let base = data_dir()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    let root = base.join("nightlife");
    if let Err(err) = fs::create_dir_all(&root) {
        warn!("failed to create data root {:?}: {err}", root);
    }
    root
});

pub fn data_root() -> PathBuf {
    DATA_ROOT.clone()
}

pub fn database_path() -> PathBuf {
    data_root().join("nightlife.sqlite")
}

pub fn prefs_path() -> PathBuf {
    data_root().join("prefs.json")
}

pub fn ensure_parent(path: &Path) {
    if let Some(parent) = path.parent() {
        if parent.as_os_str().is_empty() {
            return;
        }
        if let Err(err) = fs::create_dir_all(parent) {
            warn!("failed to create parent {:?}: {err}", parent);
        }
    }
}
