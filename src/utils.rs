use chrono::Utc;
use dirs::data_dir;
use once_cell::sync::Lazy;
use std::{
    fs,
    path::{Path, PathBuf},
    sync::atomic::{AtomicI64, Ordering},
};

static DATA_ROOT: Lazy<PathBuf> = Lazy::new(|| {
    let base = data_dir()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    let root = base.join("sierra-hub");
    if let Err(err) = fs::create_dir_all(&root) {
        log::warn!("failed to create data root {:?}: {err}", root);
    }
    root
});

static LAST_ID: AtomicI64 = AtomicI64::new(0);

pub fn data_root() -> PathBuf {
    DATA_ROOT.clone()
}

pub fn database_path(file_name: &str) -> PathBuf {
    data_root().join(file_name)
}

pub fn config_path() -> PathBuf {
    data_root().join("config.json")
}

pub fn ensure_parent(path: &Path) {
    if let Some(parent) = path.parent() {
        if let Err(err) = fs::create_dir_all(parent) {
            log::warn!("failed to create parent {:?}: {err}", parent);
        }
    }
}

/// Millisecond timestamp id, bumped past the last issued value so two calls
/// inside the same millisecond still differ.
pub fn next_id() -> String {
    let now = Utc::now().timestamp_millis();
    let mut last = LAST_ID.load(Ordering::Relaxed);
    loop {
        let candidate = if now > last { now } else { last + 1 };
        match LAST_ID.compare_exchange_weak(last, candidate, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return candidate.to_string(),
            Err(actual) => last = actual,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn next_id_is_unique_within_a_millisecond() {
        let ids: HashSet<String> = (0..500).map(|_| next_id()).collect();
        assert_eq!(ids.len(), 500);
    }

    #[test]
    fn next_id_is_numeric() {
        assert!(next_id().parse::<i64>().is_ok());
    }
}
