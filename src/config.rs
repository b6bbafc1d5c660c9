//! Process-wide options and the `CODA_DEFINITION` search path. These
//! toggles are intended to be set once during initialization; relaxed
//! atomics are used rather than a lock, matching that contract exactly
//! (concurrent mutation while reading is out of contract, not undefined
//! behavior).

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

static PERFORM_CONVERSIONS: AtomicBool = AtomicBool::new(true);
static PERFORM_BOUNDARY_CHECKS: AtomicBool = AtomicBool::new(true);
static USE_FAST_SIZE_EXPRESSIONS: AtomicBool = AtomicBool::new(false);
static USE_MMAP: AtomicBool = AtomicBool::new(true);
static BYPASS_SPECIAL_TYPES: AtomicBool = AtomicBool::new(false);

macro_rules! toggle {
    ($flag:ident, $get:ident, $set:ident) => {
        pub fn $get() -> bool {
            $flag.load(Ordering::Relaxed)
        }

        pub fn $set(value: bool) {
            $flag.store(value, Ordering::Relaxed);
        }
    };
}

toggle!(
    PERFORM_CONVERSIONS,
    perform_conversions,
    set_perform_conversions
);
toggle!(
    PERFORM_BOUNDARY_CHECKS,
    perform_boundary_checks,
    set_perform_boundary_checks
);
toggle!(
    USE_FAST_SIZE_EXPRESSIONS,
    use_fast_size_expressions,
    set_use_fast_size_expressions
);
toggle!(USE_MMAP, use_mmap, set_use_mmap);
toggle!(
    BYPASS_SPECIAL_TYPES,
    bypass_special_types,
    set_bypass_special_types
);

static DEFINITION_PATH_OVERRIDE: RwLock<Option<Vec<PathBuf>>> = RwLock::new(None);

/// Explicitly set the codef search path, overriding `CODA_DEFINITION`.
pub fn set_definition_path(paths: Vec<PathBuf>) {
    *DEFINITION_PATH_OVERRIDE.write().unwrap() = Some(paths);
}

/// Resolve the codef search path: the explicit override if one was set via
/// [`set_definition_path`], otherwise the platform path-list parse of the
/// `CODA_DEFINITION` environment variable. Consumed by the external
/// product-recognition collaborator; the core only resolves the path list.
pub fn definition_path() -> Vec<PathBuf> {
    if let Some(paths) = DEFINITION_PATH_OVERRIDE.read().unwrap().clone() {
        return paths;
    }
    let Ok(raw) = std::env::var("CODA_DEFINITION") else {
        return Vec::new();
    };
    let separator = if cfg!(windows) { ';' } else { ':' };
    raw.split(separator).map(PathBuf::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // serialize option-mutating tests: they touch process-wide statics.
    static LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn toggles_roundtrip() {
        let _guard = LOCK.lock().unwrap();
        let original = use_mmap();
        set_use_mmap(!original);
        assert_eq!(use_mmap(), !original);
        set_use_mmap(original);
    }

    #[test]
    fn explicit_definition_path_overrides_env() {
        let _guard = LOCK.lock().unwrap();
        set_definition_path(vec![PathBuf::from("/opt/codefs")]);
        assert_eq!(definition_path(), vec![PathBuf::from("/opt/codefs")]);
        *DEFINITION_PATH_OVERRIDE.write().unwrap() = None;
    }
}
