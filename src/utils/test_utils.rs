use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, OnceLock};

/// Serialize tests that touch process-global environment variables. Hold
/// the returned guard for the duration of the test.
pub fn env_lock() -> MutexGuard<'static, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|err| err.into_inner())
}

/// Scoped environment-variable override for tests. Restores the previous
/// values (or removes the variables) on drop so tests cannot leak state
/// into each other.
pub struct EnvVarGuard {
    saved: HashMap<String, Option<String>>,
}

impl EnvVarGuard {
    pub fn new() -> Self {
        Self {
            saved: HashMap::new(),
        }
    }

    pub fn set_var(&mut self, name: &str, value: &str) {
        self.save(name);
        std::env::set_var(name, value);
    }

    pub fn remove_var(&mut self, name: &str) {
        self.save(name);
        std::env::remove_var(name);
    }

    fn save(&mut self, name: &str) {
        self.saved
            .entry(name.to_string())
            .or_insert_with(|| std::env::var(name).ok());
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        for (name, previous) in self.saved.drain() {
            match previous {
                Some(value) => std::env::set_var(&name, value),
                None => std::env::remove_var(&name),
            }
        }
    }
}
