//! Injected environment lookup.
//!
//! The config resolver and UID loader never read the process environment
//! ambiently; callers hand them an `EnvSource` so tests can substitute a
//! plain map.

use std::collections::{BTreeMap, HashMap};

/// A key/value environment lookup.
pub trait EnvSource {
    fn get(&self, name: &str) -> Option<String>;
}

/// Reads from the real process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemEnv;

impl EnvSource for SystemEnv {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl EnvSource for BTreeMap<String, String> {
    fn get(&self, name: &str) -> Option<String> {
        BTreeMap::get(self, name).cloned()
    }
}

impl EnvSource for HashMap<String, String> {
    fn get(&self, name: &str) -> Option<String> {
        HashMap::get(self, name).cloned()
    }
}

impl<T: EnvSource + ?Sized> EnvSource for &T {
    fn get(&self, name: &str) -> Option<String> {
        (**self).get(name)
    }
}
