//! `settings.json` in the memory root. Every field is optional.

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Layers for `tree` and for learned chat turns.
    pub tree_default: usize,
    /// Layers for `simulate` when none is given.
    pub sim_default: usize,
    /// Extra alias → command name entries.
    pub aliases: HashMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tree_default: 2,
            sim_default: 3,
            aliases: HashMap::new(),
        }
    }
}

impl Settings {
    /// Read `settings.json` under `root`. Missing or malformed → defaults.
    pub fn load(root: &Path) -> Self {
        let path = root.join(SETTINGS_FILE);
        match fs::read_to_string(&path) {
            Ok(s) => {
                let s = s.trim_start_matches('\u{feff}');
                serde_json::from_str(s).unwrap_or_else(|e| {
                    log::warn!("[settings] ignoring {}: {e}", path.display());
                    Self::default()
                })
            }
            Err(_) => Self::default(),
        }
    }
}
