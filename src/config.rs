//! Persistent JSON config at a fixed per-user path.
//!
//! The document holds `history` (ordered ticker symbols, oldest first) and
//! `pinned` (tickers marked sticky), plus whatever unknown keys other tools
//! may have written; those are preserved across merge-writes.
//!
//! `save` is a read-merge-write with no file locking. Within the process the
//! store is only ever driven from the UI thread, so writes cannot interleave;
//! across processes the last writer wins.

use std::fs;
use std::path::PathBuf;

use serde_json::{Map, Value};
use tracing::{debug, error};

const CONFIG_FILE_NAME: &str = ".tickerdash.json";

pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Store at `~/.tickerdash.json` (current directory when the home
    /// directory cannot be resolved).
    pub fn open_default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            path: home.join(CONFIG_FILE_NAME),
        }
    }

    /// Store at an explicit path, used by tests.
    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Load the config document. Any I/O or parse failure degrades to the
    /// empty document and is logged; callers never see an error.
    pub fn load(&self) -> Map<String, Value> {
        match fs::read_to_string(&self.path) {
            Ok(content) => match serde_json::from_str::<Value>(&content) {
                Ok(Value::Object(map)) => map,
                Ok(other) => {
                    error!(path = ?self.path, value = ?other, "config is not a JSON object, using defaults");
                    Map::new()
                }
                Err(e) => {
                    error!(path = ?self.path, error = %e, "failed to parse config, using defaults");
                    Map::new()
                }
            },
            Err(e) => {
                debug!(path = ?self.path, error = %e, "config not readable, using defaults");
                Map::new()
            }
        }
    }

    /// Merge `partial` over the on-disk document and write the result back.
    /// Keys absent from `partial` keep their persisted values.
    pub fn save(&self, partial: Map<String, Value>) {
        let mut current = self.load();
        for (key, value) in partial {
            current.insert(key, value);
        }

        match serde_json::to_string(&Value::Object(current)) {
            Ok(content) => {
                if let Err(e) = fs::write(&self.path, content) {
                    error!(path = ?self.path, error = %e, "failed to write config");
                }
            }
            Err(e) => error!(error = %e, "failed to serialize config"),
        }
    }

    /// Read a list-of-strings field, skipping non-string entries.
    pub fn string_list(document: &Map<String, Value>, key: &str) -> Vec<String> {
        document
            .get(key)
            .and_then(Value::as_array)
            .map(|values| {
                values
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_store() -> (tempfile::TempDir, ConfigStore) {
        let dir = tempfile::tempdir().expect("create temp dir");
        let store = ConfigStore::at(dir.path().join("config.json"));
        (dir, store)
    }

    fn partial(key: &str, value: Value) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(key.to_string(), value);
        map
    }

    #[test]
    fn missing_file_loads_empty() {
        let (_dir, store) = temp_store();
        assert!(store.load().is_empty());
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let (_dir, store) = temp_store();
        fs::write(store.path(), "{not json").unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let (_dir, store) = temp_store();
        store.save(partial("history", json!(["AAPL", "MSFT"])));

        let document = store.load();
        assert_eq!(
            ConfigStore::string_list(&document, "history"),
            vec!["AAPL", "MSFT"]
        );
    }

    #[test]
    fn save_merges_over_existing_keys() {
        let (_dir, store) = temp_store();
        store.save(partial("history", json!(["AAPL"])));
        store.save(partial("pinned", json!(["AAPL"])));

        let document = store.load();
        assert_eq!(ConfigStore::string_list(&document, "history"), vec!["AAPL"]);
        assert_eq!(ConfigStore::string_list(&document, "pinned"), vec!["AAPL"]);
    }

    #[test]
    fn unknown_keys_survive_merge_writes() {
        let (_dir, store) = temp_store();
        fs::write(
            store.path(),
            r#"{"history": ["AAPL"], "theme": "dark"}"#,
        )
        .unwrap();

        store.save(partial("history", json!(["TSLA"])));

        let document = store.load();
        assert_eq!(ConfigStore::string_list(&document, "history"), vec!["TSLA"]);
        assert_eq!(document.get("theme"), Some(&json!("dark")));
    }

    #[test]
    fn string_list_skips_non_strings() {
        let mut document = Map::new();
        document.insert("history".to_string(), json!(["AAPL", 42, "TSLA"]));
        assert_eq!(
            ConfigStore::string_list(&document, "history"),
            vec!["AAPL", "TSLA"]
        );
    }
}
