//! Credential store: loads a flat `key = value` file once per process,
//! organizes entries by service namespace, and serves lookups with a
//! global-fallback rule.
//!
//! The file format is line-oriented text of unknown encoding a priori
//! (see [`encoding`]). A dotted name `service.key` scopes the entry to
//! that service; a bare name goes into the reserved `"global"` namespace.
//! Lookups check the requested service first, then `"global"`.
//!
//! The store is an explicit instance with an explicit lifecycle: construct
//! it with a path, share it via `Arc`, and call [`SecretStore::reset`] to
//! drop the cached table (tests, credential file swaps). A failed load
//! never leaves a partial table behind, so the next call retries cleanly.

pub mod encoding;
pub mod parser;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use indexmap::IndexMap;
use thiserror::Error;

use crate::constants;

/// Reserved namespace for entries without a service prefix.
pub const GLOBAL_NAMESPACE: &str = "global";

/// How many leading characters of a value `list()` reveals.
const PREVIEW_CHARS: usize = 3;

/// Parsed credential file: service namespace → key → value.
///
/// Insertion-ordered so diagnostics print entries in file order.
pub type CredentialTable = IndexMap<String, IndexMap<String, String>>;

/// Errors from the credential store.
#[derive(Error, Debug)]
pub enum SecretsError {
    #[error("credential file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("malformed line {line} in credential file: '{content}' (expected 'name = value')")]
    Parse { line: usize, content: String },

    #[error("failed to load credential file {}: {source}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error(
        "secret '{key}' for service '{service}' not found. available services: [{}]. available keys: [{}]",
        .services.join(", "),
        .keys.join(", ")
    )]
    SecretNotFound {
        service: String,
        key: String,
        /// All namespaces present in the table.
        services: Vec<String>,
        /// Keys under the requested service plus the global namespace.
        keys: Vec<String>,
    },

    #[error("'{caller}' was denied a required secret: {source}")]
    Access {
        caller: &'static str,
        #[source]
        source: Box<SecretsError>,
    },
}

/// Process-local, read-mostly credential cache.
///
/// Loads lazily on first lookup (or eagerly via [`load`](Self::load)) and
/// caches the table for the lifetime of the store. The lazy-load path is
/// serialized by a mutex so concurrent first lookups cause at most one
/// disk read and one parse.
pub struct SecretStore {
    path: PathBuf,
    table: Mutex<Option<Arc<CredentialTable>>>,
}

impl SecretStore {
    /// Create a store reading from the given credential file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            table: Mutex::new(None),
        }
    }

    /// Create a store reading from the default credential file location.
    pub fn with_default_path() -> Self {
        Self::new(constants::DEFAULT_SECRETS_FILE)
    }

    /// The path this store reads from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load and cache the credential table.
    ///
    /// Returns the cached table immediately if one exists; otherwise reads
    /// the file, detects its encoding, parses it, and caches the result.
    /// Any failure leaves the cache empty so a later call can retry.
    pub fn load(&self) -> Result<Arc<CredentialTable>, SecretsError> {
        self.load_from(None)
    }

    /// Like [`load`](Self::load), with an optional one-off path override.
    ///
    /// The override only matters for the call that actually performs the
    /// load: once a table is cached, every call returns it without touching
    /// the filesystem, whatever path is passed.
    pub fn load_from(&self, path: Option<&Path>) -> Result<Arc<CredentialTable>, SecretsError> {
        let mut cached = self.table.lock().unwrap();
        if let Some(table) = cached.as_ref() {
            return Ok(Arc::clone(table));
        }

        let path = path.unwrap_or(&self.path);
        if !path.exists() {
            return Err(SecretsError::FileNotFound(path.to_path_buf()));
        }

        let raw = std::fs::read(path).map_err(|e| SecretsError::Load {
            path: path.to_path_buf(),
            source: Box::new(e),
        })?;
        let decoded = encoding::decode(&raw).map_err(|e| SecretsError::Load {
            path: path.to_path_buf(),
            source: Box::new(e),
        })?;
        let table = Arc::new(parser::parse_table(&decoded.text)?);
        *cached = Some(Arc::clone(&table));

        println!(
            "loaded credential file {} (encoding: {})",
            path.display(),
            decoded.encoding
        );
        println!("found {} credential namespace(s)", table.len());

        Ok(table)
    }

    /// Look up a secret, falling back to the global namespace.
    ///
    /// Triggers a lazy load if no table is cached yet. A service-scoped
    /// entry wins over a global entry with the same key name.
    pub fn get(&self, service: &str, key: &str) -> Result<String, SecretsError> {
        let table = self.load()?;

        if let Some(value) = table.get(service).and_then(|keys| keys.get(key)) {
            return Ok(value.clone());
        }
        if let Some(value) = table.get(GLOBAL_NAMESPACE).and_then(|keys| keys.get(key)) {
            return Ok(value.clone());
        }

        // Debugging context: which namespaces exist, and which keys the
        // caller could have asked for. Values never appear here.
        let services: Vec<String> = table.keys().cloned().collect();
        let mut keys: Vec<String> = table
            .get(service)
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default();
        if let Some(global) = table.get(GLOBAL_NAMESPACE) {
            keys.extend(global.keys().cloned());
        }

        Err(SecretsError::SecretNotFound {
            service: service.to_string(),
            key: key.to_string(),
            services,
            keys,
        })
    }

    /// A lookup handle that tags failures with the calling operation's name.
    ///
    /// Consumers hold a scope for the duration of an operation instead of
    /// fetching secrets anonymously, so a missing credential surfaces as
    /// "`poll_inbox` was denied ..." rather than a bare not-found.
    pub fn scoped(&self, caller: &'static str) -> SecretScope<'_> {
        SecretScope {
            store: self,
            caller,
        }
    }

    /// Debug listing: one line per entry, values truncated to a short
    /// preview. Never expose this to untrusted output sinks.
    pub fn list(&self) -> Result<String, SecretsError> {
        let table = self.load()?;
        let mut lines = Vec::new();
        for (service, keys) in table.iter() {
            for (key, value) in keys {
                let preview: String = value.chars().take(PREVIEW_CHARS).collect();
                lines.push(format!("{service}.{key} = {preview}..."));
            }
        }
        Ok(lines.join("\n"))
    }

    /// Drop the cached table so the next access re-reads the file.
    pub fn reset(&self) {
        *self.table.lock().unwrap() = None;
    }
}

/// Caller-scoped lookup handle returned by [`SecretStore::scoped`].
pub struct SecretScope<'a> {
    store: &'a SecretStore,
    caller: &'static str,
}

impl SecretScope<'_> {
    /// Look up a secret, wrapping any failure with the caller's identity.
    pub fn get(&self, service: &str, key: &str) -> Result<String, SecretsError> {
        self.store
            .get(service, key)
            .map_err(|e| SecretsError::Access {
                caller: self.caller,
                source: Box::new(e),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn store_with(content: &str) -> (tempfile::TempDir, SecretStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("key.txt");
        std::fs::write(&path, content).unwrap();
        (dir, SecretStore::new(path))
    }

    #[test]
    fn scoped_lookup_and_global_fallback() {
        let (_dir, store) = store_with(
            "service_a.api_key = a1b2c3\n\
             admin_token = admin_xyz\n",
        );
        assert_eq!(store.get("service_a", "api_key").unwrap(), "a1b2c3");
        // No service_b entry, so the global namespace answers.
        assert_eq!(store.get("service_b", "admin_token").unwrap(), "admin_xyz");
    }

    #[test]
    fn service_entry_wins_over_global() {
        let (_dir, store) = store_with(
            "token = global_value\n\
             mail.token = scoped_value\n",
        );
        assert_eq!(store.get("mail", "token").unwrap(), "scoped_value");
        assert_eq!(store.get("other", "token").unwrap(), "global_value");
    }

    #[test]
    fn miss_reports_available_namespaces_and_keys() {
        let (_dir, store) = store_with(
            "svc.a = 1\n\
             svc.b = 2\n\
             shared = 3\n",
        );
        let err = store.get("svc", "missing").unwrap_err();
        match err {
            SecretsError::SecretNotFound {
                service,
                key,
                services,
                keys,
            } => {
                assert_eq!(service, "svc");
                assert_eq!(key, "missing");
                assert_eq!(services, vec!["svc", "global"]);
                assert_eq!(keys, vec!["a", "b", "shared"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn miss_on_unknown_service_still_lists_global_keys() {
        let (_dir, store) = store_with("shared = 3\n");
        let err = store.get("nosuch", "nokey").unwrap_err();
        match err {
            SecretsError::SecretNotFound { services, keys, .. } => {
                assert_eq!(services, vec!["global"]);
                assert_eq!(keys, vec!["shared"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn table_is_cached_after_first_load() {
        let (dir, store) = store_with("svc.a = first\n");
        let before = store.load().unwrap();

        // Rewrite the file; the cached table must not notice.
        std::fs::write(dir.path().join("key.txt"), "svc.a = second\n").unwrap();
        let after = store.load().unwrap();
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(store.get("svc", "a").unwrap(), "first");
    }

    #[test]
    fn load_from_ignores_path_once_cached() {
        let (dir, store) = store_with("svc.a = first\n");
        store.load().unwrap();

        let other = dir.path().join("other.txt");
        std::fs::write(&other, "svc.a = other\n").unwrap();
        let table = store.load_from(Some(&other)).unwrap();
        assert_eq!(table["svc"]["a"], "first");
    }

    #[test]
    fn reset_forces_a_reload() {
        let (dir, store) = store_with("svc.a = first\n");
        assert_eq!(store.get("svc", "a").unwrap(), "first");

        std::fs::write(dir.path().join("key.txt"), "svc.a = second\n").unwrap();
        store.reset();
        assert_eq!(store.get("svc", "a").unwrap(), "second");
    }

    #[test]
    fn missing_file_is_not_found() {
        let store = SecretStore::new("/nonexistent/raincheck/key.txt");
        assert!(matches!(
            store.load().unwrap_err(),
            SecretsError::FileNotFound(_)
        ));
    }

    #[test]
    fn parse_failure_leaves_no_partial_table() {
        let (dir, store) = store_with("foo bar\n");
        let err = store.load().unwrap_err();
        assert!(matches!(err, SecretsError::Parse { line: 1, .. }));

        // Fixing the file lets the same store load successfully, proving
        // nothing half-built was cached.
        std::fs::write(dir.path().join("key.txt"), "svc.a = ok\n").unwrap();
        assert_eq!(store.get("svc", "a").unwrap(), "ok");
    }

    #[test]
    fn lazy_load_on_first_lookup() {
        let (_dir, store) = store_with("svc.a = lazy\n");
        // No explicit load() beforehand.
        assert_eq!(store.get("svc", "a").unwrap(), "lazy");
    }

    #[test]
    fn list_truncates_values() {
        let (_dir, store) = store_with(
            "svc.api_key = abcdefgh\n\
             token = xy\n",
        );
        let listing = store.list().unwrap();
        assert_eq!(listing, "svc.api_key = abc...\nglobal.token = xy...");
    }

    #[test]
    fn scope_wraps_miss_with_caller_name() {
        let (_dir, store) = store_with("svc.a = 1\n");
        let err = store.scoped("poll_inbox").get("svc", "missing").unwrap_err();
        match &err {
            SecretsError::Access { caller, source } => {
                assert_eq!(*caller, "poll_inbox");
                assert!(matches!(**source, SecretsError::SecretNotFound { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("poll_inbox"));
    }

    #[test]
    fn scope_passes_values_through() {
        let (_dir, store) = store_with("svc.a = value\n");
        assert_eq!(store.scoped("job").get("svc", "a").unwrap(), "value");
    }

    #[test]
    fn concurrent_first_access_loads_once() {
        let (_dir, store) = store_with("svc.a = shared\n");
        let store = Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.load().unwrap())
            })
            .collect();

        let tables: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for table in &tables[1..] {
            assert!(Arc::ptr_eq(&tables[0], table));
        }
    }
}
