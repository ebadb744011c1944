//! Line parser for the credential file format.
//!
//! One entry per line, `name = value`. Blank lines and `#` comments are
//! skipped. Names may contain word characters, dots, and hyphens; the
//! first dot (only) splits a name into `service.key`, so `a.b.c = v`
//! lands under service `a` with key `b.c`. A bare name is stored in the
//! reserved global namespace.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;

use super::{CredentialTable, SecretsError, GLOBAL_NAMESPACE};

static ENTRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([\w.\-]+)\s*=\s*(.+)$").unwrap());

/// Parse decoded file content into a credential table.
///
/// Fails on the first malformed line with its 1-based number and raw
/// text; the caller discards everything, so no partial table survives.
pub fn parse_table(content: &str) -> Result<CredentialTable, SecretsError> {
    let mut table = CredentialTable::new();

    for (idx, raw_line) in content.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let caps = ENTRY_RE.captures(line).ok_or_else(|| SecretsError::Parse {
            line: idx + 1,
            content: line.to_string(),
        })?;
        let name = &caps[1];
        let value = caps[2].trim().to_string();

        let (service, key) = match name.split_once('.') {
            Some((service, key)) => (service, key),
            None => (GLOBAL_NAMESPACE, name),
        };
        table
            .entry(service.to_string())
            .or_insert_with(IndexMap::new)
            .insert(key.to_string(), value);
    }

    Ok(table)
}
