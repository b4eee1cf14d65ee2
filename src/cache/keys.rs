//! Cache key derivation.

use crate::constants::KEY_SEPARATOR;

/// Key of one batch item: `prefix:id`
pub fn batch_key(key_prefix: &str, id: &str) -> String {
    format!("{key_prefix}{KEY_SEPARATOR}{id}")
}

/// Keys for every identifier, in order
pub fn batch_keys(key_prefix: &str, ids: &[String]) -> Vec<String> {
    ids.iter().map(|id| batch_key(key_prefix, id)).collect()
}

/// Key of a single entry: the bare prefix without an id, `prefix:id` otherwise
pub fn single_key(key_prefix: &str, id: Option<&str>) -> String {
    match id {
        Some(id) => batch_key(key_prefix, id),
        None => key_prefix.to_string(),
    }
}
