//! Property filtering for list operations.
//!
//! List operations such as `pools` accept an optional `search_key` and
//! `search_value`. Record types describe which properties can be searched
//! and how each renders for comparison.

use crate::error::{LsmError, error_number};

/// A record that list operations can filter by property.
pub trait SearchableRecord {
    /// Property names accepted as search keys.
    const SEARCH_KEYS: &'static [&'static str];

    /// Returns the textual value of `key`, or `None` when the record has no
    /// value for it.
    fn search_value(&self, key: &str) -> Option<String>;
}

/// Keeps the records whose `key` property equals `value`.
///
/// With no key the records are returned unchanged.
///
/// # Errors
///
/// Returns [`error_number::UNSUPPORTED_SEARCH_KEY`] when `key` is not one of
/// `T::SEARCH_KEYS`.
///
/// # Examples
///
/// ```
/// use lsm_plugin::{SearchableRecord, search_property};
///
/// struct Pool {
///     id: &'static str,
/// }
///
/// impl SearchableRecord for Pool {
///     const SEARCH_KEYS: &'static [&'static str] = &["id"];
///
///     fn search_value(&self, key: &str) -> Option<String> {
///         (key == "id").then(|| self.id.to_owned())
///     }
/// }
///
/// let pools = vec![Pool { id: "p1" }, Pool { id: "p2" }];
/// let found = search_property(pools, Some("id"), Some("p2")).unwrap();
/// assert_eq!(found.len(), 1);
/// ```
pub fn search_property<T: SearchableRecord>(
    records: Vec<T>,
    key: Option<&str>,
    value: Option<&str>,
) -> Result<Vec<T>, LsmError> {
    let Some(search_key) = key else {
        return Ok(records);
    };
    if !T::SEARCH_KEYS.contains(&search_key) {
        return Err(LsmError::new(
            error_number::UNSUPPORTED_SEARCH_KEY,
            format!("Unsupported search_key: '{search_key}'"),
        ));
    }
    Ok(records
        .into_iter()
        .filter(|record| record.search_value(search_key).as_deref() == value)
        .collect())
}
