//! Central defaulting for wire fields.
//!
//! Backends are inconsistent about absent collections: some omit the key, some send `null`.
//! Collection fields use `#[serde(default, deserialize_with = "lenient::null_default")]` so both
//! forms resolve to an empty value and the builder never has to distinguish them.

use serde::{Deserialize, Deserializer};

/// Deserialise `T`, mapping an explicit `null` to `T::default()`.
pub fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
