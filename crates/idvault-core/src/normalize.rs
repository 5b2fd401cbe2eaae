//! Case folding for normalized lookup fields and value equality.
//!
//! Stores never consult a global collation. They carry a [`Normalizer`]
//! and use it to derive `normalized_*` fields, so lookups behave the same
//! regardless of database or process locale.

/// Folds a display value into its normalized lookup form.
pub trait Normalizer: Send + Sync {
    fn normalize(&self, value: &str) -> String;
}

/// Locale-neutral Unicode lower-casing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaseFold;

impl Normalizer for CaseFold {
    fn normalize(&self, value: &str) -> String {
        value.to_lowercase()
    }
}

impl<F> Normalizer for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn normalize(&self, value: &str) -> String {
        self(value)
    }
}

/// Case-insensitive string comparison.
///
/// Folds with `str::to_lowercase`, the same function behind [`CaseFold`]
/// and SurrealQL's `string::lowercase`, so in-memory equality and database
/// filters agree on context-sensitive letters such as a word-final `Σ`.
pub fn fold_eq(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

/// Feeds the case-folded form of `value` into `state`, consistent with
/// [`fold_eq`].
pub fn fold_hash<H: std::hash::Hasher>(value: &str, state: &mut H) {
    use std::hash::Hash;

    state.write(value.to_lowercase().as_bytes());
    // Terminator so ("ab", "c") and ("a", "bc") hash differently.
    0xffu8.hash(state);
}
