//! Entity-name equivalence: "invoice" and "invoices" name the same entity

use inflector::Inflector;

/// Decides whether two table or column stems name the same entity.
///
/// Implementations must be symmetric.
pub trait EntityNameEquivalence {
    fn equivalent(&self, a: &str, b: &str) -> bool;
}

impl<F> EntityNameEquivalence for F
where
    F: Fn(&str, &str) -> bool,
{
    fn equivalent(&self, a: &str, b: &str) -> bool {
        self(a, b)
    }
}

/// Case-insensitive comparison of singular and plural forms
#[derive(Debug, Clone, Copy, Default)]
pub struct InflectorEquivalence;

impl EntityNameEquivalence for InflectorEquivalence {
    fn equivalent(&self, a: &str, b: &str) -> bool {
        let a = a.to_lowercase();
        let b = b.to_lowercase();
        a == b || a.to_singular() == b.to_singular() || a.to_plural() == b.to_plural()
    }
}
