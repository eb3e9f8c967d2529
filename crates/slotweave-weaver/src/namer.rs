//! Slot naming.
//!
//! One pure function, [`slot_name`], maps a (scope, value type) pair to the
//! name of the static field holding it. The slot table builder and both
//! injectors go through it, so a provider and a consumer of the same pair
//! always agree on the field.
//!
//! Scope identity is structural: it is the marker type's short name with the
//! `Scope` suffix removed, so `App.RequestScope` and `Other.RequestScope`
//! share slots. Changing this to qualified-name identity would change which
//! declarations are co-scoped.

use slotweave_bytecode::TypeRef;
use std::fmt;

/// Suffix stripped from scope marker names.
pub const SCOPE_SUFFIX: &str = "Scope";

/// Scope identity used when a marker carries no scope argument.
pub const GLOBAL_SCOPE: &str = "Global";

/// Characters of a fully qualified type name that cannot appear in a field name.
const SEPARATORS: &[char] = &['.', '/', '<', '>', ',', ' '];

/// Scope identity: the string two declarations must share to be wired together.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(String);

impl ScopeId {
    /// The default scope.
    pub fn global() -> Self {
        Self(GLOBAL_SCOPE.to_string())
    }

    /// Identity of a scope marker type.
    pub fn from_marker(marker: &TypeRef) -> Self {
        let name = marker.short_name();
        Self(name.strip_suffix(SCOPE_SUFFIX).unwrap_or(name).to_string())
    }

    /// The identity string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sanitize a fully qualified type name into an identifier fragment.
///
/// Different names can sanitize to the same fragment (`A.B_C` and `A_B.C`);
/// the slot table builder reports that as a collision.
pub fn sanitize_type_name(full_name: &str) -> String {
    full_name.replace(SEPARATORS, "_")
}

/// Canonical slot name for a (scope, value type) pair.
pub fn slot_name(scope: &ScopeId, value_type: &TypeRef) -> String {
    format!("{}_{}", scope, sanitize_type_name(&value_type.full_name()))
}
