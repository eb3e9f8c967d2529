//! Weave diagnostics.
//!
//! Every declared provider or consumer either resolves or produces one of
//! these. Each diagnostic kind has static metadata ([`DiagnosticKind`]) with
//! a stable code, so hosts can filter or escalate by code.

use serde::Serialize;
use std::fmt;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Reported, but the module is still written.
    Warning,
    /// The module's weave failed; the host should not ship it.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => f.write_str("warning"),
            Severity::Error => f.write_str("error"),
        }
    }
}

/// Static metadata for a diagnostic kind.
pub struct DiagnosticKind {
    /// Kind name, e.g. "missing-provider".
    pub name: &'static str,
    /// Stable code, e.g. "SW0004".
    pub code: &'static str,
    /// Severity this kind is always reported at.
    pub severity: Severity,
}

/// Scope argument on a provider or consumer marker is not a type.
pub static MALFORMED_SCOPE: DiagnosticKind = DiagnosticKind {
    name: "malformed-scope",
    code: "SW0001",
    severity: Severity::Error,
};

/// Order argument on an after-wiring marker is not an integer.
pub static MALFORMED_ORDER: DiagnosticKind = DiagnosticKind {
    name: "malformed-order",
    code: "SW0002",
    severity: Severity::Error,
};

/// A provider parameter has no slot to publish into.
pub static MISSING_SLOT: DiagnosticKind = DiagnosticKind {
    name: "missing-slot",
    code: "SW0003",
    severity: Severity::Error,
};

/// A wired field has no provider for its (scope, type) pair.
pub static MISSING_PROVIDER: DiagnosticKind = DiagnosticKind {
    name: "missing-provider",
    code: "SW0004",
    severity: Severity::Error,
};

/// Two distinct value types sanitize to the same slot name.
pub static SLOT_COLLISION: DiagnosticKind = DiagnosticKind {
    name: "slot-collision",
    code: "SW0005",
    severity: Severity::Error,
};

/// A provider method has no body to patch.
pub static PROVIDER_WITHOUT_BODY: DiagnosticKind = DiagnosticKind {
    name: "provider-without-body",
    code: "SW0006",
    severity: Severity::Warning,
};

/// A wired field is static.
pub static STATIC_WIRED_FIELD: DiagnosticKind = DiagnosticKind {
    name: "static-wired-field",
    code: "SW0007",
    severity: Severity::Error,
};

/// An initializer cannot receive injected reads.
pub static INVALID_INITIALIZER: DiagnosticKind = DiagnosticKind {
    name: "invalid-initializer",
    code: "SW0008",
    severity: Severity::Error,
};

/// A provider parameter lies beyond the addressable argument range.
pub static ARGUMENT_OUT_OF_RANGE: DiagnosticKind = DiagnosticKind {
    name: "argument-out-of-range",
    code: "SW0009",
    severity: Severity::Error,
};

/// Where a diagnostic points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Location {
    /// The module as a whole.
    Module {
        /// Module name.
        module: String,
    },
    /// A type declaration.
    Type {
        /// Type full name.
        type_name: String,
    },
    /// A method declaration.
    Method {
        /// Declaring type full name.
        type_name: String,
        /// Method name.
        method: String,
    },
    /// A field declaration.
    Field {
        /// Declaring type full name.
        type_name: String,
        /// Field name.
        field: String,
    },
    /// A method parameter.
    Parameter {
        /// Declaring type full name.
        type_name: String,
        /// Method name.
        method: String,
        /// Parameter name.
        parameter: String,
    },
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Module { module } => write!(f, "module {}", module),
            Location::Type { type_name } => f.write_str(type_name),
            Location::Method { type_name, method } => write!(f, "{}::{}", type_name, method),
            Location::Field { type_name, field } => write!(f, "{}::{}", type_name, field),
            Location::Parameter {
                type_name,
                method,
                parameter,
            } => write!(f, "{}::{}({})", type_name, method, parameter),
        }
    }
}

/// A single diagnostic produced during a weave pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Kind name (e.g. "missing-provider").
    pub name: &'static str,
    /// Stable code (e.g. "SW0004").
    pub code: &'static str,
    /// Severity level.
    pub severity: Severity,
    /// Human-readable message.
    pub message: String,
    /// Declaration the diagnostic is attached to.
    pub location: Location,
    /// Additional notes.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl Diagnostic {
    /// Create a diagnostic of the given kind.
    pub fn new(kind: &DiagnosticKind, message: impl Into<String>, location: Location) -> Self {
        Self {
            name: kind.name,
            code: kind.code,
            severity: kind.severity,
            message: message.into(),
            location,
            notes: Vec::new(),
        }
    }

    /// Attach a note.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Whether this diagnostic fails the weave.
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}]: {} ({})",
            self.severity, self.code, self.message, self.location
        )
    }
}

/// Whether any diagnostic in the list is an error.
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}
