//! Declaration scanner.
//!
//! A single read-only pass over a module that turns marker attributes into
//! typed records. Records point back into the module by index; the later
//! phases only ever append types and methods, so the indices stay valid for
//! the whole weave.

use crate::config::Markers;
use crate::diagnostic::{Diagnostic, Location, MALFORMED_ORDER, MALFORMED_SCOPE};
use crate::namer::ScopeId;
use slotweave_bytecode::{AttributeArg, CustomAttribute, Module, TypeRef};
use tracing::debug;

/// Position of a method in a module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodLocation {
    /// Index into `Module::types`
    pub type_index: usize,
    /// Index into `TypeDef::methods`
    pub method_index: usize,
}

/// Position of a field in a module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldLocation {
    /// Index into `Module::types`
    pub type_index: usize,
    /// Index into `TypeDef::fields`
    pub field_index: usize,
}

/// One provided value: a single parameter of a provider method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEntry {
    /// Scope the value is published under
    pub scope: ScopeId,
    /// Declared parameter type
    pub value_type: TypeRef,
    /// Provider method
    pub method: MethodLocation,
    /// Parameter position, excluding the receiver
    pub param_index: usize,
}

/// One wired field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerEntry {
    /// Scope the value is read from
    pub scope: ScopeId,
    /// Declared field type
    pub value_type: TypeRef,
    /// The field
    pub field: FieldLocation,
}

/// A method marked to run after wiring
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitializerEntry {
    /// The method
    pub method: MethodLocation,
    /// Relative order among the type's initializers
    pub order: i32,
}

/// Everything the scanner found, in module declaration order
#[derive(Debug, Clone, Default)]
pub struct Declarations {
    /// Provider entries, one per parameter of every provider method
    pub providers: Vec<ProviderEntry>,
    /// Consumer entries, one per wired field
    pub consumers: Vec<ConsumerEntry>,
    /// Explicit initializers
    pub initializers: Vec<InitializerEntry>,
    /// Malformed-marker diagnostics
    pub diagnostics: Vec<Diagnostic>,
}

impl Declarations {
    /// Whether nothing was declared
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty() && self.consumers.is_empty()
    }
}

/// Scan `module` for marker attributes.
pub fn scan(module: &Module, markers: &Markers) -> Declarations {
    let mut decls = Declarations::default();

    for (type_index, ty) in module.types.iter().enumerate() {
        let type_name = ty.full_name();

        for (method_index, method) in ty.methods.iter().enumerate() {
            let location = MethodLocation {
                type_index,
                method_index,
            };

            if let Some(attr) = method.attribute(&markers.provider) {
                match scope_argument(attr) {
                    Some(scope) => {
                        for (param_index, param) in method.parameters.iter().enumerate() {
                            decls.providers.push(ProviderEntry {
                                scope: scope.clone(),
                                value_type: param.param_type.clone(),
                                method: location,
                                param_index,
                            });
                        }
                    }
                    None => decls.diagnostics.push(
                        Diagnostic::new(
                            &MALFORMED_SCOPE,
                            format!(
                                "provider `{}::{}` has a scope argument that is not a type",
                                type_name, method.name
                            ),
                            Location::Method {
                                type_name: type_name.clone(),
                                method: method.name.clone(),
                            },
                        )
                        .with_note("the provider is ignored"),
                    ),
                }
            }

            if let Some(attr) = method.attribute(&markers.after_wired) {
                match order_argument(attr) {
                    Some(order) => decls.initializers.push(InitializerEntry {
                        method: location,
                        order,
                    }),
                    None => decls.diagnostics.push(Diagnostic::new(
                        &MALFORMED_ORDER,
                        format!(
                            "initializer `{}::{}` has an order argument that is not an integer",
                            type_name, method.name
                        ),
                        Location::Method {
                            type_name: type_name.clone(),
                            method: method.name.clone(),
                        },
                    )),
                }
            }
        }

        for (field_index, field) in ty.fields.iter().enumerate() {
            let Some(attr) = field.attribute(&markers.consumer) else {
                continue;
            };
            match scope_argument(attr) {
                Some(scope) => decls.consumers.push(ConsumerEntry {
                    scope,
                    value_type: field.field_type.clone(),
                    field: FieldLocation {
                        type_index,
                        field_index,
                    },
                }),
                None => decls.diagnostics.push(Diagnostic::new(
                    &MALFORMED_SCOPE,
                    format!(
                        "wired field `{}::{}` has a scope argument that is not a type",
                        type_name, field.name
                    ),
                    Location::Field {
                        type_name: type_name.clone(),
                        field: field.name.clone(),
                    },
                )),
            }
        }
    }

    debug!(
        module = module.name(),
        providers = decls.providers.len(),
        consumers = decls.consumers.len(),
        initializers = decls.initializers.len(),
        "scanned declarations"
    );
    decls
}

/// Scope named by a provider or consumer marker; `None` when malformed
fn scope_argument(attr: &CustomAttribute) -> Option<ScopeId> {
    match attr.args.first() {
        None => Some(ScopeId::global()),
        Some(AttributeArg::Type(marker)) => Some(ScopeId::from_marker(marker)),
        Some(_) => None,
    }
}

/// Order named by an after-wiring marker; `None` when malformed
fn order_argument(attr: &CustomAttribute) -> Option<i32> {
    match attr.args.first() {
        None => Some(0),
        Some(AttributeArg::Int(order)) => Some(*order),
        Some(_) => None,
    }
}
