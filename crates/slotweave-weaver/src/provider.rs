//! Provider injector.
//!
//! Every provider method publishes its parameters into their slots before
//! its original body runs:
//!
//! ```text
//! ldarg   <p0>
//! stsfld  <slot for p0>
//! ldarg   <p1>
//! stsfld  <slot for p1>
//! ...original body...
//! ```
//!
//! A method is patched as a whole or not at all. A method that is also an
//! initializer ends up with the consumer reads in front of its stores, so
//! re-runs look for the stores anywhere in the injected prefix.

use crate::diagnostic::{
    Diagnostic, Location, ARGUMENT_OUT_OF_RANGE, MISSING_SLOT, PROVIDER_WITHOUT_BODY,
};
use crate::scanner::ProviderEntry;
use crate::slots::{Resolution, SlotTable};
use slotweave_bytecode::{InstructionBuilder, Module};
use tracing::{debug, warn};

/// Stack depth needed by one store sequence
const STORE_STACK: u16 = 1;

/// Result of a provider injection pass
#[derive(Debug, Default)]
pub struct ProviderReport {
    /// Methods that received store sequences
    pub patched: usize,
    /// Problems found
    pub diagnostics: Vec<Diagnostic>,
}

/// Prefix every provider method with stores of its parameters.
///
/// `providers` must be in scanner order, so that the entries of one method
/// are adjacent and in parameter order.
pub fn inject_providers(
    module: &mut Module,
    table: &SlotTable,
    providers: &[ProviderEntry],
) -> ProviderReport {
    let mut report = ProviderReport::default();

    for group in providers.chunk_by(|a, b| a.method == b.method) {
        let location = group[0].method;
        let ty = &module.types[location.type_index];
        let type_name = ty.full_name();
        let method = &ty.methods[location.method_index];

        if method.body.is_none() {
            let diagnostic = Diagnostic::new(
                &PROVIDER_WITHOUT_BODY,
                format!(
                    "provider `{}::{}` has no body; its values are never published",
                    type_name, method.name
                ),
                Location::Method {
                    type_name,
                    method: method.name.clone(),
                },
            );
            warn!("{}", diagnostic);
            report.diagnostics.push(diagnostic);
            continue;
        }

        let mut builder = InstructionBuilder::new();
        let mut complete = true;
        for entry in group {
            let parameter = || {
                method
                    .parameters
                    .get(entry.param_index)
                    .map(|p| p.name.clone())
                    .unwrap_or_default()
            };
            match table.resolve(&entry.scope, &entry.value_type) {
                Resolution::Found(slot) => match method.arg_index(entry.param_index) {
                    Some(arg) => builder = builder.load_arg(arg).store_static(slot.clone()),
                    None => {
                        complete = false;
                        report.diagnostics.push(Diagnostic::new(
                            &ARGUMENT_OUT_OF_RANGE,
                            format!(
                                "provider `{}::{}` parameter {} cannot be addressed by `ldarg`",
                                type_name, method.name, entry.param_index
                            ),
                            Location::Parameter {
                                type_name: type_name.clone(),
                                method: method.name.clone(),
                                parameter: parameter(),
                            },
                        ));
                    }
                },
                Resolution::Missing => {
                    complete = false;
                    report.diagnostics.push(Diagnostic::new(
                        &MISSING_SLOT,
                        format!(
                            "provider `{}::{}` has no slot for `{}` in scope `{}`",
                            type_name,
                            method.name,
                            entry.value_type.full_name(),
                            entry.scope
                        ),
                        Location::Parameter {
                            type_name: type_name.clone(),
                            method: method.name.clone(),
                            parameter: parameter(),
                        },
                    ));
                }
                // Reported when the slot table was built.
                Resolution::Collision(_) => complete = false,
            }
        }
        if !complete {
            debug!(method = %format!("{}::{}", type_name, method.name), "provider left unpatched");
            continue;
        }

        let stores = builder.build();
        let method_name = method.name.clone();
        let Some(body) = module.types[location.type_index].methods[location.method_index]
            .body
            .as_mut()
        else {
            continue;
        };
        if body.has_injected(&stores) {
            debug!(method = %format!("{}::{}", type_name, method_name), "provider already patched");
            continue;
        }

        body.max_stack = body.max_stack.max(STORE_STACK);
        body.editor().prepend(stores);
        report.patched += 1;
        debug!(
            method = %format!("{}::{}", type_name, method_name),
            values = group.len(),
            "patched provider"
        );
    }

    report
}
