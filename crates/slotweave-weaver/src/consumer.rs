//! Consumer injector.
//!
//! Each type with wired fields gets a read sequence prepended to its
//! initializers:
//!
//! ```text
//! ldarg   0
//! ldsfld  <slot>
//! stfld   <field>
//! ...one triple per wired field...
//! ...original body...
//! ```
//!
//! Initializers are the type's after-wiring methods when it has any, and
//! otherwise the fallback lifecycle method, created if absent. A type is
//! wired completely or not at all.

use crate::diagnostic::{
    Diagnostic, Location, INVALID_INITIALIZER, MISSING_PROVIDER, SLOT_COLLISION,
    STATIC_WIRED_FIELD,
};
use crate::namer::slot_name;
use crate::scanner::{ConsumerEntry, InitializerEntry, MethodLocation};
use crate::slots::{Resolution, SlotTable};
use rustc_hash::FxHashMap;
use slotweave_bytecode::{Instruction, InstructionBuilder, MethodBody, MethodDef, Module, TypeRef};
use tracing::debug;

/// Stack depth needed by one read sequence
const READ_STACK: u16 = 2;

/// Result of a consumer injection pass
#[derive(Debug, Default)]
pub struct ConsumerReport {
    /// Existing initializers that received read sequences
    pub patched: usize,
    /// Fallback initializers created
    pub created: usize,
    /// Problems found
    pub diagnostics: Vec<Diagnostic>,
}

/// Where a type's wired values go
#[derive(Debug, Clone, PartialEq, Eq)]
enum InitializerPlan {
    /// Nothing to inject
    NoWiredFields,
    /// The type's after-wiring methods, in ascending order
    Explicit(Vec<MethodLocation>),
    /// The fallback lifecycle method
    Fallback,
}

fn plan(consumers: &[ConsumerEntry], initializers: Option<&Vec<InitializerEntry>>) -> InitializerPlan {
    if consumers.is_empty() {
        return InitializerPlan::NoWiredFields;
    }
    match initializers {
        Some(entries) if !entries.is_empty() => {
            let mut sorted: Vec<&InitializerEntry> = entries.iter().collect();
            sorted.sort_by_key(|e| e.order);
            InitializerPlan::Explicit(sorted.into_iter().map(|e| e.method).collect())
        }
        _ => InitializerPlan::Fallback,
    }
}

/// Prefix the initializers of every consuming type with slot reads.
///
/// `consumers` must be in scanner order, so the wired fields of one type are
/// adjacent and in declaration order.
pub fn inject_consumers(
    module: &mut Module,
    table: &SlotTable,
    consumers: &[ConsumerEntry],
    initializers: &[InitializerEntry],
    fallback: &str,
) -> ConsumerReport {
    let mut report = ConsumerReport::default();

    let mut by_type: FxHashMap<usize, Vec<InitializerEntry>> = FxHashMap::default();
    for entry in initializers {
        by_type
            .entry(entry.method.type_index)
            .or_default()
            .push(entry.clone());
    }

    for group in consumers.chunk_by(|a, b| a.field.type_index == b.field.type_index) {
        let type_index = group[0].field.type_index;
        match plan(group, by_type.get(&type_index)) {
            InitializerPlan::NoWiredFields => {}
            InitializerPlan::Explicit(methods) => {
                inject_type(module, table, group, Target::Explicit(methods), &mut report)
            }
            InitializerPlan::Fallback => {
                inject_type(module, table, group, Target::Fallback(fallback), &mut report)
            }
        }
    }

    report
}

enum Target<'a> {
    Explicit(Vec<MethodLocation>),
    Fallback(&'a str),
}

fn inject_type(
    module: &mut Module,
    table: &SlotTable,
    fields: &[ConsumerEntry],
    target: Target<'_>,
    report: &mut ConsumerReport,
) {
    let type_index = fields[0].field.type_index;
    let ty = &module.types[type_index];
    let type_name = ty.full_name();
    let mut failed = false;

    let mut builder = InstructionBuilder::new();
    for entry in fields {
        let field = &ty.fields[entry.field.field_index];
        let location = Location::Field {
            type_name: type_name.clone(),
            field: field.name.clone(),
        };

        if field.is_static() {
            failed = true;
            report.diagnostics.push(Diagnostic::new(
                &STATIC_WIRED_FIELD,
                format!("wired field `{}::{}` is static", type_name, field.name),
                location,
            ));
            continue;
        }

        match table.resolve(&entry.scope, &entry.value_type) {
            Resolution::Found(slot) => {
                builder = builder
                    .load_this()
                    .load_static(slot.clone())
                    .store_field(ty.field_ref(entry.field.field_index));
            }
            Resolution::Missing => {
                failed = true;
                report.diagnostics.push(
                    Diagnostic::new(
                        &MISSING_PROVIDER,
                        format!(
                            "no provider for wired field `{}::{}` of type `{}` in scope `{}`",
                            type_name,
                            field.name,
                            entry.value_type.full_name(),
                            entry.scope
                        ),
                        location,
                    )
                    .with_note(format!(
                        "expected slot `{}`",
                        slot_name(&entry.scope, &entry.value_type)
                    )),
                );
            }
            Resolution::Collision(existing) => {
                failed = true;
                report.diagnostics.push(Diagnostic::new(
                    &SLOT_COLLISION,
                    format!(
                        "wired field `{}::{}` of type `{}` maps to slot `{}`, which holds `{}`",
                        type_name,
                        field.name,
                        entry.value_type.full_name(),
                        slot_name(&entry.scope, &entry.value_type),
                        existing.full_name()
                    ),
                    location,
                ));
            }
        }
    }

    let methods = match &target {
        Target::Explicit(methods) => methods.clone(),
        Target::Fallback(name) => ty
            .methods
            .iter()
            .position(|m| m.name == *name && m.parameters.is_empty())
            .map(|method_index| {
                vec![MethodLocation {
                    type_index,
                    method_index,
                }]
            })
            .unwrap_or_default(),
    };
    for location in &methods {
        let method = &ty.methods[location.method_index];
        let problem = if method.is_static() {
            Some("is static")
        } else if method.body.is_none() {
            Some("has no body")
        } else {
            None
        };
        if let Some(problem) = problem {
            failed = true;
            report.diagnostics.push(Diagnostic::new(
                &INVALID_INITIALIZER,
                format!(
                    "initializer `{}::{}` {}; wired fields cannot be injected",
                    type_name, method.name, problem
                ),
                Location::Method {
                    type_name: type_name.clone(),
                    method: method.name.clone(),
                },
            ));
        }
    }

    if failed {
        debug!(type_name = %type_name, "consumer type left unwired");
        return;
    }

    let reads = builder.build();
    if reads.is_empty() {
        return;
    }

    if methods.is_empty() {
        if let Target::Fallback(name) = target {
            let mut body = reads;
            body.push(Instruction::Ret);
            let mut method = MethodDef::new(name, TypeRef::void());
            let mut method_body = MethodBody::new(body);
            method_body.max_stack = READ_STACK;
            method.body = Some(method_body);
            module.types[type_index].methods.push(method);
            report.created += 1;
            debug!(type_name = %type_name, method = name, "created initializer");
        }
        return;
    }

    for location in methods {
        let method = &mut module.types[type_index].methods[location.method_index];
        let Some(body) = method.body.as_mut() else {
            continue;
        };
        if body.has_injected(&reads) {
            debug!(type_name = %type_name, method = %method.name, "initializer already wired");
            continue;
        }
        body.max_stack = body.max_stack.max(READ_STACK);
        body.editor().prepend(reads.clone());
        report.patched += 1;
        debug!(type_name = %type_name, method = %method.name, fields = fields.len(), "wired initializer");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namer::ScopeId;
    use crate::scanner::{FieldLocation, ProviderEntry};
    use slotweave_bytecode::module::{field_attrs, method_attrs};
    use slotweave_bytecode::{FieldDef, ParamDef, TypeDef};

    const HOLDER: &str = "SlotWeave_Slots";

    /// Module with `App.Bootstrap::Supply(string, int)` under `scope` and
    /// `App.Client` with wired `name: string` and `port: int`.
    fn setup(scope: &ScopeId) -> (Module, SlotTable, Vec<ConsumerEntry>) {
        let mut module = Module::new("App");

        let mut bootstrap = TypeDef::new("App", "Bootstrap");
        let mut supply = MethodDef::new("Supply", TypeRef::void());
        supply.parameters.push(ParamDef::new("name", TypeRef::string()));
        supply.parameters.push(ParamDef::new("port", TypeRef::int32()));
        bootstrap.methods.push(supply);
        module.types.push(bootstrap);

        let mut client = TypeDef::new("App", "Client");
        client.fields.push(FieldDef::new("name", TypeRef::string()));
        client.fields.push(FieldDef::new("port", TypeRef::int32()));
        module.types.push(client);

        let providers: Vec<ProviderEntry> = [TypeRef::string(), TypeRef::int32()]
            .into_iter()
            .enumerate()
            .map(|(i, value_type)| ProviderEntry {
                scope: scope.clone(),
                value_type,
                method: MethodLocation {
                    type_index: 0,
                    method_index: 0,
                },
                param_index: i,
            })
            .collect();
        let (table, _) = SlotTable::build(&mut module, HOLDER, &providers);

        let consumers = vec![
            consumer(scope, TypeRef::string(), 0),
            consumer(scope, TypeRef::int32(), 1),
        ];
        (module, table, consumers)
    }

    fn consumer(scope: &ScopeId, value_type: TypeRef, field_index: usize) -> ConsumerEntry {
        ConsumerEntry {
            scope: scope.clone(),
            value_type,
            field: FieldLocation {
                type_index: 1,
                field_index,
            },
        }
    }

    fn add_method(module: &mut Module, name: &str, body: Vec<Instruction>) -> InitializerEntry {
        let mut method = MethodDef::new(name, TypeRef::void());
        method.body = Some(MethodBody::new(body));
        let client = &mut module.types[1];
        client.methods.push(method);
        InitializerEntry {
            method: MethodLocation {
                type_index: 1,
                method_index: client.methods.len() - 1,
            },
            order: 0,
        }
    }

    fn assert_reads(instrs: &[Instruction]) {
        assert_eq!(instrs[0], Instruction::LdArg(0));
        assert!(matches!(&instrs[1], Instruction::LdSFld(f) if f.name == "Global_std_String"));
        assert!(matches!(&instrs[2], Instruction::StFld(f) if f.name == "name"));
        assert_eq!(instrs[3], Instruction::LdArg(0));
        assert!(matches!(&instrs[4], Instruction::LdSFld(f) if f.name == "Global_std_Int32"));
        assert!(matches!(&instrs[5], Instruction::StFld(f) if f.name == "port"));
    }

    #[test]
    fn test_plan_states() {
        let scope = ScopeId::global();
        assert_eq!(plan(&[], None), InitializerPlan::NoWiredFields);

        let fields = vec![consumer(&scope, TypeRef::string(), 0)];
        assert_eq!(plan(&fields, None), InitializerPlan::Fallback);
        assert_eq!(plan(&fields, Some(&Vec::new())), InitializerPlan::Fallback);

        let at = |method_index| MethodLocation {
            type_index: 1,
            method_index,
        };
        let inits = vec![
            InitializerEntry {
                method: at(0),
                order: 2,
            },
            InitializerEntry {
                method: at(1),
                order: -1,
            },
            InitializerEntry {
                method: at(2),
                order: 2,
            },
        ];
        assert_eq!(
            plan(&fields, Some(&inits)),
            InitializerPlan::Explicit(vec![at(1), at(0), at(2)])
        );
    }

    #[test]
    fn test_creates_fallback_initializer() {
        let (mut module, table, consumers) = setup(&ScopeId::global());

        let report = inject_consumers(&mut module, &table, &consumers, &[], "Awake");
        assert!(report.diagnostics.is_empty());
        assert_eq!(report.created, 1);
        assert_eq!(report.patched, 0);

        let awake = module.types[1].method("Awake").unwrap();
        assert!(!awake.is_static());
        assert_eq!(awake.attributes & method_attrs::PUBLIC, 0);
        assert!(awake.parameters.is_empty());
        let instrs = &awake.body.as_ref().unwrap().instructions;
        assert_eq!(instrs.len(), 7);
        assert_reads(instrs);
        assert_eq!(instrs[6], Instruction::Ret);
    }

    #[test]
    fn test_prefixes_existing_fallback() {
        let (mut module, table, consumers) = setup(&ScopeId::global());
        add_method(&mut module, "Awake", vec![Instruction::Nop, Instruction::Ret]);

        let report = inject_consumers(&mut module, &table, &consumers, &[], "Awake");
        assert_eq!(report.patched, 1);
        assert_eq!(report.created, 0);
        assert_eq!(module.types[1].methods.len(), 1);

        let instrs = &module.types[1].methods[0].body.as_ref().unwrap().instructions;
        assert_reads(instrs);
        assert_eq!(&instrs[6..], &[Instruction::Nop, Instruction::Ret]);
    }

    #[test]
    fn test_explicit_initializers_each_receive_all_fields() {
        let (mut module, table, consumers) = setup(&ScopeId::global());
        let first = add_method(&mut module, "OnReady", vec![Instruction::Ret]);
        let second = add_method(&mut module, "OnWired", vec![Instruction::Ret]);

        let report = inject_consumers(&mut module, &table, &consumers, &[first, second], "Awake");
        assert_eq!(report.patched, 2);
        assert_eq!(report.created, 0);
        assert!(module.types[1].method("Awake").is_none());

        for method in &module.types[1].methods {
            let instrs = &method.body.as_ref().unwrap().instructions;
            assert_eq!(instrs.len(), 7);
            assert_reads(instrs);
        }
    }

    #[test]
    fn test_second_pass_is_noop() {
        let (mut module, table, consumers) = setup(&ScopeId::global());
        inject_consumers(&mut module, &table, &consumers, &[], "Awake");
        let once = module.clone();

        let report = inject_consumers(&mut module, &table, &consumers, &[], "Awake");
        assert_eq!(report.patched, 0);
        assert_eq!(report.created, 0);
        assert_eq!(module, once);
    }

    #[test]
    fn test_missing_provider_leaves_type_unwired() {
        let (mut module, table, mut consumers) = setup(&ScopeId::global());
        module.types[1]
            .fields
            .push(FieldDef::new("clock", TypeRef::new("Lib", "Clock")));
        consumers.push(consumer(&ScopeId::global(), TypeRef::new("Lib", "Clock"), 2));
        add_method(&mut module, "Awake", vec![Instruction::Ret]);

        let report = inject_consumers(&mut module, &table, &consumers, &[], "Awake");
        assert_eq!(report.patched, 0);
        assert_eq!(report.diagnostics.len(), 1);

        let diag = &report.diagnostics[0];
        assert_eq!(diag.code, "SW0004");
        assert!(diag.message.contains("App.Client::clock"));
        assert!(diag.message.contains("Lib.Clock"));
        assert!(diag.message.contains("Global"));
        assert_eq!(
            module.types[1].methods[0].body.as_ref().unwrap().instructions,
            vec![Instruction::Ret]
        );
    }

    #[test]
    fn test_scope_mismatch_is_missing_provider() {
        let request = ScopeId::from_marker(&TypeRef::new("App", "RequestScope"));
        let (mut module, table, _) = setup(&ScopeId::global());
        let consumers = vec![consumer(&request, TypeRef::string(), 0)];

        let report = inject_consumers(&mut module, &table, &consumers, &[], "Awake");
        assert_eq!(report.diagnostics[0].code, "SW0004");
        assert!(module.types[1].method("Awake").is_none());
    }

    #[test]
    fn test_sanitization_collision_on_wired_field() {
        let global = ScopeId::global();
        let (mut module, _, mut consumers) = setup(&global);
        let held = ProviderEntry {
            scope: global.clone(),
            value_type: TypeRef::new("A", "B_C"),
            method: MethodLocation {
                type_index: 0,
                method_index: 0,
            },
            param_index: 0,
        };
        let (table, diags) = SlotTable::build(&mut module, HOLDER, &[held]);
        assert!(diags.is_empty());

        module.types[1]
            .fields
            .push(FieldDef::new("conn", TypeRef::new("A_B", "C")));
        consumers.push(consumer(&global, TypeRef::new("A_B", "C"), 2));
        add_method(&mut module, "Awake", vec![Instruction::Ret]);

        let report = inject_consumers(&mut module, &table, &consumers, &[], "Awake");
        assert_eq!(report.patched, 0);
        assert_eq!(report.diagnostics.len(), 1);

        let diag = &report.diagnostics[0];
        assert_eq!(diag.code, "SW0005");
        assert!(diag.message.contains("App.Client::conn"));
        assert!(diag.message.contains("Global_A_B_C"));
        assert!(diag.message.contains("A.B_C"));
        assert_eq!(
            module.types[1].methods[0].body.as_ref().unwrap().instructions,
            vec![Instruction::Ret]
        );
    }

    #[test]
    fn test_static_field_and_static_initializer_rejected() {
        let (mut module, table, consumers) = setup(&ScopeId::global());
        module.types[1].fields[0].attributes |= field_attrs::STATIC;
        let init = add_method(&mut module, "OnWired", vec![Instruction::Ret]);
        module.types[1].methods[0].attributes |= method_attrs::STATIC;

        let report = inject_consumers(&mut module, &table, &consumers, &[init], "Awake");
        let codes: Vec<&str> = report.diagnostics.iter().map(|d| d.code).collect();
        assert_eq!(codes, vec!["SW0007", "SW0008"]);
        assert_eq!(report.patched, 0);
    }

    #[test]
    fn test_bodyless_fallback_rejected() {
        let (mut module, table, consumers) = setup(&ScopeId::global());
        add_method(&mut module, "Awake", vec![]);
        module.types[1].methods[0].body = None;

        let report = inject_consumers(&mut module, &table, &consumers, &[], "Awake");
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].code, "SW0008");
        assert_eq!(report.created, 0);
    }

    #[test]
    fn test_initializers_without_wired_fields_untouched() {
        let (mut module, table, _) = setup(&ScopeId::global());
        let init = add_method(&mut module, "OnWired", vec![Instruction::Ret]);
        let before = module.clone();

        let report = inject_consumers(&mut module, &table, &[], &[init], "Awake");
        assert_eq!(report.patched, 0);
        assert_eq!(module, before);
    }
}
