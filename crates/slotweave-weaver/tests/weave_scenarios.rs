//! End-to-end weave scenarios over hand-built modules

use slotweave_bytecode::module::{flags, method_attrs};
use slotweave_bytecode::{
    verify_module, AttributeArg, CustomAttribute, FieldDef, Instruction, MethodBody, MethodDef,
    Module, ParamDef, TypeDef, TypeRef,
};
use slotweave_weaver::{EligibilityList, PostProcessor, ProcessResult, Weaver, WeaverConfig};

const HOLDER: &str = "SlotWeave_Slots";

fn service(scope: Option<&str>) -> CustomAttribute {
    let attr = CustomAttribute::new(TypeRef::new("SlotWeave", "ServiceAttribute"));
    match scope {
        Some(name) => attr.with_arg(AttributeArg::Type(TypeRef::new("App", name))),
        None => attr,
    }
}

fn wired(scope: Option<&str>) -> CustomAttribute {
    let attr = CustomAttribute::new(TypeRef::new("SlotWeave", "WiredAttribute"));
    match scope {
        Some(name) => attr.with_arg(AttributeArg::Type(TypeRef::new("App", name))),
        None => attr,
    }
}

fn after_wired(order: i32) -> CustomAttribute {
    CustomAttribute::new(TypeRef::new("SlotWeave", "AfterWiredAttribute"))
        .with_arg(AttributeArg::Int(order))
}

fn bootstrap(scope: Option<&str>) -> TypeDef {
    let mut ty = TypeDef::new("App", "Bootstrap");
    let mut supply = MethodDef::new("Supply", TypeRef::void());
    supply.attributes = method_attrs::PUBLIC | method_attrs::STATIC;
    supply.parameters.push(ParamDef::new("name", TypeRef::string()));
    supply.parameters.push(ParamDef::new("port", TypeRef::int32()));
    supply.custom_attributes.push(service(scope));
    supply.body = Some(MethodBody::new(vec![Instruction::Nop, Instruction::Ret]));
    ty.methods.push(supply);
    ty
}

fn client(scope: Option<&str>) -> TypeDef {
    let mut ty = TypeDef::new("App", "Client");
    let mut name = FieldDef::new("name", TypeRef::string());
    name.custom_attributes.push(wired(scope));
    let mut port = FieldDef::new("port", TypeRef::int32());
    port.custom_attributes.push(wired(scope));
    ty.fields.push(name);
    ty.fields.push(FieldDef::new("unwired", TypeRef::boolean()));
    ty.fields.push(port);
    ty
}

fn module(types: Vec<TypeDef>) -> Module {
    let mut module = Module::new("Application");
    module.types = types;
    module
}

fn weaver() -> Weaver {
    Weaver::with_eligible(
        WeaverConfig::default(),
        EligibilityList::from_names(["Application"]),
    )
}

fn body<'a>(result: &'a ProcessResult, type_name: &str, method: &str) -> &'a [Instruction] {
    &result
        .module
        .find_type(type_name)
        .and_then(|t| t.method(method))
        .and_then(|m| m.body.as_ref())
        .expect("method with body")
        .instructions
}

fn slot_reads(instrs: &[Instruction]) -> Vec<(String, String)> {
    instrs
        .chunks(3)
        .map(|c| match c {
            [Instruction::LdArg(0), Instruction::LdSFld(slot), Instruction::StFld(field)] => {
                (slot.name.clone(), field.name.clone())
            }
            other => panic!("not a read sequence: {:?}", other),
        })
        .collect()
}

#[test]
fn test_config_scope_scenario() {
    let result = weaver().process(module(vec![
        bootstrap(Some("ConfigScope")),
        client(Some("ConfigScope")),
    ]));
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);

    let holder = result.module.find_type(HOLDER).expect("holder type");
    let slots: Vec<&str> = holder.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(slots, vec!["Config_std_String", "Config_std_Int32"]);

    let supply = body(&result, "App.Bootstrap", "Supply");
    assert_eq!(supply.len(), 6);
    assert_eq!(supply[0], Instruction::LdArg(0));
    assert!(matches!(&supply[1], Instruction::StSFld(f) if f.name == "Config_std_String"));
    assert_eq!(supply[2], Instruction::LdArg(1));
    assert!(matches!(&supply[3], Instruction::StSFld(f) if f.name == "Config_std_Int32"));
    assert_eq!(&supply[4..], &[Instruction::Nop, Instruction::Ret]);

    let awake = body(&result, "App.Client", "Awake");
    assert_eq!(awake.len(), 7);
    assert_eq!(
        slot_reads(&awake[..6]),
        vec![
            ("Config_std_String".to_string(), "name".to_string()),
            ("Config_std_Int32".to_string(), "port".to_string()),
        ]
    );
    assert_eq!(awake[6], Instruction::Ret);

    assert_eq!(result.stats.slots_created, 2);
    assert_eq!(result.stats.providers_patched, 1);
    assert_eq!(result.stats.initializers_created, 1);
    assert_eq!(result.stats.initializers_patched, 0);
    assert_ne!(result.module.flags & flags::WOVEN, 0);

    verify_module(&result.module).expect("woven module verifies");
}

#[test]
fn test_default_scope_is_global() {
    let result = weaver().process(module(vec![bootstrap(None), client(None)]));
    assert!(!result.has_errors());

    let holder = result.module.find_type(HOLDER).unwrap();
    assert!(holder.field("Global_std_String").is_some());
    assert!(holder.field("Global_std_Int32").is_some());
    assert_eq!(
        slot_reads(&body(&result, "App.Client", "Awake")[..6]),
        vec![
            ("Global_std_String".to_string(), "name".to_string()),
            ("Global_std_Int32".to_string(), "port".to_string()),
        ]
    );
}

#[test]
fn test_two_after_wired_methods() {
    let mut consumer = client(None);
    for (name, order) in [("OnStart", 1), ("OnReady", 0)] {
        let mut method = MethodDef::new(name, TypeRef::void());
        method.custom_attributes.push(after_wired(order));
        method.body = Some(MethodBody::new(vec![Instruction::Ret]));
        consumer.methods.push(method);
    }

    let result = weaver().process(module(vec![bootstrap(None), consumer]));
    assert!(!result.has_errors());
    assert_eq!(result.stats.initializers_patched, 2);
    assert_eq!(result.stats.initializers_created, 0);

    for method in ["OnStart", "OnReady"] {
        let instrs = body(&result, "App.Client", method);
        assert_eq!(instrs.len(), 7);
        assert_eq!(slot_reads(&instrs[..6]).len(), 2);
    }
    assert!(result
        .module
        .find_type("App.Client")
        .unwrap()
        .method("Awake")
        .is_none());
}

#[test]
fn test_missing_provider_fails_type() {
    let mut consumer = client(None);
    let mut clock = FieldDef::new("clock", TypeRef::new("Lib", "Clock"));
    clock.custom_attributes.push(wired(Some("TimeScope")));
    consumer.fields.push(clock);

    let result = weaver().process(module(vec![bootstrap(None), consumer]));
    assert!(result.has_errors());
    assert_eq!(result.error_count(), 1);

    let diag = &result.diagnostics[0];
    assert_eq!(diag.code, "SW0004");
    assert!(diag.message.contains("clock"));
    assert!(diag.message.contains("Lib.Clock"));
    assert!(diag.message.contains("Time"));

    // Nothing partially wired on the failing type.
    let client_type = result.module.find_type("App.Client").unwrap();
    assert!(client_type.method("Awake").is_none());
    // The provider side is independent.
    assert_eq!(result.stats.providers_patched, 1);
}

#[test]
fn test_scope_mismatch_between_sides() {
    let result = weaver().process(module(vec![
        bootstrap(Some("ConfigScope")),
        client(Some("RequestScope")),
    ]));
    assert_eq!(result.error_count(), 2);
    assert!(result.diagnostics.iter().all(|d| d.code == "SW0004"));
}

#[test]
fn test_weaving_twice_is_idempotent() {
    let weaver = weaver();
    let first = weaver.process(module(vec![bootstrap(Some("ConfigScope")), client(Some("ConfigScope"))]));
    assert!(!first.has_errors());

    let second = weaver.process(first.module.clone());
    assert!(!second.has_errors());
    assert!(second.stats.is_unchanged());
    assert_eq!(second.module, first.module);
}

#[test]
fn test_idempotent_with_existing_awake() {
    let mut consumer = client(None);
    let mut awake = MethodDef::new("Awake", TypeRef::void());
    awake.body = Some(MethodBody::new(vec![Instruction::Nop, Instruction::Ret]));
    consumer.methods.push(awake);

    let weaver = weaver();
    let first = weaver.process(module(vec![bootstrap(None), consumer]));
    assert_eq!(first.stats.initializers_patched, 1);
    assert_eq!(body(&first, "App.Client", "Awake").len(), 8);

    let second = weaver.process(first.module.clone());
    assert_eq!(second.module, first.module);
}

#[test]
fn test_provider_that_is_also_initializer_weaves_once() {
    let mut ty = TypeDef::new("App", "Client");
    let mut port = FieldDef::new("port", TypeRef::int32());
    port.custom_attributes.push(wired(None));
    ty.fields.push(port);
    let mut configure = MethodDef::new("Configure", TypeRef::void());
    configure.parameters.push(ParamDef::new("port", TypeRef::int32()));
    configure.custom_attributes.push(service(None));
    configure.custom_attributes.push(after_wired(0));
    configure.body = Some(MethodBody::new(vec![Instruction::Ret]));
    ty.methods.push(configure);

    let weaver = weaver();
    let first = weaver.process(module(vec![ty]));
    assert!(!first.has_errors(), "{:?}", first.diagnostics);
    assert_eq!(first.stats.providers_patched, 1);
    assert_eq!(first.stats.initializers_patched, 1);

    let configured = body(&first, "App.Client", "Configure");
    assert_eq!(configured.len(), 6);
    assert_eq!(
        slot_reads(&configured[..3]),
        vec![("Global_std_Int32".to_string(), "port".to_string())]
    );
    assert_eq!(configured[3], Instruction::LdArg(1));
    assert!(matches!(&configured[4], Instruction::StSFld(f) if f.name == "Global_std_Int32"));
    assert_eq!(configured[5], Instruction::Ret);

    let second = weaver.process(first.module.clone());
    assert!(second.stats.is_unchanged(), "{:?}", second.stats);
    assert_eq!(second.module, first.module);

    let third = weaver.process(second.module.clone());
    assert_eq!(third.module, first.module);
}

#[test]
fn test_provider_without_body_is_warning() {
    let mut provider = bootstrap(None);
    provider.methods[0].attributes |= method_attrs::ABSTRACT;
    provider.methods[0].body = None;

    let result = weaver().process(module(vec![provider]));
    assert!(!result.has_errors());
    assert_eq!(result.warning_count(), 1);
    assert_eq!(result.diagnostics[0].code, "SW0006");
}

#[test]
fn test_ineligible_module_not_processed() {
    let weaver = weaver();
    let mut other = module(vec![bootstrap(None)]);
    other.metadata.name = "Tooling".to_string();
    assert!(!weaver.will_process(&other));
    assert!(weaver.will_process(&module(vec![])));
}

#[test]
fn test_woven_module_survives_codec() {
    let result = weaver().process(module(vec![bootstrap(None), client(None)]));
    let decoded = Module::decode(&result.module.encode()).expect("decode woven module");
    assert_eq!(decoded, result.module);
    verify_module(&decoded).expect("decoded module verifies");
}

#[test]
fn test_external_slot_type_is_imported() {
    let mut ty = TypeDef::new("App", "Clocks");
    let mut supply = MethodDef::new("SupplyClock", TypeRef::void());
    supply.parameters.push(ParamDef::new("clock", TypeRef::new("Lib", "Clock")));
    supply.custom_attributes.push(service(None));
    supply.body = Some(MethodBody::new(vec![Instruction::Ret]));
    ty.methods.push(supply);

    let result = weaver().process(module(vec![ty]));
    assert!(!result.has_errors());
    assert_eq!(result.module.type_refs, vec![TypeRef::new("Lib", "Clock")]);
    // Instance provider: parameter 0 is argument 1.
    assert_eq!(body(&result, "App.Clocks", "SupplyClock")[0], Instruction::LdArg(1));
    verify_module(&result.module).expect("woven module verifies");
}
