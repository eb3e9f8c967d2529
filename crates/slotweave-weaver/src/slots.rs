//! Slot table builder.
//!
//! Slots live as public static fields on one holder type per module. The
//! table is keyed by slot name only, so building it twice over the same
//! module finds every slot from the first run and creates nothing.

use crate::diagnostic::{Diagnostic, Location, SLOT_COLLISION};
use crate::namer::{slot_name, ScopeId};
use crate::scanner::ProviderEntry;
use rustc_hash::FxHashMap;
use slotweave_bytecode::module::{field_attrs, type_attrs};
use slotweave_bytecode::{FieldDef, FieldRef, Module, TypeDef, TypeRef};
use tracing::debug;

/// Outcome of looking up a (scope, type) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<'a> {
    /// A slot of the requested type exists
    Found(&'a FieldRef),
    /// No slot has the pair's name
    Missing,
    /// A slot has the pair's name but holds a different type
    Collision(&'a TypeRef),
}

/// Slot fields of a module, by name
#[derive(Debug, Clone)]
pub struct SlotTable {
    holder: Option<TypeRef>,
    slots: FxHashMap<String, FieldRef>,
    created: usize,
}

impl SlotTable {
    /// Ensure one slot per distinct (scope, type) pair among `providers`.
    ///
    /// The holder type named `holder_name` (`Namespace.Name` or a bare name)
    /// is located, or appended to the module if there is anything to hold.
    /// Pairs whose name is already taken by a slot of another type are
    /// reported as collisions and get no field.
    pub fn build(
        module: &mut Module,
        holder_name: &str,
        providers: &[ProviderEntry],
    ) -> (Self, Vec<Diagnostic>) {
        let mut table = Self {
            holder: None,
            slots: FxHashMap::default(),
            created: 0,
        };
        let mut diagnostics = Vec::new();

        let holder_index = match module.type_index(holder_name) {
            Some(index) => Some(index),
            None if providers.is_empty() => None,
            None => Some(create_holder(module, holder_name)),
        };
        let Some(holder_index) = holder_index else {
            return (table, diagnostics);
        };

        let holder = &module.types[holder_index];
        table.holder = Some(holder.type_ref());
        for index in 0..holder.fields.len() {
            let field = holder.field_ref(index);
            table.slots.insert(field.name.clone(), field);
        }

        let mut reported: Vec<(String, String)> = Vec::new();
        for entry in providers {
            let name = slot_name(&entry.scope, &entry.value_type);
            let wanted = entry.value_type.full_name();

            if let Some(existing) = table.slots.get(&name) {
                let existing_name = existing.field_type.full_name();
                if existing_name != wanted && !reported.contains(&(name.clone(), wanted.clone())) {
                    diagnostics.push(collision(module, entry, &name, &existing_name));
                    reported.push((name, wanted));
                }
                continue;
            }

            let field_type = module.import_type(&entry.value_type);
            let mut field = FieldDef::new(name.clone(), field_type);
            field.attributes = field_attrs::PUBLIC | field_attrs::STATIC;

            let holder = &mut module.types[holder_index];
            holder.fields.push(field);
            let field_ref = holder.field_ref(holder.fields.len() - 1);

            debug!(slot = %name, value_type = %wanted, "created slot");
            table.slots.insert(name, field_ref);
            table.created += 1;
        }

        (table, diagnostics)
    }

    /// Look up the slot for a (scope, type) pair
    pub fn resolve(&self, scope: &ScopeId, value_type: &TypeRef) -> Resolution<'_> {
        match self.slots.get(&slot_name(scope, value_type)) {
            None => Resolution::Missing,
            Some(slot) if slot.field_type.full_name() == value_type.full_name() => {
                Resolution::Found(slot)
            }
            Some(slot) => Resolution::Collision(&slot.field_type),
        }
    }

    /// Look up a slot by name
    pub fn get(&self, name: &str) -> Option<&FieldRef> {
        self.slots.get(name)
    }

    /// The holder type, if the module has one
    pub fn holder(&self) -> Option<&TypeRef> {
        self.holder.as_ref()
    }

    /// Number of slots created by this build
    pub fn created(&self) -> usize {
        self.created
    }

    /// Total number of slots
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether there are no slots
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

fn create_holder(module: &mut Module, holder_name: &str) -> usize {
    let (namespace, name) = holder_name.rsplit_once('.').unwrap_or(("", holder_name));
    let mut holder = TypeDef::new(namespace, name);
    holder.attributes = type_attrs::PUBLIC | type_attrs::ABSTRACT | type_attrs::SEALED;
    module.types.push(holder);
    debug!(holder = holder_name, "created slot holder");
    module.types.len() - 1
}

fn collision(module: &Module, entry: &ProviderEntry, slot: &str, existing: &str) -> Diagnostic {
    let ty = &module.types[entry.method.type_index];
    let method = &ty.methods[entry.method.method_index];
    let parameter = method
        .parameters
        .get(entry.param_index)
        .map(|p| p.name.clone())
        .unwrap_or_default();

    Diagnostic::new(
        &SLOT_COLLISION,
        format!(
            "slot `{}` for `{}` in scope `{}` is already taken by `{}`",
            slot,
            entry.value_type.full_name(),
            entry.scope,
            existing
        ),
        Location::Parameter {
            type_name: ty.full_name(),
            method: method.name.clone(),
            parameter,
        },
    )
    .with_note("distinct type names sanitize to the same slot name")
}
