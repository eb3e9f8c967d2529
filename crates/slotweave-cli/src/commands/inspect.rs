//! `slotweave inspect`: print a module file.

use std::path::PathBuf;

use slotweave_bytecode::module::flags;
use slotweave_bytecode::{MethodDef, Module, TypeDef};
use termcolor::ColorChoice;

use super::read_module;
use crate::output::StyledOutput;

pub fn execute(file: PathBuf, json: bool, color: ColorChoice) -> anyhow::Result<()> {
    let module = read_module(&file)?;

    if json {
        println!("{}", module.to_json()?);
        return Ok(());
    }

    let mut out = StyledOutput::new(color);
    print_module(&mut out, &module);
    out.flush();
    Ok(())
}

fn print_module(out: &mut StyledOutput, module: &Module) {
    out.bold("module ");
    out.success(module.name());
    out.dim(&format!(" (format v{}", module.version));
    if module.flags & flags::WOVEN != 0 {
        out.dim(", woven");
    }
    out.dim(")");
    out.newline();

    if let Some(source) = &module.metadata.source_file {
        out.dim(&format!("  source: {}", source));
        out.newline();
    }

    if !module.type_refs.is_empty() {
        out.newline();
        out.bold("imports");
        out.newline();
        for ty in &module.type_refs {
            out.plain(&format!("  {}", ty));
            out.newline();
        }
    }

    for ty in &module.types {
        out.newline();
        print_type(out, ty);
    }
}

fn print_type(out: &mut StyledOutput, ty: &TypeDef) {
    out.bold("type ");
    out.info(&ty.full_name());
    for attr in &ty.custom_attributes {
        out.dim(&format!(" [{}]", attr.attribute_type.short_name()));
    }
    out.newline();

    for field in &ty.fields {
        let storage = if field.is_static() { "static " } else { "" };
        out.plain(&format!("  field {}{}: {}", storage, field.name, field.field_type));
        for attr in &field.custom_attributes {
            out.dim(&format!(" [{}]", attr.attribute_type.short_name()));
        }
        out.newline();
    }

    for method in &ty.methods {
        print_method(out, method);
    }
}

fn print_method(out: &mut StyledOutput, method: &MethodDef) {
    let params: Vec<String> = method
        .parameters
        .iter()
        .map(|p| format!("{}: {}", p.name, p.param_type))
        .collect();
    let storage = if method.is_static() { "static " } else { "" };
    out.plain(&format!(
        "  method {}{}({}) -> {}",
        storage,
        method.name,
        params.join(", "),
        method.return_type
    ));
    for attr in &method.custom_attributes {
        out.dim(&format!(" [{}]", attr.attribute_type.short_name()));
    }
    out.newline();

    let Some(body) = &method.body else {
        out.dim("    (no body)");
        out.newline();
        return;
    };
    for (index, instr) in body.instructions.iter().enumerate() {
        out.dim(&format!("    IL_{:04}: ", index));
        out.plain(&instr.to_string());
        out.newline();
    }
}
