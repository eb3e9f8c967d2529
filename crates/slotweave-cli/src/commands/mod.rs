pub mod check;
pub mod init;
pub mod inspect;
pub mod weave;

use anyhow::Context;
use slotweave_bytecode::Module;
use std::path::Path;

/// Read and decode a module file
pub fn read_module(path: &Path) -> anyhow::Result<Module> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    Module::decode(&bytes).with_context(|| format!("failed to decode {}", path.display()))
}

/// Encode and write a module file, creating parent directories
pub fn write_module(path: &Path, module: &Module) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    std::fs::write(path, module.encode())
        .with_context(|| format!("failed to write {}", path.display()))
}
