//! `slotweave init`: write a default `weaver.toml`.

use std::path::PathBuf;

use anyhow::{bail, Context};
use slotweave_weaver::{WeaverConfig, CONFIG_FILE_NAME};
use termcolor::ColorChoice;

use crate::output::StyledOutput;

pub fn execute(path: PathBuf, force: bool, color: ColorChoice) -> anyhow::Result<()> {
    let target = path.join(CONFIG_FILE_NAME);
    if target.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", target.display());
    }

    std::fs::create_dir_all(&path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    WeaverConfig::default()
        .to_file(&target)
        .with_context(|| format!("failed to write {}", target.display()))?;

    let mut out = StyledOutput::new(color);
    out.success("Created ");
    out.plain(&target.display().to_string());
    out.newline();
    out.flush();
    Ok(())
}
