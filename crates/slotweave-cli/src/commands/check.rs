//! `slotweave check`: report what weaving would do without writing.

use std::path::PathBuf;

use termcolor::ColorChoice;

use super::weave::{self, WeaveOptions};
use crate::Format;

pub fn execute(
    files: Vec<PathBuf>,
    config: PathBuf,
    format: Format,
    color: ColorChoice,
) -> anyhow::Result<()> {
    weave::execute(
        WeaveOptions {
            files,
            config,
            out_dir: None,
            verify: true,
            format,
            write: false,
        },
        color,
    )
}
