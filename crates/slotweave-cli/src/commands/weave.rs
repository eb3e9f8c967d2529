//! `slotweave weave`: weave module files.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;
use slotweave_bytecode::verify_module;
use slotweave_weaver::{Diagnostic, PostProcessor, WeaveStats, Weaver, WeaverConfig};
use termcolor::ColorChoice;

use super::{read_module, write_module};
use crate::output::StyledOutput;
use crate::Format;

pub struct WeaveOptions {
    pub files: Vec<PathBuf>,
    pub config: PathBuf,
    pub out_dir: Option<PathBuf>,
    pub verify: bool,
    pub format: Format,
    /// `false` for a dry run
    pub write: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum Status {
    /// Rewritten (and written, unless dry run)
    Woven,
    /// Eligible, but nothing to change
    Unchanged,
    /// Not on the eligibility list
    Skipped,
    /// Errors; nothing written
    Failed,
}

#[derive(Serialize)]
struct FileReport {
    file: PathBuf,
    module: String,
    status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<WeaveStats>,
    diagnostics: Vec<Diagnostic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    verify_error: Option<String>,
}

pub fn execute(options: WeaveOptions, color: ColorChoice) -> anyhow::Result<()> {
    let config = load_config(&options.config)?;
    let weaver = Weaver::new(config).context("failed to initialize weaver")?;

    let mut reports = Vec::with_capacity(options.files.len());
    for path in &options.files {
        reports.push(weave_file(&weaver, path, &options)?);
    }

    match options.format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
        Format::Pretty => emit_pretty(&reports, options.write, color),
    }

    if reports.iter().any(|r| r.status == Status::Failed) {
        std::process::exit(1);
    }
    Ok(())
}

/// Load `weaver.toml`, resolving a relative eligibility path against the
/// config file's directory.
pub fn load_config(path: &Path) -> anyhow::Result<WeaverConfig> {
    let mut config = WeaverConfig::load_or_default(path)
        .with_context(|| format!("failed to load {}", path.display()))?;
    if config.eligibility_file.is_relative() {
        if let Some(base) = path.parent() {
            config.eligibility_file = base.join(&config.eligibility_file);
        }
    }
    Ok(config)
}

fn weave_file(weaver: &Weaver, path: &Path, options: &WeaveOptions) -> anyhow::Result<FileReport> {
    let module = read_module(path)?;
    let module_name = module.name().to_string();

    if !weaver.will_process(&module) {
        return Ok(FileReport {
            file: path.to_path_buf(),
            module: module_name,
            status: Status::Skipped,
            output: None,
            stats: None,
            diagnostics: Vec::new(),
            verify_error: None,
        });
    }

    let result = weaver.process(module);
    let mut report = FileReport {
        file: path.to_path_buf(),
        module: module_name,
        status: Status::Woven,
        output: None,
        stats: Some(result.stats),
        diagnostics: result.diagnostics.clone(),
        verify_error: None,
    };

    if result.has_errors() {
        report.status = Status::Failed;
        return Ok(report);
    }
    if options.verify {
        if let Err(err) = verify_module(&result.module) {
            report.status = Status::Failed;
            report.verify_error = Some(err.to_string());
            return Ok(report);
        }
    }
    if result.stats.is_unchanged() {
        report.status = Status::Unchanged;
        // In-place output would rewrite identical bytes.
        if options.out_dir.is_none() {
            return Ok(report);
        }
    }

    if options.write {
        let target = output_path(path, options.out_dir.as_deref());
        write_module(&target, &result.module)?;
        report.output = Some(target);
    }
    Ok(report)
}

/// Where the woven copy of `input` goes
fn output_path(input: &Path, out_dir: Option<&Path>) -> PathBuf {
    match (out_dir, input.file_name()) {
        (Some(dir), Some(name)) => dir.join(name),
        _ => input.to_path_buf(),
    }
}

fn emit_pretty(reports: &[FileReport], write: bool, color: ColorChoice) {
    let mut out = StyledOutput::new(color);
    let (mut woven, mut unchanged, mut skipped, mut failed) = (0usize, 0usize, 0usize, 0usize);

    for report in reports {
        for diagnostic in &report.diagnostics {
            out.diagnostic(diagnostic);
        }
        if let Some(err) = &report.verify_error {
            out.error("verification failed");
            out.plain(&format!(": {}", err));
            out.newline();
        }

        out.bold(&format!("{} ", report.file.display()));
        out.dim(&format!("({}) ", report.module));
        match report.status {
            Status::Woven => {
                woven += 1;
                out.success(if write { "woven" } else { "ok" });
                if let Some(stats) = &report.stats {
                    out.plain(&format!(
                        ": {} slot(s) created, {} provider(s) patched, {} initializer(s) patched, {} created",
                        stats.slots_created,
                        stats.providers_patched,
                        stats.initializers_patched,
                        stats.initializers_created
                    ));
                }
            }
            Status::Unchanged => {
                unchanged += 1;
                out.info("unchanged");
            }
            Status::Skipped => {
                skipped += 1;
                out.dim("skipped (not eligible)");
            }
            Status::Failed => {
                failed += 1;
                out.error("failed");
            }
        }
        if let Some(target) = &report.output {
            out.dim(&format!(" -> {}", target.display()));
        }
        out.newline();
    }

    out.newline();
    let summary = format!(
        "{} woven, {} unchanged, {} skipped, {} failed",
        woven, unchanged, skipped, failed
    );
    if failed > 0 {
        out.error(&summary);
    } else {
        out.success(&summary);
    }
    out.newline();
    out.flush();
}
