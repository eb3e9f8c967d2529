//! The weave pass and its host contract

use crate::config::WeaverConfig;
use crate::consumer::inject_consumers;
use crate::diagnostic::{self, Diagnostic, Severity};
use crate::eligibility::EligibilityList;
use crate::error::WeaveError;
use crate::provider::inject_providers;
use crate::scanner::scan;
use crate::slots::SlotTable;
use serde::Serialize;
use slotweave_bytecode::module::flags;
use slotweave_bytecode::Module;
use tracing::{error, info};

/// A post-compilation step a host pipeline runs over each module.
pub trait PostProcessor {
    /// Whether this processor wants `module`. Must not mutate anything.
    fn will_process(&self, module: &Module) -> bool;

    /// Rewrite `module`.
    fn process(&self, module: Module) -> ProcessResult;
}

/// Counts of what a weave pass changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WeaveStats {
    /// Slot fields added to the holder type
    pub slots_created: usize,
    /// Provider methods that received store sequences
    pub providers_patched: usize,
    /// Existing initializers that received read sequences
    pub initializers_patched: usize,
    /// Fallback initializers created
    pub initializers_created: usize,
}

impl WeaveStats {
    /// Whether the pass changed nothing
    pub fn is_unchanged(&self) -> bool {
        *self == Self::default()
    }
}

/// Output of [`PostProcessor::process`]
#[derive(Debug, Clone)]
pub struct ProcessResult {
    /// The rewritten module
    pub module: Module,
    /// Everything reported during the pass
    pub diagnostics: Vec<Diagnostic>,
    /// What changed
    pub stats: WeaveStats,
}

impl ProcessResult {
    /// Whether the weave failed; the module must not be written out
    pub fn has_errors(&self) -> bool {
        diagnostic::has_errors(&self.diagnostics)
    }

    /// Number of error diagnostics
    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    /// Number of warning diagnostics
    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count()
    }
}

/// Dependency-injection weaver.
///
/// Holds only read-only state after construction, so one weaver can be
/// shared across threads processing different modules.
#[derive(Debug, Clone)]
pub struct Weaver {
    config: WeaverConfig,
    eligible: EligibilityList,
}

impl Weaver {
    /// Create a weaver, loading (or creating) the eligibility list named by
    /// `config`.
    pub fn new(config: WeaverConfig) -> Result<Self, WeaveError> {
        config.validate()?;
        let eligible = EligibilityList::load(&config.eligibility_file, &config.default_module)?;
        Ok(Self { config, eligible })
    }

    /// Create a weaver with an explicit eligibility list
    pub fn with_eligible(config: WeaverConfig, eligible: EligibilityList) -> Self {
        Self { config, eligible }
    }

    /// Active configuration
    pub fn config(&self) -> &WeaverConfig {
        &self.config
    }

    /// Active eligibility list
    pub fn eligible(&self) -> &EligibilityList {
        &self.eligible
    }

    /// Run the weave over `module` in place.
    pub fn weave(&self, module: &mut Module) -> (Vec<Diagnostic>, WeaveStats) {
        let decls = scan(module, &self.config.markers);
        let mut diagnostics = decls.diagnostics;
        let mut stats = WeaveStats::default();

        let (table, slot_diags) =
            SlotTable::build(module, &self.config.holder_type, &decls.providers);
        stats.slots_created = table.created();
        diagnostics.extend(slot_diags);

        let providers = inject_providers(module, &table, &decls.providers);
        stats.providers_patched = providers.patched;
        diagnostics.extend(providers.diagnostics);

        let consumers = inject_consumers(
            module,
            &table,
            &decls.consumers,
            &decls.initializers,
            &self.config.fallback_initializer,
        );
        stats.initializers_patched = consumers.patched;
        stats.initializers_created = consumers.created;
        diagnostics.extend(consumers.diagnostics);

        if !stats.is_unchanged() {
            module.flags |= flags::WOVEN;
        }
        (diagnostics, stats)
    }
}

impl PostProcessor for Weaver {
    fn will_process(&self, module: &Module) -> bool {
        self.eligible.contains(module.name())
    }

    fn process(&self, mut module: Module) -> ProcessResult {
        let (diagnostics, stats) = self.weave(&mut module);

        for diagnostic in diagnostics.iter().filter(|d| d.is_error()) {
            error!(module = module.name(), "{}", diagnostic);
        }
        info!(
            module = module.name(),
            slots_created = stats.slots_created,
            providers_patched = stats.providers_patched,
            initializers_patched = stats.initializers_patched,
            initializers_created = stats.initializers_created,
            diagnostics = diagnostics.len(),
            "weave complete"
        );

        ProcessResult {
            module,
            diagnostics,
            stats,
        }
    }
}
