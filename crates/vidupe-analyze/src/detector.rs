//! Runs the selected detection methods over an inventory.

use std::collections::BTreeSet;
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use vidupe_core::{
    ConfigError, DetectionConfig, DetectionGroup, DetectionMethod, DurationProber, FrameSampler,
    Inventory, Reporter, default_reporter,
};

use crate::approximate::ApproximateGrouper;
use crate::exact::ExactGrouper;
use crate::report::{DuplicateReport, MethodReport};
use crate::visual::VisualRefiner;

/// Setup problems that prevent detection from starting.
#[derive(Debug, Error)]
pub enum DetectError {
    /// The thresholds or windows are unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A method needing durations was selected without a prober.
    #[error("The {method} method needs a duration prober")]
    MissingProber { method: DetectionMethod },

    /// The frames method was selected without a frame sampler.
    #[error("The frames method needs a frame sampler")]
    MissingSampler,
}

/// Runs detection methods one after another in a fixed order.
///
/// Methods always run as size, hash, name, duration, frames, whatever order
/// they are requested in. Each method completes before the next starts. The
/// frames method refines the duration groups; if duration was also selected
/// its groups are reused instead of probing twice.
pub struct DuplicateDetector {
    config: DetectionConfig,
    reporter: Arc<dyn Reporter>,
    prober: Option<Arc<dyn DurationProber>>,
    sampler: Option<Arc<dyn FrameSampler>>,
}

impl DuplicateDetector {
    /// Create a detector with no media collaborators.
    pub fn new(config: DetectionConfig) -> Self {
        Self {
            config,
            reporter: default_reporter(),
            prober: None,
            sampler: None,
        }
    }

    /// Send progress and skipped files to `reporter`.
    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Use `prober` for the duration and frames methods.
    pub fn with_prober(mut self, prober: Arc<dyn DurationProber>) -> Self {
        self.prober = Some(prober);
        self
    }

    /// Use `sampler` for the frames method.
    pub fn with_sampler(mut self, sampler: Arc<dyn FrameSampler>) -> Self {
        self.sampler = Some(sampler);
        self
    }

    /// Configuration in use.
    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Run `methods` over the inventory.
    ///
    /// Fails only on setup problems; per-file failures end up as warnings in
    /// the method reports.
    pub fn detect(
        &self,
        inventory: &Inventory,
        methods: &[DetectionMethod],
    ) -> Result<DuplicateReport, DetectError> {
        self.config.validate()?;

        let selected: BTreeSet<DetectionMethod> = methods.iter().copied().collect();
        let prober = self.prober_for(&selected)?;
        let sampler = if selected.contains(&DetectionMethod::Frames) {
            Some(self.sampler.as_deref().ok_or(DetectError::MissingSampler)?)
        } else {
            None
        };

        let files = &inventory.files;
        let mut report = DuplicateReport::new(&inventory.root, files.len());
        report.inventory_warnings = inventory.warnings.clone();

        let exact = ExactGrouper::with_reporter(self.config.clone(), self.reporter.clone());
        let approximate =
            ApproximateGrouper::with_reporter(self.config.clone(), self.reporter.clone());
        let mut duration_groups: Option<Vec<DetectionGroup>> = None;

        for method in selected {
            info!(%method, files = files.len(), "running detection method");

            let result = match method {
                DetectionMethod::Size => exact.group_by_size(files),
                DetectionMethod::Hash => exact.group_by_hash(files),
                DetectionMethod::Name => approximate.group_by_name(files),
                DetectionMethod::Duration => {
                    let Some(prober) = prober else { continue };
                    let result = approximate.group_by_duration(files, prober);
                    duration_groups = Some(result.groups.clone());
                    result
                }
                DetectionMethod::Frames => {
                    let (Some(prober), Some(sampler)) = (prober, sampler) else {
                        continue;
                    };
                    // probe warnings belong to frames when duration did not report them
                    let (candidates, probe_warnings) = match duration_groups.take() {
                        Some(groups) => (groups, Vec::new()),
                        None => {
                            let probed = approximate.group_by_duration(files, prober);
                            (probed.groups, probed.warnings)
                        }
                    };
                    let refiner =
                        VisualRefiner::with_reporter(self.config.clone(), self.reporter.clone());
                    let mut result = refiner.refine(&candidates, sampler);
                    let mut warnings = probe_warnings;
                    warnings.append(&mut result.warnings);
                    result.warnings = warnings;
                    result
                }
            };

            log_result(&result);
            report.insert(result);
        }

        Ok(report)
    }

    fn prober_for(
        &self,
        selected: &BTreeSet<DetectionMethod>,
    ) -> Result<Option<&dyn DurationProber>, DetectError> {
        let needing = [DetectionMethod::Duration, DetectionMethod::Frames]
            .into_iter()
            .find(|m| selected.contains(m));

        match (needing, self.prober.as_deref()) {
            (None, _) => Ok(None),
            (Some(_), Some(prober)) => Ok(Some(prober)),
            (Some(method), None) => Err(DetectError::MissingProber { method }),
        }
    }
}

fn log_result(result: &MethodReport) {
    info!(
        method = %result.method,
        groups = result.group_count(),
        duplicates = result.duplicate_files,
        wasted_bytes = result.wasted_bytes,
        skipped = result.skipped(),
        "detection method finished"
    );
}
