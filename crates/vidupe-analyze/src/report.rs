//! Per-method results, totals, and text rendering.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use vidupe_core::{DetectionGroup, DetectionMethod, FileWarning};

/// Width of report rules.
const RULE_WIDTH: usize = 70;

/// Groups produced by one detection method, with derived totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodReport {
    /// Method that produced the groups.
    pub method: DetectionMethod,

    /// Number of files the method was given.
    pub files_considered: usize,

    /// Duplicate groups, each with at least two members.
    pub groups: Vec<DetectionGroup>,

    /// Redundant copies: Σ(members − 1).
    pub duplicate_files: usize,

    /// Reclaimable bytes: Σ(reference size × (members − 1)).
    pub wasted_bytes: u64,

    /// Files left out of this method.
    pub warnings: Vec<FileWarning>,
}

impl MethodReport {
    /// Build a report, computing totals from the groups.
    pub fn new(
        method: DetectionMethod,
        files_considered: usize,
        groups: Vec<DetectionGroup>,
        warnings: Vec<FileWarning>,
    ) -> Self {
        let duplicate_files = groups.iter().map(DetectionGroup::duplicate_count).sum();
        let wasted_bytes = groups.iter().map(DetectionGroup::wasted_bytes).sum();

        Self {
            method,
            files_considered,
            groups,
            duplicate_files,
            wasted_bytes,
            warnings,
        }
    }

    /// Check if any duplicates were found.
    pub fn has_duplicates(&self) -> bool {
        !self.groups.is_empty()
    }

    /// Number of duplicate groups.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Number of files in any group.
    pub fn files_in_groups(&self) -> usize {
        self.groups.iter().map(DetectionGroup::len).sum()
    }

    /// Number of files left out.
    pub fn skipped(&self) -> usize {
        self.warnings.len()
    }
}

impl fmt::Display for MethodReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, " {} ({})", self.method.title(), self.method)?;
        writeln!(f, "{}", "─".repeat(RULE_WIDTH))?;

        if self.groups.is_empty() {
            writeln!(f, " No duplicates found among {} file(s).", self.files_considered)?;
            return Ok(());
        }

        writeln!(
            f,
            " Found {} duplicate group(s) ({} files, {} redundant)",
            self.group_count(),
            self.files_in_groups(),
            self.duplicate_files
        )?;
        writeln!(f, " Wasted space: {}", format_size(self.wasted_bytes))?;
        writeln!(f)?;

        for (i, group) in self.groups.iter().enumerate() {
            writeln!(
                f,
                " Group {} ({} files, {} wasted) {}",
                i + 1,
                group.len(),
                format_size(group.wasted_bytes()),
                group.key
            )?;
            for (j, member) in group.members().iter().enumerate() {
                let marker = if j == 0 { "[KEEP]" } else { "[DUP ]" };
                let duration = member
                    .known_duration()
                    .map(format_duration)
                    .unwrap_or_default();
                writeln!(
                    f,
                    "   {marker} {:>10} {:>8}  {}",
                    format_size(member.size),
                    duration,
                    member.path.display()
                )?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

/// Results of every method run over one inventory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateReport {
    /// Root the inventory was built from.
    pub root: PathBuf,

    /// When detection finished.
    pub generated_at: DateTime<Local>,

    /// Number of files in the inventory.
    pub files_analyzed: usize,

    /// Entries skipped while building the inventory.
    pub inventory_warnings: Vec<FileWarning>,

    /// Per-method results in run order.
    pub methods: IndexMap<DetectionMethod, MethodReport>,
}

impl DuplicateReport {
    /// Create an empty report for an inventory.
    pub fn new(root: impl Into<PathBuf>, files_analyzed: usize) -> Self {
        Self {
            root: root.into(),
            generated_at: Local::now(),
            files_analyzed,
            inventory_warnings: Vec::new(),
            methods: IndexMap::new(),
        }
    }

    /// Record one method's results, replacing an earlier run of it.
    pub fn insert(&mut self, report: MethodReport) {
        self.methods.insert(report.method, report);
    }

    /// Results for one method, if it ran.
    pub fn get(&self, method: DetectionMethod) -> Option<&MethodReport> {
        self.methods.get(&method)
    }

    /// Groups of one method, empty if it did not run.
    pub fn groups(&self, method: DetectionMethod) -> &[DetectionGroup] {
        self.get(method).map(|r| r.groups.as_slice()).unwrap_or_default()
    }

    /// Check if any method found duplicates.
    pub fn has_duplicates(&self) -> bool {
        self.methods.values().any(MethodReport::has_duplicates)
    }

    /// Skipped-file counts: inventory first, then each method in run order.
    pub fn skipped_counts(&self) -> Vec<(String, usize)> {
        std::iter::once(("inventory".to_string(), self.inventory_warnings.len()))
            .chain(
                self.methods
                    .values()
                    .map(|r| (r.method.to_string(), r.skipped())),
            )
            .collect()
    }

    /// Render the human-readable report.
    pub fn render_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for DuplicateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "─".repeat(RULE_WIDTH);

        writeln!(f, "{rule}")?;
        writeln!(f, " Duplicate Video Report")?;
        writeln!(f, "{rule}")?;
        writeln!(f, " Root:      {}", self.root.display())?;
        writeln!(f, " Generated: {}", self.generated_at.format("%Y-%m-%d %H:%M:%S"))?;
        writeln!(f, " Files:     {}", self.files_analyzed)?;
        writeln!(f)?;

        for report in self.methods.values() {
            writeln!(f, "{report}")?;
        }

        writeln!(f, "{rule}")?;
        writeln!(f, " Skipped files")?;
        writeln!(f, "{rule}")?;
        for (stage, count) in self.skipped_counts() {
            writeln!(f, " {stage:<10} {count}")?;
        }

        Ok(())
    }
}

/// Format size in human-readable form.
pub fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

/// Format seconds as `mm:ss`, or `hh:mm:ss` from one hour up.
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let (hours, minutes, secs) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours:02}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes:02}:{secs:02}")
    }
}
