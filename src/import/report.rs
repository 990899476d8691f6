use serde::{Deserialize, Serialize};

/// Severity level for an import finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningSeverity {
    /// The shape imported, but its result needs a human look.
    Review,
    Warning,
    Info,
}

/// Which stage raised the finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningCategory {
    Skin,
    Armature,
    Skeleton,
}

/// A single import finding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportWarning {
    /// Stable code for this finding (e.g. "BONE_NOT_FOUND").
    pub code: String,
    /// Human-readable description.
    pub message: String,
    pub severity: WarningSeverity,
    pub category: WarningCategory,
    /// Shape the finding belongs to, if any.
    pub shape: Option<String>,
}

impl ImportWarning {
    pub fn new(
        code: &str,
        message: String,
        severity: WarningSeverity,
        category: WarningCategory,
        shape: &str,
    ) -> Self {
        ImportWarning {
            code: code.to_string(),
            message,
            severity,
            category,
            shape: Some(shape.to_string()),
        }
    }
}

/// Every finding of one import batch, surfaced once when the batch ends.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportReport {
    pub items: Vec<ImportWarning>,
    pub review_count: u32,
    pub warning_count: u32,
    pub info_count: u32,
}

impl ImportReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a finding and update counts.
    pub fn add(&mut self, item: ImportWarning) {
        let shape = item.shape.as_deref().unwrap_or("-");
        match item.severity {
            WarningSeverity::Review => {
                log::warn!("[{}] {} (needs review): {}", shape, item.code, item.message);
                self.review_count += 1;
            }
            WarningSeverity::Warning => {
                log::warn!("[{}] {}: {}", shape, item.code, item.message);
                self.warning_count += 1;
            }
            WarningSeverity::Info => {
                log::info!("[{}] {}: {}", shape, item.code, item.message);
                self.info_count += 1;
            }
        }
        self.items.push(item);
    }

    pub fn extend(&mut self, items: impl IntoIterator<Item = ImportWarning>) {
        for item in items {
            self.add(item);
        }
    }

    /// Merge another report into this one.
    pub fn merge(&mut self, other: ImportReport) {
        self.extend(other.items);
    }

    /// Nothing needing attention (info items allowed).
    pub fn is_clean(&self) -> bool {
        self.review_count == 0 && self.warning_count == 0
    }

    pub fn codes(&self) -> Vec<&str> {
        self.items.iter().map(|i| i.code.as_str()).collect()
    }

    pub fn for_shape<'a>(&'a self, shape: &'a str) -> impl Iterator<Item = &'a ImportWarning> {
        self.items
            .iter()
            .filter(move |i| i.shape.as_deref() == Some(shape))
    }
}
