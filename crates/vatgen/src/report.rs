use log::warn;
use vat_store::AssetPath;

/// Outcome of one optional binding (a texture parameter, a switch, one
/// bounds scalar, an enforced import setting) on one asset. `Absent` is a
/// normal partial-result state, not a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindOutcome {
    Bound,
    Absent,
    Failed(String),
}

/// Per-asset aggregation of binding outcomes. Operations return these
/// alongside their results; the public boundary stays log-plus-sentinel.
#[derive(Debug, Clone)]
pub struct AssetReport {
    asset: AssetPath,
    bindings: Vec<(String, BindOutcome)>,
}

impl AssetReport {
    pub fn new(asset: AssetPath) -> AssetReport {
        AssetReport {
            asset,
            bindings: Vec::new(),
        }
    }

    pub fn asset(&self) -> &AssetPath {
        &self.asset
    }

    pub fn record(&mut self, binding: impl Into<String>, outcome: BindOutcome) {
        let binding = binding.into();
        if let BindOutcome::Failed(reason) = &outcome {
            warn!("{}: binding {} failed: {}", self.asset, binding, reason);
        }
        self.bindings.push((binding, outcome));
    }

    pub fn bindings(&self) -> &[(String, BindOutcome)] {
        &self.bindings
    }

    pub fn outcome(&self, binding: &str) -> Option<&BindOutcome> {
        self.bindings
            .iter()
            .find(|(name, _)| name == binding)
            .map(|(_, outcome)| outcome)
    }

    /// Whether every attempted binding either succeeded or was absent.
    pub fn is_clean(&self) -> bool {
        !self
            .bindings
            .iter()
            .any(|(_, outcome)| matches!(outcome, BindOutcome::Failed(_)))
    }
}
