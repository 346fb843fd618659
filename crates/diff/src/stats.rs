use serde::{Deserialize, Serialize};

/// Counters for one diff run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStats {
    /// Source the run belongs to
    pub source: String,

    /// Lines loaded from the latest prior run file
    pub previous_records: usize,

    /// Prior identities available for update matching
    pub identities_loaded: usize,

    /// Prior records without identity or storage id
    pub skipped_previous: usize,

    /// Records forwarded without a storage id
    pub inserted: usize,

    /// Records forwarded with a prior storage id
    pub updated: usize,

    /// Intra-run repeats that were suppressed
    pub duplicates: usize,

    /// Prior records not seen in this run, re-emitted at finalize
    pub carried_forward: usize,

    /// Carried-forward records whose upcoming meeting was marked cancelled
    pub cancelled: usize,
}

impl DiffStats {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    /// Records forwarded downstream (new and updated).
    pub fn emitted(&self) -> usize {
        self.inserted + self.updated
    }
}
