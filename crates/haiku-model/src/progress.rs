use std::fmt;

/// One step of the provisioning pipeline, as reported to the caller.
#[derive(Debug, PartialEq, Eq)]
pub struct Stage {
    /// 1-based position in [`STAGES`].
    pub index: usize,
    pub message: &'static str,
}

/// Ordered stage table. The number of sub-task entries a resource reports
/// selects the stage with the same index.
pub static STAGES: [Stage; 4] = [
    Stage {
        index: 1,
        message: "locating source",
    },
    Stage {
        index: 2,
        message: "preparing build context",
    },
    Stage {
        index: 3,
        message: "building",
    },
    Stage {
        index: 4,
        message: "provisioning endpoint",
    },
];

/// Marker sent when the pipeline is still in the previously reported stage.
pub const FILLER_MESSAGE: &str = ".";

impl Stage {
    /// Stage for a sub-task count; `None` for 0 and for counts past the table.
    pub fn lookup(index: usize) -> Option<&'static Stage> {
        index.checked_sub(1).and_then(|i| STAGES.get(i))
    }
}

/// Progress message produced by the watch translator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgressUpdate {
    /// The pipeline entered a new stage.
    Advanced(&'static Stage),
    /// Still working on the stage with this index (0 = nothing started yet).
    StillWorking { stage: usize },
}

impl ProgressUpdate {
    pub fn stage(&self) -> usize {
        match self {
            ProgressUpdate::Advanced(s) => s.index,
            ProgressUpdate::StillWorking { stage } => *stage,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ProgressUpdate::Advanced(s) => s.message,
            ProgressUpdate::StillWorking { .. } => FILLER_MESSAGE,
        }
    }

    pub fn is_filler(&self) -> bool {
        matches!(self, ProgressUpdate::StillWorking { .. })
    }
}

impl fmt::Display for ProgressUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}/{}] {}", self.stage(), STAGES.len(), self.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_ordered_and_one_based() {
        for (i, stage) in STAGES.iter().enumerate() {
            assert_eq!(stage.index, i + 1);
            assert_eq!(Stage::lookup(i + 1), Some(stage));
        }
    }

    #[test]
    fn out_of_range_has_no_stage() {
        assert_eq!(Stage::lookup(0), None);
        assert_eq!(Stage::lookup(STAGES.len() + 1), None);
    }

    #[test]
    fn filler_keeps_stage_index() {
        let u = ProgressUpdate::StillWorking { stage: 2 };
        assert!(u.is_filler());
        assert_eq!(u.stage(), 2);
        assert_eq!(u.message(), FILLER_MESSAGE);
        assert_eq!(
            ProgressUpdate::Advanced(&STAGES[2]).to_string(),
            "[3/4] building"
        );
    }
}
