use haiku_model::{
    ConditionStatus, ProgressUpdate, RequestId, Stage, URL_RESULT, WatchEvent,
};

use crate::error::CoreError;

/// What one watch event means for the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// Pipeline still running; forward this update.
    Progress(ProgressUpdate),
    /// Resource reported success. `progress` is set when the final event also
    /// entered a new stage; it must be delivered before the outcome.
    Finished {
        progress: Option<ProgressUpdate>,
        url: String,
    },
    /// Nothing to report (bookmarks, counts past the stage table).
    Ignored,
}

/// Maps sub-task counts onto the stage table.
///
/// The recorded stage never decreases. A count equal to or below it yields a
/// filler update; a higher count advances it and yields that stage's message,
/// or nothing when the count is past the table.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    last_stage: usize,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest stage index seen so far (0 before anything started).
    pub fn last_stage(&self) -> usize {
        self.last_stage
    }

    /// Update for a sub-task count reported by a non-terminal event.
    pub fn stage_update(&mut self, count: usize) -> Option<ProgressUpdate> {
        if count > self.last_stage {
            self.advance(count)
        } else {
            Some(ProgressUpdate::StillWorking {
                stage: self.last_stage,
            })
        }
    }

    fn advance(&mut self, count: usize) -> Option<ProgressUpdate> {
        if count <= self.last_stage {
            return None;
        }
        self.last_stage = count;
        Stage::lookup(count).map(ProgressUpdate::Advanced)
    }

    /// Interpret one decoded watch event.
    ///
    /// Failure, deletion and watch errors are returned as errors; they end the
    /// watch just like success does.
    pub fn observe(
        &mut self,
        event: WatchEvent,
        request_id: &RequestId,
    ) -> Result<Observation, CoreError> {
        match event {
            WatchEvent::Added(snap) | WatchEvent::Modified(snap) => match snap.outcome() {
                ConditionStatus::Unknown => Ok(self
                    .stage_update(snap.task_run_count())
                    .map_or(Observation::Ignored, Observation::Progress)),
                ConditionStatus::True => Ok(Observation::Finished {
                    progress: self.advance(snap.task_run_count()),
                    url: snap.result(URL_RESULT).unwrap_or_default().to_string(),
                }),
                ConditionStatus::False => Err(CoreError::DeploymentFailed(snap.failure_detail())),
            },
            WatchEvent::Deleted(snap) => Err(CoreError::DeploymentFailed(format!(
                "service {:?} was deleted before it became ready",
                snap.metadata.name
            ))),
            WatchEvent::Bookmark(_) => Ok(Observation::Ignored),
            WatchEvent::Error(failure) => Err(CoreError::upstream(
                "watch Service",
                request_id,
                format!("watch error {}: {}", failure.code, failure.message),
            )),
        }
    }
}
