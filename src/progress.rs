//! Stage-transition callbacks for one pipeline run.
//!
//! Attach an [`Arc<dyn StageObserver>`] with
//! [`crate::convert::NotePipeline::with_observer`] to hear about each stage
//! as the run enters it. The CLI uses this to drive its spinner; a server
//! could forward the events to a websocket.
//!
//! # Example
//!
//! ```rust
//! use note_maker::{Stage, StageObserver};
//! use std::sync::Mutex;
//!
//! #[derive(Default)]
//! struct Trace(Mutex<Vec<Stage>>);
//!
//! impl StageObserver for Trace {
//!     fn on_stage(&self, stage: Stage) {
//!         self.0.lock().unwrap().push(stage);
//!     }
//! }
//! ```

use crate::error::NoteError;
use crate::output::GenerationResult;
use std::fmt;
use std::sync::Arc;

/// States of a run. `Done` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Resolving,
    Extracting,
    Generating,
    Placing,
    Done,
    Failed,
}

impl Stage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Done | Stage::Failed)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Resolving => "resolving",
            Stage::Extracting => "extracting",
            Stage::Generating => "generating",
            Stage::Placing => "placing",
            Stage::Done => "done",
            Stage::Failed => "failed",
        })
    }
}

/// Called by the pipeline on every state change.
///
/// All methods default to no-ops.
pub trait StageObserver: Send + Sync {
    /// The run entered `stage`, terminal stages included.
    fn on_stage(&self, stage: Stage) {
        let _ = stage;
    }

    /// `stage` failed with `error`; `on_stage(Stage::Failed)` follows.
    fn on_failed(&self, stage: Stage, error: &NoteError) {
        let _ = (stage, error);
    }

    /// The run finished; `on_stage(Stage::Done)` came just before.
    fn on_done(&self, result: &GenerationResult) {
        let _ = result;
    }
}

/// Observer that ignores everything. Used when none is attached.
pub struct NoopObserver;

impl StageObserver for NoopObserver {}

pub type SharedObserver = Arc<dyn StageObserver>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_stages() {
        assert!(Stage::Done.is_terminal());
        assert!(Stage::Failed.is_terminal());
        assert!(!Stage::Placing.is_terminal());
    }

    #[test]
    fn noop_accepts_everything() {
        let obs: SharedObserver = Arc::new(NoopObserver);
        obs.on_stage(Stage::Resolving);
        obs.on_failed(Stage::Extracting, &NoteError::Internal("x".into()));
    }

    #[test]
    fn display_is_lowercase() {
        assert_eq!(Stage::Generating.to_string(), "generating");
    }
}
