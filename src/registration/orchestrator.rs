//! Registration Orchestrator.
//!
//! Walks one validator registration from `Idle` to `Complete`, one stage at
//! a time, timing each stage. The run cannot reach `Complete` until the
//! signed warp message has been stored.

use std::time::{Duration, Instant};

use super::stages::RegistrationStage;
use super::RegistrationFailure;

/// Stage cursor of one registration run.
pub struct RegistrationOrchestrator {
    current_stage: RegistrationStage,
    /// When the current stage was entered; only used for log timings.
    stage_start_time: Instant,
    /// Set by `confirm_persistence`, cleared on every advance.
    persistence_verified: bool,
}

impl Default for RegistrationOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistrationOrchestrator {
    /// Starts a run before `CheckArtifacts`.
    pub fn new() -> Self {
        Self {
            current_stage: RegistrationStage::Idle,
            stage_start_time: Instant::now(),
            persistence_verified: false,
        }
    }

    pub fn current_stage(&self) -> RegistrationStage {
        self.current_stage
    }

    /// Time spent in the current stage so far.
    pub fn stage_elapsed(&self) -> Duration {
        self.stage_start_time.elapsed()
    }

    /// Records that the signed warp message is durably stored; `advance`
    /// refuses to leave `Persist` without it.
    pub fn confirm_persistence(&mut self) {
        self.persistence_verified = true;
    }

    /// Moves to the stage after the current one and returns it.
    ///
    /// # Errors
    /// `PersistenceUnconfirmed` when leaving `Persist` unconfirmed;
    /// `AlreadyComplete` past the last stage.
    pub fn advance(&mut self) -> Result<RegistrationStage, RegistrationFailure> {
        if self.current_stage == RegistrationStage::Persist && !self.persistence_verified {
            return Err(RegistrationFailure::PersistenceUnconfirmed);
        }
        let next = self
            .current_stage
            .next()
            .ok_or(RegistrationFailure::AlreadyComplete)?;

        log::debug!(
            "Stage {} finished in {:?}, entering {}",
            self.current_stage,
            self.stage_elapsed(),
            next
        );
        if next.is_remote() {
            log::info!("Entering {} stage", next);
        }
        self.current_stage = next;
        self.persistence_verified = false;
        self.stage_start_time = Instant::now();
        Ok(next)
    }
}
