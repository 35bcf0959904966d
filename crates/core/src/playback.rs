//! Paced playback of already-extracted stage outputs.
//!
//! The upstream flow answers in one round trip, so per-stage progress is an animation over
//! known results rather than a stream. Playback walks the stages in order, announcing each as
//! running, pausing for a randomised interval, and then announcing it as completed with its
//! output.

use crate::constants::{DEFAULT_PLAYBACK_MAX_DELAY, DEFAULT_PLAYBACK_MIN_DELAY};
use crate::extraction::StageOutputs;
use crate::run::StageUpdate;
use crate::{WorkflowError, WorkflowResult};
use rand::Rng;
use std::time::Duration;

/// Inclusive range the pause between "running" and "completed" is drawn from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlaybackPacing {
    min: Duration,
    max: Duration,
}

impl Default for PlaybackPacing {
    fn default() -> Self {
        Self {
            min: DEFAULT_PLAYBACK_MIN_DELAY,
            max: DEFAULT_PLAYBACK_MAX_DELAY,
        }
    }
}

impl PlaybackPacing {
    /// # Errors
    ///
    /// Returns [`WorkflowError::InvalidConfig`] if `min > max`.
    pub fn new(min: Duration, max: Duration) -> WorkflowResult<Self> {
        if min > max {
            return Err(WorkflowError::InvalidConfig(format!(
                "playback minimum delay {}ms exceeds maximum {}ms",
                min.as_millis(),
                max.as_millis()
            )));
        }
        Ok(Self { min, max })
    }

    /// No pauses at all.
    pub fn immediate() -> Self {
        Self {
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    /// A fixed pause.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            min: delay,
            max: delay,
        }
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    pub fn is_immediate(&self) -> bool {
        self.max.is_zero()
    }

    /// Draws the next pause.
    pub fn next_delay(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        rand::thread_rng().gen_range(self.min..=self.max)
    }
}

/// Replays stage outputs to a progress callback.
#[derive(Clone, Copy, Debug, Default)]
pub struct Playback {
    pacing: PlaybackPacing,
}

impl Playback {
    pub fn new(pacing: PlaybackPacing) -> Self {
        Self { pacing }
    }

    pub fn pacing(&self) -> PlaybackPacing {
        self.pacing
    }

    /// Emits `running` then `completed` for every stage, in index order.
    pub async fn play<F>(&self, outputs: StageOutputs, on_update: &mut F)
    where
        F: FnMut(StageUpdate),
    {
        for (index, output) in outputs.into_vec().into_iter().enumerate() {
            on_update(StageUpdate::running(index));

            let delay = self.pacing.next_delay();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            on_update(StageUpdate::completed(index, output));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::extract_stage_outputs;
    use crate::stages::{StageCatalog, StageStatus};
    use serde_json::json;

    #[test]
    fn default_pacing_matches_documented_range() {
        let pacing = PlaybackPacing::default();
        assert_eq!(pacing.min(), Duration::from_millis(800));
        assert_eq!(pacing.max(), Duration::from_millis(2000));
        for _ in 0..100 {
            let delay = pacing.next_delay();
            assert!(delay >= pacing.min() && delay <= pacing.max());
        }
    }

    #[test]
    fn rejects_inverted_range() {
        let err = PlaybackPacing::new(Duration::from_millis(10), Duration::from_millis(5))
            .expect_err("inverted range");
        assert!(matches!(err, WorkflowError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn plays_running_then_completed_in_order() {
        let catalog = StageCatalog::coding();
        let outputs = extract_stage_outputs(&json!({}), &catalog);
        let playback = Playback::new(PlaybackPacing::immediate());

        let mut seen = Vec::new();
        playback
            .play(outputs, &mut |update: StageUpdate| {
                seen.push((update.index, update.status))
            })
            .await;

        assert_eq!(seen.len(), catalog.len() * 2);
        for (i, pair) in seen.chunks(2).enumerate() {
            assert_eq!(pair[0], (i, StageStatus::Running));
            assert_eq!(pair[1], (i, StageStatus::Completed));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn pauses_between_running_and_completed() {
        let catalog = StageCatalog::coding();
        let outputs = extract_stage_outputs(&json!({}), &catalog);
        let playback = Playback::new(PlaybackPacing::fixed(Duration::from_millis(50)));

        let started = tokio::time::Instant::now();
        playback.play(outputs, &mut |_update: StageUpdate| {}).await;
        assert!(started.elapsed() >= Duration::from_millis(50 * catalog.len() as u64));
    }
}
