use std::io;

use super::parallel_scheduler::{BatchLines, ParallelScheduler};
use super::transcription_runner::{TranscriptionRequest, TranscriptionRunner};
use crate::capabilities::domain::feature_flags::FeatureFlags;

/// How a batch of pending items is worked through.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchMode {
    Sequential,
    Parallel { max_workers: usize },
}

/// What a caption request turned into.
pub enum CaptionPlan {
    /// The item already has a caption; nothing was started.
    AlreadyCaptioned,
    /// Every item in the collection already has a caption.
    NothingPending,
    Narrate(BatchLines),
}

/// Entry point for captioning single items or whole collections.
pub struct CaptionUseCase {
    runner: TranscriptionRunner,
    scheduler: ParallelScheduler,
}

impl CaptionUseCase {
    pub fn new(runner: TranscriptionRunner) -> Self {
        Self {
            scheduler: ParallelScheduler::new(runner.clone()),
            runner,
        }
    }

    pub fn caption_item(&self, request: TranscriptionRequest) -> CaptionPlan {
        if self
            .runner
            .library()
            .has_caption(&request.collection, &request.item)
        {
            log::info!("{} already has a caption", request.key());
            return CaptionPlan::AlreadyCaptioned;
        }
        CaptionPlan::Narrate(Box::new(self.runner.run(request)))
    }

    /// Caption every pending item of `collection`. Parallel mode only
    /// applies when more than one item is pending.
    pub fn caption_collection(
        &self,
        collection: &str,
        features: FeatureFlags,
        mode: BatchMode,
    ) -> io::Result<CaptionPlan> {
        let pending = self.runner.library().pending_items(collection)?;
        if pending.is_empty() {
            return Ok(CaptionPlan::NothingPending);
        }
        log::info!("{} pending items in {collection}", pending.len());

        let lines: BatchLines = match mode {
            BatchMode::Parallel { max_workers } if pending.len() > 1 => Box::new(
                self.scheduler
                    .run_parallel(collection, pending, max_workers, features),
            ),
            _ => self.scheduler.run_sequential(collection, pending, features),
        };
        Ok(CaptionPlan::Narrate(lines))
    }
}
