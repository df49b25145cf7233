use crate::compressor::{CompressionOutcome, Engine, MediaCompressor};
use crate::config::TargetPolicy;
use crate::error::{CompressionError, Result};
use crate::formats::MediaType;
use crate::queue::{ItemId, ItemStatus, QueueItem, SourceFile};
use crate::utils::percent_saved;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, info, trace, warn};

/// Progress reported while a batch runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// The item at `index` moved to `Processing`
    Started {
        index: usize,
        total: usize,
        id: ItemId,
    },
    /// The item at `index` reached a terminal state
    Finished {
        index: usize,
        total: usize,
        id: ItemId,
        status: ItemStatus,
        result_size: Option<u64>,
    },
    /// Every item has been processed
    Completed(BatchSummary),
}

/// Aggregate totals of a finished batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub done: usize,
    pub warning: usize,
    pub failed: usize,
    pub total_original_bytes: u64,
    /// Final output size; failed items count their original size
    pub total_result_bytes: u64,
}

impl BatchSummary {
    pub fn from_items(items: &[QueueItem]) -> Self {
        let mut summary = BatchSummary::default();
        for item in items {
            match item.status() {
                ItemStatus::Done => summary.done += 1,
                ItemStatus::Warning => summary.warning += 1,
                ItemStatus::Failed => summary.failed += 1,
                ItemStatus::Pending | ItemStatus::Processing => {}
            }
            summary.total_original_bytes += item.source_size();
            summary.total_result_bytes += item.result_size().unwrap_or(item.source_size());
        }
        summary
    }

    pub fn processed(&self) -> usize {
        self.done + self.warning + self.failed
    }

    pub fn saved_bytes(&self) -> u64 {
        self.total_original_bytes
            .saturating_sub(self.total_result_bytes)
    }

    /// Percentage saved over the whole batch, floored at zero
    pub fn percent_saved(&self) -> u64 {
        percent_saved(self.total_original_bytes, self.total_result_bytes)
    }
}

/// Owns the queue and dispatches items, one at a time, to a compressor
pub struct BatchOrchestrator<C = Engine> {
    items: Vec<QueueItem>,
    compressor: C,
}

impl BatchOrchestrator<Engine> {
    pub fn new() -> Self {
        Self::with_compressor(Engine::default())
    }
}

impl Default for BatchOrchestrator<Engine> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: MediaCompressor> BatchOrchestrator<C> {
    pub fn with_compressor(compressor: C) -> Self {
        Self {
            items: Vec::new(),
            compressor,
        }
    }

    pub fn items(&self) -> &[QueueItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: ItemId) -> Option<&QueueItem> {
        self.items.iter().find(|item| item.id() == id)
    }

    /// Queue a file whose media type is already known
    pub fn add_file(&mut self, file: SourceFile) -> ItemId {
        let item = QueueItem::new(file);
        let id = item.id();
        debug!("queued {} ({}, {} bytes)", item.name(), item.media_type(), item.source_size());
        self.items.push(item);
        id
    }

    pub fn add_files(&mut self, files: impl IntoIterator<Item = SourceFile>) -> Vec<ItemId> {
        files.into_iter().map(|file| self.add_file(file)).collect()
    }

    /// Queue a file by its declared MIME type
    ///
    /// Types outside `pdf | jpeg | png | webp` never enter the queue.
    pub fn accept(&mut self, name: &str, mime: &str, bytes: Vec<u8>) -> Result<ItemId> {
        let media_type = MediaType::from_mime(mime)?;
        Ok(self.add_file(SourceFile::new(name, media_type, bytes)))
    }

    /// Remove a pending item from the queue
    pub fn remove(&mut self, id: ItemId) -> Option<QueueItem> {
        let index = self
            .items
            .iter()
            .position(|item| item.id() == id && item.status() == ItemStatus::Pending)?;
        Some(self.items.remove(index))
    }

    /// Drop every item so a new batch can be submitted
    pub fn reset(&mut self) {
        self.items.clear();
    }

    pub fn summary(&self) -> BatchSummary {
        BatchSummary::from_items(&self.items)
    }

    /// Start processing the queue against `policy`.
    ///
    /// The returned iterator does the work lazily: each call to `next`
    /// advances exactly one item by one state, so progress events for an
    /// item are always emitted before the next item starts. A queue that
    /// has already been run must be reset first.
    ///
    /// A panicking compressor fails only its own item. The process panic
    /// hook still fires for it; see [`crate::logger::install_panic_hook`].
    pub fn run(&mut self, policy: TargetPolicy) -> Result<BatchRun<'_, C>> {
        if self
            .items
            .iter()
            .any(|item| item.status() != ItemStatus::Pending)
        {
            return Err(CompressionError::BatchAlreadyProcessed);
        }

        info!(
            "processing {} items against a {} byte target",
            self.items.len(),
            policy.user_target_bytes()
        );
        trace!("internal image target: {} bytes", policy.internal_target_bytes());

        Ok(BatchRun {
            items: &mut self.items,
            compressor: &self.compressor,
            policy,
            cursor: 0,
            completed: false,
        })
    }

    /// Run the whole queue, discarding intermediate events
    pub fn run_to_completion(&mut self, policy: TargetPolicy) -> Result<BatchSummary> {
        let mut summary = BatchSummary::default();
        for event in self.run(policy)? {
            if let ProgressEvent::Completed(done) = event {
                summary = done;
            }
        }
        Ok(summary)
    }
}

/// A single pass over the queue, yielding [`ProgressEvent`]s
pub struct BatchRun<'a, C> {
    items: &'a mut [QueueItem],
    compressor: &'a C,
    policy: TargetPolicy,
    cursor: usize,
    completed: bool,
}

impl<C: MediaCompressor> Iterator for BatchRun<'_, C> {
    type Item = ProgressEvent;

    fn next(&mut self) -> Option<ProgressEvent> {
        let total = self.items.len();

        if self.cursor < total {
            let index = self.cursor;
            let item = &mut self.items[index];

            if item.status() == ItemStatus::Pending {
                item.start();
                return Some(ProgressEvent::Started {
                    index,
                    total,
                    id: item.id(),
                });
            }

            process_item(item, self.compressor, &self.policy);
            self.cursor += 1;
            return Some(ProgressEvent::Finished {
                index,
                total,
                id: item.id(),
                status: item.status(),
                result_size: item.result_size(),
            });
        }

        if self.completed {
            return None;
        }
        self.completed = true;
        Some(ProgressEvent::Completed(BatchSummary::from_items(self.items)))
    }
}

fn dispatch<C: MediaCompressor>(
    item: &QueueItem,
    compressor: &C,
    policy: &TargetPolicy,
) -> Result<CompressionOutcome> {
    if item.media_type().is_document() {
        compressor.compress_document(item.source_bytes())
    } else {
        compressor.compress_image(item.source_bytes(), policy.internal_target_bytes())
    }
}

fn process_item<C: MediaCompressor>(item: &mut QueueItem, compressor: &C, policy: &TargetPolicy) {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| dispatch(item, compressor, policy)));

    match outcome {
        Ok(Ok(outcome)) => {
            if !outcome.is_compressed() {
                debug!("{}: compressor kept the original bytes", item.name());
            }
            let result = outcome.into_bytes(item.source_bytes());
            let status = policy.judge(result.len() as u64);
            item.finish(status, result);
            debug!(
                "{}: {} -> {} bytes ({})",
                item.name(),
                item.source_size(),
                item.result_size().unwrap_or_default(),
                status
            );
        }
        Ok(Err(e)) => {
            warn!("{}: compression failed: {}", item.name(), e);
            item.fail(e.to_string());
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!("{}: compressor panicked: {}", item.name(), message);
            item.fail(CompressionError::CompressorFault(message).to_string());
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Compressor that answers from a closure and records what it was asked
    struct ScriptedCompressor<F> {
        respond: F,
        calls: RefCell<Vec<(u8, Option<u64>)>>,
    }

    impl<F> ScriptedCompressor<F>
    where
        F: Fn(&[u8], Option<u64>) -> Result<CompressionOutcome>,
    {
        fn new(respond: F) -> Self {
            Self {
                respond,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl<F> MediaCompressor for ScriptedCompressor<F>
    where
        F: Fn(&[u8], Option<u64>) -> Result<CompressionOutcome>,
    {
        fn compress_image(&self, bytes: &[u8], target_bytes: u64) -> Result<CompressionOutcome> {
            self.calls.borrow_mut().push((bytes[0], Some(target_bytes)));
            (self.respond)(bytes, Some(target_bytes))
        }

        fn compress_document(&self, bytes: &[u8]) -> Result<CompressionOutcome> {
            self.calls.borrow_mut().push((bytes[0], None));
            (self.respond)(bytes, None)
        }
    }

    fn file(tag: u8, media_type: MediaType, size: usize) -> SourceFile {
        SourceFile::new(format!("file-{}", tag), media_type, vec![tag; size])
    }

    fn shrink_to(size: usize) -> CompressionOutcome {
        CompressionOutcome::Compressed(vec![0u8; size])
    }

    #[test]
    fn test_status_judged_against_user_target() {
        let compressor = ScriptedCompressor::new(|_, _| Ok(shrink_to(150 * 1024)));
        let mut orchestrator = BatchOrchestrator::with_compressor(compressor);
        orchestrator.add_file(file(1, MediaType::Jpeg, 1024 * 1024));

        let policy = TargetPolicy::new(200 * 1024).unwrap();
        orchestrator.run_to_completion(policy).unwrap();

        let item = &orchestrator.items()[0];
        assert_eq!(item.status(), ItemStatus::Done);
        assert_eq!(item.result_size(), Some(150 * 1024));
        assert_eq!(
            orchestrator.compressor.calls.borrow().as_slice(),
            &[(1, Some(100 * 1024))]
        );
    }

    #[test]
    fn test_warning_when_user_target_missed() {
        let compressor = ScriptedCompressor::new(|_, _| Ok(shrink_to(300 * 1024)));
        let mut orchestrator = BatchOrchestrator::with_compressor(compressor);
        orchestrator.add_file(file(1, MediaType::Png, 1024 * 1024));

        orchestrator
            .run_to_completion(TargetPolicy::from_kb(200).unwrap())
            .unwrap();

        let item = &orchestrator.items()[0];
        assert_eq!(item.status(), ItemStatus::Warning);
        assert_eq!(item.result_size(), Some(300 * 1024));
        assert!(!item.rolled_back());
    }

    #[test]
    fn test_document_rollback_when_reserialization_grows() {
        let compressor = ScriptedCompressor::new(|_, _| Ok(shrink_to(520_000)));
        let mut orchestrator = BatchOrchestrator::with_compressor(compressor);
        orchestrator.add_file(file(9, MediaType::Pdf, 500_000));

        orchestrator
            .run_to_completion(TargetPolicy::from_kb(200).unwrap())
            .unwrap();

        let item = &orchestrator.items()[0];
        assert_eq!(item.status(), ItemStatus::Warning);
        assert_eq!(item.result_bytes(), Some(item.source_bytes()));
        assert_eq!(item.result_size(), Some(500_000));
        assert_eq!(orchestrator.compressor.calls.borrow().as_slice(), &[(9, None)]);
    }

    #[test]
    fn test_unchanged_outcome_uses_source_bytes() {
        let compressor = ScriptedCompressor::new(|_, _| Ok(CompressionOutcome::Unchanged));
        let mut orchestrator = BatchOrchestrator::with_compressor(compressor);
        orchestrator.add_file(file(3, MediaType::WebP, 1_000));

        orchestrator
            .run_to_completion(TargetPolicy::from_kb(200).unwrap())
            .unwrap();

        let item = &orchestrator.items()[0];
        assert_eq!(item.status(), ItemStatus::Done);
        assert_eq!(item.result_bytes(), Some(&[3u8; 1_000][..]));
        assert!(item.rolled_back());
    }

    #[test]
    fn test_events_are_strictly_sequential() {
        let compressor = ScriptedCompressor::new(|bytes, _| Ok(shrink_to(bytes.len() / 2)));
        let mut orchestrator = BatchOrchestrator::with_compressor(compressor);
        let ids = orchestrator.add_files(vec![
            file(1, MediaType::Jpeg, 100),
            file(2, MediaType::Pdf, 200),
            file(3, MediaType::Png, 300),
        ]);

        let events: Vec<_> = orchestrator
            .run(TargetPolicy::from_kb(1).unwrap())
            .unwrap()
            .collect();

        let order: Vec<(&str, ItemId)> = events
            .iter()
            .filter_map(|event| match event {
                ProgressEvent::Started { id, .. } => Some(("start", *id)),
                ProgressEvent::Finished { id, .. } => Some(("finish", *id)),
                ProgressEvent::Completed(_) => None,
            })
            .collect();
        assert_eq!(
            order,
            vec![
                ("start", ids[0]),
                ("finish", ids[0]),
                ("start", ids[1]),
                ("finish", ids[1]),
                ("start", ids[2]),
                ("finish", ids[2]),
            ]
        );
        assert!(matches!(events.last(), Some(ProgressEvent::Completed(_))));
        assert_eq!(events.len(), 7);
    }

    #[test]
    fn test_run_is_lazy() {
        let compressor = ScriptedCompressor::new(|_, _| Ok(shrink_to(10)));
        let mut orchestrator = BatchOrchestrator::with_compressor(compressor);
        orchestrator.add_files(vec![file(1, MediaType::Jpeg, 100), file(2, MediaType::Jpeg, 100)]);

        {
            let mut run = orchestrator.run(TargetPolicy::from_kb(1).unwrap()).unwrap();
            assert!(matches!(run.next(), Some(ProgressEvent::Started { index: 0, .. })));
        }

        assert!(orchestrator.compressor.calls.borrow().is_empty());
        assert_eq!(orchestrator.items()[0].status(), ItemStatus::Processing);
        assert_eq!(orchestrator.items()[1].status(), ItemStatus::Pending);
    }

    #[test]
    fn test_failed_item_does_not_abort_batch() {
        let compressor = ScriptedCompressor::new(|bytes, _| {
            if bytes[0] == 2 {
                Err(CompressionError::CompressorFault("allocation failed".to_string()))
            } else {
                Ok(shrink_to(bytes.len() / 2))
            }
        });
        let mut orchestrator = BatchOrchestrator::with_compressor(compressor);
        orchestrator.add_files(vec![
            file(1, MediaType::Jpeg, 1_000),
            file(2, MediaType::Jpeg, 1_000),
            file(3, MediaType::Pdf, 1_000),
        ]);

        let summary = orchestrator
            .run_to_completion(TargetPolicy::from_kb(1).unwrap())
            .unwrap();

        let statuses: Vec<_> = orchestrator.items().iter().map(|i| i.status()).collect();
        assert_eq!(
            statuses,
            vec![ItemStatus::Done, ItemStatus::Failed, ItemStatus::Done]
        );
        let failed = &orchestrator.items()[1];
        assert_eq!(failed.result_bytes(), None);
        assert!(failed.error_message().unwrap().contains("allocation failed"));

        assert_eq!(summary.done, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.total_original_bytes, 3_000);
        assert_eq!(summary.total_result_bytes, 500 + 1_000 + 500);
        assert_eq!(summary.percent_saved(), 33);
    }

    #[test]
    fn test_panicking_compressor_fails_only_that_item() {
        let compressor = ScriptedCompressor::new(|bytes, _| {
            if bytes[0] == 1 {
                panic!("decoder blew up");
            }
            Ok(shrink_to(1))
        });
        let mut orchestrator = BatchOrchestrator::with_compressor(compressor);
        orchestrator.add_files(vec![file(1, MediaType::Png, 10), file(2, MediaType::Png, 10)]);

        orchestrator
            .run_to_completion(TargetPolicy::from_kb(1).unwrap())
            .unwrap();

        let first = &orchestrator.items()[0];
        assert_eq!(first.status(), ItemStatus::Failed);
        assert!(first.error_message().unwrap().contains("decoder blew up"));
        assert_eq!(orchestrator.items()[1].status(), ItemStatus::Done);
    }

    #[test]
    fn test_rerun_requires_reset() {
        let compressor = ScriptedCompressor::new(|_, _| Ok(shrink_to(1)));
        let mut orchestrator = BatchOrchestrator::with_compressor(compressor);
        orchestrator.add_file(file(1, MediaType::Jpeg, 10));
        let policy = TargetPolicy::from_kb(1).unwrap();

        orchestrator.run_to_completion(policy).unwrap();
        assert!(matches!(
            orchestrator.run(policy),
            Err(CompressionError::BatchAlreadyProcessed)
        ));

        orchestrator.reset();
        assert!(orchestrator.is_empty());
        orchestrator.add_file(file(2, MediaType::Jpeg, 10));
        assert!(orchestrator.run(policy).is_ok());
    }

    #[test]
    fn test_empty_batch_completes_with_zero_summary() {
        let mut orchestrator = BatchOrchestrator::new();
        let events: Vec<_> = orchestrator
            .run(TargetPolicy::from_kb(200).unwrap())
            .unwrap()
            .collect();

        assert_eq!(events, vec![ProgressEvent::Completed(BatchSummary::default())]);
    }

    #[test]
    fn test_accept_rejects_unsupported_mime() {
        let mut orchestrator = BatchOrchestrator::new();
        assert!(orchestrator.accept("a.pdf", "application/pdf", vec![1]).is_ok());
        assert!(matches!(
            orchestrator.accept("a.gif", "image/gif", vec![1]),
            Err(CompressionError::UnsupportedFormat(_))
        ));
        assert_eq!(orchestrator.len(), 1);
    }

    #[test]
    fn test_remove_pending_item() {
        let mut orchestrator = BatchOrchestrator::new();
        let ids = orchestrator.add_files(vec![file(1, MediaType::Jpeg, 10), file(2, MediaType::Png, 10)]);

        let removed = orchestrator.remove(ids[0]).unwrap();
        assert_eq!(removed.name(), "file-1");
        assert!(orchestrator.get(ids[0]).is_none());
        assert!(orchestrator.get(ids[1]).is_some());
        assert!(orchestrator.remove(ids[0]).is_none());
    }

    #[test]
    fn test_summary_percent_floors_at_zero() {
        let summary = BatchSummary {
            done: 1,
            warning: 0,
            failed: 0,
            total_original_bytes: 100,
            total_result_bytes: 100,
        };
        assert_eq!(summary.saved_bytes(), 0);
        assert_eq!(summary.percent_saved(), 0);
        assert_eq!(summary.processed(), 1);
    }
}
