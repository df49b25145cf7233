use crate::constants::{FAILED_LABEL, WARNING_LABEL};
use crate::formats::MediaType;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ITEM_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier of a queued item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(u64);

impl ItemId {
    fn next() -> Self {
        ItemId(NEXT_ITEM_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item-{}", self.0)
    }
}

/// Per-item processing status
///
/// `Pending → Processing → {Done | Warning | Failed}`; terminal states are
/// final for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus {
    Pending,
    Processing,
    /// Result fits the user target
    Done,
    /// Result could not be brought under the user target
    Warning,
    /// Unexpected fault, no result bytes
    Failed,
}

impl ItemStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemStatus::Done | ItemStatus::Warning | ItemStatus::Failed)
    }

    /// User-visible label for the status
    pub fn label(&self) -> &'static str {
        match self {
            ItemStatus::Pending => "Pending",
            ItemStatus::Processing => "Processing",
            ItemStatus::Done => "Done",
            ItemStatus::Warning => WARNING_LABEL,
            ItemStatus::Failed => FAILED_LABEL,
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A file handed to the queue by the caller
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub media_type: MediaType,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, media_type: MediaType, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type,
            bytes,
        }
    }
}

/// One queued file and its processing state
#[derive(Debug, Clone)]
pub struct QueueItem {
    id: ItemId,
    name: String,
    media_type: MediaType,
    source_bytes: Vec<u8>,
    status: ItemStatus,
    result_bytes: Option<Vec<u8>>,
    result_is_original: bool,
    error_message: Option<String>,
}

impl QueueItem {
    pub fn new(file: SourceFile) -> Self {
        Self {
            id: ItemId::next(),
            name: file.name,
            media_type: file.media_type,
            source_bytes: file.bytes,
            status: ItemStatus::Pending,
            result_bytes: None,
            result_is_original: false,
            error_message: None,
        }
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    pub fn source_bytes(&self) -> &[u8] {
        &self.source_bytes
    }

    pub fn source_size(&self) -> u64 {
        self.source_bytes.len() as u64
    }

    pub fn status(&self) -> ItemStatus {
        self.status
    }

    pub fn result_bytes(&self) -> Option<&[u8]> {
        self.result_bytes.as_deref()
    }

    pub fn result_size(&self) -> Option<u64> {
        self.result_bytes.as_ref().map(|bytes| bytes.len() as u64)
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Whether the final bytes are the untouched source
    pub fn rolled_back(&self) -> bool {
        self.result_is_original
    }

    /// Media type of the final bytes
    ///
    /// Re-encoded images are always JPEG; documents and rolled-back items keep
    /// their source type.
    pub fn result_media_type(&self) -> MediaType {
        if self.media_type.is_document() || self.result_is_original {
            self.media_type
        } else {
            MediaType::Jpeg
        }
    }

    pub(crate) fn start(&mut self) {
        debug_assert_eq!(self.status, ItemStatus::Pending);
        self.status = ItemStatus::Processing;
    }

    /// Record a finished result, rolling back to the source bytes when the
    /// result is not strictly smaller
    pub(crate) fn finish(&mut self, status: ItemStatus, result: Vec<u8>) {
        debug_assert!(status.is_terminal() && status != ItemStatus::Failed);
        if result.len() >= self.source_bytes.len() {
            self.result_bytes = Some(self.source_bytes.clone());
            self.result_is_original = true;
        } else {
            self.result_bytes = Some(result);
            self.result_is_original = false;
        }
        self.status = status;
        self.error_message = None;
    }

    pub(crate) fn fail(&mut self, message: String) {
        self.status = ItemStatus::Failed;
        self.result_bytes = None;
        self.result_is_original = false;
        self.error_message = Some(message);
    }
}
