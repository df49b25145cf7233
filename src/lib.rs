pub mod batch;
pub mod cli;
pub mod compressor;
pub mod config;
pub mod constants;
pub mod document;
pub mod error;
pub mod formats;
pub mod info;
pub mod logger;
pub mod processing;
pub mod queue;
pub mod utils;
pub mod validation;

pub use batch::{BatchOrchestrator, BatchRun, BatchSummary, ProgressEvent};
pub use compressor::{CompressionOutcome, Engine, MediaCompressor};
pub use config::{SearchTuning, TargetPolicy};
pub use error::{CompressionError, Result};
pub use formats::MediaType;
pub use info::{analyze, get_media_info, plan_search, MediaDetail, MediaInfo, SearchPlan};
pub use queue::{ItemId, ItemStatus, QueueItem, SourceFile};
pub use utils::{export_file_name, format_file_size};
pub use validation::{collect_all_inputs, collect_input_files, load_source_file};
