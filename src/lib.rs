//! arcfetch library
//!
//! Downloads an archive into memory, works out whether it is a zip or a
//! tar.gz and extracts it, reporting every stage as an [`Event`].

pub mod commands;
pub mod core;
pub mod error;
pub mod presenter;
pub mod utils;

pub use crate::core::detect::FormatTag;
pub use crate::core::event::{Event, EventKind};
pub use crate::core::fetch::{ByteBuffer, Fetch, HttpFetcher};
pub use crate::core::pipeline::{ExtractionPipeline, ExtractionRun};
pub use crate::error::{ArcfetchError, ExtractError, FetchError, Result};
pub use crate::presenter::{present_all, Presenter, RunOutcome};
