//! Progress events produced by the extraction pipeline.
//!
//! Consumers switch on [`Event`] (or its [`EventKind`]) and never need to
//! talk to the pipeline otherwise: every outcome is visible in the events.

use crate::core::detect::FormatTag;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// One step of an extraction run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Event {
    ExtractStarted,
    UrlMissing,
    DownloadStarted,
    DownloadSuccess,
    DownloadAborted,
    TypeDetectionStarted,
    TypeDetectionSuccess { suggested_type: FormatTag },
    TypeDetectionFailed,
    SwitchToTryAllMode,
    ExtractSuccess,
    ExtractFailed,
    ExtractFinished,
}

/// Payload-free identifier of an [`Event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    ExtractStarted,
    UrlMissing,
    DownloadStarted,
    DownloadSuccess,
    DownloadAborted,
    TypeDetectionStarted,
    TypeDetectionSuccess,
    TypeDetectionFailed,
    SwitchToTryAllMode,
    ExtractSuccess,
    ExtractFailed,
    ExtractFinished,
}

/// Structured data attached to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Payload {
    SuggestedType(FormatTag),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::ExtractStarted => EventKind::ExtractStarted,
            Event::UrlMissing => EventKind::UrlMissing,
            Event::DownloadStarted => EventKind::DownloadStarted,
            Event::DownloadSuccess => EventKind::DownloadSuccess,
            Event::DownloadAborted => EventKind::DownloadAborted,
            Event::TypeDetectionStarted => EventKind::TypeDetectionStarted,
            Event::TypeDetectionSuccess { .. } => EventKind::TypeDetectionSuccess,
            Event::TypeDetectionFailed => EventKind::TypeDetectionFailed,
            Event::SwitchToTryAllMode => EventKind::SwitchToTryAllMode,
            Event::ExtractSuccess => EventKind::ExtractSuccess,
            Event::ExtractFailed => EventKind::ExtractFailed,
            Event::ExtractFinished => EventKind::ExtractFinished,
        }
    }

    pub fn payload(&self) -> Option<Payload> {
        match self {
            Event::TypeDetectionSuccess { suggested_type } => {
                Some(Payload::SuggestedType(*suggested_type))
            }
            _ => None,
        }
    }

    /// Human-readable rendering, including the payload when there is one.
    pub fn describe(&self) -> String {
        match self {
            Event::TypeDetectionSuccess { suggested_type } => {
                format!("{} \"{suggested_type}\"", self.kind().label())
            }
            _ => self.kind().label().to_string(),
        }
    }
}

impl EventKind {
    pub const ALL: [EventKind; 12] = [
        EventKind::ExtractStarted,
        EventKind::UrlMissing,
        EventKind::DownloadStarted,
        EventKind::DownloadSuccess,
        EventKind::DownloadAborted,
        EventKind::TypeDetectionStarted,
        EventKind::TypeDetectionSuccess,
        EventKind::TypeDetectionFailed,
        EventKind::SwitchToTryAllMode,
        EventKind::ExtractSuccess,
        EventKind::ExtractFailed,
        EventKind::ExtractFinished,
    ];

    /// Stable identifier consumers may match on.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ExtractStarted => "EXTRACT_STARTED",
            EventKind::UrlMissing => "URL_MISSING",
            EventKind::DownloadStarted => "DOWNLOAD_STARTED",
            EventKind::DownloadSuccess => "DOWNLOAD_SUCCESS",
            EventKind::DownloadAborted => "DOWNLOAD_ABORTED",
            EventKind::TypeDetectionStarted => "TYPE_DETECTION_STARTED",
            EventKind::TypeDetectionSuccess => "TYPE_DETECTION_SUCCESS",
            EventKind::TypeDetectionFailed => "TYPE_DETECTION_FAILED",
            EventKind::SwitchToTryAllMode => "SWITCH_TO_TRY_ALL_MODE",
            EventKind::ExtractSuccess => "EXTRACT_SUCCESS",
            EventKind::ExtractFailed => "EXTRACT_FAILED",
            EventKind::ExtractFinished => "EXTRACT_FINISHED",
        }
    }

    pub fn label(&self) -> &'static str {
        label(self.as_str())
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static LABELS: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        ("EXTRACT_STARTED", "Extraction started."),
        ("URL_MISSING", "No url provided."),
        ("DOWNLOAD_STARTED", "Downloading archive..."),
        ("DOWNLOAD_SUCCESS", "Download complete."),
        ("DOWNLOAD_ABORTED", "Process aborted: download failed."),
        ("TYPE_DETECTION_STARTED", "Guessing archive type from URL..."),
        ("TYPE_DETECTION_SUCCESS", "Suggested type is:"),
        ("TYPE_DETECTION_FAILED", "Could not suggest type from URL."),
        ("SWITCH_TO_TRY_ALL_MODE", "Trying known formats."),
        ("EXTRACT_SUCCESS", "Successfully extracted."),
        ("EXTRACT_FAILED", "Extract process failed."),
        ("EXTRACT_FINISHED", "Done."),
    ])
});

/// Looks up the label for an event identifier, echoing the identifier back
/// when no label is registered.
pub fn label(identifier: &str) -> &str {
    LABELS.get(identifier).copied().unwrap_or(identifier)
}
