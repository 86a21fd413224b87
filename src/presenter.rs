//! Rendering of pipeline events.
//!
//! Presenters only ever see events, in the order they were produced, and are
//! interchangeable: the same run can go to the console, to the log or out as
//! JSON lines.

use crate::core::event::{Event, EventKind};
use crate::error::Result;
use std::io::Write;
use tracing::info;

pub trait Presenter {
    fn present(&mut self, event: &Event) -> Result<()>;
}

/// Prints one human-readable line per event to stdout.
#[derive(Debug, Default)]
pub struct ConsolePresenter;

impl Presenter for ConsolePresenter {
    fn present(&mut self, event: &Event) -> Result<()> {
        println!("{}", event.describe());
        Ok(())
    }
}

/// Emits each event as an `info` record.
#[derive(Debug, Default)]
pub struct LogPresenter;

impl Presenter for LogPresenter {
    fn present(&mut self, event: &Event) -> Result<()> {
        match event {
            Event::TypeDetectionSuccess { suggested_type } => {
                info!(kind = %event.kind(), suggested_type = %suggested_type, "{}", event.kind().label())
            }
            _ => info!(kind = %event.kind(), "{}", event.kind().label()),
        }
        Ok(())
    }
}

/// Writes one JSON object per event.
pub struct JsonPresenter<W> {
    writer: W,
}

impl<W: Write> JsonPresenter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Presenter for JsonPresenter<W> {
    fn present(&mut self, event: &Event) -> Result<()> {
        serde_json::to_writer(&mut self.writer, event)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Keeps every event it is shown.
#[derive(Debug, Default)]
pub struct RecordingPresenter {
    pub events: Vec<Event>,
}

impl Presenter for RecordingPresenter {
    fn present(&mut self, event: &Event) -> Result<()> {
        self.events.push(*event);
        Ok(())
    }
}

/// What a finished run amounted to, judged from its events alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Succeeded,
    Failed,
}

impl RunOutcome {
    pub fn from_events<'a, I>(events: I) -> Self
    where
        I: IntoIterator<Item = &'a Event>,
    {
        let mut tracker = OutcomeTracker::default();
        for event in events {
            tracker.observe(event);
        }
        tracker.outcome()
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Succeeded)
    }
}

#[derive(Default)]
struct OutcomeTracker {
    extracted: bool,
    finished_after_success: bool,
}

impl OutcomeTracker {
    fn observe(&mut self, event: &Event) {
        match event.kind() {
            EventKind::ExtractSuccess => self.extracted = true,
            EventKind::ExtractFailed => self.extracted = false,
            EventKind::ExtractFinished => self.finished_after_success = self.extracted,
            _ => {}
        }
    }

    fn outcome(&self) -> RunOutcome {
        if self.finished_after_success {
            RunOutcome::Succeeded
        } else {
            RunOutcome::Failed
        }
    }
}

/// Feeds a run's events to `presenter` as they are produced.
pub fn present_all<I, P>(events: I, presenter: &mut P) -> Result<RunOutcome>
where
    I: IntoIterator<Item = Event>,
    P: Presenter + ?Sized,
{
    let mut tracker = OutcomeTracker::default();
    for event in events {
        presenter.present(&event)?;
        tracker.observe(&event);
    }
    Ok(tracker.outcome())
}
