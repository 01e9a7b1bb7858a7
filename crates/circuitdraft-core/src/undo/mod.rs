//! Undo/redo: a linear action log plus the processor that replays it on a document.

mod action;
mod manager;
mod processor;

pub use action::{ActionEvent, RemovedComponent, UndoAction, UndoCommand};
pub use manager::{ActionOccurred, HistoryChange, HistoryConfig, UndoManager};
pub use processor::{ActionProcessor, DocumentProcessor, ProcessError, RedrawSink};

use thiserror::Error;

/// Errors from stepping through the history.
#[derive(Debug, Error)]
pub enum UndoError<E> {
    /// Stepping past either end of the history.
    #[error("Nothing to {0}")]
    InvalidHistoryOperation(&'static str),
    /// The processor could not apply the action; the history did not move.
    #[error("Action could not be processed: {0}")]
    Processor(E),
}
