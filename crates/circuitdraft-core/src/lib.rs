//! CircuitDraft Core Library
//!
//! Document model, connection resolution and undo/redo for the CircuitDraft
//! schematic editor. Rendering, dialogs and the component registry live
//! outside this crate; they talk to it through [`EditorSession`],
//! [`RedrawSink`] and [`Storage`].

pub mod component;
pub mod config;
pub mod connection;
pub mod document;
pub mod session;
pub mod storage;
pub mod undo;

pub use component::{
    Component, ComponentData, ComponentError, ComponentId, ConnectionPoint, ConnectionRef,
};
pub use config::{ConfigError, EditorConfig};
pub use connection::{Junction, apply_connections, disconnect_connections, reset_connections};
pub use document::CircuitDocument;
pub use session::{EditorSession, SessionError};
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};
pub use undo::{
    ActionEvent, ActionOccurred, ActionProcessor, DocumentProcessor, HistoryChange, RedrawSink,
    UndoAction, UndoCommand, UndoError, UndoManager,
};
