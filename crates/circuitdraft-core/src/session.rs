//! An editing session: one open document, its undo history and the glue between them.
//!
//! Every edit goes through the session so that the document, the connection
//! links and the history stay consistent. A session is single-threaded; the
//! UI owns it and calls into it from its event loop.

use crate::component::{Component, ComponentId};
use crate::config::EditorConfig;
use crate::connection;
use crate::document::CircuitDocument;
use crate::storage::{Storage, StorageError};
use crate::undo::{
    ActionOccurred, DocumentProcessor, ProcessError, RedrawSink, RemovedComponent, UndoAction,
    UndoError, UndoManager,
};
use kurbo::Vec2;
use thiserror::Error;

/// Errors surfaced to the caller of session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Component {0} is not in the document")]
    MissingComponent(ComponentId),
    #[error("Edit would change the kind or connection points of component {0}")]
    GeometryChanged(ComponentId),
    #[error(transparent)]
    Undo(#[from] UndoError<ProcessError>),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Owns the open document and its history.
pub struct EditorSession {
    config: EditorConfig,
    document: CircuitDocument,
    history: UndoManager,
    sink: Box<dyn RedrawSink>,
    /// Storage key of the document, once opened or saved.
    document_key: Option<String>,
}

impl EditorSession {
    /// Start a session with an empty document and no redraw hook.
    pub fn new(config: EditorConfig) -> Self {
        Self::with_sink(config, Box::new(()))
    }

    /// Start a session that reports redraws to `sink`.
    pub fn with_sink(config: EditorConfig, sink: Box<dyn RedrawSink>) -> Self {
        let document = CircuitDocument::with_size(config.default_width, config.default_height);
        let history = UndoManager::with_config(config.history());
        Self {
            config,
            document,
            history,
            sink,
            document_key: None,
        }
    }

    pub fn document(&self) -> &CircuitDocument {
        &self.document
    }

    pub fn history(&self) -> &UndoManager {
        &self.history
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Storage key used by [`EditorSession::save`].
    pub fn document_key(&self) -> Option<&str> {
        self.document_key.as_deref()
    }

    /// Register for history notifications (dirty indicator, undo/redo enablement).
    pub fn subscribe(&mut self, listener: impl FnMut(&ActionOccurred) + 'static) {
        self.history.subscribe(listener);
    }

    /// Replace the document with a new empty one and clear the history.
    pub fn new_document(&mut self, width: f64, height: f64) {
        self.replace_document(CircuitDocument::with_size(width, height), None);
    }

    /// Load a document from storage, replacing the current one.
    ///
    /// On failure the current document and history are kept.
    pub async fn open<S: Storage + ?Sized>(
        &mut self,
        storage: &S,
        key: &str,
    ) -> Result<(), SessionError> {
        let document = storage.load(key).await?;
        log::info!("Opened '{}' ({} components)", key, document.len());
        self.replace_document(document, Some(key.to_string()));
        Ok(())
    }

    /// Save under the current key (or the document id) and mark the history clean.
    pub async fn save<S: Storage + ?Sized>(&mut self, storage: &S) -> Result<(), SessionError> {
        let key = self
            .document_key
            .clone()
            .unwrap_or_else(|| self.document.id.clone());
        self.save_as(storage, &key).await
    }

    /// Save under a new key, which becomes the current one.
    pub async fn save_as<S: Storage + ?Sized>(
        &mut self,
        storage: &S,
        key: &str,
    ) -> Result<(), SessionError> {
        storage.save(key, &self.document).await?;
        log::info!("Saved '{}'", key);
        self.document_key = Some(key.to_string());
        self.history.set_save_index();
        Ok(())
    }

    fn replace_document(&mut self, mut document: CircuitDocument, key: Option<String>) {
        connection::resolve_all(&mut document);
        self.document = document;
        self.document_key = key;
        self.history.clear();
        self.sink.draw_connections(&self.document);
    }

    /// Place a new component and record it.
    pub fn place_component(&mut self, mut component: Component) -> ComponentId {
        component.clear_links();
        let id = component.id();
        let action = UndoAction::add(format!("place {}", component.kind), component.clone());

        self.document.add_component(component);
        connection::reset_connections(&mut self.document, id);
        connection::apply_connections(&mut self.document, id);
        self.history.add_action(action);
        self.connections_changed();
        id
    }

    /// Delete components and record the deletion. Unknown ids are skipped.
    ///
    /// Returns the number of components removed.
    pub fn delete_components(&mut self, ids: &[ComponentId]) -> usize {
        let mut removed = Vec::new();
        for &id in ids {
            if !self.document.contains(id) {
                continue;
            }
            connection::disconnect_connections(&mut self.document, id);
            if let Some((index, component)) = self.document.remove_component(id) {
                removed.push(RemovedComponent { index, component });
            }
        }
        if removed.is_empty() {
            return 0;
        }

        let count = removed.len();
        self.history.add_action(UndoAction::delete("delete", removed));
        self.connections_changed();
        count
    }

    /// Record an edit the UI already made to a component.
    ///
    /// `previous_data` is the component's snapshot string from before the edit.
    pub fn update_component(
        &mut self,
        id: ComponentId,
        previous_data: String,
    ) -> Result<(), SessionError> {
        let component = self.document.get(id).ok_or(SessionError::MissingComponent(id))?;
        let after = component.serialize_to_string();
        self.history
            .add_action(UndoAction::modify("edit", id, previous_data, after));

        connection::reset_connections(&mut self.document, id);
        connection::apply_connections(&mut self.document, id);
        self.connections_changed();
        Ok(())
    }

    /// Edit a component and record the change.
    ///
    /// The edit runs on a copy. Only location and properties may change, since
    /// those are all a snapshot can restore; an edit touching the kind or the
    /// connection points is rejected and the document is left as it was. Links
    /// are recomputed from positions, so changes the edit makes to them are
    /// discarded. Nothing is recorded if the configuration is unchanged.
    pub fn edit_component(
        &mut self,
        id: ComponentId,
        edit: impl FnOnce(&mut Component),
    ) -> Result<(), SessionError> {
        let original = self
            .document
            .get(id)
            .ok_or(SessionError::MissingComponent(id))?;
        let before = original.serialize_to_string();
        let mut edited = original.clone();
        edit(&mut edited);
        if !same_geometry(original, &edited) {
            return Err(SessionError::GeometryChanged(id));
        }
        for (point, old) in edited.connection_points.iter_mut().zip(&original.connection_points) {
            point.links = old.links.clone();
        }
        let changed = edited.serialize_to_string() != before;

        if let Some(component) = self.document.get_mut(id) {
            *component = edited;
        }
        if !changed {
            connection::reset_connections(&mut self.document, id);
            connection::apply_connections(&mut self.document, id);
            return Ok(());
        }
        if let Some(component) = self.document.get(id) {
            self.sink.redraw_component(component);
        }
        self.update_component(id, before)
    }

    /// Move several components by `delta` as one undoable step.
    pub fn move_components(
        &mut self,
        ids: &[ComponentId],
        delta: Vec2,
    ) -> Result<(), SessionError> {
        if let Some(&missing) = ids.iter().find(|&&id| !self.document.contains(id)) {
            return Err(SessionError::MissingComponent(missing));
        }

        let mut changes = Vec::with_capacity(ids.len());
        for &id in ids {
            if let Some(component) = self.document.get_mut(id) {
                let before = component.serialize_to_string();
                component.location += delta;
                changes.push((id, before, component.serialize_to_string()));
                self.sink.redraw_component(component);
            }
        }
        for &id in ids {
            connection::reset_connections(&mut self.document, id);
            connection::apply_connections(&mut self.document, id);
        }
        self.history.add_action(UndoAction::modify_many("move", changes));
        self.connections_changed();
        Ok(())
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_step_backwards()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_step_forwards()
    }

    /// Revert the last edit.
    pub fn undo(&mut self) -> Result<(), SessionError> {
        let mut processor = DocumentProcessor::new(&mut self.document, self.sink.as_mut());
        self.history.step_backwards(&mut processor).map_err(|e| {
            log::warn!("Undo failed: {}", e);
            e
        })?;
        self.check_links();
        Ok(())
    }

    /// Re-apply the last undone edit.
    pub fn redo(&mut self) -> Result<(), SessionError> {
        let mut processor = DocumentProcessor::new(&mut self.document, self.sink.as_mut());
        self.history.step_forwards(&mut processor).map_err(|e| {
            log::warn!("Redo failed: {}", e);
            e
        })?;
        self.check_links();
        Ok(())
    }

    /// True iff the document differs from the last save.
    pub fn is_dirty(&self) -> bool {
        !self.history.is_saved_state()
    }

    /// Window title, with `*` after the name when there are unsaved changes.
    pub fn title(&self) -> String {
        let marker = if self.is_dirty() { "*" } else { "" };
        format!("{}{} - {}", self.document.name, marker, self.config.application_name)
    }

    fn connections_changed(&mut self) {
        self.sink.draw_connections(&self.document);
        self.check_links();
    }

    fn check_links(&self) {
        if cfg!(debug_assertions) {
            for (from, to) in connection::dangling_links(&self.document) {
                log::warn!(
                    "Dangling link {}:{} -> {}:{}",
                    from.component,
                    from.point,
                    to.component,
                    to.point
                );
            }
        }
    }
}

/// True iff both components have the same kind and connection point layout.
fn same_geometry(a: &Component, b: &Component) -> bool {
    a.kind == b.kind
        && a.connection_points.len() == b.connection_points.len()
        && a.connection_points
            .iter()
            .zip(&b.connection_points)
            .all(|(p, q)| p.name == q.name && p.offset == q.offset)
}
