//! Applying undo actions to a circuit document.

use super::action::{ActionEvent, UndoAction, UndoCommand};
use crate::component::{Component, ComponentData, ComponentError, ComponentId};
use crate::connection;
use crate::document::CircuitDocument;
use std::collections::BTreeMap;
use thiserror::Error;

/// Knows how to apply an action in either direction.
pub trait ActionProcessor {
    type Error;

    /// Apply (`ActionEvent::Apply`) or revert (`ActionEvent::Remove`) an action.
    fn process(&mut self, event: ActionEvent, action: &UndoAction) -> Result<(), Self::Error>;
}

/// Hooks into whatever displays the document.
pub trait RedrawSink {
    /// A single component's configuration changed.
    fn redraw_component(&mut self, component: &Component);

    /// Component membership or links changed; redraw all connections.
    fn draw_connections(&mut self, document: &CircuitDocument);
}

impl RedrawSink for () {
    fn redraw_component(&mut self, _component: &Component) {}

    fn draw_connections(&mut self, _document: &CircuitDocument) {}
}

/// Errors raised while processing an action against a document.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Component {0} is not in the document")]
    MissingComponent(ComponentId),
    #[error("No {slot} snapshot for component {component}")]
    MissingSnapshot {
        slot: &'static str,
        component: ComponentId,
    },
    #[error("Snapshot for component {component} could not be loaded: {source}")]
    Snapshot {
        component: ComponentId,
        #[source]
        source: ComponentError,
    },
}

/// Processes actions against a borrowed document for the duration of one dispatch.
pub struct DocumentProcessor<'a> {
    document: &'a mut CircuitDocument,
    sink: &'a mut dyn RedrawSink,
}

impl<'a> DocumentProcessor<'a> {
    pub fn new(document: &'a mut CircuitDocument, sink: &'a mut dyn RedrawSink) -> Self {
        Self { document, sink }
    }

    fn load_snapshots(
        &mut self,
        components: &[ComponentId],
        snapshots: &BTreeMap<ComponentId, String>,
        slot: &'static str,
    ) -> Result<(), ProcessError> {
        // Validate everything first so a bad snapshot never leaves a partial edit.
        let mut staged: Vec<(ComponentId, ComponentData)> = Vec::with_capacity(components.len());
        for &id in components {
            if !self.document.contains(id) {
                return Err(ProcessError::MissingComponent(id));
            }
            let snapshot = snapshots
                .get(&id)
                .ok_or(ProcessError::MissingSnapshot { slot, component: id })?;
            let data = Component::validate_snapshot(snapshot).map_err(|source| {
                log::warn!("Rejecting {} snapshot for {}: {}", slot, id, source);
                ProcessError::Snapshot { component: id, source }
            })?;
            staged.push((id, data));
        }

        for (id, data) in staged {
            if let Some(component) = self.document.get_mut(id) {
                component
                    .deserialize(&data)
                    .map_err(|source| ProcessError::Snapshot { component: id, source })?;
                self.sink.redraw_component(component);
            }
            connection::reset_connections(self.document, id);
            connection::apply_connections(self.document, id);
        }
        Ok(())
    }

    fn insert(&mut self, index: Option<usize>, component: &Component) {
        let mut component = component.clone();
        component.clear_links();
        let id = component.id();
        match index {
            Some(index) => self.document.insert_component(index, component),
            None => self.document.add_component(component),
        }
        connection::reset_connections(self.document, id);
        connection::apply_connections(self.document, id);
    }

    fn remove(&mut self, id: ComponentId) {
        connection::disconnect_connections(self.document, id);
        self.document.remove_component(id);
    }
}

impl ActionProcessor for DocumentProcessor<'_> {
    type Error = ProcessError;

    fn process(&mut self, event: ActionEvent, action: &UndoAction) -> Result<(), ProcessError> {
        match (action.command(), event) {
            (UndoCommand::ModifyComponents { components, before, .. }, ActionEvent::Remove) => {
                self.load_snapshots(components, before, "before")?;
            }
            (UndoCommand::ModifyComponents { components, after, .. }, ActionEvent::Apply) => {
                self.load_snapshots(components, after, "after")?;
            }
            (UndoCommand::DeleteComponents { removed }, ActionEvent::Remove) => {
                // Indices were taken one removal at a time; reinsert in reverse.
                for r in removed.iter().rev() {
                    self.insert(Some(r.index), &r.component);
                }
            }
            (UndoCommand::DeleteComponents { removed }, ActionEvent::Apply) => {
                for r in removed {
                    self.remove(r.component.id());
                }
            }
            (UndoCommand::AddComponent { component }, ActionEvent::Remove) => {
                self.remove(component.id());
            }
            (UndoCommand::AddComponent { component }, ActionEvent::Apply) => {
                self.insert(None, component);
            }
        }

        self.sink.draw_connections(self.document);
        Ok(())
    }
}
