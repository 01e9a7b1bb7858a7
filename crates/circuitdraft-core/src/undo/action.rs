//! Reversible edit records.

use crate::component::{Component, ComponentId};
use std::collections::BTreeMap;

/// Direction in which an action is processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionEvent {
    /// Re-apply the edit (redo).
    Apply,
    /// Revert the edit (undo).
    Remove,
}

/// A component removed from a document, with the position it occupied.
#[derive(Debug, Clone)]
pub struct RemovedComponent {
    /// Index in the document order before removal.
    pub index: usize,
    /// The component as it was when removed, without links.
    pub component: Component,
}

/// The edit an [`UndoAction`] records, with all the data both directions need.
#[derive(Debug, Clone)]
pub enum UndoCommand {
    /// Configuration changes on one or more components.
    ModifyComponents {
        /// Affected components, in processing order.
        components: Vec<ComponentId>,
        /// Snapshot string of each component before the edit.
        before: BTreeMap<ComponentId, String>,
        /// Snapshot string of each component after the edit.
        after: BTreeMap<ComponentId, String>,
    },
    /// Components deleted from the document.
    DeleteComponents { removed: Vec<RemovedComponent> },
    /// A component placed into the document.
    AddComponent { component: Component },
}

impl UndoCommand {
    /// Short name of the command kind.
    pub fn name(&self) -> &'static str {
        match self {
            UndoCommand::ModifyComponents { .. } => "ModifyComponents",
            UndoCommand::DeleteComponents { .. } => "DeleteComponents",
            UndoCommand::AddComponent { .. } => "AddComponent",
        }
    }
}

/// One reversible edit. Immutable once built.
#[derive(Debug, Clone)]
pub struct UndoAction {
    description: String,
    command: UndoCommand,
}

impl UndoAction {
    /// Wrap a command with a human-readable description.
    pub fn new(description: impl Into<String>, command: UndoCommand) -> Self {
        Self {
            description: description.into(),
            command,
        }
    }

    /// Configuration change of a single component.
    pub fn modify(
        description: impl Into<String>,
        component: ComponentId,
        before: String,
        after: String,
    ) -> Self {
        Self::modify_many(description, [(component, before, after)])
    }

    /// Configuration change of several components at once.
    pub fn modify_many(
        description: impl Into<String>,
        changes: impl IntoIterator<Item = (ComponentId, String, String)>,
    ) -> Self {
        let mut components = Vec::new();
        let mut before = BTreeMap::new();
        let mut after = BTreeMap::new();
        for (id, b, a) in changes {
            // The first before and the last after win for a repeated component.
            if !before.contains_key(&id) {
                before.insert(id, b);
                components.push(id);
            }
            after.insert(id, a);
        }
        Self::new(
            description,
            UndoCommand::ModifyComponents {
                components,
                before,
                after,
            },
        )
    }

    /// Deletion of the given components.
    pub fn delete(description: impl Into<String>, removed: Vec<RemovedComponent>) -> Self {
        Self::new(description, UndoCommand::DeleteComponents { removed })
    }

    /// Placement of a component.
    pub fn add(description: impl Into<String>, component: Component) -> Self {
        Self::new(description, UndoCommand::AddComponent { component })
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn command(&self) -> &UndoCommand {
        &self.command
    }

    /// Components the action touches, in processing order.
    pub fn components(&self) -> Vec<ComponentId> {
        match &self.command {
            UndoCommand::ModifyComponents { components, .. } => components.clone(),
            UndoCommand::DeleteComponents { removed } => {
                removed.iter().map(|r| r.component.id()).collect()
            }
            UndoCommand::AddComponent { component } => vec![component.id()],
        }
    }

    /// Named snapshot slot (`"before"` or `"after"`) of a modify action.
    pub fn slot(&self, name: &str) -> Option<&BTreeMap<ComponentId, String>> {
        match (&self.command, name) {
            (UndoCommand::ModifyComponents { before, .. }, "before") => Some(before),
            (UndoCommand::ModifyComponents { after, .. }, "after") => Some(after),
            _ => None,
        }
    }
}
