//! Linear undo history with a cursor and a save checkpoint.
//!
//! ```text
//! actions:  [a0, a1, a2, a3]
//! cursor:              ^ 3     a0..a2 applied, a3 undone
//!
//! add_action(a4)
//! actions:  [a0, a1, a2, a4]
//! cursor:                  ^ 4  a3 discarded
//! ```

use super::action::{ActionEvent, UndoAction};
use super::processor::ActionProcessor;
use super::UndoError;
use std::fmt;

/// Limits for the undo history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryConfig {
    /// Maximum number of actions kept; the oldest are evicted first.
    /// `None` keeps everything.
    pub max_depth: Option<usize>,
}

impl HistoryConfig {
    /// History keeping at most `max_depth` actions.
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            max_depth: Some(max_depth.max(1)),
        }
    }
}

/// What changed in the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryChange {
    /// A new action was appended.
    Added,
    /// An action was reverted.
    Undone,
    /// An action was re-applied.
    Redone,
}

/// Notification sent to subscribers after every successful history mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionOccurred {
    pub change: HistoryChange,
    /// Cursor after the change.
    pub cursor: usize,
    /// Whether the cursor now sits on the save checkpoint.
    pub saved: bool,
}

type Listener = Box<dyn FnMut(&ActionOccurred)>;

/// Records a linear, steppable history of reversible actions.
pub struct UndoManager {
    actions: Vec<UndoAction>,
    /// Number of applied actions; `actions[..cursor]` are applied.
    cursor: usize,
    /// Cursor value at the last save, if still reachable.
    save_index: Option<usize>,
    config: HistoryConfig,
    listeners: Vec<Listener>,
}

impl fmt::Debug for UndoManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UndoManager")
            .field("len", &self.actions.len())
            .field("cursor", &self.cursor)
            .field("save_index", &self.save_index)
            .field("config", &self.config)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for UndoManager {
    fn default() -> Self {
        Self::new()
    }
}

impl UndoManager {
    /// Create an empty, unlimited history in the saved state.
    pub fn new() -> Self {
        Self::with_config(HistoryConfig::default())
    }

    /// Create an empty history with the given limits.
    pub fn with_config(config: HistoryConfig) -> Self {
        Self {
            actions: Vec::new(),
            cursor: 0,
            save_index: Some(0),
            config,
            listeners: Vec::new(),
        }
    }

    /// Register a callback fired after every add, undo and redo.
    pub fn subscribe(&mut self, listener: impl FnMut(&ActionOccurred) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Drop all actions and return to the saved state. Subscribers are kept.
    pub fn clear(&mut self) {
        self.actions.clear();
        self.cursor = 0;
        self.save_index = Some(0);
    }

    /// Append an action that has already been performed on the document.
    ///
    /// Discards every undone action after the cursor.
    pub fn add_action(&mut self, action: UndoAction) {
        if self.cursor < self.actions.len() {
            log::debug!(
                "Discarding {} undone action(s)",
                self.actions.len() - self.cursor
            );
            self.actions.truncate(self.cursor);
            if self.save_index.is_some_and(|s| s > self.cursor) {
                self.save_index = None;
            }
        }

        log::debug!("Recording action '{}'", action.description());
        self.actions.push(action);
        self.cursor += 1;
        self.enforce_limit();
        self.notify(HistoryChange::Added);
    }

    fn enforce_limit(&mut self) {
        let Some(max) = self.config.max_depth else {
            return;
        };
        if self.actions.len() <= max {
            return;
        }
        let excess = self.actions.len() - max;
        self.actions.drain(..excess);
        self.cursor -= excess;
        self.save_index = self.save_index.and_then(|s| s.checked_sub(excess));
    }

    /// True iff there is an applied action to revert.
    pub fn can_step_backwards(&self) -> bool {
        self.cursor > 0
    }

    /// True iff there is an undone action to re-apply.
    pub fn can_step_forwards(&self) -> bool {
        self.cursor < self.actions.len()
    }

    /// Revert the action before the cursor.
    ///
    /// On error nothing changes and no notification is sent.
    pub fn step_backwards<P: ActionProcessor>(
        &mut self,
        processor: &mut P,
    ) -> Result<(), UndoError<P::Error>> {
        if !self.can_step_backwards() {
            return Err(UndoError::InvalidHistoryOperation("undo"));
        }
        let action = &self.actions[self.cursor - 1];
        processor
            .process(ActionEvent::Remove, action)
            .map_err(UndoError::Processor)?;
        log::debug!("Undid '{}'", action.description());
        self.cursor -= 1;
        self.notify(HistoryChange::Undone);
        Ok(())
    }

    /// Re-apply the action at the cursor.
    ///
    /// On error nothing changes and no notification is sent.
    pub fn step_forwards<P: ActionProcessor>(
        &mut self,
        processor: &mut P,
    ) -> Result<(), UndoError<P::Error>> {
        if !self.can_step_forwards() {
            return Err(UndoError::InvalidHistoryOperation("redo"));
        }
        let action = &self.actions[self.cursor];
        processor
            .process(ActionEvent::Apply, action)
            .map_err(UndoError::Processor)?;
        log::debug!("Redid '{}'", action.description());
        self.cursor += 1;
        self.notify(HistoryChange::Redone);
        Ok(())
    }

    /// Mark the current cursor as the saved checkpoint.
    pub fn set_save_index(&mut self) {
        self.save_index = Some(self.cursor);
    }

    /// True iff the cursor is on the saved checkpoint.
    pub fn is_saved_state(&self) -> bool {
        self.save_index == Some(self.cursor)
    }

    /// Number of actions currently applied (the position between undo and redo).
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Cursor position at the last save, or `None` if that state is no longer reachable.
    pub fn save_index(&self) -> Option<usize> {
        self.save_index
    }

    /// Number of recorded actions, including undone ones.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Check if no actions are recorded.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Limits this history was created with.
    pub fn config(&self) -> HistoryConfig {
        self.config
    }

    /// All recorded actions, oldest first.
    pub fn actions(&self) -> &[UndoAction] {
        &self.actions
    }

    /// Description of the action the next undo would revert.
    pub fn undo_description(&self) -> Option<&str> {
        self.cursor
            .checked_sub(1)
            .and_then(|i| self.actions.get(i))
            .map(UndoAction::description)
    }

    /// Description of the action the next redo would re-apply.
    pub fn redo_description(&self) -> Option<&str> {
        self.actions.get(self.cursor).map(UndoAction::description)
    }

    fn notify(&mut self, change: HistoryChange) {
        let event = ActionOccurred {
            change,
            cursor: self.cursor,
            saved: self.is_saved_state(),
        };
        for listener in &mut self.listeners {
            listener(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Component;
    use kurbo::Point;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records every dispatch; fails when `fail` is set.
    #[derive(Default)]
    struct Recorder {
        calls: Vec<(ActionEvent, String)>,
        fail: bool,
    }

    impl ActionProcessor for Recorder {
        type Error = String;

        fn process(&mut self, event: ActionEvent, action: &UndoAction) -> Result<(), String> {
            if self.fail {
                return Err("refused".to_string());
            }
            self.calls.push((event, action.description().to_string()));
            Ok(())
        }
    }

    fn action(name: &str) -> UndoAction {
        UndoAction::add(name, Component::new("resistor", Point::ORIGIN))
    }

    fn descriptions(manager: &UndoManager) -> Vec<&str> {
        manager.actions().iter().map(UndoAction::description).collect()
    }

    #[test]
    fn test_empty_history() {
        let mut manager = UndoManager::new();
        let mut p = Recorder::default();

        assert!(!manager.can_step_backwards());
        assert!(!manager.can_step_forwards());
        assert!(manager.is_saved_state());
        assert!(matches!(
            manager.step_backwards(&mut p),
            Err(UndoError::InvalidHistoryOperation("undo"))
        ));
        assert!(matches!(
            manager.step_forwards(&mut p),
            Err(UndoError::InvalidHistoryOperation("redo"))
        ));
        assert!(p.calls.is_empty());
        assert_eq!(manager.cursor(), 0);
    }

    #[test]
    fn test_step_dispatches_with_direction() {
        let mut manager = UndoManager::new();
        let mut p = Recorder::default();
        manager.add_action(action("a"));
        manager.add_action(action("b"));

        manager.step_backwards(&mut p).unwrap();
        manager.step_backwards(&mut p).unwrap();
        manager.step_forwards(&mut p).unwrap();

        assert_eq!(
            p.calls,
            vec![
                (ActionEvent::Remove, "b".to_string()),
                (ActionEvent::Remove, "a".to_string()),
                (ActionEvent::Apply, "a".to_string()),
            ]
        );
        assert_eq!(manager.cursor(), 1);
        assert_eq!(manager.undo_description(), Some("a"));
        assert_eq!(manager.redo_description(), Some("b"));
    }

    #[test]
    fn test_add_after_undo_truncates() {
        let mut manager = UndoManager::new();
        let mut p = Recorder::default();
        for name in ["a", "b", "c", "d"] {
            manager.add_action(action(name));
        }
        manager.step_backwards(&mut p).unwrap();
        manager.step_backwards(&mut p).unwrap();

        manager.add_action(action("e"));

        assert_eq!(descriptions(&manager), vec!["a", "b", "e"]);
        assert_eq!(manager.cursor(), 3);
        assert!(!manager.can_step_forwards());
    }

    #[test]
    fn test_cursor_invariants_under_mixed_operations() {
        let mut manager = UndoManager::new();
        let mut p = Recorder::default();
        // Deterministic mix of adds, undos and redos, including boundary misuse.
        let script = "aauuuraruuurrrraauru";
        for (i, op) in script.chars().enumerate() {
            match op {
                'a' => manager.add_action(action(&i.to_string())),
                'u' => {
                    let allowed = manager.can_step_backwards();
                    assert_eq!(manager.step_backwards(&mut p).is_ok(), allowed);
                }
                _ => {
                    let allowed = manager.can_step_forwards();
                    assert_eq!(manager.step_forwards(&mut p).is_ok(), allowed);
                }
            }
            assert!(manager.cursor() <= manager.len());
            assert_eq!(manager.can_step_backwards(), manager.cursor() > 0);
            assert_eq!(manager.can_step_forwards(), manager.cursor() < manager.len());
        }
    }

    #[test]
    fn test_saved_state_tracking() {
        let mut manager = UndoManager::new();
        let mut p = Recorder::default();
        manager.add_action(action("a"));
        assert!(!manager.is_saved_state());

        manager.set_save_index();
        assert!(manager.is_saved_state());

        manager.add_action(action("b"));
        assert!(!manager.is_saved_state());
        manager.step_backwards(&mut p).unwrap();
        assert!(manager.is_saved_state());
        manager.step_backwards(&mut p).unwrap();
        assert!(!manager.is_saved_state());
        manager.step_forwards(&mut p).unwrap();
        assert!(manager.is_saved_state());
    }

    #[test]
    fn test_saved_state_lost_when_branch_discarded() {
        let mut manager = UndoManager::new();
        let mut p = Recorder::default();
        manager.add_action(action("a"));
        manager.add_action(action("b"));
        manager.set_save_index();
        manager.step_backwards(&mut p).unwrap();
        manager.step_backwards(&mut p).unwrap();

        manager.add_action(action("c"));
        manager.add_action(action("d"));

        // Same cursor as the save, but a different history.
        assert_eq!(manager.cursor(), 2);
        assert!(!manager.is_saved_state());
        assert_eq!(manager.save_index(), None);
    }

    #[test]
    fn test_processor_failure_leaves_state() {
        let mut manager = UndoManager::new();
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        manager.subscribe(move |e| sink.borrow_mut().push(*e));
        manager.add_action(action("a"));

        let mut p = Recorder {
            fail: true,
            ..Default::default()
        };
        assert!(matches!(
            manager.step_backwards(&mut p),
            Err(UndoError::Processor(_))
        ));
        assert_eq!(manager.cursor(), 1);
        assert_eq!(events.borrow().len(), 1);
    }

    #[test]
    fn test_notifications() {
        let mut manager = UndoManager::new();
        let mut p = Recorder::default();
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        manager.subscribe(move |e| sink.borrow_mut().push(*e));

        manager.add_action(action("a"));
        manager.step_backwards(&mut p).unwrap();
        let _ = manager.step_backwards(&mut p);
        manager.step_forwards(&mut p).unwrap();

        let events = events.borrow();
        assert_eq!(
            events.iter().map(|e| e.change).collect::<Vec<_>>(),
            vec![HistoryChange::Added, HistoryChange::Undone, HistoryChange::Redone]
        );
        assert_eq!(
            events.iter().map(|e| (e.cursor, e.saved)).collect::<Vec<_>>(),
            vec![(1, false), (0, true), (1, false)]
        );
    }

    #[test]
    fn test_max_depth_evicts_oldest() {
        let mut manager = UndoManager::with_config(HistoryConfig::with_max_depth(2));
        let mut p = Recorder::default();
        manager.add_action(action("a"));
        manager.set_save_index();
        manager.add_action(action("b"));
        manager.add_action(action("c"));

        assert_eq!(descriptions(&manager), vec!["b", "c"]);
        assert_eq!(manager.cursor(), 2);
        assert_eq!(manager.save_index(), Some(0));

        manager.step_backwards(&mut p).unwrap();
        manager.step_backwards(&mut p).unwrap();
        assert!(manager.is_saved_state());

        manager.add_action(action("d"));
        manager.add_action(action("e"));
        manager.add_action(action("f"));
        assert_eq!(manager.save_index(), None);
        assert!(!manager.is_saved_state());
    }

    #[test]
    fn test_clear_keeps_subscribers() {
        let mut manager = UndoManager::new();
        let count = Rc::new(RefCell::new(0));
        let sink = count.clone();
        manager.subscribe(move |_| *sink.borrow_mut() += 1);
        manager.add_action(action("a"));

        manager.clear();
        assert!(manager.is_empty());
        assert!(manager.is_saved_state());

        manager.add_action(action("b"));
        assert_eq!(*count.borrow(), 2);
    }
}
