//! Drag and drop interaction state.
//!
//! The typestate pair [`Idle`] / [`Dragging`] makes illegal sequences
//! unwritable: only an `Idle` value can start a drag, and `drop` /
//! `drag_end` consume the `Dragging` value. [`DragMachine`] wraps the pair
//! for event loops that receive raw pointer events, ignoring events that
//! arrive out of sequence.

use serde::{Deserialize, Serialize};

use crate::sprint::Sprint;
use crate::store::TaskStore;
use crate::task::TaskId;
use crate::validator::{
    is_potential_target, validate_move, DragSource, DropTarget, MoveIntent, MoveRejection,
};

/// No drag in progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Idle;

/// A task is being dragged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dragging {
    task_id: TaskId,
    source: DragSource,
    hover: Option<DropTarget>,
}

/// Result of a drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    Accepted(MoveIntent),
    Rejected(MoveRejection),
}

impl Idle {
    pub fn drag_start(self, task_id: TaskId, source: DragSource) -> Dragging {
        tracing::debug!("Drag start: task {} from {:?}", task_id, source);
        Dragging {
            task_id,
            source,
            hover: None,
        }
    }
}

impl Dragging {
    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    pub fn source(&self) -> DragSource {
        self.source
    }

    /// The target currently highlighted as droppable.
    pub fn hover(&self) -> Option<&DropTarget> {
        self.hover.as_ref()
    }

    /// Update the hover affordance. Returns whether `target` is highlighted.
    pub fn drag_over(&mut self, target: DropTarget, sprint: &Sprint) -> bool {
        if is_potential_target(self.source, &target, sprint.status) {
            self.hover = Some(target);
            true
        } else {
            self.hover = None;
            false
        }
    }

    /// Drop on `target`, running the full validation.
    pub fn drop(
        self,
        target: DropTarget,
        store: &TaskStore,
        sprint: &Sprint,
    ) -> (Idle, DropOutcome) {
        let outcome = match validate_move(store, self.task_id, self.source, &target, sprint) {
            Ok(intent) => DropOutcome::Accepted(intent),
            Err(rejection) => {
                tracing::debug!("Drop of task {} rejected: {}", self.task_id, rejection);
                DropOutcome::Rejected(rejection)
            }
        };
        (Idle, outcome)
    }

    /// Drag cancelled without a drop.
    pub fn drag_end(self) -> Idle {
        tracing::debug!("Drag of task {} cancelled", self.task_id);
        Idle
    }
}

/// Raw drag events as delivered by the UI layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum DragEvent {
    Start { task_id: TaskId, source: DragSource },
    Over { target: DropTarget },
    Drop { target: DropTarget },
    End,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragMachine {
    Idle(Idle),
    Dragging(Dragging),
}

impl Default for DragMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl DragMachine {
    pub fn new() -> Self {
        DragMachine::Idle(Idle)
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self, DragMachine::Dragging(_))
    }

    pub fn dragging(&self) -> Option<&Dragging> {
        match self {
            DragMachine::Dragging(dragging) => Some(dragging),
            DragMachine::Idle(_) => None,
        }
    }

    pub fn hover(&self) -> Option<&DropTarget> {
        self.dragging().and_then(Dragging::hover)
    }

    /// Feed one event. Returns the outcome when the event was a drop that
    /// ended a drag.
    pub fn handle(
        &mut self,
        event: DragEvent,
        store: &TaskStore,
        sprint: &Sprint,
    ) -> Option<DropOutcome> {
        let state = std::mem::replace(self, DragMachine::Idle(Idle));
        let (next, outcome) = match (state, event) {
            (DragMachine::Idle(idle), DragEvent::Start { task_id, source }) => {
                (DragMachine::Dragging(idle.drag_start(task_id, source)), None)
            }
            (DragMachine::Dragging(mut dragging), DragEvent::Over { target }) => {
                dragging.drag_over(target, sprint);
                (DragMachine::Dragging(dragging), None)
            }
            (DragMachine::Dragging(dragging), DragEvent::Drop { target }) => {
                let (idle, outcome) = dragging.drop(target, store, sprint);
                (DragMachine::Idle(idle), Some(outcome))
            }
            (DragMachine::Dragging(dragging), DragEvent::End) => {
                (DragMachine::Idle(dragging.drag_end()), None)
            }
            (state, event) => {
                tracing::debug!("Ignoring {:?} while {:?}", event, state);
                (state, None)
            }
        };
        *self = next;
        outcome
    }
}
