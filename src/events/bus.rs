//! Synchronous event bus with typed handler slots
//!
//! `publish` runs every subscriber of the event's kind in subscription order.
//! Events a handler emits are published depth-first before the next handler
//! runs, so a whole reaction chain finishes inside the original call.

use std::cell::RefCell;
use std::rc::Rc;

use crate::core::error::Result;
use crate::ecs::world::World;
use crate::events::{EventKind, GameEvent};

/// Chains deeper than this are cut off and logged
const MAX_DISPATCH_DEPTH: usize = 32;

pub type Handler = Box<dyn FnMut(&mut World, &GameEvent, &mut Vec<GameEvent>) -> Result<()>>;

type SharedHandler = Rc<RefCell<Handler>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub struct EventBus {
    slots: Vec<Vec<(SubscriptionId, SharedHandler)>>,
    next_id: u64,
    depth: usize,
    recording: bool,
    journal: Vec<GameEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            slots: EventKind::ALL.iter().map(|_| Vec::new()).collect(),
            next_id: 0,
            depth: 0,
            recording: false,
            journal: Vec::new(),
        }
    }

    /// Bus that also keeps a copy of every published event
    pub fn recording() -> Self {
        Self { recording: true, ..Self::new() }
    }

    pub fn subscribe<F>(&mut self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: FnMut(&mut World, &GameEvent, &mut Vec<GameEvent>) -> Result<()> + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        let boxed: Handler = Box::new(handler);
        self.slots[kind.index()].push((id, Rc::new(RefCell::new(boxed))));
        id
    }

    /// Drop one subscription, or every subscription of `kind` when `id` is None
    pub fn unsubscribe(&mut self, kind: EventKind, id: Option<SubscriptionId>) -> usize {
        let slot = &mut self.slots[kind.index()];
        let before = slot.len();
        match id {
            Some(id) => slot.retain(|(sid, _)| *sid != id),
            None => slot.clear(),
        }
        before - slot.len()
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.slots[kind.index()].len()
    }

    /// Dispatch an event and everything it causes. Stops at the first error.
    pub fn publish(&mut self, world: &mut World, event: GameEvent) -> Result<()> {
        if self.depth >= MAX_DISPATCH_DEPTH {
            tracing::error!("Event chain exceeded depth {}; dropping {:?}", MAX_DISPATCH_DEPTH, event.kind());
            return Ok(());
        }
        if self.recording {
            self.journal.push(event.clone());
        }

        let handlers: Vec<SharedHandler> = self.slots[event.kind().index()]
            .iter()
            .map(|(_, h)| Rc::clone(h))
            .collect();

        self.depth += 1;
        let result = self.run_handlers(world, &event, &handlers);
        self.depth -= 1;
        result
    }

    /// Publish every event in order. A failing event does not stop the ones
    /// after it; the first error is returned once all have run.
    pub fn publish_all(&mut self, world: &mut World, events: Vec<GameEvent>) -> Result<()> {
        let mut first_err = None;
        for event in events {
            let kind = event.kind();
            if let Err(err) = self.publish(world, event) {
                if first_err.is_some() {
                    tracing::error!("Handler for {:?} failed: {}", kind, err);
                } else {
                    first_err = Some(err);
                }
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    fn run_handlers(&mut self, world: &mut World, event: &GameEvent, handlers: &[SharedHandler]) -> Result<()> {
        for handler in handlers {
            let mut emitted = Vec::new();
            {
                let Ok(mut h) = handler.try_borrow_mut() else {
                    tracing::warn!("Skipping re-entrant handler for {:?}", event.kind());
                    continue;
                };
                (*h)(world, event, &mut emitted)?;
            }
            for next in emitted {
                self.publish(world, next)?;
            }
        }
        Ok(())
    }

    pub fn journal(&self) -> &[GameEvent] {
        &self.journal
    }

    pub fn take_journal(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.journal)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
