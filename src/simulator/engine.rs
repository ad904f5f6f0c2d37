use super::abstractions::{
    Component, Direction, Element, ElementId, ElementKind, Pin, Snapshot, StateValue, Tick, Wire,
    WriteValue, PIN_DATA,
};
use super::errors::SimError;
use super::system::{
    ElementFilter, Event, EventHandler, EventKind, EventSystem, INTERNAL_EVENT, WRITE_EVENT,
};
use log::{trace, warn};
use std::collections::HashMap;
use std::rc::Rc;

//--------------------------------------------------------------------
// Policies & bookkeeping

/// Resolution of two simultaneous, differing writes to one pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// The write dispatched last (insertion order) wins.
    LastWriteWins,
    /// The second differing write fails its event.
    Reject,
}

/// A handler failure recorded during dispatch. The queue keeps
/// draining; the caller decides whether to continue advancing.
#[derive(Debug)]
pub struct Failure {
    pub event: Event,
    pub error: SimError,
}

#[derive(Clone)]
pub enum ElementHandle {
    Pin(Rc<Pin>),
    Wire(Rc<Wire>),
    Component(Rc<Component>),
}

impl ElementHandle {
    pub fn id(&self) -> &ElementId {
        match self {
            ElementHandle::Pin(p) => p.id(),
            ElementHandle::Wire(w) => w.id(),
            ElementHandle::Component(c) => c.id(),
        }
    }
}

//--------------------------------------------------------------------
// Engine

/// The simulation facade: flat registries of every known pin, wire and
/// component, the event system, and the propagation behaviors that
/// turn state mutations into cascades of scheduled events.
pub struct Engine {
    scheduler: EventSystem,
    pins: Vec<Rc<Pin>>,
    wires: Vec<Rc<Wire>>,
    comps: Vec<Rc<Component>>,
    registry: HashMap<ElementId, ElementHandle>,
    policy: ConflictPolicy,
    failures: Vec<Failure>,
}

impl Engine {
    pub fn new() -> Self {
        Self::with_scheduler(EventSystem::new())
    }

    pub fn with_scheduler(scheduler: EventSystem) -> Self {
        let mut engine = Engine {
            scheduler,
            pins: Vec::new(),
            wires: Vec::new(),
            comps: Vec::new(),
            registry: HashMap::new(),
            policy: ConflictPolicy::LastWriteWins,
            failures: Vec::new(),
        };
        engine.scheduler.attach(write_handler());
        engine.scheduler.attach(pin_sync_handler());
        engine.scheduler.attach(pin_drive_handler());
        engine
    }

    pub fn with_policy(mut self, policy: ConflictPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[inline]
    pub fn scheduler(&self) -> &EventSystem {
        &self.scheduler
    }

    #[inline]
    pub fn scheduler_mut(&mut self) -> &mut EventSystem {
        &mut self.scheduler
    }

    #[inline]
    pub fn now(&self) -> Tick {
        self.scheduler.now()
    }

    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    pub fn pins(&self) -> &[Rc<Pin>] {
        &self.pins
    }

    pub fn wires(&self) -> &[Rc<Wire>] {
        &self.wires
    }

    pub fn comps(&self) -> &[Rc<Component>] {
        &self.comps
    }

    //----------------------------------------------------------------
    // Registry

    pub fn add_pin(&mut self, pin: &Rc<Pin>) {
        if !self.registry.contains_key(pin.id()) {
            self.registry
                .insert(pin.id().clone(), ElementHandle::Pin(Rc::clone(pin)));
            self.pins.push(Rc::clone(pin));
        }
    }

    /// Registers the wire and its endpoint pins, so scheduled writes to
    /// either side always resolve.
    pub fn add_wire(&mut self, wire: &Rc<Wire>) {
        if !self.registry.contains_key(wire.id()) {
            self.registry
                .insert(wire.id().clone(), ElementHandle::Wire(Rc::clone(wire)));
            self.wires.push(Rc::clone(wire));
        }
        for end in wire.ends() {
            self.add_pin(&end.pin);
        }
    }

    /// Registers the component tree: sub-components, owned wires and
    /// boundary pins, recursively.
    pub fn add_comp(&mut self, comp: &Rc<Component>) {
        if !self.registry.contains_key(comp.id()) {
            self.registry.insert(
                comp.id().clone(),
                ElementHandle::Component(Rc::clone(comp)),
            );
            self.comps.push(Rc::clone(comp));
        }
        for sub in comp.subs().to_vec() {
            self.add_comp(&sub);
        }
        for wire in comp.wires().to_vec() {
            self.add_wire(&wire);
        }
        for end in comp.ends() {
            self.add_pin(&end.pin);
        }
    }

    pub fn remove_pin(&mut self, id: &ElementId) {
        self.registry.remove(id);
        self.pins.retain(|p| p.id() != id);
    }

    pub fn remove_wire(&mut self, id: &ElementId) {
        self.registry.remove(id);
        self.wires.retain(|w| w.id() != id);
    }

    /// Removes the component and, exclusively owned, its wires and
    /// sub-components. Boundary pins are borrowed and stay registered.
    pub fn remove_comp(&mut self, id: &ElementId) {
        let Some(ElementHandle::Component(comp)) = self.registry.get(id).cloned() else {
            return;
        };
        self.registry.remove(id);
        self.comps.retain(|c| c.id() != id);
        for wire in comp.wires().to_vec() {
            self.remove_wire(wire.id());
        }
        for sub in comp.subs().to_vec() {
            self.remove_comp(sub.id());
        }
    }

    pub fn find(&self, id: &ElementId) -> Result<ElementHandle, SimError> {
        self.registry
            .get(id)
            .cloned()
            .ok_or_else(|| SimError::UnknownElement { id: id.to_string() })
    }

    fn pin(&self, id: &ElementId) -> Result<Rc<Pin>, SimError> {
        match self.find(id)? {
            ElementHandle::Pin(pin) => Ok(pin),
            _ => Err(SimError::UnknownElement { id: id.to_string() }),
        }
    }

    fn comp(&self, id: &ElementId) -> Result<Rc<Component>, SimError> {
        match self.find(id)? {
            ElementHandle::Component(comp) => Ok(comp),
            _ => Err(SimError::UnknownElement { id: id.to_string() }),
        }
    }

    //----------------------------------------------------------------
    // Scheduling

    pub fn schedule(&mut self, event: Event) -> Result<(), SimError> {
        self.scheduler.schedule(event)
    }

    pub fn schedule_write(
        &mut self,
        target: &ElementId,
        time: Tick,
        value: impl Into<WriteValue>,
    ) -> Result<(), SimError> {
        self.schedule(Event::write(None, target, time, value))
    }

    /// Drain every event due within `dt` of the current time, then move
    /// the clock to exactly `now + dt`. During each dispatch the clock
    /// holds the event's own time, so delays compose causally.
    pub fn advance(&mut self, dt: Tick) {
        let deadline = self.scheduler.after(dt);
        while let Some(event) = self.scheduler.pop_due(deadline) {
            self.scheduler.set_now(event.time);
            self.execute(event);
        }
        self.scheduler.set_now(deadline);
    }

    /// Dispatch one event through the attached handlers in attach
    /// order. A handler error aborts that handler only; the failure is
    /// logged and recorded, and the drain continues.
    pub fn execute(&mut self, event: Event) {
        trace!(target: "gatesim::events", "dispatch {event}");
        for handler in self.scheduler.handlers() {
            if handler.matches(&event) {
                if let Err(error) = handler.handle(self, &event) {
                    warn!(
                        target: "gatesim::events",
                        "handler '{}' failed on {event}: {error}",
                        handler.label()
                    );
                    self.failures.push(Failure {
                        event: event.clone(),
                        error,
                    });
                }
            }
        }
    }

    //----------------------------------------------------------------
    // Behaviors

    /// Terminal of every WriteEvent: route the payload into the target
    /// pin or wire.
    fn deliver_write(&mut self, event: &Event) -> Result<(), SimError> {
        let EventKind::Write { value } = &event.kind else {
            return Ok(());
        };
        let value = *value;
        match self.find(&event.target)? {
            ElementHandle::Pin(pin) => self.write_to_pin(&pin, value, event.time),
            ElementHandle::Wire(wire) => {
                wire.accept_write(event.source.as_ref())?;
                self.wire_written(&wire, value)
            }
            ElementHandle::Component(comp) => Err(SimError::NotWritable {
                target: comp.full_name(),
            }),
        }
    }

    fn write_to_pin(
        &mut self,
        pin: &Rc<Pin>,
        value: WriteValue,
        time: Tick,
    ) -> Result<(), SimError> {
        if self.policy == ConflictPolicy::Reject
            && pin.last_write_at() == Some(time)
            && value.raw() != pin.data().value()
        {
            return Err(SimError::WriteConflict {
                pin: pin.full_name(),
                time,
            });
        }
        let prev = pin.write(value)?;
        pin.mark_written(time);
        self.pin_updated(pin, &prev)
    }

    /// Pin behavior: a changed pin schedules a write into every wire it
    /// feeds and a state sync into every component it feeds.
    fn pin_updated(&mut self, pin: &Rc<Pin>, prev: &Snapshot) -> Result<(), SimError> {
        if prev.get(PIN_DATA) == Some(&StateValue::Data(pin.data())) {
            return Ok(());
        }
        let now = self.scheduler.now();
        for wire in self.wires.clone() {
            if wire.has_end(pin.id(), Direction::In) {
                let time = now.saturating_add(wire.delay(pin.id(), Direction::In)?);
                self.schedule(Event::write(
                    Some(pin.id()),
                    wire.id(),
                    time,
                    pin.data(),
                ))?;
            }
        }
        for comp in self.comps.clone() {
            if comp.has_end(pin.id(), Direction::In) {
                let time = now.saturating_add(comp.delay(pin.id(), Direction::In));
                self.schedule(Event::internal(pin.id(), comp.id(), time, prev.clone()))?;
            }
        }
        Ok(())
    }

    /// Wire behavior: an accepted write fans out to every Out endpoint
    /// with its endpoint delay. Concurrent In writes are not merged;
    /// the last dispatch wins at each sink.
    fn wire_written(&mut self, wire: &Rc<Wire>, value: WriteValue) -> Result<(), SimError> {
        let now = self.scheduler.now();
        for end in wire.ends().to_vec() {
            if end.direction == Direction::Out {
                let time = now.saturating_add(end.delay);
                self.schedule(Event::write(Some(wire.id()), end.pin.id(), time, value))?;
            }
        }
        Ok(())
    }

    /// Component input behavior: assign the source pin's data into
    /// every In-mapped slot fed by it, cascading on change.
    fn sync_component(&mut self, event: &Event) -> Result<(), SimError> {
        let comp = self.comp(&event.target)?;
        let source = event
            .source
            .as_ref()
            .ok_or_else(|| SimError::UnknownElement {
                id: event.target.to_string(),
            })?;
        for (alias, value) in comp.sync_inputs(source) {
            if let Some(prev) = comp.set_state(&alias, value)? {
                self.comp_state_updated(&comp, &prev)?;
            }
        }
        Ok(())
    }

    /// Component state behavior: for each changed slot, re-evaluate its
    /// dependents (cascading), drive Out-mapped endpoints, then let the
    /// component's react hook respond to the mutation.
    fn comp_state_updated(
        &mut self,
        comp: &Rc<Component>,
        prev: &Snapshot,
    ) -> Result<(), SimError> {
        let current = comp.snapshot();
        let changed: Vec<String> = current
            .iter()
            .filter(|(alias, value)| prev.get(*alias) != Some(*value))
            .map(|(alias, _)| alias.clone())
            .collect();
        if changed.is_empty() {
            return Ok(());
        }

        for alias in &changed {
            for dependent in comp.dependents(alias) {
                let value = comp.eval_output(&dependent)?;
                if let Some(inner) = comp.set_state(&dependent, value)? {
                    self.comp_state_updated(comp, &inner)?;
                }
            }
            for (pin, delay) in comp.out_ends_for(alias) {
                let time = self.scheduler.now().saturating_add(delay);
                self.schedule(Event::internal(comp.id(), pin.id(), time, prev.clone()))?;
            }
        }

        let settled = comp.snapshot();
        for (alias, value) in comp.react(prev, &settled) {
            if let Some(inner) = comp.set_state(&alias, value)? {
                self.comp_state_updated(comp, &inner)?;
            }
        }
        Ok(())
    }

    /// Component output behavior: encode the Out-mapped slot and write
    /// the boundary pin with the component as writer.
    fn drive_pin(&mut self, event: &Event) -> Result<(), SimError> {
        let comp = self.comp(event.source.as_ref().ok_or_else(|| {
            SimError::UnknownElement {
                id: event.target.to_string(),
            }
        })?)?;
        let pin = self.pin(&event.target)?;
        let data = comp.drive_value(pin.id())?;
        self.write_to_pin(&pin, WriteValue::Data(data), event.time)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

//--------------------------------------------------------------------
// Default glue handlers

fn write_handler() -> Rc<EventHandler> {
    EventHandler::simple(
        "write",
        &[WRITE_EVENT],
        vec![],
        vec![],
        None,
        |engine, event| engine.deliver_write(event),
    )
}

fn pin_sync_handler() -> Rc<EventHandler> {
    EventHandler::simple(
        "pin-to-state",
        &[INTERNAL_EVENT],
        vec![ElementFilter::Kind(ElementKind::Pin)],
        vec![ElementFilter::Kind(ElementKind::Component)],
        None,
        |engine, event| engine.sync_component(event),
    )
}

fn pin_drive_handler() -> Rc<EventHandler> {
    EventHandler::simple(
        "state-to-pin",
        &[INTERNAL_EVENT],
        vec![ElementFilter::Kind(ElementKind::Component)],
        vec![ElementFilter::Kind(ElementKind::Pin)],
        None,
        |engine, event| engine.drive_pin(event),
    )
}
