use super::{
    Data, Direction, Element, ElementId, ElementKind, ElementMeta, Pin, Snapshot, StateValue, Wire,
};
use crate::simulator::errors::SimError;
use petgraph::graphmap::DiGraphMap;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

//--------------------------------------------------------------------
// Mapping descriptors

pub type TransformFn = Box<dyn Fn(&Data) -> StateValue>;
pub type EvalFn = Box<dyn Fn(&[StateValue]) -> StateValue>;
pub type EncodeFn = Box<dyn Fn(&StateValue, &Data) -> Result<Data, SimError>>;
pub type ReactFn = Box<dyn Fn(&Snapshot, &Snapshot) -> Vec<(String, StateValue)>>;

/// Associates an input pin id with a state slot: whenever the pin's
/// data syncs into the component, `transform` derives the slot value.
pub struct MappedInput {
    pub pin_id: String,
    pub state: String,
    pub delay: u64,
    pub transform: TransformFn,
}

impl MappedInput {
    pub fn new(
        pin_id: &str,
        state: &str,
        transform: impl Fn(&Data) -> StateValue + 'static,
    ) -> Self {
        MappedInput {
            pin_id: pin_id.to_string(),
            state: state.to_string(),
            delay: 0,
            transform: Box::new(transform),
        }
    }

    pub fn with_delay(mut self, delay: u64) -> Self {
        self.delay = delay;
        self
    }
}

/// Associates an output pin id with a state slot computed as a pure
/// function of the named source slots. `encode` turns the slot value
/// back into pin data, shaped by the pin's current buffer.
pub struct MappedOutput {
    pub pin_id: String,
    pub state: String,
    pub delay: u64,
    pub sources: Vec<String>,
    pub eval: EvalFn,
    pub encode: EncodeFn,
}

impl MappedOutput {
    pub fn new(
        pin_id: &str,
        state: &str,
        sources: &[&str],
        eval: impl Fn(&[StateValue]) -> StateValue + 'static,
    ) -> Self {
        MappedOutput {
            pin_id: pin_id.to_string(),
            state: state.to_string(),
            delay: 0,
            sources: sources.iter().map(|s| s.to_string()).collect(),
            eval: Box::new(eval),
            encode: Box::new(|value, shape| shape.of(Some(value.as_int()))),
        }
    }

    pub fn with_delay(mut self, delay: u64) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_encode(
        mut self,
        encode: impl Fn(&StateValue, &Data) -> Result<Data, SimError> + 'static,
    ) -> Self {
        self.encode = Box::new(encode);
        self
    }
}

//--------------------------------------------------------------------
// ComponentSpec

/// The closed state schema and pin mapping of a component kind,
/// declared up front and walked by the engine at runtime.
#[derive(Default)]
pub struct ComponentSpec {
    classifiers: Vec<&'static str>,
    inputs: Vec<MappedInput>,
    outputs: Vec<MappedOutput>,
    slots: Vec<(String, StateValue)>,
    react: Option<ReactFn>,
}

impl ComponentSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a classifier segment below the base `C`.
    pub fn classifier(mut self, segment: &'static str) -> Self {
        self.classifiers.push(segment);
        self
    }

    pub fn input(mut self, input: MappedInput) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn output(mut self, output: MappedOutput) -> Self {
        self.outputs.push(output);
        self
    }

    /// An internal state slot with no pin mapping.
    pub fn slot(mut self, alias: &str, initial: StateValue) -> Self {
        self.slots.push((alias.to_string(), initial));
        self
    }

    /// Hook run after each state mutation's cascade, receiving the
    /// pre-mutation and current snapshots. Returned assignments are
    /// applied as further state mutations.
    pub fn react(mut self, hook: ReactFn) -> Self {
        self.react = Some(hook);
        self
    }
}

//--------------------------------------------------------------------
// Component

/// A component's attachment to a boundary pin.
#[derive(Debug, Clone)]
pub struct ComponentEnd {
    pub pin: Rc<Pin>,
    pub direction: Direction,
    pub id: Option<String>,
}

/// A named black box: boundary pins with optional ids, owned internal
/// wires and sub-components, and a closed set of state slots driven by
/// the mapping tables of its [`ComponentSpec`].
pub struct Component {
    meta: ElementMeta,
    spec: ComponentSpec,
    ends: RefCell<Vec<ComponentEnd>>,
    wires: Vec<Rc<Wire>>,
    subs: Vec<Rc<Component>>,
    state: RefCell<Snapshot>,
    deps: DiGraphMap<u32, ()>,
    aliases: Vec<String>,
}

impl Component {
    pub fn new(
        spec: ComponentSpec,
        pins: Vec<(Rc<Pin>, Direction, Option<&str>)>,
        wires: Vec<Rc<Wire>>,
        subs: Vec<Rc<Component>>,
        name: Option<&str>,
    ) -> Result<Rc<Component>, SimError> {
        let mut classifiers = vec!["C"];
        classifiers.extend(&spec.classifiers);
        let meta = ElementMeta::new(ElementKind::Component, &classifiers, name);

        let mut ends: Vec<ComponentEnd> = Vec::with_capacity(pins.len());
        for (pin, direction, id) in pins {
            if let Some(id) = id {
                if ends.iter().any(|e| e.id.as_deref() == Some(id)) {
                    return Err(SimError::DuplicatePinId {
                        id: id.to_string(),
                        component: meta.full_name(),
                    });
                }
            }
            ends.push(ComponentEnd {
                pin,
                direction,
                id: id.map(str::to_string),
            });
        }

        // Closed state schema: inputs seed from their pins, plain slots
        // from their initials, outputs from their evaluators.
        fn declare(
            state: &mut Snapshot,
            aliases: &mut Vec<String>,
            component: &ElementMeta,
            alias: &str,
            value: StateValue,
        ) -> Result<(), SimError> {
            if state.insert(alias.to_string(), value).is_some() {
                return Err(SimError::DuplicateState {
                    alias: alias.to_string(),
                    component: component.full_name(),
                });
            }
            aliases.push(alias.to_string());
            Ok(())
        }

        let mut state: Snapshot = BTreeMap::new();
        let mut aliases: Vec<String> = Vec::new();

        for input in &spec.inputs {
            let end = ends
                .iter()
                .find(|e| e.id.as_deref() == Some(input.pin_id.as_str()))
                .ok_or_else(|| SimError::UnknownPinId {
                    id: input.pin_id.clone(),
                    component: meta.full_name(),
                })?;
            let seed = (input.transform)(&end.pin.data());
            declare(&mut state, &mut aliases, &meta, &input.state, seed)?;
        }
        for (alias, initial) in &spec.slots {
            declare(&mut state, &mut aliases, &meta, alias, initial.clone())?;
        }
        for output in &spec.outputs {
            ends.iter()
                .find(|e| e.id.as_deref() == Some(output.pin_id.as_str()))
                .ok_or_else(|| SimError::UnknownPinId {
                    id: output.pin_id.clone(),
                    component: meta.full_name(),
                })?;
            let sources = output
                .sources
                .iter()
                .map(|src| {
                    state
                        .get(src)
                        .cloned()
                        .ok_or_else(|| SimError::UnknownState {
                            alias: src.clone(),
                            component: meta.full_name(),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            let initial = (output.eval)(&sources);
            declare(&mut state, &mut aliases, &meta, &output.state, initial)?;
        }

        // Forward dependency graph: source slot -> dependent output slot.
        let index_of = |alias: &str| aliases.iter().position(|a| a == alias).map(|i| i as u32);
        let mut deps = DiGraphMap::new();
        for output in &spec.outputs {
            let out_idx = index_of(&output.state).expect("output slot just declared");
            for src in &output.sources {
                let src_idx = index_of(src).expect("source slot checked above");
                deps.add_edge(src_idx, out_idx, ());
            }
        }

        Ok(Rc::new(Component {
            meta,
            spec,
            ends: RefCell::new(ends),
            wires,
            subs,
            state: RefCell::new(state),
            deps,
            aliases,
        }))
    }

    pub fn ends(&self) -> Vec<ComponentEnd> {
        self.ends.borrow().clone()
    }

    pub fn wires(&self) -> &[Rc<Wire>] {
        &self.wires
    }

    pub fn subs(&self) -> &[Rc<Component>] {
        &self.subs
    }

    pub fn get_pin(&self, id: &str) -> Result<Rc<Pin>, SimError> {
        self.ends
            .borrow()
            .iter()
            .find(|e| e.id.as_deref() == Some(id))
            .map(|e| Rc::clone(&e.pin))
            .ok_or_else(|| SimError::UnknownPinId {
                id: id.to_string(),
                component: self.full_name(),
            })
    }

    pub fn has_end(&self, pin: &ElementId, direction: Direction) -> bool {
        self.ends
            .borrow()
            .iter()
            .any(|e| e.direction == direction && e.pin.id() == pin)
    }

    /// Attach a boundary pin at runtime.
    pub fn attach(
        &self,
        pin: Rc<Pin>,
        direction: Direction,
        id: Option<&str>,
    ) -> Result<(), SimError> {
        let mut ends = self.ends.borrow_mut();
        if let Some(id) = id {
            if ends.iter().any(|e| e.id.as_deref() == Some(id)) {
                return Err(SimError::DuplicatePinId {
                    id: id.to_string(),
                    component: self.full_name(),
                });
            }
        }
        ends.push(ComponentEnd {
            pin,
            direction,
            id: id.map(str::to_string),
        });
        Ok(())
    }

    pub fn detach_id(&self, id: &str) -> Result<(), SimError> {
        let mut ends = self.ends.borrow_mut();
        let pos = ends
            .iter()
            .position(|e| e.id.as_deref() == Some(id))
            .ok_or_else(|| SimError::UnknownPinId {
                id: id.to_string(),
                component: self.full_name(),
            })?;
        ends.remove(pos);
        Ok(())
    }

    pub fn detach(&self, pin: &ElementId, direction: Direction) -> Result<(), SimError> {
        let mut ends = self.ends.borrow_mut();
        let pos = ends
            .iter()
            .position(|e| e.direction == direction && e.pin.id() == pin)
            .ok_or_else(|| SimError::UnknownElement {
                id: pin.to_string(),
            })?;
        ends.remove(pos);
        Ok(())
    }

    /// Mapped delay at an endpoint; unmapped endpoints propagate with
    /// zero delay.
    pub fn delay(&self, pin: &ElementId, direction: Direction) -> u64 {
        let ends = self.ends.borrow();
        let end_matches = |pin_id: &str| {
            ends.iter()
                .any(|e| e.id.as_deref() == Some(pin_id) && e.direction == direction && e.pin.id() == pin)
        };
        match direction {
            Direction::In => self
                .spec
                .inputs
                .iter()
                .find(|m| end_matches(&m.pin_id))
                .map(|m| m.delay),
            Direction::Out => self
                .spec
                .outputs
                .iter()
                .find(|m| end_matches(&m.pin_id))
                .map(|m| m.delay),
        }
        .unwrap_or(0)
    }

    pub fn state(&self, alias: &str) -> Option<StateValue> {
        self.state.borrow().get(alias).cloned()
    }

    /// Install a state slot value. Returns the pre-mutation snapshot
    /// when the value actually changed, `None` on a no-op assignment.
    pub fn set_state(
        &self,
        alias: &str,
        value: StateValue,
    ) -> Result<Option<Snapshot>, SimError> {
        let prev = {
            let state = self.state.borrow();
            let current = state.get(alias).ok_or_else(|| SimError::UnknownState {
                alias: alias.to_string(),
                component: self.full_name(),
            })?;
            if *current == value {
                return Ok(None);
            }
            state.clone()
        };
        self.state.borrow_mut().insert(alias.to_string(), value);
        Ok(Some(prev))
    }

    /// Re-evaluate an output slot from its current sources.
    pub fn eval_output(&self, alias: &str) -> Result<StateValue, SimError> {
        let output = self
            .spec
            .outputs
            .iter()
            .find(|o| o.state == alias)
            .ok_or_else(|| SimError::UnknownState {
                alias: alias.to_string(),
                component: self.full_name(),
            })?;
        let state = self.state.borrow();
        let sources = output
            .sources
            .iter()
            .map(|src| {
                state
                    .get(src)
                    .cloned()
                    .ok_or_else(|| SimError::UnknownState {
                        alias: src.clone(),
                        component: self.full_name(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok((output.eval)(&sources))
    }

    /// Slots whose output expression reads `alias`, in declaration order.
    pub fn dependents(&self, alias: &str) -> Vec<String> {
        let Some(idx) = self.aliases.iter().position(|a| a == alias) else {
            return Vec::new();
        };
        let mut indices: Vec<u32> = self.deps.neighbors(idx as u32).collect();
        indices.sort_unstable();
        indices
            .into_iter()
            .map(|i| self.aliases[i as usize].clone())
            .collect()
    }

    /// Out-mapped endpoints driven by `alias`, with their delays.
    pub fn out_ends_for(&self, alias: &str) -> Vec<(Rc<Pin>, u64)> {
        let ends = self.ends.borrow();
        self.spec
            .outputs
            .iter()
            .filter(|o| o.state == alias)
            .flat_map(|o| {
                ends.iter()
                    .filter(|e| {
                        e.direction == Direction::Out && e.id.as_deref() == Some(o.pin_id.as_str())
                    })
                    .map(|e| (Rc::clone(&e.pin), o.delay))
            })
            .collect()
    }

    /// State assignments a sync from `pin` produces: each In-mapped slot
    /// fed by that pin receives the transformed pin data.
    pub fn sync_inputs(&self, pin: &ElementId) -> Vec<(String, StateValue)> {
        let ends = self.ends.borrow();
        self.spec
            .inputs
            .iter()
            .filter_map(|input| {
                let end = ends.iter().find(|e| {
                    e.direction == Direction::In
                        && e.id.as_deref() == Some(input.pin_id.as_str())
                        && e.pin.id() == pin
                })?;
                Some((input.state.clone(), (input.transform)(&end.pin.data())))
            })
            .collect()
    }

    /// Pin data for an Out-mapped endpoint, encoded from the mapped
    /// slot's current value.
    pub fn drive_value(&self, pin: &ElementId) -> Result<Data, SimError> {
        let ends = self.ends.borrow();
        let output = self
            .spec
            .outputs
            .iter()
            .find(|o| {
                ends.iter().any(|e| {
                    e.direction == Direction::Out
                        && e.id.as_deref() == Some(o.pin_id.as_str())
                        && e.pin.id() == pin
                })
            })
            .ok_or_else(|| SimError::NotMapped {
                pin: pin.to_string(),
                component: self.full_name(),
            })?;
        let value = self
            .state
            .borrow()
            .get(&output.state)
            .cloned()
            .ok_or_else(|| SimError::UnknownState {
                alias: output.state.clone(),
                component: self.full_name(),
            })?;
        let shape = ends
            .iter()
            .find(|e| e.pin.id() == pin)
            .map(|e| e.pin.data())
            .expect("endpoint matched above");
        (output.encode)(&value, &shape)
    }

    /// Run the spec's react hook against a mutation's snapshots.
    pub fn react(&self, prev: &Snapshot, current: &Snapshot) -> Vec<(String, StateValue)> {
        match &self.spec.react {
            Some(hook) => hook(prev, current),
            None => Vec::new(),
        }
    }
}

impl Element for Component {
    fn meta(&self) -> &ElementMeta {
        &self.meta
    }

    fn snapshot(&self) -> Snapshot {
        self.state.borrow().clone()
    }

    fn restore(&self, snapshot: &Snapshot) {
        let mut state = self.state.borrow_mut();
        for (alias, value) in snapshot {
            if state.contains_key(alias) {
                state.insert(alias.clone(), value.clone());
            }
        }
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let state = self.state.borrow();
        let body = state
            .iter()
            .map(|(alias, value)| format!("{alias}: {value}"))
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "<<{}>>({})", self.full_name(), body)
    }
}
