use super::{Direction, Element, ElementId, ElementKind, ElementMeta, Pin, Snapshot};
use crate::simulator::errors::SimError;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

//--------------------------------------------------------------------
// WireEnd

/// A wire's attachment to a pin: the pin, the direction it plays for
/// the wire, and the propagation delay applied at this endpoint.
#[derive(Debug, Clone)]
pub struct WireEnd {
    pub pin: Rc<Pin>,
    pub direction: Direction,
    pub delay: u64,
}

//--------------------------------------------------------------------
// Wire

/// A delay-carrying conductor between pins. A wire buffers no data of
/// its own; an in-flight write exists only as queued events. `In`
/// endpoints write into the wire, `Out` endpoints are driven by it.
pub struct Wire {
    meta: ElementMeta,
    ends: Vec<WireEnd>,
}

impl Wire {
    pub fn new(
        ins: Vec<(Rc<Pin>, u64)>,
        outs: Vec<(Rc<Pin>, u64)>,
        name: Option<&str>,
    ) -> Rc<Wire> {
        let ends = ins
            .into_iter()
            .map(|(pin, delay)| (pin, Direction::In, delay))
            .chain(
                outs.into_iter()
                    .map(|(pin, delay)| (pin, Direction::Out, delay)),
            )
            .map(|(pin, direction, delay)| WireEnd {
                pin,
                direction,
                delay,
            })
            .collect();
        Rc::new(Wire {
            meta: ElementMeta::new(ElementKind::Wire, &["W"], name),
            ends,
        })
    }

    /// A point-to-point wire, delayed on the writing side.
    pub fn direct(from: &Rc<Pin>, to: &Rc<Pin>, delay: u64) -> Rc<Wire> {
        let name = format!("[{}:{}]", from.full_name(), to.full_name());
        Wire::new(
            vec![(Rc::clone(from), delay)],
            vec![(Rc::clone(to), 0)],
            Some(&name),
        )
    }

    /// A fan-out wire from one source to many sinks, delayed per sink.
    pub fn branch(from: &Rc<Pin>, fanout: &[(Rc<Pin>, u64)]) -> Rc<Wire> {
        let first = fanout
            .first()
            .map(|(pin, _)| pin.full_name())
            .unwrap_or_default();
        let name = format!("[{}:{}...]", from.full_name(), first);
        Wire::new(
            vec![(Rc::clone(from), 0)],
            fanout
                .iter()
                .map(|(pin, delay)| (Rc::clone(pin), *delay))
                .collect(),
            Some(&name),
        )
    }

    pub fn ends(&self) -> &[WireEnd] {
        &self.ends
    }

    pub fn has_end(&self, pin: &ElementId, direction: Direction) -> bool {
        self.ends
            .iter()
            .any(|end| end.direction == direction && end.pin.id() == pin)
    }

    pub fn delay(&self, pin: &ElementId, direction: Direction) -> Result<u64, SimError> {
        self.ends
            .iter()
            .find(|end| end.direction == direction && end.pin.id() == pin)
            .map(|end| end.delay)
            .ok_or_else(|| SimError::UnknownElement {
                id: pin.to_string(),
            })
    }

    /// A wire only accepts writes arriving through one of its `In`
    /// endpoint pins.
    pub fn accept_write(&self, writer: Option<&ElementId>) -> Result<(), SimError> {
        let writer = writer
            .filter(|id| id.kind() == ElementKind::Pin)
            .ok_or_else(|| SimError::NotAPin {
                wire: self.full_name(),
            })?;
        if !self.has_end(writer, Direction::In) {
            return Err(SimError::NotAnInput {
                pin: writer.to_string(),
                wire: self.full_name(),
            });
        }
        Ok(())
    }
}

impl Element for Wire {
    fn meta(&self) -> &ElementMeta {
        &self.meta
    }

    fn snapshot(&self) -> Snapshot {
        BTreeMap::new()
    }

    fn restore(&self, _snapshot: &Snapshot) {}
}

impl fmt::Debug for Wire {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<<{}>>({} ends)", self.full_name(), self.ends.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::abstractions::Data;

    #[test]
    fn direct_wire_carries_endpoint_delays() {
        let a = Pin::new(Data::binary(8), Some("a"));
        let b = Pin::new(Data::binary(8), Some("b"));
        let wire = Wire::direct(&a, &b, 3);
        assert_eq!(wire.delay(a.id(), Direction::In).unwrap(), 3);
        assert_eq!(wire.delay(b.id(), Direction::Out).unwrap(), 0);
        assert!(wire.delay(a.id(), Direction::Out).is_err());
        assert!(wire.name().starts_with("[P_a"));
    }

    #[test]
    fn branch_fans_out_to_every_sink() {
        let src = Pin::new(Data::binary(1), Some("clk"));
        let s1 = Pin::new(Data::binary(1), None);
        let s2 = Pin::new(Data::binary(1), None);
        let wire = Wire::branch(&src, &[(Rc::clone(&s1), 0), (Rc::clone(&s2), 2)]);
        assert!(wire.has_end(src.id(), Direction::In));
        assert!(wire.has_end(s1.id(), Direction::Out));
        assert_eq!(wire.delay(s2.id(), Direction::Out).unwrap(), 2);
    }

    #[test]
    fn only_input_pins_may_write() {
        let a = Pin::new(Data::binary(8), None);
        let b = Pin::new(Data::binary(8), None);
        let wire = Wire::direct(&a, &b, 0);
        assert!(wire.accept_write(Some(a.id())).is_ok());
        assert!(matches!(
            wire.accept_write(Some(b.id())),
            Err(SimError::NotAnInput { .. })
        ));
        assert!(matches!(
            wire.accept_write(None),
            Err(SimError::NotAPin { .. })
        ));
    }
}
