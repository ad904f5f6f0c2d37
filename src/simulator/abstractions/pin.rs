use super::{Data, Element, ElementKind, ElementMeta, Snapshot, StateValue, WriteValue};
use crate::simulator::errors::SimError;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Alias of the pin's single buffered state slot.
pub const PIN_DATA: &str = "data";

/// A value-carrying node at a component boundary. The buffered `data`
/// slot is the pin's only state; writing it returns the pre-write
/// snapshot so the engine can propagate the change.
pub struct Pin {
    meta: ElementMeta,
    data: RefCell<Data>,
    last_write: Cell<Option<u64>>,
}

impl Pin {
    pub fn new(data: Data, name: Option<&str>) -> Rc<Pin> {
        Rc::new(Pin {
            meta: ElementMeta::new(ElementKind::Pin, &["P"], name),
            data: RefCell::new(data),
            last_write: Cell::new(None),
        })
    }

    #[inline]
    pub fn data(&self) -> Data {
        *self.data.borrow()
    }

    /// Install a new buffered value. Raw integers are coerced through
    /// `Data::of`; `Data` payloads must be shape-compatible. Returns the
    /// snapshot taken immediately before the write landed.
    pub fn write(&self, value: impl Into<WriteValue>) -> Result<Snapshot, SimError> {
        let next = match value.into() {
            WriteValue::Int(v) => self.data().of(Some(v))?,
            WriteValue::Data(d) => {
                let current = self.data();
                if !current.compatible(&d) {
                    return Err(SimError::Incompatible {
                        left: current.shape().to_string(),
                        right: d.shape().to_string(),
                    });
                }
                current.of(Some(d.value()))?
            }
        };
        let prev = self.snapshot();
        *self.data.borrow_mut() = next;
        Ok(prev)
    }

    /// Reset the buffer to its default value.
    pub fn reset(&self) -> Result<Snapshot, SimError> {
        let next = self.data().of(None)?;
        let prev = self.snapshot();
        *self.data.borrow_mut() = next;
        Ok(prev)
    }

    pub(crate) fn mark_written(&self, time: u64) {
        self.last_write.set(Some(time));
    }

    pub(crate) fn last_write_at(&self) -> Option<u64> {
        self.last_write.get()
    }
}

impl Element for Pin {
    fn meta(&self) -> &ElementMeta {
        &self.meta
    }

    fn snapshot(&self) -> Snapshot {
        BTreeMap::from([(PIN_DATA.to_string(), StateValue::Data(self.data()))])
    }

    fn restore(&self, snapshot: &Snapshot) {
        if let Some(StateValue::Data(d)) = snapshot.get(PIN_DATA) {
            *self.data.borrow_mut() = *d;
        }
    }
}

impl fmt::Debug for Pin {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<<{}>>(data: {})", self.full_name(), self.data())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_returns_the_previous_snapshot() {
        let pin = Pin::new(Data::binary(8), Some("d"));
        let prev = pin.write(0x42).unwrap();
        assert_eq!(prev[PIN_DATA], StateValue::Data(Data::binary(8)));
        assert_eq!(pin.data().value(), 0x42);
    }

    #[test]
    fn write_coerces_and_validates_integers() {
        let pin = Pin::new(Data::binary(4), None);
        assert!(pin.write(16).is_err());
        assert_eq!(pin.data().value(), 0);
        pin.write(15).unwrap();
        assert_eq!(pin.data().value(), 15);
    }

    #[test]
    fn write_rejects_incompatible_data() {
        let pin = Pin::new(Data::binary(8), None);
        assert!(pin.write(Data::binary(4).of(Some(3)).unwrap()).is_err());
        pin.write(Data::binary(8).of(Some(3)).unwrap()).unwrap();
        assert_eq!(pin.data().value(), 3);
    }

    #[test]
    fn reset_restores_the_default() {
        let pin = Pin::new(Data::binary(8), None);
        pin.write(99).unwrap();
        pin.reset().unwrap();
        assert_eq!(pin.data().value(), 0);
    }

    #[test]
    fn snapshot_round_trips_through_restore() {
        let pin = Pin::new(Data::binary(8), None);
        pin.write(7).unwrap();
        let snap = pin.snapshot();
        pin.write(8).unwrap();
        pin.restore(&snap);
        assert_eq!(pin.data().value(), 7);
    }
}
