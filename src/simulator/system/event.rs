use crate::simulator::abstractions::{ElementId, Snapshot, Tick, WriteValue};
use std::fmt;

pub const WRITE_EVENT: &str = "write";
pub const INTERNAL_EVENT: &str = "internal";

#[derive(Debug, Clone)]
pub enum EventKind {
    /// At `time`, `source` writes `value` to `target` (a pin or wire).
    Write { value: WriteValue },
    /// Notification that `source`'s state changed; `prev` is the
    /// snapshot taken immediately before the change.
    Internal { prev: Snapshot },
}

/// A scheduled occurrence in virtual time. The scheduler stamps every
/// event with a monotonic sequence number used as the secondary
/// priority key, so same-time events dispatch in insertion order.
#[derive(Debug, Clone)]
pub struct Event {
    pub time: Tick,
    pub source: Option<ElementId>,
    pub target: ElementId,
    pub kind: EventKind,
    pub(crate) seq: u64,
}

impl Event {
    pub fn write(
        source: Option<&ElementId>,
        target: &ElementId,
        time: Tick,
        value: impl Into<WriteValue>,
    ) -> Event {
        Event {
            time,
            source: source.cloned(),
            target: target.clone(),
            kind: EventKind::Write {
                value: value.into(),
            },
            seq: 0,
        }
    }

    pub fn internal(source: &ElementId, target: &ElementId, time: Tick, prev: Snapshot) -> Event {
        Event {
            time,
            source: Some(source.clone()),
            target: target.clone(),
            kind: EventKind::Internal { prev },
            seq: 0,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            EventKind::Write { .. } => WRITE_EVENT,
            EventKind::Internal { .. } => INTERNAL_EVENT,
        }
    }

    #[inline]
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let source = self
            .source
            .as_ref()
            .map(ElementId::to_string)
            .unwrap_or_else(|| "-".to_string());
        match &self.kind {
            EventKind::Write { value } => write!(
                f,
                "write[t={} {} -> {} value={}]",
                self.time, source, self.target, value
            ),
            EventKind::Internal { .. } => {
                write!(f, "internal[t={} {} -> {}]", self.time, source, self.target)
            }
        }
    }
}
