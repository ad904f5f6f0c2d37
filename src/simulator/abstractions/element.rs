use super::Data;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

//--------------------------------------------------------------------
// State

/// A single snapshotted value held in a state slot.
#[derive(Debug, Clone, PartialEq)]
pub enum StateValue {
    Bool(bool),
    Int(i64),
    Data(Data),
}

impl StateValue {
    pub fn as_bool(&self) -> bool {
        match self {
            StateValue::Bool(b) => *b,
            StateValue::Int(v) => *v != 0,
            StateValue::Data(d) => d.value() != 0,
        }
    }

    pub fn as_int(&self) -> i64 {
        match self {
            StateValue::Bool(b) => *b as i64,
            StateValue::Int(v) => *v,
            StateValue::Data(d) => d.value(),
        }
    }

    pub fn as_data(&self) -> Option<Data> {
        match self {
            StateValue::Data(d) => Some(*d),
            _ => None,
        }
    }
}

impl From<bool> for StateValue {
    fn from(value: bool) -> Self {
        StateValue::Bool(value)
    }
}

impl From<i64> for StateValue {
    fn from(value: i64) -> Self {
        StateValue::Int(value)
    }
}

impl From<Data> for StateValue {
    fn from(data: Data) -> Self {
        StateValue::Data(data)
    }
}

impl fmt::Display for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StateValue::Bool(b) => write!(f, "{b}"),
            StateValue::Int(v) => write!(f, "{v}"),
            StateValue::Data(d) => write!(f, "{d}"),
        }
    }
}

/// A copy of an element's declared state slots, keyed by alias.
/// Ordered so that cascades walk slots deterministically.
pub type Snapshot = BTreeMap<String, StateValue>;

//--------------------------------------------------------------------
// Identity

/// Direction of a pin seen from a wire or component: an `In` pin writes
/// into the owner, an `Out` pin is driven by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    In,
    Out,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Pin,
    Wire,
    Component,
}

/// Stable identity of an element: its kind plus `name__<uuid>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementId {
    kind: ElementKind,
    key: String,
}

impl ElementId {
    #[inline]
    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    #[inline]
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.key)
    }
}

const TAG_LEN: usize = 5;
const TAG_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

fn random_tag() -> String {
    Uuid::new_v4()
        .as_bytes()
        .iter()
        .take(TAG_LEN)
        .map(|b| TAG_ALPHABET[*b as usize % TAG_ALPHABET.len()] as char)
        .collect()
}

/// Name, classifier and identity shared by every element.
#[derive(Debug, Clone)]
pub struct ElementMeta {
    name: String,
    classifier: String,
    id: ElementId,
}

impl ElementMeta {
    /// `classifiers` are the inherited prefix segments, outermost first;
    /// empty segments are skipped. An omitted name gets a random 5-char tag.
    pub fn new(kind: ElementKind, classifiers: &[&str], name: Option<&str>) -> Self {
        let name = name.map(str::to_string).unwrap_or_else(random_tag);
        let classifier = classifiers
            .iter()
            .filter(|seg| !seg.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join("_");
        let id = ElementId {
            kind,
            key: format!("{}__{}", name, Uuid::new_v4().simple()),
        };
        ElementMeta {
            name,
            classifier,
            id,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn classifier(&self) -> &str {
        &self.classifier
    }

    #[inline]
    pub fn id(&self) -> &ElementId {
        &self.id
    }

    pub fn full_name(&self) -> String {
        if self.classifier.is_empty() {
            self.name.clone()
        } else {
            format!("{}_{}", self.classifier, self.name)
        }
    }
}

//--------------------------------------------------------------------
// Element

/// Anything participating in a circuit: pin, wire or component.
///
/// Every element exposes its declared state slots as a [`Snapshot`].
/// Mutators of declared slots capture the snapshot immediately before
/// the new value lands and hand it to the engine, which runs the
/// matching propagation behavior against it.
pub trait Element {
    fn meta(&self) -> &ElementMeta;

    fn snapshot(&self) -> Snapshot;

    /// Assign snapshotted values back into their slots. Unknown aliases
    /// are ignored; no propagation is triggered.
    fn restore(&self, snapshot: &Snapshot);

    fn id(&self) -> &ElementId {
        self.meta().id()
    }

    fn name(&self) -> &str {
        self.meta().name()
    }

    fn full_name(&self) -> String {
        self.meta().full_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifier_segments_join_with_underscore() {
        let meta = ElementMeta::new(ElementKind::Component, &["C", "REG"], Some("r1"));
        assert_eq!(meta.classifier(), "C_REG");
        assert_eq!(meta.full_name(), "C_REG_r1");
    }

    #[test]
    fn empty_segments_are_skipped() {
        let meta = ElementMeta::new(ElementKind::Component, &["C", "", "REG"], Some("x"));
        assert_eq!(meta.classifier(), "C_REG");
        let bare = ElementMeta::new(ElementKind::Pin, &[], Some("x"));
        assert_eq!(bare.full_name(), "x");
    }

    #[test]
    fn unnamed_elements_get_a_five_char_tag() {
        let meta = ElementMeta::new(ElementKind::Pin, &["P"], None);
        assert_eq!(meta.name().len(), TAG_LEN);
        assert!(meta
            .name()
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        assert!(meta.full_name().starts_with("P_"));
    }

    #[test]
    fn ids_are_unique_per_instance() {
        let a = ElementMeta::new(ElementKind::Pin, &["P"], Some("clk"));
        let b = ElementMeta::new(ElementKind::Pin, &["P"], Some("clk"));
        assert_ne!(a.id(), b.id());
        assert!(a.id().key().starts_with("clk__"));
        assert_eq!(a.id().kind(), ElementKind::Pin);
    }
}
