use super::Event;
use crate::simulator::abstractions::{ElementId, ElementKind};
use crate::simulator::errors::SimError;
use crate::simulator::Engine;
use std::rc::Rc;

/// Restricts which elements an event's source or target may be.
#[derive(Debug, Clone)]
pub enum ElementFilter {
    Kind(ElementKind),
    Id(ElementId),
}

impl ElementFilter {
    fn matches(&self, id: &ElementId) -> bool {
        match self {
            ElementFilter::Kind(kind) => id.kind() == *kind,
            ElementFilter::Id(exact) => id == exact,
        }
    }
}

fn filters_match(filters: &[ElementFilter], id: Option<&ElementId>) -> bool {
    if filters.is_empty() {
        return true;
    }
    match id {
        Some(id) => filters.iter().any(|f| f.matches(id)),
        None => false,
    }
}

pub type HandlerAction = Box<dyn Fn(&mut Engine, &Event) -> Result<(), SimError>>;
pub type MatcherFn = Box<dyn Fn(&Event) -> bool>;

/// A predicate/action pair dispatched by the event system. `matches` is
/// the conjunction of the kind, source, target and extra-matcher
/// predicates; empty filter lists match anything.
pub struct EventHandler {
    label: &'static str,
    kinds: Vec<&'static str>,
    sources: Vec<ElementFilter>,
    targets: Vec<ElementFilter>,
    matcher: Option<MatcherFn>,
    action: HandlerAction,
}

impl EventHandler {
    pub fn simple(
        label: &'static str,
        kinds: &[&'static str],
        sources: Vec<ElementFilter>,
        targets: Vec<ElementFilter>,
        matcher: Option<MatcherFn>,
        action: impl Fn(&mut Engine, &Event) -> Result<(), SimError> + 'static,
    ) -> Rc<EventHandler> {
        Rc::new(EventHandler {
            label,
            kinds: kinds.to_vec(),
            sources,
            targets,
            matcher,
            action: Box::new(action),
        })
    }

    #[inline]
    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn matches(&self, event: &Event) -> bool {
        (self.kinds.is_empty() || self.kinds.contains(&event.kind_name()))
            && filters_match(&self.sources, event.source.as_ref())
            && filters_match(&self.targets, Some(&event.target))
            && self.matcher.as_ref().map_or(true, |m| m(event))
    }

    /// Run the action. The caller guarantees `matches` returned true.
    pub fn handle(&self, engine: &mut Engine, event: &Event) -> Result<(), SimError> {
        (self.action)(engine, event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::abstractions::{Data, Element, Pin};
    use crate::simulator::system::WRITE_EVENT;

    #[test]
    fn matching_is_the_conjunction_of_all_predicates() {
        let pin = Pin::new(Data::binary(8), None);
        let other = Pin::new(Data::binary(8), None);
        let handler = EventHandler::simple(
            "test",
            &[WRITE_EVENT],
            vec![],
            vec![ElementFilter::Id(pin.id().clone())],
            Some(Box::new(|event| event.time >= 5)),
            |_, _| Ok(()),
        );

        let hit = Event::write(None, pin.id(), 5, 1);
        assert!(handler.matches(&hit));
        let wrong_target = Event::write(None, other.id(), 5, 1);
        assert!(!handler.matches(&wrong_target));
        let too_early = Event::write(None, pin.id(), 4, 1);
        assert!(!handler.matches(&too_early));
        let wrong_kind = Event::internal(pin.id(), pin.id(), 5, pin.snapshot());
        assert!(!handler.matches(&wrong_kind));
    }

    #[test]
    fn source_filters_reject_sourceless_events() {
        let pin = Pin::new(Data::binary(8), None);
        let handler = EventHandler::simple(
            "test",
            &[],
            vec![ElementFilter::Kind(ElementKind::Pin)],
            vec![],
            None,
            |_, _| Ok(()),
        );
        assert!(!handler.matches(&Event::write(None, pin.id(), 0, 1)));
        assert!(handler.matches(&Event::write(Some(pin.id()), pin.id(), 0, 1)));
    }
}
