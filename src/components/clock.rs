use crate::simulator::abstractions::{MappedInput, ReactFn, Snapshot, StateValue};

/// State alias shared by every clock-driven component.
pub const CLK: &str = "clk";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Rising,
    Falling,
}

/// In-mapping for a 1-bit clock pin: the pin's data becomes the `clk`
/// boolean slot.
pub fn clk_input(pin_id: &str) -> MappedInput {
    MappedInput::new(pin_id, CLK, |data| StateValue::Bool(data.value() == 1))
}

/// React hook detecting clock edges. `on_edge` runs with the current
/// snapshot when `clk` flips in the configured direction and returns
/// the state assignments to apply. Edge detection reads the `clk` value
/// out of the pre-mutation snapshot, so it depends on the snapshot
/// taken immediately before the flip landed.
pub fn edge_react(
    edge: Edge,
    on_edge: impl Fn(&Snapshot) -> Vec<(String, StateValue)> + 'static,
) -> ReactFn {
    Box::new(move |prev: &Snapshot, current: &Snapshot| {
        let was = prev.get(CLK).map(StateValue::as_bool);
        let is = current.get(CLK).map(StateValue::as_bool);
        match (was, is) {
            (Some(was), Some(is)) if was != is => {
                let fired = match edge {
                    Edge::Rising => is,
                    Edge::Falling => !is,
                };
                if fired {
                    on_edge(current)
                } else {
                    Vec::new()
                }
            }
            _ => Vec::new(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn snap(clk: bool) -> Snapshot {
        BTreeMap::from([(CLK.to_string(), StateValue::Bool(clk))])
    }

    #[test]
    fn fires_only_on_the_configured_edge() {
        let hook = edge_react(Edge::Rising, |_| {
            vec![("hit".to_string(), StateValue::Bool(true))]
        });
        assert_eq!(hook(&snap(false), &snap(true)).len(), 1);
        assert!(hook(&snap(true), &snap(false)).is_empty());
        assert!(hook(&snap(true), &snap(true)).is_empty());

        let hook = edge_react(Edge::Falling, |_| {
            vec![("hit".to_string(), StateValue::Bool(true))]
        });
        assert!(hook(&snap(false), &snap(true)).is_empty());
        assert_eq!(hook(&snap(true), &snap(false)).len(), 1);
    }

    #[test]
    fn ignores_mutations_without_a_clk_slot() {
        let hook = edge_react(Edge::Rising, |_| {
            vec![("hit".to_string(), StateValue::Bool(true))]
        });
        assert!(hook(&BTreeMap::new(), &snap(true)).is_empty());
    }
}
