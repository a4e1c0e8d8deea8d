//! Declarative view state and the reducer the UI store applies to it.
//!
//! The annotation engine only ever reads a `ViewState`. Mutation happens
//! here, in response to user intents, on the page side.

use std::collections::BTreeMap;

use catalog::{Category, EntityCatalog};
use foundation::ids::{EntityId, LayerId};

use crate::visibility::visible_in_page_order;

/// `ViewState::default()` carries no layer entries. A page that toggles
/// layers should start from the engine's initial view state, which seeds
/// every overlay with its configured visibility.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub active_filter: Option<Category>,
    pub selected: Option<EntityId>,
    pub hovered: Option<EntityId>,
    /// Explicit per-layer visibility. Layers without an entry keep their
    /// configured default.
    pub layer_visibility: BTreeMap<LayerId, bool>,
}

impl ViewState {
    pub fn with_filter(mut self, filter: Option<Category>) -> Self {
        self.active_filter = filter;
        self
    }

    pub fn with_selected(mut self, selected: Option<EntityId>) -> Self {
        self.selected = selected;
        self
    }

    pub fn with_hovered(mut self, hovered: Option<EntityId>) -> Self {
        self.hovered = hovered;
        self
    }

    pub fn with_layer(mut self, layer: impl Into<LayerId>, visible: bool) -> Self {
        self.layer_visibility.insert(layer.into(), visible);
        self
    }

    pub fn layer_visible(&self, layer: &LayerId) -> Option<bool> {
        self.layer_visibility.get(layer).copied()
    }
}

/// A user intent raised by the page (click, hover, key press, toggle).
#[derive(Debug, Clone, PartialEq)]
pub enum ViewIntent {
    SetFilter(Option<Category>),
    Select(Option<EntityId>),
    Hover(Option<EntityId>),
    SetLayerVisible(LayerId, bool),
    /// Flips the layer's explicit entry. A missing entry counts as hidden,
    /// so the first toggle of an unseeded default-visible layer leaves it shown.
    ToggleLayer(LayerId),
    /// Selects the next visible entity in page order, wrapping.
    SelectNext,
    /// Selects the previous visible entity in page order, wrapping.
    SelectPrevious,
}

/// Applies `intent` to `state`, returning the next state.
pub fn reduce(state: &ViewState, intent: &ViewIntent, catalog: &EntityCatalog) -> ViewState {
    let mut next = state.clone();
    match intent {
        ViewIntent::SetFilter(filter) => next.active_filter = filter.clone(),
        ViewIntent::Select(id) => next.selected = *id,
        ViewIntent::Hover(id) => next.hovered = *id,
        ViewIntent::SetLayerVisible(layer, visible) => {
            next.layer_visibility.insert(layer.clone(), *visible);
        }
        ViewIntent::ToggleLayer(layer) => {
            let current = state.layer_visible(layer).unwrap_or(false);
            next.layer_visibility.insert(layer.clone(), !current);
        }
        ViewIntent::SelectNext => next.selected = step_selection(state, catalog, 1),
        ViewIntent::SelectPrevious => next.selected = step_selection(state, catalog, -1),
    }
    next
}

fn step_selection(state: &ViewState, catalog: &EntityCatalog, delta: isize) -> Option<EntityId> {
    let order = visible_in_page_order(catalog, state);
    if order.is_empty() {
        return state.selected;
    }
    let len = order.len() as isize;
    let current = state
        .selected
        .and_then(|id| order.iter().position(|&o| o == id));
    let idx = match current {
        Some(pos) => (pos as isize + delta).rem_euclid(len),
        None if delta >= 0 => 0,
        None => len - 1,
    };
    Some(order[idx as usize])
}

#[cfg(test)]
mod tests {
    use super::{ViewIntent, ViewState, reduce};
    use catalog::{Category, Entity, EntityCatalog};
    use foundation::geo::LatLng;
    use foundation::ids::{EntityId, LayerId};

    fn catalog() -> EntityCatalog {
        EntityCatalog::new(vec![
            Entity::new(1, LatLng::new(0.0, 0.0), "A"),
            Entity::new(2, LatLng::new(0.0, 1.0), "B"),
            Entity::new(3, LatLng::new(0.0, 2.0), "A"),
        ])
        .unwrap()
    }

    #[test]
    fn select_and_hover_are_independent() {
        let c = catalog();
        let s = reduce(&ViewState::default(), &ViewIntent::Select(Some(EntityId(2))), &c);
        let s = reduce(&s, &ViewIntent::Hover(Some(EntityId(1))), &c);
        assert_eq!(s.selected, Some(EntityId(2)));
        assert_eq!(s.hovered, Some(EntityId(1)));
    }

    #[test]
    fn filter_change_keeps_selection() {
        let c = catalog();
        let s = ViewState::default().with_selected(Some(EntityId(2)));
        let s = reduce(&s, &ViewIntent::SetFilter(Some(Category::from("A"))), &c);
        assert_eq!(s.selected, Some(EntityId(2)));
    }

    #[test]
    fn toggle_layer_flips_entry() {
        let c = catalog();
        let route = LayerId::from("route");
        let s = reduce(&ViewState::default(), &ViewIntent::ToggleLayer(route.clone()), &c);
        assert_eq!(s.layer_visible(&route), Some(true));
        let s = reduce(&s, &ViewIntent::ToggleLayer(route.clone()), &c);
        assert_eq!(s.layer_visible(&route), Some(false));
    }

    #[test]
    fn navigation_walks_visible_entities_and_wraps() {
        let c = catalog();
        let s = ViewState::default().with_filter(Some(Category::from("A")));
        let s = reduce(&s, &ViewIntent::SelectNext, &c);
        assert_eq!(s.selected, Some(EntityId(1)));
        let s = reduce(&s, &ViewIntent::SelectNext, &c);
        assert_eq!(s.selected, Some(EntityId(3)));
        let s = reduce(&s, &ViewIntent::SelectNext, &c);
        assert_eq!(s.selected, Some(EntityId(1)));
        let s = reduce(&s, &ViewIntent::SelectPrevious, &c);
        assert_eq!(s.selected, Some(EntityId(3)));
    }

    #[test]
    fn previous_from_nothing_starts_at_the_end() {
        let c = catalog();
        let s = reduce(&ViewState::default(), &ViewIntent::SelectPrevious, &c);
        assert_eq!(s.selected, Some(EntityId(3)));
    }

    #[test]
    fn navigation_with_empty_result_keeps_selection() {
        let c = catalog();
        let s = ViewState::default()
            .with_filter(Some(Category::from("none")))
            .with_selected(Some(EntityId(2)));
        let s = reduce(&s, &ViewIntent::SelectNext, &c);
        assert_eq!(s.selected, Some(EntityId(2)));
    }
}
