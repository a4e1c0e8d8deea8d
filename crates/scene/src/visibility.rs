use catalog::{Entity, EntityCatalog};
use foundation::ids::EntityId;

use crate::entity_set::EntitySet;
use crate::view_state::ViewState;

/// Per-marker presentation derived from the view state.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum VisualState {
    #[default]
    Normal,
    Hovered,
    Selected,
}

/// `true` when `entity` passes the active category filter.
pub fn passes_filter(entity: &Entity, view: &ViewState) -> bool {
    view.active_filter
        .as_ref()
        .is_none_or(|c| *c == entity.category)
}

/// Ids that should carry a marker: every entity when no filter is active,
/// otherwise the entities of the filtered category.
pub fn visible_entities(catalog: &EntityCatalog, view: &ViewState) -> EntitySet {
    catalog
        .iter()
        .filter(|e| passes_filter(e, view))
        .map(|e| e.id)
        .collect()
}

/// Visible ids in page order, used for list navigation.
pub fn visible_in_page_order(catalog: &EntityCatalog, view: &ViewState) -> Vec<EntityId> {
    catalog
        .iter()
        .filter(|e| passes_filter(e, view))
        .map(|e| e.id)
        .collect()
}

/// Selected wins over hovered.
pub fn visual_state_for(id: EntityId, view: &ViewState) -> VisualState {
    if view.selected == Some(id) {
        VisualState::Selected
    } else if view.hovered == Some(id) {
        VisualState::Hovered
    } else {
        VisualState::Normal
    }
}

#[cfg(test)]
mod tests {
    use super::{VisualState, visible_entities, visible_in_page_order, visual_state_for};
    use crate::view_state::ViewState;
    use catalog::{Category, Entity, EntityCatalog};
    use foundation::geo::LatLng;
    use foundation::ids::EntityId;
    use pretty_assertions::assert_eq;

    fn catalog() -> EntityCatalog {
        EntityCatalog::new(vec![
            Entity::new(5, LatLng::new(0.0, 0.0), "A"),
            Entity::new(1, LatLng::new(1.0, 1.0), "B"),
            Entity::new(3, LatLng::new(2.0, 2.0), "A"),
        ])
        .unwrap()
    }

    #[test]
    fn no_filter_shows_everything() {
        let ids: Vec<u32> = visible_entities(&catalog(), &ViewState::default())
            .iter()
            .map(|id| id.0)
            .collect();
        assert_eq!(ids, vec![1, 3, 5]);
    }

    #[test]
    fn filter_restricts_to_category() {
        let view = ViewState::default().with_filter(Some(Category::from("A")));
        assert_eq!(visible_entities(&catalog(), &view).len(), 2);
        assert_eq!(
            visible_in_page_order(&catalog(), &view),
            vec![EntityId(5), EntityId(3)]
        );
    }

    #[test]
    fn unknown_category_yields_empty_set() {
        let view = ViewState::default().with_filter(Some(Category::from("Z")));
        assert!(visible_entities(&catalog(), &view).is_empty());
    }

    #[test]
    fn selected_takes_precedence_over_hovered() {
        let view = ViewState::default()
            .with_selected(Some(EntityId(1)))
            .with_hovered(Some(EntityId(1)));
        assert_eq!(visual_state_for(EntityId(1), &view), VisualState::Selected);

        let view = view.with_hovered(Some(EntityId(3)));
        assert_eq!(visual_state_for(EntityId(3), &view), VisualState::Hovered);
        assert_eq!(visual_state_for(EntityId(5), &view), VisualState::Normal);
    }
}
