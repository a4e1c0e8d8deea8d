//! Page files: engine configuration, the entity catalog, and a timed script
//! of user intents.

use catalog::{Category, EntityRecord};
use engine::EngineConfig;
use foundation::ids::{EntityId, LayerId};
use scene::view_state::ViewIntent;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageFile {
    #[serde(default = "default_container")]
    pub container: String,
    pub config: EngineConfig,
    pub entities: Vec<EntityRecord>,
    #[serde(default)]
    pub script: Vec<ScriptStep>,
}

fn default_container() -> String {
    "map".to_string()
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptStep {
    /// Milliseconds after page start.
    pub at_ms: u64,
    #[serde(flatten)]
    pub action: ScriptAction,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ScriptAction {
    Filter {
        #[serde(default)]
        category: Option<String>,
    },
    Select {
        #[serde(default)]
        entity: Option<u32>,
    },
    Hover {
        #[serde(default)]
        entity: Option<u32>,
    },
    ShowLayer {
        layer: String,
        visible: bool,
    },
    ToggleLayer {
        layer: String,
    },
    SelectNext,
    SelectPrevious,
    /// Navigates away: the component unmounts.
    Unmount,
}

impl ScriptAction {
    /// The view intent this action raises; `None` for lifecycle actions.
    pub fn intent(&self) -> Option<ViewIntent> {
        let intent = match self {
            ScriptAction::Filter { category } => {
                ViewIntent::SetFilter(category.as_deref().map(Category::from))
            }
            ScriptAction::Select { entity } => ViewIntent::Select(entity.map(EntityId)),
            ScriptAction::Hover { entity } => ViewIntent::Hover(entity.map(EntityId)),
            ScriptAction::ShowLayer { layer, visible } => {
                ViewIntent::SetLayerVisible(LayerId::new(layer.clone()), *visible)
            }
            ScriptAction::ToggleLayer { layer } => ViewIntent::ToggleLayer(LayerId::new(layer.clone())),
            ScriptAction::SelectNext => ViewIntent::SelectNext,
            ScriptAction::SelectPrevious => ViewIntent::SelectPrevious,
            ScriptAction::Unmount => return None,
        };
        Some(intent)
    }
}

impl PageFile {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        let mut page: PageFile = serde_json::from_str(json)?;
        page.script.sort_by_key(|s| s.at_ms);
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::{PageFile, ScriptAction};
    use catalog::Category;
    use foundation::ids::EntityId;
    use pretty_assertions::assert_eq;
    use scene::view_state::ViewIntent;

    const PAGE: &str = r#"{
        "config": {"surface": {"kind": "canvas"}},
        "entities": [
            {"id": 1, "lat": 48.85, "lng": 2.35, "category": "museum"},
            {"id": 2, "lat": 48.86, "lng": 2.33, "category": "cafe", "fields": {"name": "Flore"}}
        ],
        "script": [
            {"atMs": 900, "action": "unmount"},
            {"atMs": 100, "action": "filter", "category": "cafe"},
            {"atMs": 300, "action": "select", "entity": 2},
            {"atMs": 500, "action": "hover"}
        ]
    }"#;

    #[test]
    fn parses_and_orders_script() {
        let page = PageFile::from_json_str(PAGE).unwrap();
        assert_eq!(page.container, "map");
        assert_eq!(page.entities.len(), 2);
        let times: Vec<u64> = page.script.iter().map(|s| s.at_ms).collect();
        assert_eq!(times, vec![100, 300, 500, 900]);
        assert_eq!(page.script[3].action, ScriptAction::Unmount);
    }

    #[test]
    fn actions_map_to_intents() {
        let page = PageFile::from_json_str(PAGE).unwrap();
        let intents: Vec<_> = page.script.iter().map(|s| s.action.intent()).collect();
        assert_eq!(
            intents,
            vec![
                Some(ViewIntent::SetFilter(Some(Category::from("cafe")))),
                Some(ViewIntent::Select(Some(EntityId(2)))),
                Some(ViewIntent::Hover(None)),
                None,
            ]
        );
    }
}
