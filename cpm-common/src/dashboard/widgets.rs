//! Dashboard widgets, column layout and per-widget tier gating

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::AdminSettings;
use crate::{has_access, Error, Result, Tier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WidgetId {
    CurrentStatus,
    Concept,
    Resources,
    Timeline,
    Tasks,
    WeeklyGoals,
    Badges,
    Friends,
    Favorites,
    QuoteOfTheDay,
    FocusTimer,
    ActivitySummary,
    Calendar,
}

impl WidgetId {
    pub const ALL: [WidgetId; 13] = [
        WidgetId::CurrentStatus,
        WidgetId::Concept,
        WidgetId::Resources,
        WidgetId::Timeline,
        WidgetId::Tasks,
        WidgetId::WeeklyGoals,
        WidgetId::Badges,
        WidgetId::Friends,
        WidgetId::Favorites,
        WidgetId::QuoteOfTheDay,
        WidgetId::FocusTimer,
        WidgetId::ActivitySummary,
        WidgetId::Calendar,
    ];

    /// Display name shown on the widget card and its locked preview
    pub fn title(self) -> &'static str {
        match self {
            WidgetId::CurrentStatus => "Seu Próximo Passo",
            WidgetId::Concept => "Conceito do Dia",
            WidgetId::Resources => "Biblioteca de Recursos",
            WidgetId::Timeline => "Jornada de Aprendizagem",
            WidgetId::Tasks => "Minhas Tarefas",
            WidgetId::WeeklyGoals => "Metas Semanais",
            WidgetId::Badges => "Insígnias e Troféus",
            WidgetId::Friends => "Amigos/Conexões",
            WidgetId::Favorites => "Meus Favoritos",
            WidgetId::QuoteOfTheDay => "Citação do Dia",
            WidgetId::FocusTimer => "Bloco de Foco",
            WidgetId::ActivitySummary => "Resumo de Atividades",
            WidgetId::Calendar => "Calendário",
        }
    }

    fn default_tier(self) -> Tier {
        match self {
            WidgetId::Concept
            | WidgetId::WeeklyGoals
            | WidgetId::Favorites
            | WidgetId::FocusTimer
            | WidgetId::Calendar => Tier::Essential,
            WidgetId::Badges | WidgetId::Friends | WidgetId::ActivitySummary => Tier::Complete,
            WidgetId::CurrentStatus
            | WidgetId::Resources
            | WidgetId::Timeline
            | WidgetId::Tasks
            | WidgetId::QuoteOfTheDay => Tier::Free,
        }
    }
}

/// Widget order for the two dashboard columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "LayoutColumns")]
pub struct DashboardLayout {
    pub main: Vec<WidgetId>,
    pub sidebar: Vec<WidgetId>,
}

/// Unchecked wire form of [`DashboardLayout`]
#[derive(Deserialize)]
struct LayoutColumns {
    #[serde(default)]
    main: Vec<WidgetId>,
    #[serde(default)]
    sidebar: Vec<WidgetId>,
}

impl TryFrom<LayoutColumns> for DashboardLayout {
    type Error = Error;

    fn try_from(columns: LayoutColumns) -> Result<Self> {
        DashboardLayout::new(columns.main, columns.sidebar)
    }
}

impl Default for DashboardLayout {
    fn default() -> Self {
        Self {
            main: vec![
                WidgetId::CurrentStatus,
                WidgetId::ActivitySummary,
                WidgetId::Concept,
                WidgetId::Resources,
            ],
            sidebar: vec![
                WidgetId::Timeline,
                WidgetId::Tasks,
                WidgetId::WeeklyGoals,
                WidgetId::Calendar,
                WidgetId::FocusTimer,
                WidgetId::QuoteOfTheDay,
                WidgetId::Badges,
                WidgetId::Friends,
                WidgetId::Favorites,
            ],
        }
    }
}

impl DashboardLayout {
    /// Build a layout, rejecting a widget placed twice (in either column)
    pub fn new(main: Vec<WidgetId>, sidebar: Vec<WidgetId>) -> Result<Self> {
        let mut seen = HashSet::new();
        for widget in main.iter().chain(sidebar.iter()) {
            if !seen.insert(*widget) {
                return Err(Error::InvalidInput(format!(
                    "Widget {:?} appears more than once",
                    widget
                )));
            }
        }
        Ok(Self { main, sidebar })
    }
}

/// Required tier per widget; widgets without an entry are Free
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WidgetTiers(HashMap<WidgetId, Tier>);

impl WidgetTiers {
    pub fn tier_for(&self, widget: WidgetId) -> Tier {
        self.0.get(&widget).copied().unwrap_or(Tier::Free)
    }

    pub fn set(&mut self, widget: WidgetId, tier: Tier) {
        self.0.insert(widget, tier);
    }

    pub fn empty() -> Self {
        Self(HashMap::new())
    }
}

impl Default for WidgetTiers {
    fn default() -> Self {
        Self(
            WidgetId::ALL
                .iter()
                .map(|w| (*w, w.default_tier()))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum WidgetState {
    Visible,
    #[serde(rename_all = "camelCase")]
    Locked { required_tier: Tier },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetSlot {
    pub widget: WidgetId,
    pub title: &'static str,
    #[serde(flatten)]
    pub state: WidgetState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedLayout {
    pub main: Vec<WidgetSlot>,
    pub sidebar: Vec<WidgetSlot>,
}

/// Gate each widget for a user; `friends` is dropped while the social module is off
pub fn resolve_layout(
    layout: &DashboardLayout,
    tiers: &WidgetTiers,
    user_tier: Tier,
    settings: &AdminSettings,
) -> ResolvedLayout {
    let resolve = |column: &[WidgetId]| -> Vec<WidgetSlot> {
        column
            .iter()
            .filter(|w| settings.social_module_enabled || **w != WidgetId::Friends)
            .map(|w| {
                let required_tier = tiers.tier_for(*w);
                let state = if has_access(user_tier, required_tier) {
                    WidgetState::Visible
                } else {
                    WidgetState::Locked { required_tier }
                };
                WidgetSlot {
                    widget: *w,
                    title: w.title(),
                    state,
                }
            })
            .collect()
    };

    ResolvedLayout {
        main: resolve(&layout.main),
        sidebar: resolve(&layout.sidebar),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_user_sees_free_widgets_and_locked_previews() {
        let resolved = resolve_layout(
            &DashboardLayout::default(),
            &WidgetTiers::default(),
            Tier::Free,
            &AdminSettings::default(),
        );

        assert_eq!(resolved.main[0].widget, WidgetId::CurrentStatus);
        assert_eq!(resolved.main[0].state, WidgetState::Visible);
        assert_eq!(
            resolved.main[1].state,
            WidgetState::Locked {
                required_tier: Tier::Complete
            }
        );
        assert_eq!(resolved.sidebar.len(), 9);
    }

    #[test]
    fn test_complete_user_sees_everything() {
        let resolved = resolve_layout(
            &DashboardLayout::default(),
            &WidgetTiers::default(),
            Tier::Complete,
            &AdminSettings::default(),
        );
        assert!(resolved
            .main
            .iter()
            .chain(resolved.sidebar.iter())
            .all(|slot| slot.state == WidgetState::Visible));
    }

    #[test]
    fn test_friends_hidden_when_social_disabled() {
        let settings = AdminSettings {
            social_module_enabled: false,
            ..AdminSettings::default()
        };
        let resolved = resolve_layout(
            &DashboardLayout::default(),
            &WidgetTiers::default(),
            Tier::Complete,
            &settings,
        );
        assert!(resolved.sidebar.iter().all(|s| s.widget != WidgetId::Friends));
        assert_eq!(resolved.sidebar.len(), 8);
    }

    #[test]
    fn test_missing_tier_entry_defaults_to_free() {
        let tiers = WidgetTiers::empty();
        assert_eq!(tiers.tier_for(WidgetId::Badges), Tier::Free);
        let layout = DashboardLayout::new(vec![WidgetId::Badges], vec![]).unwrap();
        let resolved = resolve_layout(&layout, &tiers, Tier::Free, &AdminSettings::default());
        assert_eq!(resolved.main[0].state, WidgetState::Visible);
    }

    #[test]
    fn test_layout_rejects_duplicates_across_columns() {
        assert!(DashboardLayout::new(vec![WidgetId::Tasks], vec![WidgetId::Tasks]).is_err());
        assert!(DashboardLayout::new(vec![WidgetId::Tasks, WidgetId::Tasks], vec![]).is_err());
    }

    #[test]
    fn test_deserialized_layout_rejects_duplicates() {
        let parsed: std::result::Result<DashboardLayout, _> =
            serde_json::from_str(r#"{"main": ["tasks"], "sidebar": ["tasks"]}"#);
        assert!(parsed.is_err());

        let layout: DashboardLayout =
            serde_json::from_str(r#"{"main": ["tasks"], "sidebar": ["badges"]}"#).unwrap();
        assert_eq!(layout.sidebar, vec![WidgetId::Badges]);
    }

    #[test]
    fn test_slot_serialization_shape() {
        let slot = WidgetSlot {
            widget: WidgetId::WeeklyGoals,
            title: WidgetId::WeeklyGoals.title(),
            state: WidgetState::Locked {
                required_tier: Tier::Essential,
            },
        };
        let json = serde_json::to_value(slot).unwrap();
        assert_eq!(json["widget"], "weeklyGoals");
        assert_eq!(json["state"], "locked");
        assert_eq!(json["requiredTier"], "Essential");
    }

    #[test]
    fn test_widget_tiers_accept_legacy_tier_names() {
        let tiers: WidgetTiers =
            serde_json::from_str(r#"{"badges": "Completo", "tasks": "Grátis"}"#).unwrap();
        assert_eq!(tiers.tier_for(WidgetId::Badges), Tier::Complete);
        assert_eq!(tiers.tier_for(WidgetId::Calendar), Tier::Free);
    }
}
