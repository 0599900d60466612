//! Dashboard composition: widget layout, badges and activity stats

pub mod badges;
pub mod stats;
pub mod widgets;

use serde::{Deserialize, Serialize};

pub use badges::{earned_badges, BadgeId, BadgeStatus};
pub use stats::{ActivityStats, GoalTotals};
pub use widgets::{
    resolve_layout, DashboardLayout, ResolvedLayout, WidgetId, WidgetSlot, WidgetState,
    WidgetTiers,
};

/// Global switches controlled by administrators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSettings {
    #[serde(default = "enabled")]
    pub social_module_enabled: bool,
    #[serde(default)]
    pub maintenance_mode: bool,
    /// When off, unknown users cannot sign in
    #[serde(default)]
    pub new_signups: bool,
}

fn enabled() -> bool {
    true
}

impl Default for AdminSettings {
    fn default() -> Self {
        Self {
            social_module_enabled: true,
            maintenance_mode: false,
            new_signups: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_settings_defaults() {
        let parsed: AdminSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, AdminSettings::default());
        assert!(parsed.social_module_enabled);
        assert!(!parsed.new_signups);
    }
}
