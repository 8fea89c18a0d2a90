//! Declarative theme configuration handed to the rendering layer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const LUXURY_THEME: &str = "luxuryTheme";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Blueprint {
    /// Material Design 3 component defaults.
    Md3,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    pub primary: String,
    pub secondary: String,
    pub background: String,
    pub surface: String,
    pub error: String,
    pub success: String,
    pub info: String,
    pub warning: String,
}

impl Palette {
    pub fn color(&self, name: &str) -> Option<&str> {
        let value = match name {
            "primary" => &self.primary,
            "secondary" => &self.secondary,
            "background" => &self.background,
            "surface" => &self.surface,
            "error" => &self.error,
            "success" => &self.success,
            "info" => &self.info,
            "warning" => &self.warning,
            _ => return None,
        };
        Some(value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub dark: bool,
    pub colors: Palette,
}

impl Theme {
    pub fn luxury() -> Self {
        Self {
            dark: true,
            colors: Palette {
                primary: "#FFD700".into(),
                secondary: "#B8860B".into(),
                background: "#121212".into(),
                surface: "#1E1E1E".into(),
                error: "#FF6F61".into(),
                success: "#4CAF50".into(),
                info: "#2196F3".into(),
                warning: "#FB8C00".into(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeConfig {
    pub blueprint: Blueprint,
    pub default_theme: String,
    pub themes: BTreeMap<String, Theme>,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            blueprint: Blueprint::Md3,
            default_theme: LUXURY_THEME.to_string(),
            themes: BTreeMap::from([(LUXURY_THEME.to_string(), Theme::luxury())]),
        }
    }
}

impl ThemeConfig {
    pub fn active(&self) -> Option<&Theme> {
        self.themes.get(&self.default_theme)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_activates_dark_luxury_theme() {
        let config = ThemeConfig::default();
        let theme = config.active().expect("default theme registered");
        assert!(theme.dark);
        assert_eq!(theme.colors.color("primary"), Some("#FFD700"));
        assert_eq!(theme.colors.color("background"), Some("#121212"));
        assert_eq!(theme.colors.color("accent"), None);
    }

    #[test]
    fn unknown_default_theme_has_no_active_theme() {
        let config = ThemeConfig {
            default_theme: "missing".into(),
            ..ThemeConfig::default()
        };
        assert!(config.active().is_none());
    }

    #[test]
    fn serializes_with_renderer_field_names() {
        let value = serde_json::to_value(ThemeConfig::default()).expect("encode");
        assert_eq!(value["blueprint"], "md3");
        assert_eq!(value["default_theme"], LUXURY_THEME);
        assert_eq!(value["themes"][LUXURY_THEME]["colors"]["warning"], "#FB8C00");
    }
}
