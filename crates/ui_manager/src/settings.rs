//! # UI Settings
//!
//! The startup configuration record: which layout class the default policy
//! instantiates, which dialog classes the game uses, and how the loading
//! screen behaves. Loaded once from TOML when the application boots; a
//! missing file is replaced with a freshly written default so a new install
//! has something to edit.

use crate::policy::MultiplayerInteractionMode;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;
use ui_layout::SoftClassRef;

/// Errors produced while loading or writing the settings record.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Settings for the game UI layer, loaded once at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UiSettings {
    #[serde(default)]
    pub general: GeneralSettings,
    #[serde(default)]
    pub dialog: DialogSettings,
    #[serde(default)]
    pub loading_screen: LoadingScreenSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralSettings {
    /// The root layout widget class the default policy creates per player.
    #[serde(default)]
    pub default_layout_class: SoftClassRef,
    /// How the UI behaves towards other players in multiplayer.
    #[serde(default)]
    pub multiplayer_interaction_mode: MultiplayerInteractionMode,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DialogSettings {
    #[serde(default)]
    pub confirmation_dialog_class: SoftClassRef,
    #[serde(default)]
    pub error_dialog_class: SoftClassRef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadingScreenSettings {
    /// Class of widget to be used for the loading screen.
    #[serde(default)]
    pub widget_class: SoftClassRef,
    /// Display priority; larger draws in front.
    #[serde(default = "default_z_order")]
    pub z_order: i32,
    /// Additional seconds to hold the loading screen after the actual load
    /// completes, hiding late texture streaming.
    #[serde(default = "default_hold_secs")]
    pub hold_additional_secs: f32,
}

fn default_z_order() -> i32 {
    100
}

fn default_hold_secs() -> f32 {
    2.0
}

impl Default for LoadingScreenSettings {
    fn default() -> Self {
        Self {
            widget_class: SoftClassRef::null(),
            z_order: default_z_order(),
            hold_additional_secs: default_hold_secs(),
        }
    }
}

impl UiSettings {
    pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> Result<String, SettingsError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Loads settings from a TOML file; a missing file is created with the
    /// defaults and those defaults are returned.
    pub fn load_from_file(path: &Path) -> Result<Self, SettingsError> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml_str(&content)
        } else {
            let settings = Self::default();
            std::fs::write(path, settings.to_toml_string()?)?;
            info!("Created default UI settings file: {}", path.display());
            Ok(settings)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let settings = UiSettings::default();
        assert!(settings.general.default_layout_class.is_null());
        assert_eq!(
            settings.general.multiplayer_interaction_mode,
            MultiplayerInteractionMode::PrimaryOnly
        );
        assert_eq!(settings.loading_screen.z_order, 100);
        assert_eq!(settings.loading_screen.hold_additional_secs, 2.0);
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let settings = UiSettings::from_toml_str(
            r#"
[general]
default_layout_class = "/Game/UI/W_OverlayLayout"
multiplayer_interaction_mode = "SingleToggle"
"#,
        )
        .expect("partial settings parse");

        assert_eq!(
            settings.general.default_layout_class.path(),
            "/Game/UI/W_OverlayLayout"
        );
        assert_eq!(
            settings.general.multiplayer_interaction_mode,
            MultiplayerInteractionMode::SingleToggle
        );
        assert_eq!(settings.loading_screen.z_order, 100);
        assert!(settings.dialog.error_dialog_class.is_null());
    }

    #[test]
    fn toml_round_trip_preserves_fields() {
        let mut settings = UiSettings::default();
        settings.general.default_layout_class = SoftClassRef::new("/Game/UI/W_OverlayLayout");
        settings.loading_screen.z_order = 250;

        let rendered = settings.to_toml_string().expect("settings serialize");
        let back = UiSettings::from_toml_str(&rendered).expect("settings parse back");
        assert_eq!(
            back.general.default_layout_class.path(),
            "/Game/UI/W_OverlayLayout"
        );
        assert_eq!(back.loading_screen.z_order, 250);
    }

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("ui_settings.toml");

        let settings = UiSettings::load_from_file(&path).expect("load creates default file");
        assert!(settings.general.default_layout_class.is_null());
        assert!(path.exists());

        // A second load reads the file that was just written.
        let again = UiSettings::load_from_file(&path).expect("load reads existing file");
        assert_eq!(again.loading_screen.z_order, settings.loading_screen.z_order);
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            UiSettings::from_toml_str("general = \"not a table\""),
            Err(SettingsError::Parse(_))
        ));
    }
}
