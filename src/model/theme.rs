use serde::{Deserialize, Serialize};

/// The display theme preference. Only persisted here; rendering is somebody else's problem.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

serde_plain::derive_display_from_serialize!(Theme);
serde_plain::derive_fromstr_from_deserialize!(Theme);

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    /// Reads a persisted theme, falling back to the default for anything unrecognized.
    pub fn from_json(value: &serde_json::Value) -> Self {
        value
            .as_str()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }
}

#[test]
fn test_theme_toggle_and_parse() {
    assert_eq!(Theme::Light.toggled(), Theme::Dark);
    assert_eq!(Theme::Dark.toggled(), Theme::Light);
    assert_eq!(Theme::from_json(&serde_json::json!("dark")), Theme::Dark);
    assert_eq!(Theme::from_json(&serde_json::json!(7)), Theme::Light);
    assert_eq!(Theme::Dark.to_string(), "dark");
}
