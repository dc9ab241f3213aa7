use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub editor: EditorSettings,
    #[serde(default)]
    pub theme: ThemeSettings,
    #[serde(default)]
    pub compiler: CompilerSettings,
    #[serde(default)]
    pub formatter: FormatterSettings,
    #[serde(default)]
    pub keybindings: Vec<KeybindingRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeybindingRule {
    pub key: String,
    /// Empty string removes the binding.
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    pub tab_size: u8,
    pub max_undo: usize,
    pub recent_files_limit: usize,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            tab_size: 4,
            max_undo: crate::models::edit_history::DEFAULT_MAX_UNDO,
            recent_files_limit: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeModeSetting {
    #[default]
    Dark,
    Light,
}

/// Colour overrides are `#rrggbb` strings keyed by role name (`keyword`, `background`, ...).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeSettings {
    pub mode: ThemeModeSetting,
    #[serde(skip_serializing_if = "std::collections::BTreeMap::is_empty")]
    pub dark: std::collections::BTreeMap<String, String>,
    #[serde(skip_serializing_if = "std::collections::BTreeMap::is_empty")]
    pub light: std::collections::BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerSettings {
    /// Explicit compiler executable; autodetected (gcc, clang, tcc) when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub extra_flags: Vec<String>,
    pub compile_timeout_secs: u64,
    pub output_capacity: usize,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            path: None,
            extra_flags: Vec::new(),
            compile_timeout_secs: 10,
            output_capacity: 5000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatterSettings {
    /// clang-format `-style=` / astyle `--style=` name.
    pub style: String,
    pub timeout_secs: u64,
    /// Re-indent with the builtin formatter when no external tool succeeds.
    pub fallback: bool,
}

impl Default for FormatterSettings {
    fn default() -> Self {
        Self {
            style: "Google".to_string(),
            timeout_secs: 5,
            fallback: true,
        }
    }
}

#[cfg(test)]
#[path = "../../../../tests/unit/kernel/services/ports/settings.rs"]
mod tests;
