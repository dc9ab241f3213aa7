//! 配色：深色 / 浅色两套调色板，F9 切换；settings.json 可按角色名覆盖单个颜色。

use crossterm::style::Color;

use crate::kernel::services::ports::settings::{ThemeModeSetting, ThemeSettings};
use crate::kernel::syntax::HighlightKind;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ThemeMode {
    #[default]
    Dark,
    Light,
}

impl ThemeMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Dark => "dark",
            Self::Light => "light",
        }
    }
}

impl From<ThemeModeSetting> for ThemeMode {
    fn from(value: ThemeModeSetting) -> Self {
        match value {
            ThemeModeSetting::Dark => Self::Dark,
            ThemeModeSetting::Light => Self::Light,
        }
    }
}

/// Semantic colour roles. Renderers ask for a role, never a literal colour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Background,
    Foreground,
    MutedFg,
    Accent,
    Selection,
    LineHighlight,
    Error,
    Warning,
    Success,
    Syntax(HighlightKind),
}

impl Role {
    /// Looks up a role by its settings key.
    pub fn parse(name: &str) -> Option<Self> {
        let role = match name.trim().to_ascii_lowercase().as_str() {
            "background" | "bg" => Self::Background,
            "foreground" | "fg" => Self::Foreground,
            "muted" => Self::MutedFg,
            "accent" => Self::Accent,
            "selection" => Self::Selection,
            "line_highlight" => Self::LineHighlight,
            "error" => Self::Error,
            "warning" => Self::Warning,
            "success" => Self::Success,
            other => {
                return HighlightKind::ALL
                    .into_iter()
                    .find(|k| k.name() == other)
                    .map(Self::Syntax)
            }
        };
        Some(role)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    pub background: Color,
    pub foreground: Color,
    pub muted_fg: Color,
    pub accent: Color,
    pub selection: Color,
    pub line_highlight: Color,
    pub error: Color,
    pub warning: Color,
    pub success: Color,
    pub comment: Color,
    pub string: Color,
    pub number: Color,
    pub type_name: Color,
    pub keyword: Color,
    pub function: Color,
    pub preprocessor: Color,
}

const fn rgb(hex: u32) -> Color {
    Color::Rgb {
        r: (hex >> 16) as u8,
        g: (hex >> 8) as u8,
        b: hex as u8,
    }
}

impl Palette {
    pub fn dark() -> Self {
        Self {
            background: rgb(0x1e1e1e),
            foreground: rgb(0xd4d4d4),
            muted_fg: rgb(0x9e9e9e),
            accent: rgb(0x007acc),
            selection: rgb(0x264f78),
            line_highlight: rgb(0x2a2d2e),
            error: rgb(0xf44747),
            warning: rgb(0xff8800),
            success: rgb(0x35af74),
            comment: rgb(0x6a9955),
            string: rgb(0xce9178),
            number: rgb(0xb5cea8),
            type_name: rgb(0x4ec9b0),
            keyword: rgb(0x569cd6),
            function: rgb(0xdcdcaa),
            preprocessor: rgb(0xc586c0),
        }
    }

    pub fn light() -> Self {
        Self {
            background: rgb(0xffffff),
            foreground: rgb(0x333333),
            muted_fg: rgb(0x616161),
            accent: rgb(0x007acc),
            selection: rgb(0xadd6ff),
            line_highlight: rgb(0xf8f8f8),
            error: rgb(0xe51400),
            warning: rgb(0xff8c00),
            success: rgb(0x008000),
            comment: rgb(0x008000),
            string: rgb(0xa31515),
            number: rgb(0x098658),
            type_name: rgb(0x267f99),
            keyword: rgb(0x0000ff),
            function: rgb(0x795e26),
            preprocessor: rgb(0xaf00db),
        }
    }

    pub fn color(&self, role: Role) -> Color {
        match role {
            Role::Background => self.background,
            Role::Foreground => self.foreground,
            Role::MutedFg => self.muted_fg,
            Role::Accent => self.accent,
            Role::Selection => self.selection,
            Role::LineHighlight => self.line_highlight,
            Role::Error => self.error,
            Role::Warning => self.warning,
            Role::Success => self.success,
            Role::Syntax(kind) => self.syntax(kind),
        }
    }

    pub fn syntax(&self, kind: HighlightKind) -> Color {
        match kind {
            HighlightKind::Comment => self.comment,
            HighlightKind::String => self.string,
            HighlightKind::Number => self.number,
            HighlightKind::Type => self.type_name,
            HighlightKind::Keyword => self.keyword,
            HighlightKind::Function => self.function,
            HighlightKind::Preprocessor => self.preprocessor,
        }
    }

    fn slot_mut(&mut self, role: Role) -> &mut Color {
        match role {
            Role::Background => &mut self.background,
            Role::Foreground => &mut self.foreground,
            Role::MutedFg => &mut self.muted_fg,
            Role::Accent => &mut self.accent,
            Role::Selection => &mut self.selection,
            Role::LineHighlight => &mut self.line_highlight,
            Role::Error => &mut self.error,
            Role::Warning => &mut self.warning,
            Role::Success => &mut self.success,
            Role::Syntax(HighlightKind::Comment) => &mut self.comment,
            Role::Syntax(HighlightKind::String) => &mut self.string,
            Role::Syntax(HighlightKind::Number) => &mut self.number,
            Role::Syntax(HighlightKind::Type) => &mut self.type_name,
            Role::Syntax(HighlightKind::Keyword) => &mut self.keyword,
            Role::Syntax(HighlightKind::Function) => &mut self.function,
            Role::Syntax(HighlightKind::Preprocessor) => &mut self.preprocessor,
        }
    }

    /// Applies `role -> colour` overrides; returns how many were accepted.
    pub fn apply_overrides<'a>(
        &mut self,
        overrides: impl IntoIterator<Item = (&'a String, &'a String)>,
    ) -> usize {
        let mut applied = 0;
        for (name, value) in overrides {
            let Some(role) = Role::parse(name) else {
                tracing::warn!(role = %name, "unknown theme role");
                continue;
            };
            let Some(color) = parse_color(value) else {
                tracing::warn!(role = %name, value = %value, "invalid theme colour");
                continue;
            };
            *self.slot_mut(role) = color;
            applied += 1;
        }
        applied
    }
}

/// Both palettes plus the active mode.
#[derive(Debug, Clone)]
pub struct Theme {
    mode: ThemeMode,
    dark: Palette,
    light: Palette,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            mode: ThemeMode::Dark,
            dark: Palette::dark(),
            light: Palette::light(),
        }
    }
}

impl Theme {
    pub fn from_settings(settings: &ThemeSettings) -> Self {
        let mut theme = Self {
            mode: settings.mode.into(),
            ..Self::default()
        };
        theme.dark.apply_overrides(&settings.dark);
        theme.light.apply_overrides(&settings.light);
        theme
    }

    pub fn mode(&self) -> ThemeMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ThemeMode) {
        self.mode = mode;
    }

    pub fn toggle(&mut self) -> ThemeMode {
        self.mode = self.mode.toggled();
        tracing::info!(mode = self.mode.name(), "theme switched");
        self.mode
    }

    pub fn palette(&self) -> &Palette {
        match self.mode {
            ThemeMode::Dark => &self.dark,
            ThemeMode::Light => &self.light,
        }
    }

    pub fn color(&self, role: Role) -> Color {
        self.palette().color(role)
    }
}

/// `#rrggbb` 或终端颜色名
pub fn parse_color(value: &str) -> Option<Color> {
    let v = value.trim();
    if v.is_empty() {
        return None;
    }

    if let Some(hex) = v.strip_prefix('#') {
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        return u32::from_str_radix(hex, 16).ok().map(rgb);
    }

    let c = match v.to_ascii_lowercase().as_str() {
        "reset" => Color::Reset,
        "black" => Color::AnsiValue(0),
        "red" => Color::AnsiValue(1),
        "green" => Color::AnsiValue(2),
        "yellow" => Color::AnsiValue(3),
        "blue" => Color::AnsiValue(4),
        "magenta" => Color::AnsiValue(5),
        "cyan" => Color::AnsiValue(6),
        "gray" | "grey" => Color::AnsiValue(7),
        "dark_gray" | "dark_grey" => Color::AnsiValue(8),
        "white" => Color::AnsiValue(15),
        _ => return None,
    };
    Some(c)
}

#[cfg(test)]
#[path = "../../tests/unit/kernel/theme.rs"]
mod tests;
