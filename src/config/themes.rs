use ratatui::style::Color;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ThemeName {
    #[default]
    Dark,
    Light,
    HighContrast,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub border_focus: Color,
    pub active_fg: Color,
    pub active_bg: Color,
    pub muted: Color,
    pub match_fg: Color,
    pub error: Color,
}

impl ThemeName {
    pub fn resolve(self) -> ThemeName {
        match self {
            ThemeName::Unknown => ThemeName::Dark,
            known => known,
        }
    }

    pub fn palette(self) -> Palette {
        match self.resolve() {
            ThemeName::Light => Palette {
                border_focus: Color::Blue,
                active_fg: Color::White,
                active_bg: Color::Blue,
                muted: Color::DarkGray,
                match_fg: Color::Magenta,
                error: Color::Red,
            },
            ThemeName::HighContrast => Palette {
                border_focus: Color::Yellow,
                active_fg: Color::Black,
                active_bg: Color::Yellow,
                muted: Color::White,
                match_fg: Color::LightCyan,
                error: Color::LightRed,
            },
            _ => Palette {
                border_focus: Color::Cyan,
                active_fg: Color::Black,
                active_bg: Color::Blue,
                muted: Color::Gray,
                match_fg: Color::Yellow,
                error: Color::Red,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_theme_names_fall_back_to_dark() -> anyhow::Result<()> {
        #[derive(Deserialize)]
        struct Wrapper {
            theme: ThemeName,
        }
        let parsed: Wrapper = toml::from_str("theme = \"solarized\"")?;
        assert_eq!(parsed.theme, ThemeName::Unknown);
        assert_eq!(parsed.theme.resolve(), ThemeName::Dark);
        assert_eq!(parsed.theme.palette(), ThemeName::Dark.palette());
        Ok(())
    }
}
