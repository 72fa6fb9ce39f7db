//! Greyscale theme for the failure picker

use ratatui::style::{Color, Modifier, Style};

pub struct Theme;

impl Theme {
    /// Near white - selected items, titles
    pub const GREY_50: Color = Color::Rgb(250, 250, 250);

    /// Bright grey - primary text
    pub const GREY_100: Color = Color::Rgb(220, 220, 220);

    /// Medium grey - hints
    pub const GREY_300: Color = Color::Rgb(140, 140, 140);

    /// Darker grey - borders
    pub const GREY_500: Color = Color::Rgb(70, 70, 70);

    /// Selection highlight background
    pub const GREY_600: Color = Color::Rgb(45, 45, 45);

    /// True black - deepest background
    pub const GREY_900: Color = Color::Rgb(18, 18, 18);

    pub fn bg() -> Style {
        Style::default().bg(Self::GREY_900)
    }

    pub fn text() -> Style {
        Style::default().fg(Self::GREY_100)
    }

    pub fn text_muted() -> Style {
        Style::default().fg(Self::GREY_300)
    }

    pub fn border() -> Style {
        Style::default().fg(Self::GREY_500)
    }

    pub fn title() -> Style {
        Style::default()
            .fg(Self::GREY_50)
            .add_modifier(Modifier::BOLD)
    }

    pub fn selected() -> Style {
        Style::default()
            .fg(Self::GREY_50)
            .bg(Self::GREY_600)
            .add_modifier(Modifier::BOLD)
    }
}
