//! Page theme and the chamber palette
//!
//! The chamber never caches the theme: it asks its [`ThemeSource`] on every
//! draw and clear so a live switch shows up on the very next frame.

use std::cell::Cell;
use std::rc::Rc;

pub type Rgb = (u8, u8, u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    Dark,
    #[default]
    Light,
}

impl Theme {
    /// Interpret a theme attribute: exactly "dark" is dark, anything else
    /// (or nothing) is light
    pub fn from_attribute(value: Option<&str>) -> Self {
        match value {
            Some("dark") => Theme::Dark,
            _ => Theme::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }

    /// Solid color the surface is cleared to (#0d1117 / #ffffff)
    pub fn background(self) -> Rgb {
        match self {
            Theme::Dark => (13, 17, 23),
            Theme::Light => (255, 255, 255),
        }
    }

    /// Color of the translucent per-frame wash that fades old trails
    pub fn fade(self) -> Rgb {
        match self {
            Theme::Dark => (0, 0, 0),
            Theme::Light => (255, 255, 255),
        }
    }

    /// Trail color; heads and glows are derived from it
    pub fn base_tone(self) -> Rgb {
        match self {
            // Light blue-gray on dark
            Theme::Dark => (200, 200, 220),
            // Dark blue-gray on light
            Theme::Light => (70, 70, 90),
        }
    }

    pub fn head_tone(self) -> Rgb {
        brighten(self.base_tone(), 30, 30, 40)
    }

    pub fn glow_tone(self) -> Rgb {
        brighten(self.base_tone(), 0, 0, 60)
    }
}

impl std::str::FromStr for Theme {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Theme::from_attribute(Some(s)))
    }
}

/// Add per-channel offsets, saturating at 255
#[inline]
pub fn brighten(color: Rgb, dr: u8, dg: u8, db: u8) -> Rgb {
    (
        color.0.saturating_add(dr),
        color.1.saturating_add(dg),
        color.2.saturating_add(db),
    )
}

/// Where the chamber reads the active theme from
pub trait ThemeSource {
    fn theme(&self) -> Theme;
}

impl ThemeSource for Theme {
    fn theme(&self) -> Theme {
        *self
    }
}

impl ThemeSource for Cell<Theme> {
    fn theme(&self) -> Theme {
        self.get()
    }
}

impl<T: ThemeSource + ?Sized> ThemeSource for Rc<T> {
    fn theme(&self) -> Theme {
        (**self).theme()
    }
}
