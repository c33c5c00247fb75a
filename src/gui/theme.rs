/// Theme system — Light and Dark colour sets

use crate::pipeline::regions::{MAX_REGIONS, SLOT_COLORS};

/// Available themes
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum AppTheme {
    Light,
    Dark,
}

impl AppTheme {
    pub fn label(&self) -> &'static str {
        match self {
            AppTheme::Light => "☀ Light",
            AppTheme::Dark => "🌙 Dark",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            AppTheme::Light => AppTheme::Dark,
            AppTheme::Dark => AppTheme::Light,
        }
    }
}

/// All colors a theme needs to provide
#[derive(Debug, Clone)]
pub struct ThemeColors {
    // Panels & backgrounds
    pub panel_fill: egui::Color32,
    pub window_fill: egui::Color32,
    pub faint_bg: egui::Color32,

    // Widgets
    pub widget_bg: egui::Color32,
    pub widget_bg_stroke: egui::Color32,
    pub widget_inactive_bg: egui::Color32,
    pub widget_hovered_bg: egui::Color32,
    pub widget_hovered_stroke: egui::Color32,
    pub widget_active_bg: egui::Color32,
    pub widget_active_fg: egui::Color32,
    pub selection_bg: egui::Color32,
    pub selection_stroke: egui::Color32,

    // Text
    pub text_primary: egui::Color32,
    pub text_muted: egui::Color32,
    pub accent: egui::Color32,
    pub success: egui::Color32,
    pub error: egui::Color32,

    // Spectrum plot
    pub spectrum_marker: egui::Color32,
    pub error_bar: egui::Color32,
    /// Alpha of the shading under a region
    pub region_fill_alpha: u8,

    // Status bar
    pub status_bar_bg: egui::Color32,
    pub status_text: egui::Color32,

    pub shadow_color: egui::Color32,
    pub is_dark: bool,
}

impl ThemeColors {
    pub fn from_theme(theme: AppTheme) -> Self {
        match theme {
            AppTheme::Light => Self::light(),
            AppTheme::Dark => Self::dark(),
        }
    }

    fn light() -> Self {
        Self {
            panel_fill: egui::Color32::from_rgb(0xF7, 0xF7, 0xF8),
            window_fill: egui::Color32::from_rgb(0xFF, 0xFF, 0xFF),
            faint_bg: egui::Color32::from_rgb(0xF0, 0xF1, 0xF3),

            widget_bg: egui::Color32::from_rgb(0xEB, 0xEC, 0xEE),
            widget_bg_stroke: egui::Color32::from_rgb(0xD0, 0xD2, 0xD6),
            widget_inactive_bg: egui::Color32::from_rgb(0xE3, 0xE5, 0xE8),
            widget_hovered_bg: egui::Color32::from_rgb(0xD8, 0xDD, 0xE6),
            widget_hovered_stroke: egui::Color32::from_rgb(0x5B, 0x9B, 0xD5),
            widget_active_bg: egui::Color32::from_rgb(0x3B, 0x7D, 0xC0),
            widget_active_fg: egui::Color32::WHITE,
            selection_bg: egui::Color32::from_rgba_premultiplied(0x3B, 0x7D, 0xC0, 0x40),
            selection_stroke: egui::Color32::from_rgb(0x3B, 0x7D, 0xC0),

            text_primary: egui::Color32::from_rgb(0x2A, 0x2E, 0x36),
            text_muted: egui::Color32::from_rgb(0x88, 0x8C, 0x94),
            accent: egui::Color32::from_rgb(0x3B, 0x7D, 0xC0),
            success: egui::Color32::from_rgb(0x27, 0x8B, 0x4A),
            error: egui::Color32::from_rgb(0xD0, 0x30, 0x30),

            spectrum_marker: egui::Color32::from_rgb(0x1A, 0x1A, 0x1A),
            error_bar: egui::Color32::from_rgb(0x80, 0x80, 0x80),
            region_fill_alpha: 0x40,

            status_bar_bg: egui::Color32::from_rgb(0xF0, 0xF1, 0xF3),
            status_text: egui::Color32::from_rgb(0x44, 0x48, 0x52),

            shadow_color: egui::Color32::from_rgba_premultiplied(0, 0, 0, 25),
            is_dark: false,
        }
    }

    fn dark() -> Self {
        Self {
            panel_fill: egui::Color32::from_rgb(0x1B, 0x1D, 0x22),
            window_fill: egui::Color32::from_rgb(0x22, 0x25, 0x2B),
            faint_bg: egui::Color32::from_rgb(0x26, 0x29, 0x30),

            widget_bg: egui::Color32::from_rgb(0x2A, 0x2D, 0x35),
            widget_bg_stroke: egui::Color32::from_rgb(0x3C, 0x40, 0x4A),
            widget_inactive_bg: egui::Color32::from_rgb(0x30, 0x34, 0x3D),
            widget_hovered_bg: egui::Color32::from_rgb(0x38, 0x3D, 0x48),
            widget_hovered_stroke: egui::Color32::from_rgb(0x6C, 0xA8, 0xE0),
            widget_active_bg: egui::Color32::from_rgb(0x4A, 0x8C, 0xD0),
            widget_active_fg: egui::Color32::WHITE,
            selection_bg: egui::Color32::from_rgba_premultiplied(0x4A, 0x8C, 0xD0, 0x50),
            selection_stroke: egui::Color32::from_rgb(0x6C, 0xA8, 0xE0),

            text_primary: egui::Color32::from_rgb(0xE0, 0xE2, 0xE8),
            text_muted: egui::Color32::from_rgb(0x80, 0x84, 0x90),
            accent: egui::Color32::from_rgb(0x6C, 0xA8, 0xE0),
            success: egui::Color32::from_rgb(0x4C, 0xC0, 0x70),
            error: egui::Color32::from_rgb(0xF0, 0x50, 0x50),

            spectrum_marker: egui::Color32::from_rgb(0xE8, 0xE8, 0xE8),
            error_bar: egui::Color32::from_rgb(0x90, 0x90, 0x98),
            region_fill_alpha: 0x50,

            status_bar_bg: egui::Color32::from_rgb(0x16, 0x18, 0x1C),
            status_text: egui::Color32::from_rgb(0xA8, 0xAC, 0xB8),

            shadow_color: egui::Color32::from_rgba_premultiplied(0, 0, 0, 60),
            is_dark: true,
        }
    }

    /// Edge and label colour of a region slot
    pub fn slot_color(&self, slot: usize) -> egui::Color32 {
        let [r, g, b] = SLOT_COLORS[slot % MAX_REGIONS];
        egui::Color32::from_rgb(r, g, b)
    }
}

/// Apply a theme to the egui context
pub fn apply_theme(ctx: &egui::Context, theme: AppTheme) {
    let c = ThemeColors::from_theme(theme);

    let mut visuals = if c.is_dark {
        egui::Visuals::dark()
    } else {
        egui::Visuals::light()
    };

    visuals.panel_fill = c.panel_fill;
    visuals.window_fill = c.window_fill;
    visuals.faint_bg_color = c.faint_bg;

    visuals.widgets.noninteractive.bg_fill = c.widget_bg;
    visuals.widgets.noninteractive.bg_stroke = egui::Stroke::new(0.5, c.widget_bg_stroke);
    visuals.widgets.noninteractive.corner_radius = egui::CornerRadius::same(3);
    visuals.widgets.noninteractive.fg_stroke = egui::Stroke::new(1.0, c.text_primary);

    visuals.widgets.inactive.bg_fill = c.widget_inactive_bg;
    visuals.widgets.inactive.corner_radius = egui::CornerRadius::same(4);

    visuals.widgets.hovered.bg_fill = c.widget_hovered_bg;
    visuals.widgets.hovered.bg_stroke = egui::Stroke::new(1.0, c.widget_hovered_stroke);

    visuals.widgets.active.bg_fill = c.widget_active_bg;
    visuals.widgets.active.fg_stroke = egui::Stroke::new(1.5, c.widget_active_fg);

    visuals.selection.bg_fill = c.selection_bg;
    visuals.selection.stroke = egui::Stroke::new(1.5, c.selection_stroke);

    visuals.window_shadow = egui::epaint::Shadow {
        offset: [0, 2],
        blur: 8,
        spread: 0,
        color: c.shadow_color,
    };

    ctx.set_visuals(visuals);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_colours_follow_palette() {
        let c = ThemeColors::from_theme(AppTheme::Light);
        assert_eq!(c.slot_color(0), egui::Color32::from_rgb(0, 0, 255));
        assert_eq!(c.slot_color(4), egui::Color32::from_rgb(255, 0, 255));
        assert_eq!(c.slot_color(5), c.slot_color(0));
    }

    #[test]
    fn test_theme_toggle_cycles() {
        assert_eq!(AppTheme::Light.next(), AppTheme::Dark);
        assert_eq!(AppTheme::Light.next().next(), AppTheme::Light);
    }
}
