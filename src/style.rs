use eframe::egui;

use crate::modules::batch::Status;
use crate::settings::ThemePreference;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThemeMode {
    Light,
    Dark,
}

impl ThemeMode {
    pub fn resolve(preference: ThemePreference, system: egui::Theme) -> Self {
        match preference {
            ThemePreference::Light => ThemeMode::Light,
            ThemePreference::Dark => ThemeMode::Dark,
            ThemePreference::System => match system {
                egui::Theme::Dark => ThemeMode::Dark,
                egui::Theme::Light => ThemeMode::Light,
            },
        }
    }
}

pub struct ColorPalette;

#[allow(dead_code)]
impl ColorPalette {
    pub const BLUE_400: egui::Color32 = egui::Color32::from_rgb(96, 165, 250);
    pub const BLUE_600: egui::Color32 = egui::Color32::from_rgb(37, 99, 235);

    pub const INDIGO_400: egui::Color32 = egui::Color32::from_rgb(129, 140, 248);
    pub const INDIGO_500: egui::Color32 = egui::Color32::from_rgb(99, 102, 241);
    pub const INDIGO_900: egui::Color32 = egui::Color32::from_rgb(49, 46, 129);

    pub const SLATE_100: egui::Color32 = egui::Color32::from_rgb(241, 245, 249);
    pub const SLATE_200: egui::Color32 = egui::Color32::from_rgb(226, 232, 240);
    pub const SLATE_300: egui::Color32 = egui::Color32::from_rgb(203, 213, 225);

    pub const GRAY_50: egui::Color32 = egui::Color32::from_rgb(249, 250, 251);
    pub const GRAY_100: egui::Color32 = egui::Color32::from_rgb(243, 244, 246);
    pub const GRAY_200: egui::Color32 = egui::Color32::from_rgb(229, 231, 235);
    pub const GRAY_300: egui::Color32 = egui::Color32::from_rgb(209, 213, 219);
    pub const GRAY_400: egui::Color32 = egui::Color32::from_rgb(156, 163, 175);
    pub const GRAY_500: egui::Color32 = egui::Color32::from_rgb(107, 114, 128);
    pub const GRAY_700: egui::Color32 = egui::Color32::from_rgb(55, 65, 81);
    pub const GRAY_800: egui::Color32 = egui::Color32::from_rgb(31, 41, 55);
    pub const GRAY_900: egui::Color32 = egui::Color32::from_rgb(17, 24, 39);

    pub const ZINC_100: egui::Color32 = egui::Color32::from_rgb(244, 244, 245);
    pub const ZINC_200: egui::Color32 = egui::Color32::from_rgb(228, 228, 231);
    pub const ZINC_300: egui::Color32 = egui::Color32::from_rgb(212, 212, 216);
    pub const ZINC_400: egui::Color32 = egui::Color32::from_rgb(161, 161, 170);
    pub const ZINC_500: egui::Color32 = egui::Color32::from_rgb(113, 113, 122);
    pub const ZINC_600: egui::Color32 = egui::Color32::from_rgb(82, 82, 91);
    pub const ZINC_700: egui::Color32 = egui::Color32::from_rgb(63, 63, 70);
    pub const ZINC_800: egui::Color32 = egui::Color32::from_rgb(39, 39, 42);
    pub const ZINC_900: egui::Color32 = egui::Color32::from_rgb(24, 24, 27);

    pub const GREEN_500: egui::Color32 = egui::Color32::from_rgb(34, 197, 94);
    pub const RED_500: egui::Color32 = egui::Color32::from_rgb(239, 68, 68);
}

/// Colours shared by the converter panels, picked per theme.
#[derive(Debug, Clone, Copy)]
pub struct PanelColors {
    pub panel_bg: egui::Color32,
    pub row_bg: egui::Color32,
    pub selected_bg: egui::Color32,
    pub border: egui::Color32,
    pub text: egui::Color32,
    pub weak: egui::Color32,
}

impl PanelColors {
    pub fn for_theme(theme: ThemeMode) -> Self {
        match theme {
            ThemeMode::Dark => Self {
                panel_bg: ColorPalette::ZINC_800,
                row_bg: ColorPalette::ZINC_900,
                selected_bg: ColorPalette::ZINC_700,
                border: ColorPalette::ZINC_700,
                text: ColorPalette::ZINC_200,
                weak: ColorPalette::ZINC_500,
            },
            ThemeMode::Light => Self {
                panel_bg: ColorPalette::GRAY_50,
                row_bg: egui::Color32::WHITE,
                selected_bg: ColorPalette::GRAY_200,
                border: ColorPalette::GRAY_300,
                text: ColorPalette::GRAY_800,
                weak: ColorPalette::GRAY_500,
            },
        }
    }

    pub fn frame(&self) -> egui::Frame {
        egui::Frame::new()
            .fill(self.panel_bg)
            .stroke(egui::Stroke::new(1.0, self.border))
            .corner_radius(8.0)
            .inner_margin(16.0)
    }
}

pub fn status_color(status: Status, colors: &PanelColors) -> egui::Color32 {
    match status {
        Status::Pending => colors.weak,
        Status::Processing => ColorPalette::INDIGO_400,
        Status::Done => ColorPalette::GREEN_500,
        Status::Error => ColorPalette::RED_500,
    }
}

pub fn apply_theme(ctx: &egui::Context, theme: ThemeMode) {
    let mut style = (*ctx.style()).clone();

    style.visuals.widgets.noninteractive.corner_radius = egui::CornerRadius::same(4);
    style.visuals.widgets.inactive.corner_radius = egui::CornerRadius::same(4);
    style.visuals.widgets.hovered.corner_radius = egui::CornerRadius::same(4);
    style.visuals.widgets.active.corner_radius = egui::CornerRadius::same(4);

    style.spacing.item_spacing = egui::vec2(8.0, 8.0);
    style.spacing.button_padding = egui::vec2(12.0, 6.0);
    style.spacing.window_margin = egui::Margin::same(10);

    match theme {
        ThemeMode::Dark => apply_dark_theme(&mut style),
        ThemeMode::Light => apply_light_theme(&mut style),
    }

    ctx.set_style(style);
}

fn apply_dark_theme(style: &mut egui::Style) {
    style.visuals.dark_mode = true;

    style.visuals.panel_fill = ColorPalette::ZINC_900;
    style.visuals.window_fill = ColorPalette::ZINC_900;
    style.visuals.faint_bg_color = ColorPalette::ZINC_800;
    style.visuals.extreme_bg_color = egui::Color32::from_rgb(12, 12, 15);

    style.visuals.widgets.noninteractive.bg_fill = ColorPalette::ZINC_800;
    style.visuals.widgets.noninteractive.bg_stroke = egui::Stroke::new(1.0, ColorPalette::ZINC_700);

    style.visuals.widgets.inactive.bg_fill = egui::Color32::from_rgb(30, 30, 35);
    style.visuals.widgets.inactive.weak_bg_fill = ColorPalette::ZINC_800;
    style.visuals.widgets.inactive.bg_stroke = egui::Stroke::new(1.0, ColorPalette::ZINC_600);

    style.visuals.widgets.hovered.bg_fill = egui::Color32::from_rgb(40, 40, 48);
    style.visuals.widgets.hovered.weak_bg_fill = egui::Color32::from_rgb(35, 35, 42);
    style.visuals.widgets.hovered.bg_stroke = egui::Stroke::new(1.0, ColorPalette::ZINC_500);

    style.visuals.widgets.active.bg_fill = egui::Color32::from_rgb(50, 50, 60);
    style.visuals.widgets.active.bg_stroke = egui::Stroke::new(1.0, ColorPalette::ZINC_400);

    style.visuals.widgets.noninteractive.fg_stroke = egui::Stroke::new(1.0, ColorPalette::SLATE_300);
    style.visuals.widgets.inactive.fg_stroke = egui::Stroke::new(1.0, ColorPalette::SLATE_200);
    style.visuals.widgets.hovered.fg_stroke = egui::Stroke::new(1.0, ColorPalette::SLATE_100);
    style.visuals.widgets.active.fg_stroke = egui::Stroke::new(1.0, egui::Color32::WHITE);

    style.visuals.selection.bg_fill = egui::Color32::from_rgba_premultiplied(60, 120, 240, 100);
    style.visuals.hyperlink_color = ColorPalette::BLUE_400;
}

fn apply_light_theme(style: &mut egui::Style) {
    style.visuals.dark_mode = false;

    style.visuals.panel_fill = ColorPalette::GRAY_50;
    style.visuals.window_fill = ColorPalette::GRAY_50;
    style.visuals.faint_bg_color = ColorPalette::GRAY_100;
    style.visuals.extreme_bg_color = egui::Color32::WHITE;

    style.visuals.widgets.noninteractive.bg_fill = egui::Color32::WHITE;
    style.visuals.widgets.noninteractive.bg_stroke = egui::Stroke::new(1.0, ColorPalette::GRAY_300);

    style.visuals.widgets.inactive.bg_fill = ColorPalette::GRAY_50;
    style.visuals.widgets.inactive.weak_bg_fill = ColorPalette::GRAY_100;
    style.visuals.widgets.inactive.bg_stroke = egui::Stroke::new(1.0, ColorPalette::GRAY_300);

    style.visuals.widgets.hovered.bg_fill = ColorPalette::GRAY_100;
    style.visuals.widgets.hovered.weak_bg_fill = ColorPalette::GRAY_200;
    style.visuals.widgets.hovered.bg_stroke = egui::Stroke::new(1.0, ColorPalette::GRAY_400);

    style.visuals.widgets.active.bg_fill = ColorPalette::GRAY_200;
    style.visuals.widgets.active.bg_stroke = egui::Stroke::new(1.0, ColorPalette::GRAY_500);

    style.visuals.widgets.noninteractive.fg_stroke = egui::Stroke::new(1.0, ColorPalette::GRAY_700);
    style.visuals.widgets.inactive.fg_stroke = egui::Stroke::new(1.0, ColorPalette::GRAY_800);
    style.visuals.widgets.hovered.fg_stroke = egui::Stroke::new(1.0, ColorPalette::GRAY_900);
    style.visuals.widgets.active.fg_stroke = egui::Stroke::new(1.0, egui::Color32::BLACK);

    style.visuals.selection.bg_fill = egui::Color32::from_rgba_premultiplied(60, 120, 240, 80);
    style.visuals.selection.stroke = egui::Stroke::new(1.0, ColorPalette::BLUE_600);
    style.visuals.hyperlink_color = ColorPalette::BLUE_600;
}

/// Small rounded tag for a format name; `target` uses the indigo accent.
pub fn format_badge(ui: &mut egui::Ui, text: &str, target: bool, colors: &PanelColors) {
    let (fill, text_color) = if target {
        (ColorPalette::INDIGO_900, ColorPalette::INDIGO_400)
    } else {
        (colors.panel_bg, colors.weak)
    };
    egui::Frame::new()
        .fill(fill)
        .corner_radius(4.0)
        .inner_margin(egui::Margin::symmetric(6, 2))
        .show(ui, |ui| {
            ui.label(egui::RichText::new(text).size(10.0).strong().color(text_color));
        });
}

/// Light filled button used for the main actions ("Add Files", "Convert All").
pub fn primary_button(ui: &mut egui::Ui, text: &str, enabled: bool, theme: ThemeMode) -> egui::Response {
    let (bg_color, hover_color, text_color) = match (enabled, theme) {
        (true, _) => (egui::Color32::WHITE, ColorPalette::ZINC_300, egui::Color32::BLACK),
        (false, ThemeMode::Dark) => (ColorPalette::ZINC_700, ColorPalette::ZINC_700, ColorPalette::ZINC_500),
        (false, ThemeMode::Light) => (ColorPalette::GRAY_300, ColorPalette::GRAY_300, ColorPalette::GRAY_500),
    };

    ui.scope(|ui| {
        let style = ui.style_mut();
        style.visuals.widgets.inactive.weak_bg_fill = bg_color;
        style.visuals.widgets.inactive.bg_stroke = egui::Stroke::NONE;
        style.visuals.widgets.hovered.weak_bg_fill = hover_color;
        style.visuals.widgets.hovered.bg_stroke = egui::Stroke::NONE;
        style.visuals.widgets.active.weak_bg_fill = hover_color;

        let button = egui::Button::new(
            egui::RichText::new(text).size(13.0).strong().color(text_color)
        )
        .min_size(egui::vec2(140.0, 36.0))
        .corner_radius(6.0);

        ui.add_enabled(enabled, button)
    }).inner
}
