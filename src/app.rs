use eframe::egui;

use super::modules::image_converter::ConverterPanel;
use super::settings::{AppSettings, ThemePreference};
use super::style::{self, ThemeMode};

pub struct PrismApp {
    panel: ConverterPanel,
    theme_mode: ThemeMode,
    theme_preference: ThemePreference,
}

impl PrismApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let settings = AppSettings::load();
        tracing::info!(path = %AppSettings::get_config_path().display(), ?settings, "Loaded settings");

        let theme_mode = ThemeMode::resolve(settings.theme_preference, cc.egui_ctx.theme());
        style::apply_theme(&cc.egui_ctx, theme_mode);

        Self {
            panel: ConverterPanel::new(&settings),
            theme_mode,
            theme_preference: settings.theme_preference,
        }
    }
}

impl eframe::App for PrismApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if matches!(self.theme_preference, ThemePreference::System) {
            let system_theme = ThemeMode::resolve(ThemePreference::System, ctx.theme());
            if self.theme_mode != system_theme {
                self.theme_mode = system_theme;
                style::apply_theme(ctx, self.theme_mode);
            }
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            self.panel.ui(ui, ctx);
        });
    }
}
