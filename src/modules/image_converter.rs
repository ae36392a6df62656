use eframe::egui;
use std::path::PathBuf;

use super::batch::{BatchController, BatchEvent, RunHandle, Status};
use super::formats::{SOURCE_EXTENSIONS, TargetFormat};
use super::selection::{Selection, format_display};
use crate::settings::AppSettings;
use crate::style::{self, ColorPalette, PanelColors, ThemeMode};

const NO_DESTINATION: &str = "Select files to set destination...";
const ROW_HEIGHT: f32 = 36.0;
const ROW_MARGIN: f32 = 10.0;

/// Batch conversion screen. Holds the controller and mirrors its state;
/// every change goes through the controller's operations.
pub struct ConverterPanel {
    batch: BatchController,
    run: Option<RunHandle>,
    selection: Selection,
    batch_format: TargetFormat,
    progress: f32,
    message: String,
}

impl ConverterPanel {
    pub fn new(settings: &AppSettings) -> Self {
        let mut batch = BatchController::new();
        batch.set_preserve_metadata(settings.preserve_metadata);
        batch.set_max_compression(settings.max_compression);

        Self {
            batch,
            run: None,
            selection: Selection::default(),
            batch_format: settings.default_format,
            progress: 0.0,
            message: String::new(),
        }
    }

    fn is_converting(&self) -> bool {
        self.run.is_some() || self.batch.is_running()
    }

    fn poll_run(&mut self) {
        let Some(run) = &self.run else {
            return;
        };

        for event in run.try_events() {
            match event {
                BatchEvent::Started { total } => {
                    self.message = format!("Converting {total} files...");
                }
                BatchEvent::Status { index, status: Status::Processing } => {
                    if let Some(entry) = self.batch.entries().get(index) {
                        self.message = format!("Converting {}", entry.file_name());
                    }
                }
                BatchEvent::Status { .. } => {}
                BatchEvent::Progress { .. } => {
                    if let Some(fraction) = event.progress() {
                        self.progress = fraction;
                    }
                }
                BatchEvent::Finished { succeeded, failed } => {
                    self.message = format!("Completed: {succeeded} succeeded, {failed} failed");
                }
            }
        }

        if run.is_finished() {
            if let Some(run) = self.run.take() {
                // Collects anything sent between the last drain and exit.
                for event in run.wait() {
                    if let BatchEvent::Finished { succeeded, failed } = event {
                        self.message = format!("Completed: {succeeded} succeeded, {failed} failed");
                    }
                    if let Some(fraction) = event.progress() {
                        self.progress = fraction;
                    }
                }
            }
        }
    }

    fn add_files(&mut self, paths: Vec<PathBuf>) {
        match self.batch.add_files(paths, self.batch_format) {
            Ok(added) => tracing::debug!(added, "Files added from picker"),
            Err(e) => self.message = e.to_string(),
        }
    }

    fn pick_files(&mut self) {
        if let Some(paths) = rfd::FileDialog::new()
            .set_title("Select Images")
            .add_filter("Images", SOURCE_EXTENSIONS)
            .pick_files()
        {
            self.add_files(paths);
        }
    }

    fn clear_files(&mut self) {
        let preserve = self.batch.options().preserve_metadata;
        let max_compression = self.batch.options().max_compression;
        match self.batch.clear() {
            Ok(()) => {
                // Toggles are footer state; only the list and destination reset.
                self.batch.set_preserve_metadata(preserve);
                self.batch.set_max_compression(max_compression);
                self.selection.clear();
                self.progress = 0.0;
                self.message.clear();
            }
            Err(e) => self.message = e.to_string(),
        }
    }

    fn on_format_changed(&mut self, format: TargetFormat) {
        match self.batch.set_format(format, self.selection.indices()) {
            Ok(()) => {
                if self.selection.is_empty() {
                    self.batch_format = format;
                } else {
                    self.selection.clear();
                }
            }
            Err(e) => self.message = e.to_string(),
        }
    }

    fn start_conversion(&mut self) {
        match self.batch.run() {
            Ok(run) => {
                self.progress = 0.0;
                self.run = Some(run);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Conversion not started");
                self.message = e.to_string();
            }
        }
    }

    fn render_header(&self, ui: &mut egui::Ui, colors: &PanelColors) {
        ui.vertical_centered(|ui| {
            ui.add_space(12.0);
            ui.label(egui::RichText::new("PRISM").size(18.0).strong().color(colors.text));
            ui.add_space(8.0);
        });
        ui.separator();
    }

    fn render_toolbar(&mut self, ui: &mut egui::Ui, theme: ThemeMode, colors: &PanelColors) {
        let converting = self.is_converting();

        ui.horizontal(|ui| {
            if style::primary_button(ui, "+  Add Files", !converting, theme).clicked() {
                self.pick_files();
            }

            ui.label(
                egui::RichText::new(format!("{} files loaded", self.batch.len()))
                    .size(11.0)
                    .color(colors.weak),
            );

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.add_enabled(!converting, egui::Button::new("Clear All")).clicked() {
                    self.clear_files();
                }
            });
        });
    }

    fn render_file_list(&mut self, ui: &mut egui::Ui, colors: &PanelColors) {
        let entries = self.batch.entries();
        let converting = self.is_converting();

        colors.frame().show(ui, |ui| {
            ui.label(egui::RichText::new("FILENAME").size(10.0).strong().color(colors.weak));
            ui.add_space(4.0);

            if entries.is_empty() {
                ui.add_space(40.0);
                ui.vertical_centered(|ui| {
                    ui.label(
                        egui::RichText::new("Drop images here or use Add Files")
                            .size(13.0)
                            .color(colors.weak),
                    );
                });
                ui.add_space(40.0);
                return;
            }

            let mut clicked = None;
            let mut to_remove = None;

            egui::ScrollArea::vertical()
                .max_height(ui.available_height().max(120.0))
                .auto_shrink([false, true])
                .show(ui, |ui| {
                    for (idx, entry) in entries.iter().enumerate() {
                        // Registered before the row contents so the Remove button stays on top.
                        let row_rect = egui::Rect::from_min_size(
                            ui.cursor().min,
                            egui::vec2(ui.available_width(), ROW_HEIGHT + 2.0 * ROW_MARGIN),
                        );
                        let row = ui.interact(row_rect, ui.id().with(("file_row", idx)), egui::Sense::click());
                        if row.clicked() {
                            clicked = Some(idx);
                        }

                        let fill = if self.selection.is_selected(idx) {
                            colors.selected_bg
                        } else if row.hovered() {
                            colors.panel_bg
                        } else {
                            colors.row_bg
                        };

                        egui::Frame::new()
                            .fill(fill)
                            .stroke(egui::Stroke::new(1.0, colors.border))
                            .corner_radius(6.0)
                            .inner_margin(ROW_MARGIN)
                            .show(ui, |ui| {
                                ui.set_width(ui.available_width());
                                ui.set_min_height(ROW_HEIGHT);
                                ui.horizontal(|ui| {
                                    ui.vertical(|ui| {
                                        ui.label(
                                            egui::RichText::new(entry.file_name())
                                                .size(13.0)
                                                .strong()
                                                .color(colors.text),
                                        );
                                        ui.label(
                                            egui::RichText::new(entry.directory_label())
                                                .size(10.0)
                                                .color(colors.weak),
                                        );
                                    });

                                    ui.with_layout(
                                        egui::Layout::right_to_left(egui::Align::Center),
                                        |ui| {
                                            if ui
                                                .add_enabled(!converting, egui::Button::new("Remove"))
                                                .clicked()
                                            {
                                                to_remove = Some(idx);
                                            }
                                            ui.add_sized(
                                                [90.0, 16.0],
                                                egui::Label::new(
                                                    egui::RichText::new(entry.status.display_label())
                                                        .size(11.0)
                                                        .color(style::status_color(entry.status, colors)),
                                                ),
                                            );
                                            ui.add_space(8.0);
                                            style::format_badge(ui, entry.target_format.label(), true, colors);
                                            ui.label(egui::RichText::new("→").size(14.0).color(colors.weak));
                                            style::format_badge(ui, &entry.source_extension(), false, colors);
                                            ui.add_space(8.0);
                                            ui.label(
                                                egui::RichText::new(entry.size_label())
                                                    .size(11.0)
                                                    .color(colors.weak),
                                            );
                                        },
                                    );
                                });
                            });

                        ui.add_space(4.0);
                    }
                });

            if let Some(idx) = to_remove {
                match self.batch.remove(idx) {
                    Ok(_) => self.selection.clear(),
                    Err(e) => self.message = e.to_string(),
                }
            } else if let Some(idx) = clicked {
                let shift = ui.input(|i| i.modifiers.shift);
                self.selection.click(idx, shift, entries.len());
            }
        });
    }

    fn combo_text(&self) -> String {
        if self.selection.is_empty() {
            return self.batch_format.label().to_string();
        }
        let entries = self.batch.entries();
        let formats = self
            .selection
            .indices()
            .iter()
            .filter_map(|&i| entries.get(i).map(|e| e.target_format));
        format_display(formats)
            .label()
            .unwrap_or(self.batch_format.label())
            .to_string()
    }

    fn render_footer(&mut self, ui: &mut egui::Ui, theme: ThemeMode, colors: &PanelColors) {
        let converting = self.is_converting();

        colors.frame().show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.vertical(|ui| {
                    ui.label(egui::RichText::new("BATCH FORMAT").size(9.0).strong().color(colors.weak));
                    let mut chosen = None;
                    ui.add_enabled_ui(!converting, |ui| {
                        egui::ComboBox::from_id_salt("batch_format")
                            .selected_text(self.combo_text())
                            .width(150.0)
                            .show_ui(ui, |ui| {
                                for format in TargetFormat::all() {
                                    if ui.selectable_label(false, format.label()).clicked() {
                                        chosen = Some(format);
                                    }
                                }
                            });
                    });
                    if let Some(format) = chosen {
                        self.on_format_changed(format);
                    }
                });

                ui.add_space(16.0);

                ui.vertical(|ui| {
                    ui.label(egui::RichText::new("DESTINATION").size(9.0).strong().color(colors.weak));
                    ui.horizontal(|ui| {
                        let dir_text = self
                            .batch
                            .options()
                            .output_directory
                            .as_ref()
                            .map(|d| d.to_string_lossy().to_string())
                            .unwrap_or_else(|| NO_DESTINATION.to_string());
                        ui.label(egui::RichText::new(dir_text).size(11.0).color(colors.text));

                        if ui.button("...").clicked() {
                            if let Some(dir) = rfd::FileDialog::new().pick_folder() {
                                self.batch.set_output_directory(Some(dir));
                            }
                        }
                    });
                });

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.vertical(|ui| {
                        let mut preserve = self.batch.options().preserve_metadata;
                        if ui.checkbox(&mut preserve, "Preserve Metadata").changed() {
                            self.batch.set_preserve_metadata(preserve);
                        }
                        let mut max_compression = self.batch.options().max_compression;
                        if ui.checkbox(&mut max_compression, "Max Compression").changed() {
                            self.batch.set_max_compression(max_compression);
                        }
                    });
                });
            });

            ui.add_space(8.0);
            ui.separator();
            ui.add_space(8.0);

            ui.horizontal(|ui| {
                let can_convert = !self.batch.is_empty() && !converting;

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if style::primary_button(ui, "Convert All  →", can_convert, theme).clicked() {
                        self.start_conversion();
                    }

                    ui.add_space(16.0);

                    ui.vertical(|ui| {
                        ui.add(
                            egui::ProgressBar::new(self.progress)
                                .fill(ColorPalette::INDIGO_500)
                                .desired_height(6.0),
                        );
                        if !self.message.is_empty() {
                            ui.label(egui::RichText::new(&self.message).size(11.0).color(colors.weak));
                        }
                    });
                });
            });
        });
    }

    pub fn ui(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        self.poll_run();

        let dropped: Vec<PathBuf> = ctx.input(|i| {
            i.raw
                .dropped_files
                .iter()
                .filter_map(|f| f.path.clone())
                .collect()
        });
        if !dropped.is_empty() {
            self.add_files(dropped);
        }

        let theme = if ui.visuals().dark_mode { ThemeMode::Dark } else { ThemeMode::Light };
        let colors = PanelColors::for_theme(theme);

        self.render_header(ui, &colors);
        ui.add_space(8.0);
        self.render_toolbar(ui, theme, &colors);
        ui.add_space(8.0);

        egui::TopBottomPanel::bottom("converter_footer")
            .show_separator_line(false)
            .frame(egui::Frame::new().inner_margin(8.0))
            .show_inside(ui, |ui| {
                self.render_footer(ui, theme, &colors);
            });

        self.render_file_list(ui, &colors);

        if self.is_converting() {
            ctx.request_repaint();
        }
    }
}
