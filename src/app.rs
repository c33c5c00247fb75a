/// Main application state and eframe::App implementation
///
/// Ties together the dataset loader, the ROI controller, the GUI panels and
/// the session journal.

use std::path::{Path, PathBuf};

use eframe::egui;

use crate::config::AppSettings;
use crate::data::table;
use crate::gui::roi_panel::{self, RoiPanelAction};
use crate::gui::spectrum_view::{self, PlotHandle, SpectrumViewState, ViewAction};
use crate::gui::theme::{self, AppTheme, ThemeColors};
use crate::gui::toolbar::{self, ToolbarAction};
use crate::log::session::SessionLog;
use crate::pipeline::controller::{BoundInput, Mode, Outcome, RegionController, RegionEvent};
use crate::pipeline::export::{self, ExportTable};
use crate::pipeline::regions::Bound;

pub struct QensApp {
    controller: RegionController<PlotHandle>,
    settings: AppSettings,

    /// Session journal
    session_log: SessionLog,

    view_state: SpectrumViewState,

    status_message: String,
    show_log_window: bool,
    show_about: bool,

    current_theme: AppTheme,
    theme_colors: ThemeColors,

    /// Dropped files buffer
    dropped_files: Vec<PathBuf>,
}

impl QensApp {
    pub fn new(cc: &eframe::CreationContext<'_>, settings: AppSettings) -> Self {
        let default_theme = AppTheme::Light;
        theme::apply_theme(&cc.egui_ctx, default_theme);

        let mut style = (*cc.egui_ctx.style()).clone();
        style.spacing.item_spacing = egui::vec2(8.0, 5.0);
        style.spacing.button_padding = egui::vec2(8.0, 4.0);
        cc.egui_ctx.set_style(style);

        let view_state = SpectrumViewState {
            initial_x_range: settings.initial_x_range,
            ..Default::default()
        };

        Self {
            controller: RegionController::new(settings.bound_precision, settings.area_precision),
            settings,
            session_log: SessionLog::new(),
            view_state,
            status_message: "Ready. Load a QENS dataset to begin".to_string(),
            show_log_window: false,
            show_about: false,
            current_theme: default_theme,
            theme_colors: ThemeColors::from_theme(default_theme),
            dropped_files: Vec::new(),
        }
    }

    /// Load a dataset; on failure the current state is kept
    fn load_path(&mut self, path: &Path) {
        match table::load_table(path) {
            Ok(table) => {
                let n = table.len();
                self.controller.load(table);
                self.session_log.set_source(&path.display().to_string());
                self.session_log.add_entry(
                    "Load dataset",
                    &format!("{} ({} Q values)", path.display(), n),
                    None,
                );
                self.view_state.auto_scale = true;
                self.status_message = format!("Loaded {} Q values from {}", n, path.display());
            }
            Err(e) => {
                log::warn!("Failed to load {}: {}", path.display(), e);
                self.status_message = format!("❌ Error loading {}: {}", path.display(), e);
            }
        }
    }

    fn begin_integration(&mut self) {
        match self.controller.begin_integration() {
            Outcome::EditingStarted => {
                let q = self.controller.current_q().map(str::to_string);
                self.session_log
                    .add_entry("Integrate", "1 ROI over the full energy span", q.as_deref());
                self.status_message = "Integration mode: drag the ROI edges or type the bounds".to_string();
            }
            Outcome::Rejected(e) => self.status_message = format!("⚠ {}", e),
            _ => {}
        }
    }

    /// Feed one event to the controller and report what happened
    fn handle_event(&mut self, event: RegionEvent) {
        let typed = matches!(
            event,
            RegionEvent::BoundEdited {
                input: BoundInput::Typed(_),
                ..
            }
        );
        let outcome = self.controller.dispatch(event);
        let q = self.controller.current_q().map(str::to_string);

        match outcome {
            Outcome::Navigated { q: new_q, seeded } => {
                self.view_state.auto_scale = true;
                if self.controller.mode() == Mode::Editing {
                    let desc = if seeded {
                        format!("Q = {} (new ROIs)", new_q)
                    } else {
                        format!("Q = {}", new_q)
                    };
                    self.session_log.add_entry("Change Q", &desc, Some(&new_q));
                }
                self.status_message = format!("Q = {} Å⁻¹", new_q);
            }
            Outcome::Resized(n) => {
                self.session_log
                    .add_entry("ROI count", &format!("{} ROI(s)", n), q.as_deref());
                self.status_message = format!("{} ROI(s) at Q = {}", n, q.unwrap_or_default());
            }
            Outcome::BoundUpdated {
                slot,
                bound,
                value,
                area,
            } => {
                let desc = format!("ROI {} {} = {:.*}", slot + 1, bound, self.settings.bound_precision, value);
                if typed {
                    self.session_log.add_entry("Edit bound", &desc, q.as_deref());
                }
                self.status_message = format!("{}, area = {:.*}", desc, self.settings.area_precision, area);
            }
            Outcome::Rejected(e) => {
                self.status_message = format!("⚠ {}", e);
            }
            Outcome::AreasRecomputed(_)
            | Outcome::CountSynced(_)
            | Outcome::EditingStarted
            | Outcome::Unchanged => {}
        }
    }

    fn drag_finished(&mut self, slot: usize, bound: Bound) {
        let Some(q) = self.controller.current_q().map(str::to_string) else {
            return;
        };
        let value = self
            .controller
            .store()
            .and_then(|store| store.copy_limits(&q, slot).ok())
            .map(|b| b.get(bound));
        if let Some(value) = value {
            self.session_log.add_entry(
                "Drag bound",
                &format!("ROI {} {} = {:.*}", slot + 1, bound, self.settings.bound_precision, value),
                Some(&q),
            );
        }
    }

    fn calculate_areas(&mut self) {
        if let Outcome::AreasRecomputed(n) = self.controller.recompute_current() {
            self.status_message = format!("Recomputed {} area(s)", n);
        }
    }

    fn export_areas(&mut self) {
        let Some(store) = self.controller.store() else {
            self.status_message = "No dataset loaded to export".to_string();
            return;
        };
        let Some(path) = toolbar::save_areas_dialog(&self.settings.export_file_name) else {
            return;
        };
        let table = ExportTable::assemble(store);
        match export::save(&path, &table, self.settings.export_precision) {
            Ok(()) => {
                self.session_log.add_entry(
                    "Export areas",
                    &format!("{} rows to {}", table.rows().len(), path.display()),
                    None,
                );
                self.status_message = format!("✅ Areas exported: {}", path.display());
            }
            Err(e) => {
                log::warn!("Export to {} failed: {}", path.display(), e);
                self.status_message = format!("❌ Export failed: {}", e);
            }
        }
    }

    fn export_log(&mut self) {
        let Some(path) = toolbar::save_log_dialog() else {
            return;
        };
        match self.session_log.save(&path) {
            Ok(()) => self.status_message = format!("Log saved: {}", path.display()),
            Err(e) => self.status_message = format!("❌ Error saving log: {}", e),
        }
    }

    fn handle_toolbar_action(&mut self, action: ToolbarAction, ctx: &egui::Context) {
        match action {
            ToolbarAction::LoadDataset => {
                if let Some(path) = toolbar::open_dataset_dialog() {
                    self.load_path(&path);
                }
            }
            ToolbarAction::ExportAreas => self.export_areas(),
            ToolbarAction::ExportLog => self.export_log(),
            ToolbarAction::Exit => ctx.send_viewport_cmd(egui::ViewportCommand::Close),
            ToolbarAction::Integrate => self.begin_integration(),
            ToolbarAction::ThemeToggle => {
                self.current_theme = self.current_theme.next();
                self.theme_colors = ThemeColors::from_theme(self.current_theme);
            }
            ToolbarAction::ShowAbout => self.show_about = true,
            ToolbarAction::None => {}
        }
    }
}

impl eframe::App for QensApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        theme::apply_theme(ctx, self.current_theme);

        // Handle drag-and-drop
        ctx.input(|i| {
            for file in &i.raw.dropped_files {
                if let Some(path) = &file.path {
                    self.dropped_files.push(path.clone());
                }
            }
        });
        if let Some(path) = self.dropped_files.pop() {
            self.dropped_files.clear();
            self.load_path(&path);
        }

        // ── Toolbar ──
        let editing = self.controller.mode() == Mode::Editing;
        let has_data = self.controller.table().is_some();
        let toolbar_action = toolbar::show_toolbar(ctx, self.current_theme.label(), has_data, editing);
        if toolbar_action != ToolbarAction::None {
            self.handle_toolbar_action(toolbar_action, ctx);
        }

        // ── Status Bar ──
        let tc = self.theme_colors.clone();
        egui::TopBottomPanel::bottom("status_bar")
            .frame(egui::Frame::new().fill(tc.status_bar_bg).inner_margin(egui::Margin::symmetric(12, 4)))
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    let (mode_text, mode_color) = match self.controller.mode() {
                        Mode::Browsing => ("BROWSE", tc.text_muted),
                        Mode::Editing => ("∫ INTEGRATE", tc.success),
                    };
                    ui.add(
                        egui::Button::new(egui::RichText::new(mode_text).size(11.5).strong().color(mode_color))
                            .fill(mode_color.linear_multiply(0.2))
                            .stroke(egui::Stroke::new(1.0, mode_color))
                            .corner_radius(10.0),
                    );
                    ui.separator();
                    ui.label(egui::RichText::new(&self.status_message).size(11.5).color(tc.status_text));
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.small_button("📋 Log").clicked() {
                            self.show_log_window = !self.show_log_window;
                        }
                        ui.label(
                            egui::RichText::new(format!("{} ops", self.session_log.len()))
                                .size(11.0)
                                .color(tc.text_muted),
                        );
                    });
                });
            });

        // ── Right Panel: ROIs (editing only) ──
        let mut panel_action = RoiPanelAction::None;
        if editing {
            egui::SidePanel::right("roi_panel")
                .resizable(true)
                .default_width(250.0)
                .min_width(210.0)
                .show(ctx, |ui| {
                    egui::ScrollArea::vertical().auto_shrink([false, false]).show(ui, |ui| {
                        panel_action = roi_panel::show_roi_panel(ui, &mut self.controller, &tc);
                    });
                });
        }

        // ── Central Panel: Q navigation + spectrum ──
        let mut nav_event = None;
        let mut view_action = ViewAction::None;
        egui::CentralPanel::default().show(ctx, |ui| {
            let Some(table) = self.controller.table() else {
                ui.centered_and_justified(|ui| {
                    ui.heading("Load a QENS dataset (File → Load dataset…) or drop a file here");
                });
                return;
            };
            nav_event = roi_panel::show_q_navigator(ui, table, self.controller.current_index());
            ui.separator();
            if let Some(spectrum) = self.controller.current_spectrum() {
                view_action = spectrum_view::show_spectrum(
                    ui,
                    spectrum,
                    self.controller.visible_regions(),
                    &mut self.view_state,
                    &tc,
                );
            }
        });

        if let Some(event) = nav_event {
            self.handle_event(event);
        }
        match view_action {
            ViewAction::Region(event) => self.handle_event(event),
            ViewAction::DragFinished { slot, bound } => self.drag_finished(slot, bound),
            ViewAction::None => {}
        }
        match panel_action {
            RoiPanelAction::Region(event) => self.handle_event(event),
            RoiPanelAction::CalculateAreas => self.calculate_areas(),
            RoiPanelAction::ExportResults => self.export_areas(),
            RoiPanelAction::None => {}
        }

        // ── Session log window ──
        if self.show_log_window {
            let mut save_requested = false;
            egui::Window::new("📋 Session Log")
                .open(&mut self.show_log_window)
                .default_size([600.0, 400.0])
                .resizable(true)
                .show(ctx, |ui| {
                    if ui.button("💾 Save…").clicked() {
                        save_requested = true;
                    }
                    ui.separator();
                    egui::ScrollArea::vertical().show(ui, |ui| {
                        for entry in &self.session_log.entries {
                            ui.label(egui::RichText::new(entry.to_text()).monospace().size(11.0));
                        }
                    });
                });
            if save_requested {
                self.export_log();
            }
        }

        if self.show_about {
            egui::Window::new("About")
                .open(&mut self.show_about)
                .collapsible(false)
                .resizable(false)
                .show(ctx, |ui| {
                    ui.heading("QENS ROI Integration");
                    ui.label(format!("Version {}", env!("CARGO_PKG_VERSION")));
                    ui.add_space(10.0);
                    ui.label("Browse S(Q, E) spectra, set up to five ROIs per Q");
                    ui.label("and export their trapezoidal areas.");
                    ui.add_space(10.0);
                    ui.label("Built with Rust + egui");
                });
        }
    }
}
