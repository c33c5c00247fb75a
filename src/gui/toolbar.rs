/// Toolbar — top menu bar and file dialogs

use std::path::PathBuf;

/// Actions that can be triggered from the toolbar
#[derive(Debug, Clone, PartialEq)]
pub enum ToolbarAction {
    None,
    LoadDataset,
    ExportAreas,
    ExportLog,
    Exit,
    Integrate,
    ThemeToggle,
    ShowAbout,
}

/// Render the menu bar and return any triggered action
pub fn show_toolbar(
    ctx: &egui::Context,
    theme_label: &str,
    has_data: bool,
    editing: bool,
) -> ToolbarAction {
    let mut action = ToolbarAction::None;

    egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
        egui::menu::bar(ui, |ui| {
            ui.menu_button("📁 File", |ui| {
                if ui.button("📂 Load dataset…").clicked() {
                    action = ToolbarAction::LoadDataset;
                    ui.close_menu();
                }
                ui.separator();
                if ui
                    .add_enabled(editing, egui::Button::new("📊 Export areas…"))
                    .clicked()
                {
                    action = ToolbarAction::ExportAreas;
                    ui.close_menu();
                }
                if ui.button("📋 Export session log…").clicked() {
                    action = ToolbarAction::ExportLog;
                    ui.close_menu();
                }
                ui.separator();
                if ui.button("Exit").clicked() {
                    action = ToolbarAction::Exit;
                    ui.close_menu();
                }
            });

            ui.menu_button("∫ Analysis", |ui| {
                if ui
                    .add_enabled(has_data, egui::Button::new("∫ Integrate"))
                    .on_hover_text("Start over with one ROI spanning the current spectrum")
                    .clicked()
                {
                    action = ToolbarAction::Integrate;
                    ui.close_menu();
                }
            });

            ui.menu_button("❓ Help", |ui| {
                if ui.button("ℹ About").clicked() {
                    action = ToolbarAction::ShowAbout;
                    ui.close_menu();
                }
            });

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui
                    .add(egui::Button::new(egui::RichText::new(theme_label).size(12.0)).corner_radius(12.0))
                    .clicked()
                {
                    action = ToolbarAction::ThemeToggle;
                }
                ui.separator();
                ui.label(
                    egui::RichText::new("QENS ROI Integration")
                        .color(egui::Color32::from_rgb(0x70, 0x75, 0x80))
                        .size(12.0),
                );
            });
        });
    });

    action
}

/// File-open dialog for S(Q, E) tables
pub fn open_dataset_dialog() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .set_title("Load QENS Dataset")
        .add_filter("Tab-separated", &["tsv", "txt", "dat"])
        .add_filter("Comma-separated", &["csv"])
        .add_filter("All Files", &["*"])
        .pick_file()
}

/// Save dialog for the area table
pub fn save_areas_dialog(default_name: &str) -> Option<PathBuf> {
    rfd::FileDialog::new()
        .set_title("Export ROI Areas")
        .set_file_name(default_name)
        .add_filter("Tab-separated", &["csv", "tsv", "txt"])
        .save_file()
}

/// Save dialog for the session log
pub fn save_log_dialog() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .set_title("Export Session Log")
        .add_filter("Text File", &["txt"])
        .add_filter("JSON", &["json"])
        .save_file()
}
