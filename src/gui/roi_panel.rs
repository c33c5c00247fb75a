/// ROI panel — Q navigation, region count, per-slot bound/area fields and actions

use crate::data::spectrum::SpectrumTable;
use crate::pipeline::controller::{BoundInput, RegionController, RegionEvent, Step};
use crate::pipeline::regions::{Bound, MAX_REGIONS};

use super::spectrum_view::PlotHandle;
use super::theme::ThemeColors;

/// Actions the ROI panel can emit back to the app
#[derive(Debug, Clone, PartialEq)]
pub enum RoiPanelAction {
    None,
    Region(RegionEvent),
    CalculateAreas,
    ExportResults,
}

/// Q combo box in dataset order with Q−/Q+ step buttons
pub fn show_q_navigator(ui: &mut egui::Ui, table: &SpectrumTable, current: usize) -> Option<RegionEvent> {
    let mut event = None;
    let current_q = table.get(current).map(|s| s.q.as_str()).unwrap_or("—");

    ui.horizontal(|ui| {
        if ui.button("◀ Q−").on_hover_text("Previous Q").clicked() {
            event = Some(RegionEvent::StepRequested(Step::Previous));
        }
        egui::ComboBox::from_id_salt("q_selector")
            .selected_text(format!("Q = {} Å⁻¹", current_q))
            .show_ui(ui, |ui| {
                for (idx, spectrum) in table.spectra().iter().enumerate() {
                    if ui
                        .selectable_label(idx == current, spectrum.q.as_str())
                        .clicked()
                        && idx != current
                    {
                        event = Some(RegionEvent::SelectorChanged(idx));
                    }
                }
            });
        if ui.button("Q+ ▶").on_hover_text("Next Q").clicked() {
            event = Some(RegionEvent::StepRequested(Step::Next));
        }
        ui.label(
            egui::RichText::new(format!("{} / {}", current + 1, table.len()))
                .size(11.0)
                .weak(),
        );
    });

    event
}

pub fn show_roi_panel(
    ui: &mut egui::Ui,
    controller: &mut RegionController<PlotHandle>,
    colors: &ThemeColors,
) -> RoiPanelAction {
    let mut action = RoiPanelAction::None;

    ui.heading("Regions of interest");
    if let Some(q) = controller.current_q() {
        ui.label(egui::RichText::new(format!("Q = {} Å⁻¹", q)).color(colors.text_muted));
    }
    ui.add_space(6.0);

    ui.horizontal(|ui| {
        ui.label("Number of ROIs:");
        let mut count = controller.count();
        let resp = ui.add(egui::DragValue::new(&mut count).speed(0.05).range(1..=MAX_REGIONS));
        if resp.changed() && count != controller.count() {
            action = RoiPanelAction::Region(RegionEvent::CountRequested(count));
        }
    });
    ui.separator();

    for slot in 0..MAX_REGIONS {
        let Some(view) = controller.slot_mut(slot) else {
            continue;
        };
        if !view.visible {
            continue;
        }
        let rejected = view.rejected;
        let color = colors.slot_color(slot);

        egui::Frame::new()
            .fill(colors.faint_bg)
            .stroke(egui::Stroke::new(1.0, color))
            .corner_radius(6.0)
            .inner_margin(egui::Margin::same(6))
            .show(ui, |ui| {
                ui.label(egui::RichText::new(format!("ROI {}", slot + 1)).strong().color(color));
                egui::Grid::new(format!("roi_grid_{}", slot))
                    .num_columns(2)
                    .spacing([8.0, 4.0])
                    .show(ui, |ui| {
                        for (bound, caption) in [(Bound::Min, "E_min (meV)"), (Bound::Max, "E_max (meV)")] {
                            ui.label(caption);
                            let text = view.text_mut(bound);
                            let mut edit = egui::TextEdit::singleline(text).desired_width(90.0);
                            if rejected == Some(bound) {
                                edit = edit.text_color(colors.error);
                            }
                            // Every keystroke is an edit; malformed text is refused by the controller
                            if ui.add(edit).changed() {
                                action = RoiPanelAction::Region(RegionEvent::BoundEdited {
                                    slot,
                                    bound,
                                    input: BoundInput::Typed(text.clone()),
                                });
                            }
                            ui.end_row();
                        }
                        ui.label("Area");
                        ui.label(egui::RichText::new(view.area_text.as_str()).monospace());
                        ui.end_row();
                    });
            });
        ui.add_space(4.0);
    }

    ui.separator();
    ui.horizontal(|ui| {
        if ui.button("∫ Calculate areas").clicked() {
            action = RoiPanelAction::CalculateAreas;
        }
        if ui.button("💾 Export results").clicked() {
            action = RoiPanelAction::ExportResults;
        }
    });

    action
}
