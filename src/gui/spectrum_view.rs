/// Spectrum viewer — S(Q, E) markers with error bars and draggable ROIs

use egui_plot::{Line, MarkerShape, Plot, PlotPoints, PlotUi, Points, Text, VLine};

use crate::data::spectrum::Spectrum;
use crate::pipeline::controller::{BoundInput, RegionEvent};
use crate::pipeline::regions::{Bound, Bounds, HandleSpec, RegionHandle, RegionSet};

use super::theme::ThemeColors;

/// Screen distance (points) within which a region edge can be grabbed
const GRAB_DISTANCE: f32 = 6.0;

/// On-plot representation of one ROI: a shaded band with two draggable edges
#[derive(Debug, Clone)]
pub struct PlotHandle {
    slot: usize,
    bounds: Bounds,
    extent: Bounds,
    color: egui::Color32,
    label: String,
}

impl PlotHandle {
    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn color(&self) -> egui::Color32 {
        self.color
    }

    /// Keep a dragged edge inside the spectrum's energy range
    pub fn clamp(&self, x: f64) -> f64 {
        let lo = self.extent.xmin.min(self.extent.xmax);
        let hi = self.extent.xmin.max(self.extent.xmax);
        x.clamp(lo, hi)
    }
}

impl RegionHandle for PlotHandle {
    fn create(spec: HandleSpec) -> Self {
        Self {
            slot: spec.slot,
            bounds: spec.bounds,
            extent: spec.extent,
            color: egui::Color32::from_rgb(spec.color[0], spec.color[1], spec.color[2]),
            label: spec.label,
        }
    }

    fn region(&self) -> Bounds {
        self.bounds
    }

    fn set_region(&mut self, bounds: Bounds) {
        self.bounds = bounds;
    }

    fn destroy(self) {
        log::debug!("{} removed from plot", self.label);
    }
}

/// What the viewer asks the app to do
#[derive(Debug, Clone, PartialEq)]
pub enum ViewAction {
    None,
    Region(RegionEvent),
    /// An edge drag ended
    DragFinished { slot: usize, bound: Bound },
}

#[derive(Debug, Clone)]
pub struct SpectrumViewState {
    pub show_error_bars: bool,
    pub auto_scale: bool,
    /// Incremented on auto-scale to give the plot a fresh ID (resets zoom)
    pub plot_generation: u32,
    /// Energy range shown after an auto-scale
    pub initial_x_range: (f64, f64),
    /// Region edge currently held by the pointer
    pub(crate) grabbed: Option<(usize, Bound)>,
}

impl Default for SpectrumViewState {
    fn default() -> Self {
        Self {
            show_error_bars: true,
            auto_scale: true,
            plot_generation: 0,
            initial_x_range: (-6.0, 6.0),
            grabbed: None,
        }
    }
}

/// Show one spectrum with the regions of its Q (if editing)
pub fn show_spectrum(
    ui: &mut egui::Ui,
    spectrum: &Spectrum,
    regions: Option<&RegionSet<PlotHandle>>,
    state: &mut SpectrumViewState,
    colors: &ThemeColors,
) -> ViewAction {
    if spectrum.samples.is_empty() {
        ui.centered_and_justified(|ui| {
            ui.heading(format!("Q = {} has no samples", spectrum.q));
        });
        return ViewAction::None;
    }

    ui.horizontal(|ui| {
        ui.checkbox(&mut state.show_error_bars, "Error bars");
        ui.separator();
        if ui.button("⊞ Auto Scale").clicked() {
            state.auto_scale = true;
        }
        ui.separator();
        ui.label(format!("{} | {} pts", spectrum.label, spectrum.samples.len()));
        if let Some(set) = regions {
            ui.separator();
            ui.colored_label(colors.accent, format!("∫ {} ROI(s), drag the edges to adjust", set.len()));
        }
    });

    if state.auto_scale {
        state.plot_generation = state.plot_generation.wrapping_add(1);
    }

    let editing = regions.is_some();
    let mut plot = Plot::new(format!("qens_spectrum_{}", state.plot_generation))
        .height(ui.available_height() - 4.0)
        .x_axis_label("Energy (meV)")
        .y_axis_label("S(Q, E)")
        .allow_drag(!editing)
        .allow_zoom(true)
        .allow_scroll(true)
        .allow_boxed_zoom(!editing)
        .legend(egui_plot::Legend::default().position(egui_plot::Corner::RightTop).background_alpha(0.6));

    if state.auto_scale {
        let (lo, hi) = state.initial_x_range;
        plot = plot.include_x(lo).include_x(hi).include_y(0.0);
    }
    state.auto_scale = false;

    let top = spectrum.max_intensity();
    let show_error_bars = state.show_error_bars;

    let plot_resp = plot.show(ui, |plot_ui: &mut PlotUi| {
        // Regions first so the data stays on top
        if let Some(set) = regions {
            for region in set.regions() {
                draw_region(plot_ui, spectrum, region.handle(), top, colors);
            }
        }

        if show_error_bars {
            for s in &spectrum.samples {
                let bar = Line::new(PlotPoints::from(vec![
                    [s.energy, s.intensity - s.error],
                    [s.energy, s.intensity + s.error],
                ]))
                .color(colors.error_bar)
                .width(0.8);
                plot_ui.line(bar);
            }
        }

        let pts: PlotPoints = spectrum
            .samples
            .iter()
            .map(|s| [s.energy, s.intensity])
            .collect();
        plot_ui.points(
            Points::new(pts)
                .name(&spectrum.label)
                .color(colors.spectrum_marker)
                .radius(2.5)
                .shape(MarkerShape::Circle)
                .filled(true),
        );
    });

    let Some(set) = regions else {
        return ViewAction::None;
    };

    let response = &plot_resp.response;
    let transform = &plot_resp.transform;

    // Nearest edge under the pointer, within grab distance
    let edge_near = |pos: egui::Pos2| -> Option<(usize, Bound)> {
        let mut best: Option<((usize, Bound), f32)> = None;
        for region in set.regions() {
            let h = region.handle();
            for bound in [Bound::Min, Bound::Max] {
                let sx = transform.position_from_point_x(h.region().get(bound));
                let d = (sx - pos.x).abs();
                if d <= GRAB_DISTANCE && best.map_or(true, |(_, bd)| d < bd) {
                    best = Some(((h.slot(), bound), d));
                }
            }
        }
        best.map(|(edge, _)| edge)
    };

    if let Some(pos) = response.hover_pos() {
        if state.grabbed.is_some() || edge_near(pos).is_some() {
            ui.ctx().set_cursor_icon(egui::CursorIcon::ResizeHorizontal);
        }
    }

    if response.drag_started() {
        state.grabbed = response.interact_pointer_pos().and_then(edge_near);
    }

    if response.drag_stopped() {
        if let Some((slot, bound)) = state.grabbed.take() {
            return ViewAction::DragFinished { slot, bound };
        }
    }

    if response.dragged() {
        if let (Some((slot, bound)), Some(pos)) = (state.grabbed, response.interact_pointer_pos()) {
            let Some(handle) = set.get(slot).map(|r| r.handle()) else {
                state.grabbed = None;
                return ViewAction::None;
            };
            let x = handle.clamp(transform.value_from_position(pos).x);
            if x != handle.region().get(bound) {
                return ViewAction::Region(RegionEvent::BoundEdited {
                    slot,
                    bound,
                    input: BoundInput::Dragged(x),
                });
            }
        }
    }

    ViewAction::None
}

/// Shaded band, dashed edges and label of one region
fn draw_region(plot_ui: &mut PlotUi, spectrum: &Spectrum, handle: &PlotHandle, top: f64, colors: &ThemeColors) {
    let b = handle.region();
    let lo = b.xmin.min(b.xmax);
    let hi = b.xmin.max(b.xmax);
    let edge = handle.color();
    let fill = egui::Color32::from_rgba_unmultiplied(edge.r(), edge.g(), edge.b(), colors.region_fill_alpha);

    let band: Vec<[f64; 2]> = spectrum
        .samples
        .iter()
        .filter(|s| s.energy >= lo && s.energy <= hi)
        .map(|s| [s.energy, s.intensity])
        .collect();
    if band.len() >= 2 {
        plot_ui.line(
            Line::new(PlotPoints::from(band))
                .color(fill)
                .fill(0.0)
                .width(0.0)
                .name(handle.label()),
        );
    }

    for x in [b.xmin, b.xmax] {
        plot_ui.vline(
            VLine::new(x)
                .color(edge)
                .width(1.5)
                .style(egui_plot::LineStyle::dashed_dense()),
        );
    }

    plot_ui.text(Text::new(
        [0.5 * (b.xmin + b.xmax), top * 1.08].into(),
        egui::RichText::new(format!(
            "{}\nx1={:.2}  x2={:.2}",
            handle.label(),
            b.xmin,
            b.xmax
        ))
        .size(11.0)
        .color(edge),
    ));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> PlotHandle {
        PlotHandle::create(HandleSpec {
            slot: 2,
            bounds: Bounds::new(-1.0, 1.0),
            extent: Bounds::new(-5.0, 5.0),
            color: [0, 200, 0],
            label: "ROI 3".into(),
        })
    }

    #[test]
    fn test_drag_is_clamped_to_extent() {
        let h = handle();
        assert_eq!(h.clamp(-9.0), -5.0);
        assert_eq!(h.clamp(7.5), 5.0);
        assert_eq!(h.clamp(0.25), 0.25);
    }

    #[test]
    fn test_handle_follows_set_region() {
        let mut h = handle();
        assert_eq!(h.slot(), 2);
        assert_eq!(h.label(), "ROI 3");
        assert_eq!(h.color(), egui::Color32::from_rgb(0, 200, 0));
        h.set_region(Bounds::new(-2.0, 0.5));
        assert_eq!(h.region(), Bounds::new(-2.0, 0.5));
    }
}
