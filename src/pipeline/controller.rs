/// ROI controller — drives the region store from user events
///
/// Every input (selector pick, Q−/Q+ step, region count change, drag or
/// typed bound) arrives as a `RegionEvent` and goes through `dispatch`.
/// Changes the controller makes to the count control on its own are
/// dispatched as `CountSyncedByController`, so they never resize anything,
/// and navigation carries its origin, so a step is never mistaken for a
/// direct selection.

use crate::data::spectrum::{Spectrum, SpectrumTable};

use super::regions::{Bound, RegionError, RegionHandle, RegionSet, RegionStore, MAX_REGIONS};

/// Whether region editing is active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Browsing,
    Editing,
}

/// Direction of a Q step, in ascending numeric Q
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Previous,
    Next,
}

/// Where a new bound value comes from
#[derive(Debug, Clone, PartialEq)]
pub enum BoundInput {
    /// Handle edge dragged on the plot
    Dragged(f64),
    /// Text typed in a numeric field
    Typed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RegionEvent {
    /// Q picked in the selector (index in dataset order)
    SelectorChanged(usize),
    StepRequested(Step),
    /// Region count set by the user
    CountRequested(usize),
    /// Region count shown to the user, updated by the controller itself
    CountSyncedByController(usize),
    BoundEdited {
        slot: usize,
        bound: Bound,
        input: BoundInput,
    },
}

/// Result of handling one event
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Nothing to do (boundary step, re-selecting the current Q, …)
    Unchanged,
    Navigated { q: String, seeded: bool },
    Resized(usize),
    CountSynced(usize),
    BoundUpdated { slot: usize, bound: Bound, value: f64, area: f64 },
    AreasRecomputed(usize),
    EditingStarted,
    /// The edit was refused and no state changed
    Rejected(RegionError),
}

/// Numeric fields of one slot as shown to the user
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotView {
    pub visible: bool,
    pub xmin_text: String,
    pub xmax_text: String,
    pub area_text: String,
    /// Bound whose last typed value was refused
    pub rejected: Option<Bound>,
}

impl SlotView {
    pub fn text_mut(&mut self, bound: Bound) -> &mut String {
        match bound {
            Bound::Min => &mut self.xmin_text,
            Bound::Max => &mut self.xmax_text,
        }
    }
}

enum NavOrigin {
    Selector,
    Step { from: String },
}

pub struct RegionController<H> {
    store: Option<RegionStore<H>>,
    mode: Mode,
    /// Index of the current Q in dataset order
    current: usize,
    /// Value shown by the region count control
    count: usize,
    slots: [SlotView; MAX_REGIONS],
    bound_precision: usize,
    area_precision: usize,
}

impl<H: RegionHandle> Default for RegionController<H> {
    fn default() -> Self {
        Self::new(2, 4)
    }
}

impl<H: RegionHandle> RegionController<H> {
    pub fn new(bound_precision: usize, area_precision: usize) -> Self {
        Self {
            store: None,
            mode: Mode::Browsing,
            current: 0,
            count: 1,
            slots: Default::default(),
            bound_precision,
            area_precision,
        }
    }

    /// Take a freshly loaded dataset. Any previous regions are dropped.
    pub fn load(&mut self, table: SpectrumTable) {
        if let Some(store) = self.store.as_mut() {
            store.clear_all();
        }
        log::info!("Dataset loaded: {} Q values from {}", table.len(), table.source);
        self.store = Some(RegionStore::new(table));
        self.mode = Mode::Browsing;
        self.current = 0;
        self.count = 1;
        self.refresh_views();
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn store(&self) -> Option<&RegionStore<H>> {
        self.store.as_ref()
    }

    pub fn table(&self) -> Option<&SpectrumTable> {
        self.store.as_ref().map(|s| s.table())
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_spectrum(&self) -> Option<&Spectrum> {
        self.table()?.get(self.current)
    }

    pub fn current_q(&self) -> Option<&str> {
        self.current_spectrum().map(|s| s.q.as_str())
    }

    /// Value to show in the region count control
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn slots(&self) -> &[SlotView; MAX_REGIONS] {
        &self.slots
    }

    pub fn slot_mut(&mut self, slot: usize) -> Option<&mut SlotView> {
        self.slots.get_mut(slot)
    }

    /// Regions on display: those of the current Q while editing
    pub fn visible_regions(&self) -> Option<&RegionSet<H>> {
        if self.mode != Mode::Editing {
            return None;
        }
        let q = self.current_q()?;
        self.store.as_ref()?.region_set(q).ok()
    }

    /// Enter editing from scratch: every Q loses its regions, the current Q
    /// gets one full-span region.
    pub fn begin_integration(&mut self) -> Outcome {
        let Some(q) = self.current_q().map(str::to_string) else {
            return Outcome::Rejected(RegionError::NoDataset);
        };
        let Some(store) = self.store.as_mut() else {
            return Outcome::Rejected(RegionError::NoDataset);
        };
        store.clear_all();
        if let Err(e) = store.resize(&q, 1).and_then(|_| store.recompute_areas(&q)) {
            return Outcome::Rejected(e);
        }
        self.mode = Mode::Editing;
        self.dispatch(RegionEvent::CountSyncedByController(1));
        self.refresh_views();
        log::info!("Integration started at Q = {}", q);
        Outcome::EditingStarted
    }

    /// Recompute the areas of the current Q
    pub fn recompute_current(&mut self) -> Outcome {
        if self.mode != Mode::Editing {
            return Outcome::Unchanged;
        }
        let Some(q) = self.current_q().map(str::to_string) else {
            return Outcome::Rejected(RegionError::NoDataset);
        };
        let Some(store) = self.store.as_mut() else {
            return Outcome::Rejected(RegionError::NoDataset);
        };
        if let Err(e) = store.recompute_areas(&q) {
            return Outcome::Rejected(e);
        }
        let n = store.region_set(&q).map(|s| s.len()).unwrap_or(0);
        self.refresh_views();
        Outcome::AreasRecomputed(n)
    }

    /// The single transition function
    pub fn dispatch(&mut self, event: RegionEvent) -> Outcome {
        log::debug!("{:?} event in {:?} mode", event, self.mode);
        match event {
            RegionEvent::SelectorChanged(index) => self.navigate(index, NavOrigin::Selector),
            RegionEvent::StepRequested(step) => {
                let Some(target) = self.neighbour(step) else {
                    return Outcome::Unchanged;
                };
                let Some(from) = self.current_q().map(str::to_string) else {
                    return Outcome::Unchanged;
                };
                self.navigate(target, NavOrigin::Step { from })
            }
            RegionEvent::CountRequested(count) => self.change_count(count),
            RegionEvent::CountSyncedByController(count) => {
                self.count = count;
                Outcome::CountSynced(count)
            }
            RegionEvent::BoundEdited { slot, bound, input } => self.edit_bound(slot, bound, input),
        }
    }

    /// Dataset index of the next/previous Q in ascending numeric order
    fn neighbour(&self, step: Step) -> Option<usize> {
        let order = self.table()?.ascending_order();
        let pos = order.iter().position(|&i| i == self.current)?;
        let target = match step {
            Step::Next => pos + 1,
            Step::Previous => pos.checked_sub(1)?,
        };
        order.get(target).copied()
    }

    fn navigate(&mut self, index: usize, origin: NavOrigin) -> Outcome {
        let Some(store) = self.store.as_mut() else {
            return Outcome::Rejected(RegionError::NoDataset);
        };
        let Some(q) = store.table().get(index).map(|s| s.q.as_str().to_string()) else {
            return Outcome::Rejected(RegionError::UnknownQ(format!("#{}", index)));
        };
        if index == self.current {
            return Outcome::Unchanged;
        }
        self.current = index;

        if self.mode == Mode::Browsing {
            return Outcome::Navigated { q, seeded: false };
        }

        let seeded = match &origin {
            NavOrigin::Selector => store.ensure_seeded(&q, None),
            NavOrigin::Step { from } => store.ensure_seeded(&q, Some(from)),
        };
        let seeded = match seeded.and_then(|s| store.recompute_areas(&q).map(|_| s)) {
            Ok(s) => s,
            Err(e) => return Outcome::Rejected(e),
        };
        let n = store.region_set(&q).map(|s| s.len()).unwrap_or(1);
        self.dispatch(RegionEvent::CountSyncedByController(n));
        self.refresh_views();
        Outcome::Navigated { q, seeded }
    }

    fn change_count(&mut self, count: usize) -> Outcome {
        if self.mode != Mode::Editing {
            return Outcome::Unchanged;
        }
        let Some(q) = self.current_q().map(str::to_string) else {
            return Outcome::Rejected(RegionError::NoDataset);
        };
        let Some(store) = self.store.as_mut() else {
            return Outcome::Rejected(RegionError::NoDataset);
        };
        if let Err(e) = store.resize(&q, count).and_then(|_| store.recompute_areas(&q)) {
            log::warn!("Region count change refused: {}", e);
            return Outcome::Rejected(e);
        }
        self.count = count;
        self.refresh_views();
        Outcome::Resized(count)
    }

    fn edit_bound(&mut self, slot: usize, bound: Bound, input: BoundInput) -> Outcome {
        if self.mode != Mode::Editing {
            return Outcome::Unchanged;
        }
        let Some(q) = self.current_q().map(str::to_string) else {
            return Outcome::Rejected(RegionError::NoDataset);
        };
        let (value, typed) = match &input {
            BoundInput::Dragged(v) => (*v, false),
            BoundInput::Typed(text) => match parse_bound(text) {
                Ok(v) => (v, true),
                Err(e) => {
                    log::warn!("Rejected {} of ROI {}: {}", bound, slot + 1, e);
                    if let Some(view) = self.slots.get_mut(slot) {
                        view.rejected = Some(bound);
                    }
                    return Outcome::Rejected(e);
                }
            },
        };
        let Some(store) = self.store.as_mut() else {
            return Outcome::Rejected(RegionError::NoDataset);
        };
        let applied = store
            .set_bound(&q, slot, bound, value)
            .and_then(|_| store.sync_handle(&q, slot))
            .and_then(|_| store.recompute_areas(&q));
        if let Err(e) = applied {
            return Outcome::Rejected(e);
        }
        let region = store
            .region_set(&q)
            .ok()
            .and_then(|set| set.get(slot))
            .map(|r| (r.bounds(), r.area().unwrap_or(0.0)));
        let Some((bounds, area)) = region else {
            return Outcome::Rejected(RegionError::InactiveSlot(slot));
        };

        let view = &mut self.slots[slot];
        view.rejected = None;
        view.area_text = format!("{:.*}", self.area_precision, area);
        if !typed {
            view.xmin_text = format!("{:.*}", self.bound_precision, bounds.xmin);
            view.xmax_text = format!("{:.*}", self.bound_precision, bounds.xmax);
        }
        Outcome::BoundUpdated {
            slot,
            bound,
            value,
            area,
        }
    }

    /// Rewrite every slot binding from the current Q's regions
    fn refresh_views(&mut self) {
        let regions: Vec<(f64, f64, Option<f64>)> = self
            .visible_regions()
            .map(|set| {
                set.regions()
                    .iter()
                    .map(|r| (r.bounds().xmin, r.bounds().xmax, r.area()))
                    .collect()
            })
            .unwrap_or_default();

        for (slot, view) in self.slots.iter_mut().enumerate() {
            *view = match regions.get(slot) {
                Some(&(xmin, xmax, area)) => SlotView {
                    visible: true,
                    xmin_text: format!("{:.*}", self.bound_precision, xmin),
                    xmax_text: format!("{:.*}", self.bound_precision, xmax),
                    area_text: area
                        .map(|a| format!("{:.*}", self.area_precision, a))
                        .unwrap_or_default(),
                    rejected: None,
                },
                None => SlotView::default(),
            };
        }
    }
}

/// Parse typed bound text; non-numeric and non-finite input is refused
pub fn parse_bound(text: &str) -> Result<f64, RegionError> {
    match text.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(RegionError::InvalidNumber(text.to_string())),
    }
}
