/// Per-Q region bookkeeping
///
/// Every Q of the loaded dataset owns a `RegionSet`: up to five regions, each
/// a single record of bounds, cached area and the graphical handle that
/// represents it. Slot `i` of a set is always `regions[i]`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::spectrum::{Spectrum, SpectrumTable};

use super::integration;

/// Number of region slots per Q
pub const MAX_REGIONS: usize = 5;

/// Label colour of each slot: blue, red, green, yellow, magenta
pub const SLOT_COLORS: [[u8; 3]; MAX_REGIONS] = [
    [0, 0, 255],
    [255, 0, 0],
    [0, 200, 0],
    [255, 200, 0],
    [255, 0, 255],
];

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RegionError {
    #[error("unknown Q value: {0}")]
    UnknownQ(String),
    #[error("ROI {} is not active", .0 + 1)]
    InactiveSlot(usize),
    #[error("number of ROIs must be between 1 and {max}, got {0}", max = MAX_REGIONS)]
    InvalidCount(usize),
    #[error("'{0}' is not a number")]
    InvalidNumber(String),
    #[error("no dataset loaded")]
    NoDataset,
}

/// Which edge of a region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bound {
    Min,
    Max,
}

impl std::fmt::Display for Bound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Bound::Min => write!(f, "E_min"),
            Bound::Max => write!(f, "E_max"),
        }
    }
}

/// Energy window of a region. `xmin <= xmax` is not enforced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub xmin: f64,
    pub xmax: f64,
}

impl Bounds {
    pub fn new(xmin: f64, xmax: f64) -> Self {
        Self { xmin, xmax }
    }

    pub fn get(&self, bound: Bound) -> f64 {
        match bound {
            Bound::Min => self.xmin,
            Bound::Max => self.xmax,
        }
    }

    pub fn set(&mut self, bound: Bound, value: f64) {
        match bound {
            Bound::Min => self.xmin = value,
            Bound::Max => self.xmax = value,
        }
    }

    /// Full energy range of a spectrum; (0, 0) if it has no samples
    pub fn full_span(spectrum: &Spectrum) -> Self {
        let (lo, hi) = spectrum.energy_span().unwrap_or((0.0, 0.0));
        Self::new(lo, hi)
    }
}

/// What a graphical handle needs to be built
#[derive(Debug, Clone, PartialEq)]
pub struct HandleSpec {
    pub slot: usize,
    pub bounds: Bounds,
    /// Range the handle edges may be dragged in
    pub extent: Bounds,
    pub color: [u8; 3],
    pub label: String,
}

impl HandleSpec {
    fn for_slot(slot: usize, bounds: Bounds, extent: Bounds) -> Self {
        Self {
            slot,
            bounds,
            extent,
            color: SLOT_COLORS[slot % MAX_REGIONS],
            label: format!("ROI {}", slot + 1),
        }
    }
}

/// The draggable interval that shows a region on screen.
///
/// Bound-changed notifications travel the other way, as
/// `RegionEvent::BoundEdited` dispatched to the controller.
pub trait RegionHandle {
    fn create(spec: HandleSpec) -> Self
    where
        Self: Sized;

    fn region(&self) -> Bounds;

    fn set_region(&mut self, bounds: Bounds);

    /// Called when the region is removed from its set
    fn destroy(self)
    where
        Self: Sized,
    {
    }
}

/// One ROI
#[derive(Debug)]
pub struct Region<H> {
    bounds: Bounds,
    area: Option<f64>,
    handle: H,
}

impl<H> Region<H> {
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Cached area; `None` until computed and after any bound change
    pub fn area(&self) -> Option<f64> {
        self.area
    }

    pub fn handle(&self) -> &H {
        &self.handle
    }
}

/// The regions of one Q
#[derive(Debug)]
pub struct RegionSet<H> {
    regions: Vec<Region<H>>,
    /// Last bounds seen in each slot, kept across shrinks
    remembered: [Option<Bounds>; MAX_REGIONS],
}

impl<H> Default for RegionSet<H> {
    fn default() -> Self {
        Self {
            regions: Vec::new(),
            remembered: [None; MAX_REGIONS],
        }
    }
}

impl<H: RegionHandle> RegionSet<H> {
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn regions(&self) -> &[Region<H>] {
        &self.regions
    }

    pub fn get(&self, slot: usize) -> Option<&Region<H>> {
        self.regions.get(slot)
    }

    pub fn bounds(&self) -> Vec<Bounds> {
        self.regions.iter().map(|r| r.bounds).collect()
    }

    pub fn areas(&self) -> Vec<Option<f64>> {
        self.regions.iter().map(|r| r.area).collect()
    }

    fn push(&mut self, bounds: Bounds, extent: Bounds) {
        let slot = self.regions.len();
        let handle = H::create(HandleSpec::for_slot(slot, bounds, extent));
        self.remembered[slot] = Some(bounds);
        self.regions.push(Region {
            bounds,
            area: None,
            handle,
        });
    }

    fn truncate(&mut self, count: usize) {
        while self.regions.len() > count {
            if let Some(region) = self.regions.pop() {
                region.handle.destroy();
            }
        }
    }

    /// Drop every region and forget remembered bounds
    fn reset(&mut self) {
        self.truncate(0);
        self.remembered = [None; MAX_REGIONS];
    }

    fn region_mut(&mut self, slot: usize) -> Result<&mut Region<H>, RegionError> {
        self.regions
            .get_mut(slot)
            .ok_or(RegionError::InactiveSlot(slot))
    }
}

/// Region sets of every Q in the loaded dataset
#[derive(Debug)]
pub struct RegionStore<H> {
    table: SpectrumTable,
    sets: HashMap<String, RegionSet<H>>,
}

impl<H: RegionHandle> RegionStore<H> {
    /// One empty set per Q of `table`
    pub fn new(table: SpectrumTable) -> Self {
        let sets = table
            .spectra()
            .iter()
            .map(|s| (s.q.as_str().to_string(), RegionSet::default()))
            .collect();
        Self { table, sets }
    }

    pub fn table(&self) -> &SpectrumTable {
        &self.table
    }

    pub fn region_set(&self, q: &str) -> Result<&RegionSet<H>, RegionError> {
        self.sets
            .get(q)
            .ok_or_else(|| RegionError::UnknownQ(q.to_string()))
    }

    /// Sets in dataset order
    pub fn iter(&self) -> impl Iterator<Item = (&Spectrum, Option<&RegionSet<H>>)> {
        self.table
            .spectra()
            .iter()
            .map(move |s| (s, self.sets.get(s.q.as_str())))
    }

    /// Empty every set, handles included
    pub fn clear_all(&mut self) {
        for set in self.sets.values_mut() {
            set.reset();
        }
    }

    /// Populate an empty set.
    ///
    /// Copies the active bounds of `previous` when that set has regions,
    /// otherwise starts one region over the full energy span of `q`.
    /// Returns `false` if the set already had regions. Areas are left stale.
    pub fn ensure_seeded(&mut self, q: &str, previous: Option<&str>) -> Result<bool, RegionError> {
        let spectrum = self
            .table
            .find(q)
            .ok_or_else(|| RegionError::UnknownQ(q.to_string()))?;
        let extent = Bounds::full_span(spectrum);

        let copied: Vec<Bounds> = match previous {
            Some(prev) => self
                .sets
                .get(prev)
                .ok_or_else(|| RegionError::UnknownQ(prev.to_string()))?
                .bounds(),
            None => Vec::new(),
        };

        let set = self
            .sets
            .get_mut(q)
            .ok_or_else(|| RegionError::UnknownQ(q.to_string()))?;
        if !set.is_empty() {
            return Ok(false);
        }
        set.reset();
        if copied.is_empty() {
            set.push(extent, extent);
        } else {
            for bounds in copied {
                set.push(bounds, extent);
            }
        }
        log::debug!("Seeded Q = {} with {} region(s)", q, set.len());
        Ok(true)
    }

    /// Grow or shrink the set of `q` to `count` regions (1..=5).
    ///
    /// Growing reuses the bounds a slot had before it was shrunk away, or the
    /// full energy span for a slot never used. Shrinking destroys the handles
    /// of the removed slots but remembers their bounds.
    pub fn resize(&mut self, q: &str, count: usize) -> Result<(), RegionError> {
        if !(1..=MAX_REGIONS).contains(&count) {
            return Err(RegionError::InvalidCount(count));
        }
        let spectrum = self
            .table
            .find(q)
            .ok_or_else(|| RegionError::UnknownQ(q.to_string()))?;
        let extent = Bounds::full_span(spectrum);
        let set = self
            .sets
            .get_mut(q)
            .ok_or_else(|| RegionError::UnknownQ(q.to_string()))?;

        if count < set.len() {
            set.truncate(count);
        } else {
            for slot in set.len()..count {
                let bounds = set.remembered[slot].unwrap_or(extent);
                set.push(bounds, extent);
            }
        }
        Ok(())
    }

    /// Overwrite one bound. The area goes stale; the handle is not moved.
    pub fn set_bound(&mut self, q: &str, slot: usize, bound: Bound, value: f64) -> Result<(), RegionError> {
        let set = self
            .sets
            .get_mut(q)
            .ok_or_else(|| RegionError::UnknownQ(q.to_string()))?;
        let region = set.region_mut(slot)?;
        region.bounds.set(bound, value);
        region.area = None;
        let bounds = region.bounds;
        set.remembered[slot] = Some(bounds);
        Ok(())
    }

    /// Move the handle of a slot to the stored bounds
    pub fn sync_handle(&mut self, q: &str, slot: usize) -> Result<(), RegionError> {
        let set = self
            .sets
            .get_mut(q)
            .ok_or_else(|| RegionError::UnknownQ(q.to_string()))?;
        let region = set.region_mut(slot)?;
        let bounds = region.bounds;
        region.handle.set_region(bounds);
        Ok(())
    }

    /// Recompute the area of every region of `q`
    pub fn recompute_areas(&mut self, q: &str) -> Result<(), RegionError> {
        let spectrum = self
            .table
            .find(q)
            .ok_or_else(|| RegionError::UnknownQ(q.to_string()))?;
        let set = self
            .sets
            .get_mut(q)
            .ok_or_else(|| RegionError::UnknownQ(q.to_string()))?;
        for region in &mut set.regions {
            region.area = Some(integration::area(
                &spectrum.samples,
                region.bounds.xmin,
                region.bounds.xmax,
            ));
        }
        Ok(())
    }

    /// Current bounds of one slot
    pub fn copy_limits(&self, q: &str, slot: usize) -> Result<Bounds, RegionError> {
        self.region_set(q)?
            .get(slot)
            .map(|r| r.bounds)
            .ok_or(RegionError::InactiveSlot(slot))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::Cell;

    thread_local! {
        static DESTROYED: Cell<usize> = const { Cell::new(0) };
    }

    /// Handles destroyed on this thread so far
    pub fn destroyed_count() -> usize {
        DESTROYED.with(|d| d.get())
    }

    /// Test double that records what was done to it
    #[derive(Debug)]
    pub struct RecordingHandle {
        pub spec: HandleSpec,
        pub bounds: Bounds,
        pub set_calls: usize,
    }

    impl RegionHandle for RecordingHandle {
        fn create(spec: HandleSpec) -> Self {
            Self {
                bounds: spec.bounds,
                spec,
                set_calls: 0,
            }
        }

        fn region(&self) -> Bounds {
            self.bounds
        }

        fn set_region(&mut self, bounds: Bounds) {
            self.bounds = bounds;
            self.set_calls += 1;
        }

        fn destroy(self) {
            DESTROYED.with(|d| d.set(d.get() + 1));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{destroyed_count, RecordingHandle};
    use super::*;
    use crate::data::spectrum::{QValue, Sample};
    use approx::assert_relative_eq;

    fn spectrum(q: &str, lo: f64, hi: f64) -> Spectrum {
        let n = 9;
        let samples = (0..n)
            .map(|i| {
                let e = lo + (hi - lo) * i as f64 / (n - 1) as f64;
                Sample::new(e, 1.0, 0.05)
            })
            .collect();
        Spectrum {
            q: QValue::parse(q).unwrap(),
            label: format!("S_{}", q),
            samples,
        }
    }

    fn store() -> RegionStore<RecordingHandle> {
        RegionStore::new(SpectrumTable::new(
            "mem",
            vec![spectrum("0.5", -4.0, 4.0), spectrum("0.8", -2.0, 6.0)],
        ))
    }

    #[test]
    fn test_sets_start_empty() {
        let store = store();
        assert!(store.region_set("0.5").unwrap().is_empty());
        assert!(store.region_set("0.8").unwrap().is_empty());
        assert_eq!(
            store.region_set("1.0").unwrap_err(),
            RegionError::UnknownQ("1.0".into())
        );
    }

    #[test]
    fn test_seed_defaults_to_full_span() {
        let mut store = store();
        assert!(store.ensure_seeded("0.8", None).unwrap());
        let set = store.region_set("0.8").unwrap();
        assert_eq!(set.bounds(), vec![Bounds::new(-2.0, 6.0)]);
        assert_eq!(set.areas(), vec![None]);
        let handle = set.get(0).unwrap().handle();
        assert_eq!(handle.spec.label, "ROI 1");
        assert_eq!(handle.spec.extent, Bounds::new(-2.0, 6.0));
    }

    #[test]
    fn test_seed_copies_previous_bounds() {
        let mut store = store();
        store.ensure_seeded("0.5", None).unwrap();
        store.resize("0.5", 2).unwrap();
        store.set_bound("0.5", 0, Bound::Min, -1.0).unwrap();
        store.set_bound("0.5", 1, Bound::Max, 3.0).unwrap();

        store.ensure_seeded("0.8", Some("0.5")).unwrap();
        let set = store.region_set("0.8").unwrap();
        assert_eq!(
            set.bounds(),
            vec![Bounds::new(-1.0, 4.0), Bounds::new(-4.0, 3.0)]
        );
        // extent still comes from the new Q
        assert_eq!(set.get(1).unwrap().handle().spec.extent, Bounds::new(-2.0, 6.0));
    }

    #[test]
    fn test_seed_from_empty_previous_uses_full_span() {
        let mut store = store();
        store.ensure_seeded("0.8", Some("0.5")).unwrap();
        assert_eq!(
            store.region_set("0.8").unwrap().bounds(),
            vec![Bounds::new(-2.0, 6.0)]
        );
    }

    #[test]
    fn test_seed_leaves_populated_set_alone() {
        let mut store = store();
        store.ensure_seeded("0.5", None).unwrap();
        store.set_bound("0.5", 0, Bound::Min, 0.5).unwrap();
        assert!(!store.ensure_seeded("0.5", None).unwrap());
        assert_eq!(store.copy_limits("0.5", 0).unwrap(), Bounds::new(0.5, 4.0));
    }

    #[test]
    fn test_grow_shrink_grow_restores_bounds() {
        let mut store = store();
        store.resize("0.5", 3).unwrap();
        store.set_bound("0.5", 0, Bound::Min, -3.0).unwrap();
        store.set_bound("0.5", 1, Bound::Min, -1.0).unwrap();
        store.set_bound("0.5", 2, Bound::Max, 2.0).unwrap();
        let before = store.region_set("0.5").unwrap().bounds();

        store.resize("0.5", 1).unwrap();
        assert_eq!(store.region_set("0.5").unwrap().len(), 1);
        store.resize("0.5", 3).unwrap();
        assert_eq!(store.region_set("0.5").unwrap().bounds(), before);
    }

    #[test]
    fn test_shrink_destroys_handles() {
        let mut store = store();
        store.resize("0.5", 4).unwrap();
        let before = destroyed_count();
        store.resize("0.5", 2).unwrap();
        assert_eq!(destroyed_count() - before, 2);
        store.clear_all();
        assert_eq!(destroyed_count() - before, 4);
        assert!(store.region_set("0.5").unwrap().is_empty());
    }

    #[test]
    fn test_clear_forgets_remembered_bounds() {
        let mut store = store();
        store.resize("0.5", 2).unwrap();
        store.set_bound("0.5", 1, Bound::Min, 1.0).unwrap();
        store.clear_all();
        store.resize("0.5", 2).unwrap();
        assert_eq!(store.copy_limits("0.5", 1).unwrap(), Bounds::new(-4.0, 4.0));
    }

    #[test]
    fn test_resize_rejects_out_of_range_counts() {
        let mut store = store();
        assert_eq!(store.resize("0.5", 0), Err(RegionError::InvalidCount(0)));
        assert_eq!(store.resize("0.5", 6), Err(RegionError::InvalidCount(6)));
        assert!(store.region_set("0.5").unwrap().is_empty());
    }

    #[test]
    fn test_set_bound_marks_area_stale_and_keeps_handle() {
        let mut store = store();
        store.resize("0.5", 1).unwrap();
        store.recompute_areas("0.5").unwrap();
        assert!(store.region_set("0.5").unwrap().areas()[0].is_some());

        store.set_bound("0.5", 0, Bound::Max, 9.0).unwrap();
        let region = store.region_set("0.5").unwrap().get(0).unwrap();
        assert_eq!(region.area(), None);
        assert_eq!(region.bounds(), Bounds::new(-4.0, 9.0));
        assert_eq!(region.handle().set_calls, 0);

        store.sync_handle("0.5", 0).unwrap();
        let region = store.region_set("0.5").unwrap().get(0).unwrap();
        assert_eq!(region.handle().region(), Bounds::new(-4.0, 9.0));
    }

    #[test]
    fn test_set_bound_on_inactive_slot() {
        let mut store = store();
        store.resize("0.5", 1).unwrap();
        assert_eq!(
            store.set_bound("0.5", 3, Bound::Min, 0.0),
            Err(RegionError::InactiveSlot(3))
        );
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let mut store = store();
        store.resize("0.5", 2).unwrap();
        store.set_bound("0.5", 1, Bound::Min, -1.0).unwrap();
        store.recompute_areas("0.5").unwrap();
        let first = store.region_set("0.5").unwrap().areas();
        store.recompute_areas("0.5").unwrap();
        assert_eq!(store.region_set("0.5").unwrap().areas(), first);

        // constant intensity 1: [-4, 4) minus the last sample interval
        assert_relative_eq!(first[0].unwrap(), 7.0);
        // [-1, 4): nearest to -1 is -1, nearest to 4 is the last sample
        assert_relative_eq!(first[1].unwrap(), 4.0);
    }

    #[test]
    fn test_iter_follows_dataset_order() {
        let store = store();
        let qs: Vec<&str> = store.iter().map(|(s, _)| s.q.as_str()).collect();
        assert_eq!(qs, vec!["0.5", "0.8"]);
    }
}
