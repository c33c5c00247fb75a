/// Area table export
///
/// Flattens the region store into one row per Q:
/// `Q, no.ROIs, (E_min_i, E_max_i, Area_i) for i = 1..5`. Columns with no
/// value in any row are dropped before writing.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use thiserror::Error;

use super::integration;
use super::regions::{RegionHandle, RegionStore, MAX_REGIONS};

pub const Q_HEADER: &str = "Q (Å⁻¹)";
pub const COUNT_HEADER: &str = "no.ROIs";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// One row of the export table
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    /// Q exactly as it appeared in the dataset
    pub q: String,
    pub count: usize,
    /// Values of the slot columns, aligned with `ExportTable::value_headers`
    pub cells: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportTable {
    value_headers: Vec<String>,
    rows: Vec<ExportRow>,
}

fn slot_headers(slot: usize) -> [String; 3] {
    let n = slot + 1;
    [
        format!("E_min_{} (meV)", n),
        format!("E_max_{} (meV)", n),
        format!("Area_{}", n),
    ]
}

impl ExportTable {
    /// Snapshot of every Q in dataset order.
    ///
    /// A region whose cached area is stale is integrated on the spot.
    pub fn assemble<H: RegionHandle>(store: &RegionStore<H>) -> Self {
        let mut value_headers: Vec<String> = (0..MAX_REGIONS).flat_map(slot_headers).collect();
        let mut rows: Vec<ExportRow> = store
            .iter()
            .map(|(spectrum, set)| {
                let mut cells = vec![None; 3 * MAX_REGIONS];
                let mut count = 0;
                if let Some(set) = set {
                    count = set.len();
                    for (slot, region) in set.regions().iter().enumerate() {
                        let b = region.bounds();
                        let area = region
                            .area()
                            .unwrap_or_else(|| integration::area(&spectrum.samples, b.xmin, b.xmax));
                        cells[3 * slot] = Some(b.xmin);
                        cells[3 * slot + 1] = Some(b.xmax);
                        cells[3 * slot + 2] = Some(area);
                    }
                }
                ExportRow {
                    q: spectrum.q.as_str().to_string(),
                    count,
                    cells,
                }
            })
            .collect();

        // Keep only columns with at least one value
        let keep: Vec<bool> = (0..value_headers.len())
            .map(|c| rows.iter().any(|r| r.cells[c].is_some()))
            .collect();
        let mut flags = keep.iter();
        value_headers.retain(|_| flags.next().copied().unwrap_or(false));
        for row in &mut rows {
            let mut flags = keep.iter();
            row.cells.retain(|_| flags.next().copied().unwrap_or(false));
        }

        Self { value_headers, rows }
    }

    /// Every column name, Q and count first
    pub fn headers(&self) -> Vec<&str> {
        let mut h = vec![Q_HEADER, COUNT_HEADER];
        h.extend(self.value_headers.iter().map(String::as_str));
        h
    }

    pub fn value_headers(&self) -> &[String] {
        &self.value_headers
    }

    pub fn rows(&self) -> &[ExportRow] {
        &self.rows
    }
}

/// Write `table` as tab-separated text, numbers at fixed `precision`
pub fn write_tsv<W: Write>(table: &ExportTable, writer: W, precision: usize) -> Result<(), ExportError> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(writer);

    wtr.write_record(table.headers())?;
    for row in table.rows() {
        let mut record = Vec::with_capacity(2 + row.cells.len());
        record.push(row.q.clone());
        record.push(row.count.to_string());
        record.extend(
            row.cells
                .iter()
                .map(|c| c.map(|v| format!("{:.*}", precision, v)).unwrap_or_default()),
        );
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Create `path` and write the table into it
pub fn save(path: &Path, table: &ExportTable, precision: usize) -> Result<(), ExportError> {
    let file = File::create(path)?;
    write_tsv(table, io::BufWriter::new(file), precision)?;
    log::info!(
        "Exported {} rows x {} columns to {}",
        table.rows().len(),
        table.headers().len(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::spectrum::{QValue, Sample, Spectrum, SpectrumTable};
    use crate::pipeline::regions::testing::RecordingHandle;
    use crate::pipeline::regions::Bound;

    fn spectrum(q: &str) -> Spectrum {
        let samples = (0..5)
            .map(|i| Sample::new(-2.0 + i as f64, 1.0, 0.1))
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
            vec![spectrum("0.80"), spectrum("0.5"), spectrum("1.2")],
        ))
    }

    fn to_string(table: &ExportTable) -> String {
        let mut buf = Vec::new();
        write_tsv(table, &mut buf, 4).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_unused_slots_are_pruned() {
        let mut store = store();
        store.resize("0.80", 2).unwrap();
        store.resize("0.5", 1).unwrap();
        store.recompute_areas("0.80").unwrap();
        store.recompute_areas("0.5").unwrap();

        let table = ExportTable::assemble(&store);
        assert_eq!(
            table.headers(),
            vec![
                "Q (Å⁻¹)",
                "no.ROIs",
                "E_min_1 (meV)",
                "E_max_1 (meV)",
                "Area_1",
                "E_min_2 (meV)",
                "E_max_2 (meV)",
                "Area_2",
            ]
        );
        assert!(!table.headers().contains(&"Area_5"));
        assert!(!table.headers().contains(&"E_min_5 (meV)"));
    }

    #[test]
    fn test_rows_follow_dataset_order_with_gaps() {
        let mut store = store();
        store.resize("0.80", 2).unwrap();
        store.resize("0.5", 1).unwrap();
        store.recompute_areas("0.80").unwrap();
        store.recompute_areas("0.5").unwrap();

        let table = ExportTable::assemble(&store);
        let qs: Vec<&str> = table.rows().iter().map(|r| r.q.as_str()).collect();
        assert_eq!(qs, vec!["0.80", "0.5", "1.2"]);
        assert_eq!(table.rows()[1].count, 1);
        assert_eq!(table.rows()[1].cells[3..], [None, None, None]);
        assert_eq!(table.rows()[2].count, 0);
        assert!(table.rows()[2].cells.iter().all(Option::is_none));
    }

    #[test]
    fn test_tsv_layout() {
        let mut store = store();
        store.resize("0.5", 1).unwrap();
        store.set_bound("0.5", 0, Bound::Min, -1.0).unwrap();
        store.recompute_areas("0.5").unwrap();

        let text = to_string(&ExportTable::assemble(&store));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "Q (Å⁻¹)\tno.ROIs\tE_min_1 (meV)\tE_max_1 (meV)\tArea_1");
        assert_eq!(lines[1], "0.80\t0\t\t\t");
        // [-1, 2): intervals -1..0 and 0..1
        assert_eq!(lines[2], "0.5\t1\t-1.0000\t2.0000\t2.0000");
        assert_eq!(lines[3], "1.2\t0\t\t\t");
    }

    #[test]
    fn test_stale_area_is_integrated() {
        let mut store = store();
        store.resize("1.2", 1).unwrap();
        store.set_bound("1.2", 0, Bound::Max, 0.0).unwrap();

        let table = ExportTable::assemble(&store);
        // nearest to 0 is left out: only the -2..-1 interval counts
        assert_eq!(table.rows()[2].cells, vec![Some(-2.0), Some(0.0), Some(1.0)]);
    }

    #[test]
    fn test_nothing_integrated_keeps_only_q_columns() {
        let text = to_string(&ExportTable::assemble(&store()));
        assert_eq!(text.lines().next(), Some("Q (Å⁻¹)\tno.ROIs"));
    }

    #[test]
    fn test_save_creates_file() {
        let mut store = store();
        store.resize("0.5", 1).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dict_areas.csv");
        save(&path, &ExportTable::assemble(&store), 2).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("0.5\t1\t-2.00\t2.00\t3.00"));
    }
}
