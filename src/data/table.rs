/// Tabular QENS dataset reader
///
/// Reads the already-sorted S(Q, E) table: columns come in groups of three
/// (energy, intensity, error), one group per Q. The Q value is encoded at the
/// end of the intensity column label, e.g. `sample_S_0.52Å-1`.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use thiserror::Error;

use super::spectrum::{QValue, Sample, Spectrum, SpectrumTable};

/// Unit tags that may trail the Q value in a column label
const Q_UNIT_TAGS: [&str; 3] = ["Å-1", "A-1", "1/A"];

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("expected columns in groups of three (energy, intensity, error), found {0} columns")]
    ColumnCount(usize),
    #[error("no Q value in column label '{0}'")]
    MissingQ(String),
    #[error("Q value appears twice: {0}")]
    DuplicateQ(String),
    #[error("row {row}, column {column}: '{text}' is not a number")]
    InvalidNumber {
        row: usize,
        column: usize,
        text: String,
    },
    #[error("row {row}: incomplete sample for Q = {q}")]
    IncompleteSample { row: usize, q: String },
    #[error("dataset contains no spectra")]
    Empty,
}

/// Pick the field delimiter from the file extension
pub fn delimiter_for(path: &Path) -> u8 {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "csv" => b',',
        _ => b'\t',
    }
}

/// Extract the Q text from an intensity column label.
///
/// Takes what follows the last `_` and strips a trailing unit tag.
pub fn q_from_label(label: &str) -> Option<QValue> {
    let (_, tail) = label.trim().rsplit_once('_')?;
    let tail = Q_UNIT_TAGS
        .iter()
        .find_map(|tag| tail.strip_suffix(tag))
        .unwrap_or(tail);
    QValue::parse(tail)
}

/// Load a dataset file
pub fn load_table(path: &Path) -> Result<SpectrumTable, LoadError> {
    let file = File::open(path)?;
    let table = read_table(file, delimiter_for(path), &path.display().to_string())?;
    log::info!(
        "Loaded {} spectra from {}",
        table.len(),
        path.display()
    );
    Ok(table)
}

/// Parse a dataset from any reader
pub fn read_table<R: Read>(reader: R, delimiter: u8, source: &str) -> Result<SpectrumTable, LoadError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader.headers()?.iter().map(|h| h.to_string()).collect();
    if headers.is_empty() || headers.len() % 3 != 0 {
        return Err(LoadError::ColumnCount(headers.len()));
    }

    let mut spectra: Vec<Spectrum> = Vec::with_capacity(headers.len() / 3);
    for group in headers.chunks(3) {
        let label = &group[1];
        let q = q_from_label(label).ok_or_else(|| LoadError::MissingQ(label.clone()))?;
        if spectra.iter().any(|s| s.q.as_str() == q.as_str()) {
            return Err(LoadError::DuplicateQ(q.as_str().to_string()));
        }
        spectra.push(Spectrum {
            q,
            label: label.clone(),
            samples: Vec::new(),
        });
    }
    if spectra.is_empty() {
        return Err(LoadError::Empty);
    }

    // A group ends at its first all-empty row; later rows must stay empty
    let mut finished = vec![false; spectra.len()];

    for (i, record) in csv_reader.records().enumerate() {
        let record = record?;
        // header is row 1
        let row = i + 2;
        for (g, spectrum) in spectra.iter_mut().enumerate() {
            let cells: Vec<&str> = (0..3).map(|k| record.get(3 * g + k).unwrap_or("")).collect();
            let filled = cells.iter().filter(|c| !c.is_empty()).count();
            if filled == 0 {
                finished[g] = true;
                continue;
            }
            if filled < 3 || finished[g] {
                return Err(LoadError::IncompleteSample {
                    row,
                    q: spectrum.q.as_str().to_string(),
                });
            }
            let mut values = [0.0f64; 3];
            for (k, cell) in cells.iter().enumerate() {
                values[k] = cell.parse().map_err(|_| LoadError::InvalidNumber {
                    row,
                    column: 3 * g + k + 1,
                    text: cell.to_string(),
                })?;
            }
            spectrum.samples.push(Sample::new(values[0], values[1], values[2]));
        }
    }

    for spectrum in &spectra {
        if spectrum.samples.is_empty() {
            log::warn!("Q = {} has no samples", spectrum.q);
        }
    }

    Ok(SpectrumTable::new(source, spectra))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE_TSV: &str = "\
E_0.5\tS_0.5Å-1\tErr_0.5\tE_0.8\tS_0.8Å-1\tErr_0.8
-2.0\t0.0\t0.01\t-1.5\t0.1\t0.01
-1.0\t1.0\t0.02\t0.0\t2.0\t0.02
0.0\t2.0\t0.03\t1.5\t0.1\t0.01
1.0\t1.0\t0.02\t\t\t
2.0\t0.0\t0.01\t\t\t
";

    #[test]
    fn test_q_from_label() {
        assert_eq!(q_from_label("run42_S_0.52Å-1").unwrap().as_str(), "0.52");
        assert_eq!(q_from_label("S_1.2A-1").unwrap().as_str(), "1.2");
        assert_eq!(q_from_label("S_0.8").unwrap().as_str(), "0.8");
        assert!(q_from_label("intensity").is_none());
        assert!(q_from_label("S_abc").is_none());
    }

    #[test]
    fn test_read_groups_of_three() {
        let table = read_table(SAMPLE_TSV.as_bytes(), b'\t', "mem").unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.q_labels(), vec!["0.5", "0.8"]);

        let first = table.get(0).unwrap();
        assert_eq!(first.samples.len(), 5);
        assert_eq!(first.label, "S_0.5Å-1");
        assert_eq!(first.samples[2], Sample::new(0.0, 2.0, 0.03));

        // shorter spectrum stops at its first empty row
        let second = table.get(1).unwrap();
        assert_eq!(second.samples.len(), 3);
        assert_eq!(second.energy_span(), Some((-1.5, 1.5)));
    }

    #[test]
    fn test_rejects_bad_column_count() {
        let data = "E_0.5\tS_0.5\n1\t2\n";
        let err = read_table(data.as_bytes(), b'\t', "mem").unwrap_err();
        assert!(matches!(err, LoadError::ColumnCount(2)));
    }

    #[test]
    fn test_rejects_duplicate_q() {
        let data = "E\tS_0.5\tErr\tE\tS_0.50\tErr\n";
        // 0.5 and 0.50 are different keys as text; identical text is the error
        assert!(read_table(data.as_bytes(), b'\t', "mem").is_ok());
        let data = "E\tS_0.5\tErr\tE\tS_0.5\tErr\n";
        let err = read_table(data.as_bytes(), b'\t', "mem").unwrap_err();
        assert!(matches!(err, LoadError::DuplicateQ(q) if q == "0.5"));
    }

    #[test]
    fn test_reports_non_numeric_cell() {
        let data = "E\tS_0.5\tErr\n-1.0\t1.0\t0.1\n0.0\tx\t0.1\n";
        let err = read_table(data.as_bytes(), b'\t', "mem").unwrap_err();
        match err {
            LoadError::InvalidNumber { row, column, text } => {
                assert_eq!(row, 3);
                assert_eq!(column, 2);
                assert_eq!(text, "x");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_rejects_partial_sample() {
        let data = "E\tS_0.5\tErr\n-1.0\t\t0.1\n";
        let err = read_table(data.as_bytes(), b'\t', "mem").unwrap_err();
        assert!(matches!(err, LoadError::IncompleteSample { row: 2, .. }));
    }

    #[test]
    fn test_load_csv_file_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        let mut f = File::create(&path).unwrap();
        writeln!(f, "# comment line").unwrap();
        writeln!(f, "E_1.2,S_1.2Å-1,Err_1.2").unwrap();
        writeln!(f, "-3.0, 0.5, 0.1").unwrap();
        writeln!(f, "3.0, 0.5, 0.1").unwrap();
        drop(f);

        let table = load_table(&path).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(0).unwrap().energy_span(), Some((-3.0, 3.0)));
        assert!(table.source.ends_with("data.csv"));
    }
}
