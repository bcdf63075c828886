//! The corpus of observed complexes: one CSV row per complex with up to six
//! ligand slots, per-slot donor counts and a measured ZFS value.
//!
//! The schema is validated once when the file is opened. Rows are kept
//! verbatim alongside their parsed fields so direct hits and seeds can be
//! written back out unchanged.

use csv::StringRecord;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

pub const SLOT_COUNT: usize = 6;

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("CSV parsing error for '{path}': {source}")]
    Csv { path: String, source: csv::Error },
    #[error("Corpus '{path}' is missing required column '{column}'")]
    MissingColumn { path: String, column: String },
}

/// Column positions resolved from the header row.
#[derive(Debug, Clone)]
struct Schema {
    ligands: [usize; SLOT_COUNT],
    donors: [usize; SLOT_COUNT],
    donor_atoms: [Option<usize>; SLOT_COUNT],
    zfs: usize,
    ed: Option<usize>,
    file_name: Option<usize>,
}

impl Schema {
    fn resolve(headers: &StringRecord, zfs_column: &str, path: &str) -> Result<Self, CorpusError> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);
        let require = |name: &str| {
            find(name).ok_or_else(|| CorpusError::MissingColumn {
                path: path.to_string(),
                column: name.to_string(),
            })
        };

        let mut ligands = [0; SLOT_COUNT];
        let mut donors = [0; SLOT_COUNT];
        let mut donor_atoms = [None; SLOT_COUNT];
        for slot in 0..SLOT_COUNT {
            ligands[slot] = require(&format!("L{}", slot + 1))?;
            donors[slot] = require(&format!("D{}", slot + 1))?;
            donor_atoms[slot] = find(&format!("DA{}", slot + 1));
        }

        Ok(Self {
            ligands,
            donors,
            donor_atoms,
            zfs: require(zfs_column)?,
            ed: find("E/D"),
            file_name: find("FileName"),
        })
    }
}

/// True for cells that mean "no ligand in this slot".
pub fn is_placeholder(cell: &str) -> bool {
    let cell = cell.trim();
    cell.is_empty()
        || ["X", "NAN", "NONE"]
            .iter()
            .any(|p| cell.eq_ignore_ascii_case(p))
}

fn parse_float(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Donor counts are stored as numbers that may carry a fractional zero
/// (`"3.0"`). Zero, negative and non-integral values count as missing.
fn parse_donor_count(cell: &str) -> Option<u8> {
    let value = parse_float(cell)?;
    if value.fract() != 0.0 || value < 1.0 || value > f64::from(u8::MAX) {
        return None;
    }
    Some(value as u8)
}

#[derive(Debug, Clone, PartialEq)]
pub struct CorpusRecord {
    pub ligands: [Option<String>; SLOT_COUNT],
    pub donor_counts: [Option<u8>; SLOT_COUNT],
    pub donor_atoms: [Option<String>; SLOT_COUNT],
    pub zfs: Option<f64>,
    pub ed: Option<f64>,
    pub file_name: Option<String>,
    raw: StringRecord,
}

impl CorpusRecord {
    fn parse(raw: StringRecord, schema: &Schema) -> Self {
        let cell = |index: usize| raw.get(index).unwrap_or("");
        let text = |index: usize| {
            let value = cell(index);
            (!is_placeholder(value)).then(|| value.trim().to_string())
        };

        Self {
            ligands: std::array::from_fn(|slot| text(schema.ligands[slot])),
            donor_counts: std::array::from_fn(|slot| parse_donor_count(cell(schema.donors[slot]))),
            donor_atoms: std::array::from_fn(|slot| schema.donor_atoms[slot].and_then(text)),
            zfs: parse_float(cell(schema.zfs)),
            ed: schema.ed.and_then(|i| parse_float(cell(i))),
            file_name: schema.file_name.and_then(text),
            raw,
        }
    }

    /// The row exactly as read.
    pub fn raw(&self) -> &StringRecord {
        &self.raw
    }

    /// `(smiles, donor_count)` for every slot holding a ligand with a known
    /// donor count.
    pub fn ligand_modes(&self) -> impl Iterator<Item = (&str, u8)> {
        self.ligands
            .iter()
            .zip(&self.donor_counts)
            .filter_map(|(ligand, count)| Some((ligand.as_deref()?, (*count)?)))
    }

    /// SMILES of every occupied slot, regardless of donor count.
    pub fn ligand_smiles(&self) -> impl Iterator<Item = &str> {
        self.ligands.iter().filter_map(|l| l.as_deref())
    }
}

/// A corpus row within tolerance of a queried target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorpusHit<'a> {
    pub record: &'a CorpusRecord,
    pub distance: f64,
}

#[derive(Debug, Clone)]
pub struct Corpus {
    headers: StringRecord,
    zfs_column: String,
    records: Vec<CorpusRecord>,
}

impl Corpus {
    pub fn load(path: &Path, zfs_column: &str) -> Result<Self, CorpusError> {
        let display = path.to_string_lossy().to_string();
        let file = std::fs::File::open(path).map_err(|e| CorpusError::Io {
            path: display.clone(),
            source: e,
        })?;
        Self::from_reader(file, zfs_column, &display)
    }

    /// Reads a corpus from any reader; `origin` names the source in errors.
    pub fn from_reader(reader: impl Read, zfs_column: &str, origin: &str) -> Result<Self, CorpusError> {
        let csv_error = |source| CorpusError::Csv {
            path: origin.to_string(),
            source,
        };
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers = reader.headers().map_err(csv_error)?.clone();
        let schema = Schema::resolve(&headers, zfs_column, origin)?;

        let records = reader
            .records()
            .map(|row| row.map(|raw| CorpusRecord::parse(raw, &schema)))
            .collect::<Result<Vec<_>, _>>()
            .map_err(csv_error)?;

        Ok(Self {
            headers,
            zfs_column: zfs_column.to_string(),
            records,
        })
    }

    pub fn headers(&self) -> &StringRecord {
        &self.headers
    }

    pub fn zfs_column(&self) -> &str {
        &self.zfs_column
    }

    pub fn records(&self) -> &[CorpusRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn scored(&self, target: f64) -> Vec<CorpusHit<'_>> {
        let mut hits: Vec<CorpusHit<'_>> = self
            .records
            .iter()
            .filter_map(|record| {
                record.zfs.map(|zfs| CorpusHit {
                    record,
                    distance: (zfs - target).abs(),
                })
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    /// Rows whose ZFS lies within `tolerance` of `target`, closest first.
    /// Rows without a numeric ZFS never match.
    pub fn lookup(&self, target: f64, tolerance: f64) -> Vec<CorpusHit<'_>> {
        self.scored(target)
            .into_iter()
            .take_while(|hit| hit.distance <= tolerance)
            .collect()
    }

    /// The `k` rows closest to `target`.
    pub fn nearest(&self, target: f64, k: usize) -> Vec<CorpusHit<'_>> {
        let mut hits = self.scored(target);
        hits.truncate(k);
        hits
    }

    /// Rows with ZFS at or below `threshold`, in file order.
    pub fn at_or_below(&self, threshold: f64) -> Vec<&CorpusRecord> {
        self.records
            .iter()
            .filter(|r| r.zfs.is_some_and(|zfs| zfs <= threshold))
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    pub(crate) const HEADER: &str = "FileName,L1,L2,L3,L4,L5,L6,D1,D2,D3,D4,D5,D6,DA1,DA2,DA3,DA4,DA5,DA6,zfs,E/D";

    pub(crate) fn corpus(rows: &[&str]) -> Corpus {
        let text = std::iter::once(HEADER)
            .chain(rows.iter().copied())
            .collect::<Vec<_>>()
            .join("\n");
        Corpus::from_reader(text.as_bytes(), "zfs", "memory").unwrap()
    }

    #[test]
    fn parses_slots_and_skips_placeholders() {
        let corpus = corpus(&["a.xyz,c1ccncc1,Cl,X,,nan,NONE,1,1.0,2,,3,x,N,Cl,X,X,X,X,-182.0,0.1"]);
        let record = &corpus.records()[0];
        assert_eq!(record.file_name.as_deref(), Some("a.xyz"));
        assert_eq!(record.ligands[0].as_deref(), Some("c1ccncc1"));
        assert_eq!(record.ligands[2], None);
        assert_eq!(record.ligands[4], None);
        assert_eq!(record.donor_counts[1], Some(1));
        assert_eq!(record.donor_counts[3], None);
        assert_eq!(record.donor_counts[5], None);
        assert_eq!(record.donor_atoms[0].as_deref(), Some("N"));
        assert_eq!(record.zfs, Some(-182.0));
        assert_eq!(record.ed, Some(0.1));
        let modes: Vec<_> = record.ligand_modes().collect();
        assert_eq!(modes, vec![("c1ccncc1", 1), ("Cl", 1)]);
    }

    #[test]
    fn lookup_returns_hits_within_tolerance_sorted_by_distance() {
        let corpus = corpus(&[
            "a,N,X,X,X,X,X,1,,,,,,,,,,,,-182.0,0.1",
            "b,O,X,X,X,X,X,1,,,,,,,,,,,,-250.0,0.1",
            "c,S,X,X,X,X,X,1,,,,,,,,,,,,-179.5,0.1",
            "d,P,X,X,X,X,X,1,,,,,,,,,,,,not-a-number,0.1",
        ]);
        let hits = corpus.lookup(-180.0, 10.0);
        let names: Vec<_> = hits.iter().map(|h| h.record.file_name.clone().unwrap()).collect();
        assert_eq!(names, vec!["c", "a"]);
        assert_eq!(hits[1].distance, 2.0);
        assert!(corpus.lookup(-400.0, 10.0).is_empty());
    }

    #[test]
    fn nearest_and_threshold_queries() {
        let corpus = corpus(&[
            "a,N,X,X,X,X,X,1,,,,,,,,,,,,-100.0,0.1",
            "b,O,X,X,X,X,X,1,,,,,,,,,,,,-130.0,0.1",
            "c,S,X,X,X,X,X,1,,,,,,,,,,,,-20.0,0.1",
        ]);
        let nearest: Vec<_> = corpus
            .nearest(-120.0, 2)
            .iter()
            .map(|h| h.record.file_name.clone().unwrap())
            .collect();
        assert_eq!(nearest, vec!["b", "a"]);
        assert_eq!(corpus.at_or_below(-120.0).len(), 1);
    }

    #[test]
    fn missing_required_column_fails_at_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("GA.csv");
        fs::write(&path, "L1,L2,L3,L4,L5,L6,D1,D2,D3,D4,D5,D6,zfs\n").unwrap();
        let err = Corpus::load(&path, "opt_zfs").unwrap_err();
        assert!(matches!(err, CorpusError::MissingColumn { ref column, .. } if column == "opt_zfs"));

        fs::write(&path, "L1,L2,L3,L4,L5,D1,D2,D3,D4,D5,D6,zfs\n").unwrap();
        let err = Corpus::load(&path, "zfs").unwrap_err();
        assert!(matches!(err, CorpusError::MissingColumn { ref column, .. } if column == "L6"));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempdir().unwrap();
        let err = Corpus::load(&dir.path().join("absent.csv"), "zfs").unwrap_err();
        assert!(matches!(err, CorpusError::Io { .. }));
    }
}
