use super::publish::publish_csv;
use crate::core::corpus::{Corpus, CorpusHit, CorpusRecord};
use crate::core::models::elite::EliteRecord;
use crate::core::models::lineage::LineageRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

pub const LIGAND_DONOR_MODES: &str = "ligand_donor_modes.csv";
pub const MUTATED_LIGANDS: &str = "mutated_ligands.csv";
pub const MUTATION_LINEAGE: &str = "mutation_lineage.csv";
pub const GENERATED_COMPLEXES: &str = "generated_complexes.csv";
pub const ELITE_PARENTS: &str = "elite_parents.csv";
pub const RETRIEVED_SOLUTION: &str = "retrieved_solution.csv";
pub const SEED_COMPLEXES: &str = "seed_complexes.csv";
pub const SEED_LIGANDS: &str = "seed_ligands.csv";

const LIGAND_SEPARATOR: &str = ";";

#[derive(Debug, Error)]
pub enum CsvArtifactError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("CSV parsing error for '{path}': {source}")]
    Csv { path: String, source: csv::Error },
    #[error("Malformed row {row} in '{path}': {message}")]
    Malformed {
        path: String,
        row: usize,
        message: String,
    },
}

fn display(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

fn read_rows<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>, CsvArtifactError> {
    let csv_error = |source| CsvArtifactError::Csv {
        path: display(path),
        source,
    };
    let mut reader = csv::Reader::from_path(path).map_err(csv_error)?;
    reader
        .deserialize::<T>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(csv_error)
}

/// Formats donor counts the way the artifacts have always carried them:
/// `[4, 1, 1]`.
pub fn format_donor_list(counts: &[u8]) -> String {
    let inner: Vec<String> = counts.iter().map(u8::to_string).collect();
    format!("[{}]", inner.join(", "))
}

pub fn parse_donor_list(text: &str) -> Option<Vec<u8>> {
    let inner = text.trim().strip_prefix('[')?.strip_suffix(']')?;
    if inner.trim().is_empty() {
        return Some(Vec::new());
    }
    inner
        .split(',')
        .map(|part| part.trim().parse::<u8>().ok())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct LigandModeRow {
    smiles: String,
    donors: u8,
}

/// Writes one `smiles,donors` row per supported donor count.
pub fn write_ligand_modes(path: &Path, rows: &[(String, u8)]) -> Result<(), CsvArtifactError> {
    publish_csv(path, |writer| {
        writer.write_record(["smiles", "donors"])?;
        for (smiles, donors) in rows {
            writer.write_record([smiles.as_str(), &donors.to_string()])?;
        }
        Ok(())
    })
}

pub fn read_ligand_modes(path: &Path) -> Result<Vec<(String, u8)>, CsvArtifactError> {
    Ok(read_rows::<LigandModeRow>(path)?
        .into_iter()
        .map(|row| (row.smiles, row.donors))
        .collect())
}

/// Merges `records` into the lineage file: existing rows first, then new
/// ones, keeping the first occurrence of every record. Returns the number of
/// rows written.
pub fn merge_lineage(path: &Path, records: &[LineageRecord]) -> Result<usize, CsvArtifactError> {
    let existing: Vec<LineageRecord> = if path.exists() {
        read_rows(path)?
    } else {
        Vec::new()
    };

    let mut seen = HashSet::new();
    let merged: Vec<&LineageRecord> = existing
        .iter()
        .chain(records)
        .filter(|record| seen.insert(*record))
        .collect();

    publish_csv(path, |writer| {
        writer.write_record(["parent", "child", "mutation", "generation"])?;
        for record in &merged {
            writer.write_record([
                record.parent.as_str(),
                record.child.as_str(),
                record.operator.as_str(),
                &record.generation.to_string(),
            ])?;
        }
        Ok(())
    })?;
    Ok(merged.len())
}

pub fn read_lineage(path: &Path) -> Result<Vec<LineageRecord>, CsvArtifactError> {
    read_rows(path)
}

/// One assembled complex in its external form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexRow {
    pub ligands: Vec<String>,
    pub donor_counts: Vec<u8>,
}

pub fn write_generated_complexes(path: &Path, rows: &[ComplexRow]) -> Result<(), CsvArtifactError> {
    publish_csv(path, |writer| {
        writer.write_record(["ligands", "donor_list", "donor_sum"])?;
        for row in rows {
            let sum: u32 = row.donor_counts.iter().map(|&c| u32::from(c)).sum();
            writer.write_record([
                row.ligands.join(LIGAND_SEPARATOR),
                format_donor_list(&row.donor_counts),
                sum.to_string(),
            ])?;
        }
        Ok(())
    })
}

#[derive(Debug, Serialize, Deserialize)]
struct EliteRow {
    ligands: String,
    donor_list: String,
    donor_sum: u32,
    zfs_pred: f64,
    ed_pred: f64,
    abs_err: f64,
}

/// Publishes the elite set atomically, in the order given.
pub fn write_elites(path: &Path, elites: &[EliteRecord]) -> Result<(), CsvArtifactError> {
    publish_csv(path, |writer| {
        for elite in elites {
            writer.serialize(EliteRow {
                ligands: elite.ligands.join(LIGAND_SEPARATOR),
                donor_list: format_donor_list(&elite.donor_counts),
                donor_sum: elite.donor_sum(),
                zfs_pred: elite.zfs_pred,
                ed_pred: elite.ed_pred,
                abs_err: elite.abs_err,
            })?;
        }
        if elites.is_empty() {
            writer.write_record(["ligands", "donor_list", "donor_sum", "zfs_pred", "ed_pred", "abs_err"])?;
        }
        Ok(())
    })
}

pub fn read_elites(path: &Path) -> Result<Vec<EliteRecord>, CsvArtifactError> {
    read_rows::<EliteRow>(path)?
        .into_iter()
        .enumerate()
        .map(|(index, row)| {
            let malformed = |message: String| CsvArtifactError::Malformed {
                path: display(path),
                row: index + 1,
                message,
            };
            let ligands: Vec<String> = row
                .ligands
                .split(LIGAND_SEPARATOR)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            let donor_counts = parse_donor_list(&row.donor_list)
                .ok_or_else(|| malformed(format!("invalid donor list '{}'", row.donor_list)))?;
            if donor_counts.len() != ligands.len() {
                return Err(malformed(format!(
                    "{} ligands but {} donor counts",
                    ligands.len(),
                    donor_counts.len()
                )));
            }
            Ok(EliteRecord {
                ligands,
                donor_counts,
                zfs_pred: row.zfs_pred,
                ed_pred: row.ed_pred,
                abs_err: row.abs_err,
            })
        })
        .collect()
}

/// Writes direct hits as the corpus rows they came from plus a `dist` column.
pub fn write_retrieved(path: &Path, corpus: &Corpus, hits: &[CorpusHit<'_>]) -> Result<(), CsvArtifactError> {
    publish_csv(path, |writer| {
        let mut header = corpus.headers().clone();
        header.push_field("dist");
        writer.write_record(&header)?;
        for hit in hits {
            let mut row = hit.record.raw().clone();
            row.push_field(&hit.distance.to_string());
            writer.write_record(&row)?;
        }
        Ok(())
    })
}

/// Writes corpus rows verbatim under the corpus header.
pub fn write_corpus_rows(path: &Path, corpus: &Corpus, rows: &[&CorpusRecord]) -> Result<(), CsvArtifactError> {
    publish_csv(path, |writer| {
        writer.write_record(corpus.headers())?;
        for record in rows {
            writer.write_record(record.raw())?;
        }
        Ok(())
    })
}

pub fn write_smiles_list(path: &Path, smiles: &[String]) -> Result<(), CsvArtifactError> {
    publish_csv(path, |writer| {
        writer.write_record(["smiles"])?;
        for entry in smiles {
            writer.write_record([entry])?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::lineage::MutationOperator;
    use std::fs;
    use tempfile::tempdir;

    fn elite(ligands: &[&str], counts: &[u8], zfs: f64, ed: f64, target: f64) -> EliteRecord {
        EliteRecord {
            ligands: ligands.iter().map(|s| s.to_string()).collect(),
            donor_counts: counts.to_vec(),
            zfs_pred: zfs,
            ed_pred: ed,
            abs_err: (zfs - target).abs(),
        }
    }

    #[test]
    fn donor_list_format_round_trips() {
        assert_eq!(format_donor_list(&[4, 1, 1]), "[4, 1, 1]");
        assert_eq!(parse_donor_list("[4, 1, 1]"), Some(vec![4, 1, 1]));
        assert_eq!(parse_donor_list("[6]"), Some(vec![6]));
        assert_eq!(parse_donor_list("4, 1"), None);
        assert_eq!(parse_donor_list("[4, x]"), None);
    }

    #[test]
    fn elites_survive_a_write_read_cycle() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(ELITE_PARENTS);
        let elites = vec![
            elite(&["c1ccncc1", "Cl", "Br"], &[4, 1, 1], -181.25, 0.05, -180.0),
            elite(&["CC(=O)O", "N#CC"], &[3, 3], -150.5, 0.2199, -180.0),
        ];
        write_elites(&path, &elites).unwrap();
        let read = read_elites(&path).unwrap();
        assert_eq!(read, elites);
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("ligands,donor_list,donor_sum,zfs_pred,ed_pred,abs_err\n"));
        assert!(text.contains("c1ccncc1;Cl;Br,\"[4, 1, 1]\",6,"));
    }

    #[test]
    fn empty_elite_file_still_has_a_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(ELITE_PARENTS);
        write_elites(&path, &[]).unwrap();
        assert!(read_elites(&path).unwrap().is_empty());
    }

    #[test]
    fn malformed_elite_rows_are_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(ELITE_PARENTS);
        fs::write(
            &path,
            "ligands,donor_list,donor_sum,zfs_pred,ed_pred,abs_err\nN;O,[3],3,-1.0,0.1,1.0\n",
        )
        .unwrap();
        assert!(matches!(
            read_elites(&path),
            Err(CsvArtifactError::Malformed { row: 1, .. })
        ));
    }

    #[test]
    fn lineage_merge_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(MUTATION_LINEAGE);
        let records = vec![
            LineageRecord {
                parent: "c1ccncc1".into(),
                child: "Cc1ccncc1".into(),
                operator: MutationOperator::MethylAddition,
                generation: 1,
            },
            LineageRecord {
                parent: "CO".into(),
                child: "CS".into(),
                operator: MutationOperator::AtomTypeSubstitution,
                generation: 1,
            },
        ];
        assert_eq!(merge_lineage(&path, &records).unwrap(), 2);
        let first = fs::read_to_string(&path).unwrap();
        assert_eq!(merge_lineage(&path, &records).unwrap(), 2);
        assert_eq!(fs::read_to_string(&path).unwrap(), first);
        assert_eq!(read_lineage(&path).unwrap(), records);
        assert!(first.starts_with("parent,child,mutation,generation\n"));
        assert!(first.contains("c1ccncc1,Cc1ccncc1,methyl_addition,1"));
    }

    #[test]
    fn ligand_modes_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(LIGAND_DONOR_MODES);
        let rows = vec![("N".to_string(), 1), ("N".to_string(), 2), ("O".to_string(), 1)];
        write_ligand_modes(&path, &rows).unwrap();
        assert_eq!(read_ligand_modes(&path).unwrap(), rows);
    }

    #[test]
    fn generated_complexes_use_separator_and_list_format() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(GENERATED_COMPLEXES);
        let rows = vec![ComplexRow {
            ligands: vec!["N".into(), "O".into()],
            donor_counts: vec![3, 3],
        }];
        write_generated_complexes(&path, &rows).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "ligands,donor_list,donor_sum\nN;O,\"[3, 3]\",6\n"
        );
    }

    #[test]
    fn retrieved_rows_append_distance() {
        use crate::core::corpus::tests::corpus;
        let dir = tempdir().unwrap();
        let path = dir.path().join(RETRIEVED_SOLUTION);
        let corpus = corpus(&["a,N,X,X,X,X,X,1,,,,,,,,,,,,-182.0,0.1"]);
        let hits = corpus.lookup(-180.0, 10.0);
        write_retrieved(&path, &corpus, &hits).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().ends_with(",zfs,E/D,dist"));
        assert!(lines.next().unwrap().ends_with(",-182.0,0.1,2"));
    }
}
