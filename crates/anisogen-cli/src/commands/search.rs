use crate::cli::SearchArgs;
use crate::config::build_search_config;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use anisogen::core::io::artifacts::{ELITE_PARENTS, RETRIEVED_SOLUTION};
use anisogen::core::models::elite::EliteRecord;
use anisogen::engine::progress::ProgressReporter;
use anisogen::workflows::lookup::DirectHit;
use anisogen::workflows::search::{self, GaReport, SearchOutcome, Termination};
use std::path::Path;
use tracing::{info, warn};

pub fn run(args: SearchArgs) -> Result<()> {
    let config = build_search_config(&args)?;
    info!(
        target = config.target_zfs,
        profile = %config.profile,
        corpus = %config.lookup.corpus_path.display(),
        work_dir = %config.artifacts.work_dir.display(),
        "Resolved search configuration."
    );

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Searching for ZFS {:.2} ({} profile)...", config.target_zfs, config.profile);
    match search::run(&config, &reporter)? {
        SearchOutcome::DirectHit(hits) => {
            print_hits(&hits, &config.artifacts.work_dir);
            Ok(())
        }
        SearchOutcome::Ga(report) => {
            print_report(&report, &config.artifacts.work_dir);
            match report.termination {
                Termination::Failed(e) => Err(CliError::SearchFailed(e.to_string())),
                _ => Ok(()),
            }
        }
    }
}

pub(crate) fn print_hits(hits: &[DirectHit], work_dir: &Path) {
    println!("Found {} complex(es) in the corpus within tolerance:", hits.len());
    for hit in hits {
        let ligands = hit
            .slots
            .iter()
            .map(|(smiles, count)| match count {
                Some(c) => format!("{smiles} ({c})"),
                None => smiles.clone(),
            })
            .collect::<Vec<_>>()
            .join(", ");
        println!(
            "  {:<16} ZFS {:>9.2}  |Δ| {:>6.2}  {}",
            hit.file_name.as_deref().unwrap_or("-"),
            hit.zfs,
            hit.distance,
            ligands
        );
    }
    println!("Written to: {}", work_dir.join(RETRIEVED_SOLUTION).display());
}

fn describe(elite: &EliteRecord) -> String {
    elite
        .slots()
        .map(|(smiles, count)| format!("{smiles} ({count})"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_report(report: &GaReport, work_dir: &Path) {
    println!(
        "Search stopped after {} generation(s): {}.",
        report.generations, report.termination
    );
    match report.best() {
        Some(best) => {
            println!(
                "Best complex: ZFS {:.2}, E/D {:.3}, |Δ| {:.2}",
                best.zfs_pred, best.ed_pred, best.abs_err
            );
            println!("  {}", describe(best));
            println!(
                "{} elite(s) written to: {}",
                report.elites.len(),
                work_dir.join(ELITE_PARENTS).display()
            );
        }
        None => {
            warn!("The search produced no elites.");
            println!("Warning: no candidate survived the E/D filter.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elites_are_described_slot_by_slot() {
        let elite = EliteRecord {
            ligands: vec!["NCCN".to_string(), "O".to_string(), "Cl".to_string()],
            donor_counts: vec![4, 1, 1],
            zfs_pred: -401.0,
            ed_pred: 0.05,
            abs_err: 1.0,
        };
        assert_eq!(describe(&elite), "NCCN (4), O (1), Cl (1)");
    }
}
