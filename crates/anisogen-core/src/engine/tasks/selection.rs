use crate::core::models::complex::ScoredCandidate;
use crate::core::models::elite::EliteRecord;
use crate::core::models::ligand::LigandLibrary;
use crate::engine::config::SelectionConfig;
use crate::engine::progress::{Progress, ProgressReporter};
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum SelectionOutcome {
    /// The new elite set, closest to the target first.
    Survivors(Vec<EliteRecord>),
    /// No candidate passed the E/D cutoff.
    NoSurvivors { evaluated: usize },
}

/// Number of elites kept from `passing` survivors: the given fraction,
/// rounded down, but never fewer than one.
pub fn elite_count(passing: usize, fraction: f64) -> usize {
    ((passing as f64 * fraction).floor() as usize).clamp(1, passing.max(1))
}

/// Drops candidates whose predicted E/D exceeds the cutoff (or whose
/// predictions are not finite), ranks the rest by `|zfs_pred - target|` and
/// keeps the top fraction.
#[instrument(skip_all, name = "selection_task")]
pub fn run(
    scored: &[ScoredCandidate],
    library: &LigandLibrary,
    target: f64,
    config: &SelectionConfig,
    reporter: &ProgressReporter,
) -> SelectionOutcome {
    reporter.report(Progress::PhaseStart { name: "Selection" });

    let mut passing: Vec<EliteRecord> = scored
        .iter()
        .filter(|s| s.zfs_pred.is_finite() && s.ed_pred.is_finite())
        .filter(|s| s.ed_pred <= config.ed_cutoff)
        .map(|s| EliteRecord::from_scored(s, library, target))
        .collect();

    let outcome = if passing.is_empty() {
        warn!(
            evaluated = scored.len(),
            ed_cutoff = config.ed_cutoff,
            "No candidate passed the E/D cutoff."
        );
        SelectionOutcome::NoSurvivors {
            evaluated: scored.len(),
        }
    } else {
        let keep = elite_count(passing.len(), config.elite_fraction);
        passing.sort_by(|a, b| a.abs_err.total_cmp(&b.abs_err));
        info!(
            passing = passing.len(),
            elites = keep,
            best_zfs = passing[0].zfs_pred,
            best_abs_err = passing[0].abs_err,
            "Selection complete."
        );
        passing.truncate(keep);
        SelectionOutcome::Survivors(passing)
    };
    reporter.report(Progress::PhaseFinish);
    outcome
}
