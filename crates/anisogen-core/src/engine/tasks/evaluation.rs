use crate::core::models::complex::{ComplexCandidate, ScoredCandidate};
use crate::core::models::ligand::LigandLibrary;
use crate::core::oracle::Evaluator;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use tracing::{info, instrument};

/// Scores the whole batch. Any evaluator failure aborts the generation.
#[instrument(skip_all, name = "evaluation_task")]
pub fn run(
    evaluator: &dyn Evaluator,
    candidates: Vec<ComplexCandidate>,
    library: &LigandLibrary,
    reporter: &ProgressReporter,
) -> Result<Vec<ScoredCandidate>, EngineError> {
    reporter.report(Progress::PhaseStart { name: "Evaluation" });
    let requested = candidates.len();

    let scored = evaluator.score(candidates, library)?;
    if scored.len() != requested {
        return Err(EngineError::PhaseFailed {
            phase: "Evaluation",
            reason: format!("evaluator returned {} scores for {requested} candidates", scored.len()),
        });
    }

    let (min_zfs, max_zfs) = scored.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), s| {
        (lo.min(s.zfs_pred), hi.max(s.zfs_pred))
    });
    info!(candidates = scored.len(), min_zfs, max_zfs, "Evaluation complete.");
    reporter.report(Progress::PhaseFinish);
    Ok(scored)
}
