use super::lookup::{self, DirectHit};
use crate::core::corpus::Corpus;
use crate::core::io::artifacts::{self, ComplexRow};
use crate::core::models::complex::{ComplexCandidate, ScoredCandidate};
use crate::core::models::elite::EliteRecord;
use crate::core::models::ids::LigandId;
use crate::core::models::ligand::{LigandLibrary, LigandOrigin};
use crate::core::oracle::{Evaluator, Oracle, OracleError};
use crate::engine::config::SearchConfig;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::sink::{ArtifactStore, DirectoryMirror};
use crate::engine::state::{EliteSnapshot, PatternMemory};
use crate::engine::tasks::donor_index::{self, DonorIndex};
use crate::engine::tasks::selection::SelectionOutcome;
use crate::engine::tasks::{assembly, evaluation, mutation, selection};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, error, info, instrument, warn};

/// The states of the generational driver.
///
/// `DbLookup` either ends the run with direct hits or hands over to
/// `Seeding` (fresh run) or `Mutate` (resumed run). Each generation then
/// walks `Mutate → Assemble → Evaluate → Select → CheckTarget`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverState {
    DbLookup,
    Seeding,
    Mutate,
    Assemble,
    Evaluate,
    Select,
    CheckTarget,
    TargetAchieved,
    BudgetExhausted,
    Failed,
}

impl DriverState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            DriverState::TargetAchieved | DriverState::BudgetExhausted | DriverState::Failed
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DriverState::DbLookup => "DB_LOOKUP",
            DriverState::Seeding => "SEEDING",
            DriverState::Mutate => "MUTATE",
            DriverState::Assemble => "ASSEMBLE",
            DriverState::Evaluate => "EVALUATE",
            DriverState::Select => "SELECT",
            DriverState::CheckTarget => "CHECK_TARGET",
            DriverState::TargetAchieved => "TARGET_ACHIEVED",
            DriverState::BudgetExhausted => "BUDGET_EXHAUSTED",
            DriverState::Failed => "FAILED",
        }
    }
}

impl fmt::Display for DriverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a search that reached the genetic algorithm stopped.
#[derive(Debug)]
pub enum Termination {
    TargetAchieved,
    BudgetExhausted,
    Failed(EngineError),
}

impl Termination {
    pub fn is_failure(&self) -> bool {
        matches!(self, Termination::Failed(_))
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::TargetAchieved => f.write_str("target achieved"),
            Termination::BudgetExhausted => f.write_str("generation budget exhausted"),
            Termination::Failed(e) => write!(f, "failed: {e}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSummary {
    pub generation: u32,
    pub candidates: usize,
    /// Zero when no candidate passed the E/D filter.
    pub survivors: usize,
    pub snapshot_version: u64,
    pub best: Option<EliteRecord>,
}

#[derive(Debug)]
pub struct GaReport {
    pub termination: Termination,
    /// Generations started, including a failed one.
    pub generations: u32,
    pub elites: EliteSnapshot,
    pub patterns: PatternMemory,
    pub history: Vec<GenerationSummary>,
    /// Every state the driver entered, in order.
    pub trace: Vec<DriverState>,
}

impl GaReport {
    /// The best elite at termination, if any generation produced one.
    pub fn best(&self) -> Option<&EliteRecord> {
        self.elites.best()
    }
}

#[derive(Debug)]
pub enum SearchOutcome {
    /// The corpus already holds complexes close enough to the target.
    DirectHit(Vec<DirectHit>),
    Ga(GaReport),
}

/// Produces the evaluator on first use, so direct hits never touch the model
/// artifacts.
pub type EvaluatorLoader<'a> = Box<dyn FnOnce() -> Result<Box<dyn Evaluator>, OracleError> + 'a>;

/// Runs the full search with the GNN oracle described by `config.oracle`.
#[instrument(skip_all, name = "search_workflow")]
pub fn run(
    config: &SearchConfig,
    reporter: &ProgressReporter,
) -> Result<SearchOutcome, EngineError> {
    let loader: EvaluatorLoader<'_> = Box::new(|| {
        let oracle =
            Oracle::load(&config.oracle.artifacts)?.with_chunk_size(config.oracle.chunk_size);
        Ok(Box::new(oracle) as Box<dyn Evaluator>)
    });
    run_with_evaluator(config, loader, reporter)
}

/// Runs the full search, scoring candidates with whatever `loader` yields.
///
/// Errors before the genetic algorithm starts (unreadable corpus, unwritable
/// work directory) are returned as `Err`. Once generations are running,
/// failures end the run with [`Termination::Failed`] and the elites gathered
/// so far.
pub fn run_with_evaluator(
    config: &SearchConfig,
    loader: EvaluatorLoader<'_>,
    reporter: &ProgressReporter,
) -> Result<SearchOutcome, EngineError> {
    let mut store = ArtifactStore::new(&config.artifacts.work_dir);
    if let Some(mirror) = &config.artifacts.mirror_dir {
        store = store.with_sink(Box::new(DirectoryMirror::new(mirror)));
    }

    info!(
        target = config.target_zfs,
        profile = %config.profile,
        work_dir = %config.artifacts.work_dir.display(),
        "Starting ZFS search."
    );
    let corpus = Corpus::load(&config.lookup.corpus_path, &config.lookup.zfs_column)?;

    let hits = lookup::retrieve(
        &corpus,
        config.target_zfs,
        config.lookup.tolerance,
        &store,
        reporter,
    )?;
    if !hits.is_empty() {
        info!(hits = hits.len(), "Target already present in the corpus.");
        return Ok(SearchOutcome::DirectHit(hits));
    }

    let mut driver = Driver::prepare(config, &corpus, store, loader, reporter)?;
    Ok(SearchOutcome::Ga(driver.drive()))
}

/// Everything carried across generations.
struct Driver<'a, 'r> {
    config: &'a SearchConfig,
    corpus: &'a Corpus,
    reporter: &'a ProgressReporter<'r>,
    store: ArtifactStore,
    index: DonorIndex,
    library: LigandLibrary,
    snapshot: EliteSnapshot,
    memory: PatternMemory,
    rng: StdRng,
    generation: u32,
    resumed: bool,
    seeds: Vec<LigandId>,
    pool: Vec<LigandId>,
    candidates: Vec<ComplexCandidate>,
    scored: Vec<ScoredCandidate>,
    loader: Option<EvaluatorLoader<'a>>,
    evaluator: Option<Box<dyn Evaluator>>,
    history: Vec<GenerationSummary>,
    trace: Vec<DriverState>,
}

impl<'a, 'r> Driver<'a, 'r> {
    fn prepare(
        config: &'a SearchConfig,
        corpus: &'a Corpus,
        store: ArtifactStore,
        loader: EvaluatorLoader<'a>,
        reporter: &'a ProgressReporter<'r>,
    ) -> Result<Self, EngineError> {
        let index = donor_index::run(corpus, reporter);
        let mode_rows = index.library().mode_rows();
        store.publish(artifacts::LIGAND_DONOR_MODES, |path| {
            artifacts::write_ligand_modes(path, &mode_rows)
        })?;

        let mut library = index.library().clone();
        let mut memory = PatternMemory::new(&config.assembly.patterns);
        let snapshot = restore_elites(&store, &mut library)?;
        if let Some(best) = snapshot.best() {
            memory.focus(
                &best.pattern(),
                config.assembly.pattern_boost,
                config.assembly.pattern_weight_cap,
            );
        }

        Ok(Self {
            config,
            corpus,
            reporter,
            store,
            index,
            library,
            resumed: !snapshot.is_empty(),
            snapshot,
            memory,
            rng: StdRng::seed_from_u64(config.seed),
            generation: 1,
            seeds: Vec::new(),
            pool: Vec::new(),
            candidates: Vec::new(),
            scored: Vec::new(),
            loader: Some(loader),
            evaluator: None,
            history: Vec::new(),
            trace: vec![DriverState::DbLookup],
        })
    }

    fn drive(&mut self) -> GaReport {
        let mut state = if self.resumed {
            DriverState::Mutate
        } else {
            DriverState::Seeding
        };
        let mut failure = None;

        loop {
            self.trace.push(state);
            if state.is_terminal() {
                break;
            }
            state = match self.step(state) {
                Ok(next) => next,
                Err(e) => {
                    error!(
                        state = %state,
                        generation = self.generation,
                        error = %e,
                        "Search failed."
                    );
                    failure = Some(e);
                    DriverState::Failed
                }
            };
        }

        let termination = match (state, failure) {
            (DriverState::TargetAchieved, _) => Termination::TargetAchieved,
            (DriverState::BudgetExhausted, _) => Termination::BudgetExhausted,
            (_, Some(e)) => Termination::Failed(e),
            (other, None) => Termination::Failed(EngineError::Internal(format!(
                "driver stopped in non-terminal state {other}"
            ))),
        };
        info!(
            termination = %termination,
            generations = self.generation,
            elites = self.snapshot.len(),
            best_zfs = ?self.snapshot.best().map(|b| b.zfs_pred),
            "Search finished."
        );

        GaReport {
            termination,
            generations: self.generation,
            elites: self.snapshot.clone(),
            patterns: self.memory.clone(),
            history: std::mem::take(&mut self.history),
            trace: std::mem::take(&mut self.trace),
        }
    }

    fn step(&mut self, state: DriverState) -> Result<DriverState, EngineError> {
        match state {
            DriverState::Seeding => {
                self.seed()?;
                Ok(DriverState::Mutate)
            }
            DriverState::Mutate => {
                self.mutate()?;
                Ok(DriverState::Assemble)
            }
            DriverState::Assemble => {
                self.assemble()?;
                Ok(DriverState::Evaluate)
            }
            DriverState::Evaluate => {
                self.evaluate()?;
                Ok(DriverState::Select)
            }
            DriverState::Select => {
                self.select()?;
                Ok(DriverState::CheckTarget)
            }
            DriverState::CheckTarget => Ok(self.check_target()),
            DriverState::DbLookup
            | DriverState::TargetAchieved
            | DriverState::BudgetExhausted
            | DriverState::Failed => Err(EngineError::Internal(format!(
                "no transition out of {state}"
            ))),
        }
    }

    /// Publishes the corpus complexes below the seed threshold and remembers
    /// their ligands as extra first-generation parents.
    fn seed(&mut self) -> Result<(), EngineError> {
        self.reporter.report(Progress::PhaseStart { name: "Seeding" });
        let seeds = self.corpus.at_or_below(self.config.lookup.seed_threshold);
        self.store.publish(artifacts::SEED_COMPLEXES, |path| {
            artifacts::write_corpus_rows(path, self.corpus, &seeds)
        })?;

        let ids: BTreeSet<LigandId> = seeds
            .iter()
            .flat_map(|record| record.ligand_smiles())
            .filter_map(|raw| self.index.resolve(raw))
            .collect();
        let mut smiles: Vec<String> = ids
            .iter()
            .filter_map(|&id| self.library.get(id).map(|l| l.smiles().to_string()))
            .collect();
        smiles.sort();
        self.store.publish(artifacts::SEED_LIGANDS, |path| {
            artifacts::write_smiles_list(path, &smiles)
        })?;

        if seeds.is_empty() {
            warn!(
                threshold = self.config.lookup.seed_threshold,
                "No corpus complex lies below the seed threshold."
            );
        }
        info!(complexes = seeds.len(), ligands = smiles.len(), "Seeding complete.");
        self.seeds = ids.into_iter().collect();
        self.reporter.report(Progress::PhaseFinish);
        Ok(())
    }

    fn mutate(&mut self) -> Result<(), EngineError> {
        info!(generation = self.generation, "Starting generation.");
        let mut remembered: Vec<LigandId> = self
            .snapshot
            .ligands()
            .into_iter()
            .filter_map(|smiles| self.library.id_of(smiles))
            .collect();
        if self.generation == 1 {
            remembered.extend(self.seeds.iter().copied());
        }

        let parents = mutation::select_parents(
            self.corpus,
            &self.index,
            &self.library,
            self.config.target_zfs,
            self.config.mutation.anchor_count,
            &remembered,
        );
        if parents.is_empty() {
            warn!(generation = self.generation, "No parents to mutate this generation.");
        }

        let outcome = mutation::run(
            &parents,
            &mut self.library,
            &self.config.mutation.operators,
            self.generation,
            &mut self.rng,
            self.reporter,
        );

        let mutated: Vec<(String, u8)> = outcome
            .pool
            .iter()
            .filter_map(|&id| self.library.get(id))
            .flat_map(|ligand| {
                ligand
                    .donor_modes()
                    .iter()
                    .map(move |&mode| (ligand.smiles().to_string(), mode))
            })
            .collect();
        self.store.publish(artifacts::MUTATED_LIGANDS, |path| {
            artifacts::write_ligand_modes(path, &mutated)
        })?;
        self.store.publish(artifacts::MUTATION_LINEAGE, |path| {
            let rows = artifacts::merge_lineage(path, &outcome.lineage)?;
            debug!(rows, "Lineage merged.");
            Ok(())
        })?;

        self.pool = self.library.sorted_ids();
        Ok(())
    }

    fn assemble(&mut self) -> Result<(), EngineError> {
        self.candidates = assembly::run(
            &self.pool,
            &self.library,
            &self.memory,
            &self.config.assembly,
            &mut self.rng,
            self.reporter,
        )?;

        if self.config.artifacts.write_generated_complexes {
            let rows: Vec<ComplexRow> = self
                .candidates
                .iter()
                .map(|candidate| ComplexRow {
                    ligands: candidate
                        .smiles(&self.library)
                        .into_iter()
                        .map(str::to_string)
                        .collect(),
                    donor_counts: candidate.slots().iter().map(|s| s.donor_count).collect(),
                })
                .collect();
            self.store.publish(artifacts::GENERATED_COMPLEXES, |path| {
                artifacts::write_generated_complexes(path, &rows)
            })?;
        }
        Ok(())
    }

    fn evaluate(&mut self) -> Result<(), EngineError> {
        if self.evaluator.is_none() {
            let load = self
                .loader
                .take()
                .ok_or_else(|| {
                    EngineError::Internal("evaluator loader already consumed".to_string())
                })?;
            self.evaluator = Some(load()?);
        }
        let candidates = std::mem::take(&mut self.candidates);
        let evaluator = self
            .evaluator
            .as_deref()
            .ok_or_else(|| EngineError::Internal("evaluator missing after load".to_string()))?;
        self.scored = evaluation::run(evaluator, candidates, &self.library, self.reporter)?;
        Ok(())
    }

    fn select(&mut self) -> Result<(), EngineError> {
        let scored = std::mem::take(&mut self.scored);
        let outcome = selection::run(
            &scored,
            &self.library,
            self.config.target_zfs,
            &self.config.selection,
            self.reporter,
        );

        let survivors = match outcome {
            SelectionOutcome::Survivors(records) => {
                let next = self.snapshot.succeed(records);
                self.store.publish(artifacts::ELITE_PARENTS, |path| {
                    artifacts::write_elites(path, next.records())
                })?;
                self.snapshot = next;
                if let Some(best) = self.snapshot.best() {
                    self.memory.focus(
                        &best.pattern(),
                        self.config.assembly.pattern_boost,
                        self.config.assembly.pattern_weight_cap,
                    );
                }
                self.snapshot.len()
            }
            SelectionOutcome::NoSurvivors { evaluated } => {
                warn!(
                    generation = self.generation,
                    evaluated,
                    ed_cutoff = self.config.selection.ed_cutoff,
                    "No candidate passed the E/D filter; keeping previous elites."
                );
                0
            }
        };

        let best = self.snapshot.best().cloned();
        self.reporter.report(Progress::GenerationFinished {
            generation: self.generation,
            survivors,
            best_zfs: best.as_ref().map(|b| b.zfs_pred),
        });
        self.history.push(GenerationSummary {
            generation: self.generation,
            candidates: scored.len(),
            survivors,
            snapshot_version: self.snapshot.version(),
            best,
        });
        Ok(())
    }

    fn check_target(&mut self) -> DriverState {
        if let Some(best) = self.snapshot.best() {
            if best.zfs_pred <= self.config.target_zfs {
                info!(
                    generation = self.generation,
                    zfs_pred = best.zfs_pred,
                    target = self.config.target_zfs,
                    "Target reached."
                );
                return DriverState::TargetAchieved;
            }
        }
        if self.generation >= self.config.max_generations {
            return DriverState::BudgetExhausted;
        }
        self.generation += 1;
        DriverState::Mutate
    }
}

/// Loads `elite_parents.csv` from a previous run in the same work directory.
/// Elite ligands the library does not know yet join it with the donor count
/// of the slot they occupied.
fn restore_elites(
    store: &ArtifactStore,
    library: &mut LigandLibrary,
) -> Result<EliteSnapshot, EngineError> {
    let path = store.path(artifacts::ELITE_PARENTS);
    if !path.is_file() {
        return Ok(EliteSnapshot::empty());
    }
    let records = artifacts::read_elites(&path)?;
    for record in &records {
        for (smiles, donor_count) in record.slots() {
            library.insert(smiles, [donor_count], LigandOrigin::Elite);
        }
    }
    if !records.is_empty() {
        info!(
            elites = records.len(),
            path = %path.display(),
            "Resuming from previous elites; seeding skipped."
        );
    }
    Ok(EliteSnapshot::restored(records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::corpus::tests::HEADER;
    use crate::core::io::artifacts::ELITE_PARENTS;
    use crate::core::models::pattern::DonorPattern;
    use crate::engine::config::{SearchConfig, SearchConfigBuilder};
    use std::fs;
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use tempfile::{TempDir, tempdir};

    /// Scores every candidate as `zfs` per donor of its first slot, with a
    /// fixed E/D. Records how many candidates it saw.
    struct Scripted {
        zfs_per_donor: f64,
        ed: f64,
        seen: Arc<Mutex<usize>>,
    }

    impl Evaluator for Scripted {
        fn score(
            &self,
            candidates: Vec<ComplexCandidate>,
            _library: &LigandLibrary,
        ) -> Result<Vec<ScoredCandidate>, OracleError> {
            *self.seen.lock().unwrap() += candidates.len();
            Ok(candidates
                .into_iter()
                .map(|candidate| {
                    let first = f64::from(candidate.slots()[0].donor_count);
                    ScoredCandidate {
                        candidate,
                        zfs_pred: self.zfs_per_donor * first,
                        ed_pred: self.ed,
                    }
                })
                .collect())
        }
    }

    fn scripted(zfs_per_donor: f64, ed: f64) -> (EvaluatorLoader<'static>, Arc<Mutex<usize>>) {
        let seen = Arc::new(Mutex::new(0));
        let counter = seen.clone();
        let loader: EvaluatorLoader<'static> = Box::new(move || {
            Ok(Box::new(Scripted {
                zfs_per_donor,
                ed,
                seen: counter,
            }) as Box<dyn Evaluator>)
        });
        (loader, seen)
    }

    fn write_corpus(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("GA.csv");
        let rows = [
            "a.xyz,c1ccncc1,c1ccncc1,O,O,Cl,Cl,1,1,1,1,1,1,N,N,O,O,Cl,Cl,-182.0,0.1",
            "b.xyz,NCCN,NCCN,O,O,X,X,2,2,1,1,,,N,N,O,O,X,X,-140.0,0.1",
            "c.xyz,OC(=O)CN(CC(=O)O)CC(=O)O,NCCNCCN,N,X,X,X,3,3,1,,,,O,N,N,X,X,X,-95.0,0.2",
            "d.xyz,c1ccc(-c2ccccn2)nc1,c1ccc(-c2ccccn2)nc1,Br,Br,X,X,2,2,1,1,,,N,N,Br,Br,X,X,-60.0,0.1",
        ];
        fs::write(&path, format!("{HEADER}\n{}\n", rows.join("\n"))).unwrap();
        path
    }

    fn config(dir: &TempDir, target: f64) -> SearchConfig {
        SearchConfigBuilder::new()
            .target_zfs(target)
            .corpus_path(write_corpus(dir.path()))
            .model_dir(dir.path().join("models"))
            .work_dir(dir.path().join("work"))
            .batch_size(40)
            .max_generations(2)
            .build()
            .unwrap()
    }

    #[test]
    fn direct_hit_skips_the_ga_and_the_models() {
        let dir = tempdir().unwrap();
        let config = config(&dir, -180.0);
        let loader: EvaluatorLoader<'static> = Box::new(|| {
            Err(OracleError::MissingArtifact {
                path: "never loaded".to_string(),
            })
        });

        let outcome = run_with_evaluator(&config, loader, &ProgressReporter::new()).unwrap();
        let SearchOutcome::DirectHit(hits) = outcome else {
            panic!("expected a direct hit");
        };
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].distance, 2.0);
        assert!(config.artifacts.work_dir.join(artifacts::RETRIEVED_SOLUTION).exists());
        assert!(!config.artifacts.work_dir.join(ELITE_PARENTS).exists());
    }

    #[test]
    fn budget_is_spent_when_the_target_is_never_reached() {
        let dir = tempdir().unwrap();
        let config = config(&dir, -400.0);
        let (loader, seen) = scripted(-10.0, 0.1);

        let outcome = run_with_evaluator(&config, loader, &ProgressReporter::new());
        let SearchOutcome::Ga(report) = outcome.unwrap() else {
            panic!("expected a GA run");
        };
        assert!(matches!(report.termination, Termination::BudgetExhausted));
        assert_eq!(report.generations, 2);
        assert_eq!(*seen.lock().unwrap(), 80);
        assert_eq!(report.history.len(), 2);
        assert_eq!(report.elites.version(), 2);
        assert_eq!(
            report.trace,
            vec![
                DriverState::DbLookup,
                DriverState::Seeding,
                DriverState::Mutate,
                DriverState::Assemble,
                DriverState::Evaluate,
                DriverState::Select,
                DriverState::CheckTarget,
                DriverState::Mutate,
                DriverState::Assemble,
                DriverState::Evaluate,
                DriverState::Select,
                DriverState::CheckTarget,
                DriverState::BudgetExhausted,
            ]
        );
        for elite in report.elites.records() {
            assert_eq!(elite.donor_sum(), 6);
        }
        for name in [
            artifacts::LIGAND_DONOR_MODES,
            artifacts::SEED_COMPLEXES,
            artifacts::SEED_LIGANDS,
            artifacts::MUTATED_LIGANDS,
            artifacts::MUTATION_LINEAGE,
            artifacts::GENERATED_COMPLEXES,
            ELITE_PARENTS,
        ] {
            assert!(config.artifacts.work_dir.join(name).exists(), "{name}");
        }
    }

    #[test]
    fn crossing_the_target_stops_the_run() {
        let dir = tempdir().unwrap();
        let mut config = config(&dir, -400.0);
        config.max_generations = 10;
        // Slots are filled largest donor count first, so any candidate led by
        // a tridentate ligand scores -450.
        let (loader, _) = scripted(-150.0, 0.1);

        let outcome = run_with_evaluator(&config, loader, &ProgressReporter::new());
        let SearchOutcome::Ga(report) = outcome.unwrap() else {
            panic!("expected a GA run");
        };
        assert!(matches!(report.termination, Termination::TargetAchieved));
        assert!(report.best().unwrap().zfs_pred <= -400.0);
        assert_eq!(report.trace.last(), Some(&DriverState::TargetAchieved));
    }

    #[test]
    fn failing_evaluator_ends_in_failed() {
        let dir = tempdir().unwrap();
        let config = config(&dir, -400.0);
        let loader: EvaluatorLoader<'static> = Box::new(|| Err(OracleError::InconsistentGraphs));

        let outcome = run_with_evaluator(&config, loader, &ProgressReporter::new());
        let SearchOutcome::Ga(report) = outcome.unwrap() else {
            panic!("expected a GA run");
        };
        assert!(report.termination.is_failure());
        assert_eq!(report.generations, 1);
        assert!(report.elites.is_empty());
        assert_eq!(
            &report.trace[report.trace.len() - 2..],
            &[DriverState::Evaluate, DriverState::Failed]
        );
    }

    #[test]
    fn high_ed_leaves_memory_untouched() {
        let dir = tempdir().unwrap();
        let config = config(&dir, -400.0);
        let (loader, _) = scripted(-10.0, 0.30);

        let outcome = run_with_evaluator(&config, loader, &ProgressReporter::new());
        let SearchOutcome::Ga(report) = outcome.unwrap() else {
            panic!("expected a GA run");
        };
        assert!(matches!(report.termination, Termination::BudgetExhausted));
        assert!(report.elites.is_empty());
        assert_eq!(report.elites.version(), 0);
        assert!(report.history.iter().all(|g| g.survivors == 0));
        assert_eq!(report.patterns, PatternMemory::new(&DonorPattern::hexacoordinate_vocabulary()));
        assert!(!config.artifacts.work_dir.join(ELITE_PARENTS).exists());
    }

    #[test]
    fn second_run_resumes_from_published_elites() {
        let dir = tempdir().unwrap();
        let config = config(&dir, -400.0);
        let (loader, _) = scripted(-10.0, 0.1);
        let outcome = run_with_evaluator(&config, loader, &ProgressReporter::new());
        let SearchOutcome::Ga(first) = outcome.unwrap() else {
            panic!("expected a GA run");
        };

        let (loader, _) = scripted(-10.0, 0.1);
        let outcome = run_with_evaluator(&config, loader, &ProgressReporter::new());
        let SearchOutcome::Ga(second) = outcome.unwrap() else {
            panic!("expected a GA run");
        };
        assert_eq!(second.trace[1], DriverState::Mutate);
        assert!(!second.trace.contains(&DriverState::Seeding));
        assert!(second.elites.len() >= 1);
        assert_eq!(first.elites.version(), 2);
        assert_eq!(second.elites.version(), 2);
    }
}
