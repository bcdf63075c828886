use crate::core::models::complex::{ComplexCandidate, LigandSlot};
use crate::core::models::ids::LigandId;
use crate::core::models::ligand::LigandLibrary;
use crate::core::models::pattern::DonorPattern;
use crate::engine::config::AssemblyConfig;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::state::PatternMemory;
use crate::engine::utils::sampling::softmax;
use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

/// Ligands grouped by the donor counts they support, each group ordered as
/// the input pool.
fn pools_by_donor_count(pool: &[LigandId], library: &LigandLibrary) -> BTreeMap<u8, Vec<LigandId>> {
    let mut pools: BTreeMap<u8, Vec<LigandId>> = BTreeMap::new();
    for &id in pool {
        if let Some(ligand) = library.get(id) {
            for &mode in ligand.donor_modes() {
                pools.entry(mode).or_default().push(id);
            }
        }
    }
    pools
}

/// Fills every slot of `pattern` with a distinct ligand supporting that slot's
/// donor count, or gives up as soon as a slot has no eligible ligand.
fn try_assemble(
    pattern: &DonorPattern,
    pools: &BTreeMap<u8, Vec<LigandId>>,
    rng: &mut impl Rng,
) -> Option<ComplexCandidate> {
    let mut slots: Vec<LigandSlot> = Vec::with_capacity(pattern.len());
    for &donor_count in pattern.counts() {
        let eligible: Vec<LigandId> = pools
            .get(&donor_count)?
            .iter()
            .copied()
            .filter(|id| slots.iter().all(|s| s.ligand != *id))
            .collect();
        let &ligand = eligible.choose(rng)?;
        slots.push(LigandSlot {
            ligand,
            donor_count,
        });
    }
    Some(ComplexCandidate::new(slots))
}

/// Builds `config.batch_size` candidates by rejection sampling: draw a donor
/// pattern by softmax over the pattern weights, then fill it slot by slot.
///
/// Fails with [`EngineError::AssemblyExhausted`] once
/// [`AssemblyConfig::attempt_budget`] attempts have been spent.
#[instrument(skip_all, name = "assembly_task")]
pub fn run(
    pool: &[LigandId],
    library: &LigandLibrary,
    memory: &PatternMemory,
    config: &AssemblyConfig,
    rng: &mut impl Rng,
    reporter: &ProgressReporter,
) -> Result<Vec<ComplexCandidate>, EngineError> {
    reporter.report(Progress::PhaseStart { name: "Assembly" });

    if pool.is_empty() {
        return Err(EngineError::EmptyLigandPool);
    }
    let pools = pools_by_donor_count(pool, library);
    let (patterns, weights): (Vec<&DonorPattern>, Vec<f64>) = memory.entries().unzip();
    let distribution = WeightedIndex::new(softmax(&weights, config.temperature)?)
        .map_err(|source| EngineError::Sampling {
            source: source.into(),
        })?;

    let coordination_number = u32::from(config.coordination_number);
    let budget = config.attempt_budget();
    let mut candidates = Vec::with_capacity(config.batch_size);
    let mut attempts = 0usize;

    reporter.report(Progress::TaskStart {
        total_steps: config.batch_size as u64,
    });
    while candidates.len() < config.batch_size {
        if attempts >= budget {
            warn!(
                attempts,
                assembled = candidates.len(),
                requested = config.batch_size,
                "Assembly attempt budget exhausted."
            );
            return Err(EngineError::AssemblyExhausted {
                attempts,
                assembled: candidates.len(),
                requested: config.batch_size,
            });
        }
        attempts += 1;

        let pattern = patterns[distribution.sample(rng)];
        let Some(candidate) = try_assemble(pattern, &pools, rng) else {
            continue;
        };
        if !candidate.is_well_formed(coordination_number) {
            continue;
        }
        candidates.push(candidate);
        reporter.report(Progress::TaskIncrement);
    }
    reporter.report(Progress::TaskFinish);

    debug!(
        donor_counts = ?pools.keys().collect::<Vec<_>>(),
        "Ligand pools per donor count."
    );
    info!(
        candidates = candidates.len(),
        attempts,
        pool = pool.len(),
        "Assembly complete."
    );
    reporter.report(Progress::PhaseFinish);
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ligand::LigandOrigin;
    use crate::engine::config::defaults;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    fn config(batch_size: usize) -> AssemblyConfig {
        AssemblyConfig {
            coordination_number: 6,
            batch_size,
            patterns: DonorPattern::hexacoordinate_vocabulary(),
            temperature: defaults::PATTERN_TEMPERATURE,
            pattern_boost: defaults::PATTERN_BOOST,
            pattern_weight_cap: defaults::PATTERN_WEIGHT_CAP,
            attempts_per_candidate: defaults::ATTEMPTS_PER_CANDIDATE,
        }
    }

    fn rich_library() -> (LigandLibrary, Vec<LigandId>) {
        let modes: [&[u8]; 14] = [
            &[1],
            &[1],
            &[1],
            &[1],
            &[1],
            &[1],
            &[1, 2],
            &[2],
            &[2],
            &[3],
            &[3],
            &[4],
            &[5],
            &[6],
        ];
        let mut library = LigandLibrary::new();
        let ids = modes
            .iter()
            .enumerate()
            .map(|(i, modes)| {
                let smiles = format!("C{}", "C".repeat(i));
                library.insert(&smiles, modes.iter().copied(), LigandOrigin::Corpus)
            })
            .collect();
        (library, ids)
    }

    fn assemble(
        pool: &[LigandId],
        library: &LigandLibrary,
        memory: &PatternMemory,
        config: &AssemblyConfig,
        seed: u64,
    ) -> Result<Vec<ComplexCandidate>, EngineError> {
        let mut rng = StdRng::seed_from_u64(seed);
        run(pool, library, memory, config, &mut rng, &ProgressReporter::new())
    }

    #[test]
    fn every_candidate_sums_to_six_without_repeats() {
        let (library, pool) = rich_library();
        let config = config(300);
        let memory = PatternMemory::new(&config.patterns);

        for seed in 0..20 {
            let batch = assemble(&pool, &library, &memory, &config, seed).unwrap();
            assert_eq!(batch.len(), 300);
            for candidate in &batch {
                assert_eq!(candidate.donor_sum(), 6);
                let distinct: HashSet<_> = candidate.slots().iter().map(|s| s.ligand).collect();
                assert_eq!(distinct.len(), candidate.slots().len());
                for slot in candidate.slots() {
                    assert!(library.get(slot.ligand).unwrap().supports(slot.donor_count));
                }
            }
        }
    }

    #[test]
    fn same_seed_same_batch() {
        let (library, pool) = rich_library();
        let config = config(50);
        let memory = PatternMemory::new(&config.patterns);
        let a = assemble(&pool, &library, &memory, &config, 5).unwrap();
        let b = assemble(&pool, &library, &memory, &config, 5).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn focused_pattern_is_drawn_more_often() {
        let (library, pool) = rich_library();
        let config = config(2000);
        let baseline = PatternMemory::new(&config.patterns);
        let mut focused = baseline.clone();
        let favourite = DonorPattern::new([4, 1, 1]);
        focused.focus(&favourite, 3.0, 4.0);

        let count = |memory: &PatternMemory| {
            assemble(&pool, &library, memory, &config, 11)
                .unwrap()
                .iter()
                .filter(|c| c.pattern() == favourite)
                .count()
        };
        assert!(count(&focused) > count(&baseline));
    }

    #[test]
    fn unsatisfiable_pool_fails_instead_of_spinning() {
        let mut library = LigandLibrary::new();
        let only = library.insert("O", [1], LigandOrigin::Corpus);
        let mut config = config(10);
        config.attempts_per_candidate = 5;
        let memory = PatternMemory::new(&config.patterns);

        let err = assemble(&[only], &library, &memory, &config, 0).unwrap_err();
        assert!(matches!(
            err,
            EngineError::AssemblyExhausted {
                attempts: 50,
                assembled: 0,
                requested: 10
            }
        ));
    }

    #[test]
    fn empty_pool_is_rejected() {
        let config = config(1);
        let memory = PatternMemory::new(&config.patterns);
        let err = assemble(&[], &LigandLibrary::new(), &memory, &config, 0).unwrap_err();
        assert!(matches!(err, EngineError::EmptyLigandPool));
    }
}
