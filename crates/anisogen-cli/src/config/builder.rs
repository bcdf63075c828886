use super::defaults::DefaultsConfig;
use super::file::FileConfig;
use super::models::{IndexSettings, LookupSettings};
use crate::cli::{DataArgs, IndexArgs, LookupArgs, SearchArgs};
use crate::error::{CliError, Result};
use anisogen::core::models::lineage::MutationOperator;
use anisogen::core::models::pattern::DonorPattern;
use anisogen::engine::config::{self as core_config, LookupConfig, Profile, SearchConfig, SearchConfigBuilder};
use std::path::PathBuf;
use std::str::FromStr;

pub fn build_search_config(args: &SearchArgs) -> Result<SearchConfig> {
    let defaults = DefaultsConfig::default();
    let file = load_file(&args.data)?;
    let profile = resolve_profile(&args.data, &file, &defaults)?;

    let mut builder = SearchConfigBuilder::new()
        .target_zfs(args.target)
        .profile(profile)
        .data_dir(data_dir(&args.data, &file, &defaults))
        .work_dir(
            args.work_dir
                .clone()
                .or(file.work_dir.clone())
                .unwrap_or(defaults.work_dir),
        )
        .mirror_dir(args.mirror_dir.clone().or(file.mirror_dir.clone()));
    if let Some(corpus) = args.data.corpus.clone().or(file.corpus.clone()) {
        builder = builder.corpus_path(corpus);
    }
    if let Some(dir) = args.model_dir.clone().or(file.model_dir.clone()) {
        builder = builder.model_dir(dir);
    }

    let search = file.search.unwrap_or_default();
    builder = apply(builder, args.generations.or(search.generations), SearchConfigBuilder::max_generations);
    builder = apply(builder, args.seed.or(search.seed), SearchConfigBuilder::seed);

    let lookup = file.lookup.unwrap_or_default();
    builder = apply(builder, args.tolerance.or(lookup.tolerance), SearchConfigBuilder::tolerance);
    builder = apply(builder, lookup.seed_threshold, SearchConfigBuilder::seed_threshold);

    let mutation = file.mutation.unwrap_or_default();
    builder = apply(builder, mutation.anchor_count, SearchConfigBuilder::anchor_count);
    builder = apply(builder, mutation.operators, SearchConfigBuilder::operators);

    let assembly = file.assembly.unwrap_or_default();
    let patterns = assembly
        .patterns
        .map(|patterns| parse_patterns(&patterns))
        .transpose()?;
    builder = apply(builder, assembly.coordination_number, SearchConfigBuilder::coordination_number);
    builder = apply(builder, args.batch_size.or(assembly.batch_size), SearchConfigBuilder::batch_size);
    builder = apply(builder, patterns, SearchConfigBuilder::patterns);
    builder = apply(builder, assembly.temperature, SearchConfigBuilder::temperature);
    builder = apply(builder, assembly.pattern_boost, SearchConfigBuilder::pattern_boost);
    builder = apply(builder, assembly.pattern_weight_cap, SearchConfigBuilder::pattern_weight_cap);
    builder = apply(
        builder,
        assembly.attempts_per_candidate,
        SearchConfigBuilder::attempts_per_candidate,
    );

    let oracle = file.oracle.unwrap_or_default();
    builder = apply(builder, oracle.chunk_size, SearchConfigBuilder::chunk_size);

    let selection = file.selection.unwrap_or_default();
    builder = apply(builder, selection.ed_cutoff, SearchConfigBuilder::ed_cutoff);
    builder = apply(builder, selection.elite_fraction, SearchConfigBuilder::elite_fraction);

    let output = file.output.unwrap_or_default();
    builder = apply(
        builder,
        output.write_generated_complexes,
        SearchConfigBuilder::write_generated_complexes,
    );

    builder.build().map_err(|e| CliError::Config(e.to_string()))
}

pub fn build_lookup_config(args: &LookupArgs) -> Result<LookupSettings> {
    let defaults = DefaultsConfig::default();
    let file = load_file(&args.data)?;
    if !args.target.is_finite() {
        return Err(CliError::Config("target must be a finite number".to_string()));
    }
    let lookup = lookup_config(&args.data, &file, &defaults, args.tolerance)?;
    Ok(LookupSettings {
        lookup,
        target: args.target,
        work_dir: args
            .work_dir
            .clone()
            .or(file.work_dir)
            .unwrap_or(defaults.work_dir),
    })
}

pub fn build_index_config(args: &IndexArgs) -> Result<IndexSettings> {
    let defaults = DefaultsConfig::default();
    let file = load_file(&args.data)?;
    let lookup = lookup_config(&args.data, &file, &defaults, None)?;
    Ok(IndexSettings {
        lookup,
        output: args.output.clone().unwrap_or(defaults.index_output),
    })
}

fn apply<T>(
    builder: SearchConfigBuilder,
    value: Option<T>,
    set: fn(SearchConfigBuilder, T) -> SearchConfigBuilder,
) -> SearchConfigBuilder {
    match value {
        Some(value) => set(builder, value),
        None => builder,
    }
}

fn load_file(data: &DataArgs) -> Result<FileConfig> {
    let file = match &data.config {
        Some(path) => FileConfig::from_file(path)?,
        None => FileConfig::default(),
    };
    apply_set_values(file, &data.set_values)
}

fn resolve_profile(data: &DataArgs, file: &FileConfig, defaults: &DefaultsConfig) -> Result<Profile> {
    match data.profile.as_deref().or(file.profile.as_deref()) {
        Some(name) => Profile::from_str(name).map_err(|e| CliError::Config(e.to_string())),
        None => Ok(defaults.profile),
    }
}

fn data_dir(data: &DataArgs, file: &FileConfig, defaults: &DefaultsConfig) -> PathBuf {
    data.data_dir
        .clone()
        .or(file.data_dir.clone())
        .unwrap_or(defaults.data_dir.clone())
}

fn lookup_config(
    data: &DataArgs,
    file: &FileConfig,
    defaults: &DefaultsConfig,
    tolerance: Option<f64>,
) -> Result<LookupConfig> {
    let profile = resolve_profile(data, file, defaults)?;
    let section = file.lookup.clone().unwrap_or_default();
    let corpus_path = data
        .corpus
        .clone()
        .or(file.corpus.clone())
        .unwrap_or_else(|| data_dir(data, file, defaults).join(profile.corpus_file()));

    let tolerance = tolerance
        .or(section.tolerance)
        .unwrap_or(core_config::defaults::LOOKUP_TOLERANCE);
    if !(tolerance.is_finite() && tolerance >= 0.0) {
        return Err(CliError::Config(format!(
            "Invalid value for 'tolerance': {tolerance} (must be a non-negative number)"
        )));
    }

    Ok(LookupConfig {
        corpus_path,
        zfs_column: profile.zfs_column().to_string(),
        tolerance,
        seed_threshold: section
            .seed_threshold
            .unwrap_or(core_config::defaults::SEED_THRESHOLD),
    })
}

fn parse_patterns(patterns: &[String]) -> Result<Vec<DonorPattern>> {
    patterns
        .iter()
        .map(|p| {
            p.parse::<DonorPattern>()
                .map_err(|e| CliError::Config(format!("Invalid donor pattern '{p}': {e}")))
        })
        .collect()
}

fn parse_operator(name: &str) -> Result<MutationOperator> {
    MutationOperator::ALL
        .into_iter()
        .find(|op| op.as_str() == name.trim())
        .ok_or_else(|| CliError::Config(format!("Unknown mutation operator '{}'", name.trim())))
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid value for {}: {}", key, value)))
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let Some((key, value)) = kv_pair.split_once('=') else {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        };
        let key = key.trim();

        match key {
            "profile" => config.profile = Some(value.trim().to_string()),
            "data-dir" => config.data_dir = Some(PathBuf::from(value.trim())),
            "corpus" => config.corpus = Some(PathBuf::from(value.trim())),
            "model-dir" => config.model_dir = Some(PathBuf::from(value.trim())),
            "work-dir" => config.work_dir = Some(PathBuf::from(value.trim())),
            "mirror-dir" => config.mirror_dir = Some(PathBuf::from(value.trim())),
            "search.generations" => {
                config.search.get_or_insert_with(Default::default).generations =
                    Some(parse_value(key, value)?);
            }
            "search.seed" => {
                config.search.get_or_insert_with(Default::default).seed = Some(parse_value(key, value)?);
            }
            "lookup.tolerance" => {
                config.lookup.get_or_insert_with(Default::default).tolerance =
                    Some(parse_value(key, value)?);
            }
            "lookup.seed-threshold" => {
                config.lookup.get_or_insert_with(Default::default).seed_threshold =
                    Some(parse_value(key, value)?);
            }
            "mutation.anchor-count" => {
                config.mutation.get_or_insert_with(Default::default).anchor_count =
                    Some(parse_value(key, value)?);
            }
            "mutation.operators" => {
                let operators = value
                    .split(',')
                    .filter(|s| !s.trim().is_empty())
                    .map(parse_operator)
                    .collect::<Result<Vec<_>>>()?;
                config.mutation.get_or_insert_with(Default::default).operators = Some(operators);
            }
            "assembly.coordination-number" => {
                config
                    .assembly
                    .get_or_insert_with(Default::default)
                    .coordination_number = Some(parse_value(key, value)?);
            }
            "assembly.batch-size" => {
                config.assembly.get_or_insert_with(Default::default).batch_size =
                    Some(parse_value(key, value)?);
            }
            "assembly.patterns" => {
                let patterns = value
                    .split(';')
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty())
                    .collect();
                config.assembly.get_or_insert_with(Default::default).patterns = Some(patterns);
            }
            "assembly.temperature" => {
                config.assembly.get_or_insert_with(Default::default).temperature =
                    Some(parse_value(key, value)?);
            }
            "assembly.pattern-boost" => {
                config.assembly.get_or_insert_with(Default::default).pattern_boost =
                    Some(parse_value(key, value)?);
            }
            "assembly.pattern-weight-cap" => {
                config
                    .assembly
                    .get_or_insert_with(Default::default)
                    .pattern_weight_cap = Some(parse_value(key, value)?);
            }
            "assembly.attempts-per-candidate" => {
                config
                    .assembly
                    .get_or_insert_with(Default::default)
                    .attempts_per_candidate = Some(parse_value(key, value)?);
            }
            "oracle.chunk-size" => {
                config.oracle.get_or_insert_with(Default::default).chunk_size =
                    Some(parse_value(key, value)?);
            }
            "selection.ed-cutoff" => {
                config.selection.get_or_insert_with(Default::default).ed_cutoff =
                    Some(parse_value(key, value)?);
            }
            "selection.elite-fraction" => {
                config
                    .selection
                    .get_or_insert_with(Default::default)
                    .elite_fraction = Some(parse_value(key, value)?);
            }
            "output.write-generated-complexes" => {
                config
                    .output
                    .get_or_insert_with(Default::default)
                    .write_generated_complexes = Some(parse_value(key, value)?);
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}
