use crate::cli::LookupArgs;
use crate::commands::search::print_hits;
use crate::config::build_lookup_config;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use anisogen::engine::progress::ProgressReporter;
use anisogen::engine::sink::ArtifactStore;
use anisogen::workflows::lookup;
use tracing::info;

pub fn run(args: LookupArgs) -> Result<()> {
    let settings = build_lookup_config(&args)?;
    info!(
        target = settings.target,
        tolerance = settings.lookup.tolerance,
        corpus = %settings.lookup.corpus_path.display(),
        "Resolved lookup configuration."
    );

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());
    let store = ArtifactStore::new(&settings.work_dir);

    let hits = lookup::run(&settings.lookup, settings.target, &store, &reporter)?;
    if hits.is_empty() {
        println!(
            "No corpus complex lies within {:.2} of ZFS {:.2}.",
            settings.lookup.tolerance, settings.target
        );
    } else {
        print_hits(&hits, store.dir());
    }
    Ok(())
}
