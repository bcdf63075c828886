use crate::cli::IndexArgs;
use crate::config::build_index_config;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use anisogen::engine::progress::ProgressReporter;
use anisogen::workflows::index;
use tracing::info;

pub fn run(args: IndexArgs) -> Result<()> {
    let settings = build_index_config(&args)?;
    info!(corpus = %settings.lookup.corpus_path.display(), "Indexing donor modes.");

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    let summary = index::run(&settings.lookup, &settings.output, &reporter)?;
    println!(
        "Indexed {} ligand(s) with {} donor mode(s) from {} corpus row(s).",
        summary.ligands, summary.modes, summary.rows
    );
    println!("Written to: {}", summary.path.display());
    Ok(())
}
