use anyhow::Result;

use football_api::config::{self, Config};
use football_api::match_store::MatchStore;
use football_api::{cleaner, loader, logging, merger};

fn main() -> Result<()> {
    config::load_dotenv();
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let config = Config::from_env()?.with_args(&args)?;
    logging::init(&config.log_level);

    let cleaned = cleaner::clean_season_files(&config.raw_dir(), &config.clean_dir())?;
    println!(
        "Cleaned {}/{} season files ({} rows, {} skipped files)",
        cleaned.files_cleaned,
        cleaned.files_seen,
        cleaned.rows_kept,
        cleaned.skipped.len()
    );

    let merged = merger::merge_season_files(&config.clean_dir(), &config.merged_path())?;
    println!(
        "Merged {} seasons into {} ({} rows)",
        merged.files_merged.len(),
        merged.output.display(),
        merged.rows_written
    );

    let store = MatchStore::open(&config.db_path)?;
    let loaded = loader::load_merged_file(&store, &merged.output)?;
    store.close()?;
    println!(
        "Inserted {} documents into {} ({} rejected)",
        loaded.inserted,
        config.db_path.display(),
        loaded.rejected.len()
    );

    Ok(())
}
