use anyhow::Result;

use football_api::cleaner;
use football_api::config::{self, Config};
use football_api::logging;

fn main() -> Result<()> {
    config::load_dotenv();
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let config = Config::from_env()?.with_args(&args)?;
    logging::init(&config.log_level);

    let summary = cleaner::clean_season_files(&config.raw_dir(), &config.clean_dir())?;

    println!("Season cleaning complete");
    println!("Output: {}", summary.clean_dir.display());
    println!("Files: {}/{}", summary.files_cleaned, summary.files_seen);
    println!(
        "Rows kept: {} dropped: {} malformed: {}",
        summary.rows_kept, summary.rows_dropped, summary.rows_malformed
    );
    if !summary.skipped.is_empty() {
        println!("Skipped: {}", summary.skipped.len());
        for reason in summary.skipped.iter().take(8) {
            println!(" - {reason}");
        }
    }

    Ok(())
}
