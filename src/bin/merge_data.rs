use anyhow::Result;

use football_api::config::{self, Config};
use football_api::logging;
use football_api::merger;

fn main() -> Result<()> {
    config::load_dotenv();
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let config = Config::from_env()?.with_args(&args)?;
    logging::init(&config.log_level);

    let summary = merger::merge_season_files(&config.clean_dir(), &config.merged_path())?;

    println!("All seasons merged into: {}", summary.output.display());
    println!("Seasons: {}", summary.files_merged.join(", "));
    println!("Rows: {}", summary.rows_written);

    Ok(())
}
