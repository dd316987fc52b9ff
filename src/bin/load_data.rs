use anyhow::Result;

use football_api::config::{self, Config};
use football_api::loader;
use football_api::logging;
use football_api::match_store::MatchStore;

fn main() -> Result<()> {
    config::load_dotenv();
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let config = Config::from_env()?.with_args(&args)?;
    logging::init(&config.log_level);

    let store = MatchStore::open(&config.db_path)?;
    let summary = loader::load_merged_file(&store, &config.merged_path())?;
    store.close()?;

    println!("Inserted {} documents into {}", summary.inserted, config.db_path.display());
    println!("Rows read: {}", summary.rows_read);
    if !summary.rejected.is_empty() {
        println!("Rejected: {}", summary.rejected.len());
        for reason in summary.rejected.iter().take(8) {
            println!(" - {reason}");
        }
    }

    Ok(())
}
