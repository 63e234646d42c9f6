use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use season_forecast::config::{self, SimSettings};
use season_forecast::match_csv::read_match_csv;
use season_forecast::match_store::{self, MatchRecord};

fn main() -> Result<()> {
    config::load_dotenv();
    env_logger::init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let settings = SimSettings::from_env_and_args();
    let input: PathBuf = config::parse_path_arg(&args, "--input")
        .ok_or_else(|| anyhow!("missing --input <matches.json|fixtures.csv>"))?;
    let db_path = settings
        .db_path
        .clone()
        .context("unable to resolve sqlite path")?;

    let is_csv = input
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    let mut skipped = 0;
    let mut rows: Vec<MatchRecord> = if is_csv {
        let import = read_match_csv(&input)?;
        skipped = import.skipped;
        import.records
    } else {
        let raw = std::fs::read_to_string(&input)
            .with_context(|| format!("read {}", input.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parse match export {}", input.display()))?
    };
    if let Some(season) = settings.season.as_deref() {
        rows.retain(|m| m.season == season);
    }

    let mut conn = match_store::open_db(&db_path)?;
    let upserted = match_store::upsert_matches(&mut conn, &rows)?;
    let finished = rows.iter().filter(|m| m.is_finished()).count();

    println!("Match import complete");
    println!("DB: {}", db_path.display());
    println!("Matches upserted: {upserted} (finished {finished}, skipped {skipped})");
    println!("Seasons: {}", match_store::list_seasons(&conn)?.join(", "));
    Ok(())
}
