use std::collections::BTreeMap;

use anyhow::{Context, Result};

use season_forecast::config::{self, SimSettings};
use season_forecast::match_store;
use season_forecast::training::build_training_rows;

fn main() -> Result<()> {
    config::load_dotenv();
    env_logger::init();

    let settings = SimSettings::from_env_and_args();
    let db_path = settings
        .db_path
        .clone()
        .context("unable to resolve sqlite path")?;
    let mut conn = match_store::open_db(&db_path)?;

    let seasons = match settings.season.clone() {
        Some(season) => vec![season],
        None => match_store::list_seasons(&conn)?,
    };

    let mut labeled: BTreeMap<&str, usize> = BTreeMap::new();
    println!("DB: {}", db_path.display());
    for season in seasons {
        let matches = match_store::load_season_matches(&conn, &season)?;
        let Some(last) = matches.last() else {
            println!("season {season}: no matches");
            continue;
        };
        let history = match_store::load_matches_before(&conn, &last.date)?;
        let prior = match match_store::previous_season(&conn, &season)? {
            Some(prev) => match_store::load_team_seasons(&conn, &prev)?,
            None => Vec::new(),
        };
        if prior.is_empty() {
            log::warn!("season {season}: no prior-season aggregates, run season_stats first");
        }

        let rows = build_training_rows(&matches, &prior, &history);
        match_store::upsert_training_rows(&mut conn, &rows)?;
        let stored = match_store::count_training_rows(&conn, &season)?;
        println!("season {season}: rows={} stored={stored}", rows.len());
        for outcome in rows.iter().filter_map(|r| r.result) {
            *labeled.entry(outcome.label()).or_insert(0) += 1;
        }
    }

    for (label, count) in &labeled {
        println!("{label}: {count}");
    }

    Ok(())
}
