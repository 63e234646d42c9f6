use anyhow::{Context, Result};

use season_forecast::config::{self, SimSettings};
use season_forecast::match_store;
use season_forecast::team_season::compute_team_season_stats;

fn main() -> Result<()> {
    config::load_dotenv();
    env_logger::init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
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
    let show_table = config::has_flag(&args, "--table");

    println!("DB: {}", db_path.display());
    for season in seasons {
        let matches = match_store::load_season_matches(&conn, &season)?;
        let rows = compute_team_season_stats(&season, &matches);
        let written = match_store::upsert_team_seasons(&mut conn, &rows)?;
        let finished = matches.iter().filter(|m| m.is_finished()).count();
        println!(
            "season {season}: matches={} finished={finished} teams={written}",
            matches.len()
        );
        if show_table {
            for row in &rows {
                println!(
                    "  {:>2}. {:<22} P{:>3} W{:>3} D{:>3} L{:>3} GD{:>+4} pts={}",
                    row.position,
                    row.team,
                    row.played,
                    row.wins,
                    row.draws,
                    row.losses,
                    row.goal_difference,
                    row.points
                );
            }
        }
    }

    Ok(())
}
