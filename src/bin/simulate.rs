use std::path::Path;

use anyhow::{Context, Result, anyhow};
use rusqlite::Connection;

use season_forecast::config::{self, SimSettings};
use season_forecast::match_store;
use season_forecast::predictor::SoftmaxModel;
use season_forecast::report::{render_comparison, render_report};
use season_forecast::season::{RealResult, real_results_from_json};
use season_forecast::session::SimulationSession;
use season_forecast::training::{CalendarFeatures, calendar_features};

fn main() -> Result<()> {
    config::load_dotenv();
    env_logger::init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let settings = SimSettings::from_env_and_args();

    let model_path = settings
        .model_path
        .clone()
        .context("no model path (--model or SIM_MODEL_PATH)")?;
    let model = SoftmaxModel::load(&model_path)?;
    let mut session = SimulationSession::new(model, settings.policy)?;

    let conn = match (&settings.season, &settings.db_path) {
        (Some(_), Some(db)) if db.exists() => Some(match_store::open_db(db)?),
        _ => None,
    };

    let calendar = match config::parse_path_arg(&args, "--calendar") {
        Some(path) => read_calendar(&path)?,
        None => {
            let (Some(conn), Some(season)) = (conn.as_ref(), settings.season.as_deref()) else {
                return Err(anyhow!("no calendar: pass --calendar <file> or --season with a db"));
            };
            calendar_from_store(conn, season)?
        }
    };

    let result = session.simulate(
        &calendar.features,
        non_empty(calendar.teams_home),
        non_empty(calendar.teams_away),
        settings.simulation_config(),
    )?;
    println!("{}", render_report(&result.analysis));
    let result_json = serde_json::to_value(result).context("serialize simulation result")?;

    let real = match config::parse_path_arg(&args, "--real") {
        Some(path) => Some(read_real_results(&path)?),
        None => match (conn.as_ref(), settings.season.as_deref()) {
            (Some(conn), Some(season)) => {
                let rows = match_store::load_real_results(conn, season)?;
                (!rows.is_empty()).then_some(rows)
            }
            _ => None,
        },
    };

    let (comparison_json, score_json) = match real {
        Some(rows) => {
            let report = session.compare_results(&rows)?;
            println!("{}", render_comparison(report));
            let comparison = serde_json::to_value(report).context("serialize comparison")?;
            let score = session.score_forecast(&rows)?;
            println!("\n{score}");
            let score = serde_json::to_value(score).context("serialize forecast score")?;
            (Some(comparison), Some(score))
        }
        None => (None, None),
    };

    if let Some(out) = config::parse_path_arg(&args, "--out") {
        let payload = serde_json::json!({
            "simulation": result_json,
            "comparison": comparison_json,
            "forecast_score": score_json,
        });
        let raw = serde_json::to_string_pretty(&payload).context("encode output json")?;
        std::fs::write(&out, raw).with_context(|| format!("write {}", out.display()))?;
        println!("Wrote {}", out.display());
    }

    Ok(())
}

fn non_empty(teams: Vec<String>) -> Option<Vec<String>> {
    (!teams.is_empty()).then_some(teams)
}

fn read_calendar(path: &Path) -> Result<CalendarFeatures> {
    let raw =
        std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse calendar {}", path.display()))
}

fn read_real_results(path: &Path) -> Result<Vec<RealResult>> {
    let raw =
        std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let value: serde_json::Value =
        serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))?;
    Ok(real_results_from_json(&value)?)
}

fn calendar_from_store(conn: &Connection, season: &str) -> Result<CalendarFeatures> {
    let matches = match_store::load_season_matches(conn, season)?;
    let Some(first) = matches.first() else {
        return Err(anyhow!("season {season} has no stored matches"));
    };
    let history = match_store::load_matches_before(conn, &first.date)?;
    let prior = match match_store::previous_season(conn, season)? {
        Some(prev) => match_store::load_team_seasons(conn, &prev)?,
        None => Vec::new(),
    };
    if prior.is_empty() {
        log::warn!("no prior-season aggregates for {season}; team features default to zero");
    }
    Ok(calendar_features(&matches, &prior, &history)?)
}
