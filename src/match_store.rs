use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};

use crate::outcome::{Outcome, classify_outcome};
use crate::season::RealResult;
use crate::team_season::TeamSeasonStats;
use crate::training::TrainingRow;

/// Per-side match statistics as exported by the fixtures provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SideStats {
    #[serde(default)]
    pub possession: Option<f64>,
    #[serde(default)]
    pub shots_on_target: Option<f64>,
    #[serde(default)]
    pub fouls: Option<f64>,
    #[serde(default)]
    pub passes: Option<f64>,
    #[serde(default)]
    pub corners: Option<f64>,
    #[serde(default)]
    pub attacks: Option<f64>,
    #[serde(default)]
    pub dangerous_attacks: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub match_id: u64,
    pub season: String,
    /// ISO date (or datetime); string order is chronological order.
    pub date: String,
    pub home_team: String,
    pub away_team: String,
    #[serde(default)]
    pub home_goals: Option<i32>,
    #[serde(default)]
    pub away_goals: Option<i32>,
    #[serde(default)]
    pub home_stats: SideStats,
    #[serde(default)]
    pub away_stats: SideStats,
}

impl MatchRecord {
    pub fn outcome(&self) -> Option<Outcome> {
        let (Some(h), Some(a)) = (self.home_goals, self.away_goals) else {
            return None;
        };
        Some(classify_outcome(h, a))
    }

    pub fn is_finished(&self) -> bool {
        self.home_goals.is_some() && self.away_goals.is_some()
    }

    pub fn as_real_result(&self) -> Option<RealResult> {
        Some(RealResult {
            home_team: self.home_team.clone(),
            away_team: self.away_team.clone(),
            result: self.outcome()?.label().to_string(),
        })
    }
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS matches (
            match_id INTEGER PRIMARY KEY,
            season TEXT NOT NULL,
            date_match TEXT NOT NULL,
            home_team TEXT NOT NULL,
            away_team TEXT NOT NULL,
            home_goals INTEGER NULL,
            away_goals INTEGER NULL,
            home_possession REAL NULL,
            away_possession REAL NULL,
            home_shots_on_target REAL NULL,
            away_shots_on_target REAL NULL,
            home_fouls REAL NULL,
            away_fouls REAL NULL,
            home_passes REAL NULL,
            away_passes REAL NULL,
            home_corners REAL NULL,
            away_corners REAL NULL,
            home_attacks REAL NULL,
            away_attacks REAL NULL,
            home_dangerous_attacks REAL NULL,
            away_dangerous_attacks REAL NULL,
            outcome TEXT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_matches_season ON matches(season);
        CREATE INDEX IF NOT EXISTS idx_matches_date ON matches(date_match);

        CREATE TABLE IF NOT EXISTS team_season (
            team TEXT NOT NULL,
            season TEXT NOT NULL,
            stats_json TEXT NOT NULL,
            points INTEGER NOT NULL,
            position INTEGER NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (team, season)
        );

        CREATE TABLE IF NOT EXISTS training_rows (
            match_id INTEGER PRIMARY KEY,
            season TEXT NOT NULL,
            date_match TEXT NOT NULL,
            home_team TEXT NOT NULL,
            away_team TEXT NOT NULL,
            features_json TEXT NOT NULL,
            result TEXT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_training_season ON training_rows(season);
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

pub fn upsert_matches(conn: &mut Connection, rows: &[MatchRecord]) -> Result<usize> {
    let tx = conn.transaction().context("begin match upsert transaction")?;
    for row in rows {
        upsert_match(&tx, row)?;
    }
    tx.commit().context("commit match upsert transaction")?;
    Ok(rows.len())
}

pub fn upsert_match(conn: &Connection, m: &MatchRecord) -> Result<()> {
    let (h, a) = (&m.home_stats, &m.away_stats);
    conn.execute(
        r#"
        INSERT INTO matches (
            match_id, season, date_match, home_team, away_team,
            home_goals, away_goals,
            home_possession, away_possession,
            home_shots_on_target, away_shots_on_target,
            home_fouls, away_fouls,
            home_passes, away_passes,
            home_corners, away_corners,
            home_attacks, away_attacks,
            home_dangerous_attacks, away_dangerous_attacks,
            outcome, updated_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5,
            ?6, ?7,
            ?8, ?9,
            ?10, ?11,
            ?12, ?13,
            ?14, ?15,
            ?16, ?17,
            ?18, ?19,
            ?20, ?21,
            ?22, ?23
        )
        ON CONFLICT(match_id) DO UPDATE SET
            season = excluded.season,
            date_match = excluded.date_match,
            home_team = excluded.home_team,
            away_team = excluded.away_team,
            home_goals = excluded.home_goals,
            away_goals = excluded.away_goals,
            home_possession = excluded.home_possession,
            away_possession = excluded.away_possession,
            home_shots_on_target = excluded.home_shots_on_target,
            away_shots_on_target = excluded.away_shots_on_target,
            home_fouls = excluded.home_fouls,
            away_fouls = excluded.away_fouls,
            home_passes = excluded.home_passes,
            away_passes = excluded.away_passes,
            home_corners = excluded.home_corners,
            away_corners = excluded.away_corners,
            home_attacks = excluded.home_attacks,
            away_attacks = excluded.away_attacks,
            home_dangerous_attacks = excluded.home_dangerous_attacks,
            away_dangerous_attacks = excluded.away_dangerous_attacks,
            outcome = excluded.outcome,
            updated_at = excluded.updated_at
        "#,
        params![
            m.match_id as i64,
            m.season,
            m.date,
            m.home_team,
            m.away_team,
            m.home_goals,
            m.away_goals,
            h.possession,
            a.possession,
            h.shots_on_target,
            a.shots_on_target,
            h.fouls,
            a.fouls,
            h.passes,
            a.passes,
            h.corners,
            a.corners,
            h.attacks,
            a.attacks,
            h.dangerous_attacks,
            a.dangerous_attacks,
            m.outcome().map(|o| o.label().to_string()),
            Utc::now().to_rfc3339(),
        ],
    )
    .context("upsert match")?;
    Ok(())
}

const MATCH_COLUMNS: &str = r#"
    match_id, season, date_match, home_team, away_team,
    home_goals, away_goals,
    home_possession, away_possession,
    home_shots_on_target, away_shots_on_target,
    home_fouls, away_fouls,
    home_passes, away_passes,
    home_corners, away_corners,
    home_attacks, away_attacks,
    home_dangerous_attacks, away_dangerous_attacks
"#;

/// All matches of a season, finished or not, in calendar order.
pub fn load_season_matches(conn: &Connection, season: &str) -> Result<Vec<MatchRecord>> {
    let sql = format!(
        "SELECT {MATCH_COLUMNS} FROM matches WHERE season = ?1 \
         ORDER BY date_match ASC, match_id ASC"
    );
    let mut stmt = conn.prepare(&sql).context("prepare season matches query")?;
    let rows = stmt
        .query_map(params![season], match_from_row)
        .context("query season matches")?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("decode match row")?);
    }
    Ok(out)
}

/// Finished matches played strictly before `date`, most recent first.
pub fn load_matches_before(conn: &Connection, date: &str) -> Result<Vec<MatchRecord>> {
    let sql = format!(
        "SELECT {MATCH_COLUMNS} FROM matches
         WHERE date_match < ?1 AND home_goals IS NOT NULL AND away_goals IS NOT NULL
         ORDER BY date_match DESC, match_id DESC"
    );
    let mut stmt = conn.prepare(&sql).context("prepare history query")?;
    let rows = stmt
        .query_map(params![date], match_from_row)
        .context("query history")?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("decode match row")?);
    }
    Ok(out)
}

/// Seasons ordered by their first match date.
pub fn list_seasons(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare(
            "SELECT season, MIN(date_match) AS first_date FROM matches \
             GROUP BY season ORDER BY first_date ASC",
        )
        .context("prepare seasons query")?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .context("query seasons")?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("decode season row")?);
    }
    Ok(out)
}

/// The season listed immediately before `season`, if any.
pub fn previous_season(conn: &Connection, season: &str) -> Result<Option<String>> {
    let seasons = list_seasons(conn)?;
    let Some(idx) = seasons.iter().position(|s| s == season) else {
        return Ok(None);
    };
    Ok(idx.checked_sub(1).map(|i| seasons[i].clone()))
}

pub fn load_real_results(conn: &Connection, season: &str) -> Result<Vec<RealResult>> {
    Ok(load_season_matches(conn, season)?
        .iter()
        .filter_map(MatchRecord::as_real_result)
        .collect())
}

fn match_from_row(row: &Row<'_>) -> rusqlite::Result<MatchRecord> {
    let side = |offset: usize| -> rusqlite::Result<SideStats> {
        Ok(SideStats {
            possession: row.get(7 + offset)?,
            shots_on_target: row.get(9 + offset)?,
            fouls: row.get(11 + offset)?,
            passes: row.get(13 + offset)?,
            corners: row.get(15 + offset)?,
            attacks: row.get(17 + offset)?,
            dangerous_attacks: row.get(19 + offset)?,
        })
    };
    Ok(MatchRecord {
        match_id: row.get::<_, i64>(0)? as u64,
        season: row.get(1)?,
        date: row.get(2)?,
        home_team: row.get(3)?,
        away_team: row.get(4)?,
        home_goals: row.get(5)?,
        away_goals: row.get(6)?,
        home_stats: side(0)?,
        away_stats: side(1)?,
    })
}

pub fn upsert_team_seasons(conn: &mut Connection, rows: &[TeamSeasonStats]) -> Result<usize> {
    let tx = conn.transaction().context("begin team season transaction")?;
    for row in rows {
        let stats_json = serde_json::to_string(row).context("serialize team season")?;
        tx.execute(
            r#"
            INSERT INTO team_season (team, season, stats_json, points, position, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(team, season) DO UPDATE SET
                stats_json = excluded.stats_json,
                points = excluded.points,
                position = excluded.position,
                updated_at = excluded.updated_at
            "#,
            params![
                row.team,
                row.season,
                stats_json,
                row.points as i64,
                row.position as i64,
                Utc::now().to_rfc3339(),
            ],
        )
        .context("upsert team season")?;
    }
    tx.commit().context("commit team season transaction")?;
    Ok(rows.len())
}

pub fn load_team_seasons(conn: &Connection, season: &str) -> Result<Vec<TeamSeasonStats>> {
    let mut stmt = conn
        .prepare(
            "SELECT stats_json FROM team_season WHERE season = ?1 \
             ORDER BY position ASC, team ASC",
        )
        .context("prepare team season query")?;
    let rows = stmt
        .query_map(params![season], |row| row.get::<_, String>(0))
        .context("query team season")?;
    let mut out = Vec::new();
    for row in rows {
        let raw = row.context("decode team season row")?;
        out.push(serde_json::from_str(&raw).context("parse team season json")?);
    }
    Ok(out)
}

pub fn load_team_season(
    conn: &Connection,
    team: &str,
    season: &str,
) -> Result<Option<TeamSeasonStats>> {
    let raw = conn
        .query_row(
            "SELECT stats_json FROM team_season WHERE team = ?1 AND season = ?2",
            params![team, season],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .context("query team season")?;
    raw.map(|r| serde_json::from_str(&r).context("parse team season json"))
        .transpose()
}

pub fn upsert_training_rows(conn: &mut Connection, rows: &[TrainingRow]) -> Result<usize> {
    let tx = conn.transaction().context("begin training transaction")?;
    for row in rows {
        let features_json = serde_json::to_string(&row.features).context("serialize features")?;
        tx.execute(
            r#"
            INSERT INTO training_rows (
                match_id, season, date_match, home_team, away_team,
                features_json, result, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(match_id) DO UPDATE SET
                season = excluded.season,
                date_match = excluded.date_match,
                home_team = excluded.home_team,
                away_team = excluded.away_team,
                features_json = excluded.features_json,
                result = excluded.result,
                updated_at = excluded.updated_at
            "#,
            params![
                row.match_id as i64,
                row.season,
                row.date,
                row.home_team,
                row.away_team,
                features_json,
                row.result.map(|o| o.label().to_string()),
                Utc::now().to_rfc3339(),
            ],
        )
        .context("upsert training row")?;
    }
    tx.commit().context("commit training transaction")?;
    Ok(rows.len())
}

pub fn count_training_rows(conn: &Connection, season: &str) -> Result<usize> {
    let n = conn
        .query_row(
            "SELECT COUNT(*) FROM training_rows WHERE season = ?1",
            params![season],
            |row| row.get::<_, i64>(0),
        )
        .context("count training rows")?;
    Ok(n as usize)
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use super::{
        MatchRecord, SideStats, init_schema, list_seasons, load_matches_before,
        load_real_results, load_season_matches, previous_season, upsert_matches,
    };

    fn record(
        id: u64,
        season: &str,
        date: &str,
        h: &str,
        a: &str,
        goals: Option<(i32, i32)>,
    ) -> MatchRecord {
        MatchRecord {
            match_id: id,
            season: season.to_string(),
            date: date.to_string(),
            home_team: h.to_string(),
            away_team: a.to_string(),
            home_goals: goals.map(|g| g.0),
            away_goals: goals.map(|g| g.1),
            home_stats: SideStats {
                possession: Some(55.0),
                ..SideStats::default()
            },
            away_stats: SideStats::default(),
        }
    }

    #[test]
    fn upsert_is_idempotent_and_updates() {
        let mut conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        upsert_matches(&mut conn, &[record(1, "2023/2024", "2023-08-12", "A", "B", None)]).unwrap();
        upsert_matches(&mut conn, &[record(1, "2023/2024", "2023-08-12", "A", "B", Some((2, 0)))])
            .unwrap();
        let rows = load_season_matches(&conn, "2023/2024").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].home_goals, Some(2));
        assert_eq!(rows[0].home_stats.possession, Some(55.0));
        assert_eq!(rows[0].away_stats.possession, None);
    }

    #[test]
    fn seasons_history_and_results() {
        let mut conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        upsert_matches(
            &mut conn,
            &[
                record(1, "2022/2023", "2022-08-06", "A", "B", Some((1, 1))),
                record(2, "2022/2023", "2023-05-20", "B", "A", Some((0, 2))),
                record(3, "2023/2024", "2023-08-12", "A", "B", Some((3, 1))),
                record(4, "2023/2024", "2024-05-19", "B", "A", None),
            ],
        )
        .unwrap();
        assert_eq!(list_seasons(&conn).unwrap(), vec!["2022/2023", "2023/2024"]);
        assert_eq!(
            previous_season(&conn, "2023/2024").unwrap().as_deref(),
            Some("2022/2023")
        );
        assert_eq!(previous_season(&conn, "2022/2023").unwrap(), None);

        let history = load_matches_before(&conn, "2023-08-12").unwrap();
        assert_eq!(history.iter().map(|m| m.match_id).collect::<Vec<_>>(), vec![2, 1]);

        let results = load_real_results(&conn, "2023/2024").unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].result, "home_win");
    }
}
