use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::match_store::{MatchRecord, SideStats};

/// One line of the provider's fixture statistics export.
#[derive(Debug, Deserialize)]
struct FixtureCsvRow {
    fixture_id: u64,
    #[serde(default)]
    season_id: Option<String>,
    #[serde(default)]
    season_label: Option<String>,
    #[serde(alias = "Date_Match")]
    date_match: String,
    home_team: String,
    away_team: String,
    #[serde(default)]
    home_goals: Option<f64>,
    #[serde(default)]
    away_goals: Option<f64>,
    #[serde(default)]
    home_possession: Option<f64>,
    #[serde(default)]
    away_possession: Option<f64>,
    #[serde(default)]
    home_shots_on_target: Option<f64>,
    #[serde(default)]
    away_shots_on_target: Option<f64>,
    #[serde(default)]
    home_fouls: Option<f64>,
    #[serde(default)]
    away_fouls: Option<f64>,
    #[serde(default)]
    home_passes: Option<f64>,
    #[serde(default)]
    away_passes: Option<f64>,
    #[serde(default)]
    home_corners: Option<f64>,
    #[serde(default)]
    away_corners: Option<f64>,
    #[serde(default)]
    home_attacks: Option<f64>,
    #[serde(default)]
    away_attacks: Option<f64>,
    #[serde(default)]
    home_dangerous_attacks: Option<f64>,
    #[serde(default)]
    away_dangerous_attacks: Option<f64>,
}

#[derive(Debug, Default)]
pub struct CsvImport {
    pub records: Vec<MatchRecord>,
    /// Lines dropped for a missing or unreadable required field.
    pub skipped: usize,
}

pub fn read_match_csv(path: &Path) -> Result<CsvImport> {
    let file =
        std::fs::File::open(path).with_context(|| format!("open CSV file {}", path.display()))?;
    match_records_from_csv(file).with_context(|| format!("read CSV file {}", path.display()))
}

/// Parses a fixture export with a header line. Bad lines are skipped and
/// counted rather than failing the whole import.
pub fn match_records_from_csv<R: Read>(reader: R) -> Result<CsvImport> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    reader.headers().context("read CSV header")?;

    let mut out = CsvImport::default();
    for (idx, row) in reader.deserialize::<FixtureCsvRow>().enumerate() {
        // header is line 1
        let line = idx + 2;
        let parsed = row
            .map_err(anyhow::Error::from)
            .and_then(|r| record_from_row(r).with_context(|| format!("line {line}")));
        match parsed {
            Ok(record) => out.records.push(record),
            Err(err) => {
                log::warn!("skipping CSV line {line}: {err:#}");
                out.skipped += 1;
            }
        }
    }
    log::info!(
        "read {} matches from CSV ({} skipped)",
        out.records.len(),
        out.skipped
    );
    Ok(out)
}

fn record_from_row(row: FixtureCsvRow) -> Result<MatchRecord> {
    let season = [row.season_label, row.season_id]
        .into_iter()
        .flatten()
        .find(|s| !s.is_empty())
        .context("no season label or id")?;
    if row.home_team.is_empty() || row.away_team.is_empty() {
        anyhow::bail!("missing team name");
    }
    Ok(MatchRecord {
        match_id: row.fixture_id,
        season,
        date: normalize_date(&row.date_match)?,
        home_team: row.home_team,
        away_team: row.away_team,
        home_goals: goals(row.home_goals)?,
        away_goals: goals(row.away_goals)?,
        home_stats: SideStats {
            possession: row.home_possession,
            shots_on_target: row.home_shots_on_target,
            fouls: row.home_fouls,
            passes: row.home_passes,
            corners: row.home_corners,
            attacks: row.home_attacks,
            dangerous_attacks: row.home_dangerous_attacks,
        },
        away_stats: SideStats {
            possession: row.away_possession,
            shots_on_target: row.away_shots_on_target,
            fouls: row.away_fouls,
            passes: row.away_passes,
            corners: row.away_corners,
            attacks: row.away_attacks,
            dangerous_attacks: row.away_dangerous_attacks,
        },
    })
}

/// `YYYY-MM-DD`, optionally followed by a time, or day-first `DD/MM/YYYY`.
/// Stored as `YYYY-MM-DD` so string order stays chronological.
fn normalize_date(raw: &str) -> Result<String> {
    let raw = raw.trim();
    let date = match raw.get(..10) {
        Some(head) if head.as_bytes().get(4) == Some(&b'-') => {
            NaiveDate::parse_from_str(head, "%Y-%m-%d")
        }
        _ => NaiveDate::parse_from_str(raw, "%d/%m/%Y"),
    }
    .with_context(|| format!("unreadable date `{raw}`"))?;
    Ok(date.format("%Y-%m-%d").to_string())
}

fn goals(raw: Option<f64>) -> Result<Option<i32>> {
    match raw {
        None => Ok(None),
        Some(v) if v.is_finite() && v >= 0.0 && v.fract() == 0.0 => Ok(Some(v as i32)),
        Some(v) => anyhow::bail!("invalid goal count {v}"),
    }
}
