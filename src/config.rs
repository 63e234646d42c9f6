use std::path::PathBuf;
use std::str::FromStr;

use crate::monte_carlo::{DEFAULT_TRIALS, SimulationConfig, TrialMode};
use crate::normalize::DegeneratePolicy;

const DATA_DIR: &str = "season_forecast";

/// Run settings resolved from flags, then `SIM_*` environment variables, then
/// defaults. Unparseable values fall through to the next source.
#[derive(Debug, Clone, PartialEq)]
pub struct SimSettings {
    pub db_path: Option<PathBuf>,
    pub model_path: Option<PathBuf>,
    pub season: Option<String>,
    pub trials: usize,
    pub seed: Option<u64>,
    pub mode: TrialMode,
    pub policy: DegeneratePolicy,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            db_path: None,
            model_path: None,
            season: None,
            trials: DEFAULT_TRIALS,
            seed: None,
            mode: TrialMode::Sequential,
            policy: DegeneratePolicy::Reject,
        }
    }
}

impl SimSettings {
    pub fn from_env_and_args() -> Self {
        let args = std::env::args().skip(1).collect::<Vec<_>>();
        Self::resolve(&args, |key| std::env::var(key).ok())
    }

    pub fn resolve(args: &[String], env: impl Fn(&str) -> Option<String>) -> Self {
        let env_path = |key: &str| {
            env(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        };
        let defaults = Self::default();

        let parallel = has_flag(args, "--parallel")
            || env("SIM_PARALLEL").is_some_and(|v| is_truthy(&v));

        Self {
            db_path: parse_path_arg(args, "--db")
                .or_else(|| env_path("SIM_DB_PATH"))
                .or_else(default_db_path),
            model_path: parse_path_arg(args, "--model").or_else(|| env_path("SIM_MODEL_PATH")),
            season: arg_value(args, "--season").or_else(|| env("SIM_SEASON")),
            trials: parse_arg::<usize>(args, "--trials")
                .or_else(|| env_parse(&env, "SIM_TRIALS"))
                .unwrap_or(defaults.trials),
            seed: parse_arg::<u64>(args, "--seed").or_else(|| env_parse(&env, "SIM_SEED")),
            mode: if parallel {
                TrialMode::Parallel
            } else {
                defaults.mode
            },
            policy: parse_arg::<DegeneratePolicy>(args, "--degenerate")
                .or_else(|| env_parse(&env, "SIM_DEGENERATE_POLICY"))
                .unwrap_or(defaults.policy),
        }
    }

    pub fn simulation_config(&self) -> SimulationConfig {
        SimulationConfig {
            trials: self.trials,
            seed: self.seed,
            mode: self.mode,
        }
    }
}

fn env_parse<T: FromStr>(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    env(key).and_then(|v| v.trim().parse::<T>().ok())
}

fn is_truthy(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Value of `--name=value` or `--name value`; blank values are skipped.
pub fn arg_value(args: &[String], name: &str) -> Option<String> {
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&format!("{name}=")) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
            && !next.starts_with("--")
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

pub fn parse_arg<T: FromStr>(args: &[String], name: &str) -> Option<T> {
    arg_value(args, name).and_then(|raw| raw.parse::<T>().ok())
}

pub fn parse_path_arg(args: &[String], name: &str) -> Option<PathBuf> {
    arg_value(args, name).map(PathBuf::from)
}

pub fn has_flag(args: &[String], name: &str) -> bool {
    args.iter().any(|arg| arg == name)
}

/// `$XDG_DATA_HOME/season_forecast`, else `~/.local/share/season_forecast`.
pub fn app_data_dir() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_DATA_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(DATA_DIR));
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".local").join("share").join(DATA_DIR))
}

pub fn default_db_path() -> Option<PathBuf> {
    app_data_dir().map(|dir| dir.join("matches.sqlite"))
}

/// Loads `.env.local` then `.env`; missing files are fine.
pub fn load_dotenv() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::PathBuf;

    use super::{SimSettings, arg_value, has_flag};
    use crate::monte_carlo::TrialMode;
    use crate::normalize::DegeneratePolicy;

    fn args(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn arg_forms() {
        let a = args(&["--trials=200", "--season", "2023/2024", "--parallel", "--db", "--seed"]);
        assert_eq!(arg_value(&a, "--trials").as_deref(), Some("200"));
        assert_eq!(arg_value(&a, "--season").as_deref(), Some("2023/2024"));
        assert_eq!(arg_value(&a, "--db"), None);
        assert_eq!(arg_value(&a, "--seed"), None);
        assert!(has_flag(&a, "--parallel"));
    }

    #[test]
    fn flags_override_env_and_env_overrides_defaults() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("SIM_TRIALS", "500"),
            ("SIM_SEED", "9"),
            ("SIM_DB_PATH", "/tmp/env.sqlite"),
            ("SIM_DEGENERATE_POLICY", "uniform"),
            ("SIM_PARALLEL", "true"),
        ]);
        let lookup = |k: &str| env.get(k).map(|v| v.to_string());

        let s = SimSettings::resolve(&args(&["--trials", "50"]), lookup);
        assert_eq!(s.trials, 50);
        assert_eq!(s.seed, Some(9));
        assert_eq!(s.db_path, Some(PathBuf::from("/tmp/env.sqlite")));
        assert_eq!(s.policy, DegeneratePolicy::Uniform);
        assert_eq!(s.mode, TrialMode::Parallel);
    }

    #[test]
    fn bad_values_fall_back_to_defaults() {
        let s = SimSettings::resolve(&args(&["--trials=lots", "--degenerate=maybe"]), |_| None);
        assert_eq!(s.trials, 1000);
        assert_eq!(s.seed, None);
        assert_eq!(s.mode, TrialMode::Sequential);
        assert_eq!(s.policy, DegeneratePolicy::Reject);
    }
}
