use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use season_forecast::analysis::analyze;
use season_forecast::monte_carlo::{SimulationConfig, TrialMode, run_trials};
use season_forecast::outcome::Prob3;
use season_forecast::season::{Calendar, simulate_season_points};

const TEAMS: usize = 20;
const TRIALS: usize = 1000;

/// Double round robin over 20 clubs: 380 fixtures with strength-skewed odds.
fn league_calendar() -> Calendar {
    let mut probs = Vec::new();
    let mut home = Vec::new();
    let mut away = Vec::new();
    for h in 0..TEAMS {
        for a in 0..TEAMS {
            if h == a {
                continue;
            }
            let edge = (a as f64 - h as f64) / (TEAMS as f64 * 2.5);
            let p_home = (0.45 + edge).clamp(0.05, 0.9);
            let p_draw = 0.27;
            probs.push(Prob3::new(p_home, p_draw, (1.0 - p_home - p_draw).max(0.02)));
            home.push(format!("Club {h:02}"));
            away.push(format!("Club {a:02}"));
        }
    }
    Calendar::new(probs, Some(home), Some(away)).expect("aligned team lists")
}

fn bench_single_season(c: &mut Criterion) {
    let calendar = league_calendar();
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    c.bench_function("season_380_fixtures", |b| {
        b.iter(|| {
            let table = simulate_season_points(black_box(&calendar), &mut rng);
            black_box(table.len());
        })
    });
}

fn bench_trials(c: &mut Criterion) {
    let calendar = league_calendar();
    let mut group = c.benchmark_group("monte_carlo_1000");
    group.sample_size(10);
    for mode in [TrialMode::Sequential, TrialMode::Parallel] {
        let config = SimulationConfig {
            trials: TRIALS,
            seed: Some(42),
            mode,
        };
        group.bench_function(format!("{mode:?}"), |b| {
            b.iter(|| {
                let ensemble = run_trials(black_box(&calendar), &config).unwrap();
                black_box(ensemble.trials());
            })
        });
    }
    group.finish();
}

fn bench_analysis(c: &mut Criterion) {
    let calendar = league_calendar();
    let config = SimulationConfig {
        trials: TRIALS,
        seed: Some(7),
        mode: TrialMode::Sequential,
    };
    let ensemble = run_trials(&calendar, &config).expect("valid trial count");
    c.bench_function("analyze_20_teams_1000_trials", |b| {
        b.iter(|| {
            let analysis = analyze(black_box(&ensemble));
            black_box(analysis.summaries.len());
        })
    });
}

criterion_group!(perf, bench_single_season, bench_trials, bench_analysis);
criterion_main!(perf);
