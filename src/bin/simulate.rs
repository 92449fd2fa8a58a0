use clap::Parser;
use maze_pursuit_engine::constants::{
    required_ghosts, DEFAULT_GHOST_RATE, DEFAULT_MIN_GHOSTS, DEFAULT_MOVE_LIMIT, FIRE_MAX_RANGE,
};
use maze_pursuit_engine::engine::TurnProcessor;
use maze_pursuit_engine::game::{Game, GameSettings};
use maze_pursuit_engine::maze::Maze;
use maze_pursuit_engine::query::RandomWalker;
use maze_pursuit_engine::rng::Rng;
use maze_pursuit_engine::types::GameStatus;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Run a single custom game instead of the default scenario set.
    #[arg(long)]
    single: bool,
    #[arg(long)]
    height: Option<i32>,
    #[arg(long)]
    width: Option<i32>,
    #[arg(long)]
    players: Option<i32>,
    #[arg(long)]
    min_ghosts: Option<u32>,
    #[arg(long)]
    ghost_rate: Option<u32>,
    #[arg(long)]
    move_limit: Option<u32>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    match_id: Option<String>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize)]
struct Scenario {
    name: String,
    height: i32,
    width: i32,
    players: usize,
    #[serde(rename = "minGhosts")]
    min_ghosts: u32,
    #[serde(rename = "ghostRate")]
    ghost_rate: u32,
    #[serde(rename = "moveLimit")]
    move_limit: u32,
    seed: u32,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioResultLine {
    scenario: String,
    seed: u32,
    height: i32,
    width: i32,
    players: usize,
    #[serde(rename = "moveCount")]
    move_count: u32,
    status: GameStatus,
    #[serde(rename = "durationMs")]
    duration_ms: u64,
    #[serde(rename = "topScore")]
    top_score: i64,
    #[serde(rename = "totalScore")]
    total_score: i64,
    #[serde(rename = "ghostsDestroyed")]
    ghosts_destroyed: usize,
    #[serde(rename = "playerDeaths")]
    player_deaths: usize,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct AnomalyRecord {
    tick: u64,
    message: String,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioRunResult {
    #[serde(flatten)]
    result: ScenarioResultLine,
    #[serde(rename = "anomalyRecords")]
    anomaly_records: Vec<AnomalyRecord>,
    finished_tick: u64,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    #[serde(rename = "matchId")]
    match_id: String,
    #[serde(rename = "startedAtMs")]
    started_at_ms: u64,
    #[serde(rename = "finishedAtMs")]
    finished_at_ms: u64,
    #[serde(rename = "scenarioCount")]
    scenario_count: usize,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    #[serde(rename = "averageDurationMs")]
    average_duration_ms: u64,
    #[serde(rename = "statusCounts")]
    status_counts: BTreeMap<String, usize>,
    scenarios: Vec<ScenarioResultLine>,
}

#[derive(Clone, Debug, Serialize)]
struct StructuredLogLine {
    #[serde(rename = "timestampMs")]
    timestamp_ms: u64,
    level: String,
    event: String,
    #[serde(rename = "matchId")]
    match_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    scenario: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tick: Option<u64>,
    details: Value,
}

fn main() {
    let cli = Cli::parse();
    let scenarios = resolve_scenarios(&cli);
    let run_started_at_ms = now_ms();
    let seed_hint = scenarios.first().map(|scenario| scenario.seed).unwrap_or(0);
    let match_id = cli
        .match_id
        .clone()
        .unwrap_or_else(|| default_match_id(seed_hint, run_started_at_ms));
    let mut has_anomaly = false;
    let mut scenario_results = Vec::new();
    let mut status_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_duration_ms = 0u64;
    let mut total_anomalies = 0usize;

    for scenario in scenarios {
        emit_log(
            "info",
            "scenario_started",
            &match_id,
            Some(&scenario.name),
            Some(scenario.seed),
            None,
            json!({
                "height": scenario.height,
                "width": scenario.width,
                "players": scenario.players,
                "minGhosts": scenario.min_ghosts,
                "ghostRate": scenario.ghost_rate,
                "moveLimit": scenario.move_limit,
            }),
        );
        let scenario_run = run_scenario(&scenario);

        for anomaly in &scenario_run.anomaly_records {
            emit_log(
                "warn",
                "anomaly_detected",
                &match_id,
                Some(&scenario.name),
                Some(scenario.seed),
                Some(anomaly.tick),
                json!({
                    "message": anomaly.message,
                }),
            );
        }

        if !scenario_run.result.anomalies.is_empty() {
            has_anomaly = true;
        }
        total_anomalies += scenario_run.anomaly_records.len();
        total_duration_ms += scenario_run.result.duration_ms;
        *status_counts
            .entry(game_status_key(scenario_run.result.status))
            .or_insert(0) += 1;

        emit_log(
            "info",
            "scenario_finished",
            &match_id,
            Some(&scenario.name),
            Some(scenario.seed),
            Some(scenario_run.finished_tick),
            json!({
                "status": scenario_run.result.status,
                "durationMs": scenario_run.result.duration_ms,
                "topScore": scenario_run.result.top_score,
                "ghostsDestroyed": scenario_run.result.ghosts_destroyed,
                "anomalyCount": scenario_run.anomaly_records.len(),
            }),
        );

        println!(
            "{}",
            serde_json::to_string(&scenario_run.result).expect("scenario result should serialize")
        );
        scenario_results.push(scenario_run.result);
    }

    let run_finished_at_ms = now_ms();
    let summary = build_run_summary(
        match_id.clone(),
        run_started_at_ms,
        run_finished_at_ms,
        scenario_results,
        status_counts,
        total_anomalies,
        total_duration_ms,
    );

    let mut summary_out_written: Option<String> = None;
    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(error) = write_summary(path, &summary) {
            emit_log(
                "error",
                "summary_write_failed",
                &match_id,
                None,
                None,
                None,
                json!({
                    "path": path.to_string_lossy(),
                    "error": error.to_string(),
                }),
            );
            std::process::exit(2);
        }
        summary_out_written = Some(path.to_string_lossy().to_string());
    }

    emit_log(
        "info",
        "run_finished",
        &match_id,
        None,
        None,
        None,
        json!({
            "scenarioCount": summary.scenario_count,
            "anomalyCount": summary.anomaly_count,
            "averageDurationMs": summary.average_duration_ms,
            "statusCounts": summary.status_counts,
            "summaryOut": summary_out_written,
        }),
    );

    if has_anomaly {
        std::process::exit(1);
    }
}

fn run_scenario(scenario: &Scenario) -> ScenarioRunResult {
    let scenario_started_at_ms = now_ms();
    let mut maze_rng = Rng::new(scenario.seed);
    let maze = Maze::build_random(scenario.height, scenario.width, &mut maze_rng)
        .expect("scenario dimensions are clamped to valid ranges");

    let mut game = Game::create(
        &scenario.name,
        maze,
        GameSettings {
            min_ghosts: scenario.min_ghosts,
            ghost_rate: scenario.ghost_rate,
            move_limit: scenario.move_limit,
        },
    );
    for (idx, spawn) in Game::spawn_cells(&game.maze, scenario.players)
        .into_iter()
        .enumerate()
    {
        game.add_player(
            &format!("ai_{}", idx + 1),
            &format!("AI-{:02}", idx + 1),
            &format!("sim://agent/{}", idx + 1),
            spawn,
        );
    }

    let mut processor = TurnProcessor::new(scenario.seed);
    let mut walker = RandomWalker::new(scenario.seed.wrapping_add(1), 0.15);

    let mut ghosts_destroyed = 0usize;
    let mut player_deaths = 0usize;
    let mut was_killed = vec![false; game.players.len()];
    let mut anomalies = Vec::new();
    let mut anomaly_records = Vec::new();
    let mut anomaly_seen = HashSet::new();
    let mut tick_safety = 0u32;

    while !game.is_finished() {
        processor.advance(&mut game, &mut walker);
        ghosts_destroyed += game.killed_ghosts.len();
        for (idx, player) in game.players.iter().enumerate() {
            if player.is_killed() && !was_killed[idx] {
                player_deaths += 1;
            }
            was_killed[idx] = player.is_killed();
        }
        for message in collect_game_anomalies(&game) {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                game.move_count as u64,
                message,
            );
        }
        tick_safety += 1;
        if tick_safety > scenario.move_limit + 10 {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                game.move_count as u64,
                "tick safety limit exceeded".to_string(),
            );
            break;
        }
    }

    let top_score = game.players.iter().map(|player| player.score).max().unwrap_or(0);
    let total_score = game.players.iter().map(|player| player.score).sum();

    ScenarioRunResult {
        result: ScenarioResultLine {
            scenario: scenario.name.clone(),
            seed: scenario.seed,
            height: scenario.height,
            width: scenario.width,
            players: scenario.players,
            move_count: game.move_count,
            status: game.status,
            duration_ms: now_ms().saturating_sub(scenario_started_at_ms),
            top_score,
            total_score,
            ghosts_destroyed,
            player_deaths,
            anomalies,
        },
        anomaly_records,
        finished_tick: game.move_count as u64,
    }
}

fn collect_game_anomalies(game: &Game) -> Vec<String> {
    let mut anomalies = Vec::new();
    for player in &game.players {
        if !player.is_killed() && !game.maze.is_open(player.position) {
            anomalies.push(format!(
                "player on a blocked cell: {} {:?}",
                player.id, player.position
            ));
        }
        if player.status_ticks < 0 {
            anomalies.push(format!(
                "negative status countdown: {} {}",
                player.id, player.status_ticks
            ));
        }
        if player.fire_range < 0 || player.fire_range > FIRE_MAX_RANGE {
            anomalies.push(format!(
                "fire range out of bounds: {} {}",
                player.id, player.fire_range
            ));
        }
    }
    for ghost in &game.ghosts {
        if !game.maze.is_open(ghost.position) {
            anomalies.push(format!("ghost on a blocked cell: {:?}", ghost.position));
        }
        if ghost.neutral_ticks < 0 {
            anomalies.push(format!(
                "negative neutral countdown: {}",
                ghost.neutral_ticks
            ));
        }
    }
    // Population maintenance ran against last tick's counter; destroyed
    // ghosts still count until the next top-up.
    let floor = required_ghosts(
        game.min_ghosts,
        game.ghost_rate,
        game.move_count.saturating_sub(1),
    ) as usize;
    if game.ghosts.len() + game.killed_ghosts.len() < floor {
        anomalies.push(format!(
            "ghost population below floor: {} + {} < {}",
            game.ghosts.len(),
            game.killed_ghosts.len(),
            floor
        ));
    }
    if game.move_count > game.move_limit {
        anomalies.push(format!(
            "move counter past the limit: {}/{}",
            game.move_count, game.move_limit
        ));
    }
    anomalies
}

fn resolve_scenarios(cli: &Cli) -> Vec<Scenario> {
    let seed = normalize_seed(cli.seed.unwrap_or_else(rand::random::<u64>));

    if cli.single
        || cli.height.is_some()
        || cli.width.is_some()
        || cli.players.is_some()
        || cli.min_ghosts.is_some()
        || cli.ghost_rate.is_some()
        || cli.move_limit.is_some()
    {
        let players = clamp_i32(cli.players.unwrap_or(2), 1, 16) as usize;
        return vec![Scenario {
            name: format!("custom-p{players}"),
            height: clamp_i32(cli.height.unwrap_or(15), 5, 99),
            width: clamp_i32(cli.width.unwrap_or(15), 5, 99),
            players,
            min_ghosts: cli.min_ghosts.unwrap_or(DEFAULT_MIN_GHOSTS),
            ghost_rate: cli.ghost_rate.unwrap_or(DEFAULT_GHOST_RATE),
            move_limit: cli.move_limit.unwrap_or(DEFAULT_MOVE_LIMIT).clamp(1, 100_000),
            seed,
        }];
    }

    vec![
        Scenario {
            name: "quick-check-p2".to_string(),
            height: 11,
            width: 11,
            players: 2,
            min_ghosts: DEFAULT_MIN_GHOSTS,
            ghost_rate: DEFAULT_GHOST_RATE,
            move_limit: 200,
            seed,
        },
        Scenario {
            name: "balance-check-p4".to_string(),
            height: 21,
            width: 27,
            players: 4,
            min_ghosts: DEFAULT_MIN_GHOSTS,
            ghost_rate: DEFAULT_GHOST_RATE,
            move_limit: DEFAULT_MOVE_LIMIT,
            seed: normalize_seed(seed as u64 + 1),
        },
    ]
}

fn clamp_i32(value: i32, min: i32, max: i32) -> i32 {
    value.clamp(min, max)
}

fn normalize_seed(seed: u64) -> u32 {
    seed as u32
}

fn push_anomaly(
    anomalies: &mut Vec<String>,
    anomaly_records: &mut Vec<AnomalyRecord>,
    anomaly_seen: &mut HashSet<String>,
    tick: u64,
    message: String,
) {
    anomaly_records.push(AnomalyRecord {
        tick,
        message: message.clone(),
    });
    if anomaly_seen.insert(message.clone()) {
        anomalies.push(message);
    }
}

fn default_match_id(seed: u32, timestamp_ms: u64) -> String {
    format!("sim-{seed}-{timestamp_ms}")
}

fn build_run_summary(
    match_id: String,
    started_at_ms: u64,
    finished_at_ms: u64,
    scenarios: Vec<ScenarioResultLine>,
    status_counts: BTreeMap<String, usize>,
    anomaly_count: usize,
    total_duration_ms: u64,
) -> RunSummary {
    let scenario_count = scenarios.len();
    let average_duration_ms = if scenario_count == 0 {
        0
    } else {
        total_duration_ms / scenario_count as u64
    };
    RunSummary {
        match_id,
        started_at_ms,
        finished_at_ms,
        scenario_count,
        anomaly_count,
        average_duration_ms,
        status_counts,
        scenarios,
    }
}

fn emit_log(
    level: &str,
    event: &str,
    match_id: &str,
    scenario: Option<&str>,
    seed: Option<u32>,
    tick: Option<u64>,
    details: Value,
) {
    let log_line = StructuredLogLine {
        timestamp_ms: now_ms(),
        level: level.to_string(),
        event: event.to_string(),
        match_id: match_id.to_string(),
        scenario: scenario.map(|value| value.to_string()),
        seed,
        tick,
        details,
    };
    eprintln!(
        "{}",
        serde_json::to_string(&log_line).expect("structured log should serialize")
    );
}

fn game_status_key(status: GameStatus) -> String {
    match status {
        GameStatus::NotStarted => "not_started",
        GameStatus::Running => "running",
        GameStatus::Paused => "paused",
        GameStatus::Finished => "finished",
    }
    .to_string()
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn write_summary(path: &Path, summary: &RunSummary) -> io::Result<()> {
    let summary_text = serde_json::to_string_pretty(summary).expect("run summary should serialize");
    std::fs::write(path, summary_text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn make_scenario_result(status: GameStatus, duration_ms: u64) -> ScenarioResultLine {
        ScenarioResultLine {
            scenario: "test".to_string(),
            seed: 42,
            height: 11,
            width: 11,
            players: 2,
            move_count: 200,
            status,
            duration_ms,
            top_score: 150,
            total_score: 125,
            ghosts_destroyed: 3,
            player_deaths: 1,
            anomalies: Vec::new(),
        }
    }

    #[test]
    fn default_match_id_contains_seed_and_timestamp() {
        assert_eq!(default_match_id(42, 123456789), "sim-42-123456789");
    }

    #[test]
    fn build_run_summary_calculates_average_duration() {
        let summary = build_run_summary(
            "sim-42-1".to_string(),
            1,
            2,
            vec![
                make_scenario_result(GameStatus::Finished, 60_000),
                make_scenario_result(GameStatus::Finished, 90_000),
            ],
            BTreeMap::from([("finished".to_string(), 2usize)]),
            1,
            150_000,
        );
        assert_eq!(summary.average_duration_ms, 75_000);
        assert_eq!(summary.scenario_count, 2);
    }

    #[test]
    fn write_summary_returns_error_when_parent_does_not_exist() {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let target = std::env::temp_dir()
            .join(format!("maze-pursuit-missing-{now}"))
            .join("summary.json");
        let summary = build_run_summary(
            "sim-1-1".to_string(),
            1,
            2,
            vec![make_scenario_result(GameStatus::Finished, 60_000)],
            BTreeMap::from([("finished".to_string(), 1usize)]),
            0,
            60_000,
        );
        let result = write_summary(&target, &summary);
        assert!(result.is_err());
    }

    #[test]
    fn push_anomaly_keeps_records_and_deduplicates_summary_messages() {
        let mut anomalies = Vec::new();
        let mut records = Vec::new();
        let mut seen = HashSet::new();
        push_anomaly(
            &mut anomalies,
            &mut records,
            &mut seen,
            10,
            "same anomaly".to_string(),
        );
        push_anomaly(
            &mut anomalies,
            &mut records,
            &mut seen,
            11,
            "same anomaly".to_string(),
        );

        assert_eq!(anomalies.len(), 1);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].tick, 10);
        assert_eq!(records[1].tick, 11);
    }

    #[test]
    fn custom_flags_collapse_to_a_single_scenario() {
        let cli = Cli {
            single: false,
            height: Some(9),
            width: Some(13),
            players: Some(3),
            min_ghosts: None,
            ghost_rate: None,
            move_limit: Some(50),
            seed: Some(7),
            match_id: None,
            summary_out: None,
        };
        let scenarios = resolve_scenarios(&cli);
        assert_eq!(scenarios.len(), 1);
        assert_eq!(scenarios[0].height, 9);
        assert_eq!(scenarios[0].width, 13);
        assert_eq!(scenarios[0].players, 3);
        assert_eq!(scenarios[0].move_limit, 50);
        assert_eq!(scenarios[0].seed, 7);
    }
}
