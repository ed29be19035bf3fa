use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};

use fivethreeone::completion::process_finished_session;
use fivethreeone::domain::{LiftType, Program, ProgressionScheme, ROOT_PROFILE_ID, Unit, WorkoutSession};
use fivethreeone::formulas::{deload_training_max, estimate_one_rep_max};
use fivethreeone::generator::{conditioning_session, generate_workout, next_lift};
use fivethreeone::profile::TrainingProfile;
use fivethreeone::progression::{
    ProgressionRules, WeekAdvance, advance_week, confirm_cycle_transition,
    propose_cycle_transition_with,
};
use fivethreeone::report::profile_statuses;
use fivethreeone::server::{self, AppState, WsMessage};
use fivethreeone::store::{ProgramDocument, load_document, save_document};
use fivethreeone::watcher::{WatcherConfig, reload_with_retry, watch_file};

/// 5/3/1 program generator and progression tracker.
#[derive(Parser, Debug)]
#[command(name = "fivethreeone")]
#[command(about = "Wendler 5/3/1 workouts, session logging and cycle progression")]
#[command(version)]
struct Args {
    /// Path to the JSON program document.
    /// Can also be set via FIVETHREEONE_FILE environment variable.
    #[arg(long, short, value_name = "FILE", env = "FIVETHREEONE_FILE", default_value = "program.json")]
    file: PathBuf,

    /// Week-3 reps needed to progress under the performance scheme.
    #[arg(long, value_name = "REPS", env = "FIVETHREEONE_PASS_REPS", default_value = "3")]
    pass_reps: u32,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Creates a profile from one-rep maxes or rep tests (e.g. 315 or 225x5).
    Init {
        #[arg(long, default_value = ROOT_PROFILE_ID)]
        profile: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, value_name = "MAX")]
        squat: Option<String>,
        #[arg(long, value_name = "MAX")]
        bench: Option<String>,
        #[arg(long, value_name = "MAX")]
        deadlift: Option<String>,
        #[arg(long, value_name = "MAX")]
        press: Option<String>,
        #[arg(long, default_value = "lbs")]
        unit: Unit,
        #[arg(long, default_value = "original")]
        program: Program,
        #[arg(long, default_value = "standard")]
        scheme: ProgressionScheme,
        #[arg(long)]
        premium: bool,
        /// Replace an existing profile with the same id.
        #[arg(long)]
        force: bool,
    },
    /// Prints the prescribed session (next lift by default).
    Workout {
        #[arg(long, default_value = ROOT_PROFILE_ID)]
        profile: String,
        #[arg(long)]
        lift: Option<LiftType>,
    },
    /// Logs a finished session.
    Finish {
        #[arg(long, default_value = ROOT_PROFILE_ID)]
        profile: String,
        /// Log the prescribed session for this lift with every set completed.
        #[arg(long, conflicts_with_all = ["session", "conditioning"])]
        lift: Option<LiftType>,
        /// Reps performed on the last main set.
        #[arg(long, conflicts_with_all = ["session", "conditioning"])]
        top_reps: Option<u32>,
        /// Log a session read from a JSON file.
        #[arg(long, value_name = "FILE", conflicts_with = "conditioning")]
        session: Option<PathBuf>,
        /// Log a conditioning session of this many minutes.
        #[arg(long, value_name = "MINUTES")]
        conditioning: Option<u64>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Moves to the next week of the cycle.
    NextWeek {
        #[arg(long, default_value = ROOT_PROFILE_ID)]
        profile: String,
    },
    /// Proposes next-cycle training maxes; applies them with --apply.
    Advance {
        #[arg(long, default_value = ROOT_PROFILE_ID)]
        profile: String,
        #[arg(long)]
        apply: bool,
        /// Knock a lift's training max back 10% instead of the proposal.
        #[arg(long, value_name = "LIFT")]
        reset: Vec<LiftType>,
        /// Override a proposed training max, e.g. squat=305.
        #[arg(long, value_name = "LIFT=WEIGHT", value_parser = parse_override)]
        set: Vec<(LiftType, f64)>,
    },
    /// Prints the status of every profile.
    Status,
    /// Serves the HTTP API and reloads the document when it changes.
    Serve {
        #[arg(long, env = "FIVETHREEONE_PORT", default_value = "8080")]
        port: u16,
        #[arg(long, value_name = "DIR")]
        static_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let rules = ProgressionRules {
        pass_reps: args.pass_reps,
    };

    match args.command {
        Command::Init {
            profile,
            name,
            squat,
            bench,
            deadlift,
            press,
            unit,
            program,
            scheme,
            premium,
            force,
        } => {
            let mut maxes = HashMap::new();
            for (lift, entry) in [
                (LiftType::Squat, squat),
                (LiftType::BenchPress, bench),
                (LiftType::Deadlift, deadlift),
                (LiftType::OverheadPress, press),
            ] {
                if let Some(entry) = entry {
                    maxes.insert(lift, parse_max_entry(&entry).map_err(anyhow::Error::msg)?);
                }
            }

            let mut new_profile = TrainingProfile::from_one_rep_maxes(profile, unit, program, maxes);
            new_profile.name = name;
            new_profile.progression_scheme = scheme;
            new_profile.is_premium = premium;
            init_profile(&args.file, new_profile, force)
        }
        Command::Workout { profile, lift } => {
            let document = load(&args.file)?;
            let profile = find(&document, &profile)?;
            profile.ensure_program_access()?;

            let Some(lift) = pick_lift(profile, &document.history, lift)? else {
                println!("Every lift is done for week {}.", profile.current_week);
                println!("Run `next-week` to move on.");
                return Ok(());
            };
            let session = generate_workout(profile, lift, &document.history)?;
            print_session(&session, profile.unit);
            Ok(())
        }
        Command::Finish {
            profile,
            lift,
            top_reps,
            session,
            conditioning,
            notes,
        } => {
            let mut document = load(&args.file)?;
            let current = find(&document, &profile)?.clone();

            let mut finished = if let Some(minutes) = conditioning {
                conditioning_session(&current, minutes * 60, None, Utc::now())
            } else if let Some(path) = session {
                read_session(&path)?
            } else {
                current.ensure_program_access()?;
                let Some(lift) = pick_lift(&current, &document.history, lift)? else {
                    bail!("every lift is done for week {}", current.current_week);
                };
                let mut session = generate_workout(&current, lift, &document.history)?;
                complete_all_sets(&mut session, top_reps);
                session
            };
            if notes.is_some() {
                finished.notes = notes;
            }

            let title = finished.title.clone();
            let outcome = process_finished_session(&current, &document.history, finished);
            document.history = outcome.history;
            document.upsert_profile(outcome.profile);
            save(&args.file, &document)?;

            println!("Logged: {}", title);
            if let Some(update) = outcome.max_update {
                println!(
                    "New {} one-rep max: {} (was {})",
                    update.lift, update.estimated, update.previous
                );
            }
            print_unlocked(outcome.newly_unlocked.as_deref());
            Ok(())
        }
        Command::NextWeek { profile } => {
            let mut document = load(&args.file)?;
            let current = find(&document, &profile)?;

            match advance_week(current)? {
                WeekAdvance::Advanced(next) => {
                    println!("Cycle {} · Week {}", next.current_cycle, next.current_week);
                    document.upsert_profile(next);
                    save(&args.file, &document)?;
                }
                WeekAdvance::CycleComplete => {
                    println!("Cycle {} is complete.", current.current_cycle);
                    println!("Run `advance` to review next cycle's training maxes.");
                }
            }
            Ok(())
        }
        Command::Advance {
            profile,
            apply,
            reset,
            set,
        } => {
            let mut document = load(&args.file)?;
            let current = find(&document, &profile)?.clone();

            let proposal = propose_cycle_transition_with(&current, &document.history, &rules);
            let mut maxes = proposal.proposed_training_maxes.clone();
            for lift in reset {
                let deloaded = deload_training_max(current.training_max(lift), current.rounding_increment());
                maxes.insert(lift, deloaded);
            }
            maxes.extend(set);

            let next_cycle = next_cycle_number(&current);
            println!("=== Cycle {} → {} ===", current.current_cycle, next_cycle);
            println!();
            for lift in LiftType::all() {
                let Some(next) = maxes.get(lift) else {
                    continue;
                };
                let verdict = match proposal.per_lift_performance.get(lift) {
                    Some(p) if !p.passed => format!("  held ({} reps)", p.reps_achieved.unwrap_or(0)),
                    Some(p) if p.reps_achieved.is_none() => "  no 1+ week logged".to_string(),
                    _ => String::new(),
                };
                println!(
                    "{:15} {:>7} → {:>7} {}{}",
                    lift.display_name(),
                    current.training_max(*lift),
                    next,
                    current.unit.label(),
                    verdict
                );
            }

            if !apply {
                println!();
                println!("Run again with --apply to start the next cycle.");
                return Ok(());
            }

            let outcome = confirm_cycle_transition(
                &current,
                &document.history,
                &maxes,
                next_cycle,
            )?;
            document.upsert_profile(outcome.profile);
            save(&args.file, &document)?;

            println!();
            println!("Started cycle {next_cycle}.");
            print_unlocked(outcome.newly_unlocked.as_deref());
            Ok(())
        }
        Command::Status => {
            let document = load(&args.file)?;
            let profiles: Vec<TrainingProfile> = document.profiles().cloned().collect();
            let statuses = profile_statuses(&profiles, &document.history, &rules, Utc::now());

            println!();
            println!("=== Program Status ===");
            for (status, profile) in statuses.iter().zip(&profiles) {
                println!();
                println!(
                    "{} ({}) · {} · Cycle {} · Week {}",
                    status.name.as_deref().unwrap_or(&status.profile_id),
                    status.profile_id,
                    status.program,
                    status.cycle,
                    status.week
                );
                for lift in LiftType::all() {
                    let tm = profile.training_max(*lift);
                    if tm > 0.0 {
                        println!(
                            "  {:15} TM {:>7}  1RM {:>7} {}",
                            lift.display_name(),
                            tm,
                            profile.one_rep_max(*lift),
                            profile.unit.label()
                        );
                    }
                }
                match status.next_lift {
                    Some(lift) => println!("  Next: {}", lift),
                    None => println!("  Week done"),
                }
                println!(
                    "  Sessions: {} ({} strength, {} conditioning)",
                    status.summary.sessions,
                    status.summary.strength_sessions,
                    status.summary.conditioning_sessions
                );
                if let Some(days) = status.days_since_last_session {
                    println!("  Last session: {} days ago", days);
                }
            }
            Ok(())
        }
        Command::Serve { port, static_dir } => serve(&args.file, port, static_dir, rules).await,
    }
}

async fn serve(
    file: &Path,
    port: u16,
    static_dir: Option<PathBuf>,
    rules: ProgressionRules,
) -> Result<()> {
    let file_path = file
        .canonicalize()
        .with_context(|| format!("Failed to resolve path: {}", file.display()))?;

    println!("Loading program document from: {}", file_path.display());
    let document = load(&file_path)?;
    println!(
        "{} profiles, {} sessions",
        document.clients.len() + 1,
        document.history.len()
    );

    let state = Arc::new(AppState::new(document, file_path.clone(), rules));

    let watcher_state = state.clone();
    tokio::spawn(async move {
        let config = WatcherConfig::default();
        let retry_config = config.clone();

        if let Err(e) = watch_file(&file_path, config, move || {
            let state = watcher_state.clone();
            let config = retry_config.clone();
            tokio::spawn(async move {
                let path = state.file_path.clone();
                match reload_with_retry(&config, || load_document(&path)).await {
                    Some(document) => {
                        state.replace_document(document).await;
                        log::info!("Document reloaded");
                    }
                    None => {
                        let _ = state
                            .ws_broadcast
                            .send(WsMessage::Error("Failed to reload document".into()));
                    }
                }
            });
        })
        .await
        {
            log::error!("File watcher error: {}", e);
        }
    });

    println!("Live reload enabled - watching for file changes");
    server::run_server(state, port, static_dir).await
}

fn load(path: &Path) -> Result<ProgramDocument> {
    load_document(path).with_context(|| format!("Failed to load program from {}", path.display()))
}

fn save(path: &Path, document: &ProgramDocument) -> Result<()> {
    save_document(path, document)
        .with_context(|| format!("Failed to save program to {}", path.display()))
}

fn find<'a>(document: &'a ProgramDocument, profile_id: &str) -> Result<&'a TrainingProfile> {
    Ok(document.find_profile(profile_id)?)
}

fn init_profile(path: &Path, profile: TrainingProfile, force: bool) -> Result<()> {
    let document = if path.exists() {
        let mut document = load(path)?;
        if !force && document.find_profile(&profile.id).is_ok() {
            bail!("profile {} already exists (use --force to replace it)", profile.id);
        }
        document.upsert_profile(profile.clone());
        document
    } else if profile.id == ROOT_PROFILE_ID {
        ProgramDocument::new(profile.clone())
    } else {
        let mut document = ProgramDocument::new(TrainingProfile::new(ROOT_PROFILE_ID));
        document.upsert_profile(profile.clone());
        document
    };
    save(path, &document)?;

    println!("Created profile {} ({})", profile.id, profile.selected_program);
    for lift in LiftType::all() {
        let tm = profile.training_max(*lift);
        if tm > 0.0 {
            println!(
                "  {:15} 1RM {:>7}  TM {:>7} {}",
                lift.display_name(),
                profile.one_rep_max(*lift),
                tm,
                profile.unit.label()
            );
        }
    }
    Ok(())
}

fn pick_lift(
    profile: &TrainingProfile,
    history: &[WorkoutSession],
    lift: Option<LiftType>,
) -> Result<Option<LiftType>> {
    match lift {
        Some(lift) => Ok(Some(lift)),
        None => Ok(next_lift(profile, history)?),
    }
}

fn next_cycle_number(profile: &TrainingProfile) -> u32 {
    profile.current_cycle.saturating_add(1)
}

fn read_session(path: &Path) -> Result<WorkoutSession> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read session from {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Invalid session in {}", path.display()))
}

/// Marks every set done as prescribed, with `top_reps` on the last main set.
fn complete_all_sets(session: &mut WorkoutSession, top_reps: Option<u32>) {
    for exercise in session.exercises.iter_mut() {
        for set in exercise.sets.iter_mut() {
            set.completed = true;
        }
    }
    if let Some(reps) = top_reps
        && let Some(main) = session.exercises.first_mut()
        && let Some(last) = main.sets.last_mut()
    {
        last.actual_reps = Some(reps);
    }
}

/// Parses a max entry: a one-rep max ("315") or a rep test ("225x5").
fn parse_max_entry(entry: &str) -> Result<f64, String> {
    let entry = entry.trim().to_lowercase();
    let value = match entry.split_once('x') {
        Some((weight, reps)) => {
            let weight: f64 = weight
                .trim()
                .parse()
                .map_err(|_| format!("invalid weight in '{}'", entry))?;
            let reps: u32 = reps
                .trim()
                .parse()
                .map_err(|_| format!("invalid reps in '{}'", entry))?;
            estimate_one_rep_max(weight, reps)
        }
        None => entry
            .parse()
            .map_err(|_| format!("invalid max '{}'", entry))?,
    };

    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(format!("max must be positive: '{}'", entry))
    }
}

/// Parses a `LIFT=WEIGHT` training max override.
fn parse_override(s: &str) -> Result<(LiftType, f64), String> {
    let (lift, weight) = s
        .split_once('=')
        .ok_or_else(|| format!("expected LIFT=WEIGHT, got '{}'", s))?;
    let lift: LiftType = lift.parse().map_err(|e| format!("{}", e))?;
    let weight: f64 = weight
        .trim()
        .parse()
        .map_err(|_| format!("invalid weight '{}'", weight))?;
    Ok((lift, weight))
}

fn print_session(session: &WorkoutSession, unit: Unit) {
    println!();
    println!("=== {} ===", session.title);
    for exercise in &session.exercises {
        println!();
        println!("{}", exercise.name);
        for set in &exercise.sets {
            let marker = if set.is_warmup {
                " (warmup)"
            } else if set.is_amrap {
                "+"
            } else {
                ""
            };
            if set.weight > 0.0 {
                println!("  {:>7} {} x {}{}", set.weight, unit.label(), set.reps, marker);
            } else {
                println!("  {:>7}    x {}{}", "-", set.reps, marker);
            }
        }
    }
}

fn print_unlocked(id: Option<&str>) {
    if let Some(achievement) = id.and_then(fivethreeone::achievements::find) {
        println!();
        println!("Achievement unlocked: {} - {}", achievement.title, achievement.description);
    }
}
