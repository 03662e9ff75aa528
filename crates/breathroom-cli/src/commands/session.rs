use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use breathroom_core::cue::{AmbientController, AmbientSink, HapticPattern, HapticSink, PhaseCue};
use breathroom_core::ramp::RampConfig;
use breathroom_core::session::{simulate, SimulationStep};
use breathroom_core::{
    Config, CueDispatcher, CueError, CueSink, Event, MonotonicClock, PatternLibrary,
    SessionEngine, SessionRunner, SessionSettings,
};
use clap::{Args, Subcommand};
use tracing::debug;

const DEFAULT_RAMP_SECS: f64 = 60.0;

#[derive(Args)]
pub struct SessionArgs {
    /// Pattern ID (defaults to the configured pattern)
    #[arg(long, conflicts_with = "preset")]
    pattern: Option<String>,
    /// Purpose preset ID (e.g. "sleep", "wind-down")
    #[arg(long)]
    preset: Option<String>,
    /// Session length in minutes
    #[arg(long, conflicts_with = "seconds")]
    minutes: Option<u32>,
    /// Session length in seconds
    #[arg(long)]
    seconds: Option<f64>,
    /// Ramp from this pattern to the session pattern
    #[arg(long)]
    ramp_from: Option<String>,
    /// Ramp length in seconds [default: 60]
    #[arg(long, requires = "ramp_from")]
    ramp_secs: Option<f64>,
    /// Countdown before the first breath
    #[arg(long)]
    countdown: Option<u32>,
    /// Output events as JSON lines
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
pub enum SessionAction {
    /// Run a live session on the real clock
    Run {
        #[command(flatten)]
        args: SessionArgs,
    },
    /// Replay a session instantly on a simulated clock
    Simulate {
        #[command(flatten)]
        args: SessionArgs,
        /// Pause after this many seconds of session time
        #[arg(long, requires = "pause_for")]
        pause_at: Option<f64>,
        /// Pause length in seconds
        #[arg(long)]
        pause_for: Option<f64>,
        /// Leave the session running unticked during the gap instead of pausing
        #[arg(long, requires = "pause_at")]
        background: bool,
        /// Tick interval in milliseconds
        #[arg(long, default_value = "100")]
        tick_ms: u64,
        /// Print the whole report instead of the final snapshot
        #[arg(long)]
        report: bool,
    },
}

pub fn run(action: SessionAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let library = config.library()?;

    match action {
        SessionAction::Run { args } => {
            let settings = build_settings(&args, &config, &library)?;
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(run_live(settings, &config, args.json))?;
        }
        SessionAction::Simulate {
            args,
            pause_at,
            pause_for,
            background,
            tick_ms,
            report,
        } => {
            let settings = build_settings(&args, &config, &library)?;
            let mut plan = Vec::new();
            if let (Some(at), Some(length)) = (pause_at, pause_for) {
                plan.push(SimulationStep::Run(secs(at)?));
                let gap = secs(length)?;
                plan.push(if background {
                    SimulationStep::Background(gap)
                } else {
                    SimulationStep::Pause(gap)
                });
            }
            plan.push(SimulationStep::RunToEnd);

            let result = simulate(settings, &plan, Duration::from_millis(tick_ms))?;
            if report {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("{}", serde_json::to_string_pretty(&result.final_state)?);
            }
        }
    }
    Ok(())
}

fn secs(value: f64) -> Result<Duration, Box<dyn std::error::Error>> {
    Duration::try_from_secs_f64(value).map_err(|e| format!("invalid duration {value}: {e}").into())
}

fn build_settings(
    args: &SessionArgs,
    config: &Config,
    library: &PatternLibrary,
) -> Result<SessionSettings, Box<dyn std::error::Error>> {
    let mut settings = if let Some(id) = &args.preset {
        SessionSettings::from_preset(library.get_preset(id)?)
    } else if let Some(id) = &args.pattern {
        SessionSettings::new(
            library.get(id)?.clone(),
            f64::from(config.session.duration_min) * 60.0,
        )
    } else {
        config.session_settings(library)?
    };

    settings.countdown_secs = args.countdown.unwrap_or(config.session.countdown_secs);
    if let Some(seconds) = args.seconds {
        settings.total_duration_secs = seconds;
    } else if let Some(minutes) = args.minutes {
        settings.total_duration_secs = f64::from(minutes) * 60.0;
    }
    if let Some(from) = &args.ramp_from {
        let ramp = RampConfig::new(
            library.get(from)?.clone(),
            settings.pattern.clone(),
            args.ramp_secs.unwrap_or(DEFAULT_RAMP_SECS),
        )?;
        settings = settings.with_ramp(ramp);
    }

    settings.validate()?;
    Ok(settings)
}

async fn run_live(
    settings: SessionSettings,
    config: &Config,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let cues = if json {
        CueDispatcher::silent()
    } else {
        let mut cues = CueDispatcher::new(config.cue_settings(), Box::new(TerminalCueSink));
        if config.haptics.enabled {
            cues = cues.with_haptics(Box::new(TerminalCueSink));
        }
        if let Some(sound) = config.ambient.sound {
            cues = cues.with_ambient(AmbientController::new(
                Box::new(TerminalCueSink),
                sound.id(),
                config.ambient_volume(),
            ));
        }
        cues
    };

    let engine = SessionEngine::new(settings, Arc::new(MonotonicClock::new()), cues)?;
    let mut runner = SessionRunner::new(engine, config.tick_interval());
    let mut events = runner.subscribe();
    runner.start();

    while let Some(event) = events.recv().await {
        if json {
            println!("{}", serde_json::to_string(&event)?);
        } else {
            print_event(&event);
        }
        if event.is_terminal() {
            break;
        }
    }
    runner.wait_until_finished().await;
    debug!(state = ?runner.snapshot().status, "session finished");
    Ok(())
}

fn print_event(event: &Event) {
    match event {
        Event::SessionStarted {
            pattern_id,
            total_duration_secs,
            ..
        } => println!("Starting {pattern_id} for {total_duration_secs:.0}s"),
        Event::CountdownTick { remaining_secs, .. } => println!("{remaining_secs}..."),
        Event::PhaseEntered {
            phase,
            phase_duration_secs,
            breath_count,
            ..
        } => println!(
            "{:<12} {phase_duration_secs:>4.1}s  (breaths: {breath_count})",
            phase.label()
        ),
        Event::SessionCompleted {
            breath_count,
            total_elapsed_secs,
            ..
        } => println!("Complete: {breath_count} breaths in {total_elapsed_secs:.0}s"),
        Event::SessionStopped { breath_count, .. } => {
            println!("Stopped after {breath_count} breaths")
        }
        Event::SessionAborted { reason, .. } => eprintln!("Session aborted: {reason}"),
        _ => {}
    }
}

/// Voices cues as lines on stdout.
struct TerminalCueSink;

fn say(line: std::fmt::Arguments<'_>) -> Result<(), CueError> {
    let mut out = std::io::stdout().lock();
    writeln!(out, "{line}")
        .and_then(|()| out.flush())
        .map_err(|e| CueError::AudioUnavailable(e.to_string()))
}

impl CueSink for TerminalCueSink {
    fn phase_enter(&mut self, cue: &PhaseCue<'_>) -> Result<(), CueError> {
        say(format_args!("  ♪ {} ({:.0}%)", cue.sound_key(), cue.volume * 100.0))
    }

    fn session_complete(&mut self, _breath_count: u32, _volume: f64) -> Result<(), CueError> {
        say(format_args!("  ♪ chime"))
    }
}

impl HapticSink for TerminalCueSink {
    fn pulse(&mut self, pattern: HapticPattern) -> Result<(), CueError> {
        say(format_args!("  ≈ {pattern:?} ({}ms)", pattern.duration_ms()))
    }
}

impl AmbientSink for TerminalCueSink {
    fn start_ambient(&mut self, id: &str, volume: f64) -> Result<(), CueError> {
        say(format_args!("  ~ {id} ({:.0}%)", volume * 100.0))
    }

    fn stop_ambient(&mut self) -> Result<(), CueError> {
        say(format_args!("  ~ off"))
    }
}
