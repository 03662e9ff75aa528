use breathroom_core::{BreathPattern, Config};
use clap::Subcommand;

#[derive(Subcommand)]
pub enum PatternsAction {
    /// List built-in and custom patterns
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one pattern as JSON
    Show {
        /// Pattern ID (e.g. "4-7-8", "box")
        id: String,
    },
}

pub fn run(action: PatternsAction) -> Result<(), Box<dyn std::error::Error>> {
    let library = Config::load()?.library()?;

    match action {
        PatternsAction::List { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(library.patterns())?);
            } else {
                for pattern in library.patterns() {
                    println!("{}", summary_line(pattern));
                }
            }
        }
        PatternsAction::Show { id } => {
            let pattern = library.get(&id)?;
            println!("{}", serde_json::to_string_pretty(pattern)?);
        }
    }
    Ok(())
}

fn summary_line(pattern: &BreathPattern) -> String {
    format!(
        "{:<12} {:<10} {:>5.1} bpm  {}",
        pattern.id,
        pattern.timing_label(),
        pattern.breaths_per_minute(),
        pattern.name
    )
}
