use breathroom_core::Config;
use clap::Subcommand;

#[derive(Subcommand)]
pub enum PresetsAction {
    /// List purpose presets
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one preset as JSON
    Show {
        /// Preset ID (e.g. "sleep", "focus")
        id: String,
    },
}

pub fn run(action: PresetsAction) -> Result<(), Box<dyn std::error::Error>> {
    let library = Config::load()?.library()?;

    match action {
        PresetsAction::List { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(library.presets())?);
            } else {
                for preset in library.presets() {
                    let ramp = if preset.ramp.is_some() { " (ramp)" } else { "" };
                    println!(
                        "{:<10} {:<8} {:>3} min{ramp}  {}",
                        preset.id, preset.pattern.id, preset.duration_min, preset.name
                    );
                }
            }
        }
        PresetsAction::Show { id } => {
            let preset = library.get_preset(&id)?;
            println!("{}", serde_json::to_string_pretty(preset)?);
        }
    }
    Ok(())
}
