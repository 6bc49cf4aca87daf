use super::Parser;

/// Track visited and planned countries per user.
#[derive(Parser, Debug)]
#[command(name = "travelmap", version)]
pub struct Cli {
    /// Path to a settings file; defaults to settings/dev.toml in debug builds.
    #[arg(long)]
    pub settings: Option<String>,
}
