use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Inspect and edit inherited slicer profiles",
    propagate_version = true
)]
pub struct Cli {
    /// Profiles root (overrides `<repo_path>/resources/profiles` from the config)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    Vendors,
    Profile(ProfileArgs),
    Config(ConfigArgs),
}

#[derive(Clone, Debug, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Yaml,
}

#[derive(Debug, Args)]
pub struct ProfileArgs {
    /// Vendor directory under the profiles root
    #[arg(long)]
    pub vendor: Option<String>,
    /// Key definitions file for value normalization
    #[arg(long)]
    pub definitions: Option<PathBuf>,
    #[command(subcommand)]
    pub command: ProfileCommand,
}

#[derive(Debug, Subcommand)]
pub enum ProfileCommand {
    List,
    Graph(FormatArgs),
    Diagnostics,
    Show(ProfileShowArgs),
    Chain(ProfileNameArgs),
    #[command(name = "clone")]
    CloneProfile(ProfileCloneArgs),
    AddChild(ProfileAddChildArgs),
    Delete(ProfileNameArgs),
    Set(ProfileSetArgs),
    Unset(ProfileUnsetArgs),
    Find(ProfileFindArgs),
    /// Open the profile's file in the configured editor
    Open(ProfileNameArgs),
}

#[derive(Debug, Args)]
pub struct FormatArgs {
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct ProfileNameArgs {
    pub name: String,
}

#[derive(Debug, Args)]
pub struct ProfileShowArgs {
    pub name: String,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct ProfileCloneArgs {
    pub source: String,
    pub new_name: String,
}

#[derive(Debug, Args)]
pub struct ProfileAddChildArgs {
    pub parent: String,
    pub new_name: String,
}

#[derive(Debug, Args)]
pub struct ProfileSetArgs {
    pub name: String,
    #[arg(long = "set", value_parser = parse_kv_pair, required = true)]
    pub values: Vec<(String, String)>,
}

#[derive(Debug, Args)]
pub struct ProfileUnsetArgs {
    pub name: String,
    pub key: String,
}

#[derive(Debug, Args)]
pub struct ProfileFindArgs {
    pub name: String,
    /// Directory to search (not recursive)
    #[arg(long)]
    pub dir: PathBuf,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    Show,
    Paths,
    Reset,
}

fn parse_kv_pair(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| "expected KEY=VALUE format".to_string())?;
    let key = key.trim();
    let value = value.trim();
    if key.is_empty() {
        return Err("key cannot be empty".into());
    }
    Ok((key.to_string(), value.to_string()))
}
