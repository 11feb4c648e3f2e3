mod error;
mod graph;
mod kind;
mod model;
mod mutation;
mod projection;
mod resolver;
mod session;
mod store;

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use serde_json::Value;

use crate::cli::{
    OutputFormat, ProfileAddChildArgs, ProfileArgs, ProfileCloneArgs, ProfileCommand,
    ProfileFindArgs, ProfileNameArgs, ProfileSetArgs, ProfileShowArgs, ProfileUnsetArgs,
};
use crate::config::AppConfig;

pub use error::{Diagnostic, ProfileError, ProfileResult};
pub use graph::InheritanceGraph;
pub use kind::{FloatOrPercent, KeyDefinition, KindDictionary, ScalarKind, ValueKind};
pub use model::{ProfileDocument, ProfileNode, RawRecord};
pub use mutation::{MutationService, profile_path, validate_name};
pub use projection::{GraphProjection, ProjectedEdge, ProjectedNode};
pub use resolver::{ConfigResolver, Layer, LayeredValue, ResolvedConfig};
pub use session::{ChangeTracker, VendorSession};
pub use store::{LoadOutcome, ProfileStore};

pub fn handle_vendors(profiles_root: &Path) -> Result<()> {
    let vendors = ProfileStore::new()
        .list_vendors(profiles_root)
        .with_context(|| format!("failed to list vendors under {:?}", profiles_root))?;
    for vendor in vendors {
        println!("{}", vendor);
    }
    Ok(())
}

pub fn handle_profile(args: ProfileArgs, profiles_root: &Path, config: &AppConfig) -> Result<()> {
    let ProfileArgs {
        vendor,
        definitions,
        command,
    } = args;
    let loader = SessionLoader {
        vendor,
        definitions,
        profiles_root,
        config,
    };

    match command {
        ProfileCommand::Find(ProfileFindArgs { name, dir }) => {
            match ProfileStore::new().find_by_name(&dir, &name)? {
                Some(path) => println!("{}", path.display()),
                None => anyhow::bail!("no profile named '{}' in {:?}", name, dir),
            }
        }
        ProfileCommand::List => {
            let session = loader.open()?;
            for name in session.graph().names() {
                println!("{}", name);
            }
        }
        ProfileCommand::Graph(format) => {
            let projection = loader.open()?.projection();
            match format.format {
                OutputFormat::Text => {
                    for node in &projection.nodes {
                        println!("{} ({})", node.id, node.file_path);
                    }
                    for edge in &projection.edges {
                        println!("{} -> {}", edge.source, edge.target);
                    }
                }
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&projection)?),
                OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&projection)?),
            }
        }
        ProfileCommand::Diagnostics => {
            let session = loader.open()?;
            if session.diagnostics().is_empty() {
                println!("no diagnostics");
            }
            for diagnostic in session.diagnostics() {
                println!("{}", diagnostic);
            }
        }
        ProfileCommand::Show(ProfileShowArgs { name, format }) => {
            let resolved = loader.open()?.resolve(&name)?;
            match format {
                OutputFormat::Text => print_resolved(&resolved),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&resolved)?),
                OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&resolved)?),
            }
        }
        ProfileCommand::Chain(ProfileNameArgs { name }) => {
            let session = loader.open()?;
            let chain = session.graph().ancestor_chain(&name)?;
            for (depth, node) in chain.iter().enumerate() {
                println!("{}{} ({})", "  ".repeat(depth), node.name, node.file_path.display());
            }
        }
        ProfileCommand::CloneProfile(ProfileCloneArgs { source, new_name }) => {
            let node = loader.open()?.clone_profile(&source, &new_name)?;
            println!("profile '{}' cloned to {:?}", source, node.file_path);
        }
        ProfileCommand::AddChild(ProfileAddChildArgs { parent, new_name }) => {
            let node = loader.open()?.add_child(&parent, &new_name)?;
            println!("profile '{}' created at {:?}", node.name, node.file_path);
        }
        ProfileCommand::Delete(ProfileNameArgs { name }) => {
            loader.open()?.delete(&name)?;
            println!("profile '{}' deleted", name);
        }
        ProfileCommand::Set(ProfileSetArgs { name, values }) => {
            let mut session = loader.open()?;
            for (key, value) in values {
                session.set_key_value(&name, &key, parse_value(&value))?;
            }
            println!("profile '{}' updated", name);
        }
        ProfileCommand::Unset(ProfileUnsetArgs { name, key }) => {
            loader.open()?.delete_key_override(&name, &key)?;
            println!("override of '{}' removed from '{}'", key, name);
        }
        ProfileCommand::Open(ProfileNameArgs { name }) => {
            let session = loader.open()?;
            let node = session.graph().require(&name)?;
            open_in_editor(&config.profiles.editor_command(), &node.file_path)?;
            println!("opened {:?}", node.file_path);
        }
    }
    Ok(())
}

/// Everything needed to load the selected vendor, deferred until a command
/// actually needs the graph.
struct SessionLoader<'a> {
    vendor: Option<String>,
    definitions: Option<PathBuf>,
    profiles_root: &'a Path,
    config: &'a AppConfig,
}

impl SessionLoader<'_> {
    fn open(&self) -> Result<VendorSession> {
        let vendor_dir = self.vendor_dir()?;
        let mut session = VendorSession::open(&vendor_dir)
            .with_context(|| format!("failed to load profiles from {:?}", vendor_dir))?;
        if let Some(path) = self
            .definitions
            .clone()
            .or_else(|| self.config.profiles.definitions_path())
        {
            let kinds = KindDictionary::load(&path)
                .with_context(|| format!("failed to load key definitions from {:?}", path))?;
            session = session.with_kinds(kinds);
        }
        Ok(session)
    }

    fn vendor_dir(&self) -> Result<PathBuf> {
        let vendor = self
            .vendor
            .as_ref()
            .or(self.config.profiles.default_vendor.as_ref())
            .context("no vendor selected; pass --vendor or set profiles.default_vendor")?;
        Ok(self.profiles_root.join(vendor))
    }
}

/// Starts the editor on `file` without waiting for it to exit.
fn open_in_editor(command: &[String], file: &Path) -> Result<()> {
    let (program, leading) = command
        .split_first()
        .context("no editor configured; set profiles.editor")?;
    Command::new(program)
        .args(leading)
        .arg(file)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("failed to start editor '{}'", program))?;
    log::debug!("spawned '{}' for {:?}", program, file);
    Ok(())
}

/// Command-line values are JSON when they parse as JSON, plain strings
/// otherwise.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn print_resolved(resolved: &ResolvedConfig) {
    println!("{} ({})", resolved.name, resolved.chain.join(" < "));
    for (key, layered) in &resolved.entries {
        let breadcrumb: Vec<String> = layered.values().map(display_value).collect();
        let marker = if layered.editable { '*' } else { ' ' };
        println!("{} {}: {}", marker, key, breadcrumb.join(" > "));
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
