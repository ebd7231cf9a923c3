//! Invoking the xrandr command-line tool
//!
//! The daemon never changes the arrangement itself: it reads the textual report
//! and issues one textual command per output.

use anyhow::{bail, Context, Result};
use std::fmt;
use std::process::Command;
use tracing::debug;

use super::types::{Output, Position, Reflection, Resolution, Rotation};
use crate::constants::xrandr as consts;

/// The display subsystem as seen by the reconciliation engine
pub trait DisplayServer: Send + Sync {
    /// Fetch the raw `--props` report
    fn query(&self) -> Result<Vec<u8>>;

    /// Apply one command to one output
    fn apply(&self, command: &ApplyCommand) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeSelection {
    Named(Resolution),
    /// Let xrandr pick the preferred mode, or the first listed one
    Auto,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyAction {
    Off,
    On {
        mode: ModeSelection,
        position: Position,
        rotation: Rotation,
        reflection: Reflection,
        primary: bool,
    },
}

/// One `xrandr --output <name> ...` invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyCommand {
    pub output: String,
    pub action: ApplyAction,
}

impl ApplyCommand {
    pub fn off(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            action: ApplyAction::Off,
        }
    }

    /// Command restoring an output exactly as it was recorded
    pub fn replay(output: &Output) -> Self {
        if !output.is_connected || !output.is_enabled {
            return Self::off(&output.name);
        }

        // The header reports the rotated geometry; the mode is unrotated.
        let mode = output
            .current_mode()
            .map(|mode| mode.resolution)
            .unwrap_or_else(|| {
                if output.rotation.is_sideways() {
                    output.resolution.transposed()
                } else {
                    output.resolution
                }
            });

        Self {
            output: output.name.clone(),
            action: ApplyAction::On {
                mode: ModeSelection::Named(mode),
                position: output.position,
                rotation: output.rotation,
                reflection: output.reflection,
                primary: output.is_primary,
            },
        }
    }

    pub fn args(&self) -> Vec<String> {
        let mut args = vec!["--output".to_string(), self.output.clone()];
        match &self.action {
            ApplyAction::Off => args.push("--off".to_string()),
            ApplyAction::On {
                mode,
                position,
                rotation,
                reflection,
                primary,
            } => {
                match mode {
                    ModeSelection::Named(resolution) => {
                        args.push("--mode".to_string());
                        args.push(resolution.to_string());
                    }
                    ModeSelection::Auto => args.push("--auto".to_string()),
                }
                args.extend([
                    "--pos".to_string(),
                    position.to_string(),
                    "--rotate".to_string(),
                    rotation.as_arg().to_string(),
                    "--reflect".to_string(),
                    reflection.as_arg().to_string(),
                ]);
                if *primary {
                    args.push("--primary".to_string());
                }
            }
        }
        args
    }
}

impl fmt::Display for ApplyCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.args().join(" "))
    }
}

/// [`DisplayServer`] backed by the `xrandr` executable
pub struct XrandrCli {
    program: String,
}

impl XrandrCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn run(&self, args: &[String]) -> Result<Vec<u8>> {
        debug!(command = %self.program, args = ?args, "Running command");
        let output = Command::new(&self.program)
            .args(args)
            .output()
            .context(format!("Failed to run {}", self.program))?;

        if !output.status.success() {
            bail!(
                "{} {} exited with {}: {}",
                self.program,
                args.join(" "),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(output.stdout)
    }
}

impl DisplayServer for XrandrCli {
    fn query(&self) -> Result<Vec<u8>> {
        self.run(&[consts::PROPS_FLAG.to_string()])
    }

    fn apply(&self, command: &ApplyCommand) -> Result<()> {
        self.run(&command.args()).map(|_| ())
    }
}
