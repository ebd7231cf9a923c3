//! Layout reconciliation
//!
//! Every trigger runs one pass: query the current outputs, fingerprint them,
//! then either create a default layout for unseen hardware, refresh the saved
//! layout for the active hardware, or switch back to a previously saved one.

use anyhow::{bail, Result};
use crossbeam_channel::{bounded, select, Receiver, Sender};
use std::fmt;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::daemon::Worker;
use crate::fingerprint::Fingerprint;
use crate::store::{Backend, LayoutStore, StoreError};
use crate::xrandr::{
    parse_snapshot, ApplyAction, ApplyCommand, DisplayServer, ModeSelection, ParseError, Position, Reflection,
    Rotation, Snapshot,
};

/// Zero-payload notification that the outputs may have changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Trigger {
    /// Synthesized once when the daemon starts
    pub is_startup: bool,
}

impl Trigger {
    pub fn startup() -> Self {
        Self { is_startup: true }
    }

    pub fn change() -> Self {
        Self { is_startup: false }
    }
}

/// What a completed pass did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Created,
    Refreshed,
    Switched,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Outcome::Created => "created",
            Outcome::Refreshed => "refreshed",
            Outcome::Switched => "switched",
        })
    }
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("failed to query outputs")]
    Query(#[source] anyhow::Error),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to apply layout to output {output}")]
    Apply {
        output: String,
        #[source]
        source: anyhow::Error,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct ReconcileOptions {
    /// Replay the saved layout on the startup trigger even when the hardware
    /// matches the latest layout
    pub reapply_on_startup: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            reapply_on_startup: true,
        }
    }
}

pub struct Reconciler<D: DisplayServer, B: Backend> {
    display: D,
    store: LayoutStore<B>,
    triggers: Receiver<Trigger>,
    stop_tx: Sender<()>,
    stop_rx: Receiver<()>,
    options: ReconcileOptions,
}

impl<D: DisplayServer, B: Backend> Reconciler<D, B> {
    pub fn new(display: D, store: LayoutStore<B>, triggers: Receiver<Trigger>, options: ReconcileOptions) -> Self {
        let (stop_tx, stop_rx) = bounded(1);
        Self {
            display,
            store,
            triggers,
            stop_tx,
            stop_rx,
            options,
        }
    }

    /// Run one full pass for `trigger`
    pub fn reconcile(&self, trigger: Trigger) -> Result<Outcome, ReconcileError> {
        debug!(startup = trigger.is_startup, "Reconciling outputs");

        let current = self.query()?;
        let fingerprint = Fingerprint::of(&current);
        let latest = self.store.latest_fingerprint()?;
        debug!(fingerprint = %fingerprint, latest = ?latest.as_ref().map(Fingerprint::as_str), "Fingerprinted outputs");

        let Some(saved) = self.store.saved_snapshot(&fingerprint)? else {
            info!(fingerprint = %fingerprint, "Creating new layout");
            self.apply_all(&default_layout(&current))?;

            // Store what the server actually did, not what was asked for.
            let applied = self.query()?;
            self.store.save_snapshot(&fingerprint, &applied)?;
            return Ok(Outcome::Created);
        };

        let forced = trigger.is_startup && self.options.reapply_on_startup;
        if latest.as_ref() == Some(&fingerprint) && !forced {
            info!(fingerprint = %fingerprint, "Updating existing layout");
            self.store.refresh_snapshot(&fingerprint, &current)?;
            return Ok(Outcome::Refreshed);
        }

        info!(
            fingerprint = %fingerprint,
            previous = latest.as_ref().map_or("", Fingerprint::as_str),
            "Switching to saved layout"
        );
        let commands: Vec<ApplyCommand> = saved.outputs.iter().map(ApplyCommand::replay).collect();
        self.apply_all(&commands)?;
        self.store.set_latest(&fingerprint)?;
        Ok(Outcome::Switched)
    }

    fn query(&self) -> Result<Snapshot, ReconcileError> {
        let raw = self.display.query().map_err(ReconcileError::Query)?;
        Ok(parse_snapshot(&raw)?)
    }

    /// Stops at the first failing output; earlier outputs stay applied
    fn apply_all(&self, commands: &[ApplyCommand]) -> Result<(), ReconcileError> {
        for command in commands {
            debug!(command = %command, "Applying");
            self.display.apply(command).map_err(|source| ReconcileError::Apply {
                output: command.output.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

impl<D: DisplayServer, B: Backend> Worker for Reconciler<D, B> {
    fn name(&self) -> &str {
        "reconciler"
    }

    fn start(&self) -> Result<()> {
        loop {
            select! {
                recv(self.stop_rx) -> _ => {
                    info!("Reconciler stopped");
                    return Ok(());
                }
                recv(self.triggers) -> trigger => {
                    let Ok(trigger) = trigger else {
                        bail!("trigger channel closed");
                    };
                    match self.reconcile(trigger) {
                        Ok(outcome) => info!(outcome = %outcome, "Reconciled outputs"),
                        Err(ReconcileError::Parse(e)) => {
                            error!(line = e.line(), column = e.column(), error = %e, "Failed to parse xrandr report");
                        }
                        Err(e) => error!(error = %format!("{:#}", anyhow::Error::from(e)), "Reconcile pass failed"),
                    }
                }
            }
        }
    }

    fn stop(&self) -> Result<()> {
        // A full slot already holds a pending stop.
        let _ = self.stop_tx.try_send(());
        Ok(())
    }
}

/// Layout for hardware with no saved arrangement: connected outputs side by
/// side in reported order, the first one primary, the rest turned off
pub fn default_layout(snapshot: &Snapshot) -> Vec<ApplyCommand> {
    let mut commands = Vec::with_capacity(snapshot.outputs.len());
    let mut next_x: i32 = 0;
    let mut primary_taken = false;

    for output in &snapshot.outputs {
        if !output.is_connected {
            commands.push(ApplyCommand::off(&output.name));
            continue;
        }

        let (mode, width) = match output.preferred_mode() {
            Some(preferred) => (ModeSelection::Named(preferred.resolution), preferred.resolution.width),
            // --auto picks the first listed mode when none is preferred
            None => (ModeSelection::Auto, output.modes.first().map_or(0, |mode| mode.resolution.width)),
        };

        commands.push(ApplyCommand {
            output: output.name.clone(),
            action: ApplyAction::On {
                mode,
                position: Position::new(next_x, 0),
                rotation: Rotation::Normal,
                reflection: Reflection::None,
                primary: !primary_taken,
            },
        });
        primary_taken = true;
        next_x = next_x.saturating_add(i32::try_from(width).unwrap_or(i32::MAX));
    }

    commands
}
