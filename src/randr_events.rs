//! RandR change notifications as reconcile triggers

use anyhow::{bail, Context, Result};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::time::Duration;
use tracing::{debug, info};
use x11rb::connection::Connection;
use x11rb::protocol::randr::{ConnectionExt as RandrExt, NotifyMask};
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;

use crate::daemon::Worker;
use crate::reconcile::Trigger;

/// Lowest RandR version with output change notifications
const RANDR_MAJOR: u32 = 1;
const RANDR_MINOR: u32 = 2;

/// Watches the root window for output changes and forwards one trigger per
/// burst. Triggers carry no payload; a full channel already holds one.
pub struct RandrEvents {
    conn: RustConnection,
    triggers: Sender<Trigger>,
    poll_interval: Duration,
    stop_tx: Sender<()>,
    stop_rx: Receiver<()>,
}

impl RandrEvents {
    pub fn connect(triggers: Sender<Trigger>, poll_interval: Duration) -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(None).context("Failed to connect to X server")?;
        let root = conn
            .setup()
            .roots
            .get(screen_num)
            .map(|screen| screen.root)
            .context(format!("X server has no screen {screen_num}"))?;

        let version = conn
            .randr_query_version(RANDR_MAJOR, RANDR_MINOR)
            .context("Failed to query RandR version")?
            .reply()
            .context("RandR extension is not available")?;
        if (version.major_version, version.minor_version) < (RANDR_MAJOR, RANDR_MINOR) {
            bail!(
                "RandR {}.{} is too old, need {RANDR_MAJOR}.{RANDR_MINOR}",
                version.major_version,
                version.minor_version
            );
        }

        conn.randr_select_input(
            root,
            NotifyMask::SCREEN_CHANGE | NotifyMask::OUTPUT_CHANGE | NotifyMask::CRTC_CHANGE,
        )
        .context("Failed to select RandR input")?
        .check()
        .context("X server rejected RandR event selection")?;
        conn.flush().context("Failed to flush X11 connection")?;

        info!(
            screen = screen_num,
            root = root,
            randr = %format!("{}.{}", version.major_version, version.minor_version),
            "Subscribed to RandR events"
        );

        let (stop_tx, stop_rx) = bounded(1);
        Ok(Self {
            conn,
            triggers,
            poll_interval,
            stop_tx,
            stop_rx,
        })
    }

    fn drain_events(&self) -> Result<()> {
        while let Some(event) = self.conn.poll_for_event().context("Lost connection to X server")? {
            match event {
                Event::RandrScreenChangeNotify(_) | Event::RandrNotify(_) => notify(&self.triggers)?,
                other => debug!(event = ?other, "Ignoring X event"),
            }
        }
        Ok(())
    }
}

/// Queue a change trigger unless one is already pending
fn notify(triggers: &Sender<Trigger>) -> Result<()> {
    match triggers.try_send(Trigger::change()) {
        Ok(()) => debug!("Output change, trigger queued"),
        Err(TrySendError::Full(_)) => debug!("Output change coalesced into pending trigger"),
        Err(TrySendError::Disconnected(_)) => bail!("trigger channel closed"),
    }
    Ok(())
}

impl Worker for RandrEvents {
    fn name(&self) -> &str {
        "randr-events"
    }

    fn start(&self) -> Result<()> {
        loop {
            match self.stop_rx.recv_timeout(self.poll_interval) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                    info!("RandR event listener stopped");
                    return Ok(());
                }
                Err(RecvTimeoutError::Timeout) => self.drain_events()?,
            }
        }
    }

    fn stop(&self) -> Result<()> {
        let _ = self.stop_tx.try_send(());
        Ok(())
    }
}
