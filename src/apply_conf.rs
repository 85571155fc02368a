use std::num::NonZeroUsize;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};

use crate::config::{ConnectionSettings, GroupSettings};
use crate::generate_conf::generate_commands;
use crate::read_sheet::read_entries;
use crate::ssh::SshConnector;

const PROGRESS_TEMPLATE: &str = "{spinner:.blue} Processing [{bar:40}] {pos}/{len} batches ({elapsed})";

/// An interactive shell on the appliance. Output is never interpreted.
pub(crate) trait RemoteShell {
    fn send(&mut self, text: &str) -> Result<(), anyhow::Error>;

    /// Drop whatever output is currently buffered, returning its size.
    fn discard_output(&mut self) -> Result<usize, anyhow::Error>;

    fn close(self) -> Result<(), anyhow::Error>;
}

pub(crate) trait Connector {
    type Shell: RemoteShell;

    /// Connect, authenticate and start an interactive shell.
    fn open_shell(&self) -> Result<Self::Shell, anyhow::Error>;
}

/// Fixed delays between the steps of a session.
///
/// The appliance shell has no flow control, so every command is followed by
/// an unconditional sleep instead of waiting for a prompt.
#[derive(Debug)]
pub(crate) struct Pacing {
    pub(crate) settle: Duration,
    pub(crate) context: Duration,
    pub(crate) command: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            settle: Duration::from_secs(1),
            context: Duration::from_secs(1),
            command: Duration::from_millis(1200),
        }
    }
}

pub(crate) fn apply(input: &str, sheet: &str, batch_size: NonZeroUsize) -> Result<(), anyhow::Error> {
    let connection = ConnectionSettings::from_env().context("Loading connection settings")?;
    let groups = GroupSettings::from_env().context("Loading group settings")?;

    let connector = SshConnector::new(&connection);

    provision(
        &connector,
        &connection.vdom,
        &groups,
        input,
        sheet,
        batch_size,
        &Pacing::default(),
    )
}

/// Read the sheet, render its commands and replay them through `connector`.
///
/// An empty sheet is not an error and never opens a session.
fn provision<C: Connector>(
    connector: &C,
    vdom: &str,
    groups: &GroupSettings,
    input: &str,
    sheet: &str,
    batch_size: NonZeroUsize,
    pacing: &Pacing,
) -> Result<(), anyhow::Error> {
    let entries = read_entries(input, sheet);
    if entries.is_empty() {
        warn!("No MAC addresses found. Check the spreadsheet format.");
        return Ok(());
    }

    let commands = generate_commands(&entries, &groups.prefix, groups.max_size);
    debug!("Generated {} commands", commands.len());

    let sent = execute(connector, vdom, &commands, batch_size, pacing)?;

    info!("Sent {sent} commands for {} MAC addresses", entries.len());

    Ok(())
}

/// Replay `commands` in order over a fresh shell session.
///
/// Nothing is read back after the initial banner; a failure at any step ends
/// the session without retrying.
pub(crate) fn execute<C: Connector>(
    connector: &C,
    vdom: &str,
    commands: &[String],
    batch_size: NonZeroUsize,
    pacing: &Pacing,
) -> Result<usize, anyhow::Error> {
    let mut shell = connector.open_shell().context("Opening remote shell")?;

    thread::sleep(pacing.settle);
    let discarded = shell.discard_output().context("Clearing initial output")?;
    debug!("Discarded {discarded} bytes of initial output");

    if !vdom.is_empty() {
        info!("Entering VDOM '{vdom}'");
        shell
            .send(&format!("config vdom\nedit {vdom}\n"))
            .context("Selecting VDOM")?;
        thread::sleep(pacing.context);
    }

    shell
        .send("config global\n")
        .context("Entering global configuration")?;
    thread::sleep(pacing.context);

    info!("Adding {} entries...", commands.len());

    let batches = commands.len().div_ceil(batch_size.get());
    let progress = ProgressBar::new(batches as u64);
    progress.set_style(ProgressStyle::with_template(PROGRESS_TEMPLATE).context("Progress style")?);

    stream_commands(&mut shell, commands, batch_size, pacing, &progress)?;

    shell.send("end\nexit\n").context("Leaving configuration")?;
    shell.close().context("Disconnecting")?;

    Ok(commands.len())
}

// Nothing is logged while the bar is drawn. On failure the bar is abandoned
// so the error reported by the caller lands below it.
fn stream_commands<S: RemoteShell>(
    shell: &mut S,
    commands: &[String],
    batch_size: NonZeroUsize,
    pacing: &Pacing,
    progress: &ProgressBar,
) -> Result<(), anyhow::Error> {
    let result = commands
        .chunks(batch_size.get())
        .enumerate()
        .try_for_each(|(i, batch)| {
            for (j, command) in batch.iter().enumerate() {
                let position = i * batch_size.get() + j + 1;
                shell
                    .send(&format!("{command}\n"))
                    .with_context(|| format!("Sending command {position}/{}", commands.len()))?;
                thread::sleep(pacing.command);
            }

            progress.inc(1);
            Ok::<(), anyhow::Error>(())
        });

    match &result {
        Ok(()) => progress.finish_and_clear(),
        Err(..) => progress.abandon(),
    }

    result
}
