use std::io::{ErrorKind, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use log::{debug, info};
use ssh2::{Channel, Session};

use crate::apply_conf::{Connector, RemoteShell};
use crate::config::ConnectionSettings;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const SESSION_TIMEOUT_MS: u32 = 30_000;
const BANNER_READ_LIMIT: usize = 5000;
const TERMINAL_TYPE: &str = "vt100";

/// Opens password-authenticated SSH shells on the configured appliance.
///
/// The server host key is accepted without verification.
pub(crate) struct SshConnector<'a> {
    settings: &'a ConnectionSettings,
}

pub(crate) struct SshShell {
    session: Session,
    channel: Channel,
}

impl<'a> SshConnector<'a> {
    pub(crate) fn new(settings: &'a ConnectionSettings) -> Self {
        Self { settings }
    }
}

impl Connector for SshConnector<'_> {
    type Shell = SshShell;

    fn open_shell(&self) -> Result<SshShell, anyhow::Error> {
        let host = &self.settings.host;
        let address = (host.as_str(), self.settings.port)
            .to_socket_addrs()
            .with_context(|| format!("Resolving '{host}'"))?
            .next()
            .ok_or_else(|| anyhow!("No address found for '{host}'"))?;

        info!("Connecting to {address}...");

        let tcp = TcpStream::connect_timeout(&address, CONNECT_TIMEOUT).context("Connecting")?;

        let mut session = Session::new().context("Creating SSH session")?;
        session.set_tcp_stream(tcp);
        session.set_timeout(SESSION_TIMEOUT_MS);
        session.handshake().context("SSH handshake")?;

        session
            .userauth_password(&self.settings.username, &self.settings.password)
            .context("Authenticating")?;
        if !session.authenticated() {
            bail!("Authentication rejected for user '{}'", self.settings.username);
        }
        debug!("Authenticated as '{}'", self.settings.username);

        let mut channel = session.channel_session().context("Opening channel")?;
        channel
            .request_pty(TERMINAL_TYPE, None, None)
            .context("Requesting PTY")?;
        channel.shell().context("Starting shell")?;

        Ok(SshShell { session, channel })
    }
}

impl RemoteShell for SshShell {
    fn send(&mut self, text: &str) -> Result<(), anyhow::Error> {
        self.channel.write_all(text.as_bytes())?;
        self.channel.flush()?;

        Ok(())
    }

    fn discard_output(&mut self) -> Result<usize, anyhow::Error> {
        let mut buffer = [0u8; BANNER_READ_LIMIT];

        // A single non-blocking read; an idle shell must not stall the session.
        self.session.set_blocking(false);
        let result = self.channel.read(&mut buffer);
        self.session.set_blocking(true);

        match result {
            Ok(size) => Ok(size),
            Err(err) if err.kind() == ErrorKind::WouldBlock => Ok(0),
            Err(err) => Err(err.into()),
        }
    }

    fn close(self) -> Result<(), anyhow::Error> {
        // The appliance may already have dropped the connection after `exit`.
        if let Err(err) = self
            .session
            .disconnect(None, "Configuration finished", None)
        {
            debug!("Disconnect failed: {err}");
        }

        Ok(())
    }
}
