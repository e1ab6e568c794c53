//! SSH transport for device sessions.
//!
//! Provides the raw russh plumbing shared by the generic shell session
//! (exec channel per command) and the switch CLI session (interactive
//! shell channel, see `switch.rs`).

use async_trait::async_trait;
use russh::client;
use russh_keys::key::PublicKey;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;

use super::SessionError;

/// Command execution result
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
    /// Exit code
    pub exit_code: Option<u32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// SSH client handler for russh
struct ClientHandler;

#[async_trait]
impl client::Handler for ClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        // Inventory targets are addressed by the operator's sweep ranges;
        // host keys are not pinned.
        Ok(true)
    }
}

/// SSH client for connecting to devices with password authentication.
pub struct SshClient {
    host: String,
    port: u16,
    username: String,
    password: String,
    timeout_secs: u64,
}

impl SshClient {
    pub fn new(host: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            username: username.into(),
            password: password.into(),
            timeout_secs: 30,
        }
    }

    /// Set connection and per-command timeout
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Connect and authenticate.
    pub async fn connect(&self) -> Result<SshSession, SessionError> {
        let config = Arc::new(client::Config {
            inactivity_timeout: Some(Duration::from_secs(self.timeout_secs * 2)),
            ..Default::default()
        });

        let addr = format!("{}:{}", self.host, self.port);

        let stream = tokio::time::timeout(
            Duration::from_secs(self.timeout_secs),
            TcpStream::connect(&addr),
        )
        .await
        .map_err(|_| SessionError::Connect {
            host: self.host.clone(),
            port: self.port,
        })?
        .map_err(|_| SessionError::Connect {
            host: self.host.clone(),
            port: self.port,
        })?;

        let mut session = client::connect_stream(config, stream, ClientHandler)
            .await
            .map_err(|e| SessionError::Transport {
                host: self.host.clone(),
                message: e.to_string(),
            })?;

        let authenticated = tokio::time::timeout(
            Duration::from_secs(self.timeout_secs),
            session.authenticate_password(self.username.as_str(), self.password.as_str()),
        )
        .await
        .map_err(|_| SessionError::Auth {
            host: self.host.clone(),
            username: self.username.clone(),
        })?
        .map_err(|e| SessionError::Transport {
            host: self.host.clone(),
            message: e.to_string(),
        })?;

        if !authenticated {
            return Err(SessionError::Auth {
                host: self.host.clone(),
                username: self.username.clone(),
            });
        }

        Ok(SshSession {
            session,
            host: self.host.clone(),
            exec_timeout: Duration::from_secs(self.timeout_secs),
        })
    }
}

/// Active SSH session
pub struct SshSession {
    session: client::Handle<ClientHandler>,
    host: String,
    exec_timeout: Duration,
}

impl SshSession {
    /// Execute a command on the remote host over a fresh exec channel.
    /// Bounded by the session's timeout so a hung device cannot wedge a
    /// queue worker.
    pub async fn exec(&self, command: &str) -> Result<CommandOutput, SessionError> {
        tokio::time::timeout(self.exec_timeout, self.exec_inner(command))
            .await
            .map_err(|_| SessionError::Timeout {
                host: self.host.clone(),
            })?
    }

    async fn exec_inner(&self, command: &str) -> Result<CommandOutput, SessionError> {
        let mut channel = self
            .session
            .channel_open_session()
            .await
            .map_err(|e| self.transport_error(e))?;

        channel
            .exec(true, command)
            .await
            .map_err(|e| self.transport_error(e))?;

        // Wait for the channel to close and collect output
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let mut exit_status = None;

        loop {
            match channel.wait().await {
                Some(russh::ChannelMsg::Data { data }) => {
                    stdout.extend_from_slice(&data);
                }
                Some(russh::ChannelMsg::ExtendedData { data, ext }) => {
                    if ext == 1 {
                        stderr.extend_from_slice(&data);
                    }
                }
                Some(russh::ChannelMsg::ExitStatus { exit_status: status }) => {
                    exit_status = Some(status);
                }
                Some(russh::ChannelMsg::Eof) => {}
                Some(russh::ChannelMsg::Close) | None => break,
                _ => {}
            }
        }

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&stdout).to_string(),
            stderr: String::from_utf8_lossy(&stderr).to_string(),
            exit_code: exit_status,
        })
    }

    /// Open an interactive shell channel with a PTY, for CLIs that only
    /// speak prompt-driven sessions.
    pub async fn open_shell(&self) -> Result<russh::Channel<client::Msg>, SessionError> {
        let mut channel = self
            .session
            .channel_open_session()
            .await
            .map_err(|e| self.transport_error(e))?;

        channel
            .request_pty(false, "vt100", 200, 50, 0, 0, &[])
            .await
            .map_err(|e| self.transport_error(e))?;

        channel
            .request_shell(false)
            .await
            .map_err(|e| self.transport_error(e))?;

        Ok(channel)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn is_connected(&self) -> bool {
        !self.session.is_closed()
    }

    /// Close the session
    pub async fn disconnect(self) -> Result<(), SessionError> {
        self.session
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
            .map_err(|e| SessionError::Transport {
                host: self.host.clone(),
                message: e.to_string(),
            })
    }

    fn transport_error(&self, e: russh::Error) -> SessionError {
        SessionError::Transport {
            host: self.host.clone(),
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_output_success() {
        let output = CommandOutput {
            stdout: "hello".to_string(),
            stderr: String::new(),
            exit_code: Some(0),
        };
        assert!(output.success());

        let failed = CommandOutput {
            stdout: String::new(),
            stderr: "error".to_string(),
            exit_code: Some(1),
        };
        assert!(!failed.success());
    }

    #[tokio::test]
    async fn refused_connection_is_a_connect_error() {
        // nothing listens on this port
        let client = SshClient::new("127.0.0.1", "admin", "pw")
            .with_port(1)
            .with_timeout(2);

        match client.connect().await {
            Err(SessionError::Connect { host, port }) => {
                assert_eq!(host, "127.0.0.1");
                assert_eq!(port, 1);
            }
            other => panic!("expected connect error, got {:?}", other.err()),
        }
    }
}
