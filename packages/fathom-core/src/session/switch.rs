//! Interactive switch CLI session.
//!
//! Switch families (IOS, NX-OS, EOS) only expose their full command set
//! through a prompt-driven shell, so this session drives a PTY channel:
//! write a line, read until the prompt comes back, strip the echo. Every
//! read is bounded; a device that stops answering surfaces as a timeout,
//! not a hung worker.

use russh::ChannelMsg;
use russh::client::Msg;
use std::time::Duration;
use tokio::time::timeout;

use super::SessionError;
use super::ssh::SshClient;
use crate::credentials::Credential;

/// Bound on a single prompt read. `show running-config` on a loaded
/// chassis can take a while; anything beyond this is a dead session.
const PROMPT_TIMEOUT: Duration = Duration::from_secs(60);

/// An authenticated, enable-mode CLI session to one switch.
pub struct SwitchSession {
    channel: russh::Channel<Msg>,
    host: String,
    read_timeout: Duration,
}

impl SwitchSession {
    /// Connect, authenticate, enter enable mode and disable paging.
    /// Any failure along the way is a connection error for the caller to
    /// log — retrying is not this layer's job.
    pub async fn open(
        ip: &str,
        credential: &Credential,
        hostname: &str,
    ) -> Result<Self, SessionError> {
        let ssh = SshClient::new(ip, &credential.username, &credential.password);
        let session = ssh.connect().await?;
        let channel = session.open_shell().await?;

        let mut switch = Self {
            channel,
            host: hostname.to_string(),
            read_timeout: PROMPT_TIMEOUT,
        };

        // Drain the login banner up to the first prompt.
        switch.read_until(ends_with_prompt).await?;
        switch.enable(&credential.secret).await?;
        // Paging off, or long outputs stall at a --More-- pause forever.
        switch.run_command("terminal length 0").await?;

        tracing::debug!("{}: switch CLI session established", hostname);
        Ok(switch)
    }

    /// Run one command and return its output with the echo and trailing
    /// prompt stripped.
    pub async fn run_command(&mut self, command: &str) -> Result<String, SessionError> {
        self.send_line(command).await?;
        let raw = self.read_until(ends_with_prompt).await?;
        Ok(strip_command_frame(&raw, command))
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Enter privileged exec mode. A device already privileged answers
    /// the `enable` echo with a `#` prompt and this is a no-op.
    async fn enable(&mut self, secret: &str) -> Result<(), SessionError> {
        self.send_line("enable").await?;
        let response = self
            .read_until(|buf| ends_with_prompt(buf) || ends_with_password_prompt(buf))
            .await?;

        if ends_with_password_prompt(&response) {
            self.send_line(secret).await?;
            let response = self
                .read_until(|buf| ends_with_prompt(buf) || ends_with_password_prompt(buf))
                .await?;
            // A second password prompt means the secret was rejected.
            if ends_with_password_prompt(&response) || !is_privileged_prompt(&response) {
                return Err(SessionError::Enable {
                    host: self.host.clone(),
                });
            }
        } else if !is_privileged_prompt(&response) {
            return Err(SessionError::Enable {
                host: self.host.clone(),
            });
        }

        Ok(())
    }

    async fn send_line(&mut self, line: &str) -> Result<(), SessionError> {
        let data = format!("{}\n", line);
        self.channel
            .data(data.as_bytes())
            .await
            .map_err(|e| SessionError::Transport {
                host: self.host.clone(),
                message: e.to_string(),
            })
    }

    /// Accumulate channel data until `done` matches the buffer.
    async fn read_until<F>(&mut self, done: F) -> Result<String, SessionError>
    where
        F: Fn(&str) -> bool,
    {
        let mut buffer = String::new();

        loop {
            let msg = timeout(self.read_timeout, self.channel.wait())
                .await
                .map_err(|_| SessionError::Timeout {
                    host: self.host.clone(),
                })?;

            match msg {
                Some(ChannelMsg::Data { data }) => {
                    buffer.push_str(&String::from_utf8_lossy(&data));
                    if done(&buffer) {
                        return Ok(buffer);
                    }
                }
                Some(ChannelMsg::ExtendedData { data, .. }) => {
                    buffer.push_str(&String::from_utf8_lossy(&data));
                    if done(&buffer) {
                        return Ok(buffer);
                    }
                }
                Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => {
                    return Err(SessionError::Transport {
                        host: self.host.clone(),
                        message: "channel closed by device".to_string(),
                    });
                }
                _ => {}
            }
        }
    }
}

/// True when the buffer's last line looks like a CLI prompt (`>` user
/// exec, `#` privileged exec).
fn ends_with_prompt(buffer: &str) -> bool {
    let Some(line) = last_line(buffer) else {
        return false;
    };
    line.ends_with('>') || line.ends_with('#')
}

/// True when the buffer's last line is the privileged-exec prompt.
fn is_privileged_prompt(buffer: &str) -> bool {
    last_line(buffer).is_some_and(|line| line.ends_with('#'))
}

/// True when the device is asking for the enable secret.
fn ends_with_password_prompt(buffer: &str) -> bool {
    last_line(buffer).is_some_and(|line| line.to_ascii_lowercase().ends_with("password:"))
}

fn last_line(buffer: &str) -> Option<&str> {
    buffer.lines().last().map(str::trim_end)
}

/// Drop the echoed command line and the trailing prompt line from raw
/// shell output.
fn strip_command_frame(raw: &str, command: &str) -> String {
    let mut lines: Vec<&str> = raw.lines().collect();

    // Trailing prompt
    if lines.last().is_some_and(|l| {
        let l = l.trim_end();
        l.ends_with('#') || l.ends_with('>')
    }) {
        lines.pop();
    }

    // Leading echo of the command (possibly preceded by a stale prompt
    // fragment on the same line)
    if lines.first().is_some_and(|l| l.contains(command)) {
        lines.remove(0);
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_detection() {
        assert!(ends_with_prompt("banner text\nswitch1#"));
        assert!(ends_with_prompt("banner text\nswitch1>"));
        assert!(ends_with_prompt("output\r\nswitch1# "));
        assert!(!ends_with_prompt("loading configuration...\n"));
        assert!(!ends_with_prompt(""));

        assert!(is_privileged_prompt("sw1#"));
        assert!(!is_privileged_prompt("sw1>"));

        assert!(ends_with_password_prompt("enable\nPassword:"));
        assert!(ends_with_password_prompt("enable\npassword: "));
        assert!(!ends_with_password_prompt("sw1#"));
    }

    #[test]
    fn command_frame_is_stripped() {
        let raw = "sw1#show vlan brief\nVLAN Name\n1    default\nsw1#";
        assert_eq!(
            strip_command_frame(raw, "show vlan brief"),
            "VLAN Name\n1    default"
        );
    }

    #[test]
    fn frame_strip_keeps_body_lines_resembling_prompts_out_of_scope() {
        // only the final line is treated as a prompt
        let raw = "sw1#show run\nhostname sw1\nend\nsw1#";
        let body = strip_command_frame(raw, "show run");
        assert_eq!(body, "hostname sw1\nend");
    }
}
