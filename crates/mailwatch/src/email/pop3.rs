//! POP3 adapter.
//!
//! POP3 has no structured query support, so the exchange is driven directly
//! over the TLS stream: `USER`/`PASS`, `STAT` for the message count, then
//! `TOP <n> 0` for the header block of each message in the window.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use log::{debug, info, warn};
use secrecy::ExposeSecret;

use super::error::{FetchError, Result};
use super::fetcher::MailFetcher;
use super::headers::parse_header_block;
use super::recent_window;
use super::transport::{connect_tls, TlsOptions};
use crate::model::{synthesize_message_id, Account, Protocol, RawMessage};

/// Reply to a `TOP` command.
#[derive(Debug, PartialEq, Eq)]
pub enum TopReply {
    /// The header block, dot-unstuffed, without the terminating `.` line.
    Headers(Vec<u8>),
    /// The server answered with something other than `+OK`.
    Rejected(String),
    /// The connection ended before the terminating `.` line.
    Truncated,
}

/// A POP3 conversation over any async byte stream.
pub struct Pop3Session<S> {
    stream: BufReader<S>,
}

impl<S> Pop3Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream: BufReader::new(stream),
        }
    }

    /// Reads one line including its terminator. `None` at end of stream.
    async fn read_line(&mut self) -> Result<Option<Vec<u8>>> {
        let mut line = Vec::new();
        let read = self.stream.read_until(b'\n', &mut line).await?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }

    /// Reads a single-line status reply; end of stream is a connection error.
    async fn read_reply(&mut self) -> Result<String> {
        match self.read_line().await? {
            Some(line) => Ok(String::from_utf8_lossy(&line).trim_end().to_string()),
            None => Err(FetchError::ConnectionFailed(
                "server closed the connection".to_string(),
            )),
        }
    }

    async fn send(&mut self, command: &str) -> Result<()> {
        self.stream.write_all(command.as_bytes()).await?;
        self.stream.write_all(b"\r\n").await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Reads and discards the server greeting.
    pub async fn greeting(&mut self) -> Result<()> {
        let greeting = self.read_reply().await?;
        debug!("POP3 greeting: {}", greeting);
        Ok(())
    }

    /// Submits `USER` and `PASS`; both must be acknowledged with `+OK`.
    pub async fn login(&mut self, user: &str, password: &str) -> Result<()> {
        self.send(&format!("USER {}", user)).await?;
        let reply = self.read_reply().await?;
        if !is_ok(&reply) {
            return Err(FetchError::AuthenticationFailed(format!(
                "USER rejected: {}",
                reply
            )));
        }

        self.send(&format!("PASS {}", password)).await?;
        let reply = self.read_reply().await?;
        if !is_ok(&reply) {
            return Err(FetchError::AuthenticationFailed(format!(
                "PASS rejected: {}",
                reply
            )));
        }

        Ok(())
    }

    /// Sends `STAT` and returns the message count, or `None` if the count
    /// token is missing or not a number.
    pub async fn stat(&mut self) -> Result<Option<u32>> {
        self.send("STAT").await?;
        let reply = self.read_reply().await?;
        if !is_ok(&reply) {
            return Err(FetchError::ProtocolError(format!("STAT failed: {}", reply)));
        }
        Ok(parse_stat_count(&reply))
    }

    /// Requests the header block of message `index` with `TOP <index> 0`.
    pub async fn top_headers(&mut self, index: u32) -> Result<TopReply> {
        self.send(&format!("TOP {} 0", index)).await?;
        let reply = self.read_reply().await?;
        if !is_ok(&reply) {
            return Ok(TopReply::Rejected(reply));
        }

        let mut block = Vec::new();
        loop {
            let Some(line) = self.read_line().await? else {
                return Ok(TopReply::Truncated);
            };
            let content = trim_line_ending(&line);
            if content == b"." {
                return Ok(TopReply::Headers(block));
            }
            let unstuffed = if content.starts_with(b"..") {
                &line[1..]
            } else {
                &line[..]
            };
            block.extend_from_slice(unstuffed);
        }
    }

    /// Sends `QUIT`. Failures are ignored.
    pub async fn quit(&mut self) {
        if let Err(e) = self.send("QUIT").await {
            debug!("POP3 QUIT not sent: {}", e);
            return;
        }
        match self.read_reply().await {
            Ok(reply) if is_ok(&reply) => {}
            Ok(reply) => debug!("POP3 QUIT not acknowledged: {}", reply),
            Err(e) => debug!("POP3 QUIT reply missing: {}", e),
        }
    }

    /// Scans the most recent `window_size` messages after a successful login.
    ///
    /// Messages whose `TOP` is rejected or whose header block does not parse
    /// are skipped. If the connection is lost part way through, scanning
    /// stops and the messages collected so far are returned.
    pub async fn scan_recent(
        &mut self,
        account_email: &str,
        window_size: u32,
        observed_at: DateTime<Utc>,
    ) -> Result<Vec<RawMessage>> {
        let count = match self.stat().await? {
            Some(count) => count,
            None => {
                warn!("POP3 STAT for {} returned no usable count", account_email);
                return Ok(Vec::new());
            }
        };

        let Some(window) = recent_window(count, window_size) else {
            return Ok(Vec::new());
        };
        debug!(
            "POP3 {} has {} messages, scanning {}..={}",
            account_email,
            count,
            window.start(),
            window.end()
        );

        let mut messages = Vec::new();
        for index in window {
            let block = match self.top_headers(index).await {
                Ok(TopReply::Headers(block)) => block,
                Ok(TopReply::Rejected(reply)) => {
                    warn!(
                        "POP3 TOP {} rejected for {}: {}",
                        index, account_email, reply
                    );
                    continue;
                }
                Ok(TopReply::Truncated) => {
                    warn!(
                        "POP3 connection for {} dropped while reading message {}",
                        account_email, index
                    );
                    break;
                }
                Err(FetchError::ConnectionFailed(reason)) => {
                    warn!(
                        "POP3 connection for {} lost at message {}: {}",
                        account_email, index, reason
                    );
                    break;
                }
                Err(e) => return Err(e),
            };

            let info = match parse_header_block(&block) {
                Ok(info) => info,
                Err(e) => {
                    warn!(
                        "Skipping message {} for {}: {}",
                        index, account_email, e
                    );
                    continue;
                }
            };

            let message_id = info.message_id.unwrap_or_else(|| {
                synthesize_message_id(Protocol::Pop3, account_email, index, observed_at)
            });

            messages.push(RawMessage {
                sequence: index,
                from: info.from.unwrap_or_default(),
                subject: info.subject.unwrap_or_default(),
                message_id: Some(message_id),
                received_at: info.date.unwrap_or(observed_at),
            });
        }

        Ok(messages)
    }
}

fn is_ok(reply: &str) -> bool {
    reply.starts_with("+OK")
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Parses `+OK <count> <size>` into the message count.
fn parse_stat_count(reply: &str) -> Option<u32> {
    reply.split_whitespace().nth(1)?.parse().ok()
}

/// POP3 implementation of [`MailFetcher`].
#[derive(Debug, Clone)]
pub struct Pop3Fetcher {
    window_size: u32,
    tls: TlsOptions,
}

impl Pop3Fetcher {
    pub fn new(window_size: u32, tls: TlsOptions) -> Self {
        Self { window_size, tls }
    }
}

#[async_trait]
impl MailFetcher for Pop3Fetcher {
    async fn fetch_recent(&self, account: &Account) -> Result<Vec<RawMessage>> {
        info!(
            "Connecting to POP3 server {}:{} for {}",
            account.host, account.port, account.email
        );
        let stream = connect_tls(&account.host, account.port, self.tls).await?;
        let mut session = Pop3Session::new(stream);

        let result = async {
            session.greeting().await?;
            session
                .login(&account.email, account.secret.expose_secret())
                .await?;
            session
                .scan_recent(&account.email, self.window_size, Utc::now())
                .await
        }
        .await;

        session.quit().await;
        result
    }
}
