//! IMAP adapter.

use std::fmt;

use async_imap::{Client, Session};
use async_trait::async_trait;
use chrono::Utc;
use futures_util::io::{AsyncRead, AsyncWrite};
use futures_util::StreamExt;
use log::{debug, info, warn};
use secrecy::ExposeSecret;

use super::error::{FetchError, Result};
use super::fetcher::MailFetcher;
use super::headers::{decode_header_text, format_sender, normalize_message_id, parse_rfc2822_date};
use super::recent_window;
use super::transport::{connect_tls, TlsOptions};
use crate::model::{Account, RawMessage};

const INBOX: &str = "INBOX";

/// IMAP implementation of [`MailFetcher`].
///
/// The inbox is opened read-only with `EXAMINE`, and only `UID ENVELOPE` is
/// fetched, so polling never changes message flags.
#[derive(Debug, Clone)]
pub struct ImapFetcher {
    window_size: u32,
    tls: TlsOptions,
}

impl ImapFetcher {
    pub fn new(window_size: u32, tls: TlsOptions) -> Self {
        Self { window_size, tls }
    }

    /// Logs in, scans the inbox and logs out. Logout is attempted whatever
    /// the outcome of the scan.
    async fn run_session<T>(
        &self,
        client: Client<T>,
        user: &str,
        password: &str,
    ) -> Result<Vec<RawMessage>>
    where
        T: AsyncRead + AsyncWrite + Unpin + fmt::Debug + Send,
    {
        let mut session = client
            .login(user, password)
            .await
            .map_err(|(e, _)| FetchError::AuthenticationFailed(e.to_string()))?;

        let result = self.scan_inbox(&mut session, user).await;

        if let Err(e) = session.logout().await {
            warn!("IMAP logout failed for {}: {}", user, e);
        }

        result
    }

    async fn scan_inbox<T>(
        &self,
        session: &mut Session<T>,
        account_email: &str,
    ) -> Result<Vec<RawMessage>>
    where
        T: AsyncRead + AsyncWrite + Unpin + fmt::Debug + Send,
    {
        let mailbox = session
            .examine(INBOX)
            .await
            .map_err(|e| FetchError::ProtocolError(format!("EXAMINE {}: {}", INBOX, e)))?;

        let Some(window) = recent_window(mailbox.exists, self.window_size) else {
            debug!("{} has an empty inbox", account_email);
            return Ok(Vec::new());
        };
        let uid_validity = mailbox.uid_validity;
        let observed_at = Utc::now();

        let sequence_set = format!("{}:{}", window.start(), window.end());
        debug!(
            "Fetching envelopes {} of {} for {}",
            sequence_set, mailbox.exists, account_email
        );

        let mut fetches = session
            .fetch(&sequence_set, "(UID ENVELOPE)")
            .await
            .map_err(|e| FetchError::ProtocolError(e.to_string()))?;

        let mut messages = Vec::new();
        while let Some(item) = fetches.next().await {
            let fetch = match item {
                Ok(fetch) => fetch,
                Err(e) => {
                    warn!("Envelope fetch for {} interrupted: {}", account_email, e);
                    break;
                }
            };

            let Some(envelope) = fetch.envelope() else {
                warn!(
                    "Message {} for {} has no envelope, skipping",
                    fetch.message, account_email
                );
                continue;
            };

            let from = envelope
                .from
                .as_ref()
                .and_then(|addrs| addrs.first())
                .map(|addr| {
                    envelope_sender(
                        addr.name.as_deref(),
                        addr.mailbox.as_deref(),
                        addr.host.as_deref(),
                    )
                })
                .unwrap_or_default();

            let subject = envelope
                .subject
                .as_deref()
                .map(decode_header_text)
                .unwrap_or_default();

            let message_id = envelope
                .message_id
                .as_deref()
                .and_then(|raw| normalize_message_id(&String::from_utf8_lossy(raw)))
                .or_else(|| fallback_message_id(account_email, uid_validity, fetch.uid));

            let received_at = envelope
                .date
                .as_deref()
                .and_then(parse_rfc2822_date)
                .unwrap_or(observed_at);

            messages.push(RawMessage {
                sequence: fetch.message,
                from,
                subject,
                message_id,
                received_at,
            });
        }

        Ok(messages)
    }
}

#[async_trait]
impl MailFetcher for ImapFetcher {
    async fn fetch_recent(&self, account: &Account) -> Result<Vec<RawMessage>> {
        info!(
            "Connecting to IMAP server {}:{} for {}",
            account.host, account.port, account.email
        );
        let stream = connect_tls(&account.host, account.port, self.tls).await?;
        self.run_session(
            Client::new(stream),
            &account.email,
            account.secret.expose_secret(),
        )
        .await
    }
}

/// Builds the display sender from the raw envelope address parts.
fn envelope_sender(name: Option<&[u8]>, mailbox: Option<&[u8]>, host: Option<&[u8]>) -> String {
    let mailbox = mailbox.map(|m| String::from_utf8_lossy(m).into_owned());
    let host = host.map(|h| String::from_utf8_lossy(h).into_owned());
    let address = match (mailbox, host) {
        (Some(mailbox), Some(host)) => format!("{}@{}", mailbox, host),
        (Some(mailbox), None) => mailbox,
        (None, Some(host)) => host,
        (None, None) => String::new(),
    };
    let name = name.map(decode_header_text);
    format_sender(name.as_deref(), &address)
}

/// Id used when the envelope carries no Message-ID. UIDs are stable for a
/// given UIDVALIDITY, so the pair identifies the message across polls.
fn fallback_message_id(
    account_email: &str,
    uid_validity: Option<u32>,
    uid: Option<u32>,
) -> Option<String> {
    let uid = uid?;
    Some(format!(
        "imap-{}-{}-{}",
        account_email,
        uid_validity.unwrap_or(0),
        uid
    ))
}
