use crate::config::NotificationCredentials;
use crate::crawler::Notifier;
use anyhow::{anyhow, Context, Result};
use reqwest::blocking::Client;
use std::time::Duration;
use tracing::debug;

const PUSHOVER_URL: &str = "https://api.pushover.net/1/messages.json";
const MAX_TITLE_CHARS: usize = 250;
const MAX_MESSAGE_CHARS: usize = 1024;

pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Sends new-listing alerts through Pushover.
///
/// Without credentials every call is a no-op.
pub struct PushoverNotifier {
    client: Client,
    credentials: Option<NotificationCredentials>,
}

impl PushoverNotifier {
    pub fn new(credentials: Option<NotificationCredentials>) -> Result<Self> {
        let client = Client::builder()
            .user_agent("Mozilla/5.0 BazosCrawler/1.0")
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build notification client")?;
        Ok(Self { client, credentials })
    }

    pub fn is_enabled(&self) -> bool {
        self.credentials.is_some()
    }
}

impl Notifier for PushoverNotifier {
    fn notify(&self, title: &str, message: &str, url: &str) -> Result<()> {
        let Some(credentials) = &self.credentials else {
            return Ok(());
        };

        debug!("Sending Pushover notification: {}", title);
        let form = [
            ("token", credentials.token.as_str()),
            ("user", credentials.user.as_str()),
            ("title", truncate_chars(title, MAX_TITLE_CHARS)),
            ("message", truncate_chars(message, MAX_MESSAGE_CHARS)),
            ("url", url),
            ("url_title", "Otvoriť inzerát"),
        ];

        let response = self
            .client
            .post(PUSHOVER_URL)
            .form(&form)
            .send()
            .context("Failed to send Pushover notification")?;

        if !response.status().is_success() {
            return Err(anyhow!("Pushover rejected notification: HTTP {}", response.status()));
        }
        Ok(())
    }
}
