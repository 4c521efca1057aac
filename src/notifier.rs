//! The notifier (§6, §10): forwards plan reports and analyzer warnings to a local HTTP endpoint.
//! Failures are swallowed here, not propagated — per §7's "Notifier unreachable: warning,
//! continue", the orchestrator must never fail a tick because a chat message couldn't be sent.

use crate::config::Config;

pub struct Notifier {
    http: reqwest::Client,
    base_url: Option<String>,
    chat_id: Option<String>,
}

impl Notifier {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.notifier_base_url.clone(),
            chat_id: config.notifier_chat_id.clone(),
        }
    }

    /// POSTs `text` to `/send_message/`. A missing `notifier_base_url`/`notifier_chat_id`, or any
    /// transport failure, is logged and swallowed — never returned to the caller.
    pub async fn send(&self, text: &str, delete_previous: bool, save_msg_to_db: bool) {
        let (Some(base_url), Some(chat_id)) = (&self.base_url, &self.chat_id) else {
            log::debug!("notifier not configured; dropping message: {text}");
            return;
        };

        let mut params = vec![("chat_id", chat_id.as_str()), ("text", text)];
        if delete_previous {
            params.push(("delete_previous", "true"));
        }
        if save_msg_to_db {
            params.push(("save_msg_to_db", "true"));
        }

        let url = format!("{base_url}/send_message/");
        match self.http.post(&url).query(&params).send().await {
            Ok(response) if !response.status().is_success() => {
                log::warn!("notifier responded with {}", response.status());
            }
            Err(err) => log::warn!("notifier unreachable: {err}"),
            Ok(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_notifier_does_not_panic() {
        let notifier = Notifier::new(&Config::for_tests());
        notifier.send("hello", false, false).await;
    }
}
