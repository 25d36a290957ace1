//! Telegram channel — long-polls the Bot API for updates.
//!
//! Suggested reply labels render as a one-button-per-row reply keyboard;
//! an empty suggestion list removes any previous keyboard. The policy
//! document is delivered with `sendDocument`.

use std::path::Path;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};

use crate::channels::{Channel, IncomingMessage, MessageStream};
use crate::dialogue::OutgoingReply;
use crate::error::ChannelError;

/// Telegram channel — connects to the Bot API via long-polling.
pub struct TelegramChannel {
    bot_token: SecretString,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(bot_token: SecretString) -> Self {
        Self {
            bot_token,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!(
            "https://api.telegram.org/bot{}/{method}",
            self.bot_token.expose_secret()
        )
    }

    /// Send a text message with an optional reply keyboard.
    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        suggestions: &[String],
    ) -> Result<(), ChannelError> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
            "reply_markup": keyboard_markup(suggestions),
        });

        let resp = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let err = resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed {
                name: "telegram".into(),
                reason: format!("sendMessage returned {status}: {err}"),
            });
        }
        Ok(())
    }

    /// Send a document/file to a Telegram chat.
    pub async fn send_document(&self, chat_id: &str, file_path: &Path) -> anyhow::Result<()> {
        let file_name = file_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("file");

        let file_bytes = tokio::fs::read(file_path).await?;
        let part = Part::bytes(file_bytes).file_name(file_name.to_string());

        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .part("document", part);

        let resp = self
            .client
            .post(self.api_url("sendDocument"))
            .multipart(form)
            .send()
            .await?;

        if !resp.status().is_success() {
            let err = resp.text().await?;
            anyhow::bail!("Telegram sendDocument failed: {err}");
        }

        tracing::info!("Telegram document sent to {chat_id}: {file_name}");
        Ok(())
    }
}

/// Build the `reply_markup` value: one suggestion per keyboard row, or a
/// keyboard removal when there are no suggestions.
fn keyboard_markup(suggestions: &[String]) -> serde_json::Value {
    if suggestions.is_empty() {
        return serde_json::json!({ "remove_keyboard": true });
    }
    let rows: Vec<Vec<serde_json::Value>> = suggestions
        .iter()
        .map(|label| vec![serde_json::json!({ "text": label })])
        .collect();
    serde_json::json!({
        "keyboard": rows,
        "resize_keyboard": true,
    })
}

// ── Channel trait implementation ────────────────────────────────────

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let url = self.api_url("getUpdates");
        let client = self.client.clone();

        tokio::spawn(async move {
            let mut offset: i64 = 0;

            tracing::info!("Telegram channel listening for messages...");

            loop {
                let body = serde_json::json!({
                    "offset": offset,
                    "timeout": 30,
                    "allowed_updates": ["message"]
                });

                let resp = match client.post(&url).json(&body).send().await {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!("Telegram poll error: {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                let data: serde_json::Value = match resp.json().await {
                    Ok(d) => d,
                    Err(e) => {
                        tracing::warn!("Telegram parse error: {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                if let Some(results) = data.get("result").and_then(serde_json::Value::as_array) {
                    for update in results {
                        if let Some(uid) =
                            update.get("update_id").and_then(serde_json::Value::as_i64)
                        {
                            offset = uid + 1;
                        }

                        let Some(message) = update.get("message") else {
                            continue;
                        };
                        let Some(text) = message.get("text").and_then(serde_json::Value::as_str)
                        else {
                            continue;
                        };

                        let Some(chat_id) = message
                            .get("chat")
                            .and_then(|c| c.get("id"))
                            .and_then(serde_json::Value::as_i64)
                            .map(|id| id.to_string())
                        else {
                            continue;
                        };

                        let first_name = message
                            .get("from")
                            .and_then(|f| f.get("first_name"))
                            .and_then(|n| n.as_str());
                        let last_name = message
                            .get("from")
                            .and_then(|f| f.get("last_name"))
                            .and_then(|n| n.as_str());

                        let mut incoming = IncomingMessage::new("telegram", &chat_id, text)
                            .with_metadata(serde_json::json!({ "chat_id": chat_id }));
                        if let Some(name) = first_name {
                            incoming = incoming.with_sender_name(name);
                        }
                        if let Some(name) = last_name {
                            incoming = incoming.with_sender_last_name(name);
                        }

                        if tx.send(incoming).is_err() {
                            tracing::info!("Telegram listener channel closed");
                            return;
                        }
                    }
                }
            }
        });

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn respond(
        &self,
        msg: &IncomingMessage,
        reply: &OutgoingReply,
    ) -> Result<(), ChannelError> {
        let chat_id = msg
            .metadata
            .get("chat_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: "No chat_id in message metadata".into(),
            })?;

        if let Some(document) = &reply.document {
            if let Err(e) = self.send_document(chat_id, document).await {
                // Missing policy file shouldn't silence the prompt itself.
                tracing::warn!(error = %e, "Failed to send document");
            }
        }

        self.send_message(chat_id, &reply.text, &reply.suggestions)
            .await
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        let resp = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|e| ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: format!("getMe returned {}", resp.status()),
            })
        }
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        tracing::info!("Telegram channel shutting down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyboard_has_one_button_per_row() {
        let markup = keyboard_markup(&["Build a cake".into(), "Your orders".into()]);
        let rows = markup["keyboard"].as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0]["text"], "Build a cake");
        assert_eq!(rows[1][0]["text"], "Your orders");
        assert_eq!(markup["resize_keyboard"], true);
    }

    #[test]
    fn empty_suggestions_remove_keyboard() {
        let markup = keyboard_markup(&[]);
        assert_eq!(markup["remove_keyboard"], true);
    }
}
