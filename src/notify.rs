// src/notify.rs

//! Notification dispatch.
//!
//! Formats a new item into a message and hands it to the mail API in one
//! logical send to all recipients. Delivery failure is reported to the
//! caller; the poll loop logs it and moves on, it is never retried within
//! a cycle.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::{EnvSettings, Item, NotifyConfig};

/// A formatted notification, ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub subject: String,
    pub text: String,
    pub html: String,
}

impl Message {
    /// Build the notification for a newly observed item.
    pub fn from_item(item: &Item, subject_prefix: &str) -> Self {
        let subject = if subject_prefix.is_empty() {
            format!("New publication: {}", item.title)
        } else {
            format!("{} New publication: {}", subject_prefix, item.title)
        };

        let text = format!(
            "A new publication was detected.\n\n\
             Title: {}\nDate: {}\nLink: {}\n",
            item.title, item.date, item.link
        );

        let html = format!(
            "<p>A new publication was detected.</p>\
             <p><strong>{}</strong><br>{}</p>\
             <p><a href=\"{}\">{}</a></p>",
            item.title, item.date, item.link, item.link
        );

        Self {
            subject,
            text,
            html,
        }
    }
}

/// External delivery capability.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &Message) -> Result<()>;
}

/// Request body for the mail API.
#[derive(Debug, Serialize)]
struct MailRequest<'a> {
    from: &'a str,
    to: &'a [String],
    subject: &'a str,
    text: &'a str,
    html: &'a str,
}

/// Delivers messages by POSTing to an HTTP mail API.
pub struct HttpMailer {
    client: Client,
    endpoint: String,
    api_key: String,
    sender: String,
    recipients: Vec<String>,
}

impl HttpMailer {
    pub fn new(client: Client, config: &NotifyConfig, env: &EnvSettings) -> Self {
        Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: env.api_key.clone(),
            sender: env.sender.clone(),
            recipients: env.recipients.clone(),
        }
    }
}

#[async_trait]
impl Notifier for HttpMailer {
    async fn notify(&self, message: &Message) -> Result<()> {
        let body = MailRequest {
            from: &self.sender,
            to: &self.recipients,
            subject: &message.subject,
            text: &message.text,
            html: &message.html,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::notify(format!(
                "mail API returned {status}: {detail}"
            )));
        }

        log::info!(
            "Notification sent to {} recipient(s): {}",
            self.recipients.len(),
            message.subject
        );
        Ok(())
    }
}
