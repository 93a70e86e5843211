//! SMTP delivery of administrator notifications.

use std::sync::Arc;

use async_trait::async_trait;
use dossier_core::config::{NotificationConfig, SmtpConfig};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{Notifier, NotifyError};
use crate::retry::{RetryConfig, RetryExecutor};

/// Sends notifications to the configured admin addresses, retrying transient
/// SMTP failures.
#[derive(Clone)]
pub struct EmailNotifier {
    mailer: Arc<AsyncSmtpTransport<Tokio1Executor>>,
    from: Mailbox,
    recipients: Vec<Mailbox>,
    retry: RetryExecutor,
}

impl EmailNotifier {
    /// Returns `None` when email is disabled or SMTP is not fully configured.
    pub fn from_config(
        smtp: &SmtpConfig,
        notifications: &NotificationConfig,
        retry: RetryConfig,
    ) -> Option<Self> {
        if !smtp.enabled {
            tracing::debug!("Email notifications disabled (EMAIL_ALERTS_ENABLED=false)");
            return None;
        }
        let Some(host) = smtp.host.as_deref() else {
            tracing::warn!("Email notifications enabled but SMTP_HOST is not set");
            return None;
        };
        let from: Mailbox = match smtp.from.as_deref().map(str::parse) {
            Some(Ok(from)) => from,
            Some(Err(e)) => {
                tracing::warn!(error = %e, "Invalid SMTP_FROM, email notifications disabled");
                return None;
            }
            None => {
                tracing::warn!("Email notifications enabled but SMTP_FROM is not set");
                return None;
            }
        };

        let recipients = parse_recipients(&notifications.admin_emails);
        if recipients.is_empty() {
            tracing::warn!("No valid ADMIN_EMAILS, email notifications disabled");
            return None;
        }

        let port = smtp.port.unwrap_or(587);
        let builder = if smtp.tls {
            match AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host) {
                Ok(b) => b.port(port),
                Err(e) => {
                    tracing::warn!(error = %e, host = %host, "Invalid SMTP relay");
                    return None;
                }
            }
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host).port(port)
        };
        let builder = match (smtp.user.as_deref(), smtp.password.as_deref()) {
            (Some(u), Some(p)) => builder.credentials(Credentials::new(u.to_string(), p.to_string())),
            _ => builder,
        };

        tracing::info!(
            host = %host,
            port = port,
            tls = smtp.tls,
            recipients = recipients.len(),
            "Email notifier initialized"
        );

        Some(Self {
            mailer: Arc::new(builder.build()),
            from,
            recipients,
            retry: RetryExecutor::new(retry),
        })
    }

    fn build_message(&self, subject: &str, body: &str) -> Result<Message, NotifyError> {
        let mut builder = Message::builder().from(self.from.clone()).subject(subject);
        for mb in &self.recipients {
            builder = builder.to(mb.clone());
        }
        builder
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| NotifyError::Config(e.to_string()))
    }
}

fn parse_recipients(addresses: &[String]) -> Vec<Mailbox> {
    addresses
        .iter()
        .filter_map(|s| match s.parse() {
            Ok(mb) => Some(mb),
            Err(e) => {
                tracing::warn!(address = %s, error = %e, "Skipping invalid admin email");
                None
            }
        })
        .collect()
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn send(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        let email = self.build_message(subject, body)?;

        self.retry
            .execute_with_condition(
                || {
                    let email = email.clone();
                    async move {
                        self.mailer
                            .send(email)
                            .await
                            .map(|_| ())
                            .map_err(|e| NotifyError::Send(e.to_string()))
                    }
                },
                |e| matches!(e, NotifyError::Send(_)),
            )
            .await?;

        tracing::info!(
            recipients = self.recipients.len(),
            subject = %subject,
            "Admin notification email sent"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smtp() -> SmtpConfig {
        SmtpConfig {
            enabled: true,
            host: Some("smtp.example.com".to_string()),
            port: Some(587),
            user: None,
            password: None,
            from: Some("dossier@example.com".to_string()),
            tls: true,
        }
    }

    fn admins(emails: &[&str]) -> NotificationConfig {
        NotificationConfig {
            admin_emails: emails.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn disabled_returns_none() {
        let mut config = smtp();
        config.enabled = false;
        assert!(EmailNotifier::from_config(&config, &admins(&["a@example.com"]), RetryConfig::default()).is_none());
    }

    #[test]
    fn missing_host_returns_none() {
        let mut config = smtp();
        config.host = None;
        assert!(EmailNotifier::from_config(&config, &admins(&["a@example.com"]), RetryConfig::default()).is_none());
    }

    #[test]
    fn requires_a_valid_recipient() {
        assert!(EmailNotifier::from_config(&smtp(), &admins(&["not an address"]), RetryConfig::default()).is_none());
    }

    #[tokio::test]
    async fn builds_with_valid_settings() {
        let notifier = EmailNotifier::from_config(
            &smtp(),
            &admins(&["a@example.com", "bogus", "b@example.com"]),
            RetryConfig::default(),
        )
        .unwrap();
        assert_eq!(notifier.recipients.len(), 2);
        assert!(notifier.build_message("subject", "body").is_ok());
    }
}
