// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of HelioWatch.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

use anyhow::{Context, Result};
use chrono::Utc;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{error, info};

use heliowatch_core::RunSummary;
use heliowatch_types::{AnomalyRecord, Severity};

use crate::config::EmailSettings;
use crate::db::Database;

#[derive(Debug)]
pub struct EmailNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    admin_recipients: Vec<String>,
}

impl EmailNotifier {
    pub fn new(config: &EmailSettings) -> Result<Self> {
        let from: Mailbox = config
            .from_address
            .parse()
            .with_context(|| format!("Invalid from_address: {}", config.from_address))?;

        let creds = Credentials::new(config.smtp_username.clone(), config.smtp_password.clone());

        let transport = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
                .with_context(|| format!("Failed to create SMTP relay: {}", config.smtp_host))?
                .port(config.smtp_port)
                .credentials(creds)
                .build()
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
                .port(config.smtp_port)
                .credentials(creds)
                .build()
        };

        Ok(Self {
            transport,
            from,
            admin_recipients: config.admin_recipients.clone(),
        })
    }

    #[must_use]
    pub fn recipients(&self) -> Vec<String> {
        self.admin_recipients.clone()
    }

    pub async fn send_anomaly_alert(&self, unit_name: &str, record: &AnomalyRecord) -> Result<()> {
        let subject = format!(
            "HelioWatch Alert: {} on {unit_name}",
            record.anomaly_type.display_name()
        );
        let body = format!(
            "HelioWatch detected a {} anomaly on unit '{unit_name}' (ID: {}).\n\n\
             Severity: {}\n\
             Confidence: {:.0}%\n\
             Affected day: {}\n\n\
             {}\n\n\
             Recommended action: {}\n\n\
             Review and acknowledge the anomaly on your HelioWatch dashboard.",
            record.anomaly_type.display_name(),
            record.unit_id,
            record.severity,
            f64::from(record.confidence) * 100.0,
            record.period_start.format("%Y-%m-%d"),
            record.description,
            record.recommendation,
        );

        self.send_to_all(&subject, &body).await
    }

    async fn send_to_all(&self, subject: &str, body: &str) -> Result<()> {
        for recipient in &self.admin_recipients {
            let to: Mailbox = match recipient.parse() {
                Ok(m) => m,
                Err(e) => {
                    error!(recipient = %recipient, error = %e, "Invalid recipient address, skipping");
                    continue;
                }
            };

            let message = Message::builder()
                .from(self.from.clone())
                .to(to)
                .subject(subject)
                .body(body.to_owned())
                .context("Failed to build email message")?;

            match self.transport.send(message).await {
                Ok(_) => info!(recipient = %recipient, subject = %subject, "Email sent"),
                Err(e) => error!(recipient = %recipient, error = %e, "Failed to send email"),
            }
        }

        Ok(())
    }
}

/// Mail out newly created Critical anomalies from a finished run.
///
/// Shared by the scheduler loop and the manual trigger. Per unit and anomaly
/// type, the notification log enforces a cooldown window so a fault that
/// persists across runs does not mail every interval.
pub async fn alert_on_new_criticals(
    db: &Database,
    notifier: &EmailNotifier,
    cooldown_minutes: u64,
    summary: &RunSummary,
) {
    let now = Utc::now();

    for record in &summary.created {
        if record.severity != Severity::Critical {
            continue;
        }

        let event_type = format!("critical-{}", record.anomaly_type.to_storage_value());
        let recently_notified = db
            .last_notification_for(&record.unit_id, &event_type)
            .is_some_and(|last| {
                now.signed_duration_since(last).num_minutes()
                    < i64::try_from(cooldown_minutes).unwrap_or(i64::MAX)
            });
        if recently_notified {
            continue;
        }

        let unit_name = db
            .get_unit(&record.unit_id)
            .ok()
            .flatten()
            .map_or_else(|| record.unit_id.clone(), |u| u.display_name().to_owned());

        if let Err(e) = notifier.send_anomaly_alert(&unit_name, record).await {
            error!(error = %e, unit_id = %record.unit_id, "Failed to send anomaly alert");
            continue;
        }
        if let Err(e) = db.log_notification(&record.unit_id, &event_type, &notifier.recipients()) {
            error!(error = %e, unit_id = %record.unit_id, "Failed to log anomaly notification");
        }
    }
}
