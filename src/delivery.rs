use std::time::Duration;

use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use crate::activity::{ActivityKind, log_activity};
use crate::configuration::Settings;
use crate::domain::{AccessTier, NewsletterStatus, SubscriberEmail};
use crate::email_client::{BatchRecipient, EmailClient};
use crate::routes::helpers::{error_chain_fmt, prepare_html_template};
use crate::startup::get_connection_pull;

/// Provider batch limit: one API call addresses at most this many
/// recipients.
const BATCH_SIZE: usize = 100;
/// Pause between batch calls to stay under the provider rate limit.
const BATCH_PAUSE: Duration = Duration::from_secs(1);

pub struct DeliveryReport {
    pub attempted: usize,
    pub sent: usize,
    pub failed: usize,
}

#[derive(thiserror::Error)]
pub enum DeliveryError {
    #[error("There is no newsletter with id {0}.")]
    UnknownNewsletter(Uuid),
    #[error("The newsletter has already been sent.")]
    AlreadySent,
    #[error("The newsletter has been cancelled.")]
    Cancelled,
    #[error("No eligible subscribers found.")]
    NoRecipients,
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for DeliveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

#[derive(sqlx::FromRow)]
struct Campaign {
    id: Uuid,
    title: String,
    subject: String,
    body_html: String,
    body_text: String,
    access_tier: String,
    status: String,
}

/// Deliver a campaign to every eligible subscriber, best effort: a
/// failed batch marks its recipients failed and delivery moves on to
/// the next batch. One `newsletter_sends` row is written per
/// recipient either way.
#[tracing::instrument(name = "Deliver newsletter", skip(pool, email_client, base_url))]
pub async fn deliver_newsletter(
    pool: &PgPool,
    email_client: &EmailClient,
    base_url: &str,
    newsletter_id: Uuid,
) -> Result<DeliveryReport, DeliveryError> {
    let campaign = get_campaign(pool, newsletter_id)
        .await
        .context("Failed to fetch the newsletter from the database.")?
        .ok_or(DeliveryError::UnknownNewsletter(newsletter_id))?;

    let status = NewsletterStatus::parse(&campaign.status)
        .map_err(|e| anyhow::anyhow!("Invalid stored newsletter status: {e}"))?;
    match status {
        NewsletterStatus::Sent => return Err(DeliveryError::AlreadySent),
        NewsletterStatus::Cancelled => return Err(DeliveryError::Cancelled),
        NewsletterStatus::Draft | NewsletterStatus::Scheduled => {}
    }

    let tier = AccessTier::parse(&campaign.access_tier)
        .map_err(|e| anyhow::anyhow!("Invalid stored access tier: {e}"))?;

    let recipients = get_eligible_recipients(pool, tier)
        .await
        .context("Failed to fetch eligible subscribers.")?;
    if recipients.is_empty() {
        return Err(DeliveryError::NoRecipients);
    }

    let html = apply_footer(&campaign.body_html, &footer_html(base_url));
    let report = send_in_batches(pool, email_client, &campaign, &recipients, &html).await?;

    mark_as_sent(pool, campaign.id, report.sent as i32)
        .await
        .context("Failed to update the newsletter status.")?;

    log_activity(
        pool,
        ActivityKind::NewsletterSent,
        &format!("Newsletter sent: {}", campaign.title),
        Some(&format!(
            "{} sent, {} failed out of {} recipients",
            report.sent, report.failed, report.attempted
        )),
        None,
    )
    .await
    .map_err(|e| tracing::warn!(error = %e, "Failed to record newsletter activity."))
    .ok();

    Ok(report)
}

async fn send_in_batches(
    pool: &PgPool,
    email_client: &EmailClient,
    campaign: &Campaign,
    recipients: &[BatchRecipient],
    html: &str,
) -> Result<DeliveryReport, DeliveryError> {
    let mut report = DeliveryReport {
        attempted: recipients.len(),
        sent: 0,
        failed: 0,
    };

    for (batch_index, batch) in recipients.chunks(BATCH_SIZE).enumerate() {
        if batch_index > 0 {
            tokio::time::sleep(BATCH_PAUSE).await;
        }

        let outcome = email_client
            .send_batch(
                batch,
                &campaign.subject,
                html,
                &campaign.body_text,
                campaign.id,
            )
            .await;

        match outcome {
            Ok(message_id) => {
                report.sent += batch.len();
                record_batch(pool, campaign.id, batch, "sent", Some(&message_id), None).await?;
            }
            Err(e) => {
                tracing::warn!(
                    error.cause_chain = ?e,
                    error.message = %e,
                    "Failed to send a newsletter batch."
                );
                report.failed += batch.len();
                record_batch(pool, campaign.id, batch, "failed", None, Some(&e.to_string()))
                    .await?;
            }
        }
    }

    Ok(report)
}

#[tracing::instrument(name = "Get eligible recipients", skip(pool))]
async fn get_eligible_recipients(
    pool: &PgPool,
    tier: AccessTier,
) -> Result<Vec<BatchRecipient>, sqlx::Error> {
    let rows: Vec<(Uuid, String)> = match tier {
        AccessTier::Free => {
            sqlx::query_as(
                r#"
                SELECT user_id, email
                FROM users
                WHERE user_type IN ('free_user', 'paid_user')
                  AND newsletter_subscribed = TRUE
                  AND receive_free_newsletters = TRUE
                ORDER BY created_at
                "#,
            )
            .fetch_all(pool)
            .await?
        }
        AccessTier::Paid => {
            sqlx::query_as(
                r#"
                SELECT user_id, email
                FROM users
                WHERE user_type = 'paid_user'
                  AND newsletter_subscribed = TRUE
                  AND receive_paid_newsletters = TRUE
                ORDER BY created_at
                "#,
            )
            .fetch_all(pool)
            .await?
        }
    };

    let recipients = rows
        .into_iter()
        .filter_map(|(user_id, email)| match SubscriberEmail::parse(email) {
            Ok(email) => Some(BatchRecipient { email, user_id }),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Skipping a subscriber. The stored contact details are invalid."
                );
                None
            }
        })
        .collect();

    Ok(recipients)
}

async fn get_campaign(pool: &PgPool, newsletter_id: Uuid) -> Result<Option<Campaign>, sqlx::Error> {
    sqlx::query_as::<_, Campaign>(
        r#"
        SELECT id, title, subject, body_html, body_text, access_tier, status
        FROM newsletters
        WHERE id = $1
        "#,
    )
    .bind(newsletter_id)
    .fetch_optional(pool)
    .await
}

async fn record_batch(
    pool: &PgPool,
    newsletter_id: Uuid,
    batch: &[BatchRecipient],
    status: &str,
    message_id: Option<&str>,
    error_message: Option<&str>,
) -> Result<(), anyhow::Error> {
    for recipient in batch {
        sqlx::query(
            r#"
            INSERT INTO newsletter_sends
                (id, newsletter_id, user_id, email, status, message_id, error_message, sent_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, now())
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(newsletter_id)
        .bind(recipient.user_id)
        .bind(recipient.email.as_ref())
        .bind(status)
        .bind(message_id)
        .bind(error_message)
        .execute(pool)
        .await
        .context("Failed to record a newsletter send.")?;
    }

    Ok(())
}

async fn mark_as_sent(
    pool: &PgPool,
    newsletter_id: Uuid,
    recipient_count: i32,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE newsletters
        SET status = 'sent', sent_at = now(), recipient_count = $1, updated_at = now()
        WHERE id = $2
        "#,
    )
    .bind(recipient_count)
    .bind(newsletter_id)
    .execute(pool)
    .await?;

    Ok(())
}

pub fn footer_html(base_url: &str) -> String {
    prepare_html_template(&[("base_url", base_url)], "emails/newsletter_footer.html")
}

/// Insert the footer before the closing body tag when there is one,
/// otherwise append it.
pub fn apply_footer(html: &str, footer: &str) -> String {
    match html.find("</body>") {
        Some(position) => {
            let mut with_footer = String::with_capacity(html.len() + footer.len());
            with_footer.push_str(&html[..position]);
            with_footer.push_str(footer);
            with_footer.push_str(&html[position..]);
            with_footer
        }
        None => format!("{html}{footer}"),
    }
}

pub enum ExecutionOutcome {
    TaskCompleted,
    EmptyQueue,
}

pub async fn run_delivery_worker_until_stopped(config: Settings) -> Result<(), anyhow::Error> {
    let pool = get_connection_pull(&config.database);
    let email_client = config.email_client.client();
    worker_loop(pool, email_client, config.app.base_url).await
}

async fn worker_loop(
    pool: PgPool,
    email_client: EmailClient,
    base_url: String,
) -> Result<(), anyhow::Error> {
    loop {
        match try_deliver_due_newsletter(&pool, &email_client, &base_url).await {
            Ok(ExecutionOutcome::EmptyQueue) => {
                tokio::time::sleep(Duration::from_secs(10)).await;
            }
            Err(_) => {
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
            Ok(ExecutionOutcome::TaskCompleted) => {}
        }
    }
}

/// Claim one due scheduled campaign and deliver it. The claim moves
/// the row back to `draft` in a single statement guarded by
/// `FOR UPDATE SKIP LOCKED`, so a second worker instance never
/// double-sends; a campaign whose delivery fails outright stays a
/// draft for the back office to retry by hand.
#[tracing::instrument(name = "Deliver due newsletter", skip_all)]
pub async fn try_deliver_due_newsletter(
    pool: &PgPool,
    email_client: &EmailClient,
    base_url: &str,
) -> Result<ExecutionOutcome, anyhow::Error> {
    let claimed: Option<(Uuid,)> = sqlx::query_as(
        r#"
        UPDATE newsletters
        SET status = 'draft', scheduled_at = NULL, updated_at = now()
        WHERE id = (
            SELECT id
            FROM newsletters
            WHERE status = 'scheduled' AND scheduled_at <= now()
            ORDER BY scheduled_at
            FOR UPDATE SKIP LOCKED
            LIMIT 1
        )
        RETURNING id
        "#,
    )
    .fetch_optional(pool)
    .await
    .context("Failed to claim a due newsletter.")?;

    let Some((newsletter_id,)) = claimed else {
        return Ok(ExecutionOutcome::EmptyQueue);
    };

    deliver_newsletter(pool, email_client, base_url, newsletter_id)
        .await
        .with_context(|| format!("Failed to deliver scheduled newsletter {newsletter_id}"))?;

    Ok(ExecutionOutcome::TaskCompleted)
}
