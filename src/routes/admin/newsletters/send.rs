use actix_web::{HttpResponse, web};
use actix_web_flash_messages::FlashMessage;
use sqlx::PgPool;
use uuid::Uuid;

use crate::delivery::{DeliveryError, apply_footer, deliver_newsletter, footer_html};
use crate::domain::SubscriberEmail;
use crate::email_client::EmailClient;
use crate::routes::helpers::{e500, see_other};
use crate::startup::ApplicationBaseURL;

use super::get::get_newsletter;

#[tracing::instrument(
    name = "Send newsletter now",
    skip(pool, email_client, base_url)
)]
pub async fn send_newsletter(
    id: web::Path<Uuid>,
    pool: web::Data<PgPool>,
    email_client: web::Data<EmailClient>,
    base_url: web::Data<ApplicationBaseURL>,
) -> Result<HttpResponse, actix_web::Error> {
    let outcome = deliver_newsletter(&pool, &email_client, &base_url.0, id.into_inner()).await;

    match outcome {
        Ok(report) => {
            FlashMessage::info(format!(
                "The newsletter has been sent: {} delivered, {} failed.",
                report.sent, report.failed
            ))
            .send();
        }
        Err(
            e @ (DeliveryError::AlreadySent
            | DeliveryError::Cancelled
            | DeliveryError::NoRecipients
            | DeliveryError::UnknownNewsletter(_)),
        ) => {
            FlashMessage::error(e.to_string()).send();
        }
        Err(DeliveryError::UnexpectedError(e)) => return Err(e500(e)),
    }

    Ok(see_other("/admin/newsletters"))
}

#[derive(serde::Deserialize)]
pub struct TestFormData {
    test_email: String,
}

#[tracing::instrument(
    name = "Send test newsletter",
    skip(form, pool, email_client, base_url),
    fields(test_email = %form.test_email)
)]
pub async fn send_test_newsletter(
    id: web::Path<Uuid>,
    form: web::Form<TestFormData>,
    pool: web::Data<PgPool>,
    email_client: web::Data<EmailClient>,
    base_url: web::Data<ApplicationBaseURL>,
) -> Result<HttpResponse, actix_web::Error> {
    let newsletter_id = id.into_inner();

    let recipient = match SubscriberEmail::parse(form.0.test_email) {
        Ok(recipient) => recipient,
        Err(_) => {
            FlashMessage::error("Please enter a valid test email address.").send();
            return Ok(see_other(&format!(
                "/admin/newsletters/{newsletter_id}/edit"
            )));
        }
    };

    let newsletter = get_newsletter(&pool, newsletter_id)
        .await
        .map_err(e500)?
        .ok_or_else(|| actix_web::error::ErrorNotFound("Unknown newsletter."))?;

    let html = apply_footer(&newsletter.body_html, &footer_html(&base_url.0));
    let outcome = email_client
        .send_email(
            &recipient,
            &format!("[TEST] {}", newsletter.subject),
            &html,
            &newsletter.body_text,
        )
        .await;

    match outcome {
        Ok(_) => {
            FlashMessage::info(format!("A test email is on its way to {recipient}.")).send();
        }
        Err(e) => {
            tracing::warn!(
                error.cause_chain = ?e,
                error.message = %e,
                "Failed to send a test email."
            );
            FlashMessage::error("Failed to send the test email.").send();
        }
    }

    Ok(see_other(&format!(
        "/admin/newsletters/{newsletter_id}/edit"
    )))
}
