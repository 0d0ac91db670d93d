use std::time::Duration;

use reqwest::{Client, Url};
use secrecy::{ExposeSecret, SecretString};
use uuid::Uuid;

use crate::domain::SubscriberEmail;

#[derive(Clone)]
pub struct EmailClient {
    http_client: Client,
    messages_url: Url,
    sender: SubscriberEmail,
    sender_name: String,
    api_key: SecretString,
}

/// A campaign recipient together with the profile id used to
/// personalize footer links through `recipient-variables`.
pub struct BatchRecipient {
    pub email: SubscriberEmail,
    pub user_id: Uuid,
}

#[derive(serde::Deserialize)]
struct SendResponse {
    id: String,
}

impl EmailClient {
    pub fn new(
        base_url: String,
        domain: String,
        sender: SubscriberEmail,
        sender_name: String,
        api_key: SecretString,
        timeout: Duration,
    ) -> Self {
        let messages_url = Url::parse(&base_url)
            .expect("Failed parsing base email api url.")
            .join(&format!("v3/{domain}/messages"))
            .expect("Failed joining messages route to email api url.");

        Self {
            http_client: Client::builder().timeout(timeout).build().unwrap(),
            messages_url,
            sender,
            sender_name,
            api_key,
        }
    }

    fn from_field(&self) -> String {
        format!("{} <{}>", self.sender_name, self.sender.as_ref())
    }

    /// Send a single email, e.g. a composer test send. Returns the
    /// provider message id.
    pub async fn send_email(
        &self,
        recipient: &SubscriberEmail,
        subject: &str,
        html_content: &str,
        text_content: &str,
    ) -> Result<String, reqwest::Error> {
        let params = [
            ("from", self.from_field()),
            ("to", recipient.as_ref().to_owned()),
            ("subject", subject.to_owned()),
            ("html", html_content.to_owned()),
            ("text", text_content.to_owned()),
        ];

        self.post_message(&params).await
    }

    /// Send one campaign batch in a single API call. Per-recipient
    /// footer links rely on `recipient-variables` substitution, so the
    /// html may carry `%recipient.email%` / `%recipient.user_id%`
    /// placeholders.
    pub async fn send_batch(
        &self,
        recipients: &[BatchRecipient],
        subject: &str,
        html_content: &str,
        text_content: &str,
        newsletter_id: Uuid,
    ) -> Result<String, reqwest::Error> {
        let to = recipients
            .iter()
            .map(|r| r.email.as_ref())
            .collect::<Vec<_>>()
            .join(", ");

        let recipient_variables = recipients
            .iter()
            .map(|r| {
                (
                    r.email.as_ref().to_owned(),
                    serde_json::json!({ "user_id": r.user_id }),
                )
            })
            .collect::<serde_json::Map<_, _>>();

        let params = [
            ("from", self.from_field()),
            ("to", to),
            ("subject", subject.to_owned()),
            ("html", html_content.to_owned()),
            ("text", text_content.to_owned()),
            (
                "recipient-variables",
                serde_json::Value::Object(recipient_variables).to_string(),
            ),
            ("o:tracking", "yes".to_owned()),
            ("o:tracking-clicks", "yes".to_owned()),
            ("o:tracking-opens", "yes".to_owned()),
            ("v:newsletter_id", newsletter_id.to_string()),
        ];

        self.post_message(&params).await
    }

    async fn post_message(&self, params: &[(&str, String)]) -> Result<String, reqwest::Error> {
        let response = self
            .http_client
            .post(self.messages_url.clone())
            .basic_auth("api", Some(self.api_key.expose_secret()))
            .form(params)
            .send()
            .await?
            .error_for_status()?
            .json::<SendResponse>()
            .await?;

        Ok(response.id)
    }
}
