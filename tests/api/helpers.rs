use std::collections::HashMap;

use dgcg::{
    authentication::compute_password_hash,
    configuration::{DatabaseSettings, get_configuration},
    email_client::EmailClient,
    startup::{Application, get_connection_pull},
    telemetry::{get_subscriber, init_subscriber},
};
use fake::{Fake, faker::internet::en::SafeEmail};
use once_cell::sync::Lazy;
use secrecy::SecretString;
use sqlx::{Connection, Executor, PgConnection, PgPool};
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockBuilder, MockServer, ResponseTemplate};

static TRACING: Lazy<()> = Lazy::new(|| {
    let default_filter_level = "info".to_string();
    let subscriber_name = "test".to_string();

    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::stdout);
        init_subscriber(subscriber);
    } else {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::sink);
        init_subscriber(subscriber);
    }
});

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub db_pool: PgPool,
    pub email_server: MockServer,
    pub email_client: EmailClient,
    pub base_url: String,
    pub test_user: TestUser,
    pub api_client: reqwest::Client,
}

pub struct TestUser {
    pub user_id: Uuid,
    pub email: String,
    pub password: String,
}

impl TestUser {
    pub fn generate() -> Self {
        Self {
            user_id: Uuid::new_v4(),
            email: SafeEmail().fake(),
            password: Uuid::new_v4().to_string(),
        }
    }

    async fn store(&self, pool: &PgPool) {
        let password_hash = compute_password_hash(SecretString::from(self.password.clone()))
            .expect("Failed to hash the test user password.");
        sqlx::query(
            r#"
            INSERT INTO users
                (user_id, email, password_hash, user_type, newsletter_subscribed,
                 receive_free_newsletters, receive_paid_newsletters, created_at)
            VALUES ($1, $2, $3, 'admin', TRUE, TRUE, TRUE, now())
            "#,
        )
        .bind(self.user_id)
        .bind(&self.email)
        .bind(secrecy::ExposeSecret::expose_secret(&password_hash))
        .execute(pool)
        .await
        .expect("Failed to store test user.");
    }
}

pub async fn configure_database(config: &DatabaseSettings) -> PgPool {
    let mut connection = PgConnection::connect_with(&config.without_db())
        .await
        .expect("Failed to connect to Postgres");

    connection
        .execute(format!(r#"CREATE DATABASE "{}";"#, config.database_name).as_str())
        .await
        .expect("Failed to create database");

    let connection_pull = PgPool::connect_with(config.with_db())
        .await
        .expect("Failed to connect to Postgres");

    sqlx::migrate!("./migrations")
        .run(&connection_pull)
        .await
        .expect("Failed to migrate database");

    connection_pull
}

pub async fn spawn_app() -> TestApp {
    Lazy::force(&TRACING);

    let email_server = MockServer::start().await;

    let config = {
        let mut c = get_configuration().expect("Failed to read configuration");
        c.database.database_name = Uuid::new_v4().to_string();
        c.app.port = 0;
        c.email_client.base_url = email_server.uri();
        c
    };

    configure_database(&config.database).await;

    let application = Application::build(config.clone())
        .await
        .expect("Failed to build application.");
    let port = application.get_port();
    let _ = tokio::spawn(application.run_until_stopped());

    let api_client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .cookie_store(true)
        .build()
        .unwrap();

    let app = TestApp {
        address: format!("http://127.0.0.1:{port}"),
        port,
        db_pool: get_connection_pull(&config.database),
        email_server,
        email_client: config.email_client.clone().client(),
        base_url: config.app.base_url.clone(),
        test_user: TestUser::generate(),
        api_client,
    };
    app.test_user.store(&app.db_pool).await;

    app
}

impl TestApp {
    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.api_client
            .get(format!("{}{}", self.address, path))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get_html(&self, path: &str) -> String {
        self.get(path).await.text().await.unwrap()
    }

    pub async fn post_form<Body>(&self, path: &str, body: &Body) -> reqwest::Response
    where
        Body: serde::Serialize,
    {
        self.api_client
            .post(format!("{}{}", self.address, path))
            .form(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_login<Body>(&self, body: &Body) -> reqwest::Response
    where
        Body: serde::Serialize,
    {
        self.post_form("/login", body).await
    }

    pub async fn login_test_user(&self) {
        let resp = self
            .post_login(&serde_json::json!({
                "email": &self.test_user.email,
                "password": &self.test_user.password
            }))
            .await;
        assert_is_redirect_to(&resp, "/admin/dashboard");
    }

    pub async fn get_login_html(&self) -> String {
        self.get_html("/login").await
    }

    pub async fn post_logout(&self) -> reqwest::Response {
        self.api_client
            .post(format!("{}/logout", self.address))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get_change_password(&self) -> reqwest::Response {
        self.get("/admin/password").await
    }

    pub async fn get_change_password_html(&self) -> String {
        self.get_change_password().await.text().await.unwrap()
    }

    pub async fn post_change_password<Body>(&self, body: &Body) -> reqwest::Response
    where
        Body: serde::Serialize,
    {
        self.post_form("/admin/password", body).await
    }

    pub async fn get_admin_dashboard(&self) -> reqwest::Response {
        self.get("/admin/dashboard").await
    }

    pub async fn get_admin_dashboard_html(&self) -> String {
        self.get_admin_dashboard().await.text().await.unwrap()
    }

    /// Register a subscriber account through the public form and hand
    /// back its id. The session cookie is renewed, so admin tests must
    /// log back in afterwards.
    pub async fn register_subscriber(&self, email: &str, password: &str) -> Uuid {
        let resp = self
            .post_form(
                "/register",
                &serde_json::json!({
                    "email": email,
                    "password": password,
                    "password_check": password
                }),
            )
            .await;
        assert_is_redirect_to(&resp, "/");

        let (user_id,): (Uuid,) = sqlx::query_as("SELECT user_id FROM users WHERE email = $1")
            .bind(email)
            .fetch_one(&self.db_pool)
            .await
            .expect("Failed to fetch the registered user.");
        user_id
    }

    pub async fn create_subscriber(&self, user_type: &str) -> (Uuid, String) {
        let email: String = SafeEmail().fake();
        let password = Uuid::new_v4().to_string();
        let user_id = self.register_subscriber(&email, &password).await;

        if user_type != "free_user" {
            sqlx::query("UPDATE users SET user_type = $1 WHERE user_id = $2")
                .bind(user_type)
                .bind(user_id)
                .execute(&self.db_pool)
                .await
                .expect("Failed to update the subscriber type.");
        }

        (user_id, email)
    }

    /// The body of the last email request, decoded from its
    /// form-encoded wire format.
    pub async fn last_email_body(&self) -> HashMap<String, String> {
        let email_request = &self
            .email_server
            .received_requests()
            .await
            .unwrap()
            .pop()
            .expect("No email request was received.");
        serde_urlencoded::from_bytes(&email_request.body)
            .expect("Failed to parse the email request body.")
    }

    /// Extract the raw unsubscribe link from an email html body. The
    /// provider substitutes the `%recipient.*%` placeholders, so tests
    /// fill them in themselves before following the link.
    pub fn get_unsubscribe_link(&self, html: &str) -> String {
        let links: Vec<_> = linkify::LinkFinder::new()
            .links(html)
            .filter(|l| *l.kind() == linkify::LinkKind::Url)
            .filter(|l| l.as_str().contains("/unsubscribe?email="))
            .collect();
        links
            .first()
            .expect("No unsubscribe link found.")
            .as_str()
            .to_owned()
    }

    pub fn to_local_url(&self, raw_link: &str) -> reqwest::Url {
        let mut link = reqwest::Url::parse(raw_link).unwrap();
        assert_eq!(link.host_str().unwrap(), "127.0.0.1");
        link.set_port(Some(self.port)).unwrap();
        link
    }
}

pub fn when_sending_an_email() -> MockBuilder {
    Mock::given(path("/v3/sandbox/messages")).and(method("POST"))
}

pub fn email_accepted_response() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "id": "<20260807.0001@sandbox>",
        "message": "Queued. Thank you."
    }))
}

pub fn assert_is_redirect_to(response: &reqwest::Response, location: &str) {
    assert_eq!(response.status().as_u16(), 303);
    assert_eq!(response.headers().get("Location").unwrap(), location);
}
