use crate::authentication::{reject_anonymous_users, reject_non_admin_users};
use crate::configuration::{DatabaseSettings, Settings};
use crate::email_client::EmailClient;
use crate::routes::{
    admin::{
        admin_articles, admin_dashboard, admin_newsletters, admin_notes, admin_subscribers,
        article_form, cancel_newsletter, change_password, change_password_form, create_article,
        create_newsletter, create_note, delete_article, delete_note, edit_article_form,
        edit_newsletter_form, logout, newsletter_form, send_newsletter, send_test_newsletter,
        update_article, update_newsletter,
    },
    article_page, articles_index, consulting, health_check, home, login, login_form, pricing,
    register, register_form, unsubscribe, unsubscribe_form,
};
use actix_session::SessionMiddleware;
use actix_session::storage::RedisSessionStore;
use actix_web::cookie::Key;
use actix_web::dev::Server;
use actix_web::middleware::from_fn;
use actix_web::{App, HttpServer, web};
use actix_web_flash_messages::FlashMessagesFramework;
use actix_web_flash_messages::storage::CookieMessageStore;
use secrecy::ExposeSecret;
use secrecy::SecretString;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;
use std::time::Duration;
use tracing_actix_web::TracingLogger;

pub struct Application {
    port: u16,
    server: Server,
}

pub struct ApplicationBaseURL(pub String);

impl Application {
    pub async fn build(config: Settings) -> Result<Self, anyhow::Error> {
        let email_client = config.email_client.client();

        let address = format!("{}:{}", config.app.host, config.app.port);
        let connection_pool = get_connection_pull(&config.database);

        let listener = TcpListener::bind(address)?;
        let port = listener.local_addr()?.port();
        let server = run(
            listener,
            connection_pool,
            email_client,
            config.app.base_url,
            config.app.hmac_secret,
            config.redis_uri,
        )
        .await?;

        Ok(Self { port, server })
    }

    pub fn get_port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

pub async fn run(
    listener: TcpListener,
    db_pool: PgPool,
    email_client: EmailClient,
    base_url: String,
    hmac_secret: SecretString,
    redis_uri: SecretString,
) -> Result<Server, anyhow::Error> {
    let db_pool = web::Data::new(db_pool);
    let email_client = web::Data::new(email_client);
    let base_url = web::Data::new(ApplicationBaseURL(base_url));
    let secret_key = Key::from(hmac_secret.expose_secret().as_bytes());
    let message_store = CookieMessageStore::builder(secret_key.clone()).build();
    let message_framework = FlashMessagesFramework::builder(message_store).build();
    let redis_store = RedisSessionStore::new(redis_uri.expose_secret()).await?;

    let server = HttpServer::new(move || {
        App::new()
            .wrap(message_framework.clone())
            .wrap(TracingLogger::default())
            .wrap(SessionMiddleware::new(
                redis_store.clone(),
                secret_key.clone(),
            ))
            .route("/health_check", web::get().to(health_check))
            .route("/", web::get().to(home))
            .route("/consulting", web::get().to(consulting))
            .route("/pricing", web::get().to(pricing))
            .route("/articles", web::get().to(articles_index))
            .route("/articles/{id}", web::get().to(article_page))
            .route("/login", web::get().to(login_form))
            .route("/login", web::post().to(login))
            .route("/register", web::get().to(register_form))
            .route("/register", web::post().to(register))
            .route("/unsubscribe", web::get().to(unsubscribe_form))
            .route("/unsubscribe", web::post().to(unsubscribe))
            .route("/logout", web::post().to(logout))
            .service(
                web::scope("/admin")
                    .wrap(from_fn(reject_non_admin_users))
                    .wrap(from_fn(reject_anonymous_users))
                    .route("/dashboard", web::get().to(admin_dashboard))
                    .route("/logout", web::post().to(logout))
                    .route("/password", web::get().to(change_password_form))
                    .route("/password", web::post().to(change_password))
                    .route("/articles", web::get().to(admin_articles))
                    .route("/articles", web::post().to(create_article))
                    .route("/articles/new", web::get().to(article_form))
                    .route("/articles/{id}/edit", web::get().to(edit_article_form))
                    .route("/articles/{id}", web::post().to(update_article))
                    .route("/articles/{id}/delete", web::post().to(delete_article))
                    .route("/newsletters", web::get().to(admin_newsletters))
                    .route("/newsletters", web::post().to(create_newsletter))
                    .route("/newsletters/new", web::get().to(newsletter_form))
                    .route(
                        "/newsletters/{id}/edit",
                        web::get().to(edit_newsletter_form),
                    )
                    .route("/newsletters/{id}", web::post().to(update_newsletter))
                    .route("/newsletters/{id}/send", web::post().to(send_newsletter))
                    .route(
                        "/newsletters/{id}/test",
                        web::post().to(send_test_newsletter),
                    )
                    .route(
                        "/newsletters/{id}/cancel",
                        web::post().to(cancel_newsletter),
                    )
                    .route("/subscribers", web::get().to(admin_subscribers))
                    .route("/notes", web::get().to(admin_notes))
                    .route("/notes", web::post().to(create_note))
                    .route("/notes/{id}/delete", web::post().to(delete_note)),
            )
            .app_data(db_pool.clone())
            .app_data(email_client.clone())
            .app_data(base_url.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}

pub fn get_connection_pull(db_config: &DatabaseSettings) -> PgPool {
    PgPoolOptions::new()
        .acquire_timeout(Duration::from_secs(2))
        .connect_lazy_with(db_config.with_db())
}
