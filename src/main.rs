use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use std::sync::Arc;

use leave_desk::config::Config;
use leave_desk::db::{init_db, migrate};
use leave_desk::docs::ApiDoc;
use leave_desk::notify::mailer::{LogMailer, Mailer, SmtpMailer};
use leave_desk::routes;
use leave_desk::state::AppState;
use leave_desk::store::mysql::MySqlStore;

use tracing::{error, info, warn};
use tracing_appender::rolling;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "Leave Desk is running"
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e));
        }
    };

    info!("Server starting...");

    let pool = init_db(&config.database_url)
        .await
        .map_err(|e| std::io::Error::other(format!("Failed to connect to database: {e}")))?;
    migrate(&pool)
        .await
        .map_err(|e| std::io::Error::other(format!("Migration failed: {e}")))?;

    let mailer: Arc<dyn Mailer> = match &config.smtp {
        Some(smtp) => match SmtpMailer::new(smtp) {
            Ok(mailer) => Arc::new(mailer),
            Err(e) => {
                warn!(error = %e, "SMTP setup failed, emails will only be logged");
                Arc::new(LogMailer)
            }
        },
        None => Arc::new(LogMailer),
    };

    let server_addr = config.server_addr.clone();
    let config_data = Data::new(config.clone());
    let state = Data::new(AppState::new(MySqlStore::new(pool), config, mailer));

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(state.clone())
            .app_data(config_data.clone())
            .service(index)
            // Configure auth + protected routes with rate limiting
            .configure(|cfg| routes::configure::<MySqlStore>(cfg, config_data.get_ref()))
    })
    .bind(server_addr)?
    .run()
    .await
}
