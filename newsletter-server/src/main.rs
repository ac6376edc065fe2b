//! Newsletter server - records subscriber emails in a flat JSON file.

mod notify;
mod routes;
mod state;
mod subscribers;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::notify::{SmtpConfig, SmtpNotifier};
use crate::state::AppState;

#[derive(Parser)]
#[command(name = "newsletter-server")]
#[command(about = "Newsletter subscription endpoint backed by a JSON file")]
struct Args {
    /// Address to bind the server to
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// Port to listen on
    #[arg(long, env = "NEWSLETTER_PORT", default_value = "4000")]
    port: u16,

    /// Subscriber list file
    #[arg(long, env = "NEWSLETTER_STORAGE", default_value = "subscribers.json")]
    storage: PathBuf,

    /// Address notified about each new subscriber (needs --smtp-host)
    #[arg(long, env = "OWNER_EMAIL")]
    owner_email: Option<String>,

    /// SMTP server for owner notifications
    #[arg(long, env = "SMTP_HOST")]
    smtp_host: Option<String>,

    #[arg(long, env = "SMTP_PORT", default_value = "587")]
    smtp_port: u16,

    /// Use implicit TLS instead of STARTTLS
    #[arg(long, env = "SMTP_SECURE")]
    smtp_secure: bool,

    #[arg(long, env = "SMTP_USER")]
    smtp_user: Option<String>,

    #[arg(long, env = "SMTP_PASS", hide_env_values = true)]
    smtp_pass: Option<String>,

    #[arg(long, env = "SMTP_FROM", default_value = "no-reply@example.com")]
    smtp_from: String,
}

impl Args {
    /// SMTP settings, present only when both owner and host are set.
    fn smtp_config(&self) -> Option<SmtpConfig> {
        let owner = self.owner_email.clone()?;
        let host = self.smtp_host.clone()?;
        let credentials = self
            .smtp_user
            .clone()
            .map(|user| (user, self.smtp_pass.clone().unwrap_or_default()));
        Some(SmtpConfig {
            owner,
            host,
            port: self.smtp_port,
            secure: self.smtp_secure,
            credentials,
            from: self.smtp_from.clone(),
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("newsletter_server=info".parse()?),
        )
        .init();

    let args = Args::parse();
    info!(storage = %args.storage.display(), "starting newsletter-server");

    let mut state = AppState::new(args.storage.clone());
    if let Some(smtp) = args.smtp_config() {
        info!(owner = %smtp.owner, host = %smtp.host, "owner notifications enabled");
        state = state.with_notifier(Arc::new(SmtpNotifier::new(smtp)));
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::router().layer(cors).with_state(state);

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port).parse()?;
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
