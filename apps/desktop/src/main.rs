use std::sync::Arc;

use anyhow::Result;
use auth_client::{
    CredentialCache, DurableCredentialCache, MissingPhoneValidator, NotificationSink,
    SessionController,
};
use clap::{Parser, Subcommand};
use shared::domain::HeaderState;

mod config;

#[derive(Parser, Debug)]
#[command(name = "foyer", about = "Account client for the foyer backend")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an account and start a session.
    Signup {
        #[arg(long)]
        full_name: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "")]
        phone: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm_password: String,
    },
    /// Log in with an existing account.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// End the current session.
    Logout,
    /// Request a password-reset email.
    ForgotPassword {
        #[arg(long)]
        email: String,
    },
    /// Show the cached session.
    Status,
}

/// Prints notifications straight to the terminal, standing in for the
/// toast layer a graphical frontend would provide.
struct TerminalSink;

impl NotificationSink for TerminalSink {
    fn success(&self, message: &str) {
        println!("{message}");
    }

    fn error(&self, message: &str) {
        eprintln!("{message}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let settings = config::load_settings();
    let server_url = config::validate_server_url(&settings.server_url)?;
    let credentials = DurableCredentialCache::initialize(&settings.credentials_url).await?;
    let sink = Arc::new(TerminalSink);
    let controller = SessionController::new_with_dependencies(
        server_url,
        credentials as Arc<dyn CredentialCache>,
        Arc::clone(&sink) as Arc<dyn NotificationSink>,
        Arc::new(MissingPhoneValidator),
    );
    let mut events = controller.subscribe_events();

    match args.command {
        Command::Signup {
            full_name,
            email,
            phone,
            password,
            confirm_password,
        } => {
            if let Err(err) = controller
                .sign_up(&full_name, &email, &phone, &password, &confirm_password)
                .await
            {
                sink.error(&err.to_string());
            }
        }
        Command::Login { email, password } => {
            if let Err(err) = controller.log_in(&email, &password).await {
                sink.error(&err.to_string());
            }
        }
        Command::Logout => controller.log_out().await,
        Command::ForgotPassword { email } => {
            if let Err(err) = controller.request_password_reset(&email).await {
                sink.error(&err.to_string());
            }
        }
        Command::Status => {}
    }

    while let Ok(event) = events.try_recv() {
        tracing::info!(?event, "auth state changed");
    }

    match controller.reconcile_ui().await {
        HeaderState::Authenticated => {
            if let Some(session) = controller.session().await {
                println!(
                    "Logged in as {} ({} {})",
                    session.email, session.first_name, session.last_name
                );
            }
        }
        HeaderState::Anonymous => println!("Not logged in"),
    }

    Ok(())
}
