//! Quarters sign-in demo
//!
//! Signs a user in from the terminal using the redirect channel:
//! 1. The system browser opens the Quarters authorization page
//! 2. After signing in, the browser lands on the redirect URI with `?code=...`
//! 3. Paste that URL (or just the code) into the terminal
//! 4. The code is exchanged for tokens and the profile and balance are shown
//!
//! Application credentials come from `QUARTERS_APP_ID` and
//! `QUARTERS_APP_SECRET`.
//!
//! Run with: cargo run -p quarters-login -- login

use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use quarters_sdk::environment::{MessageBus, SystemBrowser};
use quarters_sdk::utils::truncate_for_display;
use quarters_sdk::{
    ChannelType, Credential, Quarters, QuartersOptions, RequestId, TransferRequest,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "quarters-login")]
#[command(about = "Sign in to Quarters and request token transfers from the terminal")]
struct Args {
    /// Page the authorization server redirects back to
    #[arg(long, default_value = "http://localhost:3000/")]
    redirect_uri: Url,

    /// Print the full refresh token so it can be saved for `refresh`
    #[arg(long, global = true)]
    show_refresh_token: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in through the browser and exchange the authorization code
    Login {
        /// Show the sign-up form instead of the sign-in form
        #[arg(long)]
        force_signup: bool,
    },
    /// Sign in with a refresh token from an earlier session
    Refresh {
        /// Stored refresh token
        refresh_token: String,
    },
    /// Create a transfer request and open its approval page
    Transfer {
        /// Stored refresh token
        #[arg(long)]
        refresh_token: String,
        /// Number of tokens to request
        tokens: i64,
        /// Text shown to the user on the approval page
        #[arg(long)]
        description: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "quarters_sdk=info".into());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();

    let environment = Arc::new(SystemBrowser::new(args.redirect_uri.clone()));
    let quarters = Quarters::new(QuartersOptions::from_env(), environment, MessageBus::new())
        .context("set QUARTERS_APP_ID and QUARTERS_APP_SECRET")?;

    match args.command {
        Command::Login { force_signup } => {
            login(&quarters, force_signup).await?;
            print_session(&quarters, args.show_refresh_token).await
        }
        Command::Refresh { refresh_token } => {
            quarters.set_refresh_token(&refresh_token).await?;
            print_session(&quarters, args.show_refresh_token).await
        }
        Command::Transfer {
            refresh_token,
            tokens,
            description,
        } => transfer(&quarters, &refresh_token, tokens, description).await,
    }
}

async fn login(quarters: &Quarters, force_signup: bool) -> anyhow::Result<()> {
    quarters.authorize(ChannelType::Redirect, force_signup, |_| {})?;

    println!("A browser window was opened for sign-in.");
    println!("Paste the URL you were redirected to (or just the code):");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let Some(input) = lines.next_line().await? else {
        bail!("no authorization code entered");
    };
    let code = extract_code(input.trim())?;

    quarters.set_auth_code(&code).await?;
    Ok(())
}

async fn transfer(
    quarters: &Quarters,
    refresh_token: &str,
    tokens: i64,
    description: Option<String>,
) -> anyhow::Result<()> {
    quarters.set_refresh_token(refresh_token).await?;

    let request = match description {
        Some(description) => TransferRequest::builder()
            .tokens(tokens)
            .description(description)
            .build(),
        None => TransferRequest::builder().tokens(tokens).build(),
    };
    let created = quarters.request_transfer(request).await?;

    println!("{}", approval_hint(&created.id));
    // SystemBrowser never posts a reply message
    quarters.authorize_transfer(created.id, ChannelType::Popup, |_| {})?;
    Ok(())
}

fn approval_hint(id: &RequestId) -> String {
    format!(
        "Transfer request {id} is awaiting approval. Approve or reject it in the browser; \
         the result is recorded by Quarters, not reported back here."
    )
}

/// Accept either a full redirect URL or a bare code
fn extract_code(input: &str) -> anyhow::Result<String> {
    if input.is_empty() {
        bail!("no authorization code entered");
    }
    match Url::parse(input) {
        Ok(url) => url
            .query_pairs()
            .find(|(key, _)| key == "code")
            .map(|(_, value)| value.into_owned())
            .context("redirect URL has no `code` parameter"),
        Err(_) => Ok(input.to_string()),
    }
}

async fn print_session(quarters: &Quarters, show_refresh_token: bool) -> anyhow::Result<()> {
    if let Some(credential) = quarters.credential() {
        print_credential(&credential, show_refresh_token);
    }

    let me = quarters.me().await?;
    println!();
    println!("Signed in as {}", me.display_name.as_deref().unwrap_or("<unnamed>"));
    if let Some(email) = &me.email {
        println!("  Email: {email}");
    }

    match quarters.get_balance().await {
        Ok(balance) => match balance.balance {
            Some(value) => println!("  Balance: {value}"),
            None => println!("  Balance: unknown"),
        },
        Err(e) => tracing::warn!(error = %e, "Could not load balance"),
    }
    Ok(())
}

fn print_credential(credential: &Credential, show_refresh_token: bool) {
    println!("Token Information:");
    println!(
        "  Access Token: {}",
        truncate_for_display(&credential.access_token, 20)
    );
    if let Some(refresh) = &credential.refresh_token {
        println!("  Refresh Token: {}", display_secret(refresh, show_refresh_token));
    }
    if let Some(scope) = &credential.scope {
        println!("  Scopes: {scope}");
    }
    if let Some(remaining) = credential.remaining_validity() {
        let hours = remaining.as_secs() / 3600;
        let minutes = (remaining.as_secs() % 3600) / 60;
        println!("  Expires in: {hours}h {minutes}m");
    }
}

fn display_secret(secret: &str, reveal: bool) -> String {
    if reveal {
        secret.to_string()
    } else {
        truncate_for_display(secret, 20)
    }
}
