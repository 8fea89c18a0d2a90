use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args as ClapArgs, Parser, Subcommand};
use client_core::{load_settings, AppContext, BlogState, SessionState};
use shared::{
    domain::{BlogPost, NewBlogPost, PostId},
    protocol::AuthSession,
};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "blog-console", about = "Sign in and manage blog posts")]
struct Cli {
    /// Overrides the configured service url.
    #[arg(long)]
    service_url: Option<String>,
    #[arg(long)]
    anon_key: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(ClapArgs, Debug)]
struct Login {
    #[arg(long)]
    email: String,
    #[arg(long)]
    password: String,
}

#[derive(ClapArgs, Debug)]
struct PostFields {
    #[arg(long)]
    title: String,
    #[arg(long)]
    text: String,
    #[arg(long)]
    author: String,
    /// Defaults to today (UTC).
    #[arg(long)]
    date: Option<String>,
}

impl PostFields {
    fn into_new_post(self) -> NewBlogPost {
        NewBlogPost {
            title: self.title,
            text: self.text,
            author: self.author,
            date: self
                .date
                .unwrap_or_else(|| Utc::now().date_naive().to_string()),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    Whoami,
    SignUp(Login),
    SignIn(Login),
    List,
    Add {
        #[command(flatten)]
        login: Login,
        #[command(flatten)]
        post: PostFields,
    },
    Update {
        #[command(flatten)]
        login: Login,
        #[arg(long)]
        id: String,
        #[command(flatten)]
        post: PostFields,
    },
    Delete {
        #[command(flatten)]
        login: Login,
        #[arg(long)]
        id: String,
    },
    /// Prints the theme configuration as JSON.
    Theme,
}

/// Container whose operation a command failed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Failed {
    Session,
    Blog,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let mut settings = load_settings().context("failed to load client settings")?;
    if let Some(url) = cli.service_url.as_deref() {
        settings
            .override_service_url(url)
            .context("invalid --service-url")?;
    }
    if let Some(key) = cli.anon_key {
        settings.anon_key = key;
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&settings.log_filter))
        .init();
    debug!(service_url = %settings.service_url, table = %settings.posts_table, "starting");

    let app = AppContext::new(&settings);
    if matches!(cli.command, Command::Theme) {
        println!("{}", serde_json::to_string_pretty(&app.theme)?);
        return Ok(ExitCode::SUCCESS);
    }
    app.init().await;

    if let Err(failed) = run(&app, cli.command).await {
        if let Some(err) = failure_message(failed, &app.session.state(), &app.blog.state()) {
            eprintln!("error: {err}");
        }
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

async fn run(app: &AppContext, command: Command) -> Result<(), Failed> {
    match command {
        Command::Whoami => {
            print_session(&app.session.state());
            succeeded(app.session.state().error.is_none(), Failed::Session)
        }
        Command::SignUp(login) => {
            let ok = app.session.register(&login.email, &login.password).await;
            print_session(&app.session.state());
            succeeded(ok, Failed::Session)
        }
        Command::SignIn(login) => {
            let ok = app.session.sign_in(&login.email, &login.password).await;
            print_session(&app.session.state());
            if let Some(session) = app.client.session().await {
                let now = Utc::now();
                if session.is_expired(now) {
                    warn!(user_id = %session.user.id, "service returned an already expired session");
                }
                if let Some(note) = describe_expiry(&session, now) {
                    println!("{note}");
                }
            }
            succeeded(ok, Failed::Session)
        }
        Command::List => {
            print_posts(&app.blog.state());
            succeeded(app.blog.state().error.is_none(), Failed::Blog)
        }
        Command::Add { login, post } => {
            sign_in(app, &login).await?;
            succeeded(app.blog.add_post(post.into_new_post()).await, Failed::Blog)?;
            print_posts(&app.blog.state());
            Ok(())
        }
        Command::Update { login, id, post } => {
            let post: BlogPost = post.into_new_post().with_id(PostId::new(id));
            sign_in(app, &login).await?;
            succeeded(app.blog.update_post(post).await, Failed::Blog)?;
            print_posts(&app.blog.state());
            Ok(())
        }
        Command::Delete { login, id } => {
            sign_in(app, &login).await?;
            succeeded(app.blog.delete_post(&PostId::new(id)).await, Failed::Blog)?;
            print_posts(&app.blog.state());
            Ok(())
        }
        Command::Theme => Ok(()),
    }
}

async fn sign_in(app: &AppContext, login: &Login) -> Result<(), Failed> {
    succeeded(
        app.session.sign_in(&login.email, &login.password).await,
        Failed::Session,
    )
}

fn succeeded(ok: bool, container: Failed) -> Result<(), Failed> {
    if ok {
        Ok(())
    } else {
        Err(container)
    }
}

/// Error recorded by the container that failed, ignoring stale errors left
/// on the other one.
fn failure_message(failed: Failed, session: &SessionState, blog: &BlogState) -> Option<String> {
    match failed {
        Failed::Session => session.error.clone(),
        Failed::Blog => blog.error.clone(),
    }
}

fn describe_expiry(session: &AuthSession, now: DateTime<Utc>) -> Option<String> {
    let expires = session.expires_at_utc()?;
    if session.is_expired(now) {
        Some(format!("session already expired at {expires}"))
    } else {
        Some(format!("session expires at {expires}"))
    }
}

fn print_session(state: &SessionState) {
    match &state.user {
        Some(user) => println!(
            "signed in as {} ({})",
            user.email.as_deref().unwrap_or("<no email>"),
            user.id
        ),
        None if state.is_auth_checked => println!("not signed in"),
        None => println!("session not checked yet"),
    }
}

fn print_posts(state: &BlogState) {
    if state.posts.is_empty() {
        println!("no posts");
        return;
    }
    for post in &state.posts {
        println!("{}  {}  {}  by {}", post.id, post.date, post.title, post.author);
    }
}
