use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use client_core::{
    actions::{
        ImageUpload, LoginAction, LoginBanner, LoginForm, NewPostAction, NewPostForm,
        PasswordResetAction, PasswordResetForm, RecoveryRequestAction, RecoveryRequestForm,
        RegistrationAction, RegistrationForm, VoteAction,
    },
    config::{load_settings, load_settings_from},
    ActionSpec, Collaborators, FlowStatus, HttpTransport, Notifier, SubmissionController,
    SuccessTransition,
};
use shared::domain::{PostId, VoteDirection, VoteState};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tracing_subscriber::EnvFilter;
use url::Url;

mod terminal;

use terminal::{TerminalChallenge, TerminalNavigator, TerminalNotifier};

#[derive(Parser, Debug)]
struct Cli {
    /// Settings file; defaults to ./forum.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    server_url: Option<String>,
    /// Token from the invisible challenge, minted for the action being run.
    #[arg(long)]
    challenge_token: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Login page URL the user arrived on, e.g. `.../login/?redirect=/post/abc`.
        #[arg(long)]
        page_url: Option<Url>,
    },
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        password_confirm: String,
    },
    ForgotPassword {
        #[arg(long)]
        email: String,
    },
    ResetPassword {
        /// Link from the recovery email.
        #[arg(long)]
        link: Url,
        #[arg(long)]
        password: String,
        #[arg(long)]
        password_confirm: String,
    },
    NewPost {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        image: Option<PathBuf>,
    },
    Vote {
        #[arg(long)]
        post_id: String,
        #[arg(long, value_enum)]
        direction: Direction,
        /// Vote status rendered on the post page (0 none, 1 up, 2 down).
        #[arg(long, default_value_t = 0)]
        current: u8,
        #[arg(long)]
        logged_out: bool,
    },
    /// Shows the banner a login page URL would display.
    Banner {
        page_url: Url,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Direction {
    Up,
    Down,
}

impl From<Direction> for VoteDirection {
    fn from(value: Direction) -> Self {
        match value {
            Direction::Up => Self::Up,
            Direction::Down => Self::Down,
        }
    }
}

// `None` only once the input is exhausted; a blank line is `Some("")`.
async fn read_fallback_response<R>(lines: &mut Lines<R>) -> Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let line = lines
        .next_line()
        .await
        .context("failed to read fallback response from stdin")?;
    Ok(line.map(|line| line.trim().to_string()))
}

async fn run<A: ActionSpec>(
    action: A,
    payload: A::Payload,
    ctx: Collaborators,
    challenge: &TerminalChallenge,
) -> Result<SuccessTransition> {
    let mut controller = SubmissionController::new(action, ctx);
    let mut status = controller.submit(payload).await;
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    while controller.is_awaiting_fallback() {
        match read_fallback_response(&mut stdin).await? {
            Some(response) if !response.is_empty() => challenge.solve(response),
            // Left unsolved, so the controller asks again.
            Some(_) => {}
            None => bail!("stdin closed before the fallback challenge was completed"),
        }
        status = controller.complete_fallback().await;
    }

    match status {
        FlowStatus::Completed(transition) => Ok(transition),
        FlowStatus::Failed(err) => Err(anyhow!(err)),
        FlowStatus::AwaitingFallback => bail!("flow ended while awaiting fallback"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = match &cli.config {
        Some(path) => load_settings_from(path),
        None => load_settings(),
    };
    if let Some(server_url) = cli.server_url {
        settings.server_url = server_url;
    }
    if let Some(token) = cli.challenge_token {
        settings.challenge_token = Some(token);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let origin = settings.origin()?;
    let challenge = Arc::new(TerminalChallenge::new(settings.challenge_token.clone()));
    let ctx = Collaborators {
        transport: Arc::new(HttpTransport::new(settings.server_url.clone())),
        challenge: challenge.clone(),
        notifier: Arc::new(TerminalNotifier),
        navigator: Arc::new(TerminalNavigator::new(origin)),
    };

    let transition = match cli.command {
        Command::Login {
            email,
            password,
            page_url,
        } => {
            let action = page_url
                .as_ref()
                .map(LoginAction::from_page_url)
                .unwrap_or_default();
            run(action, LoginForm { email, password }, ctx, &challenge).await?
        }
        Command::Register {
            email,
            username,
            password,
            password_confirm,
        } => {
            let form = RegistrationForm {
                email,
                username,
                password,
                password_confirm,
            };
            run(RegistrationAction, form, ctx, &challenge).await?
        }
        Command::ForgotPassword { email } => {
            run(
                RecoveryRequestAction,
                RecoveryRequestForm { email },
                ctx,
                &challenge,
            )
            .await?
        }
        Command::ResetPassword {
            link,
            password,
            password_confirm,
        } => {
            let form = PasswordResetForm {
                password,
                password_confirm,
            };
            run(
                PasswordResetAction::from_page_url(&link),
                form,
                ctx,
                &challenge,
            )
            .await?
        }
        Command::NewPost {
            title,
            description,
            image,
        } => {
            let image = match image {
                Some(path) => Some(load_image(&path).await?),
                None => None,
            };
            let form = NewPostForm {
                title,
                description,
                image,
            };
            run(NewPostAction, form, ctx, &challenge).await?
        }
        Command::Vote {
            post_id,
            direction,
            current,
            logged_out,
        } => {
            let state = VoteState::from_wire(current)
                .ok_or_else(|| anyhow!("unknown vote status {current}"))?;
            let action = VoteAction::new(PostId(post_id), !logged_out, state);
            run(action, direction.into(), ctx, &challenge).await?
        }
        Command::Banner { page_url } => {
            match LoginBanner::from_page_url(&page_url) {
                Some(banner) => TerminalNotifier.notify(banner.notice()),
                None => println!("no banner for this page"),
            }
            return Ok(());
        }
    };

    if let SuccessTransition::VoteRecorded { state, score } = transition {
        println!("vote: {state:?} (status {}), score {score}", state.as_wire());
    }
    Ok(())
}

async fn load_image(path: &Path) -> Result<ImageUpload> {
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("image.bin")
        .to_string();
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read image '{}'", path.display()))?;
    let mime_type = mime_guess::from_path(path).first_raw().map(str::to_string);
    Ok(ImageUpload {
        filename,
        mime_type,
        bytes,
    })
}
