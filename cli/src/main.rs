#[cfg(test)]
#[path = "main_test.rs"]
mod main_test;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bookreview::net::catalog::{BookQuery, BookSearch};
use bookreview::{
    ApiClient, ApiError, AuthSignal, ClientConfig, ConfigError, FileTokenStore, GuardDecision, LoginOutcome,
    LoginRequest, RegisterOutcome, RegisterRequest, Role, RouteGuard, SessionManager,
};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tokio::sync::broadcast;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Api(#[from] ApiError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("could not determine a data directory; pass --token-file or set BOOKREVIEW_TOKEN_FILE")]
    NoDataDir,
    #[error("login failed: {0}")]
    LoginFailed(String),
    #[error("registration failed: {0}")]
    RegisterFailed(String),
    #[error("not logged in; run `bookreview login` first")]
    NotLoggedIn,
    #[error("this command requires the {0} role")]
    NotAuthorized(Role),
    #[error("session is still initializing")]
    SessionPending,
}

#[derive(Parser, Debug)]
#[command(name = "bookreview", about = "Book review service client")]
struct Cli {
    #[arg(long, env = "BOOKREVIEW_API_URL")]
    api_url: Option<String>,

    #[arg(long, env = "BOOKREVIEW_TOKEN_FILE", help = "Where credentials are persisted between runs")]
    token_file: Option<PathBuf>,

    #[arg(long, env = "BOOKREVIEW_REQUEST_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    #[arg(short, long, action = clap::ArgAction::Count, help = "Log more (-v info, -vv debug)")]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        #[arg(help = "Username or email")]
        username: String,
        #[arg(long, env = "BOOKREVIEW_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Register {
        username: String,
        email: String,
        #[arg(long, env = "BOOKREVIEW_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long, default_value = "USER")]
        role: Role,
    },
    Logout {
        #[arg(long, help = "Revoke every refresh token of the account")]
        everywhere: bool,
    },
    Whoami,
    Books(BooksCommand),
    Reviews(ReviewsCommand),
    Admin(AdminCommand),
}

#[derive(Args, Debug)]
struct BooksCommand {
    #[command(subcommand)]
    command: BooksSubcommand,
}

#[derive(Subcommand, Debug)]
enum BooksSubcommand {
    List {
        #[arg(long, default_value_t = 0)]
        page: u32,
        #[arg(long, default_value_t = 12)]
        size: u32,
        #[arg(long, default_value = "createdAt")]
        sort_by: String,
        #[arg(long, default_value = "desc")]
        sort_dir: String,
    },
    Simple,
    Show {
        id: i64,
    },
    Create {
        #[arg(long, help = "Book JSON")]
        data: String,
    },
    Update {
        id: i64,
        #[arg(long, help = "Book JSON")]
        data: String,
    },
    Delete {
        id: i64,
    },
    Search {
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        author: Option<String>,
        #[arg(long)]
        genre: Option<String>,
    },
    TopRated {
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
    Genres,
}

#[derive(Args, Debug)]
struct ReviewsCommand {
    #[command(subcommand)]
    command: ReviewsSubcommand,
}

#[derive(Subcommand, Debug)]
enum ReviewsSubcommand {
    All,
    List {
        book_id: i64,
    },
    Create {
        book_id: i64,
        #[arg(long)]
        rating: u8,
        #[arg(long, default_value = "")]
        comment: String,
    },
    Update {
        review_id: i64,
        #[arg(long)]
        rating: u8,
        #[arg(long, default_value = "")]
        comment: String,
    },
    Delete {
        review_id: i64,
    },
}

#[derive(Args, Debug)]
struct AdminCommand {
    #[command(subcommand)]
    command: AdminSubcommand,
}

#[derive(Subcommand, Debug)]
enum AdminSubcommand {
    Users,
    Search { query: String },
    Details { user_id: i64 },
    Stats,
    Ban { user_id: i64 },
    Unban { user_id: i64 },
    Delete { user_id: i64 },
    Role { user_id: i64, role: Role },
}

impl Command {
    /// The view this command stands in for. The HTTP client uses it to decide
    /// whether a 401 should request navigation to the login page.
    fn route(&self, login_path: &str) -> String {
        match self {
            Self::Login { .. } => login_path.to_owned(),
            Self::Register { .. } => "/register".to_owned(),
            Self::Logout { .. } => "/".to_owned(),
            Self::Books(books) if books.command.manages_catalog() => "/admin".to_owned(),
            Self::Books(_) => "/books".to_owned(),
            Self::Whoami => "/profile".to_owned(),
            Self::Reviews(reviews) => match &reviews.command {
                ReviewsSubcommand::List { book_id } | ReviewsSubcommand::Create { book_id, .. } => {
                    format!("/books/{book_id}")
                }
                ReviewsSubcommand::All => "/profile".to_owned(),
                ReviewsSubcommand::Update { .. } | ReviewsSubcommand::Delete { .. } => "/books".to_owned(),
            },
            Self::Admin(_) => "/admin".to_owned(),
        }
    }

    fn guard(&self) -> Option<RouteGuard> {
        match self {
            Self::Whoami | Self::Reviews(_) => Some(RouteGuard::authenticated()),
            Self::Admin(_) => Some(RouteGuard::requiring(Role::Admin)),
            Self::Books(books) if books.command.manages_catalog() => Some(RouteGuard::requiring(Role::Admin)),
            _ => None,
        }
    }
}

impl BooksSubcommand {
    fn manages_catalog(&self) -> bool {
        matches!(self, Self::Create { .. } | Self::Update { .. } | Self::Delete { .. })
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(log_level(cli.verbose))
        .init();

    let session = connect(&cli)?;
    let mut signals = session.api().subscribe();
    let route = cli.command.route(session.api().login_path());
    session.api().set_current_path(route);
    session.init().await;
    apply_signals(&session, &mut signals).await;

    let result = run(&session, cli.command).await;

    apply_signals(&session, &mut signals).await;
    if let Some(path) = session.take_redirect() {
        eprintln!("Session expired. Please log in again (bookreview login, view {path}).");
    }
    result
}

/// Apply 401s raised since the last call, in the order they happened.
async fn apply_signals(session: &SessionManager, signals: &mut broadcast::Receiver<AuthSignal>) {
    while let Ok(signal) = signals.try_recv() {
        session.handle_signal(signal).await;
    }
}

fn log_level(verbose: u8) -> tracing::Level {
    match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    }
}

fn connect(cli: &Cli) -> Result<Arc<SessionManager>, CliError> {
    let mut config = ClientConfig::from_env()?;
    if let Some(url) = &cli.api_url {
        config = config.with_base_url(url)?;
    }
    if let Some(secs) = cli.timeout_secs {
        config = config.with_request_timeout(Duration::from_secs(secs));
    }
    let token_file = cli
        .token_file
        .clone()
        .or_else(|| config.token_file.clone())
        .or_else(default_token_file)
        .ok_or(CliError::NoDataDir)?;
    tracing::debug!(path = %token_file.display(), base_url = %config.base_url, "using credential file");
    config = config.with_token_file(token_file.clone());

    let store = Arc::new(FileTokenStore::new(token_file));
    let api = ApiClient::new(&config, store)?;
    Ok(Arc::new(SessionManager::new(Arc::new(api))))
}

fn default_token_file() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("bookreview").join("credentials.json"))
}

fn require(session: &SessionManager, guard: RouteGuard) -> Result<(), CliError> {
    match guard.check(&session.snapshot()) {
        GuardDecision::Render => Ok(()),
        GuardDecision::Pending => Err(CliError::SessionPending),
        GuardDecision::RedirectToLogin => Err(CliError::NotLoggedIn),
        GuardDecision::NotAuthorized => Err(CliError::NotAuthorized(guard.required_role().unwrap_or_default())),
    }
}

async fn run(session: &SessionManager, command: Command) -> Result<(), CliError> {
    if let Some(guard) = command.guard() {
        require(session, guard)?;
    }

    match command {
        Command::Login { username, password } => run_login(session, LoginRequest::new(username, password)).await,
        Command::Register { username, email, password, role } => {
            let request = RegisterRequest { username, email, password, role };
            match session.register(&request).await {
                RegisterOutcome::Success { username } => {
                    println!("Registered {username}. Run `bookreview login {username}` to sign in.");
                    Ok(())
                }
                RegisterOutcome::Failure { error } => Err(CliError::RegisterFailed(error)),
            }
        }
        Command::Logout { everywhere } => {
            if everywhere {
                session.logout_everywhere().await;
            } else {
                session.logout().await;
            }
            println!("Logged out.");
            Ok(())
        }
        Command::Whoami => {
            let snapshot = session.snapshot();
            let user = snapshot.user().ok_or(CliError::NotLoggedIn)?;
            print_json(&serde_json::to_value(user)?)
        }
        Command::Books(books) => run_books(session.api(), books).await,
        Command::Reviews(reviews) => run_reviews(session.api(), reviews).await,
        Command::Admin(admin) => run_admin(session.api(), admin).await,
    }
}

async fn run_login(session: &SessionManager, credentials: LoginRequest) -> Result<(), CliError> {
    match session.login(&credentials).await {
        LoginOutcome::Success { user, should_redirect_to_admin } => {
            println!("Logged in as {}.", user.display_name());
            if should_redirect_to_admin {
                println!("Admin account: see `bookreview admin --help`.");
            }
            Ok(())
        }
        LoginOutcome::Failure { error } => Err(CliError::LoginFailed(error)),
    }
}

async fn run_books(api: &ApiClient, books: BooksCommand) -> Result<(), CliError> {
    let json = match books.command {
        BooksSubcommand::List { page, size, sort_by, sort_dir } => {
            api.list_books(&BookQuery { page, size, sort_by, sort_dir }).await?
        }
        BooksSubcommand::Simple => api.books_simple().await?,
        BooksSubcommand::Show { id } => api.book(id).await?,
        BooksSubcommand::Create { data } => api.create_book(&serde_json::from_str(&data)?).await?,
        BooksSubcommand::Update { id, data } => api.update_book(id, &serde_json::from_str(&data)?).await?,
        BooksSubcommand::Delete { id } => {
            api.delete_book(id).await?;
            println!("Deleted book {id}.");
            return Ok(());
        }
        BooksSubcommand::Search { title, author, genre } => {
            api.search_books(&BookSearch { title, author, genre }).await?
        }
        BooksSubcommand::TopRated { limit } => api.top_rated_books(limit).await?,
        BooksSubcommand::Genres => api.genres().await?,
    };
    print_json(&json)
}

async fn run_reviews(api: &ApiClient, reviews: ReviewsCommand) -> Result<(), CliError> {
    let json = match reviews.command {
        ReviewsSubcommand::All => api.all_reviews().await?,
        ReviewsSubcommand::List { book_id } => api.reviews_for_book(book_id).await?,
        ReviewsSubcommand::Create { book_id, rating, comment } => {
            let body = serde_json::json!({ "bookId": book_id, "rating": rating, "comment": comment });
            api.create_review(&body).await?
        }
        ReviewsSubcommand::Update { review_id, rating, comment } => {
            let body = serde_json::json!({ "rating": rating, "comment": comment });
            api.update_review(review_id, &body).await?
        }
        ReviewsSubcommand::Delete { review_id } => {
            print_text(&api.delete_review(review_id).await?);
            return Ok(());
        }
    };
    print_json(&json)
}

async fn run_admin(api: &ApiClient, admin: AdminCommand) -> Result<(), CliError> {
    let message = match admin.command {
        AdminSubcommand::Users => return print_json(&api.admin_users().await?),
        AdminSubcommand::Search { query } => return print_json(&api.search_users(&query).await?),
        AdminSubcommand::Details { user_id } => return print_json(&api.user_details(user_id).await?),
        AdminSubcommand::Stats => return print_json(&api.admin_stats().await?),
        AdminSubcommand::Ban { user_id } => api.ban_user(user_id).await?,
        AdminSubcommand::Unban { user_id } => api.unban_user(user_id).await?,
        AdminSubcommand::Delete { user_id } => api.delete_user(user_id).await?,
        AdminSubcommand::Role { user_id, role } => api.update_user_role(user_id, role).await?,
    };
    print_text(&message);
    Ok(())
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

fn print_text(text: &str) {
    println!("{}", text.trim());
}
