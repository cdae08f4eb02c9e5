//! ebook-reader entry point.

use clap::Parser;
use ebook_reader::{
    auth::{AuthService, Authenticator},
    config::{BookCommand, BookMetaArgs, Cli, Command, Config, StyleArgs, UserCommand},
    db::Database,
    formats,
    library::Book,
    reader::{ContentPaginator, ReaderSession, ReaderStores, SessionConfig},
    terminal,
};
use std::io::{self, Write};
use std::path::PathBuf;
use tokio::io::BufReader;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so page output stays clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ebook_reader=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let config_path = cli.config.clone().or_else(Config::find_config_file);

    let config = if let Some(ref path) = config_path {
        Config::load(path)?
    } else {
        Config::default()
    };

    match cli.command {
        Command::Init { force } => cmd_init(force).await,
        Command::User { action } => cmd_user(action, &config).await,
        Command::Login {
            username,
            password,
            device,
        } => cmd_login(&username, password, device, &config).await,
        Command::Logout { token } => cmd_logout(&token, &config).await,
        Command::Book { action } => cmd_book(action, &config).await,
        Command::Read {
            book_id,
            token,
            style,
        } => cmd_read(&book_id, token.as_deref(), style, &config).await,
        Command::History { token } => cmd_history(&token, &config).await,
    }
}

/// Initialize config and database.
async fn cmd_init(force: bool) -> anyhow::Result<()> {
    let config_path = PathBuf::from("config.toml");

    if config_path.exists() && !force {
        anyhow::bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    std::fs::write(&config_path, Config::generate_default())?;
    println!("Created config file: {}", config_path.display());

    let config = Config::default();
    let _db = Database::open(&config.database.path)?;
    println!("Initialized database: {}", config.database.path.display());

    println!("\nNext steps:");
    println!("  ebook-reader user add <username>");
    println!("  ebook-reader book add /path/to/book.epub");
    println!("  ebook-reader read <book-id> --token <token>");

    Ok(())
}

/// User management commands.
async fn cmd_user(action: UserCommand, config: &Config) -> anyhow::Result<()> {
    let db = Database::open(&config.database.path)?;
    let auth = AuthService::new(db.clone(), config.auth.session_days);

    match action {
        UserCommand::Add { username, password } => {
            let password = match password {
                Some(p) => p,
                None => prompt_password("Password: ")?,
            };

            let user = auth.create_user(&username, &password)?;
            println!("Created user: {} (id: {})", user.username, user.id);
        }

        UserCommand::Del { username } => {
            if auth.delete_user(&username)? {
                println!("Deleted user: {}", username);
            } else {
                println!("User not found: {}", username);
            }
        }

        UserCommand::List => {
            let users = auth.list_users()?;
            if users.is_empty() {
                println!("No users found.");
            } else {
                println!("{:<20} {:<36} LAST LOGIN", "USERNAME", "ID");
                println!("{}", "-".repeat(72));
                for user in users {
                    let last_login = user
                        .last_login
                        .map(format_timestamp)
                        .unwrap_or_else(|| "never".to_string());
                    println!("{:<20} {:<36} {}", user.username, user.id, last_login);
                }
            }
        }

        UserCommand::Passwd { username, password } => {
            let password = match password {
                Some(p) => p,
                None => prompt_password("New password: ")?,
            };

            if auth.change_password(&username, &password)? {
                println!("Password changed for: {}", username);
            } else {
                println!("User not found: {}", username);
            }
        }

        UserCommand::Prefs { username, style } => {
            let Some(user) = db.get_user_by_username(&username)? else {
                anyhow::bail!("User not found: {}", username);
            };

            let stored = db.get_preferences(&user.id)?.unwrap_or_default();
            let prefs = config.reader.preferences().with_stored(&stored).with_overrides(
                style.theme,
                style.font_size,
                style.font_family.as_deref(),
            );

            db.save_preferences(&user.id, &prefs.to_stored())?;
            println!(
                "Saved preferences for {}: theme {}, {}px {}",
                username,
                prefs.theme().as_str(),
                prefs.font_size(),
                prefs.font_family()
            );
        }
    }

    Ok(())
}

/// Log in and print a token.
async fn cmd_login(
    username: &str,
    password: Option<String>,
    device: Option<String>,
    config: &Config,
) -> anyhow::Result<()> {
    let db = Database::open(&config.database.path)?;
    let auth = AuthService::new(db.clone(), config.auth.session_days);

    let password = match password {
        Some(p) => p,
        None => prompt_password("Password: ")?,
    };

    let removed = db.cleanup_expired_sessions()?;
    if removed > 0 {
        tracing::debug!(removed, "Removed expired sessions");
    }

    let (user, token) = auth.login(username, &password, device)?;
    tracing::info!(user_id = %user.id, "Logged in");

    // Token alone on stdout so it can be captured
    println!("{}", token);
    Ok(())
}

/// Delete the session behind a token.
async fn cmd_logout(token: &str, config: &Config) -> anyhow::Result<()> {
    let db = Database::open(&config.database.path)?;
    let auth = AuthService::new(db, config.auth.session_days);

    let token = ebook_reader::auth::extract_token(token).unwrap_or(token);
    auth.logout(token)?;
    println!("Logged out.");
    Ok(())
}

/// Book catalog commands.
async fn cmd_book(action: BookCommand, config: &Config) -> anyhow::Result<()> {
    let db = Database::open(&config.database.path)?;

    match action {
        BookCommand::Add { path, meta } => {
            if !path.is_file() {
                anyhow::bail!("Not a file: {}", path.display());
            }

            let path = path.canonicalize()?;
            let format = formats::detect_format(&path)?;
            let mut book = Book::from_file(path, format);

            if let Err(e) = formats::get_handler(format).extract_metadata(&mut book) {
                tracing::warn!(error = %e, "Failed to read embedded metadata");
            }

            apply_meta(&mut book, meta);
            db.save_book(&book.to_stored())?;
            println!("Added book: {} ({})", book.title, book.id);
        }

        BookCommand::New { mut meta } => {
            let Some(title) = meta.title.take() else {
                anyhow::bail!("--title is required for books without a file");
            };

            let mut book = Book::new(title);
            apply_meta(&mut book, meta);
            db.save_book(&book.to_stored())?;
            println!("Added book: {} ({})", book.title, book.id);
        }

        BookCommand::List => {
            let books = db.get_all_books()?;
            if books.is_empty() {
                println!("No books found.");
            } else {
                println!("{:<36} {:<30} {:<20} {:>5} FORMAT", "ID", "TITLE", "AUTHOR", "PAGES");
                println!("{}", "-".repeat(104));
                for stored in &books {
                    let book = Book::from_stored(stored);
                    let pages = book
                        .page_count
                        .map(|n| n.to_string())
                        .unwrap_or_else(|| "-".to_string());
                    let format = book.format.map(|f| f.extension()).unwrap_or("-");
                    println!(
                        "{:<36} {:<30} {:<20} {:>5} {}",
                        book.id,
                        truncate(&book.title, 30),
                        truncate(book.author_display(), 20),
                        pages,
                        format
                    );
                }
            }
        }

        BookCommand::Del { id } => {
            if db.delete_book(&id)? {
                println!("Deleted book: {}", id);
            } else {
                println!("Book not found: {}", id);
            }
        }
    }

    Ok(())
}

/// Open a book in the terminal reader.
async fn cmd_read(
    book_id: &str,
    token: Option<&str>,
    style: StyleArgs,
    config: &Config,
) -> anyhow::Result<()> {
    let db = Database::open(&config.database.path)?;
    let auth = AuthService::new(db.clone(), config.auth.session_days);

    let user_id = match token {
        Some(token) => match auth.resolve(token) {
            Ok(Some(user_id)) => Some(user_id),
            Ok(None) => {
                tracing::warn!("Invalid or expired token, reading anonymously");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Token check failed, reading anonymously");
                None
            }
        },
        None => None,
    };

    let mut preferences = config.reader.preferences();
    if let Some(user_id) = &user_id {
        match db.get_preferences(user_id) {
            Ok(Some(stored)) => preferences = preferences.with_stored(&stored),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Failed to load preferences"),
        }
    }
    let preferences = preferences.with_overrides(
        style.theme,
        style.font_size,
        style.font_family.as_deref(),
    );

    let session_config = SessionConfig {
        preferences,
        paginator: ContentPaginator::new(config.reader.default_page_count),
    };

    let mut session = ReaderSession::open(
        book_id,
        user_id,
        ReaderStores::from_database(&db),
        session_config,
    )
    .await;

    let mut stdout = io::stdout();
    terminal::run(&mut session, BufReader::new(tokio::io::stdin()), &mut stdout).await?;

    Ok(())
}

/// Print the reading history of the token's user.
async fn cmd_history(token: &str, config: &Config) -> anyhow::Result<()> {
    let db = Database::open(&config.database.path)?;
    let auth = AuthService::new(db.clone(), config.auth.session_days);

    let Some(user_id) = auth.resolve(token)? else {
        anyhow::bail!("Invalid or expired token. Log in again with: ebook-reader login <username>");
    };

    let rows = db.list_progress(&user_id)?;
    if rows.is_empty() {
        println!("No reading history.");
        return Ok(());
    }

    println!("{:<30} {:>6} {:>9} {:<5} LAST READ", "TITLE", "PAGE", "PROGRESS", "DONE");
    println!("{}", "-".repeat(72));
    for row in rows {
        let title = db
            .get_book(&row.book_id)?
            .map(|b| b.title)
            .unwrap_or_else(|| row.book_id.clone());
        println!(
            "{:<30} {:>6} {:>8.1}% {:<5} {}",
            truncate(&title, 30),
            row.last_page,
            row.progress,
            if row.completed { "yes" } else { "no" },
            format_timestamp(row.updated_at)
        );
    }

    Ok(())
}

/// Apply metadata given on the command line.
fn apply_meta(book: &mut Book, meta: BookMetaArgs) {
    if let Some(title) = meta.title {
        book.title = title;
    }
    if meta.author.is_some() {
        book.author = meta.author;
    }
    if meta.description.is_some() {
        book.description = meta.description;
    }
    if meta.pages.is_some() {
        book.page_count = meta.pages;
    }
    if meta.language.is_some() {
        book.language = meta.language;
    }
    if !meta.genres.is_empty() {
        book.genres = meta.genres;
    }
}

fn format_timestamp(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
        out.push('~');
        out
    }
}

/// Prompt for password input.
fn prompt_password(prompt: &str) -> anyhow::Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;

    let mut password = String::new();
    io::stdin().read_line(&mut password)?;

    Ok(password.trim().to_string())
}
