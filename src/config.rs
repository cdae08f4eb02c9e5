use crate::reader::{ReaderPreferences, Theme};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Terminal eBook reader with synced reading progress and bookmarks.
#[derive(Parser, Debug, Clone)]
#[command(name = "ebook-reader")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file.
    #[arg(short, long, env = "EBOOK_READER_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Initialize database and create default config.
    Init {
        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },

    /// User management commands.
    User {
        /// User subcommand action.
        #[command(subcommand)]
        action: UserCommand,
    },

    /// Log in and print a bearer token.
    Login {
        /// Username.
        username: String,
        /// Password (will prompt if not provided).
        #[arg(short, long)]
        password: Option<String>,
        /// Device identifier stored with the session.
        #[arg(short, long)]
        device: Option<String>,
    },

    /// End a session.
    Logout {
        /// Bearer token.
        #[arg(short, long, env = "EBOOK_READER_TOKEN")]
        token: String,
    },

    /// Book catalog commands.
    Book {
        /// Book subcommand action.
        #[command(subcommand)]
        action: BookCommand,
    },

    /// Open a book in the terminal reader.
    Read {
        /// Book ID.
        book_id: String,
        /// Bearer token (omit to read anonymously).
        #[arg(short, long, env = "EBOOK_READER_TOKEN")]
        token: Option<String>,
        #[command(flatten)]
        style: StyleArgs,
    },

    /// Show reading history for the logged-in user.
    History {
        /// Bearer token.
        #[arg(short, long, env = "EBOOK_READER_TOKEN")]
        token: String,
    },
}

/// Reader style overrides.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct StyleArgs {
    /// Theme: light, dark or sepia.
    #[arg(long)]
    pub theme: Option<Theme>,
    /// Font size in pixels (12-24).
    #[arg(long)]
    pub font_size: Option<u32>,
    /// Font family.
    #[arg(long)]
    pub font_family: Option<String>,
}

/// User management subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum UserCommand {
    /// Add a new user.
    Add {
        /// Username.
        username: String,
        /// Password (will prompt if not provided).
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Delete a user.
    Del {
        /// Username to delete.
        username: String,
    },

    /// List all users.
    List,

    /// Change user password.
    Passwd {
        /// Username.
        username: String,
        /// New password (will prompt if not provided).
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Save reader preferences for a user.
    Prefs {
        /// Username.
        username: String,
        #[command(flatten)]
        style: StyleArgs,
    },
}

/// Book catalog subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum BookCommand {
    /// Import a book file (epub, txt, md, html).
    Add {
        /// Path to the book file.
        path: PathBuf,
        #[command(flatten)]
        meta: BookMetaArgs,
    },

    /// Add a catalog entry without a content file.
    New {
        #[command(flatten)]
        meta: BookMetaArgs,
    },

    /// List all books.
    List,

    /// Delete a book.
    Del {
        /// Book ID.
        id: String,
    },
}

/// Metadata overrides for imported books.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct BookMetaArgs {
    /// Title.
    #[arg(long)]
    pub title: Option<String>,
    /// Author.
    #[arg(long)]
    pub author: Option<String>,
    /// Description.
    #[arg(long)]
    pub description: Option<String>,
    /// Declared page count.
    #[arg(long)]
    pub pages: Option<u32>,
    /// Language.
    #[arg(long)]
    pub language: Option<String>,
    /// Genre (repeatable).
    #[arg(long = "genre")]
    pub genres: Vec<String>,
}

/// Main configuration from TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Authentication configuration.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Reader configuration.
    #[serde(default)]
    pub reader: ReaderConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("data/reader.db")
}

/// Authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Session token duration in days.
    #[serde(default = "default_session_days")]
    pub session_days: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_days: default_session_days(),
        }
    }
}

fn default_session_days() -> u32 {
    30
}

/// Reader configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Page count used when a book declares none.
    #[serde(default = "default_page_count")]
    pub default_page_count: u32,

    /// Default theme.
    #[serde(default)]
    pub theme: Theme,

    /// Default font size in pixels.
    #[serde(default = "default_font_size")]
    pub font_size: u32,

    /// Default font family.
    #[serde(default = "default_font_family")]
    pub font_family: String,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            default_page_count: default_page_count(),
            theme: Theme::default(),
            font_size: default_font_size(),
            font_family: default_font_family(),
        }
    }
}

fn default_page_count() -> u32 {
    crate::reader::DEFAULT_PAGE_COUNT
}

fn default_font_size() -> u32 {
    crate::reader::DEFAULT_FONT_SIZE
}

fn default_font_family() -> String {
    crate::reader::DEFAULT_FONT_FAMILY.to_string()
}

impl ReaderConfig {
    /// Preferences configured as the default for every reader.
    pub fn preferences(&self) -> ReaderPreferences {
        ReaderPreferences::new(self.theme, self.font_size, &self.font_family)
    }
}

impl Config {
    /// Load configuration from file.
    pub fn load(path: &PathBuf) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::error::AppError::Config(format!("Failed to read config file: {}", e))
        })?;

        toml::from_str(&content).map_err(|e| {
            crate::error::AppError::Config(format!("Failed to parse config file: {}", e))
        })
    }

    /// Find config file in default locations.
    pub fn find_config_file() -> Option<PathBuf> {
        let candidates = [
            PathBuf::from("config.toml"),
            PathBuf::from("ebook-reader.toml"),
            dirs::config_dir()
                .map(|p| p.join("ebook-reader").join("config.toml"))
                .unwrap_or_default(),
            PathBuf::from("/etc/ebook-reader/config.toml"),
        ];

        candidates.into_iter().find(|p| p.exists())
    }

    /// Generate default config file content.
    pub fn generate_default() -> String {
        r#"# ebook-reader configuration

[database]
# path = "/var/lib/ebook-reader/reader.db"

[auth]
# Session duration in days
session_days = 30

[reader]
# Page count for books that declare none
default_page_count = 100
# Theme: "light", "dark" or "sepia"
theme = "light"
# Font size in pixels (12-24)
font_size = 16
font_family = "Arial"
"#
        .to_string()
    }
}

/// Supported book formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookFormat {
    /// EPUB format (Electronic Publication).
    Epub,
    /// Plain text format.
    Txt,
    /// HTML format.
    Html,
    /// Markdown format.
    Md,
}

impl BookFormat {
    /// Try to detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "epub" => Some(BookFormat::Epub),
            "txt" | "text" => Some(BookFormat::Txt),
            "html" | "htm" | "xhtml" => Some(BookFormat::Html),
            "md" | "markdown" => Some(BookFormat::Md),
            _ => None,
        }
    }

    /// Canonical extension stored in the catalog.
    pub fn extension(&self) -> &'static str {
        match self {
            BookFormat::Epub => "epub",
            BookFormat::Txt => "txt",
            BookFormat::Html => "html",
            BookFormat::Md => "md",
        }
    }
}
