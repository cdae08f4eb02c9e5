//! Line-oriented terminal front end for a [`ReaderSession`].

use crate::error::Result;
use crate::reader::ReaderSession;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

const PROGRESS_BAR_WIDTH: usize = 20;

const HELP: &str = "\
Commands:
  n, next             next page (also Enter)
  p, prev             previous page
  g, goto <page>      go to page
  b, bookmark [note]  bookmark this page
  l, bookmarks        list bookmarks
  j, jump <n>         go to bookmark n
  rm <n>              remove bookmark n
  s, settings         show display settings
  h, help             show this help
  q, quit             close the book";

/// A command typed at the reader prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderCommand {
    /// Next page.
    Next,
    /// Previous page.
    Prev,
    /// Go to the page typed by the reader.
    GoTo(String),
    /// Bookmark the current page.
    Bookmark(Option<String>),
    /// List bookmarks.
    ListBookmarks,
    /// Jump to the nth bookmark (1-based).
    Jump(usize),
    /// Remove the nth bookmark (1-based).
    Remove(usize),
    /// Show display settings.
    Settings,
    /// Show help.
    Help,
    /// Close the book.
    Quit,
    /// Anything else.
    Unknown(String),
}

impl ReaderCommand {
    /// Parse one input line.
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map(|(w, r)| (w, r.trim()))
            .unwrap_or((line, ""));

        let index = || rest.parse::<usize>().ok().filter(|&n| n > 0);

        match word.to_ascii_lowercase().as_str() {
            "" | "n" | "next" => Self::Next,
            "p" | "prev" => Self::Prev,
            "g" | "goto" => Self::GoTo(rest.to_string()),
            "b" | "bookmark" => Self::Bookmark((!rest.is_empty()).then(|| rest.to_string())),
            "l" | "bookmarks" => Self::ListBookmarks,
            "j" | "jump" => index().map_or_else(|| Self::Unknown(line.to_string()), Self::Jump),
            "rm" => index().map_or_else(|| Self::Unknown(line.to_string()), Self::Remove),
            "s" | "settings" => Self::Settings,
            "h" | "help" | "?" => Self::Help,
            "q" | "quit" => Self::Quit,
            _ => Self::Unknown(line.to_string()),
        }
    }
}

/// Draw the current page with a header and progress footer.
pub fn render(session: &ReaderSession, out: &mut impl Write) -> std::io::Result<()> {
    let book = session.book();
    let rule = "-".repeat(60);

    writeln!(out)?;
    writeln!(out, "{} by {}", book.title, book.author_display())?;
    writeln!(out, "{}", rule)?;
    writeln!(out, "{}", session.page_text().trim())?;
    writeln!(out, "{}", rule)?;

    let progress = session.progress();
    let filled = ((progress / 100.0) * PROGRESS_BAR_WIDTH as f64).round() as usize;
    let filled = filled.min(PROGRESS_BAR_WIDTH);
    writeln!(
        out,
        "[{}{}] Page {} of {} ({:.0}%)",
        "#".repeat(filled),
        ".".repeat(PROGRESS_BAR_WIDTH - filled),
        session.current_page(),
        session.total_pages(),
        progress
    )
}

fn list_bookmarks(session: &ReaderSession, out: &mut impl Write) -> std::io::Result<()> {
    if session.user_id().is_none() {
        return writeln!(out, "Log in to use bookmarks.");
    }
    if session.bookmarks().is_empty() {
        return writeln!(out, "No bookmarks yet.");
    }

    for (i, bookmark) in session.bookmarks().iter().enumerate() {
        match &bookmark.note {
            Some(note) => writeln!(out, "{:>3}. page {}: {}", i + 1, bookmark.page_number, note)?,
            None => writeln!(out, "{:>3}. page {}", i + 1, bookmark.page_number)?,
        }
    }
    Ok(())
}

fn show_settings(session: &ReaderSession, out: &mut impl Write) -> std::io::Result<()> {
    let prefs = session.preferences();
    let style = prefs.style();

    writeln!(out, "Theme:       {}", prefs.theme().as_str())?;
    writeln!(out, "Font size:   {}px", style.font_size_px)?;
    writeln!(out, "Font family: {}", style.font_family)?;
    writeln!(out, "Colors:      {} on {}", style.foreground, style.background)?;
    writeln!(out, "Line height: {}", style.line_height)
}

/// Read commands from `input` until `q` or end of input, then close the
/// session.
pub async fn run<R, W>(session: &mut ReaderSession, input: R, out: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    render(session, out)?;

    loop {
        write!(out, "> ")?;
        out.flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match ReaderCommand::parse(&line) {
            ReaderCommand::Next => {
                let before = session.current_page();
                if session.next_page() == before {
                    writeln!(out, "Already on the last page.")?;
                } else {
                    render(session, out)?;
                }
            }
            ReaderCommand::Prev => {
                let before = session.current_page();
                if session.prev_page() == before {
                    writeln!(out, "Already on the first page.")?;
                } else {
                    render(session, out)?;
                }
            }
            ReaderCommand::GoTo(page) => {
                session.go_to_page_input(&page);
                render(session, out)?;
            }
            ReaderCommand::Bookmark(note) => {
                if session.user_id().is_none() {
                    writeln!(out, "Log in to use bookmarks.")?;
                } else if let Some(bookmark) = session.add_bookmark(note).await {
                    writeln!(out, "Bookmarked page {}.", bookmark.page_number)?;
                } else {
                    writeln!(out, "Could not save bookmark.")?;
                }
            }
            ReaderCommand::ListBookmarks => list_bookmarks(session, out)?,
            ReaderCommand::Jump(n) => match session.bookmarks().get(n - 1).map(|b| b.page_number) {
                Some(page) => {
                    session.jump_to_bookmark(page);
                    render(session, out)?;
                }
                None => writeln!(out, "No bookmark {}.", n)?,
            },
            ReaderCommand::Remove(n) => {
                let Some(id) = session.bookmarks().get(n - 1).map(|b| b.id.clone()) else {
                    writeln!(out, "No bookmark {}.", n)?;
                    continue;
                };
                if session.remove_bookmark(&id).await {
                    writeln!(out, "Removed bookmark {}.", n)?;
                } else {
                    writeln!(out, "Could not remove bookmark {}.", n)?;
                }
            }
            ReaderCommand::Settings => show_settings(session, out)?,
            ReaderCommand::Help => writeln!(out, "{}", HELP)?,
            ReaderCommand::Quit => break,
            ReaderCommand::Unknown(line) => {
                writeln!(out, "Unknown command: {} (h for help)", line)?
            }
        }
    }

    session.close().await;
    writeln!(out, "Closed at page {} of {}.", session.current_page(), session.total_pages())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{self, Database, User};
    use crate::library::Book;
    use crate::reader::{ReaderStores, SessionConfig, SessionState};

    #[test]
    fn parses_commands() {
        assert_eq!(ReaderCommand::parse(""), ReaderCommand::Next);
        assert_eq!(ReaderCommand::parse("  P "), ReaderCommand::Prev);
        assert_eq!(ReaderCommand::parse("g 12"), ReaderCommand::GoTo("12".into()));
        assert_eq!(ReaderCommand::parse("goto"), ReaderCommand::GoTo(String::new()));
        assert_eq!(
            ReaderCommand::parse("b the  whale"),
            ReaderCommand::Bookmark(Some("the  whale".into()))
        );
        assert_eq!(ReaderCommand::parse("b"), ReaderCommand::Bookmark(None));
        assert_eq!(ReaderCommand::parse("j 2"), ReaderCommand::Jump(2));
        assert_eq!(ReaderCommand::parse("j 0"), ReaderCommand::Unknown("j 0".into()));
        assert_eq!(ReaderCommand::parse("rm 1"), ReaderCommand::Remove(1));
        assert_eq!(ReaderCommand::parse("q"), ReaderCommand::Quit);
        assert_eq!(ReaderCommand::parse("xyzzy"), ReaderCommand::Unknown("xyzzy".into()));
    }

    async fn session(db: &Database, user_id: Option<&str>) -> ReaderSession {
        let mut book = Book::new("Moby Dick");
        book.author = Some("Herman Melville".to_string());
        book.page_count = Some(20);
        db.save_book(&book.to_stored()).unwrap();

        ReaderSession::open(
            &book.id,
            user_id.map(String::from),
            ReaderStores::from_database(db),
            SessionConfig::default(),
        )
        .await
    }

    #[tokio::test]
    async fn scripted_reading() {
        let db = Database::open_memory().unwrap();
        db.create_user(&User {
            id: "user-1".to_string(),
            username: "reader".to_string(),
            password_hash: "hash".to_string(),
            created_at: db::now_timestamp(),
            last_login: None,
        })
        .unwrap();

        let mut session = session(&db, Some("user-1")).await;
        let input: &[u8] = b"n\ng 10\nb call me\nl\ng 1\nj 1\nrm 1\nl\nq\nn\n";
        let mut out = Vec::new();

        run(&mut session, input, &mut out).await.unwrap();
        let out = String::from_utf8(out).unwrap();

        assert!(out.contains("Moby Dick by Herman Melville"));
        assert!(out.contains("Page 2 of 20 (10%)"));
        assert!(out.contains("Bookmarked page 10."));
        assert!(out.contains("  1. page 10: call me"));
        assert!(out.contains("Removed bookmark 1."));
        assert!(out.contains("No bookmarks yet."));
        assert!(out.contains("Closed at page 10 of 20."));

        assert_eq!(session.state(), SessionState::Closed);
        let saved = db.get_progress("user-1", &session.book().id).unwrap().unwrap();
        assert_eq!(saved.last_page, 10);
        assert_eq!(saved.progress, 50.0);
    }

    #[tokio::test]
    async fn anonymous_reading_stops_at_end_of_input() {
        let db = Database::open_memory().unwrap();
        let mut session = session(&db, None).await;
        let input: &[u8] = b"p\nb\ng 99\nn\ns";
        let mut out = Vec::new();

        run(&mut session, input, &mut out).await.unwrap();
        let out = String::from_utf8(out).unwrap();

        assert!(out.contains("Already on the first page."));
        assert!(out.contains("Log in to use bookmarks."));
        assert!(out.contains("[####################] Page 20 of 20 (100%)"));
        assert!(out.contains("Already on the last page."));
        assert!(out.contains("Theme:       light"));
        assert_eq!(session.state(), SessionState::Closed);
    }
}
