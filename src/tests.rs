use crate::auth::{AuthService, Authenticator};
use crate::config::{BookFormat, Config};
use crate::db::{Bookmark, Database, Session, StoredBook, StoredPreferences, User, now_timestamp};
use crate::library::Book;
use crate::reader::{BookmarkStore, ProgressStore, Theme};

fn test_db() -> Database {
    Database::open_memory().unwrap()
}

fn create_user(db: &Database, id: &str, username: &str) {
    let user = User {
        id: id.to_string(),
        username: username.to_string(),
        password_hash: "hash".to_string(),
        created_at: now_timestamp(),
        last_login: None,
    };
    db.create_user(&user).unwrap();
}

fn create_book(db: &Database, id: &str, title: &str) {
    let book = StoredBook {
        id: id.to_string(),
        title: title.to_string(),
        author: None,
        description: None,
        page_count: Some(120),
        file_path: None,
        format: None,
        language: None,
        genres_json: None,
        published: None,
        created_at: now_timestamp(),
    };
    db.save_book(&book).unwrap();
}

fn setup_user_and_book(db: &Database) {
    create_user(db, "user-1", "testuser");
    create_book(db, "book-1", "Test Book");
}

fn bookmark(id: &str, page: u32, note: Option<&str>) -> Bookmark {
    Bookmark {
        id: id.to_string(),
        user_id: "user-1".to_string(),
        book_id: "book-1".to_string(),
        page_number: page,
        note: note.map(String::from),
        created_at: now_timestamp(),
    }
}

#[test]
fn db_create_and_get_user() {
    let db = test_db();
    create_user(&db, "user-1", "alice");

    let found = db.get_user_by_username("alice").unwrap().unwrap();
    assert_eq!(found.id, "user-1");
    assert_eq!(found.username, "alice");

    let found_by_id = db.get_user_by_id("user-1").unwrap().unwrap();
    assert_eq!(found_by_id.username, "alice");
}

#[test]
fn db_duplicate_username_fails() {
    let db = test_db();
    create_user(&db, "user-1", "alice");

    let duplicate = User {
        id: "user-2".to_string(),
        username: "alice".to_string(),
        password_hash: "hash2".to_string(),
        created_at: now_timestamp(),
        last_login: None,
    };
    assert!(db.create_user(&duplicate).is_err());
}

#[test]
fn db_delete_user_removes_reading_data() {
    let db = test_db();
    setup_user_and_book(&db);
    db.upsert_progress("user-1", "book-1", 10, 8.0).unwrap();
    db.insert_bookmark(&bookmark("bm-1", 10, None)).unwrap();

    assert!(db.delete_user("testuser").unwrap());
    assert!(db.get_user_by_username("testuser").unwrap().is_none());
    assert!(db.get_progress("user-1", "book-1").unwrap().is_none());
    assert!(db.get_bookmarks("user-1", "book-1").unwrap().is_empty());

    assert!(!db.delete_user("testuser").unwrap());
}

#[test]
fn db_create_and_delete_session() {
    let db = test_db();
    create_user(&db, "user-1", "testuser");

    let session = Session {
        token: "token123".to_string(),
        user_id: "user-1".to_string(),
        device_id: Some("device-1".to_string()),
        expires_at: now_timestamp() + 3600,
    };
    db.create_session(&session).unwrap();

    let found = db.get_session("token123").unwrap().unwrap();
    assert_eq!(found.user_id, "user-1");
    assert_eq!(found.device_id, Some("device-1".to_string()));

    db.delete_session("token123").unwrap();
    assert!(db.get_session("token123").unwrap().is_none());
}

#[test]
fn db_expired_sessions_cleanup() {
    let db = test_db();
    create_user(&db, "user-1", "testuser");

    let expired = Session {
        token: "expired".to_string(),
        user_id: "user-1".to_string(),
        device_id: None,
        expires_at: now_timestamp() - 3600,
    };
    let valid = Session {
        token: "valid".to_string(),
        user_id: "user-1".to_string(),
        device_id: None,
        expires_at: now_timestamp() + 3600,
    };

    db.create_session(&expired).unwrap();
    db.create_session(&valid).unwrap();

    assert_eq!(db.cleanup_expired_sessions().unwrap(), 1);

    assert!(db.get_session("expired").unwrap().is_none());
    assert!(db.get_session("valid").unwrap().is_some());
}

#[test]
fn db_preferences_merge_on_update() {
    let db = test_db();
    create_user(&db, "user-1", "testuser");
    assert!(db.get_preferences("user-1").unwrap().is_none());

    db.save_preferences(
        "user-1",
        &StoredPreferences {
            theme: Some("dark".to_string()),
            font_size: Some(18),
            font_family: None,
        },
    )
    .unwrap();
    db.save_preferences(
        "user-1",
        &StoredPreferences {
            font_family: Some("Georgia".to_string()),
            ..StoredPreferences::default()
        },
    )
    .unwrap();

    let prefs = db.get_preferences("user-1").unwrap().unwrap();
    assert_eq!(prefs.theme.as_deref(), Some("dark"));
    assert_eq!(prefs.font_size, Some(18));
    assert_eq!(prefs.font_family.as_deref(), Some("Georgia"));
}

#[test]
fn db_save_and_get_book() {
    let db = test_db();

    let mut book = Book::new("Test Book");
    book.author = Some("Author".to_string());
    book.page_count = Some(250);
    book.format = Some(BookFormat::Epub);
    book.file_path = Some("/books/test.epub".into());
    book.genres = vec!["Fiction".to_string(), "Sea".to_string()];
    db.save_book(&book.to_stored()).unwrap();

    let found = Book::from_stored(&db.get_book(&book.id).unwrap().unwrap());
    assert_eq!(found.title, "Test Book");
    assert_eq!(found.author_display(), "Author");
    assert_eq!(found.page_count, Some(250));
    assert_eq!(found.format, Some(BookFormat::Epub));
    assert_eq!(found.genres, book.genres);

    book.title = "Renamed".to_string();
    db.save_book(&book.to_stored()).unwrap();
    assert_eq!(db.get_all_books().unwrap().len(), 1);
    assert_eq!(db.get_book(&book.id).unwrap().unwrap().title, "Renamed");
}

#[test]
fn db_get_all_books() {
    let db = test_db();
    create_book(&db, "book-a", "Alpha");
    create_book(&db, "book-b", "Beta");

    let books = db.get_all_books().unwrap();
    assert_eq!(books.len(), 2);
}

#[test]
fn db_delete_book_removes_reading_data() {
    let db = test_db();
    setup_user_and_book(&db);
    db.upsert_progress("user-1", "book-1", 3, 2.5).unwrap();
    db.insert_bookmark(&bookmark("bm-1", 3, None)).unwrap();

    assert!(db.delete_book("book-1").unwrap());
    assert!(db.get_book("book-1").unwrap().is_none());
    assert!(db.get_progress("user-1", "book-1").unwrap().is_none());
    assert!(db.get_bookmarks("user-1", "book-1").unwrap().is_empty());
    assert!(!db.delete_book("book-1").unwrap());
}

#[test]
fn db_progress_upsert_keeps_one_row() {
    let db = test_db();
    setup_user_and_book(&db);

    db.upsert_progress("user-1", "book-1", 10, 8.3).unwrap();
    db.upsert_progress("user-1", "book-1", 80, 66.7).unwrap();

    let found = db.get_progress("user-1", "book-1").unwrap().unwrap();
    assert_eq!(found.last_page, 80);
    assert_eq!(found.progress, 66.7);
    assert!(!found.completed);
    assert_eq!(db.list_progress("user-1").unwrap().len(), 1);
}

#[test]
fn db_progress_upsert_preserves_completed() {
    let db = test_db();
    setup_user_and_book(&db);

    db.upsert_progress("user-1", "book-1", 120, 100.0).unwrap();
    assert!(db.set_completed("user-1", "book-1", true).unwrap());

    db.upsert_progress("user-1", "book-1", 5, 4.2).unwrap();
    let found = db.get_progress("user-1", "book-1").unwrap().unwrap();
    assert_eq!(found.last_page, 5);
    assert!(found.completed);

    assert!(!db.set_completed("user-1", "missing", true).unwrap());
}

#[test]
fn db_list_progress_per_user() {
    let db = test_db();
    create_user(&db, "user-1", "testuser");
    create_user(&db, "user-2", "other");

    for i in 1..=3 {
        let id = format!("book-{}", i);
        create_book(&db, &id, &format!("Book {}", i));
        db.upsert_progress("user-1", &id, i * 10, f64::from(i)).unwrap();
    }
    db.upsert_progress("user-2", "book-1", 1, 0.8).unwrap();

    let rows = db.list_progress("user-1").unwrap();
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r.user_id == "user-1"));
    assert_eq!(db.list_progress("user-2").unwrap().len(), 1);
}

#[test]
fn db_bookmarks_keep_insertion_order_and_duplicates() {
    let db = test_db();
    setup_user_and_book(&db);

    db.insert_bookmark(&bookmark("bm-1", 40, Some("storm"))).unwrap();
    db.insert_bookmark(&bookmark("bm-2", 12, None)).unwrap();
    db.insert_bookmark(&bookmark("bm-3", 40, Some("again"))).unwrap();

    let bookmarks = db.get_bookmarks("user-1", "book-1").unwrap();
    let ids: Vec<&str> = bookmarks.iter().map(|b| b.id.as_str()).collect();
    assert_eq!(ids, vec!["bm-1", "bm-2", "bm-3"]);
    assert_eq!(bookmarks[0].note.as_deref(), Some("storm"));
    assert_eq!(bookmarks[1].note, None);
}

#[test]
fn db_delete_bookmark_checks_owner() {
    let db = test_db();
    setup_user_and_book(&db);
    db.insert_bookmark(&bookmark("bm-1", 7, None)).unwrap();

    assert!(!db.delete_bookmark("bm-1", "someone-else").unwrap());
    assert!(db.delete_bookmark("bm-1", "user-1").unwrap());
    assert!(db.get_bookmarks("user-1", "book-1").unwrap().is_empty());
}

#[test]
fn stores_adapt_database() {
    let db = test_db();
    setup_user_and_book(&db);

    let mut draft = bookmark("bm-1", 9, Some("here"));
    draft.user_id = String::new();
    draft.book_id = String::new();

    let saved = BookmarkStore::append(&db, "user-1", "book-1", draft).unwrap();
    assert_eq!(saved.user_id, "user-1");
    assert_eq!(saved.book_id, "book-1");
    assert_eq!(BookmarkStore::list(&db, "user-1", "book-1").unwrap(), vec![saved]);
    assert!(BookmarkStore::remove(&db, "user-1", "bm-1").unwrap());

    ProgressStore::upsert(&db, "user-1", "book-1", 60, 50.0).unwrap();
    let progress = ProgressStore::get(&db, "user-1", "book-1").unwrap().unwrap();
    assert_eq!(progress.last_page, 60);
}

#[test]
fn auth_create_user_and_login() {
    let db = test_db();
    let auth = AuthService::new(db, 30);

    let user = auth.create_user("testuser", "password123").unwrap();
    assert_eq!(user.username, "testuser");

    let (logged_in, token) = auth.login("testuser", "password123", None).unwrap();
    assert_eq!(logged_in.username, "testuser");
    assert!(!token.is_empty());
}

#[test]
fn auth_validate_token() {
    let db = test_db();
    let auth = AuthService::new(db, 30);

    auth.create_user("alice", "pass1234").unwrap();
    let (_, token) = auth.login("alice", "pass1234", None).unwrap();

    let user = auth.validate_token(&token).unwrap().unwrap();
    assert_eq!(user.username, "alice");

    assert!(auth.validate_token("invalid_token").unwrap().is_none());
}

#[test]
fn auth_resolves_bearer_credentials() {
    let db = test_db();
    let auth = AuthService::new(db, 30);

    let user = auth.create_user("carol", "secret99").unwrap();
    let (_, token) = auth.login("carol", "secret99", Some("kobo".to_string())).unwrap();

    assert_eq!(auth.resolve(&token).unwrap(), Some(user.id.clone()));
    assert_eq!(
        auth.resolve(&format!("Bearer {}", token)).unwrap(),
        Some(user.id)
    );
    assert_eq!(auth.resolve("Bearer ").unwrap(), None);
    assert_eq!(auth.resolve("").unwrap(), None);
    assert_eq!(auth.resolve("Bearer nope").unwrap(), None);
}

#[test]
fn auth_expired_token_is_anonymous() {
    let db = test_db();
    let auth = AuthService::new(db.clone(), 30);
    let user = auth.create_user("dave", "password").unwrap();

    db.create_session(&Session {
        token: "stale".to_string(),
        user_id: user.id,
        device_id: None,
        expires_at: now_timestamp() - 1,
    })
    .unwrap();

    assert_eq!(auth.resolve("stale").unwrap(), None);
    assert!(db.get_session("stale").unwrap().is_none());
}

#[test]
fn auth_logout() {
    let db = test_db();
    let auth = AuthService::new(db, 30);

    auth.create_user("bob", "password").unwrap();
    let (_, token) = auth.login("bob", "password", None).unwrap();

    auth.logout(&token).unwrap();
    assert!(auth.validate_token(&token).unwrap().is_none());
}

#[test]
fn auth_invalid_password() {
    let db = test_db();
    let auth = AuthService::new(db, 30);

    auth.create_user("user", "correct").unwrap();
    assert!(auth.login("user", "wrong", None).is_err());
    assert!(auth.login("nobody", "correct", None).is_err());
}

#[test]
fn auth_change_password() {
    let db = test_db();
    let auth = AuthService::new(db, 30);

    auth.create_user("user", "oldpass").unwrap();
    assert!(auth.change_password("user", "newpass").unwrap());

    assert!(auth.login("user", "oldpass", None).is_err());
    assert!(auth.login("user", "newpass", None).is_ok());
}

#[test]
fn auth_short_password_rejected() {
    let db = test_db();
    let auth = AuthService::new(db, 30);

    assert!(auth.create_user("user", "abc").is_err());
}

#[test]
fn auth_invalid_username_rejected() {
    let db = test_db();
    let auth = AuthService::new(db, 30);

    assert!(auth.create_user("user@email", "password").is_err());
    assert!(auth.create_user("user name", "password").is_err());
    assert!(auth.create_user("", "password").is_err());
}

#[test]
fn config_parse_toml() {
    let toml = r#"
[database]
path = "/tmp/test.db"

[auth]
session_days = 7

[reader]
default_page_count = 250
theme = "sepia"
font_size = 30
"#;
    let config: Config = toml::from_str(toml).unwrap();
    assert_eq!(config.database.path.to_str(), Some("/tmp/test.db"));
    assert_eq!(config.auth.session_days, 7);
    assert_eq!(config.reader.default_page_count, 250);

    let prefs = config.reader.preferences();
    assert_eq!(prefs.theme(), Theme::Sepia);
    assert_eq!(prefs.font_size(), 24);
    assert_eq!(prefs.font_family(), "Arial");
}

#[test]
fn config_default_values() {
    let config = Config::default();
    assert_eq!(config.auth.session_days, 30);
    assert_eq!(config.reader.default_page_count, 100);
    assert_eq!(config.reader.theme, Theme::Light);
    assert_eq!(config.reader.font_size, 16);
}

#[test]
fn config_generated_default_parses() {
    let config: Config = toml::from_str(&Config::generate_default()).unwrap();
    assert_eq!(config.reader.default_page_count, 100);
    assert_eq!(config.database.path.to_str(), Some("data/reader.db"));
}

#[test]
fn config_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[reader]\ntheme = \"dark\"\n").unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.reader.theme, Theme::Dark);

    std::fs::write(&path, "[reader]\ntheme = \"neon\"\n").unwrap();
    assert!(Config::load(&path).is_err());
}

#[test]
fn book_format_from_extension() {
    assert_eq!(BookFormat::from_extension("epub"), Some(BookFormat::Epub));
    assert_eq!(BookFormat::from_extension("TXT"), Some(BookFormat::Txt));
    assert_eq!(BookFormat::from_extension("markdown"), Some(BookFormat::Md));
    assert_eq!(BookFormat::from_extension("htm"), Some(BookFormat::Html));
    assert_eq!(BookFormat::from_extension("xhtml"), Some(BookFormat::Html));
    assert_eq!(BookFormat::from_extension("pdf"), None);
    assert_eq!(BookFormat::Md.extension(), "md");
}

#[test]
fn database_on_disk_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("reader.db");

    {
        let db = Database::open(&path).unwrap();
        setup_user_and_book(&db);
        db.upsert_progress("user-1", "book-1", 33, 27.5).unwrap();
    }

    let db = Database::open(&path).unwrap();
    let progress = db.get_progress("user-1", "book-1").unwrap().unwrap();
    assert_eq!(progress.last_page, 33);
}
