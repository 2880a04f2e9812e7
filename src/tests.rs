use crate::auth::AuthService;
use crate::catalog::{CatalogService, CoverUpload};
use crate::db::{Book, Database, ReadMark, User, now_timestamp};
use crate::error::AppError;
use crate::status::ReadStatusService;
use crate::storage::{CoverStore, LocalCoverStore};
use crate::validate::{
    ListBooksParams, LoginRequest, NewBookRequest, PageParams, SignupRequest, StatusListParams,
    ToggleRequest,
};
use uuid::Uuid;

// PNG signature; enough for format sniffing.
const PNG_BYTES: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D,
];

fn test_db() -> Database {
    Database::open_memory().unwrap()
}

fn auth_service(db: &Database) -> AuthService {
    AuthService::new(db.clone(), "test-secret", 24)
}

fn catalog_service(db: &Database, root: &std::path::Path) -> CatalogService {
    let covers = CoverStore::Local(LocalCoverStore::new(root, None).unwrap());
    CatalogService::new(db.clone(), covers)
}

fn create_user(db: &Database, email: &str, user_name: &str) -> User {
    let user = User {
        id: Uuid::new_v4().to_string(),
        first_name: "Test".to_string(),
        last_name: "Reader".to_string(),
        email: email.to_string(),
        user_name: user_name.to_string(),
        password_hash: "hash".to_string(),
        is_deleted: false,
        created_at: now_timestamp(),
    };
    db.create_user(&user).unwrap();
    user
}

fn sample_book(title: &str, author: &str, genre: &str, year: i32) -> Book {
    let now = now_timestamp();
    Book {
        id: Uuid::new_v4().to_string(),
        title: title.to_string(),
        author: author.to_string(),
        genre: genre.to_string(),
        publication_year: year,
        cover_image: None,
        is_deleted: false,
        created_at: now,
        updated_at: now,
    }
}

fn create_book(db: &Database, title: &str, author: &str, genre: &str, year: i32) -> Book {
    let book = sample_book(title, author, genre, year);
    db.insert_book(&book).unwrap();
    book
}

fn signup_request(email: &str, user_name: &str) -> SignupRequest {
    SignupRequest {
        first_name: Some("Test".to_string()),
        last_name: Some("Reader".to_string()),
        user_name: Some(user_name.to_string()),
        email: Some(email.to_string()),
        password: Some("password123".to_string()),
    }
}

fn login_request(email: &str, password: &str) -> LoginRequest {
    LoginRequest {
        email: Some(email.to_string()),
        password: Some(password.to_string()),
    }
}

fn toggle_request(user: &User, book: &Book) -> ToggleRequest {
    ToggleRequest {
        customer_id: Some(user.id.clone()),
        book_id: Some(book.id.clone()),
    }
}

fn status_params(user: &User) -> StatusListParams {
    StatusListParams {
        customer_id: Some(user.id.clone()),
        page: None,
        limit: None,
    }
}

// ========== USERS ==========

#[test]
fn db_create_and_get_user() {
    let db = test_db();
    let user = create_user(&db, "alice@example.com", "alice");

    let found = db.get_user_by_email("alice@example.com").unwrap().unwrap();
    assert_eq!(found.id, user.id);
    assert_eq!(found.user_name, "alice");

    let by_id = db.get_user_by_id(&user.id).unwrap().unwrap();
    assert_eq!(by_id.email, "alice@example.com");
}

#[test]
fn db_duplicate_email_is_conflict() {
    let db = test_db();
    create_user(&db, "alice@example.com", "alice");

    let dup = User {
        id: Uuid::new_v4().to_string(),
        first_name: "Other".to_string(),
        last_name: "Reader".to_string(),
        email: "alice@example.com".to_string(),
        user_name: "alice2".to_string(),
        password_hash: "hash".to_string(),
        is_deleted: false,
        created_at: now_timestamp(),
    };

    assert!(matches!(
        db.create_user(&dup),
        Err(AppError::Conflict(msg)) if msg.contains("Email")
    ));
}

#[test]
fn db_duplicate_username_is_conflict() {
    let db = test_db();
    create_user(&db, "alice@example.com", "alice");

    let dup = User {
        id: Uuid::new_v4().to_string(),
        first_name: "Other".to_string(),
        last_name: "Reader".to_string(),
        email: "other@example.com".to_string(),
        user_name: "alice".to_string(),
        password_hash: "hash".to_string(),
        is_deleted: false,
        created_at: now_timestamp(),
    };

    assert!(matches!(
        db.create_user(&dup),
        Err(AppError::Conflict(msg)) if msg.contains("Username")
    ));
}

// ========== AUTH ==========

#[test]
fn signup_then_login_returns_token() {
    let db = test_db();
    let auth = auth_service(&db);

    auth.signup(&signup_request("reader@example.com", "reader"))
        .unwrap();

    let (user, token) = auth
        .login(&login_request("reader@example.com", "password123"))
        .unwrap();
    assert_eq!(user.email, "reader@example.com");
    assert!(!token.is_empty());

    let claims = auth.authenticate(&token).unwrap();
    assert_eq!(claims.sub, user.id);
}

#[test]
fn login_failures_are_indistinguishable() {
    let db = test_db();
    let auth = auth_service(&db);

    auth.signup(&signup_request("reader@example.com", "reader"))
        .unwrap();

    let wrong_password = auth
        .login(&login_request("reader@example.com", "nope"))
        .unwrap_err();
    let unknown_email = auth
        .login(&login_request("nobody@example.com", "password123"))
        .unwrap_err();

    // Same kind, same message: a caller cannot probe which field was wrong.
    assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    assert!(matches!(wrong_password, AppError::NotFound(_)));
    assert!(matches!(unknown_email, AppError::NotFound(_)));
}

#[test]
fn signup_duplicate_email_rejected() {
    let db = test_db();
    let auth = auth_service(&db);

    auth.signup(&signup_request("reader@example.com", "reader"))
        .unwrap();

    let err = auth
        .signup(&signup_request("reader@example.com", "reader2"))
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(msg) if msg == "Email already exists"));
}

#[test]
fn signup_validates_shape_first() {
    let db = test_db();
    let auth = auth_service(&db);

    let mut req = signup_request("not-an-email", "reader");
    let err = auth.signup(&req).unwrap_err();
    assert!(matches!(err, AppError::Validation { field: "email", .. }));

    req.first_name = None;
    let err = auth.signup(&req).unwrap_err();
    assert!(matches!(
        err,
        AppError::Validation {
            field: "firstName",
            ..
        }
    ));
}

// ========== READ STATUS ==========

#[test]
fn toggle_creates_read_then_flips() {
    let db = test_db();
    let status = ReadStatusService::new(db.clone());
    let user = create_user(&db, "reader@example.com", "reader");
    let book = create_book(&db, "Dune", "Herbert", "Sci-Fi", 1965);

    let first = status.toggle(&toggle_request(&user, &book)).unwrap();
    assert_eq!(first.mark, ReadMark::Read);
    assert_eq!(first.user_id, user.id);
    assert_eq!(first.book_id, book.id);

    let second = status.toggle(&toggle_request(&user, &book)).unwrap();
    assert_eq!(second.mark, ReadMark::Unread);
    assert_eq!(second.mark, first.mark.flipped());
    assert_eq!(second.id, first.id, "toggle must reuse the same row");
}

#[test]
fn toggle_is_self_inverse() {
    let db = test_db();
    let status = ReadStatusService::new(db.clone());
    let user = create_user(&db, "reader@example.com", "reader");
    let book = create_book(&db, "Dune", "Herbert", "Sci-Fi", 1965);

    let start = status.toggle(&toggle_request(&user, &book)).unwrap();
    status.toggle(&toggle_request(&user, &book)).unwrap();
    let back = status.toggle(&toggle_request(&user, &book)).unwrap();
    assert_eq!(back.mark, start.mark);
}

#[test]
fn toggle_rejects_malformed_ids() {
    let db = test_db();
    let status = ReadStatusService::new(db);

    let req = ToggleRequest {
        customer_id: Some("invalidid".to_string()),
        book_id: Some(Uuid::new_v4().to_string()),
    };

    assert!(matches!(
        status.toggle(&req),
        Err(AppError::Validation {
            field: "customerId",
            ..
        })
    ));
}

#[test]
fn read_and_unread_are_disjoint() {
    let db = test_db();
    let status = ReadStatusService::new(db.clone());
    let user = create_user(&db, "reader@example.com", "reader");
    let read_book = create_book(&db, "Dune", "Herbert", "Sci-Fi", 1965);
    let unread_book = create_book(&db, "Emma", "Austen", "Romance", 1815);

    status.toggle(&toggle_request(&user, &read_book)).unwrap();
    status.toggle(&toggle_request(&user, &unread_book)).unwrap();
    status.toggle(&toggle_request(&user, &unread_book)).unwrap();

    let read = status.list_read(&status_params(&user)).unwrap();
    let unread = status.list_unread(&status_params(&user)).unwrap();

    let read_ids: Vec<_> = read.data.iter().map(|b| b.book.id.clone()).collect();
    let unread_ids: Vec<_> = unread.data.iter().map(|b| b.book.id.clone()).collect();

    assert_eq!(read_ids, vec![read_book.id]);
    assert_eq!(unread_ids, vec![unread_book.id]);
    assert!(read_ids.iter().all(|id| !unread_ids.contains(id)));

    assert!(read.data.iter().all(|b| b.read));
    assert!(unread.data.iter().all(|b| !b.read));
}

#[test]
fn status_listing_skips_dangling_books() {
    let db = test_db();
    let status = ReadStatusService::new(db.clone());
    let user = create_user(&db, "reader@example.com", "reader");

    // A mark whose book was never catalogued: counted, not listed.
    let ghost = sample_book("Ghost", "Nobody", "None", 2000);
    let req = ToggleRequest {
        customer_id: Some(user.id.clone()),
        book_id: Some(ghost.id.clone()),
    };
    status.toggle(&req).unwrap();

    let page = status.list_read(&status_params(&user)).unwrap();
    assert!(page.data.is_empty());
    assert_eq!(page.total_items, 1);
}

// ========== CATALOG ==========

#[test]
fn pagination_returns_the_second_slice() {
    let db = test_db();
    let tmp = tempfile::tempdir().unwrap();
    let catalog = catalog_service(&db, tmp.path());

    // Distinct created_at values pin the listing order.
    let mut expected = Vec::new();
    for i in 0..25 {
        let mut book = sample_book(&format!("Book {:02}", i), "Author", "Genre", 2000);
        book.created_at = 1_000 + i;
        db.insert_book(&book).unwrap();
        expected.push(book.id.clone());
    }

    let params = ListBooksParams {
        query: None,
        page: Some("2".to_string()),
        limit: Some("10".to_string()),
    };
    let page = catalog.list_books(&params, None).unwrap();

    let ids: Vec<_> = page.data.iter().map(|b| b.book.id.clone()).collect();
    assert_eq!(ids, expected[10..20].to_vec());
    assert_eq!(page.current_page, 2);
    assert_eq!(page.total_pages, 3);
}

#[test]
fn total_pages_rounds_up() {
    let db = test_db();
    let tmp = tempfile::tempdir().unwrap();
    let catalog = catalog_service(&db, tmp.path());

    for i in 0..3 {
        create_book(&db, &format!("Book {}", i), "Author", "Genre", 2000);
    }

    let params = ListBooksParams {
        query: None,
        page: None,
        limit: Some("2".to_string()),
    };
    let page = catalog.list_books(&params, None).unwrap();
    assert_eq!(page.total_pages, 2);
}

#[test]
fn search_matches_title_author_or_genre() {
    let db = test_db();
    let tmp = tempfile::tempdir().unwrap();
    let catalog = catalog_service(&db, tmp.path());

    create_book(&db, "Dune", "Herbert", "Sci-Fi", 1965);
    create_book(&db, "Emma", "Austen", "Romance", 1815);
    create_book(&db, "Herbal Remedies", "Green", "Health", 1999);

    let search = |q: &str| {
        let params = ListBooksParams {
            query: Some(q.to_string()),
            page: None,
            limit: None,
        };
        catalog.list_books(&params, None).unwrap().data
    };

    assert_eq!(search("dune").len(), 1);
    // "herb" matches the author Herbert and the title Herbal Remedies.
    assert_eq!(search("herb").len(), 2);
    assert_eq!(search("romance").len(), 1);
    assert_eq!(search("nothing-here").len(), 0);
}

#[test]
fn genre_search_is_case_insensitive_substring() {
    let db = test_db();
    let tmp = tempfile::tempdir().unwrap();
    let catalog = catalog_service(&db, tmp.path());

    create_book(&db, "Dune", "Herbert", "Science Fiction", 1965);
    create_book(&db, "Emma", "Austen", "Romance", 1815);

    let by_genre = |genre: &str| {
        catalog
            .list_books_by_genre(genre, &PageParams::default())
            .unwrap()
    };

    assert_eq!(by_genre("fiction").data.len(), 1);
    assert_eq!(by_genre("SCIENCE").data.len(), 1);
    assert_eq!(by_genre("science fiction").total_books, 1);
    assert_eq!(by_genre("western").data.len(), 0);
}

#[test]
fn genres_are_deduplicated() {
    let db = test_db();
    let tmp = tempfile::tempdir().unwrap();
    let catalog = catalog_service(&db, tmp.path());

    create_book(&db, "Dune", "Herbert", "Sci-Fi", 1965);
    create_book(&db, "Foundation", "Asimov", "Sci-Fi", 1951);
    create_book(&db, "Emma", "Austen", "Romance", 1815);

    let mut genres = catalog.list_genres().unwrap();
    genres.sort();
    assert_eq!(genres, vec!["Romance".to_string(), "Sci-Fi".to_string()]);
}

#[test]
fn read_flag_is_scoped_to_the_viewer() {
    let db = test_db();
    let tmp = tempfile::tempdir().unwrap();
    let catalog = catalog_service(&db, tmp.path());
    let status = ReadStatusService::new(db.clone());

    let alice = create_user(&db, "alice@example.com", "alice");
    let bob = create_user(&db, "bob@example.com", "bob");
    let book = create_book(&db, "Dune", "Herbert", "Sci-Fi", 1965);

    status.toggle(&toggle_request(&alice, &book)).unwrap();

    let params = ListBooksParams::default();

    let for_alice = catalog.list_books(&params, Some(alice.id.as_str())).unwrap();
    assert!(for_alice.data[0].read);

    let for_bob = catalog.list_books(&params, Some(bob.id.as_str())).unwrap();
    assert!(!for_bob.data[0].read);

    let anonymous = catalog.list_books(&params, None).unwrap();
    assert!(!anonymous.data[0].read);
}

#[test]
fn book_details_rejects_malformed_and_non_canonical_ids() {
    let db = test_db();
    let tmp = tempfile::tempdir().unwrap();
    let catalog = catalog_service(&db, tmp.path());
    let book = create_book(&db, "Dune", "Herbert", "Sci-Fi", 1965);

    assert!(matches!(
        catalog.book_details("invalidid"),
        Err(AppError::Validation { field: "id", .. })
    ));

    // Parser-accepted but non-canonical spelling of a real id.
    assert!(matches!(
        catalog.book_details(&book.id.to_uppercase()),
        Err(AppError::Validation { field: "id", .. })
    ));

    let found = catalog.book_details(&book.id).unwrap();
    assert_eq!(found.title, "Dune");
}

#[test]
fn book_details_not_found() {
    let db = test_db();
    let tmp = tempfile::tempdir().unwrap();
    let catalog = catalog_service(&db, tmp.path());

    let missing = Uuid::new_v4().to_string();
    assert!(matches!(
        catalog.book_details(&missing),
        Err(AppError::NotFound(_))
    ));
}

// ========== ADD BOOK ==========

fn new_book_request(year: &str) -> NewBookRequest {
    NewBookRequest {
        title: Some("Dune".to_string()),
        author: Some("Herbert".to_string()),
        genre: Some("Sci-Fi".to_string()),
        publication_year: Some(year.to_string()),
    }
}

fn png_cover() -> CoverUpload {
    CoverUpload {
        file_name: "dune.png".to_string(),
        bytes: PNG_BYTES.to_vec(),
    }
}

#[tokio::test]
async fn add_book_uploads_cover_and_persists() {
    let db = test_db();
    let tmp = tempfile::tempdir().unwrap();
    let catalog = catalog_service(&db, tmp.path());

    let book = catalog
        .add_book(&new_book_request("1965"), Some(png_cover()))
        .await
        .unwrap();

    assert_eq!(book.title, "Dune");
    assert_eq!(book.publication_year, 1965);

    let url = book.cover_image.as_deref().unwrap();
    assert!(url.contains("covers/"));
    assert!(url.ends_with("_dune.png"));

    // The blob landed under the store root and the book is queryable.
    let stored: Vec<_> = std::fs::read_dir(tmp.path().join("covers"))
        .unwrap()
        .collect();
    assert_eq!(stored.len(), 1);
    assert!(db.get_book(&book.id).unwrap().is_some());
}

#[tokio::test]
async fn add_book_rejects_future_year_before_upload() {
    let db = test_db();
    let tmp = tempfile::tempdir().unwrap();
    let catalog = catalog_service(&db, tmp.path());

    let err = catalog
        .add_book(&new_book_request("3000"), Some(png_cover()))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AppError::Validation {
            field: "publicationYear",
            ..
        }
    ));

    // Validation failed, so nothing was uploaded.
    assert!(!tmp.path().join("covers").exists());
    assert_eq!(db.count_books(None).unwrap(), 0);
}

#[tokio::test]
async fn add_book_requires_a_cover_image() {
    let db = test_db();
    let tmp = tempfile::tempdir().unwrap();
    let catalog = catalog_service(&db, tmp.path());

    let err = catalog
        .add_book(&new_book_request("1965"), None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AppError::Validation {
            field: "coverImage",
            ..
        }
    ));
}

#[tokio::test]
async fn add_book_rejects_non_image_payload() {
    let db = test_db();
    let tmp = tempfile::tempdir().unwrap();
    let catalog = catalog_service(&db, tmp.path());

    let cover = CoverUpload {
        file_name: "notes.txt".to_string(),
        bytes: b"plain text".to_vec(),
    };

    let err = catalog
        .add_book(&new_book_request("1965"), Some(cover))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AppError::Validation {
            field: "coverImage",
            ..
        }
    ));
    assert!(!tmp.path().join("covers").exists());
}
