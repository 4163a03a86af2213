use super::*;
use crate::storage::{ACCESS_TOKEN_KEY, TokenStore};
use crate::test_helpers::{FakeBackend, api_client};
use serde_json::json;

#[tokio::test]
async fn list_books_sends_default_paging() {
    let backend = FakeBackend::start().await;
    backend.reply_json("GET", "/books", 200, json!({ "content": [], "totalPages": 0 }));
    let (api, _store) = api_client(&backend);

    let page = api.list_books(&BookQuery::default()).await.unwrap();
    assert_eq!(page["totalPages"], 0);

    let sent = backend.requests_to("GET", "/books");
    assert_eq!(sent[0].query.as_deref(), Some("page=0&size=12&sortBy=createdAt&sortDir=desc"));
}

#[tokio::test]
async fn search_skips_empty_filters() {
    let backend = FakeBackend::start().await;
    backend.reply_json("GET", "/books/search", 200, json!([]));
    let (api, _store) = api_client(&backend);

    let search = BookSearch { title: Some("Dune".to_owned()), author: Some("  ".to_owned()), genre: None };
    api.search_books(&search).await.unwrap();

    assert_eq!(backend.requests_to("GET", "/books/search")[0].query.as_deref(), Some("title=Dune"));
}

#[tokio::test]
async fn top_rated_passes_limit() {
    let backend = FakeBackend::start().await;
    backend.reply_json("GET", "/books/top-rated", 200, json!([]));
    let (api, _store) = api_client(&backend);

    api.top_rated_books(5).await.unwrap();
    assert_eq!(backend.requests_to("GET", "/books/top-rated")[0].query.as_deref(), Some("limit=5"));
}

#[tokio::test]
async fn create_review_posts_payload_verbatim_with_bearer() {
    let backend = FakeBackend::start().await;
    backend.reply_json("POST", "/reviews", 200, json!({ "id": 11 }));
    let (api, store) = api_client(&backend);
    store.set(ACCESS_TOKEN_KEY, "T1").unwrap();

    let review = json!({ "bookId": 3, "rating": 4, "comment": "Solid" });
    let created = api.create_review(&review).await.unwrap();
    assert_eq!(created["id"], 11);

    let sent = &backend.requests_to("POST", "/reviews")[0];
    assert_eq!(sent.json(), review);
    assert_eq!(sent.authorization.as_deref(), Some("Bearer T1"));
}

#[tokio::test]
async fn admin_role_update_sends_uppercase_role() {
    let backend = FakeBackend::start().await;
    backend.reply_text("PUT", "/admin/users/8/role", 200, "User role updated successfully");
    let (api, _store) = api_client(&backend);

    let msg = api.update_user_role(8, Role::Admin).await.unwrap();
    assert_eq!(msg, "User role updated successfully");
    assert_eq!(backend.requests_to("PUT", "/admin/users/8/role")[0].json(), json!({ "role": "ADMIN" }));
}

#[tokio::test]
async fn ban_and_delete_return_server_text() {
    let backend = FakeBackend::start().await;
    backend.reply_text("PUT", "/admin/users/2/ban", 200, "User banned successfully");
    backend.reply_text("DELETE", "/admin/users/2", 200, "User deleted successfully");
    let (api, _store) = api_client(&backend);

    assert_eq!(api.ban_user(2).await.unwrap(), "User banned successfully");
    assert_eq!(api.delete_user(2).await.unwrap(), "User deleted successfully");
}

#[tokio::test]
async fn peripheral_401_still_signals_session_layer() {
    let backend = FakeBackend::start().await;
    backend.reply_text("GET", "/admin/users", 401, "");
    let (api, _store) = api_client(&backend);
    let mut signals = api.subscribe();
    api.set_current_path("/admin");

    assert!(api.admin_users().await.is_err());
    assert!(signals.try_recv().is_ok());
}

#[tokio::test]
async fn book_create_update_delete_and_simple_listing() {
    let backend = FakeBackend::start().await;
    backend.reply_json("POST", "/books", 200, json!({ "id": 21, "title": "Dune" }));
    backend.reply_json("PUT", "/books/21", 200, json!({ "id": 21, "title": "Dune Messiah" }));
    backend.reply_text("DELETE", "/books/21", 200, "");
    backend.reply_json("GET", "/books/simple", 200, json!([{ "id": 21 }]));
    let (api, _store) = api_client(&backend);

    let draft = json!({ "title": "Dune", "author": "Frank Herbert" });
    assert_eq!(api.create_book(&draft).await.unwrap()["id"], 21);
    let edit = json!({ "id": 21, "title": "Dune Messiah" });
    assert_eq!(api.update_book(21, &edit).await.unwrap()["title"], "Dune Messiah");
    api.delete_book(21).await.unwrap();
    assert_eq!(api.books_simple().await.unwrap(), json!([{ "id": 21 }]));

    assert_eq!(backend.requests_to("POST", "/books")[0].json(), draft);
    assert_eq!(backend.requests_to("PUT", "/books/21")[0].json(), edit);
    assert_eq!(backend.requests_to("DELETE", "/books/21").len(), 1);
}

#[tokio::test]
async fn all_reviews_and_review_update() {
    let backend = FakeBackend::start().await;
    backend.reply_json("GET", "/reviews", 200, json!([{ "id": 4 }]));
    backend.reply_json("PUT", "/reviews/4", 200, json!({ "id": 4, "rating": 5 }));
    let (api, _store) = api_client(&backend);

    assert_eq!(api.all_reviews().await.unwrap(), json!([{ "id": 4 }]));
    let edit = json!({ "rating": 5, "comment": "Better on reread" });
    assert_eq!(api.update_review(4, &edit).await.unwrap()["rating"], 5);
    assert_eq!(backend.requests_to("PUT", "/reviews/4")[0].json(), edit);
}

#[tokio::test]
async fn user_search_encodes_query() {
    let backend = FakeBackend::start().await;
    backend.reply_json("GET", "/admin/users/search", 200, json!([]));
    backend.reply_json("GET", "/admin/users/8/details", 200, json!({ "id": 8, "reviewCount": 3 }));
    let (api, _store) = api_client(&backend);

    api.search_users("ann & bob").await.unwrap();
    assert_eq!(backend.requests_to("GET", "/admin/users/search")[0].query.as_deref(), Some("query=ann+%26+bob"));
    assert_eq!(api.user_details(8).await.unwrap()["reviewCount"], 3);
}
