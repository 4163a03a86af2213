//! Book, review and admin endpoint bindings.
//!
//! Payload schemas belong to the backend, so these helpers pass
//! `serde_json::Value` through untouched. They exist so peripheral views
//! reach the backend through the same interceptors as the session layer.

#[cfg(test)]
#[path = "catalog_test.rs"]
mod catalog_test;

use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

use super::api::ApiClient;
use super::error::ApiError;
use super::types::Role;

/// Paging and ordering for `GET /books`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookQuery {
    pub page: u32,
    pub size: u32,
    pub sort_by: String,
    pub sort_dir: String,
}

impl Default for BookQuery {
    fn default() -> Self {
        Self { page: 0, size: 12, sort_by: "createdAt".to_owned(), sort_dir: "desc".to_owned() }
    }
}

/// Filters for `GET /books/search`. Empty filters are not sent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BookSearch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
}

impl BookSearch {
    fn non_empty(&self) -> Self {
        let keep = |v: &Option<String>| v.clone().filter(|s| !s.trim().is_empty());
        Self { title: keep(&self.title), author: keep(&self.author), genre: keep(&self.genre) }
    }
}

impl ApiClient {
    // =========================================================================
    // BOOKS
    // =========================================================================

    /// # Errors
    ///
    /// Returns the normalized [`ApiError`] from the interceptor.
    pub async fn list_books(&self, query: &BookQuery) -> Result<Value, ApiError> {
        self.get_json_with_query("/books", query).await
    }

    /// Unpaged listing of every book.
    ///
    /// # Errors
    ///
    /// Returns the normalized [`ApiError`] from the interceptor.
    pub async fn books_simple(&self) -> Result<Value, ApiError> {
        self.get_json("/books/simple").await
    }

    /// # Errors
    ///
    /// Returns the normalized [`ApiError`] from the interceptor.
    pub async fn book(&self, id: i64) -> Result<Value, ApiError> {
        self.get_json(&format!("/books/{id}")).await
    }

    /// # Errors
    ///
    /// Returns the normalized [`ApiError`] from the interceptor.
    pub async fn create_book(&self, book: &Value) -> Result<Value, ApiError> {
        self.post_json("/books", book).await
    }

    /// # Errors
    ///
    /// Returns the normalized [`ApiError`] from the interceptor.
    pub async fn update_book(&self, id: i64, book: &Value) -> Result<Value, ApiError> {
        self.put_json(&format!("/books/{id}"), book).await
    }

    /// The backend answers with an empty body.
    ///
    /// # Errors
    ///
    /// Returns the normalized [`ApiError`] from the interceptor.
    pub async fn delete_book(&self, id: i64) -> Result<(), ApiError> {
        self.delete(&format!("/books/{id}")).await.map(|_| ())
    }

    /// # Errors
    ///
    /// Returns the normalized [`ApiError`] from the interceptor.
    pub async fn search_books(&self, search: &BookSearch) -> Result<Value, ApiError> {
        self.get_json_with_query("/books/search", &search.non_empty()).await
    }

    /// # Errors
    ///
    /// Returns the normalized [`ApiError`] from the interceptor.
    pub async fn top_rated_books(&self, limit: u32) -> Result<Value, ApiError> {
        self.get_json_with_query("/books/top-rated", &[("limit", limit)]).await
    }

    /// # Errors
    ///
    /// Returns the normalized [`ApiError`] from the interceptor.
    pub async fn genres(&self) -> Result<Value, ApiError> {
        self.get_json("/books/genres").await
    }

    // =========================================================================
    // REVIEWS
    // =========================================================================

    /// # Errors
    ///
    /// Returns the normalized [`ApiError`] from the interceptor.
    pub async fn all_reviews(&self) -> Result<Value, ApiError> {
        self.get_json("/reviews").await
    }

    /// # Errors
    ///
    /// Returns the normalized [`ApiError`] from the interceptor.
    pub async fn reviews_for_book(&self, book_id: i64) -> Result<Value, ApiError> {
        self.get_json(&format!("/reviews/book/{book_id}")).await
    }

    /// # Errors
    ///
    /// Returns the normalized [`ApiError`] from the interceptor.
    pub async fn create_review(&self, review: &Value) -> Result<Value, ApiError> {
        self.post_json("/reviews", review).await
    }

    /// # Errors
    ///
    /// Returns the normalized [`ApiError`] from the interceptor.
    pub async fn update_review(&self, id: i64, review: &Value) -> Result<Value, ApiError> {
        self.put_json(&format!("/reviews/{id}"), review).await
    }

    /// # Errors
    ///
    /// Returns the normalized [`ApiError`] from the interceptor.
    pub async fn delete_review(&self, id: i64) -> Result<String, ApiError> {
        self.delete(&format!("/reviews/{id}")).await
    }

    // =========================================================================
    // ADMIN
    // =========================================================================

    /// # Errors
    ///
    /// Returns the normalized [`ApiError`] from the interceptor.
    pub async fn admin_users(&self) -> Result<Value, ApiError> {
        self.get_json("/admin/users").await
    }

    /// # Errors
    ///
    /// Returns the normalized [`ApiError`] from the interceptor.
    pub async fn search_users(&self, query: &str) -> Result<Value, ApiError> {
        self.get_json_with_query("/admin/users/search", &[("query", query)]).await
    }

    /// # Errors
    ///
    /// Returns the normalized [`ApiError`] from the interceptor.
    pub async fn user_details(&self, user_id: i64) -> Result<Value, ApiError> {
        self.get_json(&format!("/admin/users/{user_id}/details")).await
    }

    /// # Errors
    ///
    /// Returns the normalized [`ApiError`] from the interceptor.
    pub async fn admin_stats(&self) -> Result<Value, ApiError> {
        self.get_json("/admin/stats").await
    }

    /// # Errors
    ///
    /// Returns the normalized [`ApiError`] from the interceptor.
    pub async fn ban_user(&self, user_id: i64) -> Result<String, ApiError> {
        self.send_text(Method::PUT, &format!("/admin/users/{user_id}/ban"), None::<&()>).await
    }

    /// # Errors
    ///
    /// Returns the normalized [`ApiError`] from the interceptor.
    pub async fn unban_user(&self, user_id: i64) -> Result<String, ApiError> {
        self.send_text(Method::PUT, &format!("/admin/users/{user_id}/unban"), None::<&()>).await
    }

    /// # Errors
    ///
    /// Returns the normalized [`ApiError`] from the interceptor.
    pub async fn delete_user(&self, user_id: i64) -> Result<String, ApiError> {
        self.delete(&format!("/admin/users/{user_id}")).await
    }

    /// # Errors
    ///
    /// Returns the normalized [`ApiError`] from the interceptor.
    pub async fn update_user_role(&self, user_id: i64, role: Role) -> Result<String, ApiError> {
        let body = serde_json::json!({ "role": role });
        self.send_text(Method::PUT, &format!("/admin/users/{user_id}/role"), Some(&body)).await
    }
}
