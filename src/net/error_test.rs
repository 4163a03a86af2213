use super::*;

// =============================================================================
// from_status
// =============================================================================

#[test]
fn server_errors_get_generic_annotation() {
    let err = ApiError::from_status(500, "Login failed: NullPointerException");
    assert_eq!(err.to_string(), SERVER_ERROR_MESSAGE);
    assert_eq!(err.status(), Some(500));
    assert_eq!(err.server_message(), Some("Login failed: NullPointerException"));

    let err = ApiError::from_status(503, "");
    assert!(matches!(err, ApiError::Server { status: 503, .. }));
    assert_eq!(err.server_message(), None);
}

#[test]
fn forbidden_gets_access_denied_annotation() {
    let err = ApiError::from_status(403, "Account is banned");
    assert_eq!(err.to_string(), ACCESS_DENIED_MESSAGE);
    assert_eq!(err.status(), Some(403));
    assert_eq!(err.server_message(), Some("Account is banned"));
}

#[test]
fn client_errors_pass_server_message_through() {
    let err = ApiError::from_status(409, "username already exists");
    assert_eq!(err.to_string(), "username already exists");
    assert!(matches!(err, ApiError::Rejected { status: 409, .. }));
}

#[test]
fn unauthorized_keeps_message() {
    let err = ApiError::from_status(401, "Invalid email/username or password");
    assert!(matches!(err, ApiError::Unauthorized { status: 401, .. }));
    assert_eq!(err.to_string(), "Invalid email/username or password");
}

#[test]
fn empty_body_falls_back_to_status_text() {
    let err = ApiError::from_status(404, "   ");
    assert_eq!(err.to_string(), "request failed with status 404");
    assert_eq!(err.server_message(), None);
}

#[test]
fn non_http_errors_have_no_status() {
    assert_eq!(ApiError::Timeout.status(), None);
    assert_eq!(ApiError::Timeout.to_string(), TIMEOUT_MESSAGE);
    assert!(!ApiError::Timeout.is_transport());
    assert_eq!(ApiError::Decode("eof".to_owned()).server_message(), None);
}

// =============================================================================
// extract_message
// =============================================================================

#[test]
fn extract_message_plain_text() {
    assert_eq!(extract_message("  Email already exists\n"), "Email already exists");
}

#[test]
fn extract_message_json_string() {
    assert_eq!(extract_message("\"Password is required\""), "Password is required");
}

#[test]
fn extract_message_json_object_prefers_message() {
    let body = r#"{"timestamp":"2024-01-01","status":400,"error":"Bad Request","message":"Title is required"}"#;
    assert_eq!(extract_message(body), "Title is required");
}

#[test]
fn extract_message_json_object_falls_back_to_error() {
    let body = r#"{"status":404,"error":"Not Found","message":""}"#;
    assert_eq!(extract_message(body), "Not Found");
}

#[test]
fn extract_message_json_object_without_text_keeps_raw() {
    let body = r#"{"status":418}"#;
    assert_eq!(extract_message(body), body);
}
