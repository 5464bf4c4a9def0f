use trainlog::error::{AppError, ErrorKind};

#[test]
fn test_not_found_kind() {
    let error = AppError::NotFound("Template not found".to_string());

    assert_eq!(error.kind(), ErrorKind::NotFound);
    assert_eq!(error.user_message(), "Template not found");
}

#[test]
fn test_conflict_kind() {
    let error = AppError::Conflict("A session is already running".to_string());

    assert_eq!(error.kind(), ErrorKind::Conflict);
    assert_eq!(error.user_message(), "A session is already running");
}

#[test]
fn test_validation_kind() {
    let error = AppError::Validation("Weight is required".to_string());

    assert_eq!(error.kind(), ErrorKind::Validation);
}

#[test]
fn test_forbidden_and_unauthorized_kinds() {
    assert_eq!(
        AppError::Forbidden("Admins only".to_string()).kind(),
        ErrorKind::Forbidden
    );
    assert_eq!(AppError::Unauthorized.kind(), ErrorKind::Unauthorized);
    assert_eq!(AppError::Unauthorized.user_message(), "Unauthorized");
}

#[test]
fn test_internal_is_storage_with_generic_message() {
    let error = AppError::Internal("connection reset".to_string());

    assert_eq!(error.kind(), ErrorKind::Storage);
    assert_eq!(error.user_message(), "Internal error");
}

#[test]
fn test_database_error_hides_details() {
    let error = AppError::from(rusqlite::Error::QueryReturnedNoRows);

    assert_eq!(error.kind(), ErrorKind::Storage);
    assert_eq!(error.user_message(), "Storage error");
}

#[test]
fn test_serialization_error_is_storage() {
    let json_error = serde_json::from_str::<u32>("not json").unwrap_err();
    let error = AppError::from(json_error);

    assert_eq!(error.kind(), ErrorKind::Storage);
    assert_eq!(error.user_message(), "Storage error");
}
