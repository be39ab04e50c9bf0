use super::*;

#[test]
fn exit_code_mapping() {
    assert_eq!(AppError::invalid_credentials().exit_code(), 2);
    assert_eq!(AppError::session_expired().exit_code(), 3);
    assert_eq!(AppError::session_invalid().exit_code(), 3);
    assert_eq!(AppError::access_denied().exit_code(), 4);
    assert_eq!(AppError::validation("email_taken", "dup").exit_code(), 5);
    assert_eq!(AppError::store("store_error", "io").exit_code(), 6);
}

#[test]
fn invalid_credentials_never_names_the_field() {
    let e = AppError::invalid_credentials();
    assert_eq!(e.code_str(), "invalid_credentials");
    assert_eq!(e.message(), INVALID_CREDENTIALS_MSG);
    let lower = e.message().to_lowercase();
    assert!(lower.contains("username or password"));
}

#[test]
fn display_is_code_then_message() {
    let e = AppError::validation("end_before_start", "End date must be after start date.");
    assert_eq!(e.to_string(), "end_before_start: End date must be after start date.");
}

#[test]
fn store_conflict_becomes_validation() {
    let e: AppError = StoreError::Conflict { kind: "user", field: "email".into() }.into();
    assert!(e.is_validation());
    assert_eq!(e.code_str(), "email_taken");
}

#[test]
fn store_io_is_opaque() {
    let e: AppError = StoreError::Io(std::io::Error::new(std::io::ErrorKind::Other, "/secret/path denied")).into();
    assert_eq!(e.code_str(), "store_error");
    assert!(!e.message().contains("/secret/path"));
}

#[test]
fn serializes_with_type_tag() {
    let v = serde_json::to_value(AppError::access_denied()).unwrap();
    assert_eq!(v["type"], "authorization");
    assert_eq!(v["code"], "access_denied");
}
