//! Tests for error types

use trueno_ab::Error;

#[test]
fn test_validation_error() {
    let error = Error::validation("User ID must be at least 3 characters.");
    let error_str = format!("{error}");
    assert!(error_str.contains("Validation error"));
    assert!(error_str.contains("at least 3 characters"));
    assert!(!error.is_conflict());
}

#[test]
fn test_precondition_error() {
    let error = Error::Precondition("An experiment must have at least 2 variants.".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Precondition failed"));
    assert!(error_str.contains("at least 2 variants"));
}

#[test]
fn test_conflict_error() {
    let error = Error::Conflict {
        experiment_id: "exp-1".to_string(),
        user_id: "user-1".to_string(),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("exp-1"));
    assert!(error_str.contains("user-1"));
    assert!(error.is_conflict());
}

#[test]
fn test_persistence_error() {
    let error = Error::persistence("database is locked");
    let error_str = format!("{error}");
    assert!(error_str.contains("Persistence error"));
    assert!(error_str.contains("database is locked"));
}

#[test]
fn test_serialization_error_conversion() {
    let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let error: Error = json_err.into();
    assert!(matches!(error, Error::Serialization(_)));
    assert!(format!("{error}").contains("Serialization error"));
}

#[test]
fn test_error_debug() {
    let error = Error::validation("debug test");
    let debug_str = format!("{error:?}");
    assert!(debug_str.contains("Validation"));
}
