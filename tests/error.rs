use std::path::PathBuf;

use serde_json::Value;
use tally::error::{exit_codes, Error, JsonError};

#[test]
fn validation_errors_map_to_400() {
    for err in [
        Error::MissingField("eid".to_string()),
        Error::InvalidApproval("rejected".to_string()),
        Error::InvalidCredentials,
        Error::AlreadyExists("user 'E1'".to_string()),
    ] {
        assert_eq!(err.exit_code(), exit_codes::VALIDATION);
        assert_eq!(err.http_status(), 400);
    }
}

#[test]
fn not_found_maps_to_404() {
    let err = Error::not_found("task", "01ABC");
    assert_eq!(err.exit_code(), exit_codes::NOT_FOUND);
    assert_eq!(err.http_status(), 404);
    let details = err.details().expect("details");
    assert_eq!(details["kind"], Value::String("task".to_string()));
    assert_eq!(details["id"], Value::String("01ABC".to_string()));
}

#[test]
fn internal_failures_hide_details() {
    let err = Error::LockFailed(PathBuf::from("/data/tasks.lock"));
    assert_eq!(err.exit_code(), exit_codes::OPERATION_FAILED);
    assert_eq!(err.http_status(), 500);
    assert_eq!(err.public_message(), "Internal server error");

    let conflict = Error::Conflict("assigned task E1::6::2024 already exists".to_string());
    assert_eq!(conflict.http_status(), 500);
}

#[test]
fn json_error_includes_details() {
    let err = Error::invalid("date", "'2024-6-1' is not YYYY-MM-DD");
    let json = JsonError::from(&err);
    assert_eq!(json.code, exit_codes::VALIDATION);
    assert_eq!(json.status, 400);
    let details = json.details.expect("details");
    assert_eq!(details["field"], Value::String("date".to_string()));
}
