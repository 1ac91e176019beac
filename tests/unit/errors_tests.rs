/*!
 * Tests for error types and conversions
 */

use scenebreak::errors::{AppError, BreakdownError, ProviderError};

#[test]
fn test_providerError_apiError_shouldDisplayStatusAndMessage() {
    let error = ProviderError::ApiError {
        status_code: 500,
        message: "Internal error".to_string(),
    };
    let display = format!("{}", error);
    assert!(display.contains("500"));
    assert!(display.contains("Internal error"));
}

#[test]
fn test_breakdownError_fromProviderError_shouldWrapAsOracleCall() {
    let provider_error = ProviderError::RateLimitExceeded("Retry after 30s".to_string());
    let breakdown_error: BreakdownError = provider_error.into();
    assert!(matches!(breakdown_error, BreakdownError::OracleCall(ProviderError::RateLimitExceeded(_))));
    assert!(breakdown_error.is_retryable());
    assert!(format!("{}", breakdown_error).contains("Retry after 30s"));
}

#[test]
fn test_breakdownError_notAScript_shouldDisplayReason() {
    let error = BreakdownError::NotAScript("looks like a novel".to_string());
    let display = format!("{}", error);
    assert!(display.contains("does not look like a script"));
    assert!(display.contains("looks like a novel"));
}

#[test]
fn test_appError_fromProviderError_shouldWrapCorrectly() {
    let provider_error = ProviderError::ConnectionError("Network down".to_string());
    let app_error: AppError = provider_error.into();
    let display = format!("{}", app_error);
    assert!(display.contains("Provider error"));
    assert!(display.contains("Network down"));
}

#[test]
fn test_appError_fromBreakdownError_shouldWrapCorrectly() {
    let app_error: AppError = BreakdownError::InputEmpty.into();
    assert!(matches!(app_error, AppError::Breakdown(BreakdownError::InputEmpty)));
    assert!(format!("{}", app_error).contains("Breakdown error"));
}

#[test]
fn test_appError_fromIoError_shouldWrapAsFileError() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
    let app_error: AppError = io_error.into();
    let display = format!("{}", app_error);
    assert!(display.contains("File error"));
    assert!(display.contains("File not found"));
}

#[test]
fn test_appError_fromAnyhow_shouldWrapAsUnknown() {
    let app_error: AppError = anyhow::anyhow!("something odd").into();
    assert!(matches!(app_error, AppError::Unknown(ref message) if message == "something odd"));
}
