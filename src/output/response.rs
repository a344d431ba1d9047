//! JSON envelope printed on stdout, and the exit code for each error class.

use kickoff::error::Hint;
use kickoff::{Error, ErrorCode, Result};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct CliResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CliError>,
}

#[derive(Debug, Serialize)]
pub struct CliError {
    pub code: &'static str,
    pub message: String,
    pub details: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<Hint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

impl From<&Error> for CliError {
    fn from(err: &Error) -> Self {
        Self {
            code: err.code.as_str(),
            message: err.message.clone(),
            details: err.details.clone(),
            hints: err.hints.clone(),
            retryable: err.retryable,
        }
    }
}

impl CliResponse {
    pub fn from_result(result: &Result<Value>) -> Self {
        match result {
            Ok(data) => Self {
                success: true,
                data: Some(data.clone()),
                error: None,
            },
            Err(err) => Self {
                success: false,
                data: None,
                error: Some(err.into()),
            },
        }
    }
}

/// Serialize a handler result; errors carry their exit code.
pub fn map_cmd_result_to_json<T: Serialize>(result: Result<(T, i32)>) -> (Result<Value>, i32) {
    let (data, exit_code) = match result {
        Ok(ok) => ok,
        Err(err) => {
            let exit_code = exit_code_for_error(err.code);
            return (Err(err), exit_code);
        }
    };

    match serde_json::to_value(data) {
        Ok(value) => (Ok(value), exit_code),
        Err(err) => (
            Err(Error::internal_json(
                err.to_string(),
                Some("serialize response".to_string()),
            )),
            1,
        ),
    }
}

fn exit_code_for_error(code: ErrorCode) -> i32 {
    match code {
        ErrorCode::ConfigInvalidJson
        | ErrorCode::ConfigInvalidValue
        | ErrorCode::ConfigConflict
        | ErrorCode::ValidationMissingArgument
        | ErrorCode::ValidationInvalidArgument => 2,

        ErrorCode::PreconditionViolation => 3,
        ErrorCode::DriftConflict => 5,
        ErrorCode::UserAbort => 6,

        ErrorCode::StepFailed => 20,
        ErrorCode::RemoteCommandFailed => 21,

        ErrorCode::InternalIoError
        | ErrorCode::InternalJsonError
        | ErrorCode::InternalUnexpected => 1,
    }
}

pub fn print_json_result(result: Result<Value>) -> Result<()> {
    use std::io::{self, Write};

    let payload = serde_json::to_string_pretty(&CliResponse::from_result(&result))
        .map_err(|e| Error::internal_json(e.to_string(), Some("serialize response".to_string())))?;

    match writeln!(io::stdout().lock(), "{}", payload) {
        Ok(()) => Ok(()),
        // Reader went away (e.g. `| head`)
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        Err(e) => Err(Error::internal_io(
            e.to_string(),
            Some("write stdout".to_string()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_map_to_distinct_exit_codes() {
        let (_, code) = map_cmd_result_to_json::<()>(Err(Error::precondition_violation(
            "tier",
            "Not a dev directory",
        )));
        assert_eq!(code, 3);

        let (_, code) = map_cmd_result_to_json::<()>(Err(Error::user_abort("no")));
        assert_eq!(code, 6);
    }

    #[test]
    fn success_keeps_handler_exit_code() {
        let (value, code) = map_cmd_result_to_json(Ok((vec!["a"], 0)));
        assert_eq!(value.unwrap(), serde_json::json!(["a"]));
        assert_eq!(code, 0);
    }

    #[test]
    fn error_envelope_carries_code_and_hints() {
        let err = Error::user_abort("Declined").with_hint("Run go-live again");
        let json = serde_json::to_value(CliResponse::from_result(&Err(err))).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], "user.abort");
        assert_eq!(json["error"]["hints"][0]["message"], "Run go-live again");
        assert!(json.get("data").is_none());
    }
}
