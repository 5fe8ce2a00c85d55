//! RFC 5730 result codes.
//!
//! A [`ResultCode`] wraps the four-digit numeric code carried in
//! `<result code="…">`. Classification (success, error, session-ending) is
//! computed from the numeric bands, never from membership lists:
//!
//! - `1xxx`: command completed (success)
//! - `2xxx`: command failed (error)
//! - `1500` and `25xx`: the session ends after the response is sent

use std::fmt;

/// A four-digit EPP result code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResultCode(pub u16);

impl ResultCode {
    pub const OK: ResultCode = ResultCode(1000);
    pub const OK_ACTION_PENDING: ResultCode = ResultCode(1001);
    pub const OK_NO_MESSAGES: ResultCode = ResultCode(1300);
    pub const OK_MESSAGE_PRESENT: ResultCode = ResultCode(1301);
    pub const OK_BYE: ResultCode = ResultCode(1500);

    pub const UNKNOWN_COMMAND: ResultCode = ResultCode(2000);
    pub const SYNTAX_ERROR: ResultCode = ResultCode(2001);
    pub const USE_ERROR: ResultCode = ResultCode(2002);
    pub const MISSING_PARAMETER: ResultCode = ResultCode(2003);
    pub const PARAMETER_RANGE_ERROR: ResultCode = ResultCode(2004);
    pub const PARAMETER_SYNTAX_ERROR: ResultCode = ResultCode(2005);

    pub const UNIMPLEMENTED_VERSION: ResultCode = ResultCode(2100);
    pub const UNIMPLEMENTED_COMMAND: ResultCode = ResultCode(2101);
    pub const UNIMPLEMENTED_OPTION: ResultCode = ResultCode(2102);
    pub const UNIMPLEMENTED_EXTENSION: ResultCode = ResultCode(2103);
    pub const BILLING_FAILURE: ResultCode = ResultCode(2104);
    pub const NOT_RENEWABLE: ResultCode = ResultCode(2105);
    pub const NOT_TRANSFERRABLE: ResultCode = ResultCode(2106);

    pub const AUTHENTICATION_ERROR: ResultCode = ResultCode(2200);
    pub const AUTHORIZATION_ERROR: ResultCode = ResultCode(2201);
    pub const INVALID_AUTH_INFO: ResultCode = ResultCode(2202);

    pub const OBJECT_PENDING_TRANSFER: ResultCode = ResultCode(2300);
    pub const OBJECT_NOT_PENDING_TRANSFER: ResultCode = ResultCode(2301);
    pub const OBJECT_EXISTS: ResultCode = ResultCode(2302);
    pub const OBJECT_DOES_NOT_EXIST: ResultCode = ResultCode(2303);
    pub const STATUS_PROHIBITS_OPERATION: ResultCode = ResultCode(2304);
    pub const ASSOCIATION_PROHIBITS_OPERATION: ResultCode = ResultCode(2305);
    pub const PARAMETER_POLICY_ERROR: ResultCode = ResultCode(2306);
    pub const UNIMPLEMENTED_OBJECT_SERVICE: ResultCode = ResultCode(2307);
    pub const DATA_MANAGEMENT_POLICY_VIOLATION: ResultCode = ResultCode(2308);

    pub const COMMAND_FAILED: ResultCode = ResultCode(2400);
    pub const COMMAND_FAILED_BYE: ResultCode = ResultCode(2500);
    pub const AUTHENTICATION_ERROR_BYE: ResultCode = ResultCode(2501);
    pub const SESSION_LIMIT_EXCEEDED_BYE: ResultCode = ResultCode(2502);

    /// Numeric value of the code.
    #[inline]
    pub fn value(self) -> u16 {
        self.0
    }

    /// Codes below 2000 indicate the command completed.
    #[inline]
    pub fn is_success(self) -> bool {
        self.0 < 2000
    }

    /// Codes 2000 and above indicate the command failed.
    #[inline]
    pub fn is_error(self) -> bool {
        self.0 >= 2000
    }

    /// Success code that nonetheless ends the session (1500).
    #[inline]
    pub fn is_bye(self) -> bool {
        self.0 == 1500
    }

    /// Whether the session terminates after this response is sent.
    #[inline]
    pub fn is_terminal(self) -> bool {
        self.is_bye() || self.0 >= 2500
    }

    /// Whether handlers may return this value (any integer in [1000, 2502]).
    #[inline]
    pub fn in_protocol_range(self) -> bool {
        (1000..=2502).contains(&self.0)
    }

    /// The RFC 5730 §3 response text for this code, if it is one of the
    /// enumerated codes.
    pub fn standard_text(self) -> Option<&'static str> {
        let text = match self.0 {
            1000 => "Command completed successfully",
            1001 => "Command completed successfully; action pending",
            1300 => "Command completed successfully; no messages",
            1301 => "Command completed successfully; ack to dequeue",
            1500 => "Command completed successfully; ending session",
            2000 => "Unknown command",
            2001 => "Command syntax error",
            2002 => "Command use error",
            2003 => "Required parameter missing",
            2004 => "Parameter value range error",
            2005 => "Parameter value syntax error",
            2100 => "Unimplemented protocol version",
            2101 => "Unimplemented command",
            2102 => "Unimplemented option",
            2103 => "Unimplemented extension",
            2104 => "Billing failure",
            2105 => "Object is not eligible for renewal",
            2106 => "Object is not eligible for transfer",
            2200 => "Authentication error",
            2201 => "Authorization error",
            2202 => "Invalid authorization information",
            2300 => "Object pending transfer",
            2301 => "Object not pending transfer",
            2302 => "Object exists",
            2303 => "Object does not exist",
            2304 => "Object status prohibits operation",
            2305 => "Object association prohibits operation",
            2306 => "Parameter value policy error",
            2307 => "Unimplemented object service",
            2308 => "Data management policy violation",
            2400 => "Command failed",
            2500 => "Command failed; server closing connection",
            2501 => "Authentication error; server closing connection",
            2502 => "Session limit exceeded; server closing connection",
            _ => return None,
        };
        Some(text)
    }

    /// Default `<msg>` text used when a handler supplies only a code.
    pub fn default_message(self) -> &'static str {
        if self.is_success() {
            "Command completed successfully."
        } else {
            "Command failed."
        }
    }
}

impl From<u16> for ResultCode {
    fn from(code: u16) -> Self {
        ResultCode(code)
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_and_error_bands() {
        assert!(ResultCode::OK.is_success());
        assert!(ResultCode::OK_NO_MESSAGES.is_success());
        assert!(ResultCode::OK_BYE.is_success());
        assert!(!ResultCode::OK.is_error());

        assert!(ResultCode::UNKNOWN_COMMAND.is_error());
        assert!(ResultCode::COMMAND_FAILED.is_error());
        assert!(!ResultCode::COMMAND_FAILED.is_success());
    }

    #[test]
    fn test_terminal_codes() {
        assert!(ResultCode::OK_BYE.is_terminal());
        assert!(ResultCode::COMMAND_FAILED_BYE.is_terminal());
        assert!(ResultCode::AUTHENTICATION_ERROR_BYE.is_terminal());
        assert!(ResultCode::SESSION_LIMIT_EXCEEDED_BYE.is_terminal());

        assert!(!ResultCode::OK.is_terminal());
        assert!(!ResultCode::COMMAND_FAILED.is_terminal());
        assert!(!ResultCode::AUTHENTICATION_ERROR.is_terminal());
    }

    #[test]
    fn test_bye_is_computed_not_enumerated() {
        assert!(ResultCode::OK_BYE.is_bye());
        assert!(!ResultCode(1501).is_bye());
        assert!(!ResultCode::COMMAND_FAILED_BYE.is_bye());
    }

    #[test]
    fn test_protocol_range() {
        assert!(ResultCode(1000).in_protocol_range());
        assert!(ResultCode(2502).in_protocol_range());
        assert!(!ResultCode(999).in_protocol_range());
        assert!(!ResultCode(2503).in_protocol_range());
        assert!(!ResultCode(0).in_protocol_range());
    }

    #[test]
    fn test_standard_text_covers_engine_codes() {
        for code in [1000, 1300, 1500, 2000, 2001, 2101, 2102, 2103, 2200, 2307, 2400, 2500] {
            assert!(
                ResultCode(code).standard_text().is_some(),
                "missing text for {code}"
            );
        }
        assert!(ResultCode(1234).standard_text().is_none());
    }

    #[test]
    fn test_default_message_follows_band() {
        assert_eq!(
            ResultCode::OK.default_message(),
            "Command completed successfully."
        );
        assert_eq!(ResultCode::SYNTAX_ERROR.default_message(), "Command failed.");
    }
}
