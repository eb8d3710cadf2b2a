//! Status codes shared with the Doors SDK

use serde::Serialize;
use std::fmt;

/// Standard SDKK status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum StatusCode {
    Ok = 0,
    Generic = 1,
    NoMemory = 2,
    InvalidArg = 3,
    NotFound = 4,
    FileRead = 5,
    InvalidFormat = 6,
    AccessDenied = 7,
    InvalidHandle = 8,
}

impl StatusCode {
    /// Numeric value, also used as the process exit status
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Look up a status code by value
    pub fn from_code(code: u8) -> Option<Self> {
        let status = match code {
            0 => StatusCode::Ok,
            1 => StatusCode::Generic,
            2 => StatusCode::NoMemory,
            3 => StatusCode::InvalidArg,
            4 => StatusCode::NotFound,
            5 => StatusCode::FileRead,
            6 => StatusCode::InvalidFormat,
            7 => StatusCode::AccessDenied,
            8 => StatusCode::InvalidHandle,
            _ => return None,
        };
        Some(status)
    }

    /// Constant-style name, as the SDK headers spell it
    pub fn name(self) -> &'static str {
        match self {
            StatusCode::Ok => "SDKK_OK",
            StatusCode::Generic => "SDKK_ERR_GENERIC",
            StatusCode::NoMemory => "SDKK_ERR_NO_MEMORY",
            StatusCode::InvalidArg => "SDKK_ERR_INVALID_ARG",
            StatusCode::NotFound => "SDKK_ERR_NOT_FOUND",
            StatusCode::FileRead => "SDKK_ERR_FILE_READ",
            StatusCode::InvalidFormat => "SDKK_ERR_INVALID_FORMAT",
            StatusCode::AccessDenied => "SDKK_ERR_ACCESS_DENIED",
            StatusCode::InvalidHandle => "SDKK_ERR_INVALID_HANDLE",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}
