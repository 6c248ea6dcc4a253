use std::{error, fmt, io};

/// Error kinds of the sync service.
///
/// The kind decides how far an error travels:
///  - `Config` prevents the sync loop from starting
///  - `Api` and `Io` abort a single file operation, or the whole cycle if
///    they occur while listing
///  - `Other` is caught at the cycle boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    Config(String),
    Api(String),
    Io(String),
    Other(String),
}

impl Error {
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(..))
    }

    pub fn is_api(&self) -> bool {
        matches!(self, Self::Api(..))
    }

    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(..))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
            Self::Api(msg) => write!(f, "API error: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
            Self::Other(msg) => f.write_str(msg),
        }
    }
}

impl error::Error for Error {}

impl From<io::Error> for Error {
    fn from(value: io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Self::Api(format!("Unexpected response shape: {value}"))
    }
}


pub type Result<T> = std::result::Result<T, Error>;

#[macro_export]
macro_rules! config_bail {
    ($($t:tt)*) => {
        return ::core::result::Result::Err($crate::Error::Config(format!($($t)*)));
    };
}

#[macro_export]
macro_rules! io_bail {
    ($($t:tt)*) => {
        return ::core::result::Result::Err($crate::Error::Io(format!($($t)*)));
    };
}

#[macro_export]
macro_rules! api_bail {
    ($($t:tt)*) => {
        return ::core::result::Result::Err($crate::Error::Api(format!($($t)*)));
    };
}

#[macro_export]
macro_rules! config_error {
    ($($t:tt)*) => {
        $crate::Error::Config(format!($($t)*))
    };
}

#[macro_export]
macro_rules! io_error {
    ($($t:tt)*) => {
        $crate::Error::Io(format!($($t)*))
    };
}

#[macro_export]
macro_rules! api_error {
    ($($t:tt)*) => {
        $crate::Error::Api(format!($($t)*))
    };
}

#[macro_export]
macro_rules! other_error {
    ($($t:tt)*) => {
        $crate::Error::Other(format!($($t)*))
    };
}
