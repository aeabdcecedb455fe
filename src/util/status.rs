use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Code {
    NotFound,
    AlreadyExists,
    HandleInvalidated,
    ConnectionError,
    NoPrimaryElected,
    InvalidResponse,
    InvalidArgument,
    TimedOut,
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code:?}: {message}")]
pub struct Status {
    code: Code,
    message: String,
}

impl Status {
    pub fn new(code: Code, msg: impl Into<String>) -> Self {
        Status {
            code,
            message: msg.into(),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Status::new(Code::NotFound, msg)
    }

    pub fn already_exists(msg: impl Into<String>) -> Self {
        Status::new(Code::AlreadyExists, msg)
    }

    pub fn handle_invalidated(msg: impl Into<String>) -> Self {
        Status::new(Code::HandleInvalidated, msg)
    }

    pub fn connection_error(msg: impl Into<String>) -> Self {
        Status::new(Code::ConnectionError, msg)
    }

    pub fn no_primary_elected(msg: impl Into<String>) -> Self {
        Status::new(Code::NoPrimaryElected, msg)
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Status::new(Code::InvalidResponse, msg)
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Status::new(Code::InvalidArgument, msg)
    }

    pub fn timed_out(msg: impl Into<String>) -> Self {
        Status::new(Code::TimedOut, msg)
    }

    pub fn aborted(msg: impl Into<String>) -> Self {
        Status::new(Code::Aborted, msg)
    }

    pub fn is_not_found(&self) -> bool {
        self.code == Code::NotFound
    }

    pub fn is_handle_invalidated(&self) -> bool {
        self.code == Code::HandleInvalidated
    }

    pub fn is_connection_error(&self) -> bool {
        self.code == Code::ConnectionError
    }

    pub fn is_no_primary_elected(&self) -> bool {
        self.code == Code::NoPrimaryElected
    }

    pub fn code(&self) -> Code {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<std::io::Error> for Status {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::TimedOut => Status::timed_out(err.to_string()),
            _ => Status::connection_error(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for Status {
    fn from(err: serde_json::Error) -> Self {
        Status::invalid_argument(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Status>;
