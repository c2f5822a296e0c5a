//! Error taxonomy for the group-state engine and admission pipeline (§7).
//!
//! Structural/policy/temporal/reference rejections are surfaced to the
//! client verbatim via [`Error::reason`]; system errors are generic at the
//! admission boundary and merely logged wherever post-save effects swallow
//! them (§4.7).

use snafu::{Backtrace, Snafu};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Structural/policy rejection, surfaced to the client verbatim.
    #[snafu(display("{message}"))]
    Notice { message: String, backtrace: Backtrace },

    /// The action requires an authenticated subscriber/author and none is present.
    #[snafu(display("auth-required: {message}"))]
    AuthRequired { message: String, backtrace: Backtrace },

    /// The actor is known but lacks the permission or membership to proceed.
    #[snafu(display("restricted: {message}"))]
    Restricted { message: String, backtrace: Backtrace },

    /// A uniqueness constraint was violated (duplicate group, duplicate membership).
    #[snafu(display("duplicate: {message}"))]
    Duplicate { message: String, backtrace: Backtrace },

    /// The event id was deleted recently; anti-replay refuses to re-admit it (I6).
    #[snafu(display("{message}"))]
    Deleted { message: String, backtrace: Backtrace },

    /// Store, signing, or other infrastructure failure. Logged and swallowed
    /// during post-save effects (§4.7); generic at admission time.
    #[snafu(display("system error: {message}"))]
    System { message: String, backtrace: Backtrace },

    /// Replay of the moderation log hit state it cannot reconcile. Fatal at startup.
    #[snafu(display("replay error: {message}"))]
    Replay { message: String, backtrace: Backtrace },
}

impl Error {
    pub fn notice<S: Into<String>>(message: S) -> Self {
        Error::Notice {
            message: message.into(),
            backtrace: Backtrace::capture(),
        }
    }

    pub fn auth_required<S: Into<String>>(message: S) -> Self {
        Error::AuthRequired {
            message: message.into(),
            backtrace: Backtrace::capture(),
        }
    }

    pub fn restricted<S: Into<String>>(message: S) -> Self {
        Error::Restricted {
            message: message.into(),
            backtrace: Backtrace::capture(),
        }
    }

    pub fn duplicate<S: Into<String>>(message: S) -> Self {
        Error::Duplicate {
            message: message.into(),
            backtrace: Backtrace::capture(),
        }
    }

    pub fn deleted<S: Into<String>>(message: S) -> Self {
        Error::Deleted {
            message: message.into(),
            backtrace: Backtrace::capture(),
        }
    }

    pub fn system<S: Into<String>>(message: S) -> Self {
        Error::System {
            message: message.into(),
            backtrace: Backtrace::capture(),
        }
    }

    pub fn replay<S: Into<String>>(message: S) -> Self {
        Error::Replay {
            message: message.into(),
            backtrace: Backtrace::capture(),
        }
    }

    /// The string a client sees as the reject/closed reason. System errors are
    /// intentionally generic here; detail goes to the logs at the call site.
    pub fn reason(&self) -> String {
        match self {
            Error::System { .. } | Error::Replay { .. } => "error: internal error".to_string(),
            other => other.to_string(),
        }
    }

    pub fn is_system(&self) -> bool {
        matches!(self, Error::System { .. } | Error::Replay { .. })
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
