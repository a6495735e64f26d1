use crate::{
    inbox::InboxError,
    message::{Method, Payload, Response, Status},
};
use plexi_core::{
    addr::AddrParseError,
    query::QueryError,
    schedule::ScheduleError,
    stats::{MetaError, PoolExhausted, UnknownMetric},
};
use thiserror::Error;

/// Everything a request can fail with.
///
/// The message of each error is sent back to the client as the
/// diagnostic payload of the response, see [`Error::status`] for the
/// status.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Resource ({path}) not found")]
    UnknownResource { path: String },
    #[error("Method {method:?} not allowed")]
    MethodNotAllowed { method: Method },
    #[error("Only JSON content is supported")]
    NotAcceptable,

    #[error("{message}")]
    UnsupportedQuery { message: &'static str },
    #[error("{message}")]
    Unsupported { message: &'static str },
    #[error("Invalid subresource")]
    InvalidSubresource,
    #[error("Unrecognized metric")]
    UnrecognizedMetric,
    #[error("{message}")]
    NotFound { message: &'static str },

    #[error("{message}")]
    BadRequest { message: String },
    #[error("Can only support JSON payload format")]
    Json(#[from] serde_json::Error),
    #[error("Invalid target node address")]
    InvalidAddress(#[from] AddrParseError),
    #[error("Invalid statistics configuration ({0})")]
    InvalidConfiguration(#[from] MetaError),
    #[error("Statistics ID represents a different metric")]
    MetricConflict,
    #[error("Broadcast cells cannot measure ETX and PDR")]
    BroadcastCell,
    #[error(transparent)]
    UnknownMetric(#[from] UnknownMetric),

    #[error(transparent)]
    Exhausted(#[from] PoolExhausted),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error(transparent)]
    Inbox(#[from] InboxError),
}

impl Error {
    /// Translate a query error of a resource whose supported queries are
    /// described by `unsupported`.
    pub(crate) fn query(error: QueryError, unsupported: &'static str) -> Self {
        match error {
            QueryError::Malformed { .. }
            | QueryError::Unsupported
            | QueryError::InvalidNumber { .. } => Self::UnsupportedQuery {
                message: unsupported,
            },
            QueryError::UnknownMetric(_) => Self::UnrecognizedMetric,
            QueryError::InvalidAddress(error) => Self::InvalidAddress(error),
            error @ QueryError::InvalidEnable { .. } => Self::BadRequest {
                message: error.to_string(),
            },
        }
    }

    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn status(&self) -> Status {
        match self {
            Self::UnknownResource { .. }
            | Self::InvalidSubresource
            | Self::UnrecognizedMetric
            | Self::NotFound { .. } => Status::NotFound,
            Self::MethodNotAllowed { .. } => Status::MethodNotAllowed,
            Self::NotAcceptable => Status::NotAcceptable,
            Self::Unsupported { .. } => Status::NotImplemented,
            Self::BadRequest { .. }
            | Self::UnsupportedQuery { .. }
            | Self::UnknownMetric(_)
            | Self::Json(_)
            | Self::InvalidAddress(_)
            | Self::InvalidConfiguration(_)
            | Self::MetricConflict
            | Self::BroadcastCell => Status::BadRequest,
            Self::Exhausted(_) => Status::InternalServerError,
            Self::Schedule(error) => match error {
                ScheduleError::SlotframeNotFound { .. } => Status::NotFound,
                ScheduleError::HandlesExhausted => Status::InternalServerError,
                ScheduleError::SlotframeExists { .. }
                | ScheduleError::EmptySlotframe { .. }
                | ScheduleError::TimeslotOutOfRange { .. } => Status::BadRequest,
            },
            Self::Inbox(error) => match error {
                InboxError::Busy { .. } => Status::ServiceUnavailable,
                InboxError::PayloadTooLarge { .. } => Status::NotImplemented,
                InboxError::OutOfSequence { .. } => Status::RequestEntityIncomplete,
            },
        }
    }

    pub fn into_response(self) -> Response {
        let payload = match self {
            Self::NotAcceptable => Payload::Empty,
            _ => Payload::Text(self.to_string()),
        };
        Response::new(self.status(), payload)
    }
}
