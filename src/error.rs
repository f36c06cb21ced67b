use thiserror::Error;

pub type Result<T> = std::result::Result<T, CodequityError>;

#[derive(Error, Debug)]
pub enum CodequityError {
    #[error("invalid repository location '{0}': use a path, owner/repo, or a full URL")]
    LocationInvalid(String),
    #[error("failed to acquire repository: {0}")]
    Acquisition(String),
    #[error("repository history unavailable: {0}")]
    HistoryUnavailable(String),
    #[error("failed to compute diff for commit {commit}: {reason}")]
    Diff { commit: String, reason: String },
    #[error("no contributions found in the commit history")]
    NoContributions,
    #[error("Invalid date: {0}")]
    InvalidDate(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

// gix errors collapse into the taxonomy above rather than surfacing verbatim
impl From<gix::discover::Error> for CodequityError {
    fn from(err: gix::discover::Error) -> Self {
        CodequityError::Acquisition(err.to_string())
    }
}

impl From<gix::open::Error> for CodequityError {
    fn from(err: gix::open::Error) -> Self {
        CodequityError::Acquisition(err.to_string())
    }
}

impl From<gix::reference::find::existing::Error> for CodequityError {
    fn from(err: gix::reference::find::existing::Error) -> Self {
        CodequityError::HistoryUnavailable(err.to_string())
    }
}

impl From<gix::head::peel::to_commit::Error> for CodequityError {
    fn from(err: gix::head::peel::to_commit::Error) -> Self {
        CodequityError::HistoryUnavailable(err.to_string())
    }
}

impl From<gix::object::find::existing::with_conversion::Error> for CodequityError {
    fn from(err: gix::object::find::existing::with_conversion::Error) -> Self {
        CodequityError::HistoryUnavailable(err.to_string())
    }
}

impl From<gix::object::commit::Error> for CodequityError {
    fn from(err: gix::object::commit::Error) -> Self {
        CodequityError::HistoryUnavailable(err.to_string())
    }
}

impl From<gix::objs::decode::Error> for CodequityError {
    fn from(err: gix::objs::decode::Error) -> Self {
        CodequityError::HistoryUnavailable(err.to_string())
    }
}
