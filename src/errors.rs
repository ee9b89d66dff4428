use thiserror::Error;

/// Failure taxonomy for a search run.
///
/// `Config` and `Validation` stop the run before any scraping happens.
/// `Fetch` is always local to one course or one (category, course) pair.
/// `NoAvailability` is informational: the run completed but nothing qualified.
#[derive(Error, Debug)]
pub enum FinderError {
    #[error("config error: {0}")]
    Config(String),
    #[error("{0}")]
    Validation(String),
    #[error("fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },
    #[error("{0}")]
    NoAvailability(String),
}

impl FinderError {
    pub fn fetch(url: &str, message: impl ToString) -> Self {
        FinderError::Fetch {
            url: url.to_string(),
            message: message.to_string(),
        }
    }
}

impl From<std::io::Error> for FinderError {
    fn from(err: std::io::Error) -> Self {
        FinderError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FinderError>;
