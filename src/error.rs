use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid URL {value:?}: {source}")]
    InvalidUrl {
        value: String,
        source: url::ParseError,
    },

    #[error("URL {0} cannot be used as an API base")]
    CannotBeABase(String),

    #[error("invalid port {0:?}")]
    InvalidPort(String),

    #[error("invalid volume {0:?}, expected a number between 0 and 1")]
    InvalidVolume(String),

    #[error("unknown story flavor {0:?}")]
    UnknownFlavor(String),

    #[error("failed to decode payload: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
