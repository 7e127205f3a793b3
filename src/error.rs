use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Other(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("testcontainers error: {0}")]
    TestContainers(#[from] testcontainers::TestcontainersError),

    #[error("probe task failed to join: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("probe transport failure for target '{target}': {source}")]
    Transport {
        target: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected status {status} from target '{target}' at {url}")]
    UnexpectedStatus {
        target: String,
        url: String,
        status: u16,
    },

    #[error("invalid target: {0}")]
    InvalidTarget(String),

    #[error("process '{0}' is not registered in the environment")]
    UnknownProcess(String),

    #[error("process '{process}' has no port named '{port}'")]
    UnknownPort { process: String, port: String },

    #[error("monitoring config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
