use thiserror::Error;

#[derive(Error, Debug)]
pub enum MinerError {
    #[error("{0}")]
    Config(String),
    #[error("{0}")]
    PlotFile(String),
}

pub type MinerResult<T> = Result<T, MinerError>;
