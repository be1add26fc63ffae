use crate::config::ConfigError;
use crate::contract::ContractError;
use crate::models::media::MediaError;
use crate::models::redaction::ModelError;
use crate::services::client::ApiError;

/// Any failure that ends a console action.
#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Contract(#[from] ContractError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),
}
