use crate::diary_entry::EntryId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("entry {0} not found")]
    NotFound(EntryId),
    #[error("failed to access entry file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode entries: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum BlobError {
    #[error("blob {0} is not a local file URL")]
    InvalidUrl(String),
    #[error("blob path {0} escapes the blob root")]
    InvalidPath(String),
    #[error("failed to access blob: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Incorrect email or password")]
    InvalidCredentials,
}

#[derive(Error, Debug)]
pub enum SuggestError {
    #[error("Write something in your diary first!")]
    EmptyContent,
    #[error("Could not generate tag suggestions at this time: {0}")]
    Request(#[from] reqwest::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine the configuration directory")]
    NoConfigDir,
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("The password you entered is incorrect.")]
pub struct IncorrectPassword;
