use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocDeskError {
    #[error("Greška u postavkama: {0}")]
    Config(String),

    #[error("Datoteka nije pronađena: {0}")]
    FileNotFound(String),

    #[error("Nema dokumenata za upload: {0}")]
    NoFilesFound(String),

    #[error("Neispravan argument: {0}")]
    InvalidArgument(String),

    #[error("Greška poslužitelja ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP greška: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Greška pri čitanju JSON-a: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("I/O greška: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] docdesk_common::Error),
}

pub type Result<T> = std::result::Result<T, DocDeskError>;
