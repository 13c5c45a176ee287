use thiserror::Error;

#[derive(Debug, Error)]
pub enum UiError {
    #[error("cursor ({col}, {row}) out of range")]
    CursorOutOfRange { col: u8, row: u8 },
    #[error("console write failed: {0}")]
    Io(#[from] std::io::Error),
}
