use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PaletteError {
    #[error("unknown color code {0}")]
    UnknownColor(u8),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BoardError {
    #[error("board dimensions must be positive (got {width}x{height})")]
    ZeroDimension { width: u32, height: u32 },
    #[error("board {width}x{height} carries {len} pixels")]
    ShapeMismatch { width: u32, height: u32, len: usize },
    #[error("pixel ({x}, {y}) outside {width}x{height} board")]
    OutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
    #[error("delta received before any snapshot")]
    NoPixelData,
    #[error(transparent)]
    Palette(#[from] PaletteError),
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("board has no pixel data")]
    EmptyBoard,
    #[error(transparent)]
    Palette(#[from] PaletteError),
    #[error("png encode failed: {0}")]
    Encode(#[from] image::ImageError),
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("non-text frame")]
    NotText,
}

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("websocket error: {0}")]
    Ws(#[from] tungstenite::Error),
    #[error("websocket handshake failed: {0}")]
    Handshake(String),
    #[error("invalid url {url}: {reason}")]
    Url { url: String, reason: String },
    #[error("encode failed: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("link shut down while connecting")]
    Cancelled,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid board url {url}: {reason}")]
    BoardUrl { url: String, reason: String },
}
