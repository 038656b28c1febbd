use crate::error::{BoardError, PaletteError};
use crate::palette;
use pixeldisplay_protocol::BoardSnapshot;

/// Dimensions assumed until the first snapshot arrives.
pub const INITIAL_SIZE: u32 = 64;

/// Row-major grid of palette codes. `pixels` is either empty (no snapshot yet)
/// or exactly `width * height` long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Board {
    pub fn empty() -> Self {
        Self {
            width: INITIAL_SIZE,
            height: INITIAL_SIZE,
            pixels: Vec::new(),
        }
    }

    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, BoardError> {
        if width == 0 || height == 0 {
            return Err(BoardError::ZeroDimension { width, height });
        }
        let cells = u64::from(width) * u64::from(height);
        if !pixels.is_empty() && pixels.len() as u64 != cells {
            return Err(BoardError::ShapeMismatch {
                width,
                height,
                len: pixels.len(),
            });
        }
        if let Some(&bad) = pixels.iter().find(|&&c| !palette::is_known(c)) {
            return Err(PaletteError::UnknownColor(bad).into());
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn filled(width: u32, height: u32, color: u8) -> Result<Self, BoardError> {
        let cells = (width as usize).saturating_mul(height as usize);
        Self::new(width, height, vec![color; cells])
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn has_pixels(&self) -> bool {
        !self.pixels.is_empty()
    }

    pub fn get(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(self.index(x, y)).copied()
    }

    pub fn replace(&mut self, board: Board) {
        *self = board;
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, color: u8) -> Result<(), BoardError> {
        if !self.has_pixels() {
            return Err(BoardError::NoPixelData);
        }
        if x >= self.width || y >= self.height {
            return Err(BoardError::OutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        palette::lookup(color)?;
        let idx = self.index(x, y);
        self.pixels[idx] = color;
        Ok(())
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::empty()
    }
}

impl TryFrom<BoardSnapshot> for Board {
    type Error = BoardError;

    fn try_from(snapshot: BoardSnapshot) -> Result<Self, Self::Error> {
        Self::new(snapshot.width, snapshot.height, snapshot.pixels)
    }
}
