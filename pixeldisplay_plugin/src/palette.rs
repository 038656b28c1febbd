use crate::error::PaletteError;

pub type Rgb = [u8; 3];

const fn hex(v: u32) -> Rgb {
    [(v >> 16) as u8, (v >> 8) as u8, v as u8]
}

/// Board server color codes, indexed by code.
const COLORS: [Rgb; 20] = [
    hex(0xf23624),
    hex(0x45ff45),
    hex(0x29abfd),
    hex(0xf4f227),
    hex(0xf18e02),
    hex(0xaa00ff),
    hex(0x40ffff),
    hex(0xffffff),
    hex(0x2e2e2e),
    hex(0xcacaca),
    hex(0xac2215),
    hex(0x009900),
    hex(0x3062f1),
    hex(0xcca81a),
    hex(0x9a642e),
    hex(0xff00ff),
    hex(0x00e099),
    hex(0x858585),
    hex(0xff99ff),
    hex(0xf3d7aa),
];

pub const COLOR_COUNT: u8 = COLORS.len() as u8;

pub fn lookup(code: u8) -> Result<Rgb, PaletteError> {
    COLORS
        .get(usize::from(code))
        .copied()
        .ok_or(PaletteError::UnknownColor(code))
}

pub fn is_known(code: u8) -> bool {
    code < COLOR_COUNT
}
