use std::io;
use std::path::PathBuf;

/// Everything that can go wrong while reading, dumping or editing a bitmap.
#[derive(Debug, thiserror::Error)]
pub enum BmpError {
    #[error("incorrect magic number {0:?} (expected \"BM\")")]
    InvalidMagic([u8; 2]),

    #[error("header truncated: need {needed} bytes, got {actual}")]
    Truncated { needed: usize, actual: usize },

    #[error("unsupported DIB header size {0} (only BITMAPINFOHEADER, size 40, is supported)")]
    UnsupportedDibSize(u32),

    #[error("{operation} does not support {actual} bits per pixel")]
    UnsupportedBitDepth { operation: &'static str, actual: u16 },

    #[error("color value {value} for -{channel} is not in 0 and 255")]
    InvalidChannelValue { channel: char, value: i64 },

    #[error("option -o not set, an output file is required for {0}")]
    MissingOutput(&'static str),

    #[error("image declares no color table to invert")]
    MissingPalette,

    #[error("top-down bitmaps (negative height {0}) are not supported")]
    TopDownUnsupported(i32),

    #[error("width is a negative number ({0})")]
    NegativeWidth(i32),

    #[error("row {row} misaligned: need {expected} bytes, got {actual}")]
    RowMisaligned {
        row: u32,
        expected: usize,
        actual: usize
    },

    #[error("cannot open {}", path.display())]
    FileOpen {
        path: PathBuf,
        #[source]
        source: io::Error
    },

    #[error(transparent)]
    Io(#[from] io::Error)
}
