/// A single decoded pixel.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Pixel {
    /// 8 bpp: an index into the color table.
    Index(u8),
    /// 24 bpp: stored on disk as blue, green, red.
    Rgb { r: u8, g: u8, b: u8 }
}

/// Per-channel replacement values for 24 bpp recoloring. `None` leaves a channel untouched.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct ChannelOverride {
    pub red: Option<u8>,
    pub green: Option<u8>,
    pub blue: Option<u8>
}

impl ChannelOverride {
    pub fn is_empty(&self) -> bool {
        self.red.is_none() && self.green.is_none() && self.blue.is_none()
    }
}
