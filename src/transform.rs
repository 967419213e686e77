use crate::bmp::Palette;
use crate::common::ChannelOverride;
use crate::error::BmpError;

/// Reverses an 8 bpp grayscale image by replacing every color table byte with `255 - value`.
pub fn invert_grayscale_palette(bits_per_pixel: u16, palette: &mut Palette) -> Result<(), BmpError> {
    if bits_per_pixel != 8 {
        return Err(BmpError::UnsupportedBitDepth { operation: "grayscale inversion", actual: bits_per_pixel });
    }
    for byte in palette.as_bytes_mut() {
        *byte = 255 - *byte;
    }
    Ok(())
}

/// Overwrites the set channels of the first `pixels` BGR triples of a 24 bpp scanline.
/// Padding after the last pixel is left alone.
pub fn set_channel(row: &mut [u8], bytes_per_pixel: usize, pixels: usize, channels: &ChannelOverride) -> Result<(), BmpError> {
    if bytes_per_pixel != 3 {
        return Err(BmpError::UnsupportedBitDepth { operation: "channel recoloring", actual: (bytes_per_pixel * 8) as u16 });
    }
    for bgr in row.chunks_exact_mut(3).take(pixels) {
        if let Some(blue) = channels.blue {
            bgr[0] = blue;
        }
        if let Some(green) = channels.green {
            bgr[1] = green;
        }
        if let Some(red) = channels.red {
            bgr[2] = red;
        }
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::bmp::{parse, read_palette, PALETTE_SIZE};
    use crate::fixtures;

    fn gray_palette() -> Palette {
        let bmp = fixtures::bmp8(2, 1, &[[0, 0, 0, 0], [85, 85, 85, 0], [170, 170, 170, 0], [255, 255, 255, 0]], &[0, 3]);
        let meta = parse(&bmp).unwrap();
        read_palette(&bmp, 40, 0, meta.colors_used())
    }

    #[test]
    fn inversion_flips_every_byte() {
        let original = gray_palette();
        let mut palette = original.clone();
        invert_grayscale_palette(8, &mut palette).unwrap();

        assert_eq!(palette.as_bytes().len(), PALETTE_SIZE);
        for (inverted, before) in palette.as_bytes().iter().zip(original.as_bytes()) {
            assert_eq!(*inverted, 255 - before);
        }
    }

    #[test]
    fn inversion_is_an_involution() {
        let original = gray_palette();
        let mut palette = original.clone();
        invert_grayscale_palette(8, &mut palette).unwrap();
        invert_grayscale_palette(8, &mut palette).unwrap();
        assert_eq!(palette, original);
    }

    #[test]
    fn inversion_needs_8_bits() {
        let mut palette = gray_palette();
        let before = palette.clone();
        assert!(matches!(
            invert_grayscale_palette(24, &mut palette),
            Err(BmpError::UnsupportedBitDepth { actual: 24, .. })
        ));
        assert_eq!(palette, before);
    }

    #[test]
    fn unset_channels_leave_row_unchanged() {
        let original = vec![1, 2, 3, 4, 5, 6, 0xaa, 0xbb];
        let mut row = original.clone();
        set_channel(&mut row, 3, 2, &ChannelOverride::default()).unwrap();
        assert_eq!(row, original);
    }

    #[test]
    fn single_channel_changes_only_that_channel() {
        let mut row = vec![1, 2, 3, 4, 5, 6, 0xaa, 0xbb];
        set_channel(&mut row, 3, 2, &ChannelOverride { red: Some(200), ..Default::default() }).unwrap();
        assert_eq!(row, vec![1, 2, 200, 4, 5, 200, 0xaa, 0xbb]);

        let mut row = vec![1, 2, 3, 4, 5, 6, 0xaa, 0xbb];
        set_channel(&mut row, 3, 2, &ChannelOverride { green: Some(0), blue: Some(9), red: None }).unwrap();
        assert_eq!(row, vec![9, 0, 3, 9, 0, 6, 0xaa, 0xbb]);
    }

    #[test]
    fn padding_is_never_recolored() {
        // width 1 gives a 4-byte stride with one padding byte
        let mut row = vec![1, 2, 3, 0];
        set_channel(&mut row, 3, 1, &ChannelOverride { red: Some(7), green: Some(7), blue: Some(7) }).unwrap();
        assert_eq!(row, vec![7, 7, 7, 0]);
    }

    #[test]
    fn recoloring_needs_24_bits() {
        let mut row = vec![1, 2, 3, 4];
        assert!(matches!(
            set_channel(&mut row, 1, 4, &ChannelOverride { red: Some(1), ..Default::default() }),
            Err(BmpError::UnsupportedBitDepth { actual: 8, .. })
        ));
        assert_eq!(row, vec![1, 2, 3, 4]);
    }
}
