use std::fmt;
use std::io::{Read, Seek};
use log::warn;
use crate::bmp::{DibHeader, ImageMetadata, Palette, PixelRow, RowLayout};
use crate::common::Pixel;
use crate::error::BmpError;

impl fmt::Display for ImageMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [m0, m1] = self.file_header.magic;
        writeln!(f, "header: {}{}", char::from(m0), char::from(m1))?;
        writeln!(f, "size of bitmap (bytes): {}", self.file_header.file_size)?;
        writeln!(f, "offset (start of image data): {}", self.file_header.pixel_data_offset)?;
        writeln!(f)?;
        writeln!(f, "size of dib: {}", self.dib.size())?;

        let DibHeader::Info(info) = &self.dib else {
            return writeln!(f, "unsupported DIB header, no further fields decoded");
        };
        writeln!(f, "bitmap width in pixels: {}", info.width)?;
        writeln!(f, "bitmap height in pixels: {}", info.height)?;
        writeln!(f, "number of color planes: {}", info.planes)?;
        writeln!(f, "number of bits per pixel: {}", info.bits_per_pixel)?;
        writeln!(f, "compression method: {}", info.compression)?;
        writeln!(f, "image size: {}", info.image_size)?;
        writeln!(f, "horizontal resolution (pixel per meter): {}", info.x_pixels_per_meter)?;
        writeln!(f, "vertical resolution (pixel per meter): {}", info.y_pixels_per_meter)?;
        writeln!(f, "number of colors: {}", info.colors_used)?;
        writeln!(f, "number of important colors: {}", info.important_colors)
    }
}

/// Every decoded header field, one per line.
pub fn describe(metadata: &ImageMetadata) -> String {
    metadata.to_string()
}

struct PaletteTable<'a> {
    palette: &'a Palette,
    color_count: usize
}

impl fmt::Display for PaletteTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.color_count == 0 {
            return writeln!(f, "no color table");
        }
        writeln!(f, "Color Table")?;
        writeln!(f, "index\tred\tgreen\tblue\talpha")?;
        writeln!(f, "-------------------------------------")?;
        for (index, quad) in self.palette.entries().iter().take(self.color_count).enumerate() {
            writeln!(f, "{index}\t{}\t{}\t{}\t{}", quad.r, quad.g, quad.b, quad.reserved)?;
        }
        Ok(())
    }
}

/// Lists the first `color_count` color table entries as red, green, blue, alpha.
pub fn describe_palette(palette: &Palette, color_count: u32) -> String {
    PaletteTable { palette, color_count: color_count as usize }.to_string()
}

/// Column titles for the pixel dump, if pixels of this width are dumped at all.
pub fn pixel_heading(bytes_per_pixel: usize) -> Option<&'static str> {
    match bytes_per_pixel {
        1 => Some("Pixel Data\n(row, col)\tindex\n------------------------"),
        3 => Some("Pixel Data\n(row, col)\tred\tgreen\tblue\n------------------------------------"),
        _ => None
    }
}

fn format_pixel(row: u32, column: usize, pixel: Pixel) -> String {
    match pixel {
        Pixel::Index(index) => format!("({row}, {column})\t\t{index}\t{index:02x}"),
        Pixel::Rgb { r, g, b } => format!("({row}, {column})\t\t{r}\t{g}\t{b}")
    }
}

fn pixel_lines(layout: &RowLayout, row: Result<PixelRow, BmpError>) -> Vec<Result<String, BmpError>> {
    let row = match row {
        Ok(row) => row,
        Err(err) => return vec![Err(err)]
    };
    if let Err(err) = layout.check_row(&row) {
        warn!("{err}, skipping row");
        return Vec::new();
    }
    (0..layout.width())
        .filter_map(|column| layout.decode_pixel(&row, column).map(|pixel| Ok(format_pixel(row.index, column, pixel))))
        .collect()
}

/// One line per pixel, top row first, reading a single row at a time from `source`.
/// Images with 2 or 4 bytes per pixel produce nothing.
pub fn describe_pixels<'a, R: Read + Seek>(layout: &RowLayout, source: &'a mut R) -> impl Iterator<Item = Result<String, BmpError>> + 'a {
    let layout = *layout;
    let row_count = if pixel_heading(layout.bytes_per_pixel()).is_some() { layout.height() as usize } else { 0 };
    layout.rows(source)
        .take(row_count)
        .flat_map(move |row| pixel_lines(&layout, row))
}
