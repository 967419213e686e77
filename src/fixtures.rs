//! Crafted bitmaps for tests.

use bytemuck::from_bytes_mut;
use crate::bmp::{row_stride, RawFileHeader, RawInfoHeader, BITMAP_FILE_HEADER_SIZE, BITMAP_INFO_HEADER_SIZE, PALETTE_SIZE};

/// Builds an uncompressed BITMAPINFOHEADER file. `color_table` is written verbatim after the
/// info header; `rows` are the unpadded scanlines, top row first.
pub fn build(width: u32, height: u32, bit_depth: u16, colors_used: u32, color_table: &[u8], rows: &[Vec<u8>]) -> Vec<u8> {
    let stride = row_stride(bit_depth, width);
    let header_size = BITMAP_FILE_HEADER_SIZE + BITMAP_INFO_HEADER_SIZE as usize;
    let pixel_data_offset = header_size + color_table.len();
    let image_size = stride * height as usize;
    let file_size = (pixel_data_offset + image_size) as u32;
    let mut buf = vec![0u8; pixel_data_offset + image_size];

    let (file_header_bytes, rest) = buf.split_at_mut(BITMAP_FILE_HEADER_SIZE);
    let file_header: &mut RawFileHeader = from_bytes_mut(file_header_bytes);
    file_header.magic_number = *b"BM";
    file_header.file_size = file_size.to_le_bytes();
    file_header.bitmap_offset = (pixel_data_offset as u32).to_le_bytes();

    let (info_header_bytes, rest) = rest.split_at_mut(BITMAP_INFO_HEADER_SIZE as usize);
    let info_header: &mut RawInfoHeader = from_bytes_mut(info_header_bytes);
    info_header.header_size = BITMAP_INFO_HEADER_SIZE.to_le_bytes();
    info_header.width = width.to_le_bytes();
    info_header.height = height.to_le_bytes();
    info_header.planes = 1u16.to_le_bytes();
    info_header.bit_depth = bit_depth.to_le_bytes();
    info_header.image_size = (image_size as u32).to_le_bytes();
    info_header.x_pixels_per_meter = 2835u32.to_le_bytes();
    info_header.y_pixels_per_meter = 2835u32.to_le_bytes();
    info_header.colors_used = colors_used.to_le_bytes();

    let (table_bytes, pixel_bytes) = rest.split_at_mut(color_table.len());
    table_bytes.copy_from_slice(color_table);

    // bottom-up: the first scanline on disk is the last one given
    for (disk_row, row) in rows.iter().rev().enumerate() {
        let start = disk_row * stride;
        pixel_bytes[start..start + row.len()].copy_from_slice(row);
    }

    buf
}

/// 24 bpp image from BGR triples, top row first.
pub fn bmp24(width: u32, height: u32, bgr: &[[u8; 3]]) -> Vec<u8> {
    let rows: Vec<Vec<u8>> = bgr.chunks(width.max(1) as usize).map(|row| row.concat()).collect();
    build(width, height, 24, 0, &[], &rows)
}

/// 8 bpp image whose BGRA color table is zero-padded to 256 entries.
pub fn bmp8(width: u32, height: u32, palette: &[[u8; 4]], indices: &[u8]) -> Vec<u8> {
    let mut table = palette.concat();
    table.resize(PALETTE_SIZE, 0);
    let rows: Vec<Vec<u8>> = indices.chunks(width.max(1) as usize).map(<[u8]>::to_vec).collect();
    build(width, height, 8, palette.len() as u32, &table, &rows)
}

/// Overwrites the DIB header size field.
pub fn with_dib_size(mut bmp: Vec<u8>, size: u32) -> Vec<u8> {
    bmp[14..18].copy_from_slice(&size.to_le_bytes());
    bmp
}
