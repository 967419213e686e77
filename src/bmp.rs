use std::io::{Read, Seek, SeekFrom, Write};
use bytemuck::{cast_slice, from_bytes, Pod, Zeroable};
use log::warn;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use num_traits::{PrimInt, Unsigned};
use crate::common::Pixel;
use crate::error::BmpError;
use crate::stream::read_fully;


/*
File headers
 */

pub const BITMAP_FILE_HEADER_SIZE: usize = 14;
pub const BITMAP_INFO_HEADER_SIZE: u32 = 40;
const BITMAP_MAGIC_NUMBER: [u8; 2] = [0x42, 0x4d];

// BI_BITFIELDS stores three DWORD color masks between the info header and the color table
const BITFIELD_MASKS_SIZE: usize = 12;

/// Bytes needed to decode the file header plus a BITMAPINFOHEADER.
pub const HEADER_PROBE_LEN: u64 = 54;

// Every field is a byte array so the layout is exactly the on-disk one (no padding, alignment 1),
// and each value goes through `decode_le` regardless of host endianness.
#[derive(Pod, Zeroable, Copy, Clone)]
#[repr(C)]
pub(crate) struct RawFileHeader {
    pub(crate) magic_number: [u8; 2],
    pub(crate) file_size: [u8; 4],
    pub(crate) reserved: [u8; 4],
    pub(crate) bitmap_offset: [u8; 4]
}

#[derive(Pod, Zeroable, Copy, Clone)]
#[repr(C)]
pub(crate) struct RawInfoHeader {
    pub(crate) header_size: [u8; 4],
    pub(crate) width: [u8; 4],
    pub(crate) height: [u8; 4],
    pub(crate) planes: [u8; 2],
    pub(crate) bit_depth: [u8; 2],
    pub(crate) compression: [u8; 4],
    pub(crate) image_size: [u8; 4],
    pub(crate) x_pixels_per_meter: [u8; 4],
    pub(crate) y_pixels_per_meter: [u8; 4],
    pub(crate) colors_used: [u8; 4],
    pub(crate) important_colors_used: [u8; 4]
}


/// Decodes a little-endian field: `bytes[0] | bytes[1] << 8 | ...`.
pub fn decode_le<T: PrimInt + Unsigned + From<u8>>(bytes: &[u8]) -> T {
    bytes.iter().rev().fold(T::zero(), |acc, &byte| (acc << 8usize) | <T as From<u8>>::from(byte))
}


#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct FileHeader {
    pub magic: [u8; 2],
    pub file_size: u32,
    pub pixel_data_offset: u32
}

impl From<&RawFileHeader> for FileHeader {
    fn from(raw: &RawFileHeader) -> Self {
        FileHeader {
            magic: raw.magic_number,
            file_size: decode_le(&raw.file_size),
            // reserved bytes skipped
            pixel_data_offset: decode_le(&raw.bitmap_offset)
        }
    }
}

/// The fields of a BITMAPINFOHEADER.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct InfoHeader {
    pub width: i32,
    pub height: i32,
    pub planes: u16,
    pub bits_per_pixel: u16,
    pub compression: u32,
    pub image_size: u32,
    pub x_pixels_per_meter: i32,
    pub y_pixels_per_meter: i32,
    pub colors_used: u32,
    pub important_colors: u32
}

impl From<&RawInfoHeader> for InfoHeader {
    fn from(raw: &RawInfoHeader) -> Self {
        InfoHeader {
            width: decode_le::<u32>(&raw.width) as i32,
            height: decode_le::<u32>(&raw.height) as i32,
            planes: decode_le(&raw.planes),
            bits_per_pixel: decode_le(&raw.bit_depth),
            compression: decode_le(&raw.compression),
            image_size: decode_le(&raw.image_size),
            x_pixels_per_meter: decode_le::<u32>(&raw.x_pixels_per_meter) as i32,
            y_pixels_per_meter: decode_le::<u32>(&raw.y_pixels_per_meter) as i32,
            colors_used: decode_le(&raw.colors_used),
            important_colors: decode_le(&raw.important_colors_used)
        }
    }
}

/// The DIB header, tagged by whether its layout is one this tool understands.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DibHeader {
    Info(InfoHeader),
    Unsupported { size: u32 }
}

impl DibHeader {
    pub fn size(&self) -> u32 {
        match self {
            DibHeader::Info(_) => BITMAP_INFO_HEADER_SIZE,
            DibHeader::Unsupported { size } => *size
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ImageMetadata {
    pub file_header: FileHeader,
    pub dib: DibHeader
}

impl ImageMetadata {
    /// The info header, or `UnsupportedDibSize` when the DIB header could not be interpreted.
    pub fn info(&self) -> Result<&InfoHeader, BmpError> {
        match &self.dib {
            DibHeader::Info(info) => Ok(info),
            DibHeader::Unsupported { size } => Err(BmpError::UnsupportedDibSize(*size))
        }
    }

    // unsupported headers read as all-zero fields
    fn info_or_default(&self) -> InfoHeader {
        self.info().copied().unwrap_or_default()
    }

    pub fn width(&self) -> i32 {
        self.info_or_default().width
    }

    pub fn height(&self) -> i32 {
        self.info_or_default().height
    }

    pub fn bits_per_pixel(&self) -> u16 {
        self.info_or_default().bits_per_pixel
    }

    pub fn colors_used(&self) -> u32 {
        self.info_or_default().colors_used
    }

    pub fn compression(&self) -> u32 {
        self.info_or_default().compression
    }

    pub fn palette_offset(&self) -> usize {
        palette_offset(self.dib.size(), self.compression())
    }

    /// How much of the file precedes the rows: the pixel data offset, or the end of the color
    /// table if that lies further out.
    pub fn prefix_len(&self) -> u64 {
        let pixel_data_offset = u64::from(self.file_header.pixel_data_offset);
        if self.colors_used() == 0 {
            return pixel_data_offset;
        }
        let palette_end = (self.palette_offset() + PALETTE_SIZE) as u64;
        pixel_data_offset.max(palette_end)
    }
}


/*
Bit depths
 */

#[derive(Debug, IntoPrimitive, TryFromPrimitive, Copy, Clone, Eq, PartialEq)]
#[repr(u16)]
pub enum BitDepth {
    One = 1,
    Two = 2,
    Four = 4,
    Eight = 8,
    Sixteen = 16,
    TwentyFour = 24,
    ThirtyTwo = 32
}

impl BitDepth {
    /// Whole bytes per pixel; zero for the sub-byte depths.
    pub fn bytes_per_pixel(self) -> usize {
        usize::from(u16::from(self)) / 8
    }
}


/*
Compression types
 */

#[derive(Debug, IntoPrimitive, TryFromPrimitive, Copy, Clone, Eq, PartialEq)]
#[repr(u32)]
pub enum Compression {
    Rgb = 0x0,
    Rle8 = 0x1,
    Rle4 = 0x2,
    Bitfields = 0x3
}

fn is_bitfields(compression: u32) -> bool {
    matches!(Compression::try_from(compression), Ok(Compression::Bitfields))
}


/*
Header parsing
 */

fn ensure_len(buf: &[u8], needed: usize) -> Result<(), BmpError> {
    if buf.len() < needed {
        return Err(BmpError::Truncated { needed, actual: buf.len() });
    }
    Ok(())
}

/// Decodes the file header and, when it is a BITMAPINFOHEADER, the DIB header.
pub fn parse(buf: &[u8]) -> Result<ImageMetadata, BmpError> {
    ensure_len(buf, BITMAP_FILE_HEADER_SIZE + 4)?;

    let raw_file_header: &RawFileHeader = from_bytes(&buf[..BITMAP_FILE_HEADER_SIZE]);
    if raw_file_header.magic_number != BITMAP_MAGIC_NUMBER {
        return Err(BmpError::InvalidMagic(raw_file_header.magic_number));
    }
    let file_header = FileHeader::from(raw_file_header);

    // the DIB header version is deduced from its size, stored in its first DWORD
    let dib_size: u32 = decode_le(&buf[BITMAP_FILE_HEADER_SIZE..BITMAP_FILE_HEADER_SIZE + 4]);
    let dib = if dib_size == BITMAP_INFO_HEADER_SIZE {
        let end = BITMAP_FILE_HEADER_SIZE + BITMAP_INFO_HEADER_SIZE as usize;
        ensure_len(buf, end)?;
        let raw_info_header: &RawInfoHeader = from_bytes(&buf[BITMAP_FILE_HEADER_SIZE..end]);
        DibHeader::Info(InfoHeader::from(raw_info_header))
    }
    else {
        warn!("DIB header size {dib_size} is not supported; image fields left unset");
        DibHeader::Unsupported { size: dib_size }
    };

    Ok(ImageMetadata { file_header, dib })
}


/*
Palette parsing
 */

pub const PALETTE_ENTRIES: usize = 256;
pub const PALETTE_SIZE: usize = PALETTE_ENTRIES * 4;

#[derive(Pod, Zeroable, Copy, Clone, Debug, Eq, PartialEq)]
#[repr(C)]
pub struct BgrQuad {
    pub b: u8,
    pub g: u8,
    pub r: u8,
    pub reserved: u8
}

/// A color table. Either empty or a full 256-entry (1024 byte) table, whatever the declared
/// color count, so rows can index any 8-bit value.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Palette {
    bytes: Vec<u8>
}

impl Palette {
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn entries(&self) -> &[BgrQuad] {
        cast_slice(&self.bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

pub fn palette_offset(dib_size: u32, compression: u32) -> usize {
    let mut offset = BITMAP_FILE_HEADER_SIZE + dib_size as usize;
    if is_bitfields(compression) {
        offset += BITFIELD_MASKS_SIZE;
    }
    offset
}

/// Copies the 1024-byte color table out of `buf`. Bytes past the end of `buf` read as zero.
pub fn read_palette(buf: &[u8], dib_size: u32, compression: u32, color_count: u32) -> Palette {
    if color_count == 0 {
        return Palette::default();
    }

    let offset = palette_offset(dib_size, compression);
    let mut bytes = vec![0; PALETTE_SIZE];
    if let Some(available) = buf.get(offset..) {
        let len = available.len().min(PALETTE_SIZE);
        bytes[..len].copy_from_slice(&available[..len]);
        if len < PALETTE_SIZE {
            warn!("color table at offset {offset} is cut short after {len} bytes");
        }
    }
    else {
        warn!("color table offset {offset} lies past the end of the header data");
    }

    Palette { bytes }
}


/*
Scanline layout. Rows are padded to 4 bytes and stored bottom-up, so each row lives at an
absolute offset computed from its index counted from the top of the image.
 */

pub fn row_stride(bits_per_pixel: u16, width: u32) -> usize {
    (usize::from(bits_per_pixel) * width as usize).div_ceil(32) * 4
}

/// Raw bytes of one scanline, `index` counted from the top of the image.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PixelRow {
    pub index: u32,
    pub bytes: Vec<u8>
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct RowLayout {
    pixel_data_offset: u64,
    stride: usize,
    bytes_per_pixel: usize,
    width: usize,
    height: u32
}

impl RowLayout {
    pub fn new(metadata: &ImageMetadata) -> Result<RowLayout, BmpError> {
        let info = metadata.info()?;
        if info.height < 0 {
            return Err(BmpError::TopDownUnsupported(info.height));
        }
        if info.width < 0 {
            return Err(BmpError::NegativeWidth(info.width));
        }
        let bit_depth = BitDepth::try_from(info.bits_per_pixel)
            .map_err(|_| BmpError::UnsupportedBitDepth { operation: "row decoding", actual: info.bits_per_pixel })?;

        let width = info.width as u32;
        Ok(RowLayout {
            pixel_data_offset: u64::from(metadata.file_header.pixel_data_offset),
            stride: row_stride(bit_depth.into(), width),
            bytes_per_pixel: bit_depth.bytes_per_pixel(),
            width: width as usize,
            height: info.height as u32
        })
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn bytes_per_pixel(&self) -> usize {
        self.bytes_per_pixel
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Absolute file offset of row `row`, counted from the top. The top row is stored last.
    pub fn row_offset(&self, row: u32) -> u64 {
        debug_assert!(row < self.height);
        self.pixel_data_offset + self.stride as u64 * u64::from(self.height - 1 - row)
    }

    /// Reads up to one stride of bytes for `row`. The result is short only at end of file.
    pub fn read_row<R: Read + Seek>(&self, source: &mut R, row: u32) -> Result<PixelRow, BmpError> {
        source.seek(SeekFrom::Start(self.row_offset(row)))?;
        let mut bytes = vec![0; self.stride];
        let read = read_fully(source, &mut bytes)?;
        bytes.truncate(read);
        Ok(PixelRow { index: row, bytes })
    }

    pub fn write_row<W: Write + Seek>(&self, dest: &mut W, row: &PixelRow) -> Result<(), BmpError> {
        dest.seek(SeekFrom::Start(self.row_offset(row.index)))?;
        dest.write_all(&row.bytes)?;
        Ok(())
    }

    /// Checks that `row` holds every pixel of the scanline.
    pub fn check_row(&self, row: &PixelRow) -> Result<(), BmpError> {
        let expected = self.width * self.bytes_per_pixel;
        if row.bytes.len() < expected {
            return Err(BmpError::RowMisaligned { row: row.index, expected, actual: row.bytes.len() });
        }
        Ok(())
    }

    pub fn decode_pixel(&self, row: &PixelRow, column: usize) -> Option<Pixel> {
        if column >= self.width {
            return None;
        }
        decode_pixel(&row.bytes, column, self.bytes_per_pixel)
    }

    /// Streams every row from top to bottom, one at a time.
    pub fn rows<'a, R: Read + Seek>(&self, source: &'a mut R) -> Rows<'a, R> {
        Rows { layout: *self, source, next: 0 }
    }
}

pub struct Rows<'a, R> {
    layout: RowLayout,
    source: &'a mut R,
    next: u32
}

impl<R: Read + Seek> Iterator for Rows<'_, R> {
    type Item = Result<PixelRow, BmpError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.layout.height {
            return None;
        }
        let row = self.layout.read_row(self.source, self.next);
        self.next += 1;
        Some(row)
    }
}

/// Decodes pixel `index` of a scanline. 2 and 4 bytes per pixel are recognised but not decoded.
pub fn decode_pixel(row: &[u8], index: usize, bytes_per_pixel: usize) -> Option<Pixel> {
    match bytes_per_pixel {
        1 => row.get(index).copied().map(Pixel::Index),
        3 => {
            let bgr = row.get(index * 3..index * 3 + 3)?;
            Some(Pixel::Rgb { r: bgr[2], g: bgr[1], b: bgr[0] })
        }
        _ => None
    }
}


/*
Unit tests
 */
