use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info, warn};
use crate::bmp::{self, Compression, ImageMetadata, Palette, RowLayout, HEADER_PROBE_LEN, PALETTE_SIZE};
use crate::common::ChannelOverride;
use crate::dump::{describe, describe_palette, describe_pixels, pixel_heading};
use crate::error::BmpError;
use crate::stream::read_prefix;
use crate::transform::{invert_grayscale_palette, set_channel};

#[derive(Parser, Debug)]
#[command(name = "bmp-edit", about = "Inspect and edit uncompressed 8 and 24 bits per pixel BMP images.")]
pub struct Args {
    /// The input file.
    input: PathBuf,

    /// The output file (required if options -R, -r, -g or -b are set).
    #[arg(short = 'o', value_name = "FILE")]
    output: Option<PathBuf>,

    /// Display the bitmap header and DIB header information.
    #[arg(short = 'i')]
    info: bool,

    /// Dump all headers, the color table if available and the value of each pixel, one line per pixel.
    #[arg(short = 'd')]
    dump: bool,

    /// Reverse an 8 bpp (grayscale) image, black to white and vice versa.
    #[arg(short = 'R', conflicts_with_all = ["red", "green", "blue"])]
    reverse: bool,

    /// Change the red value of every pixel of a 24 bpp image to N (between 0 and 255).
    #[arg(short = 'r', value_name = "N", allow_negative_numbers = true)]
    red: Option<i64>,

    /// Change the green value of every pixel of a 24 bpp image to N (between 0 and 255).
    #[arg(short = 'g', value_name = "N", allow_negative_numbers = true)]
    green: Option<i64>,

    /// Change the blue value of every pixel of a 24 bpp image to N (between 0 and 255).
    #[arg(short = 'b', value_name = "N", allow_negative_numbers = true)]
    blue: Option<i64>
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Edit {
    Reverse,
    Recolor(ChannelOverride)
}

impl Edit {
    fn name(&self) -> &'static str {
        match self {
            Edit::Reverse => "-R",
            Edit::Recolor(_) => "-r, -g and -b"
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct EditRequest {
    pub edit: Edit,
    pub output: PathBuf
}

/// Validated command line.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Request {
    pub input: PathBuf,
    pub info: bool,
    pub dump: bool,
    pub edit: Option<EditRequest>
}

fn channel(name: char, value: Option<i64>) -> Result<Option<u8>, BmpError> {
    value
        .map(|value| u8::try_from(value).map_err(|_| BmpError::InvalidChannelValue { channel: name, value }))
        .transpose()
}

impl TryFrom<Args> for Request {
    type Error = BmpError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        let channels = ChannelOverride {
            red: channel('r', args.red)?,
            green: channel('g', args.green)?,
            blue: channel('b', args.blue)?
        };

        let edit = if args.reverse {
            Some(Edit::Reverse)
        }
        else if !channels.is_empty() {
            Some(Edit::Recolor(channels))
        }
        else {
            None
        };

        let edit = match (edit, args.output) {
            (Some(edit), Some(output)) => Some(EditRequest { edit, output }),
            (Some(edit), None) => return Err(BmpError::MissingOutput(edit.name())),
            (None, Some(output)) => {
                warn!("no edit requested, {} will not be written", output.display());
                None
            }
            (None, None) => None
        };

        Ok(Request {
            input: args.input,
            // -d implies -i
            info: args.info || args.dump,
            dump: args.dump,
            edit
        })
    }
}

/// An edit that passed validation against the image and only needs writing out.
enum PreparedEdit {
    Reverse { layout: RowLayout, palette: Palette },
    Recolor { layout: RowLayout, channels: ChannelOverride }
}

fn prepare_edit(metadata: &ImageMetadata, palette: &Palette, edit: &Edit) -> Result<PreparedEdit, BmpError> {
    let info = metadata.info()?;
    match edit {
        Edit::Reverse => {
            let mut palette = palette.clone();
            invert_grayscale_palette(info.bits_per_pixel, &mut palette)?;
            if palette.is_empty() {
                return Err(BmpError::MissingPalette);
            }
            Ok(PreparedEdit::Reverse { layout: RowLayout::new(metadata)?, palette })
        }
        Edit::Recolor(channels) => {
            if info.bits_per_pixel != 24 {
                return Err(BmpError::UnsupportedBitDepth { operation: "channel recoloring", actual: info.bits_per_pixel });
            }
            Ok(PreparedEdit::Recolor { layout: RowLayout::new(metadata)?, channels: *channels })
        }
    }
}

fn warn_if_compressed(metadata: &ImageMetadata) {
    let compression = metadata.compression();
    if !matches!(Compression::try_from(compression), Ok(Compression::Rgb | Compression::Bitfields)) {
        warn!("compression method {compression} is not supported, rows are treated as raw bytes");
    }
}

fn open_input(path: &Path) -> Result<File, BmpError> {
    File::open(path).map_err(|source| BmpError::FileOpen { path: path.to_path_buf(), source })
}

fn open_output(path: &Path, input: &Path) -> Result<File, BmpError> {
    // editing in place must not truncate the rows we are about to read
    let in_place = match (fs::canonicalize(path), fs::canonicalize(input)) {
        (Ok(output), Ok(input)) => output == input,
        _ => false
    };

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(!in_place);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o660);
    }
    options.open(path).map_err(|source| BmpError::FileOpen { path: path.to_path_buf(), source })
}

/// Copies the header prefix, then streams every row through the edit to its absolute offset.
fn write_edit<R: Read + Seek, W: Write + Seek>(
    input: &mut R,
    output: &mut W,
    metadata: &ImageMetadata,
    prefix: &[u8],
    edit: &PreparedEdit,
) -> Result<(), BmpError> {
    let pixel_data_offset = metadata.file_header.pixel_data_offset as usize;
    let mut head = prefix[..pixel_data_offset.min(prefix.len())].to_vec();

    let layout = match edit {
        PreparedEdit::Reverse { layout, palette } => {
            let start = metadata.palette_offset();
            if start < head.len() {
                let end = (start + PALETTE_SIZE).min(head.len());
                head[start..end].copy_from_slice(&palette.as_bytes()[..end - start]);
            }
            else {
                warn!("color table at {start} lies past the pixel data at {pixel_data_offset}, not written");
            }
            layout
        }
        PreparedEdit::Recolor { layout, .. } => layout
    };

    output.seek(SeekFrom::Start(0))?;
    output.write_all(&head)?;
    info!("wrote {} header bytes", head.len());

    for row in layout.rows(input) {
        let mut row = row?;
        if let PreparedEdit::Recolor { channels, .. } = edit {
            match layout.check_row(&row) {
                Ok(()) => set_channel(&mut row.bytes, layout.bytes_per_pixel(), layout.width(), channels)?,
                // short rows are copied through as they are
                Err(err) => warn!("{err}, skipping row")
            }
        }
        layout.write_row(output, &row)?;
    }
    debug!("wrote {} rows of {} bytes", layout.height(), layout.stride());
    output.flush()?;
    Ok(())
}

fn dump_pixels<R: Read + Seek>(metadata: &ImageMetadata, input: &mut R) -> Result<()> {
    let layout = match RowLayout::new(metadata) {
        Ok(layout) => layout,
        Err(err) => {
            warn!("pixel data not dumped: {err}");
            return Ok(());
        }
    };
    if let Some(heading) = pixel_heading(layout.bytes_per_pixel()) {
        println!("\n{heading}");
    }
    for line in describe_pixels(&layout, input) {
        println!("{}", line.context("reading pixel rows")?);
    }
    Ok(())
}

/// Runs a validated request against its input file.
pub fn run(request: &Request) -> Result<()> {
    let mut input = open_input(&request.input)?;
    let header = read_prefix(&mut input, HEADER_PROBE_LEN).context("reading headers")?;
    let metadata = bmp::parse(&header)?;
    info!(
        "{}: {}x{}, {} bits per pixel",
        request.input.display(),
        metadata.width(),
        metadata.height(),
        metadata.bits_per_pixel()
    );
    let prefix = read_prefix(&mut input, metadata.prefix_len()).context("reading header prefix")?;
    let palette = bmp::read_palette(&prefix, metadata.dib.size(), metadata.compression(), metadata.colors_used());

    // every edit is checked against the image before anything is printed or written
    let prepared = request
        .edit
        .as_ref()
        .map(|edit| prepare_edit(&metadata, &palette, &edit.edit).map(|prepared| (prepared, &edit.output)))
        .transpose()?;

    if request.info || request.dump {
        warn_if_compressed(&metadata);
    }
    if request.info {
        println!("\n{}", describe(&metadata));
        if request.dump || metadata.colors_used() == 0 {
            print!("{}", describe_palette(&palette, metadata.colors_used()));
        }
    }
    if request.dump {
        dump_pixels(&metadata, &mut input)?;
    }

    if let Some((edit, output_path)) = prepared {
        warn_if_compressed(&metadata);
        info!("writing {}", output_path.display());
        let mut output = open_output(output_path, &request.input)?;
        write_edit(&mut input, &mut output, &metadata, &prefix, &edit)
            .with_context(|| format!("writing {}", output_path.display()))?;
    }
    Ok(())
}

/// Exit status for a failed run: 2 when a file could not be opened, 1 otherwise.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<BmpError>() {
        Some(BmpError::FileOpen { .. }) => 2,
        _ => 1
    }
}
