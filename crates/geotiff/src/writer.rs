//! GeoTIFF encoding.
//!
//! Output is always classic little-endian TIFF with a single IFD. The
//! byte layout is: 8-byte header, raster payload segments, the IFD, then
//! overflow tag values (arrays wider than four bytes).

use flate2::write::ZlibEncoder;
use flate2::Compression as FlateLevel;
use std::io::Write;

use crate::tags::*;
use crate::{Compression, GeoTiff, Layout, Result, TiffError};

/// One IFD entry with its value still in logical form.
struct Entry {
    tag: u16,
    field_type: u16,
    count: u32,
    /// Raw little-endian value bytes (unpadded).
    value: Vec<u8>,
}

impl Entry {
    fn shorts(tag: u16, values: &[u16]) -> Self {
        let mut value = Vec::with_capacity(values.len() * 2);
        for v in values {
            value.extend_from_slice(&v.to_le_bytes());
        }
        Entry {
            tag,
            field_type: TYPE_SHORT,
            count: values.len() as u32,
            value,
        }
    }

    fn longs(tag: u16, values: &[u32]) -> Self {
        let mut value = Vec::with_capacity(values.len() * 4);
        for v in values {
            value.extend_from_slice(&v.to_le_bytes());
        }
        Entry {
            tag,
            field_type: TYPE_LONG,
            count: values.len() as u32,
            value,
        }
    }

    fn doubles(tag: u16, values: &[f64]) -> Self {
        let mut value = Vec::with_capacity(values.len() * 8);
        for v in values {
            value.extend_from_slice(&v.to_le_bytes());
        }
        Entry {
            tag,
            field_type: TYPE_DOUBLE,
            count: values.len() as u32,
            value,
        }
    }

    fn ascii(tag: u16, text: &str) -> Self {
        let mut value = text.as_bytes().to_vec();
        value.push(0);
        Entry {
            tag,
            field_type: TYPE_ASCII,
            count: value.len() as u32,
            value,
        }
    }
}

/// Encode a raster image with the given layout and compression.
pub fn encode(image: &GeoTiff, layout: Layout, compression: Compression) -> Result<Vec<u8>> {
    if image.data.len() != image.width * image.height {
        return Err(TiffError::InvalidFormat(format!(
            "data length {} does not match {}x{}",
            image.data.len(),
            image.width,
            image.height
        )));
    }
    if image.width == 0 || image.height == 0 {
        return Err(TiffError::InvalidFormat("empty raster".to_string()));
    }
    let gt = image.geo_transform;
    if gt[2] != 0.0 || gt[4] != 0.0 {
        return Err(TiffError::Unsupported(
            "rotated geotransforms are not supported".to_string(),
        ));
    }
    if gt[1] <= 0.0 || gt[5] >= 0.0 {
        return Err(TiffError::Unsupported(
            "expected east-positive, north-up geotransform".to_string(),
        ));
    }

    // Build the payload segments.
    let segments = match layout {
        Layout::Strips { rows_per_strip } => {
            strip_segments(image, rows_per_strip.max(1), compression)?
        }
        Layout::Tiles {
            tile_width,
            tile_height,
        } => tile_segments(image, tile_width.max(16), tile_height.max(16), compression)?,
    };

    let mut out: Vec<u8> = Vec::new();
    out.extend_from_slice(&[b'I', b'I', 42, 0]);
    out.extend_from_slice(&[0, 0, 0, 0]); // IFD offset patched below

    let mut offsets = Vec::with_capacity(segments.len());
    let mut byte_counts = Vec::with_capacity(segments.len());
    for segment in &segments {
        if out.len() % 2 != 0 {
            out.push(0);
        }
        offsets.push(out.len() as u32);
        byte_counts.push(segment.len() as u32);
        out.extend_from_slice(segment);
    }

    let mut entries = base_entries(image, compression);
    match layout {
        Layout::Strips { rows_per_strip } => {
            entries.push(Entry::longs(STRIP_OFFSETS, &offsets));
            entries.push(Entry::longs(ROWS_PER_STRIP, &[rows_per_strip.max(1) as u32]));
            entries.push(Entry::longs(STRIP_BYTE_COUNTS, &byte_counts));
        }
        Layout::Tiles {
            tile_width,
            tile_height,
        } => {
            entries.push(Entry::shorts(TILE_WIDTH, &[tile_width.max(16) as u16]));
            entries.push(Entry::shorts(TILE_LENGTH, &[tile_height.max(16) as u16]));
            entries.push(Entry::longs(TILE_OFFSETS, &offsets));
            entries.push(Entry::longs(TILE_BYTE_COUNTS, &byte_counts));
        }
    }
    entries.sort_by_key(|e| e.tag);

    // The IFD must start on a word boundary.
    if out.len() % 2 != 0 {
        out.push(0);
    }
    let ifd_offset = out.len() as u32;
    out[4..8].copy_from_slice(&ifd_offset.to_le_bytes());

    // Values wider than four bytes live after the IFD.
    let mut overflow_offset = ifd_offset as usize + 2 + entries.len() * 12 + 4;
    let mut overflow: Vec<u8> = Vec::new();

    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    for entry in &entries {
        out.extend_from_slice(&entry.tag.to_le_bytes());
        out.extend_from_slice(&entry.field_type.to_le_bytes());
        out.extend_from_slice(&entry.count.to_le_bytes());
        if entry.value.len() <= 4 {
            let mut inline = [0u8; 4];
            inline[..entry.value.len()].copy_from_slice(&entry.value);
            out.extend_from_slice(&inline);
        } else {
            if overflow_offset % 2 != 0 {
                overflow.push(0);
                overflow_offset += 1;
            }
            out.extend_from_slice(&(overflow_offset as u32).to_le_bytes());
            overflow.extend_from_slice(&entry.value);
            overflow_offset += entry.value.len();
        }
    }
    out.extend_from_slice(&0u32.to_le_bytes()); // no further IFDs
    out.extend_from_slice(&overflow);

    Ok(out)
}

/// Entries shared by both layouts.
fn base_entries(image: &GeoTiff, compression: Compression) -> Vec<Entry> {
    let gt = image.geo_transform;
    let compression_code = match compression {
        Compression::None => COMPRESSION_NONE,
        Compression::Deflate => COMPRESSION_DEFLATE,
    };

    let geographic = image.epsg == 4326;
    let model_type = if geographic {
        MODEL_TYPE_GEOGRAPHIC
    } else {
        MODEL_TYPE_PROJECTED
    };
    let crs_key = if geographic {
        GEOGRAPHIC_TYPE
    } else {
        PROJECTED_CS_TYPE
    };
    // GeoKey directory: header (version 1.1.0) + three keys.
    let geo_keys: [u16; 16] = [
        1, 1, 0, 3,
        GT_MODEL_TYPE, 0, 1, model_type,
        GT_RASTER_TYPE, 0, 1, RASTER_PIXEL_IS_AREA,
        crs_key, 0, 1, image.epsg as u16,
    ];

    let mut entries = vec![
        Entry::longs(IMAGE_WIDTH, &[image.width as u32]),
        Entry::longs(IMAGE_LENGTH, &[image.height as u32]),
        Entry::shorts(BITS_PER_SAMPLE, &[32]),
        Entry::shorts(COMPRESSION, &[compression_code]),
        Entry::shorts(PHOTOMETRIC_INTERPRETATION, &[1]),
        Entry::shorts(SAMPLES_PER_PIXEL, &[1]),
        Entry::shorts(PLANAR_CONFIGURATION, &[1]),
        Entry::shorts(SAMPLE_FORMAT, &[SAMPLE_FORMAT_IEEE_FLOAT]),
        Entry::doubles(MODEL_PIXEL_SCALE, &[gt[1], -gt[5], 0.0]),
        Entry::doubles(MODEL_TIEPOINT, &[0.0, 0.0, 0.0, gt[0], gt[3], 0.0]),
        Entry::shorts(GEO_KEY_DIRECTORY, &geo_keys),
    ];
    if let Some(nodata) = image.nodata {
        entries.push(Entry::ascii(GDAL_NODATA, &format_nodata(nodata)));
    }
    entries
}

/// Format the no-data sentinel the way GDAL writes it.
fn format_nodata(value: f32) -> String {
    if value == value.trunc() && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

fn strip_segments(
    image: &GeoTiff,
    rows_per_strip: usize,
    compression: Compression,
) -> Result<Vec<Vec<u8>>> {
    let mut segments = Vec::new();
    let mut row = 0;
    while row < image.height {
        let rows = rows_per_strip.min(image.height - row);
        let start = row * image.width;
        let end = (row + rows) * image.width;
        let mut raw = Vec::with_capacity((end - start) * 4);
        for v in &image.data[start..end] {
            raw.extend_from_slice(&v.to_le_bytes());
        }
        segments.push(compress(&raw, compression)?);
        row += rows;
    }
    Ok(segments)
}

fn tile_segments(
    image: &GeoTiff,
    tile_width: usize,
    tile_height: usize,
    compression: Compression,
) -> Result<Vec<Vec<u8>>> {
    let tiles_across = image.width.div_ceil(tile_width);
    let tiles_down = image.height.div_ceil(tile_height);
    let pad = image.nodata.unwrap_or(0.0);

    let mut segments = Vec::with_capacity(tiles_across * tiles_down);
    for tile_row in 0..tiles_down {
        for tile_col in 0..tiles_across {
            let mut raw = Vec::with_capacity(tile_width * tile_height * 4);
            for dy in 0..tile_height {
                let y = tile_row * tile_height + dy;
                for dx in 0..tile_width {
                    let x = tile_col * tile_width + dx;
                    let v = if x < image.width && y < image.height {
                        image.data[y * image.width + x]
                    } else {
                        pad
                    };
                    raw.extend_from_slice(&v.to_le_bytes());
                }
            }
            segments.push(compress(&raw, compression)?);
        }
    }
    Ok(segments)
}

fn compress(raw: &[u8], compression: Compression) -> Result<Vec<u8>> {
    match compression {
        Compression::None => Ok(raw.to_vec()),
        Compression::Deflate => {
            let mut encoder = ZlibEncoder::new(Vec::new(), FlateLevel::default());
            encoder
                .write_all(raw)
                .map_err(|e| TiffError::Compression(e.to_string()))?;
            encoder
                .finish()
                .map_err(|e| TiffError::Compression(e.to_string()))
        }
    }
}
