//! GeoTIFF decoding.
//!
//! Reads both byte orders, the first IFD only, strip or tile layouts,
//! no compression or deflate, and exactly one 32-bit float band.

use flate2::read::ZlibDecoder;
use std::collections::HashMap;
use std::io::Read;

use crate::tags::*;
use crate::{GeoTiff, Result, TiffError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ByteOrder {
    Little,
    Big,
}

/// One IFD entry with its value bytes already resolved.
struct RawEntry {
    field_type: u16,
    count: u32,
    data: Vec<u8>,
}

struct Cursor<'a> {
    bytes: &'a [u8],
    order: ByteOrder,
}

impl<'a> Cursor<'a> {
    fn slice(&self, offset: usize, len: usize, what: &str) -> Result<&'a [u8]> {
        self.bytes
            .get(offset..offset + len)
            .ok_or_else(|| TiffError::Truncated(format!("{} at offset {}", what, offset)))
    }

    fn u16_at(&self, offset: usize) -> Result<u16> {
        let b = self.slice(offset, 2, "u16")?;
        Ok(match self.order {
            ByteOrder::Little => u16::from_le_bytes([b[0], b[1]]),
            ByteOrder::Big => u16::from_be_bytes([b[0], b[1]]),
        })
    }

    fn u32_at(&self, offset: usize) -> Result<u32> {
        let b = self.slice(offset, 4, "u32")?;
        Ok(match self.order {
            ByteOrder::Little => u32::from_le_bytes([b[0], b[1], b[2], b[3]]),
            ByteOrder::Big => u32::from_be_bytes([b[0], b[1], b[2], b[3]]),
        })
    }

    fn f64_from(&self, b: &[u8]) -> f64 {
        let arr: [u8; 8] = b.try_into().expect("caller sizes slices");
        match self.order {
            ByteOrder::Little => f64::from_le_bytes(arr),
            ByteOrder::Big => f64::from_be_bytes(arr),
        }
    }

    fn f32_from(&self, b: &[u8]) -> f32 {
        let arr: [u8; 4] = b.try_into().expect("caller sizes slices");
        match self.order {
            ByteOrder::Little => f32::from_le_bytes(arr),
            ByteOrder::Big => f32::from_be_bytes(arr),
        }
    }
}

fn type_size(field_type: u16) -> Result<usize> {
    match field_type {
        TYPE_ASCII => Ok(1),
        TYPE_SHORT => Ok(2),
        TYPE_LONG => Ok(4),
        TYPE_DOUBLE => Ok(8),
        other => Err(TiffError::Unsupported(format!(
            "TIFF field type {}",
            other
        ))),
    }
}

/// Decode a GeoTIFF from raw bytes.
pub fn decode(bytes: &[u8]) -> Result<GeoTiff> {
    if bytes.len() < 8 {
        return Err(TiffError::Truncated("header".to_string()));
    }
    let order = match &bytes[0..2] {
        b"II" => ByteOrder::Little,
        b"MM" => ByteOrder::Big,
        _ => return Err(TiffError::InvalidFormat("bad byte-order mark".to_string())),
    };
    let cursor = Cursor { bytes, order };
    if cursor.u16_at(2)? != 42 {
        return Err(TiffError::InvalidFormat("bad magic number".to_string()));
    }

    let ifd_offset = cursor.u32_at(4)? as usize;
    let entries = read_ifd(&cursor, ifd_offset)?;

    let width = require_long(&cursor, &entries, IMAGE_WIDTH)? as usize;
    let height = require_long(&cursor, &entries, IMAGE_LENGTH)? as usize;
    if width == 0 || height == 0 {
        return Err(TiffError::InvalidFormat("empty raster".to_string()));
    }

    let bits = optional_long(&cursor, &entries, BITS_PER_SAMPLE)?.unwrap_or(1);
    let samples = optional_long(&cursor, &entries, SAMPLES_PER_PIXEL)?.unwrap_or(1);
    let format = optional_long(&cursor, &entries, SAMPLE_FORMAT)?.unwrap_or(1);
    if bits != 32 || samples != 1 || format != u32::from(SAMPLE_FORMAT_IEEE_FLOAT) {
        return Err(TiffError::Unsupported(format!(
            "only single-band float32 is supported (bits={}, samples={}, format={})",
            bits, samples, format
        )));
    }

    let compression = optional_long(&cursor, &entries, COMPRESSION)?
        .unwrap_or(u32::from(COMPRESSION_NONE)) as u16;
    if compression != COMPRESSION_NONE && compression != COMPRESSION_DEFLATE {
        return Err(TiffError::Unsupported(format!(
            "compression code {}",
            compression
        )));
    }

    let data = if entries.contains_key(&TILE_OFFSETS) {
        read_tiles(&cursor, &entries, width, height, compression)?
    } else {
        read_strips(&cursor, &entries, width, height, compression)?
    };

    let geo_transform = read_geo_transform(&cursor, &entries)?;
    let epsg = read_epsg(&cursor, &entries)?;
    let nodata = read_nodata(&entries);

    Ok(GeoTiff {
        width,
        height,
        data,
        geo_transform,
        epsg,
        nodata,
    })
}

fn read_ifd(cursor: &Cursor<'_>, offset: usize) -> Result<HashMap<u16, RawEntry>> {
    let entry_count = cursor.u16_at(offset)? as usize;
    let mut entries = HashMap::with_capacity(entry_count);

    for i in 0..entry_count {
        let base = offset + 2 + i * 12;
        let tag = cursor.u16_at(base)?;
        let field_type = cursor.u16_at(base + 2)?;
        let count = cursor.u32_at(base + 4)?;
        let size = match type_size(field_type) {
            Ok(s) => s,
            // Skip entries of types we never read (rationals etc.)
            Err(_) => continue,
        };
        let byte_len = size * count as usize;
        let data = if byte_len <= 4 {
            cursor.slice(base + 8, byte_len, "inline value")?.to_vec()
        } else {
            let value_offset = cursor.u32_at(base + 8)? as usize;
            cursor.slice(value_offset, byte_len, "tag value")?.to_vec()
        };
        entries.insert(
            tag,
            RawEntry {
                field_type,
                count,
                data,
            },
        );
    }
    Ok(entries)
}

/// Read a scalar integer value stored as SHORT or LONG.
fn scalar(cursor: &Cursor<'_>, entry: &RawEntry) -> Result<u32> {
    let size = type_size(entry.field_type)?;
    if entry.data.len() < size {
        return Err(TiffError::InvalidFormat(
            "empty integer field".to_string(),
        ));
    }
    match entry.field_type {
        TYPE_SHORT => Ok(u32::from(match cursor.order {
            ByteOrder::Little => u16::from_le_bytes([entry.data[0], entry.data[1]]),
            ByteOrder::Big => u16::from_be_bytes([entry.data[0], entry.data[1]]),
        })),
        TYPE_LONG => Ok(match cursor.order {
            ByteOrder::Little => {
                u32::from_le_bytes([entry.data[0], entry.data[1], entry.data[2], entry.data[3]])
            }
            ByteOrder::Big => {
                u32::from_be_bytes([entry.data[0], entry.data[1], entry.data[2], entry.data[3]])
            }
        }),
        other => Err(TiffError::InvalidFormat(format!(
            "expected integer field, got type {}",
            other
        ))),
    }
}

fn integer_array(cursor: &Cursor<'_>, entry: &RawEntry) -> Result<Vec<u32>> {
    let size = type_size(entry.field_type)?;
    let mut values = Vec::with_capacity(entry.count as usize);
    for i in 0..entry.count as usize {
        let b = &entry.data[i * size..(i + 1) * size];
        values.push(match entry.field_type {
            TYPE_SHORT => u32::from(match cursor.order {
                ByteOrder::Little => u16::from_le_bytes([b[0], b[1]]),
                ByteOrder::Big => u16::from_be_bytes([b[0], b[1]]),
            }),
            TYPE_LONG => match cursor.order {
                ByteOrder::Little => u32::from_le_bytes([b[0], b[1], b[2], b[3]]),
                ByteOrder::Big => u32::from_be_bytes([b[0], b[1], b[2], b[3]]),
            },
            other => {
                return Err(TiffError::InvalidFormat(format!(
                    "expected integer array, got type {}",
                    other
                )))
            }
        });
    }
    Ok(values)
}

fn double_array(cursor: &Cursor<'_>, entry: &RawEntry) -> Result<Vec<f64>> {
    if entry.field_type != TYPE_DOUBLE {
        return Err(TiffError::InvalidFormat(format!(
            "expected DOUBLE field, got type {}",
            entry.field_type
        )));
    }
    Ok(entry
        .data
        .chunks_exact(8)
        .map(|b| cursor.f64_from(b))
        .collect())
}

fn require_long(
    cursor: &Cursor<'_>,
    entries: &HashMap<u16, RawEntry>,
    tag: u16,
) -> Result<u32> {
    optional_long(cursor, entries, tag)?
        .ok_or_else(|| TiffError::InvalidFormat(format!("missing required tag {}", tag)))
}

fn optional_long(
    cursor: &Cursor<'_>,
    entries: &HashMap<u16, RawEntry>,
    tag: u16,
) -> Result<Option<u32>> {
    entries.get(&tag).map(|e| scalar(cursor, e)).transpose()
}

fn decompress(segment: &[u8], compression: u16, expected: usize) -> Result<Vec<u8>> {
    match compression {
        COMPRESSION_NONE => Ok(segment.to_vec()),
        COMPRESSION_DEFLATE => {
            let mut raw = Vec::with_capacity(expected);
            ZlibDecoder::new(segment)
                .read_to_end(&mut raw)
                .map_err(|e| TiffError::Compression(e.to_string()))?;
            Ok(raw)
        }
        _ => unreachable!("compression validated by caller"),
    }
}

fn read_strips(
    cursor: &Cursor<'_>,
    entries: &HashMap<u16, RawEntry>,
    width: usize,
    height: usize,
    compression: u16,
) -> Result<Vec<f32>> {
    let offsets = integer_array(
        cursor,
        entries
            .get(&STRIP_OFFSETS)
            .ok_or_else(|| TiffError::InvalidFormat("missing strip offsets".to_string()))?,
    )?;
    let counts = integer_array(
        cursor,
        entries
            .get(&STRIP_BYTE_COUNTS)
            .ok_or_else(|| TiffError::InvalidFormat("missing strip byte counts".to_string()))?,
    )?;
    if offsets.len() != counts.len() {
        return Err(TiffError::InvalidFormat(
            "strip offset/count length mismatch".to_string(),
        ));
    }
    let rows_per_strip = optional_long(cursor, entries, ROWS_PER_STRIP)?
        .map(|v| v as usize)
        .unwrap_or(height);

    let mut data = Vec::with_capacity(width * height);
    let mut row = 0;
    for (offset, count) in offsets.iter().zip(counts.iter()) {
        if row >= height {
            break;
        }
        let rows = rows_per_strip.min(height - row);
        let expected = rows * width * 4;
        let segment = cursor.slice(*offset as usize, *count as usize, "strip")?;
        let raw = decompress(segment, compression, expected)?;
        if raw.len() < expected {
            return Err(TiffError::Truncated(format!(
                "strip at row {} has {} bytes, expected {}",
                row,
                raw.len(),
                expected
            )));
        }
        for b in raw[..expected].chunks_exact(4) {
            data.push(cursor.f32_from(b));
        }
        row += rows;
    }
    if data.len() != width * height {
        return Err(TiffError::Truncated(format!(
            "decoded {} samples, expected {}",
            data.len(),
            width * height
        )));
    }
    Ok(data)
}

fn read_tiles(
    cursor: &Cursor<'_>,
    entries: &HashMap<u16, RawEntry>,
    width: usize,
    height: usize,
    compression: u16,
) -> Result<Vec<f32>> {
    let tile_width = require_long(cursor, entries, TILE_WIDTH)? as usize;
    let tile_height = require_long(cursor, entries, TILE_LENGTH)? as usize;
    if tile_width == 0 || tile_height == 0 {
        return Err(TiffError::InvalidFormat("zero tile dimensions".to_string()));
    }
    let offsets = integer_array(
        cursor,
        entries
            .get(&TILE_OFFSETS)
            .ok_or_else(|| TiffError::InvalidFormat("missing tile offsets".to_string()))?,
    )?;
    let counts = integer_array(
        cursor,
        entries
            .get(&TILE_BYTE_COUNTS)
            .ok_or_else(|| TiffError::InvalidFormat("missing tile byte counts".to_string()))?,
    )?;

    let tiles_across = width.div_ceil(tile_width);
    let tiles_down = height.div_ceil(tile_height);
    if offsets.len() != tiles_across * tiles_down || offsets.len() != counts.len() {
        return Err(TiffError::InvalidFormat(format!(
            "expected {} tiles, found {}",
            tiles_across * tiles_down,
            offsets.len()
        )));
    }

    let expected = tile_width * tile_height * 4;
    let mut data = vec![0.0f32; width * height];
    for (index, (offset, count)) in offsets.iter().zip(counts.iter()).enumerate() {
        let tile_col = index % tiles_across;
        let tile_row = index / tiles_across;
        let segment = cursor.slice(*offset as usize, *count as usize, "tile")?;
        let raw = decompress(segment, compression, expected)?;
        if raw.len() < expected {
            return Err(TiffError::Truncated(format!(
                "tile {} has {} bytes, expected {}",
                index,
                raw.len(),
                expected
            )));
        }
        for dy in 0..tile_height {
            let y = tile_row * tile_height + dy;
            if y >= height {
                break;
            }
            for dx in 0..tile_width {
                let x = tile_col * tile_width + dx;
                if x >= width {
                    break;
                }
                let start = (dy * tile_width + dx) * 4;
                data[y * width + x] = cursor.f32_from(&raw[start..start + 4]);
            }
        }
    }
    Ok(data)
}

fn read_geo_transform(
    cursor: &Cursor<'_>,
    entries: &HashMap<u16, RawEntry>,
) -> Result<[f64; 6]> {
    let scale = double_array(
        cursor,
        entries.get(&MODEL_PIXEL_SCALE).ok_or_else(|| {
            TiffError::InvalidFormat("missing model pixel scale tag".to_string())
        })?,
    )?;
    let tiepoint = double_array(
        cursor,
        entries
            .get(&MODEL_TIEPOINT)
            .ok_or_else(|| TiffError::InvalidFormat("missing model tiepoint tag".to_string()))?,
    )?;
    if scale.len() < 2 || tiepoint.len() < 6 {
        return Err(TiffError::InvalidFormat(
            "short pixel scale or tiepoint tag".to_string(),
        ));
    }

    // Tiepoint maps raster (i, j) to model (x, y); normalize to pixel (0, 0).
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    Ok([origin_x, scale[0], 0.0, origin_y, 0.0, -scale[1]])
}

fn read_epsg(cursor: &Cursor<'_>, entries: &HashMap<u16, RawEntry>) -> Result<u32> {
    let entry = entries
        .get(&GEO_KEY_DIRECTORY)
        .ok_or_else(|| TiffError::InvalidFormat("missing GeoKey directory".to_string()))?;
    let shorts = integer_array(cursor, entry)?;
    if shorts.len() < 4 {
        return Err(TiffError::InvalidFormat("short GeoKey directory".to_string()));
    }
    let key_count = shorts[3] as usize;
    let mut projected = None;
    let mut geographic = None;
    for key in 0..key_count {
        let base = 4 + key * 4;
        if base + 3 >= shorts.len() {
            return Err(TiffError::InvalidFormat(
                "GeoKey directory shorter than its own count".to_string(),
            ));
        }
        // Only inline-valued keys (tiff_tag_location == 0) matter here.
        if shorts[base + 1] != 0 {
            continue;
        }
        match shorts[base] as u16 {
            PROJECTED_CS_TYPE => projected = Some(shorts[base + 3]),
            GEOGRAPHIC_TYPE => geographic = Some(shorts[base + 3]),
            _ => {}
        }
    }
    projected
        .or(geographic)
        .ok_or_else(|| TiffError::Unsupported("no EPSG code in GeoKey directory".to_string()))
}

fn read_nodata(entries: &HashMap<u16, RawEntry>) -> Option<f32> {
    let entry = entries.get(&GDAL_NODATA)?;
    let text = std::str::from_utf8(&entry.data).ok()?;
    text.trim_end_matches('\0').trim().parse::<f32>().ok()
}
