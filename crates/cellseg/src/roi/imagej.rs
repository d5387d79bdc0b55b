//! ImageJ `.roi` binary encoding for polygon outlines.
//!
//! Layout (all big-endian):
//!
//! | offset        | size   | field                                   |
//! |---------------|--------|-----------------------------------------|
//! | 0             | 64     | header: magic, version, type, bounds, n |
//! | 64            | 2n     | x coordinates relative to `left` (i16)  |
//! | 64 + 2n       | 2n     | y coordinates relative to `top` (i16)   |
//! | 64 + 4n       | 64     | header2: name offset and length         |
//! | 128 + 4n      | 2·len  | name, UTF-16BE                          |

use super::{Roi, RoiError};

pub const MAGIC: &[u8; 4] = b"Iout";
pub const VERSION: i16 = 228;
pub const TYPE_POLYGON: u8 = 0;

pub const HEADER_SIZE: usize = 64;
pub const HEADER2_SIZE: usize = 64;

// Header field offsets.
const OFF_VERSION: usize = 4;
const OFF_TYPE: usize = 6;
const OFF_TOP: usize = 8;
const OFF_LEFT: usize = 10;
const OFF_BOTTOM: usize = 12;
const OFF_RIGHT: usize = 14;
const OFF_N_COORDS: usize = 16;
const OFF_HEADER2: usize = 60;

// Header2 field offsets, relative to header2.
const OFF2_NAME_OFFSET: usize = 16;
const OFF2_NAME_LENGTH: usize = 20;

fn put_i16(buf: &mut [u8], at: usize, v: i16) {
    buf[at..at + 2].copy_from_slice(&v.to_be_bytes());
}

fn put_i32(buf: &mut [u8], at: usize, v: i32) {
    buf[at..at + 4].copy_from_slice(&v.to_be_bytes());
}

fn to_i16(roi: &Roi, x: i32, y: i32, v: i32) -> Result<i16, RoiError> {
    i16::try_from(v).map_err(|_| RoiError::CoordinateOverflow {
        name: roi.name.clone(),
        x,
        y,
    })
}

/// Serialize `roi` as a polygon `.roi` file.
pub fn encode_roi(roi: &Roi) -> Result<Vec<u8>, RoiError> {
    let n = roi.points.len();
    let n_coords = u16::try_from(n).map_err(|_| RoiError::TooManyPoints {
        name: roi.name.clone(),
        n,
    })?;
    let ([left, top], [right, bottom]) = roi.bounds().unwrap_or(([0, 0], [0, 0]));

    let mut rel_x = Vec::with_capacity(n);
    let mut rel_y = Vec::with_capacity(n);
    for &[x, y] in &roi.points {
        to_i16(roi, x, y, x)?;
        to_i16(roi, x, y, y)?;
        rel_x.push(to_i16(roi, x, y, x - left)?);
        rel_y.push(to_i16(roi, x, y, y - top)?);
    }
    let corner = |v: i32| i16::try_from(v).unwrap_or_default();

    let name: Vec<u16> = roi.name.encode_utf16().collect();
    let header2_offset = HEADER_SIZE + 4 * n;
    let name_offset = header2_offset + HEADER2_SIZE;
    let mut buf = vec![0u8; name_offset + 2 * name.len()];

    buf[..4].copy_from_slice(MAGIC);
    put_i16(&mut buf, OFF_VERSION, VERSION);
    buf[OFF_TYPE] = TYPE_POLYGON;
    put_i16(&mut buf, OFF_TOP, corner(top));
    put_i16(&mut buf, OFF_LEFT, corner(left));
    put_i16(&mut buf, OFF_BOTTOM, corner(bottom));
    put_i16(&mut buf, OFF_RIGHT, corner(right));
    buf[OFF_N_COORDS..OFF_N_COORDS + 2].copy_from_slice(&n_coords.to_be_bytes());
    put_i32(&mut buf, OFF_HEADER2, header2_offset as i32);

    for (i, (&dx, &dy)) in rel_x.iter().zip(&rel_y).enumerate() {
        put_i16(&mut buf, HEADER_SIZE + 2 * i, dx);
        put_i16(&mut buf, HEADER_SIZE + 2 * n + 2 * i, dy);
    }

    put_i32(&mut buf, header2_offset + OFF2_NAME_OFFSET, name_offset as i32);
    put_i32(&mut buf, header2_offset + OFF2_NAME_LENGTH, name.len() as i32);
    for (i, unit) in name.iter().enumerate() {
        buf[name_offset + 2 * i..name_offset + 2 * i + 2].copy_from_slice(&unit.to_be_bytes());
    }
    Ok(buf)
}
