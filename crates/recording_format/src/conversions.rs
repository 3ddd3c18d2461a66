//! Legacy (v1) field encodings converted to canonical units.
//!
//! v1 recorders stored:
//! - bytes per pixel as a float (`2.0` for Z16, `1.5` for packed 12-bit)
//! - row stride in pixels
//! - timestamps as floating point milliseconds
//! - device strings in fixed NUL-padded fields

use contracts::{CameraInfo, CameraInfoField};

use crate::chunk::fixed_str;
use crate::layout::DeviceInfoV1Raw;

/// Stored bytes-per-pixel to bits-per-pixel, truncating
pub fn bpp_bits(bytes_per_pixel: f32) -> u32 {
    (bytes_per_pixel * 8.0) as u32
}

/// Stored pixels-per-row stride to bytes-per-row
///
/// Fractional products truncate, matching how v1 recorders sized rows.
pub fn stride_bytes(stride_pixels: u32, bytes_per_pixel: f32) -> u32 {
    (stride_pixels as f32 * bytes_per_pixel) as u32
}

/// Floating point milliseconds to integer microseconds
pub fn ms_to_us(ms: f64) -> u64 {
    if ms <= 0.0 {
        0
    } else {
        (ms * 1000.0).round() as u64
    }
}

/// Inverse of [`ms_to_us`], used when writing legacy files
pub fn us_to_ms(us: u64) -> f64 {
    us as f64 / 1000.0
}

/// Fixed-field device description to the camera info map
pub fn camera_info(raw: &DeviceInfoV1Raw) -> CameraInfo {
    let (name, serial, firmware) = (raw.name, raw.serial, raw.firmware);
    let mut info = CameraInfo::new();
    for (field, bytes) in [
        (CameraInfoField::DeviceName, &name[..]),
        (CameraInfoField::SerialNumber, &serial[..]),
        (CameraInfoField::FirmwareVersion, &firmware[..]),
    ] {
        let value = fixed_str(bytes);
        if !value.is_empty() {
            info.insert(field, value);
        }
    }
    info
}

/// Copy `value` into a fixed NUL-padded field, truncating if needed
pub fn fill_fixed(dst: &mut [u8], value: &str) {
    let bytes = value.as_bytes();
    let n = bytes.len().min(dst.len().saturating_sub(1));
    dst[..n].copy_from_slice(&bytes[..n]);
}
