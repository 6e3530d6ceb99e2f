use crate::constants::{MAX_CANVAS_SIZE, MAX_LINE_WIDTH, MIN_LINE_WIDTH};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SurfaceError {
    #[error("Invalid canvas size {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("Canvas size {width}x{height} exceeds {}px", MAX_CANVAS_SIZE)]
    TooLarge { width: u32, height: u32 },
    #[error("Snapshot is {snapshot_width}x{snapshot_height} but canvas is {width}x{height}")]
    SnapshotMismatch {
        snapshot_width: u32,
        snapshot_height: u32,
        width: u32,
        height: u32,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ColorParseError {
    #[error("Color must look like #rrggbb or #rrggbbaa, got {0:?}")]
    Format(String),
    #[error("Invalid hex digits in {0:?}")]
    Digits(String),
}

/// Reject empty or oversized canvases
pub fn validate_dimensions(width: u32, height: u32) -> Result<(), SurfaceError> {
    if width == 0 || height == 0 {
        return Err(SurfaceError::InvalidDimensions { width, height });
    }
    if width > MAX_CANVAS_SIZE || height > MAX_CANVAS_SIZE {
        return Err(SurfaceError::TooLarge { width, height });
    }
    Ok(())
}

/// Clamp a toolbar line width into the supported range
pub fn clamp_line_width(width: f32) -> f32 {
    if width.is_nan() {
        return MIN_LINE_WIDTH;
    }
    width.clamp(MIN_LINE_WIDTH, MAX_LINE_WIDTH)
}

/// Parse `#rrggbb` or `#rrggbbaa` into RGBA bytes
pub fn parse_hex_color(text: &str) -> Result<[u8; 4], ColorParseError> {
    let hex = text
        .trim()
        .strip_prefix('#')
        .ok_or_else(|| ColorParseError::Format(text.to_string()))?;
    if (hex.len() != 6 && hex.len() != 8) || !hex.is_ascii() {
        return Err(ColorParseError::Format(text.to_string()));
    }

    let mut rgba = [255u8; 4];
    for (i, channel) in rgba.iter_mut().enumerate().take(hex.len() / 2) {
        *channel = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
            .map_err(|_| ColorParseError::Digits(text.to_string()))?;
    }
    Ok(rgba)
}

/// Format RGBA bytes as `#rrggbb`, dropping alpha
pub fn to_hex_color(color: [u8; 4]) -> String {
    format!("#{:02x}{:02x}{:02x}", color[0], color[1], color[2])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_dimensions() {
        assert!(validate_dimensions(100, 100).is_ok());
        assert_eq!(
            validate_dimensions(0, 10),
            Err(SurfaceError::InvalidDimensions { width: 0, height: 10 })
        );
        assert!(matches!(
            validate_dimensions(MAX_CANVAS_SIZE + 1, 10),
            Err(SurfaceError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#000000"), Ok([0, 0, 0, 255]));
        assert_eq!(parse_hex_color("#ff8000"), Ok([255, 128, 0, 255]));
        assert_eq!(parse_hex_color(" #11223344 "), Ok([0x11, 0x22, 0x33, 0x44]));
        assert!(matches!(parse_hex_color("ff0000"), Err(ColorParseError::Format(_))));
        assert!(matches!(parse_hex_color("#fff"), Err(ColorParseError::Format(_))));
        assert!(matches!(parse_hex_color("#gg0000"), Err(ColorParseError::Digits(_))));
        assert_eq!(to_hex_color([255, 128, 0, 255]), "#ff8000");
    }

    #[test]
    fn test_clamp_line_width() {
        assert_eq!(clamp_line_width(0.0), 1.0);
        assert_eq!(clamp_line_width(12.0), 12.0);
        assert_eq!(clamp_line_width(500.0), 100.0);
        assert_eq!(clamp_line_width(f32::NAN), 1.0);
    }
}
