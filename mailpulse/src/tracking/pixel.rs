//! The tracking pixel

/// `Content-Type` of [`PIXEL_GIF`]
pub const PIXEL_CONTENT_TYPE: &str = "image/gif";

/// Transparent 1x1 GIF89a
pub const PIXEL_GIF: [u8; 43] = [
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x01, 0x00, 0x00, 0x00,
    0x00, 0xFF, 0xFF, 0xFF, 0x21, 0xF9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00, 0x00,
    0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x44, 0x01, 0x00, 0x3B,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_is_a_1x1_gif() {
        assert_eq!(&PIXEL_GIF[..6], b"GIF89a");
        assert_eq!(u16::from_le_bytes([PIXEL_GIF[6], PIXEL_GIF[7]]), 1);
        assert_eq!(u16::from_le_bytes([PIXEL_GIF[8], PIXEL_GIF[9]]), 1);
        assert_eq!(PIXEL_GIF.last(), Some(&0x3B));
    }
}
