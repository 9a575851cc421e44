//! Little-endian integer codec for on-disk fields

/// Decode a little-endian u32 from a 4-byte window
pub fn decode_u32(window: &[u8; 4]) -> u32 {
    u32::from(window[0])
        | u32::from(window[1]) << 8
        | u32::from(window[2]) << 16
        | u32::from(window[3]) << 24
}

/// Encode `value` as little-endian into a 4-byte window
pub fn encode_u32(value: u32, window: &mut [u8; 4]) {
    window[0] = (value & 0xFF) as u8;
    window[1] = (value >> 8 & 0xFF) as u8;
    window[2] = (value >> 16 & 0xFF) as u8;
    window[3] = (value >> 24 & 0xFF) as u8;
}
