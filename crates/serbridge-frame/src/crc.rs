//! CRC-16/X-25 frame check sequence.
//!
//! Reflected CCITT polynomial (0x8408), initial value 0xFFFF, final XOR
//! 0xFFFF. This is the FCS used by PPP and HDLC.

const POLY: u16 = 0x8408;
const INIT: u16 = 0xFFFF;
const XOR_OUT: u16 = 0xFFFF;

/// Compute the CRC-16/X-25 of `data`.
pub fn crc16(data: &[u8]) -> u16 {
    let mut fcs = INIT;
    for &byte in data {
        fcs ^= u16::from(byte);
        for _ in 0..8 {
            if fcs & 1 != 0 {
                fcs = (fcs >> 1) ^ POLY;
            } else {
                fcs >>= 1;
            }
        }
    }
    fcs ^ XOR_OUT
}
