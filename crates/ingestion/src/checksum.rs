//! 16-bit CRC used to recognise content that has already been forwarded.

use crc::{Crc, CRC_16_IBM_3740};

/// CRC-16/CCITT-FALSE (poly 0x1021, init 0xFFFF, no reflection, no final xor).
const CCITT: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_3740);

pub fn crc_ccitt(data: &[u8]) -> u16 {
    CCITT.checksum(data)
}
