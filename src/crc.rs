//! CRC-16/MODBUS checksums, bit-exact with the EZT-570i.
//!
//! Polynomial 0xA001 (0x8005 reflected), initial register 0xFFFF, no final
//! XOR. The two checksum bytes trail every frame low byte first, even though
//! all other multi-byte fields in the protocol are big-endian.

/// Precomputed remainders for every interim byte value.
pub static LOOKUP_TABLE: [u16; 256] = build_table();

const fn build_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut byte = 0;
    while byte < 256 {
        let mut crc = byte as u16;
        let mut round = 0;
        while round < 8 {
            crc = if crc & 1 != 0 { (crc >> 1) ^ 0xA001 } else { crc >> 1 };
            round += 1;
        }
        table[byte] = crc;
        byte += 1;
    }
    table
}

pub fn checksum(data: &[u8]) -> u16 {
    data.iter().fold(0xFFFF, |crc, &byte| {
        (crc >> 8) ^ LOOKUP_TABLE[usize::from((crc ^ u16::from(byte)) & 0xFF)]
    })
}

/// Appends the checksum of the bytes accumulated so far, low byte first.
pub fn append(frame: &mut Vec<u8>) {
    let crc = checksum(frame);
    frame.extend_from_slice(&crc.to_le_bytes());
}

/// True if the frame ends with the checksum of everything preceding it.
///
/// Frames too short to carry the two-byte trailer are never valid.
pub fn validate(frame: &[u8]) -> bool {
    let Some((data, trailer)) = frame.split_last_chunk::<2>() else {
        return false;
    };
    checksum(data).to_le_bytes() == *trailer
}
