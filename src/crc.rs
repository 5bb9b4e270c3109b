//! CRC-16 used to protect the Q subchannel.
//!
//! The Q subchannel uses the CCITT polynomial `x^16 + x^12 + x^5 + 1` with an initial value
//! of 0. The CRC is stored inverted at the end of the 12 bytes of Q data, most significant
//! byte first (see section 22.3.5 of ECMA-130).

const POLY: u16 = 0x1021;

/// Lookup table for the byte-at-a-time computation
const TABLE: [u16; 256] = {
    let mut table = [0u16; 256];
    let mut i = 0;

    while i < 256 {
        let mut crc = (i as u16) << 8;
        let mut bit = 0;

        while bit < 8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ POLY
            } else {
                crc << 1
            };
            bit += 1;
        }

        table[i] = crc;
        i += 1;
    }

    table
};

/// Compute the CRC of `data` as stored in the Q subchannel (that is, already inverted)
pub fn crc16(data: &[u8]) -> u16 {
    let crc = data.iter().fold(0u16, |crc, &b| {
        TABLE[((crc >> 8) as u8 ^ b) as usize] ^ (crc << 8)
    });

    !crc
}

#[test]
fn known_values() {
    // CRC-16/XMODEM check value, inverted
    assert_eq!(crc16(b"123456789"), !0x31c3);
    assert_eq!(crc16(&[]), 0xffff);
}
