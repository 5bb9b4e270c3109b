//! Subchannel data interface.
//!
//! The subchannel data (sometimes called subcode or control bytes) is stored alongside each
//! sector on the CD. There are 8 subchannels named P, Q, R, S, T, U, V and W. Each of them
//! contain 12 bytes of data per sector for a total of 96bytes of subchannel data per sector.
//!
//! Raw images store the 96 bytes interleaved: every byte holds one bit of each subchannel,
//! P in bit 7 down to W in bit 0. Only the Q subchannel is decoded here, it carries the
//! timing information we use to check that an image was ripped correctly.
//!
//! The subchannel data is not protected by the error correction code in CD-ROMs so it's more
//! likely to be corrupted than regular data, a CRC is used to detect bad Q data.
//!
//! For more details see section 22 of [ECMA-130]
//! (http://www.ecma-international.org/publications/files/ECMA-ST/Ecma-130.pdf)

use std::fmt;

use crate::bcd::Bcd;
use crate::crc::crc16;
use crate::msf::Msf;
use crate::toc::CONTROL_DATA;
use crate::SUBCHANNEL_SIZE;

/// Q subchannel ADR for "current position" data (mode 1 outside of the lead-in)
pub const ADR_CURPOS: u8 = 1;

/// Track number stored in the Q subchannel of lead-out sectors
pub const LEAD_OUT_TRACK_BYTE: u8 = 0xaa;

/// Bit holding the Q subchannel in each interleaved byte
const Q_BIT: u8 = 0x40;

/// The 12 bytes of Q subchannel data of one sector.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Q {
    bytes: [u8; 12],
}

impl Q {
    /// Create a Q instance from 12 bytes of subchannel data.
    pub fn new(raw: [u8; 12]) -> Q {
        Q { bytes: raw }
    }

    /// Extract the Q subchannel out of 96 bytes of interleaved P-W data
    pub fn from_pw(pw: &[u8; SUBCHANNEL_SIZE]) -> Q {
        let mut bytes = [0u8; 12];

        for (i, &b) in pw.iter().enumerate() {
            let bit = (b & Q_BIT) >> 6;

            bytes[i >> 3] |= bit << (7 - (i & 7));
        }

        Q { bytes }
    }

    /// Interleave this Q data back into a 96 byte P-W block. Every other subchannel is left
    /// empty.
    pub fn to_pw(&self) -> [u8; SUBCHANNEL_SIZE] {
        let mut pw = [0u8; SUBCHANNEL_SIZE];

        for (i, b) in pw.iter_mut().enumerate() {
            let bit = (self.bytes[i >> 3] >> (7 - (i & 7))) & 1;

            *b = bit << 6;
        }

        pw
    }

    /// Build a "current position" Q, including a valid CRC. `control` is the 4bit control
    /// field of the track, `track_msf` is relative to the track's index 01 and `disc_msf` is
    /// the absolute position of the sector.
    pub fn current_position(
        control: u8,
        track: Bcd,
        index: Bcd,
        track_msf: Msf,
        disc_msf: Msf,
    ) -> Q {
        let mut bytes = [0u8; 12];

        bytes[0] = (control << 4) | ADR_CURPOS;
        bytes[1] = track.bcd();
        bytes[2] = index.bcd();
        bytes[3..6].copy_from_slice(&track_msf.to_bcd_bytes());
        bytes[6] = 0;
        bytes[7..10].copy_from_slice(&disc_msf.to_bcd_bytes());

        let crc = crc16(&bytes[..10]);
        bytes[10] = (crc >> 8) as u8;
        bytes[11] = crc as u8;

        Q { bytes }
    }

    /// Build the current position Q of a lead-out sector. The track number is 0xAA, which
    /// isn't valid BCD, `track_msf` counts from the start of the lead-out.
    pub fn lead_out(control: u8, track_msf: Msf, disc_msf: Msf) -> Q {
        let mut q = Q::current_position(control, Bcd::ONE, Bcd::ONE, track_msf, disc_msf);

        q.bytes[1] = LEAD_OUT_TRACK_BYTE;

        let crc = crc16(&q.bytes[..10]);
        q.bytes[10] = (crc >> 8) as u8;
        q.bytes[11] = crc as u8;

        q
    }

    /// Return the raw 12 bytes of subchannel data
    pub fn raw(&self) -> &[u8; 12] {
        &self.bytes
    }

    /// The ADR field, or Q mode. Mode 1 is used to store the table of content in the lead-in
    /// and timing information elsewhere.
    pub fn adr(&self) -> u8 {
        self.bytes[0] & 0xf
    }

    /// The 4bit control field
    pub fn control(&self) -> u8 {
        self.bytes[0] >> 4
    }

    /// Return true if this is a data track.
    pub fn is_data(&self) -> bool {
        self.control() & CONTROL_DATA != 0
    }

    /// Return the 16bit CRC stored at the end of the subchannel data.
    pub fn crc(&self) -> u16 {
        let msb = self.bytes[10] as u16;
        let lsb = self.bytes[11] as u16;

        (msb << 8) | lsb
    }

    /// Return true if the stored CRC matches the data
    pub fn crc_ok(&self) -> bool {
        crc16(&self.bytes[..10]) == self.crc()
    }

    /// True if the CRC is valid and this Q holds current position data
    pub fn is_current_position(&self) -> bool {
        self.crc_ok() && self.adr() == ADR_CURPOS
    }

    /// Absolute MSF bytes (AMIN, ASEC, AFRAME), exactly as stored
    pub fn absolute_msf_raw(&self) -> [u8; 3] {
        [self.bytes[7], self.bytes[8], self.bytes[9]]
    }

    /// Absolute MSF of this sector, `None` if the stored value isn't valid BCD
    pub fn absolute_msf(&self) -> Option<Msf> {
        let [m, s, f] = self.absolute_msf_raw();

        Msf::from_bcd(m, s, f)
    }
}

impl fmt::Debug for Q {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Q[")?;

        for b in &self.bytes {
            write!(f, " {:02x}", b)?;
        }

        write!(f, " ]")
    }
}
