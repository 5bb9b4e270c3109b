//! Compact discs were originally meant for storing music so positions on the disc are stored
//! in "minute:second:frame" format, where frame means sector.
//!
//! There are 75 frames/sectors in a second, 60 seconds in a minute. All three components are
//! stored as BCD.
//!
//! The absolute MSF of a sector is offset by two seconds (150 sectors) relative to its LBA:
//! LBA 0 is at 00:02:00, right after the mandatory pregap of the first track.

use std::fmt;
use std::str::FromStr;

use crate::bcd::Bcd;
use crate::CdError;

/// Number of sectors between MSF 00:00:00 and LBA 0
pub const LBA_OFFSET: u32 = 150;

const FRAMES_PER_SECOND: u32 = 75;
const FRAMES_PER_MINUTE: u32 = 60 * FRAMES_PER_SECOND;

/// Number of sectors addressable with an MSF, up to 99:59:74
const MSF_SECTORS: u32 = 100 * FRAMES_PER_MINUTE;

/// CD "minute:second:frame" timestamp, stored as BCD like on the disc
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Msf {
    m: Bcd,
    s: Bcd,
    f: Bcd,
}

impl Msf {
    /// MSF for 00:00:00
    pub const ZERO: Msf = Msf {
        m: Bcd::ZERO,
        s: Bcd::ZERO,
        f: Bcd::ZERO,
    };

    /// Build an MSF from three BCD bytes as found in the Q subchannel. Returns `None` if one
    /// of them isn't valid BCD or if the seconds or frames are out of range.
    pub const fn from_bcd(m: u8, s: u8, f: u8) -> Option<Msf> {
        // `?` isn't usable in const fns
        let (m, s, f) = match (Bcd::from_bcd(m), Bcd::from_bcd(s), Bcd::from_bcd(f)) {
            (Some(m), Some(s), Some(f)) => (m, s, f),
            _ => return None,
        };

        if s.binary() >= 60 || f.binary() >= 75 {
            return None;
        }

        Some(Msf { m, s, f })
    }

    /// The three components as BCD bytes, in the order they're stored on the disc
    pub const fn to_bcd_bytes(self) -> [u8; 3] {
        [self.m.bcd(), self.s.bcd(), self.f.bcd()]
    }

    /// Number of sectors between 00:00:00 and this MSF
    pub const fn sector_index(self) -> u32 {
        self.m.binary() as u32 * FRAMES_PER_MINUTE
            + self.s.binary() as u32 * FRAMES_PER_SECOND
            + self.f.binary() as u32
    }

    /// Inverse of `sector_index`, `None` past 99:59:74
    pub const fn from_sector_index(si: u32) -> Option<Msf> {
        if si >= MSF_SECTORS {
            return None;
        }

        let m = si / FRAMES_PER_MINUTE;
        let s = (si % FRAMES_PER_MINUTE) / FRAMES_PER_SECOND;
        let f = si % FRAMES_PER_SECOND;

        Some(Msf {
            m: Bcd::TABLE[m as usize],
            s: Bcd::TABLE[s as usize],
            f: Bcd::TABLE[f as usize],
        })
    }

    /// Absolute MSF of the sector at `lba`
    pub const fn from_lba(lba: u32) -> Option<Msf> {
        if lba >= MSF_SECTORS - LBA_OFFSET {
            return None;
        }

        Msf::from_sector_index(lba + LBA_OFFSET)
    }

    /// LBA of the sector at this absolute MSF, `None` within the first two seconds
    pub const fn to_lba(self) -> Option<u32> {
        self.sector_index().checked_sub(LBA_OFFSET)
    }

    /// Computes `self - rhs`, returning `None` if the result would be negative
    pub fn checked_sub(self, rhs: Msf) -> Option<Msf> {
        let si = self.sector_index().checked_sub(rhs.sector_index())?;

        Msf::from_sector_index(si)
    }
}

impl fmt::Display for Msf {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}:{}:{}", self.m, self.s, self.f)
    }
}

impl fmt::Debug for Msf {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "Msf({})", self)
    }
}

/// Parse "mm:ss:ff", as found in CUE sheets
impl FromStr for Msf {
    type Err = CdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();

        let [m, s, f] = parts.as_slice() else {
            return Err(CdError::InvalidMsf);
        };

        let m = Bcd::from_str(m)?;
        let s = Bcd::from_str(s)?;
        let f = Bcd::from_str(f)?;

        Msf::from_bcd(m.bcd(), s.bcd(), f.bcd()).ok_or(CdError::InvalidMsf)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn lba_offset() {
        assert_eq!(Msf::from_lba(0), Msf::from_bcd(0x00, 0x02, 0x00));
        assert_eq!(Msf::from_lba(74), Msf::from_bcd(0x00, 0x02, 0x74));
        assert_eq!(Msf::from_lba(75), Msf::from_bcd(0x00, 0x03, 0x00));
        assert_eq!(Msf::from_lba(4350), Msf::from_bcd(0x01, 0x00, 0x00));
        assert_eq!(
            Msf::from_lba(MSF_SECTORS - LBA_OFFSET - 1),
            Msf::from_bcd(0x99, 0x59, 0x74)
        );
        assert_eq!(Msf::from_lba(MSF_SECTORS - LBA_OFFSET), None);

        let m = Msf::from_bcd(0x12, 0x34, 0x56).unwrap();
        assert_eq!(Msf::from_lba(m.to_lba().unwrap()), Some(m));
        assert_eq!(Msf::from_bcd(0x00, 0x01, 0x74).unwrap().to_lba(), None);
    }

    #[test]
    fn bcd_bytes() {
        let m = Msf::from_lba(16_224).unwrap();

        assert_eq!(m.to_bcd_bytes(), [0x03, 0x38, 0x24]);
        assert_eq!(m.to_string(), "03:38:24");

        assert_eq!(Msf::from_bcd(0x00, 0x60, 0x00), None);
        assert_eq!(Msf::from_bcd(0x00, 0x00, 0x75), None);
        assert_eq!(Msf::from_bcd(0x0a, 0x00, 0x00), None);
    }

    #[test]
    fn subtraction() {
        let m = Msf::from_bcd(0x12, 0x34, 0x01).unwrap();
        let n = Msf::from_bcd(0x00, 0x52, 0x10).unwrap();

        assert_eq!(m.checked_sub(n), Msf::from_bcd(0x11, 0x41, 0x66));
        assert_eq!(n.checked_sub(m), None);
    }

    #[test]
    fn from_str() {
        assert_eq!(
            Msf::from_str("01:02:03").unwrap(),
            Msf::from_bcd(0x01, 0x02, 0x03).unwrap()
        );
        assert_eq!(
            Msf::from_str("99:59:74").unwrap(),
            Msf::from_bcd(0x99, 0x59, 0x74).unwrap()
        );

        assert!(Msf::from_str("00:00").is_err());
        assert!(Msf::from_str("00:00:00:00").is_err());
        assert!(Msf::from_str("00:60:00").is_err());
        assert!(Msf::from_str("00:00:75").is_err());
    }
}
