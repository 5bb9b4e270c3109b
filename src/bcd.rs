//! The CD format uses binary-coded decimal (BCD) extensively: track numbers in the table of
//! contents and every timecode in the Q subchannel are stored this way.

use std::fmt;
use std::str::FromStr;

/// A single packed BCD value in the range 0-99 (2 digits, 4bits per digit).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bcd(u8);

impl Bcd {
    /// BCD for 0
    pub const ZERO: Bcd = Bcd(0);

    /// BCD for 1
    pub const ONE: Bcd = Bcd(1);

    /// BCD for 99
    pub const MAX: Bcd = Bcd(0x99);

    /// Every valid BCD value, indexed by its binary value
    pub const TABLE: [Bcd; 100] = {
        let mut table = [Bcd(0); 100];
        let mut i = 0;

        while i < 100 {
            table[i] = Bcd((((i / 10) << 4) | (i % 10)) as u8);
            i += 1;
        }

        table
    };

    /// Build a `Bcd` from an `u8` in BCD format. Returns `None` if the value provided is not
    /// valid BCD.
    pub const fn from_bcd(b: u8) -> Option<Bcd> {
        if b <= 0x99 && (b & 0xf) <= 0x9 {
            Some(Bcd(b))
        } else {
            None
        }
    }

    /// Build a `Bcd` from a binary `u8`. Returns `None` if the value is greater than 99.
    pub const fn from_binary(b: u8) -> Option<Bcd> {
        if b > 99 {
            None
        } else {
            Some(Bcd::TABLE[b as usize])
        }
    }

    /// Returns the BCD as an u8
    pub const fn bcd(self) -> u8 {
        self.0
    }

    /// Convert the BCD as a binary byte
    pub const fn binary(self) -> u8 {
        let b = self.0;

        (b >> 4) * 10 + (b & 0xf)
    }
}

impl FromStr for Bcd {
    type Err = crate::CdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let b = u8::from_str(s).map_err(|_| crate::CdError::InvalidMsf)?;

        Bcd::from_binary(b).ok_or(crate::CdError::InvalidMsf)
    }
}

impl fmt::Display for Bcd {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:02x}", self.0)
    }
}

impl fmt::Debug for Bcd {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

#[test]
fn conversions() {
    assert_eq!(Bcd::from_bcd(0x42), Some(Bcd(0x42)));
    assert_eq!(Bcd::from_bcd(0x1a), None);
    assert_eq!(Bcd::from_bcd(0xf2), None);

    assert_eq!(Bcd::from_binary(0), Some(Bcd::ZERO));
    assert_eq!(Bcd::from_binary(42), Some(Bcd(0x42)));
    assert_eq!(Bcd::from_binary(99), Some(Bcd::MAX));
    assert_eq!(Bcd::from_binary(100), None);

    for b in 0..100u8 {
        assert_eq!(Bcd::TABLE[b as usize].binary(), b);
    }
}

#[test]
fn from_str() {
    assert_eq!(Bcd::from_str("04").unwrap(), Bcd(4));
    assert_eq!(Bcd::from_str("99").unwrap(), Bcd(0x99));

    assert!(Bcd::from_str("ab").is_err());
    assert!(Bcd::from_str("100").is_err());
    assert!(Bcd::from_str("-2").is_err());
}
