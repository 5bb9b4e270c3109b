//! Region detection for Saturn discs.
//!
//! The system area at the start of a Saturn disc begins with the `"SEGA SEGASATURN "` hardware
//! identifier and contains a standard boot code blob which we check byte for byte by comparing
//! its SHA-256. The 16 bytes at offset 0x40 list the compatible area symbols (`"JTUBKAEL"`).

use bitflags::bitflags;
use log::{debug, info};
use sha2::{Digest, Sha256};

use crate::disc_set::DiscSet;
use crate::SECTOR_SIZE;

/// Number of sectors read at the start of the first disc
pub const SYSTEM_AREA_SECTORS: u32 = 16;

/// Location and length of the boot code covered by the digest
const BOOT_CODE_OFFSET: usize = 0x100;
const BOOT_CODE_LEN: usize = 0xD00;

/// Location and length of the area symbols
const AREA_SYMBOLS_OFFSET: usize = 0x40;
const AREA_SYMBOLS_LEN: usize = 16;

/// Saturn area codes, as used by the SMPC
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Area {
    /// Japan
    Japan = 0x1,
    /// Asia NTSC (Taiwan, Philippines)
    AsiaNtsc = 0x2,
    /// North America NTSC
    NorthAmerica = 0x4,
    /// Central and South America NTSC (Brazil)
    CentralSouthAmericaNtsc = 0x5,
    /// Korea
    Korea = 0x6,
    /// Asia PAL
    AsiaPal = 0xA,
    /// Europe PAL
    EuropePal = 0xC,
    /// Central and South America PAL
    CentralSouthAmericaPal = 0xD,
}

impl Area {
    /// Numeric area code
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Bit for this area in a `RegionMask`
    pub fn mask(self) -> RegionMask {
        RegionMask::from_bits_truncate(1 << self.code())
    }
}

bitflags! {
    /// Set of areas a disc claims to be compatible with. Bit `n` stands for area code `n`.
    #[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
    pub struct RegionMask: u16 {
        /// Japan
        const JAPAN = 1 << 0x1;
        /// Asia NTSC
        const ASIA_NTSC = 1 << 0x2;
        /// North America
        const NORTH_AMERICA = 1 << 0x4;
        /// Central and South America NTSC
        const CSA_NTSC = 1 << 0x5;
        /// Korea
        const KOREA = 1 << 0x6;
        /// Asia PAL
        const ASIA_PAL = 1 << 0xA;
        /// Europe PAL
        const EUROPE_PAL = 1 << 0xC;
        /// Central and South America PAL
        const CSA_PAL = 1 << 0xD;
    }
}

/// One entry of the area symbol table
#[derive(Copy, Clone, Debug)]
pub struct RegionTag {
    /// Symbol found in the system area
    pub tag: u8,
    /// Human readable name, used in the logs
    pub name: &'static str,
    /// Matching area
    pub area: Area,
}

const fn tag(tag: u8, name: &'static str, area: Area) -> RegionTag {
    RegionTag { tag, name, area }
}

/// Known area symbols, in order of preference when a disc supports several areas. Several
/// symbols map to the same area.
pub const REGION_TAGS: [RegionTag; 11] = [
    tag(b'U', "USA", Area::NorthAmerica),
    tag(b'J', "Japan", Area::Japan),
    tag(b'K', "Korea", Area::Korea),
    tag(b'E', "Europe", Area::EuropePal),
    tag(b'E', "Germany", Area::EuropePal),
    tag(b'E', "France", Area::EuropePal),
    tag(b'E', "Spain", Area::EuropePal),
    tag(b'B', "Brazil", Area::CentralSouthAmericaNtsc),
    tag(b'T', "Asia_NTSC", Area::AsiaNtsc),
    tag(b'A', "Asia_PAL", Area::AsiaPal),
    tag(b'L', "CSA_PAL", Area::CentralSouthAmericaPal),
];

/// Build the mask of every area listed in `symbols`. Unknown symbols are ignored.
pub fn mask_from_tags(symbols: &[u8]) -> RegionMask {
    let mut mask = RegionMask::empty();

    for &s in symbols {
        if let Some(t) = REGION_TAGS.iter().find(|t| t.tag == s) {
            mask |= t.area.mask();
        }
    }

    mask
}

/// Return the preferred area in `mask`, if any
pub fn preferred_area(mask: RegionMask) -> Option<Area> {
    let t = REGION_TAGS.iter().find(|t| mask.contains(t.area.mask()))?;

    info!("Disc Region: \"{}\"", t.name);

    Some(t.area)
}

/// Recognizes a system area and extracts its area symbols
#[derive(Clone, Debug)]
pub struct RegionDetector {
    /// Identifier expected at the very start of the disc
    signature: [u8; 16],
    /// SHA-256 of the `0xD00` bytes at offset `0x100`
    boot_code_sha256: [u8; 32],
}

impl RegionDetector {
    /// Build a detector for an arbitrary signature and boot code digest
    pub fn new(signature: [u8; 16], boot_code_sha256: [u8; 32]) -> RegionDetector {
        RegionDetector {
            signature,
            boot_code_sha256,
        }
    }

    /// Detector for Sega Saturn discs
    pub fn saturn() -> RegionDetector {
        RegionDetector::new(
            *b"SEGA SEGASATURN ",
            [
                0x96, 0xb8, 0xea, 0x48, 0x81, 0x9c, 0xfa, 0x58, 0x9f, 0x24, 0xc4, 0x0a, 0xa1, 0x49,
                0xc2, 0x24, 0xc4, 0x20, 0xdc, 0xcf, 0x38, 0xb7, 0x30, 0xf0, 0x01, 0x56, 0xef, 0xe2,
                0x5c, 0x9b, 0xbc, 0x8f,
            ],
        )
    }

    /// Returns true if `system_area` (the first `SYSTEM_AREA_SECTORS` sectors of the disc)
    /// has the expected boot code and signature.
    pub fn is_recognized(&self, system_area: &[u8]) -> bool {
        if system_area.len() < BOOT_CODE_OFFSET + BOOT_CODE_LEN {
            return false;
        }

        let boot_code = &system_area[BOOT_CODE_OFFSET..BOOT_CODE_OFFSET + BOOT_CODE_LEN];

        if Sha256::digest(boot_code)[..] != self.boot_code_sha256[..] {
            return false;
        }

        if system_area[..16] != self.signature {
            return false;
        }

        info!("This is a Saturn disc");

        true
    }

    /// Read the system area of the first disc of `set` and return every area it supports.
    /// Returns `None` if the disc can't be read or isn't recognized, or if none of its area
    /// symbols is known.
    pub fn detect_mask(&self, set: &mut DiscSet) -> Option<RegionMask> {
        let disc = set.disc_mut(0).ok()?;

        let mut system_area = vec![0u8; SYSTEM_AREA_SECTORS as usize * SECTOR_SIZE];

        match disc.read_sectors(&mut system_area, 0, SYSTEM_AREA_SECTORS) {
            Ok(SYSTEM_AREA_SECTORS) => (),
            Ok(n) => {
                debug!("Region detection: only {} sectors could be read", n);
                return None;
            }
            Err(e) => {
                debug!("Region detection: {}", e);
                return None;
            }
        }

        if !self.is_recognized(&system_area) {
            return None;
        }

        let symbols = array_ref![system_area, AREA_SYMBOLS_OFFSET, AREA_SYMBOLS_LEN];
        let mask = mask_from_tags(symbols);

        if mask.is_empty() {
            None
        } else {
            Some(mask)
        }
    }

    /// Detect the preferred area of the first disc of `set`
    pub fn detect(&self, set: &mut DiscSet) -> Option<Area> {
        preferred_area(self.detect_mask(set)?)
    }
}

impl Default for RegionDetector {
    fn default() -> RegionDetector {
        RegionDetector::saturn()
    }
}

/// Detect the area of a Saturn disc set
pub fn detect_region(set: &mut DiscSet) -> Option<Area> {
    RegionDetector::saturn().detect(set)
}
