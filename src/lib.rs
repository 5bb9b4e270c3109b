//! Identification and validation of CD-ROM game disc images.
//!
//! A game is presented as one disc image or as an `.m3u` playlist of several images. Once the
//! images are opened in a [`DiscSet`] this crate can:
//!
//! - compute the layout hash, an MD5 of the table of contents of every disc;
//! - compute the content identity, an MD5 of the table of contents plus the first 512 sectors
//!   of every disc, along with a first-disc-only variant and the short game id found in the
//!   boot sector;
//! - detect the region of a Saturn disc from its system area;
//! - check that the Q subchannel timecodes of the image agree with the LBA of each sector.
//!
//! The image readers themselves live behind the [`DiscReader`] trait, a couple of simple
//! backends are provided in [`formats`].

#![warn(missing_docs)]

#[macro_use]
extern crate arrayref;

pub use bcd::Bcd;
pub use content::{load_content, LoadedContent};
pub use disc_set::DiscSet;
pub use game_id::ContentIdentity;
pub use layout::DiscHash;
pub use msf::Msf;
pub use region::{Area, RegionDetector, RegionMask};
pub use toc::{DiscType, Toc, TrackSlot};

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod bcd;
pub mod content;
pub mod crc;
pub mod disc_set;
pub mod formats;
pub mod game_id;
pub mod host;
pub mod layout;
pub mod msf;
pub mod playlist;
pub mod region;
pub mod subchannel;
pub mod toc;
pub mod validate;

#[cfg(test)]
mod testing;

/// Size of the user data area of a CD-ROM Mode 1 (or Mode 2 Form 1) sector
pub const SECTOR_SIZE: usize = 2048;

/// Size of a full raw sector, without subchannel data
pub const RAW_SECTOR_SIZE: usize = 2352;

/// Size of the interleaved P-W subchannel data attached to every sector
pub const SUBCHANNEL_SIZE: usize = 96;

/// Abstract read-only interface to an opened disc image
pub trait DiscReader: Send {
    /// Return a string identifying the image format in a human-readable way.
    fn image_format(&self) -> String;

    /// Get the table of contents
    fn toc(&self) -> &Toc;

    /// Read `count` consecutive sectors starting at `lba` into `buf`, 2048 bytes of user data
    /// per sector. `buf` must be at least `count * SECTOR_SIZE` bytes long. Returns the number
    /// of sectors actually read.
    fn read_sectors(&mut self, buf: &mut [u8], lba: u32, count: u32) -> CdResult<u32>;

    /// Read the raw, interleaved P-W subchannel data of the sector at `lba`
    fn read_raw_subchannel(&mut self, lba: u32, buf: &mut [u8; SUBCHANNEL_SIZE])
        -> CdResult<()>;
}

/// Something able to turn a path into an opened [`DiscReader`].
pub trait DiscOpener {
    /// Open the disc image at `path`
    fn open(&mut self, path: &Path) -> CdResult<Box<dyn DiscReader>>;
}

impl<F> DiscOpener for F
where
    F: FnMut(&Path) -> CdResult<Box<dyn DiscReader>>,
{
    fn open(&mut self, path: &Path) -> CdResult<Box<dyn DiscReader>> {
        self(path)
    }
}

/// Error type for disc operations.
#[allow(missing_docs)]
#[derive(Error, Debug)]
pub enum CdError {
    #[error("Generic I/O error")]
    IoError(#[from] io::Error),
    #[error("Unexpected or corrupted image format `{path}`|{line}: {desc}")]
    ParseError {
        path: PathBuf,
        line: u32,
        desc: String,
    },
    #[error("Disc format error in file `{path}`: {desc}")]
    BadImage { path: PathBuf, desc: String },
    #[error("Playlist `{0}` references itself")]
    PlaylistSelfReference(PathBuf),
    #[error("Playlist recursion too deep while loading `{0}`")]
    PlaylistTooDeep(PathBuf),
    #[error("Disc {0} could not be opened")]
    MissingDisc(usize),
    #[error("Fewer sectors than requested could be read")]
    ShortRead,
    #[error("No disc to load")]
    NoDisc,
    #[error("Format missmatch, for instance when reading CD-ROM user data on an audio track")]
    BadFormat,
    /// `disc` is the disc number, starting at 1
    #[error("Disc {disc}: time mismatch at LBA {lba} ({expected}), Q subchannel: {found}")]
    SubchannelMismatch {
        disc: usize,
        lba: u32,
        expected: String,
        found: String,
    },
    /// `disc` is the disc number, starting at 1
    #[error("Disc {disc}: error reading the subchannel of the sector at LBA {lba}")]
    SubchannelRead {
        disc: usize,
        lba: u32,
        #[source]
        source: Box<CdError>,
    },
    /// `disc` is the disc number, starting at 1
    #[error("Disc {disc}: no valid Q subchannel current position data at LBA {start}-{end}")]
    NoSubchannelPosition { disc: usize, start: u32, end: u32 },
    #[error("Attempted to access an invalid track number")]
    BadTrack,
    #[error("Attempted to access a sector past the end of the CD")]
    LeadOut,
    #[error("Invalid MSF")]
    InvalidMsf,
    #[error("Unsupported format or operation")]
    Unsupported,
    #[error("Empty table of contents")]
    EmptyToc,
}

/// Convenience type alias for a `Result<R, CdError>`
pub type CdResult<R> = std::result::Result<R, CdError>;

#[test]
fn cderror_display() {
    // Make sure that CdError implements Display. This should be true if we set an
    // `#[error("...")]` for every variant
    println!("{}", CdError::BadTrack);
    println!(
        "{}",
        CdError::NoSubchannelPosition {
            disc: 1,
            start: 150,
            end: 181
        }
    );
}
