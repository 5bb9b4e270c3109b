//! Disc image backends.
//!
//! These are simple readers implementing [`DiscReader`] for the most common dump formats. None
//! of them store subchannel data, the Q subchannel is rebuilt on the fly from the ToC.

use std::path::{Path, PathBuf};

use crate::bcd::Bcd;
use crate::msf::Msf;
use crate::subchannel::Q;
use crate::toc::{Toc, LEAD_OUT_TRACK};
use crate::{CdError, CdResult, DiscReader};

pub mod cue;
pub mod iso;

/// Open `path` with the backend matching its extension: `.cue` for BIN/CUE images and `.iso`
/// for cooked 2048 byte per sector images.
pub fn open_image(path: &Path) -> CdResult<Box<dyn DiscReader>> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase());

    match ext.as_deref() {
        Some("cue") => Ok(Box::new(cue::Cue::new(path)?)),
        Some("iso") => Ok(Box::new(iso::Iso::new(path)?)),
        _ => Err(CdError::Unsupported),
    }
}

/// Build the "current position" Q subchannel of the sector at `lba` from the ToC, the way a
/// correctly mastered disc would have it. Past the end of the last track the lead-out Q is
/// returned, its absolute MSF keeps counting.
pub fn synthesize_q(toc: &Toc, lba: u32) -> CdResult<Q> {
    let disc_msf = Msf::from_lba(lba).ok_or(CdError::InvalidMsf)?;
    let lead_out = toc.lead_out_lba();

    if lba >= lead_out {
        let control = toc.tracks[LEAD_OUT_TRACK as usize].control;
        let track_msf = Msf::from_sector_index(lba - lead_out).ok_or(CdError::InvalidMsf)?;

        return Ok(Q::lead_out(control, track_msf, disc_msf));
    }

    let (track_no, track) = toc
        .track_range()
        .filter(|(_, t)| t.valid && t.lba <= lba)
        .last()
        .ok_or(CdError::BadTrack)?;

    let track_no = Bcd::from_binary(track_no).ok_or(CdError::BadTrack)?;
    let track_msf = Msf::from_sector_index(lba - track.lba).ok_or(CdError::InvalidMsf)?;

    Ok(Q::current_position(
        track.control,
        track_no,
        Bcd::ONE,
        track_msf,
        disc_msf,
    ))
}

/// Build a PathBuf from a byte buffer. If the buffer doesn't contain a valid Path encoding
/// return `None`.
#[cfg(unix)]
pub(crate) fn build_path(bytes: &[u8]) -> Option<PathBuf> {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    // On unix the path is an arbitrary byte string
    Some(PathBuf::from(OsStr::from_bytes(bytes)))
}

/// Build a PathBuf from a byte buffer. If the buffer doesn't contain a valid Path encoding
/// return `None`.
#[cfg(not(unix))]
pub(crate) fn build_path(bytes: &[u8]) -> Option<PathBuf> {
    // Elsewhere assume that the path is utf-8 encoded
    let s = std::str::from_utf8(bytes).ok()?;

    Some(PathBuf::from(s))
}
