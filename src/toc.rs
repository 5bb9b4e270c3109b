//! Raw table of contents, as reported by a disc reader.
//!
//! The layout mirrors what a drive returns: a first and last track number and one slot per
//! possible track number, 1 through 99, with slot 100 standing for the lead-out. Only the
//! slots within `first_track..=last_track` and the lead-out are meaningful.
//!
//! The identity hashes feed every field of this structure into MD5 in a fixed order so it must
//! stay byte for byte what the reader reported.

use std::fmt;

use crate::{CdError, CdResult};

/// Control bit marking a data track
pub const CONTROL_DATA: u8 = 0x04;

/// Slot holding the lead-out in `Toc::tracks`
pub const LEAD_OUT_TRACK: u8 = 100;

/// Number of track slots in a `Toc`, slot 0 is unused
pub const TRACK_SLOTS: usize = 101;

/// Possible disc (session) types, stored in the lead-in
#[derive(PartialEq, Eq, Clone, Copy, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DiscType {
    /// CD-DA or CD-ROM
    #[default]
    CdDaOrMode1 = 0x00,
    /// CD-i
    CdI = 0x10,
    /// CD-ROM XA
    CdXa = 0x20,
}

impl DiscType {
    /// Raw value as stored in the ToC
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// One track slot of the ToC
#[derive(PartialEq, Eq, Clone, Copy, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackSlot {
    /// Q subchannel ADR for this track
    pub adr: u8,
    /// 4bit control field, see `CONTROL_DATA`
    pub control: u8,
    /// LBA of index 01
    pub lba: u32,
    /// True if the slot is populated
    pub valid: bool,
}

impl TrackSlot {
    /// Build a populated slot
    pub fn new(adr: u8, control: u8, lba: u32) -> TrackSlot {
        TrackSlot {
            adr,
            control,
            lba,
            valid: true,
        }
    }

    /// Returns true if this is a data track
    pub fn is_data(&self) -> bool {
        self.control & CONTROL_DATA != 0
    }
}

/// Table of contents
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Toc {
    /// Number of the first track
    pub first_track: u8,
    /// Number of the last track
    pub last_track: u8,
    /// Disc type from the lead-in
    pub disc_type: DiscType,
    /// Track slots indexed by track number, `tracks[100]` is the lead-out
    #[cfg_attr(feature = "serde", serde(with = "serde_big_array::BigArray"))]
    pub tracks: [TrackSlot; TRACK_SLOTS],
}

impl Toc {
    /// An empty ToC with no valid slot
    pub fn empty() -> Toc {
        Toc {
            first_track: 1,
            last_track: 1,
            disc_type: DiscType::CdDaOrMode1,
            tracks: [TrackSlot::default(); TRACK_SLOTS],
        }
    }

    /// Build a ToC from `(control, lba)` pairs for consecutive tracks starting at track 01,
    /// followed by the LBA of the lead-out.
    pub fn from_tracks(
        disc_type: DiscType,
        tracks: &[(u8, u32)],
        lead_out: u32,
    ) -> CdResult<Toc> {
        if tracks.is_empty() {
            return Err(CdError::EmptyToc);
        }

        if tracks.len() > 99 {
            return Err(CdError::BadTrack);
        }

        let mut toc = Toc::empty();

        toc.disc_type = disc_type;
        toc.last_track = tracks.len() as u8;

        for (slot, &(control, lba)) in toc.tracks[1..].iter_mut().zip(tracks) {
            *slot = TrackSlot::new(1, control, lba);
        }

        // The lead-out only inherits the data bit of the last track, none of its flags
        let last_control = tracks[tracks.len() - 1].0 & CONTROL_DATA;
        toc.tracks[LEAD_OUT_TRACK as usize] = TrackSlot::new(1, last_control, lead_out);

        Ok(toc)
    }

    /// Return the slot for `track_no` if it's within `first_track..=last_track` or if it's the
    /// lead-out.
    pub fn track(&self, track_no: u8) -> CdResult<&TrackSlot> {
        let in_range = track_no >= self.first_track && track_no <= self.last_track.min(99);

        if in_range || track_no == LEAD_OUT_TRACK {
            Ok(&self.tracks[track_no as usize])
        } else {
            Err(CdError::BadTrack)
        }
    }

    /// Iterate over the `(track_no, slot)` of `first_track..=last_track`
    pub fn track_range(&self) -> impl Iterator<Item = (u8, &TrackSlot)> + '_ {
        let last = self.last_track.min(99);

        (self.first_track..=last).map(move |t| (t, &self.tracks[t as usize]))
    }

    /// LBA of the first sector of the lead-out
    pub fn lead_out_lba(&self) -> u32 {
        self.tracks[LEAD_OUT_TRACK as usize].lba
    }
}

impl Default for Toc {
    fn default() -> Toc {
        Toc::empty()
    }
}

impl fmt::Debug for Toc {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            fmt,
            "ToC: tracks {}-{}, {:?}",
            self.first_track, self.last_track, self.disc_type
        )?;

        for (t, slot) in self.track_range() {
            writeln!(
                fmt,
                " - Track {:2}, LBA: {:6}  {}",
                t,
                slot.lba,
                if slot.is_data() { "DATA" } else { "AUDIO" },
            )?;
        }

        writeln!(fmt, "Leadout: {:6}", self.lead_out_lba())
    }
}
