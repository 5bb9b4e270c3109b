//! BIN/CUE image format implementation
//!
//! The CUE sheet format was created for the CDRWIN burning software.
//!
//! The original format was described in the CDRWIN user guide but many extensions and
//! variations exist. Only single session discs made of `BINARY` files are supported.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use super::synthesize_q;
use crate::toc::Toc;
use crate::{CdError, CdResult, DiscReader, SECTOR_SIZE, SUBCHANNEL_SIZE};

use self::parser::CueParser;

mod parser;

/// An opened CUE sheet along with its BIN files
pub struct Cue {
    /// Every index of the disc, sorted by LBA
    indices: Vec<Index>,
    /// List of all the BIN files referenced in the cue sheet
    bin_files: Vec<File>,
    /// Table of contents
    toc: Toc,
}

impl Cue {
    /// Parse a CUE sheet, open the BIN files and build a `Cue` instance.
    pub fn new(cue_path: &Path) -> CdResult<Cue> {
        CueParser::build_cue(cue_path)
    }

    /// Locate the index containing `lba`
    fn find_index(&self, lba: u32) -> Option<Index> {
        if lba >= self.toc.lead_out_lba() {
            return None;
        }

        let pos = match self.indices.binary_search_by(|index| index.lba.cmp(&lba)) {
            // The LBA matched an index exactly
            Ok(i) => i,
            // Before the first index
            Err(0) => return None,
            // No exact match, the function returns the index of the first element greater
            // than `lba`
            Err(i) => i - 1,
        };

        Some(self.indices[pos])
    }

    fn read_sector(&mut self, buf: &mut [u8], lba: u32) -> CdResult<()> {
        let index = self.find_index(lba).ok_or(CdError::LeadOut)?;

        let data_offset = index.ty.user_data_offset().ok_or(CdError::BadFormat)?;

        match index.storage {
            Storage::PreGap => buf.fill(0),
            Storage::Bin { bin, offset } => {
                let sector_size = index.ty.sector_size() as u64;
                let pos = offset + (lba - index.lba) as u64 * sector_size + data_offset as u64;

                let file = &mut self.bin_files[bin];

                file.seek(SeekFrom::Start(pos))?;
                file.read_exact(buf)?;
            }
        }

        Ok(())
    }
}

impl DiscReader for Cue {
    fn image_format(&self) -> String {
        "CUE".to_string()
    }

    fn toc(&self) -> &Toc {
        &self.toc
    }

    fn read_sectors(&mut self, buf: &mut [u8], lba: u32, count: u32) -> CdResult<u32> {
        if buf.len() < count as usize * SECTOR_SIZE {
            return Err(CdError::ShortRead);
        }

        for (i, sector) in buf.chunks_exact_mut(SECTOR_SIZE).take(count as usize).enumerate() {
            let res = lba
                .checked_add(i as u32)
                .ok_or(CdError::LeadOut)
                .and_then(|lba| self.read_sector(sector, lba));

            match res {
                Ok(()) => (),
                Err(e) if i == 0 => return Err(e),
                Err(_) => return Ok(i as u32),
            }
        }

        Ok(count)
    }

    fn read_raw_subchannel(&mut self, lba: u32, buf: &mut [u8; SUBCHANNEL_SIZE]) -> CdResult<()> {
        *buf = synthesize_q(&self.toc, lba)?.to_pw();

        Ok(())
    }
}

/// Possible track types for a CUE sheet
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum CueTrackType {
    /// CD-DA audio track (red book audio)
    Audio,
    /// CD-ROM Mode1 data, 2048 bytes of user data per sector
    Mode1Data,
    /// CD-ROM Mode1 data with the full 2352 byte sector
    Mode1Raw,
    /// CD-ROM Mode2: sectors without the 16 byte sync and header
    Mode2Headerless,
    /// CD-ROM Mode2 with the full 2352 byte sector
    Mode2Raw,
}

impl CueTrackType {
    fn sector_size(self) -> u32 {
        match self {
            CueTrackType::Audio => 2352,
            CueTrackType::Mode1Data => 2048,
            CueTrackType::Mode1Raw => 2352,
            CueTrackType::Mode2Headerless => 2336,
            CueTrackType::Mode2Raw => 2352,
        }
    }

    /// Offset of the 2048 bytes of user data within a stored sector, `None` for audio
    fn user_data_offset(self) -> Option<u32> {
        match self {
            CueTrackType::Audio => None,
            CueTrackType::Mode1Data => Some(0),
            CueTrackType::Mode1Raw => Some(16),
            // Mode 2 Form 1: after the subheader
            CueTrackType::Mode2Headerless => Some(8),
            CueTrackType::Mode2Raw => Some(24),
        }
    }

    fn is_mode2(self) -> bool {
        matches!(
            self,
            CueTrackType::Mode2Headerless | CueTrackType::Mode2Raw
        )
    }
}

/// Where the data for an index is stored
#[derive(Copy, Clone, Debug)]
enum Storage {
    /// Index is stored in a BIN file: BIN index and byte offset of the index's first sector
    Bin { bin: usize, offset: u64 },
    /// Pregap declared with PREGAP, nothing is stored in the BIN file
    PreGap,
}

/// One index of the disc
#[derive(Copy, Clone, Debug)]
struct Index {
    /// LBA of the first sector of the index
    lba: u32,
    /// Format of the track this index belongs to
    ty: CueTrackType,
    /// Location of the data
    storage: Storage,
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::RAW_SECTOR_SIZE;
    use std::fs;

    fn raw_sectors(count: usize) -> Vec<u8> {
        let mut data = vec![0u8; count * RAW_SECTOR_SIZE];

        for (i, sector) in data.chunks_exact_mut(RAW_SECTOR_SIZE).enumerate() {
            // First byte of the Mode 1 user data
            sector[16] = i as u8;
        }

        data
    }

    #[test]
    fn single_bin() {
        let dir = tempfile::tempdir().unwrap();

        fs::write(dir.path().join("game.bin"), raw_sectors(30)).unwrap();
        fs::write(
            dir.path().join("game.cue"),
            "REM a comment\n\
             FILE \"game.bin\" BINARY\n\
             \x20 TRACK 01 MODE1/2352\n\
             \x20   INDEX 01 00:00:00\n\
             \x20 TRACK 02 AUDIO\n\
             \x20   FLAGS DCP\n\
             \x20   INDEX 00 00:00:20\n\
             \x20   INDEX 01 00:00:22\n",
        )
        .unwrap();

        let mut cue = Cue::new(&dir.path().join("game.cue")).unwrap();
        let toc = cue.toc().clone();

        assert_eq!(toc.last_track, 2);
        assert!(toc.track(1).unwrap().is_data());
        assert_eq!(toc.track(2).unwrap().lba, 22);
        assert_eq!(toc.track(2).unwrap().control, 0x2);
        assert_eq!(toc.lead_out_lba(), 30);

        let mut buf = vec![0u8; 3 * SECTOR_SIZE];
        assert_eq!(cue.read_sectors(&mut buf, 5, 3).unwrap(), 3);
        assert_eq!(buf[0], 5);
        assert_eq!(buf[SECTOR_SIZE], 6);
        assert_eq!(buf[2 * SECTOR_SIZE], 7);

        // The last data sectors are followed by the pregap of the audio track
        assert_eq!(cue.read_sectors(&mut buf, 19, 3).unwrap(), 1);
        assert!(matches!(
            cue.read_sectors(&mut buf, 22, 1),
            Err(CdError::BadFormat)
        ));
        assert!(matches!(
            cue.read_sectors(&mut buf, 30, 1),
            Err(CdError::LeadOut)
        ));
    }

    #[test]
    fn multiple_bins_and_pregap() {
        let dir = tempfile::tempdir().unwrap();

        fs::write(dir.path().join("t1.bin"), vec![0x11u8; 10 * SECTOR_SIZE]).unwrap();
        fs::write(dir.path().join("t2.bin"), vec![0u8; 5 * RAW_SECTOR_SIZE]).unwrap();
        fs::write(
            dir.path().join("game.cue"),
            "FILE t1.bin BINARY\n\
             TRACK 01 MODE1/2048\n\
             INDEX 01 00:00:00\n\
             FILE t2.bin BINARY\n\
             TRACK 02 AUDIO\n\
             PREGAP 00:02:00\n\
             INDEX 01 00:00:00\n",
        )
        .unwrap();

        let mut cue = Cue::new(&dir.path().join("game.cue")).unwrap();

        assert_eq!(cue.toc().track(2).unwrap().lba, 160);
        assert_eq!(cue.toc().lead_out_lba(), 165);

        let mut buf = vec![0u8; SECTOR_SIZE];
        assert_eq!(cue.read_sectors(&mut buf, 9, 1).unwrap(), 1);
        assert_eq!(buf[0], 0x11);

        let mut pw = [0u8; SUBCHANNEL_SIZE];
        cue.read_raw_subchannel(160, &mut pw).unwrap();
        let q = crate::subchannel::Q::from_pw(&pw);
        assert!(q.is_current_position());
        assert_eq!(q.raw()[1], 0x02);
    }

    #[test]
    fn lead_out_drops_flags() {
        let dir = tempfile::tempdir().unwrap();

        fs::write(dir.path().join("game.bin"), raw_sectors(30)).unwrap();
        fs::write(
            dir.path().join("game.cue"),
            "FILE game.bin BINARY\n\
             TRACK 01 MODE1/2352\n\
             INDEX 01 00:00:00\n\
             TRACK 02 AUDIO\n\
             FLAGS DCP PRE\n\
             INDEX 01 00:00:20\n",
        )
        .unwrap();

        let mut cue = Cue::new(&dir.path().join("game.cue")).unwrap();
        let toc = cue.toc();

        assert_eq!(toc.track(2).unwrap().control, 0x3);
        assert_eq!(toc.tracks[crate::toc::LEAD_OUT_TRACK as usize].control, 0);
        assert_eq!(toc.lead_out_lba(), 30);

        // The audio track is shorter than the validator's sample window
        let mut pw = [0u8; SUBCHANNEL_SIZE];
        cue.read_raw_subchannel(51, &mut pw).unwrap();
        let q = crate::subchannel::Q::from_pw(&pw);
        assert!(q.is_current_position());
        assert_eq!(q.control(), 0);
        assert_eq!(q.raw()[1], 0xaa);
        assert_eq!(q.absolute_msf(), crate::msf::Msf::from_lba(51));
    }

    #[test]
    fn parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("game.bin"), raw_sectors(4)).unwrap();

        for sheet in [
            "TRACK 01 MODE1/2352\nINDEX 01 00:00:00\n",
            "FILE game.bin BINARY\nTRACK 01 MODE1/2352\n",
            "FILE game.bin BINARY\nTRACK 02 MODE1/2352\nINDEX 01 00:00:00\n",
            "FILE game.bin WAVE\nTRACK 01 AUDIO\nINDEX 01 00:00:00\n",
            "FILE game.bin BINARY\nTRACK 01 MODE1/2352\nINDEX 01 00:00:09\n",
            "FILE \"game.bin BINARY\n",
            "FILE game.bin BINARY\nTRACK 01 FOO\nINDEX 01 00:00:00\n",
            "BOGUS\n",
        ] {
            let path = dir.path().join("bad.cue");
            fs::write(&path, sheet).unwrap();

            match Cue::new(&path) {
                Err(CdError::ParseError { .. }) => (),
                Err(e) => panic!("Unexpected error for {:?}: {}", sheet, e),
                Ok(_) => panic!("Bad cue sheet accepted: {:?}", sheet),
            }
        }
    }
}
