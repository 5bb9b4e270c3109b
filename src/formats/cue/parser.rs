//! CUE sheet parser

use std::fs::{metadata, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::debug;

use super::{Cue, CueTrackType, Index, Storage};
use crate::formats::build_path;
use crate::msf::Msf;
use crate::toc::{DiscType, Toc, CONTROL_DATA};
use crate::{CdError, CdResult};

/// Cue sheets bigger than this are rejected
const MAX_CUE_SIZE: u64 = 1024 * 1024;

pub struct CueParser {
    /// Path to the cue sheet
    cue_path: PathBuf,
    /// Current line number
    line: u32,
    /// Opened BIN files
    bin_files: Vec<File>,
    /// Length of the current BIN file in bytes
    bin_len: u64,
    /// Bytes of the current BIN file used by the indices before the last one
    consumed_bytes: u64,
    /// LBA of the first sector of the current BIN file, not counting PREGAPs
    file_base: u32,
    /// Position of the last index within the current BIN file
    index_msf: Msf,
    /// Type of the last index
    index_type: Option<CueTrackType>,
    /// Sectors added by PREGAP commands so far
    pregap_total: u32,
    /// Current track: number, type and control bits
    track: Option<(u8, CueTrackType, u8)>,
    /// Every track seen so far along with the LBA of its index 01
    tracks: Vec<(u8, CueTrackType, u8, Option<u32>)>,
    /// Every index seen so far
    indices: Vec<Index>,
}

impl CueParser {
    pub fn build_cue(cue_path: &Path) -> CdResult<Cue> {
        let cue_sheet = read_file(cue_path, MAX_CUE_SIZE)?;

        let mut parser = CueParser {
            cue_path: cue_path.to_path_buf(),
            line: 0,
            bin_files: Vec::new(),
            bin_len: 0,
            consumed_bytes: 0,
            file_base: 0,
            index_msf: Msf::ZERO,
            index_type: None,
            pregap_total: 0,
            track: None,
            tracks: Vec::new(),
            indices: Vec::new(),
        };

        parser.parse(&cue_sheet)?;

        let toc = parser.build_toc()?;

        debug!("{}: {:?}", cue_path.display(), toc);

        let mut indices = parser.indices;
        indices.sort_by_key(|i| i.lba);

        Ok(Cue {
            indices,
            bin_files: parser.bin_files,
            toc,
        })
    }

    fn error(&self, msg: String) -> CdError {
        CdError::ParseError {
            path: self.cue_path.clone(),
            line: self.line,
            desc: msg,
        }
    }

    fn error_str(&self, msg: &str) -> CdError {
        self.error(msg.to_string())
    }

    fn parse(&mut self, cue_sheet: &[u8]) -> CdResult<()> {
        for buf in cue_sheet.split(|&b| b == b'\n') {
            self.line += 1;

            let params = self.split(buf)?;

            if params.is_empty() {
                // Empty line
                continue;
            }

            let command = params[0];

            type Callback = fn(&mut CueParser, &[&[u8]]) -> CdResult<()>;

            let handlers: [(&'static [u8], Callback, Option<usize>); 6] = [
                (b"REM", CueParser::command_ignored, None),
                (b"FILE", CueParser::command_file, Some(3)),
                (b"TRACK", CueParser::command_track, Some(3)),
                (b"INDEX", CueParser::command_index, Some(3)),
                (b"PREGAP", CueParser::command_pregap, Some(2)),
                (b"FLAGS", CueParser::command_flags, None),
            ];

            // Metadata we don't care about
            let ignored: [&'static [u8]; 7] = [
                b"CATALOG",
                b"CDTEXTFILE",
                b"TITLE",
                b"PERFORMER",
                b"SONGWRITER",
                b"ISRC",
                b"POSTGAP",
            ];

            if ignored.contains(&command) {
                continue;
            }

            let callback = handlers.iter().find(|&&(name, _, _)| name == command);

            match callback {
                Some(&(_, c, nparams)) => {
                    if let Some(nparams) = nparams {
                        if params.len() != nparams {
                            let command = String::from_utf8_lossy(command);

                            let error = format!(
                                "Wrong number of parameters for command {}: expected {} got {}",
                                command,
                                nparams,
                                params.len()
                            );

                            return Err(self.error(error));
                        }
                    }

                    c(self, &params)?;
                }
                None => {
                    let command = String::from_utf8_lossy(command);

                    let error = format!("Unexpected command \"{}\"", command);
                    return Err(self.error(error));
                }
            }
        }

        self.finalize_bin()?;

        Ok(())
    }

    fn build_toc(&self) -> CdResult<Toc> {
        let mut entries = Vec::with_capacity(self.tracks.len());
        let mut disc_type = DiscType::CdDaOrMode1;

        for &(n, ty, control, lba) in &self.tracks {
            let lba = match lba {
                Some(l) => l,
                None => return Err(self.error(format!("Track {} has no INDEX 01", n))),
            };

            if ty.is_mode2() {
                disc_type = DiscType::CdXa;
            }

            entries.push((control, lba));
        }

        if entries.is_empty() {
            return Err(self.error_str("No track in cue sheet"));
        }

        Toc::from_tracks(disc_type, &entries, self.file_base + self.pregap_total)
    }

    /// REM and other metadata
    fn command_ignored(&mut self, _: &[&[u8]]) -> CdResult<()> {
        Ok(())
    }

    /// FILE filename filetype
    fn command_file(&mut self, params: &[&[u8]]) -> CdResult<()> {
        let mut bin_name = params[1];
        let bin_type = params[2];

        self.finalize_bin()?;

        if bin_name.first() == Some(&b'"') {
            // The name was quoted, move past the quote (the end quote has already been
            // stripped by `split`)
            bin_name = &bin_name[1..];
        }

        let mut bin_path = PathBuf::new();

        if let Some(parent) = self.cue_path.parent() {
            bin_path.push(parent);
        }

        match build_path(bin_name) {
            // If bin_name is an absolute Path it'll replace the parent completely
            Some(p) => bin_path.push(p),
            None => return Err(self.error_str("Invalid BIN path in cuesheet")),
        }

        if bin_type != b"BINARY" {
            let ty = String::from_utf8_lossy(bin_type);

            let error = format!("Unsupported file type \"{}\"", ty);

            return Err(self.error(error));
        }

        let size = metadata(&bin_path)?.len();
        let bin = File::open(&bin_path)?;

        self.bin_files.push(bin);
        self.bin_len = size;
        self.consumed_bytes = 0;
        self.index_msf = Msf::ZERO;
        self.index_type = None;

        Ok(())
    }

    /// TRACK number datatype
    fn command_track(&mut self, params: &[&[u8]]) -> CdResult<()> {
        if self.bin_files.is_empty() {
            return Err(self.error_str("File-less track"));
        }

        let n: u8 = match from_buf(params[1]) {
            Some(b) => b,
            None => return Err(self.error_str("Invalid track number")),
        };

        if n as usize != self.tracks.len() + 1 || n > 99 {
            return Err(self.error(format!("Unexpected track number {}", n)));
        }

        let t = match params[2] {
            b"AUDIO" => CueTrackType::Audio,
            b"MODE1/2048" => CueTrackType::Mode1Data,
            b"MODE1/2352" => CueTrackType::Mode1Raw,
            b"MODE2/2336" => CueTrackType::Mode2Headerless,
            b"MODE2/2352" => CueTrackType::Mode2Raw,
            _ => return Err(self.error_str("Unsupported track type")),
        };

        let control = match t {
            CueTrackType::Audio => 0,
            _ => CONTROL_DATA,
        };

        self.track = Some((n, t, control));
        self.tracks.push((n, t, control, None));

        Ok(())
    }

    /// FLAGS flag [flag...]
    fn command_flags(&mut self, params: &[&[u8]]) -> CdResult<()> {
        let (n, t, mut control) = match self.track {
            Some(t) => t,
            None => return Err(self.error_str("Track-less flags")),
        };

        for &flag in &params[1..] {
            control |= match flag {
                b"DCP" => 0x2,
                b"4CH" => 0x8,
                b"PRE" => 0x1,
                b"SCMS" => 0,
                _ => return Err(self.error_str("Unknown flag")),
            };
        }

        self.track = Some((n, t, control));

        if let Some(last) = self.tracks.last_mut() {
            last.2 = control;
        }

        Ok(())
    }

    /// PREGAP mm:ss:ff
    fn command_pregap(&mut self, params: &[&[u8]]) -> CdResult<()> {
        let (_, track_type, _) = match self.track {
            Some(t) => t,
            None => return Err(self.error_str("Track-less pregap")),
        };

        let len: Msf = match from_buf(params[1]) {
            Some(m) => m,
            None => return Err(self.error_str("Invalid pregap length")),
        };

        let index = Index {
            lba: self.file_base + self.pregap_total + self.index_msf.sector_index(),
            ty: track_type,
            storage: Storage::PreGap,
        };

        self.indices.push(index);
        self.pregap_total += len.sector_index();

        Ok(())
    }

    /// INDEX number mm:ss:ff
    fn command_index(&mut self, params: &[&[u8]]) -> CdResult<()> {
        let (_, track_type, _) = match self.track {
            Some(t) => t,
            None => return Err(self.error_str("Track-less index")),
        };

        let n: u8 = match from_buf(params[1]) {
            Some(b) => b,
            None => return Err(self.error_str("Invalid index")),
        };

        let msf: Msf = match from_buf(params[2]) {
            Some(b) => b,
            None => return Err(self.error_str("Invalid index MSF")),
        };

        self.consume_bin_sectors(msf)?;

        let lba = self.file_base + self.pregap_total + msf.sector_index();

        // `command_track` makes sure there's an opened BIN
        let bin = self.bin_files.len() - 1;

        self.indices.push(Index {
            lba,
            ty: track_type,
            storage: Storage::Bin {
                bin,
                offset: self.consumed_bytes,
            },
        });

        self.index_msf = msf;
        self.index_type = Some(track_type);

        if n == 1 {
            if let Some(last) = self.tracks.last_mut() {
                last.3 = Some(lba);
            }
        }

        Ok(())
    }

    /// Split the buffer into individual words. Handles quoted strings and treats them as a
    /// single word but returns them with the first quote included (to detect elements that
    /// shouldn't be quoted in the first place).
    fn split<'a>(&self, line: &'a [u8]) -> CdResult<Vec<&'a [u8]>> {
        let mut in_word = None;
        let mut words = Vec::new();

        let whitespace = b" \t\n\r";

        for (pos, &cur) in line.iter().enumerate() {
            match in_word {
                Some((start, quoted)) => {
                    let delim = if quoted {
                        b"\"" as &[u8]
                    } else {
                        whitespace as &[u8]
                    };

                    if delim.contains(&cur) {
                        words.push(&line[start..pos]);
                        in_word = None;
                    }
                }
                None => {
                    if !whitespace.contains(&cur) {
                        in_word = Some((pos, cur == b'"'));
                    }
                }
            }
        }

        if let Some((start, quoted)) = in_word {
            if quoted {
                // we reached the end of the line but didn't find the matching quote
                return Err(self.error_str("Mismatched quote"));
            }

            words.push(&line[start..]);
        }

        Ok(words)
    }

    /// Advance in the current BIN file up to the index at `offset`, updating how many bytes are
    /// left to consume.
    fn consume_bin_sectors(&mut self, offset: Msf) -> CdResult<()> {
        let delta = match offset.checked_sub(self.index_msf) {
            Some(d) => d.sector_index() as u64,
            None => return Err(self.error_str("Index goes backwards")),
        };

        if delta == 0 {
            return Ok(());
        }

        let ty = match self.index_type {
            Some(t) => t,
            None => return Err(self.error_str("File doesn't start at 00:00:00")),
        };

        let index_size = ty.sector_size() as u64 * delta;

        if index_size > (self.bin_len - self.consumed_bytes) {
            return Err(self.error_str("Index out of range (past the end of the BIN file)"));
        }

        self.consumed_bytes += index_size;

        Ok(())
    }

    /// We're done with this bin file which means that whatever's left of it is for the last
    /// index.
    fn finalize_bin(&mut self) -> CdResult<()> {
        let ty = match self.index_type {
            Some(t) => t,
            // No previous index, nothing to be done
            None => return Ok(()),
        };

        let sector_size = ty.sector_size() as u64;

        let remaining_bytes = self.bin_len - self.consumed_bytes;

        if remaining_bytes % sector_size != 0 {
            return Err(self.error_str("Missaligned sector data while finishing a BIN file"));
        }

        let sectors = match u32::try_from(remaining_bytes / sector_size) {
            Ok(s) => s,
            Err(_) => return Err(self.error_str("BIN file is too big")),
        };

        self.file_base += self.index_msf.sector_index() + sectors;
        self.index_type = None;

        Ok(())
    }
}

fn read_file(cue: &Path, max_len: u64) -> Result<Vec<u8>, io::Error> {
    let len = metadata(cue)?.len();

    if len > max_len {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "Cue sheet is too big",
        ));
    }

    let mut file = File::open(cue)?;

    let mut cue_sheet = Vec::with_capacity(len as usize);

    file.read_to_end(&mut cue_sheet)?;

    Ok(cue_sheet)
}

/// Like from_str but from an `u8` buffer. Fails if buffer is not valid utf-8
fn from_buf<T: FromStr>(b: &[u8]) -> Option<T> {
    let s = std::str::from_utf8(b).ok()?;

    T::from_str(s).ok()
}
