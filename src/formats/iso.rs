//! Cooked ISO images: a single data track stored as 2048 bytes per sector with nothing else.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use super::synthesize_q;
use crate::toc::{DiscType, Toc, CONTROL_DATA};
use crate::{CdError, CdResult, DiscReader, SECTOR_SIZE, SUBCHANNEL_SIZE};

/// An opened ISO image
pub struct Iso {
    file: File,
    toc: Toc,
}

impl Iso {
    /// Open the ISO at `path`. The file length must be a multiple of 2048.
    pub fn new(path: &Path) -> CdResult<Iso> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();

        let bad_image = |desc: &str| CdError::BadImage {
            path: PathBuf::from(path),
            desc: desc.to_string(),
        };

        if len == 0 || len % SECTOR_SIZE as u64 != 0 {
            return Err(bad_image("ISO size is not a multiple of 2048"));
        }

        let sectors = u32::try_from(len / SECTOR_SIZE as u64)
            .map_err(|_| bad_image("ISO is too big"))?;

        let toc = Toc::from_tracks(DiscType::CdDaOrMode1, &[(CONTROL_DATA, 0)], sectors)?;

        Ok(Iso { file, toc })
    }
}

impl DiscReader for Iso {
    fn image_format(&self) -> String {
        "ISO".to_string()
    }

    fn toc(&self) -> &Toc {
        &self.toc
    }

    fn read_sectors(&mut self, buf: &mut [u8], lba: u32, count: u32) -> CdResult<u32> {
        let end = self.toc.lead_out_lba();

        if lba >= end {
            return Err(CdError::LeadOut);
        }

        let count = count.min(end - lba);
        let len = count as usize * SECTOR_SIZE;

        if buf.len() < len {
            return Err(CdError::ShortRead);
        }

        self.file.seek(SeekFrom::Start(lba as u64 * SECTOR_SIZE as u64))?;
        self.file.read_exact(&mut buf[..len])?;

        Ok(count)
    }

    fn read_raw_subchannel(&mut self, lba: u32, buf: &mut [u8; SUBCHANNEL_SIZE]) -> CdResult<()> {
        *buf = synthesize_q(&self.toc, lba)?.to_pw();

        Ok(())
    }
}
