//! In-memory disc used by the tests

use std::collections::{HashMap, HashSet};

use crate::formats::synthesize_q;
use crate::subchannel::Q;
use crate::toc::{DiscType, Toc, CONTROL_DATA};
use crate::{CdError, CdResult, DiscReader, SECTOR_SIZE, SUBCHANNEL_SIZE};

pub struct FakeDisc {
    pub toc: Toc,
    /// User data, `SECTOR_SIZE` bytes per sector starting at LBA 0
    pub data: Vec<u8>,
    /// Sectors which fail to read
    pub bad_sectors: HashSet<u32>,
    /// Q subchannel overrides
    pub q: HashMap<u32, Q>,
    /// Return zeroed subchannel data for every sector not in `q`
    pub blank_subchannel: bool,
}

impl FakeDisc {
    pub fn new(toc: Toc, sectors: u32, seed: u8) -> FakeDisc {
        let data = (0..sectors as usize * SECTOR_SIZE)
            .map(|i| (i / 7) as u8 ^ seed)
            .collect();

        FakeDisc {
            toc,
            data,
            bad_sectors: HashSet::new(),
            q: HashMap::new(),
            blank_subchannel: false,
        }
    }

    /// Single data track, 600 sectors
    pub fn data_disc(seed: u8) -> FakeDisc {
        let toc = Toc::from_tracks(DiscType::CdDaOrMode1, &[(CONTROL_DATA, 0)], 600).unwrap();

        FakeDisc::new(toc, 600, seed)
    }

    /// Data track followed by two audio tracks at LBA 600 and 900
    pub fn mixed_disc(seed: u8) -> FakeDisc {
        let toc = Toc::from_tracks(
            DiscType::CdDaOrMode1,
            &[(CONTROL_DATA, 0), (0, 600), (0, 900)],
            1200,
        )
        .unwrap();

        FakeDisc::new(toc, 1200, seed)
    }

    /// Overwrite the user data starting at LBA 0
    pub fn with_system_area(mut self, area: &[u8]) -> FakeDisc {
        self.data[..area.len()].copy_from_slice(area);
        self
    }

    fn sector_count(&self) -> u32 {
        (self.data.len() / SECTOR_SIZE) as u32
    }
}

impl DiscReader for FakeDisc {
    fn image_format(&self) -> String {
        "Fake".to_string()
    }

    fn toc(&self) -> &Toc {
        &self.toc
    }

    fn read_sectors(&mut self, buf: &mut [u8], lba: u32, count: u32) -> CdResult<u32> {
        for i in 0..count {
            let l = lba + i;

            if l >= self.sector_count() || self.bad_sectors.contains(&l) {
                if i == 0 {
                    return Err(CdError::LeadOut);
                }

                return Ok(i);
            }

            let src = l as usize * SECTOR_SIZE;
            let dst = i as usize * SECTOR_SIZE;

            buf[dst..dst + SECTOR_SIZE].copy_from_slice(&self.data[src..src + SECTOR_SIZE]);
        }

        Ok(count)
    }

    fn read_raw_subchannel(&mut self, lba: u32, buf: &mut [u8; SUBCHANNEL_SIZE]) -> CdResult<()> {
        if self.bad_sectors.contains(&lba) {
            return Err(CdError::LeadOut);
        }

        *buf = match self.q.get(&lba) {
            Some(q) => q.to_pw(),
            None if self.blank_subchannel => [0; SUBCHANNEL_SIZE],
            None => synthesize_q(&self.toc, lba)?.to_pw(),
        };

        Ok(())
    }
}
