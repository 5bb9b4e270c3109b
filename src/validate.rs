//! Q subchannel sanity check.
//!
//! Bad rips and broken image converters tend to produce subchannel data which doesn't line up
//! with the sector addresses, which ends up confusing games relying on the Q timecodes (CD-DA
//! playback in particular). To catch those early the first sectors of the first audio track of
//! every disc are sampled and the absolute MSF stored in their Q subchannel is compared with the
//! one derived from the LBA.

use log::{debug, error};

use crate::disc_set::DiscSet;
use crate::msf::Msf;
use crate::subchannel::Q;
use crate::toc::LEAD_OUT_TRACK;
use crate::{CdError, CdResult, SUBCHANNEL_SIZE};

/// Number of consecutive sectors sampled at the start of the checked track
pub const SAMPLES_PER_TRACK: u32 = 32;

/// Check the Q subchannel of every disc in `set`. For each disc only the first audio track is
/// sampled, discs without audio tracks are accepted as-is.
///
/// Q entries with a bad CRC or which don't hold current position data are skipped but at least
/// one of the samples must be usable.
pub fn check(set: &mut DiscSet) -> CdResult<()> {
    let count = set.len();

    for i in 0..count {
        let disc_no = i + 1;
        let disc = set.disc_mut(i)?;

        let start = disc
            .toc()
            .tracks
            .iter()
            .take(LEAD_OUT_TRACK as usize)
            .skip(1)
            .find(|t| t.valid && !t.is_data())
            .map(|t| t.lba);

        let start = match start {
            Some(lba) => lba,
            None => {
                debug!("Disc {} of {}: no audio track to test", disc_no, count);
                continue;
            }
        };

        let end = start + SAMPLES_PER_TRACK - 1;
        let mut any_position = false;
        let mut pw = [0u8; SUBCHANNEL_SIZE];

        for lba in start..=end {
            disc.read_raw_subchannel(lba, &mut pw)
                .map_err(|e| CdError::SubchannelRead {
                    disc: disc_no,
                    lba,
                    source: Box::new(e),
                })?;

            let q = Q::from_pw(&pw);

            if !q.is_current_position() {
                continue;
            }

            any_position = true;

            let expected = Msf::from_lba(lba).ok_or(CdError::InvalidMsf)?;
            let [qm, qs, qf] = q.absolute_msf_raw();

            if expected.to_bcd_bytes() != [qm, qs, qf] {
                return Err(CdError::SubchannelMismatch {
                    disc: disc_no,
                    lba,
                    expected: expected.to_string(),
                    found: format!("{:02x}:{:02x}:{:02x}", qm, qs, qf),
                });
            }
        }

        if !any_position {
            return Err(CdError::NoSubchannelPosition {
                disc: disc_no,
                start,
                end,
            });
        }
    }

    Ok(())
}

/// Run `check` on `set`, logging the reason of the failure if any
pub fn validate(set: &mut DiscSet) -> bool {
    let count = set.len();

    match check(set) {
        Ok(()) => true,
        Err(e) => {
            error!("Testing disc set ({} discs): {}", count, e);
            false
        }
    }
}
