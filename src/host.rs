//! Disc control interface for frontends.
//!
//! Frontends open and close the tray and swap discs from their own thread, while the emulated
//! drive reads from the inserted disc. `DiscControl` keeps the disc set and the drive behind a
//! single lock so that the tray state, the active index and the drive always agree.

use std::path::Path;

use log::{debug, info};
use parking_lot::Mutex;

use crate::disc_set::DiscSet;

/// Receives disc changes, normally implemented by the emulated CD drive
pub trait Drive: Send {
    /// Called whenever the content of the drive changes. `disc` is the index of the inserted
    /// disc within the set, `None` if the drive is empty.
    fn set_disc(&mut self, tray_open: bool, disc: Option<usize>);
}

struct State<D> {
    set: DiscSet,
    drive: D,
}

/// Shared disc set with its drive
pub struct DiscControl<D: Drive> {
    state: Mutex<State<D>>,
}

impl<D: Drive> DiscControl<D> {
    /// Take ownership of a loaded `set` and the `drive` it's plugged into
    pub fn new(set: DiscSet, drive: D) -> DiscControl<D> {
        DiscControl {
            state: Mutex::new(State { set, drive }),
        }
    }

    /// Insert disc `index` with the tray closed, used at startup to choose the boot disc.
    /// Does nothing if `index` is out of bounds.
    pub fn select(&self, index: usize) {
        let mut state = self.state.lock();
        let State { set, drive } = &mut *state;

        if set.insert(index) {
            info!("Booting from disc {} of {}", index + 1, set.len());
            drive.set_disc(false, Some(index));
        }
    }

    /// Open (`ejected == true`) or close the tray. Returns false if the tray was already in
    /// the requested state.
    pub fn set_eject_state(&self, ejected: bool) -> bool {
        let mut state = self.state.lock();
        let State { set, drive } = &mut *state;

        if !set.set_ejected(ejected) {
            return false;
        }

        if ejected {
            drive.set_disc(true, None);
        } else {
            drive.set_disc(false, set.inserted_index());
        }

        true
    }

    /// True if the tray is open
    pub fn eject_state(&self) -> bool {
        self.state.lock().set.tray_open()
    }

    /// Index of the active disc
    pub fn image_index(&self) -> usize {
        self.state.lock().set.active_index()
    }

    /// Change the active disc, only possible while the tray is open
    pub fn set_image_index(&self, index: usize) -> bool {
        self.state.lock().set.select_index(index)
    }

    /// Number of discs in the set
    pub fn num_images(&self) -> usize {
        self.state.lock().set.len()
    }

    /// Replace or remove disc `index`. Not supported, always returns false.
    pub fn replace_image_index(&self, index: usize, path: Option<&Path>) -> bool {
        match self.state.lock().set.replace(index, path) {
            Ok(()) => true,
            Err(e) => {
                debug!("replace_image_index({}): {}", index, e);
                false
            }
        }
    }

    /// Append an empty slot to the set
    pub fn add_image_index(&self) -> bool {
        self.state.lock().set.add_placeholder();

        true
    }

    /// Run `f` with the disc set locked
    pub fn with_set<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut DiscSet) -> R,
    {
        f(&mut self.state.lock().set)
    }

    /// Release the disc set and the drive
    pub fn into_inner(self) -> (DiscSet, D) {
        let State { set, drive } = self.state.into_inner();

        (set, drive)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::FakeDisc;
    use std::sync::Arc;

    #[derive(Default)]
    struct RecordingDrive {
        calls: Vec<(bool, Option<usize>)>,
    }

    impl Drive for RecordingDrive {
        fn set_disc(&mut self, tray_open: bool, disc: Option<usize>) {
            self.calls.push((tray_open, disc));
        }
    }

    fn control(discs: usize) -> DiscControl<RecordingDrive> {
        let mut set = DiscSet::new();

        for i in 0..discs {
            set.push(Box::new(FakeDisc::data_disc(i as u8)));
        }

        DiscControl::new(set, RecordingDrive::default())
    }

    #[test]
    fn swap_disc() {
        let ctl = control(2);

        ctl.select(0);
        assert!(!ctl.eject_state());

        // Tray closed
        assert!(!ctl.set_image_index(1));

        assert!(ctl.set_eject_state(true));
        assert!(!ctl.set_eject_state(true));
        assert!(ctl.eject_state());

        assert!(ctl.set_image_index(1));
        assert!(!ctl.set_image_index(2));
        assert_eq!(ctl.image_index(), 1);

        assert!(ctl.set_eject_state(false));

        let (set, drive) = ctl.into_inner();
        assert_eq!(set.inserted_index(), Some(1));
        assert_eq!(
            drive.calls,
            vec![(false, Some(0)), (true, None), (false, Some(1))]
        );
    }

    #[test]
    fn closing_on_empty_slot() {
        let ctl = control(1);

        ctl.set_eject_state(true);
        assert!(ctl.add_image_index());
        assert_eq!(ctl.num_images(), 2);
        assert!(ctl.set_image_index(1));
        ctl.set_eject_state(false);

        let (set, drive) = ctl.into_inner();
        // The placeholder is "inserted" but there's nothing to read from it
        assert_eq!(set.inserted_index(), Some(1));
        assert_eq!(drive.calls.last(), Some(&(false, Some(1))));
    }

    #[test]
    fn select_out_of_bounds() {
        let ctl = control(1);

        ctl.select(3);

        let (_, drive) = ctl.into_inner();
        assert!(drive.calls.is_empty());
    }

    #[test]
    fn replace_is_refused() {
        let ctl = control(2);

        assert!(!ctl.replace_image_index(0, None));
        assert!(!ctl.replace_image_index(1, Some(Path::new("other.cue"))));
        assert_eq!(ctl.num_images(), 2);
    }

    #[test]
    fn shared_between_threads() {
        let ctl = Arc::new(control(3));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ctl = Arc::clone(&ctl);

                std::thread::spawn(move || {
                    for _ in 0..100 {
                        ctl.set_eject_state(true);
                        ctl.set_image_index(2);
                        ctl.set_eject_state(false);
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        let ctl = Arc::try_unwrap(ctl).ok().unwrap();
        assert_eq!(ctl.with_set(|set| set.inserted_index()), Some(2));
    }
}
