//! The set of discs making up the loaded game.
//!
//! The set owns every opened reader. One of the discs is the active one, it's only considered
//! inserted in the drive while the tray is closed, and the active disc can only be changed
//! while the tray is open.

use std::path::{Path, PathBuf};

use log::{debug, error, info};

use crate::{CdError, CdResult, DiscOpener, DiscReader};

/// Ordered collection of opened disc images
pub struct DiscSet {
    /// Opened discs, `None` for discs which failed to open (or for placeholders)
    discs: Vec<Option<Box<dyn DiscReader>>>,
    /// Disc which is, or will be when the tray closes, in the drive
    active: usize,
    /// Tray state seen by the emulated drive
    tray_open: bool,
}

impl DiscSet {
    /// Create an empty set with the tray closed
    pub fn new() -> DiscSet {
        DiscSet {
            discs: Vec::new(),
            active: 0,
            tray_open: false,
        }
    }

    /// Open every path in `paths` with `opener` and append the discs to the set, in order. A
    /// disc which can't be opened leaves a placeholder behind so that the disc numbering stays
    /// the same, any attempt to use it later will return `CdError::MissingDisc`.
    ///
    /// Returns false if `paths` is empty.
    pub fn load<O>(&mut self, paths: &[PathBuf], opener: &mut O) -> bool
    where
        O: DiscOpener + ?Sized,
    {
        for path in paths {
            info!("Adding CD: \"{}\"", path.display());

            let disc = match opener.open(path) {
                Ok(d) => Some(d),
                Err(e) => {
                    error!("Can't open \"{}\": {}", path.display(), e);
                    None
                }
            };

            self.discs.push(disc);
        }

        !paths.is_empty()
    }

    /// Append an already opened disc
    pub fn push(&mut self, disc: Box<dyn DiscReader>) {
        self.discs.push(Some(disc));
    }

    /// Number of discs in the set, placeholders included
    pub fn len(&self) -> usize {
        self.discs.len()
    }

    /// True if the set contains no disc at all
    pub fn is_empty(&self) -> bool {
        self.discs.is_empty()
    }

    /// Return disc `index`
    pub fn disc(&self, index: usize) -> CdResult<&dyn DiscReader> {
        match self.discs.get(index) {
            Some(Some(disc)) => Ok(disc.as_ref()),
            _ => Err(CdError::MissingDisc(index)),
        }
    }

    /// Return a mutable reference to disc `index`
    pub fn disc_mut(&mut self, index: usize) -> CdResult<&mut dyn DiscReader> {
        match self.discs.get_mut(index) {
            Some(Some(disc)) => Ok(disc.as_mut()),
            _ => Err(CdError::MissingDisc(index)),
        }
    }

    /// True if the tray is open
    pub fn tray_open(&self) -> bool {
        self.tray_open
    }

    /// Index of the active disc
    pub fn active_index(&self) -> usize {
        self.active
    }

    /// Open or close the tray. Returns false if the tray was already in the requested state.
    ///
    /// Once the tray is closed the active disc, if there's one at that index, is inserted.
    pub fn set_ejected(&mut self, ejected: bool) -> bool {
        if ejected == self.tray_open {
            return false;
        }

        self.tray_open = ejected;

        match self.inserted_index() {
            Some(i) => debug!("Tray closed with disc {} of {}", i + 1, self.len()),
            None if ejected => debug!("Tray open"),
            None => debug!("Tray closed without a disc"),
        }

        true
    }

    /// Index of the disc currently in the drive, `None` if the tray is open or if the active
    /// index is out of bounds.
    pub fn inserted_index(&self) -> Option<usize> {
        if !self.tray_open && self.active < self.discs.len() {
            Some(self.active)
        } else {
            None
        }
    }

    /// Disc currently in the drive
    pub fn inserted(&mut self) -> Option<&mut dyn DiscReader> {
        let index = self.inserted_index()?;

        self.disc_mut(index).ok()
    }

    /// Change the active disc. Only allowed while the tray is open and if `index` is within
    /// bounds, returns false otherwise and nothing changes.
    pub fn select_index(&mut self, index: usize) -> bool {
        if !self.tray_open || index >= self.discs.len() {
            return false;
        }

        debug!("Selected disc {} of {}", index + 1, self.discs.len());
        self.active = index;

        true
    }

    /// Put disc `index` in the drive with the tray closed, regardless of the current tray
    /// state. Used to pick the boot disc.
    pub fn insert(&mut self, index: usize) -> bool {
        if index >= self.discs.len() {
            return false;
        }

        self.active = index;
        self.tray_open = false;

        true
    }

    /// Append an empty slot. The slot can't be filled afterwards since replacing images isn't
    /// supported.
    pub fn add_placeholder(&mut self) {
        info!("Adding an empty disc slot");
        self.discs.push(None);
    }

    /// Replacing a disc of a loaded set isn't supported, this always fails with
    /// `CdError::Unsupported`.
    pub fn replace(&mut self, index: usize, path: Option<&Path>) -> CdResult<()> {
        info!(
            "Replacing disc {} with {:?} is not supported",
            index,
            path.map(|p| p.display().to_string())
        );

        Err(CdError::Unsupported)
    }

    /// Close every disc and reset the active index
    pub fn clear(&mut self) {
        self.discs.clear();
        self.active = 0;
    }
}

impl Default for DiscSet {
    fn default() -> DiscSet {
        DiscSet::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::FakeDisc;

    fn opener(path: &Path) -> CdResult<Box<dyn DiscReader>> {
        if path.to_string_lossy().contains("missing") {
            Err(CdError::Unsupported)
        } else {
            Ok(Box::new(FakeDisc::data_disc(0)))
        }
    }

    fn set_of(n: usize) -> DiscSet {
        let mut set = DiscSet::new();

        for i in 0..n {
            set.push(Box::new(FakeDisc::data_disc(i as u8)));
        }

        set
    }

    #[test]
    fn load_with_placeholder() {
        let mut set = DiscSet::new();
        let paths = vec![
            PathBuf::from("a.cue"),
            PathBuf::from("missing.cue"),
            PathBuf::from("c.cue"),
        ];

        assert!(set.load(&paths, &mut opener));

        assert_eq!(set.len(), 3);
        assert!(set.disc(0).is_ok());
        assert!(matches!(set.disc(1), Err(CdError::MissingDisc(1))));
        assert!(set.disc(2).is_ok());
        assert!(matches!(set.disc(3), Err(CdError::MissingDisc(3))));

        assert!(!DiscSet::new().load(&[], &mut opener));
    }

    #[test]
    fn select_requires_open_tray() {
        let mut set = set_of(2);

        assert!(!set.tray_open());
        assert!(!set.select_index(1));
        assert_eq!(set.active_index(), 0);
        assert_eq!(set.inserted_index(), Some(0));

        assert!(set.set_ejected(true));
        assert_eq!(set.inserted_index(), None);
        assert!(set.inserted().is_none());
        assert!(!set.select_index(2));
        assert!(set.select_index(1));
        assert_eq!(set.active_index(), 1);

        assert!(set.set_ejected(false));
        assert_eq!(set.inserted_index(), Some(1));
        assert!(set.inserted().is_some());
    }

    #[test]
    fn eject_reports_changes() {
        let mut set = set_of(1);

        assert!(!set.set_ejected(false));
        assert!(set.set_ejected(true));
        assert!(!set.set_ejected(true));
        assert!(set.set_ejected(false));
    }

    #[test]
    fn closing_on_empty_slot() {
        let mut set = DiscSet::new();

        assert!(set.set_ejected(true));
        assert!(set.set_ejected(false));
        assert_eq!(set.inserted_index(), None);
    }

    #[test]
    fn insert_and_clear() {
        let mut set = set_of(3);

        set.set_ejected(true);
        assert!(set.insert(2));
        assert!(!set.tray_open());
        assert_eq!(set.inserted_index(), Some(2));
        assert!(!set.insert(3));

        set.clear();
        assert!(set.is_empty());
        assert_eq!(set.active_index(), 0);
        assert_eq!(set.inserted_index(), None);
    }

    #[test]
    fn unsupported_edits() {
        let mut set = set_of(1);

        set.add_placeholder();
        assert_eq!(set.len(), 2);
        assert!(set.disc(1).is_err());

        assert!(matches!(
            set.replace(0, Some(Path::new("other.cue"))),
            Err(CdError::Unsupported)
        ));
        assert!(set.disc(0).is_ok());
    }
}
