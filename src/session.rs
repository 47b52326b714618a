//! The review loop: pending images are shown one at a time and each one is
//! either committed (cropped, renamed, written), discarded, or left for a retry.
//!
//! All mutation goes through [`Session::apply`] with a [`Command`], so the UI
//! only translates input events and renders the resulting state.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use crate::canvas::{CropCanvas, Extent, Point, ZoomStep};
use crate::codec::{self, DecodeError};
use crate::config::Config;
use crate::error::SessionError;
use crate::files;
use crate::rename::{RenameForm, RenameSpec};

/// Source images still to review, consumed front to back.
#[derive(Debug, Clone, Default)]
pub struct PendingQueue {
    items: VecDeque<PathBuf>,
}

impl PendingQueue {
    pub fn new(items: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            items: items.into_iter().collect(),
        }
    }

    /// Build the queue from a one-time listing of `dir`.
    pub fn scan(dir: &Path, extensions: &[String]) -> Result<Self, SessionError> {
        let items = files::scan_pending(dir, extensions).map_err(|source| SessionError::Setup {
            path: dir.to_path_buf(),
            source,
        })?;
        Ok(Self::new(items))
    }

    fn pop(&mut self) -> Option<PathBuf> {
        self.items.pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Advance,
    Commit(RenameForm),
    Discard,
    SetZoom(ZoomStep),
    DragCrop(Point),
    Resize(Extent),
    SetCropSize(u32),
}

/// What became current after an advance.
#[derive(Debug)]
pub enum Progress {
    Loaded(PathBuf),
    /// The file is current but has no pixels; it can only be discarded.
    Unreadable { path: PathBuf, error: DecodeError },
    Finished,
}

#[derive(Debug)]
pub enum Event {
    Advanced(Progress),
    Committed {
        output: PathBuf,
        /// Set when the crop was written but the source could not be removed.
        cleanup_error: Option<SessionError>,
        next: Progress,
    },
    Discarded {
        removed: PathBuf,
        next: Progress,
    },
    ViewChanged,
}

#[derive(Debug)]
pub struct Session {
    config: Config,
    queue: PendingQueue,
    current: Option<PathBuf>,
    canvas: CropCanvas,
    form: RenameForm,
    finished: bool,
}

impl Session {
    pub fn new(config: &Config, queue: PendingQueue) -> Self {
        Self {
            config: config.clone(),
            queue,
            current: None,
            canvas: CropCanvas::new(config.crop_size),
            form: RenameForm::default(),
            finished: false,
        }
    }

    /// Create both folders if needed and queue up the pending images.
    pub fn open(config: &Config) -> Result<Self, SessionError> {
        for dir in [&config.source_dir, &config.dest_dir] {
            files::ensure_dir(dir).map_err(|source| SessionError::Setup {
                path: dir.clone(),
                source,
            })?;
        }
        let queue = PendingQueue::scan(&config.source_dir, &config.extensions)?;
        log::info!(
            "Found {} pending image(s) in {}",
            queue.len(),
            config.source_dir.display()
        );
        Ok(Self::new(config, queue))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn canvas(&self) -> &CropCanvas {
        &self.canvas
    }

    pub fn current(&self) -> Option<&Path> {
        self.current.as_deref()
    }

    /// Images still queued behind the current one.
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn form(&self) -> &RenameForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut RenameForm {
        &mut self.form
    }

    pub fn apply(&mut self, command: Command) -> Result<Event, SessionError> {
        if self.finished {
            return Err(SessionError::Finished);
        }
        match command {
            Command::Advance => self.advance().map(Event::Advanced),
            Command::Commit(form) => self.commit(&form),
            Command::Discard => self.discard(),
            Command::SetZoom(step) => {
                self.canvas.set_zoom(step);
                Ok(Event::ViewChanged)
            }
            Command::DragCrop(delta) => {
                self.canvas.drag_crop(delta);
                Ok(Event::ViewChanged)
            }
            Command::Resize(viewport) => {
                self.canvas.resize(viewport);
                Ok(Event::ViewChanged)
            }
            Command::SetCropSize(size) => {
                self.canvas.set_base_crop_size(self.config.clamp_crop_size(size));
                Ok(Event::ViewChanged)
            }
        }
    }

    /// Make the next queued image current, or enter the terminal state when
    /// the queue is empty. Clears the rename form either way.
    pub fn advance(&mut self) -> Result<Progress, SessionError> {
        if self.finished {
            return Err(SessionError::Finished);
        }
        self.form.clear();

        let Some(path) = self.queue.pop() else {
            self.finished = true;
            self.current = None;
            self.canvas.load(None);
            log::info!("All images processed");
            return Ok(Progress::Finished);
        };

        let progress = match codec::load(&path) {
            Ok(image) => {
                log::info!(
                    "Loaded {} ({}x{} after rotation)",
                    path.display(),
                    image.width(),
                    image.height()
                );
                self.canvas.load(Some(image));
                Progress::Loaded(path.clone())
            }
            Err(error) => {
                log::warn!("Cannot decode {}: {}", path.display(), error);
                self.canvas.load(None);
                Progress::Unreadable {
                    path: path.clone(),
                    error,
                }
            }
        };
        self.current = Some(path);
        Ok(progress)
    }

    /// Write the current crop under its new name, remove the source, advance.
    ///
    /// Nothing changes when validation, encoding or writing fails. A failure
    /// to remove the source is reported in the event but still advances,
    /// since the output already exists.
    pub fn commit(&mut self, form: &RenameForm) -> Result<Event, SessionError> {
        if self.finished {
            return Err(SessionError::Finished);
        }
        let spec = RenameSpec::try_from(form)?;
        let current = self.current.clone().ok_or(SessionError::NoCurrent)?;
        let (Some(image), Some(rect)) = (self.canvas.image(), self.canvas.crop_in_original_space())
        else {
            return Err(SessionError::NoCrop(current));
        };
        let cropped = codec::extract(image, rect);

        let output = spec.output_path(&self.config.dest_dir);
        if let Some(dir) = output.parent() {
            files::ensure_dir(dir).map_err(|source| SessionError::Write {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        let bytes = codec::encode_jpeg(&cropped, self.config.jpeg_quality)?;
        if output.exists() {
            log::warn!("Overwriting {}", output.display());
        }
        files::write(&output, &bytes).map_err(|source| SessionError::Write {
            path: output.clone(),
            source,
        })?;
        log::info!(
            "Saved {} ({}px square at {},{}) from {}",
            output.display(),
            rect.size,
            rect.x,
            rect.y,
            current.display()
        );

        let cleanup_error = files::delete(&current)
            .err()
            .map(|source| SessionError::Delete {
                path: current.clone(),
                source,
            });
        if let Some(err) = &cleanup_error {
            log::error!("{err}");
        }

        let next = self.advance()?;
        Ok(Event::Committed {
            output,
            cleanup_error,
            next,
        })
    }

    /// Delete the current source without output, then advance.
    pub fn discard(&mut self) -> Result<Event, SessionError> {
        if self.finished {
            return Err(SessionError::Finished);
        }
        let current = self.current.clone().ok_or(SessionError::NoCurrent)?;
        files::delete(&current).map_err(|source| SessionError::Delete {
            path: current.clone(),
            source,
        })?;
        log::info!("Deleted {}", current.display());

        let next = self.advance()?;
        Ok(Event::Discarded {
            removed: current,
            next,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rename::ValidationError;
    use image::{Rgb, RgbImage};
    use std::fs;
    use tempfile::TempDir;

    /// Source folder holding one JPEG per `(name, width, height)`, with the
    /// viewport already known.
    fn fixture(images: &[(&str, u32, u32)]) -> (TempDir, Session) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            source_dir: dir.path().join("images"),
            dest_dir: dir.path().join("photos"),
            crop_size: 20,
            crop_size_range: 10..=100,
            ..Config::default()
        };
        fs::create_dir_all(&config.source_dir).unwrap();
        for (name, width, height) in images {
            let image = RgbImage::from_pixel(*width, *height, Rgb([200, 120, 40]));
            let bytes = codec::encode_jpeg(&image, 90).unwrap();
            fs::write(config.source_dir.join(name), bytes).unwrap();
        }

        let mut session = Session::open(&config).unwrap();
        session.apply(Command::Resize(Extent::new(100, 80))).unwrap();
        (dir, session)
    }

    fn form(color: &str, grain: &str, flipped: bool) -> RenameForm {
        RenameForm {
            color: color.into(),
            grain: grain.into(),
            flipped,
        }
    }

    fn output_files(session: &Session) -> Vec<PathBuf> {
        let mut found = Vec::new();
        if let Ok(dirs) = fs::read_dir(&session.config().dest_dir) {
            for sub in dirs {
                for entry in fs::read_dir(sub.unwrap().path()).unwrap() {
                    found.push(entry.unwrap().path());
                }
            }
        }
        found.sort();
        found
    }

    #[test]
    fn test_commit_scenario() {
        // 200x300 on disk, 300x200 once rotated
        let (_dir, mut session) = fixture(&[("imgA.jpg", 200, 300)]);
        let source = session.config().source_dir.join("imgA.jpg");

        let event = session.apply(Command::Advance).unwrap();
        assert!(matches!(event, Event::Advanced(Progress::Loaded(ref p)) if *p == source));

        let canvas = session.canvas();
        assert_eq!(canvas.image_extent(), Some(Extent::new(300, 200)));
        assert_eq!(canvas.view().display, Extent::new(100, 67));
        assert_eq!(canvas.crop().unwrap().size, 20);

        let event = session
            .apply(Command::Commit(form("ABC", "5", false)))
            .unwrap();
        let Event::Committed {
            output,
            cleanup_error,
            next,
        } = event
        else {
            panic!("expected a commit");
        };

        assert_eq!(output, session.config().dest_dir.join("AB").join("ABC-5.jpg"));
        assert!(cleanup_error.is_none());
        assert!(matches!(next, Progress::Finished));

        let written = codec::decode(&fs::read(&output).unwrap()).unwrap();
        // 20 display pixels at 3 original pixels each
        assert_eq!(written.dimensions(), (60, 60));
        assert!(!source.exists());
        assert!(session.is_finished());
        assert!(session.current().is_none());
    }

    #[test]
    fn test_invalid_color_blocks_commit() {
        let (_dir, mut session) = fixture(&[("imgA.jpg", 200, 300)]);
        session.apply(Command::Advance).unwrap();
        let current = session.current().unwrap().to_path_buf();

        let err = session
            .apply(Command::Commit(form("ab1", "5", false)))
            .unwrap_err();
        assert!(matches!(err, SessionError::Validation(_)));
        assert!(output_files(&session).is_empty());
        assert_eq!(session.current(), Some(current.as_path()));
        assert!(current.exists());
        assert!(!session.is_finished());
    }

    #[test]
    fn test_grain_cannot_leave_color_folder() {
        let (dir, mut session) = fixture(&[("imgA.jpg", 200, 300)]);
        session.apply(Command::Advance).unwrap();
        let current = session.current().unwrap().to_path_buf();

        for grain in ["../x", "../../../escaped"] {
            let err = session
                .apply(Command::Commit(form("ABC", grain, false)))
                .unwrap_err();
            assert!(matches!(
                err,
                SessionError::Validation(ValidationError::GrainCode(_))
            ));
        }
        assert_eq!(fs::read_dir(&session.config().dest_dir).unwrap().count(), 0);
        let mut top: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        top.sort();
        assert_eq!(top, ["images", "photos"]);
        assert_eq!(session.current(), Some(current.as_path()));
        assert!(current.exists());
        assert!(!session.is_finished());
    }

    #[test]
    fn test_flipped_commit_advances_to_next() {
        let (_dir, mut session) = fixture(&[("a.jpg", 40, 60), ("b.jpg", 60, 40)]);
        session.apply(Command::Advance).unwrap();
        session.form_mut().color = "xyz".into();

        let form = session.form().clone();
        let form = RenameForm {
            grain: "7".into(),
            flipped: true,
            ..form
        };
        let event = session.apply(Command::Commit(form)).unwrap();
        let Event::Committed { output, next, .. } = event else {
            panic!("expected a commit");
        };
        assert!(output.ends_with("XY/XYZ-7_flip.jpg"));
        assert!(matches!(next, Progress::Loaded(ref p) if p.ends_with("b.jpg")));
        // advancing clears the form
        assert_eq!(session.form(), &RenameForm::default());
        assert_eq!(session.remaining(), 0);
    }

    #[test]
    fn test_identifier_collision_overwrites() {
        let (_dir, mut session) = fixture(&[("a.jpg", 40, 60), ("b.jpg", 40, 60)]);
        session.apply(Command::Advance).unwrap();
        session
            .apply(Command::Commit(form("ABC", "1", false)))
            .unwrap();
        session
            .apply(Command::Commit(form("ABC", "1", false)))
            .unwrap();

        let outputs = output_files(&session);
        assert_eq!(outputs.len(), 1);
        assert!(session.is_finished());
    }

    #[test]
    fn test_discard_deletes_and_advances() {
        let (_dir, mut session) = fixture(&[("a.jpg", 40, 60), ("b.jpg", 40, 60)]);
        session.apply(Command::Advance).unwrap();
        let first = session.current().unwrap().to_path_buf();

        let event = session.apply(Command::Discard).unwrap();
        let Event::Discarded { removed, next } = event else {
            panic!("expected a discard");
        };
        assert_eq!(removed, first);
        assert!(!first.exists());
        assert!(matches!(next, Progress::Loaded(_)));
        assert!(output_files(&session).is_empty());
    }

    #[test]
    fn test_failed_discard_keeps_state() {
        let (_dir, mut session) = fixture(&[("a.jpg", 40, 60), ("b.jpg", 40, 60)]);
        session.apply(Command::Advance).unwrap();
        let current = session.current().unwrap().to_path_buf();
        fs::remove_file(&current).unwrap();

        let err = session.apply(Command::Discard).unwrap_err();
        assert!(matches!(err, SessionError::Delete { ref path, .. } if *path == current));
        assert_eq!(session.current(), Some(current.as_path()));
        assert_eq!(session.remaining(), 1);
    }

    #[test]
    fn test_failed_write_keeps_image_active() {
        let (_dir, mut session) = fixture(&[("a.jpg", 40, 60)]);
        session.apply(Command::Advance).unwrap();
        let current = session.current().unwrap().to_path_buf();
        // a plain file where the subdirectory should go
        fs::write(session.config().dest_dir.join("AB"), b"blocker").unwrap();

        let err = session
            .apply(Command::Commit(form("ABC", "5", false)))
            .unwrap_err();
        assert!(matches!(err, SessionError::Write { .. }));
        assert!(current.exists());
        assert_eq!(session.current(), Some(current.as_path()));
        assert!(!session.is_finished());
        assert!(session.canvas().image().is_some());
    }

    #[test]
    fn test_failed_cleanup_still_advances() {
        let (_dir, mut session) = fixture(&[("a.jpg", 40, 60), ("b.jpg", 40, 60)]);
        session.apply(Command::Advance).unwrap();
        fs::remove_file(session.current().unwrap()).unwrap();

        let event = session
            .apply(Command::Commit(form("ABC", "5", false)))
            .unwrap();
        let Event::Committed {
            output,
            cleanup_error,
            next,
        } = event
        else {
            panic!("expected a commit");
        };
        assert!(output.exists());
        assert!(matches!(cleanup_error, Some(SessionError::Delete { .. })));
        assert!(matches!(next, Progress::Loaded(ref p) if p.ends_with("b.jpg")));
    }

    #[test]
    fn test_unreadable_image() {
        let (_dir, session) = fixture(&[]);
        let broken = session.config().source_dir.join("broken.jpg");
        fs::write(&broken, b"not a jpeg").unwrap();
        let queue = PendingQueue::scan(&session.config().source_dir, &session.config().extensions)
            .unwrap();
        let mut session = Session::new(&session.config().clone(), queue);

        let event = session.apply(Command::Advance).unwrap();
        assert!(matches!(
            event,
            Event::Advanced(Progress::Unreadable { ref path, .. }) if *path == broken
        ));
        assert!(session.canvas().crop().is_none());

        // view commands are no-ops
        session.apply(Command::Resize(Extent::new(100, 80))).unwrap();
        session.apply(Command::SetZoom(ZoomStep::In)).unwrap();
        assert_eq!(session.canvas().view().zoom, 1.0);

        let err = session
            .apply(Command::Commit(form("ABC", "5", false)))
            .unwrap_err();
        assert!(matches!(err, SessionError::NoCrop(_)));

        session.apply(Command::Discard).unwrap();
        assert!(!broken.exists());
        assert!(session.is_finished());
    }

    #[test]
    fn test_empty_queue_finishes() {
        let (_dir, mut session) = fixture(&[]);
        let event = session.apply(Command::Advance).unwrap();
        assert!(matches!(event, Event::Advanced(Progress::Finished)));
        assert!(session.is_finished());
        assert!(matches!(
            session.apply(Command::Advance),
            Err(SessionError::Finished)
        ));
        assert!(matches!(
            session.apply(Command::Commit(form("ABC", "5", false))),
            Err(SessionError::Finished)
        ));
    }

    #[test]
    fn test_commands_before_first_advance() {
        let (_dir, mut session) = fixture(&[("a.jpg", 40, 60)]);
        assert!(matches!(
            session.apply(Command::Discard),
            Err(SessionError::NoCurrent)
        ));
        assert!(matches!(
            session.apply(Command::Commit(form("ABC", "5", false))),
            Err(SessionError::NoCurrent)
        ));
    }

    #[test]
    fn test_view_commands() {
        let (_dir, mut session) = fixture(&[("a.jpg", 200, 300)]);
        session.apply(Command::Advance).unwrap();

        session.apply(Command::SetZoom(ZoomStep::In)).unwrap();
        assert!((session.canvas().view().zoom - 1.2).abs() < 1e-9);
        assert_eq!(session.canvas().crop().unwrap().size, 24);

        let before = session.canvas().crop().unwrap();
        session.apply(Command::DragCrop(Point::new(-3, 2))).unwrap();
        let after = session.canvas().crop().unwrap();
        assert_eq!((after.x, after.y), (before.x - 3, before.y + 2));

        session.apply(Command::SetCropSize(1000)).unwrap();
        assert_eq!(session.canvas().base_crop_size(), 100);
        session.apply(Command::SetCropSize(1)).unwrap();
        assert_eq!(session.canvas().base_crop_size(), 10);
    }

    #[test]
    fn test_scan_skips_processed_files() {
        let (_dir, session) =
            fixture(&[("a.jpg", 40, 60), ("ABC-5.jpg", 40, 60), ("c.PNG", 40, 60)]);
        assert_eq!(session.remaining(), 2);
        assert!(!session.queue.is_empty());
    }
}
