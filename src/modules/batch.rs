//! Batch state and the background conversion run.
//!
//! The controller owns the file list and the run options. A run snapshots
//! the list, flips the busy flag and hands the work to a worker thread that
//! converts entries one at a time, writing statuses back into the shared
//! list and streaming [`BatchEvent`]s to whoever holds the [`RunHandle`].

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use super::formats::TargetFormat;
use super::image_export::ImageExporter;
use crate::error::{BatchError, BusyError, ConfigurationError, ConversionError};

/// Converts one file. Implemented by [`ImageExporter`]; tests swap in stubs.
pub trait Converter: Send + Sync {
    fn convert(
        &self,
        source: &Path,
        format: TargetFormat,
        output_dir: &Path,
        preserve_metadata: bool,
        max_compression: bool,
    ) -> Result<PathBuf, ConversionError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Status {
    #[default]
    Pending,
    Processing,
    Done,
    Error,
}

impl Status {
    /// Text shown in the file row.
    pub fn display_label(&self) -> &'static str {
        match self {
            Status::Pending => "Pending",
            Status::Processing => "Converting...",
            Status::Done => "Complete ✓",
            Status::Error => "Error",
        }
    }
}

/// Longest parent directory shown in a row before it is cut from the left.
pub const DIRECTORY_LABEL_CHARS: usize = 25;

#[derive(Debug, Clone, PartialEq)]
pub struct FileEntry {
    pub source_path: PathBuf,
    pub target_format: TargetFormat,
    pub status: Status,
    /// Read once when the file is added; `None` if it could not be stat'ed.
    pub size_bytes: Option<u64>,
}

impl FileEntry {
    fn new(source_path: PathBuf, target_format: TargetFormat) -> Self {
        let size_bytes = fs::metadata(&source_path).ok().map(|m| m.len());
        Self {
            source_path,
            target_format,
            status: Status::Pending,
            size_bytes,
        }
    }

    /// Parent directory, keeping only its last characters when it is long.
    pub fn directory_label(&self) -> String {
        let dir = self
            .source_path
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        let len = dir.chars().count();
        if len > DIRECTORY_LABEL_CHARS {
            let tail: String = dir.chars().skip(len - DIRECTORY_LABEL_CHARS).collect();
            format!("...{tail}")
        } else {
            dir
        }
    }

    pub fn size_label(&self) -> String {
        match self.size_bytes {
            Some(bytes) => format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0)),
            None => "-- MB".to_string(),
        }
    }

    /// Uppercase source extension, e.g. `PNG`.
    pub fn source_extension(&self) -> String {
        self.source_path
            .extension()
            .map(|e| e.to_string_lossy().to_uppercase())
            .unwrap_or_default()
    }

    pub fn file_name(&self) -> String {
        self.source_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("Unknown")
            .to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOptions {
    pub output_directory: Option<PathBuf>,
    pub preserve_metadata: bool,
    pub max_compression: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    Started { total: usize },
    Status { index: usize, status: Status },
    Progress { completed: usize, total: usize },
    Finished { succeeded: usize, failed: usize },
}

impl BatchEvent {
    /// Fraction of the batch finished, for progress events.
    pub fn progress(&self) -> Option<f32> {
        match self {
            BatchEvent::Progress { completed, total } if *total > 0 => {
                Some(*completed as f32 / *total as f32)
            }
            _ => None,
        }
    }
}

/// Receiving end of an active run.
pub struct RunHandle {
    events: Receiver<BatchEvent>,
    worker: JoinHandle<()>,
}

impl RunHandle {
    /// Drains whatever the worker has sent so far without blocking.
    pub fn try_events(&self) -> Vec<BatchEvent> {
        self.events.try_iter().collect()
    }

    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Blocks until the worker exits and returns every remaining event.
    pub fn wait(self) -> Vec<BatchEvent> {
        let events = self.events.iter().collect();
        if self.worker.join().is_err() {
            warn!("Conversion worker panicked");
        }
        events
    }
}

/// Clears the busy flag when the worker exits, including by panic.
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct BatchController {
    entries: Arc<Mutex<Vec<FileEntry>>>,
    options: BatchOptions,
    running: Arc<AtomicBool>,
    converter: Arc<dyn Converter>,
}

impl Default for BatchController {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchController {
    pub fn new() -> Self {
        Self::with_converter(Arc::new(ImageExporter))
    }

    pub fn with_converter(converter: Arc<dyn Converter>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
            options: BatchOptions::default(),
            running: Arc::new(AtomicBool::new(false)),
            converter,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<FileEntry>> {
        lock_entries(&self.entries)
    }

    fn ensure_idle(&self) -> Result<(), BusyError> {
        if self.is_running() { Err(BusyError) } else { Ok(()) }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn entries(&self) -> Vec<FileEntry> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    pub fn set_output_directory(&mut self, dir: Option<PathBuf>) {
        self.options.output_directory = dir;
    }

    pub fn set_preserve_metadata(&mut self, preserve: bool) {
        self.options.preserve_metadata = preserve;
    }

    pub fn set_max_compression(&mut self, max: bool) {
        self.options.max_compression = max;
    }

    /// Appends paths not already in the batch and returns how many were added.
    ///
    /// The first files added to an empty batch also pick the output directory
    /// (their parent folder) when none has been chosen yet.
    pub fn add_files<I>(&mut self, paths: I, default_format: TargetFormat) -> Result<usize, BusyError>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        self.ensure_idle()?;
        let mut entries = lock_entries(&self.entries);
        let was_empty = entries.is_empty();
        let mut added = 0;

        for path in paths {
            if entries.iter().any(|e| e.source_path == path) {
                continue;
            }
            entries.push(FileEntry::new(path, default_format));
            added += 1;
        }

        if was_empty && self.options.output_directory.is_none() {
            let first_parent = entries
                .first()
                .and_then(|e| e.source_path.parent())
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf);
            if first_parent.is_some() {
                self.options.output_directory = first_parent;
            }
        }

        debug!(added, total = entries.len(), "Added files to batch");
        Ok(added)
    }

    /// Sets the target format of the given entries, or of every entry when
    /// `indices` is empty. Indices past the end are ignored.
    pub fn set_format(&mut self, format: TargetFormat, indices: &[usize]) -> Result<(), BusyError> {
        self.ensure_idle()?;
        let mut entries = self.lock();
        if indices.is_empty() {
            entries.iter_mut().for_each(|e| e.target_format = format);
        } else {
            for &index in indices {
                if let Some(entry) = entries.get_mut(index) {
                    entry.target_format = format;
                }
            }
        }
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<Option<FileEntry>, BusyError> {
        self.ensure_idle()?;
        let mut entries = self.lock();
        Ok((index < entries.len()).then(|| entries.remove(index)))
    }

    /// Drops every entry and resets the options.
    pub fn clear(&mut self) -> Result<(), BusyError> {
        self.ensure_idle()?;
        self.lock().clear();
        self.options = BatchOptions::default();
        Ok(())
    }

    pub fn run(&self) -> Result<RunHandle, BatchError> {
        self.run_with(self.options.clone())
    }

    /// Starts converting the batch on a worker thread.
    ///
    /// Fails before touching any entry when a run is already active or the
    /// output directory is missing or cannot be created.
    pub fn run_with(&self, options: BatchOptions) -> Result<RunHandle, BatchError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(BusyError.into());
        }
        let guard = RunningGuard(Arc::clone(&self.running));

        let output_dir = prepare_output_dir(options.output_directory.as_deref())?;

        let jobs: Vec<(PathBuf, TargetFormat)> = {
            let mut entries = self.lock();
            entries.iter_mut().for_each(|e| e.status = Status::Pending);
            entries
                .iter()
                .map(|e| (e.source_path.clone(), e.target_format))
                .collect()
        };

        let (tx, rx) = mpsc::channel();
        let entries = Arc::clone(&self.entries);
        let converter = Arc::clone(&self.converter);

        let worker = thread::spawn(move || {
            let _guard = guard;
            run_batch(&jobs, &entries, converter.as_ref(), &output_dir, &options, &tx);
        });

        Ok(RunHandle { events: rx, worker })
    }
}

fn lock_entries(entries: &Mutex<Vec<FileEntry>>) -> MutexGuard<'_, Vec<FileEntry>> {
    entries.lock().unwrap_or_else(PoisonError::into_inner)
}

fn prepare_output_dir(dir: Option<&Path>) -> Result<PathBuf, ConfigurationError> {
    let dir = dir
        .filter(|d| !d.as_os_str().is_empty())
        .ok_or(ConfigurationError::MissingOutputDirectory)?;
    fs::create_dir_all(dir).map_err(|source| ConfigurationError::OutputDirectory {
        path: dir.to_path_buf(),
        source,
    })?;
    Ok(dir.to_path_buf())
}

fn set_status(
    entries: &Mutex<Vec<FileEntry>>,
    tx: &Sender<BatchEvent>,
    index: usize,
    status: Status,
) {
    if let Some(entry) = lock_entries(entries).get_mut(index) {
        entry.status = status;
    }
    let _ = tx.send(BatchEvent::Status { index, status });
}

fn run_batch(
    jobs: &[(PathBuf, TargetFormat)],
    entries: &Mutex<Vec<FileEntry>>,
    converter: &dyn Converter,
    output_dir: &Path,
    options: &BatchOptions,
    tx: &Sender<BatchEvent>,
) {
    let total = jobs.len();
    info!(total, output_dir = %output_dir.display(), "Starting batch conversion");
    let _ = tx.send(BatchEvent::Started { total });

    let mut succeeded = 0;
    let mut failed = 0;

    for (index, (source, format)) in jobs.iter().enumerate() {
        set_status(entries, tx, index, Status::Processing);

        let status = match converter.convert(
            source,
            *format,
            output_dir,
            options.preserve_metadata,
            options.max_compression,
        ) {
            Ok(written) => {
                debug!(source = %source.display(), output = %written.display(), "Converted");
                succeeded += 1;
                Status::Done
            }
            Err(e) => {
                warn!(error = %e, "Conversion failed");
                failed += 1;
                Status::Error
            }
        };

        set_status(entries, tx, index, status);
        let _ = tx.send(BatchEvent::Progress {
            completed: index + 1,
            total,
        });
    }

    info!(succeeded, failed, "Batch complete");
    let _ = tx.send(BatchEvent::Finished { succeeded, failed });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConversionFailure;
    use crate::modules::image_export::SaveParams;
    use image::{Rgb, RgbImage};

    /// Succeeds without touching the filesystem, optionally failing one path
    /// or blocking until released.
    #[derive(Default)]
    struct StubConverter {
        fail_on: Option<PathBuf>,
        gate: Option<Mutex<Receiver<()>>>,
        calls: Mutex<Vec<(PathBuf, TargetFormat, bool, bool)>>,
    }

    impl Converter for StubConverter {
        fn convert(
            &self,
            source: &Path,
            format: TargetFormat,
            output_dir: &Path,
            preserve_metadata: bool,
            max_compression: bool,
        ) -> Result<PathBuf, ConversionError> {
            if let Some(gate) = &self.gate {
                let _ = gate.lock().unwrap().recv();
            }
            self.calls.lock().unwrap().push((
                source.to_path_buf(),
                format,
                preserve_metadata,
                max_compression,
            ));
            if self.fail_on.as_deref() == Some(source) {
                return Err(ConversionError::new(source, ConversionFailure::Unsupported(format)));
            }
            Ok(output_dir.join(source.file_name().unwrap()))
        }
    }

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(|n| PathBuf::from(format!("/a/{n}"))).collect()
    }

    fn statuses(controller: &BatchController) -> Vec<Status> {
        controller.entries().iter().map(|e| e.status).collect()
    }

    fn write_png(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        RgbImage::from_pixel(8, 8, Rgb([30, 60, 90])).save(&path).unwrap();
        path
    }

    #[test]
    fn duplicate_adds_are_ignored() {
        let mut controller = BatchController::new();
        assert_eq!(controller.add_files(paths(&["cat.png", "dog.jpg"]), TargetFormat::Png).unwrap(), 2);
        assert_eq!(controller.add_files(paths(&["cat.png"]), TargetFormat::Webp).unwrap(), 0);

        assert_eq!(controller.len(), 2);
        assert_eq!(controller.entries()[0].target_format, TargetFormat::Png);
        assert!(statuses(&controller).iter().all(|s| *s == Status::Pending));
    }

    #[test]
    fn entries_describe_their_source() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("scan.png");
        fs::write(&source, vec![0u8; 3 * 1024 * 1024 / 2]).unwrap();

        let mut controller = BatchController::new();
        controller
            .add_files(vec![source, PathBuf::from("/a/missing.jpeg")], TargetFormat::Png)
            .unwrap();
        let entries = controller.entries();

        assert_eq!(entries[0].size_bytes, Some(3 * 1024 * 1024 / 2));
        assert_eq!(entries[0].size_label(), "1.5 MB");
        assert_eq!(entries[0].source_extension(), "PNG");
        assert_eq!(entries[1].size_bytes, None);
        assert_eq!(entries[1].size_label(), "-- MB");
        assert_eq!(entries[1].source_extension(), "JPEG");
        assert_eq!(entries[1].directory_label(), "/a");
    }

    #[test]
    fn long_directories_keep_their_tail() {
        let mut controller = BatchController::new();
        controller
            .add_files(
                vec![PathBuf::from("/home/someone/pictures/2024/holiday/beach/img.png")],
                TargetFormat::Png,
            )
            .unwrap();

        let label = controller.entries()[0].directory_label();
        assert_eq!(label, "...ctures/2024/holiday/beach");
        assert_eq!(label.chars().count(), DIRECTORY_LABEL_CHARS + 3);
    }

    #[test]
    fn status_labels_for_rows() {
        assert_eq!(Status::Pending.display_label(), "Pending");
        assert_eq!(Status::Processing.display_label(), "Converting...");
        assert_eq!(Status::Done.display_label(), "Complete ✓");
        assert_eq!(Status::Error.display_label(), "Error");
    }

    #[test]
    fn first_add_picks_output_directory() {
        let mut controller = BatchController::new();
        controller.add_files(paths(&["cat.png"]), TargetFormat::Png).unwrap();
        assert_eq!(controller.options().output_directory, Some(PathBuf::from("/a")));

        controller
            .add_files(vec![PathBuf::from("/b/bird.png")], TargetFormat::Png)
            .unwrap();
        assert_eq!(controller.options().output_directory, Some(PathBuf::from("/a")));
    }

    #[test]
    fn chosen_output_directory_is_kept_on_first_add() {
        let mut controller = BatchController::new();
        controller.set_output_directory(Some(PathBuf::from("/out")));
        controller.add_files(paths(&["cat.png"]), TargetFormat::Png).unwrap();
        assert_eq!(controller.options().output_directory, Some(PathBuf::from("/out")));
    }

    #[test]
    fn set_format_on_subset_leaves_others() {
        let mut controller = BatchController::new();
        controller
            .add_files(paths(&["a.png", "b.png", "c.png", "d.png"]), TargetFormat::Png)
            .unwrap();

        controller.set_format(TargetFormat::Jpg, &[1, 2, 99]).unwrap();

        let formats: Vec<_> = controller.entries().iter().map(|e| e.target_format).collect();
        assert_eq!(
            formats,
            vec![TargetFormat::Png, TargetFormat::Jpg, TargetFormat::Jpg, TargetFormat::Png]
        );
    }

    #[test]
    fn set_format_without_subset_updates_everything() {
        let mut controller = BatchController::new();
        controller.add_files(paths(&["a.png", "b.png"]), TargetFormat::Png).unwrap();
        controller.set_format(TargetFormat::Gif, &[1]).unwrap();

        controller.set_format(TargetFormat::Tiff, &[]).unwrap();

        assert!(controller.entries().iter().all(|e| e.target_format == TargetFormat::Tiff));
    }

    #[test]
    fn clear_resets_entries_and_options() {
        let mut controller = BatchController::new();
        controller.add_files(paths(&["a.png"]), TargetFormat::Png).unwrap();
        controller.set_preserve_metadata(true);
        controller.set_max_compression(true);

        controller.clear().unwrap();

        assert!(controller.is_empty());
        assert_eq!(controller.options(), &BatchOptions::default());
    }

    #[test]
    fn remove_drops_one_entry() {
        let mut controller = BatchController::new();
        controller.add_files(paths(&["a.png", "b.png"]), TargetFormat::Png).unwrap();

        let removed = controller.remove(0).unwrap().unwrap();
        assert_eq!(removed.source_path, PathBuf::from("/a/a.png"));
        assert_eq!(controller.remove(5).unwrap(), None);
        assert_eq!(controller.len(), 1);
    }

    #[test]
    fn run_without_output_directory_touches_nothing() {
        let stub = Arc::new(StubConverter::default());
        let mut controller = BatchController::with_converter(stub.clone());
        controller.add_files(vec![PathBuf::from("relative.png")], TargetFormat::Png).unwrap();
        assert_eq!(controller.options().output_directory, None);

        let err = controller.run().err().unwrap();

        assert!(matches!(
            err,
            BatchError::Configuration(ConfigurationError::MissingOutputDirectory)
        ));
        assert_eq!(statuses(&controller), vec![Status::Pending]);
        assert!(stub.calls.lock().unwrap().is_empty());
        assert!(!controller.is_running());
    }

    #[test]
    fn run_with_uncreatable_directory_is_a_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file.txt");
        fs::write(&blocker, b"x").unwrap();

        let mut controller = BatchController::with_converter(Arc::new(StubConverter::default()));
        controller.add_files(paths(&["a.png"]), TargetFormat::Png).unwrap();
        controller.set_output_directory(Some(blocker.join("sub")));

        let err = controller.run().err().unwrap();
        assert!(matches!(
            err,
            BatchError::Configuration(ConfigurationError::OutputDirectory { .. })
        ));
        assert_eq!(statuses(&controller), vec![Status::Pending]);
    }

    #[test]
    fn failing_entry_does_not_abort_the_batch() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let first = write_png(src.path(), "one.png");
        let broken = src.path().join("two.png");
        fs::write(&broken, b"garbage").unwrap();
        let third = write_png(src.path(), "three.png");

        let mut controller = BatchController::new();
        controller.add_files(vec![first, broken, third], TargetFormat::Jpg).unwrap();
        controller.set_output_directory(Some(out.path().to_path_buf()));

        let events = controller.run().unwrap().wait();

        assert_eq!(statuses(&controller), vec![Status::Done, Status::Error, Status::Done]);
        assert!(out.path().join("one.jpg").exists());
        assert!(!out.path().join("two.jpg").exists());
        assert!(out.path().join("three.jpg").exists());
        assert_eq!(events.last(), Some(&BatchEvent::Finished { succeeded: 2, failed: 1 }));
    }

    #[test]
    fn progress_is_reported_after_every_entry() {
        let stub = Arc::new(StubConverter {
            fail_on: Some(PathBuf::from("/a/b.png")),
            ..Default::default()
        });
        let mut controller = BatchController::with_converter(stub);
        controller
            .add_files(paths(&["a.png", "b.png", "c.png", "d.png"]), TargetFormat::Png)
            .unwrap();
        let out = tempfile::tempdir().unwrap();
        controller.set_output_directory(Some(out.path().to_path_buf()));

        let events = controller.run().unwrap().wait();

        let progress: Vec<f32> = events.iter().filter_map(BatchEvent::progress).collect();
        assert_eq!(progress, vec![0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn entries_pass_through_processing_in_order() {
        let mut controller = BatchController::with_converter(Arc::new(StubConverter::default()));
        controller.add_files(paths(&["a.png", "b.png"]), TargetFormat::Png).unwrap();
        let out = tempfile::tempdir().unwrap();
        controller.set_output_directory(Some(out.path().to_path_buf()));

        let events = controller.run().unwrap().wait();

        assert_eq!(
            events,
            vec![
                BatchEvent::Started { total: 2 },
                BatchEvent::Status { index: 0, status: Status::Processing },
                BatchEvent::Status { index: 0, status: Status::Done },
                BatchEvent::Progress { completed: 1, total: 2 },
                BatchEvent::Status { index: 1, status: Status::Processing },
                BatchEvent::Status { index: 1, status: Status::Done },
                BatchEvent::Progress { completed: 2, total: 2 },
                BatchEvent::Finished { succeeded: 2, failed: 0 },
            ]
        );
    }

    #[test]
    fn mutations_and_second_run_are_rejected_while_running() {
        let (release, gate) = mpsc::channel();
        let stub = Arc::new(StubConverter {
            gate: Some(Mutex::new(gate)),
            ..Default::default()
        });
        let mut controller = BatchController::with_converter(stub);
        controller.add_files(paths(&["a.png"]), TargetFormat::Png).unwrap();
        let out = tempfile::tempdir().unwrap();
        controller.set_output_directory(Some(out.path().to_path_buf()));

        let handle = controller.run().unwrap();
        assert!(controller.is_running());

        assert!(matches!(controller.run(), Err(BatchError::Busy(BusyError))));
        assert_eq!(controller.add_files(paths(&["z.png"]), TargetFormat::Png), Err(BusyError));
        assert_eq!(controller.set_format(TargetFormat::Gif, &[]), Err(BusyError));
        assert_eq!(controller.clear(), Err(BusyError));
        assert_eq!(controller.remove(0), Err(BusyError));

        release.send(()).unwrap();
        handle.wait();

        assert!(!controller.is_running());
        assert_eq!(statuses(&controller), vec![Status::Done]);
        assert_eq!(controller.entries()[0].target_format, TargetFormat::Png);
    }

    #[test]
    fn new_run_resets_previous_statuses() {
        let stub = Arc::new(StubConverter {
            fail_on: Some(PathBuf::from("/a/a.png")),
            ..Default::default()
        });
        let mut controller = BatchController::with_converter(stub);
        controller.add_files(paths(&["a.png"]), TargetFormat::Png).unwrap();
        let out = tempfile::tempdir().unwrap();
        controller.set_output_directory(Some(out.path().to_path_buf()));

        let first = controller.run().unwrap().wait();
        let second = controller.run().unwrap().wait();

        assert_eq!(first, second);
        assert_eq!(statuses(&controller), vec![Status::Error]);
    }

    #[test]
    fn webp_batch_writes_full_quality_files() {
        struct Recording {
            inner: ImageExporter,
            seen: Mutex<Vec<SaveParams>>,
        }

        impl Converter for Recording {
            fn convert(
                &self,
                source: &Path,
                format: TargetFormat,
                output_dir: &Path,
                preserve_metadata: bool,
                max_compression: bool,
            ) -> Result<PathBuf, ConversionError> {
                self.seen
                    .lock()
                    .unwrap()
                    .push(SaveParams::for_format(format, max_compression));
                self.inner
                    .convert(source, format, output_dir, preserve_metadata, max_compression)
            }
        }

        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let cat = write_png(src.path(), "cat.png");
        let dog = src.path().join("dog.jpg");
        RgbImage::from_pixel(8, 8, Rgb([200, 100, 0])).save(&dog).unwrap();

        let recording = Arc::new(Recording {
            inner: ImageExporter,
            seen: Mutex::new(Vec::new()),
        });
        let mut controller = BatchController::with_converter(recording.clone());
        controller.add_files(vec![cat, dog], TargetFormat::Webp).unwrap();

        let options = BatchOptions {
            output_directory: Some(out.path().join("converted")),
            preserve_metadata: false,
            max_compression: false,
        };
        controller.run_with(options).unwrap().wait();

        assert!(out.path().join("converted/cat.webp").exists());
        assert!(out.path().join("converted/dog.webp").exists());
        assert_eq!(statuses(&controller), vec![Status::Done, Status::Done]);
        assert_eq!(
            *recording.seen.lock().unwrap(),
            vec![SaveParams::Webp { quality: 100, method: 6 }; 2]
        );
    }
}
