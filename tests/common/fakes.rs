//! Scripted stand-ins for the capture backend and notification sink

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use chrono::NaiveDate;

use audiotracer::capture::{CaptureConfig, CaptureFactory, CaptureResource, Encoding};
use audiotracer::clock::{Clock, ManualClock};
use audiotracer::notification::{Notification, NotificationSink};
use audiotracer::permissions::{ConfiguredGrants, Permission, PermissionGate};
use audiotracer::platform::PlatformLevel;
use audiotracer::recorder::Recorder;
use audiotracer::status::StatusPublisher;
use audiotracer::storage::StorageProvider;

/// Capture steps that can be told to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Acquire,
    Prepare,
    Start,
    Pause,
    Resume,
    Stop,
}

/// Shared script and call log for every resource a [`FakeFactory`] hands out
#[derive(Default)]
pub struct Script {
    failing: Mutex<Vec<Step>>,
    calls: Mutex<Vec<Step>>,
    prepared: Mutex<Vec<PathBuf>>,
    acquired: AtomicUsize,
    released: AtomicUsize,
}

impl Script {
    pub fn fail(&self, step: Step) {
        self.failing.lock().unwrap().push(step);
    }

    pub fn succeed(&self, step: Step) {
        self.failing.lock().unwrap().retain(|s| *s != step);
    }

    pub fn calls(&self) -> Vec<Step> {
        self.calls.lock().unwrap().clone()
    }

    pub fn prepared_paths(&self) -> Vec<PathBuf> {
        self.prepared.lock().unwrap().clone()
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    fn run(&self, step: Step) -> Result<()> {
        self.calls.lock().unwrap().push(step);
        if self.failing.lock().unwrap().contains(&step) {
            bail!("scripted {:?} failure", step);
        }
        Ok(())
    }
}

pub struct FakeFactory {
    script: Arc<Script>,
}

impl FakeFactory {
    pub fn new(script: Arc<Script>) -> Self {
        Self { script }
    }
}

impl CaptureFactory for FakeFactory {
    fn acquire(&self) -> Result<Box<dyn CaptureResource>> {
        self.script.run(Step::Acquire)?;
        self.script.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeCapture {
            script: self.script.clone(),
            released: false,
        }))
    }
}

pub struct FakeCapture {
    script: Arc<Script>,
    released: bool,
}

impl CaptureResource for FakeCapture {
    fn prepare(&mut self, config: &CaptureConfig) -> Result<()> {
        self.script.run(Step::Prepare)?;
        self.script
            .prepared
            .lock()
            .unwrap()
            .push(config.output_path.clone());
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        self.script.run(Step::Start)
    }

    fn pause(&mut self) -> Result<()> {
        self.script.run(Step::Pause)
    }

    fn resume(&mut self) -> Result<()> {
        self.script.run(Step::Resume)
    }

    fn stop(&mut self) -> Result<()> {
        self.script.run(Step::Stop)
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.script.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn backend_name(&self) -> &'static str {
        "fake"
    }
}

/// Remembers every notification posted and how often it was removed
#[derive(Default)]
pub struct RecordingSink {
    posts: Mutex<Vec<Notification>>,
    removals: AtomicUsize,
    visible: AtomicBool,
}

impl RecordingSink {
    pub fn posts(&self) -> Vec<Notification> {
        self.posts.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<Notification> {
        self.posts.lock().unwrap().last().cloned()
    }

    pub fn removals(&self) -> usize {
        self.removals.load(Ordering::SeqCst)
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }
}

impl NotificationSink for RecordingSink {
    fn post(&self, notification: &Notification) {
        self.posts.lock().unwrap().push(notification.clone());
        self.visible.store(true, Ordering::SeqCst);
    }

    fn remove(&self) {
        self.removals.fetch_add(1, Ordering::SeqCst);
        self.visible.store(false, Ordering::SeqCst);
    }
}

/// A recorder wired to fakes, a manual clock, and a temp directory
pub struct Harness {
    pub recorder: Recorder,
    pub script: Arc<Script>,
    pub sink: Arc<RecordingSink>,
    pub publisher: StatusPublisher,
    pub clock: ManualClock,
    pub storage: StorageProvider,
}

pub struct HarnessBuilder {
    dir: PathBuf,
    date: NaiveDate,
    level: PlatformLevel,
    granted: Vec<Permission>,
}

impl HarnessBuilder {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            level: PlatformLevel::CURRENT,
            granted: Permission::all().to_vec(),
        }
    }

    pub fn date(mut self, date: NaiveDate) -> Self {
        self.date = date;
        self
    }

    pub fn level(mut self, level: PlatformLevel) -> Self {
        self.level = level;
        self
    }

    pub fn granted(mut self, granted: &[Permission]) -> Self {
        self.granted = granted.to_vec();
        self
    }

    pub fn build(self) -> Harness {
        let clock = ManualClock::at_date(self.date).expect("midnight exists locally");
        let shared: Arc<dyn Clock> = Arc::new(clock.clone());
        let storage = StorageProvider::new(self.dir.clone(), 128_000, shared);
        let gate = PermissionGate::new(
            self.level,
            Box::new(ConfiguredGrants::new(self.granted.iter().copied())),
        );

        let script = Arc::new(Script::default());
        let sink = Arc::new(RecordingSink::default());
        let publisher = StatusPublisher::new();

        let recorder = Recorder::new(
            storage.clone(),
            gate,
            Box::new(FakeFactory::new(script.clone())),
            sink.clone(),
            publisher.clone(),
            Encoding {
                bitrate: 128_000,
                sample_rate: 44_100,
                channels: 1,
            },
        );

        Harness {
            recorder,
            script,
            sink,
            publisher,
            clock,
            storage,
        }
    }
}
