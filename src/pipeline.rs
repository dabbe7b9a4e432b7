//! Deferred side-artifact generation: queues, workers, and the join barrier.
//!
//! Page rendering is single-threaded and fast; PDF typesetting and image
//! transcoding are slow, so they are deferred as jobs. A fixed pool of worker
//! threads, sized to available parallelism, polls two independent queues (PDF
//! jobs and image jobs) for the lifetime of the build.
//!
//! Two signals are deliberately distinct:
//!
//! - **join** blocks until every job enqueued so far has been acknowledged.
//!   It says nothing about future jobs — gallery assembly enqueues image work
//!   after the page-render phase and joins again on its own queue.
//! - **stop** tells workers no further work will ever arrive. Workers exit
//!   only once stop is set *and* both queues are empty, so late enqueues are
//!   never lost.
//!
//! Conflating the two deadlocks the build; see [`JobQueue::join`].
//!
//! A failing job never takes down a worker: the failure is recorded on the
//! session and the job acknowledged, so joins still complete. Orchestration
//! checks the failure list after the final join and fails the build.

use crate::imaging::{Derivative, ImageBackend, TranscodeParams};
use crate::pdf::{PdfBackend, PdfOptions};
use crate::recipe::Recipe;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

/// Deferred PDF typesetting for one recipe page.
#[derive(Debug, Clone)]
pub struct PdfJob {
    pub recipe: Recipe,
    /// Output path relative to the output root, e.g. `static/cooking/soup.pdf`.
    pub pdf_path: PathBuf,
    /// Source document mtime, for reproducible PDF metadata.
    pub source_date_epoch: u64,
}

/// Deferred derivative generation for one gallery image.
///
/// Carries both derivative paths; either is `None` when that derivative
/// already exists on disk.
#[derive(Debug, Clone)]
pub struct ImageJob {
    pub source: PathBuf,
    pub full_output: Option<PathBuf>,
    pub thumbnail_output: Option<PathBuf>,
}

/// A job that failed, kept for the post-join build verdict.
#[derive(Debug, Clone)]
pub struct JobFailure {
    /// The job's primary input (source document or image).
    pub path: PathBuf,
    pub detail: String,
}

struct QueueState<T> {
    items: VecDeque<T>,
    /// Jobs pushed but not yet acknowledged. Includes items currently being
    /// processed, so it only reaches zero once work is actually done.
    outstanding: usize,
}

/// Thread-safe FIFO work queue with an outstanding-work join barrier.
pub struct JobQueue<T> {
    state: Mutex<QueueState<T>>,
    items_available: Condvar,
    all_done: Condvar,
}

impl<T> JobQueue<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                outstanding: 0,
            }),
            items_available: Condvar::new(),
            all_done: Condvar::new(),
        }
    }

    pub fn push(&self, item: T) {
        let mut state = self.state.lock().unwrap();
        state.items.push_back(item);
        state.outstanding += 1;
        self.items_available.notify_one();
    }

    /// Dequeue, waiting up to `timeout` for an item to arrive.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        let mut state = self.state.lock().unwrap();
        if state.items.is_empty() {
            let (next, _) = self
                .items_available
                .wait_timeout(state, timeout)
                .unwrap();
            state = next;
        }
        state.items.pop_front()
    }

    /// Dequeue without waiting.
    pub fn try_pop(&self) -> Option<T> {
        self.state.lock().unwrap().items.pop_front()
    }

    /// Acknowledge one dequeued job as complete. Must be called exactly once
    /// per popped item, success or failure, or `join` never returns.
    pub fn ack(&self) {
        let mut state = self.state.lock().unwrap();
        debug_assert!(state.outstanding > 0, "ack without matching push");
        state.outstanding -= 1;
        if state.outstanding == 0 {
            self.all_done.notify_all();
        }
    }

    /// Block until every job pushed so far has been acknowledged.
    ///
    /// This is a completion barrier, not a shutdown: jobs may still be pushed
    /// afterwards and joined again.
    pub fn join(&self) {
        let mut state = self.state.lock().unwrap();
        while state.outstanding > 0 {
            state = self.all_done.wait(state).unwrap();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().unwrap().items.is_empty()
    }
}

impl<T> Default for JobQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared state of one build session's pipeline: the two queues, the stop
/// flag, and the failure list. Created at build start, dropped at build end.
pub struct Pipeline {
    pub pdf_jobs: JobQueue<PdfJob>,
    pub image_jobs: JobQueue<ImageJob>,
    stop: AtomicBool,
    failures: Mutex<Vec<JobFailure>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            pdf_jobs: JobQueue::new(),
            image_jobs: JobQueue::new(),
            stop: AtomicBool::new(false),
            failures: Mutex::new(Vec::new()),
        }
    }

    /// Signal that no further jobs will be enqueued.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn should_stop(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    pub fn record_failure(&self, failure: JobFailure) {
        self.failures.lock().unwrap().push(failure);
    }

    pub fn take_failures(&self) -> Vec<JobFailure> {
        std::mem::take(&mut self.failures.lock().unwrap())
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything a worker needs besides the pipeline itself.
pub struct WorkerContext {
    pub output_dir: PathBuf,
    pub pdf_backend: Arc<dyn PdfBackend>,
    pub image_backend: Arc<dyn ImageBackend>,
}

/// Fixed pool of worker threads draining both queues.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Number of workers when the caller has no preference.
    pub fn default_size() -> usize {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
    }

    pub fn spawn(pipeline: Arc<Pipeline>, workers: usize, context: WorkerContext) -> Self {
        let context = Arc::new(context);
        let handles = (0..workers.max(1))
            .map(|_| {
                let pipeline = Arc::clone(&pipeline);
                let context = Arc::clone(&context);
                std::thread::spawn(move || worker_loop(&pipeline, &context))
            })
            .collect();
        Self { handles }
    }

    /// Wait for all workers to exit. Call only after `Pipeline::stop`.
    pub fn join(self) {
        for handle in self.handles {
            let _ = handle.join();
        }
    }
}

fn worker_loop(pipeline: &Pipeline, context: &WorkerContext) {
    loop {
        if let Some(job) = pipeline.pdf_jobs.pop_timeout(Duration::from_millis(50)) {
            process_pdf_job(pipeline, context, &job);
            pipeline.pdf_jobs.ack();
            continue;
        }
        if let Some(job) = pipeline.image_jobs.try_pop() {
            process_image_job(pipeline, context, &job);
            pipeline.image_jobs.ack();
            continue;
        }
        if pipeline.should_stop()
            && pipeline.pdf_jobs.is_empty()
            && pipeline.image_jobs.is_empty()
        {
            break;
        }
    }
}

fn process_pdf_job(pipeline: &Pipeline, context: &WorkerContext, job: &PdfJob) {
    let output = context.output_dir.join(&job.pdf_path);
    let result = (|| {
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let options = PdfOptions::new(job.source_date_epoch);
        context
            .pdf_backend
            .render(&job.recipe, &options, &output)
            .map_err(|e| std::io::Error::other(e.to_string()))
    })();

    match result {
        Ok(()) => println!("{}", output.display()),
        Err(e) => pipeline.record_failure(JobFailure {
            path: job.pdf_path.clone(),
            detail: e.to_string(),
        }),
    }
}

fn process_image_job(pipeline: &Pipeline, context: &WorkerContext, job: &ImageJob) {
    let targets = [
        (Derivative::Full, &job.full_output),
        (Derivative::Thumbnail, &job.thumbnail_output),
    ];
    for (derivative, output) in targets {
        let Some(output) = output else { continue };
        let result = (|| {
            if let Some(parent) = output.parent() {
                std::fs::create_dir_all(parent)?;
            }
            context
                .image_backend
                .transcode(&TranscodeParams {
                    source: job.source.clone(),
                    output: output.clone(),
                    derivative,
                })
                .map_err(|e| std::io::Error::other(e.to_string()))
        })();

        match result {
            Ok(()) => println!("{}", output.display()),
            Err(e) => {
                pipeline.record_failure(JobFailure {
                    path: job.source.clone(),
                    detail: e.to_string(),
                });
                // First failing derivative is enough to fail the build.
                break;
            }
        }
    }
}
