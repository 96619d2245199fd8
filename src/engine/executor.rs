//! Render executors.
//!
//! The controller never rasterizes pages itself: it submits [`RenderJob`]s to a
//! [`RenderExecutor`] and collects [`RenderCompletion`]s on its next tick. Every
//! job carries a [`RenderTicket`] naming the epoch it was requested in, so a
//! completion that outlives a navigation can be recognised and dropped.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::page_renderer::{RenderedPage, render_page};
use super::state::Epoch;
use super::surface::SurfaceFactory;
use crate::document::{DocumentHandle, PageNumber};
use crate::error::PageRenderError;

/// Identifies one page request within one epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderTicket {
    pub epoch: Epoch,
    pub page: PageNumber,
}

/// A page render request.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub ticket: RenderTicket,
    pub scale: f32,
    pub document: Arc<dyn DocumentHandle>,
    pub surfaces: Arc<dyn SurfaceFactory>,
}

impl RenderJob {
    /// Render the page on the calling thread.
    pub fn execute(&self) -> RenderCompletion {
        let result = render_page(
            self.document.as_ref(),
            self.surfaces.as_ref(),
            self.ticket.page,
            self.scale,
        );
        RenderCompletion {
            ticket: self.ticket,
            result,
        }
    }
}

/// Outcome of a [`RenderJob`].
#[derive(Debug)]
pub struct RenderCompletion {
    pub ticket: RenderTicket,
    pub result: Result<RenderedPage, PageRenderError>,
}

/// Runs render jobs and hands back their completions in submission order.
pub trait RenderExecutor: std::fmt::Debug {
    /// Queue a job.
    ///
    /// # Errors
    ///
    /// Returns [`PageRenderError::WorkerGone`] when the executor can no longer
    /// accept work.
    fn submit(&mut self, job: RenderJob) -> Result<(), PageRenderError>;

    /// Next finished job, if one is ready.
    ///
    /// # Errors
    ///
    /// Returns [`PageRenderError::WorkerGone`] when no completion can ever
    /// arrive again.
    fn try_next(&mut self) -> Result<Option<RenderCompletion>, PageRenderError>;

    /// Wait up to `timeout` for the next finished job.
    fn wait_next(&mut self, timeout: Duration) -> Option<RenderCompletion>;
}

/// Renders on the calling thread at submit time.
#[derive(Debug, Default)]
pub struct InlineExecutor {
    ready: VecDeque<RenderCompletion>,
}

impl InlineExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.ready.len()
    }
}

impl RenderExecutor for InlineExecutor {
    fn submit(&mut self, job: RenderJob) -> Result<(), PageRenderError> {
        self.ready.push_back(job.execute());
        Ok(())
    }

    fn try_next(&mut self) -> Result<Option<RenderCompletion>, PageRenderError> {
        Ok(self.ready.pop_front())
    }

    fn wait_next(&mut self, _timeout: Duration) -> Option<RenderCompletion> {
        self.ready.pop_front()
    }
}

/// Renders on one background thread.
///
/// The worker exits when the executor is dropped; dropping joins it.
#[derive(Debug)]
pub struct WorkerExecutor {
    jobs: Option<Sender<RenderJob>>,
    completions: Receiver<RenderCompletion>,
    handle: Option<JoinHandle<()>>,
}

impl WorkerExecutor {
    /// Spawn the render worker.
    ///
    /// # Errors
    ///
    /// Returns the I/O error from the OS when the thread cannot be spawned.
    pub fn spawn() -> std::io::Result<Self> {
        let (job_tx, job_rx) = mpsc::channel::<RenderJob>();
        let (done_tx, done_rx) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("pagewise-render".to_string())
            .spawn(move || {
                for job in job_rx {
                    let completion = execute_guarded(&job);
                    if done_tx.send(completion).is_err() {
                        break;
                    }
                }
                tracing::debug!("render worker stopped");
            })?;
        Ok(Self {
            jobs: Some(job_tx),
            completions: done_rx,
            handle: Some(handle),
        })
    }
}

/// Run `job`, turning a panicking document backend into a rejected page.
fn execute_guarded(job: &RenderJob) -> RenderCompletion {
    panic::catch_unwind(AssertUnwindSafe(|| job.execute())).unwrap_or_else(|payload| {
        let reason = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "renderer panicked".to_owned());
        tracing::error!(page = job.ticket.page, %reason, "page renderer panicked");
        RenderCompletion {
            ticket: job.ticket,
            result: Err(PageRenderError::Rejected {
                page: job.ticket.page,
                reason,
            }),
        }
    })
}

impl RenderExecutor for WorkerExecutor {
    fn submit(&mut self, job: RenderJob) -> Result<(), PageRenderError> {
        let Some(jobs) = &self.jobs else {
            return Err(PageRenderError::WorkerGone);
        };
        jobs.send(job).map_err(|_| PageRenderError::WorkerGone)
    }

    fn try_next(&mut self) -> Result<Option<RenderCompletion>, PageRenderError> {
        match self.completions.try_recv() {
            Ok(completion) => Ok(Some(completion)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(PageRenderError::WorkerGone),
        }
    }

    fn wait_next(&mut self, timeout: Duration) -> Option<RenderCompletion> {
        match self.completions.recv_timeout(timeout) {
            Ok(completion) => Some(completion),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }
}

impl Drop for WorkerExecutor {
    fn drop(&mut self) {
        // Closing the job channel ends the worker loop.
        self.jobs.take();
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            tracing::warn!("render worker panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{FixtureDocument, FixtureManifest};
    use crate::engine::surface::RasterSurfaces;

    fn job(page: PageNumber, epoch: Epoch) -> RenderJob {
        let document = FixtureDocument::new(FixtureManifest::uniform(3, 40.0, 50.0)).unwrap();
        RenderJob {
            ticket: RenderTicket { epoch, page },
            scale: 1.0,
            document: Arc::new(document),
            surfaces: Arc::new(RasterSurfaces::default()),
        }
    }

    #[test]
    fn test_inline_executor_completes_in_order() {
        let mut executor = InlineExecutor::new();
        executor.submit(job(1, Epoch::ZERO)).unwrap();
        executor.submit(job(2, Epoch::ZERO)).unwrap();
        assert_eq!(executor.pending(), 2);
        let first = executor.try_next().unwrap().unwrap();
        assert_eq!(first.ticket.page, 1);
        assert!(first.result.is_ok());
        assert_eq!(executor.try_next().unwrap().unwrap().ticket.page, 2);
        assert!(executor.try_next().unwrap().is_none());
    }

    #[test]
    fn test_inline_executor_reports_failures() {
        let mut executor = InlineExecutor::new();
        executor.submit(job(9, Epoch::ZERO)).unwrap();
        let completion = executor.try_next().unwrap().unwrap();
        assert_eq!(
            completion.result.unwrap_err(),
            PageRenderError::OutOfRange { page: 9, total: 3 }
        );
    }

    #[test]
    fn test_worker_executor_returns_tickets() {
        let mut executor = WorkerExecutor::spawn().unwrap();
        let epoch = Epoch::ZERO.next();
        executor.submit(job(2, epoch)).unwrap();
        let completion = executor.wait_next(Duration::from_secs(5)).unwrap();
        assert_eq!(completion.ticket, RenderTicket { epoch, page: 2 });
        assert_eq!(completion.result.unwrap().surface.dimensions(), (40, 50));
    }

    #[test]
    fn test_worker_executor_wait_times_out_when_idle() {
        let mut executor = WorkerExecutor::spawn().unwrap();
        assert!(executor.wait_next(Duration::from_millis(10)).is_none());
        assert!(executor.try_next().unwrap().is_none());
    }
}
