use lacefit_core::{DetectionOutcome, GuidelineCalculator, LandmarkDetector};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("failed to spawn engine thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("engine thread exited")]
    ChannelClosed,
}

/// What happened to a frame handed to [`EngineHandle::try_submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submit {
    /// The frame is being processed; its outcome arrives on the outcome channel.
    Accepted,
    /// A derivation was already in flight, so the frame was dropped.
    Dropped,
}

/// Messages sent from the caller to the engine thread.
enum EngineRequest<F> {
    Submit {
        frame: F,
    },
    Process {
        frame: F,
        reply: oneshot::Sender<DetectionOutcome>,
    },
}

/// Clone-safe handle to the engine thread.
pub struct EngineHandle<F> {
    tx: mpsc::Sender<EngineRequest<F>>,
    busy: Arc<AtomicBool>,
}

impl<F> Clone for EngineHandle<F> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            busy: Arc::clone(&self.busy),
        }
    }
}

impl<F> EngineHandle<F> {
    /// Hand a frame to the engine unless a derivation is already in flight.
    ///
    /// Never blocks. Late frames are dropped, not queued.
    pub fn try_submit(&self, frame: F) -> Result<Submit, EngineError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(Submit::Dropped);
        }

        match self.tx.try_send(EngineRequest::Submit { frame }) {
            Ok(()) => Ok(Submit::Accepted),
            Err(TrySendError::Full(_)) => {
                self.busy.store(false, Ordering::Release);
                Ok(Submit::Dropped)
            }
            Err(TrySendError::Closed(_)) => {
                self.busy.store(false, Ordering::Release);
                Err(EngineError::ChannelClosed)
            }
        }
    }

    /// Request/response form: wait for the engine to process this frame.
    pub async fn process(&self, frame: F) -> Result<DetectionOutcome, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Process {
                frame,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)
    }

    /// True while a submitted frame is being processed.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Spawn the engine on a dedicated OS thread.
///
/// The thread owns the detector and calculator. Outcomes of frames accepted
/// by [`EngineHandle::try_submit`] arrive on the returned receiver. The
/// thread exits once every handle is dropped.
pub fn spawn_engine<D>(
    mut detector: D,
    calculator: GuidelineCalculator,
) -> Result<(EngineHandle<D::Frame>, mpsc::Receiver<DetectionOutcome>), EngineError>
where
    D: LandmarkDetector + Send + 'static,
    D::Frame: Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<EngineRequest<D::Frame>>(1);
    let (outcome_tx, outcome_rx) = mpsc::channel::<DetectionOutcome>(4);
    let busy = Arc::new(AtomicBool::new(false));
    let worker_busy = Arc::clone(&busy);

    std::thread::Builder::new()
        .name("lacefit-engine".into())
        .spawn(move || {
            tracing::info!("engine thread started");
            while let Some(req) = rx.blocking_recv() {
                match req {
                    EngineRequest::Submit { frame } => {
                        let outcome = run_detection(&mut detector, &calculator, &frame);
                        // Busy until the outcome is queued.
                        let sent = outcome_tx.blocking_send(outcome);
                        worker_busy.store(false, Ordering::Release);
                        if sent.is_err() {
                            tracing::debug!("outcome receiver dropped");
                            break;
                        }
                    }
                    EngineRequest::Process { frame, reply } => {
                        let outcome = run_detection(&mut detector, &calculator, &frame);
                        let _ = reply.send(outcome);
                    }
                }
            }
            tracing::info!("engine thread exiting");
        })?;

    Ok((EngineHandle { tx, busy }, outcome_rx))
}

fn run_detection<D: LandmarkDetector>(
    detector: &mut D,
    calculator: &GuidelineCalculator,
    frame: &D::Frame,
) -> DetectionOutcome {
    let outcome = DetectionOutcome::from_detection(detector.detect(frame), calculator);
    match &outcome {
        DetectionOutcome::Face(state) => tracing::debug!(
            tilt = state.tilt_degrees,
            offset_mm = state.forehead_offset_mm,
            "face processed"
        ),
        DetectionOutcome::NoFace => tracing::debug!("no face in frame"),
        DetectionOutcome::Failed(e) => tracing::debug!(error = %e, "detection failed"),
    }
    outcome
}
