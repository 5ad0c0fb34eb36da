//! Processing pipeline: upload → remote segmentation → ready / failed.
//!
//! The pipeline tracks exactly one image at a time. Every submission gets a
//! [`Ticket`] carrying a generation number; only events for the latest
//! ticket may change [`PipelineState`]. A response that arrives after a newer
//! submission (or after a reset) is dropped, so a slow first request can
//! never overwrite the result of a later one.
//!
//! ```text
//! Idle ──begin──▶ Uploading ──dispatched──▶ AwaitingResult ──ok──▶ Ready(processed)
//!   ▲                 ▲                                    └─err──▶ Failed(reason)
//!   └──── reset ──────┴──────────── begin (supersedes) ────────────────┘
//! ```

use crate::asset::ImageAsset;
use crate::compose;
use crate::error::{AppError, Result};
use crate::service::SegmentationService;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread;

/// Identifies one submission. Issued by [`Pipeline::begin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket {
    generation: u64,
}


#[derive(Debug, Clone, Default)]
pub enum PipelineState {
    #[default]
    Idle,
    Uploading,
    AwaitingResult,
    /// Holds the processed (alpha-carrying) image.
    Ready(ImageAsset),
    /// Holds the user-facing failure reason.
    Failed(String),
}

impl PipelineState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Uploading => "uploading",
            Self::AwaitingResult => "awaiting-result",
            Self::Ready(_) => "ready",
            Self::Failed(_) => "failed",
        }
    }
}

/// Progress of a submission, produced by [`drive`].
#[derive(Debug)]
pub enum PipelineEventKind {
    /// The request has been handed to the transport.
    Dispatched,
    /// The round trip finished.
    Completed(Result<ImageAsset>),
}

#[derive(Debug)]
pub struct PipelineEvent {
    pub ticket: Ticket,
    pub kind: PipelineEventKind,
}

#[derive(Debug, Default)]
pub struct Pipeline {
    state: PipelineState,
    generation: u64,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// The processed image, once the latest submission succeeded.
    pub fn processed(&self) -> Option<&ImageAsset> {
        match &self.state {
            PipelineState::Ready(asset) => Some(asset),
            _ => None,
        }
    }

    /// Whether a submission is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(self.state, PipelineState::Uploading | PipelineState::AwaitingResult)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        ticket.generation == self.generation
    }

    /// Starts a new submission, superseding any earlier one.
    ///
    /// The previous processed image is dropped immediately.
    pub fn begin(&mut self) -> Ticket {
        self.generation += 1;
        self.transition(PipelineState::Uploading);
        Ticket {
            generation: self.generation,
        }
    }

    /// Returns to `Idle`; outstanding tickets become stale.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.transition(PipelineState::Idle);
    }

    /// Records that the request for `ticket` is on the wire.
    ///
    /// Returns `false` (and changes nothing) for a stale ticket.
    pub fn mark_awaiting(&mut self, ticket: Ticket) -> bool {
        if !self.is_current(ticket) || !matches!(self.state, PipelineState::Uploading) {
            return false;
        }
        self.transition(PipelineState::AwaitingResult);
        true
    }

    /// Applies the outcome of the submission identified by `ticket`.
    ///
    /// Returns `false` (and changes nothing) for a stale ticket or when the
    /// submission has already been resolved.
    pub fn resolve(&mut self, ticket: Ticket, outcome: Result<ImageAsset>) -> bool {
        if !self.is_current(ticket) {
            tracing::warn!(
                stale = ticket.generation,
                current = self.generation,
                "discarding result of superseded submission"
            );
            return false;
        }
        if !self.is_busy() {
            return false;
        }

        match outcome {
            Ok(processed) => self.transition(PipelineState::Ready(processed)),
            Err(e) => {
                tracing::warn!(error = %e, "image processing failed");
                self.transition(PipelineState::Failed(e.user_message().to_string()));
            }
        }
        true
    }

    /// Dispatches an event to [`Pipeline::mark_awaiting`] or [`Pipeline::resolve`].
    pub fn apply(&mut self, event: PipelineEvent) -> bool {
        match event.kind {
            PipelineEventKind::Dispatched => self.mark_awaiting(event.ticket),
            PipelineEventKind::Completed(outcome) => self.resolve(event.ticket, outcome),
        }
    }

    fn transition(&mut self, next: PipelineState) {
        tracing::debug!(
            from = self.state.name(),
            to = next.name(),
            generation = self.generation,
            "pipeline transition"
        );
        self.state = next;
    }
}

/// Runs one submission against `service`, reporting progress through `emit`.
///
/// Exactly one request is made. The response body must be decodable as an
/// image before it is accepted; anything else completes with an error.
pub async fn drive<F>(service: &dyn SegmentationService, ticket: Ticket, raw: ImageAsset, mut emit: F)
where
    F: FnMut(PipelineEvent),
{
    tracing::info!(
        generation = ticket.generation,
        name = raw.name(),
        bytes = raw.len(),
        "submitting image"
    );

    emit(PipelineEvent {
        ticket,
        kind: PipelineEventKind::Dispatched,
    });

    let outcome = match service.process_image(&raw).await {
        Ok(body) => accept_response(body).await,
        Err(e) => Err(e),
    };

    emit(PipelineEvent {
        ticket,
        kind: PipelineEventKind::Completed(outcome),
    });
}

/// A body is only accepted once it decodes completely; a valid header over
/// truncated pixel data is a decode failure.
async fn accept_response(body: Vec<u8>) -> Result<ImageAsset> {
    if body.is_empty() {
        return Err(AppError::decode("segmentation service returned an empty body"));
    }
    let processed = ImageAsset::from_bytes("processed.png", body);
    let pixels = compose::decode_blocking(processed.clone()).await?;
    tracing::info!(
        width = pixels.width(),
        height = pixels.height(),
        "processed image received"
    );
    Ok(processed)
}

/// Callback used to wake the UI when an event is queued.
pub type Notifier = Arc<dyn Fn() + Send + Sync>;

/// Runs submissions on worker threads and queues their events.
///
/// Each submission gets its own thread with a single-threaded tokio runtime;
/// nothing is cancelled, superseded work simply reports stale tickets.
pub struct PipelineRunner {
    service: Arc<dyn SegmentationService>,
    tx: Sender<PipelineEvent>,
    rx: Receiver<PipelineEvent>,
    notifier: Option<Notifier>,
}

impl PipelineRunner {
    pub fn new(service: Arc<dyn SegmentationService>) -> Self {
        let (tx, rx) = channel();
        Self {
            service,
            tx,
            rx,
            notifier: None,
        }
    }

    /// Invokes `notifier` after every queued event (e.g. to request a repaint).
    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn submit(&self, ticket: Ticket, raw: ImageAsset) {
        let service = Arc::clone(&self.service);
        let tx = self.tx.clone();
        let notifier = self.notifier.clone();

        thread::spawn(move || {
            let send = |event: PipelineEvent| {
                let _ = tx.send(event);
                if let Some(notify) = &notifier {
                    notify();
                }
            };

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build();

            match runtime {
                Ok(rt) => rt.block_on(drive(service.as_ref(), ticket, raw, send)),
                Err(e) => send(PipelineEvent {
                    ticket,
                    kind: PipelineEventKind::Completed(Err(AppError::Unknown(format!(
                        "Failed to create async runtime: {}",
                        e
                    )))),
                }),
            }
        });
    }

    /// Takes every event queued so far without blocking.
    pub fn drain(&self) -> Vec<PipelineEvent> {
        self.rx.try_iter().collect()
    }

    /// Blocks until the next event arrives.
    pub fn recv(&self) -> Option<PipelineEvent> {
        self.rx.recv().ok()
    }
}
