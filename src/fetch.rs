use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::apod::{FeedError, MediaEntry};
use crate::gallery::Gallery;

pub const LOADING_MESSAGE: &str = "Loading space photos…";
pub const NO_ENTRIES_MESSAGE: &str = "No APOD entries found.";
pub const COULD_NOT_LOAD_MESSAGE: &str = "Could not load NASA images.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchFailure {
    NoEntries,
    CouldNotLoad,
}

impl FetchFailure {
    pub fn message(self) -> &'static str {
        match self {
            FetchFailure::NoEntries => NO_ENTRIES_MESSAGE,
            FetchFailure::CouldNotLoad => COULD_NOT_LOAD_MESSAGE,
        }
    }

    fn from_error(err: &FeedError) -> Self {
        if err.is_empty() {
            FetchFailure::NoEntries
        } else {
            FetchFailure::CouldNotLoad
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum FetchState {
    #[default]
    Idle,
    Loading,
    Ready(Gallery),
    Failed(FetchFailure),
}

/// Handle for one in-flight fetch. Only the ticket from the latest `begin`
/// can change the state.
#[derive(Debug, Clone)]
pub struct Ticket {
    request_id: u64,
    cancel_flag: Arc<AtomicBool>,
}

impl Ticket {
    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_flag.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
pub struct Orchestrator {
    state: FetchState,
    next_request_id: u64,
    pending: Option<Ticket>,
}

impl Orchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &FetchState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut FetchState {
        &mut self.state
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, FetchState::Loading)
    }

    pub fn gallery(&self) -> Option<&Gallery> {
        match &self.state {
            FetchState::Ready(gallery) => Some(gallery),
            _ => None,
        }
    }

    pub fn gallery_mut(&mut self) -> Option<&mut Gallery> {
        match &mut self.state {
            FetchState::Ready(gallery) => Some(gallery),
            _ => None,
        }
    }

    /// Enter Loading. Any earlier ticket is cancelled.
    pub fn begin(&mut self) -> Ticket {
        if let Some(previous) = self.pending.take() {
            previous.cancel_flag.store(true, Ordering::SeqCst);
            tracing::debug!(
                request_id = previous.request_id,
                "superseding in-flight fetch"
            );
        }
        let ticket = Ticket {
            request_id: self.next_request_id,
            cancel_flag: Arc::new(AtomicBool::new(false)),
        };
        self.next_request_id = self.next_request_id.wrapping_add(1);
        self.pending = Some(ticket.clone());
        self.state = FetchState::Loading;
        ticket
    }

    /// Apply a fetch result. Returns `false` when the result belongs to a
    /// superseded fetch and was dropped. `render` only runs for a non-empty
    /// entry list.
    pub fn finish<F>(
        &mut self,
        request_id: u64,
        result: Result<Vec<MediaEntry>, FeedError>,
        render: F,
    ) -> bool
    where
        F: FnOnce(&[MediaEntry]) -> Gallery,
    {
        let Some(pending) = &self.pending else {
            tracing::debug!(request_id, "dropping response with no fetch pending");
            return false;
        };
        if pending.request_id != request_id || pending.is_cancelled() {
            tracing::debug!(request_id, "dropping stale fetch response");
            return false;
        }
        self.pending = None;

        self.state = match result {
            Ok(entries) if entries.is_empty() => FetchState::Failed(FetchFailure::NoEntries),
            Ok(entries) => FetchState::Ready(render(&entries)),
            Err(err) => {
                tracing::warn!(request_id, error = %err, "fetch failed");
                FetchState::Failed(FetchFailure::from_error(&err))
            }
        };
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apod::MediaEntry;
    use crate::gallery;

    fn entries(n: usize) -> Vec<MediaEntry> {
        (0..n)
            .map(|i| MediaEntry {
                date: format!("2025-01-{:02}", i + 1),
                title: format!("entry {i}"),
                ..MediaEntry::default()
            })
            .collect()
    }

    fn render(entries: &[MediaEntry]) -> Gallery {
        gallery::render(entries, gallery::DEFAULT_GALLERY_SIZE)
    }

    #[test]
    fn starts_idle_then_loads() {
        let mut orchestrator = Orchestrator::new();
        assert_eq!(orchestrator.state(), &FetchState::Idle);
        orchestrator.begin();
        assert!(orchestrator.is_loading());
    }

    #[test]
    fn success_renders_gallery() {
        let mut orchestrator = Orchestrator::new();
        let ticket = orchestrator.begin();
        assert!(orchestrator.finish(ticket.request_id(), Ok(entries(12)), render));
        assert_eq!(orchestrator.gallery().map(Gallery::len), Some(9));
    }

    #[test]
    fn empty_payload_skips_renderer() {
        let mut orchestrator = Orchestrator::new();
        let ticket = orchestrator.begin();
        let applied = orchestrator.finish(ticket.request_id(), Ok(Vec::new()), |_| {
            panic!("renderer must not run for an empty feed")
        });
        assert!(applied);
        assert_eq!(
            orchestrator.state(),
            &FetchState::Failed(FetchFailure::NoEntries)
        );

        let ticket = orchestrator.begin();
        orchestrator.finish(ticket.request_id(), Err(FeedError::Empty), |_| {
            panic!("renderer must not run for an empty feed")
        });
        assert_eq!(
            orchestrator.state(),
            &FetchState::Failed(FetchFailure::NoEntries)
        );
    }

    #[test]
    fn transport_failures_could_not_load() {
        let mut orchestrator = Orchestrator::new();
        let ticket = orchestrator.begin();
        let err = FeedError::Decode("unexpected end of input".into());
        orchestrator.finish(ticket.request_id(), Err(err), render);
        assert_eq!(
            orchestrator.state(),
            &FetchState::Failed(FetchFailure::CouldNotLoad)
        );
        assert_eq!(
            FetchFailure::CouldNotLoad.message(),
            "Could not load NASA images."
        );

        let ticket = orchestrator.begin();
        let err = FeedError::Status(reqwest::StatusCode::BAD_GATEWAY);
        orchestrator.finish(ticket.request_id(), Err(err), render);
        assert_eq!(
            orchestrator.state(),
            &FetchState::Failed(FetchFailure::CouldNotLoad)
        );
    }

    #[test]
    fn stale_response_cannot_overwrite_newer_one() {
        let mut orchestrator = Orchestrator::new();
        let first = orchestrator.begin();
        let second = orchestrator.begin();
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());

        assert!(orchestrator.finish(second.request_id(), Ok(entries(3)), render));
        assert!(!orchestrator.finish(first.request_id(), Err(FeedError::Empty), render));
        assert_eq!(orchestrator.gallery().map(Gallery::len), Some(3));
    }

    #[test]
    fn stale_response_while_newer_still_loading() {
        let mut orchestrator = Orchestrator::new();
        let first = orchestrator.begin();
        let _second = orchestrator.begin();
        assert!(!orchestrator.finish(first.request_id(), Ok(entries(2)), render));
        assert!(orchestrator.is_loading());
    }

    #[test]
    fn duplicate_delivery_is_ignored() {
        let mut orchestrator = Orchestrator::new();
        let ticket = orchestrator.begin();
        assert!(orchestrator.finish(ticket.request_id(), Ok(entries(1)), render));
        assert!(!orchestrator.finish(ticket.request_id(), Ok(entries(5)), render));
        assert_eq!(orchestrator.gallery().map(Gallery::len), Some(1));
    }
}
