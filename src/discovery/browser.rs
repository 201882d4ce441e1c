use std::collections::HashSet;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;

use super::raop::{RAOP_SERVICE_TYPE, receiver_from_service};
use crate::error::RaopError;
use crate::types::ReceiverInfo;

/// Discovery events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryEvent {
    /// A receiver was resolved
    Added(ReceiverInfo),
    /// A receiver went away; carries the full service name
    Removed(String),
}

/// mDNS browser for `_raop._tcp` services
#[derive(Debug, Default)]
pub struct ReceiverBrowser;

impl ReceiverBrowser {
    /// Create a new browser
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Start browsing
    ///
    /// # Errors
    ///
    /// Returns an error if the mDNS daemon cannot be initialized.
    pub fn browse(self) -> Result<impl Stream<Item = DiscoveryEvent>, RaopError> {
        ReceiverBrowserStream::new()
    }
}

struct ReceiverBrowserStream {
    mdns: mdns_sd::ServiceDaemon,
    stream: Box<dyn Stream<Item = mdns_sd::ServiceEvent> + Send + Unpin>,
    known: HashSet<String>,
}

impl ReceiverBrowserStream {
    fn new() -> Result<Self, RaopError> {
        let mdns = mdns_sd::ServiceDaemon::new().map_err(|e| RaopError::Discovery {
            message: format!("failed to create mDNS daemon: {e}"),
        })?;
        let receiver = mdns
            .browse(RAOP_SERVICE_TYPE)
            .map_err(|e| RaopError::Discovery {
                message: format!("failed to browse: {e}"),
            })?;
        tracing::debug!(service = RAOP_SERVICE_TYPE, "browsing");

        Ok(Self {
            mdns,
            stream: Box::new(receiver.into_stream()),
            known: HashSet::new(),
        })
    }

    fn process_event(&mut self, event: mdns_sd::ServiceEvent) -> Option<DiscoveryEvent> {
        match event {
            mdns_sd::ServiceEvent::ServiceResolved(info) => {
                let fullname = info.get_fullname();
                let receiver =
                    receiver_from_service(fullname, info.get_addresses(), info.get_port())?;
                tracing::debug!(%receiver, fullname, "receiver resolved");
                self.known.insert(fullname.to_string());
                Some(DiscoveryEvent::Added(receiver))
            }
            mdns_sd::ServiceEvent::ServiceRemoved(_, fullname) => self
                .known
                .remove(&fullname)
                .then_some(DiscoveryEvent::Removed(fullname)),
            _ => None,
        }
    }
}

impl Stream for ReceiverBrowserStream {
    type Item = DiscoveryEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            let event = match Pin::new(&mut self.stream).poll_next(cx) {
                Poll::Ready(Some(event)) => event,
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            };

            if let Some(discovery_event) = self.process_event(event) {
                return Poll::Ready(Some(discovery_event));
            }
        }
    }
}

impl Drop for ReceiverBrowserStream {
    fn drop(&mut self) {
        let _ = self.mdns.stop_browse(RAOP_SERVICE_TYPE);
        let _ = self.mdns.shutdown();
    }
}
