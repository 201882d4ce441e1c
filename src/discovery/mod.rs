//! mDNS discovery of RAOP receivers
//!
//! A thin wrapper over `mdns-sd` that turns resolved `_raop._tcp` services
//! into [`ReceiverInfo`] values a session can connect to.

mod browser;
pub mod raop;

use std::collections::HashMap;
use std::time::Duration;

use futures::{Stream, StreamExt};

pub use browser::{DiscoveryEvent, ReceiverBrowser};
pub use raop::{RAOP_SERVICE_TYPE, parse_raop_service_name};

use crate::error::RaopError;
use crate::types::ReceiverInfo;

/// Browse for receivers continuously
///
/// The stream runs until dropped.
///
/// # Example
///
/// ```rust,no_run
/// use futures::StreamExt;
/// use raop_stream::discovery::{DiscoveryEvent, browse};
///
/// # async fn example() -> Result<(), raop_stream::RaopError> {
/// let events = browse()?;
/// futures::pin_mut!(events);
///
/// while let Some(event) = events.next().await {
///     match event {
///         DiscoveryEvent::Added(receiver) => println!("found {receiver}"),
///         DiscoveryEvent::Removed(name) => println!("lost {name}"),
///     }
/// }
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns an error if the mDNS daemon cannot be initialized.
pub fn browse() -> Result<impl Stream<Item = DiscoveryEvent>, RaopError> {
    ReceiverBrowser::new().browse()
}

/// Collect receivers seen within `timeout`
///
/// # Errors
///
/// Returns an error if the mDNS daemon cannot be initialized.
pub async fn scan(timeout: Duration) -> Result<Vec<ReceiverInfo>, RaopError> {
    let stream = browse()?;
    tokio::pin!(stream);

    let mut receivers: HashMap<String, ReceiverInfo> = HashMap::new();
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        tokio::select! {
            () = tokio::time::sleep_until(deadline) => break,
            event = stream.next() => match event {
                Some(DiscoveryEvent::Added(receiver)) => {
                    receivers.insert(receiver.authority(), receiver);
                }
                Some(DiscoveryEvent::Removed(fullname)) => {
                    let name = raop::instance_name(&fullname);
                    let name = parse_raop_service_name(name)
                        .map_or_else(|| name.to_string(), |(_, n)| n);
                    receivers.retain(|_, r| r.name != name);
                }
                None => break,
            },
        }
    }

    Ok(receivers.into_values().collect())
}
