//! Polling until the watched region stops changing.

use tokio::time::{Instant, sleep};
use tracing::debug;

use super::{BrowserSession, RenderRequest};
use crate::Result;

/// How a stability wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stability {
    /// Ready marker seen, or the region changed and then held still.
    Settled { polls: u32 },
    /// Timeout elapsed first.
    TimedOut { polls: u32 },
}

impl Stability {
    pub(crate) const fn polls(self) -> u32 {
        match self {
            Self::Settled { polls } | Self::TimedOut { polls } => polls,
        }
    }

    pub(crate) const fn is_settled(self) -> bool {
        matches!(self, Self::Settled { .. })
    }
}

/// Poll `session` until the page settles or `request.timeout` elapses.
///
/// `baseline` is the watched text read before the selection was applied.
/// A reading only counts once it differs from the baseline, and the region
/// is settled when two consecutive counted readings match. Empty readings
/// never count. A region that still shows the baseline at the deadline is
/// reported as [`Stability::TimedOut`].
pub(crate) async fn wait_until_stable<S: BrowserSession + ?Sized>(
    session: &mut S,
    request: &RenderRequest,
    baseline: Option<&str>,
) -> Result<Stability> {
    let deadline = Instant::now() + request.timeout;
    let mut previous: Option<String> = None;
    let mut polls = 0u32;

    loop {
        polls += 1;
        if let Some(marker) = &request.ready_marker {
            if session.element_text(marker).await?.is_some() {
                debug!(polls, marker = %marker, "ready marker present");
                return Ok(Stability::Settled { polls });
            }
        }

        let current = session
            .element_text(&request.watch_selector)
            .await?
            .filter(|text| !text.trim().is_empty())
            .filter(|text| Some(text.as_str()) != baseline);
        if current.is_some() && current == previous {
            debug!(polls, "watched region stable");
            return Ok(Stability::Settled { polls });
        }
        previous = current;

        if Instant::now() + request.poll_interval > deadline {
            debug!(polls, "watched region unchanged or still changing at timeout");
            return Ok(Stability::TimedOut { polls });
        }
        sleep(request.poll_interval).await;
    }
}
