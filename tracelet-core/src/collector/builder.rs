use tracing::info;

use crate::error::CollectorError;
use crate::platform::Platform;

use super::Collector;

/// One-time binding of a collector's stream id and platform.
///
/// Each value may be bound exactly once; binding it again is reported by
/// [`build`](Self::build) rather than silently overwriting the first value.
pub struct CollectorBuilder<P> {
    stream_id: Option<u32>,
    platform: Option<P>,
    rebound: Option<&'static str>,
}

impl<P: Platform> CollectorBuilder<P> {
    pub fn new() -> Self {
        Self {
            stream_id: None,
            platform: None,
            rebound: None,
        }
    }

    pub fn stream_id(mut self, stream_id: u32) -> Self {
        if self.stream_id.replace(stream_id).is_some() {
            self.rebound.get_or_insert("stream id");
        }
        self
    }

    pub fn platform(mut self, platform: P) -> Self {
        if self.platform.replace(platform).is_some() {
            self.rebound.get_or_insert("platform");
        }
        self
    }

    pub fn build(self) -> Result<Collector<P>, CollectorError> {
        if let Some(what) = self.rebound {
            return Err(CollectorError::AlreadyBound(what));
        }
        let stream_id = self.stream_id.ok_or(CollectorError::Missing("stream id"))?;
        let platform = self.platform.ok_or(CollectorError::Missing("platform"))?;

        info!(stream_id, "collector ready");
        Ok(Collector::new(stream_id, platform))
    }
}

impl<P: Platform> Default for CollectorBuilder<P> {
    fn default() -> Self {
        Self::new()
    }
}
