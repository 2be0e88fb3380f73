use std::time::Duration;

use sockbridge::MAX_DATAGRAM_SIZE;

#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub datagram_size: usize,
    pub frame_size: usize,
    pub idle_sleep: Duration,
    pub reply_wait: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            datagram_size: MAX_DATAGRAM_SIZE,
            frame_size: 64,
            idle_sleep: Duration::from_millis(1),
            reply_wait: Duration::from_millis(1000),
        }
    }
}
