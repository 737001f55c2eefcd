//! Completion detection (spec.md §4.8 step 5): the model client exposes a
//! content-delta stream with no explicit end-of-turn signal beyond the
//! stream closing, so a side task declares completion once the response
//! buffer stops growing, with a hard cap so a stalled stream can't wedge a
//! session forever.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use crate::session::ChatSessionState;

const INITIAL_DELAY: Duration = Duration::from_secs(3);
const SAMPLE_INTERVAL: Duration = Duration::from_secs(2);
const MAX_EXTRA_WINDOWS: u32 = 5;
const EXTRA_WINDOW: Duration = Duration::from_secs(5);

/// Waits until the session's buffer has stopped growing for two
/// consecutive samples, the model stream has signalled natural completion
/// via `stream_done`, or the hard cap (~28 s total) elapses.
pub async fn await_completion(state: &Arc<ChatSessionState>, stream_done: &AtomicBool) {
    sleep(INITIAL_DELAY).await;

    let mut last_len = state.buffer_len();
    let hard_cap = INITIAL_DELAY + EXTRA_WINDOW * MAX_EXTRA_WINDOWS;
    let mut elapsed = INITIAL_DELAY;

    loop {
        if stream_done.load(Ordering::SeqCst) {
            return;
        }
        sleep(SAMPLE_INTERVAL).await;
        elapsed += SAMPLE_INTERVAL;

        let current_len = state.buffer_len();
        if current_len == last_len {
            return;
        }
        last_len = current_len;

        if elapsed >= hard_cap {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn returns_immediately_when_stream_already_done() {
        let state = Arc::new(ChatSessionState::new());
        let done = AtomicBool::new(true);
        let before = tokio::time::Instant::now();
        await_completion(&state, &done).await;
        // only the initial 3s delay elapses before the done check
        assert!(tokio::time::Instant::now() - before >= INITIAL_DELAY);
    }

    #[tokio::test(start_paused = true)]
    async fn declares_completion_once_buffer_stabilizes() {
        let state = Arc::new(ChatSessionState::new());
        state.append("hello");
        let done = AtomicBool::new(false);
        await_completion(&state, &done).await;
        // initial delay + one stable sample interval
        assert_eq!(state.buffer_len(), 5);
    }
}
