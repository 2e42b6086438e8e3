//! Handle to a running automatic code capture

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Listener waiting on the platform capture facility
///
/// Dropping the listener cancels it.
pub struct CaptureListener {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl CaptureListener {
    pub(crate) fn new(token: CancellationToken, task: JoinHandle<()>) -> Self {
        Self { token, task }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled() && !self.task.is_finished()
    }
}

impl Drop for CaptureListener {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
