//! Origin-bound SMS inbox
//!
//! Messages are matched against the origin-bound format, whose last line
//! reads `@<domain> #<code>`. Only codes addressed to the configured domain
//! are queued for the listening flow.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use ds_core::services::verification::CodeCapture;

static ORIGIN_BOUND_CODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^@([A-Za-z0-9.-]+) #([A-Za-z0-9]+)(?: @[A-Za-z0-9.-]+)?\s*$").unwrap()
});

/// Code addressed to `domain` in an origin-bound SMS, if any
pub fn extract_origin_bound_code(message: &str, domain: &str) -> Option<String> {
    ORIGIN_BOUND_CODE
        .captures_iter(message)
        .filter(|captures| captures[1].eq_ignore_ascii_case(domain))
        .map(|captures| captures[2].to_string())
        .last()
}

/// Capture facility fed with incoming SMS text
///
/// Each queued code is stamped with the generation it arrived in; codes from
/// an earlier generation are skipped by `request_code`.
pub struct SmsInboxCapture {
    origin_domain: String,
    generation: AtomicU64,
    sender: mpsc::UnboundedSender<(u64, String)>,
    receiver: Mutex<mpsc::UnboundedReceiver<(u64, String)>>,
}

impl SmsInboxCapture {
    pub fn new(origin_domain: impl Into<String>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            origin_domain: origin_domain.into(),
            generation: AtomicU64::new(0),
            sender,
            receiver: Mutex::new(receiver),
        }
    }

    /// Offer an incoming message; returns whether it carried a code for us
    pub fn deliver(&self, message: &str) -> bool {
        match extract_origin_bound_code(message, &self.origin_domain) {
            Some(code) => {
                let generation = self.generation.load(Ordering::SeqCst);
                self.sender.send((generation, code)).is_ok()
            }
            None => {
                debug!(event = "sms_ignored", "Message is not addressed to this origin");
                false
            }
        }
    }

    /// Forget codes delivered so far; call before requesting a new code
    pub fn discard_pending(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl CodeCapture for SmsInboxCapture {
    async fn request_code(&self, cancel: CancellationToken) -> Option<String> {
        let mut receiver = self.receiver.lock().await;
        loop {
            let received = tokio::select! {
                _ = cancel.cancelled() => return None,
                received = receiver.recv() => received,
            };
            match received {
                Some((generation, code)) if generation == self.generation.load(Ordering::SeqCst) => {
                    return Some(code)
                }
                Some(_) => debug!(event = "stale_code_skipped", "Skipping code from an earlier request"),
                None => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const DOMAIN: &str = "drivesync-757cf.firebaseapp.com";

    #[test]
    fn test_extract_origin_bound_code() {
        let message = "482913 is your verification code.\n\n@drivesync-757cf.firebaseapp.com #482913";
        assert_eq!(extract_origin_bound_code(message, DOMAIN).as_deref(), Some("482913"));

        let embedded = "Code: 111222\n@DriveSync-757cf.firebaseapp.com #111222 @embedder.example";
        assert_eq!(extract_origin_bound_code(embedded, DOMAIN).as_deref(), Some("111222"));
    }

    #[test]
    fn test_other_origin_ignored() {
        assert!(extract_origin_bound_code("@evil.example #482913", DOMAIN).is_none());
        assert!(extract_origin_bound_code("Your code is 482913", DOMAIN).is_none());
    }

    #[tokio::test]
    async fn test_delivered_code_resolves_request() {
        let inbox = Arc::new(SmsInboxCapture::new(DOMAIN));
        let listener = inbox.clone();
        let pending = tokio::spawn(async move { listener.request_code(CancellationToken::new()).await });

        assert!(!inbox.deliver("hello"));
        assert!(inbox.deliver("@drivesync-757cf.firebaseapp.com #482913"));
        assert_eq!(pending.await.unwrap().as_deref(), Some("482913"));
    }

    #[tokio::test]
    async fn test_code_delivered_before_request_is_kept() {
        let inbox = SmsInboxCapture::new(DOMAIN);
        inbox.deliver("@drivesync-757cf.firebaseapp.com #482913");
        assert_eq!(
            inbox.request_code(CancellationToken::new()).await.as_deref(),
            Some("482913")
        );
    }

    #[tokio::test]
    async fn test_discarded_codes_are_skipped() {
        let inbox = SmsInboxCapture::new(DOMAIN);
        inbox.deliver("@drivesync-757cf.firebaseapp.com #000000");
        inbox.discard_pending();
        inbox.deliver("@drivesync-757cf.firebaseapp.com #482913");

        assert_eq!(
            inbox.request_code(CancellationToken::new()).await.as_deref(),
            Some("482913")
        );
    }

    #[tokio::test]
    async fn test_cancel_resolves_none() {
        let inbox = SmsInboxCapture::new(DOMAIN);
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(inbox.request_code(cancel).await.is_none());
    }
}
