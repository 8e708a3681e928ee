use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crossbeam_channel::{RecvTimeoutError, Sender};

use crate::error::{PageSceneError, Result};

pub const DEFAULT_MEASURE_TIMEOUT: Duration = Duration::from_secs(10);

pub trait ContentHost: Send {
    type Content;

    /// Starts laying out `content` at `width`. The host reports the resulting height
    /// through `signal`, either before returning or later from another thread. The
    /// completing thread must not need the host lock.
    fn request_layout(&mut self, content: &Self::Content, width: f32, signal: LayoutSignal);

    fn render_blocks(&mut self, blocks: &[&Self::Content], width: f32, height: f32)
    -> Result<String>;

    fn render_flow(&mut self, content: &Self::Content, width: f32, total_height: f32)
    -> Result<String>;
}

/// One-shot completion handle for a layout request. Dropping it without calling
/// [`LayoutSignal::complete`] fails the pending measurement.
#[derive(Debug)]
pub struct LayoutSignal {
    tx: Sender<f32>,
}

impl LayoutSignal {
    pub fn complete(self, height: f32) {
        // The receiver is gone once the measurement timed out.
        let _ = self.tx.try_send(height);
    }
}

pub struct SharedHost<H> {
    inner: Arc<Mutex<H>>,
}

impl<H> Clone for SharedHost<H> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<H: ContentHost> SharedHost<H> {
    pub fn new(host: H) -> Self {
        Self {
            inner: Arc::new(Mutex::new(host)),
        }
    }

    pub fn lock(&self) -> Result<MutexGuard<'_, H>> {
        self.inner
            .lock()
            .map_err(|_| PageSceneError::Host("content host lock poisoned".to_string()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(PageSceneError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Measures `content` at `width`, blocking until the host signals or `timeout` passes.
/// The host stays locked for the whole round-trip. Non-finite or negative heights are
/// reported as zero.
pub fn measure_block<H: ContentHost>(
    host: &SharedHost<H>,
    content: &H::Content,
    width: f32,
    timeout: Duration,
) -> Result<f32> {
    let (tx, rx) = crossbeam_channel::bounded(1);
    let guard = {
        let mut guard = host.lock()?;
        guard.request_layout(content, width, LayoutSignal { tx });
        guard
    };
    let result = rx.recv_timeout(timeout);
    drop(guard);

    match result {
        Ok(height) if height.is_finite() && height > 0.0 => Ok(height),
        Ok(_) => Ok(0.0),
        Err(RecvTimeoutError::Timeout) => {
            log::warn!("layout did not complete within {timeout:?}");
            Err(PageSceneError::Timeout { waited: timeout })
        }
        Err(RecvTimeoutError::Disconnected) => Err(PageSceneError::Host(
            "layout signal dropped before completion".to_string(),
        )),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::thread;

    pub(crate) struct FakeHost {
        pub layouts: usize,
    }

    #[derive(Debug, Clone, Copy)]
    pub(crate) enum Reply {
        Now(f32),
        Later(f32, Duration),
        Never,
        Abandon,
    }

    impl ContentHost for FakeHost {
        type Content = Reply;

        fn request_layout(&mut self, content: &Reply, _width: f32, signal: LayoutSignal) {
            self.layouts += 1;
            match *content {
                Reply::Now(h) => signal.complete(h),
                Reply::Later(h, delay) => {
                    thread::spawn(move || {
                        thread::sleep(delay);
                        signal.complete(h);
                    });
                }
                Reply::Never => {
                    thread::spawn(move || {
                        thread::sleep(Duration::from_millis(500));
                        drop(signal);
                    });
                }
                Reply::Abandon => drop(signal),
            }
        }

        fn render_blocks(&mut self, blocks: &[&Reply], width: f32, height: f32) -> Result<String> {
            let mut out = format!(r#"<svg width="{width}" height="{height}">"#);
            let mut y = 0.0;
            for block in blocks {
                let h = match **block {
                    Reply::Now(h) | Reply::Later(h, _) => h,
                    _ => 0.0,
                };
                out.push_str(&format!(
                    r##"<rect x="0" y="{y}" width="{width}" height="{h}" fill="#000"/>"##
                ));
                y += h;
            }
            out.push_str("</svg>");
            Ok(out)
        }

        fn render_flow(&mut self, _content: &Reply, width: f32, total_height: f32) -> Result<String> {
            Ok(format!(
                r#"<svg><rect width="{width}" height="{total_height}" fill="red"/></svg>"#
            ))
        }
    }

    pub(crate) fn host() -> SharedHost<FakeHost> {
        SharedHost::new(FakeHost { layouts: 0 })
    }

    #[test]
    fn synchronous_completion_returns_height() {
        let h = measure_block(&host(), &Reply::Now(120.0), 500.0, DEFAULT_MEASURE_TIMEOUT);
        assert_eq!(h.unwrap(), 120.0);
    }

    #[test]
    fn asynchronous_completion_is_awaited() {
        let reply = Reply::Later(42.0, Duration::from_millis(20));
        let h = measure_block(&host(), &reply, 500.0, Duration::from_secs(5));
        assert_eq!(h.unwrap(), 42.0);
    }

    #[test]
    fn missing_signal_times_out() {
        let err = measure_block(&host(), &Reply::Never, 500.0, Duration::from_millis(30))
            .unwrap_err();
        assert!(matches!(err, PageSceneError::Timeout { waited } if waited == Duration::from_millis(30)));
    }

    #[test]
    fn dropped_signal_is_a_host_error() {
        let err = measure_block(&host(), &Reply::Abandon, 500.0, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, PageSceneError::Host(_)));
    }

    #[test]
    fn negative_heights_measure_as_zero() {
        let h = measure_block(&host(), &Reply::Now(-3.0), 500.0, Duration::from_secs(1));
        assert_eq!(h.unwrap(), 0.0);
    }

    #[test]
    fn concurrent_callers_are_serialized() {
        let shared = host();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let shared = shared.clone();
                thread::spawn(move || {
                    measure_block(
                        &shared,
                        &Reply::Later(1.0, Duration::from_millis(5)),
                        10.0,
                        Duration::from_secs(5),
                    )
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap().unwrap(), 1.0);
        }
        assert_eq!(shared.lock().unwrap().layouts, 4);
    }

    #[test]
    fn cancel_token_is_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(token.check().is_ok());
        clone.cancel();
        assert!(matches!(token.check(), Err(PageSceneError::Cancelled)));
    }
}
