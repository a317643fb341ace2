//! Camera access for pairing. Frame capture and barcode decoding live behind
//! [`Camera`]; the core only opens a session and guarantees it gets released.

use thiserror::Error;
use tracing::debug;

/// Why a camera session could not start.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CameraError {
    /// The user (or platform) refused camera access.
    #[error("camera permission denied")]
    PermissionDenied,
    /// No usable camera.
    #[error("camera unavailable: {0}")]
    Unavailable(String),
}

/// Source of scanned frames.
pub trait Camera: Send + Sync {
    /// Acquire the camera. Decoded payloads are fed back through the controller.
    fn open(&self) -> Result<Box<dyn CameraSession>, CameraError>;
}

/// An acquired camera.
pub trait CameraSession: Send {
    /// Hand the camera back to the platform.
    fn release(&mut self);
}

/// Owns an open camera session and releases it exactly once, on
/// [`ScanSession::release`] or on drop.
pub struct ScanSession {
    session: Option<Box<dyn CameraSession>>,
}

impl ScanSession {
    /// Start scanning with `camera`.
    pub fn start(camera: &dyn Camera) -> Result<Self, CameraError> {
        let session = camera.open()?;
        debug!("camera session opened");
        Ok(Self {
            session: Some(session),
        })
    }

    /// Whether the camera is still held.
    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Release the camera now.
    pub fn release(mut self) {
        self.close();
    }

    fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.release();
            debug!("camera session released");
        }
    }
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    };

    use super::*;

    /// Camera double counting open and released sessions.
    #[derive(Clone, Default)]
    pub struct FakeCamera {
        pub deny: Arc<AtomicBool>,
        pub opened: Arc<AtomicUsize>,
        pub released: Arc<AtomicUsize>,
    }

    impl FakeCamera {
        pub fn denying() -> Self {
            let camera = Self::default();
            camera.deny.store(true, Ordering::SeqCst);
            camera
        }

        pub fn live_sessions(&self) -> usize {
            self.opened.load(Ordering::SeqCst) - self.released.load(Ordering::SeqCst)
        }
    }

    struct FakeSession {
        released: Arc<AtomicUsize>,
    }

    impl CameraSession for FakeSession {
        fn release(&mut self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl Camera for FakeCamera {
        fn open(&self) -> Result<Box<dyn CameraSession>, CameraError> {
            if self.deny.load(Ordering::SeqCst) {
                return Err(CameraError::PermissionDenied);
            }
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeSession {
                released: self.released.clone(),
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{testing::FakeCamera, *};

    #[test]
    fn release_happens_once() {
        let camera = FakeCamera::default();
        let session = ScanSession::start(&camera).unwrap();
        assert!(session.is_open());
        assert_eq!(camera.live_sessions(), 1);

        session.release();
        assert_eq!(camera.live_sessions(), 0);
        assert_eq!(camera.released.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_releases_the_camera() {
        let camera = FakeCamera::default();
        {
            let _session = ScanSession::start(&camera).unwrap();
            assert_eq!(camera.live_sessions(), 1);
        }
        assert_eq!(camera.live_sessions(), 0);
    }

    #[test]
    fn denial_opens_nothing() {
        let camera = FakeCamera::denying();
        assert_eq!(
            ScanSession::start(&camera).err(),
            Some(CameraError::PermissionDenied)
        );
        assert_eq!(camera.live_sessions(), 0);
    }
}
