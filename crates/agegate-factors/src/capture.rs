use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::FactorError;

/// One captured image in RGBA8. Pixel memory is zeroized on discard and on
/// drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct RawSample {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl RawSample {
    /// Wrap an RGBA8 buffer of `width * height * 4` bytes.
    pub fn rgba(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, FactorError> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected || expected == 0 {
            return Err(FactorError::InvalidSample(format!(
                "expected {} RGBA bytes for {}x{}, got {}",
                expected,
                width,
                height,
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Expand a single-channel buffer to opaque RGBA.
    pub fn luma(width: u32, height: u32, luma: &[u8]) -> Result<Self, FactorError> {
        let pixels = luma.iter().flat_map(|&v| [v, v, v, 255]).collect();
        Self::rgba(width, height, pixels)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Zero and release the pixel buffer.
    pub fn discard(&mut self) {
        self.zeroize();
    }

    pub fn is_discarded(&self) -> bool {
        self.pixels.is_empty()
    }
}

impl fmt::Debug for RawSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawSample")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

/// Opaque reference to a user-selected file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle(pub String);

impl FileHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// An open camera. `stop` must release every underlying track.
#[async_trait]
pub trait CameraStream: Send {
    async fn capture_frame(&mut self) -> Result<RawSample, FactorError>;

    fn stop(&mut self);
}

/// Source of raw samples: the camera or an uploaded file.
#[async_trait]
pub trait SampleCapture: Send + Sync {
    async fn open_camera(&self) -> Result<Box<dyn CameraStream>, FactorError>;

    async fn read_file(&self, handle: &FileHandle) -> Result<RawSample, FactorError>;
}

/// Scoped ownership of an open camera: stopped on `release` or drop,
/// whichever comes first.
pub struct CameraGuard {
    stream: Option<Box<dyn CameraStream>>,
}

impl CameraGuard {
    pub async fn open(capture: &dyn SampleCapture) -> Result<Self, FactorError> {
        let stream = capture.open_camera().await?;
        tracing::debug!("camera acquired");
        Ok(Self {
            stream: Some(stream),
        })
    }

    pub async fn capture_frame(&mut self) -> Result<RawSample, FactorError> {
        match self.stream.as_mut() {
            Some(stream) => stream.capture_frame().await,
            None => Err(FactorError::CameraUnavailable("camera already released".into())),
        }
    }

    pub fn release(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
            tracing::debug!("camera released");
        }
    }
}

impl Drop for CameraGuard {
    fn drop(&mut self) {
        self.release();
    }
}

/// Ensures only one capture holds the camera at a time.
#[derive(Debug, Clone, Default)]
pub struct CameraArbiter {
    in_use: Arc<AtomicBool>,
}

impl CameraArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lease(&self) -> Result<CameraLease, FactorError> {
        if self
            .in_use
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(FactorError::CameraBusy);
        }
        Ok(CameraLease {
            in_use: Arc::clone(&self.in_use),
        })
    }

    pub fn is_in_use(&self) -> bool {
        self.in_use.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
pub struct CameraLease {
    in_use: Arc<AtomicBool>,
}

impl Drop for CameraLease {
    fn drop(&mut self) {
        self.in_use.store(false, Ordering::Release);
    }
}

/// Receiving side of a stop request.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    pub fn new(rx: watch::Receiver<bool>) -> Self {
        Self { rx }
    }

    /// A signal that never fires.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once a stop has been requested.
    pub async fn cancelled(&mut self) {
        let closed = self.rx.wait_for(|stop| *stop).await.is_err();
        if closed {
            std::future::pending::<()>().await;
        }
    }
}

/// Camera access shared by the processors: one frame per acquisition, under
/// the arbiter, bounded by an optional wait timeout.
#[derive(Clone)]
pub struct CameraAccess {
    capture: Arc<dyn SampleCapture>,
    arbiter: CameraArbiter,
    timeout: Option<Duration>,
}

impl CameraAccess {
    pub fn new(
        capture: Arc<dyn SampleCapture>,
        arbiter: CameraArbiter,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            capture,
            arbiter,
            timeout,
        }
    }

    pub fn capture(&self) -> &Arc<dyn SampleCapture> {
        &self.capture
    }

    pub fn arbiter(&self) -> &CameraArbiter {
        &self.arbiter
    }

    /// Acquire the camera, take one frame, release the camera.
    ///
    /// The camera is stopped before this returns on every path, including
    /// cancellation and timeout.
    pub async fn grab_frame(&self, cancel: &mut CancelSignal) -> Result<RawSample, FactorError> {
        if cancel.is_cancelled() {
            return Err(FactorError::Cancelled);
        }
        let _lease = self.arbiter.lease()?;
        let mut camera = CameraGuard::open(self.capture.as_ref()).await?;

        let timeout = self.timeout;
        let frame = tokio::select! {
            frame = async {
                match timeout {
                    Some(limit) => {
                        match tokio::time::timeout(limit, camera.capture_frame()).await {
                            Ok(frame) => frame,
                            Err(_) => Err(FactorError::CameraTimeout),
                        }
                    }
                    None => camera.capture_frame().await,
                }
            } => frame,
            _ = cancel.cancelled() => Err(FactorError::Cancelled),
        };

        camera.release();
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct CountingCamera {
        stops: Arc<AtomicUsize>,
        hang: bool,
    }

    #[async_trait]
    impl CameraStream for CountingCamera {
        async fn capture_frame(&mut self) -> Result<RawSample, FactorError> {
            if self.hang {
                std::future::pending::<()>().await;
            }
            RawSample::luma(2, 2, &[10, 20, 30, 40])
        }

        fn stop(&mut self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct CountingCapture {
        stops: Arc<AtomicUsize>,
        hang: bool,
    }

    #[async_trait]
    impl SampleCapture for CountingCapture {
        async fn open_camera(&self) -> Result<Box<dyn CameraStream>, FactorError> {
            Ok(Box::new(CountingCamera {
                stops: Arc::clone(&self.stops),
                hang: self.hang,
            }))
        }

        async fn read_file(&self, _handle: &FileHandle) -> Result<RawSample, FactorError> {
            Err(FactorError::CaptureFailed("no files".into()))
        }
    }

    fn access(hang: bool, timeout: Option<Duration>) -> (CameraAccess, Arc<AtomicUsize>) {
        let stops = Arc::new(AtomicUsize::new(0));
        let capture = Arc::new(CountingCapture {
            stops: Arc::clone(&stops),
            hang,
        });
        (
            CameraAccess::new(capture, CameraArbiter::new(), timeout),
            stops,
        )
    }

    #[test]
    fn test_raw_sample_rejects_wrong_length() {
        assert!(RawSample::rgba(2, 2, vec![0; 15]).is_err());
        assert!(RawSample::rgba(0, 0, Vec::new()).is_err());
    }

    #[test]
    fn test_discard_empties_buffer() {
        let mut sample = RawSample::luma(2, 1, &[200, 100]).unwrap();
        assert_eq!(sample.pixels().len(), 8);
        sample.discard();
        assert!(sample.is_discarded());
        assert_eq!(sample.width(), 0);
    }

    #[test]
    fn test_debug_hides_pixels() {
        let sample = RawSample::luma(1, 1, &[42]).unwrap();
        let dbg = format!("{:?}", sample);
        assert!(dbg.contains("bytes: 4"));
        assert!(!dbg.contains("42"));
    }

    #[test]
    fn test_arbiter_is_exclusive() {
        let arbiter = CameraArbiter::new();
        let lease = arbiter.lease().unwrap();
        assert!(matches!(arbiter.lease(), Err(FactorError::CameraBusy)));
        drop(lease);
        assert!(!arbiter.is_in_use());
        assert!(arbiter.lease().is_ok());
    }

    #[tokio::test]
    async fn test_grab_frame_releases_camera() {
        let (access, stops) = access(false, None);
        let frame = access.grab_frame(&mut CancelSignal::never()).await.unwrap();
        assert_eq!(frame.width(), 2);
        assert_eq!(stops.load(Ordering::SeqCst), 1);
        assert!(!access.arbiter().is_in_use());
    }

    #[tokio::test]
    async fn test_timeout_releases_camera() {
        let (access, stops) = access(true, Some(Duration::from_millis(10)));
        let result = access.grab_frame(&mut CancelSignal::never()).await;
        assert!(matches!(result, Err(FactorError::CameraTimeout)));
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancel_releases_camera() {
        let (access, stops) = access(true, None);
        let (tx, rx) = watch::channel(false);
        let mut cancel = CancelSignal::new(rx);
        let stopper = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            tx.send_replace(true);
            tx
        });
        let result = access.grab_frame(&mut cancel).await;
        assert!(matches!(result, Err(FactorError::Cancelled)));
        assert_eq!(stops.load(Ordering::SeqCst), 1);
        drop(stopper.await.unwrap());
    }

    #[tokio::test]
    async fn test_already_cancelled_never_opens_camera() {
        let (access, stops) = access(false, None);
        let (_tx, rx) = watch::channel(true);
        let result = access.grab_frame(&mut CancelSignal::new(rx)).await;
        assert!(matches!(result, Err(FactorError::Cancelled)));
        assert_eq!(stops.load(Ordering::SeqCst), 0);
    }
}
