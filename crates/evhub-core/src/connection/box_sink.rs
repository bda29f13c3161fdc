//! BoxFrameSink -- object-safe dynamic dispatch wrapper for FrameSink.
//!
//! 1. Define an object-safe `FrameSinkDyn` trait with boxed futures
//! 2. Blanket-impl `FrameSinkDyn` for all `T: FrameSink`
//! 3. `BoxFrameSink` wraps `Box<dyn FrameSinkDyn>` and delegates

use std::future::Future;
use std::pin::Pin;

use evhub_types::error::TransportError;

use super::{Frame, FrameSink};

/// Object-safe version of [`FrameSink`] with boxed futures.
pub trait FrameSinkDyn: Send {
    fn send_boxed(
        &mut self,
        frame: Frame,
    ) -> Pin<Box<dyn Future<Output = Result<(), TransportError>> + Send + '_>>;

    fn close_boxed(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = Result<(), TransportError>> + Send + '_>>;
}

impl<T: FrameSink> FrameSinkDyn for T {
    fn send_boxed(
        &mut self,
        frame: Frame,
    ) -> Pin<Box<dyn Future<Output = Result<(), TransportError>> + Send + '_>> {
        Box::pin(self.send(frame))
    }

    fn close_boxed(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = Result<(), TransportError>> + Send + '_>> {
        Box::pin(self.close())
    }
}

/// Type-erased send half of a connection.
pub struct BoxFrameSink {
    inner: Box<dyn FrameSinkDyn>,
}

impl BoxFrameSink {
    pub fn new<T: FrameSink>(sink: T) -> Self {
        Self {
            inner: Box::new(sink),
        }
    }

    pub async fn send(&mut self, frame: Frame) -> Result<(), TransportError> {
        self.inner.send_boxed(frame).await
    }

    pub async fn close(&mut self) -> Result<(), TransportError> {
        self.inner.close_boxed().await
    }
}

impl std::fmt::Debug for BoxFrameSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxFrameSink").finish_non_exhaustive()
    }
}
