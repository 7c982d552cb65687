use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Byte buffer behind one image plane, with a read position.
#[derive(Debug, Clone, Default)]
pub struct PlaneBuffer {
    data: Vec<u8>,
    position: usize,
}

impl PlaneBuffer {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data, position: 0 }
    }

    /// Total capacity of the buffer, independent of the read position
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Bytes left between the read position and the end
    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    /// Move the read position forward, clamped to the end
    pub fn advance(&mut self, count: usize) {
        self.position = (self.position + count).min(self.data.len());
    }

    /// Reset the read position to the start of the buffer
    pub fn rewind(&mut self) {
        self.position = 0;
    }

    /// Copy everything from the read position to the end into an owned
    /// vector, leaving the position at the end.
    pub fn copy_remaining(&mut self) -> Vec<u8> {
        let out = self.data[self.position..].to_vec();
        self.position = self.data.len();
        out
    }
}

/// One image plane: a buffer plus its memory layout.
#[derive(Debug, Clone)]
pub struct Plane {
    pub buffer: PlaneBuffer,
    pub row_stride: usize,
    pub pixel_stride: usize,
}

impl Plane {
    pub fn new(data: Vec<u8>, row_stride: usize, pixel_stride: usize) -> Self {
        Self {
            buffer: PlaneBuffer::new(data),
            row_stride,
            pixel_stride,
        }
    }

    /// Tightly packed one-byte-per-pixel plane
    pub fn packed(data: Vec<u8>, width: u32) -> Self {
        Self::new(data, width as usize, 1)
    }

    /// Smallest buffer that can hold `width` x `height` samples with this layout
    pub fn min_len(&self, width: u32, height: u32) -> usize {
        if width == 0 || height == 0 {
            return 0;
        }
        let last_row = self.row_stride * (height as usize - 1);
        last_row + self.pixel_stride * (width as usize - 1) + 1
    }
}

/// One delivered camera image awaiting analysis and release.
///
/// Frames issued through a [`FrameGate`] carry a release obligation which
/// is discharged exactly once, when the frame is dropped or passed to
/// [`Frame::release`]. Holding a frame stalls the gate.
#[derive(Debug)]
pub struct Frame {
    width: u32,
    height: u32,
    planes: Vec<Plane>,
    _release: Option<ReleaseToken>,
}

impl Frame {
    /// Frame with no upstream owner, releasing it is a no-op
    pub fn new(width: u32, height: u32, planes: Vec<Plane>) -> Self {
        Self {
            width,
            height,
            planes,
            _release: None,
        }
    }

    /// Single-plane luminance frame, handy for synthetic input
    pub fn luma(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self::new(width, height, vec![Plane::packed(data, width)])
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    pub fn planes_mut(&mut self) -> &mut [Plane] {
        &mut self.planes
    }

    /// Return the frame to its source
    pub fn release(self) {
        drop(self);
    }
}

#[derive(Debug, Default)]
struct GateState {
    outstanding: AtomicBool,
    issued: AtomicU64,
    released: AtomicU64,
}

#[derive(Debug)]
struct ReleaseToken {
    state: Arc<GateState>,
}

impl Drop for ReleaseToken {
    fn drop(&mut self) {
        self.state.released.fetch_add(1, Ordering::AcqRel);
        self.state.outstanding.store(false, Ordering::Release);
    }
}

/// Upstream side of the frame release contract.
///
/// Issues one frame at a time: until the previous frame is released, no
/// new frame is handed out. Cloning shares the same gate.
#[derive(Debug, Clone, Default)]
pub struct FrameGate {
    state: Arc<GateState>,
}

impl FrameGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a frame if none is outstanding.
    ///
    /// `planes` is only evaluated when the gate is free, so callers can
    /// skip the conversion work for frames that would be dropped.
    pub fn acquire_with<F>(&self, width: u32, height: u32, planes: F) -> Option<Frame>
    where
        F: FnOnce() -> Vec<Plane>,
    {
        if self
            .state
            .outstanding
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }

        self.state.issued.fetch_add(1, Ordering::AcqRel);

        Some(Frame {
            width,
            height,
            planes: planes(),
            _release: Some(ReleaseToken {
                state: Arc::clone(&self.state),
            }),
        })
    }

    pub fn acquire(&self, width: u32, height: u32, planes: Vec<Plane>) -> Option<Frame> {
        self.acquire_with(width, height, || planes)
    }

    pub fn is_outstanding(&self) -> bool {
        self.state.outstanding.load(Ordering::Acquire)
    }

    pub fn issued(&self) -> u64 {
        self.state.issued.load(Ordering::Acquire)
    }

    pub fn released(&self) -> u64 {
        self.state.released.load(Ordering::Acquire)
    }
}
