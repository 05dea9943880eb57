//! Frame pacing against the device. A small ring of fences keeps the CPU
//! at most `frame_lag` frames ahead of the hardware: every frame boundary
//! waits on the fence inserted `frame_lag` frames ago, then inserts a
//! fresh one.

use std::time::Duration;

use smallvec::SmallVec;

use crate::device::{Device, FenceId};

pub struct FrameSync {
    fences: SmallVec<[Option<FenceId>; 4]>,
    head: usize,
    timeout: Duration,
}

impl FrameSync {
    pub fn new(frame_lag: usize, timeout: Duration) -> Self {
        debug_assert!(frame_lag >= 1);

        let mut fences = SmallVec::new();
        fences.resize(frame_lag, None);

        FrameSync {
            fences,
            head: 0,
            timeout,
        }
    }

    /// Waits for the oldest in-flight frame to retire and fences off the
    /// one just submitted. A timeout is logged and treated as retired so a
    /// wedged device cannot stall the caller forever.
    pub fn advance(&mut self, device: &mut dyn Device) {
        if let Some(fence) = self.fences[self.head].take() {
            if !device.wait_fence(fence, self.timeout) {
                warn!("frame fence {} timed out after {:?}", fence, self.timeout);
            }
        }

        self.fences[self.head] = Some(device.insert_fence());
        self.head = (self.head + 1) % self.fences.len();
    }

    /// Forgets every in-flight fence. Used after a device reset, when the
    /// old fences no longer exist on the device.
    pub fn reset(&mut self) {
        for fence in &mut self.fences {
            *fence = None;
        }
        self.head = 0;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::device::headless::{Call, HeadlessDevice};

    #[test]
    fn waits_with_frame_lag_delay() {
        let mut sync = FrameSync::new(2, Duration::from_millis(100));
        let mut device = HeadlessDevice::new();

        // The first two frames have nothing old enough to wait on.
        sync.advance(&mut device);
        sync.advance(&mut device);
        assert_eq!(
            device.take_calls(),
            vec![Call::InsertFence(1), Call::InsertFence(2)]
        );

        // The third frame retires the fence from two frames ago.
        sync.advance(&mut device);
        assert_eq!(
            device.take_calls(),
            vec![Call::WaitFence(1), Call::InsertFence(3)]
        );
    }

    #[test]
    fn reset_drops_in_flight_fences() {
        let mut sync = FrameSync::new(2, Duration::from_millis(100));
        let mut device = HeadlessDevice::new();

        sync.advance(&mut device);
        sync.advance(&mut device);
        sync.reset();
        device.take_calls();

        sync.advance(&mut device);
        assert_eq!(device.take_calls(), vec![Call::InsertFence(3)]);
    }
}
