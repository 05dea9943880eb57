//! The shader-constant register cache. Writes are diffed against the last
//! value sent to the device and coalesced into contiguous runs so one
//! device call covers many registers.

use crate::device::Device;

/// Cached register files for vec4, boolean and ivec4 shader constants.
/// Registers are write-through: there is no desired/current split, only a
/// "last value sent" copy plus a validity bit per register. Invalidation
/// (after a device reset) clears the validity bits so every subsequent
/// write goes to hardware.
///
/// While the device is unavailable, writes are recorded instead of issued:
/// the value lands in the file with its validity bit cleared, and
/// [`ConstantCache::flush`] sends every written-but-unconfirmed register
/// once the device is back.
pub struct ConstantCache {
    vec4: RegisterFile<[f32; 4]>,
    bools: RegisterFile<bool>,
    ints: RegisterFile<[i32; 4]>,
}

impl ConstantCache {
    pub fn new(vec4_count: usize, bool_count: usize, int_count: usize) -> Self {
        ConstantCache {
            vec4: RegisterFile::new(vec4_count, [0.0; 4]),
            bools: RegisterFile::new(bool_count, false),
            ints: RegisterFile::new(int_count, [0; 4]),
        }
    }

    pub fn set_vec4(
        &mut self,
        device: &mut dyn Device,
        start: usize,
        values: &[[f32; 4]],
        force: bool,
    ) {
        self.vec4
            .set(start, values, force, |first, run| device.set_vec4_constants(first, run));
    }

    pub fn set_bools(
        &mut self,
        device: &mut dyn Device,
        start: usize,
        values: &[bool],
        force: bool,
    ) {
        self.bools
            .set(start, values, force, |first, run| device.set_bool_constants(first, run));
    }

    pub fn set_ints(
        &mut self,
        device: &mut dyn Device,
        start: usize,
        values: &[[i32; 4]],
        force: bool,
    ) {
        self.ints
            .set(start, values, force, |first, run| device.set_int_constants(first, run));
    }

    /// Records a write without touching the device; the deactivated path.
    pub fn record_vec4(&mut self, start: usize, values: &[[f32; 4]]) {
        self.vec4.record(start, values);
    }

    pub fn record_bools(&mut self, start: usize, values: &[bool]) {
        self.bools.record(start, values);
    }

    pub fn record_ints(&mut self, start: usize, values: &[[i32; 4]]) {
        self.ints.record(start, values);
    }

    /// Marks every register as unknown, forcing the next write of each to
    /// reach the device.
    pub fn invalidate(&mut self) {
        self.vec4.invalidate();
        self.bools.invalidate();
        self.ints.invalidate();
    }

    /// Re-issues every register that was ever written but is not confirmed
    /// on the device: recorded-while-deactivated writes, and everything
    /// after an invalidation.
    pub fn flush(&mut self, device: &mut dyn Device) {
        self.vec4
            .flush(|first, run| device.set_vec4_constants(first, run));
        self.bools
            .flush(|first, run| device.set_bool_constants(first, run));
        self.ints
            .flush(|first, run| device.set_int_constants(first, run));
    }
}

struct RegisterFile<T: Copy + PartialEq> {
    current: Vec<T>,
    valid: Vec<bool>,
    written: Vec<bool>,
}

impl<T: Copy + PartialEq> RegisterFile<T> {
    fn new(count: usize, default: T) -> Self {
        RegisterFile {
            current: vec![default; count],
            valid: vec![false; count],
            written: vec![false; count],
        }
    }

    fn invalidate(&mut self) {
        for v in &mut self.valid {
            *v = false;
        }
    }

    /// Walks `values`, skipping registers that already hold the incoming
    /// value (unless forced), and emits one batched write per contiguous
    /// run of registers that actually changed.
    fn set<F>(&mut self, start: usize, values: &[T], force: bool, mut emit: F)
    where
        F: FnMut(usize, &[T]),
    {
        debug_assert!(
            start + values.len() <= self.current.len(),
            "constant register range {}..{} exceeds file size {}",
            start,
            start + values.len(),
            self.current.len()
        );

        let mut run_start = None;
        for (i, value) in values.iter().enumerate() {
            let register = start + i;
            let skip = !force && self.valid[register] && self.current[register] == *value;

            if skip {
                if let Some(first) = run_start.take() {
                    emit(start + first, &values[first..i]);
                }
            } else {
                self.current[register] = *value;
                self.valid[register] = true;
                self.written[register] = true;
                if run_start.is_none() {
                    run_start = Some(i);
                }
            }
        }

        if let Some(first) = run_start {
            emit(start + first, &values[first..]);
        }
    }

    /// Stores `values` with the validity bits cleared, so a later flush
    /// sends them to the device.
    fn record(&mut self, start: usize, values: &[T]) {
        debug_assert!(start + values.len() <= self.current.len());

        for (i, value) in values.iter().enumerate() {
            let register = start + i;
            self.current[register] = *value;
            self.valid[register] = false;
            self.written[register] = true;
        }
    }

    /// Emits one batched write per contiguous run of written-but-invalid
    /// registers and marks them valid.
    fn flush<F>(&mut self, mut emit: F)
    where
        F: FnMut(usize, &[T]),
    {
        let mut run_start = None;
        for register in 0..self.current.len() {
            if self.written[register] && !self.valid[register] {
                self.valid[register] = true;
                if run_start.is_none() {
                    run_start = Some(register);
                }
            } else if let Some(first) = run_start.take() {
                emit(first, &self.current[first..register]);
            }
        }

        if let Some(first) = run_start {
            emit(first, &self.current[first..]);
        }
    }
}
