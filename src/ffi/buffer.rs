//! Owned buffers handed across the native boundary, and the capacity
//! negotiation loop used by every native call that writes output.
//!
//! A native callee receives a pointer and a capacity, and reports back the
//! length it wrote (or, on a short-buffer status, the length it needs). The
//! reported length is never trusted: it is checked against the declared
//! capacity before any slice is taken, and a violation is surfaced as
//! [`BenchError::BufferOverCapacity`].

use std::ffi::{c_char, c_ulong};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::{BenchError, BenchResult};

/// Initial witness buffer capacity (100 MiB).
pub const WITNESS_CAPACITY: usize = 100 * 1024 * 1024;
/// Initial proof and public-signal buffer capacity (4 MiB each).
pub const PROOF_CAPACITY: usize = 4 * 1024 * 1024;
/// Fixed error buffer capacity.
pub const ERROR_CAPACITY: usize = 256;

/// Output region owned by the caller for the duration of a native call.
///
/// The memory is released when the buffer is dropped, on every exit path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeBuffer {
    what: &'static str,
    data: Vec<u8>,
    claimed: usize,
}

impl NativeBuffer {
    pub fn with_capacity(what: &'static str, capacity: usize) -> Self {
        NativeBuffer {
            what,
            data: vec![0u8; capacity],
            claimed: 0,
        }
    }

    pub fn what(&self) -> &'static str {
        self.what
    }

    /// Declared capacity passed to the callee.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Capacity in the callee's length type, saturating where `c_ulong` is
    /// narrower than `usize`. Announcing less room than the region holds is
    /// always safe for the callee.
    pub fn capacity_c(&self) -> c_ulong {
        c_ulong::try_from(self.data.len()).unwrap_or(c_ulong::MAX)
    }

    pub fn as_mut_ptr(&mut self) -> *mut c_char {
        self.data.as_mut_ptr().cast()
    }

    /// Store the length the callee reported, without validating it yet.
    pub fn record_claim(&mut self, reported: c_ulong) {
        self.claimed = usize::try_from(reported).unwrap_or(usize::MAX);
    }

    /// A region holding `text` followed by a NUL, with `text` claimed.
    pub fn terminated(what: &'static str, text: &[u8]) -> Self {
        let mut data = Vec::with_capacity(text.len() + 1);
        data.extend_from_slice(text);
        data.push(0);
        NativeBuffer {
            what,
            data,
            claimed: text.len(),
        }
    }

    /// Length last reported by the callee.
    pub fn claimed(&self) -> usize {
        self.claimed
    }

    /// Check the reported length against the declared capacity.
    pub fn validate(&self) -> BenchResult<()> {
        if self.claimed > self.capacity() {
            return Err(BenchError::BufferOverCapacity {
                what: self.what,
                reported: self.claimed,
                capacity: self.capacity(),
            });
        }
        Ok(())
    }

    /// Bytes the callee reported as written.
    pub fn filled(&self) -> &[u8] {
        &self.data[..self.claimed.min(self.capacity())]
    }

    /// The whole preallocated region.
    pub fn region(&self) -> &[u8] {
        &self.data
    }

    /// Content up to the first NUL byte anywhere in the region, or `None` if
    /// the region holds no terminator.
    pub fn until_nul(&self) -> Option<&[u8]> {
        until_nul(&self.data)
    }

    /// Release the region, keeping only the reported bytes.
    pub fn into_filled(mut self) -> Vec<u8> {
        let len = self.claimed.min(self.capacity());
        self.data.truncate(len);
        self.data.shrink_to_fit();
        self.data
    }

    fn grow_to(&mut self, capacity: usize) {
        self.data = vec![0u8; capacity];
        self.claimed = 0;
    }
}

/// Prefix of `region` before its first NUL byte.
pub fn until_nul(region: &[u8]) -> Option<&[u8]> {
    region.iter().position(|b| *b == 0).map(|idx| &region[..idx])
}

/// Fixed-size error channel filled by the callee with a NUL-terminated message.
#[derive(Debug, Clone)]
pub struct ErrorBuffer {
    data: Vec<u8>,
}

impl Default for ErrorBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorBuffer {
    pub fn new() -> Self {
        ErrorBuffer {
            data: vec![0u8; ERROR_CAPACITY],
        }
    }

    pub fn as_mut_ptr(&mut self) -> *mut c_char {
        self.data.as_mut_ptr().cast()
    }

    pub fn capacity_c(&self) -> c_ulong {
        c_ulong::try_from(self.data.len()).unwrap_or(c_ulong::MAX)
    }

    /// Message up to its first terminator (or the whole buffer if the callee
    /// filled it completely).
    pub fn message(&self) -> String {
        let bytes = until_nul(&self.data).unwrap_or(&self.data);
        String::from_utf8_lossy(bytes).trim().to_string()
    }

    pub fn is_empty(&self) -> bool {
        self.data.first().is_none_or(|b| *b == 0)
    }

    pub fn clear(&mut self) {
        self.data.fill(0);
    }
}

/// Length of an input passed to the callee, in its length type.
pub fn c_len(what: &'static str, len: usize) -> BenchResult<c_ulong> {
    c_ulong::try_from(len).map_err(|_| BenchError::BufferOverCapacity {
        what,
        reported: len,
        capacity: usize::try_from(c_ulong::MAX).unwrap_or(usize::MAX),
    })
}

/// Outcome of one native call, as classified by the calling shim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallStatus {
    Ok,
    /// The callee needs more room; buffers carry the lengths it asked for.
    ShortBuffer,
    Failed { code: i32, message: String },
}

/// How output buffers are sized and how far they may grow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityPolicy {
    pub initial: usize,
    pub ceiling: usize,
}

impl CapacityPolicy {
    pub fn new(initial: usize, ceiling: usize) -> Self {
        let initial = initial.max(1);
        CapacityPolicy {
            initial,
            ceiling: ceiling.max(initial),
        }
    }

    pub fn witness() -> Self {
        Self::new(WITNESS_CAPACITY, 4 * WITNESS_CAPACITY)
    }

    pub fn proof() -> Self {
        Self::new(PROOF_CAPACITY, 16 * PROOF_CAPACITY)
    }
}

/// Buffers after a successful negotiated call.
#[derive(Debug)]
pub struct Negotiated<const N: usize> {
    pub buffers: [NativeBuffer; N],
    /// Wall-clock duration of the successful call only.
    pub elapsed: Duration,
    pub attempts: u32,
}

/// Call a native function with `N` output buffers, growing them and retrying
/// while the callee reports a short buffer.
///
/// On a short-buffer status each buffer grows to the length the callee
/// asked for, or doubles if it asked for nothing larger. Growth past the
/// policy ceiling fails with `BufferOverCapacity`. On success every reported
/// length is validated against its declared capacity.
pub fn negotiate<const N: usize, F>(
    labels: [&'static str; N],
    policy: CapacityPolicy,
    error_kind: fn(String) -> BenchError,
    mut call: F,
) -> BenchResult<Negotiated<N>>
where
    F: FnMut(&mut [NativeBuffer; N], &mut ErrorBuffer) -> CallStatus,
{
    let mut buffers = labels.map(|what| NativeBuffer::with_capacity(what, policy.initial));
    let mut errors = ErrorBuffer::new();
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        errors.clear();
        let start = Instant::now();
        let status = call(&mut buffers, &mut errors);
        let elapsed = start.elapsed();

        match status {
            CallStatus::Ok => {
                for buf in &buffers {
                    buf.validate()?;
                }
                return Ok(Negotiated {
                    buffers,
                    elapsed,
                    attempts,
                });
            }
            CallStatus::ShortBuffer => {
                let any_claim = buffers.iter().any(|b| b.claimed() > b.capacity());
                for buf in buffers.iter_mut() {
                    let wanted = if any_claim {
                        buf.claimed().max(buf.capacity())
                    } else {
                        buf.capacity().saturating_mul(2).max(1)
                    };
                    if wanted > policy.ceiling {
                        return Err(BenchError::BufferOverCapacity {
                            what: buf.what(),
                            reported: wanted,
                            capacity: policy.ceiling,
                        });
                    }
                    if wanted != buf.capacity() {
                        debug!(buffer = buf.what(), from = buf.capacity(), to = wanted, "growing native buffer");
                        buf.grow_to(wanted);
                    }
                }
            }
            CallStatus::Failed { code, message } => {
                let detail = if message.is_empty() {
                    errors.message()
                } else {
                    message
                };
                return Err(error_kind(format!("status {code}: {detail}")));
            }
        }
    }
}
