//! Lock-free SPSC ring buffer carrying raw i16 samples from the cpal
//! callback thread to the audio loop task.

use ringbuf::{
    traits::{Consumer, Observer, Producer, Split},
    HeapRb,
};

/// Default capacity: ~10 seconds of 16 kHz mono audio.
const DEFAULT_CAPACITY: usize = 160_000;

/// Producer half — lives in the cpal audio callback thread.
pub struct SampleProducer {
    inner: ringbuf::HeapProd<i16>,
}

/// Consumer half — lives in the audio loop task.
pub struct SampleConsumer {
    inner: ringbuf::HeapCons<i16>,
}

/// Create a matched producer/consumer pair backed by a lock-free ring buffer.
pub fn sample_ring(capacity: Option<usize>) -> (SampleProducer, SampleConsumer) {
    let cap = capacity.unwrap_or(DEFAULT_CAPACITY);
    let rb = HeapRb::<i16>::new(cap);
    let (prod, cons) = rb.split();
    (SampleProducer { inner: prod }, SampleConsumer { inner: cons })
}

impl SampleProducer {
    /// Push a slice of samples. Returns the number actually written; fewer
    /// than requested means the buffer is full — overflow must never raise
    /// (spec §4.1), the oldest audio on the consumer side is simply lost.
    pub fn push_slice(&mut self, samples: &[i16]) -> usize {
        self.inner.push_slice(samples)
    }
}

// Safety: ringbuf halves are single-thread-per-handle; cpal callbacks run on
// a dedicated audio thread.
unsafe impl Send for SampleProducer {}

impl SampleConsumer {
    /// Pop up to `buf.len()` samples. Returns the number actually read.
    pub fn pop_slice(&mut self, buf: &mut [i16]) -> usize {
        self.inner.pop_slice(buf)
    }

    /// Number of samples currently available for reading.
    pub fn available(&self) -> usize {
        self.inner.occupied_len()
    }
}

unsafe impl Send for SampleConsumer {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_samples() {
        let (mut prod, mut cons) = sample_ring(Some(16));
        let written = prod.push_slice(&[1, 2, 3, 4]);
        assert_eq!(written, 4);
        assert_eq!(cons.available(), 4);
        let mut out = [0i16; 4];
        let read = cons.pop_slice(&mut out);
        assert_eq!(read, 4);
        assert_eq!(out, [1, 2, 3, 4]);
    }

    #[test]
    fn overflow_drops_oldest_without_panicking() {
        let (mut prod, _cons) = sample_ring(Some(4));
        let written = prod.push_slice(&[1, 2, 3, 4, 5, 6]);
        assert!(written <= 6);
    }
}
