/// Engine streaming granularity: 800 samples of 16-bit PCM.
pub const STRIDE_BYTES: usize = 800 * 2;

/// If `samples` holds at least one full stride, slices off the largest
/// stride-aligned prefix and returns it, leaving the (sub-stride) remainder
/// in place. Returns `None` when less than one stride is buffered.
pub fn drain_ready_chunk(samples: &mut Vec<u8>) -> Option<Vec<u8>> {
    if samples.len() < STRIDE_BYTES {
        return None;
    }
    let whole_strides = samples.len() / STRIDE_BYTES;
    let take = whole_strides * STRIDE_BYTES;
    let remainder = samples.split_off(take);
    let chunk = std::mem::replace(samples, remainder);
    Some(chunk)
}
