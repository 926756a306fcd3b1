/// Rolling punctuation-model context. Two slots, read and written solely by
/// the decode path, cleared on final flush.
#[derive(Debug, Clone, Default)]
pub struct PuncCache {
    pub slots: [Vec<String>; 2],
}

impl PuncCache {
    pub fn reset(&mut self) {
        self.slots = [Vec::new(), Vec::new()];
    }
}
