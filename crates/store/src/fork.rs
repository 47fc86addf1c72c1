//! Bounded window of recent blocks kept for fork switching

use std::collections::BTreeMap;

/// Recent block candidates by height
///
/// Only the last `max_size` heights below and including the head are kept;
/// anything older can no longer be switched to.
#[derive(Debug)]
pub struct ForkDatabase<B> {
    blocks: BTreeMap<u32, Vec<B>>,
    head_num: u32,
    max_size: u32,
}

impl<B> ForkDatabase<B> {
    pub fn new(max_size: u32) -> Self {
        Self {
            blocks: BTreeMap::new(),
            head_num: 0,
            max_size: max_size.max(1),
        }
    }

    pub fn push(&mut self, num: u32, block: B) {
        self.blocks.entry(num).or_default().push(block);
        self.head_num = self.head_num.max(num);
        self.prune();
    }

    pub fn set_max_size(&mut self, max_size: u32) {
        self.max_size = max_size.max(1);
        self.prune();
    }

    pub fn max_size(&self) -> u32 {
        self.max_size
    }

    pub fn head_num(&self) -> u32 {
        self.head_num
    }

    pub fn fetch(&self, num: u32) -> &[B] {
        self.blocks.get(&num).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of heights retained
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    fn prune(&mut self) {
        if self.head_num < self.max_size {
            return;
        }
        let oldest_kept = self.head_num - self.max_size + 1;
        self.blocks = self.blocks.split_off(&oldest_kept);
    }
}
