//! 滚动日志
//!
//! 固定容量的先进先出缓冲区，满时淘汰最早的条目

use std::collections::VecDeque;

/// 容量固定的滚动日志，超出容量时淘汰最早的条目
#[derive(Debug, Clone)]
pub struct RollingLog<T> {
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T> RollingLog<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// 追加一条记录，返回被淘汰的最早条目（如果有）
    pub fn push(&mut self, item: T) -> Option<T> {
        self.entries.push_back(item);
        if self.entries.len() > self.capacity {
            self.entries.pop_front()
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 按到达顺序遍历
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.entries.iter()
    }

    /// 最近的 `n` 条，按到达顺序
    pub fn latest(&self, n: usize) -> impl Iterator<Item = &T> {
        self.entries.iter().skip(self.entries.len().saturating_sub(n))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<T: Clone> RollingLog<T> {
    /// 当前内容的快照
    pub fn to_vec(&self) -> Vec<T> {
        self.entries.iter().cloned().collect()
    }
}
