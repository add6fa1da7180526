/// Command-list group affinity of a draw operation.
///
/// Each group owns one priority queue and one command buffer. Group `0` is the
/// default.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default, PartialOrd, Ord)]
pub struct CommandListGroup(pub u8);

impl CommandListGroup {
    pub const DEFAULT: Self = Self(0);

    #[inline]
    pub const fn new(v: u8) -> Self {
        Self(v)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Static group definition of a manager.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct CommandListGroups {
    /// Number of groups. Always at least 1.
    pub count: usize,
    /// Expected operations per group per frame; sizes queue and dispatch storage.
    pub expected_ops: usize,
}

impl CommandListGroups {
    pub fn new(count: usize, expected_ops: usize) -> Self {
        Self {
            count: count.clamp(1, u8::MAX as usize + 1),
            expected_ops,
        }
    }

    #[inline]
    pub fn contains(&self, group: CommandListGroup) -> bool {
        group.index() < self.count
    }

    /// Iterates groups in submission order.
    pub fn iter(&self) -> impl Iterator<Item = CommandListGroup> + use<> {
        (0..self.count).map(|i| CommandListGroup(i as u8))
    }
}

impl Default for CommandListGroups {
    fn default() -> Self {
        Self::new(1, 64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_is_clamped_to_at_least_one() {
        assert_eq!(CommandListGroups::new(0, 4).count, 1);
        assert_eq!(CommandListGroups::new(1000, 4).count, 256);
    }

    #[test]
    fn contains_respects_count() {
        let g = CommandListGroups::new(2, 4);
        assert!(g.contains(CommandListGroup(0)));
        assert!(g.contains(CommandListGroup(1)));
        assert!(!g.contains(CommandListGroup(2)));
        assert_eq!(g.iter().collect::<Vec<_>>(), vec![CommandListGroup(0), CommandListGroup(1)]);
    }
}
