// Domain inventory: the minimal item-stack view launchers reload from.

use crate::domain::definitions::ItemKey;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemStack {
    #[serde(flatten)]
    pub item: ItemKey,
    pub count: u32,
}

/// Ordered item stacks belonging to an actor or a storage crate.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Inventory {
    pub stacks: Vec<ItemStack>,
}

impl Inventory {
    pub fn with_stack(mut self, item: ItemKey, count: u32) -> Self {
        self.stacks.push(ItemStack { item, count });
        self
    }

    pub fn count_of(&self, item: &ItemKey) -> u32 {
        self.stacks
            .iter()
            .filter(|stack| &stack.item == item)
            .map(|stack| stack.count)
            .sum()
    }

    /// Removes one item from the stack at `index`, dropping the stack when it empties.
    pub fn remove_one(&mut self, index: usize) {
        if let Some(stack) = self.stacks.get_mut(index) {
            stack.count = stack.count.saturating_sub(1);
            if stack.count == 0 {
                self.stacks.remove(index);
            }
        }
    }
}
