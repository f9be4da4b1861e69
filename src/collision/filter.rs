use crate::error::PhysicsError;
use crate::Result;

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Collision filtering data attached to a fixture
///
/// Wire format: 16-bit category and mask bitsets and a signed 16-bit group
/// index. A shared positive group forces collision, a shared negative group
/// forbids it, and group 0 (or differing groups) falls through to the
/// category/mask test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Filter {
    /// The category bits this fixture belongs to
    pub category: u16,

    /// The categories this fixture accepts collisions with
    pub mask: u16,

    /// The group index; nonzero groups override the category/mask test
    pub group: i16,
}

impl Default for Filter {
    fn default() -> Self {
        Self {
            category: 0x0001,
            mask: 0xFFFF,
            group: 0,
        }
    }
}

impl Filter {
    /// Creates a filter, validating the documented wire ranges
    ///
    /// `category` and `mask` must fit in 16 bits and `group` in a signed
    /// 16-bit integer, otherwise `InvalidFilterRange` is returned.
    pub fn new(category: u32, mask: u32, group: i32) -> Result<Self> {
        if category > u16::MAX as u32 || mask > u16::MAX as u32 {
            return Err(PhysicsError::InvalidFilterRange);
        }

        if group < i16::MIN as i32 || group > i16::MAX as i32 {
            return Err(PhysicsError::InvalidFilterRange);
        }

        Ok(Self {
            category: category as u16,
            mask: mask as u16,
            group: group as i16,
        })
    }

    /// Returns whether two filters allow their fixtures to collide
    pub fn should_collide(&self, other: &Filter) -> bool {
        if self.group == other.group && self.group != 0 {
            return self.group > 0;
        }

        (self.category & other.mask) != 0 && (other.category & self.mask) != 0
    }
}
