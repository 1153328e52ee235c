//! Edge-offset width selection
//!
//! Picked edges are carried through the sort and gather stages as offsets
//! within their row. The offset type is the narrowest unsigned integer that
//! can hold `max_in_degree - 1`; the pipeline selects it once per call and
//! then runs a monomorphized code path for that width.

use crate::error::{Result, SamplingError};
use std::fmt::Debug;
use std::sync::atomic::{AtomicU16, AtomicU32, AtomicU64, AtomicU8, Ordering};

/// Integer width of intra-row edge offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EdgeIdWidth {
    /// `u8`
    U8,
    /// `u16`
    U16,
    /// `u32`
    U32,
    /// `u64`
    U64,
}

impl EdgeIdWidth {
    /// Narrowest width whose offsets cover a row of `max_in_degree` edges
    #[must_use]
    pub fn for_max_degree(max_in_degree: u64) -> Self {
        let max_offset = max_in_degree.saturating_sub(1);
        if max_offset <= u64::from(u8::MAX) {
            Self::U8
        } else if max_offset <= u64::from(u16::MAX) {
            Self::U16
        } else if max_offset <= u64::from(u32::MAX) {
            Self::U32
        } else {
            Self::U64
        }
    }

    /// Width in bits
    #[must_use]
    pub const fn bits(self) -> u32 {
        match self {
            Self::U8 => u8::BITS,
            Self::U16 => u16::BITS,
            Self::U32 => u32::BITS,
            Self::U64 => u64::BITS,
        }
    }

    /// Largest representable offset
    #[must_use]
    pub const fn max_offset(self) -> u64 {
        match self {
            Self::U8 => u8::MAX as u64,
            Self::U16 => u16::MAX as u64,
            Self::U32 => u32::MAX as u64,
            Self::U64 => u64::MAX,
        }
    }

    /// Check that every offset of a row with `max_in_degree` edges fits
    ///
    /// # Errors
    ///
    /// Returns `SamplingError::Capacity` if it does not
    pub fn validate(self, max_in_degree: u64) -> Result<Self> {
        if max_in_degree.saturating_sub(1) > self.max_offset() {
            return Err(SamplingError::Capacity {
                bits: self.bits(),
                max_in_degree,
            });
        }
        Ok(self)
    }
}

/// Unsigned integer usable as an intra-row edge offset
pub trait EdgeOffset: Copy + Ord + Default + Debug + Send + Sync + 'static {
    /// Atomic counterpart used as a reservoir slot
    type Atomic: Default + Send + Sync + 'static;

    /// Width tag
    const WIDTH: EdgeIdWidth;

    /// Narrowing conversion; callers have validated the range
    fn from_u64(value: u64) -> Self;

    /// Widening conversion
    fn to_u64(self) -> u64;

    /// Atomic max on a slot
    fn fetch_max(slot: &Self::Atomic, value: Self);

    /// Read a slot
    fn load(slot: &Self::Atomic) -> Self;
}

macro_rules! impl_edge_offset {
    ($($t:ty => $atomic:ty, $width:ident;)*) => {
        $(
            impl EdgeOffset for $t {
                type Atomic = $atomic;

                const WIDTH: EdgeIdWidth = EdgeIdWidth::$width;

                #[allow(clippy::cast_possible_truncation)]
                fn from_u64(value: u64) -> Self {
                    debug_assert!(value <= Self::WIDTH.max_offset());
                    value as $t
                }

                fn to_u64(self) -> u64 {
                    u64::from(self)
                }

                fn fetch_max(slot: &Self::Atomic, value: Self) {
                    slot.fetch_max(value, Ordering::Relaxed);
                }

                fn load(slot: &Self::Atomic) -> Self {
                    slot.load(Ordering::Relaxed)
                }
            }
        )*
    };
}

impl_edge_offset! {
    u8 => AtomicU8, U8;
    u16 => AtomicU16, U16;
    u32 => AtomicU32, U32;
    u64 => AtomicU64, U64;
}

/// Run `$body` with `$t` bound to the offset type selected by `$width`
///
/// ```ignore
/// let picked = dispatch_edge_id!(width, T, { select::<T>(&stream, &plan).await? });
/// ```
macro_rules! dispatch_edge_id {
    ($width:expr, $t:ident, $body:block) => {
        match $width {
            $crate::sampling::width::EdgeIdWidth::U8 => {
                type $t = u8;
                $body
            }
            $crate::sampling::width::EdgeIdWidth::U16 => {
                type $t = u16;
                $body
            }
            $crate::sampling::width::EdgeIdWidth::U32 => {
                type $t = u32;
                $body
            }
            $crate::sampling::width::EdgeIdWidth::U64 => {
                type $t = u64;
                $body
            }
        }
    };
}

pub(crate) use dispatch_edge_id;
