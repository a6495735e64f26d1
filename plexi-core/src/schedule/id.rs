use anyhow::anyhow;
use std::{fmt, str};

/// The handle of a slotframe in the [`Schedule`]
///
/// Slotframe handles are chosen by whoever installs the slotframe.
///
/// [`Schedule`]: crate::schedule::Schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotframeId(u16);

/// The handle of a link in the [`Schedule`]
///
/// Link handles are assigned by the schedule when the link is added, from
/// a counter shared by every slotframe. A handle still in use is never
/// handed out twice.
///
/// [`Schedule`]: crate::schedule::Schedule
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LinkHandle(u16);

macro_rules! u16_id {
    ($ty:ident) => {
        impl $ty {
            pub const ZERO: Self = $ty::new(0);
            pub const ONE: Self = $ty::new(1);

            pub const fn new(id: u16) -> Self {
                Self(id)
            }

            pub const fn get(self) -> u16 {
                self.0
            }
        }

        impl From<u16> for $ty {
            fn from(id: u16) -> Self {
                Self::new(id)
            }
        }

        impl str::FromStr for $ty {
            type Err = anyhow::Error;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse().map(Self).map_err(|error| anyhow!("{error}"))
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
        impl fmt::LowerHex for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::LowerHex::fmt(&self.0, f)
            }
        }
        impl fmt::UpperHex for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::UpperHex::fmt(&self.0, f)
            }
        }
    };
}

u16_id!(SlotframeId);
u16_id!(LinkHandle);

impl LinkHandle {
    /// the handle after this one, wrapping around
    #[must_use = "function does not modify the current value"]
    pub(crate) fn next(self) -> Self {
        Self::new(self.0.wrapping_add(1))
    }
}
