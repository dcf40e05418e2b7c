use core::fmt;

/// The error returned by [`SearchMap::at`](crate::SearchMap::at) and
/// [`SearchMap::at_mut`](crate::SearchMap::at_mut) when the map has no entry for the requested
/// key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyNotFound;

impl fmt::Display for KeyNotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("key not found")
    }
}

#[cfg(feature = "std")]
extern crate std;

#[cfg(feature = "std")]
impl std::error::Error for KeyNotFound {}
