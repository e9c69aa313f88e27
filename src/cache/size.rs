//! Size Estimation Module
//!
//! Deterministic memory cost of cached values, used for admission accounting.

use std::mem::size_of;
use std::rc::Rc;
use std::sync::Arc;

// == Cache Size Trait ==
/// Estimated memory cost of a value in bytes.
///
/// Byte-like payloads cost their byte length; fixed-width values cost their
/// in-memory width. The estimate must be deterministic: the same value always
/// reports the same cost.
pub trait CacheSize {
    /// Returns the estimated cost in bytes.
    fn cache_size(&self) -> u64;
}

impl CacheSize for str {
    fn cache_size(&self) -> u64 {
        self.len() as u64
    }
}

impl CacheSize for String {
    fn cache_size(&self) -> u64 {
        self.len() as u64
    }
}

impl CacheSize for [u8] {
    fn cache_size(&self) -> u64 {
        self.len() as u64
    }
}

impl CacheSize for Vec<u8> {
    fn cache_size(&self) -> u64 {
        self.len() as u64
    }
}

impl<T: CacheSize + ?Sized> CacheSize for &T {
    fn cache_size(&self) -> u64 {
        (**self).cache_size()
    }
}

impl<T: CacheSize + ?Sized> CacheSize for Box<T> {
    fn cache_size(&self) -> u64 {
        (**self).cache_size()
    }
}

impl<T: CacheSize + ?Sized> CacheSize for Arc<T> {
    fn cache_size(&self) -> u64 {
        (**self).cache_size()
    }
}

impl<T: CacheSize + ?Sized> CacheSize for Rc<T> {
    fn cache_size(&self) -> u64 {
        (**self).cache_size()
    }
}

impl<T: CacheSize> CacheSize for Option<T> {
    fn cache_size(&self) -> u64 {
        self.as_ref().map_or(0, CacheSize::cache_size)
    }
}

macro_rules! fixed_size {
    ($($ty:ty),* $(,)?) => {
        $(
            impl CacheSize for $ty {
                fn cache_size(&self) -> u64 {
                    size_of::<$ty>() as u64
                }
            }
        )*
    };
}

fixed_size!(
    bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64
);
