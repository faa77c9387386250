//! Equality used by memo caches to decide whether arguments changed.
//!
//! [`ShallowEq`] is the crate's notion of "the same argument": scalars and
//! strings compare by value, shared pointers compare by identity, and
//! composite argument lists compare position by position, stopping at the
//! first mismatch.

use std::rc::Rc;
use std::sync::Arc;

/// Cheap identity-style equality.
pub trait ShallowEq {
    fn shallow_eq(&self, other: &Self) -> bool;
}

macro_rules! impl_shallow_eq_by_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ShallowEq for $ty {
                #[inline]
                fn shallow_eq(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

impl_shallow_eq_by_value!(
    (), bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
    str, String,
);

impl<T: ShallowEq + ?Sized> ShallowEq for &T {
    #[inline]
    fn shallow_eq(&self, other: &Self) -> bool {
        (**self).shallow_eq(*other)
    }
}

impl<T: ?Sized> ShallowEq for Rc<T> {
    #[inline]
    fn shallow_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other)
    }
}

impl<T: ?Sized> ShallowEq for Arc<T> {
    #[inline]
    fn shallow_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

impl<T: ShallowEq> ShallowEq for Option<T> {
    fn shallow_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.shallow_eq(b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T: ShallowEq> ShallowEq for [T] {
    fn shallow_eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other).all(|(a, b)| a.shallow_eq(b))
    }
}

impl<T: ShallowEq> ShallowEq for Vec<T> {
    fn shallow_eq(&self, other: &Self) -> bool {
        self.as_slice().shallow_eq(other.as_slice())
    }
}

macro_rules! impl_shallow_eq_for_tuple {
    ($($name:ident => $idx:tt),+) => {
        impl<$($name: ShallowEq),+> ShallowEq for ($($name,)+) {
            fn shallow_eq(&self, other: &Self) -> bool {
                $(self.$idx.shallow_eq(&other.$idx))&&+
            }
        }
    };
}

impl_shallow_eq_for_tuple!(T0 => 0);
impl_shallow_eq_for_tuple!(T0 => 0, T1 => 1);
impl_shallow_eq_for_tuple!(T0 => 0, T1 => 1, T2 => 2);
impl_shallow_eq_for_tuple!(T0 => 0, T1 => 1, T2 => 2, T3 => 3);
impl_shallow_eq_for_tuple!(T0 => 0, T1 => 1, T2 => 2, T3 => 3, T4 => 4);
impl_shallow_eq_for_tuple!(T0 => 0, T1 => 1, T2 => 2, T3 => 3, T4 => 4, T5 => 5);
impl_shallow_eq_for_tuple!(T0 => 0, T1 => 1, T2 => 2, T3 => 3, T4 => 4, T5 => 5, T6 => 6);
impl_shallow_eq_for_tuple!(
    T0 => 0, T1 => 1, T2 => 2, T3 => 3, T4 => 4, T5 => 5, T6 => 6, T7 => 7
);

/// Strategy deciding whether two argument lists are equal.
///
/// Any `Fn(&A, &A) -> bool` closure can be used as a custom strategy.
pub trait ArgsEquality<A: ?Sized> {
    fn args_equal(&self, previous: &A, next: &A) -> bool;
}

/// Positional [`ShallowEq`] comparison. The default.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShallowEquality;

impl<A: ShallowEq + ?Sized> ArgsEquality<A> for ShallowEquality {
    #[inline]
    fn args_equal(&self, previous: &A, next: &A) -> bool {
        previous.shallow_eq(next)
    }
}

/// Deep comparison through `PartialEq`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueEquality;

impl<A: PartialEq + ?Sized> ArgsEquality<A> for ValueEquality {
    #[inline]
    fn args_equal(&self, previous: &A, next: &A) -> bool {
        previous == next
    }
}

impl<A: ?Sized, F> ArgsEquality<A> for F
where
    F: Fn(&A, &A) -> bool,
{
    #[inline]
    fn args_equal(&self, previous: &A, next: &A) -> bool {
        self(previous, next)
    }
}
