// ============================================================================
// spark-store - Equality
// Identity and one-level shallow comparison for selected values
// ============================================================================
//
// Two comparators gate every selector re-render:
//
// - `is` is strict identity. Primitives compare by value, floats keep signed
//   zeros apart and treat NaN as equal to NaN, and shared objects (`Rc`,
//   `Arc`) compare by pointer.
// - `shallow_equal` first tries identity, then compares the first-level
//   entries of two record-like values with `is`. It never recurses.
//
// Owned collections and plain structs have no identity of their own. State
// that wants nested objects to survive a shallow copy keeps them behind `Rc`.
// ============================================================================

use std::any::Any;
use std::borrow::{Borrow, Cow};
use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash};
use std::rc::{Rc, Weak};
use std::sync::Arc;

// =============================================================================
// IDENTITY
// =============================================================================

/// Strict identity comparison.
///
/// Implemented for primitives (by value), floats (signed zero and NaN aware),
/// and shared pointers (by address).
pub trait Identity {
    /// Returns true if `self` and `other` are the same value.
    fn is(&self, other: &Self) -> bool;
}

/// Identity comparator.
///
/// # Example
/// ```
/// use spark_store::is;
/// use std::rc::Rc;
///
/// assert!(!is(&0.0, &-0.0));
/// assert!(is(&-0.0, &-0.0));
/// assert!(is(&f64::NAN, &f64::NAN));
/// assert!(is(&1, &1));
///
/// let a = Rc::new(vec![1]);
/// assert!(is(&a, &a.clone()));
/// assert!(!is(&a, &Rc::new(vec![1])));
/// ```
pub fn is<T: Identity + ?Sized>(x: &T, y: &T) -> bool {
    x.is(y)
}

macro_rules! identity_by_value {
    ($($t:ty),* $(,)?) => {
        $(
            impl Identity for $t {
                #[inline]
                fn is(&self, other: &Self) -> bool {
                    self == other
                }
            }

            impl ShallowEq for $t {
                #[inline]
                fn shallow_eq(&self, other: &Self) -> bool {
                    self.is(other)
                }
            }
        )*
    };
}

identity_by_value!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, bool, char, (), str, String,
);

macro_rules! identity_for_float {
    ($($t:ty),*) => {
        $(
            impl Identity for $t {
                fn is(&self, other: &Self) -> bool {
                    if self == other {
                        // 0.0 == -0.0 under IEEE 754
                        self.is_sign_negative() == other.is_sign_negative()
                    } else {
                        self.is_nan() && other.is_nan()
                    }
                }
            }

            impl ShallowEq for $t {
                #[inline]
                fn shallow_eq(&self, other: &Self) -> bool {
                    self.is(other)
                }
            }
        )*
    };
}

identity_for_float!(f32, f64);

impl<T: Identity + ?Sized> Identity for &T {
    fn is(&self, other: &Self) -> bool {
        (**self).is(*other)
    }
}

impl<T: ?Sized> Identity for Rc<T> {
    fn is(&self, other: &Self) -> bool {
        Rc::as_ptr(self) as *const () == Rc::as_ptr(other) as *const ()
    }
}

impl<T: ?Sized> Identity for Arc<T> {
    fn is(&self, other: &Self) -> bool {
        Arc::as_ptr(self) as *const () == Arc::as_ptr(other) as *const ()
    }
}

impl<T: ?Sized> Identity for Weak<T> {
    fn is(&self, other: &Self) -> bool {
        self.as_ptr() as *const () == other.as_ptr() as *const ()
    }
}

impl<T: Identity> Identity for Option<T> {
    fn is(&self, other: &Self) -> bool {
        match (self, other) {
            (None, None) => true,
            (Some(a), Some(b)) => a.is(b),
            _ => false,
        }
    }
}

// =============================================================================
// FIELDS AND RECORDS
// =============================================================================

/// A type-erased record entry that can be compared by identity.
///
/// Blanket-implemented for every `Identity + 'static` type. Entries of
/// different concrete types are never identical.
pub trait Field: Any {
    /// Identity comparison against another erased entry.
    fn is_field(&self, other: &dyn Field) -> bool;

    /// Upcast for downcasting.
    fn as_any(&self) -> &dyn Any;
}

impl<T: Identity + Any> Field for T {
    fn is_field(&self, other: &dyn Field) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self.is(other))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Key enumeration for record-like values.
///
/// `keys` lists the value's own entries; `get` looks one up by name. Both
/// operate on the first level only.
pub trait Record {
    /// Own keys of this value.
    fn keys(&self) -> Vec<Cow<'_, str>>;

    /// Entry stored under `key`, if present.
    fn get(&self, key: &str) -> Option<&dyn Field>;
}

impl<K, V, S> Record for HashMap<K, V, S>
where
    K: Borrow<str> + Eq + Hash,
    V: Identity + 'static,
    S: BuildHasher,
{
    fn keys(&self) -> Vec<Cow<'_, str>> {
        HashMap::keys(self)
            .map(|key| Cow::Borrowed(Borrow::<str>::borrow(key)))
            .collect()
    }

    fn get(&self, key: &str) -> Option<&dyn Field> {
        HashMap::get(self, key).map(|value| value as &dyn Field)
    }
}

impl<K, V> Record for BTreeMap<K, V>
where
    K: Borrow<str> + Ord,
    V: Identity + 'static,
{
    fn keys(&self) -> Vec<Cow<'_, str>> {
        BTreeMap::keys(self)
            .map(|key| Cow::Borrowed(Borrow::<str>::borrow(key)))
            .collect()
    }

    fn get(&self, key: &str) -> Option<&dyn Field> {
        BTreeMap::get(self, key).map(|value| value as &dyn Field)
    }
}

/// Compare two records key by key.
///
/// False if the key counts differ, if `b` lacks any key of `a`, or if any
/// pair of entries is not identical. Key order is irrelevant. The two sides
/// may be different record types.
pub fn shallow_equal_records<A, B>(a: &A, b: &B) -> bool
where
    A: Record + ?Sized,
    B: Record + ?Sized,
{
    let keys_a = a.keys();
    if keys_a.len() != b.keys().len() {
        return false;
    }

    keys_a.iter().all(|key| match (a.get(key), b.get(key)) {
        (Some(left), Some(right)) => left.is_field(right),
        _ => false,
    })
}

// =============================================================================
// SHALLOW EQUALITY
// =============================================================================

/// One-level structural comparison.
///
/// Primitives compare by identity. Containers compare their first-level
/// entries by identity: tuples, `Vec`, slices and arrays by index, maps and
/// records by key. Nested containers are never walked.
pub trait ShallowEq {
    /// Returns true if `self` and `other` are shallowly equal.
    fn shallow_eq(&self, other: &Self) -> bool;
}

/// Shallow structural comparator.
///
/// # Example
/// ```
/// use spark_store::shallow_equal;
/// use std::collections::HashMap;
/// use std::rc::Rc;
///
/// let a = HashMap::from([("a".to_string(), 1), ("b".to_string(), 2)]);
/// let b = HashMap::from([("b".to_string(), 2), ("a".to_string(), 1)]);
/// assert!(shallow_equal(&a, &b));
///
/// // One level only: nested objects compare by identity
/// let x = (Rc::new(vec![1]),);
/// let y = (Rc::new(vec![1]),);
/// assert!(!shallow_equal(&x, &y));
///
/// assert!(shallow_equal(&5, &5));
/// assert!(!shallow_equal(&None, &Some((1,))));
/// ```
pub fn shallow_equal<T: ShallowEq + ?Sized>(a: &T, b: &T) -> bool {
    a.shallow_eq(b)
}

impl<T: ShallowEq + ?Sized> ShallowEq for &T {
    fn shallow_eq(&self, other: &Self) -> bool {
        std::ptr::eq(*self, *other) || (**self).shallow_eq(*other)
    }
}

impl<T: ShallowEq> ShallowEq for Option<T> {
    fn shallow_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (None, None) => true,
            (Some(a), Some(b)) => a.shallow_eq(b),
            // null never equals an object
            _ => false,
        }
    }
}

impl<T: ShallowEq + ?Sized> ShallowEq for Rc<T> {
    fn shallow_eq(&self, other: &Self) -> bool {
        self.is(other) || (**self).shallow_eq(&**other)
    }
}

impl<T: ShallowEq + ?Sized> ShallowEq for Arc<T> {
    fn shallow_eq(&self, other: &Self) -> bool {
        self.is(other) || (**self).shallow_eq(&**other)
    }
}

impl<T: Identity> ShallowEq for [T] {
    fn shallow_eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other).all(|(a, b)| a.is(b))
    }
}

impl<T: Identity, const N: usize> ShallowEq for [T; N] {
    fn shallow_eq(&self, other: &Self) -> bool {
        self.as_slice().shallow_eq(other.as_slice())
    }
}

impl<T: Identity> ShallowEq for Vec<T> {
    fn shallow_eq(&self, other: &Self) -> bool {
        self.as_slice().shallow_eq(other.as_slice())
    }
}

impl<K, V, S> ShallowEq for HashMap<K, V, S>
where
    K: Eq + Hash,
    V: Identity,
    S: BuildHasher,
{
    fn shallow_eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(key, value)| other.get(key).is_some_and(|o| value.is(o)))
    }
}

impl<K: Ord, V: Identity> ShallowEq for BTreeMap<K, V> {
    fn shallow_eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(key, value)| other.get(key).is_some_and(|o| value.is(o)))
    }
}

macro_rules! shallow_eq_for_tuple {
    ($(($($name:ident . $idx:tt),+))+) => {
        $(
            impl<$($name: Identity),+> ShallowEq for ($($name,)+) {
                fn shallow_eq(&self, other: &Self) -> bool {
                    true $(&& self.$idx.is(&other.$idx))+
                }
            }
        )+
    };
}

shallow_eq_for_tuple! {
    (A.0)
    (A.0, B.1)
    (A.0, B.1, C.2)
    (A.0, B.1, C.2, D.3)
    (A.0, B.1, C.2, D.3, E.4)
    (A.0, B.1, C.2, D.3, E.4, F.5)
    (A.0, B.1, C.2, D.3, E.4, F.5, G.6)
    (A.0, B.1, C.2, D.3, E.4, F.5, G.6, H.7)
}

// =============================================================================
// TESTS
// =============================================================================
