// ============================================================================
// spark-store - Ergonomic Macros
// ============================================================================

/// Helper macro to clone variables into a move closure.
///
/// Saves cloning store handles and `Rc`s by hand before moving them into a
/// subscriber or render function.
///
/// # Usage
///
/// ```rust
/// use spark_store::{cloned, create_store, Store};
/// use std::cell::Cell;
/// use std::collections::HashMap;
/// use std::rc::Rc;
///
/// let store: Store<HashMap<&str, i32>> = create_store(HashMap::from([("count", 0)]));
/// let seen = Rc::new(Cell::new(0));
///
/// let _subscription = store.subscribe(Rc::new(cloned!(seen => move |s: &HashMap<&str, i32>| {
///     seen.set(s["count"])
/// })));
///
/// store.write(|_| HashMap::from([("count", 3)]));
/// assert_eq!(seen.get(), 3);
/// ```
#[macro_export]
macro_rules! cloned {
    ($($n:ident),+ => $e:expr) => {
        {
            $( let $n = $n.clone(); )+
            $e
        }
    };
}

/// Declare a state record together with its patch type.
///
/// Generates:
/// - the struct as written
/// - `$patch`, with every field wrapped in `Option` and one builder method per
///   field
/// - `StoreState` (merging a patch overwrites its `Some` fields)
/// - `Record` and `ShallowEq`, comparing fields one level deep
///
/// Field types must implement [`Identity`](crate::Identity). Nested records
/// belong behind an `Rc` so that they compare by reference.
///
/// # Usage
///
/// ```rust
/// use spark_store::{record, shallow_equal, StoreState};
/// use std::rc::Rc;
///
/// record! {
///     #[derive(Debug, Clone, PartialEq)]
///     pub struct Profile => ProfilePatch {
///         pub name: String,
///         pub tags: Rc<Vec<String>>,
///         pub visits: u32,
///     }
/// }
///
/// let tags = Rc::new(vec!["admin".to_string()]);
/// let mut profile = Profile { name: "ada".into(), tags: tags.clone(), visits: 0 };
/// profile.merge(ProfilePatch::default().visits(1));
///
/// assert_eq!(profile.visits, 1);
/// assert!(shallow_equal(&profile, &Profile { name: "ada".into(), tags, visits: 1 }));
/// ```
#[macro_export]
macro_rules! record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident => $patch:ident {
            $( $(#[$fmeta:meta])* $fvis:vis $field:ident : $ty:ty ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $( $(#[$fmeta])* $fvis $field: $ty, )*
        }

        #[doc = concat!("Partial update for [`", stringify!($name), "`].")]
        #[derive(Clone, Default)]
        $vis struct $patch {
            $( pub $field: ::std::option::Option<$ty>, )*
        }

        impl $patch {
            $(
                #[must_use]
                pub fn $field(mut self, value: $ty) -> Self {
                    self.$field = ::std::option::Option::Some(value);
                    self
                }
            )*
        }

        impl $crate::StoreState for $name {
            type Patch = $patch;

            #[allow(unused_variables)]
            fn merge(&mut self, patch: $patch) {
                $(
                    if let ::std::option::Option::Some(value) = patch.$field {
                        self.$field = value;
                    }
                )*
            }
        }

        impl $crate::Record for $name {
            fn keys(&self) -> ::std::vec::Vec<::std::borrow::Cow<'_, str>> {
                ::std::vec![$( ::std::borrow::Cow::Borrowed(stringify!($field)) ),*]
            }

            fn get(&self, key: &str) -> ::std::option::Option<&dyn $crate::Field> {
                match key {
                    $( stringify!($field) => ::std::option::Option::Some(&self.$field as &dyn $crate::Field), )*
                    _ => ::std::option::Option::None,
                }
            }
        }

        impl $crate::ShallowEq for $name {
            fn shallow_eq(&self, other: &Self) -> bool {
                $crate::shallow_equal_records(self, other)
            }
        }
    };
}
