//! Positional argument storage using Arc for clone-friendly builders.

use std::fmt;
use std::sync::Arc;
use tokio_postgres::types::ToSql;

/// A clone-friendly query argument.
///
/// Cloning a builder never copies argument values.
#[derive(Clone)]
pub struct Param(pub(crate) Arc<dyn ToSql + Send + Sync>);

impl Param {
    /// Wrap any ToSql value.
    pub fn new<T: ToSql + Send + Sync + 'static>(value: T) -> Self {
        Param(Arc::new(value))
    }

    /// The inner value as a ToSql trait object.
    pub fn as_ref(&self) -> &(dyn ToSql + Sync) {
        &*self.0 as &(dyn ToSql + Sync)
    }
}

impl fmt::Debug for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

/// An ordered list of arguments, in placeholder order.
#[derive(Clone, Debug, Default)]
pub struct ParamList {
    params: Vec<Param>,
}

impl ParamList {
    /// Create a new empty list.
    pub fn new() -> Self {
        Self { params: Vec::new() }
    }

    /// Add a value and return its 1-based index.
    pub fn push<T: ToSql + Send + Sync + 'static>(&mut self, value: T) -> usize {
        self.params.push(Param::new(value));
        self.params.len()
    }

    /// Add a pre-wrapped Param and return its 1-based index.
    pub fn push_param(&mut self, param: Param) -> usize {
        self.params.push(param);
        self.params.len()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Param> {
        self.params.iter()
    }

    /// All arguments as references for tokio-postgres.
    pub fn as_refs(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params.iter().map(|p| p.as_ref()).collect()
    }
}

impl From<Vec<Param>> for ParamList {
    fn from(params: Vec<Param>) -> Self {
        Self { params }
    }
}

impl IntoIterator for ParamList {
    type Item = Param;
    type IntoIter = std::vec::IntoIter<Param>;

    fn into_iter(self) -> Self::IntoIter {
        self.params.into_iter()
    }
}

impl<'a> IntoIterator for &'a ParamList {
    type Item = &'a Param;
    type IntoIter = std::slice::Iter<'a, Param>;

    fn into_iter(self) -> Self::IntoIter {
        self.params.iter()
    }
}

/// Conversion into an ordered list of statement arguments.
///
/// Implemented for `()`, tuples of up to eight values, `Vec<T>`, arrays,
/// and [`ParamList`] (see [`params!`](crate::params) for mixed types).
pub trait IntoParams {
    fn into_params(self) -> Vec<Param>;
}

impl IntoParams for () {
    fn into_params(self) -> Vec<Param> {
        Vec::new()
    }
}

impl IntoParams for ParamList {
    fn into_params(self) -> Vec<Param> {
        self.params
    }
}

impl<T: ToSql + Send + Sync + 'static> IntoParams for Vec<T> {
    fn into_params(self) -> Vec<Param> {
        self.into_iter().map(Param::new).collect()
    }
}

impl<T: ToSql + Send + Sync + 'static, const N: usize> IntoParams for [T; N] {
    fn into_params(self) -> Vec<Param> {
        self.into_iter().map(Param::new).collect()
    }
}

macro_rules! impl_into_params_tuple {
    ($($name:ident),+) => {
        impl<$($name: ToSql + Send + Sync + 'static),+> IntoParams for ($($name,)+) {
            #[allow(non_snake_case)]
            fn into_params(self) -> Vec<Param> {
                let ($($name,)+) = self;
                vec![$(Param::new($name)),+]
            }
        }
    };
}

impl_into_params_tuple!(A);
impl_into_params_tuple!(A, B);
impl_into_params_tuple!(A, B, C);
impl_into_params_tuple!(A, B, C, D);
impl_into_params_tuple!(A, B, C, D, E);
impl_into_params_tuple!(A, B, C, D, E, F);
impl_into_params_tuple!(A, B, C, D, E, F, G);
impl_into_params_tuple!(A, B, C, D, E, F, G, H);

/// Build a [`ParamList`] from values of mixed types.
///
/// ```ignore
/// let args = dbx::params![5_i64, "active", true];
/// ```
#[macro_export]
macro_rules! params {
    () => {
        $crate::ParamList::new()
    };
    ($($value:expr),+ $(,)?) => {
        $crate::ParamList::from(vec![$($crate::Param::new($value)),+])
    };
}
