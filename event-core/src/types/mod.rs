use std::any::type_name;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

use crate::error::TypeResolutionError;

pub use event_type::EventType;

mod parse;
pub mod event_type;
pub mod matcher;

/// Stands for an unbounded `?` argument when building an interest type:
/// `TypeToken::of::<PayloadEvent<Wildcard>>()` is `PayloadEvent<?>`.
pub enum Wildcard {}

/// The generic-stripped base of a type, e.g. `my_crate::PayloadEvent`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ErasedType(&'static str);

impl ErasedType {
    pub fn of<T>() -> Result<Self, TypeResolutionError> where T: ?Sized + 'static {
        TypeToken::of::<T>().map(|token| token.erased())
    }

    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl Debug for ErasedType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ErasedType").field(&self.0).finish()
    }
}

impl Display for ErasedType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Eq, PartialEq, Hash)]
pub enum TypeArg {
    Wildcard,
    Type(TypeToken),
}

impl Display for TypeArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeArg::Wildcard => write!(f, "?"),
            TypeArg::Type(token) => write!(f, "{}", token),
        }
    }
}

impl Debug for TypeArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

/// Canonical descriptor of a possibly parameterized type: the erased base
/// plus its ordered type arguments. Two tokens are equal iff they describe
/// the same parameterization.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct TypeToken {
    erased: ErasedType,
    args: Arc<[TypeArg]>,
}

impl TypeToken {
    pub fn of<T>() -> Result<Self, TypeResolutionError> where T: ?Sized + 'static {
        parse::resolve(type_name::<T>())
    }

    /// A token without arguments. As an interest it accepts every
    /// parameterization of `erased`.
    pub fn raw(erased: ErasedType) -> Self {
        Self {
            erased,
            args: Arc::from(Vec::new()),
        }
    }

    pub fn parameterized<I>(erased: ErasedType, args: I) -> Self where I: IntoIterator<Item=TypeArg> {
        Self {
            erased,
            args: args.into_iter().collect(),
        }
    }

    pub fn erased(&self) -> ErasedType {
        self.erased
    }

    pub fn args(&self) -> &[TypeArg] {
        &self.args
    }

    pub fn is_raw(&self) -> bool {
        self.args.is_empty()
    }

    pub fn has_wildcard(&self) -> bool {
        self.args.iter().any(|arg| match arg {
            TypeArg::Wildcard => true,
            TypeArg::Type(token) => token.has_wildcard(),
        })
    }
}

impl Display for TypeToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.erased)?;
        if !self.args.is_empty() {
            write!(f, "<")?;
            for (index, arg) in self.args.iter().enumerate() {
                if index > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", arg)?;
            }
            write!(f, ">")?;
        }
        Ok(())
    }
}

impl Debug for TypeToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("TypeToken").field(&format_args!("{}", self)).finish()
    }
}
