use crate::Literal;

/// The [`IntoLiteral`] trait is a minimal trait describing a Rust value that can stand on the
/// right-hand side of a [`crate::Predicate`].
pub trait IntoLiteral: sealed::Sealed {
  fn into_literal(self) -> Literal;
}

impl IntoLiteral for i64 {
  fn into_literal(self) -> Literal {
    Literal::Int(self)
  }
}

impl IntoLiteral for i32 {
  fn into_literal(self) -> Literal {
    Literal::Int(self as i64)
  }
}

impl IntoLiteral for f64 {
  fn into_literal(self) -> Literal {
    Literal::Float(self)
  }
}

impl IntoLiteral for bool {
  fn into_literal(self) -> Literal {
    Literal::Bool(self)
  }
}

impl IntoLiteral for &str {
  fn into_literal(self) -> Literal {
    Literal::Str(self.to_string())
  }
}

impl IntoLiteral for String {
  fn into_literal(self) -> Literal {
    Literal::Str(self)
  }
}

impl IntoLiteral for Literal {
  fn into_literal(self) -> Literal {
    self
  }
}

mod sealed {
  use crate::Literal;

  pub trait Sealed {}

  impl Sealed for i64 {}
  impl Sealed for i32 {}
  impl Sealed for f64 {}
  impl Sealed for bool {}
  impl Sealed for &str {}
  impl Sealed for String {}
  impl Sealed for Literal {}
}
