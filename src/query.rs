//! Composable predicate construction for Store list operations.
//!
//! A [`Filter`] is an ordered list of AND-composed clauses over named
//! columns. Optional parameters append a clause only when supplied
//! (`eq_opt`), so "absent" means "don't constrain" rather than "must be
//! null"; "must be null" is the explicit [`Filter::is_null`] clause.
//!
//! The in-memory store evaluates filters directly through the [`Record`]
//! trait; a SQL-backed store would translate each clause into a WHERE
//! fragment instead.

/// A single typed column value, as exposed by rows and matched by clauses.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(i32),
    Text(String),
    Null,
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// One condition over a named column.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Eq {
        column: &'static str,
        value: FieldValue,
    },
    IsNull {
        column: &'static str,
    },
}

impl Clause {
    fn matches<R: Record + ?Sized>(&self, row: &R) -> bool {
        match self {
            Clause::Eq { column, value } => row.field(column) == *value,
            Clause::IsNull { column } => row.field(column).is_null(),
        }
    }
}

/// An AND-composed, ordered list of clauses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<Clause>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Constrain `column` to equal `value`.
    pub fn eq(mut self, column: &'static str, value: impl Into<FieldValue>) -> Self {
        self.clauses.push(Clause::Eq {
            column,
            value: value.into(),
        });
        self
    }

    /// Constrain `column` only when a value was supplied.
    pub fn eq_opt(self, column: &'static str, value: Option<impl Into<FieldValue>>) -> Self {
        match value {
            Some(value) => self.eq(column, value),
            None => self,
        }
    }

    /// Constrain `column` to hold no value.
    pub fn is_null(mut self, column: &'static str) -> Self {
        self.clauses.push(Clause::IsNull { column });
        self
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Evaluate the filter against one row. An empty filter matches
    /// everything.
    pub fn matches<R: Record + ?Sized>(&self, row: &R) -> bool {
        self.clauses.iter().all(|clause| clause.matches(row))
    }
}

/// Rows evaluable against a [`Filter`] expose their named columns here.
///
/// Unknown columns resolve to [`FieldValue::Null`], matching only explicit
/// null constraints.
pub trait Record {
    fn field(&self, column: &str) -> FieldValue;
}
