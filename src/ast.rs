//! Parsed statement AST.

use std::fmt;

use crate::value::ValueSource;

/// One parsed statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(Select),
    Insert(Insert),
    Update(Update),
    Delete(Delete),
    CreateTable(CreateTable),
    CreateIndex(CreateIndex),
    AlterTable(AlterTable),
    /// Store-specific block or transaction control that is accepted and skipped.
    Inert(InertKind),
    /// Anything else; the original text is kept for logging.
    Unsupported(String),
}

impl Statement {
    /// Target collection, `None` for inert and unsupported statements.
    pub fn collection(&self) -> Option<&str> {
        match self {
            Statement::Select(s) => Some(&s.collection),
            Statement::Insert(s) => Some(&s.collection),
            Statement::Update(s) => Some(&s.collection),
            Statement::Delete(s) => Some(&s.collection),
            Statement::CreateTable(s) => Some(&s.collection),
            Statement::CreateIndex(s) => Some(&s.collection),
            Statement::AlterTable(s) => Some(&s.collection),
            Statement::Inert(_) | Statement::Unsupported(_) => None,
        }
    }

    pub fn kind(&self) -> StatementKind {
        match self {
            Statement::Select(_) => StatementKind::Select,
            Statement::Insert(_) => StatementKind::Insert,
            Statement::Update(_) => StatementKind::Update,
            Statement::Delete(_) => StatementKind::Delete,
            Statement::CreateTable(_) => StatementKind::CreateTable,
            Statement::CreateIndex(_) => StatementKind::CreateIndex,
            Statement::AlterTable(_) => StatementKind::AlterTable,
            Statement::Inert(kind) => StatementKind::Inert(*kind),
            Statement::Unsupported(_) => StatementKind::Unsupported,
        }
    }
}

/// What the leading keyword(s) of a statement announce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    CreateTable,
    CreateIndex,
    AlterTable,
    Inert(InertKind),
    Unsupported,
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatementKind::Select => write!(f, "SELECT"),
            StatementKind::Insert => write!(f, "INSERT"),
            StatementKind::Update => write!(f, "UPDATE"),
            StatementKind::Delete => write!(f, "DELETE"),
            StatementKind::CreateTable => write!(f, "CREATE TABLE"),
            StatementKind::CreateIndex => write!(f, "CREATE INDEX"),
            StatementKind::AlterTable => write!(f, "ALTER TABLE"),
            StatementKind::Inert(kind) => write!(f, "{}", kind),
            StatementKind::Unsupported => write!(f, "UNSUPPORTED"),
        }
    }
}

/// Statements a document store has nothing to do for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InertKind {
    /// `DO $$ ... $$` anonymous code block
    Block,
    /// `BEGIN`, `START TRANSACTION`
    Begin,
    /// `COMMIT`, `END`
    Commit,
    /// `ROLLBACK`
    Rollback,
}

impl fmt::Display for InertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InertKind::Block => write!(f, "DO"),
            InertKind::Begin => write!(f, "BEGIN"),
            InertKind::Commit => write!(f, "COMMIT"),
            InertKind::Rollback => write!(f, "ROLLBACK"),
        }
    }
}

/// Selected fields. An empty list means `*`.
pub type Projection = Vec<String>;

#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub collection: String,
    pub projection: Projection,
    pub predicates: Vec<Predicate>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    pub collection: String,
    pub fields: Vec<(String, ValueSource)>,
    /// `RETURNING` clause; `Some(vec![])` is `RETURNING *`.
    pub returning: Option<Projection>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub collection: String,
    pub assignments: Vec<(String, ValueSource)>,
    pub predicates: Vec<Predicate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    pub collection: String,
    pub predicates: Vec<Predicate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateTable {
    pub collection: String,
    /// Informational: execution is idempotent either way.
    pub if_not_exists: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateIndex {
    pub index_name: String,
    pub collection: String,
    pub fields: Vec<String>,
    pub unique: bool,
    /// Informational: an existing index name is always tolerated.
    pub if_not_exists: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlterTable {
    pub collection: String,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub order: SortOrder,
}

/// Comparison operator of an atomic predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lte,
    Gte,
    Lt,
    Gt,
    IsNull,
    IsNotNull,
    Like,
}

impl CompareOp {
    /// Operators that test the field alone and take no value.
    pub fn is_unary(self) -> bool {
        matches!(self, CompareOp::IsNull | CompareOp::IsNotNull)
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Lte => "<=",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Gt => ">",
            CompareOp::IsNull => "IS NULL",
            CompareOp::IsNotNull => "IS NOT NULL",
            CompareOp::Like => "LIKE",
        };
        write!(f, "{}", s)
    }
}

/// One atomic condition of an AND-only WHERE clause.
///
/// Built through [`Predicate::compare`] and [`Predicate::unary`], which keep
/// `value` present exactly when the operator needs one.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    field: String,
    op: CompareOp,
    value: Option<ValueSource>,
}

impl Predicate {
    /// A binary comparison. Panics in debug builds if `op` is unary.
    pub fn compare(field: impl Into<String>, op: CompareOp, value: ValueSource) -> Self {
        debug_assert!(!op.is_unary(), "{op} takes no value");
        Self {
            field: field.into(),
            op,
            value: Some(value),
        }
    }

    /// `IS NULL` when `negated` is false, `IS NOT NULL` otherwise.
    pub fn unary(field: impl Into<String>, negated: bool) -> Self {
        Self {
            field: field.into(),
            op: if negated {
                CompareOp::IsNotNull
            } else {
                CompareOp::IsNull
            },
            value: None,
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn op(&self) -> CompareOp {
        self.op
    }

    pub fn value(&self) -> Option<&ValueSource> {
        self.value.as_ref()
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(v) => write!(f, "{} {} {}", self.field, self.op, v),
            None => write!(f, "{} {}", self.field, self.op),
        }
    }
}
