use crate::common::Value;
use crate::query::select::{select_with, QueryOpts};
use itertools::Itertools;
use std::fmt::{Display, Formatter};

/// Comparison operator of a single clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    NotEq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    NotLike,
}

impl Op {
    /// Operator text as it appears between a column and its placeholder.
    pub fn sql(&self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::NotEq => "!=",
            Op::Gt => ">",
            Op::Gte => ">=",
            Op::Lt => "<",
            Op::Lte => "<=",
            Op::Like => " LIKE ",
            Op::NotLike => " NOT LIKE ",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Clause(String),
    And,
    Or,
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Clause(text) => write!(f, "{}", text),
            Token::And => write!(f, "AND"),
            Token::Or => write!(f, "OR"),
        }
    }
}

/// Joins a table and column name as `table.column`.
#[inline]
pub fn dot(table: &str, column: &str) -> String {
    format!("{}.{}", table, column)
}

/// Accumulates a parameterized boolean expression.
///
/// Clauses and `AND` / `OR` tokens are kept in call order next to a parallel
/// argument list, so the n-th `?` of the rendered text always corresponds to
/// the n-th argument. Nested builders are rendered independently and spliced
/// in at the point of the call; grouping only adds brackets and never
/// reorders arguments.
///
/// # Examples
///
/// ```rust
/// use rowshape::query::WhereBuilder;
///
/// let mut w = WhereBuilder::new();
/// w.eq("name", "Ann").and_group(|g| {
///     g.gt("age", 30).or(|o| {
///         o.eq("admin", true);
///     });
/// });
///
/// let (sql, args) = w.render();
/// assert_eq!(sql, "name=? AND (age>? OR admin=?)");
/// assert_eq!(args, vec!["Ann", "30", "1"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct WhereBuilder {
    tokens: Vec<Token>,
    args: Vec<String>,
}

impl WhereBuilder {
    pub fn new() -> Self {
        WhereBuilder::default()
    }

    /// Builds a new predicate by running `block` on an empty builder.
    pub fn build<F: FnOnce(&mut WhereBuilder)>(block: F) -> Self {
        let mut builder = WhereBuilder::new();
        block(&mut builder);
        builder
    }

    /// Appends `<column><op>?` with one argument.
    pub fn compare<C, V>(&mut self, column: C, op: Op, value: V) -> &mut Self
    where
        C: AsRef<str>,
        V: Into<Value>,
    {
        self.tokens
            .push(Token::Clause(format!("{}{}?", column.as_ref(), op.sql())));
        self.args.push(value.into().to_arg_string());
        self
    }

    pub fn eq<C: AsRef<str>, V: Into<Value>>(&mut self, column: C, value: V) -> &mut Self {
        self.compare(column, Op::Eq, value)
    }

    pub fn not_eq<C: AsRef<str>, V: Into<Value>>(&mut self, column: C, value: V) -> &mut Self {
        self.compare(column, Op::NotEq, value)
    }

    pub fn gt<C: AsRef<str>, V: Into<Value>>(&mut self, column: C, value: V) -> &mut Self {
        self.compare(column, Op::Gt, value)
    }

    pub fn gte<C: AsRef<str>, V: Into<Value>>(&mut self, column: C, value: V) -> &mut Self {
        self.compare(column, Op::Gte, value)
    }

    pub fn lt<C: AsRef<str>, V: Into<Value>>(&mut self, column: C, value: V) -> &mut Self {
        self.compare(column, Op::Lt, value)
    }

    pub fn lte<C: AsRef<str>, V: Into<Value>>(&mut self, column: C, value: V) -> &mut Self {
        self.compare(column, Op::Lte, value)
    }

    pub fn like<C: AsRef<str>, V: Into<Value>>(&mut self, column: C, pattern: V) -> &mut Self {
        self.compare(column, Op::Like, pattern)
    }

    pub fn not_like<C: AsRef<str>, V: Into<Value>>(&mut self, column: C, pattern: V) -> &mut Self {
        self.compare(column, Op::NotLike, pattern)
    }

    /// Compares two columns, e.g. `Posts.user_id=Users.id`. Adds no argument.
    pub fn compare_columns<C: AsRef<str>, D: AsRef<str>>(
        &mut self,
        column: C,
        op: Op,
        other: D,
    ) -> &mut Self {
        self.tokens.push(Token::Clause(format!(
            "{}{}{}",
            column.as_ref(),
            op.sql(),
            other.as_ref()
        )));
        self
    }

    pub fn is_null<C: AsRef<str>>(&mut self, column: C) -> &mut Self {
        self.tokens
            .push(Token::Clause(format!("{} IS NULL", column.as_ref())));
        self
    }

    pub fn is_not_null<C: AsRef<str>>(&mut self, column: C) -> &mut Self {
        self.tokens
            .push(Token::Clause(format!("{} IS NOT NULL", column.as_ref())));
        self
    }

    /// `<column> IN (?, ?, …)` with one argument per value, in input order.
    pub fn equal_any<C, I, V>(&mut self, column: C, values: I) -> &mut Self
    where
        C: AsRef<str>,
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.in_list(column.as_ref(), "IN", values)
    }

    /// `<column> NOT IN (?, ?, …)`.
    pub fn not_equal_any<C, I, V>(&mut self, column: C, values: I) -> &mut Self
    where
        C: AsRef<str>,
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.in_list(column.as_ref(), "NOT IN", values)
    }

    /// `(<column> LIKE ? OR <column> LIKE ? …)`: matches any of the patterns.
    pub fn like_any<C, I, V>(&mut self, column: C, patterns: I) -> &mut Self
    where
        C: AsRef<str>,
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.pattern_list(column.as_ref(), Op::Like, " OR ", patterns)
    }

    /// `(<column> NOT LIKE ? AND <column> NOT LIKE ? …)`: matches none of the patterns.
    pub fn not_like_any<C, I, V>(&mut self, column: C, patterns: I) -> &mut Self
    where
        C: AsRef<str>,
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.pattern_list(column.as_ref(), Op::NotLike, " AND ", patterns)
    }

    fn in_list<I, V>(&mut self, column: &str, keyword: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let args: Vec<String> = values
            .into_iter()
            .map(|v| v.into().to_arg_string())
            .collect();
        let placeholders = std::iter::repeat("?").take(args.len()).join(", ");
        self.tokens.push(Token::Clause(format!(
            "{} {} ({})",
            column, keyword, placeholders
        )));
        self.args.extend(args);
        self
    }

    fn pattern_list<I, V>(&mut self, column: &str, op: Op, joiner: &str, patterns: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let args: Vec<String> = patterns
            .into_iter()
            .map(|v| v.into().to_arg_string())
            .collect();
        if args.is_empty() {
            return self;
        }
        let body = args
            .iter()
            .map(|_| format!("{}{}?", column, op.sql()))
            .join(joiner);
        self.tokens.push(Token::Clause(format!("({})", body)));
        self.args.extend(args);
        self
    }

    /// Appends a raw fragment. Placeholders in it are not tracked.
    pub fn raw(&mut self, fragment: &str) -> &mut Self {
        self.tokens.push(Token::Clause(fragment.to_string()));
        self
    }

    /// Appends a raw fragment together with the arguments of its placeholders.
    pub fn raw_with_args<I, V>(&mut self, fragment: &str, args: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.tokens.push(Token::Clause(fragment.to_string()));
        self.args
            .extend(args.into_iter().map(|v| v.into().to_arg_string()));
        self
    }

    /// Appends `AND` followed by the sub-builder's clauses, without brackets.
    pub fn and<F: FnOnce(&mut WhereBuilder)>(&mut self, block: F) -> &mut Self {
        let inner = WhereBuilder::build(block);
        self.splice(Some(Token::And), inner)
    }

    /// Appends `OR` followed by the sub-builder's clauses, without brackets.
    pub fn or<F: FnOnce(&mut WhereBuilder)>(&mut self, block: F) -> &mut Self {
        let inner = WhereBuilder::build(block);
        self.splice(Some(Token::Or), inner)
    }

    /// Appends the sub-builder's expression wrapped in brackets.
    pub fn group<F: FnOnce(&mut WhereBuilder)>(&mut self, block: F) -> &mut Self {
        let inner = WhereBuilder::build(block);
        self.push_group(None, inner)
    }

    /// Appends `AND (…)`.
    pub fn and_group<F: FnOnce(&mut WhereBuilder)>(&mut self, block: F) -> &mut Self {
        let inner = WhereBuilder::build(block);
        self.push_group(Some(Token::And), inner)
    }

    /// Appends `OR (…)`.
    pub fn or_group<F: FnOnce(&mut WhereBuilder)>(&mut self, block: F) -> &mut Self {
        let inner = WhereBuilder::build(block);
        self.push_group(Some(Token::Or), inner)
    }

    /// Renders `SELECT … FROM table …` in brackets, to be used as the left
    /// or right side of a later clause. Its arguments are appended now.
    ///
    /// ```rust
    /// use rowshape::query::{dot, WhereBuilder};
    ///
    /// let mut w = WhereBuilder::new();
    /// let posts = w.subquery("Posts", &["COUNT(*)"], |q| {
    ///     q.filter(|f| {
    ///         f.eq(dot("Posts", "user_id"), 7);
    ///     });
    /// });
    /// w.gt(posts, 2);
    /// assert_eq!(
    ///     w.render(),
    ///     ("(SELECT COUNT(*) FROM Posts WHERE Posts.user_id=?)>?".to_string(), vec!["7".to_string(), "2".to_string()])
    /// );
    /// ```
    pub fn subquery<F: FnOnce(&mut QueryOpts)>(
        &mut self,
        table: &str,
        columns: &[&str],
        opts: F,
    ) -> String {
        let mut query_opts = QueryOpts::new();
        opts(&mut query_opts);
        let query = select_with(table, columns, &query_opts);
        self.args.extend(query.args);
        format!("({})", query.sql)
    }

    fn splice(&mut self, combinator: Option<Token>, inner: WhereBuilder) -> &mut Self {
        if inner.tokens.is_empty() {
            self.args.extend(inner.args);
            return self;
        }
        if let Some(token) = combinator {
            if !self.tokens.is_empty() {
                self.tokens.push(token);
            }
        }
        self.tokens.extend(inner.tokens);
        self.args.extend(inner.args);
        self
    }

    fn push_group(&mut self, combinator: Option<Token>, inner: WhereBuilder) -> &mut Self {
        if inner.tokens.is_empty() {
            self.args.extend(inner.args);
            return self;
        }
        let (fragment, args) = inner.render();
        if let Some(token) = combinator {
            if !self.tokens.is_empty() {
                self.tokens.push(token);
            }
        }
        self.tokens.push(Token::Clause(format!("({})", fragment)));
        self.args.extend(args);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Rendered tokens in order; combinators appear as `AND` / `OR`.
    pub fn clauses(&self) -> Vec<String> {
        self.tokens.iter().map(|t| t.to_string()).collect()
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Returns the fragment, tokens joined by single spaces, and its arguments.
    pub fn render(&self) -> (String, Vec<String>) {
        (self.tokens.iter().join(" "), self.args.clone())
    }
}
