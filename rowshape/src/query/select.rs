use crate::query::{OrderBuilder, WhereBuilder};
use itertools::Itertools;

/// Conventional primary-key column name.
pub const ID_COLUMN: &str = "id";

/// Accumulates `JOIN` clauses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinBuilder {
    joins: Vec<String>,
}

impl JoinBuilder {
    pub fn new() -> Self {
        JoinBuilder::default()
    }

    pub fn inner(&mut self, table: &str, on: &str) -> &mut Self {
        self.joins.push(format!("INNER JOIN {} ON {}", table, on));
        self
    }

    pub fn left(&mut self, table: &str, on: &str) -> &mut Self {
        self.joins.push(format!("LEFT JOIN {} ON {}", table, on));
        self
    }

    pub fn cross(&mut self, table: &str) -> &mut Self {
        self.joins.push(format!("CROSS JOIN {}", table));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.joins.is_empty()
    }

    pub fn render(&self) -> String {
        self.joins.join(" ")
    }
}

/// Optional parts of a `SELECT` statement.
///
/// # Examples
///
/// ```rust
/// use rowshape::query::{select, ID_COLUMN};
///
/// let query = select("Users", &["name"], |q| {
///     q.filter(|w| {
///         w.gt("age", 18);
///     })
///     .order_by(|o| {
///         o.desc(ID_COLUMN);
///     })
///     .limit(10);
/// });
/// assert_eq!(query.sql, "SELECT name FROM Users WHERE age>? ORDER BY id DESC LIMIT 10");
/// assert_eq!(query.args, vec!["18"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct QueryOpts {
    joins: JoinBuilder,
    filter: WhereBuilder,
    group_by: Option<String>,
    having: WhereBuilder,
    order_by: OrderBuilder,
    limit: Option<u64>,
    offset: Option<u64>,
    custom_end: Option<String>,
}

impl QueryOpts {
    pub fn new() -> Self {
        QueryOpts::default()
    }

    pub fn joins<F: FnOnce(&mut JoinBuilder)>(&mut self, block: F) -> &mut Self {
        block(&mut self.joins);
        self
    }

    /// Adds to the `WHERE` predicate.
    pub fn filter<F: FnOnce(&mut WhereBuilder)>(&mut self, block: F) -> &mut Self {
        block(&mut self.filter);
        self
    }

    pub fn group_by(&mut self, by: &str) -> &mut Self {
        if !by.trim().is_empty() {
            self.group_by = Some(by.to_string());
        }
        self
    }

    pub fn having<F: FnOnce(&mut WhereBuilder)>(&mut self, block: F) -> &mut Self {
        block(&mut self.having);
        self
    }

    pub fn order_by<F: FnOnce(&mut OrderBuilder)>(&mut self, block: F) -> &mut Self {
        block(&mut self.order_by);
        self
    }

    pub fn order_by_columns<C: AsRef<str>>(&mut self, columns: &[C]) -> &mut Self {
        for column in columns {
            self.order_by.asc(column);
        }
        self
    }

    pub fn order_by_id(&mut self) -> &mut Self {
        self.order_by.asc(ID_COLUMN);
        self
    }

    pub fn order_randomly(&mut self) -> &mut Self {
        self.order_by.raw("RANDOM()");
        self
    }

    pub fn limit(&mut self, limit: u64) -> &mut Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(&mut self, offset: u64) -> &mut Self {
        self.offset = Some(offset);
        self
    }

    /// Text appended verbatim after everything else.
    pub fn custom_end(&mut self, end: &str) -> &mut Self {
        if !end.trim().is_empty() {
            self.custom_end = Some(end.to_string());
        }
        self
    }
}

/// A rendered statement with its positional arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryWithArgs {
    pub sql: String,
    pub args: Vec<String>,
}

/// Renders a `SELECT` over `table` built by `opts`. An empty column list
/// selects `*`.
pub fn select<F: FnOnce(&mut QueryOpts)>(table: &str, columns: &[&str], opts: F) -> QueryWithArgs {
    let mut query_opts = QueryOpts::new();
    opts(&mut query_opts);
    select_with(table, columns, &query_opts)
}

/// Renders `SELECT cols FROM table [joins] [WHERE] [GROUP BY] [HAVING]
/// [ORDER BY] [LIMIT] [OFFSET] [custom end]`. Arguments follow the textual
/// order: `WHERE`, then `HAVING`, then `ORDER BY`.
pub fn select_with(table: &str, columns: &[&str], opts: &QueryOpts) -> QueryWithArgs {
    let mut sql = String::from("SELECT ");
    if columns.is_empty() {
        sql.push('*');
    } else {
        sql.push_str(&columns.iter().join(", "));
    }
    sql.push_str(" FROM ");
    sql.push_str(table);

    let mut args = Vec::new();

    if !opts.joins.is_empty() {
        sql.push(' ');
        sql.push_str(&opts.joins.render());
    }
    if !opts.filter.is_empty() {
        let (text, filter_args) = opts.filter.render();
        sql.push_str(" WHERE ");
        sql.push_str(&text);
        args.extend(filter_args);
    }
    if let Some(group_by) = &opts.group_by {
        sql.push_str(" GROUP BY ");
        sql.push_str(group_by);
    }
    if !opts.having.is_empty() {
        let (text, having_args) = opts.having.render();
        sql.push_str(" HAVING ");
        sql.push_str(&text);
        args.extend(having_args);
    }
    if !opts.order_by.is_empty() {
        let (text, order_args) = opts.order_by.render();
        sql.push_str(" ORDER BY ");
        sql.push_str(&text);
        args.extend(order_args);
    }
    if let Some(limit) = opts.limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }
    if let Some(offset) = opts.offset {
        sql.push_str(&format!(" OFFSET {}", offset));
    }
    if let Some(end) = &opts.custom_end {
        sql.push(' ');
        sql.push_str(end);
    }

    QueryWithArgs { sql, args }
}
