use crate::query::WhereBuilder;
use itertools::Itertools;

/// One ordering term.
#[derive(Debug, Clone)]
pub enum OrderTerm {
    Ascending(String),
    Descending(String),
    Raw(String),
    Group(OrderBuilder),
    Case(CaseExpr),
}

impl OrderTerm {
    fn render_into(&self, out: &mut Vec<String>, args: &mut Vec<String>) {
        match self {
            OrderTerm::Ascending(column) => out.push(column.clone()),
            OrderTerm::Descending(column) => out.push(format!("{} DESC", column)),
            OrderTerm::Raw(fragment) => out.push(fragment.clone()),
            OrderTerm::Group(inner) => {
                let (text, inner_args) = inner.render();
                out.push(format!("({})", text));
                args.extend(inner_args);
            }
            OrderTerm::Case(case) => {
                let (text, case_args) = case.render();
                out.push(text);
                args.extend(case_args);
            }
        }
    }
}

/// A `CASE WHEN <condition> THEN <order> … [ELSE <order>] END` term.
#[derive(Debug, Clone, Default)]
pub struct CaseExpr {
    branches: Vec<(WhereBuilder, OrderBuilder)>,
    otherwise: Option<OrderBuilder>,
}

impl CaseExpr {
    pub fn new() -> Self {
        CaseExpr::default()
    }

    /// Adds a `WHEN <condition> THEN <order>` branch. Branches render in
    /// the order they are added.
    pub fn branch<W, O>(&mut self, condition: W, order: O) -> &mut Self
    where
        W: FnOnce(&mut WhereBuilder),
        O: FnOnce(&mut OrderBuilder),
    {
        self.branches
            .push((WhereBuilder::build(condition), OrderBuilder::build(order)));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    /// Sets the `ELSE` term. Left unset, or set to an empty builder, the
    /// `ELSE` clause is omitted.
    pub fn otherwise<O: FnOnce(&mut OrderBuilder)>(&mut self, order: O) -> &mut Self {
        self.otherwise = Some(OrderBuilder::build(order));
        self
    }

    /// Condition arguments come before the arguments of their branch's
    /// order term; the `ELSE` term's arguments come last.
    pub fn render(&self) -> (String, Vec<String>) {
        let mut text = String::from("CASE");
        let mut args = Vec::new();
        for (condition, order) in &self.branches {
            let (cond_text, cond_args) = condition.render();
            let (order_text, order_args) = order.render();
            text.push_str(&format!(" WHEN {} THEN {}", cond_text, order_text));
            args.extend(cond_args);
            args.extend(order_args);
        }
        if let Some(otherwise) = &self.otherwise {
            if !otherwise.is_empty() {
                let (else_text, else_args) = otherwise.render();
                text.push_str(&format!(" ELSE {}", else_text));
                args.extend(else_args);
            }
        }
        text.push_str(" END");
        (text, args)
    }
}

/// Accumulates an `ORDER BY` list.
///
/// Terms render in call order joined by `", "`; arguments only come from
/// `CASE` conditions.
///
/// # Examples
///
/// ```rust
/// use rowshape::query::OrderBuilder;
///
/// let mut o = OrderBuilder::new();
/// o.asc("position").desc("created").when(|case| {
///     case.branch(|w| { w.eq("pinned", true); }, |o| { o.raw("0"); })
///         .otherwise(|o| { o.raw("1"); });
/// });
///
/// let (sql, args) = o.render();
/// assert_eq!(sql, "position, created DESC, CASE WHEN pinned=? THEN 0 ELSE 1 END");
/// assert_eq!(args, vec!["1"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct OrderBuilder {
    terms: Vec<OrderTerm>,
}

impl OrderBuilder {
    pub fn new() -> Self {
        OrderBuilder::default()
    }

    pub fn build<F: FnOnce(&mut OrderBuilder)>(block: F) -> Self {
        let mut builder = OrderBuilder::new();
        block(&mut builder);
        builder
    }

    pub fn asc<C: AsRef<str>>(&mut self, column: C) -> &mut Self {
        self.terms
            .push(OrderTerm::Ascending(column.as_ref().to_string()));
        self
    }

    pub fn desc<C: AsRef<str>>(&mut self, column: C) -> &mut Self {
        self.terms
            .push(OrderTerm::Descending(column.as_ref().to_string()));
        self
    }

    /// Descending when `flip` is true, ascending otherwise.
    pub fn flip_if<C: AsRef<str>>(&mut self, column: C, flip: bool) -> &mut Self {
        if flip {
            self.desc(column)
        } else {
            self.asc(column)
        }
    }

    pub fn raw(&mut self, fragment: &str) -> &mut Self {
        self.terms.push(OrderTerm::Raw(fragment.to_string()));
        self
    }

    /// Inlines the terms of a sub-builder.
    pub fn and<F: FnOnce(&mut OrderBuilder)>(&mut self, block: F) -> &mut Self {
        let inner = OrderBuilder::build(block);
        self.terms.extend(inner.terms);
        self
    }

    /// Appends the sub-builder's terms in brackets, or nothing if it is empty.
    pub fn group<F: FnOnce(&mut OrderBuilder)>(&mut self, block: F) -> &mut Self {
        let inner = OrderBuilder::build(block);
        if !inner.is_empty() {
            self.terms.push(OrderTerm::Group(inner));
        }
        self
    }

    /// Appends a `CASE` term built by `block`, or nothing if it declares
    /// no branch.
    pub fn when<F: FnOnce(&mut CaseExpr)>(&mut self, block: F) -> &mut Self {
        let mut case = CaseExpr::new();
        block(&mut case);
        if !case.is_empty() {
            self.terms.push(OrderTerm::Case(case));
        }
        self
    }

    pub fn terms(&self) -> &[OrderTerm] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn render(&self) -> (String, Vec<String>) {
        let mut parts = Vec::with_capacity(self.terms.len());
        let mut args = Vec::new();
        for term in &self.terms {
            term.render_into(&mut parts, &mut args);
        }
        (parts.iter().join(", "), args)
    }
}
