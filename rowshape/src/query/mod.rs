//! Parameterized SQL text builders.
//!
//! [WhereBuilder] assembles boolean predicates, [OrderBuilder] assembles
//! `ORDER BY` lists including `CASE` terms, and [select] puts a whole
//! statement together. Every builder renders to text plus positional
//! arguments whose order matches the `?` placeholders exactly.
//!
//! ```rust
//! use rowshape::query::select;
//!
//! let query = select("Users", &["name"], |q| {
//!     q.filter(|w| {
//!         w.eq("city", "Oslo").and_group(|g| {
//!             g.lt("age", 20).or(|w| {
//!                 w.gt("age", 60);
//!             });
//!         });
//!     })
//!     .order_by(|o| {
//!         o.asc("name");
//!     });
//! });
//! assert_eq!(
//!     query.sql,
//!     "SELECT name FROM Users WHERE city=? AND (age<? OR age>?) ORDER BY name"
//! );
//! assert_eq!(query.args, vec!["Oslo", "20", "60"]);
//! ```

mod order;
mod predicate;
mod select;

pub use order::*;
pub use predicate::*;
pub use select::*;
