//! Stepwise schema migration.
//!
//! An entity's history is declared once with [define_migrations]: the shape
//! it had at each version, the columns renamed along the way and optional
//! per-version value transforms ([Milestone]s). The [MigrationEngine] walks a
//! table from the version recorded in the [VersionTable] to the latest
//! version one declared step at a time; [DbMigrator] drives that for every
//! registered [EntityMeta] under the database lock.
//!
//! ```rust,ignore
//! let bundle = define_migrations(3, &v3, |m| {
//!     m.version(1, &v1, |_| {});
//!     m.version(2, &v2, |v| {
//!         v.rename(|r| {
//!             r.field("title").from("caption").to("heading");
//!         });
//!     });
//!     m.version(3, &v3, |v| {
//!         v.rename(|r| {
//!             r.field("title").from("heading").to("title");
//!         })
//!         .milestone(|ms| {
//!             ms.modify("score", |o| {
//!                 o.from_str(|s| s.parse::<i64>().unwrap_or_default());
//!             });
//!         });
//!     });
//! })?;
//! ```

mod bundle;
mod dsl;
mod engine;
mod migrator;
mod overrides;
mod rename;
mod version_table;

pub use bundle::*;
pub use dsl::*;
pub use engine::*;
pub use migrator::*;
pub use overrides::*;
pub use rename::*;
pub use version_table::*;
