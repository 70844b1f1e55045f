//! Micro-ORM: declarative entity metadata with statement generation at
//! definition time, executed through a pooled PostgreSQL connection.

pub mod db;
pub mod entity;
pub mod params;
pub mod record;

pub use db::{expand_placeholders, Db};
pub use entity::{ColumnType, EntityMeta, FieldDef, Limit};
pub use params::SqlArg;
pub use record::Record;
