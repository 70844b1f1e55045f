//! Entity metadata and fixed statement shapes.
//!
//! An `EntityMeta` is built once per entity type. `build()` generates the
//! four statement strings (select, insert, update-by-key, delete-by-key)
//! deterministically from the field declaration order, using the universal
//! `?` placeholder that [`crate::orm::db`] translates at execution time.

use crate::error::{ApiError, DefinitionError};
use crate::orm::db::Db;
use crate::orm::params::SqlArg;
use crate::orm::record::Record;
use serde_json::Value;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ColumnType {
    Boolean,
    BigInt,
    Real,
    Varchar(u32),
    Text,
}

impl ColumnType {
    pub fn ddl(&self) -> String {
        match self {
            ColumnType::Boolean => "boolean".into(),
            ColumnType::BigInt => "bigint".into(),
            ColumnType::Real => "real".into(),
            ColumnType::Varchar(n) => format!("varchar({})", n),
            ColumnType::Text => "text".into(),
        }
    }
}

#[derive(Clone)]
pub enum FieldDefault {
    None,
    Value(Value),
    /// Zero-argument producer, resolved lazily per instance.
    Producer(fn() -> Value),
}

impl std::fmt::Debug for FieldDefault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldDefault::None => write!(f, "None"),
            FieldDefault::Value(v) => write!(f, "Value({})", v),
            FieldDefault::Producer(_) => write!(f, "Producer(..)"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct FieldDef {
    pub name: String,
    pub column_type: ColumnType,
    pub primary_key: bool,
    pub default: FieldDefault,
}

impl FieldDef {
    fn new(name: &str, column_type: ColumnType, default: FieldDefault) -> FieldDef {
        FieldDef {
            name: name.to_string(),
            column_type,
            primary_key: false,
            default,
        }
    }

    pub fn boolean(name: &str) -> FieldDef {
        FieldDef::new(name, ColumnType::Boolean, FieldDefault::Value(Value::Bool(false)))
    }

    pub fn integer(name: &str) -> FieldDef {
        FieldDef::new(name, ColumnType::BigInt, FieldDefault::Value(Value::from(0)))
    }

    pub fn real(name: &str) -> FieldDef {
        FieldDef::new(name, ColumnType::Real, FieldDefault::Value(Value::from(0.0)))
    }

    /// varchar(100) unless overridden with [`FieldDef::ddl`].
    pub fn string(name: &str) -> FieldDef {
        FieldDef::new(name, ColumnType::Varchar(100), FieldDefault::None)
    }

    pub fn text(name: &str) -> FieldDef {
        FieldDef::new(name, ColumnType::Text, FieldDefault::None)
    }

    pub fn primary_key(mut self) -> FieldDef {
        self.primary_key = true;
        self
    }

    pub fn ddl(mut self, column_type: ColumnType) -> FieldDef {
        self.column_type = column_type;
        self
    }

    pub fn default_value(mut self, v: Value) -> FieldDef {
        self.default = FieldDefault::Value(v);
        self
    }

    pub fn default_fn(mut self, f: fn() -> Value) -> FieldDef {
        self.default = FieldDefault::Producer(f);
        self
    }
}

/// Quote identifier for PostgreSQL (safe: names come from declarations).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Row-count window for [`EntityMeta::find_all`].
#[derive(Clone, Copy, Debug)]
pub enum Limit {
    Count(u64),
    OffsetCount(u64, u64),
}

/// Per-entity metadata: declared fields, primary key, and the four
/// precomputed statement strings.
#[derive(Debug)]
pub struct EntityMeta {
    pub entity: String,
    pub table: String,
    /// All fields in declaration order (primary key included).
    pub fields: Vec<FieldDef>,
    pub primary_key: String,
    /// Non-key field names in declaration order.
    pub field_names: Vec<String>,
    pub select_sql: String,
    pub insert_sql: String,
    pub update_sql: String,
    pub delete_sql: String,
}

pub struct EntityBuilder {
    entity: String,
    table: Option<String>,
    fields: Vec<FieldDef>,
}

impl EntityBuilder {
    /// Table name defaults to the entity name unless overridden.
    pub fn table(mut self, table: &str) -> EntityBuilder {
        self.table = Some(table.to_string());
        self
    }

    pub fn field(mut self, field: FieldDef) -> EntityBuilder {
        self.fields.push(field);
        self
    }

    pub fn build(self) -> Result<EntityMeta, DefinitionError> {
        let entity = self.entity;
        let table = self.table.unwrap_or_else(|| entity.clone());
        let mut primary_key: Option<String> = None;
        let mut field_names = Vec::new();
        for f in &self.fields {
            tracing::debug!(entity = %entity, field = %f.name, "found mapping");
            if f.primary_key {
                if primary_key.is_some() {
                    return Err(DefinitionError::DuplicatePrimaryKey {
                        entity,
                        field: f.name.clone(),
                    });
                }
                primary_key = Some(f.name.clone());
            } else {
                field_names.push(f.name.clone());
            }
        }
        let Some(primary_key) = primary_key else {
            return Err(DefinitionError::MissingPrimaryKey { entity });
        };

        let escaped: Vec<String> = field_names.iter().map(|f| quoted(f)).collect();
        let select_sql = format!(
            "select {}, {} from {}",
            quoted(&primary_key),
            escaped.join(", "),
            quoted(&table)
        );
        let insert_sql = format!(
            "insert into {} ({}, {}) values ({})",
            quoted(&table),
            escaped.join(", "),
            quoted(&primary_key),
            placeholders(escaped.len() + 1)
        );
        let update_sql = format!(
            "update {} set {} where {} = ?",
            quoted(&table),
            field_names
                .iter()
                .map(|f| format!("{} = ?", quoted(f)))
                .collect::<Vec<_>>()
                .join(", "),
            quoted(&primary_key)
        );
        let delete_sql = format!(
            "delete from {} where {} = ?",
            quoted(&table),
            quoted(&primary_key)
        );

        tracing::info!(entity = %entity, table = %table, "entity registered");
        Ok(EntityMeta {
            entity,
            table,
            fields: self.fields,
            primary_key,
            field_names,
            select_sql,
            insert_sql,
            update_sql,
            delete_sql,
        })
    }
}

impl EntityMeta {
    pub fn builder(entity: &str) -> EntityBuilder {
        EntityBuilder {
            entity: entity.to_string(),
            table: None,
            fields: Vec::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// One row by primary key, or none.
    pub async fn find(&self, db: &Db, pk: &SqlArg) -> Result<Option<Record>, ApiError> {
        let sql = format!("{} where {} = ?", self.select_sql, quoted(&self.primary_key));
        let mut rows = db.select(&sql, std::slice::from_ref(pk), Some(1)).await?;
        Ok(rows.pop())
    }

    /// Zero or more rows matching an optional where clause, ordering, and
    /// row window.
    pub async fn find_all(
        &self,
        db: &Db,
        where_: Option<&str>,
        args: &[SqlArg],
        order_by: Option<&str>,
        limit: Option<Limit>,
    ) -> Result<Vec<Record>, ApiError> {
        let mut sql = self.select_sql.clone();
        let mut bound: Vec<SqlArg> = args.to_vec();
        if let Some(w) = where_ {
            sql.push_str(" where ");
            sql.push_str(w);
        }
        if let Some(o) = order_by {
            sql.push_str(" order by ");
            sql.push_str(o);
        }
        match limit {
            Some(Limit::Count(n)) => {
                sql.push_str(" limit ?");
                bound.push(SqlArg::I64(n as i64));
            }
            Some(Limit::OffsetCount(offset, n)) => {
                sql.push_str(" limit ? offset ?");
                bound.push(SqlArg::I64(n as i64));
                bound.push(SqlArg::I64(offset as i64));
            }
            None => {}
        }
        db.select(&sql, &bound, None).await
    }

    /// Scalar aggregate, e.g. `find_number(db, "count(id)", None, &[])`.
    pub async fn find_number(
        &self,
        db: &Db,
        select_expr: &str,
        where_: Option<&str>,
        args: &[SqlArg],
    ) -> Result<Option<i64>, ApiError> {
        let mut sql = format!("select {} as _num_ from {}", select_expr, quoted(&self.table));
        if let Some(w) = where_ {
            sql.push_str(" where ");
            sql.push_str(w);
        }
        let rows = db.select(&sql, args, Some(1)).await?;
        Ok(rows.first().and_then(|r| r.i64("_num_")))
    }

    /// Insert using each field's resolved-or-defaulted value. Defaults are
    /// cached onto the record. An affected-row count other than 1 is logged,
    /// not raised.
    pub async fn save(&self, db: &Db, record: &mut Record) -> Result<(), ApiError> {
        let mut args: Vec<SqlArg> = self
            .field_names
            .iter()
            .map(|f| SqlArg::from_json(&record.value_or_default(self, f)))
            .collect();
        args.push(SqlArg::from_json(&record.value_or_default(self, &self.primary_key)));
        let rows = db.execute(&self.insert_sql, &args, true).await?;
        if rows != 1 {
            tracing::warn!(entity = %self.entity, rows, "failed to insert record");
        }
        Ok(())
    }

    /// Update the row at the primary key using current in-memory values
    /// (defaults are not re-applied).
    pub async fn update(&self, db: &Db, record: &Record) -> Result<(), ApiError> {
        let mut args: Vec<SqlArg> = self
            .field_names
            .iter()
            .map(|f| SqlArg::from_json(&record.value(f)))
            .collect();
        args.push(SqlArg::from_json(&record.value(&self.primary_key)));
        let rows = db.execute(&self.update_sql, &args, true).await?;
        if rows != 1 {
            tracing::warn!(entity = %self.entity, rows, "failed to update by primary key");
        }
        Ok(())
    }

    /// Delete the row at the primary key.
    pub async fn remove(&self, db: &Db, record: &Record) -> Result<(), ApiError> {
        let args = [SqlArg::from_json(&record.value(&self.primary_key))];
        let rows = db.execute(&self.delete_sql, &args, true).await?;
        if rows != 1 {
            tracing::warn!(entity = %self.entity, rows, "failed to remove by primary key");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_meta() -> EntityMeta {
        EntityMeta::builder("User")
            .table("users")
            .field(FieldDef::string("id").primary_key().ddl(ColumnType::Varchar(50)))
            .field(FieldDef::string("email").ddl(ColumnType::Varchar(50)))
            .field(FieldDef::boolean("admin"))
            .field(FieldDef::real("created_at"))
            .build()
            .unwrap()
    }

    #[test]
    fn statement_shapes_follow_declaration_order() {
        let m = user_meta();
        assert_eq!(
            m.select_sql,
            r#"select "id", "email", "admin", "created_at" from "users""#
        );
        assert_eq!(
            m.insert_sql,
            r#"insert into "users" ("email", "admin", "created_at", "id") values (?, ?, ?, ?)"#
        );
        assert_eq!(
            m.update_sql,
            r#"update "users" set "email" = ?, "admin" = ?, "created_at" = ? where "id" = ?"#
        );
        assert_eq!(m.delete_sql, r#"delete from "users" where "id" = ?"#);
    }

    #[test]
    fn table_defaults_to_entity_name() {
        let m = EntityMeta::builder("Tag")
            .field(FieldDef::integer("id").primary_key())
            .build()
            .unwrap();
        assert_eq!(m.table, "Tag");
        assert_eq!(m.primary_key, "id");
        assert!(m.field_names.is_empty());
    }

    #[test]
    fn duplicate_primary_key_is_a_definition_error() {
        let err = EntityMeta::builder("Broken")
            .field(FieldDef::string("a").primary_key())
            .field(FieldDef::string("b").primary_key())
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            DefinitionError::DuplicatePrimaryKey { ref field, .. } if field == "b"
        ));
    }

    #[test]
    fn missing_primary_key_is_a_definition_error() {
        let err = EntityMeta::builder("Broken")
            .field(FieldDef::string("a"))
            .build()
            .unwrap_err();
        assert!(matches!(err, DefinitionError::MissingPrimaryKey { .. }));
    }

    #[test]
    fn column_ddl() {
        assert_eq!(ColumnType::Varchar(50).ddl(), "varchar(50)");
        assert_eq!(ColumnType::Boolean.ddl(), "boolean");
        assert_eq!(ColumnType::Text.ddl(), "text");
    }
}
