//! Entity definitions for the blog: users, blogs, comments.

use crate::orm::{ColumnType, EntityMeta, FieldDef};
use serde_json::{json, Value};
use std::sync::LazyLock;

/// 50-character unique id: epoch milliseconds (15 digits, zero padded) +
/// uuid4 hex + trailing zeros.
pub fn next_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    format!("{:015}{}000", millis, uuid::Uuid::new_v4().simple())
}

fn next_id_value() -> Value {
    json!(next_id())
}

/// Creation time stored as epoch seconds (real column).
fn now_value() -> Value {
    json!(chrono::Utc::now().timestamp_millis() as f64 / 1000.0)
}

pub static USER: LazyLock<EntityMeta> = LazyLock::new(|| {
    EntityMeta::builder("User")
        .table("users")
        .field(
            FieldDef::string("id")
                .primary_key()
                .ddl(ColumnType::Varchar(50))
                .default_fn(next_id_value),
        )
        .field(FieldDef::string("email").ddl(ColumnType::Varchar(50)))
        .field(FieldDef::string("passwd").ddl(ColumnType::Varchar(50)))
        .field(FieldDef::boolean("admin"))
        .field(FieldDef::string("name").ddl(ColumnType::Varchar(50)))
        .field(FieldDef::string("image").ddl(ColumnType::Varchar(500)))
        .field(FieldDef::real("created_at").default_fn(now_value))
        .build()
        .expect("users entity definition")
});

pub static BLOG: LazyLock<EntityMeta> = LazyLock::new(|| {
    EntityMeta::builder("Blog")
        .table("blogs")
        .field(
            FieldDef::string("id")
                .primary_key()
                .ddl(ColumnType::Varchar(50))
                .default_fn(next_id_value),
        )
        .field(FieldDef::string("user_id").ddl(ColumnType::Varchar(50)))
        .field(FieldDef::string("user_name").ddl(ColumnType::Varchar(50)))
        .field(FieldDef::string("user_image").ddl(ColumnType::Varchar(500)))
        .field(FieldDef::string("name").ddl(ColumnType::Varchar(50)))
        .field(FieldDef::string("summary").ddl(ColumnType::Varchar(200)))
        .field(FieldDef::text("content"))
        .field(FieldDef::real("created_at").default_fn(now_value))
        .build()
        .expect("blogs entity definition")
});

pub static COMMENT: LazyLock<EntityMeta> = LazyLock::new(|| {
    EntityMeta::builder("Comment")
        .table("comments")
        .field(
            FieldDef::string("id")
                .primary_key()
                .ddl(ColumnType::Varchar(50))
                .default_fn(next_id_value),
        )
        .field(FieldDef::string("blog_id").ddl(ColumnType::Varchar(50)))
        .field(FieldDef::string("user_id").ddl(ColumnType::Varchar(50)))
        .field(FieldDef::string("user_name").ddl(ColumnType::Varchar(50)))
        .field(FieldDef::string("user_image").ddl(ColumnType::Varchar(500)))
        .field(FieldDef::text("content"))
        .field(FieldDef::real("created_at").default_fn(now_value))
        .build()
        .expect("comments entity definition")
});

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orm::Record;

    #[test]
    fn next_id_is_50_chars_and_unique() {
        let a = next_id();
        let b = next_id();
        assert_eq!(a.len(), 50);
        assert_eq!(b.len(), 50);
        assert_ne!(a, b);
        assert!(a.ends_with("000"));
    }

    #[test]
    fn user_statements() {
        assert_eq!(USER.table, "users");
        assert_eq!(USER.primary_key, "id");
        assert_eq!(
            USER.field_names,
            vec!["email", "passwd", "admin", "name", "image", "created_at"]
        );
        assert!(USER.select_sql.starts_with(r#"select "id", "email""#));
    }

    #[test]
    fn blog_defaults_resolve() {
        let mut rec = Record::new();
        let id = rec.value_or_default(&BLOG, "id");
        assert_eq!(id.as_str().map(str::len), Some(50));
        let created = rec.value_or_default(&BLOG, "created_at");
        assert!(created.as_f64().unwrap() > 1_600_000_000.0);
    }
}
