//! Convert field values to types that sqlx can bind.

use serde_json::Value;
use sqlx::encode::{Encode, IsNull};
use sqlx::postgres::{PgTypeInfo, Postgres};
use sqlx::Database;

/// A value bound to a PostgreSQL query parameter. Arguments are always
/// passed out-of-band, never interpolated into statement text.
#[derive(Clone, Debug, PartialEq)]
pub enum SqlArg {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    Text(String),
}

impl SqlArg {
    pub fn from_json(v: &Value) -> SqlArg {
        match v {
            Value::Null => SqlArg::Null,
            Value::Bool(b) => SqlArg::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    SqlArg::I64(i)
                } else {
                    SqlArg::F64(n.as_f64().unwrap_or(0.0))
                }
            }
            Value::String(s) => SqlArg::Text(s.clone()),
            // Entity columns are scalars; nested values stringify.
            other => SqlArg::Text(other.to_string()),
        }
    }

    pub fn text(s: impl Into<String>) -> SqlArg {
        SqlArg::Text(s.into())
    }
}

impl From<i64> for SqlArg {
    fn from(n: i64) -> Self {
        SqlArg::I64(n)
    }
}

impl From<&str> for SqlArg {
    fn from(s: &str) -> Self {
        SqlArg::Text(s.to_string())
    }
}

impl<'q> Encode<'q, Postgres> for SqlArg {
    fn encode_by_ref(
        &self,
        buf: &mut <Postgres as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        Ok(match self {
            SqlArg::Null => <Option<String> as Encode<Postgres>>::encode_by_ref(&None, buf)?,
            SqlArg::Bool(b) => <bool as Encode<Postgres>>::encode_by_ref(b, buf)?,
            SqlArg::I64(n) => <i64 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            SqlArg::F64(n) => <f64 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            SqlArg::Text(s) => {
                let s_ref: &str = s.as_str();
                <&str as Encode<Postgres>>::encode_by_ref(&s_ref, buf)?
            }
        })
    }

    // Per-value type info so untyped $n placeholders bind correctly without
    // SQL casts.
    fn produces(&self) -> Option<PgTypeInfo> {
        Some(match self {
            SqlArg::Null | SqlArg::Text(_) => PgTypeInfo::with_name("TEXT"),
            SqlArg::Bool(_) => PgTypeInfo::with_name("BOOL"),
            SqlArg::I64(_) => PgTypeInfo::with_name("INT8"),
            SqlArg::F64(_) => PgTypeInfo::with_name("FLOAT8"),
        })
    }
}

impl sqlx::Type<Postgres> for SqlArg {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("TEXT")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_scalars_map_to_args() {
        assert_eq!(SqlArg::from_json(&json!(null)), SqlArg::Null);
        assert_eq!(SqlArg::from_json(&json!(true)), SqlArg::Bool(true));
        assert_eq!(SqlArg::from_json(&json!(42)), SqlArg::I64(42));
        assert_eq!(SqlArg::from_json(&json!(1.5)), SqlArg::F64(1.5));
        assert_eq!(SqlArg::from_json(&json!("hi")), SqlArg::Text("hi".into()));
    }
}
