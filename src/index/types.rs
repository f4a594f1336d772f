//! Attribute model and supported column types / 属性模型与支持的列类型
//!
//! Keys and values are restricted to the scalar kinds SQLite can bind and
//! read back directly: integers, floats, text and nullable scalars.

use serde::{Deserialize, Serialize};
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteRow};
use sqlx::Row;
use std::fmt::Debug;

/// Query type the column kinds bind into / 绑定目标查询类型
pub type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

mod sealed {
    pub trait Sealed {}
}

/// Column kind usable as an attribute key or value / 可作为键或值的列类型
///
/// The set of implementors is closed; it covers:
/// - integers (`i8`..`i64`, `isize`, `u8`..`u64`, `usize`)
/// - floats (`f32`, `f64`)
/// - text (`String`, `Vec<u8>`, `Vec<char>`)
/// - nullable scalars (`Option<bool>`, `Option<i16>`, `Option<i32>`, `Option<i64>`,
///   `Option<f64>`, `Option<String>`)
pub trait SqlType: sealed::Sealed + Clone + Debug + Send + Sync + 'static {
    /// Bind this value as the next query parameter / 绑定为下一个查询参数
    fn bind<'q>(&self, query: SqliteQuery<'q>) -> SqliteQuery<'q>;

    /// Decode a value of this kind from the column at `index` / 从列中解码
    fn decode(row: &SqliteRow, index: usize) -> Result<Self, sqlx::Error>;

    /// Human readable form, used in errors, log fields and span attributes
    fn render(&self) -> String;
}

fn decode_error<E>(err: E) -> sqlx::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    sqlx::Error::Decode(Box::new(err))
}

// Narrow integers are range-checked on the way out.
macro_rules! checked_integer {
    ($($t:ty),* $(,)?) => {
        $(
            impl sealed::Sealed for $t {}

            impl SqlType for $t {
                fn bind<'q>(&self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
                    query.bind(*self as i64)
                }

                fn decode(row: &SqliteRow, index: usize) -> Result<Self, sqlx::Error> {
                    let value: i64 = row.try_get(index)?;
                    <$t>::try_from(value).map_err(decode_error)
                }

                fn render(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

// 64-bit wide integers are stored bit-for-bit as INTEGER.
macro_rules! wide_integer {
    ($($t:ty),* $(,)?) => {
        $(
            impl sealed::Sealed for $t {}

            impl SqlType for $t {
                fn bind<'q>(&self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
                    query.bind(*self as i64)
                }

                fn decode(row: &SqliteRow, index: usize) -> Result<Self, sqlx::Error> {
                    let value: i64 = row.try_get(index)?;
                    Ok(value as $t)
                }

                fn render(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

checked_integer!(i8, i16, i32, isize, u8, u16, u32);
wide_integer!(i64, u64, usize);

impl sealed::Sealed for f32 {}

impl SqlType for f32 {
    fn bind<'q>(&self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query.bind(f64::from(*self))
    }

    fn decode(row: &SqliteRow, index: usize) -> Result<Self, sqlx::Error> {
        let value: f64 = row.try_get(index)?;
        Ok(value as f32)
    }

    fn render(&self) -> String {
        self.to_string()
    }
}

impl sealed::Sealed for f64 {}

impl SqlType for f64 {
    fn bind<'q>(&self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query.bind(*self)
    }

    fn decode(row: &SqliteRow, index: usize) -> Result<Self, sqlx::Error> {
        row.try_get(index)
    }

    fn render(&self) -> String {
        self.to_string()
    }
}

impl sealed::Sealed for String {}

impl SqlType for String {
    fn bind<'q>(&self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query.bind(self.clone())
    }

    fn decode(row: &SqliteRow, index: usize) -> Result<Self, sqlx::Error> {
        row.try_get(index)
    }

    fn render(&self) -> String {
        self.clone()
    }
}

impl sealed::Sealed for Vec<u8> {}

impl SqlType for Vec<u8> {
    fn bind<'q>(&self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query.bind(self.clone())
    }

    fn decode(row: &SqliteRow, index: usize) -> Result<Self, sqlx::Error> {
        row.try_get(index)
    }

    fn render(&self) -> String {
        String::from_utf8_lossy(self).into_owned()
    }
}

impl sealed::Sealed for Vec<char> {}

impl SqlType for Vec<char> {
    fn bind<'q>(&self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query.bind(self.iter().collect::<String>())
    }

    fn decode(row: &SqliteRow, index: usize) -> Result<Self, sqlx::Error> {
        let value: String = row.try_get(index)?;
        Ok(value.chars().collect())
    }

    fn render(&self) -> String {
        self.iter().collect()
    }
}

// Nullable scalars; NULL renders as "NULL".
macro_rules! nullable {
    ($($t:ty => $wire:ty),* $(,)?) => {
        $(
            impl sealed::Sealed for Option<$t> {}

            impl SqlType for Option<$t> {
                fn bind<'q>(&self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
                    query.bind(self.clone().map(<$wire>::from))
                }

                fn decode(row: &SqliteRow, index: usize) -> Result<Self, sqlx::Error> {
                    let value: Option<$wire> = row.try_get(index)?;
                    value
                        .map(<$t>::try_from)
                        .transpose()
                        .map_err(decode_error)
                }

                fn render(&self) -> String {
                    match self {
                        Some(v) => v.to_string(),
                        None => "NULL".to_string(),
                    }
                }
            }
        )*
    };
}

nullable!(
    bool => bool,
    i16 => i64,
    i32 => i64,
    i64 => i64,
    f64 => f64,
    String => String,
);

/// Indexed key-value entry / 索引条目
///
/// `key` identifies the entry for deletes; `value` is the searchable payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute<K: SqlType, V: SqlType> {
    pub key: K,
    pub value: V,
}

impl<K: SqlType, V: SqlType> Attribute<K, V> {
    pub fn new(key: K, value: V) -> Self {
        Self { key, value }
    }

    pub(crate) fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            key: K::decode(row, 0)?,
            value: V::decode(row, 1)?,
        })
    }
}

impl<K: SqlType, V: SqlType> From<(K, V)> for Attribute<K, V> {
    fn from((key, value): (K, V)) -> Self {
        Self::new(key, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render() {
        assert_eq!(42u8.render(), "42");
        assert_eq!("gold".to_string().render(), "gold");
        assert_eq!(b"gold".to_vec().render(), "gold");
        assert_eq!(vec!['g', 'o', 'l', 'd'].render(), "gold");
        assert_eq!(Some(7i64).render(), "7");
        assert_eq!(None::<String>.render(), "NULL");
    }

    #[test]
    fn test_attribute_from_tuple() {
        let attr: Attribute<i64, String> = (2, "struck gold".to_string()).into();
        assert_eq!(attr, Attribute::new(2, "struck gold".to_string()));
    }
}
