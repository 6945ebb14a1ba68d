/// Stores a strum-backed enum as its snake_case text in a MySQL
/// VARCHAR/ENUM column.
macro_rules! sql_text_enum {
    ($ty:ty) => {
        impl sqlx::Type<sqlx::MySql> for $ty {
            fn type_info() -> sqlx::mysql::MySqlTypeInfo {
                <str as sqlx::Type<sqlx::MySql>>::type_info()
            }

            fn compatible(ty: &sqlx::mysql::MySqlTypeInfo) -> bool {
                <str as sqlx::Type<sqlx::MySql>>::compatible(ty)
            }
        }

        impl<'q> sqlx::Encode<'q, sqlx::MySql> for $ty {
            fn encode_by_ref(&self, buf: &mut Vec<u8>) -> sqlx::encode::IsNull {
                let s = self.to_string();
                <String as sqlx::Encode<'q, sqlx::MySql>>::encode_by_ref(&s, buf)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::MySql> for $ty {
            fn decode(
                value: sqlx::mysql::MySqlValueRef<'r>,
            ) -> std::result::Result<Self, sqlx::error::BoxDynError> {
                let s = <&str as sqlx::Decode<sqlx::MySql>>::decode(value)?;
                s.parse::<$ty>().map_err(|e| e.into())
            }
        }
    };
}

pub(crate) use sql_text_enum;

pub mod calendar;
pub mod employee;
pub mod leave;
pub mod project;
pub mod role;
pub mod task;
pub mod user;
