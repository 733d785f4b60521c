//! ドメイン型のボイラープレートを生成するマクロ

/// UUID v7 を内包する ID 型を定義する
///
/// 生成されるもの: `new()`（UUID v7 を採番）、`from_uuid()`、`as_uuid()`、
/// `Default`、および UUID 文字列そのままの `Display`。
///
/// ```rust
/// use leaveflow_domain::leave::LeaveRequestId;
///
/// let id = LeaveRequestId::new();
/// assert_eq!(LeaveRequestId::from_uuid(*id.as_uuid()), id);
/// ```
macro_rules! define_uuid_id {
    ($(#[$meta:meta])* $vis:vis struct $Name:ident;) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash,
            serde::Serialize, serde::Deserialize,
            derive_more::Display, derive_more::From,
        )]
        #[display("{_0}")]
        #[serde(transparent)]
        $vis struct $Name(uuid::Uuid);

        impl $Name {
            pub fn new() -> Self {
                uuid::Uuid::now_v7().into()
            }

            pub fn from_uuid(uuid: uuid::Uuid) -> Self {
                uuid.into()
            }

            pub fn as_uuid(&self) -> &uuid::Uuid {
                &self.0
            }
        }

        impl Default for $Name {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

/// 前後の空白を除いた 1 文字以上 `max` 文字以下の文字列型を定義する
///
/// 末尾に `redact` を付けると個人情報として扱い、`Debug` を伏せ字にして
/// `Display` を実装しない。
///
/// ```rust
/// use leaveflow_domain::value_objects::{DepartmentName, UserName};
///
/// let dept = DepartmentName::new("  Engineering ").unwrap();
/// assert_eq!(dept.to_string(), "Engineering");
///
/// let name = UserName::new("山田太郎").unwrap();
/// assert_eq!(format!("{name:?}"), r#"UserName("***")"#);
/// ```
macro_rules! define_validated_string {
    (@base $(#[$meta:meta])* $vis:vis $Name:ident, $label:literal, $max:literal) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        $vis struct $Name(String);

        impl $Name {
            pub fn new(value: impl Into<String>) -> Result<Self, $crate::DomainError> {
                let value = value.into();
                let trimmed = value.trim();
                match trimmed.chars().count() {
                    0 => Err($crate::DomainError::Validation(
                        concat!($label, "を入力してください").to_string(),
                    )),
                    n if n > $max => Err($crate::DomainError::Validation(format!(
                        "{}は {} 文字以内で入力してください（{} 文字）",
                        $label, $max, n
                    ))),
                    _ => Ok(Self(trimmed.to_string())),
                }
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }
    };
    ($(#[$meta:meta])* $vis:vis struct $Name:ident($label:literal, max = $max:literal, redact);) => {
        define_validated_string!(@base $(#[$meta])* $vis $Name, $label, $max);

        impl std::fmt::Debug for $Name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_tuple(stringify!($Name)).field(&"***").finish()
            }
        }
    };
    ($(#[$meta:meta])* $vis:vis struct $Name:ident($label:literal, max = $max:literal);) => {
        define_validated_string!(@base $(#[$meta])* #[derive(Debug)] $vis $Name, $label, $max);

        impl std::fmt::Display for $Name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

/// `IntoStaticStr` の文字列表現から逆引きする `FromStr` を実装する
///
/// 対象の enum は `strum::IntoStaticStr` と `strum::EnumIter` を derive していること。
/// 未知の文字列は `DomainError::Validation` になる。
macro_rules! impl_from_str_by_name {
    ($Name:ty, $label:literal) => {
        impl std::str::FromStr for $Name {
            type Err = $crate::DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                <$Name as strum::IntoEnumIterator>::iter()
                    .find(|v| <&'static str>::from(*v) == s)
                    .ok_or_else(|| $crate::DomainError::Validation(format!("不明な{}: {s}", $label)))
            }
        }
    };
}
