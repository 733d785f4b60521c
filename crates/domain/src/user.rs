//! # ユーザー
//!
//! ユーザーエンティティとそれに関連する値オブジェクトを定義する。
//!
//! ## ドメイン用語
//!
//! | 型 | ドメイン用語 | 説明 |
//! |---|------------|------|
//! | [`User`] | ユーザー | 休暇を申請し、ロールに応じて承認・管理を行う |
//! | [`UserRole`] | ロール | 承認チェーン上の役割、または管理者 |
//! | [`UserStatus`] | ユーザー状態 | 無効化されたユーザーはログインできない |
//!
//! ## 使用例
//!
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use leaveflow_domain::{
//!     user::{Email, NewUser, User, UserId, UserRole},
//!     value_objects::{AnnualEntitlement, DepartmentName, UserName},
//! };
//!
//! let user = User::new(NewUser {
//!     id:                 UserId::new(),
//!     email:              Email::new("user@example.com")?,
//!     name:               UserName::new("山田太郎")?,
//!     department:         DepartmentName::new("Engineering")?,
//!     role:               UserRole::Employee,
//!     annual_entitlement: AnnualEntitlement::default(),
//!     now:                chrono::Utc::now(),
//! });
//!
//! assert!(user.is_active());
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoStaticStr};

use crate::{
    DomainError,
    value_objects::{AnnualEntitlement, DepartmentName, UserName},
};

define_uuid_id! {
    /// ユーザー ID（UUID v7）
    pub struct UserId;
}

/// ログイン ID を兼ねるメールアドレス
///
/// `local@domain` の形で 255 バイト以内。大文字小文字はそのまま保持する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    const MAX_LEN: usize = 255;

    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into().trim().to_string();
        let well_formed = matches!(
            value.split_once('@'),
            Some((local, domain)) if !local.is_empty() && !domain.is_empty()
        );

        let message = if value.is_empty() {
            "メールアドレスを入力してください"
        } else if value.len() > Self::MAX_LEN {
            "メールアドレスは 255 文字以内で入力してください"
        } else if !well_formed {
            "メールアドレスの形式が正しくありません"
        } else {
            return Ok(Self(value));
        };
        Err(DomainError::Validation(message.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// ユーザーロール
///
/// 各ユーザーはちょうど 1 つのロールを持つ。
/// `Director` / `DepartmentalHead` / `HrDirector` は承認チェーン上の段階に対応し、
/// `Admin` はユーザー・監査ログ・ロスターを管理する。
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    IntoStaticStr,
    EnumIter,
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UserRole {
    /// 一般社員（申請のみ）
    Employee,
    /// 部長（承認チェーン 1 段目）
    Director,
    /// 部門長（承認チェーン 2 段目）
    DepartmentalHead,
    /// 人事部長（承認チェーン最終段）
    HrDirector,
    /// システム管理者
    Admin,
}

impl_from_str_by_name!(UserRole, "ロール");

/// ユーザーステータス
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    IntoStaticStr,
    EnumIter,
    strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UserStatus {
    /// アクティブ（ログイン可能）
    Active,
    /// 非アクティブ（退職・休職などでアクセス停止）
    Inactive,
}

impl_from_str_by_name!(UserStatus, "ユーザー状態");

/// ユーザーエンティティ
///
/// パスワードハッシュはエンティティに含めず、リポジトリの認証情報 API で扱う。
///
/// # 不変条件
///
/// - `email` はシステム内で一意
/// - `status` が `Inactive` の場合、ログイン不可・承認不可
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    id: UserId,
    email: Email,
    name: UserName,
    department: DepartmentName,
    role: UserRole,
    status: UserStatus,
    annual_entitlement: AnnualEntitlement,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// ユーザーの新規作成パラメータ
pub struct NewUser {
    pub id:                 UserId,
    pub email:              Email,
    pub name:               UserName,
    pub department:         DepartmentName,
    pub role:               UserRole,
    pub annual_entitlement: AnnualEntitlement,
    pub now:                DateTime<Utc>,
}

/// ユーザーの DB 復元パラメータ
pub struct UserRecord {
    pub id:                 UserId,
    pub email:              Email,
    pub name:               UserName,
    pub department:         DepartmentName,
    pub role:               UserRole,
    pub status:             UserStatus,
    pub annual_entitlement: AnnualEntitlement,
    pub created_at:         DateTime<Utc>,
    pub updated_at:         DateTime<Utc>,
}

/// プロフィール更新内容（指定された項目のみ変更する）
#[derive(Debug, Default)]
pub struct UserProfileChanges {
    pub name:               Option<UserName>,
    pub department:         Option<DepartmentName>,
    pub role:               Option<UserRole>,
    pub annual_entitlement: Option<AnnualEntitlement>,
}

impl User {
    /// 新しいユーザーを作成する
    ///
    /// 作成時のステータスは `Active`。
    pub fn new(params: NewUser) -> Self {
        Self {
            id: params.id,
            email: params.email,
            name: params.name,
            department: params.department,
            role: params.role,
            status: UserStatus::Active,
            annual_entitlement: params.annual_entitlement,
            created_at: params.now,
            updated_at: params.now,
        }
    }

    /// 既存のデータからユーザーを復元する
    pub fn from_db(record: UserRecord) -> Self {
        Self {
            id: record.id,
            email: record.email,
            name: record.name,
            department: record.department,
            role: record.role,
            status: record.status,
            annual_entitlement: record.annual_entitlement,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }

    // Getter メソッド

    pub fn id(&self) -> &UserId {
        &self.id
    }

    pub fn email(&self) -> &Email {
        &self.email
    }

    pub fn name(&self) -> &UserName {
        &self.name
    }

    pub fn department(&self) -> &DepartmentName {
        &self.department
    }

    pub fn role(&self) -> UserRole {
        self.role
    }

    pub fn status(&self) -> UserStatus {
        self.status
    }

    pub fn annual_entitlement(&self) -> AnnualEntitlement {
        self.annual_entitlement
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    // ビジネスロジックメソッド

    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }

    pub fn can_login(&self) -> bool {
        self.is_active()
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// プロフィールを変更した新しいインスタンスを返す
    ///
    /// 未指定の項目は現在の値を維持する。
    pub fn with_profile(self, changes: UserProfileChanges, now: DateTime<Utc>) -> Self {
        Self {
            name: changes.name.unwrap_or(self.name),
            department: changes.department.unwrap_or(self.department),
            role: changes.role.unwrap_or(self.role),
            annual_entitlement: changes
                .annual_entitlement
                .unwrap_or(self.annual_entitlement),
            updated_at: now,
            ..self
        }
    }

    /// ユーザーステータスを変更した新しいインスタンスを返す
    pub fn with_status(self, status: UserStatus, now: DateTime<Utc>) -> Self {
        Self {
            status,
            updated_at: now,
            ..self
        }
    }
}
