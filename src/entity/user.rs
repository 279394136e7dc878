//! User entity
//!
//! Table: county_user

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Account status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserStatus {
    Inactive = 0,
    Active = 1,
    Disabled = 2,
}

impl From<i32> for UserStatus {
    fn from(value: i32) -> Self {
        match value {
            0 => UserStatus::Inactive,
            1 => UserStatus::Active,
            2 => UserStatus::Disabled,
            _ => UserStatus::Inactive,
        }
    }
}

impl From<UserStatus> for i32 {
    fn from(status: UserStatus) -> Self {
        status as i32
    }
}

/// Portal role. Stored as its lowercase name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Applicant,
    Admin,
    Board,
    Accountant,
    AieHolder,
    Officer,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Applicant,
        Role::Admin,
        Role::Board,
        Role::Accountant,
        Role::AieHolder,
        Role::Officer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Applicant => "applicant",
            Role::Admin => "admin",
            Role::Board => "board",
            Role::Accountant => "accountant",
            Role::AieHolder => "aie_holder",
            Role::Officer => "officer",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Role::ALL.into_iter().find(|r| r.as_str() == value)
    }

    /// Landing dashboard route for the role
    pub fn dashboard(&self) -> &'static str {
        match self {
            Role::Applicant => "/dashboard",
            Role::Admin => "/admin",
            Role::Board => "/board",
            Role::Accountant => "/accountant",
            Role::AieHolder => "/aie-holder",
            Role::Officer => "/dial",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "county_user")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Login email (unique)
    #[sea_orm(column_type = "String(Some(128))", unique)]
    pub email: String,

    /// bcrypt hash
    #[sea_orm(column_type = "String(Some(128))")]
    #[serde(skip_serializing)]
    pub password: String,

    #[sea_orm(column_type = "String(Some(128))")]
    pub full_name: String,

    #[sea_orm(column_type = "String(Some(20))", nullable)]
    pub phone: Option<String>,

    #[sea_orm(column_type = "String(Some(20))", nullable)]
    pub national_id: Option<String>,

    /// Role name, see [`Role`]
    #[sea_orm(column_type = "String(Some(16))")]
    pub role: String,

    /// 0=inactive, 1=active, 2=disabled
    pub status: i32,

    /// Last login (Unix timestamp)
    pub last_login: i64,

    pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn role(&self) -> Option<Role> {
        Role::parse(&self.role)
    }

    pub fn is_disabled(&self) -> bool {
        UserStatus::from(self.status) == UserStatus::Disabled
    }
}

/// User without the password hash
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    #[serde(rename = "fullName")]
    pub full_name: String,
    pub phone: Option<String>,
    #[serde(rename = "nationalId")]
    pub national_id: Option<String>,
    pub role: String,
    pub status: i32,
    #[serde(rename = "lastLogin")]
    pub last_login: i64,
}

impl From<Model> for UserResponse {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            full_name: model.full_name,
            phone: model.phone,
            national_id: model.national_id,
            role: model.role,
            status: model.status,
            last_login: model.last_login,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_names_round_trip() {
        for role in Role::ALL {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("superuser"), None);
    }

    #[test]
    fn role_serializes_as_snake_case() {
        assert_eq!(
            serde_json::to_string(&Role::AieHolder).unwrap(),
            "\"aie_holder\""
        );
    }

    #[test]
    fn unknown_status_is_inactive() {
        assert_eq!(UserStatus::from(9), UserStatus::Inactive);
    }
}
