use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    #[default]
    Student,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Student => "student",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "admin" => UserRole::Admin,
            _ => UserRole::Student,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }
}

/// Display unit for weights. Storage is always kilograms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    Kg,
    Lb,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Kg => "kg",
            Unit::Lb => "lb",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kg" => Some(Unit::Kg),
            "lb" | "lbs" => Some(Unit::Lb),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Record for User {
    const COLLECTION: &'static str = "users";

    fn key(&self) -> String {
        self.email.clone()
    }

    fn index_values(&self) -> Vec<(&'static str, String)> {
        vec![("role", self.role.as_str().to_string())]
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub role: UserRole,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub user_key: String,
    pub unit: Unit,
    pub updated_at: DateTime<Utc>,
}

impl Settings {
    pub fn key_for(email: &str) -> String {
        format!("settings:{}", email)
    }
}

impl Record for Settings {
    const COLLECTION: &'static str = "settings";

    fn key(&self) -> String {
        self.user_key.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_role_as_str() {
        assert_eq!(UserRole::Admin.as_str(), "admin");
        assert_eq!(UserRole::Student.as_str(), "student");
    }

    #[test]
    fn test_user_role_parse() {
        assert_eq!(UserRole::parse("admin"), UserRole::Admin);
        assert_eq!(UserRole::parse("student"), UserRole::Student);
        assert_eq!(UserRole::parse("unknown"), UserRole::Student);
        assert_eq!(UserRole::parse(""), UserRole::Student);
    }

    #[test]
    fn test_user_role_default() {
        let default_role: UserRole = Default::default();
        assert_eq!(default_role, UserRole::Student);
        assert!(!default_role.is_admin());
    }

    #[test]
    fn test_unit_parse() {
        assert_eq!(Unit::parse("KG"), Some(Unit::Kg));
        assert_eq!(Unit::parse(" lb "), Some(Unit::Lb));
        assert_eq!(Unit::parse("stone"), None);
    }
}
