//! Session data types
//!
//! - `User`: the profile returned by the login endpoint
//! - `Role`: the four platform roles, plus whatever else the server sends
//! - `Session`: token + user, the gate for every authenticated view

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Platform role of the logged-in user
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    /// Mayor (executive, read-only)
    EjecutivoAlcalde,
    /// Director (executive, read-only)
    EjecutivoDirector,
    /// Operations administrator (may train models)
    OperativoAdmin,
    /// Operations user
    OperativoUser,
    /// Any role string the client does not know about
    Other(String),
}

impl Role {
    /// Parse a role string as sent by the API
    pub fn parse(s: &str) -> Self {
        match s {
            "ejecutivo_alcalde" => Role::EjecutivoAlcalde,
            "ejecutivo_director" => Role::EjecutivoDirector,
            "operativo_admin" => Role::OperativoAdmin,
            "operativo_user" => Role::OperativoUser,
            other => Role::Other(other.to_string()),
        }
    }

    /// Wire representation
    pub fn as_str(&self) -> &str {
        match self {
            Role::EjecutivoAlcalde => "ejecutivo_alcalde",
            Role::EjecutivoDirector => "ejecutivo_director",
            Role::OperativoAdmin => "operativo_admin",
            Role::OperativoUser => "operativo_user",
            Role::Other(s) => s,
        }
    }

    /// Display label shown next to the user name.
    ///
    /// Unrecognized roles fall back to "Usuario".
    pub fn label(&self) -> &'static str {
        match self {
            Role::EjecutivoAlcalde => "Alcalde",
            Role::EjecutivoDirector => "Director",
            Role::OperativoAdmin => "Administrador",
            Role::OperativoUser | Role::Other(_) => "Usuario",
        }
    }

    /// Whether admin-only sections should be revealed.
    ///
    /// Mirrors the server's own check: any role containing "admin".
    pub fn is_admin(&self) -> bool {
        self.as_str().contains("admin")
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Role::parse(&s))
    }
}

/// User profile as returned by `POST /auth/login`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub full_name: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl User {
    pub fn new(full_name: impl Into<String>, role: Role) -> Self {
        Self {
            full_name: full_name.into(),
            role,
            id: None,
            username: None,
            email: None,
        }
    }
}

/// A live session: opaque bearer token plus the cached user profile
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub user: User,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_labels() {
        assert_eq!(Role::parse("ejecutivo_alcalde").label(), "Alcalde");
        assert_eq!(Role::parse("ejecutivo_director").label(), "Director");
        assert_eq!(Role::parse("operativo_admin").label(), "Administrador");
        assert_eq!(Role::parse("operativo_user").label(), "Usuario");
        assert_eq!(Role::parse("visitante").label(), "Usuario");
    }

    #[test]
    fn test_admin_detection() {
        assert!(Role::OperativoAdmin.is_admin());
        assert!(Role::parse("super_admin").is_admin());
        assert!(!Role::OperativoUser.is_admin());
        assert!(!Role::EjecutivoAlcalde.is_admin());
    }

    #[test]
    fn test_user_roundtrip_keeps_unknown_role() {
        let json = r#"{"id":7,"username":"ana","full_name":"Ana Rojas","role":"auditor","email":"ana@example.org"}"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.role, Role::Other("auditor".to_string()));
        assert_eq!(user.username.as_deref(), Some("ana"));

        let back = serde_json::to_string(&user).unwrap();
        assert!(back.contains(r#""role":"auditor""#));
    }
}
