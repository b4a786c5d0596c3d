use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use crate::auth::dto::{LoginRequest, RegisterRequest};

const EMAIL_LEN: (usize, usize) = (5, 100);
const USERNAME_LEN: (usize, usize) = (2, 200);
const PASSWORD_LEN: (usize, usize) = (8, 128);

/// Registration input after validation and normalization.
pub struct ValidRegistration {
    pub email: String,
    pub username: String,
    pub password: String,
    pub is_admin: bool,
}

/// Login input after validation and normalization.
pub struct ValidLogin {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for ValidRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidRegistration")
            .field("email", &self.email)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("is_admin", &self.is_admin)
            .finish()
    }
}

impl std::fmt::Debug for ValidLogin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidLogin")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Validates a registration payload, stopping at the first violated rule.
///
/// Fields are checked in the order email, username, password, isAdmin.
pub fn validate_register(req: RegisterRequest) -> Result<ValidRegistration, String> {
    let email = required("email", req.email)?.trim().to_lowercase();
    check_not_empty("email", &email)?;
    check_length("email", &email, EMAIL_LEN)?;
    if !is_valid_email(&email) {
        return Err(r#""email" must be a valid email"#.into());
    }

    let username = required("username", req.username)?.trim().to_string();
    check_not_empty("username", &username)?;
    check_length("username", &username, USERNAME_LEN)?;

    let password = required("password", req.password)?;
    check_password_strength(&password)?;

    let is_admin = match req.is_admin {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => b,
        Some(_) => return Err(r#""isAdmin" must be a boolean"#.into()),
    };

    Ok(ValidRegistration {
        email,
        username,
        password,
        is_admin,
    })
}

/// Validates a login payload: only presence of email and password is checked.
pub fn validate_login(req: LoginRequest) -> Result<ValidLogin, String> {
    let email = required("email", req.email)?.trim().to_lowercase();
    check_not_empty("email", &email)?;
    let password = required("password", req.password)?;
    check_not_empty("password", &password)?;
    Ok(ValidLogin { email, password })
}

/// Password policy shared by the validator and credential enrollment.
pub fn check_password_strength(password: &str) -> Result<(), String> {
    check_not_empty("password", password)?;
    check_length("password", password, PASSWORD_LEN)?;
    let has_letter = password.chars().any(char::is_alphabetic);
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !(has_letter && has_digit) {
        return Err(r#""password" must contain at least one letter and one digit"#.into());
    }
    Ok(())
}

fn required(field: &str, value: Option<String>) -> Result<String, String> {
    value.ok_or_else(|| format!(r#""{field}" is required"#))
}

fn check_not_empty(field: &str, value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err(format!(r#""{field}" is not allowed to be empty"#));
    }
    Ok(())
}

fn check_length(field: &str, value: &str, (min, max): (usize, usize)) -> Result<(), String> {
    let len = value.chars().count();
    if len < min {
        return Err(format!(
            r#""{field}" length must be at least {min} characters long"#
        ));
    }
    if len > max {
        return Err(format!(
            r#""{field}" length must be less than or equal to {max} characters long"#
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn register(body: Value) -> Result<ValidRegistration, String> {
        validate_register(serde_json::from_value(body).unwrap())
    }

    fn login(body: Value) -> Result<ValidLogin, String> {
        validate_login(serde_json::from_value(body).unwrap())
    }

    #[test]
    fn accepts_and_normalizes_registration() {
        let ok = register(json!({
            "email": "  User@Example.COM ",
            "username": " alice ",
            "password": "Str0ngPass!",
        }))
        .unwrap();
        assert_eq!(ok.email, "user@example.com");
        assert_eq!(ok.username, "alice");
        assert_eq!(ok.password, "Str0ngPass!");
        assert!(!ok.is_admin);
    }

    #[test]
    fn reports_first_violation_only() {
        // both email and password are bad; email is checked first
        let err = register(json!({
            "email": "nope",
            "username": "alice",
            "password": "x",
        }))
        .unwrap_err();
        assert_eq!(err, r#""email" length must be at least 5 characters long"#);
    }

    #[test]
    fn missing_fields_are_named() {
        let err = register(json!({ "email": "a@b.co", "password": "Str0ngPass!" })).unwrap_err();
        assert_eq!(err, r#""username" is required"#);

        let err = login(json!({ "email": "a@b.co" })).unwrap_err();
        assert_eq!(err, r#""password" is required"#);
    }

    #[test]
    fn rejects_malformed_email() {
        let err = register(json!({
            "email": "not-an-email",
            "username": "alice",
            "password": "Str0ngPass!",
        }))
        .unwrap_err();
        assert_eq!(err, r#""email" must be a valid email"#);
    }

    #[test]
    fn rejects_bad_username_lengths() {
        let err = register(json!({
            "email": "a@b.co",
            "username": " a ",
            "password": "Str0ngPass!",
        }))
        .unwrap_err();
        assert!(err.contains("at least 2"), "{err}");

        let err = register(json!({
            "email": "a@b.co",
            "username": "x".repeat(201),
            "password": "Str0ngPass!",
        }))
        .unwrap_err();
        assert!(err.contains("less than or equal to 200"), "{err}");
    }

    #[test]
    fn password_policy() {
        assert!(check_password_strength("Str0ngPass!").is_ok());
        assert!(check_password_strength("short1").unwrap_err().contains("at least 8"));
        assert!(check_password_strength("lettersonly")
            .unwrap_err()
            .contains("one letter and one digit"));
        assert!(check_password_strength("1234567890")
            .unwrap_err()
            .contains("one letter and one digit"));
        assert!(check_password_strength(&"a1".repeat(65)).is_err());
    }

    #[test]
    fn is_admin_must_be_boolean() {
        let ok = register(json!({
            "email": "a@b.co",
            "username": "root",
            "password": "Str0ngPass!",
            "isAdmin": true,
        }))
        .unwrap();
        assert!(ok.is_admin);

        let err = register(json!({
            "email": "a@b.co",
            "username": "root",
            "password": "Str0ngPass!",
            "isAdmin": "yes",
        }))
        .unwrap_err();
        assert_eq!(err, r#""isAdmin" must be a boolean"#);
    }

    #[test]
    fn login_checks_presence_only() {
        let ok = login(json!({ "email": " Bob@Example.com", "password": "wrongpass" })).unwrap();
        assert_eq!(ok.email, "bob@example.com");
        assert_eq!(ok.password, "wrongpass");

        let err = login(json!({ "email": "   ", "password": "x" })).unwrap_err();
        assert_eq!(err, r#""email" is not allowed to be empty"#);
    }

    #[test]
    fn debug_output_hides_password() {
        let reg = register(json!({
            "email": "a@b.co",
            "username": "alice",
            "password": "Str0ngPass!",
        }))
        .unwrap();
        let printed = format!("{reg:?}");
        assert!(!printed.contains("Str0ngPass!"));
        assert!(printed.contains("a@b.co"));

        let creds = login(json!({ "email": "a@b.co", "password": "Str0ngPass!" })).unwrap();
        assert!(!format!("{creds:?}").contains("Str0ngPass!"));
    }
}
