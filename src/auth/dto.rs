use serde::{Deserialize, Serialize};

use crate::validation::{self, Field, FieldErrors, Rule, Value};

const USERNAME_RULES: &[Rule] = &[
    Rule::Required,
    Rule::MinChars(3),
    Rule::MaxChars(30),
    Rule::OnlyLetters,
];

const PASSWORD_RULES: &[Rule] = &[
    Rule::Required,
    Rule::MinChars(8),
    Rule::MaxChars(15),
    Rule::ContainsAny("!@#?$&%"),
    Rule::ContainsAny("1234567890"),
];

/// Request body for register and login.
#[derive(Debug, Deserialize)]
pub struct UserDto {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl UserDto {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let errors = validation::check(&[
            Field {
                name: "username",
                value: Value::Text(&self.username),
                rules: USERNAME_RULES,
            },
            Field {
                name: "password",
                value: Value::Text(&self.password),
                rules: PASSWORD_RULES,
            },
        ]);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Body echoed back after registration; the password is never returned.
#[derive(Debug, Serialize)]
pub struct RegisteredUser {
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}
