use std::env;
use std::fmt;

/// Shortest value still accepted as a real token.
pub const MIN_TOKEN_LENGTH: usize = 10;

/// Variables reported by the credential diagnostic.
pub const CREDENTIAL_VARIABLES: [&str; 5] = [
    "ACCESS_TOKEN",
    "LARAVEL_TOKEN",
    "SAT_SESSION",
    "XSRF_TOKEN",
    "EMAIL_PASSWORD",
];

/// A credential that never prints its value through `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token is empty")]
    Empty,
    #[error("token appears to be masked; make sure secrets are injected into the environment")]
    Masked,
    #[error("token appears invalid (too short: {0} characters)")]
    TooShort(usize),
}

/// Strips whitespace, wrapping quotes and control characters from a token copied out of a
/// browser session or a CI secret store.
pub fn clean_token(raw: &str) -> Result<String, TokenError> {
    let cleaned: String = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .chars()
        .filter(|c| !c.is_control())
        .collect();

    if cleaned.is_empty() {
        return Err(TokenError::Empty);
    }

    if cleaned.starts_with("***") {
        return Err(TokenError::Masked);
    }

    let length = cleaned.chars().count();
    if length < MIN_TOKEN_LENGTH {
        return Err(TokenError::TooShort(length));
    }

    Ok(cleaned)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialDiagnosis {
    pub name: &'static str,
    pub present: bool,
    pub length: usize,
    pub surrounding_whitespace: bool,
    pub preview: Option<String>,
    pub problem: Option<TokenError>,
}

impl CredentialDiagnosis {
    pub fn is_usable(&self) -> bool {
        self.present && self.problem.is_none()
    }
}

impl fmt::Display for CredentialDiagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.present {
            return write!(f, "{}: not set", self.name);
        }

        write!(f, "{}: set, {} characters", self.name, self.length)?;
        if let Some(preview) = &self.preview {
            write!(f, " ({preview})")?;
        }
        if self.surrounding_whitespace {
            write!(f, "; has leading/trailing whitespace")?;
        }
        match &self.problem {
            Some(problem) => write!(f, "; problem: {problem}"),
            None => write!(f, "; ok"),
        }
    }
}

/// Describes a credential without revealing more than its first and last few characters.
pub fn diagnose(name: &'static str, value: Option<&str>) -> CredentialDiagnosis {
    let Some(value) = value else {
        return CredentialDiagnosis {
            name,
            present: false,
            length: 0,
            surrounding_whitespace: false,
            preview: None,
            problem: None,
        };
    };

    let length = value.chars().count();
    let preview = if length > 12 {
        let head: String = value.chars().take(4).collect();
        let tail: String = value.chars().skip(length - 4).collect();
        format!("{head}...{tail}")
    } else {
        "*".repeat(length)
    };

    CredentialDiagnosis {
        name,
        present: true,
        length,
        surrounding_whitespace: value != value.trim(),
        preview: Some(preview),
        problem: clean_token(value).err(),
    }
}

/// Diagnoses every credential variable in the process environment, after loading `.env`.
pub fn diagnose_environment() -> Vec<CredentialDiagnosis> {
    dotenvy::dotenv().ok();
    CREDENTIAL_VARIABLES
        .iter()
        .map(|name| diagnose(name, env::var(name).ok().as_deref()))
        .collect()
}
