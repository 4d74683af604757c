//! `.env` loader.
//!
//! # Format
//!
//! ```text
//! # comment
//! DB_USER=root
//! export DB_NAME=testDb
//! DB_PASSWORD="p@ss word\n"
//! GREETING='no $escapes here'
//! ```
//!
//! Keys must match `[A-Za-z_][A-Za-z0-9_]*`. Double-quoted values
//! understand `\n`, `\"` and `\\`; single-quoted values are literal.
//! Unquoted values are trimmed and end at ` #`.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum DotenvError {
    #[error("parse error at line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("could not read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Parsed variables, sorted by key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvFile {
    vars: BTreeMap<String, String>,
}

impl EnvFile {
    pub fn parse(content: &str) -> Result<Self, DotenvError> {
        let mut vars = BTreeMap::new();

        for (index, line) in content.lines().enumerate() {
            let line_num = index + 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (key, value) = parse_line(line).map_err(|reason| DotenvError::Parse {
                line: line_num,
                reason,
            })?;
            vars.insert(key, value);
        }

        Ok(Self { vars })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DotenvError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| DotenvError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Export every variable not already set in the process environment.
    ///
    /// Returns the keys that were set. Mutating the environment is only
    /// sound while no other thread reads it, i.e. during test setup.
    pub fn apply(&self) -> Vec<&str> {
        let mut applied = Vec::new();
        for (key, value) in &self.vars {
            if std::env::var_os(key).is_some() {
                debug!(key = %key, "Keeping existing environment variable");
                continue;
            }
            std::env::set_var(key, value);
            applied.push(key.as_str());
        }
        applied
    }
}

fn parse_line(line: &str) -> Result<(String, String), String> {
    let line = line.strip_prefix("export ").map(str::trim_start).unwrap_or(line);

    let Some((key, raw)) = line.split_once('=') else {
        return Err("expected KEY=value format".to_string());
    };

    let key = key.trim();
    validate_key(key)?;

    let raw = raw.trim();
    let value = if let Some(rest) = raw.strip_prefix('"') {
        let Some(end) = closing_quote(rest) else {
            return Err("unterminated double-quoted value".to_string());
        };
        unescape(&rest[..end])
    } else if let Some(rest) = raw.strip_prefix('\'') {
        let Some(end) = rest.find('\'') else {
            return Err("unterminated single-quoted value".to_string());
        };
        rest[..end].to_string()
    } else {
        match raw.find(" #") {
            Some(comment) => raw[..comment].trim_end().to_string(),
            None => raw.to_string(),
        }
    };

    Ok((key.to_string(), value))
}

fn validate_key(key: &str) -> Result<(), String> {
    let mut chars = key.chars();
    let Some(first) = chars.next() else {
        return Err("key cannot be empty".to_string());
    };

    if !first.is_ascii_alphabetic() && first != '_' {
        return Err(format!("invalid key '{key}': must start with a letter or underscore"));
    }

    if let Some(c) = chars.find(|c| !c.is_ascii_alphanumeric() && *c != '_') {
        return Err(format!("invalid key '{key}': invalid character '{c}'"));
    }

    Ok(())
}

/// Byte offset of the first unescaped `"`.
fn closing_quote(text: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => return Some(i),
            _ => {}
        }
    }
    None
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_compose_env() {
        let env = EnvFile::parse(
            "# database\nDB_USER=root\nDB_PASSWORD=root\n\nexport DB_NAME=testDb\n",
        )
        .unwrap();

        assert_eq!(env.len(), 3);
        assert_eq!(env.get("DB_USER"), Some("root"));
        assert_eq!(env.get("DB_NAME"), Some("testDb"));
    }

    #[rstest]
    #[case(r#"A="line1\nline2""#, "line1\nline2")]
    #[case(r#"A="say \"hi\"""#, "say \"hi\"")]
    #[case(r#"A="back\\slash""#, "back\\slash")]
    #[case(r#"A='raw \n $HOME'"#, "raw \\n $HOME")]
    #[case("A=value # trailing", "value")]
    #[case("A=pass#word", "pass#word")]
    #[case("A=", "")]
    #[case("A = spaced ", "spaced")]
    fn test_values(#[case] line: &str, #[case] expected: &str) {
        let env = EnvFile::parse(line).unwrap();
        assert_eq!(env.get("A"), Some(expected));
    }

    #[rstest]
    #[case("NOEQUALS", "expected KEY=value")]
    #[case("1BAD=x", "must start with a letter")]
    #[case("BAD-KEY=x", "invalid character '-'")]
    #[case("=x", "key cannot be empty")]
    #[case("A=\"open", "unterminated double-quoted")]
    fn test_errors(#[case] line: &str, #[case] reason: &str) {
        let content = format!("OK=1\n{line}\n");
        match EnvFile::parse(&content).unwrap_err() {
            DotenvError::Parse { line, reason: got } => {
                assert_eq!(line, 2);
                assert!(got.contains(reason), "{got}");
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_later_lines_win() {
        let env = EnvFile::parse("A=1\nA=2\n").unwrap();
        assert_eq!(env.get("A"), Some("2"));
    }

    #[test]
    fn test_from_path_and_apply_keeps_existing() {
        use std::io::Write;

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "STOREFRONT_DOTENV_TEST_NEW=fresh").unwrap();
        writeln!(file, "STOREFRONT_DOTENV_TEST_SET=from-file").unwrap();

        std::env::set_var("STOREFRONT_DOTENV_TEST_SET", "from-env");

        let env = EnvFile::from_path(file.path()).unwrap();
        let applied = env.apply();

        assert_eq!(applied, ["STOREFRONT_DOTENV_TEST_NEW"]);
        assert_eq!(
            std::env::var("STOREFRONT_DOTENV_TEST_NEW").unwrap(),
            "fresh"
        );
        assert_eq!(
            std::env::var("STOREFRONT_DOTENV_TEST_SET").unwrap(),
            "from-env"
        );
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = EnvFile::from_path("/nonexistent/storefront/.env").unwrap_err();
        assert!(matches!(err, DotenvError::Io { .. }));
    }
}
