use std::path::Path;

use super::ConfigError;

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigToken {
    String(String),
    Float(f64),
    Number(i64),
}

impl From<ConfigToken> for String {
    fn from(value: ConfigToken) -> Self {
        match value {
            ConfigToken::String(s) => s,
            ConfigToken::Number(n) => n.to_string(),
            ConfigToken::Float(f) => f.to_string(),
        }
    }
}

impl From<ConfigToken> for i64 {
    fn from(value: ConfigToken) -> Self {
        match value {
            ConfigToken::Number(value) => value,
            _ => Default::default(),
        }
    }
}

impl From<ConfigToken> for f64 {
    fn from(value: ConfigToken) -> Self {
        match value {
            ConfigToken::Float(value) => value,
            ConfigToken::Number(value) => value as f64,
            _ => Default::default(),
        }
    }
}

impl From<ConfigToken> for bool {
    fn from(value: ConfigToken) -> Self {
        match value {
            ConfigToken::String(s) => s.eq_ignore_ascii_case("true"),
            ConfigToken::Number(n) => n != 0,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Params(Vec<ConfigToken>);

#[derive(Debug, Clone, PartialEq)]
pub struct ConfigLine {
    /// 1-based line number in the source text.
    pub line: usize,
    pub key: String,
    pub params: Params,
}

impl ConfigLine {
    pub fn params(&self) -> &[ConfigToken] {
        &self.params.0
    }

    pub fn param<T: From<ConfigToken> + Default>(&self, index: usize) -> T {
        self.params
            .0
            .get(index)
            .cloned()
            .map(T::from)
            .unwrap_or_default()
    }

    pub fn maybe_param<T: From<ConfigToken> + Default>(&self, index: usize) -> Option<T> {
        self.params.0.get(index).map(|t| T::from(t.clone()))
    }

    pub fn string(&self, index: usize) -> String {
        self.param::<String>(index)
    }

    /// A required string parameter.
    pub fn require_string(&self, index: usize) -> Result<String, ConfigError> {
        match self.params.0.get(index) {
            Some(token) => Ok(String::from(token.clone())),
            None => Err(self.error(format!("{} is missing parameter {}", self.key, index + 1))),
        }
    }

    /// A required numeric parameter; integers are accepted.
    pub fn require_float(&self, index: usize) -> Result<f64, ConfigError> {
        match self.params.0.get(index) {
            Some(ConfigToken::Float(value)) => Ok(*value),
            Some(ConfigToken::Number(value)) => Ok(*value as f64),
            Some(ConfigToken::String(s)) => {
                Err(self.error(format!("{} expects a number, found \"{s}\"", self.key)))
            }
            None => Err(self.error(format!("{} is missing parameter {}", self.key, index + 1))),
        }
    }

    /// `count` consecutive numbers starting at `index`.
    pub fn require_floats<const N: usize>(&self, index: usize) -> Result<[f64; N], ConfigError> {
        let mut values = [0.0; N];
        for (i, value) in values.iter_mut().enumerate() {
            *value = self.require_float(index + i)?;
        }
        Ok(values)
    }

    pub fn error(&self, message: impl Into<String>) -> ConfigError {
        ConfigError::Parse {
            line: self.line,
            message: message.into(),
        }
    }
}

/// The next token, and whether it was quoted.
fn parse_string(chars: &mut std::iter::Peekable<std::str::Chars>) -> Option<(String, bool)> {
    while chars.peek().is_some_and(|c| c.is_whitespace()) {
        chars.next(); // Skip leading whitespace
    }

    let mut result = String::new();

    match chars.peek()? {
        ';' => return None, // Trailing comment
        '"' => {
            chars.next(); // Skip opening quote
            while let Some(&ch) = chars.peek() {
                chars.next();
                if ch == '"' {
                    break;
                }
                result.push(ch);
            }
            return Some((result, true));
        }
        _ => {
            while let Some(&ch) = chars.peek() {
                if ch.is_whitespace() {
                    break;
                }
                result.push(ch);
                chars.next();
            }
        }
    }

    Some((result, false))
}

pub fn parse_line(line_number: usize, line: &str) -> Option<ConfigLine> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(';') {
        return None;
    }

    let mut chars = line.chars().peekable();

    let (key, _) = parse_string(&mut chars)?;

    let mut params = Vec::new();
    while let Some((param_str, quoted)) = parse_string(&mut chars) {
        if quoted {
            params.push(ConfigToken::String(param_str));
        } else if let Ok(num) = param_str.parse::<i64>() {
            params.push(ConfigToken::Number(num));
        } else if let Ok(num) = param_str.parse::<f64>() {
            params.push(ConfigToken::Float(num));
        } else {
            params.push(ConfigToken::String(param_str));
        }
    }

    Some(ConfigLine {
        line: line_number,
        key,
        params: Params(params),
    })
}

pub struct ConfigLines {
    lines: Vec<ConfigLine>,
}

impl ConfigLines {
    pub fn parse(s: &str) -> Self {
        Self {
            lines: s
                .lines()
                .enumerate()
                .filter_map(|(i, line)| parse_line(i + 1, line))
                .collect(),
        }
    }

    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(&data))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigLine> {
        self.lines.iter()
    }

    pub fn into_lines(self) -> impl Iterator<Item = ConfigLine> {
        self.lines.into_iter()
    }
}
