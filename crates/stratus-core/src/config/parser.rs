//! TOML parser with helpful error messages

use std::path::Path;

use super::schema::StratusConfig;
use crate::error::{StratusError, StratusResult};

/// Parse stratus.toml with detailed error messages
pub fn parse_stratus_toml(path: &Path) -> StratusResult<StratusConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| StratusError::io(path, e))?;

    parse_stratus_toml_str(&content).map_err(|e| {
        StratusError::configuration(format!("Failed to parse {}: {}", path.display(), e))
    })
}

/// Parse stratus.toml content from string
pub fn parse_stratus_toml_str(content: &str) -> StratusResult<StratusConfig> {
    let config: StratusConfig =
        toml::from_str(content).map_err(|e| enhance_toml_error(e, content))?;

    config.validate()?;

    Ok(config)
}

/// Point at the offending line when the error carries a span.
fn enhance_toml_error(error: toml::de::Error, content: &str) -> StratusError {
    let message = error.message().to_string();

    let line_hint = error
        .span()
        .and_then(|span| content.get(..span.start))
        .map(|before| before.matches('\n').count() + 1);

    match line_hint {
        Some(line_num) => StratusError::configuration(format!(
            "TOML parsing error at line {}:\n{}\n\nError: {}",
            line_num,
            get_line_context(content, line_num),
            message
        )),
        None => StratusError::configuration(format!("TOML parsing error: {}", message)),
    }
}

/// Get context lines around an error
fn get_line_context(content: &str, line_num: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let start = line_num.saturating_sub(2);
    let end = (line_num + 2).min(lines.len());

    lines[start.min(end)..end]
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let num = start + i + 1;
            let marker = if num == line_num { ">>>" } else { "   " };
            format!("{} {:4} | {}", marker, num, line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Serialize a configuration to TOML string
pub fn to_toml(config: &StratusConfig) -> StratusResult<String> {
    toml::to_string_pretty(config).map_err(|e| StratusError::Serialisation(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_valid_config() {
        let toml = r#"
[project]
service_name = "demo"
environment = "dev"
functions_dir = "handlers"

[services]
AC00000000000000000000000000000000 = "ZS00000000000000000000000000000000"
"#;

        let config = parse_stratus_toml_str(toml).unwrap();
        assert_eq!(config.project.service_name.as_deref(), Some("demo"));
        assert_eq!(config.project.functions_dir.as_deref(), Some("handlers"));
        assert_eq!(
            config.service_sid("AC00000000000000000000000000000000"),
            Some("ZS00000000000000000000000000000000")
        );
    }

    #[test]
    fn test_parse_empty_config() {
        let config = parse_stratus_toml_str("").unwrap();
        assert_eq!(config, StratusConfig::default());
    }

    #[test]
    fn test_parse_invalid_toml_points_at_line() {
        let toml = "[project]\nservice_name = \"demo\"\nenvironment = [unclosed\n";

        let err = parse_stratus_toml_str(toml).unwrap_err().to_string();
        assert!(err.contains("line 3"), "{err}");
        assert!(err.contains(">>>"), "{err}");
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let toml = "[project]\nservice = \"demo\"\n";
        assert!(parse_stratus_toml_str(toml).is_err());
    }

    #[test]
    fn test_environment_with_spaces_is_rejected() {
        let toml = "[project]\nenvironment = \"my env\"\n";
        let err = parse_stratus_toml_str(toml).unwrap_err().to_string();
        assert!(err.contains("whitespace"));
    }

    #[test]
    fn test_to_toml_roundtrip() {
        let mut original = StratusConfig::new();
        original.project.service_name = Some("demo".to_string());
        original.project.region = Some("au1".to_string());
        original.set_service_sid(
            "AC00000000000000000000000000000000",
            "ZS00000000000000000000000000000001",
        );

        let parsed = parse_stratus_toml_str(&to_toml(&original).unwrap()).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_parse_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[project]\nenvironment = \"stage\"").unwrap();

        let config = parse_stratus_toml(temp_file.path()).unwrap();
        assert_eq!(config.project.environment.as_deref(), Some("stage"));
    }

    #[test]
    fn test_parse_nonexistent_file() {
        let result = parse_stratus_toml(Path::new("/nonexistent/path/stratus.toml"));
        assert!(matches!(result, Err(StratusError::Io { .. })));
    }
}
