use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid --set format: '{0}'. Expected KEY=VALUE.")]
    InvalidKeyValue(String),

    #[error("Invalid GPU list '{0}'. Expected comma-separated device indices (e.g., '0,1').")]
    InvalidGpuList(String),

    #[error("Command for '{0}' cannot be empty.")]
    EmptyCommand(&'static str),
}

/// Splits `KEY=VALUE` at the first `=`; both sides are trimmed and the key must be non-empty.
pub fn parse_key_value(pair: &str) -> Result<(&str, &str), ParseError> {
    let (key, value) = pair
        .split_once('=')
        .ok_or_else(|| ParseError::InvalidKeyValue(pair.to_string()))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(ParseError::InvalidKeyValue(pair.to_string()));
    }
    Ok((key, value.trim()))
}

pub fn parse_gpu_list(s: &str) -> Result<Vec<u32>, ParseError> {
    let gpus = s
        .split(',')
        .map(|part| part.trim().parse::<u32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| ParseError::InvalidGpuList(s.to_string()))?;
    if gpus.is_empty() {
        return Err(ParseError::InvalidGpuList(s.to_string()));
    }
    Ok(gpus)
}

/// Splits a command line on whitespace into program and arguments.
pub fn split_command(s: &str, key: &'static str) -> Result<Vec<String>, ParseError> {
    let parts: Vec<String> = s.split_whitespace().map(str::to_string).collect();
    if parts.is_empty() {
        return Err(ParseError::EmptyCommand(key));
    }
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_value_splits_at_first_equals() {
        assert_eq!(
            parse_key_value("launcher.queue-command=sbatch --export=ALL").unwrap(),
            ("launcher.queue-command", "sbatch --export=ALL")
        );
        assert_eq!(
            parse_key_value(" session.name = runs ").unwrap(),
            ("session.name", "runs")
        );
    }

    #[test]
    fn key_value_requires_key_and_equals() {
        assert_eq!(
            parse_key_value("session.name"),
            Err(ParseError::InvalidKeyValue("session.name".to_string()))
        );
        assert!(parse_key_value("=value").is_err());
    }

    #[test]
    fn gpu_lists_are_comma_separated() {
        assert_eq!(parse_gpu_list("0").unwrap(), vec![0]);
        assert_eq!(parse_gpu_list("0, 2,3").unwrap(), vec![0, 2, 3]);
        assert!(parse_gpu_list("").is_err());
        assert!(parse_gpu_list("0,,1").is_err());
        assert!(parse_gpu_list("gpu0").is_err());
    }

    #[test]
    fn commands_split_on_whitespace() {
        assert_eq!(
            split_command("  sbatch   --partition=gpu ", "launcher.queue-command").unwrap(),
            vec!["sbatch", "--partition=gpu"]
        );
        assert_eq!(
            split_command("   ", "launcher.simulator"),
            Err(ParseError::EmptyCommand("launcher.simulator"))
        );
    }
}
