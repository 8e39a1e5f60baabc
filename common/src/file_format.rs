use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum FileFormatError {
    #[error("Failed to get file extension")]
    MissingFileExtension,
    #[error("Unsupported file extension for file: {0}")]
    UnsupportedFileExtension(String),
    #[error("YAML serialization failed")]
    Yaml(#[from] serde_yml::Error),
    #[error("JSON serialization failed")]
    Json(#[from] serde_json::Error),
    #[error("Failed to read '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type FileFormatResult<T> = Result<T, FileFormatError>;

/// Text formats accepted for configuration files.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileFormat {
    Yaml,
    Json,
}

impl FileFormat {
    pub fn from_file_name(file_name: &str) -> FileFormatResult<Self> {
        let ext = Path::new(file_name)
            .extension()
            .and_then(|os_str| os_str.to_str())
            .ok_or(FileFormatError::MissingFileExtension)?;

        if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") {
            Ok(Self::Yaml)
        } else if ext.eq_ignore_ascii_case("json") {
            Ok(Self::Json)
        } else {
            Err(FileFormatError::UnsupportedFileExtension(
                file_name.to_string(),
            ))
        }
    }
}

pub fn serialize<T: Serialize>(value: &T, format: FileFormat) -> FileFormatResult<String> {
    Ok(match format {
        FileFormat::Yaml => serde_yml::to_string(value)?,
        FileFormat::Json => serde_json::to_string_pretty(value)?,
    })
}

pub fn deserialize<T: DeserializeOwned>(text: &str, format: FileFormat) -> FileFormatResult<T> {
    Ok(match format {
        FileFormat::Yaml => serde_yml::from_str(text)?,
        FileFormat::Json => serde_json::from_str(text)?,
    })
}

/// Reads `path` and deserializes it using the format implied by its extension.
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> FileFormatResult<T> {
    let name = path.to_string_lossy();
    let format = FileFormat::from_file_name(&name)?;
    let text = std::fs::read_to_string(path).map_err(|source| FileFormatError::Read {
        path: name.to_string(),
        source,
    })?;

    deserialize(&text, format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_from_extension() {
        assert_eq!(FileFormat::from_file_name("a.yml").unwrap(), FileFormat::Yaml);
        assert_eq!(FileFormat::from_file_name("a.YAML").unwrap(), FileFormat::Yaml);
        assert_eq!(FileFormat::from_file_name("a.json").unwrap(), FileFormat::Json);
        assert!(matches!(
            FileFormat::from_file_name("a"),
            Err(FileFormatError::MissingFileExtension)
        ));
        assert!(matches!(
            FileFormat::from_file_name("a.toml"),
            Err(FileFormatError::UnsupportedFileExtension(_))
        ));
    }

    #[test]
    fn yaml_and_json_agree() {
        let value = vec![1u32, 2, 3];
        for format in [FileFormat::Yaml, FileFormat::Json] {
            let text = serialize(&value, format).unwrap();
            let back: Vec<u32> = deserialize(&text, format).unwrap();
            assert_eq!(back, value);
        }
    }
}
