use std::fs;
use std::path::Path;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::info;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("No comments found in {0}")]
    Empty(String),
    #[error("Unsupported image type: {0}")]
    UnsupportedImage(String),
}

/// Splits raw text into trimmed, non-empty comment lines.
pub fn parse_comment_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn import_comment_file(path: &Path) -> Result<Vec<String>, ImportError> {
    let text = fs::read_to_string(path)?;
    let lines = parse_comment_lines(&text);
    if lines.is_empty() {
        return Err(ImportError::Empty(path.display().to_string()));
    }
    info!("Imported {} custom comments from {}", lines.len(), path.display());
    Ok(lines)
}

fn image_mime_type(path: &Path) -> Result<&'static str, ImportError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "png" => Ok("image/png"),
        "jpg" | "jpeg" => Ok("image/jpeg"),
        "gif" => Ok("image/gif"),
        "webp" => Ok("image/webp"),
        _ => Err(ImportError::UnsupportedImage(path.display().to_string())),
    }
}

/// Reads a local image as a data URL usable as the host avatar.
pub fn avatar_data_url(path: &Path) -> Result<String, ImportError> {
    let mime = image_mime_type(path)?;
    let bytes = fs::read(path)?;
    Ok(format!("data:{};base64,{}", mime, STANDARD.encode(bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str, contents: &[u8]) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("simulive_{}_{}", std::process::id(), name));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn splits_and_trims_lines() {
        let lines = parse_comment_lines("  主播好 \r\n\n\t\n来了\n最后一条");
        assert_eq!(lines, vec!["主播好", "来了", "最后一条"]);
    }

    #[test]
    fn empty_file_is_rejected() {
        let path = temp_file("blank.txt", b"\n   \n");
        assert!(matches!(import_comment_file(&path), Err(ImportError::Empty(_))));
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn imports_file_lines() {
        let path = temp_file("comments.txt", "好看\n\n好听\n".as_bytes());
        assert_eq!(import_comment_file(&path).unwrap(), vec!["好看", "好听"]);
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn avatar_becomes_data_url() {
        let path = temp_file("avatar.PNG", b"ABC");
        assert_eq!(avatar_data_url(&path).unwrap(), "data:image/png;base64,QUJD");
        fs::remove_file(path).unwrap();

        let path = temp_file("avatar.bmp", b"ABC");
        assert!(matches!(avatar_data_url(&path), Err(ImportError::UnsupportedImage(_))));
        fs::remove_file(path).unwrap();
    }
}
