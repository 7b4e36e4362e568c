//! Program text format - `.tis`-style node sections.
//!
//! The on-disk form carries one section per node, introduced by `@N`
//! headers starting at 1, with instruction lines below and a blank line
//! between sections:
//!
//! ```text
//! @1
//! MOV UP DOWN
//!
//! @2
//! MOV UP ACC
//! ADD 1
//! MOV ACC DOWN
//! ```
//!
//! Titles map to file names the same way in both directions: lowercased
//! with `-` as `_` on save, uppercased with `_` as `-` on load.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::{GridasmError, Result};
use crate::model::{Code, NODE_COUNT};

const FILE_EXTENSION: &str = "tis";
const NODE_PREFIX: char = '@';

/// Parse program text into a [`Code`] with the given title.
///
/// Sections past the last header are left empty; exactly [`NODE_COUNT`]
/// node vectors come out. A code line before any header or more than
/// [`NODE_COUNT`] headers is a format error.
pub fn parse_code(text: &str, title: impl Into<String>) -> Result<Code> {
    let mut nodes = vec![Vec::new(); NODE_COUNT];
    let mut current: Option<usize> = None;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if line.starts_with(NODE_PREFIX) {
            let next = current.map_or(0, |c| c + 1);
            if next >= NODE_COUNT {
                return Err(GridasmError::Format(format!(
                    "too many node headers (max {NODE_COUNT})"
                )));
            }
            current = Some(next);
            continue;
        }

        let Some(section) = current else {
            return Err(GridasmError::Format(
                "code line before any node header".into(),
            ));
        };
        nodes[section].push(line.to_string());
    }

    Ok(Code {
        title: title.into(),
        nodes,
    })
}

/// Render a [`Code`] in the on-disk format.
pub fn format_code(code: &Code) -> String {
    let mut text = String::new();
    for (i, node) in code.nodes.iter().enumerate() {
        text.push_str(&format!("{}{}\n", NODE_PREFIX, i + 1));
        for line in node {
            text.push_str(line);
            text.push('\n');
        }
        text.push('\n');
    }
    text
}

/// Load a `.tis` program file. The title is derived from the file name.
pub fn load_code(path: impl AsRef<Path>) -> Result<Code> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let title = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_uppercase().replace('_', "-"))
        .unwrap_or_default();

    debug!("loaded program {title:?} from {}", path.display());
    parse_code(&text, title)
}

/// Save a program into `dir`, deriving the file name from the title.
/// Returns the path written.
pub fn save_code(dir: impl AsRef<Path>, code: &Code) -> Result<PathBuf> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(GridasmError::Format(format!(
            "directory does not exist: {}",
            dir.display()
        )));
    }
    if code.nodes.len() > NODE_COUNT {
        return Err(GridasmError::Format(format!(
            "too many nodes ({}), expected max {NODE_COUNT}",
            code.nodes.len()
        )));
    }

    let file_name = format!(
        "{}.{}",
        code.title.to_lowercase().replace('-', "_"),
        FILE_EXTENSION
    );
    let path = dir.join(file_name);
    fs::write(&path, format_code(code))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_code() -> Code {
        let mut code = Code::empty("SIMPLE-PIPE");
        code.nodes[0] = vec!["MOV UP DOWN".into()];
        code.nodes[4] = vec!["MOV UP ACC".into(), "ADD 1".into(), "MOV ACC DOWN".into()];
        code.nodes[8] = vec!["MOV UP DOWN".into()];
        code
    }

    #[test]
    fn test_parse_sections() {
        let text = "@1\nMOV UP DOWN\n\n@2\nADD 1\nSAV\n";
        let code = parse_code(text, "TEST").unwrap();

        assert_eq!(code.nodes.len(), NODE_COUNT);
        assert_eq!(code.nodes[0], vec!["MOV UP DOWN"]);
        assert_eq!(code.nodes[1], vec!["ADD 1", "SAV"]);
        assert!(code.nodes[2].is_empty());
    }

    #[test]
    fn test_parse_line_before_header_fails() {
        let err = parse_code("MOV UP DOWN\n@1\n", "TEST").unwrap_err();
        assert!(err.to_string().contains("before any node header"));
    }

    #[test]
    fn test_parse_too_many_headers_fails() {
        let text = (0..NODE_COUNT + 1)
            .map(|i| format!("@{}\n", i + 1))
            .collect::<String>();
        let err = parse_code(&text, "TEST").unwrap_err();
        assert!(err.to_string().contains("too many node headers"));
    }

    #[test]
    fn test_format_parse_round_trip() {
        let code = sample_code();
        let parsed = parse_code(&format_code(&code), code.title.clone()).unwrap();
        assert_eq!(parsed, code);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let code = sample_code();

        let path = save_code(dir.path(), &code).unwrap();
        assert_eq!(path.file_name().unwrap(), "simple_pipe.tis");

        let loaded = load_code(&path).unwrap();
        assert_eq!(loaded, code);
    }

    #[test]
    fn test_save_into_missing_directory_fails() {
        let err = save_code("/definitely/does/not/exist", &sample_code()).unwrap_err();
        assert!(err.to_string().contains("directory does not exist"));
    }
}
