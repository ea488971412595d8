//! Reading and parsing save files.

use std::path::Path;

use crate::lua::{self, LuaValue};

use super::error::SaveFileError;
use super::types::ParsedRecord;

/// Name of the global the addon persists its database under.
pub const SAVED_VARIABLE: &str = "BugGrabberDB";

/// Parse the text of a save file into a record.
///
/// # Errors
///
/// Returns an error if the text is not a well-formed series of table-literal
/// assignments, does not assign [`SAVED_VARIABLE`], or assigns it something
/// that does not have the layout of an error database.
///
/// # Examples
///
/// ```
/// use buggrabber_viewer::savefile::parse_save_file;
///
/// let record = parse_save_file(
///     r#"BugGrabberDB = { session = 3, errors = { { message = "x", counter = 1 } } }"#,
/// )
/// .unwrap();
/// assert_eq!(record.session, Some(3));
/// assert_eq!(record.errors[0].as_ref().unwrap().message.as_deref(), Some("x"));
/// ```
pub fn parse_save_file(contents: &str) -> Result<ParsedRecord, SaveFileError> {
    let contents = contents.strip_prefix('\u{feff}').unwrap_or(contents);

    let value = lua::find_assignment(contents, SAVED_VARIABLE)?
        .ok_or(SaveFileError::MissingAssignment(SAVED_VARIABLE))?;

    if !matches!(value, LuaValue::Table(_)) {
        return Err(SaveFileError::NotATable(SAVED_VARIABLE));
    }

    Ok(serde_json::from_value(value.to_json())?)
}

/// Read a save file from disk and parse it.
///
/// Invalid UTF-8 is replaced rather than rejected; the game writes whatever
/// bytes an error message contained.
///
/// # Errors
///
/// Returns [`SaveFileError::Read`] if the file cannot be read, otherwise the
/// errors of [`parse_save_file`].
pub async fn read_save_file(path: &Path) -> Result<ParsedRecord, SaveFileError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| SaveFileError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    parse_save_file(&String::from_utf8_lossy(&bytes))
}

/// Read and parse a save file, logging any failure.
///
/// Returns `None` when no record could be produced.
pub async fn load_save_file(path: &Path) -> Option<ParsedRecord> {
    match read_save_file(path).await {
        Ok(record) => {
            tracing::debug!(
                path = %path.display(),
                session = ?record.session,
                errors = record.errors.len(),
                "Parsed save file"
            );
            Some(record)
        }
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "Error reading BugGrabber file");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_minimal() {
        let record = parse_save_file(
            r#"BugGrabberDB = { session = 3, errors = { { message = "x", counter = 1 } } }"#,
        )
        .unwrap();
        assert_eq!(record.session, Some(3));
        assert_eq!(record.errors.len(), 1);
        let entry = record.errors[0].as_ref().unwrap();
        assert_eq!(entry.message.as_deref(), Some("x"));
        assert_eq!(entry.counter, Some(1));
    }

    #[test]
    fn test_parse_empty_database() {
        let record = parse_save_file("BugGrabberDB = {}").unwrap();
        assert_eq!(record, ParsedRecord::default());
    }

    #[test]
    fn test_parse_with_byte_order_mark() {
        let record = parse_save_file("\u{feff}BugGrabberDB = { session = 1 }").unwrap();
        assert_eq!(record.session, Some(1));
    }

    #[test]
    fn test_malformed_literal() {
        let err = parse_save_file("BugGrabberDB = { session = }").unwrap_err();
        assert!(matches!(err, SaveFileError::Syntax(_)));
    }

    #[test]
    fn test_missing_assignment() {
        let err = parse_save_file("SomethingElseDB = { session = 1 }").unwrap_err();
        assert!(matches!(err, SaveFileError::MissingAssignment("BugGrabberDB")));
    }

    #[test]
    fn test_not_a_table() {
        let err = parse_save_file("BugGrabberDB = 5").unwrap_err();
        assert!(matches!(err, SaveFileError::NotATable(_)));
    }

    #[test]
    fn test_wrong_field_type() {
        let err = parse_save_file("BugGrabberDB = { session = 'three' }").unwrap_err();
        assert!(matches!(err, SaveFileError::Shape(_)));
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("!BugGrabber.lua");
        let err = read_save_file(&path).await.unwrap_err();
        assert!(matches!(err, SaveFileError::Read { .. }));
        assert!(load_save_file(&path).await.is_none());
    }

    #[tokio::test]
    async fn test_read_invalid_utf8_is_lossy() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("!BugGrabber.lua");
        let mut bytes = b"BugGrabberDB = { errors = { { message = \"bad ".to_vec();
        bytes.push(0xFF);
        bytes.extend_from_slice(b"\" } } }");
        std::fs::write(&path, bytes).unwrap();

        let record = load_save_file(&path).await.unwrap();
        let message = record.errors[0].as_ref().unwrap().message.clone().unwrap();
        assert_eq!(message, "bad \u{fffd}");
    }
}
