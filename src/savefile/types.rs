//! Records parsed from the `!BugGrabber` save file.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// The error database stored by the addon.
///
/// Every field is optional in the file; absent fields take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParsedRecord {
    /// Current session number, incremented on every game launch.
    pub session: Option<i64>,
    /// When the addon last trimmed old errors.
    pub last_sanitation: Option<i64>,
    /// Captured errors in file order. `None` marks a `nil` slot.
    #[serde(deserialize_with = "deserialize_errors")]
    pub errors: Vec<Option<ErrorEntry>>,
}

impl ParsedRecord {
    /// Iterate the entries that are present, skipping `nil` slots.
    pub fn present_errors(&self) -> impl Iterator<Item = &ErrorEntry> {
        self.errors.iter().flatten()
    }
}

/// One captured error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    /// Session the error was captured in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<i64>,
    /// Sequence counter within the session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counter: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    /// Dump of local variables at the failing frame.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locals: Option<String>,
}

/// Accept the error list as a sequence, as an integer-keyed table (sparse
/// arrays convert to objects), or as `nil`.
fn deserialize_errors<'de, D>(deserializer: D) -> Result<Vec<Option<ErrorEntry>>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = match Value::deserialize(deserializer)? {
        Value::Null => return Ok(Vec::new()),
        Value::Array(items) => items,
        Value::Object(map) => {
            let mut keyed = map
                .into_iter()
                .map(|(key, value)| {
                    key.parse::<i64>()
                        .map(|index| (index, value))
                        .map_err(|_| D::Error::custom(format!("non-numeric error index {key:?}")))
                })
                .collect::<Result<Vec<_>, _>>()?;
            keyed.sort_by_key(|(index, _)| *index);
            keyed.into_iter().map(|(_, value)| value).collect()
        }
        other => {
            return Err(D::Error::custom(format!(
                "expected a table of errors, found {other}"
            )))
        }
    };

    items
        .into_iter()
        .map(|item| match item {
            Value::Null => Ok(None),
            item => serde_json::from_value(item)
                .map(Some)
                .map_err(D::Error::custom),
        })
        .collect()
}
