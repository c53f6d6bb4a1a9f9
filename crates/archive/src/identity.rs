use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::fmt::{Display, Formatter, Result as FmtResult};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Duration, OffsetDateTime, PrimitiveDateTime};

const ARCHIVE_ID_PREFIX: &str = "archive";
const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day] [hour]:[minute]");
const ID_STAMP_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year][month][day][hour][minute]");

/// Deterministic, sortable identifier of an archive.
///
/// The id is `archive_<YYYYMMDDHHMM>` or `archive_<YYYYMMDDHHMM>_<name>`.
/// Timestamps are truncated to the minute, so two identities derived in the
/// same minute with the same name are equal: picking distinct names (or
/// waiting a minute) is the caller's job. Names are used verbatim; callers
/// conventionally replace spaces with underscores before deriving.
///
/// # Examples
///
/// ```
/// use shelve_archive::ArchiveIdentity;
///
/// let identity = ArchiveIdentity::parse("2024-01-01 09:30", "Q1").unwrap();
/// assert_eq!(identity.id(), "archive_202401010930_Q1");
/// assert_eq!(identity.timestamp(), "2024-01-01 09:30");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArchiveIdentity {
    id: String,
    name: Option<String>,
    timestamp: PrimitiveDateTime,
}

impl ArchiveIdentity {
    /// Derive an identity from a creation time and an optional label (an
    /// empty name means no label).
    pub fn derive(timestamp: PrimitiveDateTime, name: &str) -> Self {
        let timestamp = truncate_to_minute(timestamp);
        let name = (!name.is_empty()).then(|| name.to_string());
        let stamp = render(timestamp, ID_STAMP_FORMAT);
        let id = match &name {
            Some(name) => format!("{ARCHIVE_ID_PREFIX}_{stamp}_{name}"),
            None => format!("{ARCHIVE_ID_PREFIX}_{stamp}"),
        };
        Self { id, name, timestamp }
    }

    /// Derive an identity for the current (UTC) minute.
    pub fn now(name: &str) -> Self {
        let now = OffsetDateTime::now_utc();
        Self::derive(PrimitiveDateTime::new(now.date(), now.time()), name)
    }

    /// Derive an identity from a `YYYY-MM-DD HH:MM` timestamp string.
    pub fn parse(timestamp: &str, name: &str) -> Result<Self> {
        let parsed = PrimitiveDateTime::parse(timestamp, TIMESTAMP_FORMAT)
            .or_raise(|| ErrorKind::Timestamp(timestamp.to_string()))?;
        Ok(Self::derive(parsed, name))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Human-readable creation time, `YYYY-MM-DD HH:MM`.
    pub fn timestamp(&self) -> String {
        render(self.timestamp, TIMESTAMP_FORMAT)
    }

    pub fn created_at(&self) -> PrimitiveDateTime {
        self.timestamp
    }
}
impl Display for ArchiveIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.id)
    }
}

// Both descriptions only name date and time components, which a
// `PrimitiveDateTime` always has, so formatting cannot fail.
fn render(timestamp: PrimitiveDateTime, format: &[BorrowedFormatItem<'_>]) -> String {
    timestamp.format(format).unwrap_or_default()
}

fn truncate_to_minute(timestamp: PrimitiveDateTime) -> PrimitiveDateTime {
    timestamp
        - Duration::seconds(i64::from(timestamp.second()))
        - Duration::nanoseconds(i64::from(timestamp.nanosecond()))
}
