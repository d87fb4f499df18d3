use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Storage-assigned event id (SQLite rowid).
pub type EventId = i64;

/// Returned when a name or code does not match any known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value:?}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    fn new(kind: &'static str, value: impl fmt::Display) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Coarse event category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseType {
    FileSystem,
    WebActivity,
    Misc,
}

impl BaseType {
    pub const ALL: [BaseType; 3] = [BaseType::FileSystem, BaseType::WebActivity, BaseType::Misc];

    /// Persisted code (`events.base_type`).
    pub fn code(self) -> i64 {
        match self {
            BaseType::FileSystem => 0,
            BaseType::WebActivity => 1,
            BaseType::Misc => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    pub fn name(self) -> &'static str {
        match self {
            BaseType::FileSystem => "file_system",
            BaseType::WebActivity => "web_activity",
            BaseType::Misc => "misc",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            BaseType::FileSystem => "File System",
            BaseType::WebActivity => "Web Activity",
            BaseType::Misc => "Misc Types",
        }
    }

    /// All sub types whose super type is `self`, in code order.
    pub fn sub_types(self) -> impl Iterator<Item = SubType> {
        SubType::ALL
            .into_iter()
            .filter(move |sub| sub.super_type() == self)
    }
}

/// Fine-grained event type. Every sub type belongs to exactly one [`BaseType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubType {
    FileModified,
    FileAccessed,
    FileCreated,
    FileChanged,
    WebDownloads,
    WebCookie,
    WebBookmark,
    WebHistory,
    WebSearch,
    Message,
    GpsRoute,
    GpsTrackpoint,
    CallLog,
    Email,
    RecentDocuments,
    InstalledPrograms,
    Exif,
    DevicesAttached,
}

impl SubType {
    pub const ALL: [SubType; 18] = [
        SubType::FileModified,
        SubType::FileAccessed,
        SubType::FileCreated,
        SubType::FileChanged,
        SubType::WebDownloads,
        SubType::WebCookie,
        SubType::WebBookmark,
        SubType::WebHistory,
        SubType::WebSearch,
        SubType::Message,
        SubType::GpsRoute,
        SubType::GpsTrackpoint,
        SubType::CallLog,
        SubType::Email,
        SubType::RecentDocuments,
        SubType::InstalledPrograms,
        SubType::Exif,
        SubType::DevicesAttached,
    ];

    /// Persisted code (`events.sub_type`). Codes are positions in [`SubType::ALL`]
    /// and must never be reordered.
    pub fn code(self) -> i64 {
        self as i64
    }

    pub fn from_code(code: i64) -> Option<Self> {
        usize::try_from(code)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn super_type(self) -> BaseType {
        use SubType::*;
        match self {
            FileModified | FileAccessed | FileCreated | FileChanged => BaseType::FileSystem,
            WebDownloads | WebCookie | WebBookmark | WebHistory | WebSearch => {
                BaseType::WebActivity
            }
            Message | GpsRoute | GpsTrackpoint | CallLog | Email | RecentDocuments
            | InstalledPrograms | Exif | DevicesAttached => BaseType::Misc,
        }
    }

    pub fn name(self) -> &'static str {
        use SubType::*;
        match self {
            FileModified => "file_modified",
            FileAccessed => "file_accessed",
            FileCreated => "file_created",
            FileChanged => "file_changed",
            WebDownloads => "web_downloads",
            WebCookie => "web_cookie",
            WebBookmark => "web_bookmark",
            WebHistory => "web_history",
            WebSearch => "web_search",
            Message => "message",
            GpsRoute => "gps_route",
            GpsTrackpoint => "gps_trackpoint",
            CallLog => "call_log",
            Email => "email",
            RecentDocuments => "recent_documents",
            InstalledPrograms => "installed_programs",
            Exif => "exif",
            DevicesAttached => "devices_attached",
        }
    }

    pub fn display_name(self) -> &'static str {
        use SubType::*;
        match self {
            FileModified => "File Modified",
            FileAccessed => "File Accessed",
            FileCreated => "File Created",
            FileChanged => "File Changed",
            WebDownloads => "Web Downloads",
            WebCookie => "Web Cookies",
            WebBookmark => "Web Bookmarks",
            WebHistory => "Web History",
            WebSearch => "Web Searches",
            Message => "Messages",
            GpsRoute => "GPS Routes",
            GpsTrackpoint => "Location History",
            CallLog => "Calls",
            Email => "Email",
            RecentDocuments => "Recent Documents",
            InstalledPrograms => "Installed Programs",
            Exif => "Exif",
            DevicesAttached => "Devices Attached",
        }
    }
}

/// An event type at either zoom level: the "resolved type" of an aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventType {
    Base(BaseType),
    Sub(SubType),
}

impl EventType {
    pub fn base_type(self) -> BaseType {
        match self {
            EventType::Base(b) => b,
            EventType::Sub(s) => s.super_type(),
        }
    }

    pub fn zoom_level(self) -> TypeZoomLevel {
        match self {
            EventType::Base(_) => TypeZoomLevel::BaseType,
            EventType::Sub(_) => TypeZoomLevel::SubType,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            EventType::Base(b) => b.name(),
            EventType::Sub(s) => s.name(),
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            EventType::Base(b) => b.display_name(),
            EventType::Sub(s) => s.display_name(),
        }
    }
}

impl From<BaseType> for EventType {
    fn from(b: BaseType) -> Self {
        EventType::Base(b)
    }
}

impl From<SubType> for EventType {
    fn from(s: SubType) -> Self {
        EventType::Sub(s)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for BaseType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| UnknownVariant::new("base type", s))
    }
}

impl FromStr for SubType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| UnknownVariant::new("sub type", s))
    }
}

impl FromStr for EventType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<BaseType>()
            .map(EventType::Base)
            .or_else(|_| s.parse::<SubType>().map(EventType::Sub))
            .map_err(|_| UnknownVariant::new("event type", s))
    }
}

/// Content-matching classification of the source object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnownState {
    #[default]
    Unknown,
    Known,
    Notable,
}

impl KnownState {
    pub const ALL: [KnownState; 3] = [KnownState::Unknown, KnownState::Known, KnownState::Notable];

    pub fn code(self) -> i64 {
        match self {
            KnownState::Unknown => 0,
            KnownState::Known => 1,
            KnownState::Notable => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.code() == code)
    }
}

/// Which type column aggregates are grouped by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeZoomLevel {
    #[default]
    BaseType,
    SubType,
}

impl FromStr for TypeZoomLevel {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "base" | "base_type" => Ok(TypeZoomLevel::BaseType),
            "sub" | "sub_type" => Ok(TypeZoomLevel::SubType),
            _ => Err(UnknownVariant::new("type zoom level", s)),
        }
    }
}

/// Which description resolution aggregates are grouped by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptionLod {
    #[default]
    Short,
    Medium,
    Full,
}

impl FromStr for DescriptionLod {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "short" => Ok(DescriptionLod::Short),
            "medium" | "med" => Ok(DescriptionLod::Medium),
            "full" => Ok(DescriptionLod::Full),
            _ => Err(UnknownVariant::new("description level", s)),
        }
    }
}

/// A persisted timeline event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub event_id: EventId,
    pub datasource_id: i64,
    pub file_id: i64,
    pub artifact_id: Option<i64>,
    /// Seconds since the Unix epoch, UTC.
    pub time: i64,
    pub sub_type: SubType,
    pub full_description: String,
    pub med_description: String,
    pub short_description: String,
    pub known: KnownState,
    pub hash_hit: bool,
    pub tagged: bool,
}

impl TimelineEvent {
    pub fn base_type(&self) -> BaseType {
        self.sub_type.super_type()
    }

    /// The type at the requested zoom level.
    pub fn event_type(&self, zoom: TypeZoomLevel) -> EventType {
        match zoom {
            TypeZoomLevel::BaseType => EventType::Base(self.base_type()),
            TypeZoomLevel::SubType => EventType::Sub(self.sub_type),
        }
    }

    pub fn description(&self, lod: DescriptionLod) -> &str {
        match lod {
            DescriptionLod::Full => &self.full_description,
            DescriptionLod::Medium => &self.med_description,
            DescriptionLod::Short => &self.short_description,
        }
    }
}

/// One record of the source-event feed, before storage assigns an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    #[serde(default)]
    pub datasource_id: i64,
    pub file_id: i64,
    #[serde(default)]
    pub artifact_id: Option<i64>,
    pub time: i64,
    pub sub_type: SubType,
    pub full_description: String,
    pub med_description: String,
    pub short_description: String,
    #[serde(default)]
    pub known: KnownState,
    /// Names of the hash sets the content matched.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub hash_sets: BTreeSet<String>,
    #[serde(default)]
    pub tagged: bool,
}

impl NewEvent {
    /// Event with the same text at every description level and no provenance
    /// beyond `file_id`.
    pub fn new(file_id: i64, time: i64, sub_type: SubType, description: &str) -> Self {
        Self {
            datasource_id: 0,
            file_id,
            artifact_id: None,
            time,
            sub_type,
            full_description: description.to_string(),
            med_description: description.to_string(),
            short_description: description.to_string(),
            known: KnownState::Unknown,
            hash_sets: BTreeSet::new(),
            tagged: false,
        }
    }

    pub fn base_type(&self) -> BaseType {
        self.sub_type.super_type()
    }

    pub fn hash_hit(&self) -> bool {
        !self.hash_sets.is_empty()
    }

    /// Attach the id storage assigned.
    pub fn into_event(self, event_id: EventId) -> TimelineEvent {
        let hash_hit = self.hash_hit();
        TimelineEvent {
            event_id,
            datasource_id: self.datasource_id,
            file_id: self.file_id,
            artifact_id: self.artifact_id,
            time: self.time,
            sub_type: self.sub_type,
            full_description: self.full_description,
            med_description: self.med_description,
            short_description: self.short_description,
            known: self.known,
            hash_hit,
            tagged: self.tagged,
        }
    }
}
