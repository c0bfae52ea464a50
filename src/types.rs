use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// File type bits (from stat.h)
const S_IFMT: u32 = 0o170000;
const S_IFSOCK: u32 = 0o140000;
const S_IFLNK: u32 = 0o120000;
const S_IFREG: u32 = 0o100000;
const S_IFBLK: u32 = 0o060000;
const S_IFDIR: u32 = 0o040000;
const S_IFCHR: u32 = 0o020000;
const S_IFIFO: u32 = 0o010000;

/// Strongly typed device serial
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for DeviceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Device state as reported by `get-state`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceState {
    Online,
    Offline,
    Disconnected,
    Unknown,
}

impl DeviceState {
    pub fn from_reply(s: &str) -> Self {
        match s.trim() {
            "device" => DeviceState::Online,
            "offline" => DeviceState::Offline,
            "" => DeviceState::Disconnected,
            _ => DeviceState::Unknown,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            DeviceState::Online => "online",
            DeviceState::Offline => "offline",
            DeviceState::Disconnected => "disconnected",
            DeviceState::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One line of `host:devices-l`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub serial: DeviceId,
    pub state: String,
    pub attrs: BTreeMap<String, String>,
}

impl DeviceInfo {
    /// Parse `serial state key:value key:value ...`. Lines with fewer than five
    /// fields are not device lines.
    pub fn parse(line: &str) -> Option<Self> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 5 {
            return None;
        }

        let attrs = fields[2..]
            .iter()
            .filter_map(|field| {
                let (key, value) = field.split_once(':')?;
                Some((key.to_string(), value.to_string()))
            })
            .collect();

        Some(Self {
            serial: DeviceId::new(fields[0]),
            state: fields[1].to_string(),
            attrs,
        })
    }
}

/// One line of `host:list-forward`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForwardEntry {
    pub serial: DeviceId,
    pub local: String,
    pub remote: String,
}

impl ForwardEntry {
    pub fn parse(line: &str) -> Option<Self> {
        let mut fields = line.split_whitespace();
        let (serial, local, remote) = (fields.next()?, fields.next()?, fields.next()?);
        Some(Self {
            serial: DeviceId::new(serial),
            local: local.to_string(),
            remote: remote.to_string(),
        })
    }
}

/// Raw `st_mode` bits reported by the sync protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct FileMode(u32);

impl FileMode {
    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub fn bits(&self) -> u32 {
        self.0
    }

    pub fn is_dir(&self) -> bool {
        (self.0 & S_IFMT) == S_IFDIR
    }

    pub fn is_file(&self) -> bool {
        (self.0 & S_IFMT) == S_IFREG
    }

    pub fn is_symlink(&self) -> bool {
        (self.0 & S_IFMT) == S_IFLNK
    }

    /// Permission bits only, e.g. `0o644`.
    pub fn permissions(&self) -> u32 {
        self.0 & 0o7777
    }

    pub fn file_type(&self) -> &'static str {
        match self.0 & S_IFMT {
            S_IFIFO => "fifo",
            S_IFCHR => "char",
            S_IFDIR => "directory",
            S_IFBLK => "block",
            S_IFREG => "file",
            S_IFLNK => "symlink",
            S_IFSOCK => "socket",
            _ => "unknown",
        }
    }

    fn type_char(&self) -> char {
        match self.0 & S_IFMT {
            S_IFIFO => 'p',
            S_IFCHR => 'c',
            S_IFDIR => 'd',
            S_IFBLK => 'b',
            S_IFREG => '-',
            S_IFLNK => 'l',
            S_IFSOCK => 's',
            _ => '?',
        }
    }

    fn triplet(bits: u32, special: bool, special_char: char) -> [char; 3] {
        let exec = bits & 1 != 0;
        [
            if bits & 4 != 0 { 'r' } else { '-' },
            if bits & 2 != 0 { 'w' } else { '-' },
            match (exec, special) {
                (false, false) => '-',
                (true, false) => 'x',
                (false, true) => special_char.to_ascii_uppercase(),
                (true, true) => special_char,
            },
        ]
    }
}

/// Renders like `ls -l`, e.g. `-rw-r--r--`.
impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = self.0;
        let owner = Self::triplet(mode >> 6, mode & 0o4000 != 0, 's');
        let group = Self::triplet(mode >> 3, mode & 0o2000 != 0, 's');
        let others = Self::triplet(mode, mode & 0o1000 != 0, 't');

        write!(f, "{}", self.type_char())?;
        for c in owner.iter().chain(group.iter()).chain(others.iter()) {
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}
