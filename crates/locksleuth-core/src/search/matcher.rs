/// Target-name comparison.
use crate::kernel::ObjectName;

const SEPARATOR: u16 = b'\\' as u16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Exact,
    Prefix,
    /// The device itself or anything below it, so `HarddiskVolume5` never
    /// matches `HarddiskVolume50`.
    Volume,
}

/// The target path in UTF-16, compared code unit by code unit against
/// resolved object names.
#[derive(Debug, Clone)]
pub struct NameMatcher {
    target: Vec<u16>,
    mode: Mode,
}

impl NameMatcher {
    pub fn new(target: &str, partial: bool) -> Self {
        Self {
            target: target.encode_utf16().collect(),
            mode: if partial { Mode::Prefix } else { Mode::Exact },
        }
    }

    /// Match a volume device name and every path on that volume.
    pub fn volume(device: &str) -> Self {
        let mut target: Vec<u16> = device.encode_utf16().collect();
        while target.last() == Some(&SEPARATOR) {
            target.pop();
        }
        Self {
            target,
            mode: Mode::Volume,
        }
    }

    /// Target length in UTF-16 code units.
    pub fn len(&self) -> usize {
        self.target.len()
    }

    pub fn is_empty(&self) -> bool {
        self.target.is_empty()
    }

    /// Exact mode needs equal lengths; partial mode needs the name to be at
    /// least as long. Either way the target must be a prefix of the name.
    pub fn matches(&self, name: &ObjectName<'_>) -> bool {
        let len = self.target.len();
        let len_ok = match self.mode {
            Mode::Exact => name.len() == len,
            Mode::Prefix => name.len() >= len,
            Mode::Volume => {
                name.len() == len || (name.len() > len && name.units().nth(len) == Some(SEPARATOR))
            }
        };
        len_ok && name.starts_with(&self.target)
    }
}
