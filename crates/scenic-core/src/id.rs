//! Object identity.
//!
//! Every scene object is named by an [`ObjectId`]. Ids are interned once in
//! a process-wide table and passed around as a 4-byte handle, so the
//! registry, the selection lists and every command can copy them freely.
//! The string form is what bags and replay scripts carry.

use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

static NAMES: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// Suffix counter shared by all generated ids.
static NEXT_SUFFIX: AtomicU64 = AtomicU64::new(0);

const ROOT: &str = "root";

/// Interned name of a scene object.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(Spur);

impl ObjectId {
    pub fn intern(name: &str) -> Self {
        ObjectId(NAMES.get_or_intern(name))
    }

    /// The group every scene starts with.
    pub fn root() -> Self {
        Self::intern(ROOT)
    }

    pub fn is_root(&self) -> bool {
        self.as_str() == ROOT
    }

    pub fn as_str(&self) -> &str {
        NAMES.resolve(&self.0)
    }

    /// A name nobody has used yet, shaped `<kind>_<n>` (`canvas_4`,
    /// `node_12`). Names interned by hand are never handed out.
    pub fn with_prefix(kind: &str) -> Self {
        loop {
            let n = NEXT_SUFFIX.fetch_add(1, Ordering::Relaxed);
            let name = format!("{kind}_{n}");
            if NAMES.get(&name).is_none() {
                return Self::intern(&name);
            }
        }
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.as_str())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ObjectId {
    fn from(name: &str) -> Self {
        Self::intern(name)
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = Cow::<'de, str>::deserialize(deserializer)?;
        Ok(ObjectId::intern(&name))
    }
}
