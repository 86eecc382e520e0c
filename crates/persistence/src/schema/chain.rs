//! The ordered view of a record type's schema versions.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::error::SchemaError;
use crate::types::RecordSchema;

/// Pointer and ordinal a newly published version receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainLink {
    /// The version the new one supersedes.
    pub previous_version: Option<Uuid>,
    /// The new version's 1-based ordinal.
    pub version: i64,
}

impl ChainLink {
    /// Computes the link for a version published after `current`.
    pub fn after(current: Option<&RecordSchema>) -> Self {
        match current {
            Some(head) => Self {
                previous_version: Some(head.uuid()),
                version: head.version() + 1,
            },
            None => Self {
                previous_version: None,
                version: 1,
            },
        }
    }
}

/// A record type's schema versions, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaVersionChain {
    record_type: Uuid,
    versions: Vec<RecordSchema>,
}

impl SchemaVersionChain {
    /// A chain with no versions.
    pub fn empty(record_type: Uuid) -> Self {
        Self {
            record_type,
            versions: Vec::new(),
        }
    }

    /// Orders stored versions by walking `next_version` pointers from the
    /// version that has no predecessor.
    ///
    /// Fails with [`SchemaError::CorruptChain`] if there is not exactly one
    /// first version, a pointer dangles, the walk revisits a version, or some
    /// versions are unreachable.
    pub fn from_versions(record_type: Uuid, versions: Vec<RecordSchema>) -> Result<Self, SchemaError> {
        if versions.is_empty() {
            return Ok(Self::empty(record_type));
        }
        let corrupt = |message: String| SchemaError::CorruptChain {
            record_type,
            message,
        };

        let roots: Vec<Uuid> = versions
            .iter()
            .filter(|v| v.previous_version().is_none())
            .map(RecordSchema::uuid)
            .collect();
        let [root] = roots[..] else {
            return Err(corrupt(format!(
                "expected one first version, found {}",
                roots.len()
            )));
        };

        let total = versions.len();
        let mut by_id: HashMap<Uuid, RecordSchema> =
            versions.into_iter().map(|v| (v.uuid(), v)).collect();
        let mut ordered = Vec::with_capacity(total);
        let mut seen = HashSet::new();
        let mut cursor = Some(root);

        while let Some(id) = cursor {
            if !seen.insert(id) {
                return Err(corrupt(format!("cycle at version {}", id)));
            }
            let version = by_id
                .remove(&id)
                .ok_or_else(|| corrupt(format!("dangling next_version {}", id)))?;
            cursor = version.next_version();
            ordered.push(version);
        }

        if ordered.len() != total {
            return Err(corrupt(format!(
                "{} versions unreachable from the first version",
                total - ordered.len()
            )));
        }

        Ok(Self {
            record_type,
            versions: ordered,
        })
    }

    /// Returns the record type.
    pub fn record_type(&self) -> Uuid {
        self.record_type
    }

    /// Returns the newest version.
    pub fn current(&self) -> Option<&RecordSchema> {
        self.versions.last()
    }

    /// Returns the link a newly published version would receive.
    pub fn next_link(&self) -> ChainLink {
        ChainLink::after(self.current())
    }

    /// Returns the versions, oldest first.
    pub fn versions(&self) -> &[RecordSchema] {
        &self.versions
    }

    /// Iterates versions, oldest first.
    pub fn iter(&self) -> std::slice::Iter<'_, RecordSchema> {
        self.versions.iter()
    }

    /// Returns the number of versions.
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    /// Returns true if nothing has been published.
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Checks the chain invariants: pointers are mutually consistent, exactly
    /// the newest version is a head, ordinals run 1..=n, and every version
    /// belongs to this record type.
    pub fn verify(&self) -> Result<(), SchemaError> {
        let corrupt = |message: String| SchemaError::CorruptChain {
            record_type: self.record_type,
            message,
        };

        let heads = self.versions.iter().filter(|v| v.is_current()).count();
        if !self.versions.is_empty() && heads != 1 {
            return Err(corrupt(format!("expected one current version, found {}", heads)));
        }

        for (index, version) in self.versions.iter().enumerate() {
            if version.record_type() != self.record_type {
                return Err(corrupt(format!(
                    "version {} belongs to record type {}",
                    version.uuid(),
                    version.record_type()
                )));
            }
            if version.version() != index as i64 + 1 {
                return Err(corrupt(format!(
                    "version {} has ordinal {}, expected {}",
                    version.uuid(),
                    version.version(),
                    index + 1
                )));
            }

            let expected_previous = index.checked_sub(1).map(|i| self.versions[i].uuid());
            let expected_next = self.versions.get(index + 1).map(RecordSchema::uuid);
            if version.previous_version() != expected_previous {
                return Err(corrupt(format!(
                    "version {} has previous_version {:?}, expected {:?}",
                    version.uuid(),
                    version.previous_version(),
                    expected_previous
                )));
            }
            if version.next_version() != expected_next {
                return Err(corrupt(format!(
                    "version {} has next_version {:?}, expected {:?}",
                    version.uuid(),
                    version.next_version(),
                    expected_next
                )));
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a SchemaVersionChain {
    type Item = &'a RecordSchema;
    type IntoIter = std::slice::Iter<'a, RecordSchema>;

    fn into_iter(self) -> Self::IntoIter {
        self.versions.iter()
    }
}
