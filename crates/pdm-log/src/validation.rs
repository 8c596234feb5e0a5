use std::collections::HashSet;

use pdm_types::{FileId, TrackedFile, VersionNumber, VersionRecord};

/// Result of history validation for one file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationReport {
    pub file_id: FileId,
    pub record_count: u64,
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    /// Returns `true` if all checks passed.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// A specific integrity violation detected during validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    pub version: VersionNumber,
    pub kind: ViolationKind,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViolationKind {
    /// A version number is missing between two neighbours.
    Gap,
    Duplicate,
    /// Records are not sorted newest first.
    OrderingBreak,
    /// The oldest record is not version 1.
    MissingFirstVersion,
    /// A record belongs to another file.
    ForeignRecord,
    /// The catalog head does not point at the newest record.
    HeadMismatch,
}

/// History integrity validator.
pub struct HistoryValidator;

impl HistoryValidator {
    /// Validate a newest-first version list as returned by
    /// [`VersionLog::list_versions`](crate::VersionLog::list_versions).
    pub fn validate(file_id: FileId, versions: &[VersionRecord]) -> ValidationReport {
        let mut violations = Vec::new();
        let mut seen = HashSet::new();

        for (index, record) in versions.iter().enumerate() {
            if record.file_id != file_id {
                violations.push(Violation {
                    version: record.version,
                    kind: ViolationKind::ForeignRecord,
                    description: format!("record belongs to file {}", record.file_id),
                });
            }

            if !seen.insert(record.version) {
                violations.push(Violation {
                    version: record.version,
                    kind: ViolationKind::Duplicate,
                    description: format!("{} appears more than once", record.version),
                });
                continue;
            }

            if let Some(newer) = index.checked_sub(1).map(|i| &versions[i]) {
                if record.version >= newer.version {
                    violations.push(Violation {
                        version: record.version,
                        kind: ViolationKind::OrderingBreak,
                        description: format!(
                            "{} listed after {}",
                            record.version, newer.version
                        ),
                    });
                } else if newer.version.get() - record.version.get() != 1 {
                    violations.push(Violation {
                        version: record.version,
                        kind: ViolationKind::Gap,
                        description: format!(
                            "expected {} after {}, found {}",
                            newer.version.get() - 1,
                            newer.version,
                            record.version
                        ),
                    });
                }
            }
        }

        if let Some(oldest) = versions.last() {
            if oldest.version != VersionNumber::FIRST {
                violations.push(Violation {
                    version: oldest.version,
                    kind: ViolationKind::MissingFirstVersion,
                    description: format!("history starts at {}", oldest.version),
                });
            }
        }

        ValidationReport {
            file_id,
            record_count: versions.len() as u64,
            violations,
        }
    }

    /// Validate the history and check that the catalog head matches it.
    pub fn validate_file(file: &TrackedFile, versions: &[VersionRecord]) -> ValidationReport {
        let mut report = Self::validate(file.id, versions);
        match versions.first() {
            Some(newest)
                if newest.version == file.head_version
                    && newest.content_hash == file.head_hash => {}
            Some(newest) => report.violations.push(Violation {
                version: file.head_version,
                kind: ViolationKind::HeadMismatch,
                description: format!(
                    "catalog head {} does not match newest record {}",
                    file.head_version, newest.version
                ),
            }),
            None => report.violations.push(Violation {
                version: file.head_version,
                kind: ViolationKind::HeadMismatch,
                description: "catalog has a head but the history is empty".into(),
            }),
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pdm_types::{ContentHash, LifecycleState, UserId};

    fn record(file_id: FileId, n: u32) -> VersionRecord {
        VersionRecord {
            file_id,
            version: VersionNumber::new(n).unwrap(),
            revision: "A".into(),
            lifecycle_state: LifecycleState::WorkInProgress,
            comment: String::new(),
            content_hash: ContentHash::of(&n.to_le_bytes()),
            size: 4,
            created_at: Utc::now(),
            author: UserId::new("alice").unwrap(),
        }
    }

    fn history(file_id: FileId, numbers: &[u32]) -> Vec<VersionRecord> {
        numbers.iter().map(|n| record(file_id, *n)).collect()
    }

    #[test]
    fn contiguous_history_is_valid() {
        let id = FileId::new();
        let report = HistoryValidator::validate(id, &history(id, &[3, 2, 1]));
        assert!(report.is_valid());
        assert_eq!(report.record_count, 3);
    }

    #[test]
    fn empty_history_is_valid() {
        assert!(HistoryValidator::validate(FileId::new(), &[]).is_valid());
    }

    #[test]
    fn gap_detected() {
        let id = FileId::new();
        let report = HistoryValidator::validate(id, &history(id, &[4, 2, 1]));
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].kind, ViolationKind::Gap);
    }

    #[test]
    fn duplicate_detected() {
        let id = FileId::new();
        let report = HistoryValidator::validate(id, &history(id, &[2, 2, 1]));
        assert!(report.violations.iter().any(|v| v.kind == ViolationKind::Duplicate));
    }

    #[test]
    fn ascending_order_is_a_break() {
        let id = FileId::new();
        let report = HistoryValidator::validate(id, &history(id, &[1, 2]));
        assert!(report.violations.iter().any(|v| v.kind == ViolationKind::OrderingBreak));
    }

    #[test]
    fn history_must_start_at_one() {
        let id = FileId::new();
        let report = HistoryValidator::validate(id, &history(id, &[3, 2]));
        assert_eq!(report.violations[0].kind, ViolationKind::MissingFirstVersion);
    }

    #[test]
    fn foreign_record_detected() {
        let id = FileId::new();
        let mut versions = history(id, &[2, 1]);
        versions[1].file_id = FileId::new();
        let report = HistoryValidator::validate(id, &versions);
        assert_eq!(report.violations[0].kind, ViolationKind::ForeignRecord);
    }

    #[test]
    fn head_mismatch_detected() {
        let id = FileId::new();
        let versions = history(id, &[2, 1]);
        let file = TrackedFile {
            id,
            local_path: "/tmp/x".into(),
            relative_path: "x".into(),
            head_version: VersionNumber::FIRST,
            head_hash: versions[1].content_hash,
            revision: "A".into(),
            lifecycle_state: LifecycleState::WorkInProgress,
            metadata: Default::default(),
            checked_out_by: None,
        };
        let report = HistoryValidator::validate_file(&file, &versions);
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].kind, ViolationKind::HeadMismatch);
    }
}
