//! Inter-extension dependency declarations and resolution.
//!
//! `DependencyReport` mirrors the teacher's `RelocationStats`: a plain
//! data struct produced by scanning a batch of results, with an
//! `all_satisfied`-style summary method, rather than failing fast on
//! the first problem.

use crate::error::{LefxError, LefxResult};
use crate::util::{read_fixed, write_fixed};

pub const DEP_NAME_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyType {
    Required,
    Optional,
    Conflict,
    Unknown(u8),
}

impl From<u8> for DependencyType {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Required,
            1 => Self::Optional,
            2 => Self::Conflict,
            other => Self::Unknown(other),
        }
    }
}

impl DependencyType {
    pub fn to_u8(self) -> u8 {
        match self {
            Self::Required => 0,
            Self::Optional => 1,
            Self::Conflict => 2,
            Self::Unknown(v) => v,
        }
    }
}

/// One declared dependency edge from an extension to another extension
/// identified by id.
#[derive(Debug, Clone, PartialEq)]
pub struct LefxDependency {
    pub id: u32,
    pub name: String,
    pub version_min: (u16, u16),
    pub version_max: (u16, u16),
    pub dep_type: DependencyType,
    /// Lower loads first. Ties are stable (declaration order).
    pub load_order: i32,
}

impl LefxDependency {
    /// 49-byte packed on-disk entry: `id`, a fixed-width name, both
    /// version bounds, the dependency type byte, and `load_order`.
    pub const SIZE: usize = 4 + DEP_NAME_LEN + 2 + 2 + 2 + 2 + 1 + 4;

    pub fn version_in_range(&self, version: (u16, u16)) -> bool {
        version >= self.version_min && version <= self.version_max
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::SIZE);
        buf.extend_from_slice(&self.id.to_le_bytes());
        write_fixed(&mut buf, &self.name, DEP_NAME_LEN);
        buf.extend_from_slice(&self.version_min.0.to_le_bytes());
        buf.extend_from_slice(&self.version_min.1.to_le_bytes());
        buf.extend_from_slice(&self.version_max.0.to_le_bytes());
        buf.extend_from_slice(&self.version_max.1.to_le_bytes());
        buf.push(self.dep_type.to_u8());
        buf.extend_from_slice(&self.load_order.to_le_bytes());
        debug_assert_eq!(buf.len(), Self::SIZE);
        buf
    }

    pub fn parse(data: &[u8]) -> LefxResult<Self> {
        if data.len() < Self::SIZE {
            return Err(LefxError::BufferTooSmall { needed: Self::SIZE, available: data.len() });
        }
        let mut cursor = 0usize;
        let mut take = |len: usize| {
            let slice = &data[cursor..cursor + len];
            cursor += len;
            slice
        };
        let id = u32::from_le_bytes(take(4).try_into().unwrap());
        let name = read_fixed(take(DEP_NAME_LEN));
        let version_min = (u16::from_le_bytes(take(2).try_into().unwrap()), u16::from_le_bytes(take(2).try_into().unwrap()));
        let version_max = (u16::from_le_bytes(take(2).try_into().unwrap()), u16::from_le_bytes(take(2).try_into().unwrap()));
        let dep_type = DependencyType::from(take(1)[0]);
        let load_order = i32::from_le_bytes(take(4).try_into().unwrap());
        Ok(Self { id, name, version_min, version_max, dep_type, load_order })
    }
}

/// Another extension's identity and activation state, as seen by the
/// dependency resolver. Deliberately minimal — the resolver only needs
/// id, version, active-ness, and load order, not the whole extension.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveExtensionInfo {
    pub id: u32,
    pub version: (u16, u16),
    pub active: bool,
    pub load_order: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyReport {
    pub missing_required: Vec<u32>,
    pub active_conflicts: Vec<u32>,
    pub load_order_violations: Vec<(u32, u32)>,
}

impl DependencyReport {
    pub fn is_satisfied(&self) -> bool {
        self.missing_required.is_empty() && self.active_conflicts.is_empty() && self.load_order_violations.is_empty()
    }
}

/// Checks `deps` (this extension's declared dependencies) against
/// `others` (every other extension currently registered, active or
/// not). A dependency resolves iff every `Required` id is present and
/// active with an in-range version, no `Conflict` id is active, and
/// every dependency with a strictly lower `load_order` than this
/// extension's own has already loaded (`own_load_order`).
pub fn resolve(deps: &[LefxDependency], others: &[ActiveExtensionInfo], own_load_order: i32) -> DependencyReport {
    let mut report = DependencyReport::default();
    for dep in deps {
        let found = others.iter().find(|o| o.id == dep.id);
        match dep.dep_type {
            DependencyType::Required | DependencyType::Unknown(_) => match found {
                Some(other) if other.active && dep.version_in_range(other.version) => {
                    if dep.load_order < own_load_order && other.load_order > own_load_order {
                        report.load_order_violations.push((dep.id, other.load_order as u32));
                    }
                }
                _ => report.missing_required.push(dep.id),
            },
            DependencyType::Optional => {
                if let Some(other) = found {
                    if other.active && dep.load_order < own_load_order && other.load_order > own_load_order {
                        report.load_order_violations.push((dep.id, other.load_order as u32));
                    }
                }
            }
            DependencyType::Conflict => {
                if let Some(other) = found {
                    if other.active {
                        report.active_conflicts.push(dep.id);
                    }
                }
            }
        }
    }
    report
}

/// Convenience wrapper: returns `Ok(())` if `report.is_satisfied()`,
/// otherwise a descriptive `DependencyUnsatisfied` error — the form
/// `apply_extension` actually wants to propagate.
pub fn require_satisfied(report: &DependencyReport) -> LefxResult<()> {
    if report.is_satisfied() {
        return Ok(());
    }
    let mut parts = Vec::new();
    if !report.missing_required.is_empty() {
        parts.push(format!("missing required: {:?}", report.missing_required));
    }
    if !report.active_conflicts.is_empty() {
        parts.push(format!("active conflicts: {:?}", report.active_conflicts));
    }
    if !report.load_order_violations.is_empty() {
        parts.push(format!("load order violations: {:?}", report.load_order_violations));
    }
    Err(LefxError::DependencyUnsatisfied(parts.join("; ")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dep(id: u32, dep_type: DependencyType, load_order: i32) -> LefxDependency {
        LefxDependency { id, name: format!("dep{id}"), version_min: (1, 0), version_max: (1, 9), dep_type, load_order }
    }

    #[test]
    fn missing_required_dependency_is_reported() {
        let deps = vec![dep(1, DependencyType::Required, 0)];
        let report = resolve(&deps, &[], 1);
        assert_eq!(report.missing_required, vec![1]);
        assert!(!report.is_satisfied());
    }

    #[test]
    fn active_conflict_is_reported() {
        let deps = vec![dep(2, DependencyType::Conflict, 0)];
        let others = vec![ActiveExtensionInfo { id: 2, version: (1, 0), active: true, load_order: 0 }];
        let report = resolve(&deps, &others, 1);
        assert_eq!(report.active_conflicts, vec![2]);
    }

    #[test]
    fn satisfied_required_dependency_passes() {
        let deps = vec![dep(3, DependencyType::Required, 0)];
        let others = vec![ActiveExtensionInfo { id: 3, version: (1, 2), active: true, load_order: 0 }];
        let report = resolve(&deps, &others, 1);
        assert!(report.is_satisfied());
        assert!(require_satisfied(&report).is_ok());
    }

    #[test]
    fn optional_dependency_absent_does_not_fail() {
        let deps = vec![dep(4, DependencyType::Optional, 0)];
        let report = resolve(&deps, &[], 1);
        assert!(report.is_satisfied());
    }
}
