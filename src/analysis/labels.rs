//! Symbolic label allocation.
//!
//! Every address in a [`TargetSets`] gets one label. When an address sits
//! in several sets the strongest kind wins: subroutine over jump over
//! local branch over data. Names are the kind prefix followed by four
//! upper-case hex digits, e.g. `sub_0800`.

use crate::types::{Address, TargetSets};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Kind of label, ordered by priority (lowest first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelKind {
    /// Addressed by a data read
    Data,
    /// Branch target
    Local,
    /// `JMP` target
    Jump,
    /// `JSR` target
    Subroutine,
}

impl LabelKind {
    /// Name prefix.
    pub const fn prefix(self) -> &'static str {
        match self {
            LabelKind::Data => "dat_",
            LabelKind::Local => "loc_",
            LabelKind::Jump => "jmp_",
            LabelKind::Subroutine => "sub_",
        }
    }
}

/// A named address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Label {
    /// Labelled address
    pub address: Address,
    /// Winning kind
    pub kind: LabelKind,
    /// Rendered name
    pub name: String,
}

impl Label {
    /// Label of `kind` at `address`.
    pub fn new(address: Address, kind: LabelKind) -> Self {
        Self {
            address,
            kind,
            name: format!("{}{:04X}", kind.prefix(), address),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Address to label mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelMap {
    labels: BTreeMap<Address, Label>,
}

impl LabelMap {
    /// Assign one label per address of `targets`.
    pub fn allocate(targets: &TargetSets) -> Self {
        let passes = [
            (LabelKind::Data, &targets.data_refs),
            (LabelKind::Local, &targets.branch_targets),
            (LabelKind::Jump, &targets.jump_targets),
            (LabelKind::Subroutine, &targets.subroutine_targets),
        ];

        // Later passes overwrite earlier ones.
        let mut labels = BTreeMap::new();
        for (kind, set) in passes {
            for &addr in set {
                labels.insert(addr, Label::new(addr, kind));
            }
        }
        Self { labels }
    }

    /// Label at `addr`.
    pub fn get(&self, addr: Address) -> Option<&Label> {
        self.labels.get(&addr)
    }

    /// Name of the label at `addr`.
    pub fn name(&self, addr: Address) -> Option<&str> {
        self.get(addr).map(|l| l.name.as_str())
    }

    /// Whether `addr` is labelled.
    pub fn contains(&self, addr: Address) -> bool {
        self.labels.contains_key(&addr)
    }

    /// Number of labels.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether there are no labels.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Labels in ascending address order.
    pub fn iter(&self) -> impl Iterator<Item = &Label> {
        self.labels.values()
    }

    /// Number of labels of `kind`.
    pub fn count_of(&self, kind: LabelKind) -> usize {
        self.labels.values().filter(|l| l.kind == kind).count()
    }
}
