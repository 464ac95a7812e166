//! Destructiveness tiers and safety levels.
//!
//! Every [`ChangeKind`] maps to a fixed [`Tier`]; the tier is never derived
//! from data (a dropped column is destructive whether or not it held rows).
//! A [`SafetyLevel`] then decides which tiers are rendered as executable SQL
//! and which are commented out.

use std::fmt;
use std::str::FromStr;

use crate::diff::{Change, ChangeKind};
use crate::error::DriftError;

/// How dangerous a change is to run against existing data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    /// Cannot fail on existing data and cannot lose rows.
    Safe,
    /// May fail at execution time if existing rows violate the new shape.
    Risky,
    /// Unconditionally discards data.
    Destructive,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Safe => write!(f, "safe"),
            Tier::Risky => write!(f, "risky"),
            Tier::Destructive => write!(f, "destructive"),
        }
    }
}

/// Classify a change kind.
pub fn classify(kind: ChangeKind) -> Tier {
    match kind {
        ChangeKind::CreateSchema
        | ChangeKind::CreateTable
        | ChangeKind::CreateSequence
        | ChangeKind::DropSequence
        | ChangeKind::CreateIndex
        | ChangeKind::DropIndex
        | ChangeKind::AddColumn
        | ChangeKind::DropNotNull
        | ChangeKind::DropConstraint => Tier::Safe,

        ChangeKind::AlterColumnType | ChangeKind::SetNotNull | ChangeKind::AddConstraint => {
            Tier::Risky
        }

        ChangeKind::DropSchema | ChangeKind::DropTable | ChangeKind::DropColumn => {
            Tier::Destructive
        }
    }
}

impl Change {
    /// Tier of this change.
    pub fn tier(&self) -> Tier {
        classify(self.kind())
    }
}

/// Rendering policy selected by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SafetyLevel {
    /// Execute everything.
    #[default]
    Drop,
    /// Execute safe and risky changes, comment out destructive ones.
    Warn,
    /// Execute only safe changes.
    Safe,
}

impl SafetyLevel {
    /// All levels, most permissive first.
    pub const ALL: [SafetyLevel; 3] = [SafetyLevel::Drop, SafetyLevel::Warn, SafetyLevel::Safe];

    /// Whether a change of this tier is emitted as an executable statement.
    pub fn executes(self, tier: Tier) -> bool {
        match self {
            SafetyLevel::Drop => true,
            SafetyLevel::Warn => tier <= Tier::Risky,
            SafetyLevel::Safe => tier == Tier::Safe,
        }
    }

    /// Lowercase name as accepted on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            SafetyLevel::Drop => "drop",
            SafetyLevel::Warn => "warn",
            SafetyLevel::Safe => "safe",
        }
    }
}

impl fmt::Display for SafetyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SafetyLevel {
    type Err = DriftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "drop" => Ok(SafetyLevel::Drop),
            "warn" => Ok(SafetyLevel::Warn),
            "safe" => Ok(SafetyLevel::Safe),
            other => Err(DriftError::config(format!(
                "invalid safety level '{}', expected one of: drop, warn, safe",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destructive_kinds() {
        assert_eq!(classify(ChangeKind::DropColumn), Tier::Destructive);
        assert_eq!(classify(ChangeKind::DropTable), Tier::Destructive);
        assert_eq!(classify(ChangeKind::DropSchema), Tier::Destructive);
    }

    #[test]
    fn test_risky_kinds() {
        assert_eq!(classify(ChangeKind::AlterColumnType), Tier::Risky);
        assert_eq!(classify(ChangeKind::SetNotNull), Tier::Risky);
        assert_eq!(classify(ChangeKind::AddConstraint), Tier::Risky);
    }

    #[test]
    fn test_index_changes_are_always_safe() {
        assert_eq!(classify(ChangeKind::DropIndex), Tier::Safe);
        assert_eq!(classify(ChangeKind::CreateIndex), Tier::Safe);
    }

    #[test]
    fn test_add_column_is_safe_whatever_its_nullability() {
        assert_eq!(classify(ChangeKind::AddColumn), Tier::Safe);
        assert!(SafetyLevel::Safe.executes(classify(ChangeKind::AddColumn)));
    }

    #[test]
    fn test_level_policy() {
        assert!(SafetyLevel::Drop.executes(Tier::Destructive));
        assert!(!SafetyLevel::Warn.executes(Tier::Destructive));
        assert!(SafetyLevel::Warn.executes(Tier::Risky));
        assert!(!SafetyLevel::Safe.executes(Tier::Risky));
        assert!(SafetyLevel::Safe.executes(Tier::Safe));
    }

    #[test]
    fn test_levels_are_monotonic() {
        for kind in ChangeKind::ALL {
            let tier = classify(kind);
            if SafetyLevel::Safe.executes(tier) {
                assert!(SafetyLevel::Warn.executes(tier), "{kind}");
            }
            if SafetyLevel::Warn.executes(tier) {
                assert!(SafetyLevel::Drop.executes(tier), "{kind}");
            }
        }
    }

    #[test]
    fn test_parse_level() {
        assert_eq!("drop".parse::<SafetyLevel>().unwrap(), SafetyLevel::Drop);
        assert_eq!("WARN".parse::<SafetyLevel>().unwrap(), SafetyLevel::Warn);
        assert_eq!(SafetyLevel::default(), SafetyLevel::Drop);
        assert!("yolo".parse::<SafetyLevel>().is_err());
    }
}
