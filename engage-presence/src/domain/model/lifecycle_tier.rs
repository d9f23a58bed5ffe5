use serde::{Deserialize, Serialize};
use std::fmt;

/// 访客生命周期层级
///
/// 只能单向前进，允许的迁移见 `ALLOWED_TRANSITIONS`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleTier {
    Anon,
    Engaged,
    Lead,
    Converted,
}

const ALLOWED_TRANSITIONS: &[(LifecycleTier, LifecycleTier)] = &[
    (LifecycleTier::Anon, LifecycleTier::Engaged),
    (LifecycleTier::Anon, LifecycleTier::Lead),
    (LifecycleTier::Anon, LifecycleTier::Converted),
    (LifecycleTier::Engaged, LifecycleTier::Lead),
    (LifecycleTier::Engaged, LifecycleTier::Converted),
    (LifecycleTier::Lead, LifecycleTier::Converted),
];

impl LifecycleTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleTier::Anon => "anon",
            LifecycleTier::Engaged => "engaged",
            LifecycleTier::Lead => "lead",
            LifecycleTier::Converted => "converted",
        }
    }

    pub fn can_transition_to(&self, next: LifecycleTier) -> bool {
        ALLOWED_TRANSITIONS.contains(&(*self, next))
    }
}

impl fmt::Display for LifecycleTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
