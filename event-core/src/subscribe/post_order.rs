use std::fmt::{Display, Formatter};
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

/// Position of a subscriber in dispatch. Subscribers run from `First` to
/// `Last`; equal orders run in registration order.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostOrder {
    First,
    Early,
    #[default]
    Normal,
    Late,
    Last,
}

impl PostOrder {
    pub const ALL: [PostOrder; 5] = [
        PostOrder::First,
        PostOrder::Early,
        PostOrder::Normal,
        PostOrder::Late,
        PostOrder::Last,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PostOrder::First => "first",
            PostOrder::Early => "early",
            PostOrder::Normal => "normal",
            PostOrder::Late => "late",
            PostOrder::Last => "last",
        }
    }
}

impl Display for PostOrder {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PostOrder {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PostOrder::ALL
            .into_iter()
            .find(|order| order.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| anyhow!("unknown post order {}, expected one of first, early, normal, late, last", s))
    }
}
