use serde::{Deserialize, Serialize};

/// Destination social platform a task is tagged for.
///
/// The allocation order used when dividing worker slots across platforms
/// (see `manager-core::allocation`) is [`Facebook`, `Instagram`, `TikTok`,
/// `Line`], matching the priority list the remainder slots are handed out
/// to; the rest of the variants only ever appear as task tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Facebook,
    Instagram,
    TikTok,
    Twitter,
    Line,
    YouTube,
    Threads,
    LinkedIn,
    Pinterest,
}

impl Platform {
    /// All platforms in a fixed, stable order.
    pub const ALL: [Platform; 9] = [
        Platform::Facebook,
        Platform::Instagram,
        Platform::TikTok,
        Platform::Twitter,
        Platform::Line,
        Platform::YouTube,
        Platform::Threads,
        Platform::LinkedIn,
        Platform::Pinterest,
    ];

    /// Priority order for handing out remainder worker slots during allocation.
    pub const REMAINDER_PRIORITY: [Platform; 4] = [
        Platform::Facebook,
        Platform::Instagram,
        Platform::TikTok,
        Platform::Line,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Facebook => "facebook",
            Platform::Instagram => "instagram",
            Platform::TikTok => "tiktok",
            Platform::Twitter => "twitter",
            Platform::Line => "line",
            Platform::YouTube => "youtube",
            Platform::Threads => "threads",
            Platform::LinkedIn => "linkedin",
            Platform::Pinterest => "pinterest",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown platform: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_str() {
        for p in Platform::ALL {
            let parsed: Platform = p.as_str().parse().unwrap();
            assert_eq!(parsed, p);
        }
    }

    #[test]
    fn remainder_priority_is_a_subset_of_all() {
        for p in Platform::REMAINDER_PRIORITY {
            assert!(Platform::ALL.contains(&p));
        }
    }
}
