use std::fmt;
use std::str::FromStr;

const BY_TIME_PREFIX: &str = "BY_TIME#";
const BY_COURSE_PREFIX: &str = "BY_COURSE#";
const ALL: &str = "ALL";

/// Longest BY_TIME window accepted. Wider windows should use ALL.
pub const MAX_BY_TIME_DAYS: u32 = 36_500;

/// Which legacy questions a migration run targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selection {
    /// Questions updated within the past `days` days.
    ByTime { days: u32 },
    /// Questions belonging to exactly this course id.
    ByCourse { course_id: String },
    All,
}

impl FromStr for Selection {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            anyhow::bail!("No migration target selected");
        }

        if let Some(days) = s.strip_prefix(BY_TIME_PREFIX) {
            let days: u32 = days
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid BY_TIME day count '{}': {}", days, e))?;
            if days > MAX_BY_TIME_DAYS {
                anyhow::bail!(
                    "BY_TIME day count {} exceeds the maximum of {}",
                    days,
                    MAX_BY_TIME_DAYS
                );
            }
            Ok(Selection::ByTime { days })
        } else if let Some(course_id) = s.strip_prefix(BY_COURSE_PREFIX) {
            if course_id.is_empty() {
                anyhow::bail!("BY_COURSE target requires a course id");
            }
            Ok(Selection::ByCourse {
                course_id: course_id.to_string(),
            })
        } else if s == ALL {
            Ok(Selection::All)
        } else {
            anyhow::bail!("Invalid migration target: {}", s)
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ByTime { days } => write!(f, "{}{}", BY_TIME_PREFIX, days),
            Self::ByCourse { course_id } => write!(f, "{}{}", BY_COURSE_PREFIX, course_id),
            Self::All => write!(f, "{}", ALL),
        }
    }
}
