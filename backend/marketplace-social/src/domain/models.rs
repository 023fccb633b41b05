use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Follow edge - a directed relationship `follower_id -> following_id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct FollowEdge {
    pub id: i64,
    pub follower_id: i64,
    pub following_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Public summary of a user appearing in a follower/following list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserSummary {
    pub id: i64,
    pub name: String,
    pub avatar_url: Option<String>,
    /// When the edge linking this user to the listed profile was created
    pub followed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowCounts {
    pub followers_count: i64,
    pub following_count: i64,
}

/// Relationship status of the viewer towards a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowStatus {
    pub is_following: bool,
    #[serde(flatten)]
    pub counts: FollowCounts,
}

/// Review entity - one per (author, ad)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Review {
    pub id: i64,
    pub author_id: i64,
    pub ad_id: i64,
    pub rating: i16,
    pub body: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Review as returned by listings: author name and reaction tallies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReviewView {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub review: Review,
    pub author_name: Option<String>,
    pub helpful_count: i64,
    pub not_helpful_count: i64,
}

/// Partial update of a review. `body: Some("")` clears the body.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ReviewPatch {
    pub rating: Option<i16>,
    pub body: Option<String>,
}

impl ReviewPatch {
    pub fn is_empty(&self) -> bool {
        self.rating.is_none() && self.body.is_none()
    }
}

/// Aggregate rating of an ad. `count == 0` implies `average == 0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingSummary {
    pub average: f64,
    pub count: i64,
}

impl RatingSummary {
    pub fn empty() -> Self {
        Self {
            average: 0.0,
            count: 0,
        }
    }

    pub fn from_total(sum: i64, count: i64) -> Self {
        if count == 0 {
            return Self::empty();
        }
        Self {
            average: sum as f64 / count as f64,
            count,
        }
    }
}

/// Closed set of reactions a user may leave on a review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReactionType {
    #[serde(rename = "helpful")]
    Helpful,
    #[serde(rename = "not-helpful", alias = "not_helpful")]
    NotHelpful,
}

impl ReactionType {
    pub const ALL: [ReactionType; 2] = [ReactionType::Helpful, ReactionType::NotHelpful];

    /// Wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionType::Helpful => "helpful",
            ReactionType::NotHelpful => "not-helpful",
        }
    }

    /// Representation stored in `ad_review_reactions.reaction_type`
    pub fn as_db_str(&self) -> &'static str {
        match self {
            ReactionType::Helpful => "helpful",
            ReactionType::NotHelpful => "not_helpful",
        }
    }
}

impl fmt::Display for ReactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownReactionType(pub String);

impl fmt::Display for UnknownReactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown reaction type '{}'", self.0)
    }
}

impl std::error::Error for UnknownReactionType {}

impl FromStr for ReactionType {
    type Err = UnknownReactionType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "helpful" => Ok(ReactionType::Helpful),
            "not-helpful" | "not_helpful" => Ok(ReactionType::NotHelpful),
            _ => Err(UnknownReactionType(s.to_string())),
        }
    }
}

impl TryFrom<String> for ReactionType {
    type Error = UnknownReactionType;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Reaction entity - at most one per (review, user)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Reaction {
    pub review_id: i64,
    pub user_id: i64,
    #[serde(rename = "type")]
    #[sqlx(try_from = "String")]
    pub reaction_type: ReactionType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
