use crate::model::{Id, post::PostMarker, user::UserMarker};
use serde::{Serialize, Serializer};
use thiserror::Error;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct ReactionMarker;

/// Sign of a like/dislike row.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum Polarity {
    Like,
    Dislike,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
#[error("A reaction value must be 1 or -1, got {0}")]
pub struct InvalidPolarityError(pub i16);

impl Polarity {
    #[must_use]
    pub fn value(self) -> i16 {
        match self {
            Polarity::Like => 1,
            Polarity::Dislike => -1,
        }
    }
}

impl TryFrom<i16> for Polarity {
    type Error = InvalidPolarityError;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Polarity::Like),
            -1 => Ok(Polarity::Dislike),
            other => Err(InvalidPolarityError(other)),
        }
    }
}

impl Serialize for Polarity {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i16(self.value())
    }
}

/// One user's like or dislike on one post.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct Reaction {
    #[serde(rename = "idLikeDislike")]
    pub id: Id<ReactionMarker>,
    #[serde(rename = "idPost")]
    pub post: Id<PostMarker>,
    #[serde(rename = "idUser")]
    pub user: Id<UserMarker>,
    #[serde(rename = "like")]
    pub polarity: Polarity,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
pub struct ReactionCounts {
    pub likes: i64,
    pub dislikes: i64,
}

#[cfg(test)]
mod tests {
    use super::{InvalidPolarityError, Polarity};

    #[test]
    fn polarity_round_trips_through_stored_value() {
        for polarity in [Polarity::Like, Polarity::Dislike] {
            assert_eq!(Polarity::try_from(polarity.value()), Ok(polarity));
        }
    }

    #[test]
    fn only_plus_and_minus_one_are_valid() {
        assert_eq!(Polarity::try_from(0), Err(InvalidPolarityError(0)));
        assert_eq!(Polarity::try_from(2), Err(InvalidPolarityError(2)));
    }

    #[test]
    fn serializes_as_signed_integer() {
        assert_eq!(serde_json::to_string(&Polarity::Dislike).unwrap(), "-1");
    }
}
