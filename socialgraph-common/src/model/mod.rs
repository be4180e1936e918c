pub mod auth;
pub mod category;
pub mod comment;
pub mod message;
pub mod post;
pub mod reaction;
pub mod toggle;
pub mod user;

use crate::{model::reaction::InvalidPolarityError, util::InvalidTimestampError};
use derive_where::derive_where;
use std::{
    fmt::{Display, Formatter},
    marker::PhantomData,
    num::ParseIntError,
    str::FromStr,
};
use thiserror::Error;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum ModelValidationError {
    #[error(transparent)]
    Timestamp(#[from] InvalidTimestampError),
    #[error(transparent)]
    Polarity(#[from] InvalidPolarityError),
}

#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error("Invalid id {value:?}: {source}")]
pub struct InvalidIdError {
    pub value: String,
    pub source: ParseIntError,
}

/// Store-assigned integer key, tagged with the entity it belongs to.
#[derive_where(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<Marker>(i64, #[serde(skip)] PhantomData<Marker>);

impl<Marker> Id<Marker> {
    #[must_use]
    pub fn new(id: i64) -> Self {
        Self(id, PhantomData)
    }

    #[must_use]
    pub fn get(self) -> i64 {
        self.0
    }
}

impl<Marker> Display for Id<Marker> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<Marker> FromStr for Id<Marker> {
    type Err = InvalidIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        i64::from_str(s.trim())
            .map(Self::new)
            .map_err(|source| InvalidIdError {
                value: s.to_owned(),
                source,
            })
    }
}

impl<Marker> From<i64> for Id<Marker> {
    fn from(value: i64) -> Self {
        Id::new(value)
    }
}

impl<Marker> From<Id<Marker>> for i64 {
    fn from(value: Id<Marker>) -> Self {
        value.get()
    }
}
