pub mod auth;
pub mod community;
pub mod post;
pub mod user;

use crate::{
    model::{
        community::InvalidCommunityNameError,
        user::{InvalidEmailAddressError, InvalidRoleError},
    },
    snowflake::{Epoch, Snowflake, SnowflakeGenerator},
};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, marker::PhantomData};
use thiserror::Error;
use time::{UtcDateTime, macros::utc_datetime};

#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum ModelValidationError {
    #[error(transparent)]
    EmailAddress(#[from] InvalidEmailAddressError),
    #[error(transparent)]
    Role(#[from] InvalidRoleError),
    #[error(transparent)]
    CommunityName(#[from] InvalidCommunityNameError),
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct BlognestEpoch;
impl Epoch for BlognestEpoch {
    const EPOCH_TIME: UtcDateTime = utc_datetime!(2024-01-01 00:00);
}

pub type BlognestSnowflake = Snowflake<BlognestEpoch>;
pub type BlognestSnowflakeGenerator = SnowflakeGenerator<BlognestEpoch>;

#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Id<Marker>(BlognestSnowflake, #[serde(skip)] PhantomData<Marker>);

impl<Marker> Id<Marker> {
    #[must_use]
    pub fn new(snowflake: BlognestSnowflake) -> Self {
        Self(snowflake, PhantomData)
    }

    #[must_use]
    pub fn snowflake(self) -> BlognestSnowflake {
        self.0
    }

    /// The creation time embedded in the id.
    #[must_use]
    pub fn created_at(self) -> UtcDateTime {
        self.0.timestamp().into()
    }

    #[must_use]
    pub fn created_at_unix(self) -> i64 {
        self.created_at().unix_timestamp()
    }
}

impl<Marker> Display for Id<Marker> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<Marker> From<BlognestSnowflake> for Id<Marker> {
    fn from(value: BlognestSnowflake) -> Self {
        Self::new(value)
    }
}

impl<Marker> From<Id<Marker>> for BlognestSnowflake {
    fn from(value: Id<Marker>) -> Self {
        value.0
    }
}

impl<Marker> From<u64> for Id<Marker> {
    fn from(value: u64) -> Self {
        Id::new(BlognestSnowflake::new(value))
    }
}

impl<Marker> From<Id<Marker>> for u64 {
    fn from(value: Id<Marker>) -> Self {
        value.snowflake().get()
    }
}
