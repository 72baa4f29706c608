//! Listing assembly and publication.
//!
//! A [`ListingDraft`] from the operator is validated once into a
//! [`ListingRequest`]; the [`ListingPublisher`] then creates the inventory
//! item, creates the offer and publishes it, stopping at the first failure.

pub mod defaults;
pub mod error;
pub mod images;
pub mod publisher;
pub mod request;

pub use {
    defaults::{DefaultsStore, ListingDefaults},
    error::{FailureDetail, PublishError, PublishStage, ValidationError},
    images::ImageHost,
    publisher::{ListingPublisher, PublishResult},
    request::{Condition, ListingDraft, ListingRequest, Price, derive_sku},
};
