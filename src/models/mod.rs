//! Domain models for the feature toggle service.
//!
//! # Core Concepts
//!
//! - [`Feature`]: A toggle-able capability. Features form a forest via `parent_id`.
//! - [`Group`]: A partition of users with its own set of enabled features.
//!   Two protected groups always exist: `Default` (where new users land) and
//!   `Public` (used for anonymous callers, never a membership target).
//! - [`User`]: An external identity pinned to exactly one group.
//!
//! A feature is *effectively enabled* for a user when the feature and all of
//! its ancestors are enabled in the user's group.

mod feature;
mod group;
mod user;

pub use feature::*;
pub use group::*;
pub use user::*;
