//! Point-in-Polygon (PIP) border membership.
//!
//! Loads the national boundary, indexes its parts in an R-tree and
//! filters candidate points against it.

mod boundary;
mod filter;
mod index;

pub use boundary::{load_border, parse_border, BorderError, BorderPolygon, BoundarySource};
pub use filter::{FilterError, Membership, PointFilter, SeamRetry, DEFAULT_BUFFER_DEGREES};
pub use index::BorderIndex;

#[cfg(test)]
pub(crate) use index::tests::test_index;
