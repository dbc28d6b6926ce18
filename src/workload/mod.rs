//! Descriptor enumeration: which requests a run issues, in which order.
mod plan;
mod proxy;
mod variants;


pub use plan::{PlanIter, PlanMode, RequestPlan};
pub use proxy::ProxyTemplate;
pub use variants::{parse_variants, read_variants};

use crate::domain::RequestDescriptor;

/// A finite, lazily produced sequence of descriptors.
pub trait Enumerator: Iterator<Item = RequestDescriptor> + Send {
    /// Number of descriptors the full sequence yields.
    fn planned(&self) -> u64;
}

impl Enumerator for std::vec::IntoIter<RequestDescriptor> {
    fn planned(&self) -> u64 {
        u64::try_from(self.len()).unwrap_or(u64::MAX)
    }
}
