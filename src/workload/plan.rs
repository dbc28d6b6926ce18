use std::sync::Arc;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use super::{Enumerator, ProxyTemplate};
use crate::domain::{Category, RequestDescriptor};

#[derive(Debug, Clone, Copy, ValueEnum, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PlanMode {
    /// Every category, each variant, `requests` times.
    PerCategory,
    /// `total` requests cycling through categories and variants.
    RoundRobin,
}

impl PlanMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            PlanMode::PerCategory => "per-category",
            PlanMode::RoundRobin => "round-robin",
        }
    }
}

/// Resolved enumeration settings. Query tables are indexed like `categories`.
#[derive(Debug, Clone)]
pub struct RequestPlan {
    pub mode: PlanMode,
    pub target: Arc<str>,
    pub categories: Vec<Category>,
    pub variants: Vec<Arc<str>>,
    /// Per category and variant in per-category mode; total in round-robin mode.
    pub count: u64,
    pub queries: Vec<Arc<[(String, String)]>>,
    pub proxy: Option<ProxyTemplate>,
}

impl RequestPlan {
    /// Number of descriptors the plan yields.
    #[must_use]
    pub fn planned(&self) -> u64 {
        match self.mode {
            PlanMode::PerCategory => {
                let categories = u64::try_from(self.categories.len()).unwrap_or(u64::MAX);
                categories
                    .saturating_mul(self.variant_slots())
                    .saturating_mul(self.count)
            }
            PlanMode::RoundRobin => {
                if self.categories.is_empty() {
                    0
                } else {
                    self.count
                }
            }
        }
    }

    #[must_use]
    pub fn into_descriptors(self) -> PlanIter {
        let planned = self.planned();
        PlanIter {
            plan: self,
            position: 0,
            planned,
        }
    }

    /// With no variants each category still gets one pass.
    fn variant_slots(&self) -> u64 {
        u64::try_from(self.variants.len()).unwrap_or(u64::MAX).max(1)
    }

    /// Maps a 0-based position to `(category slot, variant slot)`.
    fn slots(&self, position: u64) -> Option<(usize, Option<usize>)> {
        let categories = u64::try_from(self.categories.len()).ok()?;
        let variants = u64::try_from(self.variants.len()).ok()?;
        let (category_slot, variant_slot) = match self.mode {
            PlanMode::PerCategory => {
                let per_category = self.variant_slots().checked_mul(self.count)?;
                let category_slot = position.checked_div(per_category)?;
                let within = position.checked_rem(per_category)?;
                (category_slot, within.checked_div(self.count)?)
            }
            PlanMode::RoundRobin => (
                position.checked_rem(categories)?,
                position.checked_rem(variants).unwrap_or(0),
            ),
        };
        let category_slot = usize::try_from(category_slot).ok()?;
        let variant_slot = if variants == 0 {
            None
        } else {
            Some(usize::try_from(variant_slot).ok()?)
        };
        Some((category_slot, variant_slot))
    }

    fn descriptor_at(&self, position: u64) -> Option<RequestDescriptor> {
        let (category_slot, variant_slot) = self.slots(position)?;
        let category = self.categories.get(category_slot)?.clone();
        let variant = match variant_slot {
            Some(slot) => Some(Arc::clone(self.variants.get(slot)?)),
            None => None,
        };
        let query = self
            .queries
            .get(category_slot)
            .map_or_else(|| Arc::from(Vec::new()), Arc::clone);
        let proxy = self
            .proxy
            .as_ref()
            .map(|template| template.render(&category, variant.as_deref()));
        Some(RequestDescriptor {
            index: position.checked_add(1)?,
            category,
            target: Arc::clone(&self.target),
            query,
            proxy,
            variant,
        })
    }
}

/// Lazy descriptor sequence; nothing is materialized up front.
#[derive(Debug)]
pub struct PlanIter {
    plan: RequestPlan,
    position: u64,
    planned: u64,
}

impl Iterator for PlanIter {
    type Item = RequestDescriptor;

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.planned {
            return None;
        }
        let descriptor = self.plan.descriptor_at(self.position)?;
        self.position = self.position.saturating_add(1);
        Some(descriptor)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.planned.saturating_sub(self.position)).ok();
        (remaining.unwrap_or(usize::MAX), remaining)
    }
}

impl Enumerator for PlanIter {
    fn planned(&self) -> u64 {
        self.planned
    }
}
