//! Configuration structures for the compacting index.

use crate::error::{Result, StrataError};
use serde::{Deserialize, Serialize};

/// Default page size used to derive node fanouts.
pub const DEFAULT_PAGE_SIZE: usize = 512;

/// Lower bound for derived fanouts.
pub const MIN_DERIVED_ORDER: usize = 8;

/// Smallest fanout accepted for explicitly configured orders.
pub const MIN_ORDER: usize = 4;

/// Configuration for a compacting index.
///
/// Node fanouts are either set explicitly or derived from `page_size` and the
/// in-memory sizes of the key and value types, so that one node roughly fills
/// one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Page size in bytes used to derive fanouts.
    pub page_size: usize,
    /// Maximum children per inner node. Derived from `page_size` when unset.
    pub inner_order: Option<usize>,
    /// Maximum entries per leaf node. Derived from `page_size` when unset.
    pub leaf_order: Option<usize>,
    /// Compaction trigger policy.
    pub compaction: CompactionConfig,
    /// Bloom filter gating lookups into the dynamic stage.
    pub bloom: BloomConfig,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            inner_order: None,
            leaf_order: None,
            compaction: CompactionConfig::default(),
            bloom: BloomConfig::default(),
        }
    }
}

impl IndexConfig {
    /// Sets both fanouts explicitly.
    pub fn with_orders(mut self, inner_order: usize, leaf_order: usize) -> Self {
        self.inner_order = Some(inner_order);
        self.leaf_order = Some(leaf_order);
        self
    }

    /// Sets the compaction threshold and ratio.
    pub fn with_compaction(mut self, threshold: usize, ratio: usize) -> Self {
        self.compaction.threshold = threshold;
        self.compaction.ratio = ratio;
        self
    }

    /// Returns the inner fanout for keys of type `K`.
    pub fn inner_order_for<K>(&self) -> usize {
        self.inner_order.unwrap_or_else(|| {
            let slot = std::mem::size_of::<K>() + std::mem::size_of::<usize>();
            (self.page_size / slot.max(1)).max(MIN_DERIVED_ORDER)
        })
    }

    /// Returns the leaf fanout for entries of `K` and `V`.
    pub fn leaf_order_for<K, V>(&self) -> usize {
        self.leaf_order.unwrap_or_else(|| {
            let slot = std::mem::size_of::<K>() + std::mem::size_of::<V>();
            (self.page_size / slot.max(1)).max(MIN_DERIVED_ORDER)
        })
    }

    /// Checks every parameter, returning the first invalid one.
    pub fn validate(&self) -> Result<()> {
        if (self.inner_order.is_none() || self.leaf_order.is_none()) && self.page_size == 0 {
            return Err(StrataError::ConfigError(
                "page_size must be non-zero when a fanout is derived from it".to_string(),
            ));
        }
        if let Some(order) = self.inner_order {
            if order < MIN_ORDER {
                return Err(StrataError::invalid_parameter("inner_order", order));
            }
        }
        if let Some(order) = self.leaf_order {
            if order < MIN_ORDER {
                return Err(StrataError::invalid_parameter("leaf_order", order));
            }
        }
        self.compaction.validate()?;
        self.bloom.validate()
    }
}

/// Policy deciding when the dynamic stage is folded into the static stage.
///
/// A compaction fires before a write once
/// `dynamic_len * ratio >= static_len && dynamic_len >= threshold`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompactionConfig {
    /// Run compactions automatically on the write path.
    pub auto_compact: bool,
    /// Minimum dynamic stage size before compaction is considered.
    pub threshold: usize,
    /// Static-to-dynamic size ratio at which compaction fires.
    pub ratio: usize,
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self {
            auto_compact: true,
            threshold: 100,
            ratio: 10,
        }
    }
}

impl CompactionConfig {
    fn validate(&self) -> Result<()> {
        if self.ratio == 0 {
            return Err(StrataError::invalid_parameter("compaction.ratio", self.ratio));
        }
        Ok(())
    }

    /// Returns true when a dynamic stage of `dynamic_len` entries should be
    /// merged into a static stage of `static_len` entries.
    #[inline]
    pub fn should_compact(&self, dynamic_len: usize, static_len: usize) -> bool {
        self.auto_compact
            && dynamic_len.saturating_mul(self.ratio) >= static_len
            && dynamic_len >= self.threshold
    }
}

/// Bloom filter sizing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BloomConfig {
    /// Consult the filter before searching the dynamic stage.
    pub enabled: bool,
    /// Bits reserved per expected key.
    pub bits_per_key: usize,
    /// Number of probe positions per key.
    pub num_probes: usize,
}

impl Default for BloomConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bits_per_key: 8,
            num_probes: 2,
        }
    }
}

impl BloomConfig {
    fn validate(&self) -> Result<()> {
        if self.bits_per_key == 0 {
            return Err(StrataError::invalid_parameter(
                "bloom.bits_per_key",
                self.bits_per_key,
            ));
        }
        if self.num_probes == 0 {
            return Err(StrataError::invalid_parameter(
                "bloom.num_probes",
                self.num_probes,
            ));
        }
        Ok(())
    }
}
