//! # Spatial Index
//!
//! R-tree wrapper for point-in-lot queries. Envelope lookups via the `rstar`
//! crate narrow the candidates, then the exact `Contains` predicate from
//! `geo` decides membership.
//!
//! ## Table of Contents
//! 1. LotIndex — R-tree over lot envelopes
//! 2. IndexedLot — R-tree entry
//! 3. Query methods

use geo::BoundingRect;
use rstar::{RTree, RTreeObject, AABB};

use crate::vector_import::MitigationPolygon;

// ============================================================================
// 1. LotIndex — R-tree over lot envelopes
// ============================================================================

/// Immutable lot set plus an R-tree of lot bounding boxes (lon/lat).
/// Cheap to share behind an `Arc` across sessions.
#[derive(Debug, Default)]
pub struct LotIndex {
    lots: Vec<MitigationPolygon>,
    tree: RTree<IndexedLot>,
}

impl LotIndex {
    /// An index with no lots; every containment query returns false
    pub fn empty() -> Self {
        Self::default()
    }

    /// Bulk-load lots into the R-tree (much faster than individual inserts)
    pub fn bulk_load(lots: Vec<MitigationPolygon>) -> Self {
        let entries = lots
            .iter()
            .enumerate()
            .filter_map(|(slot, lot)| IndexedLot::new(slot, lot))
            .collect();
        Self {
            lots,
            tree: RTree::bulk_load(entries),
        }
    }

    /// Number of indexed lots
    pub fn len(&self) -> usize {
        self.lots.len()
    }

    /// Whether the index is empty
    pub fn is_empty(&self) -> bool {
        self.lots.is_empty()
    }

    pub fn lots(&self) -> &[MitigationPolygon] {
        &self.lots
    }
}

// ============================================================================
// 2. IndexedLot — R-tree entry
// ============================================================================

/// Bounding box of one lot, pointing back into `LotIndex::lots`
#[derive(Debug, Clone)]
struct IndexedLot {
    slot: usize,
    envelope: AABB<[f64; 2]>,
}

impl IndexedLot {
    fn new(slot: usize, lot: &MitigationPolygon) -> Option<Self> {
        let rect = lot.geometry.bounding_rect()?;
        Some(Self {
            slot,
            envelope: AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
        })
    }
}

impl RTreeObject for IndexedLot {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

// ============================================================================
// 3. Query methods
// ============================================================================

impl LotIndex {
    /// All lots whose interior contains `(lon, lat)`
    pub fn containing(&self, lon: f64, lat: f64) -> impl Iterator<Item = &MitigationPolygon> + '_ {
        let point_box = AABB::from_point([lon, lat]);
        self.tree
            .locate_in_envelope_intersecting(&point_box)
            .map(|entry| &self.lots[entry.slot])
            .filter(move |lot| lot.contains_lon_lat(lon, lat))
    }

    /// Whether any lot contains `(lon, lat)`
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        self.containing(lon, lat).next().is_some()
    }

    /// Lot count whose interior contains `(lon, lat)`
    pub fn match_count(&self, lon: f64, lat: f64) -> usize {
        self.containing(lon, lat).count()
    }
}
