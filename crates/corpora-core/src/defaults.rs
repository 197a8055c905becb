//! Centralized default constants for the Corpora client.
//!
//! **This module is the single source of truth** for shared default values.
//! Crates reference these constants instead of defining their own magic
//! numbers. Organized by domain area.

// =============================================================================
// HTTP
// =============================================================================

/// Default API base URL.
pub const BASE_URL: &str = "http://127.0.0.1:8000";

/// Default timeout for a single API request in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Upper bound on pages followed by a single spool operation.
pub const SPOOL_MAX_PAGES: usize = 1_000;

// =============================================================================
// GRAPH EXPLORER
// =============================================================================

/// Per-type page sizes selectable for network-neighborhood requests.
pub const PER_TYPE_LIMITS: [u32; 5] = [5, 10, 20, 40, 80];

/// Default per-type page size for sprawls.
pub const PER_TYPE_LIMIT: u32 = 20;

/// Maximum number of resprawl attempts when a sprawl adds nothing but
/// cached metadata reports unplotted neighbors.
pub const MAX_RESPRAWLS: u32 = 10;

/// Deadline for one sprawl's network-neighborhood request in seconds.
pub const SPRAWL_TIMEOUT_SECS: u64 = 60;

/// Thinnest edge drawn for a collapsed relationship.
pub const MIN_LINK_THICKNESS: f64 = 1.0;

/// Thickest edge drawn for a collapsed relationship.
pub const MAX_LINK_THICKNESS: f64 = 8.0;

/// Thickness used when every edge of a collapsed relationship has the same
/// frequency (min-max range is empty).
pub const DEFAULT_LINK_THICKNESS: f64 = MIN_LINK_THICKNESS;

/// Cap on node mass derived from incident edges.
pub const MAX_NODE_MASS: f64 = 10.0;

/// Characters kept by the truncated label display mode.
pub const LABEL_TRUNCATE_CHARS: usize = 20;

// =============================================================================
// CONTENT TABLE
// =============================================================================

/// Default page size for content table listings.
pub const PAGE_SIZE: u32 = 50;

/// Pages loaded before the table switches to accelerated page size.
pub const ACCELERATE_AFTER_PAGES: usize = 3;

/// Page size multiplier applied once acceleration kicks in.
pub const ACCELERATION_FACTOR: u32 = 10;

// =============================================================================
// FILE UPLOAD
// =============================================================================

/// Chunk size for the chunked upload protocol (5 MB).
pub const UPLOAD_CHUNK_SIZE: usize = 5 * 1024 * 1024;

// =============================================================================
// EVENTS
// =============================================================================

/// Default push-event relay broadcast capacity.
pub const EVENT_RELAY_CAPACITY: usize = 256;

// =============================================================================
// MAPS
// =============================================================================

/// OpenStreetMap tile URL template.
pub const OSM_TILE_URL: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";

/// Default map zoom for geo point editors.
pub const MAP_ZOOM: u8 = 13;
