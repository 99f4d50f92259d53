//! Electricity markets and the policy instruments attached to them.

use crate::series::Trend;
use crate::{MarketId, NodeId, TechnologyId, ZoneId};
use serde::{Deserialize, Serialize};

/// One block of the load-duration curve.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Load in MW at demand index 1.0.
    pub base_load_mw: f64,
    /// Duration of the block in hours per tick.
    pub length_hours: f64,
}

/// A zone's electricity spot market.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Market {
    pub id: MarketId,
    pub zone: ZoneId,
    /// Grid node new plants in this market are connected to.
    pub node: NodeId,
    /// Segments ordered from peak to base.
    pub load_duration_curve: Vec<Segment>,
    /// Price paid when supply cannot cover load.
    pub value_of_lost_load: f64,
    /// National minimum CO2 price.
    #[serde(default)]
    pub co2_price_floor: Option<Trend>,
}

/// Policy-driven minimum installed capacity of a technology in a market.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CapacityTarget {
    pub market: MarketId,
    pub technology: TechnologyId,
    /// Target capacity in MW.
    pub trend: Trend,
}

/// Upper bound on the capacity of a technology at a grid node.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeCapacityLimit {
    pub node: NodeId,
    pub technology: TechnologyId,
    /// Limit in MW.
    pub upper_limit: Trend,
}

/// Capacity held back by a reserve operator and released at a fixed price.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StrategicReserve {
    pub zone: ZoneId,
    pub reserve_price: f64,
    pub reserve_volume_mw: f64,
}
