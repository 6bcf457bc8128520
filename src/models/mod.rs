pub mod line_item;
pub mod metrics;

pub use line_item::{LineItem, LineItemId};
pub use metrics::NormalizedMetrics;
