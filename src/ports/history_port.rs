//! Trade history persistence port.

use crate::domain::error::AdaptraderError;
use crate::domain::trade::TradeRecord;

pub trait TradeHistoryPort {
    /// Every stored trade, oldest first.
    fn load_trades(&self) -> Result<Vec<TradeRecord>, AdaptraderError>;

    /// Validate and persist one closed trade. Invalid records are not written.
    fn append_trade(&self, trade: &TradeRecord) -> Result<(), AdaptraderError>;
}
