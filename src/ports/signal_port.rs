//! External signal collaborator port (ML direction, sentiment, news).

use crate::domain::error::AdaptraderError;
use crate::domain::external::ExternalInputs;

pub trait SignalPort {
    fn fetch(&self, symbol: &str) -> Result<ExternalInputs, AdaptraderError>;
}
