//! Wire DTOs for the exchange's REST surface. Deserialized as-received;
//! conversion into domain types happens in `rest::client` and the Registry.

use serde::Deserialize;

use crate::domain::{parse_rfc3339_micros, Instrument, InstrumentType, Status};

#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeStatus {
    pub exchange_active: bool,
    pub trading_active: bool,
    #[serde(default)]
    pub estimated_resume_time: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketDto {
    pub ticker: String,
    #[serde(default)]
    pub event_ticker: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "market_type", default)]
    pub market_type: Option<String>,
    pub status: String,
    #[serde(default)]
    pub open_time: Option<String>,
    #[serde(default)]
    pub close_time: Option<String>,
    #[serde(default)]
    pub expiration_time: Option<String>,
    #[serde(default)]
    pub result: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct MarketsPage {
    #[serde(default)]
    pub markets: Vec<MarketDto>,
    #[serde(default)]
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderbookResponse {
    pub orderbook: OrderbookLevels,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct OrderbookLevels {
    #[serde(default)]
    pub yes_dollars: Vec<(String, i64)>,
    #[serde(default)]
    pub no_dollars: Vec<(String, i64)>,
}

impl From<MarketDto> for Instrument {
    fn from(dto: MarketDto) -> Self {
        let instrument_type = match dto.market_type.as_deref() {
            Some("scalar") => InstrumentType::Scalar,
            _ => InstrumentType::Binary,
        };
        Self {
            ticker: dto.ticker,
            event_ticker: dto.event_ticker,
            title: dto.title,
            instrument_type,
            status: Status::parse(&dto.status),
            open_ts: parse_rfc3339_micros(dto.open_time.as_deref()),
            close_ts: parse_rfc3339_micros(dto.close_time.as_deref()),
            expiration_ts: parse_rfc3339_micros(dto.expiration_time.as_deref()),
            updated_at: crate::domain::micros_now(),
            result: dto.result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn market_dto_converts_to_instrument() {
        let dto = MarketDto {
            ticker: "FED-24DEC-T4.5".into(),
            event_ticker: "FED-24DEC".into(),
            title: "Fed funds rate".into(),
            market_type: Some("binary".into()),
            status: "active".into(),
            open_time: Some("2024-01-15T12:00:00Z".into()),
            close_time: None,
            expiration_time: None,
            result: None,
        };
        let instrument: Instrument = dto.into();
        assert_eq!(instrument.ticker, "FED-24DEC-T4.5");
        assert_eq!(instrument.status, Status::Active);
        assert_eq!(instrument.instrument_type, InstrumentType::Binary);
        assert_eq!(instrument.open_ts, 1_705_320_000_000_000);
    }
}
