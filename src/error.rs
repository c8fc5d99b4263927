use derive_more::{Display, Error};

#[derive(Debug, Display, Error)]
pub enum ConfigError {
    #[display("failed to read config file")]
    ReadFile,
    #[display("failed to parse config: {reason}")]
    Parse { reason: String },
    #[display("invalid config: {field}")]
    Validation { field: String },
    #[display("failed to serialize config")]
    Serialize,
}

#[derive(Debug, Display, Error)]
pub enum IndicatorError {
    #[display("invalid parameter: {name}")]
    InvalidParameter { name: String },
}

#[derive(Debug, Display, Error)]
pub enum RegistryError {
    #[display("unknown indicator: {id}")]
    UnknownIndicator { id: String },
    #[display("invalid parameters for {id}")]
    InvalidParameters { id: String },
}

#[derive(Debug, Display, Error)]
pub enum CandleError {
    #[display("candle times must be strictly increasing (index {index})")]
    NotIncreasing { index: usize },
    #[display("candle at {time} is older than the last bar at {last}")]
    Stale { time: i64, last: i64 },
}

#[derive(Debug, Display, Error)]
pub enum LifecycleError {
    #[display("unknown indicator: {id}")]
    UnknownIndicator { id: String },
    #[display("panel capacity exceeded (max {max})")]
    CapacityExceeded { max: usize },
    #[display("invalid parameters for {id}")]
    InvalidParameters { id: String },
    #[display("invalid candle data")]
    InvalidCandles,
    #[display("malformed indicator configuration")]
    MalformedConfiguration,
}
