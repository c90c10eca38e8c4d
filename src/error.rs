use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("rake pool must not be empty")]
    NoRakes,
    #[error("rake capacity must be > 0")]
    InvalidRakeCapacity,
    #[error("stockyards must not be empty")]
    NoStockyards,
    #[error("materials must not be empty")]
    NoMaterials,
    #[error("destinations must not be empty")]
    NoDestinations,
    #[error("duplicate stockyard name '{0}'")]
    DuplicateStockyard(String),
    #[error("loading capacity must be > 0 in '{0}'")]
    InvalidLoadingCapacity(String),
    #[error("invalid {name} range: min {min} > max {max}")]
    InvalidRange { name: &'static str, min: u64, max: u64 },
    #[error("quantity range must be > 0 (got {0})")]
    InvalidQuantity(u32),
    #[error("delay probability must be within 0..=1 (got {0})")]
    InvalidProbability(f64),
    #[error("cost rates must be >= 0 (got {0})")]
    InvalidCostRate(f64),
    #[error("speed must be > 0 (got {0})")]
    InvalidSpeed(f64),
    #[error("{0} must be > 0")]
    ZeroInterval(&'static str),
    #[error("unknown destination '{0}'")]
    UnknownDestination(String),
    #[error("{0}")]
    ConfigIo(String),
    #[error("{0}")]
    ConfigParse(String),
    #[error("unsupported config format '{0}'")]
    UnsupportedConfigFormat(String),
    #[error("{0}")]
    Cli(String),
    #[error("connection to '{url}' failed: {reason}")]
    Connect { url: String, reason: String },
    #[error("malformed frame: {0}")]
    MalformedFrame(String),
    #[error("retry policy requires at least one attempt")]
    NoAttempts,
}

pub type Result<T> = std::result::Result<T, Error>;
