pub use anyhow::{anyhow, Context, Error};
pub use chrono::prelude::*;
pub use log::{debug, error, info, warn};
pub use serde::{Deserialize, Serialize};

pub type Result<T = ()> = std::result::Result<T, Error>;
