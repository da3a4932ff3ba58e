mod money;

pub use money::{Cents, CentsConversionError, DEFAULT_CURRENCY_CODE};
