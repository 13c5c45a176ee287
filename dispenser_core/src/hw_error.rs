//! Maps `Box<dyn Error>` from gateway boundaries to typed `DispenserError`.
//!
//! The traits in `dispenser_traits` use `Box<dyn Error + Send + Sync>` so any
//! driver can plug in; this module converts those to our typed error enum, with
//! an optional feature-gated path for `dispenser_hardware::HwError` downcasting.

use crate::error::DispenserError;

/// Map a gateway error to a typed `DispenserError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> DispenserError {
    #[cfg(feature = "hardware-errors")]
    {
        use dispenser_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::Timeout | HwError::DataReadyTimeout => DispenserError::Timeout,
                other => DispenserError::HardwareFault(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        DispenserError::Timeout
    } else {
        DispenserError::Hardware(s)
    }
}

/// Convert a boxed gateway error into an `eyre::Report` carrying a typed cause.
#[inline]
pub(crate) fn report(e: dispenser_traits::GatewayError) -> eyre::Report {
    eyre::Report::new(map_hw_error(&*e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_text_maps_to_timeout() {
        let e: Box<dyn std::error::Error + Send + Sync> = "hx711 read timeout".into();
        assert_eq!(map_hw_error(&*e), DispenserError::Timeout);
    }

    #[test]
    fn other_text_maps_to_hardware() {
        let e: Box<dyn std::error::Error + Send + Sync> = "gpio busy".into();
        assert_eq!(
            map_hw_error(&*e),
            DispenserError::Hardware("gpio busy".into())
        );
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn typed_hw_errors_are_downcast() {
        use dispenser_hardware::error::HwError;
        let e: Box<dyn std::error::Error + Send + Sync> = Box::new(HwError::DataReadyTimeout);
        assert_eq!(map_hw_error(&*e), DispenserError::Timeout);
        let e: Box<dyn std::error::Error + Send + Sync> = Box::new(HwError::Gpio("pin 5".into()));
        assert!(matches!(map_hw_error(&*e), DispenserError::HardwareFault(_)));
    }
}
