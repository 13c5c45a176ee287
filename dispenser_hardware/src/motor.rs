//! H-bridge motor: two direction inputs and an optional enable line.

use dispenser_traits::Direction;

/// Logic levels for the bridge inputs (`fwd`, `rev`, `en`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeLevels {
    pub fwd: bool,
    pub rev: bool,
    pub en: bool,
}

/// Levels that drive the motor in `direction`, or brake it when `None`.
pub const fn bridge_levels(direction: Option<Direction>) -> BridgeLevels {
    match direction {
        Some(Direction::Forward) => BridgeLevels {
            fwd: true,
            rev: false,
            en: true,
        },
        Some(Direction::Reverse) => BridgeLevels {
            fwd: false,
            rev: true,
            en: true,
        },
        None => BridgeLevels {
            fwd: false,
            rev: false,
            en: false,
        },
    }
}

#[cfg(feature = "hardware")]
pub use driver::HBridgeMotor;

#[cfg(feature = "hardware")]
mod driver {
    use dispenser_traits::{Actuator, Direction, GatewayError};
    use rppal::gpio::{Gpio, OutputPin};

    use super::bridge_levels;
    use crate::error::Result;

    pub struct HBridgeMotor {
        fwd: OutputPin,
        rev: OutputPin,
        en: Option<OutputPin>,
    }

    impl HBridgeMotor {
        pub fn new(gpio: &Gpio, fwd_pin: u8, rev_pin: u8, en_pin: Option<u8>) -> Result<Self> {
            let mut fwd = gpio.get(fwd_pin)?.into_output();
            let mut rev = gpio.get(rev_pin)?.into_output();
            fwd.set_low();
            rev.set_low();
            let en = match en_pin {
                Some(p) => {
                    let mut pin = gpio.get(p)?.into_output();
                    pin.set_low();
                    Some(pin)
                }
                None => None,
            };
            Ok(Self { fwd, rev, en })
        }

        fn apply(&mut self, direction: Option<Direction>) {
            let lv = bridge_levels(direction);
            // Drop both inputs first so the bridge never sees fwd and rev high together.
            self.fwd.set_low();
            self.rev.set_low();
            if lv.fwd {
                self.fwd.set_high();
            }
            if lv.rev {
                self.rev.set_high();
            }
            if let Some(en) = self.en.as_mut() {
                if lv.en {
                    en.set_high();
                } else {
                    en.set_low();
                }
            }
        }
    }

    impl Actuator for HBridgeMotor {
        fn enable(&mut self, direction: Direction) -> std::result::Result<(), GatewayError> {
            self.apply(Some(direction));
            Ok(())
        }

        fn disable(&mut self) -> std::result::Result<(), GatewayError> {
            self.apply(None);
            Ok(())
        }
    }

    impl Drop for HBridgeMotor {
        fn drop(&mut self) {
            self.apply(None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directions_never_drive_both_inputs() {
        for d in [Some(Direction::Forward), Some(Direction::Reverse), None] {
            let lv = bridge_levels(d);
            assert!(!(lv.fwd && lv.rev));
            assert_eq!(lv.en, d.is_some());
        }
    }
}
