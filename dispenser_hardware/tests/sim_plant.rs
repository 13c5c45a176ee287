use std::sync::Arc;

use dispenser_hardware::error::HwError;
use dispenser_hardware::{SimConfig, SimulatedPlant};
use dispenser_traits::{Actuator, Direction, ManualClock, WeightSensor};
use rstest::rstest;

#[rstest]
#[case(10.0, 2_000, 20.0)]
#[case(50.0, 500, 25.0)]
#[case(0.5, 4_000, 2.0)]
fn delivered_mass_follows_rate_and_on_time(
    #[case] rate: f32,
    #[case] on_ms: u64,
    #[case] expected_g: f32,
) {
    let clock = ManualClock::new();
    let plant = SimulatedPlant::new(
        SimConfig {
            flow_rate_gps: rate,
            ..SimConfig::default()
        },
        Arc::new(clock.clone()),
    );
    let mut motor = plant.actuator();
    motor.enable(Direction::Reverse).unwrap();
    clock.advance_ms(on_ms);
    motor.disable().unwrap();
    assert!((plant.mass_g() - expected_g).abs() < 1e-3);
}

#[test]
fn pulsed_drive_accumulates_only_on_phases() {
    let clock = ManualClock::new();
    let plant = SimulatedPlant::new(SimConfig::default(), Arc::new(clock.clone()));
    let mut motor = plant.actuator();
    for _ in 0..5 {
        motor.enable(Direction::Forward).unwrap();
        clock.advance_ms(20);
        motor.disable().unwrap();
        clock.advance_ms(200);
    }
    assert_eq!(plant.on_time_ms(), 100);
    assert_eq!(plant.enable_count(), 5);
    assert!(!plant.is_running());
}

#[test]
fn scale_reads_material_added_after_tare() {
    let clock = ManualClock::new();
    let plant = SimulatedPlant::new(SimConfig::default(), Arc::new(clock.clone()));
    plant.preload_g(35.0);
    let mut scale = plant.scale();
    scale.begin_acquisition().unwrap();
    scale.request_tare().unwrap();
    clock.advance_ms(1_200);
    assert!(scale.poll_new_reading().unwrap());
    assert!(scale.tare_complete());

    let mut motor = plant.actuator();
    motor.enable(Direction::Forward).unwrap();
    clock.advance_ms(400);
    assert!(scale.poll_new_reading().unwrap());
    assert!((scale.current_reading() - 20.0).abs() < 1e-3);
    assert!((plant.dispensed_g() - 20.0).abs() < 1e-3);
}

#[test]
fn timeout_errors_say_timeout() {
    // The controller classifies gateway errors by this wording when it cannot downcast.
    for e in [HwError::Timeout, HwError::DataReadyTimeout] {
        assert!(e.to_string().to_lowercase().contains("timeout"));
    }
}
