#![cfg(not(feature = "async"))]

use core::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::ErrorKind;
use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction};
use lidar_lite::{Error, Health, HealthDetail, LidarLite, Status, Version, INFINITE_ACQUISITIONS};

const ADDR: u8 = 0x62;

const READY: u8 = 0b0010_0000;
const BUSY: u8 = 0b0010_0001;

/// Delay provider that records every requested delay in microseconds.
#[derive(Default)]
struct RecordingDelay {
    delays_us: Vec<u32>,
}

impl DelayNs for RecordingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.delays_us.push(ns / 1_000);
    }

    fn delay_us(&mut self, us: u32) {
        self.delays_us.push(us);
    }
}

fn status(value: u8) -> Transaction {
    Transaction::write_read(ADDR, vec![0x01], vec![value])
}

fn read(reg: u8, value: u8) -> Transaction {
    Transaction::write_read(ADDR, vec![reg], vec![value])
}

fn read_word(reg: u8, value: u16) -> Transaction {
    Transaction::write_read(ADDR, vec![reg], value.to_be_bytes().to_vec())
}

fn write(reg: u8, value: u8) -> Transaction {
    Transaction::write(ADDR, vec![reg, value])
}

fn lidar(expectations: &[Transaction]) -> LidarLite<I2cMock, RecordingDelay> {
    LidarLite::new(I2cMock::new(expectations), RecordingDelay::default())
}

/// Checks that every expected transaction happened and returns the recorded delays.
fn finish(lidar: LidarLite<I2cMock, RecordingDelay>) -> Vec<u32> {
    let (mut i2c, delay) = lidar.release();
    i2c.done();
    delay.delays_us
}

#[test]
fn reset_wakes_resets_and_waits() {
    let mut lidar = lidar(&[
        write(0x65, 0x80),
        write(0x00, 0x00),
        status(BUSY),
        status(READY),
    ]);
    lidar.reset().unwrap();
    assert_eq!(finish(lidar), [1_000]);
}

#[test]
fn reset_continues_when_wake_is_not_acknowledged() {
    let mut lidar = lidar(&[
        write(0x65, 0x80).with_error(ErrorKind::Other),
        write(0x00, 0x00),
        status(READY),
    ]);
    lidar.reset().unwrap();
    finish(lidar);
}

#[test]
fn sleep_and_wake_use_power_control() {
    let mut lidar = lidar(&[write(0x65, 0x84), write(0x65, 0x80)]);
    lidar.sleep().unwrap();
    lidar.wake().unwrap();
    finish(lidar);
}

#[test]
fn status_is_a_single_read() {
    let mut lidar = lidar(&[status(0b0011_0000)]);
    let value = lidar.status().unwrap();
    assert_eq!(value, Status::HEALTHY | Status::SECONDARY_RETURN);
    finish(lidar);
}

#[test]
fn version_reads_both_revisions() {
    let mut lidar = lidar(&[read(0x41, 0x15), read(0x4f, 0x07)]);
    assert_eq!(
        lidar.version().unwrap(),
        Version {
            hardware: 0x15,
            software: 0x07
        }
    );
    finish(lidar);
}

#[test]
fn custom_address_is_used_on_the_bus() {
    let i2c = I2cMock::new(&[Transaction::write_read(0x42, vec![0x01], vec![READY])]);
    let mut lidar = LidarLite::with_address(i2c, RecordingDelay::default(), 0x42);
    assert_eq!(lidar.address(), 0x42);
    lidar.status().unwrap();
    finish(lidar);
}

#[test]
fn polling_backs_off_geometrically_until_timeout() {
    let mut lidar = lidar(&[
        status(BUSY),
        status(BUSY),
        status(BUSY),
        status(BUSY),
        status(BUSY),
    ]);
    lidar.set_wait_timeout(Duration::from_millis(10));
    assert!(matches!(lidar.acquire(false), Err(Error::Timeout)));
    assert_eq!(finish(lidar), [1_000, 2_000, 4_000, 8_000]);
}

#[test]
fn default_timeout_bounds_total_wait() {
    let expectations: Vec<Transaction> = (0..12).map(|_| status(BUSY)).collect();
    let mut lidar = lidar(&expectations);
    assert_eq!(lidar.wait_timeout(), Duration::from_secs(2));
    assert!(matches!(lidar.acquire(true), Err(Error::Timeout)));

    let delays = finish(lidar);
    assert!(delays.windows(2).all(|pair| pair[0] <= pair[1]));
    let total: u32 = delays.iter().sum();
    let last = *delays.last().unwrap();
    assert!(total >= 2_000_000);
    assert!(total <= 2_000_000 + last);
}

#[test]
fn bus_errors_before_timeout_are_retried() {
    let mut lidar = lidar(&[
        Transaction::write_read(ADDR, vec![0x01], vec![0]).with_error(ErrorKind::Other),
        status(READY),
        write(0x00, 0x03),
    ]);
    lidar.acquire(false).unwrap();
    assert_eq!(finish(lidar), [1_000]);
}

#[test]
fn bus_error_at_timeout_is_returned() {
    let mut lidar = lidar(&[
        Transaction::write_read(ADDR, vec![0x01], vec![0]).with_error(ErrorKind::Other)
    ]);
    lidar.set_wait_timeout(Duration::ZERO);
    assert!(matches!(
        lidar.acquire(false),
        Err(Error::I2cError(ErrorKind::Other))
    ));
    assert!(finish(lidar).is_empty());
}

#[test]
fn acquire_with_stabilization_uses_dedicated_command() {
    let mut lidar = lidar(&[status(READY), write(0x00, 0x04)]);
    lidar.acquire(true).unwrap();
    finish(lidar);
}

#[test]
fn healthy_distance_read() {
    let mut lidar = lidar(&[status(READY), read_word(0x8f, 300)]);
    let reading = lidar.read_distance().unwrap();
    assert_eq!(reading.value, 300);
    assert_eq!(reading.health, Health::Healthy);
    finish(lidar);
}

#[test]
fn degraded_health_still_returns_distance() {
    // busy clear, secondary return set, healthy clear
    let mut lidar = lidar(&[status(0b0001_0000), read(0x48, 0x02), read_word(0x8f, 1234)]);
    let reading = lidar.read_distance().unwrap();
    assert_eq!(reading.value, 1234);
    assert_eq!(
        reading.health,
        Health::Degraded(HealthDetail::TRANSMIT_POWER)
    );
    assert!(matches!(
        reading.checked::<ErrorKind>(),
        Err(Error::Unhealthy(HealthDetail::TRANSMIT_POWER))
    ));
    finish(lidar);
}

#[test]
fn unreadable_health_detail_falls_back_to_generic() {
    let mut lidar = lidar(&[
        status(0b0001_0000),
        read(0x48, 0).with_error(ErrorKind::Other),
        read_word(0x8f, 77),
    ]);
    let reading = lidar.read_distance().unwrap();
    assert_eq!(reading.value, 77);
    assert_eq!(reading.health, Health::Degraded(HealthDetail::empty()));
    finish(lidar);
}

#[test]
fn error_detected_skips_distance_read() {
    let mut lidar = lidar(&[status(0b0100_0000)]);
    assert!(matches!(
        lidar.read_distance(),
        Err(Error::MeasurementError)
    ));
    finish(lidar);
}

#[test]
fn invalid_signal_is_fatal() {
    let mut lidar = lidar(&[status(0b0010_1000)]);
    assert!(matches!(lidar.read_distance(), Err(Error::SignalNotValid)));
    finish(lidar);
}

#[test]
fn velocity_uses_default_scale_without_custom_interval() {
    let mut lidar = lidar(&[status(READY), read(0x04, 0x80), read(0x09, 0xff)]);
    let reading = lidar.read_velocity().unwrap();
    assert_eq!(reading.value, -10);
    assert!(reading.health.is_healthy());
    finish(lidar);
}

#[test]
fn velocity_uses_custom_interval_as_scale() {
    let mut lidar = lidar(&[
        status(READY),
        read(0x04, 0xa0),
        read(0x45, 20),
        read(0x09, 0x7f),
    ]);
    assert_eq!(lidar.read_velocity().unwrap().value, 127);
    finish(lidar);
}

#[test]
fn velocity_is_not_read_after_measurement_error() {
    let mut lidar = lidar(&[status(0b0110_0000)]);
    assert!(matches!(
        lidar.read_velocity(),
        Err(Error::MeasurementError)
    ));
    finish(lidar);
}

#[test]
fn distance_only_mode_clears_velocity_and_custom_interval() {
    let mut lidar = lidar(&[read(0x04, 0xa8), write(0x04, 0x08), write(0x11, 0x00)]);
    lidar.set_distance_only_mode().unwrap();
    finish(lidar);
}

#[test]
fn continuous_mode_writes_interval_then_control() {
    let mut lidar = lidar(&[
        read(0x04, 0x00),
        write(0x45, 40),
        write(0x04, 0x20),
        write(0x11, 0xff),
    ]);
    lidar
        .set_continuous_mode(INFINITE_ACQUISITIONS, Duration::from_millis(20))
        .unwrap();
    finish(lidar);
}

#[test]
fn continuous_mode_at_default_interval_leaves_interval_register() {
    let mut lidar = lidar(&[read(0x04, 0x20), write(0x04, 0x00), write(0x11, 10)]);
    lidar
        .set_continuous_mode(10, Duration::from_millis(100))
        .unwrap();
    finish(lidar);
}

#[test]
fn velocity_mode_sets_both_control_bits() {
    let mut lidar = lidar(&[
        read(0x04, 0x00),
        write(0x45, 20),
        write(0x04, 0xa0),
        write(0x11, 0x00),
    ]);
    lidar
        .set_distance_and_velocity_mode(Duration::from_millis(10))
        .unwrap();
    finish(lidar);
}

#[test]
fn out_of_range_interval_touches_no_register() {
    let mut lidar = lidar(&[]);
    assert!(matches!(
        lidar.set_continuous_mode(5, Duration::from_millis(200)),
        Err(Error::InvalidInterval)
    ));
    assert!(matches!(
        lidar.set_distance_and_velocity_mode(Duration::from_micros(500)),
        Err(Error::InvalidInterval)
    ));
    finish(lidar);
}

#[test]
fn failed_control_write_aborts_mode_change() {
    let mut lidar = lidar(&[
        read(0x04, 0x00),
        write(0x45, 40),
        write(0x04, 0x20).with_error(ErrorKind::Other),
    ]);
    assert!(matches!(
        lidar.set_continuous_mode(3, Duration::from_millis(20)),
        Err(Error::I2cError(ErrorKind::Other))
    ));
    finish(lidar);
}

#[test]
fn acquisition_interval_reads_back_configuration() {
    let mut lidar = lidar(&[read(0x04, 0x20), read(0x45, 40), read(0x04, 0x80)]);
    assert_eq!(
        lidar.acquisition_interval().unwrap(),
        Duration::from_millis(20)
    );
    assert_eq!(
        lidar.acquisition_interval().unwrap(),
        Duration::from_millis(100)
    );
    finish(lidar);
}

#[test]
fn get_distance_returns_first_healthy_reading() {
    let mut lidar = lidar(&[
        write(0x11, 0x00),
        status(READY),
        write(0x00, 0x04),
        status(READY),
        read_word(0x8f, 512),
    ]);
    let reading = lidar.get_distance().unwrap();
    assert_eq!(reading.value, 512);
    assert!(finish(lidar).is_empty());
}

#[test]
fn get_distance_retries_degraded_reading() {
    let mut lidar = lidar(&[
        write(0x11, 0x00),
        status(READY),
        write(0x00, 0x04),
        status(0b0000_0000),
        read(0x48, 0x00),
        read_word(0x8f, 5),
        status(READY),
        write(0x00, 0x04),
        status(READY),
        read_word(0x8f, 7),
    ]);
    let reading = lidar.get_distance().unwrap();
    assert_eq!(reading.value, 7);
    assert_eq!(reading.health, Health::Healthy);
    assert_eq!(finish(lidar), [1_000]);
}

#[test]
fn get_distance_returns_degraded_reading_at_deadline() {
    let mut lidar = lidar(&[
        write(0x11, 0x00),
        status(READY),
        write(0x00, 0x04),
        status(0b0000_0000),
        read(0x48, 0x04),
        read_word(0x8f, 9),
    ]);
    lidar.set_wait_timeout(Duration::ZERO);
    let reading = lidar.get_distance().unwrap();
    assert_eq!(reading.value, 9);
    assert_eq!(reading.health, Health::Degraded(HealthDetail::DC_PREAMP));
    finish(lidar);
}

#[test]
fn get_distance_terminates_when_every_attempt_fails() {
    let mut expectations = vec![write(0x11, 0x00)];
    for _ in 0..4 {
        expectations.push(status(0b0100_0000));
        expectations.push(write(0x00, 0x04));
        expectations.push(status(0b0100_0000));
    }
    let mut lidar = lidar(&expectations);
    lidar.set_wait_timeout(Duration::from_millis(3));
    assert!(matches!(
        lidar.get_distance(),
        Err(Error::MeasurementError)
    ));
    assert_eq!(finish(lidar), [1_000, 1_000, 1_000]);
}

#[test]
fn get_distance_fails_fast_when_count_cannot_be_written() {
    let mut lidar = lidar(&[write(0x11, 0x00).with_error(ErrorKind::Other)]);
    assert!(matches!(
        lidar.get_distance(),
        Err(Error::I2cError(ErrorKind::Other))
    ));
    finish(lidar);
}
