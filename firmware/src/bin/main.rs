#![no_std]
#![no_main]

use defmt::{error, info, warn};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::i2c::{self, Blocking, I2c};
use embassy_rp::peripherals::{I2C0, USB};
use embassy_rp::usb::Driver;
use embassy_time::{Delay, Duration, Ticker};
use embassy_usb::class::hid::State;
use embassy_usb::{Builder, Config as UsbConfig};
use lightgun_core::CAMERA_ADDRESS;
use lightgun_firmware::{
    configure_usb_hid, AimSignal, AimSink, Calibration, ChannelSource, FrameChannel, I2cLink,
    LightgunBridge, PositionCamera, SignalSink, UsbHidOutput, DEFAULT_BRIDGE_CONFIG,
    DEFAULT_CAMERA_CONFIG, SCREEN_HEIGHT, SCREEN_WIDTH, TRACKER_CONFIG,
};
use static_cell::StaticCell;

#[cfg(feature = "dev-panic")]
use panic_probe as _;
#[cfg(feature = "prod-panic")]
use panic_reset as _;

bind_interrupts!(struct Irqs {
    USBCTRL_IRQ => embassy_rp::usb::InterruptHandler<USB>;
});

type Camera = PositionCamera<I2cLink<I2c<'static, I2C0, Blocking>>>;

/// Camera poll period.
const CAMERA_PERIOD: Duration = Duration::from_millis(5);

/// Frames from the camera task, consumed in order by the tracking task.
static FRAMES: FrameChannel = FrameChannel::new();

/// Latest aim for the output task.
static AIM_SIGNAL: StaticCell<AimSignal> = StaticCell::new();

/// USB device configuration buffer.
static CONFIG_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static BOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static MSOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static CONTROL_BUF: StaticCell<[u8; 64]> = StaticCell::new();

/// HID state.
static HID_STATE: StaticCell<State> = StaticCell::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Light gun starting...");

    let p = embassy_rp::init(embassy_rp::config::Config::default());

    let aim_signal = AIM_SIGNAL.init(AimSignal::new());

    // --- Camera Setup ---
    let mut i2c_config = i2c::Config::default();
    i2c_config.frequency = 1_000_000;
    let bus = I2c::new_blocking(
        p.I2C0, p.PIN_5, // SCL
        p.PIN_4, // SDA
        i2c_config,
    );
    let mut camera = PositionCamera::new(I2cLink::new(bus, CAMERA_ADDRESS), DEFAULT_CAMERA_CONFIG);

    // --- Tracking Setup ---
    let calibration = match Calibration::screen(f64::from(SCREEN_WIDTH), f64::from(SCREEN_HEIGHT)) {
        Ok(c) => c,
        Err(e) => {
            error!("Default calibration rejected: {:?}", e);
            return;
        }
    };
    let bridge = LightgunBridge::new(
        ChannelSource::new(&FRAMES),
        SignalSink::new(aim_signal),
        TRACKER_CONFIG,
        calibration,
        DEFAULT_BRIDGE_CONFIG,
    );

    // --- USB Setup ---
    let usb_driver = Driver::new(p.USB, Irqs);

    let mut usb_config = UsbConfig::new(0x1209, 0x0001); // pid.codes test VID/PID
    usb_config.manufacturer = Some("Rust Lightgun");
    usb_config.product = Some("IR Light Gun");
    usb_config.serial_number = Some("001");
    usb_config.max_power = 100;
    usb_config.max_packet_size_0 = 64;

    let config_descriptor = CONFIG_DESCRIPTOR.init([0; 256]);
    let bos_descriptor = BOS_DESCRIPTOR.init([0; 256]);
    let msos_descriptor = MSOS_DESCRIPTOR.init([0; 256]);
    let control_buf = CONTROL_BUF.init([0; 64]);

    let mut builder = Builder::new(
        usb_driver,
        usb_config,
        config_descriptor,
        bos_descriptor,
        msos_descriptor,
        control_buf,
    );

    let hid_state = HID_STATE.init(State::new());
    let hid_writer = configure_usb_hid(&mut builder, hid_state);
    let usb_device = builder.build();
    let usb_output = UsbHidOutput::new(hid_writer, SCREEN_WIDTH, SCREEN_HEIGHT);

    // LED for read error indication (on-board LED on Pico)
    let led = Output::new(p.PIN_25, Level::Low);

    // The camera needs its power-up sequence before the first read.
    if let Err(e) = camera.begin(&mut Delay) {
        error!("Camera did not respond: {:?}", e);
    }

    // Spawn tasks (unwrap the SpawnToken, then spawn)
    spawner.spawn(usb_task(usb_device).unwrap());
    spawner.spawn(camera_task(camera, led).unwrap());
    spawner.spawn(tracking_task(bridge).unwrap());
    spawner.spawn(output_task(usb_output, aim_signal).unwrap());

    info!("Light gun initialized, tracking...");
}

/// USB device task - runs the USB stack.
#[embassy_executor::task]
async fn usb_task(mut device: embassy_usb::UsbDevice<'static, Driver<'static, USB>>) {
    device.run().await;
}

/// Camera task - atomic reads on a fixed tick, queued in acquisition order.
#[embassy_executor::task]
async fn camera_task(mut camera: Camera, mut led: Output<'static>) {
    let policy = camera.config().retry;
    let mut ticker = Ticker::every(CAMERA_PERIOD);
    loop {
        let result = camera.atomic_read(policy);
        if let Err(e) = &result {
            warn!("Camera read failed: {:?}", e);
            led.toggle();
        }
        FRAMES.send(result).await;
        ticker.next().await;
    }
}

/// Tracking task - reconstructs markers and maps the aim for every frame.
#[embassy_executor::task]
async fn tracking_task(mut bridge: LightgunBridge<ChannelSource, SignalSink>) {
    bridge.run().await;
}

/// Output task - waits for aim signals and sends HID pointer reports.
#[embassy_executor::task]
async fn output_task(mut output: UsbHidOutput<'static>, signal: &'static AimSignal) {
    // Wait for USB to be ready
    output.wait_ready().await;
    info!("USB HID ready, forwarding aim...");

    loop {
        let aim = signal.wait().await;
        if let Err(e) = output.send(&aim).await {
            error!("Output error: {:?}", e);
        }
    }
}
