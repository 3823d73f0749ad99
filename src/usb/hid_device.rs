//! USB HID pad device.
//!
//! Initialises the Embassy USB stack on the nRF52840 hardware USB
//! peripheral and exposes one HID interface with IN and OUT endpoints.

use adp_pad::config;
use adp_pad::protocol::descriptor::PAD_REPORT_DESCRIPTOR;
use adp_pad::protocol::input::INPUT_REPORT_SIZE;
use adp_pad::protocol::{report_id, strip_report_id, MAX_PAYLOAD_SIZE};
use defmt::{debug, info, warn};
use embassy_nrf::usb::vbus_detect::HardwareVbusDetect;
use embassy_nrf::usb::Driver;
use embassy_nrf::{self, bind_interrupts, peripherals};
use embassy_time::{with_timeout, Duration};
use embassy_usb::class::hid::{
    Config as HidConfig, HidReader, HidReaderWriter, HidWriter, ReportId, RequestHandler, State,
};
use embassy_usb::control::OutResponse;
use embassy_usb::{Builder, Config, UsbDevice};
use static_cell::StaticCell;

use super::{with_engine, SharedEngine};

bind_interrupts!(struct Irqs {
    USBD => embassy_nrf::usb::InterruptHandler<peripherals::USBD>;
    CLOCK_POWER => embassy_nrf::usb::vbus_detect::InterruptHandler;
});

/// Full-speed interrupt endpoint size.
const HID_PACKET_SIZE: usize = 64;

pub type UsbDriver = Driver<'static, peripherals::USBD, HardwareVbusDetect>;

pub type PadReader = HidReader<'static, UsbDriver, HID_PACKET_SIZE>;
pub type PadWriter = HidWriter<'static, UsbDriver, HID_PACKET_SIZE>;

static HID_STATE: StaticCell<State> = StaticCell::new();
static CONTROL_HANDLER: StaticCell<PadRequestHandler> = StaticCell::new();
static USB_CONFIG_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_BOS_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_MSOS_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_CTRL_BUF: StaticCell<[u8; 128]> = StaticCell::new();

/// Routes HID class requests into the report engine.
///
/// One instance serves the control pipe (feature reports), another the OUT
/// endpoint (output reports); both point at the same engine.
pub struct PadRequestHandler {
    engine: &'static SharedEngine,
}

impl PadRequestHandler {
    pub fn new(engine: &'static SharedEngine) -> Self {
        Self { engine }
    }

    fn write(&mut self, report_id: u8, data: &[u8], output: bool) {
        let payload = strip_report_id(report_id, data);
        let result = with_engine(self.engine, |engine| {
            if output {
                engine.handle_output_report(report_id, payload)
            } else {
                engine.handle_feature_write(report_id, payload)
            }
        });
        match result {
            Ok(applied) => debug!("report {=u8:#x} applied: {:?}", report_id, applied),
            Err(e) => warn!("report {=u8:#x} dropped: {}", report_id, e),
        }
    }
}

impl RequestHandler for PadRequestHandler {
    fn get_report(&mut self, id: ReportId, buf: &mut [u8]) -> Option<usize> {
        let ReportId::Feature(report_id) = id else {
            return None;
        };
        if buf.is_empty() {
            return None;
        }
        buf[0] = report_id;
        let len = with_engine(self.engine, |engine| {
            engine.handle_feature_read(report_id, &mut buf[1..])
        });
        // Zero-length reads are unsupported reports; the pipe stalls.
        (len > 0).then_some(len + 1)
    }

    fn set_report(&mut self, id: ReportId, data: &[u8]) -> OutResponse {
        match id {
            ReportId::Feature(report_id) => self.write(report_id, data, false),
            ReportId::Out(report_id) => self.write(report_id, data, true),
            ReportId::In(report_id) => warn!("SET_REPORT on input report {=u8:#x}", report_id),
        }
        // Malformed writes are acknowledged; the host verifies by reading back.
        OutResponse::Accepted
    }
}

/// Build result containing the USB device runner and the HID endpoints.
pub struct UsbPadDevice {
    pub device: UsbDevice<'static, UsbDriver>,
    pub reader: PadReader,
    pub writer: PadWriter,
}

/// Initialise the USB stack and create the HID pad device.
///
/// Must be called exactly once. All static buffers are consumed here.
pub fn init(usbd: peripherals::USBD, engine: &'static SharedEngine) -> UsbPadDevice {
    let driver = Driver::new(usbd, Irqs, HardwareVbusDetect::new(Irqs));

    let mut usb_config = Config::new(config::USB_VID, config::USB_PID);
    usb_config.manufacturer = Some(config::USB_MANUFACTURER);
    usb_config.product = Some(config::USB_PRODUCT);
    usb_config.serial_number = Some(config::USB_SERIAL_NUMBER);
    usb_config.max_power = 100; // mA
    usb_config.max_packet_size_0 = 64;

    let config_desc = USB_CONFIG_DESC.init([0u8; 256]);
    let bos_desc = USB_BOS_DESC.init([0u8; 256]);
    let msos_desc = USB_MSOS_DESC.init([0u8; 256]);
    let ctrl_buf = USB_CTRL_BUF.init([0u8; 128]);

    let mut builder = Builder::new(
        driver,
        usb_config,
        config_desc,
        bos_desc,
        msos_desc,
        ctrl_buf,
    );

    let state = HID_STATE.init(State::new());
    let hid_config = HidConfig {
        report_descriptor: PAD_REPORT_DESCRIPTOR,
        request_handler: Some(CONTROL_HANDLER.init(PadRequestHandler::new(engine))),
        poll_ms: config::USB_HID_POLL_MS,
        max_packet_size: HID_PACKET_SIZE as u16,
    };
    let hid = HidReaderWriter::<_, HID_PACKET_SIZE, HID_PACKET_SIZE>::new(
        &mut builder,
        state,
        hid_config,
    );
    let (reader, writer) = hid.split();

    let device = builder.build();

    info!(
        "USB HID pad initialised ({=usize} byte max report)",
        MAX_PAYLOAD_SIZE + 1
    );

    UsbPadDevice {
        device,
        reader,
        writer,
    }
}

/// Run the USB device stack - must be spawned as a dedicated Embassy task.
pub async fn run_usb_device(mut device: UsbDevice<'static, UsbDriver>) -> ! {
    info!("USB device task started");
    device.run().await
}

/// Feed output reports from the OUT endpoint into the engine.
pub async fn run_output_reader(reader: PadReader, engine: &'static SharedEngine) -> ! {
    info!("HID output reader started");
    let mut handler = PadRequestHandler::new(engine);
    reader.run(true, &mut handler).await
}

/// Apply a fresh set of readings and send the resulting input report.
///
/// Readings and report are handled under one lock. The write is abandoned
/// after `INPUT_REPORT_SEND_TIMEOUT_MS` if the host stops polling.
pub async fn send_input_report(writer: &mut PadWriter, engine: &SharedEngine, readings: &[u16]) {
    let mut buf = [0u8; 1 + INPUT_REPORT_SIZE];
    buf[0] = report_id::INPUT;
    let len = with_engine(engine, |engine| {
        engine.update_sensors(readings);
        engine.build_input_report(&mut buf[1..])
    });
    if len == 0 {
        return;
    }

    let timeout = Duration::from_millis(config::INPUT_REPORT_SEND_TIMEOUT_MS);
    match with_timeout(timeout, writer.write(&buf[..len + 1])).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!("input report not sent: {:?}", e),
        Err(_) => warn!("input report timed out"),
    }
}
