#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use aircast_core::acquisition::Acquisition;
use aircast_core::config::DeviceConfig;
use aircast_firmware::app_state::{
    AppError, SampleSlot, create_i2c_bus, init_sensor, liveness_led,
};
use aircast_firmware::http_listener::http_task;
use aircast_firmware::network::{
    access_point_task, bind_local_services, dhcp_task, dns_task, net_task, start_access_point,
};
use aircast_firmware::wifi_secrets::{AP_PASSWORD, AP_SSID};
use core::net::Ipv4Addr;
use embassy_executor::Spawner;
use esp_hal::clock::CpuClock;
use esp_hal::timer::timg::TimerGroup;
use log::{error, info, warn};

/// The one reading shared by the sampling loop and the page server.
static SLOT: SampleSlot = SampleSlot::new();

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

extern crate alloc;

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

/// Bring-up failures leave nothing worth running.
fn fatal(err: AppError) -> ! {
    error!("Bootstrap failed: {}", err);
    panic!("bootstrap failed: {}", err);
}

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    rtt_target::rtt_init_log!();

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    // The radio allocates its buffers on this heap
    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 73744);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    info!("Embassy initialized!");

    let device_config = DeviceConfig::new(AP_SSID, AP_PASSWORD);
    if let Err(e) = device_config.validate() {
        fatal(e.into());
    }
    let ap_config = device_config.access_point;

    // Network first: clients can join while the sensor warms up
    let access_point = start_access_point(peripherals.WIFI, &ap_config)
        .await
        .unwrap_or_else(|e| fatal(e));
    let stack = access_point.stack;

    spawner.spawn(net_task(access_point.runner).expect("net task spawned twice"));
    spawner.spawn(
        access_point_task(access_point.controller).expect("access point task spawned twice"),
    );

    stack.wait_config_up().await;
    if let Some(v4) = stack.config_v4() {
        info!("Gateway address {}", v4.address);
    }

    // Clients cannot use the page without leases and names
    let services = bind_local_services(stack)
        .await
        .unwrap_or_else(|e| fatal(e));
    let gateway = Ipv4Addr::from(ap_config.gateway);
    spawner.spawn(dhcp_task(services.dhcp, gateway).expect("DHCP task spawned twice"));
    spawner.spawn(dns_task(services.dns, gateway).expect("DNS task spawned twice"));
    spawner.spawn(http_task(stack, ap_config.http_port, &SLOT).expect("HTTP task spawned twice"));

    let bus = create_i2c_bus(peripherals.I2C0, peripherals.GPIO12, peripherals.GPIO11)
        .unwrap_or_else(|e| fatal(e));
    let sensor = init_sensor(bus);
    let led = liveness_led(peripherals.GPIO2);

    let mut acquisition = Acquisition::new(
        sensor,
        embassy_time::Delay,
        led,
        &SLOT,
        device_config.sampling,
    );
    if let Err(e) = acquisition.start().await {
        // Exhausted cycles re-initialise the sensor later
        warn!("SCD30 start failed: {:?}", e);
    }

    acquisition.run().await
}
