//! Wi-Fi access point, IP stack and DHCP leasing
//!
//! The device is its own network: the radio runs in access point mode, the
//! stack takes the configured gateway address statically, a small DHCP
//! server hands the rest of the subnet to clients, and a captive DNS
//! responder resolves every name to the gateway.

use core::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use aircast_core::captive_dns::{self, DNS_PORT};
use aircast_core::config::AccessPointConfig;
use edge_dhcp::io::{self, DEFAULT_SERVER_PORT};
use edge_dhcp::server::{Server, ServerOptions};
use edge_nal::UdpBind;
use edge_nal_embassy::{Udp, UdpBuffers, UdpSocket};
use embassy_net::{Ipv4Cidr, Runner, Stack, StackResources, StaticConfigV4};
use embassy_time::{Duration, Timer};
use esp_hal::peripherals::WIFI;
use esp_hal::rng::Rng;
use esp_radio::wifi::{
    AccessPointConfig as RadioApConfig, AuthMethod, ModeConfig, WifiController, WifiDevice,
    WifiEvent,
};
use log::{error, info, warn};
use static_cell::StaticCell;

use crate::app_state::AppError;

/// Page listener, DHCP, DNS and one spare.
const STACK_SOCKETS: usize = 4;
/// DHCP and DNS.
const UDP_SOCKETS: usize = 2;
const UDP_BUF_LEN: usize = 1024;
const UDP_META_LEN: usize = 4;
/// Concurrent DHCP leases.
const MAX_LEASES: usize = 8;
const AP_RESTART_DELAY: Duration = Duration::from_secs(5);
const DHCP_RESTART_DELAY: Duration = Duration::from_millis(500);

type ServiceUdp = Udp<'static, UDP_SOCKETS, UDP_BUF_LEN, UDP_BUF_LEN, UDP_META_LEN>;
pub type ServiceSocket = UdpSocket<'static, UDP_SOCKETS, UDP_BUF_LEN, UDP_BUF_LEN, UDP_META_LEN>;

/// Bound sockets of the services clients need to join and find the page.
pub struct LocalServices {
    pub dhcp: ServiceSocket,
    pub dns: ServiceSocket,
}

/// Everything the access point needs kept alive after bring-up.
pub struct AccessPoint {
    pub stack: Stack<'static>,
    pub runner: Runner<'static, WifiDevice<'static>>,
    pub controller: WifiController<'static>,
}

/// Start the radio in access point mode and build the IP stack on it.
///
/// May only be called once.
pub async fn start_access_point(
    wifi: WIFI<'static>,
    config: &AccessPointConfig<'_>,
) -> Result<AccessPoint, AppError> {
    static RADIO: StaticCell<esp_radio::Controller<'static>> = StaticCell::new();
    static RESOURCES: StaticCell<StackResources<STACK_SOCKETS>> = StaticCell::new();

    let radio = RADIO.init(esp_radio::init().map_err(AppError::wifi)?);
    let (mut controller, interfaces) =
        esp_radio::wifi::new(radio, wifi, Default::default()).map_err(AppError::wifi)?;

    let auth_method = if config.is_open() {
        AuthMethod::None
    } else {
        AuthMethod::Wpa2Personal
    };
    let mode = ModeConfig::AccessPoint(
        RadioApConfig::default()
            .with_ssid(config.ssid.into())
            .with_password(config.password.into())
            .with_auth_method(auth_method),
    );
    controller.set_config(&mode).map_err(AppError::wifi)?;
    controller.start_async().await.map_err(AppError::wifi)?;
    info!("Access point '{}' is up", config.ssid);

    let gateway = Ipv4Addr::from(config.gateway);
    let net_config = embassy_net::Config::ipv4_static(StaticConfigV4 {
        address: Ipv4Cidr::new(gateway, config.prefix_len),
        gateway: Some(gateway),
        dns_servers: Default::default(),
    });

    let rng = Rng::new();
    let seed = (u64::from(rng.random()) << 32) | u64::from(rng.random());
    let (stack, runner) = embassy_net::new(
        interfaces.ap,
        net_config,
        RESOURCES.init(StackResources::new()),
        seed,
    );

    Ok(AccessPoint {
        stack,
        runner,
        controller,
    })
}

#[embassy_executor::task]
pub async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) {
    runner.run().await
}

/// Restarts the access point whenever the radio reports it stopped.
#[embassy_executor::task]
pub async fn access_point_task(mut controller: WifiController<'static>) {
    loop {
        controller.wait_for_event(WifiEvent::ApStop).await;
        warn!("Access point stopped, restarting");
        Timer::after(AP_RESTART_DELAY).await;

        match controller.start_async().await {
            Ok(()) => info!("Access point restarted"),
            Err(e) => error!("Access point restart failed: {:?}", e),
        }
    }
}

/// Bind the DHCP and DNS ports on all local addresses.
///
/// May only be called once.
pub async fn bind_local_services(stack: Stack<'static>) -> Result<LocalServices, AppError> {
    static BUFFERS: StaticCell<UdpBuffers<UDP_SOCKETS, UDP_BUF_LEN, UDP_BUF_LEN, UDP_META_LEN>> =
        StaticCell::new();
    static UDP: StaticCell<ServiceUdp> = StaticCell::new();

    let udp: &'static ServiceUdp = UDP.init(Udp::new(stack, BUFFERS.init(UdpBuffers::new())));
    let any = |port| SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port));

    let dhcp = udp
        .bind(any(DEFAULT_SERVER_PORT))
        .await
        .map_err(AppError::network)?;
    let dns = udp.bind(any(DNS_PORT)).await.map_err(AppError::network)?;

    Ok(LocalServices { dhcp, dns })
}

/// Leases addresses in the gateway's subnet, advertising the device as
/// router and name server. Leases survive server restarts.
#[embassy_executor::task]
pub async fn dhcp_task(mut socket: ServiceSocket, gateway: Ipv4Addr) {
    let mut buf = [0u8; 1500];
    let mut gateways = [gateway];
    let name_servers = [gateway];
    let mut server = Server::<_, MAX_LEASES>::new_with_et(gateway);
    let mut options = ServerOptions::new(gateway, Some(&mut gateways));
    options.dns = &name_servers;
    info!("DHCP: serving leases as {}", gateway);

    loop {
        if let Err(e) = io::server::run(&mut server, &options, &mut socket, &mut buf).await {
            warn!("DHCP: server error: {:?}", e);
        }
        Timer::after(DHCP_RESTART_DELAY).await;
    }
}

#[embassy_executor::task]
pub async fn dns_task(socket: ServiceSocket, gateway: Ipv4Addr) {
    captive_dns::run(socket, embassy_time::Delay, gateway).await
}
