//! The status page served to every client.
//!
//! Rendering is a pure function of one [`SensorReading`]. The body goes into a
//! fixed-capacity `heapless::String`; the template is split into constant
//! segments so its length is known at compile time and the capacity is
//! checked against the widest possible numbers below.

use core::fmt::Write;

use crate::reading::SensorReading;

/// Status line and headers. The connection is always closed after one page.
pub const HTTP_HEADER: &str =
    "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nConnection: close\r\n\r\n";

/// Capacity of the rendered body.
pub const MAX_BODY_LEN: usize = 1024;

pub type PageBody = heapless::String<MAX_BODY_LEN>;

const PAGE_HEAD: &str = concat!(
    "<!DOCTYPE html><html><head><meta http-equiv=\"refresh\" content=\"3\">",
    "<title>Aircast CO2 Monitor</title>",
    "<style>body{font-family:sans-serif;text-align:center;padding:20px;}",
    ".val{font-size:2em;font-weight:bold;color:#2c3e50;}",
    ".label{color:#7f8c8d;}</style></head>",
    "<body><h1>SCD30 Sensor Reading</h1>",
    "<div><div class='label'>CO2 Concentration</div><div class='val'>",
);
const CO2_TAIL: &str = concat!(
    " ppm</div></div><br>",
    "<div><div class='label'>Temperature</div><div class='val'>",
);
const TEMPERATURE_TAIL: &str = concat!(
    " &deg;C</div></div><br>",
    "<div><div class='label'>Humidity</div><div class='val'>",
);
const HUMIDITY_TAIL: &str = " %</div></div></body></html>";

const TEMPLATE_LEN: usize =
    PAGE_HEAD.len() + CO2_TAIL.len() + TEMPERATURE_TAIL.len() + HUMIDITY_TAIL.len();

/// Widest `{:.2}` rendering of an `f32`: `-f32::MAX` is a sign, 39 integer
/// digits and `.00`.
const MAX_FIELD_LEN: usize = 1 + 39 + 3;

const _: () = assert!(TEMPLATE_LEN + 3 * MAX_FIELD_LEN <= MAX_BODY_LEN);

/// Render the page body for `reading`, each value with two decimals.
pub fn render_body(reading: &SensorReading) -> Result<PageBody, core::fmt::Error> {
    let mut body = PageBody::new();
    write!(
        body,
        "{PAGE_HEAD}{:.2}{CO2_TAIL}{:.2}{TEMPERATURE_TAIL}{:.2}{HUMIDITY_TAIL}",
        reading.co2_ppm, reading.temperature_c, reading.humidity_pct,
    )?;
    Ok(body)
}
