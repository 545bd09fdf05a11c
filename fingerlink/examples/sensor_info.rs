//! Print module parameters and library usage
//!
//! `SENSOR_PORT` is a serial device path, or `tcp://host:port` for a bridge.

use fingerlink::constants::DEFAULT_PASSWORD;
use fingerlink::{Sensor, SerialTransport, TcpTransport};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> fingerlink::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let port = std::env::var("SENSOR_PORT").unwrap_or_else(|_| "/dev/ttyUSB0".to_string());

    let sensor = match port.strip_prefix("tcp://").and_then(|addr| addr.rsplit_once(':')) {
        Some((host, tcp_port)) => {
            let tcp_port = tcp_port.parse().unwrap_or(2000);
            Sensor::new(TcpTransport::new(host, tcp_port))
        }
        None => Sensor::new(SerialTransport::new(&port)),
    };

    sensor.open().await?;

    if !sensor.verify_password(DEFAULT_PASSWORD).await? {
        println!("Module rejected the default password");
        sensor.close().await?;
        return Ok(());
    }

    let parameters = sensor.read_system_parameters().await?;
    println!("{}", parameters);

    let stored = sensor.get_template_count().await?;
    println!("Templates: {}/{}", stored, parameters.library_size);

    sensor.close().await?;

    Ok(())
}
