//! Enroll a finger, then identify it
//!
//! `SENSOR_PORT` selects the serial device, `SENSOR_PAGE` the library page.

use fingerlink::constants::DEFAULT_PASSWORD;
use fingerlink::{EnrollState, Enrollment, Identification, Sensor, SerialTransport};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> fingerlink::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let port = std::env::var("SENSOR_PORT").unwrap_or_else(|_| "/dev/ttyUSB0".to_string());
    let page: u16 = std::env::var("SENSOR_PAGE")
        .ok()
        .and_then(|page| page.parse().ok())
        .unwrap_or(1);

    let sensor = Sensor::new(SerialTransport::new(port));
    sensor.open().await?;

    if !sensor.verify_password(DEFAULT_PASSWORD).await? {
        println!("Module rejected the default password");
        sensor.close().await?;
        return Ok(());
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let prompts = tokio::spawn(async move {
        while let Some(state) = rx.recv().await {
            match state {
                EnrollState::AwaitFirstImage => println!("Place your finger on the sensor..."),
                EnrollState::Delay => println!("Remove your finger"),
                EnrollState::AwaitSecondImage => println!("Place the same finger again..."),
                _ => {}
            }
        }
    });

    let report = Enrollment::new(page).with_progress(tx).run(&sensor).await?;
    let _ = prompts.await;
    println!("{}", report);

    println!("Place the finger once more to identify it...");
    let parameters = sensor.read_system_parameters().await?;
    let result = Identification::new(0, parameters.library_size)
        .run(&sensor)
        .await?;
    println!("{}", result);

    sensor.close().await?;

    Ok(())
}
