use izone::{ClientConfig, IZoneClient, IZoneClientBuilder};
use std::env;
use std::time::Duration;

#[tokio::main]
async fn main() -> izone::Result<()> {
    tracing_subscriber::fmt::init();

    // An address on the command line wins over IZONE_IP and friends.
    let builder = match env::args().nth(1) {
        Some(ip) => IZoneClient::builder(ip).refresh_interval(Duration::from_secs(10)),
        None => IZoneClientBuilder::from_config(&ClientConfig::from_env()?),
    };

    let client = builder
        .on_event(|event| {
            println!("{event:?}");
        })
        .on_snapshot(|system| {
            println!(
                "{} | {} | {:?} {:?} | target {} | return air {}",
                system.tag1,
                if system.on { "on" } else { "off" },
                system.mode,
                system.fan_speed,
                system.target_temperature,
                system.temperature,
            );
            for zone in &system.zones {
                println!(
                    "  [{}] {} / target {} | {:?}{}",
                    zone.name,
                    zone.temperature,
                    zone.target_temperature,
                    zone.mode,
                    if zone.is_controllable() { "" } else { " | constant" },
                );
            }
        })
        .build()?;

    println!(
        "Polling every {}s...",
        client.refresh_interval().as_secs_f64()
    );
    client.begin_background_refresh();

    loop {
        tokio::time::sleep(Duration::from_secs(3600)).await;
    }
}
