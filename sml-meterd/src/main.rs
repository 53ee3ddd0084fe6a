//! sml-meterd binary: read a DWS7612.2 power meter and republish its
//! energy readings.

use anyhow::Context;
use clap::Parser;
use sml_meterd::sink::{MqttSink, MySqlSink};
use sml_meterd::worker::{PollingWorker, SerialFactory};
use sml_meterd::{MeterConfig, ReadingSink};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(version, about = "SML electric meter logger")]
struct Args {
    /// Path to the configuration file
    #[clap(short, long, value_parser, default_value = "sml-meterd.yml")]
    config: PathBuf,

    /// Read the meter once, print both readings and exit
    #[clap(short = '1', long)]
    once: bool,

    /// Disable the MySQL sink
    #[clap(short = 'n', long)]
    no_sql: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = MeterConfig::load_or_default(&args.config);
    if args.no_sql {
        config.mysql = None;
    }

    log::info!("Device:  {}", config.port);
    log::info!("Cycle:   {} s", config.cycle_secs);
    log::info!(
        "Sinks:   mysql {}, mqtt {}",
        if config.mysql.is_some() { "enabled" } else { "disabled" },
        if config.mqtt.is_some() { "enabled" } else { "disabled" },
    );

    let mut sinks: Vec<Box<dyn ReadingSink>> = Vec::new();
    if let Some(mysql) = &config.mysql {
        match MySqlSink::connect(mysql).await {
            Ok(sink) => sinks.push(Box::new(sink)),
            Err(e) => log::error!("MySQL sink unavailable: {}", e),
        }
    }
    if let Some(mqtt) = &config.mqtt {
        sinks.push(Box::new(MqttSink::connect(mqtt)));
    }

    let factory = SerialFactory::from_config(&config);
    let mut handle = PollingWorker::new(config, factory, sinks).spawn();

    if args.once {
        handle
            .wait_ready()
            .await
            .context("worker stopped before the first reading")?;
        let snapshot = handle.snapshot();
        println!("1.8.0: {:>10} kWh", snapshot.positive.to_string());
        println!("2.8.0: {:>10} kWh", snapshot.negative.to_string());
        handle.stop().await;
        return Ok(());
    }

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    log::info!("Interrupted, stopping worker");
    handle.stop().await;
    log::info!("Bye");
    Ok(())
}
