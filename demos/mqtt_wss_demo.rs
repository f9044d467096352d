use std::time::Duration;

use log::{error, info};
use mqtt_wss_transport::{CertVerification, ConnectParams, ProxyKind, Session};
use tokio::time::interval;

async fn run(host: &str, port: u16) {
    let mut session = Session::new(
        |topic, payload, qos| info!("message on {topic} (qos {qos}): {} bytes", payload.len()),
        |packet_id| info!("PUBACK for {packet_id}"),
        |reason_code| info!("CONNACK reason {reason_code:#x}"),
    );

    let params = ConnectParams {
        clientid: "mqtt-wss-demo".to_string(),
        ..Default::default()
    };

    if let Err(err) = session
        .connect(host, port, params, CertVerification::Full, ProxyKind::Direct, true)
        .await
    {
        error!("connect failed: {err}");
        return;
    }

    if let Err(err) = session.subscribe("demo/topic", 0) {
        error!("subscribe failed: {err}");
    }

    let mut ticker = interval(Duration::from_secs(5));
    loop {
        tokio::select! {
            result = session.service(Some(Duration::from_secs(30))) => {
                if let Err(err) = result {
                    error!("session error: {err}");
                    break;
                }
            }
            _ = ticker.tick() => {
                if let Err(err) = session.publish("demo/topic", "hello from the demo", 0, false) {
                    error!("publish failed: {err}");
                    break;
                }
            }
        }
    }

    session.disconnect(Duration::from_secs(2)).await;
}

#[tokio::main]
async fn main() {
    env_logger::init();
    run("localhost", 8083).await;
}
