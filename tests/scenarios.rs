//! End-to-end scenarios: device payloads through a session into alerts.

use std::sync::Arc;
use std::time::Duration;

use sensorwatch::settings::Settings;
use sensorwatch::{
    AlertEvent, CompileError, ConfigError, DeviceLiveness, EventReceiver, MonitorEvent,
    SessionState, TransportSession, TransportStatus,
};
use sensorwatch_adapters::{Behavior, ChannelTransport};
use tokio::time;

const TOPIC: &str = "sensors/data";

fn start() -> (ChannelTransport, TransportSession, EventReceiver) {
    let transport = ChannelTransport::new("scenario");
    let settings = Settings::default();
    let (engine, errors) = settings.build_engine();
    assert!(errors.is_empty());

    let (session, events) = TransportSession::new(
        Arc::new(transport.clone()),
        Arc::new(engine),
        settings.session_config(),
    );
    (transport, session, events)
}

fn payload(gyro: (f64, f64, f64), temperature: f64, humidity: f64, light: f64) -> Vec<u8> {
    format!(
        r#"{{"gyro_x":{},"gyro_y":{},"gyro_z":{},"temperature":{},"humidity":{},"light":{}}}"#,
        gyro.0, gyro.1, gyro.2, temperature, humidity, light
    )
    .into_bytes()
}

fn calm() -> Vec<u8> {
    payload((0.0, 0.0, 0.0), 30.0, 0.5, 100.0)
}

fn drain(rx: &mut EventReceiver) -> Vec<MonitorEvent> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        out.push(event);
    }
    out
}

fn alerts(events: &[MonitorEvent]) -> Vec<AlertEvent> {
    events
        .iter()
        .filter_map(|e| match e {
            MonitorEvent::Alert(alert) => Some(alert.clone()),
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn gyroscope_raises_then_clears() {
    let (transport, session, mut events) = start();
    session
        .engine()
        .set_threshold("Gyroscope", "X>1.0 or Y>1.5")
        .unwrap();
    session.connect().await.unwrap();

    for _ in 0..3 {
        transport.deliver(TOPIC, payload((2.0, 0.0, 0.0), 30.0, 0.5, 100.0));
    }
    assert_eq!(
        alerts(&drain(&mut events)),
        vec![AlertEvent::raised("Gyroscope")]
    );

    for _ in 0..3 {
        transport.deliver(TOPIC, calm());
    }
    assert_eq!(
        alerts(&drain(&mut events)),
        vec![AlertEvent::cleared("Gyroscope")]
    );

    session.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn alternating_breaches_never_alert() {
    let (transport, session, mut events) = start();
    session
        .engine()
        .set_threshold("Temperature & Humidity", "T>50 and H>80")
        .unwrap();
    session.connect().await.unwrap();

    // temperature is offset by -10, humidity scaled by 100.
    let hot = payload((0.0, 0.0, 0.0), 65.0, 0.9, 100.0);
    for i in 0..12 {
        let message = if i % 2 == 0 { hot.clone() } else { calm() };
        transport.deliver(TOPIC, message);
    }

    assert!(alerts(&drain(&mut events)).is_empty());
    let state = session
        .engine()
        .debounce_state("Temperature & Humidity")
        .unwrap();
    assert!(state.breach_streak < 3);

    session.disconnect().await;
}

#[tokio::test]
async fn light_threshold_validation() {
    let (_transport, session, _events) = start();
    let engine = session.engine();

    assert!(engine.set_threshold("Light", "L<50").is_ok());
    assert_eq!(
        engine.set_threshold("Light", "Q<50"),
        Err(ConfigError::Compile(CompileError::UnknownVariable(
            "Q".to_string()
        )))
    );
    assert_eq!(engine.get_config("Light").unwrap().threshold, "L<50");
}

#[tokio::test(start_paused = true)]
async fn silent_device_goes_offline_and_recovers() {
    let (transport, session, mut events) = start();
    session.connect().await.unwrap();

    transport.deliver(TOPIC, calm());
    assert_eq!(session.device_status(), DeviceLiveness::Online);

    time::sleep(Duration::from_secs(7)).await;
    assert_eq!(session.device_status(), DeviceLiveness::Offline);

    transport.deliver(TOPIC, b"\xff not json".to_vec());
    assert_eq!(session.device_status(), DeviceLiveness::Online);

    let device: Vec<_> = drain(&mut events)
        .into_iter()
        .filter_map(|e| match e {
            MonitorEvent::Device(status) => Some(status),
            _ => None,
        })
        .collect();
    assert_eq!(
        device,
        vec![
            DeviceLiveness::Online,
            DeviceLiveness::Offline,
            DeviceLiveness::Online
        ]
    );

    session.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn transport_up_while_device_silent() {
    let (_transport, session, _events) = start();
    session.connect().await.unwrap();

    time::sleep(Duration::from_secs(10)).await;
    assert_eq!(session.state(), SessionState::Connected);
    assert_eq!(session.device_status(), DeviceLiveness::Offline);

    session.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn alerting_survives_reconnect() {
    let (transport, session, mut events) = start();
    transport.set_reconnect_behavior(Behavior::Hang);
    session.engine().set_threshold("Light", "L<50").unwrap();
    session.connect().await.unwrap();

    let dark = payload((0.0, 0.0, 0.0), 30.0, 0.5, 10.0);
    transport.deliver(TOPIC, dark.clone());
    transport.deliver(TOPIC, dark.clone());

    transport.interrupt("broker restart");
    time::sleep(Duration::from_secs(11)).await;
    assert_eq!(session.state(), SessionState::Reconnecting);

    transport.resume();
    time::sleep(Duration::from_millis(10)).await;
    assert_eq!(session.state(), SessionState::Connected);

    transport.deliver(TOPIC, dark);
    let seen = drain(&mut events);
    assert_eq!(alerts(&seen), vec![AlertEvent::raised("Light")]);

    let statuses: Vec<_> = seen
        .iter()
        .filter_map(|e| match e {
            MonitorEvent::Transport(status) => Some(*status),
            _ => None,
        })
        .collect();
    assert_eq!(
        statuses,
        vec![
            TransportStatus::Connecting,
            TransportStatus::Connected,
            TransportStatus::Disconnected,
            TransportStatus::ReconnectFailed,
            TransportStatus::Reconnected,
        ]
    );

    session.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn disabled_channel_is_skipped() {
    let (transport, session, mut events) = start();
    let engine = session.engine();
    engine.set_threshold("Light", "L<50").unwrap();
    engine.set_alerting_enabled("Light", false).unwrap();
    session.connect().await.unwrap();

    for _ in 0..5 {
        transport.deliver(TOPIC, payload((0.0, 0.0, 0.0), 30.0, 0.5, 10.0));
    }
    assert!(alerts(&drain(&mut events)).is_empty());
    assert_eq!(engine.debounce_state("Light").unwrap().breach_streak, 0);

    session.disconnect().await;
}
