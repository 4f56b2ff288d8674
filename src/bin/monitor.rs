use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::{App, Arg};
use limitmon::events::{EventSeverity, BUS_FATAL_CRIT_EID};
use limitmon::msg::{self, BusMessage, MessageId, SampleRequest, ALL_ACTIONPOINTS};
use limitmon::{HkPacket, LcState, LimitChecker, MissionTime, Services, TableSet};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, Mutex};
use tokio::time;
use tracing::{error, info, warn};

const OUTBOUND_BROADCAST_BUFFER_SIZE: usize = 256;

/// Collaborator wiring for the host process: events and RTS requests go to
/// `tracing` and to every connected bus endpoint; the clock is wall time.
struct BusServices {
    outbound: broadcast::Sender<String>,
}

impl Services for BusServices {
    fn emit_event(&mut self, event_id: u16, severity: EventSeverity, text: &str) {
        match severity {
            EventSeverity::Debug => tracing::debug!(event_id, "{text}"),
            EventSeverity::Info => info!(event_id, "{text}"),
            EventSeverity::Error => error!(event_id, "{text}"),
            EventSeverity::Critical => error!(event_id, critical = true, "{text}"),
        }
        let line = serde_json::json!({
            "event_id": event_id,
            "severity": format!("{severity:?}"),
            "text": text,
        });
        let _ = self.outbound.send(line.to_string());
    }

    fn request_rts(&mut self, rts_id: u16) {
        info!(rts_id, "RTS execution requested");
        let line = serde_json::json!({ "rts_request": rts_id });
        let _ = self.outbound.send(line.to_string());
    }

    fn now(&mut self) -> MissionTime {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);
        MissionTime {
            seconds: since_epoch.as_secs() as u32,
            subseconds: ((u64::from(since_epoch.subsec_nanos()) << 32) / 1_000_000_000) as u32,
        }
    }

    fn publish_hk(&mut self, packet: &HkPacket) {
        match serde_json::to_string(packet) {
            Ok(line) => {
                let _ = self.outbound.send(line);
            }
            Err(e) => warn!("failed to serialize housekeeping packet: {e}"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let matches = App::new("limitmon-monitor")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Limit checker host: software-bus endpoint over TCP")
        .arg(
            Arg::with_name("port")
                .short("p")
                .long("port")
                .value_name("PORT")
                .takes_value(true)
                .default_value("8080"),
        )
        .arg(
            Arg::with_name("watch-table")
                .long("watch-table")
                .value_name("FILE")
                .help("Watchpoint definition table image (JSON)")
                .takes_value(true)
                .required(true),
        )
        .arg(
            Arg::with_name("action-table")
                .long("action-table")
                .value_name("FILE")
                .help("Actionpoint definition table image (JSON)")
                .takes_value(true)
                .required(true),
        )
        .arg(
            Arg::with_name("lc-state")
                .long("lc-state")
                .value_name("STATE")
                .takes_value(true)
                .possible_values(&["active", "passive", "disabled"])
                .default_value("active"),
        )
        .arg(
            Arg::with_name("sample-interval-ms")
                .long("sample-interval-ms")
                .value_name("MS")
                .help("Period of the synthesized actionpoint sample request")
                .takes_value(true)
                .default_value("1000"),
        )
        .arg(
            Arg::with_name("hk-interval-ms")
                .long("hk-interval-ms")
                .value_name("MS")
                .help("Period of the synthesized housekeeping request")
                .takes_value(true)
                .default_value("5000"),
        )
        .arg(
            Arg::with_name("checkpoint")
                .long("checkpoint")
                .value_name("FILE")
                .help("Critical-data file for warm restarts")
                .takes_value(true),
        )
        .get_matches();

    let port = matches.value_of("port").unwrap().parse::<u16>()?;
    let watch_path = PathBuf::from(matches.value_of("watch-table").unwrap());
    let action_path = PathBuf::from(matches.value_of("action-table").unwrap());
    let sample_period = Duration::from_millis(
        matches
            .value_of("sample-interval-ms")
            .unwrap()
            .parse::<u64>()?,
    );
    let hk_period =
        Duration::from_millis(matches.value_of("hk-interval-ms").unwrap().parse::<u64>()?);
    let initial_state = match matches.value_of("lc-state").unwrap() {
        "passive" => LcState::Passive,
        "disabled" => LcState::Disabled,
        _ => LcState::Active,
    };
    let checkpoint_path = matches.value_of("checkpoint").map(PathBuf::from);

    // The app refuses to start monitoring without both validated tables.
    let tables = TableSet::load(&watch_path, &action_path)?;

    let (outbound_tx, _) = broadcast::channel(OUTBOUND_BROADCAST_BUFFER_SIZE);
    let services = BusServices {
        outbound: outbound_tx.clone(),
    };
    let app = Arc::new(Mutex::new(LimitChecker::new(tables, initial_state, services)));

    if let Some(path) = checkpoint_path.as_deref() {
        if path.exists() {
            let checkpoint = serde_json::from_str(&std::fs::read_to_string(path)?)?;
            app.lock().await.restore(&checkpoint)?;
            info!("warm restart: critical data restored from {}", path.display());
        }
    }

    let listener = match TcpListener::bind(format!("127.0.0.1:{port}")).await {
        Ok(listener) => listener,
        Err(e) => {
            app.lock().await.services_mut().emit_event(
                BUS_FATAL_CRIT_EID,
                EventSeverity::Critical,
                &format!("bus endpoint unavailable: {e}"),
            );
            return Err(e.into());
        }
    };

    let tcp_app = Arc::clone(&app);
    let tcp_outbound = outbound_tx.clone();
    let tcp_server = tokio::spawn(async move {
        if let Err(e) = run_bus_listener(listener, tcp_app, tcp_outbound).await {
            error!("bus listener error: {e}");
        }
    });

    info!("limit checker up, listening on port {port}");

    let mut sample_tick = time::interval(sample_period);
    let mut hk_tick = time::interval(hk_period);
    let sample_payload = msg::encode_sample_request(SampleRequest {
        start: ALL_ACTIONPOINTS,
        end: ALL_ACTIONPOINTS,
        update_age: 1,
    });

    loop {
        tokio::select! {
            _ = sample_tick.tick() => {
                let mut app = app.lock().await;
                app.process_message(msg::SAMPLE_AP_MID, &sample_payload);
            }
            _ = hk_tick.tick() => {
                let mut app = app.lock().await;
                app.process_message(msg::SEND_HK_MID, &[]);
                if let Some(path) = checkpoint_path.as_deref() {
                    // HK marks the quiescent window, so the snapshot is stable.
                    match serde_json::to_string(&app.checkpoint()) {
                        Ok(serialized) => {
                            if let Err(e) = std::fs::write(path, serialized) {
                                warn!("failed to persist critical data: {e}");
                            }
                        }
                        Err(e) => warn!("failed to serialize critical data: {e}"),
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown requested");
                break;
            }
        }
    }

    tcp_server.abort();
    Ok(())
}

async fn run_bus_listener(
    listener: TcpListener,
    app: Arc<Mutex<LimitChecker<BusServices>>>,
    outbound: broadcast::Sender<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                info!("bus endpoint connected: {addr}");
                let endpoint_app = Arc::clone(&app);
                let endpoint_rx = outbound.subscribe();
                tokio::spawn(async move {
                    if let Err(e) = handle_endpoint(stream, endpoint_app, endpoint_rx).await {
                        warn!("endpoint {addr} error: {e}");
                    }
                    info!("bus endpoint disconnected: {addr}");
                });
            }
            Err(e) => {
                // A receive failure on the bus is fatal; the host restart
                // policy takes over from here.
                app.lock().await.services_mut().emit_event(
                    BUS_FATAL_CRIT_EID,
                    EventSeverity::Critical,
                    &format!("bus receive failure: {e}"),
                );
                return Err(e.into());
            }
        }
    }
}

async fn handle_endpoint(
    stream: TcpStream,
    app: Arc<Mutex<LimitChecker<BusServices>>>,
    mut outbound_rx: broadcast::Receiver<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (reader, mut writer) = stream.into_split();
    let mut buf_reader = BufReader::new(reader);

    let telemetry_task = tokio::spawn(async move {
        while let Ok(line) = outbound_rx.recv().await {
            if writer.write_all(line.as_bytes()).await.is_err() {
                break;
            }
            if writer.write_all(b"\n").await.is_err() {
                break;
            }
        }
    });

    let mut line = String::new();
    loop {
        line.clear();
        match buf_reader.read_line(&mut line).await {
            Ok(0) => break,
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match serde_json::from_str::<BusMessage>(trimmed) {
                    Ok(message) => {
                        let mut app = app.lock().await;
                        app.process_message(MessageId(message.msg_id), &message.payload);
                    }
                    Err(e) => {
                        warn!("malformed bus message dropped: {e}");
                    }
                }
            }
            Err(e) => {
                error!("error reading from endpoint: {e}");
                break;
            }
        }
    }

    telemetry_task.abort();
    Ok(())
}
