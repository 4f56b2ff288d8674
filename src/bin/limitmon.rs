use clap::{App, Arg, ArgMatches, SubCommand};
use colored::*;
use limitmon::msg::{
    self, BusMessage, GroundCommand, SampleRequest, ALL_ACTIONPOINTS, ALL_WATCHPOINTS,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: &str = "8080";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = App::new("limitmon")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Space Systems Engineering Team")
        .about("Ground console for the onboard limit checker")
        .arg(
            Arg::with_name("host")
                .short("h")
                .long("host")
                .value_name("HOST")
                .takes_value(true)
                .default_value(DEFAULT_HOST)
                .global(true),
        )
        .arg(
            Arg::with_name("port")
                .short("p")
                .long("port")
                .value_name("PORT")
                .takes_value(true)
                .default_value(DEFAULT_PORT)
                .global(true),
        )
        .subcommand(SubCommand::with_name("noop").about("Send a no-op command"))
        .subcommand(SubCommand::with_name("reset").about("Reset the housekeeping counters"))
        .subcommand(
            SubCommand::with_name("set-state")
                .about("Set the application monitoring state")
                .arg(
                    Arg::with_name("state")
                        .required(true)
                        .possible_values(&["active", "passive", "disabled"]),
                ),
        )
        .subcommand(
            SubCommand::with_name("ap-state")
                .about("Set one actionpoint's state, or all with 'all'")
                .arg(Arg::with_name("ap").required(true))
                .arg(
                    Arg::with_name("state")
                        .required(true)
                        .possible_values(&["active", "passive", "disabled"]),
                ),
        )
        .subcommand(
            SubCommand::with_name("ap-permoff")
                .about("Permanently disable one actionpoint (must be DISABLED first)")
                .arg(Arg::with_name("ap").required(true)),
        )
        .subcommand(
            SubCommand::with_name("reset-ap-stats")
                .about("Reset actionpoint statistics for one index or 'all'")
                .arg(Arg::with_name("ap").required(true)),
        )
        .subcommand(
            SubCommand::with_name("reset-wp-stats")
                .about("Reset watchpoint statistics for one index or 'all'")
                .arg(Arg::with_name("wp").required(true)),
        )
        .subcommand(
            SubCommand::with_name("sample")
                .about("Request an actionpoint sample pass")
                .arg(
                    Arg::with_name("start")
                        .long("start")
                        .takes_value(true)
                        .requires("end"),
                )
                .arg(Arg::with_name("end").long("end").takes_value(true))
                .arg(
                    Arg::with_name("no-age")
                        .long("no-age")
                        .help("Skip the staleness countdown update"),
                ),
        )
        .subcommand(SubCommand::with_name("hk").about("Request a housekeeping packet"))
        .subcommand(
            SubCommand::with_name("monitor")
                .about("Tail housekeeping, events, and RTS requests from the bus"),
        )
        .get_matches();

    let host = matches.value_of("host").unwrap().to_string();
    let port = matches.value_of("port").unwrap().parse::<u16>()?;

    match matches.subcommand() {
        ("noop", _) => send_command(&host, port, GroundCommand::Noop).await?,
        ("reset", _) => send_command(&host, port, GroundCommand::ResetCounters).await?,
        ("set-state", Some(sub)) => {
            let state = parse_state(sub.value_of("state").unwrap());
            send_command(&host, port, GroundCommand::SetLcState { state }).await?;
        }
        ("ap-state", Some(sub)) => {
            let actionpoint = parse_index(sub.value_of("ap").unwrap(), ALL_ACTIONPOINTS)?;
            let state = parse_state(sub.value_of("state").unwrap());
            send_command(&host, port, GroundCommand::SetApState { actionpoint, state }).await?;
        }
        ("ap-permoff", Some(sub)) => {
            let actionpoint = parse_index(sub.value_of("ap").unwrap(), ALL_ACTIONPOINTS)?;
            send_command(&host, port, GroundCommand::SetApPermOff { actionpoint }).await?;
        }
        ("reset-ap-stats", Some(sub)) => {
            let actionpoint = parse_index(sub.value_of("ap").unwrap(), ALL_ACTIONPOINTS)?;
            send_command(&host, port, GroundCommand::ResetApStats { actionpoint }).await?;
        }
        ("reset-wp-stats", Some(sub)) => {
            let watchpoint = parse_index(sub.value_of("wp").unwrap(), ALL_WATCHPOINTS)?;
            send_command(&host, port, GroundCommand::ResetWpStats { watchpoint }).await?;
        }
        ("sample", Some(sub)) => {
            let request = sample_request(sub)?;
            let message = BusMessage {
                msg_id: msg::SAMPLE_AP_MID.0,
                payload: msg::encode_sample_request(request),
            };
            send_message(&host, port, &message).await?;
            println!("{} sample request sent", "✅".green());
        }
        ("hk", _) => {
            let message = BusMessage {
                msg_id: msg::SEND_HK_MID.0,
                payload: Vec::new(),
            };
            send_message(&host, port, &message).await?;
            println!("{} housekeeping request sent", "✅".green());
        }
        ("monitor", _) => monitor_bus(&host, port).await?,
        _ => {
            println!(
                "{}",
                "No command specified. Use --help for usage information.".yellow()
            );
            println!("{}", "Quick start:".bright_green());
            println!("  {} Check liveness", "limitmon noop".bright_cyan());
            println!("  {} Tail the bus", "limitmon monitor".bright_cyan());
        }
    }

    Ok(())
}

fn parse_state(state: &str) -> u8 {
    match state {
        "active" => 1,
        "passive" => 2,
        _ => 3,
    }
}

fn parse_index(raw: &str, wildcard: u16) -> Result<u16, Box<dyn std::error::Error>> {
    if raw.eq_ignore_ascii_case("all") {
        Ok(wildcard)
    } else {
        Ok(raw.parse::<u16>()?)
    }
}

fn sample_request(sub: &ArgMatches<'_>) -> Result<SampleRequest, Box<dyn std::error::Error>> {
    let (start, end) = match (sub.value_of("start"), sub.value_of("end")) {
        (Some(start), Some(end)) => (start.parse::<u16>()?, end.parse::<u16>()?),
        _ => (ALL_ACTIONPOINTS, ALL_ACTIONPOINTS),
    };
    Ok(SampleRequest {
        start,
        end,
        update_age: u8::from(!sub.is_present("no-age")),
    })
}

async fn send_command(
    host: &str,
    port: u16,
    command: GroundCommand,
) -> Result<(), Box<dyn std::error::Error>> {
    let message = BusMessage {
        msg_id: msg::CMD_MID.0,
        payload: msg::encode_command(command),
    };
    send_message(host, port, &message).await?;
    println!("{} {:?} sent", "✅".green(), command);
    Ok(())
}

async fn send_message(
    host: &str,
    port: u16,
    message: &BusMessage,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut stream = match TcpStream::connect((host, port)).await {
        Ok(stream) => stream,
        Err(e) => {
            eprintln!(
                "{} Failed to connect to the limit checker at {}:{}",
                "❌".red(),
                host,
                port
            );
            if e.kind() == std::io::ErrorKind::ConnectionRefused {
                eprintln!("{} Host is not running. Start it with:", "💡".yellow());
                eprintln!(
                    "   {}",
                    "limitmon-monitor --watch-table wdt.json --action-table adt.json".bright_cyan()
                );
            }
            return Err(e.into());
        }
    };

    let line = serde_json::to_string(message)?;
    stream.write_all(line.as_bytes()).await?;
    stream.write_all(b"\n").await?;
    Ok(())
}

async fn monitor_bus(host: &str, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let stream = TcpStream::connect((host, port)).await?;
    println!(
        "{}",
        "📡 Monitoring limit checker bus traffic (Press Ctrl+C to stop)..."
            .bright_blue()
            .bold()
    );

    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            break;
        }
        let Ok(value) = serde_json::from_str::<serde_json::Value>(line.trim()) else {
            continue;
        };

        if let Some(rts_id) = value.get("rts_request").and_then(|v| v.as_u64()) {
            println!("{} RTS {} requested", "🚨".red(), rts_id.to_string().bright_red().bold());
        } else if let Some(text) = value.get("text").and_then(|v| v.as_str()) {
            let severity = value
                .get("severity")
                .and_then(|v| v.as_str())
                .unwrap_or("Info");
            let tag = match severity {
                "Error" | "Critical" => severity.bright_red(),
                "Debug" => severity.dimmed(),
                _ => severity.bright_green(),
            };
            println!("[{}] {}", tag, text);
        } else if value.get("wp_results").is_some() {
            print_hk_summary(&value);
        }
    }

    Ok(())
}

fn print_hk_summary(hk: &serde_json::Value) {
    let lc_state = match hk.get("lc_state").and_then(|v| v.as_u64()) {
        Some(1) => "ACTIVE".bright_green(),
        Some(2) => "PASSIVE".yellow(),
        Some(3) => "DISABLED".bright_red(),
        _ => "?".dimmed(),
    };
    println!(
        "{} state={} cmds={}/{} samples={} msgs={} rts={} passive_rts={} active_aps={}",
        "📊".bright_blue(),
        lc_state,
        hk.get("cmd_count").and_then(|v| v.as_u64()).unwrap_or(0),
        hk.get("cmd_err_count").and_then(|v| v.as_u64()).unwrap_or(0),
        hk.get("ap_sample_count").and_then(|v| v.as_u64()).unwrap_or(0),
        hk.get("monitored_msg_count")
            .and_then(|v| v.as_u64())
            .unwrap_or(0),
        hk.get("rts_exec_count").and_then(|v| v.as_u64()).unwrap_or(0),
        hk.get("passive_rts_exec_count")
            .and_then(|v| v.as_u64())
            .unwrap_or(0),
        hk.get("active_aps").and_then(|v| v.as_u64()).unwrap_or(0),
    );
}
