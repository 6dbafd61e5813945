//! `comport-probe`: open a shared port, send a request and print the replies.

use clap::Parser;
use shared_comport::config::{Config, ConfigLoader};
use shared_comport::port::{device_exists, EmulatedDevice};
use shared_comport::{logging, PortId, Registry, TransportKind};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

/// Upper bound on bytes collected per poll.
const POLL_LIMIT: usize = 4096;

#[derive(Parser, Debug)]
#[command(
    name = "comport-probe",
    version,
    about = "Open a shared serial, gateway or emulated port, send data and print what comes back.",
    long_about = "Identifiers starting with COM, tty, /dev or cua open a local serial device; FAKE and EMULATED open an echoing emulated device; anything else is a TCP gateway as host[:port]. Aliases from the configuration file are resolved first."
)]
struct Args {
    /// Port identifier or alias, e.g. COM5, /dev/ttyUSB0, 192.168.1.10:4001, FAKE1
    port: String,

    /// Configuration file (default: COMPORT_CONFIG, ./comport.toml, user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Text to send; \r, \n, \t and \\ escapes are understood
    #[arg(short, long)]
    send: Option<String>,

    /// Bytes appended after the text, as hex pairs: "0d 0a"
    #[arg(long, value_parser = parse_hex)]
    hex: Option<HexBytes>,

    /// Serial line parameter, repeatable: baud_rate=115200, parity=even, timeout=0.5
    #[arg(short = 'p', long = "param", value_parser = parse_param)]
    params: Vec<(String, String)>,

    /// Number of read polls after sending
    #[arg(short = 'n', long, default_value_t = 10)]
    polls: u32,

    /// Delay between read polls in milliseconds
    #[arg(long, default_value_t = 100)]
    interval_ms: u64,

    /// Only report whether the port is ready
    #[arg(long)]
    check: bool,
}

/// Parsed `--hex` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
struct HexBytes(Vec<u8>);

fn parse_hex(input: &str) -> Result<HexBytes, String> {
    input
        .split_whitespace()
        .map(|token| {
            u8::from_str_radix(token.trim_start_matches("0x"), 16)
                .map_err(|_| format!("'{token}' is not a hex byte"))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(HexBytes)
}

fn parse_param(input: &str) -> Result<(String, String), String> {
    match input.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected key=value, got '{input}'")),
    }
}

fn unescape(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        match chars.next() {
            Some('r') => out.push(b'\r'),
            Some('n') => out.push(b'\n'),
            Some('t') => out.push(b'\t'),
            Some('\\') => out.push(b'\\'),
            Some(other) => {
                out.push(b'\\');
                let mut buf = [0u8; 4];
                out.extend_from_slice(other.encode_utf8(&mut buf).as_bytes());
            }
            None => out.push(b'\\'),
        }
    }
    out
}

fn to_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn to_printable(data: &[u8]) -> String {
    String::from_utf8_lossy(data).escape_debug().to_string()
}

fn load_config(path: Option<&PathBuf>) -> Result<Config, Box<dyn std::error::Error>> {
    let loader = match path {
        Some(path) => ConfigLoader::load_from(path)?,
        None => ConfigLoader::load()?,
    };
    Ok(loader.into_config())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(args.config.as_ref())?;
    logging::init(&config.logging)?;

    let id: PortId = config.resolve_port(&args.port).parse()?;
    let mut options = config.port_options();
    for (key, value) in &args.params {
        options.serial.apply_param(key, value)?;
    }
    if id.kind() == TransportKind::Emulated {
        options = options.with_emulator(EmulatedDevice::echo(id.as_str()).factory());
    }

    let port = Registry::global().acquire(&id, &options);
    let ready = port.ready();
    println!("{id} ({}): {}", id.kind(), if ready { "ready" } else { "not ready" });

    if args.check {
        if id.kind() == TransportKind::LocalSerial {
            let listed = device_exists(id.as_str());
            println!("{id}: device {}", if listed { "present" } else { "not listed" });
        }
        port.release();
        return Ok(());
    }

    let mut request = args.send.as_deref().map(unescape).unwrap_or_default();
    if let Some(HexBytes(tail)) = &args.hex {
        request.extend_from_slice(tail);
    }
    if !request.is_empty() {
        let written = port.write(&request);
        println!("> {} [{}] ({written}/{} bytes)", to_printable(&request), to_hex(&request), request.len());
    }

    let interval = Duration::from_millis(args.interval_ms);
    for _ in 0..args.polls {
        let data = port.read_available(POLL_LIMIT);
        if !data.is_empty() {
            println!("< {} [{}]", to_printable(&data), to_hex(&data));
        }
        thread::sleep(interval);
    }

    if port.is_suspended() {
        println!("{id}: suspended");
    }
    port.release();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("41 54 0d").unwrap(), HexBytes(vec![0x41, 0x54, 0x0d]));
        assert_eq!(parse_hex("0x0A").unwrap(), HexBytes(vec![0x0a]));
        assert!(parse_hex("zz").is_err());
        assert!(parse_hex("100").is_err());
    }

    #[test]
    fn test_parse_param() {
        assert_eq!(
            parse_param("baud_rate = 115200").unwrap(),
            ("baud_rate".to_string(), "115200".to_string())
        );
        assert!(parse_param("baud_rate").is_err());
        assert!(parse_param("=5").is_err());
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r"AT\r\n"), b"AT\r\n");
        assert_eq!(unescape(r"a\\b"), b"a\\b");
        assert_eq!(unescape(r"\x"), b"\\x");
        assert_eq!(unescape("\\"), b"\\");
    }

    #[test]
    fn test_hex_and_printable() {
        assert_eq!(to_hex(b"AT\r"), "41 54 0D");
        assert_eq!(to_printable(b"AT\r"), "AT\\r");
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "comport-probe",
            "FAKE1",
            "--send",
            "AT",
            "--hex",
            "0d",
            "-p",
            "parity=even",
            "--polls",
            "2",
        ])
        .unwrap();
        assert_eq!(args.port, "FAKE1");
        assert_eq!(args.hex, Some(HexBytes(vec![0x0d])));
        assert_eq!(args.params, vec![("parity".to_string(), "even".to_string())]);
        assert_eq!(args.polls, 2);
        assert!(!args.check);
    }
}
