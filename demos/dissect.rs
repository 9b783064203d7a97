//! Packet dissection demo
//! Builds an Ethernet/IPv4/UDP frame, or takes a hex frame from the command
//! line, decodes it and prints every layer. Set `RUST_LOG=trace` to see the
//! decoder's events.

use std::net::Ipv4Addr;

use toy_packet::{
    decode, EtherType, EthernetHeader, IpProtocol, Ipv4Builder, Layer, Protocol, UdpHeader,
};
use tracing_subscriber::EnvFilter;

fn sample_frame() -> toy_packet::Result<Vec<u8>> {
    let src = Ipv4Addr::new(192, 168, 1, 1);
    let dst = Ipv4Addr::new(192, 168, 1, 2);
    let builder = Ipv4Builder::new(src, dst)
        .protocol(IpProtocol::Udp)
        .identification(0x1c46)
        .dont_fragment(true);

    // The UDP checksum covers a pseudo-header, so fill it against a header
    // with the final addresses before wrapping the datagram.
    let mut udp = UdpHeader::build(8080, 9090, b"Hello, UDP!")?;
    let shell = builder.build(&[])?;
    udp.fill_checksum(&toy_packet::Ipv4Header::parse(&shell[..])?)?;
    let packet = builder.build(&udp.into_inner())?;

    let mut frame = vec![0u8; 14];
    frame.extend_from_slice(&packet);
    let mut eth = EthernetHeader::new_unchecked(&mut frame[..]);
    eth.set_dst([0x02, 0x00, 0x00, 0x00, 0x00, 0x02]);
    eth.set_src([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);
    eth.set_ethertype(EtherType::Ipv4);
    Ok(frame)
}

fn parse_hex(text: &str) -> Option<Vec<u8>> {
    let digits: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.len() % 2 != 0 {
        return None;
    }
    digits
        .chunks(2)
        .map(|pair| {
            let byte: String = pair.iter().collect();
            u8::from_str_radix(&byte, 16).ok()
        })
        .collect()
}

fn describe(layer: &Layer, frame: &[u8]) -> String {
    match layer.protocol() {
        Protocol::Ethernet => layer.ethernet(frame).map(|h| format!("{h:?}")),
        Protocol::Ipv4 => layer
            .ipv4(frame)
            .map(|h| format!("{h:?} checksum ok: {}", h.valid_checksum())),
        Protocol::Ipv6 => layer.ipv6(frame).map(|h| format!("{h:?}")),
        Protocol::Icmp => layer
            .icmp(frame)
            .map(|h| format!("{h:?} checksum ok: {}", h.valid_checksum())),
        Protocol::Tcp => layer.tcp(frame).map(|h| format!("{h:?}")),
        Protocol::Udp => layer.udp(frame).map(|h| format!("{h:?}")),
    }
    .unwrap_or_else(|| "<unreadable>".to_string())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Packet dissection ===");

    let frame = match std::env::args().nth(1) {
        Some(text) => match parse_hex(&text) {
            Some(frame) => frame,
            None => {
                eprintln!("argument is not an even-length hex string");
                std::process::exit(2);
            }
        },
        None => match sample_frame() {
            Ok(frame) => frame,
            Err(e) => {
                eprintln!("failed to build sample frame: {e}");
                std::process::exit(1);
            }
        },
    };
    println!("frame: {} bytes", frame.len());

    let chain = match decode(&frame, 0, Protocol::Ethernet, std::time::SystemTime::now()) {
        Ok(chain) => chain,
        Err(partial) => {
            println!("decoding stopped early: {}", partial.error);
            partial.into_chain()
        }
    };

    for (depth, layer) in chain.iter().enumerate() {
        println!(
            "\n{}. {} at {:?}",
            depth + 1,
            layer.protocol(),
            layer.header().range()
        );
        println!("   {}", describe(layer, &frame));
        if let Some(next) = layer.next() {
            println!("   carries: {next}");
        }
    }

    let rest = chain.payload_bytes(&frame).unwrap_or_default();
    println!("\npayload: {} bytes {:02x?}", rest.len(), rest);
}
