//! Property and boundary tests for the IPv4 header view
//!
//! 1. Any header with its checksum filled in validates
//! 2. Payload length always follows total length and IHL
//! 3. Built packets parse back to what was asked for
//! 4. Version and IHL share a byte without disturbing each other
//! 5. Length setters agree with each other in any order

use std::net::Ipv4Addr;

use proptest::{
    array::uniform20,
    collection::vec,
    prelude::{any, ProptestConfig},
    prop_assert, prop_assert_eq, prop_oneof, proptest,
    strategy::Strategy,
};
use toy_packet::{
    network::{ipv4::flags, pseudo},
    Error, IpHeader, IpProtocol, Ipv4Builder, Ipv4Header, Malformed, Protocol, UdpHeader,
};

const SAMPLE: [u8; 20] = [
    0x45, 0x00, 0x00, 0x28, 0x1c, 0x46, 0x40, 0x00, 0x40, 0x06, 0x00, 0x00, 0xc0, 0xa8, 0x00, 0x01,
    0xc0, 0xa8, 0x00, 0x02,
];

#[derive(Debug, Clone)]
enum LengthWrite {
    HeaderWords(u8),
    Total(u16),
    Payload(u16),
}

fn length_write() -> impl Strategy<Value = LengthWrite> {
    prop_oneof![
        (5u8..=15).prop_map(LengthWrite::HeaderWords),
        any::<u16>().prop_map(LengthWrite::Total),
        any::<u16>().prop_map(LengthWrite::Payload),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2_000))]

    #[test]
    fn filled_checksum_always_validates(mut bytes in uniform20(any::<u8>())) {
        bytes[0] = 0x45;
        let mut header = Ipv4Header::parse(&mut bytes[..]).unwrap();
        header.fill_checksum().unwrap();
        prop_assert!(header.valid_checksum());
        prop_assert_eq!(header.compute_checksum(), Some(header.checksum()));
    }

    #[test]
    fn payload_len_tracks_total_len(ihl in 5u8..=15, total in any::<u16>()) {
        let mut bytes = vec![0u8; 60];
        bytes[0] = 0x40 | ihl;
        let mut header = Ipv4Header::parse(&mut bytes[..]).unwrap();
        header.set_total_len(total);
        let expected = total.saturating_sub(ihl as u16 * 4);
        prop_assert_eq!(header.payload_len(), expected);
    }

    #[test]
    fn interleaved_length_writes(writes in vec(length_write(), 1..32)) {
        let mut bytes = [0u8; 60];
        bytes[0] = 0x45;
        let mut header = Ipv4Header::parse(&mut bytes[..]).unwrap();

        for write in writes {
            match write {
                LengthWrite::HeaderWords(words) => {
                    header.set_header_len_words(words).unwrap();
                    prop_assert_eq!(header.header_len_words(), words);
                    prop_assert_eq!(header.version(), 4);
                }
                LengthWrite::Total(total) => {
                    header.set_total_len(total);
                    prop_assert_eq!(header.total_len(), total);
                }
                LengthWrite::Payload(len) => {
                    let before = header.total_len();
                    match header.set_payload_len(len) {
                        Ok(()) => {
                            prop_assert_eq!(header.payload_len(), len);
                        }
                        Err(err) => {
                            prop_assert!(matches!(err, Error::FieldRange { .. }), "expected FieldRange error, got {:?}", err);
                            prop_assert!(header.header_len() + len as usize > u16::MAX as usize);
                            prop_assert_eq!(header.total_len(), before);
                        }
                    }
                }
            }
            let expected = header.total_len().saturating_sub(header.header_len() as u16);
            prop_assert_eq!(header.payload_len(), expected);
        }
    }

    #[test]
    fn built_header_keeps_explicit_fields(
        src in any::<[u8; 4]>(),
        dst in any::<[u8; 4]>(),
        tos in any::<u8>(),
        dscp in 0u8..64,
        ecn in 0u8..4,
        flag_bits in any::<u8>(),
        offset in 0u16..0x2000,
        protocol in any::<u8>(),
        id in any::<u16>(),
        ttl in any::<u8>(),
        checksum in any::<u16>(),
    ) {
        let (src, dst) = (Ipv4Addr::from(src), Ipv4Addr::from(dst));
        let mut header = Ipv4Header::build(src, dst);
        header.set_tos(tos);
        prop_assert_eq!(header.tos(), tos);
        header.set_dscp(dscp);
        header.set_ecn(ecn);
        header.set_flags(flag_bits);
        header.set_fragment_offset(offset);
        header.set_protocol(IpProtocol::from(protocol));
        header.set_identification(id);
        header.set_ttl(ttl);
        header.set_checksum(checksum);

        let bytes = header.into_inner();
        let header = Ipv4Header::parse(&bytes[..]).unwrap();
        prop_assert_eq!(header.version(), 4);
        prop_assert_eq!(header.header_len_words(), 5);
        prop_assert_eq!(header.total_len(), 20);
        prop_assert!(header.payload().is_empty());
        prop_assert_eq!(header.tos(), dscp << 2 | ecn);
        prop_assert_eq!(header.dscp(), dscp);
        prop_assert_eq!(header.ecn(), ecn);
        prop_assert_eq!(header.flags(), flag_bits & 0x07);
        prop_assert_eq!(header.dont_fragment(), flag_bits & flags::DONT_FRAGMENT != 0);
        prop_assert_eq!(header.more_fragments(), flag_bits & flags::MORE_FRAGMENTS != 0);
        prop_assert_eq!(header.fragment_offset(), offset);
        prop_assert_eq!(u8::from(header.protocol()), protocol);
        prop_assert_eq!(header.identification(), id);
        prop_assert_eq!(header.ttl(), ttl);
        prop_assert_eq!(header.checksum(), checksum);
        prop_assert_eq!(header.src_addr(), src);
        prop_assert_eq!(header.dst_addr(), dst);
    }

    #[test]
    fn builder_round_trips(
        src in any::<[u8; 4]>(),
        dst in any::<[u8; 4]>(),
        ttl in any::<u8>(),
        id in any::<u16>(),
        dont_fragment in any::<bool>(),
        payload in vec(any::<u8>(), 0..256),
    ) {
        let (src, dst) = (Ipv4Addr::from(src), Ipv4Addr::from(dst));
        let packet = Ipv4Builder::new(src, dst)
            .protocol(IpProtocol::Udp)
            .ttl(ttl)
            .identification(id)
            .dont_fragment(dont_fragment)
            .build(&payload)
            .unwrap();

        let header = Ipv4Header::parse(&packet[..]).unwrap();
        prop_assert_eq!(header.version(), 4);
        prop_assert_eq!(header.header_len(), 20);
        prop_assert_eq!(header.total_len() as usize, 20 + payload.len());
        prop_assert_eq!(header.src_addr(), src);
        prop_assert_eq!(header.dst_addr(), dst);
        prop_assert_eq!(header.ttl(), ttl);
        prop_assert_eq!(header.identification(), id);
        prop_assert_eq!(header.dont_fragment(), dont_fragment);
        prop_assert_eq!(header.protocol(), IpProtocol::Udp);
        prop_assert_eq!(header.payload(), &payload[..]);
        prop_assert!(header.valid_checksum());
    }

    #[test]
    fn flags_and_fragment_offset_are_independent(value in any::<u8>(), offset in 0u16..0x2000) {
        let mut bytes = SAMPLE;
        let mut header = Ipv4Header::new_unchecked(&mut bytes[..]);
        header.set_fragment_offset(offset);
        header.set_flags(value);
        prop_assert_eq!(header.flags(), value & 0x07);
        prop_assert_eq!(header.fragment_offset(), offset);
        prop_assert_eq!(header.identification(), 0x1c46);
        prop_assert_eq!(header.ttl(), 64);
    }

    #[test]
    fn arbitrary_bytes_never_panic(bytes in vec(any::<u8>(), 0..80)) {
        if let Ok(header) = Ipv4Header::parse(&bytes[..]) {
            prop_assert!(header.header_len() >= 20);
            prop_assert!(header.header_len() <= bytes.len());
            prop_assert!(header.payload().len() <= bytes.len() - header.header_len());
            let _ = header.valid_checksum();
            let _ = format!("{header:?}");
        }
    }
}

#[test]
fn every_version_and_ihl_nibble() {
    for version in 0u8..16 {
        for ihl in 0u8..16 {
            let mut bytes = [0u8; 60];
            bytes[0] = version << 4 | ihl;

            let mut header = Ipv4Header::new_unchecked(&mut bytes[..]);
            header.set_version(!version & 0x0F);
            assert_eq!(header.header_len_words(), ihl);
            header.set_version(version);
            if ihl >= 5 {
                let other = if ihl == 15 { 5 } else { ihl + 1 };
                header.set_header_len_words(other).unwrap();
                assert_eq!(header.version(), version);
                header.set_header_len_words(ihl).unwrap();
            } else {
                assert!(matches!(
                    header.set_header_len_words(ihl),
                    Err(Error::FieldRange { .. })
                ));
            }
            assert_eq!(bytes[0], version << 4 | ihl);

            match Ipv4Header::parse(&bytes[..]) {
                Ok(header) => {
                    assert!(ihl >= 5);
                    assert_eq!(header.version(), version);
                    assert_eq!(header.header_len(), ihl as usize * 4);
                }
                Err(err) => {
                    assert!(ihl < 5, "ihl {ihl} rejected: {err}");
                    assert!(matches!(
                        err,
                        Error::MalformedHeader {
                            protocol: Protocol::Ipv4,
                            reason: Malformed::HeaderLengthTooSmall { minimum: 20, .. },
                        }
                    ));
                }
            }
        }
    }
}

#[test]
fn length_boundaries() {
    let err = Ipv4Header::parse(&SAMPLE[..19]).unwrap_err();
    assert!(matches!(
        err,
        Error::MalformedHeader {
            reason: Malformed::BufferTooShort {
                available: 19,
                minimum: 20
            },
            ..
        }
    ));

    let header = Ipv4Header::parse(&SAMPLE[..]).unwrap();
    assert!(header.payload().is_empty());

    let mut bytes = SAMPLE;
    bytes[0] = 0x44;
    let err = Ipv4Header::parse(&bytes[..]).unwrap_err();
    assert!(matches!(
        err,
        Error::MalformedHeader {
            reason: Malformed::HeaderLengthTooSmall {
                declared: 16,
                minimum: 20
            },
            ..
        }
    ));

    bytes[0] = 0x46;
    let err = Ipv4Header::parse(&bytes[..]).unwrap_err();
    assert_eq!(
        err,
        Error::TruncatedPacket {
            protocol: Protocol::Ipv4,
            declared: 24,
            available: 20
        }
    );
}

#[test]
fn sample_header_checksum() {
    let mut bytes = SAMPLE;
    let mut header = Ipv4Header::parse(&mut bytes[..]).unwrap();
    assert_eq!(header.compute_checksum(), Some(0x9d36));
    assert_eq!(header.checksum(), 0);

    header.fill_checksum().unwrap();
    assert!(header.valid_checksum());

    header.set_ttl(63);
    assert!(!header.valid_checksum());
}

#[test]
fn pseudo_header_layout() {
    let src = Ipv4Addr::new(10, 0, 0, 1);
    let dst = Ipv4Addr::new(10, 0, 0, 2);
    let bytes = pseudo::ipv4(src, dst, 6, &[0xAA, 0xBB, 0xCC, 0xDD]).unwrap();
    assert_eq!(
        bytes,
        [
            10, 0, 0, 1, 10, 0, 0, 2, 0x00, 0x06, 0x00, 0x04, 0xAA, 0xBB, 0xCC, 0xDD
        ]
    );

    let mut header = Ipv4Header::build(src, dst);
    header.set_protocol(IpProtocol::Tcp);
    assert_eq!(header.pseudo_header(&[0xAA, 0xBB, 0xCC, 0xDD]).unwrap(), bytes);
}

#[test]
fn udp_over_built_packet() {
    let src = Ipv4Addr::new(192, 168, 1, 10);
    let dst = Ipv4Addr::new(192, 168, 1, 20);
    let builder = Ipv4Builder::new(src, dst)
        .protocol(IpProtocol::Udp)
        .dont_fragment(true);

    let mut udp = UdpHeader::build(40000, 53, b"hello").unwrap();
    let shell = builder.build(&[]).unwrap();
    udp.fill_checksum(&Ipv4Header::parse(&shell[..]).unwrap()).unwrap();

    let packet = builder.build(&udp.into_inner()).unwrap();
    let ip = Ipv4Header::parse(&packet[..]).unwrap();
    assert!(ip.valid_checksum());
    assert_eq!(ip.flags(), flags::DONT_FRAGMENT);

    let udp = UdpHeader::parse(ip.payload()).unwrap();
    assert!(udp.valid_checksum(&ip));
    assert_eq!(udp.payload(), b"hello");
}
