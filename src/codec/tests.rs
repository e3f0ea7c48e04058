#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};
    use std::net::{Ipv4Addr, Ipv6Addr};

    use crate::codec::name::{parse_name, write_name};
    use crate::codec::{
        Bitmap, Message, Query, Record, RecordData, TYPE_A, TYPE_AAAA, TYPE_PTR, TYPE_TXT,
        WireError,
    };

    #[test]
    fn test_parse_name_simple() {
        let packet = b"\x04_tcp\x05local\x00";
        let mut offset = 0;
        let name = parse_name(packet, &mut offset).unwrap();
        assert_eq!(name, b"_tcp.local.");
        assert_eq!(offset, 12);
    }

    #[test]
    fn test_parse_name_pointer() {
        // "_tcp.local." at offset 0, then "test" + pointer back to it
        let packet = b"\x04_tcp\x05local\x00\x04test\xc0\x00";
        let mut offset = 12;
        let name = parse_name(packet, &mut offset).unwrap();
        assert_eq!(name, b"test._tcp.local.");
        assert_eq!(offset, 19);
    }

    #[test]
    fn test_parse_name_truncated_label() {
        let packet = b"\x0312";
        let mut offset = 0;
        assert!(parse_name(packet, &mut offset).is_err());
    }

    #[test]
    fn test_parse_name_forward_pointer_rejected() {
        // A pointer must reference an earlier position than itself
        let packet = b"\xc0\x00rest";
        let mut offset = 0;
        assert_eq!(
            parse_name(packet, &mut offset),
            Err(WireError::PointerLoop(0))
        );
    }

    #[test]
    fn test_parse_name_pointer_chain_must_decrease() {
        // Two pointers at 0 and 2; following 2 -> 0 -> 0 would loop
        let packet = b"\xc0\x02\xc0\x02";
        let mut offset = 2;
        assert!(parse_name(packet, &mut offset).is_err());
    }

    fn parse_single_record(packet: &[u8]) -> Record {
        let mut offset = 0;
        Record::parse(packet, &mut offset).unwrap()
    }

    #[test]
    fn test_parse_record_a() {
        let packet = b"\x04test\x00\
                       \x00\x01\
                       \x80\x00\
                       \x00\x00\x0e\x10\
                       \x00\x04\
                       \x7f\x00\x00\x01";
        assert_eq!(packet.len(), 20);
        let record = parse_single_record(packet);
        assert_eq!(record.name, b"test.");
        assert_eq!(record.rtype(), TYPE_A);
        assert!(record.flush_cache);
        assert_eq!(record.ttl, 3600);
        assert_eq!(record.data, RecordData::A(Ipv4Addr::new(127, 0, 0, 1)));
    }

    #[test]
    fn test_parse_record_aaaa() {
        let packet = b"\x04test\x00\
                       \x00\x1c\
                       \x00\x00\
                       \x00\x00\x00\x00\
                       \x00\x10\
                       \x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x01";
        let record = parse_single_record(packet);
        assert_eq!(record.rtype(), TYPE_AAAA);
        assert!(!record.flush_cache);
        assert_eq!(record.data, RecordData::Aaaa(Ipv6Addr::LOCALHOST));
    }

    #[test]
    fn test_parse_record_ptr() {
        let packet = b"\x04test\x00\
                       \x00\x0c\
                       \x00\x00\
                       \x00\x00\x00\x00\
                       \x00\x07\
                       \x05test2\x00";
        let record = parse_single_record(packet);
        assert_eq!(record.rtype(), TYPE_PTR);
        assert_eq!(record.target(), Some(&b"test2."[..]));
    }

    #[test]
    fn test_parse_record_srv() {
        let packet = b"\x04test\x00\
                       \x00\x21\
                       \x00\x00\
                       \x00\x00\x00\x00\
                       \x00\x0d\
                       \x00\x01\x00\x02\x00\x03\
                       \x05test2\x00";
        let record = parse_single_record(packet);
        assert_eq!(
            record.data,
            RecordData::Srv {
                priority: 1,
                weight: 2,
                port: 3,
                target: b"test2.".to_vec(),
            }
        );
    }

    #[test]
    fn test_parse_record_txt() {
        let packet = b"\x04test\x00\
                       \x00\x10\
                       \x00\x00\
                       \x00\x00\x00\x00\
                       \x00\x08\
                       \x03a=a\x03b=b";
        let record = parse_single_record(packet);
        let attributes = match record.data {
            RecordData::Txt { attributes } => attributes,
            other => panic!("expected TXT, got {other:?}"),
        };
        assert_eq!(attributes.len(), 2);
        assert_eq!(attributes[&b"a"[..].to_vec()], b"a");
        assert_eq!(attributes[&b"b"[..].to_vec()], b"b");
    }

    #[test]
    fn test_empty_txt_record_round_trips() {
        let record = Record::new(
            &b"test."[..],
            3600,
            RecordData::Txt {
                attributes: BTreeMap::new(),
            },
        );

        let mut packet = Vec::new();
        let mut name_map = HashMap::new();
        record.write(&mut packet, &mut name_map).unwrap();
        // One placeholder string of length zero
        assert_eq!(&packet[packet.len() - 3..], b"\x00\x01\x00");

        let mut offset = 0;
        let parsed = Record::parse(&packet, &mut offset).unwrap();
        assert_eq!(offset, packet.len());
        assert_eq!(parsed.data, record.data);
    }

    #[test]
    fn test_parse_record_txt_without_separator_fails() {
        let packet = b"\x04test\x00\
                       \x00\x10\
                       \x00\x00\
                       \x00\x00\x00\x00\
                       \x00\x04\
                       \x03abc";
        let mut offset = 0;
        assert_eq!(
            Record::parse(packet, &mut offset),
            Err(WireError::MalformedTxt)
        );
    }

    #[test]
    fn test_parse_record_nsec() {
        let packet = b"\x04test\x00\
                       \x00\x2f\
                       \x00\x01\
                       \x00\x00\x00\x78\
                       \x00\x09\
                       \x04test\x00\x00\x01\x40";
        let record = parse_single_record(packet);
        match &record.data {
            RecordData::Nsec {
                next_domain,
                bitmap,
            } => {
                assert_eq!(next_domain, b"test.");
                // 0x40 is bit 1 of block 0, record type A
                assert!(bitmap.contains(TYPE_A));
                assert!(!bitmap.contains(TYPE_PTR));
            }
            other => panic!("expected NSEC, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_record_nsec_nonzero_window_fails() {
        let packet = b"\x04test\x00\
                       \x00\x2f\
                       \x00\x01\
                       \x00\x00\x00\x78\
                       \x00\x09\
                       \x04test\x00\x01\x01\x40";
        let mut offset = 0;
        assert_eq!(
            Record::parse(packet, &mut offset),
            Err(WireError::BadNsecWindow(1))
        );
    }

    #[test]
    fn test_nsec_record_round_trips() {
        let mut bitmap = Bitmap::new();
        bitmap.set_type(TYPE_A);
        bitmap.set_type(TYPE_TXT);
        let record = Record::new(
            &b"host.local."[..],
            120,
            RecordData::Nsec {
                next_domain: b"host.local.".to_vec(),
                bitmap,
            },
        );

        let mut packet = Vec::new();
        let mut name_map = HashMap::new();
        record.write(&mut packet, &mut name_map).unwrap();

        let mut offset = 0;
        let parsed = Record::parse(&packet, &mut offset).unwrap();
        assert_eq!(offset, packet.len());
        assert_eq!(parsed.data, record.data);
    }

    #[test]
    fn test_parse_record_unknown_type_skipped_by_length() {
        let packet = b"\x04test\x00\
                       \x00\x63\
                       \x00\x00\
                       \x00\x00\x00\x00\
                       \x00\x03\
                       abc";
        let mut offset = 0;
        let record = Record::parse(packet, &mut offset).unwrap();
        assert_eq!(
            record.data,
            RecordData::Other {
                rtype: 0x63,
                rdata: b"abc".to_vec(),
            }
        );
        assert_eq!(offset, packet.len());
    }

    #[test]
    fn test_write_name_compresses_suffix() {
        let mut packet = Vec::new();
        let mut name_map = HashMap::new();
        write_name(&mut packet, b"test._tcp.local.", &mut name_map).unwrap();
        let first_len = packet.len();
        write_name(&mut packet, b"other._tcp.local.", &mut name_map).unwrap();

        // The second name ends in a 2-byte pointer to "_tcp.local." at
        // offset 5 instead of repeating the labels
        assert_eq!(&packet[first_len..], b"\x05other\xc0\x05");

        let mut offset = 0;
        assert_eq!(parse_name(&packet, &mut offset).unwrap(), b"test._tcp.local.");
        assert_eq!(offset, first_len);
        assert_eq!(
            parse_name(&packet, &mut offset).unwrap(),
            b"other._tcp.local."
        );
        assert_eq!(offset, packet.len());
    }

    #[test]
    fn test_write_name_identical_name_is_single_pointer() {
        let mut packet = Vec::new();
        let mut name_map = HashMap::new();
        write_name(&mut packet, b"host.local.", &mut name_map).unwrap();
        let first_len = packet.len();
        write_name(&mut packet, b"host.local.", &mut name_map).unwrap();
        assert_eq!(packet.len(), first_len + 2);
        assert_eq!(&packet[first_len..], b"\xc0\x00");
    }

    #[test]
    fn test_message_response_flag_mask() {
        // 12-byte header, flags 0x8400, no entries
        let packet = b"\x12\x34\x84\x00\x00\x00\x00\x00\x00\x00\x00\x00";
        let message = Message::from_packet(packet, None).unwrap();
        assert_eq!(message.transaction_id, 0x1234);
        assert!(message.response);

        let packet = b"\x12\x34\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00";
        assert!(!Message::from_packet(packet, None).unwrap().response);
    }

    #[test]
    fn test_message_truncated_header_fails() {
        let packet = b"\x12\x34\x84";
        assert!(Message::from_packet(packet, None).is_err());
    }

    #[test]
    fn test_message_round_trip() {
        let mut attributes = BTreeMap::new();
        attributes.insert(b"path".to_vec(), b"/index".to_vec());

        let mut message = Message::new();
        message.transaction_id = 0x0db8;
        message.response = true;
        message.queries.push(Query::new(&b"_http._tcp.local."[..], TYPE_PTR));
        message.records.push(Record {
            name: b"_http._tcp.local.".to_vec(),
            ttl: 4500,
            flush_cache: false,
            data: RecordData::Ptr {
                target: b"web._http._tcp.local.".to_vec(),
            },
        });
        message.records.push(Record {
            name: b"web._http._tcp.local.".to_vec(),
            ttl: 120,
            flush_cache: true,
            data: RecordData::Srv {
                priority: 0,
                weight: 0,
                port: 8080,
                target: b"host.local.".to_vec(),
            },
        });
        message.records.push(Record {
            name: b"web._http._tcp.local.".to_vec(),
            ttl: 4500,
            flush_cache: true,
            data: RecordData::Txt { attributes },
        });

        let packet = message.to_packet().unwrap();
        let parsed = Message::from_packet(&packet, None).unwrap();

        assert_eq!(parsed, message);
        // Record equality is identity-only, so check the fields it
        // excludes explicitly
        for (a, b) in parsed.records.iter().zip(message.records.iter()) {
            assert_eq!(a.ttl, b.ttl);
            assert_eq!(a.flush_cache, b.flush_cache);
        }
    }

    #[test]
    fn test_record_identity_excludes_ttl() {
        let a = Record::new(&b"test."[..], 3600, RecordData::A(Ipv4Addr::LOCALHOST));
        let mut b = a.clone();
        b.ttl = 0;
        b.flush_cache = true;
        assert_eq!(a, b);

        let c = Record::new(
            &b"test."[..],
            3600,
            RecordData::A(Ipv4Addr::new(127, 0, 0, 2)),
        );
        assert_ne!(a, c);
    }
}
