//! Exercises the public `Client` API end to end against a scripted `Transport`, one reply per
//! `send_unit_data` call, in the order the client is expected to issue them.

use std::collections::VecDeque;

use rscip::transport::Transport;
use rscip::{Client, CipType, Scope, Value};

const ENCAP_SEND_UNIT_DATA: u16 = 0x70;
const UNIT_DATA_SERVICE_OFFSET: usize = 46;
const UNIT_DATA_STATUS_OFFSET: usize = 48;
const UNIT_DATA_PAYLOAD_OFFSET: usize = 50;

/// Wraps a service payload in the same fixed-offset `send_unit_data` header shape the client's
/// reply classifier expects.
fn unit_data_reply(general_status: u8, reply_service: u8, payload: &[u8]) -> Vec<u8> {
    let mut buf = vec![0u8; UNIT_DATA_PAYLOAD_OFFSET];
    buf[0..2].copy_from_slice(&ENCAP_SEND_UNIT_DATA.to_le_bytes());
    buf[UNIT_DATA_SERVICE_OFFSET] = reply_service;
    buf[UNIT_DATA_STATUS_OFFSET] = general_status;
    buf.extend_from_slice(payload);
    buf
}

/// A `Transport` whose replies are pre-scripted in call order. Panics if more requests go out
/// than replies were queued, so a missing script entry fails loudly instead of hanging.
#[derive(Debug)]
struct MockTransport {
    replies: VecDeque<Vec<u8>>,
    open: bool,
}

impl MockTransport {
    fn new(replies: Vec<Vec<u8>>) -> Self {
        Self { replies: replies.into(), open: false }
    }
}

impl Transport for MockTransport {
    fn forward_open(&mut self) -> bool {
        self.open = true;
        true
    }

    fn is_connected(&self) -> bool {
        self.open
    }

    fn send_unit_data(&mut self, _service: u8, _path: &[u8], _body: &[u8]) -> Option<Vec<u8>> {
        Some(self.replies.pop_front().expect("mock transport ran out of scripted replies"))
    }
}

fn dint_payload(value: i32) -> Vec<u8> {
    let mut buf = 0xC4u16.to_le_bytes().to_vec();
    buf.extend_from_slice(&value.to_le_bytes());
    buf
}

#[test]
fn reads_a_plain_dint_tag() {
    let mut client = Client::new(MockTransport::new(vec![unit_data_reply(0x00, 0xCC, &dint_payload(42))]));
    let (value, ty) = client.read_tag("Counter").unwrap();
    assert_eq!(value, Value::Dint(42));
    assert_eq!(ty, CipType::Dint);
}

#[test]
fn reads_a_single_bit_of_a_dint() {
    // 0x0000000A has bits 1 and 3 set.
    let mut client = Client::new(MockTransport::new(vec![unit_data_reply(0x00, 0xCC, &dint_payload(0x0A))]));
    let (value, ty) = client.read_tag("Counts.3").unwrap();
    assert_eq!(value, Value::Bool(true));
    assert_eq!(ty, CipType::Bool);
}

#[test]
fn multi_read_reports_partial_failure_per_tag() {
    let sub_a = {
        let mut b = vec![0xCC, 0x00, 0x00, 0x00];
        b.extend_from_slice(&dint_payload(111));
        b
    };
    let sub_b = vec![0xCC, 0x00, 0x04, 0x00]; // failed, no value
    let sub_c = {
        let mut b = vec![0xCC, 0x00, 0x00, 0x00];
        b.extend_from_slice(&dint_payload(222));
        b
    };

    let header_len = 2 + 2 * 3;
    let off_a = header_len as u16;
    let off_b = (header_len + sub_a.len()) as u16;
    let off_c = (header_len + sub_a.len() + sub_b.len()) as u16;

    let mut payload = 3u16.to_le_bytes().to_vec();
    payload.extend_from_slice(&off_a.to_le_bytes());
    payload.extend_from_slice(&off_b.to_le_bytes());
    payload.extend_from_slice(&off_c.to_le_bytes());
    payload.extend_from_slice(&sub_a);
    payload.extend_from_slice(&sub_b);
    payload.extend_from_slice(&sub_c);

    let mut client = Client::new(MockTransport::new(vec![unit_data_reply(0x00, 0xCC, &payload)]));
    let results = client.read_tags(&["A", "B", "C"]).unwrap();

    assert_eq!(results[0], ("A".to_string(), Some((Value::Dint(111), CipType::Dint))));
    assert_eq!(results[1], ("B".to_string(), None));
    assert_eq!(results[2], ("C".to_string(), Some((Value::Dint(222), CipType::Dint))));
}

#[test]
fn fragmented_array_read_runs_to_completion_across_replies() {
    let mut first = 0xC4u16.to_le_bytes().to_vec();
    for i in 0..200i32 {
        first.extend_from_slice(&i.to_le_bytes());
    }
    let mut second = 0xC4u16.to_le_bytes().to_vec();
    for i in 200..300i32 {
        second.extend_from_slice(&i.to_le_bytes());
    }

    let mut client = Client::new(MockTransport::new(vec![
        unit_data_reply(0x06, 0x52 | 0x80, &first),
        unit_data_reply(0x00, 0x52 | 0x80, &second),
    ]));

    let values = client.read_array("Tbl", 300).unwrap();
    assert_eq!(values.len(), 300);
    assert_eq!(values[0], Value::Dint(0));
    assert_eq!(values[199], Value::Dint(199));
    assert_eq!(values[299], Value::Dint(299));
}

fn symbol_entry_bytes(instance_id: u32, name: &str, symbol_type: u16) -> Vec<u8> {
    let mut buf = instance_id.to_le_bytes().to_vec();
    buf.extend_from_slice(&(name.len() as u16).to_le_bytes());
    buf.extend_from_slice(name.as_bytes());
    buf.extend_from_slice(&symbol_type.to_le_bytes());
    buf
}

#[test]
fn symbol_enumeration_pages_through_and_routes_program_headers_separately() {
    let mut page1 = Vec::new();
    page1.extend(symbol_entry_bytes(100, "Program:MainRoutine", 0x0000));
    for (n, id) in [("Tag1", 101u32), ("Tag2", 102), ("Tag3", 103), ("Tag4", 104)] {
        page1.extend(symbol_entry_bytes(id, n, 0x00C4));
    }

    let mut page2 = Vec::new();
    for (n, id) in [("Tag5", 105u32), ("Tag6", 106), ("Tag7", 107)] {
        page2.extend(symbol_entry_bytes(id, n, 0x00C4));
    }

    let mut client = Client::new(MockTransport::new(vec![
        unit_data_reply(0x06, 0x55, &page1),
        unit_data_reply(0x00, 0x55, &page2),
    ]));

    let tags = client.get_tag_list(Scope::Controller).unwrap();
    assert_eq!(tags.len(), 7);
    assert!(tags.iter().all(|t| t.name() != "Program:MainRoutine"));
    assert!(tags.iter().any(|t| t.name() == "Tag1"));
    assert!(tags.iter().any(|t| t.name() == "Tag7"));
}

#[test]
fn scope_all_also_enumerates_programs_discovered_during_controller_scope() {
    let mut controller_page = Vec::new();
    controller_page.extend(symbol_entry_bytes(1, "Program:MainRoutine", 0x0000));
    controller_page.extend(symbol_entry_bytes(2, "GlobalTag", 0x00C4));

    let mut program_page = Vec::new();
    program_page.extend(symbol_entry_bytes(3, "LocalTag", 0x00C4));

    let mut client = Client::new(MockTransport::new(vec![
        unit_data_reply(0x00, 0x55, &controller_page),
        unit_data_reply(0x00, 0x55, &program_page),
    ]));

    let tags = client.get_tag_list(Scope::All).unwrap();
    assert_eq!(tags.len(), 2);
    assert!(tags.iter().any(|t| t.name() == "GlobalTag"));
    assert!(tags.iter().any(|t| t.name() == "LocalTag"));
}

/// Builds a structure-makeup reply payload for the four attributes the client requests, in the
/// order it requests them (object definition size, structure size, member count, handle).
fn structure_makeup_payload(object_definition_size: u32, structure_size: u32, member_count: u16, handle: u16) -> Vec<u8> {
    let mut payload = vec![0u8; 4]; // response header the service always prepends
    payload.extend_from_slice(&0u16.to_le_bytes());
    payload.extend_from_slice(&object_definition_size.to_le_bytes());
    payload.extend_from_slice(&0u16.to_le_bytes());
    payload.extend_from_slice(&structure_size.to_le_bytes());
    payload.extend_from_slice(&0u16.to_le_bytes());
    payload.extend_from_slice(&member_count.to_le_bytes());
    payload.extend_from_slice(&0u16.to_le_bytes());
    payload.extend_from_slice(&handle.to_le_bytes());
    payload
}

#[test]
fn builds_a_udt_descriptor_with_a_nested_struct_member() {
    // Outer: 3 members -- (array_size, type_code, offset).
    let mut outer_table = Vec::new();
    for (array_size, type_code, offset) in [(1u16, 0xC4u16, 0u32), (1, 0x0201, 4), (10, 0xC2, 20)] {
        outer_table.extend_from_slice(&array_size.to_le_bytes());
        outer_table.extend_from_slice(&type_code.to_le_bytes());
        outer_table.extend_from_slice(&offset.to_le_bytes());
    }
    let mut outer_bytes = outer_table;
    outer_bytes.push(0);
    outer_bytes.extend_from_slice(b"Outer;descxy;");
    outer_bytes.push(0);
    assert_eq!(outer_bytes.len() as u32, 39);

    // Nested: 1 member -- (1, REAL, 0).
    let mut nested_bytes = Vec::new();
    nested_bytes.extend_from_slice(&1u16.to_le_bytes());
    nested_bytes.extend_from_slice(&0xCAu16.to_le_bytes());
    nested_bytes.extend_from_slice(&0u32.to_le_bytes());
    nested_bytes.push(0);
    nested_bytes.extend_from_slice(b"Inner;tag;");
    nested_bytes.extend_from_slice(&[0, 0, 0, 0]);
    assert_eq!(nested_bytes.len() as u32, 23);

    let mut list_page = Vec::new();
    list_page.extend(symbol_entry_bytes(1, "Outer", 0x8000 | 500));

    let replies = vec![
        unit_data_reply(0x00, 0x55, &list_page),                      // Get Instance Attributes List
        unit_data_reply(0x00, 0x03, &structure_makeup_payload(15, 30, 3, 1)), // outer structure makeup
        unit_data_reply(0x00, 0x4B, &outer_bytes),                     // outer Read Template
        unit_data_reply(0x00, 0x03, &structure_makeup_payload(11, 12, 1, 1)), // nested structure makeup
        unit_data_reply(0x00, 0x4B, &nested_bytes),                    // nested Read Template
    ];

    let mut client = Client::new(MockTransport::new(replies));
    let tags = client.get_tag_list(Scope::Controller).unwrap();
    assert_eq!(tags.len(), 1);

    let udt = match &tags[0] {
        rscip::Tag::Struct { udt, .. } => udt.as_ref().expect("udt should have resolved"),
        other => panic!("expected a struct tag, got {:?}", other),
    };
    assert_eq!(udt.name, "Outer");
    assert_eq!(udt.members.len(), 3);

    assert!(matches!(udt.members[0].member_type, rscip::MemberType::Atomic(CipType::Dint)));
    assert_eq!(udt.members[0].offset, 0);

    match &udt.members[1].member_type {
        rscip::MemberType::Struct(inner) => {
            assert_eq!(inner.name, "Inner");
            assert_eq!(inner.members.len(), 1);
            assert!(matches!(inner.members[0].member_type, rscip::MemberType::Atomic(CipType::Real)));
        }
        other => panic!("expected a nested struct member, got {:?}", other),
    }
    assert_eq!(udt.members[1].offset, 4);

    assert!(matches!(udt.members[2].member_type, rscip::MemberType::Atomic(CipType::Sint)));
    assert_eq!(udt.members[2].array_size, 10);
    assert_eq!(udt.members[2].offset, 20);
}

#[test]
fn write_then_read_round_trips_through_last_tag_accessors() {
    let mut client = Client::new(MockTransport::new(vec![
        unit_data_reply(0x00, 0xCD, &[]),
        unit_data_reply(0x00, 0xCC, &dint_payload(7)),
    ]));

    client.write_tag("Counter", CipType::Dint, Value::Dint(7)).unwrap();
    assert_eq!(client.get_last_tag_write(), Some(&("Counter".to_string(), Value::Dint(7))));

    let (value, _) = client.read_tag("Counter").unwrap();
    assert_eq!(value, Value::Dint(7));
    assert_eq!(client.get_last_tag_read(), Some(&("Counter".to_string(), Value::Dint(7))));
}

#[test]
fn string_round_trips_through_len_and_data_members() {
    let written = "hello";
    let size = rscip::client::Options::default().default_string_size;

    // write_string: one write for LEN, one fragmented write for DATA (fits in a single fragment).
    let write_replies = vec![unit_data_reply(0x00, 0xCD, &[]), unit_data_reply(0x00, 0x53, &[])];
    let mut client = Client::new(MockTransport::new(write_replies));
    client.write_string("Message", written).unwrap();

    // read_string: a LEN read, then a fragmented DATA read of `size` SINTs.
    let mut data_payload = 0xC2u16.to_le_bytes().to_vec();
    let mut data = written.as_bytes().to_vec();
    data.resize(size, 0);
    data_payload.extend(data.iter().map(|&b| b as i8 as u8));

    let read_replies = vec![
        unit_data_reply(0x00, 0xCC, &dint_payload(written.len() as i32)),
        unit_data_reply(0x00, 0x52 | 0x80, &data_payload),
    ];
    let mut client = Client::new(MockTransport::new(read_replies));
    let read_back = client.read_string("Message").unwrap();
    assert_eq!(read_back, written);
}
