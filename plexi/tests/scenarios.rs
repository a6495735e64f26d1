//! End to end scenarios: a node is driven only through its requests and
//! its packet events.

use plexi::{
    Block1, Configuration, ExchangeId, LinkAddr, Payload, Plexi, Request, Response,
    SlotframeId, Status,
};
use rand_chacha::ChaChaRng;
use rand_core::{Rng as _, SeedableRng as _};
use serde_json::{Value, json};

const FRAME: SlotframeId = SlotframeId::ONE;
const NEIGHBOR: &str = "215:8d00:57:6466";
const OTHER: &str = "216:8d00:57:6467";

// ------------------------------------------------------------------------
// 1. statistics lifecycle

#[test]
fn etx_reported_through_links() {
    let mut node = node(4);
    post_link(&mut node, json!({"frame": 1, "slot": 1, "option": 1, "tna": NEIGHBOR}));
    expect(
        &mut node,
        Request::post("6top/stats").set_payload(r#"{"frame": 1, "slot": 1, "metric": "etx", "id": 7}"#),
        Status::Changed,
    );

    for transmissions in [1, 1, 2] {
        node.on_packet_sent(FRAME, 1, true, transmissions);
    }

    let response = expect(
        &mut node,
        Request::get("6top/cellList/stats").set_query("frame=1"),
        Status::Content,
    );
    assert_eq!(response.json(), Some(&json!([{"id": 7, "value": 281}])));

    let response = expect(
        &mut node,
        Request::get("6top/stats").set_query("id=7"),
        Status::Content,
    );
    assert_eq!(
        response.json(),
        Some(&json!({
            "id": 7,
            "frame": 1,
            "slot": 1,
            "channel": 0,
            "tna": NEIGHBOR,
            "metric": "etx",
            "enable": 1,
            "value": 281,
        }))
    );
}

#[test]
fn pdr_follows_transmissions() {
    let mut node = node(4);
    post_link(&mut node, json!({"frame": 1, "slot": 1, "option": 1, "tna": NEIGHBOR}));
    install(&mut node, json!({"slot": 1, "metric": "pdr", "id": 3}));

    node.on_packet_sent(FRAME, 1, true, 2);
    assert_eq!(value(&mut node, 3), json!(50));

    // unacknowledged packets leave it alone
    node.on_packet_sent(FRAME, 1, false, 1);
    assert_eq!(value(&mut node, 3), json!(50));
}

#[test]
fn upsert_is_idempotent() {
    let mut node = node(4);
    post_link(&mut node, json!({"frame": 1, "slot": 1, "option": 1}));

    let body = json!({"slot": 1, "metric": "rssi", "id": 5, "window": 3});
    install(&mut node, body.clone());
    let first = expect(&mut node, Request::get("6top/stats"), Status::Content);
    install(&mut node, body);
    let second = expect(&mut node, Request::get("6top/stats"), Status::Content);

    assert_eq!(first, second);
    assert_eq!(node.pool().len(), 1);
}

#[test]
fn deleting_a_link_purges_its_statistics() {
    let mut node = node(4);
    post_link(&mut node, json!({"frame": 1, "slot": 1, "option": 1}));
    post_link(&mut node, json!({"frame": 1, "slot": 2, "option": 1}));
    install(&mut node, json!({"slot": 1, "metric": "rssi", "id": 1}));
    install(&mut node, json!({"slot": 1, "metric": "lqi", "id": 2}));
    install(&mut node, json!({"slot": 2, "metric": "lqi", "id": 3}));
    assert_eq!(node.pool().len(), 3);

    expect(
        &mut node,
        Request::delete("6top/cellList").set_query("frame=1&slot=1"),
        Status::Deleted,
    );
    assert_eq!(node.pool().len(), 1);

    let response = expect(&mut node, Request::get("6top/stats/id"), Status::Content);
    assert_eq!(response.json(), Some(&json!([3])));

    // and through the slotframe
    expect(&mut node, Request::delete("6top/slotFrame"), Status::Deleted);
    assert!(node.pool().is_empty());
    let response = node.handle(&Request::get("6top/stats"));
    assert_eq!(response.status(), Status::NotFound);
}

#[test]
fn pool_exhaustion_keeps_earlier_records() {
    let mut node = node(2);
    for slot in 1..=3 {
        post_link(&mut node, json!({"frame": 1, "slot": slot, "option": 1}));
    }

    // one record per link, the third one has no room
    let response = node.handle(
        &Request::post("6top/stats").set_payload(r#"{"frame": 1, "metric": "lqi"}"#),
    );
    assert_eq!(response.status(), Status::InternalServerError);
    assert_eq!(node.pool().len(), 2);

    let response = expect(&mut node, Request::get("6top/stats/slot"), Status::Content);
    assert_eq!(response.json(), Some(&json!([1, 2])));
}

#[test]
fn broadcast_cells_refuse_transmission_metrics() {
    let mut node = node(4);
    post_link(&mut node, json!({"frame": 1, "slot": 1, "option": 5}));

    let response = node.handle(
        &Request::post("6top/stats").set_payload(r#"{"slot": 1, "metric": "etx"}"#),
    );
    assert_eq!(response.status(), Status::BadRequest);
    assert_eq!(
        response.text(),
        Some("Broadcast cells cannot measure ETX and PDR")
    );
    assert!(node.pool().is_empty());
}

// ------------------------------------------------------------------------
// 2. neighbors

#[test]
fn neighbors_without_samples() {
    let mut node = node(4);
    node.neighbors_mut().insert(addr(NEIGHBOR));
    post_link(&mut node, json!({"frame": 1, "slot": 1, "option": 1, "tna": NEIGHBOR}));
    install(&mut node, json!({"slot": 1, "metric": "rssi"}));

    let response = expect(&mut node, Request::get("6top/nbrList/rssi"), Status::Content);
    assert_eq!(response.json(), Some(&json!([])));
    let one = Request::get("6top/nbrList/rssi").set_query(format!("tna={NEIGHBOR}"));
    let response = expect(&mut node, one.clone(), Status::Content);
    assert_eq!(response.json(), Some(&json!([])));

    node.on_packet_received(FRAME, 1, addr(NEIGHBOR), -70, 0, 0);
    let response = expect(&mut node, Request::get("6top/nbrList/rssi"), Status::Content);
    assert_eq!(response.json(), Some(&json!([-70])));
    let response = expect(&mut node, one, Status::Content);
    assert_eq!(response.json(), Some(&json!([-70])));

    let unknown = Request::get("6top/nbrList/rssi").set_query(format!("tna={OTHER}"));
    expect(&mut node, unknown, Status::NotFound);
}

#[test]
fn neighbors_average_their_links() {
    let mut node = node(4);
    node.neighbors_mut().insert(addr(NEIGHBOR));
    node.neighbors_mut().insert(addr(OTHER));
    post_link(&mut node, json!({"frame": 1, "slot": 1, "option": 1, "tna": NEIGHBOR}));
    post_link(&mut node, json!({"frame": 1, "slot": 2, "option": 1, "tna": NEIGHBOR}));
    install(&mut node, json!({"tna": NEIGHBOR, "metric": "lqi"}));

    node.on_packet_received(FRAME, 1, addr(NEIGHBOR), -70, 100, 0);
    node.on_packet_received(FRAME, 2, addr(NEIGHBOR), -70, 50, 0);

    let response = expect(
        &mut node,
        Request::get("6top/nbrList").set_query(format!("tna={NEIGHBOR}")),
        Status::Content,
    );
    assert_eq!(response.json(), Some(&json!({"tna": NEIGHBOR, "lqi": 75})));

    let response = expect(&mut node, Request::get("6top/nbrList"), Status::Content);
    assert_eq!(
        response.json(),
        Some(&json!([{"tna": NEIGHBOR, "lqi": 75}, {"tna": OTHER}]))
    );
}

// ------------------------------------------------------------------------
// 3. block-wise writes

#[test]
fn block_wise_link_write() {
    let mut node = node(4);
    let body = br#"{"frame": 1, "slot": 9, "channel": 2, "option": 1}"#;
    let (head, tail) = body.split_at(20);
    let exchange = ExchangeId::new(11);

    let response = node.handle(
        &Request::post("6top/cellList")
            .set_exchange(exchange)
            .set_block1(Block1 { num: 0, more: true })
            .set_payload(head),
    );
    assert_eq!(response.status(), Status::Continue);
    assert_eq!(*response.payload(), Payload::Empty);

    let busy = node.handle(
        &Request::post("6top/cellList")
            .set_exchange(exchange.next())
            .set_payload(r#"{"frame": 1, "slot": 3}"#),
    );
    assert_eq!(busy.status(), Status::ServiceUnavailable);

    let response = node.handle(
        &Request::post("6top/cellList")
            .set_exchange(exchange)
            .set_block1(Block1 { num: 1, more: false })
            .set_payload(tail),
    );
    assert_eq!(response.status(), Status::Changed);

    let response = expect(
        &mut node,
        Request::get("6top/cellList/channel").set_query("slot=9"),
        Status::Content,
    );
    assert_eq!(response.json(), Some(&json!([2])));
}

#[test]
fn block_out_of_sequence() {
    let mut node = node(4);
    let response = node.handle(
        &Request::post("6top/stats")
            .set_block1(Block1 { num: 2, more: true })
            .set_payload("{"),
    );
    assert_eq!(response.status(), Status::RequestEntityIncomplete);
}

#[test]
fn retransmitted_block() {
    let mut node = node(4);
    post_link(&mut node, json!({"frame": 1, "slot": 1, "option": 1}));
    let blocks = [(r#"{"slot": 1, "#, true), (r#""metric": "lqi", "#, true), (r#""id": 4}"#, false)];
    let send = |node: &mut Plexi, num: usize| {
        let (payload, more) = blocks[num];
        node.handle(
            &Request::post("6top/stats")
                .set_block1(Block1 { num: num as u32, more })
                .set_payload(payload),
        )
    };

    assert_eq!(send(&mut node, 0).status(), Status::Continue);
    assert_eq!(send(&mut node, 1).status(), Status::Continue);
    assert_eq!(send(&mut node, 1).status(), Status::Continue);
    assert_eq!(send(&mut node, 2).status(), Status::Changed);
    assert_eq!(value(&mut node, 4), json!(u16::MAX));

    // skipping a block drops the transfer
    assert_eq!(send(&mut node, 0).status(), Status::Continue);
    assert_eq!(send(&mut node, 2).status(), Status::RequestEntityIncomplete);
    assert_eq!(send(&mut node, 1).status(), Status::RequestEntityIncomplete);
}

// ------------------------------------------------------------------------
// 4. queries

/// Filtering on two fields returns the links both single filters return.
#[test]
fn conjunction_is_intersection() {
    let mut rng = ChaChaRng::seed_from_u64(42);
    let mut node = node(0);
    node.add_slotframe(SlotframeId::new(2), 31).unwrap();

    for slot in 0..24u16 {
        let frame = 1 + rng.next_u32() % 2;
        let channel = rng.next_u32() % 4;
        let response = node.handle(&Request::post("6top/cellList").set_payload(
            json!({"frame": frame, "slot": slot, "channel": channel, "option": 1}).to_string(),
        ));
        assert_eq!(response.status(), Status::Changed);
    }

    for _ in 0..32 {
        let slot = rng.next_u32() % 24;
        let channel = rng.next_u32() % 4;

        let by_slot = handles(&mut node, &format!("slot={slot}"));
        let by_channel = handles(&mut node, &format!("channel={channel}"));
        let both = handles(&mut node, &format!("slot={slot}&channel={channel}"));

        let expected: Vec<u64> = by_slot
            .into_iter()
            .filter(|handle| by_channel.contains(handle))
            .collect();
        assert_eq!(both, expected, "slot={slot}&channel={channel}");
    }
}

#[test]
fn shared_link_senders() {
    let mut node = node(4);
    post_link(&mut node, json!({"frame": 1, "slot": 4, "option": 6}));
    install(&mut node, json!({"slot": 4, "metric": "rssi", "id": 2}));

    node.on_packet_received(FRAME, 4, addr(NEIGHBOR), -50, 0, 0);
    node.on_packet_received(FRAME, 4, addr(OTHER), -80, 0, 0);

    let response = expect(
        &mut node,
        Request::delete("6top/stats").set_query(format!("tna={OTHER}")),
        Status::Deleted,
    );
    let deleted = response.json().and_then(Value::as_array).unwrap();
    assert_eq!(deleted.len(), 1);
    assert_eq!(deleted[0]["tna"], json!(OTHER));
    assert_eq!(deleted[0]["value"], json!(-80));

    // the record itself is still there
    assert_eq!(node.pool().len(), 1);
    assert_eq!(node.pool().enhanced_len(), 1);
}

fn node(max_statistics: usize) -> Plexi {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut node = Plexi::new(Configuration::default().set_max_statistics(max_statistics));
    node.add_slotframe(FRAME, 101).unwrap();
    node
}

fn addr(text: &str) -> LinkAddr {
    text.parse().unwrap()
}

#[track_caller]
fn expect(node: &mut Plexi, request: Request, status: Status) -> Response {
    let response = node.handle(&request);
    assert_eq!(response.status(), status, "{:?}", response.payload());
    response
}

fn post_link(node: &mut Plexi, body: Value) {
    expect(
        node,
        Request::post("6top/cellList").set_payload(body.to_string()),
        Status::Changed,
    );
}

fn install(node: &mut Plexi, body: Value) {
    expect(
        node,
        Request::post("6top/stats").set_payload(body.to_string()),
        Status::Changed,
    );
}

fn value(node: &mut Plexi, id: u16) -> Value {
    let response = expect(
        node,
        Request::get("6top/stats/value").set_query(format!("id={id}")),
        Status::Content,
    );
    response.json().cloned().unwrap()
}

fn handles(node: &mut Plexi, query: &str) -> Vec<u64> {
    let response = node.handle(&Request::get("6top/cellList/link").set_query(query));
    match response.status() {
        Status::NotFound => Vec::new(),
        Status::Content => response
            .json()
            .and_then(Value::as_array)
            .unwrap()
            .iter()
            .filter_map(Value::as_u64)
            .collect(),
        status => panic!("unexpected {status}"),
    }
}
