//! Retry and delegation failover, producer and consumer side.

use spanlock_consumer::{Consumer, ConsumerConfig};
use spanlock_core::{AccessError, FaceReply, MemoryKeyStore};
use spanlock_harness::{GroupFixture, SimFace};
use spanlock_producer::{Producer, ProducerConfig};
use spanlock_proto::{Link, Name, Timestamp};

const RSA_BITS: usize = 1024;

fn name(uri: &str) -> Name {
    Name::from_uri(uri).unwrap()
}

fn ts(iso: &str) -> Timestamp {
    Timestamp::from_iso(iso).unwrap()
}

const NODE: &str = "/a/READ/E-KEY";

fn single_node_producer(
    fixture: &GroupFixture,
    config: ProducerConfig,
) -> Producer<SimFace, MemoryKeyStore, spanlock_core::Ed25519KeyChain, rand::rngs::StdRng> {
    Producer::new(
        name("/a"),
        Name::new(),
        fixture.face.clone(),
        MemoryKeyStore::new(),
        fixture.keychain.clone(),
        fixture.engine_rng(0x52),
        config,
    )
}

#[tokio::test]
async fn producer_walks_the_delegation_list() {
    let mut fixture = GroupFixture::new(20, name("/a"), Name::new(), RSA_BITS);
    fixture.add_group_interval(ts("20150815T100000000"), ts("20150815T110000000"));

    // E-KEYs are only reachable through the second delegation.
    let node = name(NODE);
    fixture.face.require_delegation(&node, 1);

    let config = ProducerConfig {
        max_repeat_attempts: 0,
        key_retrieval_link: Some(Link::new(vec![name("/isp-one"), name("/isp-two")])),
    };
    let mut producer = single_node_producer(&fixture, config);

    let outcome = producer
        .create_content_key(ts("20150815T101700000"))
        .await
        .unwrap();
    assert_eq!(outcome.encrypted_keys.len(), 1);

    let log = fixture.face.log();
    assert_eq!(log.len(), 3);
    assert_eq!(log[0].selected_delegation, None);
    assert!(log[0].link.is_none());
    assert_eq!(log[1].selected_delegation, Some(0));
    assert!(log[1].link.is_some());
    assert_eq!(log[2].selected_delegation, Some(1));
}

#[tokio::test]
async fn producer_timeout_exhaustion_falls_through_to_delegations() {
    let mut fixture = GroupFixture::new(21, name("/a"), Name::new(), RSA_BITS);
    fixture.add_group_interval(ts("20150815T100000000"), ts("20150815T110000000"));

    let node = name(NODE);
    // Two dropped interests, then the primary path still refuses without a
    // delegation.
    fixture
        .face
        .script(&node, vec![FaceReply::Timeout, FaceReply::Timeout]);
    fixture.face.require_delegation(&node, 0);

    let config = ProducerConfig {
        max_repeat_attempts: 1,
        key_retrieval_link: Some(Link::new(vec![name("/backup")])),
    };
    let mut producer = single_node_producer(&fixture, config);

    let outcome = producer
        .create_content_key(ts("20150815T101700000"))
        .await
        .unwrap();
    assert_eq!(outcome.encrypted_keys.len(), 1);

    // Initial try, one retry, then the delegation re-issue.
    let log = fixture.face.log();
    assert_eq!(log.len(), 3);
    assert_eq!(log[2].selected_delegation, Some(0));
}

#[tokio::test]
async fn producer_gives_up_after_the_last_delegation() {
    let mut fixture = GroupFixture::new(22, name("/a"), Name::new(), RSA_BITS);
    fixture.add_group_interval(ts("20150815T100000000"), ts("20150815T110000000"));

    // No delegation index ever satisfies the rule.
    let node = name(NODE);
    fixture.face.require_delegation(&node, usize::MAX);

    let config = ProducerConfig {
        max_repeat_attempts: 0,
        key_retrieval_link: Some(Link::new(vec![name("/isp-one"), name("/isp-two")])),
    };
    let mut producer = single_node_producer(&fixture, config);

    let outcome = producer
        .create_content_key(ts("20150815T101700000"))
        .await
        .unwrap();
    assert!(outcome.encrypted_keys.is_empty());
    assert_eq!(producer.pending_key_requests(), 0);
    // Primary, delegation 0, delegation 1, then out of options.
    assert_eq!(fixture.face.interest_count(), 3);
}

#[tokio::test]
async fn consumer_content_fetch_uses_call_site_delegations() {
    let mut fixture = GroupFixture::new(23, name("/a"), name("/b"), RSA_BITS);
    fixture.add_group_interval(ts("20150815T100000000"), ts("20150815T110000000"));
    let (key_name, consumer_key) = fixture.enroll_consumer(&name("/alice"));

    let mut producer = Producer::new(
        name("/a"),
        name("/b"),
        fixture.face.clone(),
        MemoryKeyStore::new(),
        fixture.keychain.clone(),
        fixture.engine_rng(0x53),
        ProducerConfig::default(),
    );
    let timeslot = ts("20150815T101700000");
    let outcome = producer.create_content_key(timeslot).await.unwrap();
    fixture.publish_c_key(&outcome.encrypted_keys[0]);
    let content = producer.produce(timeslot, b"via delegation").unwrap();
    let content_name = content.name.clone();
    fixture.publish(content);

    // The content itself is only reachable through the second delegation;
    // key fetches stay on the primary path.
    fixture.face.require_delegation(&content_name, 1);

    let mut consumer: Consumer<_, _, MemoryKeyStore> = Consumer::new(
        fixture.face.clone(),
        fixture.validator(),
        MemoryKeyStore::new(),
        fixture.group_name.clone(),
        name("/alice"),
        ConsumerConfig::default(),
    );
    consumer.add_decryption_key(&key_name, consumer_key).unwrap();

    let delegations = Link::new(vec![name("/isp-one"), name("/isp-two")]);
    let consumed = consumer
        .consume(&content_name, Some(delegations))
        .await
        .unwrap();
    assert_eq!(consumed.plaintext, b"via delegation");

    // Content: nack, nack, data via delegation 1. Then C-KEY and D-KEY.
    let content_fetches: Vec<_> = fixture
        .face
        .log()
        .into_iter()
        .filter(|interest| interest.name == content_name)
        .collect();
    assert_eq!(content_fetches.len(), 3);
    assert_eq!(content_fetches[2].selected_delegation, Some(1));
}

#[tokio::test]
async fn consumer_without_delegations_surfaces_retrieval_failure() {
    let fixture = GroupFixture::new(24, name("/a"), name("/b"), RSA_BITS);
    // Nothing published at all: the content fetch times out, retries once,
    // and fails.
    let mut consumer: Consumer<_, _, MemoryKeyStore> = Consumer::new(
        fixture.face.clone(),
        fixture.validator(),
        MemoryKeyStore::new(),
        fixture.group_name.clone(),
        name("/alice"),
        ConsumerConfig::default(),
    );

    let missing = name("/a/SAMPLE/b/20150815T101700000");
    let err = consumer.consume(&missing, None).await.unwrap_err();
    assert_eq!(err, AccessError::DataRetrievalFailure(missing));
    assert_eq!(fixture.face.interest_count(), 2);
}
