//! Group-manager fixture.
//!
//! Plays the roles the core leaves out of scope: minting group keypairs per
//! validity interval, publishing E-KEY instances for every hierarchy node,
//! wrapping D-KEYs for enrolled consumers, and republishing producer C-KEYs
//! under the `FOR`-qualified names consumers fetch them by. Everything it
//! publishes is signed with one shared keychain so a single validator covers
//! the whole test.

use bytes::Bytes;
use rand::{rngs::StdRng, RngCore, SeedableRng};
use spanlock_core::{Ed25519KeyChain, Ed25519Validator, KeyChain};
use spanlock_crypto::{aes, rsa, ConsumerPrivate, ContentKey, DKeyPrivate, EKeyPublic, RsaScheme};
use spanlock_proto::{
    encrypted_content::encode_d_key_content, name::component, Data, EncryptAlgorithm,
    EncryptedContent, Name, Timestamp,
};

use crate::sim_face::SimFace;

/// One group keypair and its validity span.
#[derive(Clone)]
struct GroupInterval {
    begin: Timestamp,
    end: Timestamp,
    d_key: DKeyPrivate,
    e_key: EKeyPublic,
}

/// An enrolled consumer awaiting D-KEY publications.
struct EnrolledConsumer {
    consumer_name: Name,
    key_name: Name,
    public_der: Vec<u8>,
}

/// Group manager for one `(prefix, data_type)` hierarchy.
pub struct GroupFixture {
    /// The shared fabric everything publishes into.
    pub face: SimFace,
    /// Keychain signing every fixture- and producer-emitted object.
    pub keychain: Ed25519KeyChain,
    /// Group name consumers fetch C-KEYs for (`prefix/READ`).
    pub group_name: Name,

    prefix: Name,
    data_type: Name,
    rsa_bits: usize,
    rng: StdRng,
    intervals: Vec<GroupInterval>,
    consumers: Vec<EnrolledConsumer>,
}

impl GroupFixture {
    /// Fixture for `prefix` / `data_type` with deterministic randomness.
    ///
    /// `rsa_bits` sizes every generated keypair; tests use 1024 to stay
    /// fast.
    pub fn new(seed: u64, prefix: Name, data_type: Name, rsa_bits: usize) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let keychain = Ed25519KeyChain::generate(&mut rng);
        let group_name = prefix.clone().append(component::READ);
        Self {
            face: SimFace::new(),
            keychain,
            group_name,
            prefix,
            data_type,
            rsa_bits,
            rng,
            intervals: Vec::new(),
            consumers: Vec::new(),
        }
    }

    /// Validator trusting everything this fixture's keychain signs.
    pub fn validator(&self) -> Ed25519Validator {
        Ed25519Validator::new(self.keychain.verifying_key())
    }

    /// A seeded RNG for an engine sharing this fixture's determinism.
    pub fn engine_rng(&self, seed: u64) -> StdRng {
        StdRng::seed_from_u64(seed)
    }

    /// E-KEY hierarchy nodes, mirroring the producer's enumeration.
    pub fn ekey_nodes(&self) -> Vec<Name> {
        let read_base = self.prefix.clone().append(component::READ);
        let mut nodes = Vec::new();
        let mut ancestor = self.data_type.clone();
        loop {
            nodes.push(
                read_base
                    .clone()
                    .append_name(&ancestor)
                    .append(component::E_KEY),
            );
            if ancestor.is_empty() {
                break;
            }
            ancestor = ancestor.prefix(-1);
        }
        nodes
    }

    /// Mint a group keypair valid on `[begin, end)` and publish its E-KEY
    /// under every hierarchy node. D-KEYs are published for already-enrolled
    /// consumers as well.
    ///
    /// # Panics
    ///
    /// On key-generation failure; fixture code.
    #[allow(clippy::expect_used)]
    pub fn add_group_interval(&mut self, begin: Timestamp, end: Timestamp) {
        let d_key = DKeyPrivate::generate(&mut self.rng, self.rsa_bits).expect("RSA keygen");
        let e_key = d_key.derive_public().expect("derive E-KEY");

        for node in self.ekey_nodes() {
            let name = node
                .append(begin.to_component())
                .append(end.to_component());
            let mut data = Data::new(name, e_key.as_der().to_vec());
            self.keychain.sign(&mut data);
            self.face.publish(data);
        }

        let interval = GroupInterval {
            begin,
            end,
            d_key,
            e_key,
        };
        let consumers: Vec<usize> = (0..self.consumers.len()).collect();
        for index in consumers {
            self.publish_d_keys_for(&interval, index);
        }
        self.intervals.push(interval);
    }

    /// Enroll a consumer: mint its keypair and publish a wrapped D-KEY for
    /// every existing interval. Returns the key name and private half; the
    /// test decides whether the consumer's database actually gets it.
    ///
    /// # Panics
    ///
    /// On key-generation failure; fixture code.
    #[allow(clippy::expect_used)]
    pub fn enroll_consumer(&mut self, consumer_name: &Name) -> (Name, ConsumerPrivate) {
        let private = ConsumerPrivate::generate(&mut self.rng, self.rsa_bits).expect("RSA keygen");
        let public_der = private.derive_public_der().expect("derive public");
        let key_name = consumer_name.clone().append("KEY").append("1");

        self.consumers.push(EnrolledConsumer {
            consumer_name: consumer_name.clone(),
            key_name: key_name.clone(),
            public_der,
        });
        let index = self.consumers.len() - 1;

        for interval_index in 0..self.intervals.len() {
            let interval = self.intervals[interval_index].clone();
            self.publish_d_keys_for(&interval, index);
        }

        (key_name, private)
    }

    /// Publish one consumer's D-KEY for one interval under every hierarchy
    /// node.
    #[allow(clippy::expect_used)]
    fn publish_d_keys_for(&mut self, interval: &GroupInterval, consumer_index: usize) {
        let (consumer_name, key_name, public_der) = {
            let consumer = &self.consumers[consumer_index];
            (
                consumer.consumer_name.clone(),
                consumer.key_name.clone(),
                consumer.public_der.clone(),
            )
        };

        for node in self.ekey_nodes() {
            // `.../<ancestor>/E-KEY` becomes `.../<ancestor>/D-KEY/<b>/<e>`.
            let d_key_name = node
                .prefix(-1)
                .append(component::D_KEY)
                .append(interval.begin.to_component())
                .append(interval.end.to_component());

            // Fresh nonce key per publication: the consumer key wraps the
            // nonce, the nonce wraps the D-KEY bits.
            let nonce = ContentKey::generate(&mut self.rng);
            let wrapped_nonce = rsa::encrypt(
                &mut self.rng,
                &public_der,
                nonce.as_bytes(),
                RsaScheme::OaepSha256,
            )
            .expect("wrap nonce");
            let nonce_block = EncryptedContent::asymmetric(
                EncryptAlgorithm::RsaOaep,
                key_name.clone(),
                wrapped_nonce,
            );

            let mut iv = [0u8; 16];
            self.rng.fill_bytes(&mut iv);
            let wrapped_d_key = aes::encrypt(nonce.as_bytes(), &iv, interval.d_key.as_der())
                .expect("wrap D-KEY");
            let payload_block = EncryptedContent::aes_cbc(
                d_key_name.clone(),
                iv.to_vec(),
                wrapped_d_key,
            );

            let publish_name = d_key_name
                .append(component::FOR)
                .append_name(&consumer_name);
            let mut data = Data::new(
                publish_name,
                encode_d_key_content(&nonce_block, &payload_block),
            );
            self.keychain.sign(&mut data);
            self.face.publish(data);
        }
    }

    /// E-KEY of the interval covering `timeslot`, if one was minted.
    pub fn e_key_covering(&self, timeslot: Timestamp) -> Option<EKeyPublic> {
        self.intervals
            .iter()
            .find(|interval| interval.begin <= timeslot && timeslot < interval.end)
            .map(|interval| interval.e_key.clone())
    }

    /// Republish one of the producer's signed C-KEY objects under the
    /// `FOR`-qualified name the group's consumers fetch, re-signing for the
    /// new name.
    pub fn publish_c_key(&mut self, c_key_data: &Data) {
        let mut data = Data::new(
            c_key_data
                .name
                .clone()
                .append(component::FOR)
                .append_name(&self.group_name),
            Bytes::clone(&c_key_data.content),
        );
        self.keychain.sign(&mut data);
        self.face.publish(data);
    }

    /// Publish a producer content object as-is.
    pub fn publish(&self, data: Data) {
        self.face.publish(data);
    }
}
