//! The producer engine.

use std::collections::{BTreeMap, HashMap};

use bytes::Bytes;
use futures::{stream::FuturesUnordered, StreamExt};
use rand::{CryptoRng, RngCore};
use spanlock_core::{encrypt_data, AccessError, EncryptParams, Face, FaceReply, KeyChain, KeyStore};
use spanlock_crypto::{ContentKey, EKeyPublic};
use spanlock_proto::{
    name::component, ChildSelector, Data, Exclude, Interest, Link, Name, ProtocolError, Timestamp,
};
use tracing::{debug, trace, warn};

use crate::key_request::{KeyInfo, KeyRequest};

/// Index of the validity-begin component in an E-KEY instance name.
const BEGIN_TS_INDEX: isize = -2;
/// Index of the validity-end component in an E-KEY instance name.
const END_TS_INDEX: isize = -1;

/// Producer tuning.
#[derive(Debug, Clone)]
pub struct ProducerConfig {
    /// Timeout retries per E-KEY node before a fetch falls through to
    /// delegation failover.
    pub max_repeat_attempts: u32,

    /// Forwarding hint for E-KEY retrieval across administrative boundaries.
    pub key_retrieval_link: Option<Link>,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            max_repeat_attempts: 3,
            key_retrieval_link: None,
        }
    }
}

/// Result of a `create_content_key` call.
#[derive(Debug)]
pub struct ContentKeyOutcome {
    /// Name of the content key for the requested hour.
    pub content_key_name: Name,

    /// False when the key already existed and no coverage work ran.
    pub created: bool,

    /// Signed C-KEY data objects, one per hierarchy node whose E-KEY was
    /// available and wrapped successfully. Possibly partial, possibly empty;
    /// the caller judges sufficiency against
    /// [`Producer::ekey_node_count`].
    pub encrypted_keys: Vec<Data>,
}

/// Outcome of one node's coverage fetch.
enum FetchOutcome {
    /// A covering E-KEY arrived.
    Covering {
        node: Name,
        /// Full instance name (node plus validity components).
        key_name: Name,
        begin: Timestamp,
        end: Timestamp,
        key: EKeyPublic,
        attempts: u32,
    },
    /// Retries and delegations are exhausted, or the response was malformed.
    Failed {
        node: Name,
        attempts: u32,
        error: Option<AccessError>,
    },
}

/// Publishes encrypted content and keeps its hourly content keys wrapped
/// under every covering E-KEY of the data-type hierarchy.
pub struct Producer<F, S, K, R> {
    face: F,
    store: S,
    keychain: K,
    rng: R,

    /// `prefix / SAMPLE / data_type`; content and C-KEY names live under it.
    namespace: Name,

    /// Coverage cache per E-KEY hierarchy node, in name order.
    ekey_info: BTreeMap<Name, KeyInfo>,

    /// In-flight requests keyed by requested-timestamp unix milliseconds.
    key_requests: HashMap<u64, KeyRequest>,

    config: ProducerConfig,
}

impl<F, S, K, R> Producer<F, S, K, R>
where
    F: Face,
    S: KeyStore,
    K: KeyChain,
    R: RngCore + CryptoRng,
{
    /// Build a producer for `prefix` publishing the `data_type` stream.
    ///
    /// The E-KEY hierarchy is every ancestor of `data_type` down to and
    /// including the root: for `data_type = /b/c` the nodes are
    /// `prefix/READ/b/c/E-KEY`, `prefix/READ/b/E-KEY` and
    /// `prefix/READ/E-KEY`. Each one names a group authority that must wrap
    /// every content key.
    pub fn new(
        prefix: Name,
        data_type: Name,
        face: F,
        store: S,
        keychain: K,
        rng: R,
        config: ProducerConfig,
    ) -> Self {
        let read_base = prefix.clone().append(component::READ);
        let mut ekey_info = BTreeMap::new();
        let mut ancestor = data_type.clone();
        loop {
            let node = read_base
                .clone()
                .append_name(&ancestor)
                .append(component::E_KEY);
            ekey_info.insert(node, KeyInfo::sentinel());
            if ancestor.is_empty() {
                break;
            }
            ancestor = ancestor.prefix(-1);
        }

        let namespace = prefix.append(component::SAMPLE).append_name(&data_type);

        Self {
            face,
            store,
            keychain,
            rng,
            namespace,
            ekey_info,
            key_requests: HashMap::new(),
            config,
        }
    }

    /// Namespace published content lives under.
    pub fn namespace(&self) -> &Name {
        &self.namespace
    }

    /// Number of E-KEY hierarchy nodes. A complete `create_content_key`
    /// yields this many encrypted keys; callers compare to judge quorum.
    pub fn ekey_node_count(&self) -> usize {
        self.ekey_info.len()
    }

    /// Coverage record currently cached for `node`.
    pub fn ekey_info(&self, node: &Name) -> Option<&KeyInfo> {
        self.ekey_info.get(node)
    }

    /// Requests still waiting on outstanding nodes. Zero whenever no
    /// `create_content_key` call is in flight.
    pub fn pending_key_requests(&self) -> usize {
        self.key_requests.len()
    }

    /// Name of the content key covering `timeslot`'s hour.
    pub fn content_key_name(&self, timeslot: Timestamp) -> Name {
        self.namespace
            .clone()
            .append(component::C_KEY)
            .append(timeslot.hour_slot().to_component())
    }

    /// Ensure a content key exists for `timeslot`'s hour, generating and
    /// persisting one if needed. No network activity.
    ///
    /// # Errors
    ///
    /// Store failures as `AccessError::General`.
    pub fn ensure_content_key(&mut self, timeslot: Timestamp) -> Result<Name, AccessError> {
        if !self.store.has_content_key(timeslot)? {
            let key = ContentKey::generate(&mut self.rng);
            self.store.insert_content_key(timeslot, &key)?;
            debug!(hour = %timeslot.hour_slot(), "generated content key");
        }
        Ok(self.content_key_name(timeslot))
    }

    /// Create (or find) the content key for `timeslot` and wrap it under a
    /// covering E-KEY of every hierarchy node.
    ///
    /// Nodes whose cached E-KEY already covers `timeslot` wrap immediately;
    /// the rest fetch concurrently with an exclude filter asking for the
    /// newest E-KEY whose timestamp is `<= timeslot`, iterating with refined
    /// excludes across coverage gaps and failing over to delegations on
    /// nacks. Nodes that fail drop out of the returned list; partial results
    /// are the caller's to judge.
    ///
    /// Idempotent per hour: when the content key already exists the call
    /// returns its name with `created: false` and performs no fetches.
    ///
    /// # Errors
    ///
    /// Store failures as `AccessError::General`. Per-node fetch and wrap
    /// failures shorten `encrypted_keys` instead of failing the call.
    pub async fn create_content_key(
        &mut self,
        timeslot: Timestamp,
    ) -> Result<ContentKeyOutcome, AccessError> {
        let hour = timeslot.hour_slot();
        let content_key_name = self.content_key_name(timeslot);

        if self.store.has_content_key(timeslot)? {
            debug!(%content_key_name, "content key already exists");
            return Ok(ContentKeyOutcome {
                content_key_name,
                created: false,
                encrypted_keys: Vec::new(),
            });
        }

        let content_key = ContentKey::generate(&mut self.rng);
        self.store.insert_content_key(timeslot, &content_key)?;

        let time_count = timeslot.unix_millis();
        self.key_requests
            .insert(time_count, KeyRequest::new(self.ekey_info.len()));

        // Partition the hierarchy by cached coverage.
        let mut covered = Vec::new();
        let mut to_fetch = Vec::new();
        for (node, info) in &self.ekey_info {
            if info.covers(timeslot) {
                covered.push((node.clone(), info.clone()));
            } else {
                to_fetch.push(node.clone());
            }
        }

        let mut fetches = FuturesUnordered::new();
        for node in to_fetch {
            if let Some(request) = self.key_requests.get_mut(&time_count) {
                request.reset_attempts(&node);
            }
            fetches.push(fetch_covering_key(
                self.face.clone(),
                node,
                timeslot,
                self.config.max_repeat_attempts,
                self.config.key_retrieval_link.clone(),
            ));
        }

        let mut finished = None;

        // Wrap under already-covering cached keys first.
        for (node, info) in covered {
            let key_name = node
                .clone()
                .append(info.begin.to_component())
                .append(info.end.to_component());
            let (_, done) = self.wrap_content_key(time_count, &node, &info.key, &key_name, hour);
            finished = finished.or(done);
        }

        // Drive the fetches, wrapping as each covering key arrives.
        while let Some(outcome) = fetches.next().await {
            let done = match outcome {
                FetchOutcome::Covering {
                    node,
                    key_name,
                    begin,
                    end,
                    key,
                    attempts,
                } => {
                    if let Some(request) = self.key_requests.get_mut(&time_count) {
                        request.record_attempts(&node, attempts);
                    }
                    let (wrapped, done) =
                        self.wrap_content_key(time_count, &node, &key, &key_name, hour);
                    if wrapped {
                        // Only a key that wrapped successfully replaces the
                        // cached coverage record.
                        self.ekey_info.insert(node, KeyInfo { begin, end, key });
                    }
                    done
                }
                FetchOutcome::Failed {
                    node,
                    attempts,
                    error,
                } => {
                    match &error {
                        Some(err) => warn!(%node, %err, "E-KEY fetch failed"),
                        None => warn!(%node, "E-KEY retrieval exhausted retries and delegations"),
                    }
                    if let Some(request) = self.key_requests.get_mut(&time_count) {
                        request.record_attempts(&node, attempts);
                    }
                    self.update_key_request(time_count)
                }
            };
            finished = finished.or(done);
        }

        let request = finished.ok_or_else(|| {
            AccessError::General(format!(
                "key request for {timeslot} finished without draining"
            ))
        })?;
        debug_assert_eq!(request.outstanding(), 0);
        debug_assert!(!self.key_requests.contains_key(&time_count));

        Ok(ContentKeyOutcome {
            content_key_name,
            created: true,
            encrypted_keys: request.into_encrypted_keys(),
        })
    }

    /// Encrypt `plaintext` for `timeslot` into a signed content data object
    /// named `namespace/<iso(timeslot)>`.
    ///
    /// Ensures the hour's content key exists; coverage work (wrapping the
    /// key for consumers) is [`Producer::create_content_key`]'s job.
    ///
    /// # Errors
    ///
    /// Store failures and encryption failures.
    pub fn produce(&mut self, timeslot: Timestamp, plaintext: &[u8]) -> Result<Data, AccessError> {
        let content_key_name = self.ensure_content_key(timeslot)?;
        let content_key = self.store.content_key(timeslot)?.ok_or_else(|| {
            AccessError::General(format!("content key for {timeslot} missing after insert"))
        })?;

        let mut data = Data::new(
            self.namespace.clone().append(timeslot.to_component()),
            Bytes::new(),
        );
        encrypt_data(
            &mut self.rng,
            &mut data,
            plaintext,
            &content_key_name,
            content_key.as_bytes(),
            &EncryptParams::aes_cbc(),
        )?;
        self.keychain.sign(&mut data);

        trace!(name = %data.name, bytes = plaintext.len(), "produced content object");
        Ok(data)
    }

    /// Wrap the hour's content key under one E-KEY into a signed C-KEY data
    /// object, then mark the node resolved.
    ///
    /// Returns whether the wrap succeeded, plus the drained request if this
    /// was the last outstanding node.
    fn wrap_content_key(
        &mut self,
        time_count: u64,
        node: &Name,
        ekey: &EKeyPublic,
        ekey_name_with_validity: &Name,
        hour: Timestamp,
    ) -> (bool, Option<KeyRequest>) {
        let wrapped = self.try_wrap(ekey, ekey_name_with_validity, hour);
        let ok = match wrapped {
            Ok(c_key_data) => {
                if let Some(request) = self.key_requests.get_mut(&time_count) {
                    request.push_encrypted_key(c_key_data);
                }
                true
            }
            Err(err) => {
                warn!(%node, %err, "content key wrapping failed");
                false
            }
        };
        (ok, self.update_key_request(time_count))
    }

    fn try_wrap(
        &mut self,
        ekey: &EKeyPublic,
        ekey_name_with_validity: &Name,
        hour: Timestamp,
    ) -> Result<Data, AccessError> {
        let content_key = self.store.content_key(hour)?.ok_or_else(|| {
            AccessError::General(format!("content key for {hour} missing during wrap"))
        })?;

        let key_name = self
            .namespace
            .clone()
            .append(component::C_KEY)
            .append(hour.to_component());
        let mut c_key_data = Data::new(key_name, Bytes::new());
        encrypt_data(
            &mut self.rng,
            &mut c_key_data,
            content_key.as_bytes(),
            ekey_name_with_validity,
            ekey.as_der(),
            &EncryptParams::rsa_oaep(),
        )?;
        self.keychain.sign(&mut c_key_data);
        Ok(c_key_data)
    }

    /// Decrement a request's outstanding count; at the first zero the request
    /// leaves the table and is handed back for completion.
    fn update_key_request(&mut self, time_count: u64) -> Option<KeyRequest> {
        let request = self.key_requests.get_mut(&time_count)?;
        if request.complete_one() == 0 {
            return self.key_requests.remove(&time_count);
        }
        None
    }
}

/// Parse `(begin, end)` from the last two components of an E-KEY instance
/// name.
fn parse_validity(key_name: &Name) -> Result<(Timestamp, Timestamp), ProtocolError> {
    let begin = key_name
        .get(BEGIN_TS_INDEX)
        .ok_or_else(|| ProtocolError::InvalidTimestamp(format!("E-KEY name too short: {key_name}")))?;
    let end = key_name
        .get(END_TS_INDEX)
        .ok_or_else(|| ProtocolError::InvalidTimestamp(format!("E-KEY name too short: {key_name}")))?;
    Ok((
        Timestamp::from_component(begin)?,
        Timestamp::from_component(end)?,
    ))
}

/// Fetch an E-KEY for `node` that covers `timeslot`.
///
/// Owns everything it needs so the engine can fan nodes out concurrently.
/// The interest asks for the newest instance whose timestamp is
/// `<= timeslot` (exclude-after plus rightmost child); a response covering
/// an earlier period refines the exclude past its `begin` and retries with a
/// fresh timeout budget. Timeouts retry up to `max_repeat_attempts`, then
/// fall through to nack handling: attach the link, then advance the selected
/// delegation, then give up.
async fn fetch_covering_key<F: Face>(
    face: F,
    node: Name,
    timeslot: Timestamp,
    max_repeat_attempts: u32,
    link: Option<Link>,
) -> FetchOutcome {
    let mut exclude = Exclude::none();
    exclude.exclude_after(timeslot.to_component());
    let mut interest = Interest::new(node.clone())
        .with_exclude(exclude)
        .with_child_selector(ChildSelector::Rightmost);
    let mut attempts: u32 = 0;

    loop {
        match face.express_interest(&interest).await {
            FaceReply::Data(data) => {
                let (begin, end) = match parse_validity(&data.name) {
                    Ok(validity) => validity,
                    Err(err) => {
                        return FetchOutcome::Failed {
                            node,
                            attempts,
                            error: Some(err.into()),
                        }
                    }
                };

                if timeslot >= end {
                    // Covers an earlier period only; advance the cursor past
                    // it and look again.
                    trace!(%node, %begin, %end, "E-KEY covers earlier period, refining exclude");
                    attempts = 0;
                    interest.exclude.exclude_before(begin.to_component());
                    continue;
                }

                return FetchOutcome::Covering {
                    node,
                    key_name: data.name,
                    begin,
                    end,
                    key: EKeyPublic::from_der(data.content.to_vec()),
                    attempts,
                };
            }

            FaceReply::Timeout if attempts < max_repeat_attempts => {
                attempts += 1;
                trace!(%node, attempts, "E-KEY interest timed out, retrying");
            }

            FaceReply::Timeout | FaceReply::Nack => {
                let Some(link) = link.as_ref().filter(|l| !l.is_empty()) else {
                    return FetchOutcome::Failed {
                        node,
                        attempts,
                        error: None,
                    };
                };
                match interest.selected_delegation {
                    None => {
                        // First failure on the primary path: attach the link.
                        interest.set_link(link.clone());
                        interest.set_selected_delegation(0);
                    }
                    Some(index) if index + 1 < link.len() => {
                        interest.set_selected_delegation(index + 1);
                    }
                    Some(_) => {
                        return FetchOutcome::Failed {
                            node,
                            attempts,
                            error: None,
                        }
                    }
                }
            }
        }
    }
}
