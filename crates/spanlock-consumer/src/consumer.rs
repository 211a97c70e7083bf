//! The consumer engine.

use std::collections::HashMap;

use spanlock_core::{decrypt_content, AccessError, Face, FaceReply, KeyStore, Validator};
use spanlock_crypto::{ConsumerPrivate, ContentKey, DKeyPrivate};
use spanlock_proto::{
    decode_d_key_content, name::component, Data, EncryptedContent, Interest, Link, Name,
};
use tracing::{debug, trace, warn};

/// Consumer tuning.
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Timeout retries per interest before falling through to nack handling.
    pub retries: u32,

    /// Forwarding hint for C-KEY fetches.
    pub c_key_link: Option<Link>,

    /// Forwarding hint for D-KEY fetches.
    pub d_key_link: Option<Link>,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            retries: 1,
            c_key_link: None,
            d_key_link: None,
        }
    }
}

/// A successfully consumed content object.
#[derive(Debug)]
pub struct Consumed {
    /// The validated content data object as fetched.
    pub data: Data,
    /// Its decrypted payload.
    pub plaintext: Vec<u8>,
}

/// Fetches content and walks the C-KEY/D-KEY chain to decrypt it.
///
/// The memo maps grow monotonically for the life of the engine: each C-KEY
/// and D-KEY name is resolved over the network at most once and its key bits
/// are write-once thereafter.
pub struct Consumer<F, V, S> {
    face: F,
    validator: V,
    store: S,

    group_name: Name,
    consumer_name: Name,
    config: ConsumerConfig,

    c_key_map: HashMap<Name, ContentKey>,
    d_key_map: HashMap<Name, DKeyPrivate>,
}

impl<F, V, S> Consumer<F, V, S>
where
    F: Face,
    V: Validator,
    S: KeyStore,
{
    /// Build a consumer belonging to `group_name`, identified as
    /// `consumer_name`.
    pub fn new(
        face: F,
        validator: V,
        store: S,
        group_name: Name,
        consumer_name: Name,
        config: ConsumerConfig,
    ) -> Self {
        Self {
            face,
            validator,
            store,
            group_name,
            consumer_name,
            config,
            c_key_map: HashMap::new(),
            d_key_map: HashMap::new(),
        }
    }

    /// Switch the group C-KEYs are fetched for.
    pub fn set_group(&mut self, group_name: Name) {
        self.group_name = group_name;
    }

    /// Install one of this consumer's own decrypt keys.
    ///
    /// # Errors
    ///
    /// `AccessError::General` when `key_name` is not under the consumer's
    /// name; store failures.
    pub fn add_decryption_key(
        &mut self,
        key_name: &Name,
        key: ConsumerPrivate,
    ) -> Result<(), AccessError> {
        if !self.consumer_name.is_prefix_of(key_name) {
            return Err(AccessError::General(format!(
                "decryption key {key_name} does not belong to consumer {}",
                self.consumer_name
            )));
        }
        self.store.insert_decrypt_key(key_name, &key)?;
        Ok(())
    }

    /// Number of memoized content keys. Diagnostic.
    pub fn cached_c_key_count(&self) -> usize {
        self.c_key_map.len()
    }

    /// Number of memoized decrypt keys. Diagnostic.
    pub fn cached_d_key_count(&self) -> usize {
        self.d_key_map.len()
    }

    /// Fetch `content_name`, resolve its key chain, and return the decrypted
    /// plaintext together with the validated data object.
    ///
    /// `delegations` applies to the content fetch only; key fetches use the
    /// links from the configuration.
    ///
    /// # Errors
    ///
    /// The full taxonomy: `DataRetrievalFailure` / `Timeout` exhaustion from
    /// any fetch, `Validation` from the validator,
    /// `InvalidEncryptedFormat` / `UnsupportedEncryptionScheme` from malformed
    /// or undecryptable objects, `NoDecryptKey` when the consumer key named
    /// by the D-KEY is absent, `EncryptionFailure` from the primitives.
    pub async fn consume(
        &mut self,
        content_name: &Name,
        delegations: Option<Link>,
    ) -> Result<Consumed, AccessError> {
        let data = self
            .send_interest(
                Interest::new(content_name.clone()),
                self.config.retries,
                delegations.as_ref(),
            )
            .await?;

        let content = EncryptedContent::decode(&data.content)?;
        let c_key_name = content.key_locator.clone();

        let content_key = match self.c_key_map.get(&c_key_name).cloned() {
            Some(key) => {
                trace!(%c_key_name, "content key already cached");
                key
            }
            None => {
                let key = self.resolve_content_key(&c_key_name).await?;
                // Write-once: the first resolution wins for the process
                // lifetime.
                self.c_key_map.entry(c_key_name).or_insert_with(|| key.clone());
                key
            }
        };

        let plaintext = decrypt_content(&content, content_key.as_bytes())?;
        debug!(name = %data.name, bytes = plaintext.len(), "consumed content object");
        Ok(Consumed { data, plaintext })
    }

    /// Fetch and unwrap the C-KEY for this consumer's group.
    async fn resolve_content_key(&mut self, c_key_name: &Name) -> Result<ContentKey, AccessError> {
        let interest_name = c_key_name
            .clone()
            .append(component::FOR)
            .append_name(&self.group_name);
        let link = self.config.c_key_link.clone();
        let c_key_data = self
            .send_interest(Interest::new(interest_name), self.config.retries, link.as_ref())
            .await?;
        self.decrypt_c_key(&c_key_data).await
    }

    /// Unwrap a C-KEY data object, resolving its D-KEY as needed.
    async fn decrypt_c_key(&mut self, c_key_data: &Data) -> Result<ContentKey, AccessError> {
        let content = EncryptedContent::decode(&c_key_data.content)?;

        // The locator is `.../E-KEY/<begin>/<end>`; the matching D-KEY
        // replaces the E-KEY marker and keeps the validity components.
        let e_key_name = &content.key_locator;
        let d_key_name = e_key_name
            .prefix(-3)
            .append(component::D_KEY)
            .append_name(&e_key_name.sub_name(-2));

        let d_key = match self.d_key_map.get(&d_key_name).cloned() {
            Some(key) => {
                trace!(%d_key_name, "decrypt key already cached");
                key
            }
            None => {
                let key = self.resolve_d_key(&d_key_name).await?;
                self.d_key_map.entry(d_key_name).or_insert_with(|| key.clone());
                key
            }
        };

        let bits = decrypt_content(&content, d_key.as_der())?;
        ContentKey::from_bytes(&bits).map_err(|_| {
            AccessError::InvalidEncryptedFormat(format!(
                "C-KEY payload unwrapped to {} bytes, expected 16",
                bits.len()
            ))
        })
    }

    /// Fetch the D-KEY wrapped for this consumer.
    async fn resolve_d_key(&mut self, d_key_name: &Name) -> Result<DKeyPrivate, AccessError> {
        let interest_name = d_key_name
            .clone()
            .append(component::FOR)
            .append_name(&self.consumer_name);
        let link = self.config.d_key_link.clone();
        let d_key_data = self
            .send_interest(Interest::new(interest_name), self.config.retries, link.as_ref())
            .await?;
        self.decrypt_d_key(&d_key_data)
    }

    /// Unwrap a D-KEY data object with the consumer's own key.
    ///
    /// The content is exactly two EncryptedContent children: a nonce key
    /// wrapped under the consumer key, then the D-KEY bits wrapped under the
    /// nonce.
    fn decrypt_d_key(&self, d_key_data: &Data) -> Result<DKeyPrivate, AccessError> {
        let (nonce_block, payload_block) = decode_d_key_content(&d_key_data.content)?;

        let consumer_key_name = nonce_block.key_locator.clone();
        let consumer_key = self
            .store
            .decrypt_key(&consumer_key_name)?
            .ok_or(AccessError::NoDecryptKey(consumer_key_name))?;

        let nonce_bits = decrypt_content(&nonce_block, consumer_key.as_der())?;
        let d_key_bits = decrypt_content(&payload_block, &nonce_bits)?;
        Ok(DKeyPrivate::from_der(d_key_bits))
    }

    /// Express an interest with retry and delegation failover, validating the
    /// response.
    ///
    /// Timeouts retry while the budget lasts, then count as nacks. A nack
    /// attaches `link` (delegation 0) if unused, advances the index
    /// otherwise, and fails with `DataRetrievalFailure` when both are
    /// exhausted. Re-issues after a nack carry no timeout budget.
    async fn send_interest(
        &self,
        mut interest: Interest,
        mut retries: u32,
        link: Option<&Link>,
    ) -> Result<Data, AccessError> {
        loop {
            match self.face.express_interest(&interest).await {
                FaceReply::Data(data) => {
                    if !interest.matches_data(&data) {
                        warn!(interest = %interest.name, data = %data.name, "response does not match interest");
                        return Err(AccessError::DataRetrievalFailure(interest.name));
                    }
                    self.validator
                        .validate(&data)
                        .await
                        .map_err(AccessError::Validation)?;
                    return Ok(data);
                }

                FaceReply::Timeout if retries > 0 => {
                    retries -= 1;
                    trace!(name = %interest.name, retries, "interest timed out, retrying");
                }

                FaceReply::Timeout | FaceReply::Nack => {
                    let Some(link) = link.filter(|l| !l.is_empty()) else {
                        return Err(AccessError::DataRetrievalFailure(interest.name));
                    };
                    match interest.selected_delegation {
                        None => {
                            interest.set_link(link.clone());
                            interest.set_selected_delegation(0);
                            retries = 0;
                        }
                        Some(index) if index + 1 < link.len() => {
                            interest.set_selected_delegation(index + 1);
                            retries = 0;
                        }
                        Some(_) => {
                            return Err(AccessError::DataRetrievalFailure(interest.name));
                        }
                    }
                }
            }
        }
    }
}
