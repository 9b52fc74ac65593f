use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use wax_utils::macros::generate_set_and_with;

use super::{
    AlgorithmDescriptor, ContentEncryptionAlgorithm, CritPolicy, Headers, JoseError,
    JoseErrorKind, JoseKey, JoseProfile, KeyManagementAlgorithm, PrimitiveFamily, Registry, aead,
    encoding,
    key_mgmt::{self, ContentKey},
};

#[derive(Debug, Clone)]
/// [`JweBuilder`] encrypts one payload for one or more recipients
///
/// All recipients share one CEK. With a single recipient its `alg` and
/// header go into the protected header, so the result can also be
/// written in compact form. With several recipients each one carries
/// its own `alg` in its per-recipient header. `enc` is always protected.
pub struct JweBuilder<'a> {
    registry: &'a Registry,
    profile: JoseProfile,
    enc: ContentEncryptionAlgorithm,
    payload: Option<Vec<u8>>,
    protected_headers: Headers,
    unprotected_headers: Headers,
    aad: Option<Vec<u8>>,
    recipients: Vec<PendingRecipient<'a>>,
}

#[derive(Debug, Clone)]
struct PendingRecipient<'a> {
    alg: KeyManagementAlgorithm,
    key: &'a JoseKey,
    header: Headers,
}

impl Default for JweBuilder<'_> {
    fn default() -> Self {
        Self::from_profile(JoseProfile::default())
    }
}

impl<'a> JweBuilder<'a> {
    /// Create a builder using the default [`JoseProfile`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder which takes its default algorithms from `profile`
    pub fn from_profile(profile: JoseProfile) -> Self {
        Self {
            registry: Registry::shared(),
            enc: profile.content_encryption().clone(),
            profile,
            payload: None,
            protected_headers: Headers::default(),
            unprotected_headers: Headers::default(),
            aad: None,
            recipients: Vec::new(),
        }
    }

    generate_set_and_with! {
        /// Registry used to resolve algorithm names
        pub fn registry(mut self, registry: &'a Registry) -> Self {
            self.registry = registry;
            self
        }
    }

    generate_set_and_with! {
        /// Content encryption algorithm, `enc`
        pub fn content_encryption(mut self, enc: ContentEncryptionAlgorithm) -> Self {
            self.enc = enc;
            self
        }
    }

    generate_set_and_with! {
        /// Payload to encrypt
        pub fn payload(mut self, payload: impl AsRef<[u8]>) -> Self {
            self.payload = Some(payload.as_ref().to_vec());
            self
        }
    }

    generate_set_and_with! {
        /// Extra authenticated data, only available in the JSON serializations
        pub fn aad(mut self, aad: Option<Vec<u8>>) -> Self {
            self.aad = aad;
            self
        }
    }

    generate_set_and_with! {
        /// Set provided header in the protected header map
        ///
        /// Warning: this function will replace already existing headers
        pub fn protected_header(
            mut self,
            name: impl Into<String>,
            value: impl Serialize,
        ) -> Result<Self, JoseError> {
            self.protected_headers.try_set_header(name, value)?;
            Ok(self)
        }
    }

    generate_set_and_with! {
        /// Set provided headers in the protected header map
        pub fn protected_headers(mut self, headers: impl Serialize) -> Result<Self, JoseError> {
            self.protected_headers.try_set_headers(headers)?;
            Ok(self)
        }
    }

    /// Get mutable reference to the underlying protected header store
    pub fn protected_headers_mut(&mut self) -> &mut Headers {
        &mut self.protected_headers
    }

    generate_set_and_with! {
        /// Set provided header in the shared unprotected header map
        pub fn unprotected_header(
            mut self,
            name: impl Into<String>,
            value: impl Serialize,
        ) -> Result<Self, JoseError> {
            self.unprotected_headers.try_set_header(name, value)?;
            Ok(self)
        }
    }

    generate_set_and_with! {
        /// Set provided headers in the shared unprotected header map
        pub fn unprotected_headers(mut self, headers: impl Serialize) -> Result<Self, JoseError> {
            self.unprotected_headers.try_set_headers(headers)?;
            Ok(self)
        }
    }

    /// Get mutable reference to the shared unprotected header store
    pub fn unprotected_headers_mut(&mut self) -> &mut Headers {
        &mut self.unprotected_headers
    }

    /// Add a recipient whose CEK is protected with `alg` under `key`
    #[must_use]
    pub fn add_recipient(self, alg: KeyManagementAlgorithm, key: &'a JoseKey) -> Self {
        self.add_recipient_with_header(alg, key, Headers::default())
    }

    /// Add a recipient with its own header, for example to carry a `kid`
    #[must_use]
    pub fn add_recipient_with_header(
        mut self,
        alg: KeyManagementAlgorithm,
        key: &'a JoseKey,
        header: Headers,
    ) -> Self {
        self.recipients.push(PendingRecipient { alg, key, header });
        self
    }

    /// Add a recipient using the key management algorithm the profile picks for `key`
    #[must_use]
    pub fn add_default_recipient(self, key: &'a JoseKey) -> Self {
        let alg = self.profile.key_management_for(key);
        self.add_recipient(alg, key)
    }

    /// Encrypt and produce the compact serialization
    ///
    /// Fails with [`JoseErrorKind::PolicyViolation`] unless there is exactly one
    /// recipient and no unprotected header or extra AAD.
    pub fn build_compact(self) -> Result<JweCompact, JoseError> {
        self.build_general()?.to_compact()
    }

    /// Encrypt and produce a [`JweFlattened`], requires exactly one recipient
    pub fn build_flattened(self) -> Result<JweFlattened, JoseError> {
        self.build_general()?.into_flattened()
    }

    /// Encrypt and produce a general [`Jwe`]
    pub fn build_general(self) -> Result<Jwe, JoseError> {
        let Some(payload) = self.payload else {
            return Err(JoseError::invalid_input("no payload set to encrypt"));
        };
        if self.recipients.is_empty() {
            return Err(JoseError::invalid_input("a JWE needs at least one recipient"));
        }

        let content = self.registry.content_encryption(&self.enc);
        let single = self.recipients.len() == 1;
        let mut protected = self.protected_headers;
        protected.set_enc(self.enc.as_str().to_owned());

        let mut pending = Vec::with_capacity(self.recipients.len());
        for recipient in self.recipients {
            let descriptor = self.registry.key_management(&recipient.alg);
            if descriptor.family() == PrimitiveFamily::Direct && !single {
                return Err(JoseError::policy_violation(
                    "dir can only be used with a single recipient",
                ));
            }
            let mut header = recipient.header;
            header.set_alg(recipient.alg.as_str().to_owned());
            if single {
                if let Some(name) = Headers::shared_name(&[&protected, &header]) {
                    return Err(JoseError::policy_violation(format!(
                        "header '{name}' is set twice"
                    )));
                }
                protected = Headers::joined(&[&protected, &header]);
                header = Headers::default();
            }
            if let Some(name) =
                Headers::shared_name(&[&protected, &self.unprotected_headers, &header])
            {
                return Err(JoseError::policy_violation(format!(
                    "header '{name}' is both protected and unprotected"
                )));
            }
            pending.push((descriptor, recipient.key, header));
        }

        let mut cek: Option<ContentKey> = None;
        let mut recipients = Vec::with_capacity(pending.len());
        for (descriptor, key, header) in pending {
            let result = key_mgmt::encrypt_cek(&descriptor, &content, key, cek.clone())?;
            cek = Some(result.cek);
            recipients.push(Recipient {
                header,
                encrypted_key: encoding::encode(result.encrypted_key),
            });
        }
        let Some(cek) = cek else {
            return Err(JoseError::invalid_input("a JWE needs at least one recipient"));
        };

        let protected_b64 = protected.encode()?;
        let aad_b64 = self.aad.map(encoding::encode);
        let aad = authenticated_data(&protected_b64, aad_b64.as_deref());
        let encrypted = aead::encrypt(
            &content,
            &payload,
            None,
            aad.as_bytes(),
            cek.as_symmetric_key(),
        )?;
        tracing::trace!(
            enc = content.name(),
            recipients = recipients.len(),
            "jwe encrypted"
        );

        Ok(Jwe {
            protected: protected_b64,
            unprotected: self.unprotected_headers,
            recipients,
            aad: aad_b64,
            iv: encoding::encode(encrypted.iv),
            ciphertext: encoding::encode(encrypted.ciphertext),
            tag: encoding::encode(encrypted.tag),
        })
    }
}

/// The AAD input of the content encryption: the protected header segment,
/// followed by `.` and the extra AAD segment when there is one.
fn authenticated_data(protected: &str, aad: Option<&str>) -> String {
    match aad {
        Some(aad) => format!("{protected}.{aad}"),
        None => protected.to_owned(),
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
/// One JWE recipient: its unprotected header and encrypted key
pub struct Recipient {
    #[serde(default, skip_serializing_if = "Headers::is_empty")]
    header: Headers,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    encrypted_key: String,
}

impl Recipient {
    /// Per-recipient unprotected header
    pub fn header(&self) -> &Headers {
        &self.header
    }

    /// Base64url encrypted key, empty for `dir`
    pub fn encrypted_key(&self) -> &str {
        &self.encrypted_key
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
/// [`Jwe`] is the general JSON serialization as defined in [`rfc7516, section 7.2.1`]
///
/// [`rfc7516, section 7.2.1`]: https://datatracker.ietf.org/doc/html/rfc7516#section-7.2.1
pub struct Jwe {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    protected: String,
    #[serde(default, skip_serializing_if = "Headers::is_empty")]
    unprotected: Headers,
    recipients: Vec<Recipient>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    aad: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    iv: String,
    ciphertext: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    tag: String,
}

impl Jwe {
    /// Create a builder using the default [`JoseProfile`]
    pub fn builder<'a>() -> JweBuilder<'a> {
        JweBuilder::new()
    }

    /// Parse either JSON serialization.
    ///
    /// An object with a `recipients` member is read as general serialization,
    /// anything else as flattened.
    pub fn from_json(json: &str) -> Result<Self, JoseError> {
        let object: Map<String, Value> = serde_json::from_str(json).map_err(|err| {
            JoseError::malformed_encoding("JWE is not a JSON object").with_source(err)
        })?;
        let general = object.contains_key("recipients");
        if general && ["header", "encrypted_key"].iter().any(|k| object.contains_key(*k)) {
            return Err(JoseError::malformed_encoding(
                "JWE mixes general and flattened members",
            ));
        }
        let value = Value::Object(object);
        if general {
            serde_json::from_value(value).map_err(|err| {
                JoseError::malformed_encoding("invalid general JWE").with_source(err)
            })
        } else {
            serde_json::from_value::<JweFlattened>(value)
                .map(Self::from)
                .map_err(|err| {
                    JoseError::malformed_encoding("invalid flattened JWE").with_source(err)
                })
        }
    }

    /// Decoded protected header
    pub fn protected_headers(&self) -> Result<Headers, JoseError> {
        Headers::decode_segment(&self.protected)
    }

    /// Shared unprotected header
    pub fn unprotected_headers(&self) -> &Headers {
        &self.unprotected
    }

    /// All recipients, in order
    pub fn recipients(&self) -> &[Recipient] {
        &self.recipients
    }

    fn single(&self) -> Result<&Recipient, JoseError> {
        match self.recipients.as_slice() {
            [recipient] => Ok(recipient),
            recipients => Err(JoseError::policy_violation(format!(
                "expected exactly one recipient, found {}",
                recipients.len()
            ))),
        }
    }

    /// Convert to flattened serialization, requires exactly one recipient.
    pub fn into_flattened(mut self) -> Result<JweFlattened, JoseError> {
        self.single()?;
        let recipient = self.recipients.remove(0);
        Ok(JweFlattened {
            protected: self.protected,
            unprotected: self.unprotected,
            recipient,
            aad: self.aad,
            iv: self.iv,
            ciphertext: self.ciphertext,
            tag: self.tag,
        })
    }

    /// Convert to compact serialization.
    ///
    /// Requires exactly one recipient and nothing that compact form
    /// cannot carry: unprotected headers or extra AAD.
    pub fn to_compact(&self) -> Result<JweCompact, JoseError> {
        let recipient = self.single()?;
        if !self.unprotected.is_empty() || !recipient.header.is_empty() {
            return Err(JoseError::policy_violation(
                "compact JWE does not support unprotected headers",
            ));
        }
        if self.aad.is_some() {
            return Err(JoseError::policy_violation(
                "compact JWE does not support extra AAD",
            ));
        }
        Ok(JweCompact(format!(
            "{}.{}.{}.{}.{}",
            self.protected, recipient.encrypted_key, self.iv, self.ciphertext, self.tag
        )))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
/// [`JweFlattened`] is a `JWE` for a single recipient, as defined in [`rfc7516, section 7.2.2`]
///
/// [`rfc7516, section 7.2.2`]: https://datatracker.ietf.org/doc/html/rfc7516#section-7.2.2
pub struct JweFlattened {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    protected: String,
    #[serde(default, skip_serializing_if = "Headers::is_empty")]
    unprotected: Headers,
    #[serde(flatten)]
    recipient: Recipient,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    aad: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    iv: String,
    ciphertext: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    tag: String,
}

impl JweFlattened {
    /// Create a [`JweCompact`] from this [`JweFlattened`]
    pub fn to_compact(&self) -> Result<JweCompact, JoseError> {
        Jwe::from(self.clone()).to_compact()
    }
}

impl From<JweFlattened> for Jwe {
    fn from(flattened: JweFlattened) -> Self {
        Self {
            protected: flattened.protected,
            unprotected: flattened.unprotected,
            recipients: vec![flattened.recipient],
            aad: flattened.aad,
            iv: flattened.iv,
            ciphertext: flattened.ciphertext,
            tag: flattened.tag,
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
/// [`JweCompact`] is the compact serialization as defined in [`rfc7516, section 7.1`]
///
/// [`rfc7516, section 7.1`]: https://datatracker.ietf.org/doc/html/rfc7516#section-7.1
pub struct JweCompact(String);

impl JweCompact {
    /// The five dot separated segments.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for JweCompact {
    type Err = JoseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.split('.').count() != 5 {
            return Err(JoseError::malformed_encoding(
                "compact JWE must have exactly 5 segments",
            ));
        }
        Ok(Self(s.to_owned()))
    }
}

impl fmt::Display for JweCompact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for JweCompact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("JweCompact").field(&self.0).finish()
    }
}

impl From<JweCompact> for Jwe {
    fn from(compact: JweCompact) -> Self {
        let mut segments = compact.0.splitn(5, '.').map(str::to_owned);
        let mut next = || segments.next().unwrap_or_default();
        let protected = next();
        let encrypted_key = next();
        let iv = next();
        let ciphertext = next();
        let tag = next();
        Self {
            protected,
            unprotected: Headers::default(),
            recipients: vec![Recipient {
                header: Headers::default(),
                encrypted_key,
            }],
            aad: None,
            iv,
            ciphertext,
            tag,
        }
    }
}

#[derive(Debug, Clone)]
/// [`JweDecryptor`] recovers the payload of a [`Jwe`] with a single key
///
/// Only recipients whose `alg` fits the kind of key are tried, those with
/// a matching `kid` first. The first recipient that decrypts wins.
pub struct JweDecryptor<'a> {
    key: &'a JoseKey,
    registry: &'a Registry,
    crit_policy: CritPolicy,
    kid: Option<String>,
}

impl<'a> JweDecryptor<'a> {
    /// Create a decryptor for `key`
    pub fn new(key: &'a JoseKey) -> Self {
        Self {
            key,
            registry: Registry::shared(),
            crit_policy: CritPolicy::default(),
            kid: None,
        }
    }

    generate_set_and_with! {
        /// Registry used to resolve `alg` and `enc`
        pub fn registry(mut self, registry: &'a Registry) -> Self {
            self.registry = registry;
            self
        }
    }

    generate_set_and_with! {
        /// Critical extensions understood by the caller
        pub fn crit_policy(mut self, policy: CritPolicy) -> Self {
            self.crit_policy = policy;
            self
        }
    }

    generate_set_and_with! {
        /// Key id of the key, recipients carrying it are tried first
        pub fn kid(mut self, kid: Option<String>) -> Self {
            self.kid = kid;
            self
        }
    }

    /// Decrypt the payload of `jwe`
    pub fn decrypt(&self, jwe: &Jwe) -> Result<Vec<u8>, JoseError> {
        if jwe.recipients.is_empty() {
            return Err(JoseError::malformed_encoding("JWE without recipients"));
        }
        let protected = Headers::decode_segment(&jwe.protected)?;
        if let Some(aad) = &jwe.aad {
            encoding::decode(aad, "decode aad")?;
        }
        let content = ReceivedContent {
            iv: encoding::decode(&jwe.iv, "decode iv")?,
            ciphertext: encoding::decode(&jwe.ciphertext, "decode ciphertext")?,
            tag: encoding::decode(&jwe.tag, "decode tag")?,
            aad: authenticated_data(&jwe.protected, jwe.aad.as_deref()),
        };

        let mut candidates = Vec::with_capacity(jwe.recipients.len());
        for (index, recipient) in jwe.recipients.iter().enumerate() {
            if let Some(name) =
                Headers::shared_name(&[&protected, &jwe.unprotected, &recipient.header])
            {
                return Err(JoseError::malformed_encoding(format!(
                    "header '{name}' is both protected and unprotected"
                )));
            }
            let joined = Headers::joined(&[&protected, &jwe.unprotected, &recipient.header]);
            let kid_matches = self.kid.is_some() && joined.kid() == self.kid.as_deref();
            candidates.push((index, recipient, joined, kid_matches));
        }
        // stable, so the received order is kept within both groups
        candidates.sort_by_key(|(_, _, _, kid_matches)| !kid_matches);

        let mut failure: Option<JoseError> = None;
        for (index, recipient, joined, _) in candidates {
            let result = self
                .crit_policy
                .check(&protected, &[&jwe.unprotected, &recipient.header])
                .and_then(|()| {
                    let alg = self.registry.resolve_key_algorithm(joined.alg());
                    if !usable_with(&alg, self.key) {
                        return Ok(None);
                    }
                    self.decrypt_recipient(&joined, &alg, recipient, &content)
                        .map(Some)
                });
            match result {
                Ok(Some(payload)) => {
                    tracing::trace!(index, "jwe recipient decrypted");
                    return Ok(payload);
                }
                Ok(None) => {
                    tracing::trace!(index, "jwe recipient skipped, key does not fit");
                }
                Err(err) => {
                    tracing::debug!(index, %err, "jwe recipient rejected");
                    // keep the first error that says more than "did not decrypt"
                    let replace = failure.as_ref().is_none_or(|failure| {
                        failure.is(JoseErrorKind::AuthenticationFailure)
                            && !err.is(JoseErrorKind::AuthenticationFailure)
                    });
                    if replace {
                        failure = Some(err);
                    }
                }
            }
        }

        Err(failure.unwrap_or_else(|| {
            JoseError::invalid_key_material(format!(
                "no recipient can be decrypted with {} key",
                self.key.algorithm_name()
            ))
        }))
    }

    /// `true` exactly when [`Self::decrypt`] succeeds
    pub fn verify(&self, jwe: &Jwe) -> bool {
        self.decrypt(jwe).is_ok()
    }

    fn decrypt_recipient(
        &self,
        joined: &Headers,
        alg: &AlgorithmDescriptor,
        recipient: &Recipient,
        received: &ReceivedContent,
    ) -> Result<Vec<u8>, JoseError> {
        if let Some(zip) = joined.zip() {
            return Err(JoseError::unsupported_algorithm(format!(
                "compression '{zip}' is not implemented"
            )));
        }
        let content = self.registry.resolve_content_algorithm(joined.enc());
        let encrypted_key = encoding::decode(&recipient.encrypted_key, "decode encrypted key")?;
        let cek = key_mgmt::decrypt_cek(alg, &content, &encrypted_key, self.key)?;
        aead::decrypt(
            &content,
            &received.ciphertext,
            &received.iv,
            received.aad.as_bytes(),
            &received.tag,
            cek.as_symmetric_key(),
        )
    }
}

/// Decoded content fields of a received [`Jwe`], shared by all recipients.
struct ReceivedContent {
    iv: Vec<u8>,
    ciphertext: Vec<u8>,
    tag: Vec<u8>,
    aad: String,
}

/// Whether `key` is the kind of key the key management algorithm works with.
///
/// Unsupported algorithms and elliptic curve keys count as usable,
/// so the engine reports them instead of silently skipping.
fn usable_with(alg: &AlgorithmDescriptor, key: &JoseKey) -> bool {
    match alg.family() {
        PrimitiveFamily::Direct | PrimitiveFamily::AesKeyWrap => {
            matches!(key, JoseKey::Symmetric(_) | JoseKey::EllipticCurve(_))
        }
        PrimitiveFamily::RsaPkcs1v15Encryption | PrimitiveFamily::RsaOaep => {
            !matches!(key, JoseKey::Symmetric(_))
        }
        _ => true,
    }
}
