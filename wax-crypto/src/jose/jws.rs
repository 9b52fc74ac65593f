use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use wax_error::BoxError;
use wax_utils::macros::generate_set_and_with;

use super::{
    AlgorithmDescriptor, CritPolicy, Headers, JoseError, JoseErrorKind, JoseKey, JoseProfile,
    JwsAlgorithm, PrimitiveFamily, Registry, encoding, sign,
};

#[derive(Default, Debug, Clone, PartialEq, Eq)]
/// [`JwsBuilder`] should be used when creating a [`Jws`], [`JwsCompact`] or [`JwsFlattened`]
///
/// Nothing can be signed before a payload is set, use an empty payload
/// for objects which have none (for example ACME POST-as-GET).
pub struct JwsBuilder {
    protected_headers: Headers,
    unprotected_headers: Headers,
    payload: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// [`ChainedJwsBuilder`] owns the signatures computed so far over one payload
/// and can add more of them, each with its own set of headers.
pub struct ChainedJwsBuilder {
    signatures: Vec<Signature>,
    payload: String,
    protected_headers: Headers,
    unprotected_headers: Headers,
}

impl JwsBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    generate_set_and_with! {
        /// Add the provided payload to this [`JwsBuilder`]
        pub fn payload(mut self, payload: impl AsRef<[u8]>) -> Self {
            self.payload = Some(encoding::encode(payload));
            self
        }
    }

    generate_set_and_with! {
        /// Set provided header in the protected header map
        ///
        /// Warning: this function will replace already existing headers
        /// If more control is needed, use [`Self::protected_headers_mut`] to get access
        /// to the underlying header store
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
        ///
        /// Warning: this function will replace already existing headers
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
        /// Set provided header in the unprotected header map
        ///
        /// Warning: this function will replace already existing headers
        /// If more control is needed, use [`Self::unprotected_headers_mut`] to get access
        /// to the underlying header store
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
        /// Set provided headers in the unprotected header map
        ///
        /// Warning: this function will replace already existing headers
        pub fn unprotected_headers(mut self, headers: impl Serialize) -> Result<Self, JoseError> {
            self.unprotected_headers.try_set_headers(headers)?;
            Ok(self)
        }
    }

    /// Get mutable reference to the underlying unprotected header store
    pub fn unprotected_headers_mut(&mut self) -> &mut Headers {
        &mut self.unprotected_headers
    }

    /// Sign with `signer` and continue in a [`ChainedJwsBuilder`],
    /// which can add more signatures over the same payload.
    pub fn add_signature(self, signer: &impl Signer) -> Result<ChainedJwsBuilder, JoseError> {
        let Some(payload) = self.payload else {
            return Err(JoseError::invalid_input("no payload set to sign"));
        };
        let signature = Signature::create(
            &payload,
            self.protected_headers,
            self.unprotected_headers,
            signer,
        )?;
        Ok(ChainedJwsBuilder {
            signatures: vec![signature],
            payload,
            protected_headers: Headers::default(),
            unprotected_headers: Headers::default(),
        })
    }

    /// Sign with `signer` and produce the compact serialization
    ///
    /// Fails with [`JoseErrorKind::PolicyViolation`] if an unprotected header is set.
    pub fn build_compact(self, signer: &impl Signer) -> Result<JwsCompact, JoseError> {
        self.add_signature(signer)?.build_compact()
    }

    /// Sign with `signer` and produce a [`JwsFlattened`]
    pub fn build_flattened(self, signer: &impl Signer) -> Result<JwsFlattened, JoseError> {
        self.add_signature(signer)?.build_flattened()
    }

    /// Sign with `signer` and produce a general [`Jws`]
    pub fn build_general(self, signer: &impl Signer) -> Result<Jws, JoseError> {
        self.add_signature(signer)?.build_general()
    }
}

impl ChainedJwsBuilder {
    generate_set_and_with! {
        /// Set provided header in the protected header map of the next signature
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
        /// Set provided headers in the protected header map of the next signature
        pub fn protected_headers(mut self, headers: impl Serialize) -> Result<Self, JoseError> {
            self.protected_headers.try_set_headers(headers)?;
            Ok(self)
        }
    }

    /// Get mutable reference to the protected header store of the next signature
    pub fn protected_headers_mut(&mut self) -> &mut Headers {
        &mut self.protected_headers
    }

    generate_set_and_with! {
        /// Set provided header in the unprotected header map of the next signature
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
        /// Set provided headers in the unprotected header map of the next signature
        pub fn unprotected_headers(mut self, headers: impl Serialize) -> Result<Self, JoseError> {
            self.unprotected_headers.try_set_headers(headers)?;
            Ok(self)
        }
    }

    /// Get mutable reference to the unprotected header store of the next signature
    pub fn unprotected_headers_mut(&mut self) -> &mut Headers {
        &mut self.unprotected_headers
    }

    /// Replace the payload.
    ///
    /// Every signature computed so far covers the old payload, they are all
    /// dropped and signing starts over from a fresh [`JwsBuilder`].
    #[must_use]
    pub fn with_payload(self, payload: impl AsRef<[u8]>) -> JwsBuilder {
        tracing::trace!(
            dropped = self.signatures.len(),
            "payload replaced, dropping signatures"
        );
        JwsBuilder::new().with_payload(payload)
    }

    /// Add one more signature over the same payload.
    ///
    /// Signatures are not deduplicated, signing twice with the same
    /// key and headers adds two entries.
    pub fn add_signature(mut self, signer: &impl Signer) -> Result<Self, JoseError> {
        let signature = Signature::create(
            &self.payload,
            std::mem::take(&mut self.protected_headers),
            std::mem::take(&mut self.unprotected_headers),
            signer,
        )?;
        self.signatures.push(signature);
        Ok(self)
    }

    /// Number of signatures added so far.
    pub fn signature_count(&self) -> usize {
        self.signatures.len()
    }

    fn finish(self) -> Result<Jws, JoseError> {
        if !self.protected_headers.is_empty() || !self.unprotected_headers.is_empty() {
            return Err(JoseError::invalid_input(
                "headers were set after the last signature",
            ));
        }
        Ok(Jws {
            payload: self.payload,
            signatures: self.signatures,
        })
    }

    /// Compact serialization of the single signature.
    ///
    /// Fails with [`JoseErrorKind::PolicyViolation`] if there is more than one
    /// signature or if the signature has an unprotected header.
    pub fn build_compact(self) -> Result<JwsCompact, JoseError> {
        self.finish()?.to_compact()
    }

    /// Flattened JSON serialization of the single signature.
    pub fn build_flattened(self) -> Result<JwsFlattened, JoseError> {
        self.finish()?.into_flattened()
    }

    /// General JSON serialization of all signatures.
    pub fn build_general(self) -> Result<Jws, JoseError> {
        self.finish()
    }
}

/// [`Signer`] implements all methods which are needed to sign our JWS requests,
/// and add the needed info to our JOSE headers (JOSE headers = protected + unprotected headers)
pub trait Signer {
    type Signature: AsRef<[u8]>;
    type Error: Into<BoxError>;

    /// Set headers which are needed to verify the final `Signature`
    ///
    /// Example headers are: `alg`, `kid`
    fn set_headers(
        &self,
        protected_headers: &mut Headers,
        unprotected_headers: &mut Headers,
    ) -> Result<(), Self::Error>;

    /// Sign the str encoded signing input
    fn sign(&self, data: &str) -> Result<Self::Signature, Self::Error>;
}

#[derive(Debug, Clone)]
/// [`Signer`] for any [`JoseKey`] and [`JwsAlgorithm`]
///
/// Sets `alg` (and `kid` when configured) in the protected header.
pub struct JwsSigner<'a> {
    key: &'a JoseKey,
    alg: JwsAlgorithm,
    kid: Option<String>,
    registry: &'a Registry,
}

impl<'a> JwsSigner<'a> {
    /// Create a signer using the given algorithm.
    pub fn new(key: &'a JoseKey, alg: JwsAlgorithm) -> Self {
        Self {
            key,
            alg,
            kid: None,
            registry: Registry::shared(),
        }
    }

    /// Create a signer using the algorithm the profile picks for `key`.
    pub fn from_profile(key: &'a JoseKey, profile: &JoseProfile) -> Self {
        Self::new(key, profile.signature_for(key))
    }

    generate_set_and_with! {
        /// Key id added to the protected header
        pub fn kid(mut self, kid: Option<String>) -> Self {
            self.kid = kid;
            self
        }
    }

    generate_set_and_with! {
        /// Registry used to resolve the algorithm
        pub fn registry(mut self, registry: &'a Registry) -> Self {
            self.registry = registry;
            self
        }
    }

    /// The signature algorithm.
    pub fn alg(&self) -> &JwsAlgorithm {
        &self.alg
    }
}

impl Signer for JwsSigner<'_> {
    type Signature = Vec<u8>;
    type Error = JoseError;

    fn set_headers(
        &self,
        protected_headers: &mut Headers,
        _unprotected_headers: &mut Headers,
    ) -> Result<(), JoseError> {
        protected_headers.set_alg(self.alg.as_str().to_owned());
        if let Some(kid) = &self.kid {
            protected_headers.set_kid(kid.clone());
        }
        Ok(())
    }

    fn sign(&self, data: &str) -> Result<Vec<u8>, JoseError> {
        sign::sign(data.as_bytes(), self.key, &self.registry.signature(&self.alg))
    }
}

#[derive(Clone, PartialEq, Eq)]
/// [`JwsCompact`] is a compact `JWS` representation as defined in [`rfc7515, section 7.1`]
///
/// [`rfc7515, section 7.1`]: https://datatracker.ietf.org/doc/html/rfc7515#section-7.1
pub struct JwsCompact(String);

impl JwsCompact {
    /// Create a builder which can be used to create a [`JwsCompact`]
    pub fn builder() -> JwsBuilder {
        JwsBuilder::new()
    }

    /// The `header.payload.signature` string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Verify and decode this [`JwsCompact`]
    pub fn decode(&self, verifier: &impl Verifier) -> Result<DecodedJws, JoseError> {
        Jws::from(self.clone()).decode(verifier)
    }
}

impl FromStr for JwsCompact {
    type Err = JoseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.split('.').count() != 3 {
            return Err(JoseError::malformed_encoding(
                "compact JWS must have exactly 3 segments",
            ));
        }
        Ok(Self(s.to_owned()))
    }
}

impl fmt::Display for JwsCompact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for JwsCompact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("JwsCompact").field(&self.0).finish()
    }
}

impl From<JwsCompact> for Jws {
    fn from(compact: JwsCompact) -> Self {
        let mut segments = compact.0.splitn(3, '.').map(str::to_owned);
        let protected = segments.next().unwrap_or_default();
        let payload = segments.next().unwrap_or_default();
        let signature = segments.next().unwrap_or_default();
        Self {
            payload,
            signatures: vec![Signature {
                protected,
                unprotected: Headers::default(),
                signature,
            }],
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
/// [`JwsFlattened`] is a `JWS` which is optimized for a single signature, as defined in [`rfc7515, section 7.2.2`]
///
/// It does this by setting protected, header and signature at the root,
/// vs setting it in the signatures array
///
/// [`rfc7515, section 7.2.2`]: https://datatracker.ietf.org/doc/html/rfc7515#section-7.2.2
pub struct JwsFlattened {
    payload: String,
    #[serde(flatten)]
    signature: Signature,
}

impl JwsFlattened {
    /// Create a builder which can be used to create a [`JwsFlattened`]
    pub fn builder() -> JwsBuilder {
        JwsBuilder::new()
    }

    /// Create a [`JwsCompact`] from this [`JwsFlattened`]
    pub fn to_compact(&self) -> Result<JwsCompact, JoseError> {
        self.signature.to_compact(&self.payload)
    }

    /// Verify and decode this [`JwsFlattened`]
    pub fn decode(self, verifier: &impl Verifier) -> Result<DecodedJws, JoseError> {
        Jws::from(self).decode(verifier)
    }
}

impl From<JwsFlattened> for Jws {
    fn from(flattened: JwsFlattened) -> Self {
        Self {
            payload: flattened.payload,
            signatures: vec![flattened.signature],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
/// [`Jws`] is the general serialization format as defined in [`rfc7515, section 7.2.1`]
///
/// [`rfc7515, section 7.2.1`]: https://datatracker.ietf.org/doc/html/rfc7515#section-7.2.1
pub struct Jws {
    payload: String,
    signatures: Vec<Signature>,
}

impl Jws {
    /// Create a builder which can be used to create a [`Jws`]
    pub fn builder() -> JwsBuilder {
        JwsBuilder::new()
    }

    /// Parse either JSON serialization.
    ///
    /// An object with a `signatures` member is read as general serialization,
    /// anything else as flattened.
    pub fn from_json(json: &str) -> Result<Self, JoseError> {
        let object: Map<String, Value> = serde_json::from_str(json)
            .map_err(|err| JoseError::malformed_encoding("JWS is not a JSON object").with_source(err))?;
        let general = object.contains_key("signatures");
        if general && ["protected", "header", "signature"].iter().any(|k| object.contains_key(*k)) {
            return Err(JoseError::malformed_encoding(
                "JWS mixes general and flattened members",
            ));
        }
        let value = Value::Object(object);
        if general {
            serde_json::from_value(value).map_err(|err| {
                JoseError::malformed_encoding("invalid general JWS").with_source(err)
            })
        } else {
            serde_json::from_value::<JwsFlattened>(value)
                .map(Self::from)
                .map_err(|err| JoseError::malformed_encoding("invalid flattened JWS").with_source(err))
        }
    }

    /// Number of signatures.
    pub fn signature_count(&self) -> usize {
        self.signatures.len()
    }

    fn single(&self) -> Result<&Signature, JoseError> {
        match self.signatures.as_slice() {
            [signature] => Ok(signature),
            signatures => Err(JoseError::policy_violation(format!(
                "expected exactly one signature, found {}",
                signatures.len()
            ))),
        }
    }

    /// Convert to flattened serialization, requires exactly one signature.
    pub fn into_flattened(mut self) -> Result<JwsFlattened, JoseError> {
        self.single()?;
        let signature = self.signatures.remove(0);
        Ok(JwsFlattened {
            payload: self.payload,
            signature,
        })
    }

    /// Convert to compact serialization, requires exactly one signature
    /// without unprotected header.
    pub fn to_compact(&self) -> Result<JwsCompact, JoseError> {
        self.single()?.to_compact(&self.payload)
    }

    /// Decode this [`Jws`] to a [`DecodedJws`] by decoding all values and checking with [`Verifier`]
    /// if the signatures are correct
    pub fn decode(self, verifier: &impl Verifier) -> Result<DecodedJws, JoseError> {
        if self.signatures.is_empty() {
            return Err(JoseError::malformed_encoding("JWS without signatures"));
        }

        let mut signatures = Vec::with_capacity(self.signatures.len());
        for signature in self.signatures {
            let protected = Headers::decode_segment(&signature.protected)?;
            if let Some(name) = Headers::shared_name(&[&protected, &signature.unprotected]) {
                return Err(JoseError::malformed_encoding(format!(
                    "header '{name}' is both protected and unprotected"
                )));
            }
            signatures.push(ToVerifySignature {
                signed_data: format!("{}.{}", signature.protected, self.payload),
                decoded_signature: DecodedSignature {
                    protected,
                    unprotected: signature.unprotected,
                    signature: signature.signature,
                },
            });
        }

        let payload = encoding::decode(&self.payload, "decode payload")?;

        let verified = verifier
            .verify(&signatures)
            .map_err(|err| JoseError::from_boxed(JoseErrorKind::AuthenticationFailure, err.into()))?;

        let signatures: Vec<_> = signatures
            .into_iter()
            .enumerate()
            .filter(|(index, _)| verified.contains(index))
            .map(|(_, sig)| sig.decoded_signature)
            .collect();
        if signatures.is_empty() {
            return Err(JoseError::authentication_failure());
        }

        Ok(DecodedJws {
            signatures,
            payload,
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
struct Signature {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    protected: String,
    #[serde(rename = "header", default, skip_serializing_if = "Headers::is_empty")]
    unprotected: Headers,
    signature: String,
}

impl Signature {
    fn create(
        payload: &str,
        mut protected: Headers,
        mut unprotected: Headers,
        signer: &impl Signer,
    ) -> Result<Self, JoseError> {
        signer
            .set_headers(&mut protected, &mut unprotected)
            .map_err(|err| JoseError::from_boxed(JoseErrorKind::InvalidInput, err.into()))?;
        if let Some(name) = Headers::shared_name(&[&protected, &unprotected]) {
            return Err(JoseError::policy_violation(format!(
                "header '{name}' is both protected and unprotected"
            )));
        }

        let protected_b64 = protected.encode()?;
        let signing_input = format!("{protected_b64}.{payload}");
        let signature = signer
            .sign(&signing_input)
            .map_err(|err| JoseError::from_boxed(JoseErrorKind::InvalidKeyMaterial, err.into()))?;

        Ok(Self {
            protected: protected_b64,
            unprotected,
            signature: encoding::encode(signature),
        })
    }

    fn to_compact(&self, payload: &str) -> Result<JwsCompact, JoseError> {
        if !self.unprotected.is_empty() {
            return Err(JoseError::policy_violation(
                "compact JWS does not support unprotected headers",
            ));
        }
        Ok(JwsCompact(format!(
            "{}.{}.{}",
            self.protected, payload, self.signature
        )))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// Decoded version of a [`Jws`]
///
/// Data here has already been verified, so everything
/// here is ready for usage. Signature entries the [`Verifier`]
/// did not accept are left out.
pub struct DecodedJws {
    payload: Vec<u8>,
    signatures: Vec<DecodedSignature>,
}

impl DecodedJws {
    /// Get reference to the [`DecodedSignature`]s
    pub fn signatures(&self) -> &[DecodedSignature] {
        self.signatures.as_slice()
    }

    /// Get reference to the payload
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Take the payload
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// Decoded headers and encoded signature of one signature entry
pub struct DecodedSignature {
    protected: Headers,
    unprotected: Headers,
    signature: String,
}

impl DecodedSignature {
    /// Reference to the protected [`Headers`]
    pub fn protected_headers(&self) -> &Headers {
        &self.protected
    }

    /// Reference to the unprotected [`Headers`]
    pub fn unprotected_headers(&self) -> &Headers {
        &self.unprotected
    }

    /// Header parameter from either header set, protected first
    pub fn header(&self, name: &str) -> Option<&Value> {
        self.protected.get(name).or_else(|| self.unprotected.get(name))
    }

    /// Base64url signature as it was received
    pub fn signature(&self) -> &str {
        &self.signature
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// A signature entry which still needs to be checked
///
/// It includes the signing input exactly as it was received,
/// so nothing needs to be re-encoded
pub struct ToVerifySignature {
    signed_data: String,
    decoded_signature: DecodedSignature,
}

impl ToVerifySignature {
    /// Received `protected.payload` string
    pub fn signed_data(&self) -> &str {
        &self.signed_data
    }

    /// Reference to the [`DecodedSignature`]
    pub fn decoded_signature(&self) -> &DecodedSignature {
        &self.decoded_signature
    }
}

/// [`Verifier`] will be called to confirm if the received data is valid
///
/// For some algorithms all signatures need to be valid, but there are also
/// cases when only one or some need to be valid.
pub trait Verifier {
    type Error: Into<BoxError>;
    /// Verify the received signature entries
    ///
    /// Returns the indices of the entries which are accepted. Only those
    /// end up in the [`DecodedJws`], an empty list rejects the whole [`Jws`].
    fn verify(&self, signatures: &[ToVerifySignature]) -> Result<Vec<usize>, Self::Error>;
}

#[derive(Debug, Clone)]
/// [`Verifier`] for a single [`JoseKey`]
///
/// A [`Jws`] is accepted when at least one of its signatures passes the
/// [`CritPolicy`] and verifies under the key with the algorithm named in
/// its header. Unsecured (`alg = "none"`) signatures are refused unless
/// explicitly allowed.
pub struct JwsVerifier<'a> {
    key: &'a JoseKey,
    registry: &'a Registry,
    crit_policy: CritPolicy,
    allow_unsecured: bool,
}

impl<'a> JwsVerifier<'a> {
    /// Create a verifier for `key`
    pub fn new(key: &'a JoseKey) -> Self {
        Self {
            key,
            registry: Registry::shared(),
            crit_policy: CritPolicy::default(),
            allow_unsecured: false,
        }
    }

    generate_set_and_with! {
        /// Registry used to resolve the `alg` header
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
        /// Accept `alg = "none"` signatures
        pub fn allow_unsecured(mut self, allow: bool) -> Self {
            self.allow_unsecured = allow;
            self
        }
    }

    /// `Ok(None)` when the entry is for another kind of key.
    fn verify_one(&self, to_verify: &ToVerifySignature) -> Result<Option<()>, JoseError> {
        let signature = &to_verify.decoded_signature;
        self.crit_policy
            .check(&signature.protected, &[&signature.unprotected])?;

        let alg = signature.header("alg").and_then(Value::as_str);
        if alg == Some(JwsAlgorithm::None.as_str()) && !self.allow_unsecured {
            return Err(JoseError::policy_violation("unsecured JWS is not allowed"));
        }
        let descriptor = self.registry.resolve_signature_algorithm(alg);
        if !usable_with(&descriptor, self.key) {
            return Ok(None);
        }
        let signature_bytes = encoding::decode(&signature.signature, "decode signature")?;

        if sign::verify(
            &signature_bytes,
            to_verify.signed_data.as_bytes(),
            self.key,
            &descriptor,
        )? {
            Ok(Some(()))
        } else {
            Err(JoseError::authentication_failure())
        }
    }
}

/// Whether `key` is the kind of key the signature algorithm works with.
///
/// Unsupported algorithms and elliptic curve keys count as usable,
/// so the engine reports them instead of silently skipping.
fn usable_with(alg: &AlgorithmDescriptor, key: &JoseKey) -> bool {
    match alg.family() {
        PrimitiveFamily::HmacSha2 => {
            matches!(key, JoseKey::Symmetric(_) | JoseKey::EllipticCurve(_))
        }
        PrimitiveFamily::RsaPkcs1v15Signature | PrimitiveFamily::RsaPss => {
            !matches!(key, JoseKey::Symmetric(_))
        }
        _ => true,
    }
}

impl Verifier for JwsVerifier<'_> {
    type Error = JoseError;

    fn verify(&self, signatures: &[ToVerifySignature]) -> Result<Vec<usize>, JoseError> {
        let mut verified = Vec::new();
        let mut failure: Option<JoseError> = None;
        for (index, to_verify) in signatures.iter().enumerate() {
            match self.verify_one(to_verify) {
                Ok(Some(())) => {
                    tracing::trace!(index, "jws signature verified");
                    verified.push(index);
                }
                Ok(None) => {
                    tracing::trace!(index, "jws signature skipped, key does not fit");
                }
                Err(err) => {
                    tracing::debug!(index, %err, "jws signature rejected");
                    // keep the first error that says more than "did not verify"
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
        if !verified.is_empty() {
            return Ok(verified);
        }
        Err(failure.unwrap_or_else(|| {
            JoseError::invalid_key_material(format!(
                "no signature can be verified with {} key",
                self.key.algorithm_name()
            ))
        }))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};
    use wax_error::{ErrorContext as _, OpaqueError};

    use super::*;
    use crate::jose::{SecretKeyKind, SymmetricKey};

    #[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
    struct AcmeProtected {
        alg: Option<String>,
        nonce: String,
    }

    #[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
    struct Random {
        data: String,
    }

    struct DummyKey;

    impl Signer for DummyKey {
        type Signature = Vec<u8>;
        type Error = OpaqueError;

        fn sign(&self, data: &str) -> Result<Self::Signature, OpaqueError> {
            let mut out = data.as_bytes().to_vec();
            out.push(33);
            Ok(out)
        }

        fn set_headers(
            &self,
            protected_headers: &mut Headers,
            _unprotected_headers: &mut Headers,
        ) -> Result<(), OpaqueError> {
            protected_headers
                .try_set_header("alg", "test_algo")
                .context("set alg")?;
            Ok(())
        }
    }

    impl Verifier for DummyKey {
        type Error = OpaqueError;
        fn verify(&self, to_verify_sigs: &[ToVerifySignature]) -> Result<Vec<usize>, OpaqueError> {
            let to_verify = &to_verify_sigs[0];
            let original = to_verify.signed_data.as_bytes();

            let signature = encoding::decode(to_verify.decoded_signature.signature(), "signature")
                .context("decode signature")?;

            if original.len() + 1 != signature.len() {
                Err(OpaqueError::from_display(
                    "signature should add single u8 to original slice",
                ))
            } else if original[..] != signature[..original.len()] {
                Err(OpaqueError::from_display("original data should be equal"))
            } else if signature[signature.len() - 1] != 33 {
                Err(OpaqueError::from_display(
                    "last element in signature should be 33",
                ))
            } else {
                Ok(vec![0])
            }
        }
    }

    fn hmac_key() -> JoseKey {
        SymmetricKey::generate(SecretKeyKind::Hmac, 64).unwrap().into()
    }

    #[test]
    fn can_serialize_and_deserialize() {
        let protected = AcmeProtected {
            nonce: "random".to_owned(),
            alg: None,
        };
        let header = Random {
            data: "something_random".to_owned(),
        };

        let jws = JwsBuilder::new()
            .with_payload("something")
            .try_with_protected_headers(protected.clone())
            .unwrap()
            .try_with_unprotected_headers(header.clone())
            .unwrap()
            .build_flattened(&DummyKey)
            .unwrap();

        let serialized = serde_json::to_string(&jws).unwrap();
        let received = serde_json::from_str::<JwsFlattened>(&serialized).unwrap();
        assert_eq!(jws, received);

        let decoded = received.decode(&DummyKey).unwrap();
        let signature = &decoded.signatures()[0];
        assert_eq!(decoded.payload(), b"something");
        assert_eq!(
            signature.protected_headers().decode::<AcmeProtected>().unwrap(),
            AcmeProtected {
                alg: Some("test_algo".to_owned()),
                ..protected
            }
        );
        assert_eq!(
            signature.unprotected_headers().decode::<Random>().unwrap(),
            header
        );
    }

    #[test]
    fn empty_payload_vs_no_payload() {
        let err = JwsBuilder::new().build_flattened(&DummyKey).unwrap_err();
        assert_eq!(err.kind(), JoseErrorKind::InvalidInput);

        let jws = JwsFlattened::builder()
            .with_payload("")
            .build_flattened(&DummyKey)
            .unwrap();
        assert_eq!(jws.payload, "");

        let jws = JwsFlattened::builder()
            .with_payload(serde_json::to_vec(&Value::Null).unwrap())
            .build_flattened(&DummyKey)
            .unwrap();
        assert_eq!(jws.payload, "bnVsbA");
    }

    #[test]
    fn tampering_should_be_detected() {
        let key = hmac_key();
        let jws = JwsFlattened::builder()
            .with_payload("something")
            .try_with_protected_header("nonce", "random")
            .unwrap()
            .build_flattened(&JwsSigner::new(&key, JwsAlgorithm::HS256))
            .unwrap();

        let serialized = serde_json::to_string(&jws).unwrap();

        let server = |serialized: String| {
            let received = Jws::from_json(&serialized)?;
            received.decode(&JwsVerifier::new(&key))
        };
        assert_ok!(server(serialized.clone()));

        for i in 0..serialized.len() - 1 {
            let mut serialized = serialized.clone();
            serialized.insert(i, 't');
            assert_err!(server(serialized), "failed at {i}");
        }
    }

    #[test]
    fn compact_round_trip() {
        let key = hmac_key();
        let signer = JwsSigner::new(&key, JwsAlgorithm::HS512).with_kid("hmac-1".to_owned());
        let compact = JwsBuilder::new()
            .with_payload(r#"{"iss":"joe"}"#)
            .build_compact(&signer)
            .unwrap();
        assert_eq!(compact.as_str().split('.').count(), 3);

        let parsed: JwsCompact = compact.to_string().parse().unwrap();
        let decoded = parsed.decode(&JwsVerifier::new(&key)).unwrap();
        assert_eq!(decoded.payload(), br#"{"iss":"joe"}"#);
        let protected = decoded.signatures()[0].protected_headers();
        assert_eq!(protected.alg(), Some("HS512"));
        assert_eq!(protected.kid(), Some("hmac-1"));

        assert_err!("a.b".parse::<JwsCompact>());
        assert_err!("a.b.c.d".parse::<JwsCompact>());
    }

    #[test]
    fn compact_needs_exactly_one_signature() {
        let key = hmac_key();
        let signer = JwsSigner::new(&key, JwsAlgorithm::HS256);

        let chained = JwsBuilder::new()
            .with_payload("payload")
            .add_signature(&signer)
            .unwrap()
            .add_signature(&signer)
            .unwrap();
        assert_eq!(chained.signature_count(), 2);
        let err = chained.clone().build_compact().unwrap_err();
        assert_eq!(err.kind(), JoseErrorKind::PolicyViolation);
        let err = chained.clone().build_flattened().unwrap_err();
        assert_eq!(err.kind(), JoseErrorKind::PolicyViolation);
        assert_eq!(chained.build_general().unwrap().signature_count(), 2);

        let compact = JwsBuilder::new()
            .with_payload("payload")
            .add_signature(&signer)
            .unwrap()
            .build_compact()
            .unwrap();
        let general = Jws::from(compact.clone());
        let parts: Vec<_> = compact.as_str().split('.').collect();
        assert_eq!(general.signatures[0].protected, parts[0]);
        assert_eq!(general.payload, parts[1]);
        assert_eq!(general.signatures[0].signature, parts[2]);
        assert_eq!(general.to_compact().unwrap(), compact);
    }

    #[test]
    fn compact_rejects_unprotected_headers() {
        let key = hmac_key();
        let err = JwsBuilder::new()
            .with_payload("payload")
            .try_with_unprotected_header("x", 1)
            .unwrap()
            .build_compact(&JwsSigner::new(&key, JwsAlgorithm::HS256))
            .unwrap_err();
        assert_eq!(err.kind(), JoseErrorKind::PolicyViolation);
    }

    #[test]
    fn duplicate_header_names_are_rejected() {
        let key = hmac_key();
        let err = JwsBuilder::new()
            .with_payload("payload")
            .try_with_unprotected_header("alg", "HS256")
            .unwrap()
            .build_general(&JwsSigner::new(&key, JwsAlgorithm::HS256))
            .unwrap_err();
        assert_eq!(err.kind(), JoseErrorKind::PolicyViolation);

        let jws = JwsBuilder::new()
            .with_payload("payload")
            .build_flattened(&JwsSigner::new(&key, JwsAlgorithm::HS256))
            .unwrap();
        let mut json = serde_json::to_value(&jws).unwrap();
        json["header"] = json!({"alg": "HS256"});
        let err = Jws::from_json(&json.to_string())
            .unwrap()
            .decode(&JwsVerifier::new(&key))
            .unwrap_err();
        assert_eq!(err.kind(), JoseErrorKind::MalformedEncoding);
    }

    #[test]
    #[tracing_test::traced_test]
    fn multi_signature_any_valid_is_enough() {
        let first = hmac_key();
        let second = hmac_key();

        let jws = JwsBuilder::new()
            .with_payload("something")
            .try_with_unprotected_header("who", "first")
            .unwrap()
            .add_signature(&JwsSigner::new(&first, JwsAlgorithm::HS256))
            .unwrap()
            .try_with_unprotected_header("who", "second")
            .unwrap()
            .add_signature(&JwsSigner::new(&second, JwsAlgorithm::HS384))
            .unwrap()
            .build_general()
            .unwrap();

        let serialized = serde_json::to_string(&jws).unwrap();
        let received = Jws::from_json(&serialized).unwrap();
        assert_eq!(received, jws);

        for (key, who) in [(&first, "first"), (&second, "second")] {
            let decoded = received.clone().decode(&JwsVerifier::new(key)).unwrap();
            assert_eq!(decoded.payload(), b"something");
            assert_eq!(decoded.signatures().len(), 1);
            assert_eq!(decoded.signatures()[0].header("who"), Some(&json!(who)));
        }

        let err = received.decode(&JwsVerifier::new(&hmac_key())).unwrap_err();
        assert_eq!(err.kind(), JoseErrorKind::AuthenticationFailure);
        assert!(logs_contain("jws signature rejected"));
    }

    #[test]
    fn new_payload_drops_signatures() {
        let key = hmac_key();
        let signer = JwsSigner::new(&key, JwsAlgorithm::HS256);
        let jws = JwsBuilder::new()
            .with_payload("first")
            .add_signature(&signer)
            .unwrap()
            .with_payload("second")
            .build_general(&signer)
            .unwrap();
        assert_eq!(jws.signature_count(), 1);
        let decoded = jws.decode(&JwsVerifier::new(&key)).unwrap();
        assert_eq!(decoded.payload(), b"second");
    }

    #[test]
    fn unknown_critical_extension_fails_verification() {
        let key = hmac_key();
        let jws = JwsBuilder::new()
            .with_payload("payload")
            .try_with_protected_headers(json!({"crit": ["exp"], "exp": 1363284000}))
            .unwrap()
            .build_compact(&JwsSigner::new(&key, JwsAlgorithm::HS256))
            .unwrap();

        let err = jws.decode(&JwsVerifier::new(&key)).unwrap_err();
        assert_eq!(err.kind(), JoseErrorKind::PolicyViolation);

        let verifier =
            JwsVerifier::new(&key).with_crit_policy(CritPolicy::new().with_extension("exp"));
        assert_ok!(jws.decode(&verifier));

        // ES256 with an unknown critical extension, never gets to the signature
        let protected = encoding::encode(r#"{"alg":"ES256","crit":["exp"],"exp":1363284000}"#);
        let compact: JwsCompact = format!("{protected}.cGF5bG9hZA.AAAA").parse().unwrap();
        let err = compact.decode(&JwsVerifier::new(&key)).unwrap_err();
        assert_eq!(err.kind(), JoseErrorKind::PolicyViolation);
    }

    #[test]
    fn entries_for_other_key_kinds_are_skipped() {
        let key = hmac_key();
        let jws = JwsBuilder::new()
            .with_payload("payload")
            .build_compact(&JwsSigner::new(&key, JwsAlgorithm::HS256))
            .unwrap();

        let rsa: JoseKey = crate::jose::RsaPrivateKey::generate().unwrap().into();
        let err = jws.decode(&JwsVerifier::new(&rsa)).unwrap_err();
        assert_eq!(err.kind(), JoseErrorKind::InvalidKeyMaterial);
    }

    #[test]
    fn rejected_entries_are_left_out_of_the_result() {
        let key = hmac_key();
        let signer = JwsSigner::new(&key, JwsAlgorithm::HS256);
        let jws = JwsBuilder::new()
            .with_payload("hello")
            .try_with_protected_headers(json!({"crit": ["exp"], "exp": 1363284000}))
            .unwrap()
            .add_signature(&signer)
            .unwrap()
            .add_signature(&signer)
            .unwrap()
            .add_signature(&JwsSigner::new(&hmac_key(), JwsAlgorithm::HS256))
            .unwrap()
            .build_general()
            .unwrap();
        assert_eq!(jws.signature_count(), 3);

        let decoded = jws.clone().decode(&JwsVerifier::new(&key)).unwrap();
        assert_eq!(decoded.payload(), b"hello");
        assert_eq!(decoded.signatures().len(), 1);
        let accepted = decoded.signatures()[0].protected_headers();
        assert_eq!(accepted.crit(), None);
        assert_eq!(accepted.get("exp"), None);

        let verifier =
            JwsVerifier::new(&key).with_crit_policy(CritPolicy::new().with_extension("exp"));
        assert_eq!(jws.decode(&verifier).unwrap().signatures().len(), 2);
    }

    #[test]
    fn unsecured_needs_explicit_opt_in() {
        let key = hmac_key();
        let jws = JwsBuilder::new()
            .with_payload("payload")
            .build_compact(&JwsSigner::new(&key, JwsAlgorithm::None))
            .unwrap();
        assert!(jws.as_str().ends_with('.'));

        let err = jws.decode(&JwsVerifier::new(&key)).unwrap_err();
        assert_eq!(err.kind(), JoseErrorKind::PolicyViolation);
        assert_ok!(jws.decode(&JwsVerifier::new(&key).with_allow_unsecured(true)));
    }

    #[test]
    fn from_json_rejects_mixed_forms() {
        let err = Jws::from_json(r#"{"payload":"","signatures":[],"signature":""}"#).unwrap_err();
        assert_eq!(err.kind(), JoseErrorKind::MalformedEncoding);
        let err = Jws::from_json("[]").unwrap_err();
        assert_eq!(err.kind(), JoseErrorKind::MalformedEncoding);
        let err = Jws::from_json(r#"{"payload":"","signatures":[]}"#)
            .unwrap()
            .decode(&DummyKey)
            .unwrap_err();
        assert_eq!(err.kind(), JoseErrorKind::MalformedEncoding);
    }
}
