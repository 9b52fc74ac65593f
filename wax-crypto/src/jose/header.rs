use std::collections::HashSet;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use wax_utils::macros::generate_set_and_with;

use super::{JoseError, encoding};

/// Header parameter names registered by [`rfc7515`], [`rfc7516`] and [`rfc7518`].
/// They can never be listed in `crit`.
///
/// [`rfc7515`]: https://datatracker.ietf.org/doc/html/rfc7515#section-4.1
/// [`rfc7516`]: https://datatracker.ietf.org/doc/html/rfc7516#section-4.1
/// [`rfc7518`]: https://datatracker.ietf.org/doc/html/rfc7518#section-4.1
const REGISTERED_NAMES: &[&str] = &[
    "alg", "enc", "zip", "jku", "jwk", "kid", "x5u", "x5c", "x5t", "x5t#S256", "typ", "cty",
    "crit", "epk", "apu", "apv", "iv", "tag", "p2s", "p2c",
];

macro_rules! string_header {
    ($($(#[$doc:meta])* $name:ident => $key:literal),+ $(,)?) => {
        $(
            $(#[$doc])*
            pub fn $name(&self) -> Option<&str> {
                self.0.get($key).and_then(Value::as_str)
            }

            generate_set_and_with! {
                $(#[$doc])*
                pub fn $name(mut self, value: Option<String>) -> Self {
                    self.put($key, value.map(Value::String));
                    self
                }
            }
        )+
    };
}

#[derive(Default, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
/// [`Headers`] is an ordered JSON object holding either the protected or
/// an unprotected part of a JOSE header.
///
/// Registered parameters have typed accessors, anything else can be
/// set with [`Headers::try_set_header`] and read with [`Headers::get`].
pub struct Headers(Map<String, Value>);

impl Headers {
    /// Create an empty header set.
    pub fn new() -> Self {
        Self::default()
    }

    generate_set_and_with! {
        /// Set provided header
        ///
        /// Warning: this function will replace an already existing header
        pub fn header(
            mut self,
            name: impl Into<String>,
            value: impl Serialize,
        ) -> Result<Self, JoseError> {
            let value = serde_json::to_value(value).map_err(|err| {
                JoseError::invalid_input("header value is not valid JSON").with_source(err)
            })?;
            self.0.insert(name.into(), value);
            Ok(self)
        }
    }

    generate_set_and_with! {
        /// Set all fields of provided object as headers
        ///
        /// Warning: this function will replace already existing headers
        pub fn headers(mut self, headers: impl Serialize) -> Result<Self, JoseError> {
            let headers = serde_json::to_value(headers).map_err(|err| {
                JoseError::invalid_input("headers are not valid JSON").with_source(err)
            })?;
            let Value::Object(mut headers) = headers else {
                return Err(JoseError::invalid_input(
                    "can only set multiple headers from a key value object",
                ));
            };
            self.0.append(&mut headers);
            Ok(self)
        }
    }

    string_header! {
        /// `alg`: algorithm used to sign, or to encrypt the CEK
        alg => "alg",
        /// `enc`: content encryption algorithm
        enc => "enc",
        /// `kid`: key id hint
        kid => "kid",
        /// `typ`: media type of the complete object
        typ => "typ",
        /// `cty`: media type of the payload
        cty => "cty",
        /// `x5u`: URL of the X.509 certificate chain
        x5u => "x5u",
        /// `x5t`: base64url SHA-1 thumbprint of the X.509 certificate
        x5t => "x5t",
        /// `x5t#S256`: base64url SHA-256 thumbprint of the X.509 certificate
        x5t_s256 => "x5t#S256",
        /// `jku`: URL of a JWK set
        jku => "jku",
        /// `zip`: compression applied before encryption
        zip => "zip",
    }

    /// `crit`: names of extensions that must be understood
    ///
    /// `None` when absent or not a list of strings.
    pub fn crit(&self) -> Option<Vec<&str>> {
        string_list(self.0.get("crit")?)
    }

    generate_set_and_with! {
        /// `crit`: names of extensions that must be understood
        pub fn crit(mut self, names: Option<Vec<String>>) -> Self {
            self.put("crit", names.map(|names| names.into_iter().map(Value::String).collect()));
            self
        }
    }

    /// `x5c`: base64 (not url) DER certificate chain
    pub fn x5c(&self) -> Option<Vec<&str>> {
        string_list(self.0.get("x5c")?)
    }

    generate_set_and_with! {
        /// `x5c`: base64 (not url) DER certificate chain
        pub fn x5c(mut self, chain: Option<Vec<String>>) -> Self {
            self.put("x5c", chain.map(|chain| chain.into_iter().map(Value::String).collect()));
            self
        }
    }

    /// `jwk`: public key as JSON Web Key
    pub fn jwk(&self) -> Option<&Map<String, Value>> {
        self.0.get("jwk").and_then(Value::as_object)
    }

    generate_set_and_with! {
        /// `jwk`: public key as JSON Web Key
        pub fn jwk(mut self, jwk: Option<Map<String, Value>>) -> Self {
            self.put("jwk", jwk.map(Value::Object));
            self
        }
    }

    /// Raw value of the named header.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Remove the named header, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.0.shift_remove(name)
    }

    /// `true` if the named header is set.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Header names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Number of headers.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` if no header is set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Underlying JSON object.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Try decode headers to the provided `T`
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, JoseError> {
        T::deserialize(&self.0).map_err(|err| {
            JoseError::malformed_encoding("deserialize headers").with_source(err)
        })
    }

    fn put(&mut self, name: &str, value: Option<Value>) {
        match value {
            Some(value) => {
                self.0.insert(name.to_owned(), value);
            }
            None => {
                self.0.shift_remove(name);
            }
        }
    }

    /// Base64url of the JSON form, the empty string for no headers.
    pub(super) fn encode(&self) -> Result<String, JoseError> {
        if self.0.is_empty() {
            return Ok(String::new());
        }
        encoding::encode_json(&self.0, "serialize headers")
    }

    /// Inverse of [`Self::encode`].
    pub(super) fn decode_segment(segment: &str) -> Result<Self, JoseError> {
        if segment.is_empty() {
            return Ok(Self::new());
        }
        let json = encoding::decode(segment, "decode protected header")?;
        serde_json::from_slice(&json).map_err(|err| {
            JoseError::malformed_encoding("protected header is not a JSON object").with_source(err)
        })
    }

    /// Union of disjoint header sets, as seen by the algorithms.
    pub(super) fn joined(parts: &[&Self]) -> Self {
        let mut joined = Map::new();
        for part in parts {
            joined.extend(part.0.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        Self(joined)
    }

    /// First header name present in more than one of `parts`.
    pub(super) fn shared_name<'a>(parts: &[&'a Self]) -> Option<&'a str> {
        let mut seen = HashSet::new();
        parts
            .iter()
            .flat_map(|&part| part.names())
            .find(|name| !seen.insert(*name))
    }
}

fn string_list(value: &Value) -> Option<Vec<&str>> {
    value.as_array()?.iter().map(Value::as_str).collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Extensions a consumer understands, checked against `crit`.
///
/// The default policy understands no extension at all,
/// so any object carrying `crit` is rejected.
pub struct CritPolicy {
    extensions: HashSet<String>,
}

impl CritPolicy {
    /// Create a policy that understands no extension.
    pub fn new() -> Self {
        Self::default()
    }

    generate_set_and_with! {
        /// Mark the named extension as understood
        pub fn extension(mut self, name: impl Into<String>) -> Self {
            self.extensions.insert(name.into());
            self
        }
    }

    /// `true` if the named extension is understood.
    pub fn understands(&self, name: &str) -> bool {
        self.extensions.contains(name)
    }

    /// Enforce [`rfc7515, section 4.1.11`] for one signature or recipient.
    ///
    /// `crit` must be integrity protected, be a non-empty list of strings,
    /// name no registered header, and every name must be present in the
    /// header and understood by this policy.
    ///
    /// [`rfc7515, section 4.1.11`]: https://datatracker.ietf.org/doc/html/rfc7515#section-4.1.11
    pub fn check(&self, protected: &Headers, unprotected: &[&Headers]) -> Result<(), JoseError> {
        if unprotected.iter().any(|headers| headers.contains("crit")) {
            return Err(JoseError::policy_violation("crit must be integrity protected"));
        }
        let Some(crit) = protected.get("crit") else {
            return Ok(());
        };
        let names = match string_list(crit) {
            Some(names) if !names.is_empty() => names,
            _ => {
                return Err(JoseError::policy_violation(
                    "crit must be a non-empty list of strings",
                ));
            }
        };
        for name in names {
            if REGISTERED_NAMES.contains(&name) {
                return Err(JoseError::policy_violation(format!(
                    "crit lists registered header '{name}'"
                )));
            }
            let present = protected.contains(name)
                || unprotected.iter().any(|headers| headers.contains(name));
            if !present {
                return Err(JoseError::policy_violation(format!(
                    "crit lists '{name}' which is not in the header"
                )));
            }
            if !self.understands(name) {
                tracing::debug!(extension = name, "rejecting unknown critical extension");
                return Err(JoseError::policy_violation(format!(
                    "critical extension '{name}' is not understood"
                )));
            }
        }
        Ok(())
    }
}
